//! Disposable database instances, one per testcase evaluation.
//!
//! A [`Sandbox`] owns either a private in-memory database or a temporary
//! sibling copy of a reference database file. Dropping it closes the
//! connection and then deletes the copy, so every exit path cleans up.

use crate::errors::ConfigError;
use anyhow::Context;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempPath;

pub const IN_MEMORY_MARKER: &str = ":memory:";

/// Number of VM instructions between two timeout checks.
const PROGRESS_OPS: i32 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseSource {
    InMemory,
    File(PathBuf),
}

impl DatabaseSource {
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == IN_MEMORY_MARKER {
            DatabaseSource::InMemory
        } else {
            DatabaseSource::File(PathBuf::from(raw))
        }
    }

    /// Resolves a relative file path against `base_dir`.
    pub fn resolve(self, base_dir: &Path) -> Self {
        match self {
            DatabaseSource::File(p) if p.is_relative() => DatabaseSource::File(base_dir.join(p)),
            other => other,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            DatabaseSource::InMemory => None,
            DatabaseSource::File(p) => Some(p),
        }
    }

    /// Fails when a file source does not exist.
    pub fn ensure_exists(&self) -> Result<(), ConfigError> {
        match self {
            DatabaseSource::File(p) if !p.is_file() => Err(ConfigError(format!(
                "provided database path does not exist: {}",
                p.display()
            ))),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for DatabaseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseSource::InMemory => f.write_str(IN_MEMORY_MARKER),
            DatabaseSource::File(p) => write!(f, "{}", p.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxLimits {
    /// Page cache ceiling for the sandbox connection.
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,
    /// Wall-clock budget for everything run on one sandbox. `None` means no
    /// limit; the grading host is then responsible for killing runaway work.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            memory_limit_mb: default_memory_limit_mb(),
            timeout_ms: None,
        }
    }
}

fn default_memory_limit_mb() -> u64 {
    2000
}

pub struct Sandbox {
    // Field order matters: the connection must close before the copy is deleted.
    conn: Connection,
    working_copy: Option<TempPath>,
}

impl Sandbox {
    pub fn acquire(source: &DatabaseSource, limits: &SandboxLimits) -> anyhow::Result<Self> {
        let (conn, working_copy) = match source {
            DatabaseSource::InMemory => (
                Connection::open_in_memory().context("failed to open in-memory sandbox")?,
                None,
            ),
            DatabaseSource::File(reference) => {
                source.ensure_exists()?;
                let copy = working_copy_of(reference)?;
                let conn = Connection::open(&copy).with_context(|| {
                    format!("failed to open sandbox copy {}", copy.display())
                })?;
                (conn, Some(copy))
            }
        };

        configure(&conn, limits)?;

        tracing::debug!(
            event = "sqlgrade.sandbox.acquired",
            source = %source,
            working_copy = ?working_copy.as_ref().map(|p| p.display().to_string()),
            "sandbox acquired"
        );

        Ok(Self { conn, working_copy })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn working_copy(&self) -> Option<&Path> {
        self.working_copy.as_deref()
    }

    /// Closes the connection and deletes the working copy, reporting failures.
    pub fn release(self) -> anyhow::Result<()> {
        let Sandbox { conn, working_copy } = self;
        conn.close()
            .map_err(|(_, e)| e)
            .context("failed to close sandbox connection")?;
        if let Some(path) = working_copy {
            let display = path.display().to_string();
            path.close()
                .with_context(|| format!("failed to delete sandbox copy {}", display))?;
        }
        tracing::debug!(event = "sqlgrade.sandbox.released");
        Ok(())
    }
}

fn working_copy_of(reference: &Path) -> anyhow::Result<TempPath> {
    let dir = match reference.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = reference
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "database".into());

    let tmp = tempfile::Builder::new()
        .prefix(&format!("{}.", name))
        .suffix(".copy")
        .tempfile_in(&dir)
        .with_context(|| format!("failed to create sandbox copy in {}", dir.display()))?
        .into_temp_path();

    std::fs::copy(reference, &tmp).with_context(|| {
        format!(
            "failed to copy {} to {}",
            reference.display(),
            tmp.display()
        )
    })?;
    Ok(tmp)
}

fn configure(conn: &Connection, limits: &SandboxLimits) -> anyhow::Result<()> {
    let cache_kib = limits.memory_limit_mb.saturating_mul(1024);
    for pragma in [
        format!("PRAGMA cache_size = -{cache_kib}"),
        "PRAGMA threads = 0".to_string(),
        "PRAGMA journal_mode = MEMORY".to_string(),
        "PRAGMA foreign_keys = ON".to_string(),
    ] {
        apply_pragma(conn, &pragma).with_context(|| format!("failed to apply `{pragma}`"))?;
    }

    if let Some(ms) = limits.timeout_ms {
        let budget = Duration::from_millis(ms);
        let started = Instant::now();
        conn.progress_handler(PROGRESS_OPS, Some(move || started.elapsed() > budget));
    }
    Ok(())
}

// Some pragmas echo their new value as a row, others return nothing.
fn apply_pragma(conn: &Connection, sql: &str) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    while rows.next()?.is_some() {}
    Ok(())
}
