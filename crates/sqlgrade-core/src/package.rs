//! The exported question: golden testcases plus the reference database.

use crate::errors::ConfigError;
use crate::fingerprint::{self, sha256_bytes_hex};
use crate::model::{QuestionKind, Testcase};
use crate::render::RenderOptions;
use crate::sandbox::{DatabaseSource, SandboxLimits};
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const PACKAGE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseArtifact {
    pub file_name: String,
    /// Base64 of the reference database file.
    pub encoding: String,
    /// SHA-256 of the decoded bytes.
    pub digest: String,
}

impl DatabaseArtifact {
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read reference database {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "database.db".into());
        Ok(Self {
            file_name,
            digest: sha256_bytes_hex(&bytes),
            encoding: STANDARD.encode(&bytes),
        })
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        let bytes = STANDARD
            .decode(self.encoding.as_bytes())
            .context("database_encoding is not valid base64")?;
        let digest = sha256_bytes_hex(&bytes);
        if digest != self.digest {
            anyhow::bail!(
                "database digest mismatch: package says {}, content is {}",
                self.digest,
                digest
            );
        }
        Ok(bytes)
    }

    /// Writes the packaged database into `dir` and returns its path.
    pub fn materialize(&self, dir: &Path) -> Result<PathBuf> {
        let bytes = self.decode()?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionPackage {
    pub schema_version: u32,
    pub question: String,
    pub kind: QuestionKind,
    pub limits: SandboxLimits,
    pub render: RenderOptions,
    pub testcases: Vec<Testcase>,
    /// `None` for in-memory questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseArtifact>,
    /// One per testcase, see [`fingerprint::compute`].
    #[serde(default)]
    pub fingerprints: Vec<String>,
}

impl QuestionPackage {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to open package file: {}", path.display()))?;
        let pkg: QuestionPackage =
            serde_json::from_str(&raw).context("failed to parse package JSON")?;
        if pkg.schema_version != PACKAGE_SCHEMA_VERSION {
            return Err(ConfigError(format!(
                "unsupported package schema version {}",
                pkg.schema_version
            ))
            .into());
        }
        Ok(pkg)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write package {}", path.display()))?;
        Ok(())
    }

    /// Database source for grading, materializing the packaged file into `dir`.
    pub fn database_source(&self, dir: &Path) -> Result<DatabaseSource> {
        match &self.database {
            None => Ok(DatabaseSource::InMemory),
            Some(artifact) => Ok(DatabaseSource::File(artifact.materialize(dir)?)),
        }
    }

    pub fn compute_fingerprints(&self, answer: &str) -> Vec<String> {
        self.testcases
            .iter()
            .map(|tc| {
                fingerprint::compute(fingerprint::Context {
                    question: &self.question,
                    kind: self.kind,
                    answer,
                    testcase: tc,
                    database_digest: self.database.as_ref().map(|d| d.digest.as_str()),
                    render: &self.render,
                })
                .hex
            })
            .collect()
    }

    /// Indices of testcases whose golden result was not computed from
    /// `answer` under the current engine.
    pub fn stale_testcases(&self, answer: &str) -> Vec<usize> {
        let current = self.compute_fingerprints(answer);
        current
            .iter()
            .enumerate()
            .filter(|(i, fp)| self.fingerprints.get(*i) != Some(*fp))
            .map(|(i, _)| i)
            .collect()
    }
}
