use crate::errors::ConfigError;
use crate::model::{QuestionKind, Testcase};
use crate::render::RenderOptions;
use crate::sandbox::{DatabaseSource, SandboxLimits};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionConfig {
    #[serde(default, rename = "configVersion", alias = "version")]
    pub version: u32,
    pub question: String,
    pub kind: QuestionKind,
    /// Reference database path, or `:memory:`.
    pub database: String,
    /// Reference answer used to compute golden results.
    pub answer: String,
    /// Recompute every author-supplied result and fail on mismatch.
    #[serde(default)]
    pub check_results: bool,
    /// When false, no database is opened and every result must be supplied.
    #[serde(default = "default_true")]
    pub database_connection: bool,
    #[serde(default, skip_serializing_if = "is_default_settings")]
    pub settings: Settings,
    pub testcases: Vec<Testcase>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<usize>,
}

fn is_default_settings(s: &Settings) -> bool {
    s == &Settings::default()
}

impl Settings {
    pub fn limits(&self) -> SandboxLimits {
        let d = SandboxLimits::default();
        SandboxLimits {
            memory_limit_mb: self.memory_limit_mb.unwrap_or(d.memory_limit_mb),
            timeout_ms: self.timeout_ms.or(d.timeout_ms),
        }
    }

    pub fn render(&self) -> RenderOptions {
        let d = RenderOptions::default();
        RenderOptions {
            max_rows: self.max_rows.unwrap_or(d.max_rows),
            max_width: self.max_width.unwrap_or(d.max_width),
        }
    }

    pub fn parallel(&self) -> usize {
        self.parallel.unwrap_or(4).max(1)
    }
}

impl QuestionConfig {
    pub fn database_source(&self) -> DatabaseSource {
        DatabaseSource::parse(&self.database)
    }
}

pub fn load_config(path: &Path, strict: bool) -> Result<QuestionConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;

    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);

    let mut cfg: QuestionConfig = serde_ignored::deserialize(deserializer, |p| {
        ignored_keys.insert(p.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    // YAML anchors conventionally live under `definitions`, `_` or `x-` keys.
    let meaningful_unknowns: Vec<_> = ignored_keys
        .iter()
        .filter(|k| *k != "definitions" && !k.starts_with('_') && !k.starts_with("x-"))
        .collect();

    if !meaningful_unknowns.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "unknown fields detected in strict mode: {:?} (file: {})",
                meaningful_unknowns,
                path.display()
            )));
        }
        tracing::warn!(
            event = "sqlgrade.config.unknown_fields",
            fields = ?meaningful_unknowns,
            file = %path.display(),
            "ignored unknown config fields"
        );
    }

    if cfg.version != 0 && cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: 0, {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }

    if cfg.testcases.is_empty() {
        return Err(ConfigError("config has no testcases".into()));
    }

    let base_dir = path.parent().unwrap_or(Path::new("."));
    if let DatabaseSource::File(p) = cfg.database_source().resolve(base_dir) {
        cfg.database = p.to_string_lossy().into_owned();
    }

    Ok(cfg)
}
