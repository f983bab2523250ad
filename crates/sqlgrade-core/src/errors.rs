use std::fmt;

/// Authoring-time error that must stop question generation.
///
/// Raised for a missing reference database, a golden result that cannot be
/// computed, a broken reference answer, or a self-check mismatch. It travels
/// through `anyhow` and can be recovered with `downcast_ref::<ConfigError>()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

impl ConfigError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Returns the `ConfigError` at the root of an anyhow chain, if any.
pub fn as_config_error(err: &anyhow::Error) -> Option<&ConfigError> {
    err.chain().find_map(|e| e.downcast_ref::<ConfigError>())
}
