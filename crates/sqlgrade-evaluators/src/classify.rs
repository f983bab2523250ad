//! Normalization of statement errors into a small, stable vocabulary.

use regex::Regex;
use rusqlite::ErrorCode;
use std::sync::OnceLock;

pub const UNKNOWN_TABLE: &str = "unknown_table";

// Extended result codes, SQLITE_CONSTRAINT | (n << 8).
const SQLITE_CONSTRAINT_CHECK: i32 = 275;
const SQLITE_CONSTRAINT_DATATYPE: i32 = 3091;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// CHECK constraint violated.
    Check,
    /// Value could not be stored in the declared column type.
    Conversion,
    /// Any other constraint: unique, not null, primary or foreign key.
    Constraint,
    Other,
}

pub fn classify(err: &rusqlite::Error) -> Failure {
    let rusqlite::Error::SqliteFailure(e, _) = err else {
        return Failure::Other;
    };
    match e.extended_code {
        SQLITE_CONSTRAINT_CHECK => Failure::Check,
        SQLITE_CONSTRAINT_DATATYPE => Failure::Conversion,
        _ => match e.code {
            ErrorCode::ConstraintViolation => Failure::Constraint,
            ErrorCode::TypeMismatch => Failure::Conversion,
            _ => Failure::Other,
        },
    }
}

fn target_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?is)^\s*(?:insert(?:\s+or\s+\w+)?\s+into|replace\s+into|update(?:\s+or\s+\w+)?)\s+((?:[\w$]+|"[^"]+"|`[^`]+`|\[[^\]]+\])(?:\s*\.\s*(?:[\w$]+|"[^"]+"|`[^`]+`|\[[^\]]+\]))?)"#,
        )
        .expect("static regex")
    })
}

/// Lowercased target table of an `INSERT`, `REPLACE` or `UPDATE`, without
/// quotes or schema prefix. Anything else yields [`UNKNOWN_TABLE`].
pub fn table_under_test(sql: &str) -> String {
    let Some(caps) = target_re().captures(sql) else {
        return UNKNOWN_TABLE.to_string();
    };
    let name = caps[1].rsplit('.').next().unwrap_or(&caps[1]);
    name.trim()
        .trim_matches(|c| matches!(c, '"' | '`' | '[' | ']'))
        .to_lowercase()
}
