//! Statement splitting and shortcut directive recognition.

use crate::errors::ConfigError;
use std::str::FromStr;

pub const KEYWORD_PRESENT: &str = "keyword_present";
pub const TEST_TABLE_CORRECTNESS: &str = "test_table_correctness";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Textual check on the answer; never executed.
    KeywordPresent(String),
    /// Expands into canned verification queries for one table.
    TableCorrectness {
        table: String,
        subtests: Vec<TableSubtest>,
    },
    Sql(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSubtest {
    Columns,
    ForeignKeys,
    Indexes,
    RowCount,
}

impl FromStr for TableSubtest {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "columns" => Ok(TableSubtest::Columns),
            "foreign_keys" => Ok(TableSubtest::ForeignKeys),
            "indexes" => Ok(TableSubtest::Indexes),
            "row_count" => Ok(TableSubtest::RowCount),
            other => Err(ConfigError(format!(
                "unknown {} subtest '{}' (expected columns, foreign_keys, indexes or row_count)",
                TEST_TABLE_CORRECTNESS, other
            ))),
        }
    }
}

impl TableSubtest {
    fn sql(&self, table: &str) -> String {
        let lit = quote_literal(table);
        match self {
            TableSubtest::Columns => format!(
                "SELECT name, upper(type) AS type, \"notnull\", pk FROM pragma_table_info({lit}) ORDER BY cid"
            ),
            TableSubtest::ForeignKeys => format!(
                "SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list({lit}) ORDER BY id, seq"
            ),
            TableSubtest::Indexes => format!(
                "SELECT \"unique\", origin, partial FROM pragma_index_list({lit}) ORDER BY origin, \"unique\""
            ),
            TableSubtest::RowCount => {
                format!("SELECT count(*) AS row_count FROM {}", quote_ident(table))
            }
        }
    }
}

impl Statement {
    /// SQL to hand to the database. Keyword directives produce nothing.
    pub fn into_sql(self) -> Vec<String> {
        match self {
            Statement::Sql(sql) => vec![sql],
            Statement::KeywordPresent(_) => Vec::new(),
            Statement::TableCorrectness { table, subtests } => {
                subtests.iter().map(|s| s.sql(&table)).collect()
            }
        }
    }
}

/// Splits `;`-delimited SQL into trimmed, non-empty statements.
///
/// Semicolons inside string literals, quoted identifiers, comments and
/// `CREATE TRIGGER ... END` bodies do not split. Comments are dropped.
pub fn split(code: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut chars = code.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                cur.push(c);
                for d in chars.by_ref() {
                    cur.push(d);
                    if d == close {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for d in chars.by_ref() {
                    if d == '\n' {
                        cur.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for d in chars.by_ref() {
                    if prev == '*' && d == '/' {
                        break;
                    }
                    prev = d;
                }
                cur.push(' ');
            }
            ';' if !inside_trigger_body(&cur) => push_trimmed(&mut out, &mut cur),
            _ => cur.push(c),
        }
    }
    push_trimmed(&mut out, &mut cur);
    out
}

/// Splits `code` and recognizes shortcut directives.
pub fn parse(code: &str) -> Result<Vec<Statement>, ConfigError> {
    split(code).into_iter().map(|s| parse_one(&s)).collect()
}

/// The first keyword directive, if any. Its presence turns the whole
/// testcase into a textual check.
pub fn keyword_directive(statements: &[Statement]) -> Option<&str> {
    statements.iter().find_map(|s| match s {
        Statement::KeywordPresent(token) => Some(token.as_str()),
        _ => None,
    })
}

fn parse_one(stmt: &str) -> Result<Statement, ConfigError> {
    let mut words = stmt.split_whitespace();
    let head = words.next().unwrap_or_default();

    if head.eq_ignore_ascii_case(KEYWORD_PRESENT) {
        let token = stmt[head.len()..].trim();
        if token.is_empty() {
            return Err(ConfigError(format!("{} requires a token", KEYWORD_PRESENT)));
        }
        return Ok(Statement::KeywordPresent(token.to_string()));
    }

    if head.eq_ignore_ascii_case(TEST_TABLE_CORRECTNESS) {
        let table = words.next().ok_or_else(|| {
            ConfigError(format!("{} requires a table name", TEST_TABLE_CORRECTNESS))
        })?;
        let mut subtests = words
            .map(TableSubtest::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        if subtests.is_empty() {
            subtests.push(TableSubtest::Columns);
        }
        return Ok(Statement::TableCorrectness {
            table: table.to_string(),
            subtests,
        });
    }

    Ok(Statement::Sql(stmt.to_string()))
}

fn push_trimmed(out: &mut Vec<String>, cur: &mut String) {
    let s = cur.trim();
    if !s.is_empty() {
        out.push(s.to_string());
    }
    cur.clear();
}

fn inside_trigger_body(cur: &str) -> bool {
    let upper = cur.to_ascii_uppercase();
    let words: Vec<&str> = upper.split_whitespace().take(4).collect();
    let is_trigger = matches!(
        words.as_slice(),
        ["CREATE", "TRIGGER", ..]
            | ["CREATE", "TEMP", "TRIGGER", ..]
            | ["CREATE", "TEMPORARY", "TRIGGER", ..]
    );
    let last_word = upper
        .rsplit(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
        .find(|w| !w.is_empty());
    is_trigger && last_word != Some("END")
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
