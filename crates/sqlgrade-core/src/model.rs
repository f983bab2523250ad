use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Schema and constraint mutation tests: the answer is DDL, testcase code mutates.
    Ddl,
    /// Query result tests: testcase code sets up data, the answer is a query.
    Dql,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Ddl => "ddl",
            QuestionKind::Dql => "dql",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisplayPolicy {
    #[default]
    #[serde(alias = "SHOW")]
    Show,
    #[serde(alias = "HIDE")]
    Hide,
    #[serde(alias = "HIDE_IF_SUCCEED")]
    HideIfSucceed,
    #[serde(alias = "HIDE_IF_FAIL")]
    HideIfFail,
}

impl DisplayPolicy {
    pub fn is_hidden(&self, passed: bool) -> bool {
        match self {
            DisplayPolicy::Show => false,
            DisplayPolicy::Hide => true,
            DisplayPolicy::HideIfSucceed => passed,
            DisplayPolicy::HideIfFail => !passed,
        }
    }
}

/// A column that may be declared with any of several types across tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlexibleDatatype {
    pub attribute: String,
    #[serde(default)]
    pub allowed_types: Vec<String>,
    #[serde(default)]
    pub used_in_tables: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestcaseExtra {
    /// DDL only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flexible_datatypes: Vec<FlexibleDatatype>,
    /// DQL only: base tables the answer's plan must scan.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_tables: Vec<String>,
}

impl TestcaseExtra {
    pub fn is_empty(&self) -> bool {
        self.flexible_datatypes.is_empty() && self.required_tables.is_empty()
    }

    /// Lowercased names of every table carrying a flexible declaration.
    pub fn flexible_tables(&self) -> BTreeSet<String> {
        self.flexible_datatypes
            .iter()
            .flat_map(|f| f.used_in_tables.iter())
            .map(|t| t.to_lowercase())
            .collect()
    }
}

/// Side channel written during evaluation and read back when rendering
/// diagnostics. Entries are only ever added.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdditionalInfo {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub flex_enum_tables: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_present: Option<String>,
}

impl AdditionalInfo {
    pub fn is_empty(&self) -> bool {
        self.flex_enum_tables.is_empty() && self.keyword_present.is_none()
    }

    pub fn record_flex_table(&mut self, table: &str) {
        self.flex_enum_tables.insert(table.to_lowercase());
    }

    pub fn record_keyword(&mut self, token: &str) {
        if self.keyword_present.is_none() {
            self.keyword_present = Some(token.to_lowercase());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Testcase {
    #[serde(default)]
    pub code: String,
    #[serde(default, alias = "result", skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    #[serde(default, skip_serializing_if = "TestcaseExtra::is_empty")]
    pub extra: TestcaseExtra,
    #[serde(default, skip_serializing_if = "AdditionalInfo::is_empty")]
    pub additional_info: AdditionalInfo,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
    #[serde(default)]
    pub hide_rest_if_fail: bool,
    #[serde(default)]
    pub display: DisplayPolicy,
}

impl Default for Testcase {
    fn default() -> Self {
        Self {
            code: String::new(),
            expected_result: None,
            extra: TestcaseExtra::default(),
            additional_info: AdditionalInfo::default(),
            max_score: default_max_score(),
            hide_rest_if_fail: false,
            display: DisplayPolicy::Show,
        }
    }
}

fn default_max_score() -> f64 {
    1.0
}

impl Testcase {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected_result = Some(expected.into());
        self
    }

    pub fn expected_text(&self) -> &str {
        self.expected_result.as_deref().unwrap_or("")
    }
}

/// Uniform result of a DDL or DQL evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationOutcome {
    pub received: String,
    pub expected: String,
    pub passed: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    /// The answer itself failed to run; nothing after it was evaluated.
    #[serde(default)]
    pub aborted: bool,
}

impl EvaluationOutcome {
    pub fn aborted(errors: Vec<String>) -> Self {
        Self {
            received: String::new(),
            expected: String::new(),
            passed: false,
            errors,
            aborted: true,
        }
    }

    pub fn compared(received: String, expected: &str) -> Self {
        let passed = received == expected;
        Self {
            received,
            expected: expected.to_string(),
            passed,
            errors: Vec::new(),
            aborted: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestcaseResult {
    pub index: usize,
    pub outcome: EvaluationOutcome,
    pub awarded: f64,
    pub max_score: f64,
    pub hidden: bool,
    #[serde(default)]
    pub additional_info: AdditionalInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeReport {
    pub results: Vec<TestcaseResult>,
}

impl GradeReport {
    pub fn awarded(&self) -> f64 {
        self.results.iter().map(|r| r.awarded).sum()
    }

    pub fn max_score(&self) -> f64 {
        self.results.iter().map(|r| r.max_score).sum()
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.outcome.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_policy_resolves_visibility() {
        assert!(!DisplayPolicy::Show.is_hidden(false));
        assert!(DisplayPolicy::Hide.is_hidden(true));
        assert!(DisplayPolicy::HideIfSucceed.is_hidden(true));
        assert!(!DisplayPolicy::HideIfSucceed.is_hidden(false));
        assert!(DisplayPolicy::HideIfFail.is_hidden(false));
    }

    #[test]
    fn display_policy_accepts_legacy_uppercase() {
        let p: DisplayPolicy = serde_yaml::from_str("HIDE_IF_FAIL").unwrap();
        assert_eq!(p, DisplayPolicy::HideIfFail);
        let p: DisplayPolicy = serde_yaml::from_str("hide_if_succeed").unwrap();
        assert_eq!(p, DisplayPolicy::HideIfSucceed);
    }

    #[test]
    fn testcase_reads_result_alias_and_defaults() {
        let tc: Testcase = serde_yaml::from_str(
            r#"
code: "INSERT INTO orders VALUES (1, 'x');"
result: "ok"
extra:
  flexible_datatypes:
    - attribute: status
      allowed_types: ["ENUM", "VARCHAR"]
      used_in_tables: ["Orders"]
"#,
        )
        .unwrap();
        assert_eq!(tc.expected_text(), "ok");
        assert_eq!(tc.max_score, 1.0);
        assert_eq!(tc.display, DisplayPolicy::Show);
        assert!(tc.extra.flexible_tables().contains("orders"));
    }

    #[test]
    fn additional_info_is_append_only() {
        let mut info = AdditionalInfo::default();
        info.record_flex_table("Orders");
        info.record_flex_table("orders");
        info.record_keyword("JOIN");
        info.record_keyword("where");
        assert_eq!(info.flex_enum_tables.len(), 1);
        assert_eq!(info.keyword_present.as_deref(), Some("join"));
    }
}
