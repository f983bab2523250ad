//! Query questions: optional setup changes, then the answer's result set.

use crate::keyword;
use crate::plan::scanned_tables;
use sqlgrade_core::evaluator::{finish, Evaluator};
use sqlgrade_core::model::{EvaluationOutcome, QuestionKind, Testcase};
use sqlgrade_core::render::{run_statement, RenderOptions};
use sqlgrade_core::sandbox::Sandbox;
use sqlgrade_core::statements;
use std::collections::BTreeSet;

pub const TABLES_PRESENT: &str = "all required tables are present.";
pub const TABLES_MISSING: &str = "missing required tables.";
pub const PLAN_FAILED: &str = "failed to retrieve query plan.";

pub struct DqlEvaluator {
    render: RenderOptions,
}

impl DqlEvaluator {
    pub fn new(render: RenderOptions) -> Self {
        Self { render }
    }
}

impl Evaluator for DqlEvaluator {
    fn name(&self) -> &'static str {
        "dql"
    }

    fn kind(&self) -> QuestionKind {
        QuestionKind::Dql
    }

    fn render(&self) -> &RenderOptions {
        &self.render
    }

    fn evaluate(&self, sandbox: Sandbox, answer: &str, tc: &mut Testcase) -> EvaluationOutcome {
        let outcome = self.run(&sandbox, answer, tc);
        finish(sandbox, outcome)
    }
}

impl DqlEvaluator {
    fn run(&self, sandbox: &Sandbox, answer: &str, tc: &mut Testcase) -> EvaluationOutcome {
        let parsed = match statements::parse(&tc.code) {
            Ok(p) => p,
            Err(e) => return EvaluationOutcome::aborted(vec![e.to_string()]),
        };
        if let Some(token) = statements::keyword_directive(&parsed) {
            let expected = tc.expected_text().to_string();
            return keyword::check(token, answer, &expected, &mut tc.additional_info);
        }
        if !tc.extra.required_tables.is_empty() {
            return self.required_tables(sandbox, answer, tc);
        }

        let conn = sandbox.conn();
        for sql in parsed.into_iter().flat_map(|s| s.into_sql()) {
            if let Err(e) = conn.execute_batch(&sql) {
                tracing::debug!(event = "sqlgrade.eval.setup_failed", error = %e);
                return EvaluationOutcome::aborted(vec![e.to_string()]);
            }
        }

        let mut received = String::new();
        for sql in statements::split(answer) {
            match run_statement(conn, &sql, &self.render) {
                Ok(text) => received.push_str(&text),
                Err(e) => {
                    tracing::debug!(event = "sqlgrade.eval.answer_failed", evaluator = "dql", error = %e);
                    return EvaluationOutcome::aborted(vec![e.to_string()]);
                }
            }
        }

        let received = received.trim_end().to_string();
        EvaluationOutcome::compared(received, tc.expected_text().trim_end())
    }

    fn required_tables(&self, sandbox: &Sandbox, answer: &str, tc: &Testcase) -> EvaluationOutcome {
        let mut scanned = BTreeSet::new();
        for sql in statements::split(answer) {
            match scanned_tables(sandbox.conn(), &sql) {
                Ok(t) => scanned.extend(t),
                Err(e) => {
                    tracing::debug!(event = "sqlgrade.eval.plan_failed", error = %e);
                    return EvaluationOutcome::aborted(vec![PLAN_FAILED.to_string()]);
                }
            }
        }

        let missing = tc
            .extra
            .required_tables
            .iter()
            .any(|t| !scanned.contains(&t.to_lowercase()));
        tracing::debug!(
            event = "sqlgrade.eval.required_tables",
            scanned = ?scanned,
            missing,
            "required tables checked"
        );
        let received = if missing { TABLES_MISSING } else { TABLES_PRESENT };
        let mut outcome = EvaluationOutcome::compared(received.to_string(), tc.expected_text());
        outcome.passed = !missing;
        outcome
    }
}
