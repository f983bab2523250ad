//! Schema-design questions: the answer builds schema, the testcase probes it.

use crate::classify::{classify, table_under_test, Failure};
use crate::keyword;
use sqlgrade_core::evaluator::{finish, Evaluator};
use sqlgrade_core::model::{EvaluationOutcome, QuestionKind, Testcase};
use sqlgrade_core::render::{run_statement, RenderOptions};
use sqlgrade_core::sandbox::Sandbox;
use sqlgrade_core::statements::{self, Statement};
use std::collections::BTreeSet;

/// Replaces the text of generic errors when later detail must stay hidden.
pub const HIDDEN_ERROR: &str = "error details hidden";

pub struct DdlEvaluator {
    render: RenderOptions,
}

impl DdlEvaluator {
    pub fn new(render: RenderOptions) -> Self {
        Self { render }
    }
}

impl Evaluator for DdlEvaluator {
    fn name(&self) -> &'static str {
        "ddl"
    }

    fn kind(&self) -> QuestionKind {
        QuestionKind::Ddl
    }

    fn render(&self) -> &RenderOptions {
        &self.render
    }

    fn evaluate(&self, sandbox: Sandbox, answer: &str, tc: &mut Testcase) -> EvaluationOutcome {
        let outcome = self.run(&sandbox, answer, tc);
        finish(sandbox, outcome)
    }
}

impl DdlEvaluator {
    fn run(&self, sandbox: &Sandbox, answer: &str, tc: &mut Testcase) -> EvaluationOutcome {
        let parsed = match statements::parse(&tc.code) {
            Ok(p) => p,
            Err(e) => return EvaluationOutcome::aborted(vec![e.to_string()]),
        };
        if let Some(token) = statements::keyword_directive(&parsed) {
            let expected = tc.expected_text().to_string();
            return keyword::check(token, answer, &expected, &mut tc.additional_info);
        }

        let conn = sandbox.conn();
        if let Err(e) = conn.execute_batch(answer) {
            tracing::debug!(event = "sqlgrade.eval.answer_failed", evaluator = "ddl", error = %e);
            return EvaluationOutcome::aborted(vec![e.to_string()]);
        }

        let flexible = tc.extra.flexible_tables();
        let mut buffer = String::new();
        let mut errors = Vec::new();

        for sql in parsed.into_iter().flat_map(Statement::into_sql) {
            match run_statement(conn, &sql, &self.render) {
                Ok(text) => buffer.push_str(&text),
                Err(e) => {
                    let line = self.describe(&e, &sql, &flexible, tc, &mut errors);
                    buffer.push_str(&line);
                    buffer.push('\n');
                }
            }
        }

        let mut outcome = EvaluationOutcome::compared(buffer, tc.expected_text());
        outcome.errors = errors;
        outcome
    }

    /// Buffer line for a failed statement. Generic errors are also recorded
    /// in `errors`.
    fn describe(
        &self,
        err: &rusqlite::Error,
        sql: &str,
        flexible: &BTreeSet<String>,
        tc: &mut Testcase,
        errors: &mut Vec<String>,
    ) -> String {
        let failure = classify(err);
        match failure {
            Failure::Check | Failure::Conversion => {
                let table = table_under_test(sql);
                if flexible.contains(&table) {
                    tc.additional_info.record_flex_table(&table);
                    format!("check constraint failed or wrong enum in table {}", table)
                } else {
                    format!("check constraint failed on table {}", table)
                }
            }
            Failure::Constraint => err.to_string().to_lowercase(),
            Failure::Other => {
                errors.push(if tc.hide_rest_if_fail {
                    HIDDEN_ERROR.to_string()
                } else {
                    err.to_string()
                });
                err.to_string().to_lowercase()
            }
        }
    }
}
