//! Authoring-time computation of golden results.

use crate::config::QuestionConfig;
use crate::errors::ConfigError;
use crate::evaluator::Evaluator;
use crate::model::{EvaluationOutcome, QuestionKind, Testcase};
use crate::package::{DatabaseArtifact, QuestionPackage, PACKAGE_SCHEMA_VERSION};
use crate::sandbox::{DatabaseSource, Sandbox, SandboxLimits};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecomputeOptions {
    pub check_results: bool,
    pub database_connection: bool,
}

impl Default for PrecomputeOptions {
    fn default() -> Self {
        Self {
            check_results: false,
            database_connection: true,
        }
    }
}

pub struct Precomputer<'a> {
    pub evaluator: &'a dyn Evaluator,
    pub source: DatabaseSource,
    pub limits: SandboxLimits,
    pub options: PrecomputeOptions,
}

impl<'a> Precomputer<'a> {
    /// Fills in every missing `expected_result` from the reference `answer`
    /// and, when requested, re-checks every author-supplied one.
    pub fn run(&self, answer: &str, testcases: &mut [Testcase]) -> anyhow::Result<()> {
        self.validate(answer, testcases)?;

        for (i, tc) in testcases.iter_mut().enumerate() {
            if tc.expected_result.is_some() {
                continue;
            }
            let outcome = self.evaluate(answer, tc)?;
            reject_broken_answer(i, &outcome)?;
            tracing::info!(
                event = "sqlgrade.precompute.golden",
                evaluator = self.evaluator.name(),
                testcase = i,
                bytes = outcome.received.len(),
                "golden result computed"
            );
            tc.expected_result = Some(outcome.received);
        }

        if self.options.check_results {
            for (i, tc) in testcases.iter_mut().enumerate() {
                let declared = tc.expected_text().trim().to_string();
                let outcome = self.evaluate(answer, tc)?;
                reject_broken_answer(i, &outcome)?;
                let computed = outcome.received.trim();
                if computed != declared {
                    return Err(ConfigError(format!(
                        "provided result of testcase {}:\n{}\ndid not match the result of the reference answer:\n{}",
                        i, declared, computed
                    ))
                    .into());
                }
            }
            tracing::info!(
                event = "sqlgrade.precompute.checked",
                testcases = testcases.len(),
                "declared results match the reference answer"
            );
        }
        Ok(())
    }

    fn validate(&self, answer: &str, testcases: &[Testcase]) -> Result<(), ConfigError> {
        let missing_result = testcases.iter().any(|t| t.expected_result.is_none());

        if self.evaluator.kind() == QuestionKind::Dql {
            if !answer.trim_end().ends_with(';') {
                return Err(ConfigError(
                    "SQL queries must end with a ';' symbol".into(),
                ));
            }
            if testcases.iter().skip(1).any(|t| t.code.trim().is_empty()) {
                return Err(ConfigError(
                    "an additional testcase must make changes to the database".into(),
                ));
            }
        }

        if self.options.database_connection {
            self.source.ensure_exists()?;
        } else {
            if missing_result {
                return Err(ConfigError(
                    "you must provide a result for every testcase if database_connection is false; \
                     otherwise it cannot be fetched from the database"
                        .into(),
                ));
            }
            if self.options.check_results {
                return Err(ConfigError(
                    "checking results requires a database connection, but database_connection is false"
                        .into(),
                ));
            }
        }

        if self.options.check_results && missing_result {
            return Err(ConfigError(
                "you must provide a result for each testcase if check_results is true".into(),
            ));
        }
        Ok(())
    }

    fn evaluate(&self, answer: &str, tc: &mut Testcase) -> anyhow::Result<EvaluationOutcome> {
        let sandbox = Sandbox::acquire(&self.source, &self.limits)?;
        Ok(self.evaluator.evaluate(sandbox, answer, tc))
    }
}

fn reject_broken_answer(index: usize, outcome: &EvaluationOutcome) -> Result<(), ConfigError> {
    if outcome.aborted {
        return Err(ConfigError(format!(
            "reference answer failed on testcase {}: {}",
            index,
            outcome.errors.join("; ")
        )));
    }
    Ok(())
}

/// Precomputes a whole question and bundles it for export.
pub fn build_package(
    cfg: &QuestionConfig,
    evaluator: &dyn Evaluator,
) -> anyhow::Result<QuestionPackage> {
    if evaluator.kind() != cfg.kind {
        anyhow::bail!(
            "evaluator '{}' cannot precompute a {} question",
            evaluator.name(),
            cfg.kind.as_str()
        );
    }

    let source = cfg.database_source();
    let precomputer = Precomputer {
        evaluator,
        source: source.clone(),
        limits: cfg.settings.limits(),
        options: PrecomputeOptions {
            check_results: cfg.check_results,
            database_connection: cfg.database_connection,
        },
    };

    let mut testcases = cfg.testcases.clone();
    precomputer.run(&cfg.answer, &mut testcases)?;

    // The packaged database is needed at grading time even when golden
    // results were supplied without a connection.
    source.ensure_exists()?;
    let database = match source.path() {
        Some(p) => Some(DatabaseArtifact::from_file(p)?),
        None => None,
    };

    let mut pkg = QuestionPackage {
        schema_version: PACKAGE_SCHEMA_VERSION,
        question: cfg.question.clone(),
        kind: cfg.kind,
        limits: cfg.settings.limits(),
        render: *evaluator.render(),
        testcases,
        database,
        fingerprints: Vec::new(),
    };
    pkg.fingerprints = pkg.compute_fingerprints(&cfg.answer);
    Ok(pkg)
}
