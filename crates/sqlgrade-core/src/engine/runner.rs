use crate::engine::grader::{apply_hide_rest, grade_testcase, score};
use crate::evaluator::Evaluator;
use crate::model::{EvaluationOutcome, GradeReport, Testcase, TestcaseResult};
use crate::package::QuestionPackage;
use crate::sandbox::{DatabaseSource, SandboxLimits};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Grades a student answer against every testcase of a question.
///
/// Each testcase gets its own sandbox, so up to `parallel` of them run at
/// once without seeing each other's changes.
pub struct Runner {
    pub evaluator: Arc<dyn Evaluator>,
    pub source: DatabaseSource,
    pub limits: SandboxLimits,
    pub parallel: usize,
}

impl Runner {
    /// Materializes the packaged database into `dir` and grades against it.
    pub fn from_package(
        pkg: &QuestionPackage,
        evaluator: Arc<dyn Evaluator>,
        dir: &Path,
        parallel: usize,
    ) -> anyhow::Result<Self> {
        if evaluator.kind() != pkg.kind {
            anyhow::bail!(
                "evaluator '{}' cannot grade a {} question",
                evaluator.name(),
                pkg.kind.as_str()
            );
        }
        if evaluator.render() != &pkg.render {
            anyhow::bail!("evaluator render options differ from the packaged ones");
        }
        Ok(Self {
            evaluator,
            source: pkg.database_source(dir)?,
            limits: pkg.limits,
            parallel: parallel.max(1),
        })
    }

    pub async fn grade_all(
        &self,
        answer: &str,
        testcases: &[Testcase],
    ) -> anyhow::Result<GradeReport> {
        let sem = Arc::new(Semaphore::new(self.parallel.max(1)));
        let mut handles = Vec::new();

        for tc in testcases.iter() {
            let permit = sem.clone().acquire_owned().await?;
            let evaluator = self.evaluator.clone();
            let source = self.source.clone();
            let limits = self.limits;
            let answer = answer.to_string();
            let mut tc = tc.clone();
            let h = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let outcome =
                    grade_testcase(evaluator.as_ref(), &source, &limits, &answer, &mut tc);
                (tc, outcome)
            });
            handles.push(h);
        }

        let mut results: Vec<TestcaseResult> = Vec::with_capacity(testcases.len());
        for (index, h) in handles.into_iter().enumerate() {
            let result = match h.await {
                Ok((tc, outcome)) => score(index, &tc, outcome),
                Err(e) => {
                    tracing::error!(
                        event = "sqlgrade.eval.join_failed",
                        testcase = index,
                        error = %e,
                        "grading task failed"
                    );
                    score(
                        index,
                        &testcases[index],
                        EvaluationOutcome::aborted(vec![format!("join error: {}", e)]),
                    )
                }
            };
            tracing::info!(
                event = "sqlgrade.eval.testcase",
                evaluator = self.evaluator.name(),
                testcase = index,
                passed = result.outcome.passed,
                awarded = result.awarded,
                "testcase graded"
            );
            results.push(result);
        }

        apply_hide_rest(&mut results, testcases);
        Ok(GradeReport { results })
    }
}
