//! Grading-time evaluation of a student answer against golden results.

use crate::evaluator::Evaluator;
use crate::model::{EvaluationOutcome, Testcase, TestcaseResult};
use crate::sandbox::{DatabaseSource, Sandbox, SandboxLimits};

/// Whitespace-insensitive at both ends, exact everywhere else.
pub fn compare(received: &str, expected: &str) -> bool {
    received.trim() == expected.trim()
}

/// Evaluates one testcase in a fresh sandbox.
///
/// Provisioning failures are reported as a failed outcome rather than an
/// error so a grading host never aborts on a single testcase.
pub fn grade_testcase(
    evaluator: &dyn Evaluator,
    source: &DatabaseSource,
    limits: &SandboxLimits,
    answer: &str,
    tc: &mut Testcase,
) -> EvaluationOutcome {
    let mut outcome = match Sandbox::acquire(source, limits) {
        Ok(sandbox) => evaluator.evaluate(sandbox, answer, tc),
        Err(e) => {
            tracing::error!(
                event = "sqlgrade.eval.sandbox_failed",
                error = %e,
                "failed to provision sandbox"
            );
            EvaluationOutcome::aborted(vec![format!("sandbox error: {:#}", e)])
        }
    };
    outcome.passed = outcome.passed && !outcome.aborted && compare(&outcome.received, &outcome.expected);
    outcome
}

/// Scores an outcome and resolves its visibility.
pub fn score(index: usize, tc: &Testcase, outcome: EvaluationOutcome) -> TestcaseResult {
    let passed = outcome.passed;
    TestcaseResult {
        index,
        awarded: if passed { tc.max_score } else { 0.0 },
        max_score: tc.max_score,
        hidden: tc.display.is_hidden(passed),
        additional_info: tc.additional_info.clone(),
        outcome,
    }
}

/// After a failing testcase flagged `hide_rest_if_fail`, every later result
/// is hidden.
pub fn apply_hide_rest(results: &mut [TestcaseResult], testcases: &[Testcase]) {
    let mut hiding = false;
    for r in results.iter_mut() {
        if hiding {
            r.hidden = true;
            continue;
        }
        let flagged = testcases.get(r.index).is_some_and(|t| t.hide_rest_if_fail);
        if flagged && !r.outcome.passed {
            hiding = true;
        }
    }
}
