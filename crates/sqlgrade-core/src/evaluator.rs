use crate::model::{EvaluationOutcome, QuestionKind, Testcase};
use crate::render::RenderOptions;
use crate::sandbox::Sandbox;

/// One testcase family (DDL or DQL).
///
/// Implementations take ownership of the sandbox and must release it before
/// returning, whatever the outcome. They depend on nothing but the sandbox,
/// the answer text and the testcase, so the same code runs at authoring time
/// and inside a grading host.
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> QuestionKind;

    /// Rendering applied to result sets; part of the golden-result contract.
    fn render(&self) -> &RenderOptions;

    /// Evaluates `answer` against `tc`. Only `tc.additional_info` is written.
    fn evaluate(&self, sandbox: Sandbox, answer: &str, tc: &mut Testcase) -> EvaluationOutcome;
}

/// Releases `sandbox` and hands back `outcome`. Release failures are logged.
pub fn finish(sandbox: Sandbox, outcome: EvaluationOutcome) -> EvaluationOutcome {
    if let Err(e) = sandbox.release() {
        tracing::warn!(
            event = "sqlgrade.sandbox.release_failed",
            error = %e,
            "sandbox release failed: {:#}", e
        );
    }
    outcome
}
