use sqlgrade_core::model::{AdditionalInfo, EvaluationOutcome};

/// Textual shortcut: is `token` present in `answer`, ignoring case?
///
/// Never touches a database.
pub fn check(
    token: &str,
    answer: &str,
    expected: &str,
    info: &mut AdditionalInfo,
) -> EvaluationOutcome {
    let token = token.to_lowercase();
    info.record_keyword(&token);

    let passed = answer.to_lowercase().contains(&token);
    let received = if passed {
        format!("keyword '{}' is present.", token)
    } else {
        format!("keyword '{}' not found in student answer.", token)
    };
    EvaluationOutcome {
        received,
        expected: expected.to_string(),
        passed,
        errors: Vec::new(),
        aborted: false,
    }
}
