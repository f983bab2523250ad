use crate::model::{GradeReport, TestcaseResult};

/// One line per testcase; hidden testcases show only their score.
pub fn format_line(r: &TestcaseResult) -> String {
    let label = format!("testcase {}", r.index);
    let score = format!("{:.2}/{:.2}", r.awarded, r.max_score);
    if r.hidden {
        let icon = if r.outcome.passed { "✅" } else { "❌" };
        return format!("{} {:<20} {}  (hidden)", icon, label, score);
    }
    if r.outcome.aborted {
        return format!(
            "💥 {:<20} {}  ERROR: {}",
            label,
            score,
            r.outcome.errors.join("; ")
        );
    }
    if r.outcome.passed {
        format!("✅ {:<20} {}", label, score)
    } else {
        format!("❌ {:<20} {}", label, score)
    }
}

pub fn print_summary(report: &GradeReport) {
    eprintln!("\nGraded {} testcases...", report.results.len());

    let mut pass = 0;
    let mut fail = 0;
    let mut error = 0;
    for r in &report.results {
        eprintln!("{}", format_line(r));
        if r.outcome.passed {
            pass += 1;
        } else if r.outcome.aborted {
            error += 1;
        } else {
            fail += 1;
        }
        if r.hidden || r.outcome.passed {
            continue;
        }
        if !r.outcome.aborted {
            for e in &r.outcome.errors {
                eprintln!("      → {}", e);
            }
        }
        if let Some(kw) = &r.additional_info.keyword_present {
            eprintln!("      keyword: {}", kw);
        }
        if !r.additional_info.flex_enum_tables.is_empty() {
            let tables: Vec<&str> = r
                .additional_info
                .flex_enum_tables
                .iter()
                .map(|s| s.as_str())
                .collect();
            eprintln!("      flexible tables: {}", tables.join(", "));
        }
    }

    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!(
        "Summary: {} passed, {} failed, {} error  score {:.2}/{:.2}",
        pass,
        fail,
        error,
        report.awarded(),
        report.max_score()
    );
}
