use crate::TOOL_NAME;
use crate::run::RunOutcome;

pub fn render_text(outcome: &RunOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", TOOL_NAME, env!("CARGO_PKG_VERSION")));
    out.push_str(&format!(
        "Assessments: {} passed, {} failed\n",
        outcome.passed, outcome.failed
    ));
    if let Some(file) = &outcome.assessment_summary_file {
        out.push_str(&format!("Summary: {}\n", file.display()));
    }
    if let Some(archive) = &outcome.results_archive {
        out.push_str(&format!("Results archive: {}\n", archive.display()));
    }
    if let Some(err) = &outcome.manifest_error {
        out.push_str(&format!("Build summary rejected: {err}\n"));
    }
    if !outcome.error_msgs.is_empty() {
        out.push_str("Known tool bugs:\n");
        for line in outcome.error_msgs.lines() {
            out.push_str(&format!("  - {line}\n"));
        }
    }
    out.push_str(&format!("Exit code: {}\n", outcome.exit_code));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn lists_counts_and_known_bugs() {
        let outcome = RunOutcome {
            exit_code: 1,
            passed: 3,
            failed: 1,
            assessment_summary_file: Some(PathBuf::from("results/assessment_summary.xml")),
            results_archive: None,
            error_msgs: "results/swa_tool_stderr2.out:4: boom\n".into(),
            manifest_error: None,
        };

        let text = render_text(&outcome);
        assert!(text.contains("Assessments: 3 passed, 1 failed\n"));
        assert!(text.contains("Summary: results/assessment_summary.xml\n"));
        assert!(text.contains("  - results/swa_tool_stderr2.out:4: boom\n"));
        assert!(text.ends_with("Exit code: 1\n"));
        assert!(!text.contains("Results archive"));
    }
}
