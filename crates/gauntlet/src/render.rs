//! Text rendering of run reports.
//!
//! The aggregator produces data; this module turns it into the summary
//! printed on stdout. The JSON form comes straight from serde on
//! [`RunReport`].

use gauntlet_core::OutcomeKind;
use gauntlet_harness::RunReport;

const RULE: &str =
    "================================================================================";
const THIN_RULE: &str =
    "--------------------------------------------------------------------------------";

fn status_mark(kind: OutcomeKind) -> char {
    match kind {
        OutcomeKind::Passed => '✓',
        OutcomeKind::Failed => '✗',
        OutcomeKind::Skipped => '○',
        OutcomeKind::TimedOut => '⏱',
        OutcomeKind::Errored => '!',
    }
}

/// Renders the human-readable run summary.
#[must_use]
pub fn render_text(report: &RunReport) -> String {
    let mut lines = Vec::new();
    lines.push(RULE.to_string());
    lines.push("Gauntlet Compatibility Report".to_string());
    lines.push(RULE.to_string());

    let totals = &report.totals;
    lines.push(format!("Total:     {}", totals.total()));
    lines.push(format!(
        "Passed:    {} ({:.1}% of executed)",
        totals.passed,
        report.pass_rate * 100.0
    ));
    lines.push(format!("Failed:    {}", totals.failed));
    lines.push(format!("Skipped:   {} (feature not supported)", totals.skipped));
    lines.push(format!("Timed out: {}", totals.timed_out));
    lines.push(format!("Errored:   {} (infrastructure)", totals.errored));
    lines.push(format!("Duration:  {:.3}s", report.wall_ms as f64 / 1000.0));
    if report.cleanup_warnings > 0 {
        lines.push(format!("Cleanup warnings: {}", report.cleanup_warnings));
    }

    if !report.categories.is_empty() {
        lines.push(THIN_RULE.to_string());
        lines.push("By category:".to_string());
        for summary in &report.categories {
            let c = &summary.counts;
            lines.push(format!(
                "  {:<12} {:>3} passed  {:>3} failed  {:>3} skipped  {:>3} timed out  {:>3} errored",
                summary.category, c.passed, c.failed, c.skipped, c.timed_out, c.errored
            ));
        }
    }

    let mut detail_lines = Vec::new();
    for result in report.non_passed() {
        let kind = result.outcome.kind();
        let mut line = format!(
            "  [{}] {} - {} [{:.3}s]",
            status_mark(kind),
            result.id,
            kind,
            result.duration_ms as f64 / 1000.0
        );
        if let Some(detail) = result.outcome.detail() {
            line.push_str(&format!("\n      {detail}"));
        }
        detail_lines.push(line);
    }
    if !detail_lines.is_empty() {
        lines.push(THIN_RULE.to_string());
        lines.push("Non-passed tests:".to_string());
        lines.append(&mut detail_lines);
    }

    lines.push(RULE.to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use gauntlet_core::{Category, Outcome, TestId};
    use gauntlet_harness::{ReportSink, TestResult};

    use super::*;

    fn sample_report() -> RunReport {
        let sink = ReportSink::new();
        sink.record(TestResult {
            id: TestId::from("object/put_get_roundtrip"),
            category: Category::Object,
            outcome: Outcome::Passed,
            duration_ms: 42,
            cleanup_warnings: 0,
        });
        sink.record(TestResult {
            id: TestId::from("versioning/distinct_versions"),
            category: Category::Versioning,
            outcome: Outcome::Skipped { code: "NotImplemented".into() },
            duration_ms: 7,
            cleanup_warnings: 0,
        });
        sink.record(TestResult {
            id: TestId::from("multipart/basic_upload"),
            category: Category::Multipart,
            outcome: Outcome::Failed { detail: "assembled object length: expected 3, got 0".into() },
            duration_ms: 913,
            cleanup_warnings: 1,
        });
        sink.finalize()
    }

    #[test]
    fn text_report_carries_counts_and_details() {
        let rendered = render_text(&sample_report());

        assert!(rendered.contains("Total:     3"));
        assert!(rendered.contains("Passed:    1"));
        assert!(rendered.contains("Skipped:   1"));
        assert!(rendered.contains("Cleanup warnings: 1"));

        // Non-passed tests are listed with enough detail to diagnose
        // without re-running.
        assert!(rendered.contains("multipart/basic_upload"));
        assert!(rendered.contains("expected 3, got 0"));
        assert!(rendered.contains("NotImplemented"));

        // Passed tests are not in the detail section.
        let detail_section = rendered.split("Non-passed tests:").nth(1).unwrap();
        assert!(!detail_section.contains("object/put_get_roundtrip"));
    }

    #[test]
    fn clean_report_has_no_detail_section() {
        let sink = ReportSink::new();
        sink.record(TestResult {
            id: TestId::from("object/ok"),
            category: Category::Object,
            outcome: Outcome::Passed,
            duration_ms: 1,
            cleanup_warnings: 0,
        });
        let rendered = render_text(&sink.finalize());
        assert!(!rendered.contains("Non-passed tests:"));
    }
}
