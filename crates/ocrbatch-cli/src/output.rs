//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use ocrbatch_domain::{DocumentOutcome, RunReport, TaskState};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the per-document part of a report.
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Table => Ok(self.format_table(report)),
            OutputFormat::Quiet => Ok(self.format_quiet(report)),
        }
    }

    fn format_table(&self, report: &RunReport) -> String {
        if report.outcomes.is_empty() {
            return self.colorize("No documents processed.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Document", "State", "Output", "Detail"]);
        for outcome in &report.outcomes {
            builder.push_record([
                outcome.path.display().to_string(),
                outcome.state.to_string(),
                outcome
                    .output_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                detail(outcome),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// One `state<TAB>path` line per document that did not succeed.
    fn format_quiet(&self, report: &RunReport) -> String {
        report
            .outcomes
            .iter()
            .filter(|o| o.state != TaskState::Succeeded)
            .map(|o| format!("{}\t{}", o.state, o.path.display()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Final summary line, colored by overall result.
    pub fn summary(&self, report: &RunReport) -> String {
        let line = report.summary_line();
        if report.all_succeeded() {
            self.colorize(&line, "green")
        } else if report.succeeded == 0 {
            self.colorize(&line, "red")
        } else {
            self.colorize(&line, "yellow")
        }
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Error detail, or the job id of a timed-out document for later recovery.
fn detail(outcome: &DocumentOutcome) -> String {
    match (&outcome.error, outcome.state) {
        (Some(err), TaskState::TimedOut) => match &outcome.job_id {
            Some(job) => format!("{} (job {})", err, job),
            None => err.to_string(),
        },
        (Some(err), _) => err.to_string(),
        (None, _) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocrbatch_domain::{DocumentTask, ErrorKind, TaskError};
    use std::time::{Duration, Instant};
    use uuid::Uuid;

    fn sample_report() -> RunReport {
        let mut report = RunReport::new(Uuid::now_v7());

        let mut ok = DocumentTask::new("/in/a.pdf", "a.pdf");
        ok.mark_staged("p/a.pdf").unwrap();
        ok.mark_submitted("job-1", Instant::now() + Duration::from_secs(60)).unwrap();
        ok.mark_polling().unwrap();
        ok.succeed("/out/a.txt").unwrap();

        let mut slow = DocumentTask::new("/in/b.pdf", "b.pdf");
        slow.mark_staged("p/b.pdf").unwrap();
        slow.mark_submitted("job-2", Instant::now() + Duration::from_secs(60)).unwrap();
        slow.mark_polling().unwrap();
        slow.fail(TaskError::new(ErrorKind::TimeoutExceeded, "still running")).unwrap();

        let mut bad = DocumentTask::new("/in/c.pdf", "c.pdf");
        bad.fail(TaskError::new(ErrorKind::Stage, "Access Denied")).unwrap();

        for task in [ok, slow, bad] {
            report.record_discovered();
            report.record(task.to_outcome());
        }
        report.finalize();
        report
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_report(&sample_report()).unwrap();
        assert!(output.contains("Document"));
        assert!(output.contains("/out/a.txt"));
        assert!(output.contains("timed_out"));
        assert!(output.contains("job-2"));
        assert!(output.contains("stage_error: Access Denied"));
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_report(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["succeeded"], 1);
        assert_eq!(value["outcomes"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_quiet_format_lists_problems_only() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_report(&sample_report()).unwrap();
        assert_eq!(output, "timed_out\t/in/b.pdf\nfailed\t/in/c.pdf");
    }

    #[test]
    fn test_empty_report() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter
            .format_report(&RunReport::new(Uuid::now_v7()))
            .unwrap();
        assert!(output.contains("No documents processed"));
    }

    #[test]
    fn test_summary_without_color() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(
            formatter.summary(&sample_report()),
            "Processed 3 document(s): 1 succeeded, 1 failed, 1 timed out"
        );
        assert_eq!(formatter.warning("x"), "⚠ x");
    }
}
