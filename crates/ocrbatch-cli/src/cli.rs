//! Command-line argument definitions.

use crate::config::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// ocrbatch - Batch OCR PDFs to text using AWS Textract.
#[derive(Debug, Parser)]
#[command(name = "ocrbatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Files or directories to process
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory to write .txt outputs
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// S3 bucket for Textract inputs
    #[arg(long, env = "OCRBATCH_BUCKET")]
    pub bucket: Option<String>,

    /// S3 key prefix for uploads
    #[arg(long)]
    pub prefix: Option<String>,

    /// AWS region (uses env/config if omitted)
    #[arg(long)]
    pub region: Option<String>,

    /// Concurrent jobs [default: 4]
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Do not recurse into subdirectories
    #[arg(long)]
    pub no_recursive: bool,

    /// Polling interval in seconds [default: 5]
    #[arg(long)]
    pub poll_seconds: Option<f64>,

    /// Per-document timeout in seconds [default: 1800]
    #[arg(long)]
    pub timeout_seconds: Option<f64>,

    /// Keep uploaded S3 objects (default deletes)
    #[arg(long)]
    pub keep_uploaded: bool,

    /// Submission attempts while Textract throttles [default: 3]
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Write the final report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Output format for the final report
    #[arg(short, long, value_enum)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Configuration file path [default: ~/.ocrbatch/config.toml]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (one line per document)
    Quiet,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => OutputFormat::Table,
            CliFormat::Json => OutputFormat::Json,
            CliFormat::Quiet => OutputFormat::Quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ocrbatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_minimal_invocation() {
        let cli = parse(&["--bucket", "b", "scans"]);
        assert_eq!(cli.inputs, vec![PathBuf::from("scans")]);
        assert_eq!(cli.bucket.as_deref(), Some("b"));
        assert!(cli.jobs.is_none());
        assert!(!cli.no_recursive);
        assert!(!cli.keep_uploaded);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_all_flags() {
        let cli = parse(&[
            "-o", "txt", "--bucket", "b", "--prefix", "p", "--region", "eu-west-1",
            "-j", "8", "--no-recursive", "--poll-seconds", "2.5", "--timeout-seconds", "60",
            "--keep-uploaded", "--max-attempts", "5", "--report", "r.json", "-f", "json",
            "-vv", "a.pdf", "dir",
        ]);
        assert_eq!(cli.output_dir, Some(PathBuf::from("txt")));
        assert_eq!(cli.jobs, Some(8));
        assert!(cli.no_recursive);
        assert_eq!(cli.poll_seconds, Some(2.5));
        assert_eq!(cli.timeout_seconds, Some(60.0));
        assert!(cli.keep_uploaded);
        assert_eq!(cli.max_attempts, Some(5));
        assert_eq!(cli.format, Some(CliFormat::Json));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.inputs.len(), 2);
    }

    #[test]
    fn test_inputs_are_required() {
        assert!(Cli::try_parse_from(["ocrbatch", "--bucket", "b"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["ocrbatch", "-v", "-q", "x"]).is_err());
    }
}
