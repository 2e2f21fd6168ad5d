//! ocrbatch - Batch OCR of PDFs to text with AWS Textract.

use anyhow::Context;
use clap::Parser;
use ocrbatch_aws::{
    bucket_region, load_sdk_config, session_region, S3ObjectStore, TextractConfig,
    TextractService,
};
use ocrbatch_cli::error::{EXIT_PARTIAL, EXIT_USAGE};
use ocrbatch_cli::{logging, Cli, CliError, Config, Formatter};
use ocrbatch_domain::RunReport;
use ocrbatch_orchestrator::{Orchestrator, OrchestratorError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            e.downcast_ref::<CliError>()
                .map(CliError::exit_code)
                .unwrap_or(EXIT_PARTIAL)
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = Config::load(cli.config.as_deref())?;
    let resolved = config.resolve(&cli)?;

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    let sdk_config = load_sdk_config(resolved.region.as_deref()).await;
    let bucket = resolved.orchestrator.bucket.clone();
    if resolved.region.is_none() {
        warn_on_region_mismatch(&sdk_config, &bucket, &formatter).await;
    }

    let store = Arc::new(S3ObjectStore::new(&sdk_config, &bucket));
    let service = Arc::new(TextractService::new(
        &sdk_config,
        &bucket,
        TextractConfig::default(),
    ));
    let orchestrator =
        Orchestrator::new(resolved.orchestrator, store, service).map_err(CliError::from)?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling in-flight documents");
            interrupt.cancel();
        }
    });

    let (report, code) = match orchestrator.run(&cli.inputs, cancel).await {
        Ok(report) => {
            let code = if report.all_succeeded() { 0 } else { EXIT_PARTIAL };
            (report, code)
        }
        Err(OrchestratorError::AllDocumentsFailed { report }) => {
            eprintln!(
                "{}",
                formatter.error("Every document failed; check credentials and bucket access")
            );
            (*report, EXIT_PARTIAL)
        }
        Err(OrchestratorError::DiscoveryAborted { reason, report }) => {
            eprintln!("{}", formatter.error(&format!("Discovery error: {}", reason)));
            (*report, EXIT_USAGE)
        }
        Err(e) => return Err(CliError::from(e).into()),
    };

    if report.total_discovered == 0 && code != EXIT_USAGE {
        eprintln!("No PDFs found");
        return Ok(EXIT_USAGE);
    }

    if let Some(path) = &cli.report {
        write_report(&report, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    let body = formatter.format_report(&report)?;
    if !body.is_empty() {
        println!("{}", body);
    }
    println!("{}", formatter.summary(&report));
    Ok(code)
}

fn write_report(report: &RunReport, path: &std::path::Path) -> ocrbatch_cli::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}

/// Hint when the bucket lives outside the session region; lookup failures are ignored.
async fn warn_on_region_mismatch(
    sdk_config: &ocrbatch_aws::SdkConfig,
    bucket: &str,
    formatter: &Formatter,
) {
    let Some(session) = session_region(sdk_config) else {
        return;
    };
    match bucket_region(sdk_config, bucket).await {
        Ok(region) if region != session => {
            eprintln!(
                "{}",
                formatter.warning(&format!(
                    "session region {} differs from bucket region {}. Consider --region {}.",
                    session, region, region
                ))
            );
        }
        Ok(_) => {}
        Err(e) => tracing::debug!(error = %e, "Bucket region lookup failed"),
    }
}
