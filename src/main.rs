use clap::Parser;
use intent_handler::config::HandlerConfig;
use intent_handler::infrastructure::telemetry::RecordingTelemetry;
use intent_handler::interfaces::csv::telemetry_writer::TelemetryWriter;
use intent_handler::interfaces::scenario::{Scenario, run_scenario};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario JSON file with the scripted processor responses
    scenario: PathBuf,

    /// Handler configuration JSON file (optional). Defaults apply otherwise.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the recorded telemetry to this CSV file
    #[arg(long)]
    telemetry: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => HandlerConfig::from_path(path).into_diagnostic()?,
        None => HandlerConfig::default(),
    };
    let scenario = Scenario::from_path(&cli.scenario).into_diagnostic()?;

    let telemetry = Arc::new(RecordingTelemetry::new());
    let report = run_scenario(scenario, config, telemetry.clone())
        .await
        .into_diagnostic()?;

    println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);

    if let Some(path) = cli.telemetry {
        let file = File::create(path).into_diagnostic()?;
        let mut writer = TelemetryWriter::new(file);
        writer.write_events(telemetry.events()).into_diagnostic()?;
    }

    Ok(())
}
