// Engine main entry point
use clap::{Parser, Subcommand};
use engine::config::MonitorSettings;
use engine::data::build_chain;
use engine::error::{Disposition, EngineResult};
use engine::notify::build_notifier;
use engine::services::signal_service::helpers::local_now;
use engine::services::SignalService;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn, Instrument};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "engine", about = "MACD crossover and risk-gate monitor for exchange-listed funds")]
struct Cli {
    /// JSON settings file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log notifications instead of sending them
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Single-instrument MACD crossover check
    Macd,
    /// MACD crossover gated by volatility and correlation against the target fund
    Risk,
    /// Write the lagged ratio overlay CSV
    Overlay,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Macd => "macd",
            Command::Risk => "risk",
            Command::Overlay => "overlay",
        }
    }
}

fn load_settings(path: Option<&PathBuf>) -> EngineResult<MonitorSettings> {
    let mut settings = MonitorSettings::load(path.map(PathBuf::as_path))?;
    settings.apply_env(|key| std::env::var(key).ok());
    settings.validate()?;
    Ok(settings)
}

fn build_service(settings: MonitorSettings, dry_run: bool) -> EngineResult<SignalService> {
    let timeout = Duration::from_secs(settings.fetch.http_timeout_secs);
    let chain = build_chain(&settings.fetch)?;
    let notifier = build_notifier(&settings.notify, timeout, dry_run)?;
    info!(providers = chain.len(), notifier = notifier.name(), dry_run, "Engine ready");
    Ok(SignalService::new(settings, chain, notifier))
}

async fn execute(service: &SignalService, command: Command) -> EngineResult<()> {
    match command {
        Command::Macd => {
            let now = local_now(service.settings().risk.utc_offset_hours)?;
            let report = service.run_macd(now).await?;
            info!(state = report.state.label(), "MACD run complete");
        }
        Command::Risk => {
            let now = local_now(service.settings().risk.utc_offset_hours)?;
            let report = service.run_risk(now).await?;
            info!(state = report.state.label(), risk_triggered = report.risk_triggered(), "Risk run complete");
        }
        Command::Overlay => {
            let now = local_now(service.settings().overlay.utc_offset_hours)?;
            let report = service.build_overlay(now).await?;
            info!(rows = report.rows, path = %report.output_path.display(), "Overlay run complete");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id, command = cli.command.name());

    async {
        info!("Starting signal engine...");
        let service = match load_settings(cli.config.as_ref()).and_then(|s| build_service(s, cli.dry_run)) {
            Ok(service) => service,
            Err(e) => {
                error!(error = %e, "Engine setup failed");
                return;
            }
        };

        if let Err(e) = execute(&service, cli.command).await {
            match e.disposition() {
                Disposition::Abort => {
                    warn!(error = %e, "Run aborted: upstream data unavailable");
                    service.report_failure(cli.command.name(), &e).await;
                }
                Disposition::WarmUp => info!(reason = %e, "Not enough history yet, skipping evaluation"),
                Disposition::Fault => error!(error = %e, "Run failed"),
            }
        }
        info!("Signal engine finished");
    }
    .instrument(span)
    .await;
}
