use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use posture_monitor::http::{run_http_server, HttpState};
use posture_monitor::posture::{self, MobilityLevel, Thresholds};
use posture_monitor::{init_logging, AppConfig, AppContext};
use tokio::sync::oneshot;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("posture-monitor error: {err:?}");
            ExitCode::from(1)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "posture-monitor",
    about = "Posture monitoring backend for stroke-rehabilitation wearables"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn execute(self) -> Result<()> {
        match self.command {
            Command::Serve(args) => serve_command(args),
            Command::Evaluate(args) => evaluate_command(args),
            Command::Recommend(args) => recommend_command(args),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server backed by an in-memory record store.
    Serve(ServeArgs),
    /// Evaluate one sensor frame and print the posture status as JSON.
    Evaluate(EvaluateArgs),
    /// Print recommended thresholds for a patient assessment as JSON.
    Recommend(RecommendArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// JSON config file (defaults to $POSTURE_MONITOR_CONFIG or assets/monitor_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Listen address, overriding the config file and $POSTURE_MONITOR_ADDR
    #[arg(long)]
    addr: Option<SocketAddr>,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    #[arg(long, allow_negative_numbers = true)]
    pitch: f64,
    #[arg(long, allow_negative_numbers = true)]
    roll: f64,
    /// Left pressure sensor reading
    #[arg(long, default_value_t = 0.0)]
    left: f64,
    /// Right pressure sensor reading
    #[arg(long, default_value_t = 0.0)]
    right: f64,
    #[arg(long, default_value_t = Thresholds::DEFAULT.warning)]
    warning: f64,
    #[arg(long, default_value_t = Thresholds::DEFAULT.danger)]
    danger: f64,
}

#[derive(Args, Debug)]
struct RecommendArgs {
    /// Stroke severity, 1 (mild) to 5 (severe)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    severity: Option<u8>,
    #[arg(long, value_enum)]
    mobility: Option<MobilityArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MobilityArg {
    Wheelchair,
    Walker,
    Cane,
    Independent,
}

impl From<MobilityArg> for MobilityLevel {
    fn from(value: MobilityArg) -> Self {
        match value {
            MobilityArg::Wheelchair => MobilityLevel::Wheelchair,
            MobilityArg::Walker => MobilityLevel::Walker,
            MobilityArg::Cane => MobilityLevel::Cane,
            MobilityArg::Independent => MobilityLevel::Independent,
        }
    }
}

fn serve_command(args: ServeArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };
    init_logging(&config.logging.level);

    let addr = args.addr.unwrap_or_else(|| config.server.socket_addr());
    let context = AppContext::in_memory(config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    log::info!("[Serve] Ctrl-C received, shutting down");
                    let _ = shutdown_tx.send(());
                }
                Err(err) => {
                    log::warn!("[Serve] Ctrl-C handler unavailable: {}", err);
                    // Holding the sender keeps the server running.
                    std::future::pending::<()>().await;
                    drop(shutdown_tx);
                }
            }
        });

        run_http_server(HttpState::new(context), addr, shutdown_rx).await
    })
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    let thresholds = Thresholds::new(args.warning, args.danger);
    thresholds.validate()?;

    let status = posture::evaluate(args.pitch, args.roll, args.left, args.right, &thresholds);
    println!(
        "{}",
        serde_json::to_string_pretty(&status).context("serializing posture status")?
    );
    Ok(())
}

fn recommend_command(args: RecommendArgs) -> Result<()> {
    let thresholds = posture::recommend(args.severity, args.mobility.map(MobilityLevel::from));
    println!(
        "{}",
        serde_json::to_string_pretty(&thresholds).context("serializing thresholds")?
    );
    Ok(())
}
