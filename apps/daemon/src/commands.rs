//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::{info, warn};

use configforge_core::{BuildSupervisor, run_build};
use configforge_inventory::HttpAssetSource;
use configforge_report::ReportSender;
use configforge_shared::{AppConfig, Severity, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// configforge — build per-device configuration artifacts from inventory.
#[derive(Parser)]
#[command(
    name = "configforge",
    version,
    about = "Convert source-of-truth inventory into validated per-device configuration artifacts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to an alternate config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the build loop until shutdown.
    Run {
        /// Override the inter-cycle interval, in seconds.
        #[arg(long)]
        interval: Option<u64>,

        /// Abort any cycle in which at least one device fails to build.
        #[arg(long)]
        all_devices_must_build: bool,
    },

    /// Run one build cycle and exit non-zero if it fails.
    Build {
        /// Abort if at least one device fails to build.
        #[arg(long)]
        all_devices_must_build: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Create a default config file.
    Init,
    /// Print the config file path.
    Path,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing from the CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::EnvFilter;

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match cli.log_format {
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command routing
// ---------------------------------------------------------------------------

/// Dispatch the parsed CLI to its command handler.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Run {
            interval,
            all_devices_must_build,
        } => run_loop(config, interval, all_devices_must_build).await,
        Command::Build {
            all_devices_must_build,
        } => build_once(config, all_devices_must_build).await,
        Command::Config { action } => handle_config(action),
    }
}

/// `configforge run` — the supervisor loop with signal wiring.
async fn run_loop(
    mut config: AppConfig,
    interval: Option<u64>,
    all_devices_must_build: bool,
) -> Result<()> {
    if let Some(secs) = interval {
        config.build.interval_secs = secs;
    }
    if all_devices_must_build {
        config.build.all_devices_must_build = true;
    }

    let source = HttpAssetSource::new(&config.source)?;
    let supervisor = Arc::new(BuildSupervisor::new(source, config.build.clone()));

    info!(
        interval_secs = config.build.interval_secs,
        all_devices_must_build = config.build.all_devices_must_build,
        source = %config.source.base_url,
        "starting build loop"
    );

    let (trigger_tx, trigger_rx) = mpsc::channel::<()>(4);

    // SIGHUP requests an immediate build.
    #[cfg(unix)]
    let hup_task = tokio::spawn({
        let trigger_tx = trigger_tx.clone();
        async move {
            use tokio::signal::unix::{SignalKind, signal};
            let Ok(mut hup) = signal(SignalKind::hangup()) else {
                return;
            };
            while hup.recv().await.is_some() {
                info!("SIGHUP received, requesting build");
                if trigger_tx.send(()).await.is_err() {
                    break;
                }
            }
        }
    });

    // SIGINT/SIGTERM close the trigger channel: the loop finishes its
    // in-flight cycle and stops.
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received, finishing in-flight cycle");
        #[cfg(unix)]
        hup_task.abort();
        drop(trigger_tx);
    });

    supervisor.run(trigger_rx).await;
    info!("build loop stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// `configforge build` — one cycle, human-readable summary, exit code.
async fn build_once(config: AppConfig, all_devices_must_build: bool) -> Result<()> {
    let strict = all_devices_must_build || config.build.all_devices_must_build;
    let source = HttpAssetSource::new(&config.source)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("valid spinner template"),
    );
    spinner.set_message("building configuration artifacts");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let (tx, mut rx) = mpsc::channel::<configforge_shared::ReportMessage>(
        config.build.report_channel_capacity.max(1),
    );
    let printer = tokio::spawn(async move {
        let mut warnings = 0u32;
        let mut errors = 0u32;
        while let Some(msg) = rx.recv().await {
            match msg.severity {
                Severity::Error => {
                    errors += 1;
                    eprintln!("error: {}", msg.text);
                }
                Severity::Warning => {
                    warnings += 1;
                    eprintln!("warning: {}", msg.text);
                }
                Severity::Info => {}
            }
        }
        (warnings, errors)
    });

    let sender = ReportSender::new(tx);
    let (stats, result) = run_build(&source, &sender, strict).await;
    drop(sender);

    let (warnings, errors) = printer.await?;
    spinner.finish_and_clear();

    match result {
        Ok(_) => {
            println!(
                "built {} device(s) in {:.2}s ({} warning(s), {} error(s))",
                stats.built_devices,
                stats.total_duration.as_secs_f64(),
                warnings,
                errors
            );
            println!(
                "fetch {:.2}s, precompute {:.2}s, compute {:.2}s",
                stats.fetch_duration.as_secs_f64(),
                stats.precompute_duration.as_secs_f64(),
                stats.compute_duration.as_secs_f64()
            );
            Ok(())
        }
        Err(err) => Err(eyre!(
            "build failed after {} device(s): {err}",
            stats.built_devices
        )),
    }
}

/// `configforge config` subcommands.
fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = configforge_shared::init_config()?;
            println!("created {}", path.display());
            Ok(())
        }
        ConfigAction::Path => {
            let path = configforge_shared::config_file_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
