// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/watchpost-rs

//! Watchpost - Surveillance Monitoring Backend
//!
//! Headless runner for the alert simulation engine plus one-shot operator
//! commands:
//! - `run`: simulate alerts until Ctrl+C
//! - `export`: write the filtered alert log to CSV / JSON lines
//! - `analyze`: describe a camera frame with the configured AI model
//! - `report`: generate a security report for a date range

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use watchpost::alerts::{paginate, PAGE_SIZE};
use watchpost::{build_info, AlertExporter, AlertQuery, BehaviourType, Config, Engine, EventBus, ExportFormat, VERSION};

/// Watchpost - Surveillance Monitoring Backend
#[derive(Parser, Debug)]
#[command(name = "watchpost")]
#[command(author = "bad-antics")]
#[command(version = VERSION)]
#[command(about = "Behavior alert simulation, statistics and AI scene analysis")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Seconds between simulation ticks
    #[arg(long)]
    tick_secs: Option<u64>,

    /// Seed for the alert simulator
    #[arg(long)]
    seed: Option<u64>,

    /// Data directory; relative export paths resolve under it
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the alert simulation (default)
    Run {
        /// Stop after this many ticks instead of waiting for Ctrl+C
        #[arg(long)]
        ticks: Option<u32>,
    },
    /// Export the alert log
    Export {
        /// Output directory (defaults to `export.path` under the data dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Case-insensitive match on person id, behavior or camera id
        #[arg(long)]
        search: Option<String>,
        /// Only this behavior (fall, lying_motionless, loitering)
        #[arg(long)]
        behaviour: Option<BehaviourType>,
        /// csv or jsonl (defaults to `export.format`)
        #[arg(long)]
        format: Option<ExportFormat>,
        /// Run this many simulation ticks before exporting
        #[arg(long, default_value = "0")]
        simulate: u32,
        /// Print this page of the filtered log
        #[arg(long)]
        page: Option<usize>,
    },
    /// Analyze an image file or URL
    Analyze {
        /// Path to a local image, or an http(s) / data: URL
        image: String,
    },
    /// Generate a security report for an inclusive date range
    Report {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,
    },
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);

    if let Some(Command::InitConfig { force }) = args.command {
        init_logging(&args, Level::INFO)?;
        if config_path.exists() && !force {
            bail!("{:?} already exists (use --force to overwrite)", config_path);
        }
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Config::default().save(&config_path)?;
        return Ok(());
    }

    // Load or create configuration
    let mut config = Config::load_or_create(&config_path)?;
    init_logging(&args, config.tracing_level())?;

    let build = build_info();
    info!("👁  Watchpost v{} ({}/{})", build.version, build.os, build.target);
    if !build.features.is_empty() {
        info!("   Features: {}", build.features.join(", "));
    }

    // Override with command line args
    if let Some(secs) = args.tick_secs {
        config.simulation.tick_interval_secs = secs;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Err(errors) = config.monitor.validate() {
        bail!("Invalid monitor configuration in {:?}: {}", config_path, errors);
    }

    info!("Configuration loaded from {:?}", config_path);

    let rt = tokio::runtime::Runtime::new()?;
    match args.command.unwrap_or(Command::Run { ticks: None }) {
        Command::Run { ticks } => rt.block_on(run_headless(config, ticks)),
        Command::Export {
            output,
            search,
            behaviour,
            format,
            simulate,
            page,
        } => {
            let mut query = AlertQuery::new();
            if let Some(term) = search {
                query = query.search(term);
            }
            if let Some(b) = behaviour {
                query = query.behaviour(b);
            }
            rt.block_on(export(config, query, output, format, simulate, page))
        }
        Command::Analyze { image } => rt.block_on(ai_commands::analyze(config, &image)),
        Command::Report { from, to } => rt.block_on(ai_commands::report(config, from, to)),
        Command::InitConfig { .. } => Ok(()),
    }
}

/// `--trace` / `--debug` win over the configured `log_level`
fn init_logging(args: &Args, configured: Level) -> Result<()> {
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        configured
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Run the simulation until Ctrl+C (or for a fixed number of ticks)
async fn run_headless(config: Config, ticks: Option<u32>) -> Result<()> {
    let tick = config.simulation.tick_interval();
    let bus = std::sync::Arc::new(EventBus::default());
    let mut engine = Engine::new(config, bus.clone()).with_configured_ai()?;
    let handle = engine.start().await?;

    let mut alerts = bus.subscribe_alerts();
    let counter = tokio::spawn(async move {
        let mut produced = 0u64;
        loop {
            match alerts.recv().await {
                Ok(_) => produced += 1,
                Err(broadcast::error::RecvError::Lagged(n)) => produced += n,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        produced
    });

    info!("🚀 Watchpost running in headless mode");
    match ticks {
        Some(n) => {
            info!("   Stopping after {} ticks", n);
            let wait = tick * n + Duration::from_millis(100);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
            }
        }
        None => {
            info!("   Press Ctrl+C to shutdown");
            tokio::signal::ctrl_c().await?;
            info!("Shutdown signal received, cleaning up...");
        }
    }

    let snapshot = handle.snapshot().await?;
    if engine.is_running() {
        info!("Stopping after {}s of uptime", engine.uptime());
    }
    engine.stop().await?;
    drop(engine);
    drop(bus);
    let produced = counter.await.unwrap_or(0);

    let stats = snapshot.stats;
    info!(
        "Produced {} alerts this session; {} total, {} today, average confidence {:.1}%",
        produced,
        stats.total_alerts,
        stats.alerts_today,
        stats.average_confidence * 100.0
    );
    for (behaviour, count) in &stats.behaviors_detected {
        info!("   {:<18} {}", behaviour.label(), count);
    }

    info!("Watchpost shutdown complete");
    Ok(())
}

async fn export(
    config: Config,
    query: AlertQuery,
    output: Option<PathBuf>,
    format: Option<ExportFormat>,
    simulate: u32,
    page: Option<usize>,
) -> Result<()> {
    let dir = output.unwrap_or_else(|| config.export_dir());
    let exporter = AlertExporter::new(format.unwrap_or(config.export.format));

    let mut engine = Engine::new(config, std::sync::Arc::new(EventBus::default()));
    let handle = engine.start().await?;
    for _ in 0..simulate {
        handle.tick().await?;
    }
    let snapshot = handle.snapshot().await?;
    engine.stop().await?;

    let view = snapshot.filtered(&query);
    if let Some(page) = page {
        let page = paginate(&view, page, PAGE_SIZE);
        info!("Page {} of {} ({} alerts)", page.page, page.total_pages, page.total_items);
        for alert in &page.items {
            info!(
                "   #{:<4} {} person {} on {} ({:.0}%) at {}",
                alert.id,
                alert.behaviour_type.label(),
                alert.person_id,
                alert.camera_id,
                alert.confidence * 100.0,
                alert.timestamp.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }

    let path = exporter.export_to_dir(&view, &dir)?;
    println!("{}", path.display());
    Ok(())
}

#[cfg(feature = "ai-client")]
mod ai_commands {
    use std::path::Path;

    use anyhow::Result;
    use chrono::{NaiveDate, Utc};
    use tracing::info;

    use watchpost::ai::{prepare_report_input, ImageRef, OpenAiClient, ReportGenerator, SceneAnalyzer};
    use watchpost::core::AppState;
    use watchpost::Config;

    fn client(config: &Config) -> Result<OpenAiClient> {
        let client = OpenAiClient::new(&config.ai)?;
        info!("Using model {}", client.model_name());
        Ok(client)
    }

    pub async fn analyze(config: Config, image: &str) -> Result<()> {
        let client = client(&config)?;
        let path = Path::new(image);
        let image = if path.exists() {
            ImageRef::from_file(path)?
        } else {
            ImageRef::new(image)
        };

        info!("Analyzing {}", image);
        let analysis = tokio::time::timeout(config.ai.timeout(), client.analyze_image(&image))
            .await
            .map_err(|_| anyhow::anyhow!("Analysis timed out after {:?}", config.ai.timeout()))??;

        println!("{}", serde_json::to_string_pretty(&analysis)?);
        Ok(())
    }

    pub async fn report(config: Config, from: NaiveDate, to: NaiveDate) -> Result<()> {
        let client = client(&config)?;
        let state = AppState::from_config(&config, Utc::now());
        let input = prepare_report_input(
            from,
            to,
            state.alerts.iter(),
            &state.stats.snapshot(),
            state.config.history(),
        )?;

        info!("Generating report for {} to {}", from, to);
        let report = tokio::time::timeout(config.ai.timeout(), client.generate_report(&input))
            .await
            .map_err(|_| anyhow::anyhow!("Report generation timed out after {:?}", config.ai.timeout()))??;

        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}

#[cfg(not(feature = "ai-client"))]
mod ai_commands {
    use anyhow::{bail, Result};
    use chrono::NaiveDate;

    use watchpost::Config;

    pub async fn analyze(_config: Config, _image: &str) -> Result<()> {
        bail!("AI client not enabled. Build with --features ai-client")
    }

    pub async fn report(_config: Config, _from: NaiveDate, _to: NaiveDate) -> Result<()> {
        bail!("AI client not enabled. Build with --features ai-client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_export_search_help_mentions_behavior() {
        let cmd = Args::command();
        let export = cmd.find_subcommand("export").unwrap();
        let search = export.get_arguments().find(|a| a.get_id() == "search").unwrap();
        assert!(search.get_help().unwrap().to_string().contains("behavior"));
    }

    #[test]
    fn test_parse_data_dir_and_export_page() {
        let args = Args::parse_from(["watchpost", "--data-dir", "/tmp/wp", "export", "--page", "2"]);
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/wp")));
        assert!(!args.debug && !args.trace);
        assert!(matches!(args.command, Some(Command::Export { page: Some(2), .. })));
    }
}
