//! # Pilot Configuration Validator
//!
//! Command-line tool for validating `pilot.yaml` across environments before a
//! night is started.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pilot_core::config::{ConfigManager, PilotConfig};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate telescope pilot configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment whose override section is applied (development, test, production)
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Configuration directory containing pilot.yaml (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate every section
    All,

    /// Validate one section (scheduler, scoring, autofocus, spectroscopy)
    Component { name: String },

    /// Print the resolved configuration as YAML
    Show,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::All) | None => validate_all_config(&cli),
        Some(Commands::Component { name }) => validate_component(&cli, name),
        Some(Commands::Show) => show_config(&cli),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> anyhow::Result<PilotConfig> {
    let manager =
        ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &cli.environment)
            .with_context(|| format!("loading environment '{}'", cli.environment))?;
    println!("Loaded {}", manager.config_file().display());
    Ok(manager.config().clone())
}

fn validate_all_config(cli: &Cli) -> anyhow::Result<()> {
    println!("Validating pilot configuration");
    println!("Environment: {}", cli.environment);
    println!();

    let config = load(cli)?;
    report_scheduler(&config);
    report_scoring(&config);
    report_autofocus(&config);
    report_spectroscopy(&config);

    println!("\nAll configuration validation checks passed");
    Ok(())
}

fn validate_component(cli: &Cli, component_name: &str) -> anyhow::Result<()> {
    let config = load(cli)?;
    match component_name.to_lowercase().as_str() {
        "scheduler" => report_scheduler(&config),
        "scoring" => report_scoring(&config),
        "autofocus" => report_autofocus(&config),
        "spectroscopy" | "spec" => report_spectroscopy(&config),
        _ => anyhow::bail!("Unknown component: {component_name}"),
    }
    println!("Component '{component_name}' validation passed");
    Ok(())
}

fn show_config(cli: &Cli) -> anyhow::Result<()> {
    let config = load(cli)?;
    println!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

fn report_scheduler(config: &PilotConfig) {
    let scheduler = &config.scheduler;
    println!("Scheduler:");
    println!("   window poll: {:?}", scheduler.window_poll_interval());
    println!("   loop interval: {:?}", scheduler.loop_interval());
    println!("   drain poll: {:?}", scheduler.drain_poll_interval());
    println!("   resume stagger: {:?}", scheduler.resume_stagger());
    println!("   retract ToO on shutdown: {}", scheduler.retract_too_on_shutdown);
}

fn report_scoring(config: &PilotConfig) {
    let scoring = &config.scoring;
    println!("Scoring:");
    println!(
        "   altitude band: [{}, {}] deg",
        scoring.min_altitude, scoring.max_altitude
    );
    println!("   min moon separation: {} deg", scoring.min_moon_separation);
    println!(
        "   weights: altitude {} / priority {}",
        scoring.weight_altitude, scoring.weight_priority
    );
}

fn report_autofocus(config: &PilotConfig) {
    let autofocus = &config.autofocus;
    println!("Autofocus:");
    println!(
        "   before start: {}, on filter change: {}, when elapsed: {} ({} min)",
        autofocus.before_start,
        autofocus.when_filter_change,
        autofocus.when_elapsed,
        autofocus.elapsed_duration_min
    );
    println!(
        "   use history: {} ({} min)",
        autofocus.use_history, autofocus.history_duration_min
    );
}

fn report_spectroscopy(config: &PilotConfig) {
    println!("Spectroscopy:");
    if config.spectroscopy.modes.is_empty() {
        println!("   no spectroscopic modes configured");
    }
    for (mode, telescopes) in &config.spectroscopy.modes {
        let filters: usize = telescopes.values().map(Vec::len).sum();
        println!(
            "   {mode}: {} telescopes, {filters} filters",
            telescopes.len()
        );
    }
}
