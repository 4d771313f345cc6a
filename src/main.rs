//! booking-engine CLI entry point.
//!
//! Checks and books appointments against an in-memory calendar seeded from
//! a busy file, using the tenants and agents from the engine config.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use booking_engine::booking::config::LoggingConfig;
use booking_engine::cli::{clock_from, expand_path, load_busy_file, memory_registry, seeded_calendar};
use booking_engine::directory::StaticDirectory;
use booking_engine::{
    Attendee, BookingOrchestrator, BookingOutcome, BookingRequest, EngineConfig, TenantDirectory,
};

/// Availability resolution and booking for appointment scheduling.
#[derive(Parser)]
#[command(name = "booking-engine")]
#[command(about = "Check availability and book appointments against agent calendars.")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, env = "BOOKING_ENGINE_CONFIG", default_value = "~/.booking-engine/config.json")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Target {
    /// Tenant id
    tenant: String,

    /// Requested start (ISO 8601; no offset means the agent's timezone)
    start: String,

    /// Requested end
    end: String,

    /// Agent id (defaults to the tenant's default agent)
    #[arg(short, long)]
    agent: Option<String>,

    /// JSON file listing existing bookings as {"start", "end"} objects
    #[arg(short, long)]
    busy: Option<PathBuf>,

    /// Pretend the current time is this RFC 3339 instant
    #[arg(long)]
    now: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a window is bookable and print the verdict
    Check {
        #[command(flatten)]
        target: Target,
    },

    /// Book a window and print the outcome
    Book {
        #[command(flatten)]
        target: Target,

        /// Attendee name
        #[arg(long)]
        name: String,

        /// Attendee email
        #[arg(long)]
        email: Option<String>,

        /// Attendee phone
        #[arg(long)]
        phone: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current config
    Show,

    /// Validate config
    Validate,

    /// Write a starter config
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = expand_path(&cli.config);

    let logging = if config_path.exists() {
        EngineConfig::load(&config_path)
            .map(|config| config.logging)
            .unwrap_or_default()
    } else {
        LoggingConfig::default()
    };
    init_logging(&logging, cli.verbose);

    match cli.command {
        Commands::Check { target } => {
            let config = load_config(&config_path)?;
            let engine = build_engine(&config, &target).await?;
            let result = engine
                .check_availability(&target.tenant, target.agent.as_deref(), &target.start, &target.end)
                .await;
            let json = match result {
                Ok(verdict) => serde_json::to_string_pretty(&verdict)?,
                Err(rejection) => serde_json::to_string_pretty(&BookingOutcome::Rejected(rejection))?,
            };
            println!("{}", json);
        }

        Commands::Book {
            target,
            name,
            email,
            phone,
        } => {
            let config = load_config(&config_path)?;
            let engine = build_engine(&config, &target).await?;

            let mut attendee = Attendee::new(&name);
            attendee.email = email;
            attendee.phone = phone;
            let mut request = BookingRequest::new(&target.tenant, &target.start, &target.end, attendee);
            request.agent_id = target.agent.clone();

            let outcome = engine.book(&request).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Commands::Config { action } => match action {
            ConfigCommands::Show => {
                let config = load_config(&config_path)?;
                println!("Config path: {}", config_path.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigCommands::Validate => {
                let config = load_config(&config_path)?;
                config.validate().context("configuration is invalid")?;
                let agents: usize = config.tenants.iter().map(|t| t.agents.len()).sum();
                println!(
                    "✓ {} is valid ({} tenants, {} agents)",
                    config_path.display(),
                    config.tenants.len(),
                    agents
                );
            }
            ConfigCommands::Init { force } => {
                if config_path.exists() && !force {
                    bail!(
                        "{} already exists; pass --force to overwrite",
                        config_path.display()
                    );
                }
                if let Some(parent) = config_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                EngineConfig::for_testing().save(&config_path)?;
                println!("Wrote starter config to {}", config_path.display());
            }
        },
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if logging.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: &Path) -> anyhow::Result<EngineConfig> {
    EngineConfig::load(path).with_context(|| format!("failed to load {}", path.display()))
}

async fn build_engine(config: &EngineConfig, target: &Target) -> anyhow::Result<BookingOrchestrator> {
    config.validate().context("configuration is invalid")?;

    let directory = StaticDirectory::from_config(config)?;
    let profile = directory
        .resolve_agent(&target.tenant, target.agent.as_deref())
        .await?;

    let entries = match &target.busy {
        Some(path) => load_busy_file(path)?,
        None => Vec::new(),
    };
    let memory = Arc::new(seeded_calendar(&entries, &profile.calendar, profile.timezone).await?);
    let clock = clock_from(target.now.as_deref())?;

    Ok(BookingOrchestrator::from_config(
        config,
        memory_registry(memory),
        clock,
    )?)
}
