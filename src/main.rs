//! Vertex - XDP firewall rule compiler
//!
//! Command-line front end over the local rule store.
//!
//! # Usage
//!
//! ```bash
//! vertex create '{"srcip": "192.0.2.1", "pps": 10}' 1h ssh-flood
//! vertex list                         # Show stored rules
//! vertex delete <id>                  # Remove a rule
//! vertex generate -o /etc/xdpfw/xdpfw.conf
//! vertex sweep                        # Evict expired rules once
//! vertex daemon                       # Keep evicting until Ctrl-C
//! ```

use chrono::{SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use vertex::config::{AppConfig, load_config};
use vertex::core::rule::RuleSummary;
use vertex::core::service::{CreateRule, RuleService};
use vertex::core::sweeper::Sweeper;
use vertex::shutdown::ShutdownSignals;
use vertex::store::FileStore;
use vertex::utils::write_atomic;
use vertex::validators::{parse_sweep_interval, validate_interface, validate_update_time};

#[derive(Parser)]
#[command(name = "vertex")]
#[command(about = "Manage time-limited XDP firewall rules", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Rule store file (default: rules.json in the data directory)
    #[arg(long, global = true, env = "VERTEX_STORE", value_name = "PATH")]
    store: Option<PathBuf>,

    /// Config file (default: config.json in the data directory)
    #[arg(long, global = true, env = "VERTEX_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Interface written to the generated config
    #[arg(long, global = true, env = "VERTEX_INTERFACE")]
    interface: Option<String>,

    /// Engine reload interval in seconds
    #[arg(long, global = true, env = "VERTEX_UPDATE_TIME", value_name = "SECONDS")]
    update_time: Option<u32>,

    /// Expiration sweep period, e.g. "2s"
    #[arg(
        long,
        global = true,
        env = "VERTEX_SWEEP_INTERVAL",
        value_name = "DURATION",
        value_parser = parse_sweep_interval
    )]
    sweep_interval: Option<Duration>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a rule
    Create {
        /// Filter spec as a JSON object, e.g. '{"srcip": "192.0.2.1"}'
        filter: String,
        /// Lifetime, e.g. "30s", "1h 30m"
        expire: String,
        /// Rule name
        name: String,
    },
    /// List stored rules
    #[command(visible_alias = "ls")]
    List,
    /// Delete a rule by id
    Delete { id: Uuid },
    /// Compile all rules into an xdpfw config
    Generate {
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Remove expired rules once and exit
    Sweep,
    /// Remove expired rules periodically until interrupted
    Daemon,
    /// Print version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to create Tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(handle_cli(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config file and layers command-line overrides on top.
async fn resolve_config(cli: &Cli) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = load_config(cli.config.as_deref()).await;

    if let Some(interface) = &cli.interface {
        config.interface = validate_interface(interface)?.to_string();
    }
    if let Some(update_time) = cli.update_time {
        config.update_time = validate_update_time(update_time)?;
    }
    if let Some(sweep_interval) = cli.sweep_interval {
        config.sweep_interval = sweep_interval;
    }
    if let Some(store) = &cli.store {
        config.store_path = Some(store.clone());
    }

    Ok(config)
}

fn open_store(config: &AppConfig) -> Result<Arc<FileStore>, Box<dyn std::error::Error>> {
    let store = match &config.store_path {
        Some(path) => FileStore::open(path.clone()),
        None => {
            vertex::utils::ensure_data_dir()?;
            FileStore::default_location()?
        }
    };
    tracing::debug!("Using rule store {}", store.path().display());
    Ok(Arc::new(store))
}

async fn handle_cli(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&cli).await?;
    let service = || -> Result<_, Box<dyn std::error::Error>> {
        Ok(RuleService::new(open_store(&config)?, config.compile_settings()))
    };

    match cli.command {
        Commands::Create {
            filter,
            expire,
            name,
        } => {
            let rule = service()?
                .create(CreateRule {
                    name,
                    filter,
                    expire,
                })
                .await?;
            println!("{}", rule.id);
        }
        Commands::List => {
            let rules = service()?.list().await?;
            print_table(&rules);
        }
        Commands::Delete { id } => {
            if service()?.delete(id).await? {
                println!("Deleted {id}");
            } else {
                println!("No rule with id {id}");
            }
        }
        Commands::Generate { output } => {
            let document = service()?.generate().await?;
            match output {
                Some(path) => {
                    write_atomic(&path, document.as_bytes()).await?;
                    info!("Wrote {}", path.display());
                }
                None => print!("{document}"),
            }
        }
        Commands::Sweep => {
            let sweeper = Sweeper::new(open_store(&config)?, config.sweep_period());
            let report = sweeper.sweep_once(Utc::now()).await;
            println!(
                "Scanned {}, expired {}, removed {}, failed {}",
                report.scanned, report.expired, report.removed, report.failed
            );
            if report.failed > 0 {
                return Err(format!("{} expired rules could not be removed", report.failed).into());
            }
        }
        Commands::Daemon => {
            let mut signals = ShutdownSignals::install()?;
            let sweeper = Sweeper::new(open_store(&config)?, config.sweep_period());
            info!(period = ?sweeper.period(), "Running until SIGINT or SIGTERM");
            let handle = sweeper.spawn();

            let received = signals.recv().await;
            if let Ok(name) = &received {
                info!("{name} received, stopping sweeper");
            }
            handle.stop().await;
            received?;
        }
        Commands::Version => println!("vertex {}", env!("CARGO_PKG_VERSION")),
    }

    Ok(())
}

/// Prints rules as an aligned table with a total in the ID header.
fn print_table(rules: &[RuleSummary]) {
    let id_header = format!("ID ({})", rules.len());
    let headers = [id_header.as_str(), "NAME", "EXPIRE", "CREATED", "FILTER"];

    let rows: Vec<[String; 5]> = rules
        .iter()
        .map(|rule| {
            [
                rule.id.to_string(),
                rule.name.clone(),
                rule.expire.clone(),
                rule.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                rule.filter.clone(),
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: [&str; 5]| {
        let mut line = String::new();
        for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
            if i + 1 == cells.len() {
                line.push_str(cell);
            } else {
                line.push_str(&format!("{cell:<width$}  "));
            }
        }
        line
    };

    println!("{}", render(headers));
    for row in &rows {
        println!("{}", render(row.each_ref().map(String::as_str)));
    }
}
