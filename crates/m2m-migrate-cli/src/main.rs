//! m2m-migrate CLI - copy external table definitions between Databricks workspaces.

use clap::{Parser, Subcommand};
use m2m_migrate::{Config, MigrateError, Orchestrator};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "m2m-migrate")]
#[command(about = "Copy external table definitions between Databricks workspaces")]
#[command(version)]
struct Cli {
    /// Path to an optional YAML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the external tables of the selected catalogs on the destination
    Run {
        /// Catalog to migrate (repeatable); replaces `catalogs` from the settings file
        #[arg(long = "catalog", value_name = "NAME")]
        catalogs: Vec<String>,

        /// Dry run: log rewritten statements without executing them
        #[arg(long)]
        dry_run: bool,
    },

    /// List the external tables that would be migrated
    List {
        /// Catalog to inspect (repeatable); replaces `catalogs` from the settings file
        #[arg(long = "catalog", value_name = "NAME")]
        catalogs: Vec<String>,
    },

    /// Test connectivity to both workspaces
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);
    info!("Starting migration tool");

    let mut config = Config::from_env()?;
    if let Some(ref path) = cli.config {
        config = config.with_settings_file(path)?;
        info!("Loaded settings from {:?}", path);
    }

    match cli.command {
        Commands::Run { catalogs, dry_run } => {
            if !catalogs.is_empty() {
                config.migration.catalogs = catalogs;
            }

            let orchestrator = Orchestrator::new(config)?;
            let result = orchestrator.run(dry_run).await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                let status_msg = if result.dry_run {
                    "Dry run completed!"
                } else {
                    "Migration completed!"
                };
                println!("\n{}", status_msg);
                println!("  Run ID: {}", result.run_id);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Tables: {}", result.tables_total);
                for table in &result.tables {
                    println!("    {}", table);
                }
            }
        }

        Commands::List { catalogs } => {
            if !catalogs.is_empty() {
                config.migration.catalogs = catalogs;
            }

            let orchestrator = Orchestrator::new(config)?;
            let tables = orchestrator.list_tables().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                println!("External tables: {}", tables.len());
                for table in &tables {
                    println!("  {}", table.qualified_name());
                }
            }
        }

        Commands::HealthCheck => {
            let orchestrator = Orchestrator::new(config)?;
            let result = orchestrator.health_check().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Source: {} ({}ms)",
                    if result.source_connected { "OK" } else { "FAILED" },
                    result.source_latency_ms
                );
                if let Some(ref err) = result.source_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Destination: {} ({}ms)",
                    if result.dest_connected { "OK" } else { "FAILED" },
                    result.dest_latency_ms
                );
                if let Some(ref err) = result.dest_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(MigrateError::HealthCheck(
                    [result.source_error, result.dest_error]
                        .into_iter()
                        .flatten()
                        .collect::<Vec<_>>()
                        .join("; "),
                ));
            }
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
