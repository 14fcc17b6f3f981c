//! Leaseq CLI - local administration of a queue database

mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use config::EngineArgs;
use leaseq_core::application::QueueService;
use leaseq_core::domain::MessageId;
use leaseq_core::port::time_provider::SystemTimeProvider;
use leaseq_infra_sqlite::{create_pool, run_migrations, SqliteMessageStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "leaseq")]
#[command(about = "Durable message queues with visibility-timeout leases", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    engine: EngineArgs,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a queue (no-op if it exists)
    Create { queue: String },

    /// Drop a queue and its archive
    Drop { queue: String },

    /// List queues
    List,

    /// Send one message
    Send {
        queue: String,

        /// Message payload (JSON in strict mode)
        payload: String,

        /// Seconds before the message becomes visible
        #[arg(short, long, allow_negative_numbers = true)]
        delay: Option<i64>,
    },

    /// Send several messages atomically
    SendBatch {
        queue: String,

        #[arg(required = true, num_args = 1..)]
        payloads: Vec<String>,

        #[arg(short, long, allow_negative_numbers = true)]
        delay: Option<i64>,
    },

    /// Lease visible messages
    Read {
        queue: String,

        /// Lease length in seconds
        #[arg(long, allow_negative_numbers = true)]
        vt: Option<i64>,

        /// Maximum number of messages
        #[arg(short = 'n', long, default_value = "1", allow_negative_numbers = true)]
        qty: i64,
    },

    /// Read and delete one visible message
    Pop { queue: String },

    /// Move a message's visibility to now + VT seconds
    SetVt {
        queue: String,
        id: MessageId,
        #[arg(allow_negative_numbers = true)]
        vt: i64,
    },

    /// Delete messages by id
    Delete {
        queue: String,
        #[arg(required = true, num_args = 1..)]
        ids: Vec<MessageId>,
    },

    /// Move messages to the archive
    Archive {
        queue: String,
        #[arg(required = true, num_args = 1..)]
        ids: Vec<MessageId>,
    },

    /// Show archived messages
    Archived {
        queue: String,
        #[arg(short = 'n', long, default_value = "20", allow_negative_numbers = true)]
        limit: i64,
    },

    /// Show queue statistics
    Metrics { queue: String },
}

fn init_logging() -> Result<()> {
    let log_format = std::env::var("LEASEQ_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("leaseq=info"))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

async fn open_service(engine: &EngineArgs) -> Result<QueueService> {
    let config = engine.engine_config();
    config.validate().context("Invalid engine configuration")?;

    if let Some(dir) = engine.database_dir() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let db_path = engine.database_path();
    debug!(version = leaseq_core::VERSION, db_path = %db_path, "Opening database");

    let pool = create_pool(&db_path)
        .await
        .with_context(|| format!("Failed to open {}", db_path))?;
    run_migrations(&pool).await.context("Migration failed")?;

    let store = Arc::new(SqliteMessageStore::new(pool));
    let service = QueueService::new(store, Arc::new(SystemTimeProvider), config)?;

    let provisioned = service.provision_configured_queues().await?;
    if !provisioned.is_empty() {
        info!(count = provisioned.len(), "Configured queues ready");
    }

    Ok(service)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_ids(verb: &str, queue: &str, requested: usize, done: &[MessageId]) {
    let line = format!("✓ {} {} of {} message(s) in '{}'", verb, done.len(), requested, queue);
    if done.len() == requested {
        println!("{}", line.green().bold());
    } else {
        println!("{}", line.yellow().bold());
    }
    if !done.is_empty() {
        let ids: Vec<String> = done.iter().map(|id| id.to_string()).collect();
        println!("  ids: {}", ids.join(", "));
    }
}

async fn run(cli: Cli, service: QueueService) -> Result<()> {
    let delay_or_default = |delay: Option<i64>| delay.unwrap_or(service.config().delay_seconds);

    match cli.command {
        Commands::Create { queue } => {
            let name = service.create_queue(&queue).await?;
            println!("{}", format!("✓ Queue '{}' ready", name).green().bold());
        }

        Commands::Drop { queue } => {
            service.drop_queue(&queue).await?;
            println!("{}", format!("✓ Queue '{}' dropped", queue).green().bold());
        }

        Commands::List => {
            let queues = service.list_queues().await?;
            if cli.json {
                print_json(&queues)?;
            } else if queues.is_empty() {
                println!("{}", "No queues".yellow());
            } else {
                println!("{}", output::queues_table(&queues));
            }
        }

        Commands::Send { queue, payload, delay } => {
            let id = service
                .send_with_delay(&queue, payload, delay_or_default(delay))
                .await?;
            if cli.json {
                print_json(&serde_json::json!({ "id": id }))?;
            } else {
                println!("{}", format!("✓ Message {} sent to '{}'", id, queue).green().bold());
            }
        }

        Commands::SendBatch { queue, payloads, delay } => {
            let count = payloads.len();
            let ids = service
                .send_batch_with_delay(&queue, payloads, delay_or_default(delay))
                .await?;
            if cli.json {
                print_json(&ids)?;
            } else {
                print_ids("Sent", &queue, count, &ids);
            }
        }

        Commands::Read { queue, vt, qty } => {
            let vt = vt.unwrap_or(service.config().visibility_timeout_seconds);
            let messages = service.read_batch(&queue, vt, qty).await?;
            if cli.json {
                print_json(&messages)?;
            } else if messages.is_empty() {
                println!("{}", "No visible messages".yellow());
            } else {
                println!("{}", output::messages_table(&messages));
            }
        }

        Commands::Pop { queue } => {
            let message = service.pop(&queue).await?;
            if cli.json {
                print_json(&message)?;
            } else if let Some(message) = message {
                println!("{}", output::messages_table(&[message]));
            } else {
                println!("{}", "No visible messages".yellow());
            }
        }

        Commands::SetVt { queue, id, vt } => {
            let message = service.set_visibility(&queue, id, vt).await?;
            if cli.json {
                print_json(&message)?;
            } else if let Some(message) = message {
                println!("{}", output::messages_table(&[message]));
            } else {
                println!("{}", format!("Message {} not found in '{}'", id, queue).yellow());
            }
        }

        Commands::Delete { queue, ids } => {
            let deleted = service.delete_batch(&queue, &ids).await?;
            if cli.json {
                print_json(&deleted)?;
            } else {
                print_ids("Deleted", &queue, unique_count(&ids), &deleted);
            }
        }

        Commands::Archive { queue, ids } => {
            let archived = service.archive_batch(&queue, &ids).await?;
            if cli.json {
                print_json(&archived)?;
            } else {
                print_ids("Archived", &queue, unique_count(&ids), &archived);
            }
        }

        Commands::Archived { queue, limit } => {
            let archived = service.list_archived(&queue, limit).await?;
            if cli.json {
                print_json(&archived)?;
            } else if archived.is_empty() {
                println!("{}", "Archive is empty".yellow());
            } else {
                println!("{}", output::archived_table(&archived));
            }
        }

        Commands::Metrics { queue } => {
            let metrics = service.metrics(&queue).await?;
            if cli.json {
                print_json(&metrics)?;
            } else {
                println!("{}", output::metrics_table(&metrics));
            }
        }
    }

    Ok(())
}

fn unique_count(ids: &[MessageId]) -> usize {
    ids.iter().collect::<std::collections::HashSet<_>>().len()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let service = open_service(&cli.engine).await?;
    run(cli, service).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_read() {
        let cli = Cli::try_parse_from(["leaseq", "read", "orders", "--vt", "5", "-n", "10"]).unwrap();
        match cli.command {
            Commands::Read { queue, vt, qty } => {
                assert_eq!(queue, "orders");
                assert_eq!(vt, Some(5));
                assert_eq!(qty, 10);
            }
            _ => panic!("expected read"),
        }
    }

    #[test]
    fn test_parse_delete_many() {
        let cli = Cli::try_parse_from(["leaseq", "delete", "orders", "1", "2", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::Delete { ids, .. } if ids == vec![1, 2, 3]));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "leaseq",
            "list",
            "--db-path",
            "sqlite::memory:",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.engine.db_path, "sqlite::memory:");
    }

    #[test]
    fn test_unique_count() {
        assert_eq!(unique_count(&[1, 1, 2]), 2);
    }

    #[tokio::test]
    async fn test_run_against_memory_database() {
        let cli = Cli::try_parse_from([
            "leaseq",
            "send",
            "orders",
            r#"{"n":1}"#,
            "--db-path",
            "sqlite::memory:",
            "--queues",
            "orders",
        ])
        .unwrap();

        let service = open_service(&cli.engine).await.unwrap();
        tokio_test::assert_ok!(run(cli, service).await);
    }
}
