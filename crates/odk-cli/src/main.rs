use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use odk_client::HttpOrderService;
use odk_config::{ClientConfig, UnusedKeyPolicy};
use odk_schemas::{EventKind, TicketStatus};
use odk_workflow::{Priority, WorkflowSettings};

mod commands;

#[derive(Parser)]
#[command(name = "odk")]
#[command(about = "orderdesk operator CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> env -> local). Built-in
    /// defaults apply when none are given.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ping the order service
    Health,

    /// Order commands
    Orders {
        #[command(subcommand)]
        cmd: OrdersCmd,
    },

    /// Support ticket commands
    Tickets {
        #[command(subcommand)]
        cmd: TicketsCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
pub(crate) enum OrdersCmd {
    /// One line per order
    List,

    /// Order details plus the events the server currently allows
    Show {
        order_id: String,
    },

    /// State transition history
    History {
        order_id: String,
    },

    /// Validate a draft locally, then create the order
    Create {
        /// Product id; repeat for several (1 to 10)
        #[arg(long = "product", required = true)]
        products: Vec<String>,

        #[arg(long)]
        amount: f64,

        #[arg(long)]
        customer_name: Option<String>,

        #[arg(long)]
        customer_email: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// low | medium | high
        #[arg(long, default_value = "medium")]
        priority: Priority,

        #[arg(long)]
        source: Option<String>,
    },

    /// Submit an event. Events that need confirmation prompt on stdin unless
    /// --yes is given.
    Event {
        order_id: String,

        /// Wire name, e.g. paymentSuccessful
        kind: EventKind,

        /// Reason recorded with a confirmed event
        #[arg(long)]
        reason: Option<String>,

        /// Notes recorded with a confirmed event
        #[arg(long)]
        notes: Option<String>,

        /// Skip the interactive confirmation
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub(crate) enum TicketsCmd {
    /// All tickets, optionally narrowed to one status
    List {
        #[arg(long)]
        status: Option<TicketStatus>,
    },

    Show {
        ticket_id: String,
    },

    /// Tickets linked to one order
    ForOrder {
        order_id: String,
    },

    /// Move a ticket to a new status (open | in_progress | resolved | closed)
    SetStatus {
        ticket_id: String,
        status: TicketStatus,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Server-side summary by status
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    if let Commands::ConfigHash { paths } = &cli.cmd {
        let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        let loaded = odk_config::load_layered_yaml(&path_refs)?;
        println!("config_hash={}", loaded.config_hash);
        println!("{}", loaded.canonical_json);
        return Ok(());
    }

    let (cfg, unused) = load_client_config(&cli.config_paths)?;
    init_tracing(&cfg.logging.level);
    for ptr in &unused {
        tracing::warn!(pointer = %ptr, "config key is not read by the client");
    }

    let secrets = odk_config::resolve_secrets(&cfg, |k| std::env::var(k).ok())?;
    let svc = Arc::new(
        HttpOrderService::from_config(&cfg, &secrets).context("failed to build service client")?,
    );
    // The CLI exits right after printing; there is no second click to debounce.
    let settings = WorkflowSettings::from_config(&cfg).immediate();

    match cli.cmd {
        Commands::Health => commands::health(svc.as_ref()).await,
        Commands::Orders { cmd } => commands::orders::run(cmd, svc, &settings).await,
        Commands::Tickets { cmd } => commands::tickets::run(cmd, svc).await,
        Commands::ConfigHash { .. } => Ok(()),
    }
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();
}

/// Typed config from the given layers (or defaults) plus env overrides.
/// Also returns the config keys the client never reads.
fn load_client_config(paths: &[String]) -> Result<(ClientConfig, Vec<String>)> {
    let (mut cfg, unused) = if paths.is_empty() {
        (ClientConfig::default(), Vec::new())
    } else {
        let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        let loaded = odk_config::load_layered_yaml(&path_refs)?;
        let report = odk_config::report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
        (loaded.client()?, report.unused_leaf_pointers)
    };
    cfg.apply_env_overrides(|k| std::env::var(k).ok());
    Ok((cfg, unused))
}
