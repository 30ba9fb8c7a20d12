//! CLI entry point for the nsnap scan inventory.

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use nsnap_core::{HostId, RunTimestamp};
use nsnap_store::SnapshotStore;

use nsnap_discover::archive::ScanArchive;
use nsnap_discover::config::{DiscoverConfig, ScanProfile};
use nsnap_discover::cycle::{run_cycle, Tools};
use nsnap_discover::scanner::{NdiffRunner, NmapScanner};

#[derive(Parser)]
#[command(name = "nsnap")]
#[command(about = "Network scan inventory with per-host change tracking")]
struct Cli {
    /// Config file prefix (default: nsnap).
    #[arg(short, long, default_value = "nsnap", global = true)]
    config: String,

    /// Override the database path from config.
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scan cycle and record its results.
    Scan {
        /// Target to scan (repeatable). Replaces discover.targets.
        #[arg(short, long)]
        target: Vec<String>,

        /// Scan profile: connect, syn, version.
        #[arg(short, long)]
        profile: Option<ScanProfile>,
    },
    /// List registered hosts.
    Hosts,
    /// List service observations of one run (default: latest).
    Services {
        #[arg(long)]
        run: Option<i64>,

        /// Restrict to one host address.
        #[arg(long)]
        host: Option<String>,
    },
    /// List recorded diffs.
    Diffs {
        #[arg(long)]
        run: Option<i64>,

        /// Show the full history of one host address.
        #[arg(long)]
        host: Option<String>,
    },
    /// Attach a comment to a recorded diff.
    Comment {
        #[arg(long)]
        host: String,

        #[arg(long)]
        run: i64,

        #[arg(long)]
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = DiscoverConfig::load(&cli.config)?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let store = SnapshotStore::open(&config.db_path)?;
    tracing::debug!(path = %config.db_path, "Store opened");

    match cli.command {
        Command::Scan { target, profile } => scan(&config, &store, target, profile).await,
        Command::Hosts => print_json(&store.hosts()?),
        Command::Services { run, host } => {
            let host_id = host.as_deref().map(|h| lookup_host(&store, h)).transpose()?;
            let run = match run {
                Some(r) => RunTimestamp(r),
                None => match store.latest_run()? {
                    Some(r) => r,
                    None => anyhow::bail!("No runs recorded yet"),
                },
            };
            print_json(&store.services_for_run(run, host_id)?)
        }
        Command::Diffs { run, host } => match host {
            Some(h) => {
                let host_id = lookup_host(&store, &h)?;
                let mut history = store.diff_history(host_id)?;
                if let Some(r) = run {
                    history.retain(|d| d.run == RunTimestamp(r));
                }
                print_json(&history)
            }
            None => print_json(&store.diffs_for_run(run.map(RunTimestamp))?),
        },
        Command::Comment { host, run, text } => {
            let host_id = lookup_host(&store, &host)?;
            let outcome = store.set_comment(host_id, RunTimestamp(run), &text)?;
            if !outcome.is_updated() {
                tracing::warn!(host = %host, run, "No diff recorded for this host and run");
            }
            print_json(&outcome)
        }
    }
}

async fn scan(
    config: &DiscoverConfig,
    store: &SnapshotStore,
    targets: Vec<String>,
    profile: Option<ScanProfile>,
) -> anyhow::Result<()> {
    let nmap = NmapScanner::new(&config.nmap_path);
    let version = nmap.verify_installation().await?;
    tracing::info!(nmap_version = %version.lines().next().unwrap_or_default(), "Nmap verified");
    let ndiff = NdiffRunner::new(&config.ndiff_path);

    let targets = if targets.is_empty() {
        config.targets.clone()
    } else {
        targets
    };
    let profile = profile.unwrap_or_else(|| config.profile.clone());
    let archive = ScanArchive::open(&config.scan_dir)?;

    let tools = Tools {
        nmap: &nmap,
        ndiff: &ndiff,
    };
    match run_cycle(tools, store, &archive, &targets, &profile, &config.extra_args).await {
        Ok(summary) => print_json(&summary),
        Err(e) => {
            tracing::error!(error = %e, "Scan cycle failed");
            Err(e.into())
        }
    }
}

fn lookup_host(store: &SnapshotStore, address: &str) -> anyhow::Result<HostId> {
    store
        .resolve_host(address)?
        .ok_or_else(|| anyhow::anyhow!("Unknown host: {address}"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
