//! Tessera administrative CLI
//!
//! One administrative verb per component: `initialize` generates a fresh
//! RSA keypair and seeds it into the shared state file, publishing the
//! public half for the other components and clients. Everything else in
//! the system runs as state-store transactions invoked by clients, not
//! from here.
//!
//! Exit code is 0 on success and non-zero on any error; there are no
//! interactive prompts. The wall clock is read once at startup, since this is
//! the administrative surface, not a replicated transaction.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tessera_core::{state_keys, TxTimestamp};
use tessera_crypto::keys::generate_keypair_pems;
use tessera_ledger::{FileLedger, LedgerState};
use tracing::info;

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Administrative commands for the Tessera ticket servers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    component: Component,

    /// Path of the state file backing the administrative ledger
    #[arg(long, global = true, default_value = "tessera-state.json")]
    ledger: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Component {
    /// Authentication server administration
    #[command(name = "as")]
    AuthServer {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// Ticket-granting server administration
    Tgs {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// IoT service validator administration
    Isv {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Generate a keypair and seed it into the ledger
    Initialize {
        /// RSA modulus size in bits
        #[arg(long, default_value_t = 2048)]
        bits: usize,
        /// Also write the public key PEM to this file
        #[arg(long)]
        public_out: Option<PathBuf>,
    },
    /// Print the component's published public key
    ShowKey,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn startup_timestamp() -> Result<TxTimestamp> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the epoch")?;
    Ok(TxTimestamp::from_secs(now.as_secs()))
}

async fn seed_component(
    ledger: &FileLedger,
    component: &str,
    bits: usize,
    public_out: Option<&PathBuf>,
) -> Result<String> {
    let (private_pem, public_pem) = generate_keypair_pems(&mut rand::rngs::OsRng, bits)
        .map_err(|e| anyhow::anyhow!("key generation failed: {e}"))?;
    match component {
        "as" => {
            tessera_as::AuthServer::new()
                .initialize(ledger, &private_pem, &public_pem)
                .await?;
        }
        "tgs" => {
            tessera_tgs::TicketGrantingServer::new()
                .initialize(ledger, &private_pem, &public_pem)
                .await?;
        }
        "isv" => {
            tessera_isv::ServiceValidator::new()
                .initialize(ledger, &private_pem, &public_pem)
                .await?;
        }
        other => anyhow::bail!("unknown component {other}"),
    }
    if let Some(path) = public_out {
        std::fs::write(path, &public_pem)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    info!(component, bits, "component initialized");
    Ok(public_pem)
}

async fn show_key(ledger: &FileLedger, key: &str) -> Result<String> {
    let bytes = ledger
        .get(key)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?
        .with_context(|| format!("{key} is not seeded; run initialize first"))?;
    String::from_utf8(bytes).context("stored key is not UTF-8")
}

async fn run(cli: Cli) -> Result<()> {
    let (component, command) = match &cli.component {
        Component::AuthServer { command } => ("as", command),
        Component::Tgs { command } => ("tgs", command),
        Component::Isv { command } => ("isv", command),
    };
    let tx_id = format!("admin-{component}");
    let ledger = FileLedger::open(&cli.ledger, startup_timestamp()?, tx_id)
        .map_err(|e| anyhow::anyhow!("opening {}: {e}", cli.ledger.display()))?;

    match command {
        AdminCommand::Initialize { bits, public_out } => {
            let public_pem =
                seed_component(&ledger, component, *bits, public_out.as_ref()).await?;
            print!("{public_pem}");
        }
        AdminCommand::ShowKey => {
            let key = match component {
                "as" => state_keys::AS_PUBLIC_KEY,
                "tgs" => state_keys::TGS_PUBLIC_KEY,
                _ => state_keys::ISV_PUBLIC_KEY,
            };
            print!("{}", show_key(&ledger, key).await?);
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli).await
}
