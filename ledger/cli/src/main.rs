//! `pqledger` CLI: derive quantum-safe Algorand addresses for Falcon keys and
//! send payments from them.

mod keyfile;
mod signer;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use pqledger_core::{search, send, Network, SendOptions, DEFAULT_FILLER_COUNT, DEFAULT_MAX_ROUNDS};
use pqledger_spec::{Address, VALIDITY_WINDOW};
use pqledger_transport::{AlgodClient, AlgodConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::keyfile::{write_atomic, KeyFile};
use crate::signer::CommandSigner;

/// pqledger command line.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity on stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Subcommand.
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the account address controlled by a Falcon public key.
    Address {
        /// Key file with a hex `public_key`.
        #[arg(short, long, value_name = "FILE")]
        key: PathBuf,
        /// Write the address here instead of stdout.
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Pay from the Falcon account and wait for confirmation.
    Send(SendArgs),
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Key file with both `public_key` and `private_key`.
    #[arg(short, long, value_name = "FILE")]
    key: PathBuf,
    /// Receiver address.
    #[arg(long, value_name = "ADDRESS")]
    to: String,
    /// Amount in microAlgos.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    amount: u64,
    /// Flat fee in microAlgos; the network's suggested fee when omitted.
    #[arg(long)]
    fee: Option<u64>,
    /// Note attached to the payment.
    #[arg(long)]
    note: Option<String>,
    /// mainnet, testnet, betanet or devnet.
    #[arg(long, env = "PQLEDGER_NETWORK", default_value_t = Network::MainNet)]
    network: Network,
    /// Node connection overrides.
    #[command(flatten)]
    algod: AlgodArgs,
    /// Falcon tool used for signing.
    #[arg(
        long,
        env = "PQLEDGER_SIGNER",
        default_value = "falcon",
        value_name = "PATH"
    )]
    signer: PathBuf,
    /// Rounds to wait for confirmation, at most one validity window.
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_ROUNDS,
        value_parser = clap::value_parser!(u64).range(1..=VALIDITY_WINDOW)
    )]
    max_rounds: u64,
    /// Filler transactions in the group.
    #[arg(long, default_value_t = DEFAULT_FILLER_COUNT)]
    fillers: usize,
    /// Give up after this many seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Args, Debug)]
struct AlgodArgs {
    /// algod base URL; overrides the network preset.
    #[arg(long, env = "ALGOD_URL", value_name = "URL")]
    algod_url: Option<String>,
    /// algod API token.
    #[arg(long, env = "ALGOD_TOKEN", hide_env_values = true)]
    algod_token: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {err}");
        return ExitCode::from(2);
    }

    let result = match cli.command {
        Commands::Address { key, out } => address(&key, out.as_deref()),
        Commands::Send(args) => send_payment(args).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn address(key: &Path, out: Option<&Path>) -> anyhow::Result<()> {
    let keys = KeyFile::load(key).context("failed to read --key")?;
    let public = keys.require_public(key)?;
    let derivation = search(public).context("error deriving address")?;
    let text = derivation.address.to_string();
    match out {
        None => println!("{text}"),
        Some(path) => write_atomic(path, text.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?,
    }
    Ok(())
}

async fn send_payment(args: SendArgs) -> anyhow::Result<()> {
    let keys = KeyFile::load(&args.key).context("failed to read --key")?;
    let public = keys.require_public(&args.key)?.clone();
    if keys.private_key.is_none() {
        bail!(
            "private key not found in {} (required for sending)",
            args.key.display()
        );
    }
    let to: Address = args.to.parse().context("invalid --to address")?;

    let config = AlgodConfig::resolve(args.network, args.algod.algod_url, args.algod.algod_token)?;
    info!(url = %config.url, network = %args.network, "using algod");
    let client = AlgodClient::new(config);
    let signer = CommandSigner::new(args.signer, &args.key, public);

    let mut options = SendOptions::default()
        .network(args.network)
        .max_rounds(args.max_rounds)
        .filler_count(args.fillers);
    if let Some(fee) = args.fee {
        options = options.flat_fee(fee);
    }
    if let Some(note) = args.note {
        options = options.note(note.into_bytes());
    }
    if let Some(secs) = args.timeout {
        options = options.deadline(Duration::from_secs(secs));
    }

    let tx_id = send(&client, &signer, to, args.amount, &options)
        .await
        .map_err(|err| {
            let phase = err.phase();
            anyhow::Error::new(err).context(format!("send failed during {phase}"))
        })?;
    println!("Transaction confirmed with id: {tx_id}");
    Ok(())
}
