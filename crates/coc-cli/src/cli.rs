use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "coc",
    about = "Chain-of-custody ledger for digital-forensic evidence",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Gateway base URL
    #[arg(long, global = true, env = "COC_GATEWAY_URL")]
    pub gateway: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a signing key and store it encrypted
    Keygen(KeygenArgs),
    /// Print the public key of a key file
    Pubkey(PubkeyArgs),
    /// Derive the ledger address for a case and image
    Address(EvidenceArgs),
    /// Register a new custody event
    Register(RegisterArgs),
    /// Append a status change to an existing evidence item
    Update(UpdateArgs),
    /// Show the custody history of an evidence item
    Search(EvidenceArgs),
    /// Show every record signed by a key, grouped by case
    History(HistoryArgs),
    /// Run the development gateway
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct KeyArgs {
    /// Encrypted key file
    #[arg(long, default_value = "coc-key.json")]
    pub key: PathBuf,
    #[arg(long, env = "COC_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,
}

#[derive(Args)]
pub struct KeygenArgs {
    #[command(flatten)]
    pub key: KeyArgs,
    /// Overwrite an existing key file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct PubkeyArgs {
    #[arg(long, default_value = "coc-key.json")]
    pub key: PathBuf,
}

#[derive(Args)]
pub struct EvidenceArgs {
    #[arg(long = "case")]
    pub case_num: String,
    #[arg(long)]
    pub image_hash: String,
}

#[derive(Args)]
pub struct WaitArgs {
    /// Return after submission without waiting for the record to appear
    #[arg(long)]
    pub no_wait: bool,
    /// Maximum number of state reads while waiting
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

#[derive(Args)]
pub struct RegisterArgs {
    #[command(flatten)]
    pub key: KeyArgs,
    #[command(flatten)]
    pub wait: WaitArgs,
    #[arg(long = "user")]
    pub user_id: String,
    #[command(flatten)]
    pub evidence: EvidenceArgs,
    #[arg(long)]
    pub location: String,
    #[arg(long = "checker")]
    pub checker_name: String,
    /// PC, HDD/SSD, USB, ExternalHDD, Mobile, Other, or free text
    #[arg(long = "device")]
    pub device_type: String,
    #[arg(long)]
    pub image_type: Option<String>,
    #[arg(long = "image-file")]
    pub image_file_name: String,
    #[arg(long, default_value = "stored")]
    pub status: String,
    /// Registration time, defaults to now (YYYY-MM-DDTHH:MM)
    #[arg(long)]
    pub time: Option<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub key: KeyArgs,
    #[command(flatten)]
    pub wait: WaitArgs,
    #[arg(long = "user")]
    pub user_id: String,
    #[command(flatten)]
    pub evidence: EvidenceArgs,
    #[arg(long)]
    pub status: String,
    #[arg(long)]
    pub time: Option<String>,
    /// Replace the location carried over from the latest record
    #[arg(long)]
    pub location: Option<String>,
    /// Replace the checker carried over from the latest record
    #[arg(long = "checker")]
    pub checker_name: Option<String>,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Hex public key; defaults to the key file's
    #[arg(long)]
    pub public_key: Option<String>,
    #[arg(long, default_value = "coc-key.json")]
    pub key: PathBuf,
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML gateway configuration
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    #[arg(long)]
    pub commit_delay_ms: Option<u64>,
    /// Accept namespace-prefix input/output declarations
    #[arg(long)]
    pub legacy_addresses: bool,
}
