use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use qrshare_core::model::DEFAULT_EXPIRATION_MINUTES;

#[derive(Parser)]
#[command(name = "qrshare")]
#[command(about = "Share health data through short-lived QR codes, and scan them")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Server base URL (overrides config and QRSHARE_URL env var)
    #[arg(short, long, global = true, env = "QRSHARE_URL")]
    pub server: Option<String>,

    /// Config profile name
    #[arg(short, long, global = true, env = "QRSHARE_PROFILE", default_value = "default")]
    pub profile: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "QRSHARE_LOG", default_value = "warn")]
    pub log_level: String,
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq, Eq, Debug)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl OutputFormat {
    pub fn parse_config(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a QR share session for the given data types
    Share(ShareArgs),
    /// Cancel a QR share session
    Cancel(SessionArgs),
    /// Show the backend status of a QR share session
    Status(SessionArgs),
    /// Scan a QR code and display the shared health records
    Scan(ScanArgs),
    /// Render a saved bundle without contacting the server
    Render(RenderArgs),
    /// Store a bearer token for this profile
    Login(LoginArgs),
    /// Remove the stored bearer token
    Logout,
    /// Show current auth info
    Whoami,
    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct ShareArgs {
    /// Data type to share (repeatable, e.g. -t VITALS -t MEDICATIONS)
    #[arg(short = 't', long = "data-type")]
    pub data_types: Vec<String>,
    /// Minutes until the session expires
    #[arg(short, long, default_value_t = DEFAULT_EXPIRATION_MINUTES)]
    pub expires: u32,
    /// Why the data is being shared
    #[arg(long, default_value = "")]
    pub purpose: String,
    /// Write the QR code PNG to this file
    #[arg(long)]
    pub qr_out: Option<PathBuf>,
    /// Keep the session open until Ctrl-C, then cancel it
    #[arg(long)]
    pub wait: bool,
}

#[derive(clap::Args)]
pub struct SessionArgs {
    /// Session id returned by `qrshare share`
    pub session_id: String,
}

#[derive(clap::Args)]
pub struct ScanArgs {
    /// Read decoded payloads from stdin, one per line
    #[arg(long, conflicts_with_all = ["payload", "command"])]
    pub stdin: bool,
    /// Submit this payload directly instead of scanning
    #[arg(long, conflicts_with = "command")]
    pub payload: Option<String>,
    /// Scanner command printing one decoded payload per line
    /// (defaults to the profile's scanner_command)
    #[arg(long)]
    pub command: Option<String>,
}

#[derive(clap::Args)]
pub struct RenderArgs {
    /// Path to a bundle JSON file (reads from stdin if omitted)
    pub file: Option<String>,
}

#[derive(clap::Args)]
pub struct LoginArgs {
    /// Bearer token issued by the health data service
    #[arg(long, env = "QRSHARE_LOGIN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (server, format, attach_auth_on_generate, scanner_command)
    pub key: String,
    /// Value
    pub value: String,
}
