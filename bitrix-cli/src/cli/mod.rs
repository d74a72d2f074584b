//! Command-line host

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::api::models::AuthMode;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "bitrix-cli", version, about = "Bitrix24 CRM REST connector")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (default: <config_dir>/bitrix-cli/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Auth mode: webhook or oauth2
    #[arg(long, global = true, value_parser = parse_auth_mode)]
    pub auth: Option<AuthMode>,

    /// Portal domain for OAuth2
    #[arg(long, global = true)]
    pub domain: Option<String>,

    /// Incoming webhook URL
    #[arg(long, global = true)]
    pub webhook_url: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute a job file of records
    Run(RunArgs),
    /// Call an arbitrary REST method
    Call(CallArgs),
    /// List the fields of a CRM resource
    Fields(FieldsArgs),
    /// List CRM entity types
    Types,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Job file (.toml or .json)
    pub job: PathBuf,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write results to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Record failures as error items instead of aborting
    #[arg(long)]
    pub continue_on_fail: bool,

    /// Print the resolved requests without executing them
    #[arg(long)]
    pub dry: bool,
}

#[derive(Debug, Args)]
pub struct CallArgs {
    /// REST method name, e.g. "crm.deal.list"
    pub method: String,

    /// Request parameter as name=value; names use dot and bracket notation
    #[arg(short, long = "param", value_name = "NAME=VALUE", conflicts_with = "json")]
    pub params: Vec<String>,

    /// Request body as a JSON object
    #[arg(long)]
    pub json: Option<String>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FieldsArgs {
    /// Resource, e.g. "crm.deal" or "deal"
    pub resource: String,

    /// Required for crm.item
    #[arg(long)]
    pub entity_type_id: Option<u32>,

    /// Keep UF_* names as stored by the portal
    #[arg(long)]
    pub original_uf_names: bool,

    /// Print descriptors as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_auth_mode(value: &str) -> Result<AuthMode, String> {
    AuthMode::parse(value).ok_or_else(|| format!("unknown auth mode '{}'", value))
}
