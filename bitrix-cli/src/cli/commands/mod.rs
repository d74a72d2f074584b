//! Command handlers

pub mod call;
pub mod metadata;
pub mod run;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::*;
use is_terminal::IsTerminal;
use log::debug;
use serde_json::Value;

use super::output::{OutputFormat, format_output};
use super::{Cli, Commands};
use crate::api::client::{BitrixClient, HttpTransport, ReqwestTransport};
use crate::api::models::CredentialSource;
use crate::config::{Config, Overrides};

/// Entry point for every subcommand
pub async fn handle(cli: Cli) -> Result<()> {
    if cli.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let continue_on_fail = matches!(&cli.command, Commands::Run(args) if args.continue_on_fail);
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(Overrides {
        auth_mode: cli.auth,
        domain: cli.domain,
        webhook_url: cli.webhook_url,
        timeout_secs: cli.timeout,
        continue_on_fail,
    });
    debug!(
        "Auth mode {:?}, timeout {}s",
        config.auth.mode, config.http.timeout_secs
    );

    match cli.command {
        Commands::Run(args) => run::handle_run_command(args, &config).await,
        Commands::Call(args) => call::handle_call_command(args, &config).await,
        Commands::Fields(args) => metadata::handle_fields_command(args, &config).await,
        Commands::Types => metadata::handle_types_command(&config).await,
    }
}

pub(crate) fn transport(config: &Config) -> Result<Arc<dyn HttpTransport>> {
    Ok(Arc::new(ReqwestTransport::new(config.timeout())?))
}

/// Client for commands that bypass the record runner
pub(crate) fn connect(config: &Config) -> Result<BitrixClient> {
    let mode = config.auth.mode;
    let credentials = config
        .credentials(mode)
        .context("Bitrix24 credentials are not configured")?;
    Ok(BitrixClient::new(transport(config)?, mode, credentials))
}

/// Print results to stdout or save them to `output`
pub(crate) fn emit(data: &Value, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let formatted = format_output(data, format)?;
    match output {
        Some(path) => {
            fs::write(path, &formatted)
                .with_context(|| format!("Failed to write output to: {}", path.display()))?;
            eprintln!(
                "Results saved to: {}",
                path.display().to_string().bright_green()
            );
        }
        None => println!("{}", formatted),
    }
    Ok(())
}
