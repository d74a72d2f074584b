//! `fields` and `types` command handlers

use anyhow::{Context, Result};
use colored::*;

use super::connect;
use crate::api::metadata::{EntityType, FieldDescriptor, list_entity_fields, list_entity_types};
use crate::api::models::Resource;
use crate::cli::FieldsArgs;
use crate::config::Config;

pub async fn handle_fields_command(args: FieldsArgs, config: &Config) -> Result<()> {
    let resource = Resource::parse(&args.resource).with_context(|| {
        format!(
            "Unknown resource '{}'. Expected one of: {}",
            args.resource,
            Resource::ALL
                .iter()
                .map(|r| r.method_prefix())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })?;

    let client = connect(config)?;
    let fields = list_entity_fields(
        &client,
        resource,
        args.entity_type_id,
        args.original_uf_names,
    )
    .await
    .with_context(|| format!("Failed to load fields of {}", resource))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&fields).context("Failed to format fields")?
        );
    } else {
        println!("{}", render_fields(&fields));
    }
    Ok(())
}

pub async fn handle_types_command(config: &Config) -> Result<()> {
    let client = connect(config)?;
    let types = list_entity_types(&client).await;
    println!("{}", render_types(&types));
    Ok(())
}

fn render_fields(fields: &[FieldDescriptor]) -> String {
    fields
        .iter()
        .map(|f| format!("{}  {}", f.display_name().bold(), f.description().dimmed()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_types(types: &[EntityType]) -> String {
    let width = types.iter().map(|t| t.name.len()).max().unwrap_or(0);
    types
        .iter()
        .map(|t| {
            let kind = if t.system { "system".dimmed() } else { "custom".cyan() };
            format!("{:>5}  {:<width$}  {}", t.entity_type_id, t.name, kind, width = width)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
