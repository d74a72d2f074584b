//! `call` command handler: one record through the custom-method pathway

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};

use super::{emit, transport};
use crate::api::operations::{CUSTOM_RESOURCE, Dispatcher};
use crate::cli::CallArgs;
use crate::config::Config;
use crate::runner::Runner;

pub async fn handle_call_command(args: CallArgs, config: &Config) -> Result<()> {
    let record = call_record(&args.method, &args.params, args.json.as_deref())?;

    let runner = Runner::new(Dispatcher::default()).default_auth_mode(config.auth.mode);
    let outputs = runner
        .run(&record, 1, config, transport(config)?)
        .await
        .with_context(|| format!("Call to {} failed", args.method))?;

    let items = Value::Array(outputs.into_iter().map(|o| o.json).collect());
    emit(&items, args.format, args.output.as_deref())
}

/// Parameters of a single custom-method record
fn call_record(method: &str, params: &[String], json: Option<&str>) -> Result<Map<String, Value>> {
    let mut record = Map::new();
    record.insert("resource".to_string(), json!(CUSTOM_RESOURCE));
    record.insert("operation".to_string(), json!(method));

    match json {
        Some(data) => {
            record.insert("inputType".to_string(), json!("json"));
            record.insert("jsonData".to_string(), json!(data));
        }
        None => {
            let entries = params
                .iter()
                .map(|param| {
                    let (name, value) = param
                        .split_once('=')
                        .with_context(|| format!("Expected NAME=VALUE, got '{}'", param))?;
                    Ok(json!({ "name": name.trim(), "value": value }))
                })
                .collect::<Result<Vec<_>>>()?;
            record.insert("parameters".to_string(), Value::Array(entries));
        }
    }
    Ok(record)
}
