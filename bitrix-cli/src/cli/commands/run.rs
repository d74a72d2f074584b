//! `run` command handler

use anyhow::{Context, Result};
use colored::*;
use serde_json::Value;
use std::time::Instant;

use super::{emit, transport};
use crate::api::operations::Dispatcher;
use crate::cli::RunArgs;
use crate::config::Config;
use crate::runner::{Job, PlannedRequest, Runner};

pub async fn handle_run_command(args: RunArgs, config: &Config) -> Result<()> {
    let job = Job::load(&args.job)?;
    let item_count = job.item_count();

    let continue_on_fail =
        args.continue_on_fail || job.continue_on_fail.unwrap_or(config.run.continue_on_fail);
    let runner = Runner::new(Dispatcher::default())
        .default_auth_mode(config.auth.mode)
        .continue_on_fail(continue_on_fail);

    if args.dry {
        let plan = runner.plan(&job, item_count, config, transport(config)?);
        println!("{}", render_plan(&plan)?);
        return Ok(());
    }

    let start = Instant::now();
    let outputs = runner
        .run(&job, item_count, config, transport(config)?)
        .await
        .with_context(|| format!("Job failed: {}", args.job.display()))?;

    let failed = outputs.iter().filter(|o| o.is_error()).count();
    let items = Value::Array(outputs.into_iter().map(|o| o.json).collect());
    emit(&items, args.format, args.output.as_deref())?;

    let summary = format!(
        "{} records, {} items, {} failed in {:.2}s",
        item_count,
        items.as_array().map_or(0, Vec::len),
        failed,
        start.elapsed().as_secs_f64()
    );
    if failed > 0 {
        eprintln!("{}", summary.yellow());
    } else {
        eprintln!("{}", summary.dimmed());
    }
    Ok(())
}

/// One block per record: "#i METHOD url", then the body, if any
fn render_plan(plan: &[PlannedRequest]) -> Result<String> {
    let mut lines = Vec::new();
    for planned in plan {
        match &planned.result {
            Ok((spec, url)) => {
                let target = url.clone().unwrap_or_else(|| spec.endpoint.clone());
                lines.push(format!(
                    "#{} {} {}",
                    planned.item_index,
                    spec.method.to_string().bold(),
                    target
                ));
                if !spec.body.is_empty() {
                    lines.push(
                        serde_json::to_string_pretty(&spec.body)
                            .context("Failed to format request body")?,
                    );
                }
            }
            Err(e) => lines.push(format!(
                "#{} {}",
                planned.item_index,
                e.to_string().red()
            )),
        }
    }
    Ok(lines.join("\n"))
}
