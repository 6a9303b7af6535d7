//! `sprig check`: parse a flow and print its normalized form

use crate::cmd::{raw_step_count, read_json, ExecutorArgs};
use clap::Args;
use color_eyre::eyre::{Result, WrapErr};
use serde_json::Value;
use sprig_actions::{ActionExecutor, ActionRegistry};
use std::path::PathBuf;
use tracing::debug;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Flow document (JSON), or `-` to read it from stdin
    pub flow: PathBuf,

    #[command(flatten)]
    pub executor: ExecutorArgs,
}

pub fn check_flow(args: CheckArgs) -> Result<()> {
    let config = args.executor.load_config()?;
    let executor = ActionExecutor::with_config(ActionRegistry::with_builtins(), config)
        .wrap_err("Failed to create executor")?;

    let document = read_json(&args.flow)?;
    let total = raw_step_count(&document);
    let (normalized, kept) = match executor.parse_flow(&document) {
        Some(flow) => (flow.to_json().wrap_err("Failed to serialize flow")?, flow.len()),
        None => (Value::Null, 0),
    };
    debug!(total, kept, "Flow parsed");

    println!("{}", serde_json::to_string_pretty(&normalized)?);
    eprintln!("{} of {} steps dropped", total.saturating_sub(kept), total);
    Ok(())
}
