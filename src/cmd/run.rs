//! `sprig run`: execute a flow against the console effect handler

use crate::cmd::{read_json, read_object, ExecutorArgs};
use crate::console::{print_line, ConsoleEffects};
use clap::Args;
use color_eyre::eyre::{Result, WrapErr};
use futures::{FutureExt, StreamExt};
use serde_json::json;
use sprig_actions::controllers::TimerController;
use sprig_actions::{
    ActionContext, ActionExecutor, ActionRegistry, ExecutionEvent, MessageBus, MessageStream,
    ObjectStore, ScopeContext, StateContext, APP_STATE_NAMESPACE,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Flow document (JSON), or `-` to read it from stdin
    pub flow: PathBuf,

    /// Variables visible to every step (JSON object)
    #[arg(long)]
    pub scope: Option<PathBuf>,

    /// Initial values of the flow's state region (JSON object)
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Namespace of the flow's state region
    #[arg(long, default_value = "page")]
    pub namespace: String,

    /// Initial app state (JSON object)
    #[arg(long)]
    pub app_state: Option<PathBuf>,

    /// Print messages posted on these bus channels
    #[arg(long = "listen", value_name = "NAME")]
    pub listen: Vec<String>,

    /// Print execution events to stderr as JSON lines
    #[arg(long)]
    pub events: bool,

    /// Print the final state region after the flow finishes
    #[arg(long)]
    pub dump_state: bool,

    /// Register a timer that `controlObject` steps can drive, e.g. `clock=500`
    #[arg(long = "timer", value_name = "NAME=MS", value_parser = parse_timer)]
    pub timers: Vec<(String, u64)>,

    #[command(flatten)]
    pub executor: ExecutorArgs,
}

pub async fn run_flow(args: RunArgs) -> Result<()> {
    let config = args.executor.load_config()?;
    let bus = MessageBus::new(config.bus_capacity);
    let executor = ActionExecutor::with_config(ActionRegistry::with_builtins(), config)
        .wrap_err("Failed to create executor")?;

    let document = read_json(&args.flow)?;
    let flow = executor.parse_flow(&document).unwrap_or_default();
    if flow.is_empty() {
        warn!(flow = %args.flow.display(), "Flow has no runnable steps");
    }

    let scope = match &args.scope {
        Some(path) => Some(ScopeContext::new("args").with_variables(read_object(path)?)),
        None => None,
    };
    let mut state = StateContext::new(args.namespace.clone());
    if let Some(path) = &args.state {
        state = state.with_values(read_object(path)?);
    }
    let state = Arc::new(state);
    let mut app_state = StateContext::new(APP_STATE_NAMESPACE);
    if let Some(path) = &args.app_state {
        app_state = app_state.with_values(read_object(path)?);
    }

    let objects = Arc::new(ObjectStore::new());
    for (name, millis) in &args.timers {
        let timer = TimerController::new(Duration::from_millis(*millis));
        objects.insert(name.clone(), Arc::new(timer));
    }

    let effects = ConsoleEffects::new().wrap_err("Failed to create HTTP client")?;
    let ctx = ActionContext::new()
        .with_effects(Arc::new(effects))
        .with_bus(bus.clone())
        .with_app_state(Arc::new(app_state))
        .with_objects(objects);

    let mut listeners: Vec<MessageStream> =
        args.listen.iter().map(|name| bus.observe(name)).collect();
    let mut events = executor.subscribe();

    executor
        .execute(&ctx, &flow, scope.as_ref(), Some(&state))
        .await;

    // Everything posted during the run is already buffered
    for listener in &mut listeners {
        while let Some(Some(message)) = listener.next().now_or_never() {
            print_line(&json!({ "message": message }))?;
        }
    }

    loop {
        match events.try_recv() {
            Ok(event) => {
                if args.events {
                    eprintln!("{}", serde_json::to_string(&event)?);
                }
                if let ExecutionEvent::FlowCompleted { summary, .. } = event {
                    info!(
                        completed = summary.completed,
                        failed = summary.failed,
                        skipped = summary.skipped,
                        "Flow run complete"
                    );
                }
            }
            Err(TryRecvError::Lagged(missed)) => warn!(missed, "Missed execution events"),
            Err(_) => break,
        }
    }

    if args.dump_state {
        print_line(&json!({ "state": { state.namespace(): state.values() } }))?;
    }
    Ok(())
}

/// Parse `NAME=MS` into a timer name and a non-zero period
fn parse_timer(spec: &str) -> std::result::Result<(String, u64), String> {
    let (name, millis) = spec
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=MS, got '{spec}'"))?;
    if name.is_empty() {
        return Err("timer name is empty".to_string());
    }
    let millis: u64 = millis
        .parse()
        .map_err(|e| format!("invalid period '{millis}': {e}"))?;
    if millis == 0 {
        return Err("timer period must be greater than zero".to_string());
    }
    Ok((name.to_string(), millis))
}
