//! Subcommands and the file loading they share

pub mod check;
pub mod run;

use clap::{Args, ValueEnum};
use color_eyre::eyre::{eyre, Result, WrapErr};
use serde_json::{Map, Value};
use sprig_actions::{ExecutorConfig, UnknownActionPolicy};
use std::path::{Path, PathBuf};

/// Command line spelling of [`UnknownActionPolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnknownActions {
    /// Remove unknown steps from the flow
    Drop,
    /// Keep unknown steps as no-ops
    Fallback,
}

impl From<UnknownActions> for UnknownActionPolicy {
    fn from(value: UnknownActions) -> Self {
        match value {
            UnknownActions::Drop => UnknownActionPolicy::Drop,
            UnknownActions::Fallback => UnknownActionPolicy::Fallback,
        }
    }
}

/// Executor options shared by every subcommand that parses a flow
#[derive(Args, Debug)]
pub struct ExecutorArgs {
    /// Executor configuration file (YAML)
    #[arg(long, env = "SPRIG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override how unknown action types are handled
    #[arg(long, value_enum)]
    pub unknown_actions: Option<UnknownActions>,
}

impl ExecutorArgs {
    /// Load the config file, if any, then apply command line overrides
    pub fn load_config(&self) -> Result<ExecutorConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
                ExecutorConfig::from_yaml(&text)
                    .wrap_err_with(|| format!("Invalid config {}", path.display()))?
            }
            None => ExecutorConfig::default(),
        };
        if let Some(policy) = self.unknown_actions {
            config = config.with_unknown_actions(policy.into());
        }
        Ok(config)
    }
}

/// Read a JSON document from `path`, or from stdin when `path` is `-`
pub fn read_json(path: &Path) -> Result<Value> {
    let text = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).wrap_err("Failed to read stdin")?
    } else {
        std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&text).wrap_err_with(|| format!("{} is not valid JSON", path.display()))
}

/// Read a JSON object from `path`
pub fn read_object(path: &Path) -> Result<Map<String, Value>> {
    match read_json(path)? {
        Value::Object(map) => Ok(map),
        _ => Err(eyre!("{} must contain a JSON object", path.display())),
    }
}

/// Number of top-level steps in a raw flow document
pub fn raw_step_count(document: &Value) -> usize {
    match document {
        Value::Array(steps) => steps.len(),
        Value::Object(map) => map
            .get("steps")
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
        _ => 0,
    }
}
