//! One-shot cancellation token

use crate::bindings::{Controllable, MethodArgs, MethodBindingRegistry};
use crate::error::Result;
use serde_json::Value;
use std::any::Any;
use tokio::sync::watch;

/// A token that flips to cancelled exactly once
#[derive(Debug)]
pub struct CancelToken {
    cancelled: watch::Sender<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub const CATEGORY: &'static str = "cancelToken";

    pub fn new() -> Self {
        let (cancelled, _) = watch::channel(false);
        Self { cancelled }
    }

    /// Cancel the token; returns false if it was already cancelled
    pub fn cancel(&self) -> bool {
        !self.cancelled.send_replace(true)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Wait until the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.cancelled.subscribe();
        // the sender lives in self, so wait_for cannot observe a closed channel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Controllable for CancelToken {
    fn category(&self) -> &str {
        Self::CATEGORY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(super) fn register(registry: &mut MethodBindingRegistry) {
    registry.register_method(
        CancelToken::CATEGORY,
        "cancel",
        |token: &CancelToken, _args: &MethodArgs| -> Result<Value> {
            Ok(Value::Bool(token.cancel()))
        },
    );
}
