//! Value stream that documents can push into

use crate::bindings::{Controllable, MethodArgs, MethodBindingRegistry};
use crate::error::{ActionError, Result};
use serde_json::Value;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Broadcasts values to listeners until closed
#[derive(Debug)]
pub struct StreamController {
    sender: broadcast::Sender<Value>,
    closed: AtomicBool,
}

impl StreamController {
    pub const CATEGORY: &'static str = "streamController";

    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            closed: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.sender.subscribe()
    }

    /// Push a value; returns how many listeners received it
    pub fn add(&self, value: Value) -> Result<usize> {
        if self.is_closed() {
            return Err(ActionError::ExecutionFailed(
                "stream controller is closed".to_string(),
            ));
        }
        Ok(self.sender.send(value).unwrap_or(0))
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Controllable for StreamController {
    fn category(&self) -> &str {
        Self::CATEGORY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(super) fn register(registry: &mut MethodBindingRegistry) {
    registry.register_method(
        StreamController::CATEGORY,
        "add",
        |c: &StreamController, args: &MethodArgs| {
            let value = args.get("value").cloned().unwrap_or(Value::Null);
            c.add(value).map(Value::from)
        },
    );
    registry.register_method(
        StreamController::CATEGORY,
        "close",
        |c: &StreamController, _args: &MethodArgs| {
            c.close();
            Ok(Value::Null)
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_and_close() {
        let mut registry = MethodBindingRegistry::new();
        register(&mut registry);
        let controller = StreamController::new(8);
        let mut rx = controller.subscribe();

        let mut args = MethodArgs::new();
        args.insert("value".to_string(), json!({"n": 1}));
        let delivered = registry.execute(&controller, "add", &args).unwrap();
        assert_eq!(delivered, json!(1));
        assert_eq!(rx.try_recv().unwrap(), json!({"n": 1}));

        registry
            .execute(&controller, "close", &MethodArgs::new())
            .unwrap();
        assert!(registry.execute(&controller, "add", &args).is_err());
    }
}
