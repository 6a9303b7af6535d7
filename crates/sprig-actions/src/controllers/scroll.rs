//! Scroll position

use crate::bindings::{arg_or, Controllable, MethodArgs, MethodBindingRegistry};
use serde_json::Value;
use std::any::Any;
use std::sync::{Mutex, PoisonError};

/// Scroll offset clamped to `[0, max_extent]`
#[derive(Debug)]
pub struct ScrollController {
    offset: Mutex<f64>,
    max_extent: f64,
}

impl ScrollController {
    pub const CATEGORY: &'static str = "scrollController";

    pub fn new(max_extent: f64) -> Self {
        Self {
            offset: Mutex::new(0.0),
            max_extent: max_extent.max(0.0),
        }
    }

    pub fn offset(&self) -> f64 {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `offset`, returning the clamped position
    pub fn jump_to(&self, offset: f64) -> f64 {
        let clamped = offset.clamp(0.0, self.max_extent);
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) = clamped;
        clamped
    }
}

impl Controllable for ScrollController {
    fn category(&self) -> &str {
        Self::CATEGORY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(super) fn register(registry: &mut MethodBindingRegistry) {
    // offsets default to 0 when missing or not numeric
    registry.register_method(
        ScrollController::CATEGORY,
        "jumpTo",
        |c: &ScrollController, args: &MethodArgs| {
            Ok(Value::from(c.jump_to(arg_or(args, "offset", 0.0))))
        },
    );
    registry.register_method(
        ScrollController::CATEGORY,
        "scrollBy",
        |c: &ScrollController, args: &MethodArgs| {
            let delta: f64 = arg_or(args, "delta", 0.0);
            Ok(Value::from(c.jump_to(c.offset() + delta)))
        },
    );
}
