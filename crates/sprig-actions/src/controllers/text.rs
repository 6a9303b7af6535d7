//! Editable text value

use crate::bindings::{arg_or, Controllable, MethodArgs, MethodBindingRegistry};
use serde_json::Value;
use std::any::Any;
use std::sync::{PoisonError, RwLock};

/// Holds the text of an input field
#[derive(Debug, Default)]
pub struct TextController {
    text: RwLock<String>,
}

impl TextController {
    pub const CATEGORY: &'static str = "textController";

    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            text: RwLock::new(initial.into()),
        }
    }

    pub fn text(&self) -> String {
        self.text
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.write().unwrap_or_else(PoisonError::into_inner) = text.into();
    }

    fn append(&self, suffix: &str) {
        self.text
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(suffix);
    }
}

impl Controllable for TextController {
    fn category(&self) -> &str {
        Self::CATEGORY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(super) fn register(registry: &mut MethodBindingRegistry) {
    // `text` defaults to the empty string when missing or not text-like
    registry.register_method(
        TextController::CATEGORY,
        "setValue",
        |c: &TextController, args: &MethodArgs| {
            c.set_text(arg_or(args, "text", String::new()));
            Ok(Value::String(c.text()))
        },
    );
    registry.register_method(
        TextController::CATEGORY,
        "clear",
        |c: &TextController, _args: &MethodArgs| {
            c.set_text("");
            Ok(Value::Null)
        },
    );
    registry.register_method(
        TextController::CATEGORY,
        "append",
        |c: &TextController, args: &MethodArgs| {
            c.append(&arg_or(args, "text", String::new()));
            Ok(Value::String(c.text()))
        },
    );
}
