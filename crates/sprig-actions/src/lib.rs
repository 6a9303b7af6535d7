//! Sprig action flow interpreter
//!
//! Turns declarative action flows, parsed from JSON, into sequenced
//! asynchronous execution against a scope of variables and mutable state
//! regions. Platform side effects are delegated to the host through an
//! [`EffectHandler`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                ActionExecutor                 │
//! │  ┌────────────────────────────────────────┐  │
//! │  │           ActionRegistry               │  │
//! │  │  showToast | setState | delay | ...    │  │
//! │  └────────────────────────────────────────┘  │
//! │                     │                         │
//! │                     ▼                         │
//! │  ┌────────────────────────────────────────┐  │
//! │  │           ActionProcessor              │  │
//! │  │  - Evaluate ExprOr fields              │  │
//! │  │  - Read/write StateContext             │  │
//! │  │  - Call MethodBindingRegistry          │  │
//! │  │  - Publish on the MessageBus           │  │
//! │  │  - Hand Effects to the host            │  │
//! │  └────────────────────────────────────────┘  │
//! │                     │                         │
//! │                     ▼                         │
//! │         ExecutionEvent broadcast              │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sprig_actions::{ActionContext, ActionExecutor, ActionRegistry, StateContext};
//! use std::sync::Arc;
//!
//! let executor = ActionExecutor::new(ActionRegistry::with_builtins())?;
//! let flow = executor.parse_flow(&document).unwrap_or_default();
//! let page = Arc::new(StateContext::new("page"));
//! executor.execute(&ActionContext::new(), &flow, None, Some(&page)).await;
//! ```

pub mod action;
pub mod actions;
pub mod bindings;
pub mod bus;
pub mod config;
pub mod context;
pub mod controllers;
pub mod effects;
pub mod error;
pub mod executor;
pub mod flow;
pub mod processor;
pub mod registry;
pub mod state;

pub use action::*;
pub use bindings::*;
pub use bus::*;
pub use config::*;
pub use context::*;
pub use effects::*;
pub use error::*;
pub use executor::*;
pub use flow::*;
pub use processor::*;
pub use registry::*;
pub use state::*;

pub use sprig_expr::{ExprOr, ScopeContext};
