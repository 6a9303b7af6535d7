//! Built-in controllable objects
//!
//! Each controller exposes a category tag and a set of methods that
//! ControlObject actions can call through the [`MethodBindingRegistry`].
//!
//! # Available Categories
//!
//! - `timer` - periodic ticker: start, pause, resume, reset, cancel
//! - `cancelToken` - one-shot cancellation: cancel
//! - `textController` - editable text: setValue, clear, append
//! - `streamController` - value stream: add, close
//! - `scrollController` - scroll position: jumpTo, scrollBy

mod cancel_token;
mod scroll;
mod stream;
mod text;
mod timer;

pub use cancel_token::CancelToken;
pub use scroll::ScrollController;
pub use stream::StreamController;
pub use text::TextController;
pub use timer::TimerController;

use crate::bindings::MethodBindingRegistry;

/// Register the methods of every built-in controller
pub fn register_builtins(registry: &mut MethodBindingRegistry) {
    timer::register(registry);
    cancel_token::register(registry);
    text::register(registry);
    stream::register(registry);
    scroll::register(registry);
}
