//! Signal-dispatch table.
//!
//! Maps signal names (see [`Signal::name`]) to handler functions consulted
//! when a signal reaches the token loop, before the built-in effect is
//! applied. A handler may suppress the signal (the engine then continues with
//! the next token), replace it with another signal, or defer to the default
//! effect. Signals without a specific handler fall back to the generic
//! handler, which only ever sees unexpected `Error` conditions; the core
//! never swallows a signal on its own.
//!
//! This table is how an external persistence layer hooks "save state on
//! HaltProcessing" without engine-core changes: register a handler for
//! `"HaltProcessing"` that snapshots `engine.position()` and returns
//! [`Decision::Default`] so the halt still bubbles.
//!
//! Handlers receive the engine, the current token and the signal. The nodes
//! still pending for that token are not passed in; a handler that needs them
//! recovers them from the engine: `engine.position()` carries the token
//! index and the path into the definition, and the definition itself comes
//! from `engine.callbacks().get(key)`. Everything at or after the path's
//! innermost index is still pending.

use crate::engine::Engine;
use crate::signal::Signal;
use std::collections::HashMap;
use std::sync::Arc;

/// What a dispatch handler decided about a signal.
pub enum Decision {
    /// Apply the engine's built-in effect.
    Default,
    /// The handler consumed the signal; continue with the next token.
    Suppress,
    /// Re-resolve as a different signal (applied with its built-in effect).
    Replace(Signal),
}

pub type SignalHandler<T> = Arc<dyn Fn(&mut Engine<T>, &mut T, &Signal) -> Decision + Send + Sync>;

pub struct SignalDispatch<T> {
    handlers: HashMap<&'static str, SignalHandler<T>>,
    fallback: Option<SignalHandler<T>>,
}

impl<T> Default for SignalDispatch<T> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: None,
        }
    }
}

impl<T> SignalDispatch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a signal name; returns `self` for chaining.
    pub fn on(
        mut self,
        name: &'static str,
        handler: impl Fn(&mut Engine<T>, &mut T, &Signal) -> Decision + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(name, Arc::new(handler));
        self
    }

    /// Register the generic handler for unexpected task failures.
    pub fn on_unexpected(
        mut self,
        handler: impl Fn(&mut Engine<T>, &mut T, &Signal) -> Decision + Send + Sync + 'static,
    ) -> Self {
        self.fallback = Some(Arc::new(handler));
        self
    }

    pub(crate) fn handler_for(&self, signal: &Signal) -> Option<SignalHandler<T>> {
        if let Some(h) = self.handlers.get(signal.name()) {
            return Some(Arc::clone(h));
        }
        if matches!(signal, Signal::Error(_)) {
            return self.fallback.as_ref().map(Arc::clone);
        }
        None
    }
}

impl<T> Clone for SignalDispatch<T> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
            fallback: self.fallback.clone(),
        }
    }
}
