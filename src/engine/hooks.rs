//! Extensibility hooks.
//!
//! Four extension layers, each independently overridable:
//! run-level (`before_processing` / `after_processing`), token-level
//! (`before_object` / `after_object`), pipeline-level (`before_callbacks` /
//! `after_callbacks`, fired on entering/leaving a sublist, with the nesting
//! depth) and task-level (`before_each_callback` / `after_each_callback`).
//!
//! Hooks are a plain strategy struct injected at engine construction; the
//! defaults are no-ops. `callback_chooser` picks which registry key holds the
//! definition for a given token (default `"*"`).

use crate::definition::DEFAULT_KEY;
use crate::engine::Engine;
use std::sync::Arc;

pub type RunHook<T> = Arc<dyn Fn(&mut Engine<T>, &mut [T]) + Send + Sync>;
pub type TokenHook<T> = Arc<dyn Fn(&mut Engine<T>, &mut T) + Send + Sync>;
pub type LevelHook<T> = Arc<dyn Fn(&mut Engine<T>, &mut T, usize) + Send + Sync>;
pub type TaskHook<T> = Arc<dyn Fn(&mut Engine<T>, &mut T, &str) + Send + Sync>;
pub type ChooserHook<T> = Arc<dyn Fn(&Engine<T>, &T) -> String + Send + Sync>;

pub struct Hooks<T> {
    /// Fired once when a run (or restart) enters the token loop.
    pub before_processing: RunHook<T>,
    /// Fired once on normal completion of all tokens (also after a
    /// non-bubbled `StopProcessing`), never after halt/abort.
    pub after_processing: RunHook<T>,
    /// Fired before the definition runs against a token.
    pub before_object: TokenHook<T>,
    /// Fired when a token's definition completed normally. Skipped by
    /// `SkipToken` and `AbortProcessing`.
    pub after_object: TokenHook<T>,
    /// Fired when the interpreter enters a sublist (depth >= 1).
    pub before_callbacks: LevelHook<T>,
    /// Fired when a sublist completes or is broken out of.
    pub after_callbacks: LevelHook<T>,
    /// Fired before every task, with the task name.
    pub before_each_callback: TaskHook<T>,
    /// Fired after every task that completed without raising a signal.
    pub after_each_callback: TaskHook<T>,
    /// Maps a token to the registry key holding its definition.
    pub callback_chooser: ChooserHook<T>,
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            before_processing: Arc::new(|_, _| {}),
            after_processing: Arc::new(|_, _| {}),
            before_object: Arc::new(|_, _| {}),
            after_object: Arc::new(|_, _| {}),
            before_callbacks: Arc::new(|_, _, _| {}),
            after_callbacks: Arc::new(|_, _, _| {}),
            before_each_callback: Arc::new(|_, _, _| {}),
            after_each_callback: Arc::new(|_, _, _| {}),
            callback_chooser: Arc::new(|_, _| DEFAULT_KEY.to_string()),
        }
    }
}

impl<T> Clone for Hooks<T> {
    fn clone(&self) -> Self {
        Self {
            before_processing: Arc::clone(&self.before_processing),
            after_processing: Arc::clone(&self.after_processing),
            before_object: Arc::clone(&self.before_object),
            after_object: Arc::clone(&self.after_object),
            before_callbacks: Arc::clone(&self.before_callbacks),
            after_callbacks: Arc::clone(&self.after_callbacks),
            before_each_callback: Arc::clone(&self.before_each_callback),
            after_each_callback: Arc::clone(&self.after_each_callback),
            callback_chooser: Arc::clone(&self.callback_chooser),
        }
    }
}
