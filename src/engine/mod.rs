//! The interpreter.
//!
//! ## Architecture
//!
//! ```text
//! process(tokens) ──► execute ──► token loop ──► run_level (recursive walker)
//!                                    │                │
//!                                    │                ├─ Task      → run, advance
//!                                    │                ├─ Sublist   → descend, pop, advance
//!                                    │                └─ JumpCall / BreakCurrentLoop
//!                                    │                   resolved at this level
//!                                    └─ dispatch table, then built-in effects for
//!                                       ContinueNextToken / SkipToken / JumpToken /
//!                                       Stop / Halt / Abort / Error
//! ```
//!
//! The engine is a deterministic, caller-directed sequencer: tasks execute in
//! depth-first, left-to-right order, exactly one token and one node in flight
//! at a time. Suspension happens only at signal boundaries, and the recorded
//! [`Position`] is sufficient to resume with an identical remaining trace via
//! [`Engine::restart`].

mod dispatch;
mod hooks;

pub use dispatch::{Decision, SignalDispatch, SignalHandler};
pub use hooks::{ChooserHook, Hooks, LevelHook, RunHook, TaskHook, TokenHook};

use crate::definition::{Callbacks, DEFAULT_KEY, Node};
use crate::errors::{EngineError, EngineResult};
use crate::position::{Position, PositionSelector, TokenSelector};
use crate::signal::Signal;
use crate::store::SharedStore;
use std::sync::Arc;

/// Run-scope configuration, consulted when a run-level signal is resolved.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// When false, a `HaltProcessing` behaves like `ContinueNextToken`
    /// instead of suspending the run.
    pub stop_on_halt: bool,
    /// When false, an unexpected task failure moves on to the next token
    /// instead of failing the run.
    pub stop_on_error: bool,
    /// When true, `StopProcessing` surfaces as [`EngineError::Stopped`]
    /// instead of ending the run quietly.
    pub bubble_stop: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            stop_on_halt: true,
            stop_on_error: true,
            bubble_stop: false,
        }
    }
}

/// Outcome of the walker that needs resolution above the current level.
enum Interrupt {
    /// A signal escaping to the token loop.
    Signal(Signal),
    /// An addressing error; fails the run immediately.
    Fail(EngineError),
}

/// A workflow engine: one definition registry, one position, one store, one
/// hook set. See the crate docs for the execution model.
pub struct Engine<T> {
    callbacks: Callbacks<T>,
    state: Position,
    store: SharedStore,
    hooks: Arc<Hooks<T>>,
    dispatch: Arc<SignalDispatch<T>>,
    options: ProcessOptions,
    current_taskname: Option<String>,
    has_completed: bool,
    has_position: bool,
}

impl<T> Default for Engine<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Engine<T> {
    pub fn new() -> Self {
        Self {
            callbacks: Callbacks::new(),
            state: Position::default(),
            store: SharedStore::new(),
            hooks: Arc::new(Hooks::default()),
            dispatch: Arc::new(SignalDispatch::new()),
            options: ProcessOptions::default(),
            current_taskname: None,
            has_completed: false,
            has_position: false,
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks<T>) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn with_dispatch(mut self, dispatch: SignalDispatch<T>) -> Self {
        self.dispatch = Arc::new(dispatch);
        self
    }

    pub fn with_options(mut self, options: ProcessOptions) -> Self {
        self.options = options;
        self
    }

    pub fn callbacks(&self) -> &Callbacks<T> {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut Callbacks<T> {
        &mut self.callbacks
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SharedStore {
        &mut self.store
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    /// The resumable coordinate of execution, for persistence collaborators.
    pub fn position(&self) -> &Position {
        &self.state
    }

    /// Seed the position from a previously captured [`Position`], marking the
    /// engine resumable; follow with [`Engine::restart`] using `Current`
    /// selectors.
    pub fn load_position(&mut self, position: Position) {
        self.state = position;
        self.has_position = true;
    }

    /// Index of the token currently (or last) in flight.
    pub fn current_index(&self) -> Option<usize> {
        self.state.token_index()
    }

    /// Name of the task currently (or last) executed.
    pub fn current_taskname(&self) -> Option<&str> {
        self.current_taskname.as_deref()
    }

    /// True once a run has reached past the last token normally.
    pub fn has_completed(&self) -> bool {
        self.has_completed
    }

    /// Build a halt signal for a task to return; sugar for [`Signal::halt`]
    /// at call sites that already hold the engine.
    pub fn halt(&self, message: impl Into<String>) -> Signal {
        Signal::halt(message)
    }

    /// Clone this engine for a parallel branch: same hooks, dispatch table
    /// and options; fresh position, fresh store, empty definition registry.
    pub fn duplicate(&self) -> Self {
        Self {
            callbacks: Callbacks::new(),
            state: Position::default(),
            store: SharedStore::new(),
            hooks: Arc::clone(&self.hooks),
            dispatch: Arc::clone(&self.dispatch),
            options: self.options.clone(),
            current_taskname: None,
            has_completed: false,
            has_position: false,
        }
    }

    /// Run the registered workflow over `tokens` from the beginning.
    ///
    /// Resets the position (not the store) first; a suspended run must be
    /// resumed through [`Engine::restart`], never by calling `process` again.
    pub fn process(&mut self, tokens: &mut [T]) -> EngineResult<()> {
        let options = self.options.clone();
        self.process_with(tokens, options)
    }

    pub fn process_with(&mut self, tokens: &mut [T], options: ProcessOptions) -> EngineResult<()> {
        if tokens.is_empty() {
            tracing::warn!("token list is empty; running the workflow on an empty set has no effect");
        }
        self.state.reset();
        self.execute(tokens, &options)
    }

    /// Resume a suspended run at the position named by the selectors.
    ///
    /// The store and position survive; `Current`/`Next`/`Previous` selectors
    /// require a recorded position. The resolved token index is validated
    /// against `tokens`, so supplying a different list than the one the
    /// position was recorded against surfaces as an addressing error rather
    /// than a silent stale read.
    pub fn restart(
        &mut self,
        token: TokenSelector,
        position: PositionSelector,
        tokens: &mut [T],
    ) -> EngineResult<()> {
        let options = self.options.clone();
        self.restart_with(token, position, tokens, options)
    }

    pub fn restart_with(
        &mut self,
        token: TokenSelector,
        position: PositionSelector,
        tokens: &mut [T],
        options: ProcessOptions,
    ) -> EngineResult<()> {
        let target = self.resolve_token_selector(token, tokens.len())?;
        let path = self.resolve_position_selector(position)?;
        tracing::debug!(token = target, path = ?path, "restarting");
        self.state.target_token(target);
        self.state.set_path(path);
        self.execute(tokens, &options)
    }

    fn resolve_token_selector(&self, selector: TokenSelector, len: usize) -> EngineResult<isize> {
        let current = || -> EngineResult<isize> {
            if self.has_position {
                Ok(self.state.token_raw())
            } else {
                Err(EngineError::NoCurrentPosition)
            }
        };
        let target = match selector {
            TokenSelector::First => 0,
            TokenSelector::Last => len as isize - 1,
            TokenSelector::Current => current()?,
            TokenSelector::Next => current()? + 1,
            TokenSelector::Previous => current()? - 1,
            TokenSelector::Index(index) => index as isize,
        };
        // `Next` one past the end completes the run without work; every
        // other selector must address an existing token.
        let limit = if matches!(selector, TokenSelector::Next) {
            len as isize
        } else {
            len as isize - 1
        };
        if target < 0 || target > limit {
            return Err(EngineError::TokenOutOfRange { index: target, len });
        }
        Ok(target)
    }

    fn resolve_position_selector(&self, selector: PositionSelector) -> EngineResult<Vec<usize>> {
        match selector {
            PositionSelector::First => Ok(Vec::new()),
            PositionSelector::Last => {
                let len = self.callbacks.root_len(DEFAULT_KEY);
                if len == 0 {
                    return Err(EngineError::InvalidSelector(
                        "`Last` requires a non-empty default workflow".into(),
                    ));
                }
                Ok(vec![len - 1])
            }
            PositionSelector::Current | PositionSelector::Next | PositionSelector::Previous => {
                if !self.has_position || self.state.path().is_empty() {
                    return Err(EngineError::NoCurrentPosition);
                }
                let mut path = self.state.path().to_vec();
                let innermost = path.len() - 1;
                match selector {
                    PositionSelector::Next => path[innermost] += 1,
                    PositionSelector::Previous => {
                        if path[innermost] == 0 {
                            return Err(EngineError::InvalidSelector(
                                "`Previous` at the start of a level".into(),
                            ));
                        }
                        path[innermost] -= 1;
                    }
                    _ => {}
                }
                Ok(path)
            }
        }
    }

    /// The token loop. Entered by `process` (reset position) and `restart`
    /// (seeded position); the loop pre-increments the token coordinate, so a
    /// seeded position targets `index - 1`.
    fn execute(&mut self, tokens: &mut [T], options: &ProcessOptions) -> EngineResult<()> {
        let hooks = Arc::clone(&self.hooks);
        self.has_completed = false;
        self.has_position = true;
        (hooks.before_processing)(self, tokens);

        loop {
            let next = self.state.token_raw() + 1;
            if next < 0 || next as usize >= tokens.len() {
                break;
            }
            self.state.set_token(next);
            let index = next as usize;

            let key = (hooks.callback_chooser)(self, &tokens[index]);
            let definition = self.callbacks.get(&key)?;
            (hooks.before_object)(self, &mut tokens[index]);

            match self.run_level(&definition, &mut tokens[index], 0) {
                Ok(()) => {
                    (hooks.after_object)(self, &mut tokens[index]);
                    self.state.clear_path();
                }
                Err(Interrupt::Fail(err)) => return Err(err),
                Err(Interrupt::Signal(raised)) => {
                    let signal = match self.consult_dispatch(&raised, &mut tokens[index]) {
                        Decision::Default => raised,
                        Decision::Suppress => {
                            (hooks.after_object)(self, &mut tokens[index]);
                            self.state.clear_path();
                            continue;
                        }
                        Decision::Replace(other) => other,
                    };
                    match signal {
                        Signal::ContinueNextToken => {
                            (hooks.after_object)(self, &mut tokens[index]);
                            self.state.clear_path();
                        }
                        Signal::SkipToken => {
                            tracing::debug!(token = index, "token skipped");
                            self.state.clear_path();
                        }
                        Signal::JumpToken(offset) => {
                            tracing::debug!(offset, from = index, "jumping between tokens");
                            self.state.jump_token(offset);
                        }
                        Signal::Stop => {
                            if options.bubble_stop {
                                return Err(EngineError::Stopped);
                            }
                            tracing::debug!(token = index, "processing stopped");
                            break;
                        }
                        Signal::Halt { message } => {
                            if options.stop_on_halt {
                                tracing::debug!(
                                    token = index,
                                    path = ?self.state.path(),
                                    "processing halted"
                                );
                                return Err(EngineError::Halted { message });
                            }
                            (hooks.after_object)(self, &mut tokens[index]);
                            self.state.clear_path();
                        }
                        Signal::Abort => return Err(EngineError::Aborted),
                        Signal::Error(err) => {
                            if options.stop_on_error {
                                return Err(EngineError::Task {
                                    task: self
                                        .current_taskname
                                        .clone()
                                        .unwrap_or_else(|| "<unnamed>".into()),
                                    source: err,
                                });
                            }
                            tracing::warn!(
                                token = index,
                                error = %err,
                                "task failed; continuing with next token"
                            );
                            self.state.clear_path();
                        }
                        // The walker consumes these; they can only get here
                        // through a dispatch replacement, and no level is
                        // active at the token loop to apply them to.
                        sig @ (Signal::JumpCall(_) | Signal::BreakCurrentLoop) => {
                            return Err(EngineError::InvalidReplacement(sig.name()));
                        }
                    }
                }
            }
        }

        self.has_completed = true;
        (hooks.after_processing)(self, tokens);
        Ok(())
    }

    fn consult_dispatch(&mut self, signal: &Signal, token: &mut T) -> Decision {
        match self.dispatch.handler_for(signal) {
            Some(handler) => handler(self, token, signal),
            None => Decision::Default,
        }
    }

    /// Execute one nesting level against `token`, resuming at the recorded
    /// index. The innermost path index is written before a task runs and
    /// advanced after it completes, so a halt leaves the path pointing at
    /// the suspended task. `JumpCall` and `BreakCurrentLoop` resolve here;
    /// everything else bubbles to the token loop with the deep path intact.
    fn run_level(
        &mut self,
        nodes: &[Node<T>],
        token: &mut T,
        depth: usize,
    ) -> Result<(), Interrupt> {
        let hooks = Arc::clone(&self.hooks);
        self.state.enter_level(depth);
        loop {
            let index = self.state.index_at(depth);
            if index >= nodes.len() {
                return Ok(());
            }
            match &nodes[index] {
                Node::Sublist(sub) => {
                    (hooks.before_callbacks)(self, token, depth + 1);
                    self.run_level(sub, token, depth + 1)?;
                    self.state.pop_below(depth);
                    (hooks.after_callbacks)(self, token, depth + 1);
                    self.state.advance_at(depth);
                }
                Node::Task(task) => {
                    // A recorded path deeper than a task can only mean the
                    // definition changed between runs; drop the stale tail.
                    if self.state.depth() > depth + 1 {
                        self.state.pop_below(depth);
                    }
                    let name = task.name().to_string();
                    self.current_taskname = Some(name.clone());
                    (hooks.before_each_callback)(self, token, &name);
                    tracing::trace!(task = %name, depth, index, "running task");
                    match task.call(token, self) {
                        Ok(()) => {
                            (hooks.after_each_callback)(self, token, &name);
                            self.state.advance_at(depth);
                        }
                        Err(Signal::JumpCall(offset)) => {
                            let target = index as isize + offset;
                            if target < 0 {
                                return Err(Interrupt::Fail(EngineError::JumpOutOfRange {
                                    from: index,
                                    offset,
                                }));
                            }
                            tracing::debug!(offset, from = index, depth, "jump within level");
                            // Overshooting the level falls through to the
                            // parent, same as natural exhaustion.
                            self.state.set_index_at(depth, target as usize);
                        }
                        Err(Signal::BreakCurrentLoop) => {
                            tracing::debug!(depth, "breaking out of current level");
                            return Ok(());
                        }
                        Err(signal) => return Err(Interrupt::Signal(signal)),
                    }
                }
            }
        }
    }
}
