//! A resumable, signal-driven workflow engine.
//!
//! Executes an arbitrarily nested list of tasks (a workflow definition)
//! against a sequence of tokens, one task at a time. Tasks direct the
//! interpreter exclusively by returning control [`Signal`]s: jump within a
//! level, jump between tokens, break out of a nesting level, skip a token,
//! stop, or halt. A halt suspends the run while the engine keeps the exact
//! [`Position`] (token index plus nesting path); [`Engine::restart`] resumes
//! from it with a bit-identical remaining trace, even across serialization
//! of the position by an external persistence layer.
//!
//! ## Architecture
//!
//! ```text
//! Engine<T>
//!  ├─ Callbacks          keyed workflow definitions (nested Node lists)
//!  ├─ Position           token index + path, the resumable coordinate
//!  ├─ SharedStore        per-engine cross-task state
//!  ├─ Hooks              run/token/level/task extension points
//!  └─ SignalDispatch     signal-name → handler table
//! ```
//!
//! ## Example
//!
//! ```
//! use flowlite::{Engine, EngineError, Node, PositionSelector, Signal, TokenSelector};
//!
//! let mut engine: Engine<Vec<u32>> = Engine::new();
//! engine.callbacks_mut().replace(vec![
//!     Node::task("grow", |t: &mut Vec<u32>, _e| {
//!         t.push(t.len() as u32);
//!         Ok(())
//!     }),
//!     Node::task("pause", |t: &mut Vec<u32>, _e| {
//!         if t.len() < 2 {
//!             Err(Signal::halt("needs another pass"))
//!         } else {
//!             Ok(())
//!         }
//!     }),
//! ]);
//!
//! let mut tokens = vec![vec![]];
//! assert!(matches!(
//!     engine.process(&mut tokens),
//!     Err(EngineError::Halted { .. })
//! ));
//! engine
//!     .restart(TokenSelector::Current, PositionSelector::First, &mut tokens)
//!     .unwrap();
//! assert_eq!(tokens[0], vec![0, 1]);
//! ```

pub mod definition;
pub mod engine;
pub mod errors;
pub mod patterns;
pub mod position;
pub mod signal;
pub mod store;

pub use definition::{Callbacks, DEFAULT_KEY, Node, Task};
pub use engine::{Decision, Engine, Hooks, ProcessOptions, SignalDispatch};
pub use errors::{EngineError, EngineResult};
pub use position::{Position, PositionSelector, TokenSelector};
pub use signal::{Signal, TaskResult};
pub use store::SharedStore;
