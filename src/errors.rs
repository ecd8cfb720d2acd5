//! Error taxonomy for the engine.
//!
//! Three caller-visible families:
//! - suspension/termination (`Halted`, `Aborted`, `Stopped`): raised by
//!   control signals, the caller catches these and usually calls `restart`;
//! - addressing errors (`JumpOutOfRange`, `TokenOutOfRange`, `InvalidSelector`,
//!   `InvalidReplacement`, `NoCurrentPosition`, `MissingDefinition`):
//!   programmer errors, fail fast;
//! - `Task`: an arbitrary failure raised by task code, re-raised unchanged.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Processing was suspended by a `HaltProcessing` signal. The engine keeps
    /// its exact position; resume with [`crate::Engine::restart`].
    #[error("processing halted: {message}")]
    Halted { message: String },

    /// Processing was terminated by `AbortProcessing`. No `after_*` hooks ran
    /// for the current token.
    #[error("processing aborted")]
    Aborted,

    /// `StopProcessing` was configured to bubble to the caller.
    #[error("processing stopped")]
    Stopped,

    /// No workflow definition is registered under the requested key.
    #[error("no workflow registered for key `{0}`")]
    MissingDefinition(String),

    /// A `JumpCall` offset landed before the start of the current level.
    #[error("jump offset {offset} from index {from} lands before the start of the current level")]
    JumpOutOfRange { from: usize, offset: isize },

    /// A resolved token index does not address the supplied token list.
    #[error("token index {index} out of range for {len} tokens")]
    TokenOutOfRange { index: isize, len: usize },

    /// A restart selector could not be resolved.
    #[error("invalid restart selector: {0}")]
    InvalidSelector(String),

    /// A dispatch handler replaced a signal with one that only resolves
    /// inside a nesting level, where no level is active anymore.
    #[error("replacement signal `{0}` only resolves inside a nesting level")]
    InvalidReplacement(&'static str),

    /// A relative selector (`Current`/`Next`/`Previous`) was used, but the
    /// engine has never recorded a position.
    #[error("selector requires a prior run, but the engine has no recorded position")]
    NoCurrentPosition,

    /// A task raised an unexpected condition; forwarded to the caller after
    /// the generic dispatch handler (if any) observed it.
    #[error("task `{task}` failed: {source}")]
    Task {
        task: String,
        #[source]
        source: anyhow::Error,
    },
}
