//! The control-signal vocabulary.
//!
//! Tasks never talk to the interpreter through return values or shared flags;
//! the only way to alter control flow is to return one of these signals. The
//! interpreter consumes the internal variants (`ContinueNextToken`,
//! `JumpToken`, `JumpCall`, `BreakCurrentLoop`, `SkipToken`) itself and it is
//! a defect for one of them to reach the caller. `Stop`, `Halt` and `Abort`
//! surface as [`EngineError`] values, and `Error` carries an arbitrary task
//! failure.

use crate::errors::EngineError;

/// Result of one task invocation. `Ok(())` means "completed, advance";
/// `Err(signal)` hands a control directive to the interpreter.
pub type TaskResult = Result<(), Signal>;

/// A control directive raised by a task.
#[derive(Debug)]
pub enum Signal {
    /// Terminate the whole run; remaining tokens are not processed.
    Stop,
    /// Suspend immediately, preserving the exact position for `restart`.
    Halt { message: String },
    /// Abort the remaining nodes for this token and advance to the next one.
    ContinueNextToken,
    /// Move the token index by `offset` and restart that token at the root.
    /// `JumpToken(0)` re-runs the current token from the top.
    JumpToken(isize),
    /// Move the innermost call index by `offset` within the current level.
    JumpCall(isize),
    /// Pop one nesting level without advancing, as if the current sublist had
    /// been fully consumed.
    BreakCurrentLoop,
    /// Terminate the run without firing the remaining `after_*` hooks.
    Abort,
    /// Discard the current token: no `after_object`, advance to the next.
    SkipToken,
    /// An unexpected task failure; re-raised to the caller after dispatch.
    Error(anyhow::Error),
}

impl Signal {
    /// Convenience constructor mirroring `engine.halt(message)`.
    pub fn halt(message: impl Into<String>) -> Self {
        Signal::Halt {
            message: message.into(),
        }
    }

    /// Name used to key the signal-dispatch table.
    pub fn name(&self) -> &'static str {
        match self {
            Signal::Stop => "StopProcessing",
            Signal::Halt { .. } => "HaltProcessing",
            Signal::ContinueNextToken => "ContinueNextToken",
            Signal::JumpToken(_) => "JumpToken",
            Signal::JumpCall(_) => "JumpCall",
            Signal::BreakCurrentLoop => "BreakCurrentLoop",
            Signal::Abort => "AbortProcessing",
            Signal::SkipToken => "SkipToken",
            Signal::Error(_) => "Error",
        }
    }

    /// True for signals the interpreter must fully consume before returning.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Signal::ContinueNextToken
                | Signal::JumpToken(_)
                | Signal::JumpCall(_)
                | Signal::BreakCurrentLoop
                | Signal::SkipToken
        )
    }
}

impl From<anyhow::Error> for Signal {
    fn from(err: anyhow::Error) -> Self {
        Signal::Error(err)
    }
}

/// Lets a task drive a nested engine with `?`: a halt (or abort, stop, error)
/// bubbling out of an inner `process` re-raises through the outer engine.
impl From<EngineError> for Signal {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Halted { message } => Signal::Halt { message },
            EngineError::Aborted => Signal::Abort,
            EngineError::Stopped => Signal::Stop,
            other => Signal::Error(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_stable() {
        assert_eq!(Signal::Stop.name(), "StopProcessing");
        assert_eq!(Signal::halt("x").name(), "HaltProcessing");
        assert_eq!(Signal::JumpCall(2).name(), "JumpCall");
        assert_eq!(Signal::Error(anyhow::anyhow!("boom")).name(), "Error");
    }

    #[test]
    fn internal_classification() {
        assert!(Signal::JumpToken(1).is_internal());
        assert!(Signal::SkipToken.is_internal());
        assert!(!Signal::halt("x").is_internal());
        assert!(!Signal::Abort.is_internal());
    }

    #[test]
    fn engine_error_converts_back_to_signal() {
        let sig: Signal = EngineError::Halted {
            message: "paused".into(),
        }
        .into();
        assert!(matches!(sig, Signal::Halt { ref message } if message == "paused"));
    }
}
