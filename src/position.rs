//! Resumable position state.
//!
//! A [`Position`] is the exact coordinate of execution: which token is in
//! flight and the path of indices through the nested definition. It is a flat
//! value type (one integer plus one integer sequence) so an external
//! persistence layer can serialize it, store it, and later seed a fresh
//! engine with the identical coordinate.

use serde::{Deserialize, Serialize};

/// Sentinel for "before the first token".
const BEFORE_FIRST: isize = -1;

/// The resumable coordinate of execution.
///
/// Invariant: replaying the interpreter from `(token, path)` with the same
/// definition and an equivalent token reproduces the identical remaining
/// trace. `path[0]` indexes the root level, each further element one nesting
/// level deeper; the last element is the next node to execute at the
/// innermost active level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    token: isize,
    path: Vec<usize>,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            token: BEFORE_FIRST,
            path: Vec::new(),
        }
    }
}

impl Position {
    pub fn new(token: isize, path: Vec<usize>) -> Self {
        Self { token, path }
    }

    /// Back to "before first token, root of the definition".
    pub fn reset(&mut self) {
        self.token = BEFORE_FIRST;
        self.path.clear();
    }

    /// Index of the token currently (or last) in flight, if any.
    pub fn token_index(&self) -> Option<usize> {
        usize::try_from(self.token).ok()
    }

    /// Raw token coordinate, `-1` meaning "before first".
    pub fn token_raw(&self) -> isize {
        self.token
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub(crate) fn set_token(&mut self, token: isize) {
        self.token = token;
    }

    /// Position the loop so that its pre-increment lands on `index`.
    pub(crate) fn target_token(&mut self, index: isize) {
        self.token = index - 1;
    }

    pub(crate) fn set_path(&mut self, path: Vec<usize>) {
        self.path = path;
    }

    pub(crate) fn clear_path(&mut self) {
        self.path.clear();
    }

    /// Ensure the path has an index for `depth`, pushing `0` when entering a
    /// fresh level.
    pub(crate) fn enter_level(&mut self, depth: usize) {
        if self.path.len() <= depth {
            self.path.push(0);
        }
    }

    pub(crate) fn index_at(&self, depth: usize) -> usize {
        self.path[depth]
    }

    pub(crate) fn set_index_at(&mut self, depth: usize, index: usize) {
        self.path[depth] = index;
    }

    pub(crate) fn advance_at(&mut self, depth: usize) {
        self.path[depth] += 1;
    }

    /// Drop indices recorded below `depth` (leaving `depth + 1` entries).
    pub(crate) fn pop_below(&mut self, depth: usize) {
        self.path.truncate(depth + 1);
    }

    /// Move the token coordinate by `offset`, clearing the path so that the
    /// target token starts from the root. Landing before the first token
    /// clamps to the first; landing past the last ends the run naturally.
    pub(crate) fn jump_token(&mut self, offset: isize) {
        let target = (self.token + offset).max(0);
        self.target_token(target);
        self.path.clear();
    }
}

/// Which token a `restart` resumes at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenSelector {
    First,
    Last,
    Current,
    Next,
    Previous,
    Index(usize),
}

/// Which node a `restart` resumes at, within the selected token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSelector {
    /// Root of the definition.
    First,
    /// The last node of the root level.
    Last,
    /// The recorded path, re-running the node that was in flight.
    Current,
    /// The recorded path, advanced one node at the innermost level.
    Next,
    /// The recorded path, moved one node back at the innermost level.
    Previous,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_before_first() {
        let pos = Position::default();
        assert_eq!(pos.token_index(), None);
        assert_eq!(pos.token_raw(), -1);
        assert!(pos.path().is_empty());
    }

    #[test]
    fn jump_token_clamps_backwards_and_clears_path() {
        let mut pos = Position::new(1, vec![2, 0, 1]);
        pos.jump_token(-5);
        // pre-increment model: next token picked up is index 0
        assert_eq!(pos.token_raw(), -1);
        assert!(pos.path().is_empty());
    }

    #[test]
    fn level_bookkeeping() {
        let mut pos = Position::default();
        pos.enter_level(0);
        assert_eq!(pos.index_at(0), 0);
        pos.advance_at(0);
        pos.enter_level(1);
        assert_eq!(pos.path(), &[1, 0]);
        pos.pop_below(0);
        assert_eq!(pos.path(), &[1]);
    }

    #[test]
    fn serializes_as_flat_record() {
        let pos = Position::new(3, vec![1, 2, 1]);
        let json = serde_json::to_string(&pos).unwrap();
        assert_eq!(json, r#"{"token":3,"path":[1,2,1]}"#);
        let back: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pos);
    }
}
