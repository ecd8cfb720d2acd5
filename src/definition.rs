//! Workflow definitions.
//!
//! A definition is an ordered, arbitrarily nested sequence of [`Node`]s: each
//! node is either a [`Task`] (a callable taking the current token and the
//! engine) or a sublist, i.e. a nested definition. Insertion order is
//! execution order. Definitions are cheap to clone (tasks are `Arc`s) and are
//! snapshotted per token, so they are effectively immutable while a run is in
//! flight.
//!
//! The [`Callbacks`] registry keys definitions by name; the engine resolves a
//! key per token through its chooser hook, defaulting to `"*"`.

use crate::engine::Engine;
use crate::errors::{EngineError, EngineResult};
use crate::signal::TaskResult;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Key under which the default workflow is registered.
pub const DEFAULT_KEY: &str = "*";

pub type TaskFn<T> = dyn Fn(&mut T, &mut Engine<T>) -> TaskResult + Send + Sync;

/// A named callable unit of work.
pub struct Task<T> {
    name: Arc<str>,
    run: Arc<TaskFn<T>>,
}

impl<T> Task<T> {
    pub fn new(
        name: impl Into<Arc<str>>,
        run: impl Fn(&mut T, &mut Engine<T>) -> TaskResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            run: Arc::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(&self, token: &mut T, engine: &mut Engine<T>) -> TaskResult {
        (self.run)(token, engine)
    }
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            run: Arc::clone(&self.run),
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("name", &self.name).finish()
    }
}

/// One element of a definition: a task or a nested sub-pipeline.
#[derive(Debug)]
pub enum Node<T> {
    Task(Task<T>),
    Sublist(Vec<Node<T>>),
}

impl<T> Node<T> {
    pub fn task(
        name: impl Into<Arc<str>>,
        run: impl Fn(&mut T, &mut Engine<T>) -> TaskResult + Send + Sync + 'static,
    ) -> Self {
        Node::Task(Task::new(name, run))
    }

    pub fn sublist(nodes: Vec<Node<T>>) -> Self {
        Node::Sublist(nodes)
    }
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        match self {
            Node::Task(t) => Node::Task(t.clone()),
            Node::Sublist(nodes) => Node::Sublist(nodes.clone()),
        }
    }
}

/// Keyed registry of workflow definitions.
pub struct Callbacks<T> {
    map: HashMap<String, Arc<Vec<Node<T>>>>,
}

impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl<T> Callbacks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one node to the definition under `key`, creating it if needed.
    pub fn add(&mut self, key: &str, node: Node<T>) {
        let entry = self
            .map
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Vec::new()));
        Arc::make_mut(entry).push(node);
    }

    pub fn add_many(&mut self, key: &str, nodes: Vec<Node<T>>) {
        for node in nodes {
            self.add(key, node);
        }
    }

    /// Replace the default (`"*"`) workflow.
    pub fn replace(&mut self, nodes: Vec<Node<T>>) {
        self.replace_keyed(DEFAULT_KEY, nodes);
    }

    pub fn replace_keyed(&mut self, key: &str, nodes: Vec<Node<T>>) {
        self.map.insert(key.to_string(), Arc::new(nodes));
    }

    pub fn get(&self, key: &str) -> EngineResult<Arc<Vec<Node<T>>>> {
        self.map
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::MissingDefinition(key.to_string()))
    }

    pub fn remove(&mut self, key: &str) {
        self.map.remove(key);
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of nodes at the root of the definition under `key`.
    pub fn root_len(&self, key: &str) -> usize {
        self.map.get(key).map(|nodes| nodes.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Tok = Vec<&'static str>;

    fn noop() -> Node<Tok> {
        Node::task("noop", |_t, _e| Ok(()))
    }

    #[test]
    fn add_creates_key_on_demand() {
        let mut cb: Callbacks<Tok> = Callbacks::new();
        assert!(cb.get(DEFAULT_KEY).is_err());
        cb.add(DEFAULT_KEY, noop());
        cb.add(DEFAULT_KEY, noop());
        assert_eq!(cb.get(DEFAULT_KEY).unwrap().len(), 2);
    }

    #[test]
    fn replace_swaps_whole_definition() {
        let mut cb: Callbacks<Tok> = Callbacks::new();
        cb.add(DEFAULT_KEY, noop());
        cb.replace(vec![noop(), Node::sublist(vec![noop(), noop()]), noop()]);
        assert_eq!(cb.root_len(DEFAULT_KEY), 3);
    }

    #[test]
    fn missing_key_is_an_error() {
        let cb: Callbacks<Tok> = Callbacks::new();
        let err = cb.get("nope").unwrap_err();
        assert!(matches!(err, EngineError::MissingDefinition(k) if k == "nope"));
    }
}
