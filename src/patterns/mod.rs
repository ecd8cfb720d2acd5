//! Workflow pattern library.
//!
//! Builders that compile common control-flow shapes (conditionals, loops,
//! exclusive choice, merge) and concurrency shapes (parallel split,
//! synchronization) into plain definition [`Node`](crate::definition::Node)s.
//! Nothing here is special to the interpreter: every pattern is expressed
//! through the public signal vocabulary and the engine clone contract, so
//! user code can build its own patterns the same way.

pub mod concurrency;
pub mod controlflow;

pub use concurrency::{BranchGroup, parallel_split, synchronize, synchronize_with};
pub use controlflow::{
    break_loop, choice, for_each, halt_task, if_cond, if_else, if_not, obj_jump_bwd, obj_jump_fwd,
    obj_next, simple_merge, stop, task_jump_bwd, task_jump_fwd, task_jump_if, while_loop,
};
