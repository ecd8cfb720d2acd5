//! Control-flow pattern builders.
//!
//! Each builder compiles down to ordinary [`Node`]s, usually a sublist of a
//! guard task plus branch sublists, so patterns nest arbitrarily and stay
//! fully addressable by the position machinery: a halt inside a branch
//! records a path into the compiled sublist and restarts resume there like
//! anywhere else.
//!
//! Conditions take `(&T, &Engine<T>)` and must not mutate; mutation belongs
//! in branch tasks.

use crate::definition::Node;
use crate::engine::Engine;
use crate::signal::Signal;
use std::fmt;

/// Jump `step` nodes forward within the current level.
pub fn task_jump_fwd<T>(step: usize) -> Node<T> {
    Node::task("task_jump_fwd", move |_t, _e: &mut Engine<T>| {
        Err(Signal::JumpCall(step as isize))
    })
}

/// Jump `step` nodes backward within the current level. Landing before the
/// start of the level is an addressing error.
pub fn task_jump_bwd<T>(step: usize) -> Node<T> {
    Node::task("task_jump_bwd", move |_t, _e: &mut Engine<T>| {
        Err(Signal::JumpCall(-(step as isize)))
    })
}

/// Jump by `step` (either direction) when the condition holds.
pub fn task_jump_if<T>(
    cond: impl Fn(&T, &Engine<T>) -> bool + Send + Sync + 'static,
    step: isize,
) -> Node<T> {
    Node::task("task_jump_if", move |t: &mut T, e: &mut Engine<T>| {
        if cond(t, e) {
            Err(Signal::JumpCall(step))
        } else {
            Ok(())
        }
    })
}

/// Leave the current sublist, resuming after it in the parent.
pub fn break_loop<T>() -> Node<T> {
    Node::task("break_loop", |_t, _e: &mut Engine<T>| {
        Err(Signal::BreakCurrentLoop)
    })
}

/// End the whole run; remaining tokens are not processed.
pub fn stop<T>() -> Node<T> {
    Node::task("stop", |_t, _e: &mut Engine<T>| Err(Signal::Stop))
}

/// Suspend the run, preserving the position for `restart`.
pub fn halt_task<T>(message: impl Into<String>) -> Node<T> {
    let message = message.into();
    Node::task("halt_task", move |_t, _e: &mut Engine<T>| {
        Err(Signal::halt(message.clone()))
    })
}

/// Drop the rest of the current token's workflow and move on.
pub fn obj_next<T>() -> Node<T> {
    Node::task("obj_next", |_t, _e: &mut Engine<T>| {
        Err(Signal::ContinueNextToken)
    })
}

/// Skip `step` tokens ahead, starting the target at the root.
pub fn obj_jump_fwd<T>(step: usize) -> Node<T> {
    Node::task("obj_jump_fwd", move |_t, _e: &mut Engine<T>| {
        Err(Signal::JumpToken(step as isize))
    })
}

/// Go back `step` tokens and reprocess from there; clamps at the first token.
pub fn obj_jump_bwd<T>(step: usize) -> Node<T> {
    Node::task("obj_jump_bwd", move |_t, _e: &mut Engine<T>| {
        Err(Signal::JumpToken(-(step as isize)))
    })
}

/// Run `branch` when the condition holds, otherwise skip it.
pub fn if_cond<T>(
    cond: impl Fn(&T, &Engine<T>) -> bool + Send + Sync + 'static,
    branch: Vec<Node<T>>,
) -> Node<T> {
    let guard = Node::task("if_cond", move |t: &mut T, e: &mut Engine<T>| {
        if cond(t, e) {
            Ok(())
        } else {
            Err(Signal::BreakCurrentLoop)
        }
    });
    Node::sublist(vec![guard, Node::sublist(branch)])
}

/// Run `branch` when the condition does not hold.
pub fn if_not<T>(
    cond: impl Fn(&T, &Engine<T>) -> bool + Send + Sync + 'static,
    branch: Vec<Node<T>>,
) -> Node<T> {
    if_cond(move |t, e| !cond(t, e), branch)
}

/// Two-way conditional. Compiles to `[guard, when_true, break, when_false]`;
/// the guard steps into the first branch or jumps over it and the break.
pub fn if_else<T>(
    cond: impl Fn(&T, &Engine<T>) -> bool + Send + Sync + 'static,
    when_true: Vec<Node<T>>,
    when_false: Vec<Node<T>>,
) -> Node<T> {
    let guard = Node::task("if_else", move |t: &mut T, e: &mut Engine<T>| {
        if cond(t, e) {
            Err(Signal::JumpCall(1))
        } else {
            Err(Signal::JumpCall(3))
        }
    });
    Node::sublist(vec![
        guard,
        Node::sublist(when_true),
        break_loop(),
        Node::sublist(when_false),
    ])
}

/// Re-run `body` while the condition holds, checking before each pass.
pub fn while_loop<T>(
    cond: impl Fn(&T, &Engine<T>) -> bool + Send + Sync + 'static,
    body: Vec<Node<T>>,
) -> Node<T> {
    let guard = Node::task("while_loop", move |t: &mut T, e: &mut Engine<T>| {
        if cond(t, e) {
            Ok(())
        } else {
            Err(Signal::BreakCurrentLoop)
        }
    });
    Node::sublist(vec![guard, Node::sublist(body), task_jump_bwd(2)])
}

/// Run `body` once per value, exposing the current value in the engine store
/// under `key`. The iteration counter lives in the store too (under
/// `_for_<key>`), which is what lets a halted loop resume mid-iteration;
/// nested loops therefore need distinct keys.
pub fn for_each<T, V>(values: Vec<V>, key: impl Into<String>, body: Vec<Node<T>>) -> Node<T>
where
    V: Clone + Send + Sync + 'static,
{
    let key = key.into();
    let counter_key = format!("_for_{key}");
    let advance = Node::task("for_each", move |_t, e: &mut Engine<T>| {
        let index = *e.store_mut().get_or_insert_with(&counter_key, || 0usize);
        if index < values.len() {
            e.store_mut().set(key.clone(), values[index].clone());
            e.store_mut().set(counter_key.clone(), index + 1);
            Ok(())
        } else {
            e.store_mut().remove(&counter_key);
            Err(Signal::BreakCurrentLoop)
        }
    });
    Node::sublist(vec![advance, Node::sublist(body), task_jump_bwd(2)])
}

/// Exclusive choice: the arbiter picks exactly one branch by value. A value
/// with no matching branch is a task error.
pub fn choice<T, K>(
    arbiter: impl Fn(&T, &Engine<T>) -> K + Send + Sync + 'static,
    branches: Vec<(K, Vec<Node<T>>)>,
) -> Node<T>
where
    K: PartialEq + fmt::Debug + Send + Sync + 'static,
{
    let mut table: Vec<(K, isize)> = Vec::with_capacity(branches.len());
    let mut level: Vec<Node<T>> = Vec::with_capacity(branches.len() * 2 + 1);
    level.push(Node::sublist(Vec::new())); // dispatcher placeholder
    for (value, branch) in branches {
        table.push((value, level.len() as isize));
        level.push(Node::sublist(branch));
        level.push(break_loop());
    }
    let dispatch = Node::task("choice", move |t: &mut T, e: &mut Engine<T>| {
        let value = arbiter(t, e);
        match table.iter().find(|(k, _)| *k == value) {
            Some((_, offset)) => Err(Signal::JumpCall(*offset)),
            None => Err(anyhow::anyhow!("no branch for choice value {value:?}").into()),
        }
    });
    level[0] = dispatch;
    Node::sublist(level)
}

/// Simple merge: run the first branch, then the merge block, skipping the
/// alternative branches. The alternatives exist to be jumped into; whichever
/// one runs falls through to the merge block.
pub fn simple_merge<T>(branches: Vec<Vec<Node<T>>>, merge: Vec<Node<T>>) -> Node<T> {
    let count = branches.len();
    let mut level: Vec<Node<T>> = Vec::with_capacity(count * 2 + 1);
    for (i, branch) in branches.into_iter().enumerate() {
        level.push(Node::sublist(branch));
        // from slot 2i + 1 over the remaining pairs to the merge block
        level.push(task_jump_fwd(2 * (count - i) - 1));
    }
    level.push(Node::sublist(merge));
    Node::sublist(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::errors::EngineError;
    use crate::position::{PositionSelector, TokenSelector};

    type Token = Vec<String>;

    fn a(word: &'static str) -> Node<Token> {
        Node::task(word, move |t: &mut Token, _e: &mut Engine<Token>| {
            t.push(word.to_string());
            Ok(())
        })
    }

    fn engine_with(nodes: Vec<Node<Token>>) -> Engine<Token> {
        let mut eng = Engine::new();
        eng.callbacks_mut().replace(nodes);
        eng
    }

    fn docs(words: &str) -> Vec<Token> {
        words.split(' ').map(|w| vec![w.to_string()]).collect()
    }

    fn joined(tokens: &[Token]) -> Vec<String> {
        tokens.iter().map(|t| t.join(" ")).collect()
    }

    #[test]
    fn if_else_picks_one_branch() {
        let mut eng = engine_with(vec![
            if_else(
                |t: &Token, _| t[0] == "three",
                vec![a("3"), a("33")],
                vec![a("other"), Node::sublist(vec![a("nested"), a("branch")])],
            ),
            a("end"),
        ]);
        let mut tokens = docs("one two three four five");
        assert!(eng.process(&mut tokens).is_ok());
        assert_eq!(
            joined(&tokens),
            vec![
                "one other nested branch end",
                "two other nested branch end",
                "three 3 33 end",
                "four other nested branch end",
                "five other nested branch end",
            ]
        );
    }

    #[test]
    fn if_else_nests() {
        let has = |w: &'static str| move |t: &Token, _: &Engine<Token>| t.iter().any(|x| x == w);
        let mut eng = engine_with(vec![
            if_else(
                has("three"),
                vec![a("xxx"), if_else(has("xxx"), vec![a("six")], vec![a("error")])],
                vec![if_else(has("four"), vec![a("44")], vec![a("not-four")])],
            ),
            a("end"),
        ]);
        let mut tokens = docs("one three four");
        assert!(eng.process(&mut tokens).is_ok());
        assert_eq!(
            joined(&tokens),
            vec!["one not-four end", "three xxx six end", "four 44 end"]
        );
    }

    #[test]
    fn if_cond_and_if_not() {
        let mut eng = engine_with(vec![
            if_cond(|t: &Token, _| t[0] == "one", vec![a("yes")]),
            if_not(|t: &Token, _| t[0] == "one", vec![a("no")]),
            a("end"),
        ]);
        let mut tokens = docs("one two");
        assert!(eng.process(&mut tokens).is_ok());
        assert_eq!(joined(&tokens), vec!["one yes end", "two no end"]);
    }

    #[test]
    fn while_loop_checks_before_each_pass() {
        let mut eng = engine_with(vec![
            while_loop(|t: &Token, _| t.len() < 4, vec![a("x")]),
            a("end"),
        ]);
        let mut tokens = docs("go");
        assert!(eng.process(&mut tokens).is_ok());
        assert_eq!(joined(&tokens), vec!["go x x x end"]);
    }

    #[test]
    fn task_jump_if_loops_until_false() {
        let mut eng = engine_with(vec![a("x"), task_jump_if(|t: &Token, _| t.len() < 4, -1)]);
        let mut tokens = vec![Token::new()];
        assert!(eng.process(&mut tokens).is_ok());
        assert_eq!(tokens[0], vec!["x", "x", "x", "x"]);
    }

    #[test]
    fn for_each_exposes_the_value_in_the_store() {
        let append_v = Node::task("append_v", |t: &mut Token, e: &mut Engine<Token>| {
            let v = e
                .store()
                .get::<&'static str>("v")
                .copied()
                .ok_or_else(|| anyhow::anyhow!("loop variable missing"))?;
            t.push(v.to_string());
            Ok(())
        });
        let mut eng = engine_with(vec![for_each(vec!["a", "b", "c"], "v", vec![append_v])]);
        let mut tokens = vec![Token::new(), Token::new()];
        assert!(eng.process(&mut tokens).is_ok());
        // the counter is cleaned up on exhaustion, so every token iterates
        assert_eq!(joined(&tokens), vec!["a b c", "a b c"]);
    }

    #[test]
    fn for_each_accepts_owned_values() {
        let append_v = Node::task("append_v", |t: &mut Token, e: &mut Engine<Token>| {
            let v = e
                .store()
                .get::<String>("word")
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("loop variable missing"))?;
            t.push(v);
            Ok(())
        });
        let values = vec!["red".to_string(), "green".to_string()];
        let mut eng = engine_with(vec![for_each(values, "word", vec![append_v])]);
        let mut tokens = vec![Token::new()];
        assert!(eng.process(&mut tokens).is_ok());
        assert_eq!(tokens[0], vec!["red", "green"]);
    }

    #[test]
    fn choice_dispatches_on_the_arbiter_value() {
        // each pass appends the next word and loops back until stop
        let arbiter = |t: &Token, _: &Engine<Token>| t.last().cloned().unwrap_or_default();
        let mut eng = engine_with(vec![
            choice(
                arbiter,
                vec![
                    ("one".to_string(), vec![a("bim")]),
                    ("bim".to_string(), vec![a("bam")]),
                    ("bam".to_string(), vec![a("bom")]),
                    ("bom".to_string(), vec![a("bum")]),
                    ("bum".to_string(), vec![stop()]),
                    ("end".to_string(), vec![a("error")]),
                ],
            ),
            task_jump_bwd(1),
        ]);
        let mut tokens = docs("one");
        assert!(eng.process(&mut tokens).is_ok());
        assert_eq!(tokens[0], vec!["one", "bim", "bam", "bom", "bum"]);
    }

    #[test]
    fn choice_with_no_matching_branch_is_a_task_error() {
        let mut eng = engine_with(vec![choice(
            |_: &Token, _: &Engine<Token>| "nope".to_string(),
            vec![("yes".to_string(), vec![a("yes")])],
        )]);
        let mut tokens = docs("one");
        let err = eng.process(&mut tokens).unwrap_err();
        assert!(matches!(err, EngineError::Task { ref task, .. } if task == "choice"));
    }

    #[test]
    fn simple_merge_runs_one_branch_then_the_merge() {
        let mut eng = engine_with(vec![
            a("start"),
            simple_merge(
                vec![vec![a("bom")], vec![a("error")], vec![a("bam")]],
                vec![a("end")],
            ),
        ]);
        let mut tokens = docs("one");
        assert!(eng.process(&mut tokens).is_ok());
        assert_eq!(tokens[0], vec!["one", "start", "bom", "end"]);
    }

    #[test]
    fn obj_jump_fwd_skips_tokens() {
        let mut eng = engine_with(vec![
            a("seen"),
            if_cond(|t: &Token, _| t[0] == "one", vec![obj_jump_fwd(2)]),
        ]);
        let mut tokens = docs("one two three");
        assert!(eng.process(&mut tokens).is_ok());
        assert_eq!(joined(&tokens), vec!["one seen", "two", "three seen"]);
    }

    // The documented halt/restart walkthrough: a loop appending 0 and 1,
    // then a two-way conditional that halts until the token has grown to
    // the expected shape.
    #[test]
    fn loop_and_conditional_halt_restart_walkthrough() {
        type Tok = Vec<i64>;

        fn append_loop_var() -> Node<Tok> {
            Node::task("append_loop_var", |t: &mut Tok, e: &mut Engine<Tok>| {
                let v = e
                    .store()
                    .get::<i64>("v")
                    .copied()
                    .ok_or_else(|| anyhow::anyhow!("loop variable missing"))?;
                t.push(v);
                Ok(())
            })
        }

        fn append_one() -> Node<Tok> {
            Node::task("append_one", |t: &mut Tok, _e: &mut Engine<Tok>| {
                t.push(1);
                Ok(())
            })
        }

        let mut eng: Engine<Tok> = Engine::new();
        eng.callbacks_mut().replace(vec![
            for_each(vec![0i64, 1], "v", vec![append_loop_var()]),
            if_else(
                |t: &Tok, _| *t == [0, 1, 0, 1],
                vec![append_one()],
                vec![halt_task("not ready"), append_one()],
            ),
        ]);

        let mut tokens: Vec<Tok> = vec![vec![], vec![0, 1], vec![0, 1, 0, 1]];

        // first token grows to [0,1], misses the expected shape, halts
        assert!(matches!(
            eng.process(&mut tokens),
            Err(EngineError::Halted { .. })
        ));
        assert_eq!(tokens[0], vec![0, 1]);

        // re-run the first token from the top: now it matches; the third
        // token overgrows and halts in turn
        assert!(matches!(
            eng.restart(TokenSelector::Current, PositionSelector::First, &mut tokens),
            Err(EngineError::Halted { .. })
        ));
        assert_eq!(tokens[0], vec![0, 1, 0, 1, 1]);
        assert_eq!(tokens[1], vec![0, 1, 0, 1, 1]);
        assert_eq!(tokens[2], vec![0, 1, 0, 1, 0, 1]);

        // resume the third token just past the halt
        assert!(
            eng.restart(TokenSelector::Current, PositionSelector::Next, &mut tokens)
                .is_ok()
        );
        assert_eq!(
            tokens,
            vec![
                vec![0, 1, 0, 1, 1],
                vec![0, 1, 0, 1, 1],
                vec![0, 1, 0, 1, 0, 1, 1],
            ]
        );
    }
}
