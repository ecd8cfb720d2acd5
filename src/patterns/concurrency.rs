//! Concurrency pattern builders.
//!
//! Branches run on engine clones ([`Engine::duplicate`]): same hooks,
//! dispatch table and options, fresh position and store, with the branch
//! installed as the clone's definition. Every spawned thread is registered
//! in a [`BranchGroup`] so the caller can always join it; there are no
//! fire-and-forget threads.
//!
//! Tokens are cloned per branch. Sharing data across branches is a property
//! of the token type (e.g. `Arc<Mutex<_>>` tokens share, plain values do
//! not), and serializing access to shared data is the task author's
//! responsibility.

use crate::definition::Node;
use crate::engine::Engine;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread;
use std::time::{Duration, Instant};

/// Default join timeout for [`synchronize`].
pub const MAX_TIMEOUT: Duration = Duration::from_secs(30);

/// Store key under which `parallel_split` parks its [`BranchGroup`] handle.
pub const BRANCHES_KEY: &str = "branches";

/// Store key under which the shared branch lock is seeded.
pub const LOCK_KEY: &str = "lock";

/// Tracks a set of spawned branch threads and joins them with a deadline.
pub struct BranchGroup {
    pending: AtomicUsize,
    tx: Sender<()>,
    rx: Mutex<Receiver<()>>,
}

impl BranchGroup {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = channel();
        Arc::new(Self {
            pending: AtomicUsize::new(0),
            tx,
            rx: Mutex::new(rx),
        })
    }

    /// Run `work` on a new thread registered with this group.
    pub fn spawn(&self, work: impl FnOnce() + Send + 'static) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let tx = self.tx.clone();
        thread::spawn(move || {
            work();
            let _ = tx.send(());
        });
    }

    /// Number of branches not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait for all registered branches, up to `timeout`. Returns `false`
    /// when the deadline passes with branches still running; those branches
    /// keep running and a later join can still collect them.
    pub fn join_with_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let rx = self.rx.lock();
        while self.pending.load(Ordering::SeqCst) > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            match rx.recv_timeout(deadline - now) {
                Ok(()) => {
                    self.pending.fetch_sub(1, Ordering::SeqCst);
                }
                // the group owns a sender, so only a timeout ends the wait
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false;
                }
            }
        }
        true
    }
}

fn spawn_branch<T>(parent: &Engine<T>, branch: &[Node<T>], token: &T, group: &Arc<BranchGroup>)
where
    T: Clone + Send + 'static,
{
    let mut clone = parent.duplicate();
    clone.callbacks_mut().replace(branch.to_vec());
    let mut tokens = vec![token.clone()];
    group.spawn(move || {
        if let Err(err) = clone.process(&mut tokens) {
            tracing::warn!(error = %err, "parallel branch failed");
        }
    });
}

/// Start every branch on its own engine clone and continue immediately.
///
/// Seeds a shared lock handle (`Arc<Mutex<()>>` under [`LOCK_KEY`]) into the
/// parent store and every clone store, and parks the [`BranchGroup`] handle
/// under [`BRANCHES_KEY`] in the parent store so a later task can join the
/// branches.
pub fn parallel_split<T>(branches: Vec<Vec<Node<T>>>) -> Node<T>
where
    T: Clone + Send + 'static,
{
    Node::task("parallel_split", move |t: &mut T, e: &mut Engine<T>| {
        let lock = Arc::new(Mutex::new(()));
        e.store_mut().set(LOCK_KEY, Arc::clone(&lock));
        let group = BranchGroup::new();
        for branch in &branches {
            let mut clone = e.duplicate();
            clone.store_mut().set(LOCK_KEY, Arc::clone(&lock));
            clone.callbacks_mut().replace(branch.clone());
            let mut tokens = vec![t.clone()];
            group.spawn(move || {
                if let Err(err) = clone.process(&mut tokens) {
                    tracing::warn!(error = %err, "parallel branch failed");
                }
            });
        }
        e.store_mut().set(BRANCHES_KEY, group);
        Ok(())
    })
}

/// Run every branch on its own engine clone, wait for all of them, then run
/// the merge block in the parent engine. Uses the default [`MAX_TIMEOUT`].
pub fn synchronize<T>(branches: Vec<Vec<Node<T>>>, merge: Vec<Node<T>>) -> Node<T>
where
    T: Clone + Send + 'static,
{
    synchronize_with(branches, merge, MAX_TIMEOUT)
}

/// [`synchronize`] with an explicit join timeout. On timeout a warning is
/// logged and the merge block still runs exactly once; stragglers keep
/// running detached.
pub fn synchronize_with<T>(
    branches: Vec<Vec<Node<T>>>,
    merge: Vec<Node<T>>,
    timeout: Duration,
) -> Node<T>
where
    T: Clone + Send + 'static,
{
    let waiter = Node::task("synchronize", move |t: &mut T, e: &mut Engine<T>| {
        let group = BranchGroup::new();
        for branch in &branches {
            spawn_branch(e, branch, t, &group);
        }
        if !group.join_with_timeout(timeout) {
            tracing::warn!(
                pending = group.pending(),
                ?timeout,
                "synchronization timed out; continuing without stragglers"
            );
        }
        Ok(())
    });
    Node::sublist(vec![waiter, Node::sublist(merge)])
}
