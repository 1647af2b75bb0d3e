//! A hierarchical progress/state tree with inherited cancellation.
//!
//! Every long-running Zif operation accepts a [`State`] node. A node owns
//! a fixed number of steps; [`State::child`] subdivides the node's next
//! pending step into a subtree with its own step count, and finishing a
//! child automatically completes one step of its parent. Cancellation is
//! shared from the root down: cancelling any node is visible to every
//! node in the same tree.

#![warn(clippy::all)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Errors raised by state tree operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The root state (or an ancestor) was cancelled.
    #[error("operation cancelled")]
    Cancelled,
    /// More steps were marked done than the node was allocated.
    #[error("step overflow: {requested} done but only {total} steps allocated ({current} already done)")]
    StepOverflow {
        /// Steps requested via `done`.
        requested: usize,
        /// Steps already completed before this call.
        current: usize,
        /// Total steps this node was allocated.
        total: usize,
    },
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;

/// A cancellation flag shared by a state tree's root and all descendants.
#[derive(Debug, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, not-yet-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Has cancellation been requested?
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// One node of the progress tree.
///
/// `total_steps` is fixed at construction. `done(n)` marks `n` more steps
/// complete on this node; when the node reaches its total it automatically
/// completes one step of its parent, the recursive step that lets a deep
/// tree report a single coherent root percentage.
pub struct State {
    total_steps: usize,
    current_step: AtomicUsize,
    last_percent: AtomicU8,
    cancel: CancelToken,
    parent: Option<Arc<State>>,
    on_progress: Mutex<Option<Box<dyn Fn(u8) + Send + Sync>>>,
    label: Mutex<Option<String>>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("current_step", &self.current_step.load(Ordering::Relaxed))
            .field("total_steps", &self.total_steps)
            .field("percent", &self.last_percent.load(Ordering::Relaxed))
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl State {
    /// Create a root node with `total_steps` steps and a fresh cancel token.
    #[must_use]
    pub fn new(total_steps: usize) -> Arc<Self> {
        Arc::new(Self {
            total_steps: total_steps.max(1),
            current_step: AtomicUsize::new(0),
            last_percent: AtomicU8::new(0),
            cancel: CancelToken::new(),
            parent: None,
            on_progress: Mutex::new(None),
            label: Mutex::new(None),
        })
    }

    /// Subdivide this node's next pending step into a child subtree of
    /// `child_steps` steps. The child shares this tree's cancel token, so
    /// cancelling anywhere in the tree is visible everywhere in it.
    #[must_use]
    pub fn child(self: &Arc<Self>, child_steps: usize) -> Arc<Self> {
        Arc::new(Self {
            total_steps: child_steps.max(1),
            current_step: AtomicUsize::new(0),
            last_percent: AtomicU8::new(0),
            cancel: self.cancel.clone(),
            parent: Some(Arc::clone(self)),
            on_progress: Mutex::new(None),
            label: Mutex::new(None),
        })
    }

    /// Install a callback invoked with the new percentage whenever this
    /// node's reported percentage increases.
    pub fn set_progress_callback(&self, callback: impl Fn(u8) + Send + Sync + 'static) {
        *self.on_progress.lock() = Some(Box::new(callback));
    }

    /// Attach a human-readable label (surfaced by callers such as the CLI
    /// progress bar).
    pub fn set_label(&self, label: impl Into<String>) {
        *self.label.lock() = Some(label.into());
    }

    /// The current label, if any.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.label.lock().clone()
    }

    /// Mark `steps` more steps of this node complete. Errors if the node
    /// was cancelled, or if this would exceed `total_steps`. When the node
    /// reaches its total, one step of the parent (if any) is completed
    /// too, recursively.
    pub fn done(&self, steps: usize) -> Result<()> {
        self.check_cancelled()?;
        let current = self.current_step.load(Ordering::SeqCst);
        if current + steps > self.total_steps {
            return Err(Error::StepOverflow {
                requested: steps,
                current,
                total: self.total_steps,
            });
        }
        let new_step = self.current_step.fetch_add(steps, Ordering::SeqCst) + steps;
        self.report_percent(new_step);
        if new_step == self.total_steps {
            if let Some(parent) = &self.parent {
                parent.done(1)?;
            }
        }
        Ok(())
    }

    /// Complete all remaining steps of this node at once. A no-op if
    /// already at total (finishing is idempotent, unlike `done`).
    pub fn finished(&self) -> Result<()> {
        self.check_cancelled()?;
        let current = self.current_step.load(Ordering::SeqCst);
        let remaining = self.total_steps.saturating_sub(current);
        if remaining > 0 {
            self.done(remaining)?;
        }
        Ok(())
    }

    /// Request cancellation of this node's entire tree.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Has this node (or any ancestor) been cancelled?
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The node's last reported percentage, 0-100.
    #[must_use]
    pub fn percent(&self) -> u8 {
        self.last_percent.load(Ordering::SeqCst)
    }

    /// The shared cancel token, for handing to code that outlives this
    /// node (e.g. a SIGINT handler installed around an RPM transaction).
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Compute and, if it increased, report the new percentage. Per the
    /// engine's progress-accounting rule, only non-decreasing values are
    /// ever surfaced to a callback.
    fn report_percent(&self, new_step: usize) {
        #[allow(clippy::cast_possible_truncation)]
        let percent = ((new_step * 100) / self.total_steps) as u8;
        let prev = self.last_percent.fetch_max(percent, Ordering::SeqCst);
        if percent > prev {
            trace!(percent, "state progress");
            if let Some(callback) = self.on_progress.lock().as_ref() {
                callback(percent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_reaches_100_percent() {
        let root = State::new(4);
        root.done(1).unwrap();
        root.done(1).unwrap();
        root.done(2).unwrap();
        assert_eq!(root.percent(), 100);
    }

    #[test]
    fn child_completion_advances_parent_one_step() {
        let root = State::new(2);
        let child = root.child(5);
        for _ in 0..5 {
            child.done(1).unwrap();
        }
        assert_eq!(root.percent(), 50);
    }

    #[test]
    fn finished_completes_remaining_steps() {
        let root = State::new(10);
        root.done(3).unwrap();
        root.finished().unwrap();
        assert_eq!(root.percent(), 100);
    }

    #[test]
    fn finished_is_idempotent() {
        let root = State::new(1);
        root.finished().unwrap();
        root.finished().unwrap();
        assert_eq!(root.percent(), 100);
    }

    #[test]
    fn overflow_is_rejected() {
        let root = State::new(2);
        root.done(1).unwrap();
        let err = root.done(5).unwrap_err();
        assert!(matches!(err, Error::StepOverflow { .. }));
    }

    #[test]
    fn cancelling_root_is_visible_to_child() {
        let root = State::new(2);
        let child = root.child(3);
        root.cancel();
        assert!(child.is_cancelled());
        assert!(matches!(child.done(1), Err(Error::Cancelled)));
    }

    #[test]
    fn percent_reports_are_non_decreasing() {
        let root = State::new(3);
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        root.set_progress_callback(move |p| seen2.lock().push(p));
        root.done(1).unwrap();
        root.done(1).unwrap();
        root.done(1).unwrap();
        let reports = seen.lock();
        assert!(reports.windows(2).all(|w| w[1] >= w[0]));
    }
}
