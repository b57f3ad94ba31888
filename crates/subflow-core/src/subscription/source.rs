//! Producer-side replayable source feeding a single subscription.
//!
//! [`ReplaySource`] is the minimal concrete producer the bridge is designed
//! to pair with: it records pushed values into a backlog, replays that
//! backlog (and any recorded terminal signal) when the one consumer attaches,
//! and forwards live values afterwards. Delivery is always gated by the
//! attached [`ReplaySubscription`]'s demand window; the source itself never
//! blocks.
//!
//! # Usage
//!
//! ```rust,ignore
//! let source = ReplaySource::<u64, String>::with_capacity(128);
//! source.push(1);
//! source.push(2);
//!
//! // A late consumer sees the backlog first, then live values.
//! let subscription = source.attach(consumer)?;
//! source.push(3);
//! source.complete();
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::subscription::bridge::ReplaySubscription;
use crate::subscription::downstream::Downstream;
use crate::subscription::terminal::Terminal;

// ---------------------------------------------------------------------------
// SourceError
// ---------------------------------------------------------------------------

/// Errors from source operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The source already feeds an attached consumer.
    #[error("a downstream consumer is already attached")]
    AlreadyAttached,
}

// ---------------------------------------------------------------------------
// ReplaySource
// ---------------------------------------------------------------------------

/// Buffered state shared by the producer-side operations.
struct SourceState<T, E> {
    /// Recorded values, oldest first.
    backlog: VecDeque<T>,
    /// Backlog bound; `None` keeps every value.
    capacity: Option<usize>,
    /// Recorded terminal signal, once the source has finished.
    terminal: Option<Terminal<E>>,
    /// The attached subscription, once a consumer arrives.
    subscription: Option<Arc<ReplaySubscription<T, E>>>,
}

/// A buffered, replayable data source serving exactly one consumer.
///
/// Values pushed before a consumer attaches are recorded and replayed in
/// order at attachment, followed by the recorded terminal signal if the
/// source has already finished. Values pushed afterwards are forwarded live.
/// The backlog keeps recording after attachment, bounded by the configured
/// capacity.
pub struct ReplaySource<T, E> {
    state: Mutex<SourceState<T, E>>,
}

impl<T, E> ReplaySource<T, E> {
    /// Creates a source with an unbounded backlog.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backlog(None)
    }

    /// Creates a source that retains at most `capacity` recorded values,
    /// dropping the oldest when the bound is exceeded.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_backlog(Some(capacity))
    }

    fn with_backlog(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(SourceState {
                backlog: VecDeque::new(),
                capacity,
                terminal: None,
                subscription: None,
            }),
        }
    }

    /// Number of values currently recorded for replay.
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.state.lock().backlog.len()
    }

    /// Returns `true` once a consumer has attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state.lock().subscription.is_some()
    }

    /// Returns `true` once the source has completed or failed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.lock().terminal.is_some()
    }
}

impl<T, E> ReplaySource<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Attaches the single downstream consumer.
    ///
    /// The subscription handshake runs first, so demand granted in
    /// [`Downstream::on_subscribe`] gates the replay that follows: the
    /// recorded backlog, then the recorded terminal signal if the source has
    /// already finished. The handshake runs while the source is locked;
    /// `on_subscribe` must not call back into this source.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::AlreadyAttached`] if a consumer is already
    /// attached.
    pub fn attach<D>(&self, downstream: D) -> Result<Arc<ReplaySubscription<T, E>>, SourceError>
    where
        D: Downstream<T, E>,
    {
        let (subscription, backlog, terminal) = {
            let mut state = self.state.lock();
            if state.subscription.is_some() {
                return Err(SourceError::AlreadyAttached);
            }
            let subscription = ReplaySubscription::attach(downstream);
            state.subscription = Some(Arc::clone(&subscription));
            let backlog: Vec<T> = state.backlog.iter().cloned().collect();
            (subscription, backlog, state.terminal.clone())
        };
        subscription.replay(backlog, terminal);
        Ok(subscription)
    }

    /// Records a value and forwards it to the attached consumer, if any.
    ///
    /// Ignored once the source has finished. Forwarded values remain subject
    /// to the subscription's demand gate.
    pub fn push(&self, value: T) {
        let subscription = {
            let mut state = self.state.lock();
            if state.terminal.is_some() {
                tracing::trace!("push ignored: source already finished");
                return;
            }
            state.backlog.push_back(value.clone());
            if let Some(capacity) = state.capacity {
                while state.backlog.len() > capacity {
                    state.backlog.pop_front();
                }
            }
            state.subscription.clone()
        };
        if let Some(subscription) = subscription {
            subscription.push(value);
        }
    }

    /// Records normal completion and forwards it to the attached consumer.
    ///
    /// Later terminal calls are ignored.
    pub fn complete(&self) {
        self.finish(Terminal::Completed);
    }

    /// Records a failure and forwards it to the attached consumer.
    ///
    /// Later terminal calls are ignored.
    pub fn fail(&self, error: E) {
        self.finish(Terminal::Failed(error));
    }

    fn finish(&self, terminal: Terminal<E>) {
        let subscription = {
            let mut state = self.state.lock();
            if state.terminal.is_some() {
                tracing::trace!("terminal ignored: source already finished");
                return;
            }
            state.terminal = Some(terminal.clone());
            state.subscription.clone()
        };
        if let Some(subscription) = subscription {
            subscription.finish(terminal);
        }
    }
}

impl<T, E> Default for ReplaySource<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
