//! Async pull-style consumption: [`ValueStream`].
//!
//! Wraps an attached [`ReplaySubscription`] in a `futures`-compatible
//! [`Stream`]. The stream maintains a bounded prefetch window of demand: an
//! initial grant during the subscription handshake, plus one unit replenished
//! per consumed item. Delivered values wait in an internal queue until
//! polled; a failure terminal surfaces as a final `Err` item.
//!
//! # Usage
//!
//! ```rust,ignore
//! use futures::StreamExt;
//!
//! let source = ReplaySource::<u64, String>::new();
//! source.push(1);
//!
//! let mut stream = ValueStream::attach(&source)?;
//! source.push(2);
//! source.complete();
//!
//! while let Some(item) = stream.next().await {
//!     match item {
//!         Ok(value) => process(value),
//!         Err(error) => report(error),
//!     }
//! }
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use futures::Stream;
use parking_lot::Mutex;

use crate::subscription::bridge::ReplaySubscription;
use crate::subscription::demand::Demand;
use crate::subscription::downstream::Downstream;
use crate::subscription::source::{ReplaySource, SourceError};
use crate::subscription::terminal::Terminal;

/// Demand granted up front during the subscription handshake.
pub const DEFAULT_PREFETCH: u64 = 64;

// ---------------------------------------------------------------------------
// Shared queue
// ---------------------------------------------------------------------------

/// Queue shared between the downstream half and the polling half.
struct StreamState<T, E> {
    /// Values delivered but not yet polled.
    queue: VecDeque<T>,
    /// Terminal signal, once received.
    terminal: Option<Terminal<E>>,
    /// Waker of the most recent pending poll.
    waker: Option<Waker>,
}

/// Downstream half: enqueues deliveries and wakes the polling task.
struct QueueDownstream<T, E> {
    state: Arc<Mutex<StreamState<T, E>>>,
    prefetch: u64,
}

impl<T, E> Downstream<T, E> for QueueDownstream<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn on_subscribe(&self, subscription: &Arc<ReplaySubscription<T, E>>) {
        subscription.request(Demand::Finite(self.prefetch));
    }

    fn receive(&self, value: T) -> Demand {
        let waker = {
            let mut state = self.state.lock();
            state.queue.push_back(value);
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
        // The window is replenished from the polling side, one unit per
        // consumed item, so the queue stays bounded by the prefetch.
        Demand::NONE
    }

    fn receive_terminal(&self, terminal: Terminal<E>) {
        let waker = {
            let mut state = self.state.lock();
            state.terminal = Some(terminal);
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

// ---------------------------------------------------------------------------
// ValueStream
// ---------------------------------------------------------------------------

/// Pull-style async view of a subscription.
///
/// Yields `Ok(value)` per delivered value and at most one final `Err(error)`
/// if the source failed; the stream ends after any terminal signal. Dropping
/// the stream cancels the subscription.
///
/// All fields are `Unpin`, so the stream works directly with `select!`-style
/// combinators without explicit pinning.
pub struct ValueStream<T: 'static, E: 'static> {
    /// The bridged subscription, for demand replenishment and cancel.
    subscription: Arc<ReplaySubscription<T, E>>,
    /// Shared queue filled by the downstream half.
    state: Arc<Mutex<StreamState<T, E>>>,
    /// Set once a terminal item has been yielded or the stream cancelled.
    done: bool,
}

impl<T, E> ValueStream<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Attaches to `source` with the default prefetch window.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::AlreadyAttached`] if the source already has a
    /// consumer.
    pub fn attach(source: &ReplaySource<T, E>) -> Result<Self, SourceError> {
        Self::attach_with_prefetch(source, DEFAULT_PREFETCH)
    }

    /// Attaches to `source` with a custom prefetch window.
    ///
    /// `prefetch` bounds how many delivered-but-unpolled values the stream
    /// buffers; backlog replay at attachment is gated by the same window, so
    /// a backlog longer than `prefetch` loses its tail.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::AlreadyAttached`] if the source already has a
    /// consumer.
    pub fn attach_with_prefetch(
        source: &ReplaySource<T, E>,
        prefetch: u64,
    ) -> Result<Self, SourceError> {
        let state = Arc::new(Mutex::new(StreamState {
            queue: VecDeque::new(),
            terminal: None,
            waker: None,
        }));
        let downstream = QueueDownstream {
            state: Arc::clone(&state),
            prefetch,
        };
        let subscription = source.attach(downstream)?;
        Ok(Self {
            subscription,
            state,
            done: false,
        })
    }
}

impl<T: 'static, E: 'static> ValueStream<T, E> {
    /// Returns the underlying subscription handle.
    #[must_use]
    pub fn subscription(&self) -> &Arc<ReplaySubscription<T, E>> {
        &self.subscription
    }

    /// Cancels the subscription and ends the stream.
    ///
    /// Subsequent polls return `None`.
    pub fn cancel(&mut self) {
        if !self.done {
            self.done = true;
            self.subscription.cancel();
        }
    }

    /// Returns `true` once the stream has ended.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl<T: 'static, E: 'static> Stream for ValueStream<T, E> {
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // All fields are Unpin, so get_mut is safe.
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        let mut state = this.state.lock();
        if let Some(value) = state.queue.pop_front() {
            drop(state);
            // One unit per consumed item keeps the prefetch window open.
            this.subscription.request(Demand::Finite(1));
            return Poll::Ready(Some(Ok(value)));
        }
        if let Some(terminal) = state.terminal.take() {
            drop(state);
            this.done = true;
            return match terminal {
                Terminal::Completed => Poll::Ready(None),
                Terminal::Failed(error) => Poll::Ready(Some(Err(error))),
            };
        }
        state.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl<T: 'static, E: 'static> Drop for ValueStream<T, E> {
    fn drop(&mut self) {
        if !self.done {
            self.subscription.cancel();
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
