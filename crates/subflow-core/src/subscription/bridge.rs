//! The subscription bridge: demand-gated delivery between one producer and
//! one consumer.
//!
//! [`ReplaySubscription`] mediates between a push-based producer and a
//! pull-based consumer. Values are forwarded only while previously granted
//! demand remains, buffered backlogs replay through the same gate as live
//! pushes, and termination (cancel, completion, failure) is reported
//! downstream exactly once regardless of interleaving.
//!
//! # Thread Safety
//!
//! The demand counter and the terminated flag live behind a single mutex, and
//! every delivery happens while that mutex is held. Producer-side calls
//! (`push`, `finish`, `replay`) and consumer-side calls (`request`, `cancel`)
//! may arrive from independent threads; the lock serializes them, so no two
//! deliveries are ever in flight at once and a push that observes termination
//! can never deliver.
//!
//! # Backpressure
//!
//! The bridge never blocks the producer. A value arriving with no outstanding
//! demand (or after termination) is discarded, not queued; the producer is
//! expected to respect demand, and violations are absorbed defensively.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::subscription::demand::Demand;
use crate::subscription::downstream::Downstream;
use crate::subscription::terminal::Terminal;

// ---------------------------------------------------------------------------
// SubscriptionMetrics
// ---------------------------------------------------------------------------

/// Point-in-time snapshot of a subscription's delivery accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionMetrics {
    /// Total values delivered to the downstream consumer.
    pub values_delivered: u64,
    /// Total values discarded (no demand, or arrival after termination).
    pub values_discarded: u64,
    /// Demand currently outstanding.
    pub pending_demand: Demand,
    /// Whether a terminal state has been reached.
    pub terminated: bool,
}

// ---------------------------------------------------------------------------
// ReplaySubscription
// ---------------------------------------------------------------------------

/// Gated state shared between the producer and consumer sides.
struct State {
    /// Values the consumer has authorized but not yet received.
    demand: Demand,
    /// Absorbing terminal flag; never reset once set.
    terminated: bool,
}

/// The connection of one downstream consumer to a replayable producer.
///
/// Both sides hold the subscription behind an [`Arc`]: the producer calls
/// [`push`](Self::push), [`replay`](Self::replay), and
/// [`finish`](Self::finish); the consumer calls [`request`](Self::request)
/// and [`cancel`](Self::cancel). All operations complete synchronously and
/// never block for flow control.
///
/// # Reentrancy
///
/// Downstream handlers run inside the delivery lock. A consumer grants
/// synchronous demand by returning it from
/// [`Downstream::receive`]; calling [`request`](Self::request) from inside a
/// handler deadlocks.
pub struct ReplaySubscription<T, E> {
    /// The single consumer this bridge forwards to.
    downstream: Box<dyn Downstream<T, E>>,
    /// Demand counter and terminal flag, guarded as one unit.
    state: Mutex<State>,
    /// Total values delivered downstream.
    delivered: AtomicU64,
    /// Total values discarded without delivery.
    discarded: AtomicU64,
}

impl<T: 'static, E: 'static> ReplaySubscription<T, E> {
    /// Creates the bridge and performs the subscription handshake.
    ///
    /// The consumer's [`on_subscribe`](Downstream::on_subscribe) runs before
    /// this returns, so demand granted there is visible to the first
    /// delivery, including a replay issued immediately after attachment.
    #[must_use]
    pub fn attach<D>(downstream: D) -> Arc<Self>
    where
        D: Downstream<T, E>,
    {
        let subscription = Arc::new(Self {
            downstream: Box::new(downstream),
            state: Mutex::new(State {
                demand: Demand::NONE,
                terminated: false,
            }),
            delivered: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        });
        subscription.downstream.on_subscribe(&subscription);
        subscription
    }

    /// Grants further demand.
    ///
    /// Saturating: adding to or from [`Demand::Unbounded`] stays unbounded.
    /// Ignored once terminated. Safe to call from any thread, including
    /// concurrently with producer-side delivery.
    pub fn request(&self, amount: Demand) {
        let mut state = self.state.lock();
        if state.terminated {
            return;
        }
        state.demand = state.demand.saturating_add(amount);
    }

    /// Terminates the subscription from the consumer side.
    ///
    /// Immediate, unconditional, and idempotent. The downstream consumer is
    /// not notified (it initiated the call); subsequent producer-side calls
    /// are silently discarded.
    pub fn cancel(&self) {
        self.state.lock().terminated = true;
    }

    /// Offers one live value for delivery.
    ///
    /// Discarded silently if the subscription is terminated or no demand is
    /// outstanding. On delivery the net demand adjustment is
    /// `demand = demand + granted - 1`, where `granted` is the demand the
    /// consumer returned from [`Downstream::receive`], applied as one atomic
    /// step under the delivery lock.
    pub fn push(&self, value: T) {
        let mut state = self.state.lock();
        self.deliver(&mut state, value);
    }

    /// Reports the terminal signal from the producer side.
    ///
    /// Discarded silently if already terminated, so at most one terminal
    /// signal ever reaches the consumer. The terminated flag is set before
    /// the signal is handed over.
    pub fn finish(&self, terminal: Terminal<E>) {
        let mut state = self.state.lock();
        self.finish_locked(&mut state, terminal);
    }

    /// Replays a batch of buffered values, optionally followed by a terminal
    /// signal.
    ///
    /// Each value passes through the same demand gate as [`push`](Self::push):
    /// if demand runs out mid-batch the remaining values are dropped, not
    /// queued. The trailing terminal is delivered only when the whole batch
    /// was; a batch cut short must not be sealed by a terminal that would
    /// misrepresent the delivered sequence as complete.
    ///
    /// The batch and the terminal are processed under one hold of the
    /// delivery lock, so replayed values reach the consumer in order,
    /// strictly before the terminal and strictly before any live push issued
    /// after this call.
    pub fn replay<I>(&self, values: I, terminal: Option<Terminal<E>>)
    where
        I: IntoIterator<Item = T>,
    {
        let mut state = self.state.lock();
        let mut complete_batch = true;
        for value in values {
            complete_batch &= self.deliver(&mut state, value);
        }
        if let Some(terminal) = terminal {
            if complete_batch {
                self.finish_locked(&mut state, terminal);
            } else {
                tracing::trace!("replay terminal withheld: batch not fully delivered");
            }
        }
    }

    /// Returns `true` once a terminal state has been reached.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    /// Returns the demand currently outstanding.
    #[must_use]
    pub fn pending_demand(&self) -> Demand {
        self.state.lock().demand
    }

    /// Returns a snapshot of this subscription's delivery accounting.
    #[must_use]
    pub fn metrics(&self) -> SubscriptionMetrics {
        let state = self.state.lock();
        SubscriptionMetrics {
            values_delivered: self.delivered.load(Ordering::Relaxed),
            values_discarded: self.discarded.load(Ordering::Relaxed),
            pending_demand: state.demand,
            terminated: state.terminated,
        }
    }

    /// Delivers one value if the gate allows it, applying the delivery and
    /// the demand adjustment as a single step under the state lock.
    ///
    /// Returns `true` if the value was delivered.
    fn deliver(&self, state: &mut State, value: T) -> bool {
        if state.terminated || state.demand.is_zero() {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                terminated = state.terminated,
                "value discarded without delivery"
            );
            return false;
        }
        let granted = self.downstream.receive(value);
        // Add the synchronous grant before spending the consumed unit, so a
        // grant of exactly one sustains a one-for-one delivery loop.
        state.demand = state.demand.saturating_add(granted).saturating_sub(1);
        self.delivered.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Marks the subscription terminated and hands the signal downstream.
    ///
    /// The flag is set first: the signal handler must already observe a
    /// terminated bridge.
    fn finish_locked(&self, state: &mut State, terminal: Terminal<E>) {
        if state.terminated {
            tracing::trace!("terminal signal discarded: already terminated");
            return;
        }
        state.terminated = true;
        self.downstream.receive_terminal(terminal);
    }
}

impl<T, E> fmt::Debug for ReplaySubscription<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ReplaySubscription")
            .field("pending_demand", &state.demand)
            .field("terminated", &state.terminated)
            .field("delivered", &self.delivered.load(Ordering::Relaxed))
            .field("discarded", &self.discarded.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
