//! Consumer-facing contract and adapters.
//!
//! A [`Downstream`] is the single consumer a
//! [`ReplaySubscription`] forwards to. The bridge calls
//! [`on_subscribe`](Downstream::on_subscribe) exactly once during the
//! attachment handshake, [`receive`](Downstream::receive) once per delivered
//! value, and [`receive_terminal`](Downstream::receive_terminal) at most once.
//!
//! # API Styles
//!
//! - **Trait-based**: implement [`Downstream`] for full control over the
//!   handshake, per-value grants, and terminal handling.
//! - **Closure-based**: use [`downstream_fn`] when only per-value handling is
//!   needed, optionally wrapped in [`with_initial_demand`] to open the demand
//!   window during the handshake.

use std::sync::Arc;

use crate::subscription::bridge::ReplaySubscription;
use crate::subscription::demand::Demand;
use crate::subscription::terminal::Terminal;

// ---------------------------------------------------------------------------
// Downstream
// ---------------------------------------------------------------------------

/// Contract implemented by the downstream consumer of a subscription.
///
/// # Reentrancy
///
/// `receive` and `receive_terminal` run inside the bridge's delivery lock.
/// Synchronous demand is granted by returning it from `receive`; calling
/// [`request`](ReplaySubscription::request) from inside either handler
/// deadlocks. `on_subscribe` runs outside the delivery lock and may request
/// freely.
pub trait Downstream<T, E>: Send + Sync + 'static {
    /// Called once, when the subscription is created, before any value or
    /// terminal signal can flow. The consumer may keep the handle and grant
    /// initial demand here, so that an immediately following replay finds a
    /// non-zero demand window.
    fn on_subscribe(&self, subscription: &Arc<ReplaySubscription<T, E>>) {
        let _ = subscription;
    }

    /// Called for each delivered value.
    ///
    /// The returned demand is added to the outstanding counter as part of the
    /// same atomic adjustment that spends the unit consumed by this delivery,
    /// so a grant of [`Demand::Finite(1)`](Demand::Finite) sustains a
    /// one-for-one delivery loop.
    fn receive(&self, value: T) -> Demand;

    /// Called at most once with the terminal signal.
    fn receive_terminal(&self, terminal: Terminal<E>) {
        let _ = terminal;
    }
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

/// Adapter that wraps a closure into a [`Downstream`].
struct FnDownstream<F>(F);

impl<T, E, F> Downstream<T, E> for FnDownstream<F>
where
    F: Fn(T) -> Demand + Send + Sync + 'static,
{
    fn receive(&self, value: T) -> Demand {
        (self.0)(value)
    }
}

/// Wraps a plain closure into a [`Downstream`] consumer.
///
/// The closure receives each value and returns the additional demand to
/// grant. `on_subscribe` and `receive_terminal` keep their default no-op
/// implementations; combine with [`with_initial_demand`] when the consumer
/// needs a demand window before the first delivery.
pub fn downstream_fn<T, E, F>(f: F) -> impl Downstream<T, E>
where
    F: Fn(T) -> Demand + Send + Sync + 'static,
{
    FnDownstream(f)
}

/// Adapter that opens a demand window during the handshake.
struct InitialDemand<D> {
    initial: Demand,
    inner: D,
}

impl<T, E, D> Downstream<T, E> for InitialDemand<D>
where
    T: 'static,
    E: 'static,
    D: Downstream<T, E>,
{
    fn on_subscribe(&self, subscription: &Arc<ReplaySubscription<T, E>>) {
        subscription.request(self.initial);
        self.inner.on_subscribe(subscription);
    }

    fn receive(&self, value: T) -> Demand {
        self.inner.receive(value)
    }

    fn receive_terminal(&self, terminal: Terminal<E>) {
        self.inner.receive_terminal(terminal);
    }
}

/// Wraps `inner` so that `initial` demand is granted during the subscription
/// handshake, before any replay or live delivery can be gated.
pub fn with_initial_demand<T, E, D>(initial: Demand, inner: D) -> impl Downstream<T, E>
where
    T: 'static,
    E: 'static,
    D: Downstream<T, E>,
{
    InitialDemand { initial, inner }
}

// ===========================================================================
// Tests
// ===========================================================================
