//! Demand-gated subscription flow.
//!
//! Connects a push-based producer to a pull-based consumer through a bridge
//! that forwards values only while previously granted demand remains, replays
//! buffered backlogs through the same gate, and reports termination exactly
//! once.
//!
//! ## Types
//!
//! - [`Demand`]: extended natural demand counter (finite count or unbounded)
//! - [`Terminal`]: completion or failure signal, delivered at most once
//! - [`Downstream`]: the consumer-facing contract
//! - [`ReplaySubscription`]: the bridge between one producer and one consumer
//! - [`ReplaySource`]: single-consumer buffered producer handle
//! - [`ValueStream`]: `futures::Stream` adapter with a prefetch demand window

mod bridge;
mod demand;
mod downstream;
mod source;
mod stream;
mod terminal;

pub use bridge::{ReplaySubscription, SubscriptionMetrics};
pub use demand::Demand;
pub use downstream::{downstream_fn, with_initial_demand, Downstream};
pub use source::{ReplaySource, SourceError};
pub use stream::{ValueStream, DEFAULT_PREFETCH};
pub use terminal::Terminal;
