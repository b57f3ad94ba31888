//! # `subflow-core`
//!
//! Demand-gated subscription flow between a buffered, replayable data source
//! and exactly one downstream consumer.
//!
//! This crate provides:
//! - **Bridge**: [`ReplaySubscription`], the flow-control state machine that
//!   reconciles producer pushes with consumer demand
//! - **Demand**: [`Demand`], an extended natural counter (finite or unbounded)
//!   with saturating arithmetic
//! - **Source**: [`ReplaySource`], a single-consumer producer handle that
//!   records values and replays them to a late-attaching consumer
//! - **Streams**: [`ValueStream`], a `futures`-compatible pull adapter with a
//!   bounded prefetch window
//!
//! ## Design Principles
//!
//! 1. **Never block the producer**: backpressure is expressed by discarding
//!    undemanded values, not by blocking or queuing delivery
//! 2. **One exclusion region**: demand accounting and delivery are a single
//!    atomic step, so synchronous grants are never lost or double-counted
//! 3. **Absorbing termination**: cancel, completion, and failure are one-way
//!    and reported downstream at most once, under any interleaving
//!
//! ## Example
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use subflow_core::{ReplaySource, ValueStream};
//!
//! let source = ReplaySource::<u64, String>::new();
//! source.push(1);
//! source.push(2);
//!
//! let mut stream = ValueStream::attach(&source)?;
//! source.push(3);
//! source.complete();
//!
//! while let Some(item) = stream.next().await {
//!     println!("got {}", item?);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod subscription;

pub use subscription::{
    downstream_fn, with_initial_demand, Demand, Downstream, ReplaySource, ReplaySubscription,
    SourceError, SubscriptionMetrics, Terminal, ValueStream, DEFAULT_PREFETCH,
};
