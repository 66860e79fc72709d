//! # Eventwire
//!
//! A small dataflow framework: independent processing stages ("bolts")
//! wired into a directed event-passing topology, driven by one concurrent
//! pump per wire, plus a stateful aggregation processor that folds keyed
//! events into running statistics.
//!
//! ## Key Pieces
//!
//! - **Events**: immutable keyed messages with a dynamically-typed field
//!   map, shared zero-copy across fan-out via `Arc`
//! - **Wires**: bounded FIFO queues connecting one outlet to one inlet,
//!   with blocking backpressure and no drops
//! - **Roles**: narrow `Sender`/`Receiver` capabilities composed into
//!   emitters, processors, and sinks, checked at link time
//! - **Pipeline**: owns the topology and runs one pump task per wire with
//!   coordinated startup and drain-then-join shutdown
//! - **Aggregator**: per-(key, field) accumulators with pluggable fold
//!   functions (running sum, cumulative mean, or your own)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use eventwire::{Aggregator, Directive, Emitter, Pipeline, RunningSum, vals};
//!
//! let emitter = Arc::new(Emitter::new("source"));
//! let stats = Arc::new(Aggregator::new(
//!   "stats",
//!   vec![Directive::new("Karma", "level", RunningSum)],
//! ));
//!
//! let pipeline = Pipeline::new("demo");
//! pipeline.plug(emitter.clone(), stats.clone())?;
//! pipeline.run().await?;
//!
//! emitter.emit("Karma", vals! { "level" => 20 }).await?;
//!
//! pipeline.stop().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Delivery is at-most-once and in-process only: nothing survives a
//! restart, and `Ack` is a local completion hook, not an end-to-end
//! guarantee.

// Documentation enforcement - treat missing docs as errors
#![deny(missing_docs)]

/// Stateful aggregation processor with pluggable fold functions.
pub mod aggregator;
/// Role capabilities and the wire-list mixins stages embed.
pub mod bolt;
/// The Sender-only stage that originates events.
pub mod emitter;
/// Error taxonomy for linking, sending, and pipeline lifecycle.
pub mod error;
/// Event, key, and field-value model.
pub mod event;
/// Topology ownership and the per-wire pump tasks.
pub mod pipeline;
/// The identity pass-through processor.
pub mod relay;
/// The bounded queue connecting one outlet to one inlet.
pub mod wire;

pub use aggregator::{AccState, Aggregator, Directive, Fold, RunningMean, RunningSum};
pub use bolt::{Bolt, Inlets, Outlets, Processor, Receiver, Sender};
pub use emitter::Emitter;
pub use error::{LinkError, PipelineError, SendError};
pub use event::{Event, Key, Vals, Value};
pub use pipeline::Pipeline;
pub use relay::Relay;
pub use wire::{DEFAULT_WIRE_CAPACITY, Wire};

#[cfg(test)]
mod aggregator_test;
