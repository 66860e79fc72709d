//! # Error Taxonomy
//!
//! All failures surface synchronously from the operation that hit them; the
//! framework performs no internal retries and has no global failure channel.
//! A stalled pump is a liveness issue, not a reported error.

use thiserror::Error;

/// Error returned by [`Pipeline::plug`](crate::pipeline::Pipeline::plug).
///
/// Link errors are non-fatal: the caller decides whether to retry with a
/// corrected topology.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LinkError {
  /// The sender/receiver pair is already connected by a wire.
  #[error("stages '{upstream}' and '{downstream}' are already linked")]
  AlreadyLinked {
    /// Id of the upstream stage.
    upstream: String,
    /// Id of the downstream stage.
    downstream: String,
  },
  /// The pipeline has started; topology can no longer change.
  #[error("pipeline '{0}' has started; topology is frozen")]
  TopologyFrozen(String),
}

/// Error returned by `send`/`emit` when a wire can no longer accept events.
///
/// A send racing a pipeline stop fails with this error rather than
/// panicking or deadlocking.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SendError {
  /// The wire's consumer side has shut down.
  #[error("wire '{0}' is closed")]
  WireClosed(String),
}

/// Error returned by [`Pipeline::run`](crate::pipeline::Pipeline::run) and
/// [`Pipeline::stop`](crate::pipeline::Pipeline::stop).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PipelineError {
  /// `run` was called on a pipeline that already ran.
  #[error("pipeline '{0}' is already running")]
  AlreadyRunning(String),
  /// `stop` was called on a pipeline that is not running.
  #[error("pipeline '{0}' is not running")]
  NotRunning(String),
}
