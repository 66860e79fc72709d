//! # Emitter
//!
//! The Sender-only stage that turns external stimuli into events. `emit` is
//! the only event-origination entry point the framework exposes to the
//! application driving the pipeline.

use crate::bolt::{Bolt, Outlets, Sender};
use crate::error::SendError;
use crate::event::{Event, Key, Vals};
use std::sync::Arc;

/// An event source at the edge of a topology.
///
/// # Example
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), eventwire::SendError> {
/// use eventwire::{Emitter, vals};
///
/// let emitter = Emitter::new("sensor");
/// emitter.emit("Karma", vals! { "level" => 20 }).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Emitter {
  id: String,
  outlets: Outlets,
}

impl Emitter {
  /// Creates an emitter with the given stage id.
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      outlets: Outlets::new(),
    }
  }

  /// Constructs an event and broadcasts it to every outlet wire.
  ///
  /// Suspends while any outlet wire is full; fails once a wire has closed.
  pub async fn emit(&self, key: impl Into<Key>, vals: Vals) -> Result<(), SendError> {
    let event = Arc::new(Event::new(key, vals));
    tracing::trace!(emitter = %self.id, key = event.key(), "emitting event");
    self.send(event).await
  }
}

impl Bolt for Emitter {
  fn id(&self) -> &str {
    &self.id
  }
}

impl Sender for Emitter {
  fn outlets(&self) -> &Outlets {
    &self.outlets
  }
}
