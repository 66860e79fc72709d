//! # Wire
//!
//! A wire is the directed edge of the topology: a bounded FIFO queue of
//! shared events with exactly one producer-side handle (held in the upstream
//! stage's outlet list) and one consumer side (taken by the pipeline's pump
//! when it starts). Enqueueing into a full wire suspends the sender; that
//! is the backpressure contract, and events are never dropped.

use crate::error::SendError;
use crate::event::Event;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Queue capacity used by wires unless the pipeline overrides it.
pub const DEFAULT_WIRE_CAPACITY: usize = 64;

/// A bounded, ordered queue connecting one upstream outlet to one
/// downstream inlet.
///
/// Wires are created by [`Pipeline::plug`](crate::pipeline::Pipeline::plug)
/// and owned by the pipeline; the linked stages only hold shared handles.
/// FIFO order holds per wire; there is no ordering guarantee across
/// distinct wires fed by the same sender.
pub struct Wire {
  id: String,
  capacity: usize,
  queue: mpsc::Sender<Arc<Event>>,
  // Consumer side, present until the pump claims it at run time.
  pump_end: Mutex<Option<mpsc::Receiver<Arc<Event>>>>,
}

impl Wire {
  pub(crate) fn new(id: String, capacity: usize) -> Self {
    let (queue, pump_end) = mpsc::channel(capacity);
    Self {
      id,
      capacity,
      queue,
      pump_end: Mutex::new(Some(pump_end)),
    }
  }

  /// Returns the wire id (`"<upstream>-><downstream>"`).
  pub fn id(&self) -> &str {
    &self.id
  }

  /// Returns the bounded queue capacity.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Enqueues one event, suspending while the queue is full.
  ///
  /// Fails with [`SendError::WireClosed`] once the consumer side has shut
  /// down (the pipeline stopped).
  pub(crate) async fn send(&self, event: Arc<Event>) -> Result<(), SendError> {
    self
      .queue
      .send(event)
      .await
      .map_err(|_| SendError::WireClosed(self.id.clone()))
  }

  /// Claims the consumer side of the queue. Yields `Some` exactly once.
  pub(crate) fn take_pump_end(&self) -> Option<mpsc::Receiver<Arc<Event>>> {
    self
      .pump_end
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take()
  }
}

impl fmt::Debug for Wire {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Wire")
      .field("id", &self.id)
      .field("capacity", &self.capacity)
      .finish()
  }
}
