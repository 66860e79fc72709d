//! # Relay
//!
//! The identity processor: every received event is forwarded to the outlet
//! wires unmodified and in arrival order. Useful as a placeholder stage
//! while shaping a topology, and as the simplest [`Processor`] to read.

use crate::bolt::{Bolt, Inlets, Outlets, Processor, Receiver, Sender};
use crate::error::SendError;
use crate::event::Event;
use async_trait::async_trait;
use std::sync::Arc;

/// A pass-through processor.
#[derive(Debug)]
pub struct Relay {
  id: String,
  outlets: Outlets,
  inlets: Inlets,
}

impl Relay {
  /// Creates a relay with the given stage id.
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      outlets: Outlets::new(),
      inlets: Inlets::new(),
    }
  }
}

impl Bolt for Relay {
  fn id(&self) -> &str {
    &self.id
  }
}

impl Sender for Relay {
  fn outlets(&self) -> &Outlets {
    &self.outlets
  }
}

#[async_trait]
impl Receiver for Relay {
  fn inlets(&self) -> &Inlets {
    &self.inlets
  }

  async fn receive(&self, event: Arc<Event>) -> Result<(), SendError> {
    self.handle(event).await
  }
}

#[async_trait]
impl Processor for Relay {
  async fn process(&self, event: Arc<Event>) -> Result<(), SendError> {
    // Same Arc out as in: fan-out shares the allocation.
    self.send(event).await
  }
}
