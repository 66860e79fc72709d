//! # Bolt Roles
//!
//! Stages ("bolts") participate in a topology through narrow capability
//! traits: a [`Sender`] owns outlet wires and broadcasts events to them, a
//! [`Receiver`] owns inlet wires and is handed events by the pipeline's
//! pumps, and a [`Processor`] composes both around a per-event
//! receive → process → send* → ack cycle. Capability checking happens at
//! link time through the type system: [`Pipeline::plug`] only accepts a
//! `Sender` upstream and a `Receiver` downstream.
//!
//! Topology is established before the pipeline starts pumps; `link_outlet`
//! and `link_inlet` are not meant to race `send`/`receive` on the same
//! stage.
//!
//! [`Pipeline::plug`]: crate::pipeline::Pipeline::plug

use crate::error::SendError;
use crate::event::Event;
use crate::wire::Wire;
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared identity of every stage.
///
/// The id is stable for the stage's lifetime and is what diagnostics,
/// wire ids, and duplicate-link detection key on.
pub trait Bolt: Send + Sync {
  /// Returns the stage's stable identifier.
  fn id(&self) -> &str;
}

/// The outlet-wire list a [`Sender`] broadcasts to.
///
/// Concrete stages embed one of these and hand it out through
/// [`Sender::outlets`]; the provided `link_outlet`/`send` methods do the
/// rest. The list is append-only and fixed before pumps start.
#[derive(Debug, Default)]
pub struct Outlets {
  wires: RwLock<Vec<Arc<Wire>>>,
}

impl Outlets {
  /// Creates an empty outlet list.
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends a wire to the broadcast list.
  pub fn attach(&self, wire: Arc<Wire>) {
    self
      .wires
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .push(wire);
  }

  /// Returns how many wires are attached.
  pub fn len(&self) -> usize {
    self
      .wires
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  /// Returns `true` if no wire is attached.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Broadcasts one shared event to every attached wire, in registration
  /// order, awaiting each enqueue in turn.
  ///
  /// A full wire suspends the broadcast; later wires only see the event
  /// once the earlier enqueue completes. The fan-out is sequential by
  /// contract, not parallel.
  pub async fn broadcast(&self, event: Arc<Event>) -> Result<(), SendError> {
    // Snapshot so no lock guard lives across the enqueue awaits.
    let wires = self
      .wires
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone();
    for wire in wires {
      wire.send(Arc::clone(&event)).await?;
    }
    Ok(())
  }
}

/// The inlet-wire list a [`Receiver`] is fed from.
///
/// Inlets exist for bookkeeping and diagnostics: the pipeline drives
/// deliveries from its own link registry, one pump per inlet wire.
#[derive(Debug, Default)]
pub struct Inlets {
  wires: RwLock<Vec<Arc<Wire>>>,
}

impl Inlets {
  /// Creates an empty inlet list.
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends a wire to the inlet list.
  pub fn attach(&self, wire: Arc<Wire>) {
    self
      .wires
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .push(wire);
  }

  /// Returns how many wires feed this stage.
  pub fn len(&self) -> usize {
    self
      .wires
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  /// Returns `true` if no wire feeds this stage.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Capability of stages that originate or forward events.
#[async_trait]
pub trait Sender: Bolt {
  /// Returns the stage's outlet list.
  fn outlets(&self) -> &Outlets;

  /// Registers a wire as one more broadcast target.
  fn link_outlet(&self, wire: Arc<Wire>) {
    self.outlets().attach(wire);
  }

  /// Broadcasts the same event reference to every outlet wire.
  ///
  /// Returns the first [`SendError`] hit; wires registered after the
  /// failing one do not see the event.
  async fn send(&self, event: Arc<Event>) -> Result<(), SendError> {
    tracing::trace!(stage = self.id(), key = event.key(), "broadcasting event");
    self.outlets().broadcast(event).await
  }
}

/// Capability of stages that consume events.
#[async_trait]
pub trait Receiver: Bolt {
  /// Returns the stage's inlet list.
  fn inlets(&self) -> &Inlets;

  /// Registers a wire as one more feed.
  fn link_inlet(&self, wire: Arc<Wire>) {
    self.inlets().attach(wire);
  }

  /// Handles one delivered event. The default is a no-op success.
  ///
  /// A stage with several inlets has one pump per inlet, so `receive` must
  /// tolerate concurrent invocation; any mutable state it touches needs its
  /// own serialization.
  async fn receive(&self, event: Arc<Event>) -> Result<(), SendError> {
    let _ = event;
    Ok(())
  }
}

/// Capability of stages that both consume and forward events.
///
/// Concrete processors implement [`Receiver::receive`] by delegating to the
/// provided [`handle`](Processor::handle) driver, which runs the per-event
/// cycle: `process` (the stage transform, free to `send` zero or more
/// synthesized events downstream) followed by `ack`.
#[async_trait]
pub trait Processor: Sender + Receiver {
  /// The stage-specific transform for one event.
  async fn process(&self, event: Arc<Event>) -> Result<(), SendError>;

  /// Completion signal for one fully processed event.
  ///
  /// No required downstream effect; the default is a no-op. Override for
  /// flow-control bookkeeping or test synchronization.
  fn ack(&self, event: &Event) {
    let _ = event;
  }

  /// Drives the receive → process → send* → ack cycle for one event.
  async fn handle(&self, event: Arc<Event>) -> Result<(), SendError> {
    self.process(Arc::clone(&event)).await?;
    self.ack(&event);
    Ok(())
  }
}
