//! # Pipeline
//!
//! The pipeline owns the topology graph (the stage links and their wires)
//! and drives it with one concurrent pump task per wire. A pump loops on
//! its wire's queue and invokes the downstream stage's `receive` with each
//! dequeued event; pumps run independently, so the only ordering guarantee
//! is FIFO within a single wire.
//!
//! Lifecycle: `plug` the topology together, `run` once, `stop` once. Stop
//! closes every wire (further sends fail cleanly), lets each pump drain
//! what was already enqueued, and joins all pump tasks before returning:
//! no `receive` call is in flight after `stop` comes back.
//!
//! Cycles are permitted and not detected; avoiding infinite amplification
//! is the caller's responsibility.

use crate::bolt::{Receiver, Sender};
use crate::error::{LinkError, PipelineError};
use crate::event::Event;
use crate::wire::{DEFAULT_WIRE_CAPACITY, Wire};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPED: u8 = 2;

struct Link {
  wire: Arc<Wire>,
  downstream: Arc<dyn Receiver>,
  upstream_id: String,
  downstream_id: String,
}

/// The topology owner: stage links, wires, and one pump per wire.
///
/// # Example
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// use std::sync::Arc;
/// use eventwire::{Emitter, Pipeline, Relay, vals};
///
/// let emitter = Arc::new(Emitter::new("source"));
/// let relay = Arc::new(Relay::new("forward"));
/// let pipeline = Pipeline::new("demo");
/// pipeline.plug(emitter.clone(), relay.clone())?;
/// pipeline.run().await?;
/// emitter.emit("Karma", vals! { "level" => 20 }).await?;
/// pipeline.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
  id: String,
  capacity: usize,
  links: Mutex<Vec<Link>>,
  state: AtomicU8,
  pumps: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
  shutdown: CancellationToken,
}

impl Pipeline {
  /// Creates an empty pipeline with the default wire capacity.
  pub fn new(id: impl Into<String>) -> Self {
    Self::with_capacity(id, DEFAULT_WIRE_CAPACITY)
  }

  /// Creates an empty pipeline whose wires hold up to `capacity` events.
  pub fn with_capacity(id: impl Into<String>, capacity: usize) -> Self {
    Self {
      id: id.into(),
      capacity,
      links: Mutex::new(Vec::new()),
      state: AtomicU8::new(STATE_IDLE),
      pumps: tokio::sync::Mutex::new(Vec::new()),
      shutdown: CancellationToken::new(),
    }
  }

  /// Returns the pipeline id.
  pub fn id(&self) -> &str {
    &self.id
  }

  /// Returns how many links the topology currently holds.
  pub fn link_count(&self) -> usize {
    self
      .links
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  /// Links `upstream` to `downstream` with a fresh wire.
  ///
  /// Creates the wire, registers it with both endpoints and the topology,
  /// and returns it. Fails if the pair is already linked or the pipeline
  /// has started. Capability checking happens in the signature: only a
  /// [`Sender`] fits upstream and only a [`Receiver`] fits downstream.
  pub fn plug(
    &self,
    upstream: Arc<dyn Sender>,
    downstream: Arc<dyn Receiver>,
  ) -> Result<Arc<Wire>, LinkError> {
    if self.state.load(Ordering::Acquire) != STATE_IDLE {
      return Err(LinkError::TopologyFrozen(self.id.clone()));
    }
    let mut links = self.links.lock().unwrap_or_else(PoisonError::into_inner);
    if links
      .iter()
      .any(|link| link.upstream_id == upstream.id() && link.downstream_id == downstream.id())
    {
      return Err(LinkError::AlreadyLinked {
        upstream: upstream.id().to_string(),
        downstream: downstream.id().to_string(),
      });
    }

    let wire = Arc::new(Wire::new(
      format!("{}->{}", upstream.id(), downstream.id()),
      self.capacity,
    ));
    upstream.link_outlet(Arc::clone(&wire));
    downstream.link_inlet(Arc::clone(&wire));
    tracing::debug!(pipeline = %self.id, wire = wire.id(), "stages plugged");

    links.push(Link {
      wire: Arc::clone(&wire),
      upstream_id: upstream.id().to_string(),
      downstream_id: downstream.id().to_string(),
      downstream,
    });
    Ok(wire)
  }

  /// Starts one pump task per registered wire.
  ///
  /// A pipeline runs once: a second call fails with
  /// [`PipelineError::AlreadyRunning`].
  pub async fn run(&self) -> Result<(), PipelineError> {
    if self
      .state
      .compare_exchange(STATE_IDLE, STATE_RUNNING, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      return Err(PipelineError::AlreadyRunning(self.id.clone()));
    }

    let mut spawned = Vec::new();
    {
      let links = self.links.lock().unwrap_or_else(PoisonError::into_inner);
      for link in links.iter() {
        // Present for every wire on the first (only) run.
        let Some(queue) = link.wire.take_pump_end() else {
          continue;
        };
        spawned.push(tokio::spawn(pump(
          link.wire.id().to_string(),
          queue,
          Arc::clone(&link.downstream),
          self.shutdown.clone(),
        )));
      }
    }

    let pump_count = spawned.len();
    self.pumps.lock().await.extend(spawned);
    tracing::info!(pipeline = %self.id, pumps = pump_count, "pipeline running");
    Ok(())
  }

  /// Stops the pipeline: closes every wire, drains what was already
  /// enqueued, and joins every pump before returning.
  ///
  /// After `stop` returns, no `receive` call is in flight and further
  /// sends fail with [`SendError::WireClosed`](crate::error::SendError).
  pub async fn stop(&self) -> Result<(), PipelineError> {
    if self
      .state
      .compare_exchange(
        STATE_RUNNING,
        STATE_STOPPED,
        Ordering::AcqRel,
        Ordering::Acquire,
      )
      .is_err()
    {
      return Err(PipelineError::NotRunning(self.id.clone()));
    }

    tracing::info!(pipeline = %self.id, "stopping pipeline");
    self.shutdown.cancel();

    let pumps = std::mem::take(&mut *self.pumps.lock().await);
    for pump in pumps {
      if let Err(join_error) = pump.await {
        tracing::warn!(pipeline = %self.id, error = %join_error, "pump task failed");
      }
    }
    tracing::info!(pipeline = %self.id, "pipeline stopped");
    Ok(())
  }
}

impl std::fmt::Debug for Pipeline {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Pipeline")
      .field("id", &self.id)
      .field("capacity", &self.capacity)
      .field("links", &self.link_count())
      .finish()
  }
}

/// One pump: drain one wire into one downstream stage until shutdown.
async fn pump(
  wire_id: String,
  mut queue: mpsc::Receiver<Arc<Event>>,
  downstream: Arc<dyn Receiver>,
  shutdown: CancellationToken,
) {
  tracing::debug!(wire = %wire_id, stage = downstream.id(), "pump started");
  loop {
    tokio::select! {
      biased;
      _ = shutdown.cancelled() => {
        // Refuse new sends, then hand over everything already enqueued.
        queue.close();
        while let Some(event) = queue.recv().await {
          deliver(&wire_id, downstream.as_ref(), event).await;
        }
        break;
      }
      next = queue.recv() => match next {
        Some(event) => deliver(&wire_id, downstream.as_ref(), event).await,
        None => break,
      },
    }
  }
  tracing::debug!(wire = %wire_id, "pump stopped");
}

async fn deliver(wire_id: &str, downstream: &dyn Receiver, event: Arc<Event>) {
  if let Err(error) = downstream.receive(event).await {
    tracing::warn!(
      wire = %wire_id,
      stage = downstream.id(),
      error = %error,
      "delivery failed"
    );
  }
}
