//! # Aggregator
//!
//! A stateful [`Processor`] that folds keyed events into running statistics
//! and re-emits updated events. Each [`Directive`] binds an event key and a
//! field name to a [`Fold`]; the aggregator keeps one opaque accumulator per
//! `(key, field)` pair, lazily created from the fold's identity on first
//! match.
//!
//! Matching is deliberately lenient: a directive whose field is absent from
//! an incoming event, or holds a value its fold cannot consume, is skipped
//! for that event with no emission and no error, because heterogeneous
//! event shapes sharing a key are expected.

use crate::bolt::{Bolt, Inlets, Outlets, Processor, Receiver, Sender};
use crate::error::SendError;
use crate::event::{Event, Key, Value};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Opaque accumulator state owned by the aggregator.
pub type AccState = Box<dyn Any + Send>;

/// A pluggable fold over one event field.
///
/// Any `(state, identity, fold)` triple with a projection back to a
/// [`Value`] plugs in here, so statistics beyond the shipped ones (min,
/// max, variance, histograms) need no change to the aggregator itself.
pub trait Fold: Send + Sync {
  /// Creates the accumulator state a fresh `(key, field)` pair starts from.
  fn identity(&self) -> AccState;

  /// Folds one sample into the state, in place.
  ///
  /// Returns `false` when the value's type cannot be folded; the state must
  /// then be left unchanged.
  fn apply(&self, state: &mut (dyn Any + Send), value: &Value) -> bool;

  /// Derives the externally visible value from the state.
  ///
  /// `None` when the state is not this fold's (never happens through the
  /// aggregator, which pairs states with the fold that created them).
  fn project(&self, state: &(dyn Any + Send)) -> Option<Value>;
}

/// Running sum over the integer domain.
///
/// Identity 0; fold adds the sample; projects the sum itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningSum;

impl Fold for RunningSum {
  fn identity(&self) -> AccState {
    Box::new(0i64)
  }

  fn apply(&self, state: &mut (dyn Any + Send), value: &Value) -> bool {
    match (state.downcast_mut::<i64>(), value.as_i64()) {
      (Some(sum), Some(v)) => {
        *sum += v;
        true
      }
      _ => false,
    }
  }

  fn project(&self, state: &(dyn Any + Send)) -> Option<Value> {
    state.downcast_ref::<i64>().map(|sum| Value::Int(*sum))
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MeanState {
  mean: f64,
  count: u64,
}

/// Cumulative arithmetic mean over the float domain.
///
/// Identity (mean 0, count 0); fold recomputes
/// `(mean·n + v) / (n + 1)` with the count tracked explicitly, so this is a
/// true mean over every sample seen, not an exponentially weighted
/// estimate. Integer samples coerce to float.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningMean;

impl Fold for RunningMean {
  fn identity(&self) -> AccState {
    Box::new(MeanState {
      mean: 0.0,
      count: 0,
    })
  }

  fn apply(&self, state: &mut (dyn Any + Send), value: &Value) -> bool {
    match (state.downcast_mut::<MeanState>(), value.as_f64()) {
      (Some(state), Some(v)) => {
        let next = state.count + 1;
        state.mean = (state.mean * state.count as f64 + v) / next as f64;
        state.count = next;
        true
      }
      _ => false,
    }
  }

  fn project(&self, state: &(dyn Any + Send)) -> Option<Value> {
    state
      .downcast_ref::<MeanState>()
      .map(|state| Value::Float(state.mean))
  }
}

/// A rule binding an event key and field name to a fold.
///
/// Read-only once the aggregator is constructed.
pub struct Directive {
  key: Key,
  field: String,
  fold: Box<dyn Fold>,
}

impl Directive {
  /// Creates a directive matching events with `key` and folding `field`.
  pub fn new<F>(key: impl Into<Key>, field: impl Into<String>, fold: F) -> Self
  where
    F: Fold + 'static,
  {
    Self {
      key: key.into(),
      field: field.into(),
      fold: Box::new(fold),
    }
  }

  /// Returns the event key this directive matches.
  pub fn key(&self) -> &str {
    &self.key
  }

  /// Returns the field name this directive folds.
  pub fn field(&self) -> &str {
    &self.field
  }
}

impl std::fmt::Debug for Directive {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Directive")
      .field("key", &self.key)
      .field("field", &self.field)
      .finish()
  }
}

/// The stateful aggregation processor.
///
/// For every received event, each matching directive (in registration
/// order) folds the extracted field value into its accumulator and emits a
/// new event: same key, same fields, with the folded field replaced by the
/// derived statistic.
///
/// Accumulator state is guarded by one mutex over the whole map, which
/// serializes folds from concurrent inlet pumps; the lock is never held
/// across a wire enqueue.
///
/// # Example
///
/// ```rust
/// use eventwire::{Aggregator, Directive, RunningMean, RunningSum};
///
/// let aggregator = Aggregator::new(
///   "stats",
///   vec![
///     Directive::new("Karma", "level", RunningSum),
///     Directive::new("Happiness", "level", RunningMean),
///   ],
/// );
/// assert_eq!(aggregator.directives().len(), 2);
/// ```
pub struct Aggregator {
  id: String,
  outlets: Outlets,
  inlets: Inlets,
  directives: Vec<Directive>,
  states: Mutex<HashMap<(Key, String), AccState>>,
}

impl Aggregator {
  /// Creates an aggregator with the given stage id and directive list.
  pub fn new(id: impl Into<String>, directives: Vec<Directive>) -> Self {
    Self {
      id: id.into(),
      outlets: Outlets::new(),
      inlets: Inlets::new(),
      directives,
      states: Mutex::new(HashMap::new()),
    }
  }

  /// Returns the registered directives, in registration order.
  pub fn directives(&self) -> &[Directive] {
    &self.directives
  }

  /// Folds one sample and derives the updated statistic, under the state
  /// lock. `None` means the directive is skipped for this event.
  fn fold_sample(&self, directive: &Directive, value: &Value) -> Option<Value> {
    let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
    let state = states
      .entry((directive.key.clone(), directive.field.clone()))
      .or_insert_with(|| directive.fold.identity());
    if !directive.fold.apply(state.as_mut(), value) {
      tracing::debug!(
        stage = %self.id,
        key = %directive.key,
        field = %directive.field,
        "value not foldable; directive skipped"
      );
      return None;
    }
    directive.fold.project(state.as_ref())
  }
}

impl Bolt for Aggregator {
  fn id(&self) -> &str {
    &self.id
  }
}

impl Sender for Aggregator {
  fn outlets(&self) -> &Outlets {
    &self.outlets
  }
}

#[async_trait]
impl Receiver for Aggregator {
  fn inlets(&self) -> &Inlets {
    &self.inlets
  }

  async fn receive(&self, event: Arc<Event>) -> Result<(), SendError> {
    self.handle(event).await
  }
}

#[async_trait]
impl Processor for Aggregator {
  async fn process(&self, event: Arc<Event>) -> Result<(), SendError> {
    for directive in &self.directives {
      if directive.key != event.key() {
        continue;
      }
      let Some(value) = event.value(&directive.field) else {
        // Heterogeneous event shapes are expected; absence is not an error.
        continue;
      };
      let Some(derived) = self.fold_sample(directive, value) else {
        continue;
      };
      tracing::trace!(
        stage = %self.id,
        key = event.key(),
        field = %directive.field,
        derived = %derived,
        "emitting folded event"
      );
      let mut vals = event.vals().clone();
      vals.insert(directive.field.clone(), derived);
      self.send(Arc::new(Event::new(event.key(), vals))).await?;
    }
    Ok(())
  }
}
