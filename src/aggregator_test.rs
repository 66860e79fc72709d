//! # Aggregator Test Suite
//!
//! Covers the fold laws (prefix sums, cumulative means), directive
//! matching and ordering, skip semantics for absent and unfoldable
//! fields, the pluggable-fold extension point, and accumulator safety
//! under concurrent delivery.

use crate::aggregator::{AccState, Aggregator, Directive, Fold, RunningMean, RunningSum};
use crate::bolt::{Receiver, Sender};
use crate::event::{Event, Value};
use crate::vals;
use crate::wire::Wire;
use proptest::prelude::*;
use std::any::Any;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Rigs an aggregator with a single probe wire on its outlet and hands
/// back the wire's consumer side.
fn rigged(directives: Vec<Directive>, capacity: usize) -> (Aggregator, mpsc::Receiver<Arc<Event>>) {
  let aggregator = Aggregator::new("test-aggregator", directives);
  let wire = Arc::new(Wire::new("test-aggregator->probe".to_string(), capacity));
  aggregator.link_outlet(Arc::clone(&wire));
  let probe = wire.take_pump_end().expect("probe side already taken");
  (aggregator, probe)
}

#[tokio::test]
async fn running_sum_emits_prefix_sums() {
  let (aggregator, mut probe) = rigged(
    vec![Directive::new("Karma", "level", RunningSum)],
    8,
  );

  for expected in [20, 40, 60] {
    aggregator
      .receive(Arc::new(Event::new("Karma", vals! { "level" => 20 })))
      .await
      .unwrap();
    let event = probe.recv().await.unwrap();
    assert_eq!(event.key(), "Karma");
    assert_eq!(event.value("level"), Some(&Value::Int(expected)));
  }
}

#[tokio::test]
async fn running_mean_tracks_cumulative_average() {
  let (aggregator, mut probe) = rigged(
    vec![Directive::new("Happiness", "level", RunningMean)],
    8,
  );

  let samples = [250.5, 0.5, 300.0, 400.0];
  let expected = [250.5, 125.5, 551.0 / 3.0, 237.75];
  for (sample, expected) in samples.into_iter().zip(expected) {
    aggregator
      .receive(Arc::new(Event::new("Happiness", vals! { "level" => sample })))
      .await
      .unwrap();
    let event = probe.recv().await.unwrap();
    let mean = event.value("level").and_then(Value::as_f64).unwrap();
    assert!((mean - expected).abs() < 1e-9, "got {mean}, want {expected}");
  }
}

#[tokio::test]
async fn running_mean_coerces_integer_samples() {
  let (aggregator, mut probe) = rigged(
    vec![Directive::new("Happiness", "level", RunningMean)],
    8,
  );

  aggregator
    .receive(Arc::new(Event::new("Happiness", vals! { "level" => 3 })))
    .await
    .unwrap();
  aggregator
    .receive(Arc::new(Event::new("Happiness", vals! { "level" => 4.0 })))
    .await
    .unwrap();

  probe.recv().await.unwrap();
  let event = probe.recv().await.unwrap();
  assert_eq!(event.value("level"), Some(&Value::Float(3.5)));
}

#[tokio::test]
async fn matching_directives_emit_in_registration_order() {
  let (aggregator, mut probe) = rigged(
    vec![
      Directive::new("Karma", "level", RunningSum),
      Directive::new("Karma", "bonus", RunningSum),
    ],
    8,
  );

  for _ in 0..2 {
    aggregator
      .receive(Arc::new(Event::new(
        "Karma",
        vals! { "level" => 3, "bonus" => 7 },
      )))
      .await
      .unwrap();
  }

  // One emission per matched directive per event, in directive order. The
  // second round makes the order observable: the "level" emission carries
  // the untouched bonus (7) while the "bonus" emission carries the
  // untouched level (3).
  let _ = probe.recv().await.unwrap();
  let _ = probe.recv().await.unwrap();
  let third = probe.recv().await.unwrap();
  assert_eq!(third.value("level"), Some(&Value::Int(6)));
  assert_eq!(third.value("bonus"), Some(&Value::Int(7)));
  let fourth = probe.recv().await.unwrap();
  assert_eq!(fourth.value("level"), Some(&Value::Int(3)));
  assert_eq!(fourth.value("bonus"), Some(&Value::Int(14)));
  assert!(probe.try_recv().is_err());
}

#[tokio::test]
async fn untouched_fields_are_carried_over() {
  let (aggregator, mut probe) = rigged(
    vec![Directive::new("Karma", "level", RunningSum)],
    8,
  );

  aggregator
    .receive(Arc::new(Event::new(
      "Karma",
      vals! { "level" => 20, "mood" => "sunny" },
    )))
    .await
    .unwrap();

  let event = probe.recv().await.unwrap();
  assert_eq!(event.value("level"), Some(&Value::Int(20)));
  assert_eq!(event.value("mood"), Some(&Value::Str("sunny".into())));
}

#[tokio::test]
async fn absent_field_skips_directive_silently() {
  let (aggregator, mut probe) = rigged(
    vec![Directive::new("Karma", "level", RunningSum)],
    8,
  );

  aggregator
    .receive(Arc::new(Event::new("Karma", vals! { "other" => 1 })))
    .await
    .unwrap();
  assert!(probe.try_recv().is_err());

  // The accumulator is untouched by the skipped event.
  aggregator
    .receive(Arc::new(Event::new("Karma", vals! { "level" => 5 })))
    .await
    .unwrap();
  let event = probe.recv().await.unwrap();
  assert_eq!(event.value("level"), Some(&Value::Int(5)));
}

#[tokio::test]
async fn unfoldable_value_skips_directive_silently() {
  let (aggregator, mut probe) = rigged(
    vec![Directive::new("Karma", "level", RunningSum)],
    8,
  );

  aggregator
    .receive(Arc::new(Event::new("Karma", vals! { "level" => "so much" })))
    .await
    .unwrap();
  assert!(probe.try_recv().is_err());

  aggregator
    .receive(Arc::new(Event::new("Karma", vals! { "level" => 5 })))
    .await
    .unwrap();
  let event = probe.recv().await.unwrap();
  assert_eq!(event.value("level"), Some(&Value::Int(5)));
}

#[tokio::test]
async fn unmatched_key_produces_no_emission() {
  let (aggregator, mut probe) = rigged(
    vec![Directive::new("Karma", "level", RunningSum)],
    8,
  );

  aggregator
    .receive(Arc::new(Event::new("Happiness", vals! { "level" => 20 })))
    .await
    .unwrap();
  aggregator
    .receive(Arc::new(Event::new("", vals! { "level" => 20 })))
    .await
    .unwrap();
  assert!(probe.try_recv().is_err());
}

#[tokio::test]
async fn accumulators_are_independent_per_directive() {
  let (aggregator, mut probe) = rigged(
    vec![
      Directive::new("Karma", "level", RunningSum),
      Directive::new("Happiness", "level", RunningSum),
    ],
    8,
  );

  aggregator
    .receive(Arc::new(Event::new("Karma", vals! { "level" => 10 })))
    .await
    .unwrap();
  aggregator
    .receive(Arc::new(Event::new("Happiness", vals! { "level" => 1 })))
    .await
    .unwrap();
  aggregator
    .receive(Arc::new(Event::new("Karma", vals! { "level" => 10 })))
    .await
    .unwrap();

  assert_eq!(
    probe.recv().await.unwrap().value("level"),
    Some(&Value::Int(10))
  );
  assert_eq!(
    probe.recv().await.unwrap().value("level"),
    Some(&Value::Int(1))
  );
  assert_eq!(
    probe.recv().await.unwrap().value("level"),
    Some(&Value::Int(20))
  );
}

/// A fold registered from outside the crate's own set: running maximum.
struct RunningMax;

impl Fold for RunningMax {
  fn identity(&self) -> AccState {
    Box::new(i64::MIN)
  }

  fn apply(&self, state: &mut (dyn Any + Send), value: &Value) -> bool {
    match (state.downcast_mut::<i64>(), value.as_i64()) {
      (Some(max), Some(v)) => {
        *max = (*max).max(v);
        true
      }
      _ => false,
    }
  }

  fn project(&self, state: &(dyn Any + Send)) -> Option<Value> {
    state.downcast_ref::<i64>().map(|max| Value::Int(*max))
  }
}

#[tokio::test]
async fn custom_folds_plug_in_without_aggregator_changes() {
  let (aggregator, mut probe) = rigged(
    vec![Directive::new("Karma", "level", RunningMax)],
    8,
  );

  for (sample, expected) in [(3, 3), (9, 9), (5, 9)] {
    aggregator
      .receive(Arc::new(Event::new("Karma", vals! { "level" => sample })))
      .await
      .unwrap();
    let event = probe.recv().await.unwrap();
    assert_eq!(event.value("level"), Some(&Value::Int(expected)));
  }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deliveries_lose_no_updates() {
  let (aggregator, mut probe) = rigged(
    vec![Directive::new("Karma", "level", RunningSum)],
    256,
  );
  let aggregator = Arc::new(aggregator);

  // Two independent delivery contexts, as two inlet pumps would be.
  let mut feeders = Vec::new();
  for _ in 0..2 {
    let aggregator = Arc::clone(&aggregator);
    feeders.push(tokio::spawn(async move {
      for _ in 0..50 {
        aggregator
          .receive(Arc::new(Event::new("Karma", vals! { "level" => 1 })))
          .await
          .unwrap();
      }
    }));
  }
  for feeder in futures::future::join_all(feeders).await {
    feeder.unwrap();
  }

  // Every fold emitted exactly once; the multiset of emitted sums is the
  // full prefix-sum sequence regardless of interleaving.
  let mut sums = Vec::new();
  while let Ok(event) = probe.try_recv() {
    sums.push(event.value("level").and_then(Value::as_i64).unwrap());
  }
  sums.sort_unstable();
  assert_eq!(sums, (1..=100).collect::<Vec<i64>>());
}

proptest! {
  #[test]
  fn running_sum_obeys_the_prefix_sum_law(
    values in prop::collection::vec(-1_000i64..1_000, 1..32)
  ) {
    let fold = RunningSum;
    let mut state = fold.identity();
    let mut expected = 0i64;
    for v in &values {
      prop_assert!(fold.apply(state.as_mut(), &Value::Int(*v)));
      expected += v;
      prop_assert_eq!(fold.project(state.as_ref()), Some(Value::Int(expected)));
    }
  }

  #[test]
  fn running_mean_obeys_the_cumulative_mean_law(
    values in prop::collection::vec(-1_000.0f64..1_000.0, 1..32)
  ) {
    let fold = RunningMean;
    let mut state = fold.identity();
    let mut sum = 0.0;
    for (n, v) in values.iter().enumerate() {
      prop_assert!(fold.apply(state.as_mut(), &Value::Float(*v)));
      sum += v;
      let expected = sum / (n + 1) as f64;
      let mean = fold
        .project(state.as_ref())
        .and_then(|value| value.as_f64())
        .unwrap();
      prop_assert!((mean - expected).abs() < 1e-6);
    }
  }

  #[test]
  fn running_sum_rejects_non_integer_values(sample in prop::num::f64::NORMAL) {
    let fold = RunningSum;
    let mut state = fold.identity();
    prop_assert!(!fold.apply(state.as_mut(), &Value::Float(sample)));
    prop_assert_eq!(fold.project(state.as_ref()), Some(Value::Int(0)));
  }
}
