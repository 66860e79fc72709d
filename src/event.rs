//! # Event Model
//!
//! Events are the unit of data flowing through a topology: a topic-like key
//! plus a named field mapping. An event is constructed once and read-only
//! thereafter; stages that broadcast to several wires hand the *same*
//! `Arc<Event>` to every outlet, so consumers derive changed events by
//! cloning the field map rather than mutating in place.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Topic-like identifier carried by every event.
///
/// Keys are opaque to the wiring layer; the aggregation processor matches
/// directives against them by exact equality. Empty keys are legal; they
/// simply never match a directive.
pub type Key = String;

/// Named field mapping carried by an event.
pub type Vals = HashMap<String, Value>;

/// A dynamically-typed field value.
///
/// Events carry heterogeneous primitives; this enum covers the value types
/// the framework folds over, serialized untagged so a field map reads as
/// plain JSON in diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  /// A signed integer value.
  Int(i64),
  /// A floating-point value.
  Float(f64),
  /// A string value.
  Str(String),
  /// A boolean value.
  Bool(bool),
}

impl Value {
  /// Returns the integer payload, if this is an [`Value::Int`].
  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Value::Int(v) => Some(*v),
      _ => None,
    }
  }

  /// Returns the value as a float.
  ///
  /// Integers coerce; `Str` and `Bool` do not.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Int(v) => Some(*v as f64),
      Value::Float(v) => Some(*v),
      _ => None,
    }
  }

  /// Returns the string payload, if this is a [`Value::Str`].
  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Str(v) => Some(v),
      _ => None,
    }
  }

  /// Returns the boolean payload, if this is a [`Value::Bool`].
  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(v) => Some(*v),
      _ => None,
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Int(v) => write!(f, "{}", v),
      Value::Float(v) => write!(f, "{}", v),
      Value::Str(v) => write!(f, "{}", v),
      Value::Bool(v) => write!(f, "{}", v),
    }
  }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self {
    Value::Int(v)
  }
}

impl From<i32> for Value {
  fn from(v: i32) -> Self {
    Value::Int(v as i64)
  }
}

impl From<u32> for Value {
  fn from(v: u32) -> Self {
    Value::Int(v as i64)
  }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self {
    Value::Float(v)
  }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self {
    Value::Str(v.to_string())
  }
}

impl From<String> for Value {
  fn from(v: String) -> Self {
    Value::Str(v)
  }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self {
    Value::Bool(v)
  }
}

/// An immutable-after-construction message: a key plus a field mapping.
///
/// Construction performs no validation; an event with an empty key is
/// accepted and flows through the topology like any other.
///
/// # Example
///
/// ```rust
/// use eventwire::{Event, Value, vals};
///
/// let event = Event::new("Karma", vals! { "level" => 20 });
/// assert_eq!(event.key(), "Karma");
/// assert_eq!(event.value("level"), Some(&Value::Int(20)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  key: Key,
  vals: Vals,
}

impl Event {
  /// Constructs a new event from a key and a field mapping.
  pub fn new(key: impl Into<Key>, vals: Vals) -> Self {
    Self {
      key: key.into(),
      vals,
    }
  }

  /// Returns the event key.
  pub fn key(&self) -> &str {
    &self.key
  }

  /// Returns the full field mapping.
  pub fn vals(&self) -> &Vals {
    &self.vals
  }

  /// Returns a single field value, if present.
  pub fn value(&self, field: &str) -> Option<&Value> {
    self.vals.get(field)
  }
}

impl fmt::Display for Event {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}({} fields)", self.key, self.vals.len())
  }
}

/// Builds a [`Vals`] field mapping from `"name" => value` pairs.
///
/// Values go through [`Value::from`], so any primitive with a `From`
/// conversion works on the right-hand side.
///
/// # Example
///
/// ```rust
/// use eventwire::{Value, vals};
///
/// let vals = vals! { "level" => 20, "note" => "rising" };
/// assert_eq!(vals.get("note"), Some(&Value::Str("rising".into())));
/// ```
#[macro_export]
macro_rules! vals {
  () => {
    $crate::event::Vals::new()
  };
  ($($name:expr => $value:expr),+ $(,)?) => {{
    let mut vals = $crate::event::Vals::new();
    $(
      vals.insert(::std::string::String::from($name), $crate::event::Value::from($value));
    )+
    vals
  }};
}
