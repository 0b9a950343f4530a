//! The opaque per-build configuration and the ways symbols bind to it.
//!
//! Function variants of variables, rules and pools are evaluated against a
//! [`Config`] during generation. The core never looks inside it. Three ways of
//! binding a value to it exist:
//!
//! - closures of the uniform shape `Fn(&Config) -> anyhow::Result<T>`
//! - typed config methods `Fn(&C) -> String`, whose shape the compiler checks;
//!   the config's concrete type is checked when the method is evaluated
//! - [`ConfigAccessor`] trait objects, for loaders that discover accessors at
//!   runtime; their [`AccessorSignature`] is checked once, at registration

use std::any::{Any, type_name};
use std::sync::Arc;

use crate::error::{Error, Result};

/// The configuration object passed to every evaluation.
pub type Config = dyn Any + Send + Sync;

/// A configuration-dependent evaluator, errors already tagged with its symbol.
pub(crate) type ConfigFn<T> = Arc<dyn Fn(&Config) -> Result<T> + Send + Sync>;

/// Kinds of values a dynamic accessor can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
  Text,
  Bool,
  Integer,
  List,
}

/// A value produced by a dynamic accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessorValue {
  Text(String),
  Bool(bool),
  Integer(i64),
  List(Vec<String>),
}

impl AccessorValue {
  pub fn kind(&self) -> ValueKind {
    match self {
      AccessorValue::Text(_) => ValueKind::Text,
      AccessorValue::Bool(_) => ValueKind::Bool,
      AccessorValue::Integer(_) => ValueKind::Integer,
      AccessorValue::List(_) => ValueKind::List,
    }
  }
}

/// Declared shape of a dynamic accessor.
///
/// `params` counts parameters besides the configuration itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorSignature {
  pub params: usize,
  pub returns: Vec<ValueKind>,
}

impl AccessorSignature {
  /// The only shape a variable accepts: no parameters, one text result.
  pub fn text() -> Self {
    Self {
      params: 0,
      returns: vec![ValueKind::Text],
    }
  }
}

/// An accessor on the configuration discovered at runtime.
pub trait ConfigAccessor: Send + Sync {
  fn signature(&self) -> AccessorSignature;

  fn call(&self, config: &Config) -> anyhow::Result<Vec<AccessorValue>>;
}

/// Wrap a caller-supplied closure, tagging its errors with `symbol`.
pub(crate) fn from_closure<T, F>(symbol: String, f: F) -> ConfigFn<T>
where
  T: 'static,
  F: Fn(&Config) -> anyhow::Result<T> + Send + Sync + 'static,
{
  Arc::new(move |config| {
    f(config).map_err(|source| Error::Config {
      symbol: symbol.clone(),
      source,
    })
  })
}

/// Wrap a typed config method.
pub(crate) fn from_method<C, F>(symbol: String, method: F) -> ConfigFn<String>
where
  C: Any,
  F: Fn(&C) -> String + Send + Sync + 'static,
{
  Arc::new(move |config| {
    let typed = config.downcast_ref::<C>().ok_or_else(|| Error::ConfigType {
      symbol: symbol.clone(),
      expected: type_name::<C>(),
    })?;
    Ok(method(typed))
  })
}

/// Check the accessor's shape and wrap it.
///
/// # Errors
///
/// [`Error::MethodShape`] unless the signature is [`AccessorSignature::text`].
pub(crate) fn from_accessor(
  variable: &str,
  symbol: String,
  accessor: Arc<dyn ConfigAccessor>,
) -> Result<ConfigFn<String>> {
  check_signature(variable, &accessor.signature())?;

  let variable = variable.to_string();
  Ok(Arc::new(move |config| {
    let mut values = accessor.call(config).map_err(|source| Error::Config {
      symbol: symbol.clone(),
      source,
    })?;
    match (values.pop(), values.is_empty()) {
      (Some(AccessorValue::Text(text)), true) => Ok(text),
      _ => Err(Error::MethodShape {
        variable: variable.clone(),
        reason: "returned something other than a single text value".to_string(),
      }),
    }
  }))
}

fn check_signature(variable: &str, signature: &AccessorSignature) -> Result<()> {
  let reason = if signature.params != 0 {
    format!("has {} parameters (should be 0)", signature.params)
  } else if signature.returns.len() != 1 {
    format!("has {} return values (should be 1)", signature.returns.len())
  } else if signature.returns[0] != ValueKind::Text {
    format!("returns {:?} instead of text", signature.returns[0])
  } else {
    return Ok(());
  };

  Err(Error::MethodShape {
    variable: variable.to_string(),
    reason,
  })
}
