//! Error taxonomy of the declaration core.
//!
//! Every error here is an authoring bug: declarations and evaluations fail
//! synchronously and nothing is retried. Module-level errors convert into
//! [`Error`] so callers can use `?` across the whole crate.

use thiserror::Error;

use crate::name::NameError;
use crate::ninja_string::ParseError;
use crate::package::PackageNamesError;
use crate::scope::{LookupError, ScopeError};

/// Errors that can occur while declaring or evaluating symbols.
#[derive(Debug, Error)]
pub enum Error {
  /// A symbol, argument, alias or package name failed validation.
  #[error("invalid name: {0}")]
  InvalidName(#[from] NameError),

  /// A declaration or import collided with an existing name.
  #[error(transparent)]
  Collision(#[from] ScopeError),

  /// Direct symbol lookup failed.
  #[error(transparent)]
  NotFound(#[from] LookupError),

  /// Text of a symbol could not be parsed, including unresolved references.
  #[error("{symbol}: {source}")]
  Parse {
    symbol: String,
    #[source]
    source: ParseError,
  },

  /// Argument placeholders have no value of their own.
  #[error("argument variable {name:?} has no value")]
  ArgumentHasNoValue { name: String },

  /// Built-in rules are emitted by the generator, never defined.
  #[error("rule {name:?} is a built-in")]
  RuleIsBuiltin { name: String },

  /// A dynamic config accessor does not have the `(config) -> text` shape.
  #[error("config accessor for variable {variable:?} {reason}")]
  MethodShape { variable: String, reason: String },

  /// The configuration object is not of the type a config method expects.
  #[error("{symbol}: configuration is not a {expected}")]
  ConfigType { symbol: String, expected: &'static str },

  /// A caller-supplied evaluation function failed.
  #[error("{symbol}: {source}")]
  Config {
    symbol: String,
    #[source]
    source: anyhow::Error,
  },

  /// An import names a package that has no declarations.
  #[error("package {path:?} has no declarations")]
  UnknownPackage { path: String },

  /// A package identity cannot be turned into a namespace.
  #[error("invalid package path {path:?}: {source}")]
  InvalidPackagePath {
    path: String,
    #[source]
    source: NameError,
  },

  /// Rule parameters without a command.
  #[error("rule {rule:?} has no command")]
  MissingCommand { rule: String },

  /// A rule refers to a pool its package cannot see.
  #[error("rule {rule:?} uses pool {pool:?}, which is not visible from package {package:?}")]
  PoolNotVisible {
    rule: String,
    pool: String,
    package: String,
  },

  /// No module type is registered under the qualified name.
  #[error("module type {0:?} is not registered")]
  ModuleTypeNotFound(String),

  /// Variable references loop back on themselves during expansion.
  #[error("cannot expand variable {name:?}: reference chain {chain} is cyclic or too deep")]
  ExpansionCycle { name: String, chain: String },

  /// A prefix assignment is not total, injective or has several roots.
  #[error(transparent)]
  PackageNames(#[from] PackageNamesError),
}

impl Error {
  /// True when the error is an unresolved reference inside parsed text.
  pub fn is_unresolved_reference(&self) -> bool {
    matches!(
      self,
      Error::Parse {
        source: ParseError::Unresolved { .. },
        ..
      }
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
