use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ninja_string::{self, NinjaString};
use crate::package::Package;
use crate::pool::Pool;
use crate::scope::Scope;

/// How the build tool reads discovered header dependencies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deps {
  #[default]
  None,
  Gcc,
  Msvc,
}

impl fmt::Display for Deps {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let value = match self {
      Deps::None => "none",
      Deps::Gcc => "gcc",
      Deps::Msvc => "msvc",
    };
    f.write_str(value)
  }
}

/// Parameters of a rule as written by its author.
///
/// Text fields may reference the rule's arguments, `${in}`, `${out}` and any
/// variable visible from the declaring package. Empty text means unset.
#[derive(Debug, Clone, Default)]
pub struct RuleParams {
  pub comment: String,
  pub command: String,
  pub depfile: String,
  pub deps: Deps,
  pub description: String,
  pub generator: bool,
  pub pool: Option<Pool>,
  pub restat: bool,
  pub rspfile: String,
  pub rspfile_content: String,
}

impl RuleParams {
  /// Parameters with only a command set.
  pub fn command(command: impl Into<String>) -> Self {
    Self {
      command: command.into(),
      ..Self::default()
    }
  }
}

/// A rule definition ready to be written out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleDef {
  pub comment: String,
  pub pool: Option<Pool>,
  /// Rule-level variables keyed by their build-tool name.
  pub variables: BTreeMap<String, NinjaString>,
}

impl RuleDef {
  pub fn variable(&self, key: &str) -> Option<&NinjaString> {
    self.variables.get(key)
  }
}

/// Turn parameters into a definition, parsing text against the rule's
/// argument scope.
///
/// # Errors
///
/// - [`Error::MissingCommand`] when no command is given
/// - [`Error::PoolNotVisible`] when the pool is neither declared on the
///   package's scope chain nor in a package it imports
/// - [`Error::Parse`] when a text field does not parse
pub(crate) fn parse_rule_params(
  scope: &Scope,
  rule: &str,
  pkg: &Package,
  params: &RuleParams,
) -> Result<RuleDef> {
  if params.command.is_empty() {
    return Err(Error::MissingCommand { rule: rule.to_string() });
  }

  if let Some(pool) = &params.pool {
    if !pkg.scope().is_pool_visible(pool) {
      return Err(Error::PoolNotVisible {
        rule: rule.to_string(),
        pool: format!("{}.{}", pool.package().full_name(), pool.name()),
        package: pkg.path().to_string(),
      });
    }
  }

  let mut variables = BTreeMap::new();
  let text_fields = [
    ("command", &params.command),
    ("depfile", &params.depfile),
    ("description", &params.description),
    ("rspfile", &params.rspfile),
    ("rspfile_content", &params.rspfile_content),
  ];
  for (key, text) in text_fields {
    if text.is_empty() {
      continue;
    }
    let value = ninja_string::parse(scope, text).map_err(|source| Error::Parse {
      symbol: format!("{rule} ({key})"),
      source,
    })?;
    variables.insert(key.to_string(), value);
  }

  if params.deps != Deps::None {
    variables.insert("deps".to_string(), NinjaString::literal(params.deps.to_string()));
  }
  if params.generator {
    variables.insert("generator".to_string(), NinjaString::literal("true"));
  }
  if params.restat {
    variables.insert("restat".to_string(), NinjaString::literal("true"));
  }

  Ok(RuleDef {
    comment: params.comment.clone(),
    pool: params.pool.clone(),
    variables,
  })
}
