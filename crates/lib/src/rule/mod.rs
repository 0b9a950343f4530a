//! Rules.
//!
//! A [`Rule`] is a command template the build tool runs for each build
//! statement that uses it. Its text may reference per-invocation arguments,
//! which live in the rule's own argument scope: a child of the declaring
//! package's scope holding one placeholder [`Variable`] per argument, plus the
//! implicit `in` and `out`.
//!
//! The argument scope is built on first access rather than at declaration, so
//! an argument only binds as a placeholder when the package has not declared a
//! global of the same name by then. Construction happens exactly once even
//! when several threads ask for it at the same time.
//!
//! # Variants
//!
//! - [`Rule::Static`] - fixed [`RuleParams`]
//! - [`Rule::Func`] - [`RuleParams`] computed from the [`Config`]
//! - [`Rule::Builtin`] - primitives of the build tool such as `phony`; they
//!   have no definition of their own

mod types;

pub use types::*;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, LazyLock, OnceLock};

use tracing::debug;

use crate::config::{Config, ConfigFn};
use crate::consts::{BUILTIN_RULE_ARGS, PHONY_RULE};
use crate::error::{Error, Result};
use crate::name::validate_name;
use crate::package::{Package, PackageNames};
use crate::scope::{Scope, ScopeError, ScopeKind, SymbolKind};
use crate::variable::Variable;

static PHONY: LazyLock<Rule> = LazyLock::new(|| Rule::new_builtin(PHONY_RULE));

/// A declared rule.
#[derive(Clone)]
pub enum Rule {
  Static(Arc<StaticRule>),
  Func(Arc<RuleFunc>),
  Builtin(Arc<BuiltinRule>),
}

pub struct StaticRule {
  pkg: Arc<Package>,
  name: String,
  params: RuleParams,
  args: RuleArgs,
}

impl StaticRule {
  pub fn params(&self) -> &RuleParams {
    &self.params
  }
}

pub struct RuleFunc {
  pkg: Arc<Package>,
  name: String,
  params: ConfigFn<RuleParams>,
  args: RuleArgs,
}

pub struct BuiltinRule {
  name: String,
  args: RuleArgs,
}

/// Declared argument names and the lazily built scope that binds them.
struct RuleArgs {
  label: String,
  names: BTreeSet<String>,
  scope: OnceLock<Arc<Scope>>,
}

impl RuleArgs {
  fn new(label: String, names: BTreeSet<String>) -> Self {
    Self {
      label,
      names,
      scope: OnceLock::new(),
    }
  }

  fn scope(&self, parent: Option<&Arc<Scope>>) -> Arc<Scope> {
    Arc::clone(self.scope.get_or_init(|| self.build_scope(parent)))
  }

  fn build_scope(&self, parent: Option<&Arc<Scope>>) -> Arc<Scope> {
    let scope = Scope::new(ScopeKind::Rule, self.label.as_str(), parent.cloned());

    for name in BUILTIN_RULE_ARGS {
      scope.insert_variable(Variable::new_arg(name));
    }

    for name in &self.names {
      if let Some(parent) = parent {
        if let Ok(global) = parent.lookup_variable(name) {
          debug!(rule = %self.label, arg = %name, global = ?global, "argument bound to existing variable");
          continue;
        }
      }
      scope.insert_variable(Variable::new_arg(name));
    }

    debug!(rule = %self.label, args = ?self.names, "built rule argument scope");
    scope
  }
}

/// Validate declared argument names.
///
/// # Errors
///
/// Fails on invalid names, on the implicit `in`/`out` and on repeats.
pub(crate) fn validate_args(rule: &str, args: &[&str]) -> Result<BTreeSet<String>> {
  let mut names = BTreeSet::new();
  for &arg in args {
    validate_name(arg)?;
    if BUILTIN_RULE_ARGS.contains(&arg) {
      return Err(
        ScopeError::Reserved {
          kind: SymbolKind::Argument,
          name: arg.to_string(),
        }
        .into(),
      );
    }
    if !names.insert(arg.to_string()) {
      return Err(
        ScopeError::Duplicate {
          kind: SymbolKind::Argument,
          name: arg.to_string(),
          scope: rule.to_string(),
        }
        .into(),
      );
    }
  }
  Ok(names)
}

impl Rule {
  pub(crate) fn new_static(pkg: Arc<Package>, name: &str, params: RuleParams, args: BTreeSet<String>) -> Self {
    let label = pkg.symbol_label("rule", name);
    Rule::Static(Arc::new(StaticRule {
      pkg,
      name: name.to_string(),
      params,
      args: RuleArgs::new(label, args),
    }))
  }

  pub(crate) fn new_func(pkg: Arc<Package>, name: &str, params: ConfigFn<RuleParams>, args: BTreeSet<String>) -> Self {
    let label = pkg.symbol_label("rule", name);
    Rule::Func(Arc::new(RuleFunc {
      pkg,
      name: name.to_string(),
      params,
      args: RuleArgs::new(label, args),
    }))
  }

  fn new_builtin(name: &str) -> Self {
    Rule::Builtin(Arc::new(BuiltinRule {
      name: name.to_string(),
      args: RuleArgs::new(format!("rule {name}"), BTreeSet::new()),
    }))
  }

  /// The built-in `phony` rule, shared by every registry.
  pub fn phony() -> Rule {
    PHONY.clone()
  }

  /// The declaring package; built-in rules have none.
  pub fn package(&self) -> Option<&Arc<Package>> {
    match self {
      Rule::Static(r) => Some(&r.pkg),
      Rule::Func(r) => Some(&r.pkg),
      Rule::Builtin(_) => None,
    }
  }

  pub fn name(&self) -> &str {
    match self {
      Rule::Static(r) => &r.name,
      Rule::Func(r) => &r.name,
      Rule::Builtin(r) => &r.name,
    }
  }

  /// The name under which the build tool sees this rule.
  ///
  /// Built-in rules keep their bare name.
  pub fn full_name(&self, names: &PackageNames) -> String {
    match self {
      Rule::Static(r) => names.qualify(&r.pkg, &r.name),
      Rule::Func(r) => names.qualify(&r.pkg, &r.name),
      Rule::Builtin(r) => r.name.clone(),
    }
  }

  pub fn is_builtin(&self) -> bool {
    matches!(self, Rule::Builtin(_))
  }

  fn args(&self) -> &RuleArgs {
    match self {
      Rule::Static(r) => &r.args,
      Rule::Func(r) => &r.args,
      Rule::Builtin(r) => &r.args,
    }
  }

  /// True when `name` is one of the arguments this rule was declared with.
  ///
  /// The implicit `in` and `out` are not reported.
  pub fn is_arg(&self, name: &str) -> bool {
    self.args().names.contains(name)
  }

  /// Declared argument names, sorted.
  pub fn arg_names(&self) -> impl Iterator<Item = &str> {
    self.args().names.iter().map(String::as_str)
  }

  /// The argument scope, built on first access.
  pub fn scope(&self) -> Arc<Scope> {
    self.args().scope(self.package().map(|pkg| pkg.scope()))
  }

  /// Evaluate the rule definition for `config`.
  ///
  /// # Errors
  ///
  /// [`Error::RuleIsBuiltin`] for built-in rules, otherwise any error of the
  /// parameter function or of turning the parameters into a definition.
  pub fn def(&self, config: &Config) -> Result<RuleDef> {
    match self {
      Rule::Static(r) => parse_rule_params(&self.scope(), &r.args.label, &r.pkg, &r.params),
      Rule::Func(r) => {
        let params = (r.params)(config)?;
        parse_rule_params(&self.scope(), &r.args.label, &r.pkg, &params)
      }
      Rule::Builtin(r) => Err(Error::RuleIsBuiltin { name: r.name.clone() }),
    }
  }

  pub fn ptr_eq(&self, other: &Rule) -> bool {
    match (self, other) {
      (Rule::Static(a), Rule::Static(b)) => Arc::ptr_eq(a, b),
      (Rule::Func(a), Rule::Func(b)) => Arc::ptr_eq(a, b),
      (Rule::Builtin(a), Rule::Builtin(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl PartialEq for Rule {
  fn eq(&self, other: &Self) -> bool {
    self.ptr_eq(other)
  }
}

impl Eq for Rule {}

impl fmt::Debug for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Rule::Static(r) => write!(f, "Static({}.{})", r.pkg.full_name(), r.name),
      Rule::Func(r) => write!(f, "Func({}.{})", r.pkg.full_name(), r.name),
      Rule::Builtin(r) => write!(f, "Builtin({})", r.name),
    }
  }
}
