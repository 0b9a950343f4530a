//! Variables.
//!
//! A [`Variable`] is one of three variants:
//!
//! - **Static**: raw text fixed at declaration. It is parsed against the
//!   declaring package's scope only when evaluated, so it may refer to
//!   variables the package declares later.
//! - **Func**: raw text produced from the [`Config`] by a caller-supplied
//!   function, then parsed like the static text.
//! - **Arg**: a rule argument placeholder living in a rule's scope. It has no
//!   value; build statements assign one per invocation.

use std::fmt;
use std::sync::Arc;

use crate::config::{Config, ConfigFn};
use crate::error::{Error, Result};
use crate::ninja_string::{self, NinjaString};
use crate::package::{Package, PackageNames};

/// A declared variable.
#[derive(Clone)]
pub enum Variable {
  Static(Arc<StaticVariable>),
  Func(Arc<VariableFunc>),
  Arg(Arc<ArgVariable>),
}

pub struct StaticVariable {
  pkg: Arc<Package>,
  name: String,
  value: String,
}

impl StaticVariable {
  /// The unparsed text given at declaration.
  pub fn raw_value(&self) -> &str {
    &self.value
  }
}

pub struct VariableFunc {
  pkg: Arc<Package>,
  name: String,
  value: ConfigFn<String>,
}

pub struct ArgVariable {
  name: String,
}

impl Variable {
  pub(crate) fn new_static(pkg: Arc<Package>, name: &str, value: String) -> Self {
    Variable::Static(Arc::new(StaticVariable {
      pkg,
      name: name.to_string(),
      value,
    }))
  }

  pub(crate) fn new_func(pkg: Arc<Package>, name: &str, value: ConfigFn<String>) -> Self {
    Variable::Func(Arc::new(VariableFunc {
      pkg,
      name: name.to_string(),
      value,
    }))
  }

  pub(crate) fn new_arg(name: &str) -> Self {
    Variable::Arg(Arc::new(ArgVariable { name: name.to_string() }))
  }

  /// The declaring package; argument placeholders have none.
  pub fn package(&self) -> Option<&Arc<Package>> {
    match self {
      Variable::Static(v) => Some(&v.pkg),
      Variable::Func(v) => Some(&v.pkg),
      Variable::Arg(_) => None,
    }
  }

  pub fn name(&self) -> &str {
    match self {
      Variable::Static(v) => &v.name,
      Variable::Func(v) => &v.name,
      Variable::Arg(v) => &v.name,
    }
  }

  /// The name under which the build tool sees this variable.
  pub fn full_name(&self, names: &PackageNames) -> String {
    match self {
      Variable::Static(v) => names.qualify(&v.pkg, &v.name),
      Variable::Func(v) => names.qualify(&v.pkg, &v.name),
      Variable::Arg(v) => v.name.clone(),
    }
  }

  pub fn is_arg(&self) -> bool {
    matches!(self, Variable::Arg(_))
  }

  /// Evaluate the variable for `config`.
  ///
  /// # Errors
  ///
  /// [`Error::ArgumentHasNoValue`] for argument placeholders, otherwise any
  /// error of the value function or of parsing its text.
  pub fn value(&self, config: &Config) -> Result<NinjaString> {
    match self {
      Variable::Static(v) => parse_value(&v.pkg, &v.name, &v.value),
      Variable::Func(v) => {
        let text = (v.value)(config)?;
        parse_value(&v.pkg, &v.name, &text)
      }
      Variable::Arg(v) => Err(Error::ArgumentHasNoValue { name: v.name.clone() }),
    }
  }

  pub fn ptr_eq(&self, other: &Variable) -> bool {
    match (self, other) {
      (Variable::Static(a), Variable::Static(b)) => Arc::ptr_eq(a, b),
      (Variable::Func(a), Variable::Func(b)) => Arc::ptr_eq(a, b),
      (Variable::Arg(a), Variable::Arg(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}

fn parse_value(pkg: &Package, name: &str, text: &str) -> Result<NinjaString> {
  ninja_string::parse(pkg.scope(), text).map_err(|source| Error::Parse {
    symbol: pkg.symbol_label("variable", name),
    source,
  })
}

impl PartialEq for Variable {
  fn eq(&self, other: &Self) -> bool {
    self.ptr_eq(other)
  }
}

impl Eq for Variable {}

impl fmt::Debug for Variable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Variable::Static(v) => write!(f, "Static({}.{} = {:?})", v.pkg.full_name(), v.name, v.value),
      Variable::Func(v) => write!(f, "Func({}.{})", v.pkg.full_name(), v.name),
      Variable::Arg(v) => write!(f, "Arg({})", v.name),
    }
  }
}
