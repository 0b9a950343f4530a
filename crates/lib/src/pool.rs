//! Pools.
//!
//! A [`Pool`] limits how many build statements assigned to it the build tool
//! runs at once. Pools mirror rules without arguments: [`Pool::Static`] holds
//! fixed [`PoolParams`], [`Pool::Func`] computes them from the [`Config`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigFn};
use crate::error::Result;
use crate::package::{Package, PackageNames};

/// Parameters of a pool as written by its author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
  #[serde(default)]
  pub comment: String,
  pub depth: u32,
}

impl PoolParams {
  pub fn depth(depth: u32) -> Self {
    Self {
      depth,
      ..Self::default()
    }
  }
}

/// A pool definition ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolDef {
  pub comment: String,
  pub depth: u32,
}

impl From<PoolParams> for PoolDef {
  fn from(params: PoolParams) -> Self {
    Self {
      comment: params.comment,
      depth: params.depth,
    }
  }
}

/// A declared pool.
#[derive(Clone)]
pub enum Pool {
  Static(Arc<StaticPool>),
  Func(Arc<PoolFunc>),
}

pub struct StaticPool {
  pkg: Arc<Package>,
  name: String,
  params: PoolParams,
}

pub struct PoolFunc {
  pkg: Arc<Package>,
  name: String,
  params: ConfigFn<PoolParams>,
}

impl Pool {
  pub(crate) fn new_static(pkg: Arc<Package>, name: &str, params: PoolParams) -> Self {
    Pool::Static(Arc::new(StaticPool {
      pkg,
      name: name.to_string(),
      params,
    }))
  }

  pub(crate) fn new_func(pkg: Arc<Package>, name: &str, params: ConfigFn<PoolParams>) -> Self {
    Pool::Func(Arc::new(PoolFunc {
      pkg,
      name: name.to_string(),
      params,
    }))
  }

  pub fn package(&self) -> &Arc<Package> {
    match self {
      Pool::Static(p) => &p.pkg,
      Pool::Func(p) => &p.pkg,
    }
  }

  pub fn name(&self) -> &str {
    match self {
      Pool::Static(p) => &p.name,
      Pool::Func(p) => &p.name,
    }
  }

  pub fn full_name(&self, names: &PackageNames) -> String {
    names.qualify(self.package(), self.name())
  }

  /// Evaluate the pool definition for `config`.
  pub fn def(&self, config: &Config) -> Result<PoolDef> {
    match self {
      Pool::Static(p) => Ok(p.params.clone().into()),
      Pool::Func(p) => Ok((p.params)(config)?.into()),
    }
  }

  pub fn ptr_eq(&self, other: &Pool) -> bool {
    match (self, other) {
      (Pool::Static(a), Pool::Static(b)) => Arc::ptr_eq(a, b),
      (Pool::Func(a), Pool::Func(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl PartialEq for Pool {
  fn eq(&self, other: &Self) -> bool {
    self.ptr_eq(other)
  }
}

impl Eq for Pool {}

impl fmt::Debug for Pool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let variant = match self {
      Pool::Static(_) => "Static",
      Pool::Func(_) => "Func",
    };
    write!(f, "{variant}({}.{})", self.package().full_name(), self.name())
  }
}
