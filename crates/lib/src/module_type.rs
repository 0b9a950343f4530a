//! Module types.
//!
//! A [`ModuleType`] names a kind of module authors can instantiate, such as
//! `cc_binary`, and carries the factory the module graph builder calls for
//! every instance. Module types are registered through a
//! [`PackageContext`](crate::package::PackageContext) and looked up by
//! qualified name, `<package full name>.<name>`. The qualified name never
//! depends on the prefix chosen for the package at generation time.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::consts::NAMESPACE_SEPARATOR;
use crate::package::Package;

/// A module instance produced by a factory.
pub trait Module: Send {
  fn as_any(&self) -> &dyn Any;
}

/// Property holders a module instance is populated from.
pub type Properties = Vec<Box<dyn Any + Send>>;

pub(crate) type ModuleFactory = Arc<dyn Fn() -> (Box<dyn Module>, Properties) + Send + Sync>;

/// A registered module type.
#[derive(Clone)]
pub struct ModuleType {
  pkg: Arc<Package>,
  name: String,
  qualified_name: String,
  factory: ModuleFactory,
}

impl ModuleType {
  pub(crate) fn new(pkg: Arc<Package>, name: &str, factory: ModuleFactory) -> Self {
    let qualified_name = format!("{}{NAMESPACE_SEPARATOR}{name}", pkg.full_name());
    Self {
      pkg,
      name: name.to_string(),
      qualified_name,
      factory,
    }
  }

  pub fn package(&self) -> &Arc<Package> {
    &self.pkg
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn qualified_name(&self) -> &str {
    &self.qualified_name
  }

  /// Create a fresh module instance and its property holders.
  pub fn new_module(&self) -> (Box<dyn Module>, Properties) {
    (self.factory)()
  }
}

impl fmt::Debug for ModuleType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("ModuleType").field(&self.qualified_name).finish()
  }
}
