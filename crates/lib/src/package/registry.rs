use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::{Package, PackageContext};
use crate::consts::PHONY_RULE;
use crate::error::{Error, Result};
use crate::module_type::ModuleType;
use crate::rule::Rule;
use crate::scope::{Scope, ScopeError, ScopeKind, SymbolKind};

const BUILTIN_SCOPE_LABEL: &str = "<builtin>";

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Every package and module type declared in one process or test.
///
/// Packages are created on first use and live as long as the registry.
/// [`Registry::global`] is the process-wide instance; tests build their own
/// with [`Registry::new`].
pub struct Registry {
  builtins: Arc<Scope>,
  packages: RwLock<BTreeMap<String, Arc<Package>>>,
  module_types: RwLock<BTreeMap<String, ModuleType>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
  lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
  lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Registry {
  /// An empty registry whose built-in scope holds `phony`.
  pub fn new() -> Self {
    let builtins = Scope::new(ScopeKind::Builtin, BUILTIN_SCOPE_LABEL, None);
    builtins.insert_rule(Rule::phony());
    Self {
      builtins,
      packages: RwLock::new(BTreeMap::new()),
      module_types: RwLock::new(BTreeMap::new()),
    }
  }

  /// The process-wide registry.
  pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(Registry::new)
  }

  /// Get the package for `path`, creating it on first use.
  ///
  /// # Errors
  ///
  /// [`Error::InvalidPackagePath`] when `path` cannot be turned into a
  /// namespace.
  pub fn package(&self, path: &str) -> Result<Arc<Package>> {
    if let Some(pkg) = self.get(path) {
      return Ok(pkg);
    }

    let mut packages = write(&self.packages);
    match packages.entry(path.to_string()) {
      Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
      Entry::Vacant(entry) => {
        let pkg = Arc::new(Package::new(path, &self.builtins)?);
        debug!(package = %path, full_name = %pkg.full_name(), "registered package");
        Ok(Arc::clone(entry.insert(pkg)))
      }
    }
  }

  /// The package for `path`, if it was registered.
  pub fn get(&self, path: &str) -> Option<Arc<Package>> {
    read(&self.packages).get(path).cloned()
  }

  /// A declaration context for `path`, creating the package on first use.
  pub fn context(&self, path: &str) -> Result<PackageContext<'_>> {
    Ok(PackageContext::new(self, self.package(path)?))
  }

  /// Registered packages, sorted by path.
  pub fn packages(&self) -> Vec<Arc<Package>> {
    read(&self.packages).values().cloned().collect()
  }

  /// The anonymous root scope every package scope descends from.
  pub fn builtins(&self) -> &Arc<Scope> {
    &self.builtins
  }

  /// The built-in `phony` rule.
  pub fn phony(&self) -> Rule {
    self.builtins.lookup_rule(PHONY_RULE).unwrap_or_else(|_| Rule::phony())
  }

  pub(crate) fn register_module_type(&self, module_type: ModuleType) -> Result<ModuleType> {
    let mut module_types = write(&self.module_types);
    match module_types.entry(module_type.qualified_name().to_string()) {
      Entry::Occupied(entry) => Err(
        ScopeError::Duplicate {
          kind: SymbolKind::ModuleType,
          name: entry.key().clone(),
          scope: module_type.package().path().to_string(),
        }
        .into(),
      ),
      Entry::Vacant(entry) => {
        debug!(module_type = %module_type.qualified_name(), "registered module type");
        Ok(entry.insert(module_type).clone())
      }
    }
  }

  /// Look up a module type by qualified name.
  ///
  /// # Errors
  ///
  /// [`Error::ModuleTypeNotFound`] when nothing is registered under the name.
  pub fn module_type(&self, qualified_name: &str) -> Result<ModuleType> {
    read(&self.module_types)
      .get(qualified_name)
      .cloned()
      .ok_or_else(|| Error::ModuleTypeNotFound(qualified_name.to_string()))
  }

  /// Registered module types, sorted by qualified name.
  pub fn module_types(&self) -> Vec<ModuleType> {
    read(&self.module_types).values().cloned().collect()
  }

  /// Forget every package and module type. Built-ins stay.
  pub fn reset(&self) {
    let packages = std::mem::take(&mut *write(&self.packages));
    for pkg in packages.values() {
      pkg.scope().clear();
    }
    write(&self.module_types).clear();
    debug!(packages = packages.len(), "reset registry");
  }
}

impl Default for Registry {
  fn default() -> Self {
    Self::new()
  }
}

impl Drop for Registry {
  fn drop(&mut self) {
    // symbols keep their package alive, which keeps its scope alive
    let packages = self.packages.get_mut().unwrap_or_else(PoisonError::into_inner);
    for pkg in packages.values() {
      pkg.scope().clear();
    }
  }
}
