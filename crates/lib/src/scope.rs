//! Hierarchical symbol tables.
//!
//! A [`Scope`] holds the variables, rules and pools declared by one package,
//! plus the scopes of imported packages under their local alias. Three kinds
//! of scope exist:
//!
//! - the anonymous built-in scope of a [`Registry`], holding `phony`
//! - one package scope per package, whose parent is the built-in scope
//! - one argument scope per rule, whose parent is the declaring package's scope
//!
//! Bare names resolve against the scope's own tables and then its parent
//! chain. `alias.name` resolves through the first import table on the chain
//! that knows `alias`, and only against the imported scope's own tables:
//! imports are never followed transitively.
//!
//! Collision checks are eager and symmetric. A variable, rule or pool may not
//! reuse an import alias of the same scope, and an import alias may not reuse
//! the name of any own symbol, whichever was added first. Check and insert
//! happen under one write lock, so a failed add leaves nothing behind.
//!
//! [`Registry`]: crate::package::Registry

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::trace;

use crate::consts::NAMESPACE_SEPARATOR;
use crate::name::{NameError, validate_name};
use crate::pool::Pool;
use crate::rule::Rule;
use crate::variable::Variable;

/// The kinds of named things a scope or registry keeps apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
  Variable,
  Rule,
  Pool,
  Argument,
  Import,
  ModuleType,
}

impl fmt::Display for SymbolKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      SymbolKind::Variable => "variable",
      SymbolKind::Rule => "rule",
      SymbolKind::Pool => "pool",
      SymbolKind::Argument => "argument",
      SymbolKind::Import => "import",
      SymbolKind::ModuleType => "module type",
    };
    f.write_str(label)
  }
}

/// What a scope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
  /// The anonymous root scope holding built-in primitives.
  Builtin,
  /// The scope owned by a package.
  Package,
  /// The lazily built argument scope of a rule.
  Rule,
}

/// Errors raised when adding a symbol or import to a scope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
  #[error("{kind} {name:?} is already declared in {scope}")]
  Duplicate {
    kind: SymbolKind,
    name: String,
    scope: String,
  },

  #[error("{kind} {name:?} in {scope} collides with the import alias of package {package:?}")]
  ShadowsImport {
    kind: SymbolKind,
    name: String,
    scope: String,
    package: String,
  },

  #[error("import alias {alias:?} in {scope} collides with the {kind} declared under that name")]
  ImportShadowsSymbol {
    alias: String,
    kind: SymbolKind,
    scope: String,
  },

  #[error("import alias {alias:?} in {scope} already refers to package {existing:?}, cannot import {requested:?}")]
  DuplicateImport {
    alias: String,
    scope: String,
    existing: String,
    requested: String,
  },

  #[error("invalid import alias {alias:?}: {source}")]
  InvalidAlias {
    alias: String,
    #[source]
    source: NameError,
  },

  #[error("{kind} name {name:?} is reserved")]
  Reserved { kind: SymbolKind, name: String },
}

/// Errors raised by symbol lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
  #[error("undefined {kind} {name:?}")]
  Undefined { kind: SymbolKind, name: String },

  #[error("{alias:?} is not imported")]
  NotImported { alias: String },

  #[error("package {package:?} does not declare {kind} {name:?}")]
  NotInPackage {
    package: String,
    kind: SymbolKind,
    name: String,
  },

  #[error("malformed reference {0:?}")]
  Malformed(String),
}

#[derive(Default)]
struct Tables {
  variables: BTreeMap<String, Variable>,
  rules: BTreeMap<String, Rule>,
  pools: BTreeMap<String, Pool>,
  imports: BTreeMap<String, Arc<Scope>>,
}

impl Tables {
  fn kind_of(&self, name: &str) -> Option<SymbolKind> {
    if self.variables.contains_key(name) {
      Some(SymbolKind::Variable)
    } else if self.rules.contains_key(name) {
      Some(SymbolKind::Rule)
    } else if self.pools.contains_key(name) {
      Some(SymbolKind::Pool)
    } else {
      None
    }
  }
}

/// A symbol table for one package, rule or the built-ins.
pub struct Scope {
  kind: ScopeKind,
  label: String,
  parent: Option<Arc<Scope>>,
  tables: RwLock<Tables>,
}

impl Scope {
  pub(crate) fn new(kind: ScopeKind, label: impl Into<String>, parent: Option<Arc<Scope>>) -> Arc<Self> {
    Arc::new(Self {
      kind,
      label: label.into(),
      parent,
      tables: RwLock::new(Tables::default()),
    })
  }

  pub fn kind(&self) -> ScopeKind {
    self.kind
  }

  /// Human readable owner: a package path, `rule <pkg>.<name>` or `<builtin>`.
  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn parent(&self) -> Option<&Arc<Scope>> {
    self.parent.as_ref()
  }

  fn read(&self) -> RwLockReadGuard<'_, Tables> {
    self.tables.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, Tables> {
    self.tables.write().unwrap_or_else(PoisonError::into_inner)
  }

  fn ancestors(&self) -> impl Iterator<Item = &Scope> {
    std::iter::successors(Some(self), |scope| scope.parent.as_deref())
  }

  fn check_free(&self, tables: &Tables, kind: SymbolKind, name: &str) -> Result<(), ScopeError> {
    if let Some(target) = tables.imports.get(name) {
      return Err(ScopeError::ShadowsImport {
        kind,
        name: name.to_string(),
        scope: self.label.clone(),
        package: target.label.clone(),
      });
    }
    Ok(())
  }

  fn duplicate(&self, kind: SymbolKind, name: &str) -> ScopeError {
    ScopeError::Duplicate {
      kind,
      name: name.to_string(),
      scope: self.label.clone(),
    }
  }

  // ==========================================================================
  // Declarations
  // ==========================================================================

  /// Add a variable under its bare name.
  pub fn add_variable(&self, variable: Variable) -> Result<(), ScopeError> {
    let name = variable.name().to_string();
    let mut tables = self.write();
    self.check_free(&tables, SymbolKind::Variable, &name)?;
    if tables.variables.contains_key(&name) {
      return Err(self.duplicate(SymbolKind::Variable, &name));
    }
    tables.variables.insert(name, variable);
    Ok(())
  }

  /// Add a rule under its bare name.
  ///
  /// Names of built-in rules visible through the parent chain are reserved.
  pub fn add_rule(&self, rule: Rule) -> Result<(), ScopeError> {
    let name = rule.name().to_string();
    let reserved = self
      .ancestors()
      .filter(|scope| scope.kind == ScopeKind::Builtin)
      .any(|scope| scope.read().rules.contains_key(&name));
    if reserved {
      return Err(ScopeError::Reserved {
        kind: SymbolKind::Rule,
        name,
      });
    }

    let mut tables = self.write();
    self.check_free(&tables, SymbolKind::Rule, &name)?;
    if tables.rules.contains_key(&name) {
      return Err(self.duplicate(SymbolKind::Rule, &name));
    }
    tables.rules.insert(name, rule);
    Ok(())
  }

  /// Add a pool under its bare name.
  pub fn add_pool(&self, pool: Pool) -> Result<(), ScopeError> {
    let name = pool.name().to_string();
    let mut tables = self.write();
    self.check_free(&tables, SymbolKind::Pool, &name)?;
    if tables.pools.contains_key(&name) {
      return Err(self.duplicate(SymbolKind::Pool, &name));
    }
    tables.pools.insert(name, pool);
    Ok(())
  }

  /// Expose `target` under `alias`.
  ///
  /// Importing the same scope again under the same alias is a no-op.
  pub fn add_import(&self, alias: &str, target: &Arc<Scope>) -> Result<(), ScopeError> {
    validate_name(alias).map_err(|source| ScopeError::InvalidAlias {
      alias: alias.to_string(),
      source,
    })?;

    let mut tables = self.write();
    if let Some(existing) = tables.imports.get(alias) {
      if Arc::ptr_eq(existing, target) {
        return Ok(());
      }
      return Err(ScopeError::DuplicateImport {
        alias: alias.to_string(),
        scope: self.label.clone(),
        existing: existing.label.clone(),
        requested: target.label.clone(),
      });
    }
    if let Some(kind) = tables.kind_of(alias) {
      return Err(ScopeError::ImportShadowsSymbol {
        alias: alias.to_string(),
        kind,
        scope: self.label.clone(),
      });
    }
    tables.imports.insert(alias.to_string(), Arc::clone(target));
    Ok(())
  }

  /// Insert without collision checks, for freshly built scopes.
  pub(crate) fn insert_variable(&self, variable: Variable) {
    self.write().variables.insert(variable.name().to_string(), variable);
  }

  pub(crate) fn insert_rule(&self, rule: Rule) {
    self.write().rules.insert(rule.name().to_string(), rule);
  }

  /// Drop every symbol and import, releasing references to other scopes.
  pub(crate) fn clear(&self) {
    *self.write() = Tables::default();
  }

  // ==========================================================================
  // Lookups
  // ==========================================================================

  /// Find a variable by bare name in this scope or its parents.
  pub fn lookup_variable(&self, name: &str) -> Result<Variable, LookupError> {
    trace!(scope = %self.label, name, "variable lookup");
    self
      .ancestors()
      .find_map(|scope| scope.read().variables.get(name).cloned())
      .ok_or_else(|| LookupError::Undefined {
        kind: SymbolKind::Variable,
        name: name.to_string(),
      })
  }

  /// Find a rule by bare name in this scope or its parents.
  pub fn lookup_rule(&self, name: &str) -> Result<Rule, LookupError> {
    trace!(scope = %self.label, name, "rule lookup");
    self
      .ancestors()
      .find_map(|scope| scope.read().rules.get(name).cloned())
      .ok_or_else(|| LookupError::Undefined {
        kind: SymbolKind::Rule,
        name: name.to_string(),
      })
  }

  /// Find a pool by bare name in this scope or its parents.
  pub fn lookup_pool(&self, name: &str) -> Result<Pool, LookupError> {
    trace!(scope = %self.label, name, "pool lookup");
    self
      .ancestors()
      .find_map(|scope| scope.read().pools.get(name).cloned())
      .ok_or_else(|| LookupError::Undefined {
        kind: SymbolKind::Pool,
        name: name.to_string(),
      })
  }

  /// Find the scope imported under `alias` here or in a parent.
  pub fn lookup_import(&self, alias: &str) -> Result<Arc<Scope>, LookupError> {
    trace!(scope = %self.label, alias, "import lookup");
    self
      .ancestors()
      .find_map(|scope| scope.read().imports.get(alias).cloned())
      .ok_or_else(|| LookupError::NotImported {
        alias: alias.to_string(),
      })
  }

  pub fn lookup_imported_variable(&self, alias: &str, name: &str) -> Result<Variable, LookupError> {
    let target = self.lookup_import(alias)?;
    let found = target.read().variables.get(name).cloned();
    found.ok_or_else(|| target.not_declared(SymbolKind::Variable, name))
  }

  pub fn lookup_imported_rule(&self, alias: &str, name: &str) -> Result<Rule, LookupError> {
    let target = self.lookup_import(alias)?;
    let found = target.read().rules.get(name).cloned();
    found.ok_or_else(|| target.not_declared(SymbolKind::Rule, name))
  }

  pub fn lookup_imported_pool(&self, alias: &str, name: &str) -> Result<Pool, LookupError> {
    let target = self.lookup_import(alias)?;
    let found = target.read().pools.get(name).cloned();
    found.ok_or_else(|| target.not_declared(SymbolKind::Pool, name))
  }

  fn not_declared(&self, kind: SymbolKind, name: &str) -> LookupError {
    LookupError::NotInPackage {
      package: self.label.clone(),
      kind,
      name: name.to_string(),
    }
  }

  /// Resolve a reference token as written in text: `name` or `alias.name`.
  pub fn resolve_variable(&self, token: &str) -> Result<Variable, LookupError> {
    match token.split_once(NAMESPACE_SEPARATOR) {
      Some((alias, name)) => {
        if alias.is_empty() || name.is_empty() || name.contains(NAMESPACE_SEPARATOR) {
          return Err(LookupError::Malformed(token.to_string()));
        }
        self.lookup_imported_variable(alias, name)
      }
      None if token.is_empty() => Err(LookupError::Malformed(token.to_string())),
      None => self.lookup_variable(token),
    }
  }

  /// True when `pool` is declared on this scope's parent chain or in a
  /// package imported anywhere on it.
  pub fn is_pool_visible(&self, pool: &Pool) -> bool {
    let home = pool.package().scope();
    self.ancestors().any(|scope| {
      std::ptr::eq(scope, Arc::as_ptr(home)) || scope.read().imports.values().any(|target| Arc::ptr_eq(target, home))
    })
  }

  // ==========================================================================
  // Enumeration
  // ==========================================================================

  /// Own variables, sorted by name.
  pub fn variables(&self) -> Vec<Variable> {
    self.read().variables.values().cloned().collect()
  }

  /// Own rules, sorted by name.
  pub fn rules(&self) -> Vec<Rule> {
    self.read().rules.values().cloned().collect()
  }

  /// Own pools, sorted by name.
  pub fn pools(&self) -> Vec<Pool> {
    self.read().pools.values().cloned().collect()
  }

  /// Whether this scope declares any variable, rule or pool of its own.
  pub fn has_declarations(&self) -> bool {
    let tables = self.read();
    !(tables.variables.is_empty() && tables.rules.is_empty() && tables.pools.is_empty())
  }

  /// Import aliases with the label of the scope each one exposes.
  pub fn imports(&self) -> Vec<(String, String)> {
    self
      .read()
      .imports
      .iter()
      .map(|(alias, target)| (alias.clone(), target.label.clone()))
      .collect()
  }
}

impl fmt::Debug for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let tables = self.read();
    f.debug_struct("Scope")
      .field("kind", &self.kind)
      .field("label", &self.label)
      .field("parent", &self.parent.as_ref().map(|p| p.label.as_str()))
      .field("variables", &tables.variables.keys().collect::<Vec<_>>())
      .field("rules", &tables.rules.keys().collect::<Vec<_>>())
      .field("pools", &tables.pools.keys().collect::<Vec<_>>())
      .field("imports", &tables.imports.keys().collect::<Vec<_>>())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::package::Registry;
  use crate::pool::PoolParams;
  use crate::rule::RuleParams;

  // ==========================================================================
  // Collisions
  // ==========================================================================

  mod collisions {
    use super::*;

    #[test]
    fn duplicate_variable_in_same_scope_fails() {
      let registry = Registry::new();
      let ctx = registry.context("build/cc").unwrap();

      ctx.static_variable("cflags", "-O2").unwrap();
      let err = ctx.package().scope().add_variable(ctx.package().scope().variables()[0].clone());

      assert_eq!(
        err,
        Err(ScopeError::Duplicate {
          kind: SymbolKind::Variable,
          name: "cflags".to_string(),
          scope: "build/cc".to_string(),
        })
      );
    }

    #[test]
    fn same_name_in_different_scopes_is_independent() {
      let registry = Registry::new();
      let cc = registry.context("build/cc").unwrap();
      let java = registry.context("build/java").unwrap();

      cc.static_variable("flags", "-O2").unwrap();
      java.static_variable("flags", "-g").unwrap();

      assert_eq!(cc.package().scope().variables().len(), 1);
      assert_eq!(java.package().scope().variables().len(), 1);
    }

    #[test]
    fn kinds_have_separate_namespaces() {
      let registry = Registry::new();
      let ctx = registry.context("build/cc").unwrap();

      ctx.static_variable("link", "ld").unwrap();
      ctx
        .static_rule("link", RuleParams::command("${link} -o ${out} ${in}"), &[])
        .unwrap();
      ctx.static_pool("link", PoolParams::depth(2)).unwrap();

      let scope = ctx.package().scope();
      assert_eq!(scope.variables().len(), 1);
      assert_eq!(scope.rules().len(), 1);
      assert_eq!(scope.pools().len(), 1);
    }

    #[test]
    fn symbol_after_import_alias_fails() {
      let registry = Registry::new();
      registry.context("build/cc").unwrap().static_variable("cc", "gcc").unwrap();
      let app = registry.context("app").unwrap();
      app.import("build/cc").unwrap();

      let err = app.static_variable("cc", "clang").unwrap_err();

      assert!(matches!(
        err,
        crate::Error::Collision(ScopeError::ShadowsImport { ref name, ref package, .. })
          if name == "cc" && package == "build/cc"
      ));
      assert!(app.package().scope().variables().is_empty());
    }

    #[test]
    fn import_alias_after_symbol_fails() {
      let registry = Registry::new();
      registry.context("build/cc").unwrap().static_variable("cc", "gcc").unwrap();
      let app = registry.context("app").unwrap();
      app.static_pool("cc", PoolParams::depth(1)).unwrap();

      let err = app.import("build/cc").unwrap_err();

      assert!(matches!(
        err,
        crate::Error::Collision(ScopeError::ImportShadowsSymbol { ref alias, kind: SymbolKind::Pool, .. })
          if alias == "cc"
      ));
      assert!(app.package().scope().imports().is_empty());
    }

    #[test]
    fn alias_rebound_to_other_package_fails() {
      let registry = Registry::new();
      registry.context("gnu/cc").unwrap().static_variable("cc", "gcc").unwrap();
      registry.context("llvm/cc").unwrap().static_variable("cc", "clang").unwrap();
      let app = registry.context("app").unwrap();

      app.import("gnu/cc").unwrap();
      app.import("gnu/cc").unwrap();
      let err = app.import("llvm/cc").unwrap_err();

      assert!(matches!(
        err,
        crate::Error::Collision(ScopeError::DuplicateImport { ref existing, ref requested, .. })
          if existing == "gnu/cc" && requested == "llvm/cc"
      ));

      app.import_as("llvm", "llvm/cc").unwrap();
      assert_eq!(
        app.package().scope().imports(),
        vec![
          ("cc".to_string(), "gnu/cc".to_string()),
          ("llvm".to_string(), "llvm/cc".to_string()),
        ]
      );
    }

    #[test]
    fn invalid_alias_is_rejected() {
      let registry = Registry::new();
      let target = registry.package("build/cc").unwrap();
      let app = registry.package("app").unwrap();

      let err = app.scope().add_import("c.c", target.scope()).unwrap_err();

      assert!(matches!(err, ScopeError::InvalidAlias { ref alias, .. } if alias == "c.c"));
    }

    #[test]
    fn builtin_rule_names_are_reserved() {
      let registry = Registry::new();
      let ctx = registry.context("build/cc").unwrap();

      let err = ctx.static_rule("phony", RuleParams::command("true"), &[]).unwrap_err();

      assert!(matches!(
        err,
        crate::Error::Collision(ScopeError::Reserved { kind: SymbolKind::Rule, ref name }) if name == "phony"
      ));
    }
  }

  // ==========================================================================
  // Lookups
  // ==========================================================================

  mod lookups {
    use super::*;

    #[test]
    #[tracing_test::traced_test]
    fn lookups_are_traced() {
      let registry = Registry::new();
      let ctx = registry.context("build/cc").unwrap();
      ctx.static_pool("link", PoolParams::depth(1)).unwrap();
      let scope = ctx.package().scope();

      scope.lookup_rule("phony").unwrap();
      scope.lookup_pool("link").unwrap();
      assert!(scope.lookup_import("base").is_err());

      assert!(logs_contain("rule lookup"));
      assert!(logs_contain("pool lookup"));
      assert!(logs_contain("import lookup"));
    }

    #[test]
    fn declarations_are_own_symbols_only() {
      let registry = Registry::new();
      let base = registry.context("base").unwrap();
      let app = registry.context("app").unwrap();

      assert!(!app.package().scope().has_declarations());
      base.static_variable("root", "/src").unwrap();
      app.import("base").unwrap();
      assert!(!app.package().scope().has_declarations());
      app.static_rule("cp", RuleParams::command("cp ${in} ${out}"), &[]).unwrap();
      assert!(app.package().scope().has_declarations());
    }

    #[test]
    fn bare_names_follow_parent_chain() {
      let registry = Registry::new();
      let ctx = registry.context("build/cc").unwrap();
      ctx.static_variable("cc", "gcc").unwrap();
      let rule = ctx
        .static_rule("compile", RuleParams::command("${cc} -c ${in} -o ${out}"), &["flags"])
        .unwrap();

      let scope = rule.scope();
      assert_eq!(scope.lookup_variable("cc").unwrap().name(), "cc");
      assert!(scope.lookup_variable("flags").unwrap().is_arg());
      assert_eq!(scope.lookup_rule("phony").unwrap().name(), "phony");
      assert_eq!(
        scope.lookup_variable("ldflags"),
        Err(LookupError::Undefined {
          kind: SymbolKind::Variable,
          name: "ldflags".to_string(),
        })
      );
    }

    #[test]
    fn imported_lookup_is_one_hop() {
      let registry = Registry::new();
      let base = registry.context("base").unwrap();
      base.static_variable("root", "/src").unwrap();
      let cc = registry.context("build/cc").unwrap();
      cc.import("base").unwrap();
      cc.static_variable("cc", "gcc").unwrap();
      let app = registry.context("app").unwrap();
      app.import("build/cc").unwrap();

      let scope = app.package().scope();
      assert_eq!(scope.lookup_imported_variable("cc", "cc").unwrap().name(), "cc");
      assert_eq!(
        scope.lookup_imported_variable("cc", "root"),
        Err(LookupError::NotInPackage {
          package: "build/cc".to_string(),
          kind: SymbolKind::Variable,
          name: "root".to_string(),
        })
      );
      assert_eq!(
        scope.lookup_imported_variable("base", "root"),
        Err(LookupError::NotImported {
          alias: "base".to_string()
        })
      );
    }

    #[test]
    fn imported_rules_and_pools() {
      let registry = Registry::new();
      let cc = registry.context("build/cc").unwrap();
      cc.static_rule("compile", RuleParams::command("gcc -c ${in}"), &[]).unwrap();
      cc.static_pool("link", PoolParams::depth(1)).unwrap();
      let app = registry.context("app").unwrap();
      app.import("build/cc").unwrap();

      let scope = app.package().scope();
      assert_eq!(scope.lookup_imported_rule("cc", "compile").unwrap().name(), "compile");
      assert_eq!(scope.lookup_imported_pool("cc", "link").unwrap().name(), "link");
      assert!(scope.lookup_imported_pool("cc", "compile").is_err());
    }

    #[test]
    fn resolve_rejects_malformed_tokens() {
      let registry = Registry::new();
      let scope = registry.package("app").unwrap().scope().clone();

      for token in ["", ".cc", "cc.", "a.b.c"] {
        assert_eq!(
          scope.resolve_variable(token),
          Err(LookupError::Malformed(token.to_string())),
          "{token:?}"
        );
      }
    }

    #[test]
    fn pool_visibility() {
      let registry = Registry::new();
      let cc = registry.context("build/cc").unwrap();
      let pool = cc.static_pool("link", PoolParams::depth(1)).unwrap();
      let app = registry.context("app").unwrap();
      let other = registry.context("other").unwrap();
      app.import("build/cc").unwrap();

      assert!(cc.package().scope().is_pool_visible(&pool));
      assert!(app.package().scope().is_pool_visible(&pool));
      assert!(!other.package().scope().is_pool_visible(&pool));
    }
  }
}
