use std::any::Any;
use std::sync::Arc;

use tracing::debug;

use super::{Package, Registry};
use crate::config::{self, Config, ConfigAccessor};
use crate::error::{Error, Result};
use crate::module_type::{Module, ModuleType, Properties};
use crate::name::validate_name;
use crate::pool::{Pool, PoolParams};
use crate::rule::{Rule, RuleParams, validate_args};
use crate::variable::Variable;

/// Declarations made on behalf of one package.
///
/// The loader creates one context per source unit it processes, with
/// [`Registry::context`]. Every declaration validates its input completely
/// before touching the package scope, so a failed declaration leaves nothing
/// behind.
pub struct PackageContext<'r> {
  registry: &'r Registry,
  pkg: Arc<Package>,
}

impl<'r> PackageContext<'r> {
  pub(crate) fn new(registry: &'r Registry, pkg: Arc<Package>) -> Self {
    Self { registry, pkg }
  }

  pub fn registry(&self) -> &'r Registry {
    self.registry
  }

  pub fn package(&self) -> &Arc<Package> {
    &self.pkg
  }

  // ==========================================================================
  // Imports
  // ==========================================================================

  /// Expose the package at `path` under its short name.
  ///
  /// # Errors
  ///
  /// [`Error::UnknownPackage`] unless `path` declares at least one variable,
  /// rule or pool.
  pub fn import(&self, path: &str) -> Result<()> {
    let target = self.target(path)?;
    self.add_import(target.short_name(), &target)
  }

  /// Expose the package at `path` under `alias`.
  pub fn import_as(&self, alias: &str, path: &str) -> Result<()> {
    let target = self.target(path)?;
    self.add_import(alias, &target)
  }

  /// Packages that exist but declare nothing have no symbols to expose, so
  /// they are unknown as import targets.
  fn target(&self, path: &str) -> Result<Arc<Package>> {
    self
      .registry
      .get(path)
      .filter(|pkg| pkg.scope().has_declarations())
      .ok_or_else(|| Error::UnknownPackage { path: path.to_string() })
  }

  fn add_import(&self, alias: &str, target: &Package) -> Result<()> {
    self.pkg.scope().add_import(alias, target.scope())?;
    debug!(package = %self.pkg.path(), alias, target = %target.path(), "imported package");
    Ok(())
  }

  // ==========================================================================
  // Variables
  // ==========================================================================

  /// Declare a variable with fixed text.
  ///
  /// The text is parsed when the variable is evaluated, so it may refer to
  /// variables declared later in the same package.
  pub fn static_variable(&self, name: &str, value: impl Into<String>) -> Result<Variable> {
    validate_name(name)?;
    self.add_variable(Variable::new_static(Arc::clone(&self.pkg), name, value.into()))
  }

  /// Declare a variable whose text is computed from the configuration.
  pub fn variable_func<F>(&self, name: &str, f: F) -> Result<Variable>
  where
    F: Fn(&Config) -> anyhow::Result<String> + Send + Sync + 'static,
  {
    validate_name(name)?;
    let value = config::from_closure(self.pkg.symbol_label("variable", name), f);
    self.add_variable(Variable::new_func(Arc::clone(&self.pkg), name, value))
  }

  /// Declare a variable whose text is a method of the configuration type `C`.
  ///
  /// Evaluating it with a configuration of any other type fails with
  /// [`Error::ConfigType`].
  pub fn variable_config_method<C, F>(&self, name: &str, method: F) -> Result<Variable>
  where
    C: Any,
    F: Fn(&C) -> String + Send + Sync + 'static,
  {
    validate_name(name)?;
    let value = config::from_method(self.pkg.symbol_label("variable", name), method);
    self.add_variable(Variable::new_func(Arc::clone(&self.pkg), name, value))
  }

  /// Declare a variable backed by an accessor discovered at runtime.
  ///
  /// # Errors
  ///
  /// [`Error::MethodShape`] right away unless the accessor takes no
  /// parameters and returns one text value.
  pub fn variable_accessor<A>(&self, name: &str, accessor: A) -> Result<Variable>
  where
    A: ConfigAccessor + 'static,
  {
    validate_name(name)?;
    let value = config::from_accessor(name, self.pkg.symbol_label("variable", name), Arc::new(accessor))?;
    self.add_variable(Variable::new_func(Arc::clone(&self.pkg), name, value))
  }

  fn add_variable(&self, variable: Variable) -> Result<Variable> {
    self.pkg.scope().add_variable(variable.clone())?;
    debug!(package = %self.pkg.path(), name = variable.name(), "declared variable");
    Ok(variable)
  }

  // ==========================================================================
  // Rules
  // ==========================================================================

  /// Declare a rule with fixed parameters and the given argument names.
  pub fn static_rule(&self, name: &str, params: RuleParams, args: &[&str]) -> Result<Rule> {
    validate_name(name)?;
    let args = validate_args(&self.pkg.symbol_label("rule", name), args)?;
    self.add_rule(Rule::new_static(Arc::clone(&self.pkg), name, params, args))
  }

  /// Declare a rule whose parameters are computed from the configuration.
  pub fn rule_func<F>(&self, name: &str, f: F, args: &[&str]) -> Result<Rule>
  where
    F: Fn(&Config) -> anyhow::Result<RuleParams> + Send + Sync + 'static,
  {
    validate_name(name)?;
    let label = self.pkg.symbol_label("rule", name);
    let args = validate_args(&label, args)?;
    let params = config::from_closure(label, f);
    self.add_rule(Rule::new_func(Arc::clone(&self.pkg), name, params, args))
  }

  fn add_rule(&self, rule: Rule) -> Result<Rule> {
    self.pkg.scope().add_rule(rule.clone())?;
    debug!(
      package = %self.pkg.path(),
      name = rule.name(),
      args = ?rule.arg_names().collect::<Vec<_>>(),
      "declared rule"
    );
    Ok(rule)
  }

  // ==========================================================================
  // Pools
  // ==========================================================================

  pub fn static_pool(&self, name: &str, params: PoolParams) -> Result<Pool> {
    validate_name(name)?;
    self.add_pool(Pool::new_static(Arc::clone(&self.pkg), name, params))
  }

  pub fn pool_func<F>(&self, name: &str, f: F) -> Result<Pool>
  where
    F: Fn(&Config) -> anyhow::Result<PoolParams> + Send + Sync + 'static,
  {
    validate_name(name)?;
    let params = config::from_closure(self.pkg.symbol_label("pool", name), f);
    self.add_pool(Pool::new_func(Arc::clone(&self.pkg), name, params))
  }

  fn add_pool(&self, pool: Pool) -> Result<Pool> {
    self.pkg.scope().add_pool(pool.clone())?;
    debug!(package = %self.pkg.path(), name = pool.name(), "declared pool");
    Ok(pool)
  }

  // ==========================================================================
  // Module Types
  // ==========================================================================

  /// Register a module type built by `factory`.
  pub fn module_type<F>(&self, name: &str, factory: F) -> Result<ModuleType>
  where
    F: Fn() -> (Box<dyn Module>, Properties) + Send + Sync + 'static,
  {
    validate_name(name)?;
    let module_type = ModuleType::new(Arc::clone(&self.pkg), name, Arc::new(factory));
    self.registry.register_module_type(module_type)
  }
}
