//! Shared fixtures for library integration tests.

use std::fmt::Write;

use blueprint_lib::{Config, PackageNames, Registry, Result};

/// Configuration object passed to evaluation functions in tests.
#[derive(Debug, Clone)]
pub struct Target {
  pub arch: String,
  pub jobs: u32,
}

impl Target {
  pub fn new(arch: &str, jobs: u32) -> Self {
    Self {
      arch: arch.to_string(),
      jobs,
    }
  }

  pub fn from_config(config: &Config) -> anyhow::Result<&Target> {
    config
      .downcast_ref::<Target>()
      .ok_or_else(|| anyhow::anyhow!("configuration is not a Target"))
  }
}

/// Declare a small two-package build: a toolchain package and an app
/// importing it.
pub fn declare_toolchain_and_app(registry: &Registry) -> Result<()> {
  let cc = registry.context("toolchains/cc")?;
  cc.static_variable("root", "/opt/toolchain")?;
  cc.variable_func("cc", |config| {
    Ok(format!("${{root}}/bin/{}-gcc", Target::from_config(config)?.arch))
  })?;
  cc.pool_func("link", |config| {
    Ok(blueprint_lib::PoolParams::depth(Target::from_config(config)?.jobs))
  })?;
  cc.static_rule(
    "compile",
    blueprint_lib::RuleParams {
      depfile: "${out}.d".to_string(),
      deps: blueprint_lib::Deps::Gcc,
      description: "CC ${out}".to_string(),
      ..blueprint_lib::RuleParams::command("${cc} ${cflags} -MD -MF ${out}.d -c ${in} -o ${out}")
    },
    &["cflags"],
  )?;

  let app = registry.context("app")?;
  app.import("toolchains/cc")?;
  app.static_variable("cflags", "-O2 -Wall")?;
  let link_pool = app.package().scope().lookup_imported_pool("cc", "link")?;
  app.static_rule(
    "link",
    blueprint_lib::RuleParams {
      pool: Some(link_pool),
      ..blueprint_lib::RuleParams::command("${cc.cc} ${cflags} -o ${out} ${in}")
    },
    &[],
  )?;
  Ok(())
}

/// Render every declared variable, pool and rule the way a generator would.
pub fn generate(registry: &Registry, names: &PackageNames, config: &Config) -> Result<String> {
  let mut out = String::new();

  for pkg in registry.packages() {
    let scope = pkg.scope();

    for variable in scope.variables() {
      let value = variable.value(config)?;
      writeln!(out, "{} = {}", variable.full_name(names), value.render(names)).ok();
    }

    for pool in scope.pools() {
      let def = pool.def(config)?;
      writeln!(out, "pool {}\n  depth = {}", pool.full_name(names), def.depth).ok();
    }

    for rule in scope.rules() {
      let def = rule.def(config)?;
      writeln!(out, "rule {}", rule.full_name(names)).ok();
      if let Some(pool) = &def.pool {
        writeln!(out, "  pool = {}", pool.full_name(names)).ok();
      }
      for (key, value) in &def.variables {
        writeln!(out, "  {key} = {}", value.render(names)).ok();
      }
    }
  }

  Ok(out)
}
