//! Test utilities for blueprint-lib.

use anyhow::Context;

use crate::config::Config;
use crate::package::{PackageNames, Registry};

/// A configuration object as a build driver would pass it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestConfig {
  pub arch: String,
}

impl TestConfig {
  pub fn arch(arch: &str) -> Self {
    Self { arch: arch.to_string() }
  }

  /// Recover the test configuration inside an evaluation function.
  pub fn from_any(config: &Config) -> anyhow::Result<&TestConfig> {
    config
      .downcast_ref::<TestConfig>()
      .context("configuration is not a TestConfig")
  }
}

impl Default for TestConfig {
  fn default() -> Self {
    Self::arch("x86_64")
  }
}

/// Every package of `registry` under its full name.
pub fn names(registry: &Registry) -> PackageNames {
  PackageNames::full_names(registry, None)
}
