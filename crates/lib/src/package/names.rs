use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Package, Registry};
use crate::consts::NAMESPACE_SEPARATOR;
use crate::name::{NameError, validate_qualified_name};

/// Errors found when checking a prefix assignment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackageNamesError {
  #[error("package {0:?} has no assigned prefix")]
  Missing(String),

  #[error("packages {first:?} and {second:?} share the prefix {prefix:?}")]
  Duplicate {
    prefix: String,
    first: String,
    second: String,
  },

  #[error("packages {first:?} and {second:?} both have an empty prefix")]
  MultipleRoots { first: String, second: String },

  #[error("prefix {prefix:?} of package {package:?} is invalid: {source}")]
  InvalidPrefix {
    package: String,
    prefix: String,
    #[source]
    source: NameError,
  },
}

/// The namespace prefix each package renders under, keyed by package path.
///
/// An empty prefix marks the root package, whose symbols render unprefixed.
/// Packages without an entry render under their full name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageNames {
  prefixes: BTreeMap<String, String>,
}

impl PackageNames {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn assign(&mut self, pkg: &Package, prefix: impl Into<String>) {
    self.prefixes.insert(pkg.path().to_string(), prefix.into());
  }

  /// The prefix `pkg` renders under.
  pub fn prefix<'a>(&'a self, pkg: &'a Package) -> &'a str {
    self
      .prefixes
      .get(pkg.path())
      .map(String::as_str)
      .unwrap_or_else(|| pkg.full_name())
  }

  /// `prefix.name`, or the bare name for the root package.
  pub fn qualify(&self, pkg: &Package, name: &str) -> String {
    match self.prefix(pkg) {
      "" => name.to_string(),
      prefix => format!("{prefix}{NAMESPACE_SEPARATOR}{name}"),
    }
  }

  /// Every registered package under its full name, `root` unprefixed.
  pub fn full_names(registry: &Registry, root: Option<&str>) -> Self {
    let prefixes = registry
      .packages()
      .iter()
      .map(|pkg| {
        let prefix = if Some(pkg.path()) == root {
          String::new()
        } else {
          pkg.full_name().to_string()
        };
        (pkg.path().to_string(), prefix)
      })
      .collect();
    Self { prefixes }
  }

  /// Every registered package under its short name where no other package
  /// shares it, otherwise under its full name. `root` is unprefixed.
  pub fn short_names(registry: &Registry, root: Option<&str>) -> Self {
    let packages = registry.packages();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for pkg in &packages {
      *counts.entry(pkg.short_name()).or_default() += 1;
    }

    let prefixes = packages
      .iter()
      .map(|pkg| {
        let short = pkg.short_name();
        let prefix = if Some(pkg.path()) == root {
          String::new()
        } else if counts[short] == 1 {
          short.to_string()
        } else {
          pkg.full_name().to_string()
        };
        (pkg.path().to_string(), prefix)
      })
      .collect();
    Self { prefixes }
  }

  /// Check that the assignment covers every registered package, gives each a
  /// distinct valid prefix and leaves at most one package unprefixed.
  pub fn validate(&self, registry: &Registry) -> Result<(), PackageNamesError> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    let mut root: Option<&str> = None;

    for pkg in registry.packages() {
      let path = pkg.path();
      let Some((path, prefix)) = self.prefixes.get_key_value(path) else {
        return Err(PackageNamesError::Missing(path.to_string()));
      };

      if prefix.is_empty() {
        if let Some(first) = root {
          return Err(PackageNamesError::MultipleRoots {
            first: first.to_string(),
            second: path.clone(),
          });
        }
        root = Some(path.as_str());
        continue;
      }

      validate_qualified_name(prefix).map_err(|source| PackageNamesError::InvalidPrefix {
        package: path.clone(),
        prefix: prefix.clone(),
        source,
      })?;
      if let Some(first) = seen.insert(prefix.as_str(), path.as_str()) {
        return Err(PackageNamesError::Duplicate {
          prefix: prefix.clone(),
          first: first.to_string(),
          second: path.clone(),
        });
      }
    }

    Ok(())
  }
}
