//! Packages, the registry that owns them and their naming.
//!
//! A [`Package`] is a unit of declarations identified by an opaque path such
//! as `"build/cc"`. The [`Registry`] creates each package on first use and
//! keeps it for its own lifetime. Declarations go through a
//! [`PackageContext`], which carries the declaring package explicitly.
//!
//! # Names
//!
//! - path: the identity supplied by the loader, `"build/cc"`
//! - full name: the path with separators replaced, `"build.cc"`, the default
//!   namespace prefix
//! - short name: the last path segment, `"cc"`, the default import alias
//!
//! The prefix each package finally renders under is chosen by the generation
//! pass and recorded in [`PackageNames`].

mod context;
mod names;
mod registry;

pub use context::PackageContext;
pub use names::{PackageNames, PackageNamesError};
pub use registry::Registry;

use std::fmt;
use std::sync::Arc;

use crate::consts::{NAMESPACE_SEPARATOR, PATH_SEPARATOR};
use crate::error::{Error, Result};
use crate::name::validate_qualified_name;
use crate::scope::{Scope, ScopeKind};

/// A declaration unit owning one scope.
pub struct Package {
  path: String,
  full_name: String,
  short_name: String,
  scope: Arc<Scope>,
}

impl Package {
  /// Derive the names for `path` and create the package scope under `builtins`.
  ///
  /// Dots in the path survive into the full name, so host-qualified paths
  /// such as `"github.com/google/blueprint"` are accepted.
  ///
  /// # Errors
  ///
  /// [`Error::InvalidPackagePath`] when a path segment is not a valid name.
  pub(crate) fn new(path: &str, builtins: &Arc<Scope>) -> Result<Self> {
    let full_name = path.replace(PATH_SEPARATOR, &NAMESPACE_SEPARATOR.to_string());
    validate_qualified_name(&full_name).map_err(|source| Error::InvalidPackagePath {
      path: path.to_string(),
      source,
    })?;
    let short_name = path.rsplit(PATH_SEPARATOR).next().unwrap_or(path).to_string();

    Ok(Self {
      path: path.to_string(),
      full_name,
      short_name,
      scope: Scope::new(ScopeKind::Package, path, Some(Arc::clone(builtins))),
    })
  }

  pub fn path(&self) -> &str {
    &self.path
  }

  pub fn full_name(&self) -> &str {
    &self.full_name
  }

  pub fn short_name(&self) -> &str {
    &self.short_name
  }

  pub fn scope(&self) -> &Arc<Scope> {
    &self.scope
  }

  /// `"<kind> <full name>.<name>"`, used to tag errors and logs.
  pub(crate) fn symbol_label(&self, kind: &str, name: &str) -> String {
    format!("{kind} {}{NAMESPACE_SEPARATOR}{name}", self.full_name)
  }
}

impl PartialEq for Package {
  fn eq(&self, other: &Self) -> bool {
    self.path == other.path
  }
}

impl Eq for Package {}

impl fmt::Debug for Package {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Package")
      .field("path", &self.path)
      .field("full_name", &self.full_name)
      .field("short_name", &self.short_name)
      .finish_non_exhaustive()
  }
}
