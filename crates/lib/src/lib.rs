//! blueprint-lib: declaration and symbol resolution for build definitions
//!
//! This crate is the core a build-definition loader declares into and a
//! build-graph generator reads from:
//! - `Registry`: every package, its scope and the registered module types
//! - `PackageContext`: declarations made on behalf of one package
//! - `Variable`, `Rule`, `Pool`: declared symbols, evaluated per build
//!   configuration only when the build graph is generated
//! - `NinjaString`: declaration text parsed into literal and reference segments
//! - `PackageNames`: the namespace prefix each package renders under
//!
//! Declaration happens once and up front; afterwards everything is read-only
//! and may be evaluated from many threads.

pub mod config;
pub mod consts;
pub mod error;
pub mod module_type;
pub mod name;
pub mod ninja_string;
pub mod package;
pub mod pool;
pub mod rule;
pub mod scope;
pub mod variable;

#[cfg(test)]
mod util;

pub use config::{AccessorSignature, AccessorValue, Config, ConfigAccessor, ValueKind};
pub use error::{Error, Result};
pub use module_type::{Module, ModuleType, Properties};
pub use ninja_string::NinjaString;
pub use package::{Package, PackageContext, PackageNames, PackageNamesError, Registry};
pub use pool::{Pool, PoolDef, PoolParams};
pub use rule::{Deps, Rule, RuleDef, RuleParams};
pub use scope::Scope;
pub use variable::Variable;
