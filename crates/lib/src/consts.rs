//! Constants shared across the declaration core.

/// Separates the segments of a package path (`"build/cc"`).
pub const PATH_SEPARATOR: char = '/';

/// Separates a namespace from a symbol (`"build.cc.cflags"`, `"${cc.cflags}"`).
pub const NAMESPACE_SEPARATOR: char = '.';

/// Name of the built-in no-op rule seeded into every registry.
pub const PHONY_RULE: &str = "phony";

/// Argument placeholders the build tool defines for every rule.
///
/// They exist in every rule scope and cannot be declared as rule arguments.
pub const BUILTIN_RULE_ARGS: &[&str] = &["in", "out"];

/// Maximum nesting of variable references followed by [`NinjaString::expand`].
///
/// [`NinjaString::expand`]: crate::ninja_string::NinjaString::expand
pub const MAX_EXPANSION_DEPTH: usize = 64;
