//! Name validation and qualification through the public API.

use blueprint_lib::name::{NameError, validate_name};
use blueprint_lib::scope::{ScopeError, SymbolKind};
use blueprint_lib::{Error, PackageNames, PackageNamesError, Registry};

#[test]
fn every_charset_name_is_accepted() {
  let charset: Vec<char> = ('a'..='z').chain('A'..='Z').chain('0'..='9').chain(['_', '-']).collect();

  for ch in &charset {
    assert_eq!(validate_name(&ch.to_string()), Ok(()), "{ch:?}");
  }
  let long: String = charset.iter().collect();
  assert_eq!(validate_name(&long), Ok(()));
}

#[test]
fn separators_and_empty_are_rejected() {
  for name in ["", ".", "a.b", "a/b", "pkg.", ".pkg"] {
    assert!(validate_name(name).is_err(), "{name:?}");
  }
  assert_eq!(validate_name(""), Err(NameError::Empty));
}

#[test]
fn qualified_names_follow_prefixes() {
  let registry = Registry::new();
  let lib = registry.context("a/b/c").unwrap();
  let flags = lib.static_variable("flags", "-g").unwrap();
  let root = registry.context("root").unwrap();
  let srcs = root.static_variable("srcs", "main.c").unwrap();

  let names = PackageNames::full_names(&registry, Some("root"));

  assert_eq!(flags.full_name(&names), "a.b.c.flags");
  assert_eq!(srcs.full_name(&names), "srcs");

  let names = PackageNames::full_names(&registry, Some("a/b/c"));
  assert_eq!(flags.full_name(&names), "flags");
  assert_eq!(srcs.full_name(&names), "root.srcs");
}

#[test]
fn explicit_alias_resolves_name_clash() {
  let registry = Registry::new();
  registry.context("gnu/cc").unwrap().static_variable("cc", "gcc").unwrap();
  registry.context("llvm/cc").unwrap().static_variable("cc", "clang").unwrap();
  let app = registry.context("app").unwrap();
  app.import("gnu/cc").unwrap();

  let err = app.import("llvm/cc").unwrap_err();
  assert!(matches!(err, Error::Collision(ScopeError::DuplicateImport { .. })));
  assert!(err.to_string().contains("gnu/cc"));

  app.import_as("clang", "llvm/cc").unwrap();
  let cmd = app.static_variable("cmd", "${cc.cc} vs ${clang.cc}").unwrap();
  let names = PackageNames::full_names(&registry, Some("app"));

  let rendered = cmd.value(&()).unwrap().render(&names);

  assert_eq!(rendered, "${gnu.cc.cc} vs ${llvm.cc.cc}");
}

#[test]
fn alias_and_symbol_collide_in_either_order() {
  let registry = Registry::new();
  registry.context("build/cc").unwrap().static_variable("cflags", "-O2").unwrap();
  let first = registry.context("first").unwrap();
  let second = registry.context("second").unwrap();

  first.import("build/cc").unwrap();
  let err = first.static_variable("cc", "x").unwrap_err();
  assert!(matches!(
    err,
    Error::Collision(ScopeError::ShadowsImport { kind: SymbolKind::Variable, .. })
  ));

  second.static_variable("cc", "x").unwrap();
  let err = second.import("build/cc").unwrap_err();
  assert!(matches!(
    err,
    Error::Collision(ScopeError::ImportShadowsSymbol { kind: SymbolKind::Variable, .. })
  ));
}

#[test]
fn prefix_assignment_must_be_injective() {
  let registry = Registry::new();
  registry.package("x/cc").unwrap();
  registry.package("y/cc").unwrap();
  let mut names = PackageNames::new();
  names.assign(&registry.get("x/cc").unwrap(), "cc");
  names.assign(&registry.get("y/cc").unwrap(), "cc");

  let err = names.validate(&registry).unwrap_err();

  assert!(matches!(err, PackageNamesError::Duplicate { ref prefix, .. } if prefix == "cc"));
  assert!(matches!(Error::from(err), Error::PackageNames(_)));
}
