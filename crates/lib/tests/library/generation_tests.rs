//! End-to-end tests: declare once, generate for several configurations.

use blueprint_lib::{Error, PackageNames, Registry, RuleParams};

use super::common::{Target, declare_toolchain_and_app, generate};

#[test]
fn same_declarations_serve_two_configurations() {
  let registry = Registry::new();
  declare_toolchain_and_app(&registry).unwrap();
  let names = PackageNames::full_names(&registry, Some("app"));
  names.validate(&registry).unwrap();

  let arm = generate(&registry, &names, &Target::new("arm64", 2)).unwrap();
  let x86 = generate(&registry, &names, &Target::new("x86_64", 8)).unwrap();

  assert_eq!(
    arm,
    "\
cflags = -O2 -Wall
rule link
  pool = toolchains.cc.link
  command = ${toolchains.cc.cc} ${cflags} -o ${out} ${in}
toolchains.cc.cc = ${toolchains.cc.root}/bin/arm64-gcc
toolchains.cc.root = /opt/toolchain
pool toolchains.cc.link
  depth = 2
rule toolchains.cc.compile
  command = ${toolchains.cc.cc} ${cflags} -MD -MF ${out}.d -c ${in} -o ${out}
  depfile = ${out}.d
  deps = gcc
  description = CC ${out}
"
  );
  assert!(x86.contains("toolchains.cc.cc = ${toolchains.cc.root}/bin/x86_64-gcc\n"));
  assert!(x86.contains("pool toolchains.cc.link\n  depth = 8\n"));
}

#[test]
fn short_prefixes_change_rendering_only() {
  let registry = Registry::new();
  declare_toolchain_and_app(&registry).unwrap();
  let names = PackageNames::short_names(&registry, Some("app"));
  names.validate(&registry).unwrap();

  let out = generate(&registry, &names, &Target::new("arm64", 2)).unwrap();

  assert!(out.contains("cc.cc = ${cc.root}/bin/arm64-gcc\n"));
  assert!(out.contains("rule cc.compile\n"));
  assert!(out.contains("  pool = cc.link\n"));
}

#[test]
fn expansion_resolves_through_imports() {
  let registry = Registry::new();
  declare_toolchain_and_app(&registry).unwrap();
  let app = registry.context("app").unwrap();
  let cmd = app.static_variable("cmd", "${cc.cc} $cflags $$PATH").unwrap();

  let expanded = cmd.value(&Target::new("riscv64", 1)).unwrap().expand(&Target::new("riscv64", 1)).unwrap();

  assert_eq!(expanded, "/opt/toolchain/bin/riscv64-gcc -O2 -Wall $$PATH");
}

#[test]
fn wrong_configuration_type_is_reported_with_symbol() {
  let registry = Registry::new();
  declare_toolchain_and_app(&registry).unwrap();
  let names = PackageNames::full_names(&registry, Some("app"));

  let err = generate(&registry, &names, &"not a target".to_string()).unwrap_err();

  assert!(matches!(err, Error::Config { ref symbol, .. } if symbol == "variable toolchains.cc.cc"));
}

#[test]
fn unresolved_reference_names_symbol_and_token() {
  let registry = Registry::new();
  let app = registry.context("app").unwrap();
  app.static_rule("bad", RuleParams::command("tool ${missing.flags}"), &[]).unwrap();
  let names = PackageNames::full_names(&registry, Some("app"));

  let err = generate(&registry, &names, &Target::new("arm64", 1)).unwrap_err();

  assert!(err.is_unresolved_reference());
  let message = err.to_string();
  assert!(message.contains("rule app.bad"), "{message}");
  assert!(message.contains("\"missing.flags\""), "{message}");
}

#[test]
fn phony_is_never_defined() {
  let registry = Registry::new();
  declare_toolchain_and_app(&registry).unwrap();

  let phony = registry.context("app").unwrap().package().scope().lookup_rule("phony").unwrap();

  assert!(phony.is_builtin());
  assert!(matches!(
    phony.def(&Target::new("arm64", 1)),
    Err(Error::RuleIsBuiltin { .. })
  ));
}
