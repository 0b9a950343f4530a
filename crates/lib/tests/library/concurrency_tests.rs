//! Read-only evaluation from many threads after declaration.

use std::sync::Arc;
use std::thread;

use blueprint_lib::{PackageNames, Registry, RuleParams, Scope};

use super::common::{Target, declare_toolchain_and_app, generate};

#[test]
fn rule_scope_is_built_once() {
  let registry = Registry::new();
  let ctx = registry.context("build/cc").unwrap();
  let rule = ctx
    .static_rule("compile", RuleParams::command("gcc ${cc} ${flags} -c ${in}"), &["cc", "flags"])
    .unwrap();

  let scopes: Vec<Arc<Scope>> = thread::scope(|s| {
    let handles: Vec<_> = (0..32)
      .map(|_| {
        s.spawn(|| {
          rule.def(&Target::new("arm64", 1)).unwrap();
          rule.scope()
        })
      })
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  assert!(scopes.iter().all(|scope| Arc::ptr_eq(scope, &scopes[0])));
  let cc = scopes[0].lookup_variable("cc").unwrap();
  assert!(cc.is_arg());
  assert!(scopes.iter().all(|scope| scope.lookup_variable("cc").unwrap() == cc));
}

#[test]
fn generation_runs_in_parallel_for_several_configurations() {
  let registry = Registry::new();
  declare_toolchain_and_app(&registry).unwrap();
  let names = PackageNames::full_names(&registry, Some("app"));
  let arches = ["arm64", "x86_64", "riscv64", "mips", "ppc64le", "s390x"];

  let outputs: Vec<String> = thread::scope(|s| {
    let handles: Vec<_> = arches
      .iter()
      .enumerate()
      .map(|(jobs, arch)| {
        let registry = &registry;
        let names = &names;
        s.spawn(move || generate(registry, names, &Target::new(arch, jobs as u32 + 1)).unwrap())
      })
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  for (jobs, (arch, out)) in arches.iter().zip(&outputs).enumerate() {
    assert!(out.contains(&format!("/bin/{arch}-gcc\n")), "{out}");
    assert!(out.contains(&format!("  depth = {}\n", jobs + 1)), "{out}");
  }
}
