//! End-to-end resolution and binding scenarios.

use modlink_descriptor::{ExportsFlags, ModuleDescriptor, RequiresFlags};
use modlink_finder::{ModuleOrigin, ModuleReference};
use modlink_resolve::{Error, ModuleLookup, Resolver};
use std::collections::BTreeMap;
use std::path::PathBuf;

struct FixedLookup(BTreeMap<String, ModuleReference>);

impl FixedLookup {
    /// Seeds the lookup with `descriptors` plus the implicit base module
    /// every non-base descriptor's builder requires.
    fn new(descriptors: Vec<ModuleDescriptor>) -> Self {
        let mut map = BTreeMap::new();
        let base = ModuleDescriptor::builder(modlink_descriptor::BASE_MODULE)
            .build()
            .expect("builds");
        map.insert(base.name().to_string(), reference(base));
        for descriptor in descriptors {
            map.insert(descriptor.name().to_string(), reference(descriptor));
        }
        Self(map)
    }
}

impl ModuleLookup for FixedLookup {
    fn find(&self, name: &str) -> modlink_resolve::Result<Option<ModuleReference>> {
        Ok(self.0.get(name).cloned())
    }

    fn find_all(&self) -> modlink_resolve::Result<Vec<ModuleReference>> {
        Ok(self.0.values().cloned().collect())
    }
}

fn reference(descriptor: ModuleDescriptor) -> ModuleReference {
    ModuleReference::new(descriptor, ModuleOrigin::Exploded, PathBuf::from("/virtual"), None)
}

#[test]
fn chain_of_transitive_requires_propagates_fully() {
    // a -> b -> c, each requires-transitive the next.
    let a = ModuleDescriptor::builder("a")
        .require("b", RequiresFlags::TRANSITIVE, None)
        .expect("ok")
        .build()
        .expect("builds");
    let b = ModuleDescriptor::builder("b")
        .require("c", RequiresFlags::TRANSITIVE, None)
        .expect("ok")
        .build()
        .expect("builds");
    let c = ModuleDescriptor::builder("c").build().expect("builds");

    let lookup = FixedLookup::new(vec![a, b, c]);
    let resolution = Resolver::new()
        .resolve(&lookup, None, &lookup, &["a".to_string()])
        .expect("resolves");

    assert!(resolution.module_reads("a", "b"));
    assert!(resolution.module_reads("b", "c"));
    assert!(resolution.module_reads("c", modlink_descriptor::BASE_MODULE));
}

#[test]
fn transitive_requires_reaches_past_a_non_transitive_direct_reader() {
    // a requires b (non-transitive); b requires-transitive c.
    let a = ModuleDescriptor::builder("a")
        .require("b", RequiresFlags::empty(), None)
        .expect("ok")
        .build()
        .expect("builds");
    let b = ModuleDescriptor::builder("b")
        .require("c", RequiresFlags::TRANSITIVE, None)
        .expect("ok")
        .build()
        .expect("builds");
    let c = ModuleDescriptor::builder("c").build().expect("builds");

    let lookup = FixedLookup::new(vec![a, b, c]);
    let resolution = Resolver::new()
        .resolve(&lookup, None, &lookup, &["a".to_string()])
        .expect("resolves");

    assert!(resolution.module_reads("a", "b"));
    assert!(resolution.module_reads("a", "c"));
    assert!(resolution.module_reads("b", "c"));
}

#[test]
fn bind_pulls_in_a_service_provider_for_an_unresolved_uses() {
    let m1 = ModuleDescriptor::builder("m1")
        .use_service("svc.Service")
        .build()
        .expect("builds");
    let m2 = ModuleDescriptor::builder("m2")
        .add_package("p")
        .provide("svc.Service", vec!["p.S2".to_string()])
        .expect("ok")
        .build()
        .expect("builds");

    let lookup = FixedLookup::new(vec![m1, m2]);
    let resolver = Resolver::new();

    let without_bind = resolver
        .resolve(&lookup, None, &lookup, &["m1".to_string()])
        .expect("resolves");
    assert!(without_bind.contains("m1"));
    assert!(!without_bind.contains("m2"));

    let bound = resolver
        .bind(without_bind, &lookup, &lookup, None)
        .expect("binds");
    assert!(bound.contains("m1"));
    assert!(bound.contains("m2"));
    assert!(bound.providers().get("svc.Service").is_some_and(|p| p.contains("m2")));
}

#[test]
fn requires_cycle_is_rejected() {
    let a = ModuleDescriptor::builder("a")
        .require("b", RequiresFlags::empty(), None)
        .expect("ok")
        .build()
        .expect("builds");
    let b = ModuleDescriptor::builder("b")
        .require("a", RequiresFlags::empty(), None)
        .expect("ok")
        .build()
        .expect("builds");

    let lookup = FixedLookup::new(vec![a, b]);
    let result = Resolver::new().resolve(&lookup, None, &lookup, &["a".to_string()]);
    assert!(matches!(result, Err(Error::Cycle { .. })));
}

#[test]
fn two_unqualified_exporters_of_the_same_package_split() {
    let m1 = ModuleDescriptor::builder("m1")
        .require("m2", RequiresFlags::empty(), None)
        .expect("ok")
        .require("m3", RequiresFlags::empty(), None)
        .expect("ok")
        .build()
        .expect("builds");
    let m2 = ModuleDescriptor::builder("m2")
        .add_package("p")
        .export("p", None, ExportsFlags::empty())
        .build()
        .expect("builds");
    let m3 = ModuleDescriptor::builder("m3")
        .add_package("p")
        .export("p", None, ExportsFlags::empty())
        .build()
        .expect("builds");

    let lookup = FixedLookup::new(vec![m1, m2, m3]);
    let result = Resolver::new().resolve(&lookup, None, &lookup, &["m1".to_string()]);
    assert!(matches!(result, Err(Error::SplitPackage { ref package, .. }) if package == "p"));
}

#[test]
fn empty_root_set_yields_an_empty_resolution() {
    let lookup = FixedLookup::new(vec![]);
    let resolution = Resolver::new()
        .resolve(&lookup, None, &lookup, &[])
        .expect("resolves");
    assert!(resolution.is_empty());
    assert!(resolution.reads().is_empty());
}

#[test]
fn a_requirement_already_satisfied_by_the_parent_layer_is_not_reselected() {
    let base = ModuleDescriptor::builder("base").build().expect("builds");
    let base_lookup = FixedLookup::new(vec![base]);
    let parent = Resolver::new()
        .resolve(&base_lookup, None, &base_lookup, &["base".to_string()])
        .expect("resolves");

    let child = ModuleDescriptor::builder("child")
        .require("base", RequiresFlags::empty(), None)
        .expect("ok")
        .build()
        .expect("builds");
    let child_lookup = FixedLookup::new(vec![child]);
    let resolution = Resolver::new()
        .resolve(&child_lookup, Some(&parent), &child_lookup, &["child".to_string()])
        .expect("resolves");

    assert!(resolution.contains("child"));
    assert!(!resolution.contains("base"));
    assert!(resolution.module_reads("child", "base"));
}
