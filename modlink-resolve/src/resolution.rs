//! The outcome of resolving a set of root modules: the data model's
//! `Resolution` (spec §3).

use modlink_descriptor::ModuleDescriptor;
use modlink_finder::ModuleReference;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::Result;
use crate::sort;

/// An immutable snapshot of resolved modules, their references, the
/// readability graph between them, and the service-provider index.
///
/// Created by [`crate::resolver::Resolver::resolve`] and refined by
/// [`crate::resolver::Resolver::bind`]; `bind` never mutates a `Resolution`
/// in place, it returns a new one.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    selected: BTreeMap<String, Arc<ModuleDescriptor>>,
    refs: BTreeMap<String, ModuleReference>,
    reads: BTreeMap<String, BTreeSet<String>>,
    providers: BTreeMap<String, BTreeSet<String>>,
    extra_exports: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    extra_opens: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl Resolution {
    /// An empty resolution, used as the implicit empty parent layer.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        selected: BTreeMap<String, Arc<ModuleDescriptor>>,
        refs: BTreeMap<String, ModuleReference>,
        reads: BTreeMap<String, BTreeSet<String>>,
        providers: BTreeMap<String, BTreeSet<String>>,
    ) -> Self {
        Self {
            selected,
            refs,
            reads,
            providers,
            extra_exports: BTreeMap::new(),
            extra_opens: BTreeMap::new(),
        }
    }

    /// Attaches CLI-level `--add-exports`/`--add-opens` grants (spec §11).
    #[must_use]
    pub(crate) fn with_extras(
        mut self,
        extra_exports: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
        extra_opens: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    ) -> Self {
        self.extra_exports = extra_exports;
        self.extra_opens = extra_opens;
        self
    }

    /// Returns true if an `--add-exports`-style grant makes `package` in
    /// `module` visible to `to_module` beyond its declared exports.
    #[must_use]
    pub fn extra_export(&self, module: &str, package: &str, to_module: &str) -> bool {
        self.extra_exports
            .get(module)
            .and_then(|packages| packages.get(package))
            .is_some_and(|targets| targets.contains(to_module))
    }

    /// Returns true if an `--add-opens`-style grant makes `package` in
    /// `module` reflectively accessible to `to_module` beyond its declared
    /// opens.
    #[must_use]
    pub fn extra_open(&self, module: &str, package: &str, to_module: &str) -> bool {
        self.extra_opens
            .get(module)
            .and_then(|packages| packages.get(package))
            .is_some_and(|targets| targets.contains(to_module))
    }

    /// Every selected module's descriptor, by name.
    #[must_use]
    pub fn selected(&self) -> &BTreeMap<String, Arc<ModuleDescriptor>> {
        &self.selected
    }

    /// The reference backing a selected module.
    #[must_use]
    pub fn reference(&self, name: &str) -> Option<&ModuleReference> {
        self.refs.get(name)
    }

    /// Every selected module's reference, by name.
    #[must_use]
    pub fn refs(&self) -> &BTreeMap<String, ModuleReference> {
        &self.refs
    }

    /// The readability graph: module name -> set of modules it reads.
    #[must_use]
    pub fn reads(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.reads
    }

    /// Returns true if `from` reads `to` (directly or by propagation).
    #[must_use]
    pub fn module_reads(&self, from: &str, to: &str) -> bool {
        self.reads.get(from).is_some_and(|r| r.contains(to))
    }

    /// Service name -> set of provider module names.
    #[must_use]
    pub fn providers(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.providers
    }

    /// Returns true if `name` is a selected module.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.selected.contains_key(name)
    }

    /// Number of selected modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Returns true if no modules are selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Orders the selected modules so each name follows every module its
    /// `requires` names, the dependency-first order several downstream
    /// components need (layer assembly's initialization order, the linker's
    /// deterministic resource population).
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Cycle`] if the requires-only subgraph
    /// contains a cycle; `resolve`/`bind` already reject these before a
    /// `Resolution` is produced, so this is defense in depth, not a new
    /// failure mode a caller needs to plan for.
    pub fn initialization_order(&self) -> Result<Vec<String>> {
        let nodes: Vec<String> = self.selected.keys().cloned().collect();
        sort::topo_sort(&nodes, |name| {
            self.selected
                .get(name)
                .map(|descriptor| {
                    descriptor
                        .requires()
                        .iter()
                        .map(|r| r.name.clone())
                        .filter(|dep| self.selected.contains_key(dep))
                        .collect()
                })
                .unwrap_or_default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_descriptor::RequiresFlags;

    fn descriptor(name: &str, requires: &[&str]) -> Arc<ModuleDescriptor> {
        let mut builder = ModuleDescriptor::builder(name);
        for dep in requires {
            builder = builder.require(*dep, RequiresFlags::empty(), None).expect("ok");
        }
        Arc::new(builder.build().expect("builds"))
    }

    #[test]
    fn initialization_order_places_dependencies_before_dependents() {
        let mut selected = BTreeMap::new();
        selected.insert("a".to_string(), descriptor("a", &["b"]));
        selected.insert("b".to_string(), descriptor("b", &["c"]));
        selected.insert("c".to_string(), descriptor("c", &[]));
        let resolution = Resolution::new(selected, BTreeMap::new(), BTreeMap::new(), BTreeMap::new());

        let order = resolution.initialization_order().expect("orders");
        let pos = |name: &str| order.iter().position(|n| n == name).expect("present");
        assert!(pos("c") < pos("b"));
        assert!(pos("b") < pos("a"));
    }
}
