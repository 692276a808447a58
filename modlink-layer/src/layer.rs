//! Layer assembly (spec §4.4): wraps a [`Resolution`] with a loader mapping
//! and a parent chain, and exposes the `findModule`/`findLoader` fallback.

use modlink_descriptor::ModuleDescriptor;
use modlink_resolve::{Error, Resolution, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::loader::{LoaderAssignment, LoaderId};

/// A set of resolved, loader-assigned modules, with a parent chain for
/// fallback lookups.
#[derive(Clone, Debug)]
pub struct ModuleLayer {
    name: String,
    resolution: Arc<Resolution>,
    loaders: BTreeMap<String, LoaderId>,
    parents: Vec<Arc<ModuleLayer>>,
    initialization_order: Vec<String>,
}

impl ModuleLayer {
    /// The distinguished empty layer: no configuration, no modules, no
    /// parents.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            name: "empty".to_string(),
            resolution: Arc::new(Resolution::empty()),
            loaders: BTreeMap::new(),
            parents: Vec::new(),
            initialization_order: Vec::new(),
        }
    }

    /// Assembles a layer from `resolution`, mapping every selected module
    /// to a loader via `assignment` (spec §4.4 steps 1-5).
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicatePackageInLoader`] if two modules mapped to
    /// the same loader declare an overlapping package.
    pub fn assemble(
        name: impl Into<String>,
        resolution: Resolution,
        assignment: &dyn LoaderAssignment,
        parents: Vec<Arc<ModuleLayer>>,
    ) -> Result<Self> {
        let mut loaders = BTreeMap::new();
        let mut packages_by_loader: BTreeMap<LoaderId, BTreeMap<String, String>> = BTreeMap::new();

        for (module_name, descriptor) in resolution.selected() {
            let loader = assignment.loader_for(module_name);
            let owned = packages_by_loader.entry(loader.clone()).or_default();
            for package in descriptor.packages() {
                if let Some(existing) = owned.get(package) {
                    if existing != module_name {
                        return Err(Error::DuplicatePackageInLoader {
                            package: package.clone(),
                            loader,
                            a: existing.clone(),
                            b: module_name.clone(),
                        });
                    }
                } else {
                    owned.insert(package.clone(), module_name.clone());
                }
            }
            loaders.insert(module_name.clone(), loader);
        }

        let initialization_order = resolution.initialization_order()?;

        Ok(Self {
            name: name.into(),
            resolution: Arc::new(resolution),
            loaders,
            parents,
            initialization_order,
        })
    }

    /// The layer's diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolution this layer was assembled from.
    #[must_use]
    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// This layer's direct parents, in precedence order.
    #[must_use]
    pub fn parents(&self) -> &[Arc<ModuleLayer>] {
        &self.parents
    }

    /// This layer's own modules, dependency-first (every name follows
    /// everything it `requires`).
    #[must_use]
    pub fn initialization_order(&self) -> &[String] {
        &self.initialization_order
    }

    /// Finds `name` in this layer, then in each parent (spec §4.4 step 6).
    #[must_use]
    pub fn find_module(&self, name: &str) -> Option<&Arc<ModuleDescriptor>> {
        if let Some(descriptor) = self.resolution.selected().get(name) {
            return Some(descriptor);
        }
        self.parents.iter().find_map(|parent| parent.find_module(name))
    }

    /// Finds the loader `name` is defined into, falling back to parents.
    #[must_use]
    pub fn find_loader(&self, name: &str) -> Option<&LoaderId> {
        if let Some(loader) = self.loaders.get(name) {
            return Some(loader);
        }
        self.parents.iter().find_map(|parent| parent.find_loader(name))
    }

    /// Every service a module mapped to `loader` provides (spec §4.4 step 5).
    #[must_use]
    pub fn service_catalog(&self, loader: &str) -> BTreeMap<String, BTreeSet<String>> {
        let mut catalog: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (service, providers) in self.resolution.providers() {
            for provider in providers {
                if self.loaders.get(provider).is_some_and(|l| l == loader) {
                    catalog.entry(service.clone()).or_default().insert(provider.clone());
                }
            }
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SingleLoader;
    use modlink_descriptor::ModuleDescriptor;
    use modlink_finder::{ModuleOrigin, ModuleReference};
    use modlink_resolve::Resolver;
    use std::path::PathBuf;

    struct FixedLookup(BTreeMap<String, ModuleReference>);

    impl modlink_resolve::ModuleLookup for FixedLookup {
        fn find(&self, name: &str) -> Result<Option<ModuleReference>> {
            Ok(self.0.get(name).cloned())
        }

        fn find_all(&self) -> Result<Vec<ModuleReference>> {
            Ok(self.0.values().cloned().collect())
        }
    }

    fn lookup_with(descriptors: Vec<ModuleDescriptor>) -> FixedLookup {
        let mut modules = BTreeMap::new();
        let base = ModuleDescriptor::builder(modlink_descriptor::BASE_MODULE)
            .build()
            .expect("builds");
        modules.insert(base.name().to_string(), reference(base));
        for descriptor in descriptors {
            modules.insert(descriptor.name().to_string(), reference(descriptor));
        }
        FixedLookup(modules)
    }

    fn reference(descriptor: ModuleDescriptor) -> ModuleReference {
        ModuleReference::new(descriptor, ModuleOrigin::Exploded, PathBuf::from("/virtual"), None)
    }

    #[test]
    fn empty_layer_has_no_modules() {
        let layer = ModuleLayer::empty();
        assert!(layer.find_module("anything").is_none());
    }

    #[test]
    fn assembled_layer_finds_its_own_modules() {
        let app = ModuleDescriptor::builder("app").add_package("app").build().expect("builds");
        let lookup = lookup_with(vec![app]);
        let resolution = Resolver::new()
            .resolve(&lookup, None, &lookup, &["app".to_string()])
            .expect("resolves");

        let layer = ModuleLayer::assemble(
            "app-layer",
            resolution,
            &SingleLoader::default(),
            Vec::new(),
        )
        .expect("assembles");

        assert!(layer.find_module("app").is_some());
        assert_eq!(
            layer.find_loader("app").map(String::as_str),
            Some(crate::loader::APPLICATION_LOADER)
        );
    }

    #[test]
    fn overlapping_packages_in_one_loader_are_rejected() {
        let a = ModuleDescriptor::builder("a").add_package("shared").build().expect("builds");
        let b = ModuleDescriptor::builder("b").add_package("shared").build().expect("builds");
        let lookup = lookup_with(vec![a, b]);
        let resolution = Resolver::new()
            .resolve(&lookup, None, &lookup, &["a".to_string(), "b".to_string()])
            .expect("resolves");

        let result = ModuleLayer::assemble(
            "conflict",
            resolution,
            &SingleLoader::default(),
            Vec::new(),
        );
        assert!(matches!(result, Err(Error::DuplicatePackageInLoader { .. })));
    }
}
