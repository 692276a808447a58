//! Module access checking: the JPMS-style readability/exports/opens rules
//! applied to an assembled [`ModuleLayer`].
//!
//! For a class in module A to access a public type in module B:
//! 1. A must read B (`requires`, transitively-reexported, `--add-reads`, or
//!    implicitly via the base module).
//! 2. B must export the package containing the type to A (unqualified, or
//!    qualified to A, or via `--add-exports`).
//!
//! Deep reflection additionally requires the package to be opened rather
//! than exported.

use crate::layer::ModuleLayer;

/// Stand-in module name for code that isn't part of any named module.
pub const UNNAMED_MODULE: &str = "ALL-UNNAMED";

/// The outcome of an access check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccessCheckResult {
    /// Access is allowed.
    Allowed,
    /// `from_module` does not read `to_module`.
    NotReadable,
    /// `to_module` does not export the package to `from_module`.
    NotExported,
    /// `to_module` does not open the package to `from_module`.
    NotOpened,
}

impl AccessCheckResult {
    /// Returns true if access is allowed.
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Checks access within a single assembled layer.
#[derive(Debug)]
pub struct AccessCheck<'a> {
    layer: &'a ModuleLayer,
}

impl<'a> AccessCheck<'a> {
    /// Creates a checker scoped to `layer`.
    #[must_use]
    pub fn new(layer: &'a ModuleLayer) -> Self {
        Self { layer }
    }

    /// Checks compile-time-style access: readability plus export.
    #[must_use]
    pub fn check_access(&self, from_module: &str, to_module: &str, package: &str) -> AccessCheckResult {
        if from_module == to_module {
            return AccessCheckResult::Allowed;
        }
        if from_module == UNNAMED_MODULE {
            return self.check_unnamed(to_module, package, false);
        }
        if !self.can_read(from_module, to_module) {
            return AccessCheckResult::NotReadable;
        }
        if !self.is_exported(to_module, package, from_module) {
            return AccessCheckResult::NotExported;
        }
        AccessCheckResult::Allowed
    }

    /// Checks deep-reflection access: readability plus open.
    #[must_use]
    pub fn check_reflection_access(
        &self,
        from_module: &str,
        to_module: &str,
        package: &str,
    ) -> AccessCheckResult {
        if from_module == to_module {
            return AccessCheckResult::Allowed;
        }
        if from_module == UNNAMED_MODULE {
            return self.check_unnamed(to_module, package, true);
        }
        if !self.can_read(from_module, to_module) {
            return AccessCheckResult::NotReadable;
        }
        if !self.is_opened(to_module, package, from_module) {
            return AccessCheckResult::NotOpened;
        }
        AccessCheckResult::Allowed
    }

    /// Returns true if `from_module` reads `to_module`.
    #[must_use]
    pub fn can_read(&self, from_module: &str, to_module: &str) -> bool {
        if from_module == to_module || to_module == modlink_descriptor::BASE_MODULE {
            return true;
        }
        self.layer.resolution().module_reads(from_module, to_module)
    }

    /// Returns true if `package` in `to_module` is exported to `from_module`.
    #[must_use]
    pub fn is_exported(&self, to_module: &str, package: &str, from_module: &str) -> bool {
        let Some(descriptor) = self.layer.find_module(to_module) else {
            return false;
        };
        if descriptor.is_automatic() {
            return descriptor.packages().contains(package);
        }
        descriptor.exports_package(package, Some(from_module))
            || self.layer.resolution().extra_export(to_module, package, from_module)
    }

    /// Returns true if `package` in `to_module` is opened to `from_module`.
    #[must_use]
    pub fn is_opened(&self, to_module: &str, package: &str, from_module: &str) -> bool {
        let Some(descriptor) = self.layer.find_module(to_module) else {
            return false;
        };
        if descriptor.is_open() || descriptor.is_automatic() {
            return descriptor.packages().contains(package);
        }
        descriptor.opens_package(package, Some(from_module))
            || self.layer.resolution().extra_open(to_module, package, from_module)
    }

    fn check_unnamed(&self, to_module: &str, package: &str, reflective: bool) -> AccessCheckResult {
        let Some(descriptor) = self.layer.find_module(to_module) else {
            return AccessCheckResult::NotExported;
        };
        let visible = if descriptor.is_automatic() || descriptor.is_open() {
            descriptor.packages().contains(package)
        } else if reflective {
            descriptor.opens_package(package, None) || descriptor.opens_package(package, Some(UNNAMED_MODULE))
        } else {
            descriptor.exports_package(package, None) || descriptor.exports_package(package, Some(UNNAMED_MODULE))
        };
        if visible {
            AccessCheckResult::Allowed
        } else if reflective {
            AccessCheckResult::NotOpened
        } else {
            AccessCheckResult::NotExported
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SingleLoader;
    use modlink_descriptor::{ExportsFlags, ModuleDescriptor};
    use modlink_finder::{ModuleOrigin, ModuleReference};
    use modlink_resolve::{ModuleLookup, Resolver};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    struct FixedLookup(BTreeMap<String, ModuleReference>);

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

    #[test]
    fn unqualified_export_is_visible_to_a_reading_consumer() {
        let provider = ModuleDescriptor::builder("provider")
            .add_package("p")
            .export("p", None, ExportsFlags::empty())
            .build()
            .expect("builds");
        let consumer = ModuleDescriptor::builder("consumer")
            .require("provider", modlink_descriptor::RequiresFlags::empty(), None)
            .expect("ok")
            .build()
            .expect("builds");

        let lookup = lookup_with(vec![provider, consumer]);
        let resolution = Resolver::new()
            .resolve(&lookup, None, &lookup, &["consumer".to_string()])
            .expect("resolves");
        let layer = ModuleLayer::assemble("l", resolution, &SingleLoader::default(), Vec::new())
            .expect("assembles");
        let check = AccessCheck::new(&layer);

        assert_eq!(
            check.check_access("consumer", "provider", "p"),
            AccessCheckResult::Allowed
        );
    }

    #[test]
    fn unread_module_is_not_readable() {
        let provider = ModuleDescriptor::builder("provider")
            .add_package("p")
            .export("p", None, ExportsFlags::empty())
            .build()
            .expect("builds");
        let consumer = ModuleDescriptor::builder("consumer").build().expect("builds");

        let lookup = lookup_with(vec![provider, consumer]);
        let resolution = Resolver::new()
            .resolve(&lookup, None, &lookup, &["consumer".to_string(), "provider".to_string()])
            .expect("resolves");
        let layer = ModuleLayer::assemble("l", resolution, &SingleLoader::default(), Vec::new())
            .expect("assembles");
        let check = AccessCheck::new(&layer);

        assert_eq!(
            check.check_access("consumer", "provider", "p"),
            AccessCheckResult::NotReadable
        );
    }

    #[test]
    fn unexported_package_is_denied_even_when_readable() {
        let provider = ModuleDescriptor::builder("provider")
            .add_package("internal")
            .build()
            .expect("builds");
        let consumer = ModuleDescriptor::builder("consumer")
            .require("provider", modlink_descriptor::RequiresFlags::empty(), None)
            .expect("ok")
            .build()
            .expect("builds");

        let lookup = lookup_with(vec![provider, consumer]);
        let resolution = Resolver::new()
            .resolve(&lookup, None, &lookup, &["consumer".to_string()])
            .expect("resolves");
        let layer = ModuleLayer::assemble("l", resolution, &SingleLoader::default(), Vec::new())
            .expect("assembles");
        let check = AccessCheck::new(&layer);

        assert_eq!(
            check.check_access("consumer", "provider", "internal"),
            AccessCheckResult::NotExported
        );
    }
}
