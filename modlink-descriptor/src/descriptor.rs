//! The module descriptor data model (spec §3).

use crate::error::{DescriptorError, Result};
use crate::flags::{ExportsFlags, ModuleFlags, OpensFlags, RequiresFlags};
use crate::version::Version;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The name every descriptor implicitly requires unless it is the base
/// module itself.
pub const BASE_MODULE: &str = "java.base";

/// A `requires` directive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Requires {
    /// Name of the required module.
    pub name: String,
    /// Modifiers for this directive.
    pub flags: RequiresFlags,
    /// Optional version the dependency was compiled against.
    pub compiled_version: Option<String>,
}

impl Requires {
    /// Returns true if dependents of the requiring module also implicitly
    /// require this dependency.
    #[must_use]
    pub fn is_transitive(&self) -> bool {
        self.flags.contains(RequiresFlags::TRANSITIVE)
    }

    /// Returns true if this requirement applies only at the static phase.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(RequiresFlags::STATIC)
    }

    /// Returns true if this requirement was implicitly added by the platform.
    #[must_use]
    pub fn is_mandated(&self) -> bool {
        self.flags.contains(RequiresFlags::MANDATED)
    }
}

/// An `exports` directive: a package made visible to some or all modules.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Exports {
    /// The exported package.
    pub package: String,
    /// Target modules, or `None` for an unqualified (everyone) export.
    pub targets: Option<BTreeSet<String>>,
    /// Modifiers for this directive.
    pub flags: ExportsFlags,
}

impl Exports {
    /// Returns true if this export is qualified to specific modules.
    #[must_use]
    pub fn is_qualified(&self) -> bool {
        self.targets.is_some()
    }

    /// Returns true if the package is visible to `module`.
    #[must_use]
    pub fn exports_to(&self, module: &str) -> bool {
        match &self.targets {
            None => true,
            Some(targets) => targets.contains(module),
        }
    }
}

/// An `opens` directive: a package made reflectively accessible.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Opens {
    /// The opened package.
    pub package: String,
    /// Target modules, or `None` for an unqualified open.
    pub targets: Option<BTreeSet<String>>,
    /// Modifiers for this directive.
    pub flags: OpensFlags,
}

impl Opens {
    /// Returns true if this open is qualified to specific modules.
    #[must_use]
    pub fn is_qualified(&self) -> bool {
        self.targets.is_some()
    }

    /// Returns true if the package is reflectively visible to `module`.
    #[must_use]
    pub fn opens_to(&self, module: &str) -> bool {
        match &self.targets {
            None => true,
            Some(targets) => targets.contains(module),
        }
    }
}

/// A `provides` directive: a service interface and its implementations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Provides {
    /// The service type name.
    pub service: String,
    /// Non-empty, ordered list of provider class names.
    pub providers: Vec<String>,
}

/// A recorded per-dependency content-hash table (spec §4.3 step 4): the
/// digest algorithm the compiler hashed dependencies with, and each
/// dependency's recorded digest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModuleHashes {
    /// The digest algorithm name, e.g. `"SHA-256"`.
    pub algorithm: String,
    /// Dependency module name -> recorded digest bytes.
    pub entries: BTreeMap<String, Vec<u8>>,
}

/// An immutable module descriptor, as parsed from a binary module
/// declaration or synthesized for an automatic module.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModuleDescriptor {
    name: String,
    flags: ModuleFlags,
    version: Option<Version>,
    requires: Vec<Requires>,
    exports: Vec<Exports>,
    opens: Vec<Opens>,
    uses: BTreeSet<String>,
    provides: Vec<Provides>,
    packages: BTreeSet<String>,
    main_class: Option<String>,
    os_name: Option<String>,
    os_arch: Option<String>,
    os_version: Option<String>,
    hashes: Option<ModuleHashes>,
}

impl ModuleDescriptor {
    /// Starts building a descriptor named `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ModuleDescriptorBuilder {
        ModuleDescriptorBuilder::new(name.into())
    }

    /// The module's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module's modifiers.
    #[must_use]
    pub fn flags(&self) -> ModuleFlags {
        self.flags
    }

    /// Returns true if the module is open (all packages implicitly opened).
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.flags.contains(ModuleFlags::OPEN)
    }

    /// Returns true if the module was synthesized from a plain archive.
    #[must_use]
    pub fn is_automatic(&self) -> bool {
        self.flags.contains(ModuleFlags::AUTOMATIC)
    }

    /// The module's declared version, if any.
    #[must_use]
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// The module's `requires` directives.
    #[must_use]
    pub fn requires(&self) -> &[Requires] {
        &self.requires
    }

    /// Returns true if this module requires `name` (directly).
    #[must_use]
    pub fn requires_module(&self, name: &str) -> bool {
        self.requires.iter().any(|r| r.name == name)
    }

    /// The module's `exports` directives.
    #[must_use]
    pub fn exports(&self) -> &[Exports] {
        &self.exports
    }

    /// The module's `opens` directives.
    #[must_use]
    pub fn opens(&self) -> &[Opens] {
        &self.opens
    }

    /// Service types this module consumes.
    #[must_use]
    pub fn uses(&self) -> &BTreeSet<String> {
        &self.uses
    }

    /// Service implementations this module provides.
    #[must_use]
    pub fn provides(&self) -> &[Provides] {
        &self.provides
    }

    /// All packages belonging to this module.
    #[must_use]
    pub fn packages(&self) -> &BTreeSet<String> {
        &self.packages
    }

    /// The module's main class, if declared.
    #[must_use]
    pub fn main_class(&self) -> Option<&str> {
        self.main_class.as_deref()
    }

    /// The module's recorded per-dependency hash table, if it carries one.
    #[must_use]
    pub fn hashes(&self) -> Option<&ModuleHashes> {
        self.hashes.as_ref()
    }

    /// Returns true if `package` is visible to `to_module` (or to everyone
    /// when `to_module` is `None` and the export is unqualified).
    #[must_use]
    pub fn exports_package(&self, package: &str, to_module: Option<&str>) -> bool {
        self.exports.iter().any(|export| {
            export.package == package
                && match to_module {
                    Some(module) => export.exports_to(module),
                    None => !export.is_qualified(),
                }
        })
    }

    /// Returns true if `package` is reflectively visible to `to_module`.
    #[must_use]
    pub fn opens_package(&self, package: &str, to_module: Option<&str>) -> bool {
        if self.is_open() {
            return self.packages.contains(package);
        }
        self.opens.iter().any(|open| {
            open.package == package
                && match to_module {
                    Some(module) => open.opens_to(module),
                    None => !open.is_qualified(),
                }
        })
    }
}

impl fmt::Display for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_open() {
            write!(f, "open ")?;
        }
        write!(f, "module {}", self.name)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}

/// Builds a [`ModuleDescriptor`], enforcing the invariants of spec §3.
#[derive(Debug, Default)]
pub struct ModuleDescriptorBuilder {
    name: String,
    flags: ModuleFlags,
    version: Option<Version>,
    requires: Vec<Requires>,
    exports: Vec<Exports>,
    opens: Vec<Opens>,
    uses: BTreeSet<String>,
    provides: Vec<Provides>,
    packages: BTreeSet<String>,
    main_class: Option<String>,
    os_name: Option<String>,
    os_arch: Option<String>,
    os_version: Option<String>,
    hashes: Option<ModuleHashes>,
}

impl ModuleDescriptorBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// Sets the module's modifiers.
    #[must_use]
    pub fn flags(mut self, flags: ModuleFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the module's version.
    #[must_use]
    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Declares the full package set up front (exports/opens/provides are
    /// validated against this set at [`Self::build`] time).
    #[must_use]
    pub fn packages(mut self, packages: BTreeSet<String>) -> Self {
        self.packages = packages;
        self
    }

    /// Adds one package.
    #[must_use]
    pub fn add_package(mut self, package: impl Into<String>) -> Self {
        self.packages.insert(package.into());
        self
    }

    /// Adds a `requires` directive.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::IllegalName`] if `self` already requires
    /// `name`, and the error shape `requires-names unique` invariant from
    /// spec §3.
    pub fn require(
        mut self,
        name: impl Into<String>,
        flags: RequiresFlags,
        compiled_version: Option<String>,
    ) -> Result<Self> {
        let name = name.into();
        if name == self.name {
            return Err(DescriptorError::IllegalName {
                kind: "requires (self-dependency)",
                value: name,
            });
        }
        if self.requires.iter().any(|r| r.name == name) {
            return Err(DescriptorError::IllegalName {
                kind: "requires (duplicate)",
                value: name,
            });
        }
        self.requires.push(Requires {
            name,
            flags,
            compiled_version,
        });
        Ok(self)
    }

    /// Adds an `exports` directive.
    #[must_use]
    pub fn export(
        mut self,
        package: impl Into<String>,
        targets: Option<BTreeSet<String>>,
        flags: ExportsFlags,
    ) -> Self {
        self.exports.push(Exports {
            package: package.into(),
            targets,
            flags,
        });
        self
    }

    /// Adds an `opens` directive.
    #[must_use]
    pub fn open(
        mut self,
        package: impl Into<String>,
        targets: Option<BTreeSet<String>>,
        flags: OpensFlags,
    ) -> Self {
        self.opens.push(Opens {
            package: package.into(),
            targets,
            flags,
        });
        self
    }

    /// Adds a `uses` directive.
    #[must_use]
    pub fn use_service(mut self, service: impl Into<String>) -> Self {
        self.uses.insert(service.into());
        self
    }

    /// Adds a `provides` directive.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::EmptyProvidesList`] if `providers` is empty.
    pub fn provide(mut self, service: impl Into<String>, providers: Vec<String>) -> Result<Self> {
        let service = service.into();
        if providers.is_empty() {
            return Err(DescriptorError::EmptyProvidesList(service));
        }
        self.provides.push(Provides { service, providers });
        Ok(self)
    }

    /// Sets the module's main class.
    #[must_use]
    pub fn main_class(mut self, main_class: impl Into<String>) -> Self {
        self.main_class = Some(main_class.into());
        self
    }

    /// Sets the module's recorded per-dependency hash table.
    #[must_use]
    pub fn hashes(mut self, algorithm: impl Into<String>, entries: BTreeMap<String, Vec<u8>>) -> Self {
        self.hashes = Some(ModuleHashes {
            algorithm: algorithm.into(),
            entries,
        });
        self
    }

    /// Sets OS/arch/version constraints.
    #[must_use]
    pub fn target_platform(
        mut self,
        os_name: Option<String>,
        os_arch: Option<String>,
        os_version: Option<String>,
    ) -> Self {
        self.os_name = os_name;
        self.os_arch = os_arch;
        self.os_version = os_version;
        self
    }

    /// Validates and produces the final, immutable descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::IllegalName`] if the module name is empty,
    /// if an exported/opened package is not in `packages`, if a provider's
    /// package is not in `packages`, or if an automatic module declared
    /// anything beyond its name and version.
    pub fn build(mut self) -> Result<ModuleDescriptor> {
        if self.name.is_empty() {
            return Err(DescriptorError::IllegalName {
                kind: "module",
                value: self.name,
            });
        }

        if self.flags.contains(ModuleFlags::AUTOMATIC) {
            if !self.requires.is_empty() && !is_only_implicit_base(&self.requires) {
                return Err(DescriptorError::IllegalAutomaticDeclaration("requires"));
            }
            if !self.exports.is_empty() {
                return Err(DescriptorError::IllegalAutomaticDeclaration("exports"));
            }
            if !self.opens.is_empty() {
                return Err(DescriptorError::IllegalAutomaticDeclaration("opens"));
            }
            if !self.uses.is_empty() {
                return Err(DescriptorError::IllegalAutomaticDeclaration("uses"));
            }
            // `provides` is deliberately allowed: automatic modules derive
            // service bindings from `META-INF/services/*` (spec §4.2).
        }

        for export in &self.exports {
            if !self.packages.contains(&export.package) {
                return Err(DescriptorError::IllegalName {
                    kind: "exported package (not in module)",
                    value: export.package.clone(),
                });
            }
        }
        for open in &self.opens {
            if !self.packages.contains(&open.package) {
                return Err(DescriptorError::IllegalName {
                    kind: "opened package (not in module)",
                    value: open.package.clone(),
                });
            }
        }
        for provides in &self.provides {
            for provider in &provides.providers {
                let package = package_of(provider);
                if !self.packages.contains(&package) {
                    return Err(DescriptorError::IllegalName {
                        kind: "provider class package (not in module)",
                        value: provider.clone(),
                    });
                }
            }
        }

        if self.name != BASE_MODULE && !self.requires.iter().any(|r| r.name == BASE_MODULE) {
            self.requires.push(Requires {
                name: BASE_MODULE.to_string(),
                flags: RequiresFlags::MANDATED,
                compiled_version: None,
            });
        }

        Ok(ModuleDescriptor {
            name: self.name,
            flags: self.flags,
            version: self.version,
            requires: self.requires,
            exports: self.exports,
            opens: self.opens,
            uses: self.uses,
            provides: self.provides,
            packages: self.packages,
            main_class: self.main_class,
            os_name: self.os_name,
            os_arch: self.os_arch,
            os_version: self.os_version,
            hashes: self.hashes,
        })
    }
}

fn is_only_implicit_base(requires: &[Requires]) -> bool {
    requires
        .iter()
        .all(|r| r.name == BASE_MODULE && r.is_mandated())
}

/// Derives the dotted-path package name of a fully-qualified class name.
#[must_use]
pub fn package_of(class_name: &str) -> String {
    match class_name.rfind('.') {
        Some(idx) => class_name[..idx].to_string(),
        None => String::new(),
    }
}

/// Validates an identifier against the module/package naming rules: each
/// `.`-separated component must be non-empty and start with an alphabetic
/// character, `_` or `$`, with remaining characters alphanumeric, `_` or `$`.
///
/// # Errors
///
/// Returns [`DescriptorError::IllegalName`] if a rule is violated.
pub fn validate_name(kind: &'static str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DescriptorError::IllegalName {
            kind,
            value: name.to_string(),
        });
    }
    for part in name.split('.') {
        let mut chars = part.chars();
        let Some(first) = chars.next() else {
            return Err(DescriptorError::IllegalName {
                kind,
                value: name.to_string(),
            });
        };
        if !first.is_alphabetic() && first != '_' && first != '$' {
            return Err(DescriptorError::IllegalName {
                kind,
                value: name.to_string(),
            });
        }
        for c in chars {
            if !c.is_alphanumeric() && c != '_' && c != '$' {
                return Err(DescriptorError::IllegalName {
                    kind,
                    value: name.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_module_requires_nothing_implicit() {
        let descriptor = ModuleDescriptor::builder(BASE_MODULE).build().expect("builds");
        assert!(descriptor.requires().is_empty());
    }

    #[test]
    fn non_base_module_gets_implicit_requires() {
        let descriptor = ModuleDescriptor::builder("com.example.app")
            .build()
            .expect("builds");
        assert!(descriptor.requires_module(BASE_MODULE));
        assert!(descriptor.requires()[0].is_mandated());
    }

    #[test]
    fn rejects_self_requires() {
        let result = ModuleDescriptor::builder("a").require("a", RequiresFlags::empty(), None);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_duplicate_requires() {
        let result = ModuleDescriptor::builder("a")
            .require("b", RequiresFlags::empty(), None)
            .expect("ok")
            .require("b", RequiresFlags::empty(), None);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_export_of_package_not_in_module() {
        let result = ModuleDescriptor::builder("a")
            .export("a.internal", None, ExportsFlags::empty())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_provider_class_outside_module_packages() {
        let result = ModuleDescriptor::builder("a")
            .use_service("svc.Service")
            .provide("svc.Service", vec!["other.pkg.Impl".to_string()])
            .expect("provide accepted pre-validation")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn automatic_module_rejects_explicit_exports() {
        let result = ModuleDescriptor::builder("auto")
            .flags(ModuleFlags::AUTOMATIC)
            .add_package("auto")
            .export("auto", None, ExportsFlags::empty())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_provides_list() {
        let result = ModuleDescriptor::builder("a").provide("svc.Service", vec![]);
        assert!(result.is_err());
    }
}
