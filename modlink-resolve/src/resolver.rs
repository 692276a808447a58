//! Root resolution and service binding (spec §4.3).

use modlink_descriptor::ModuleDescriptor;
use modlink_finder::{ArtifactFinder, ModuleReference};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use crate::checks;
use crate::error::{Error, Result};
use crate::graph;
use crate::resolution::Resolution;
use crate::sort;

/// A source of modules a [`Resolver`] can consult while expanding a root
/// set: either a before/after finder, or a test double.
pub trait ModuleLookup: Send + Sync {
    /// Looks up a module by name.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying search mechanism returns.
    fn find(&self, name: &str) -> Result<Option<ModuleReference>>;

    /// Returns every module this source can find, used only by
    /// [`Resolver::bind`] to build the service-provider index.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying search mechanism returns.
    fn find_all(&self) -> Result<Vec<ModuleReference>>;
}

impl ModuleLookup for ArtifactFinder {
    fn find(&self, name: &str) -> Result<Option<ModuleReference>> {
        Ok(ArtifactFinder::find(self, name)?)
    }

    fn find_all(&self) -> Result<Vec<ModuleReference>> {
        Ok(ArtifactFinder::find_all(self)?)
    }
}

/// Resolves a root module set into a [`Resolution`], applying the CLI-level
/// overrides of spec §11 (`--add-reads`, `--add-exports`, `--add-opens`,
/// `--limit-modules`).
#[derive(Debug, Default)]
pub struct Resolver {
    add_reads: BTreeMap<String, BTreeSet<String>>,
    add_exports: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    add_opens: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    limit_modules: Option<BTreeSet<String>>,
}

impl Resolver {
    /// An empty resolver: no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `source` an additional, unconditional read of `target` beyond
    /// what the readability graph would otherwise compute.
    #[must_use]
    pub fn add_reads(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.add_reads
            .entry(source.into())
            .or_default()
            .insert(target.into());
        self
    }

    /// Grants `target` visibility of `package` in `module` beyond its
    /// declared exports.
    #[must_use]
    pub fn add_exports(
        mut self,
        module: impl Into<String>,
        package: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.add_exports
            .entry(module.into())
            .or_default()
            .entry(package.into())
            .or_default()
            .insert(target.into());
        self
    }

    /// Grants `target` reflective access to `package` in `module` beyond
    /// its declared opens.
    #[must_use]
    pub fn add_opens(
        mut self,
        module: impl Into<String>,
        package: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.add_opens
            .entry(module.into())
            .or_default()
            .entry(package.into())
            .or_default()
            .insert(target.into());
        self
    }

    /// Restricts the observable module universe to `names`; a `requires`
    /// reaching outside this set is [`Error::ModuleNotFound`], the same as
    /// if the dependency didn't exist. Callers that want `--limit-modules`'
    /// "and everything it transitively requires" semantics should resolve
    /// the named roots first and pass in the closure this call returns.
    #[must_use]
    pub fn limit_modules(mut self, names: BTreeSet<String>) -> Self {
        self.limit_modules = Some(names);
        self
    }

    /// Resolves `roots` against `before`, falling back to `parent`'s
    /// already-selected modules, then to `after` (spec §4.3 steps 1-6).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModuleNotFound`] for a missing root or `requires`
    /// target, [`Error::Cycle`] for a cyclic requires graph,
    /// [`Error::HashMismatch`] for a recorded dependency hash that doesn't
    /// match the dependency's actual content, or one of the §4.3.2 checks'
    /// errors.
    pub fn resolve(
        &self,
        before: &dyn ModuleLookup,
        parent: Option<&Resolution>,
        after: &dyn ModuleLookup,
        roots: &[String],
    ) -> Result<Resolution> {
        let mut selected: BTreeMap<String, Arc<ModuleDescriptor>> = BTreeMap::new();
        let mut refs: BTreeMap<String, ModuleReference> = BTreeMap::new();
        let mut queue: VecDeque<(String, Option<String>)> =
            roots.iter().map(|r| (r.clone(), None)).collect();

        while let Some((name, required_by)) = queue.pop_front() {
            if selected.contains_key(&name) || parent.is_some_and(|p| p.contains(&name)) {
                continue;
            }
            if !self.is_observable(&name) {
                return Err(Error::ModuleNotFound { name, required_by });
            }
            let Some(reference) = lookup(before, parent, after, &name)? else {
                return Err(Error::ModuleNotFound { name, required_by });
            };
            let descriptor = Arc::new(reference.descriptor().clone());
            for requires in descriptor.requires() {
                queue.push_back((requires.name.clone(), Some(name.clone())));
            }
            selected.insert(name.clone(), descriptor);
            refs.insert(name, reference);
        }

        let requires_edges: BTreeMap<String, BTreeSet<String>> = selected
            .iter()
            .map(|(name, descriptor)| {
                let targets = descriptor
                    .requires()
                    .iter()
                    .filter(|r| selected.contains_key(&r.name))
                    .map(|r| r.name.clone())
                    .collect();
                (name.clone(), targets)
            })
            .collect();
        let order: Vec<String> = selected.keys().cloned().collect();
        sort::detect_cycle(&order, &requires_edges)?;

        verify_hashes(&selected, &refs)?;

        let mut reads = graph::build_reads(&selected, parent);
        for (source, targets) in &self.add_reads {
            if selected.contains_key(source) {
                reads.entry(source.clone()).or_default().extend(targets.iter().cloned());
            }
        }

        checks::run(&selected, &reads, parent)?;

        Ok(Resolution::new(selected, refs, reads, BTreeMap::new())
            .with_extras(self.add_exports.clone(), self.add_opens.clone()))
    }

    /// Returns true if `--limit-modules` was not given, or names `name`.
    fn is_observable(&self, name: &str) -> bool {
        self.limit_modules
            .as_ref()
            .is_none_or(|limit| limit.contains(name))
    }

    /// Performs iterative service binding on top of an already-resolved
    /// [`Resolution`] (spec §4.3, service binding): discovers providers for
    /// every `uses` clause reachable from the selected modules, resolves
    /// them in, and repeats until a fixpoint is reached.
    ///
    /// # Errors
    ///
    /// Same as [`Resolver::resolve`].
    pub fn bind(
        &self,
        resolution: Resolution,
        before: &dyn ModuleLookup,
        after: &dyn ModuleLookup,
        parent: Option<&Resolution>,
    ) -> Result<Resolution> {
        let universe = service_index(before, after)?;

        let PartialResolution {
            mut selected,
            mut refs,
        } = resolution.into_parts();

        loop {
            let consumers: BTreeSet<String> = selected
                .keys()
                .cloned()
                .chain(parent.into_iter().flat_map(|p| p.selected().keys().cloned()))
                .collect();
            let used_services: BTreeSet<String> = consumers
                .iter()
                .filter_map(|name| selected.get(name).or_else(|| parent.and_then(|p| p.selected().get(name))))
                .flat_map(|descriptor| descriptor.uses().iter().cloned())
                .collect();

            let mut added = false;
            for service in &used_services {
                let Some(providers) = universe.get(service) else {
                    continue;
                };
                for provider in providers {
                    let name = provider.name().to_string();
                    if selected.contains_key(&name) || parent.is_some_and(|p| p.contains(&name)) {
                        continue;
                    }
                    selected.insert(name.clone(), Arc::new(provider.descriptor().clone()));
                    refs.insert(name, provider.clone());
                    added = true;
                }
            }
            if !added {
                break;
            }

            // A newly-added provider may itself require modules not yet
            // selected; pull those in the same way `resolve` does.
            let mut queue: VecDeque<(String, Option<String>)> = selected
                .iter()
                .flat_map(|(name, descriptor)| {
                    descriptor
                        .requires()
                        .iter()
                        .map(move |r| (r.name.clone(), Some(name.clone())))
                })
                .collect();
            while let Some((name, required_by)) = queue.pop_front() {
                if selected.contains_key(&name) || parent.is_some_and(|p| p.contains(&name)) {
                    continue;
                }
                let Some(reference) = lookup(before, parent, after, &name)? else {
                    return Err(Error::ModuleNotFound { name, required_by });
                };
                let descriptor = Arc::new(reference.descriptor().clone());
                for requires in descriptor.requires() {
                    queue.push_back((requires.name.clone(), Some(name.clone())));
                }
                selected.insert(name.clone(), descriptor);
                refs.insert(name, reference);
            }
        }

        let requires_edges: BTreeMap<String, BTreeSet<String>> = selected
            .iter()
            .map(|(name, descriptor)| {
                let targets = descriptor
                    .requires()
                    .iter()
                    .filter(|r| selected.contains_key(&r.name))
                    .map(|r| r.name.clone())
                    .collect();
                (name.clone(), targets)
            })
            .collect();
        let order: Vec<String> = selected.keys().cloned().collect();
        sort::detect_cycle(&order, &requires_edges)?;
        verify_hashes(&selected, &refs)?;

        let mut reads = graph::build_reads(&selected, parent);
        for (source, targets) in &self.add_reads {
            if selected.contains_key(source) {
                reads.entry(source.clone()).or_default().extend(targets.iter().cloned());
            }
        }
        checks::run(&selected, &reads, parent)?;

        let mut providers: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (name, descriptor) in &selected {
            for provides in descriptor.provides() {
                providers
                    .entry(provides.service.clone())
                    .or_default()
                    .insert(name.clone());
            }
        }

        Ok(Resolution::new(selected, refs, reads, providers)
            .with_extras(self.add_exports.clone(), self.add_opens.clone()))
    }
}

/// Looks up `name` in `before`, then in `parent`'s own references, then in
/// `after` (spec §4.2's "before, parent layer, after" precedence).
fn lookup(
    before: &dyn ModuleLookup,
    parent: Option<&Resolution>,
    after: &dyn ModuleLookup,
    name: &str,
) -> Result<Option<ModuleReference>> {
    if let Some(found) = before.find(name)? {
        return Ok(Some(found));
    }
    if let Some(parent) = parent {
        if let Some(found) = parent.reference(name) {
            return Ok(Some(found.clone()));
        }
    }
    after.find(name)
}

/// Builds a service name -> provider references index over every module
/// either finder can find, used only to discover *new* providers during
/// [`Resolver::bind`]; already-selected modules are filtered out by the
/// caller before a provider is added.
fn service_index(
    before: &dyn ModuleLookup,
    after: &dyn ModuleLookup,
) -> Result<BTreeMap<String, Vec<ModuleReference>>> {
    let mut index: BTreeMap<String, Vec<ModuleReference>> = BTreeMap::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for reference in before.find_all()?.into_iter().chain(after.find_all()?) {
        if !seen.insert(reference.name().to_string()) {
            continue;
        }
        for provides in reference.descriptor().provides() {
            index
                .entry(provides.service.clone())
                .or_default()
                .push(reference.clone());
        }
    }
    Ok(index)
}

/// The algorithm [`modlink_finder::hash::FileHashSupplier`] actually
/// computes; a `Hashes` table recorded under any other name has nothing in
/// this workspace to recompute it with, so it is left unverified rather
/// than rejected outright.
const SUPPORTED_HASH_ALGORITHM: &str = "SHA-256";

/// Recomputes the content hash of every selected module's dependencies
/// that carry a recorded hash and compares it against the actual bytes
/// (spec §4.3 step 4).
///
/// # Errors
///
/// Returns [`Error::HashMismatch`] if a recomputed digest disagrees with the
/// one recorded in the dependent module's `Hashes` table.
fn verify_hashes(
    selected: &BTreeMap<String, Arc<ModuleDescriptor>>,
    refs: &BTreeMap<String, ModuleReference>,
) -> Result<()> {
    for descriptor in selected.values() {
        let Some(hashes) = descriptor.hashes() else {
            continue;
        };
        if hashes.algorithm != SUPPORTED_HASH_ALGORITHM {
            continue;
        }
        for (dependency, expected) in &hashes.entries {
            let Some(reference) = refs.get(dependency) else {
                continue;
            };
            let Some(actual) = reference.content_hash() else {
                continue;
            };
            let actual = actual?;
            if actual.as_slice() != expected.as_slice() {
                return Err(Error::HashMismatch {
                    dependency: dependency.clone(),
                    expected: hex(expected),
                    actual: hex(&actual),
                });
            }
        }
    }
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl Resolution {
    fn into_parts(
        self,
    ) -> PartialResolution {
        PartialResolution {
            selected: self.selected().clone(),
            refs: self.refs().clone(),
        }
    }
}

struct PartialResolution {
    selected: BTreeMap<String, Arc<ModuleDescriptor>>,
    refs: BTreeMap<String, ModuleReference>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_descriptor::RequiresFlags;
    use modlink_finder::ModuleOrigin;
    use std::path::PathBuf;

    struct FixedLookup(BTreeMap<String, ModuleReference>);

    impl ModuleLookup for FixedLookup {
        fn find(&self, name: &str) -> Result<Option<ModuleReference>> {
            Ok(self.0.get(name).cloned())
        }

        fn find_all(&self) -> Result<Vec<ModuleReference>> {
            Ok(self.0.values().cloned().collect())
        }
    }

    fn reference(descriptor: ModuleDescriptor) -> ModuleReference {
        ModuleReference::new(
            descriptor,
            ModuleOrigin::Exploded,
            PathBuf::from("/virtual"),
            None,
        )
    }

    /// A lookup seeded with `descriptors` plus the implicit base module
    /// every non-base descriptor's builder requires.
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
    fn resolves_transitive_requires_closure() {
        let a = ModuleDescriptor::builder("a")
            .require("b", RequiresFlags::empty(), None)
            .expect("ok")
            .build()
            .expect("builds");
        let b = ModuleDescriptor::builder("b").build().expect("builds");

        let lookup = lookup_with(vec![a, b]);

        let resolution = Resolver::new()
            .resolve(&lookup, None, &lookup, &["a".to_string()])
            .expect("resolves");
        assert!(resolution.contains("a"));
        assert!(resolution.contains("b"));
        assert!(resolution.contains(modlink_descriptor::BASE_MODULE));
    }

    #[test]
    fn missing_root_is_fatal() {
        let lookup = lookup_with(vec![]);
        let result = Resolver::new().resolve(&lookup, None, &lookup, &["missing".to_string()]);
        assert!(matches!(result, Err(Error::ModuleNotFound { .. })));
    }

    #[test]
    fn limit_modules_excludes_unlisted_names() {
        let a = ModuleDescriptor::builder("a")
            .require("b", RequiresFlags::empty(), None)
            .expect("ok")
            .build()
            .expect("builds");
        let b = ModuleDescriptor::builder("b").build().expect("builds");
        let lookup = lookup_with(vec![a, b]);

        let limit: BTreeSet<String> = ["a".to_string(), modlink_descriptor::BASE_MODULE.to_string()]
            .into_iter()
            .collect();
        let result = Resolver::new()
            .limit_modules(limit)
            .resolve(&lookup, None, &lookup, &["a".to_string()]);
        assert!(matches!(result, Err(Error::ModuleNotFound { name, .. }) if name == "b"));
    }

    struct FixedHash([u8; 32]);

    impl modlink_finder::HashSupplier for FixedHash {
        fn hash(&self) -> modlink_finder::Result<[u8; 32]> {
            Ok(self.0)
        }
    }

    fn reference_with_hash(descriptor: ModuleDescriptor, digest: [u8; 32]) -> ModuleReference {
        ModuleReference::new(
            descriptor,
            ModuleOrigin::Exploded,
            PathBuf::from("/virtual"),
            Some(std::sync::Arc::new(FixedHash(digest))),
        )
    }

    #[test]
    fn a_matching_recorded_hash_is_accepted() {
        let digest = [7u8; 32];
        let b = ModuleDescriptor::builder("b").build().expect("builds");
        let mut hashes = BTreeMap::new();
        hashes.insert("b".to_string(), digest.to_vec());
        let a = ModuleDescriptor::builder("a")
            .require("b", RequiresFlags::empty(), None)
            .expect("ok")
            .hashes("SHA-256", hashes)
            .build()
            .expect("builds");

        let base = ModuleDescriptor::builder(modlink_descriptor::BASE_MODULE)
            .build()
            .expect("builds");
        let mut modules = BTreeMap::new();
        modules.insert(base.name().to_string(), reference(base));
        modules.insert("a".to_string(), reference(a));
        modules.insert("b".to_string(), reference_with_hash(b, digest));
        let lookup = FixedLookup(modules);

        let result = Resolver::new().resolve(&lookup, None, &lookup, &["a".to_string()]);
        assert!(result.is_ok());
    }

    #[test]
    fn a_mismatched_recorded_hash_is_rejected() {
        let b = ModuleDescriptor::builder("b").build().expect("builds");
        let mut hashes = BTreeMap::new();
        hashes.insert("b".to_string(), vec![1u8; 32]);
        let a = ModuleDescriptor::builder("a")
            .require("b", RequiresFlags::empty(), None)
            .expect("ok")
            .hashes("SHA-256", hashes)
            .build()
            .expect("builds");

        let base = ModuleDescriptor::builder(modlink_descriptor::BASE_MODULE)
            .build()
            .expect("builds");
        let mut modules = BTreeMap::new();
        modules.insert(base.name().to_string(), reference(base));
        modules.insert("a".to_string(), reference(a));
        modules.insert("b".to_string(), reference_with_hash(b, [2u8; 32]));
        let lookup = FixedLookup(modules);

        let result = Resolver::new().resolve(&lookup, None, &lookup, &["a".to_string()]);
        assert!(matches!(result, Err(Error::HashMismatch { dependency, .. }) if dependency == "b"));
    }
}
