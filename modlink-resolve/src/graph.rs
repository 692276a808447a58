//! Readability graph construction (spec §4.3.1).

use modlink_descriptor::ModuleDescriptor;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::resolution::Resolution;

/// Builds the readability (`reads`) map for `selected`, seeded by any
/// parent layer's transitively-re-exported requires.
#[must_use]
pub fn build_reads(
    selected: &BTreeMap<String, Arc<ModuleDescriptor>>,
    parent: Option<&Resolution>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut reads: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut reexport: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for name in selected.keys() {
        reads.insert(name.clone(), BTreeSet::new());
    }

    // Pass 1: direct requires become direct reads. A module's reexport set
    // is the targets of its own TRANSITIVE requires.
    for (name, descriptor) in selected {
        let entry = reads.entry(name.clone()).or_default();
        for requires in descriptor.requires() {
            entry.insert(requires.name.clone());
            if requires.is_transitive() {
                reexport
                    .entry(name.clone())
                    .or_default()
                    .insert(requires.name.clone());
            }
        }
    }

    // Pass 2: seed reexport from every parent layer, walking up the chain.
    // Our `Resolution` doesn't retain a parent pointer itself; callers pass
    // the immediate parent, whose own `reads`/descriptor data already
    // reflects its own ancestors (a layer is immutable once assembled).
    if let Some(parent) = parent {
        for (name, descriptor) in parent.selected() {
            for requires in descriptor.requires() {
                if requires.is_transitive() {
                    reexport
                        .entry(name.clone())
                        .or_default()
                        .insert(requires.name.clone());
                }
            }
        }
    }

    // Automatic modules read every other selected module, plus every
    // non-shadowed module visible through the parent layer; their reexport
    // set equals their reads set.
    let parent_names: BTreeSet<String> = parent
        .map(|p| p.selected().keys().cloned().collect())
        .unwrap_or_default();
    for (name, descriptor) in selected {
        if descriptor.is_automatic() {
            let entry = reads.entry(name.clone()).or_default();
            for other in selected.keys() {
                if other != name {
                    entry.insert(other.clone());
                }
            }
            for other in &parent_names {
                entry.insert(other.clone());
            }
            reexport.insert(name.clone(), entry.clone());
        }
    }

    // Fixpoint propagation: for each edge m -> x, for each y in reexport[x],
    // add m -> y.
    loop {
        let mut changed = false;
        let names: Vec<String> = reads.keys().cloned().collect();
        for m in &names {
            let targets: Vec<String> = reads.get(m).into_iter().flatten().cloned().collect();
            for x in &targets {
                if let Some(reexported) = reexport.get(x) {
                    let entry = reads.entry(m.clone()).or_default();
                    for y in reexported {
                        if entry.insert(y.clone()) {
                            changed = true;
                        }
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }

    reads
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_descriptor::{ModuleDescriptor, RequiresFlags};

    fn descriptor(name: &str, requires: &[(&str, bool)]) -> ModuleDescriptor {
        let mut builder = ModuleDescriptor::builder(name);
        for (dep, transitive) in requires {
            let flags = if *transitive {
                RequiresFlags::TRANSITIVE
            } else {
                RequiresFlags::empty()
            };
            builder = builder.require(*dep, flags, None).expect("ok");
        }
        builder.build().expect("builds")
    }

    #[test]
    fn propagates_transitive_requires() {
        let mut selected = BTreeMap::new();
        selected.insert(
            "a".to_string(),
            Arc::new(descriptor("a", &[("b", true)])),
        );
        selected.insert(
            "b".to_string(),
            Arc::new(descriptor("b", &[("c", true)])),
        );
        selected.insert("c".to_string(), Arc::new(descriptor("c", &[])));

        let reads = build_reads(&selected, None);
        assert!(reads["a"].contains("b"));
        assert!(reads["a"].contains("c"));
        assert!(reads["b"].contains("c"));
    }

    #[test]
    fn transitive_requires_reaches_past_a_non_transitive_direct_reader() {
        let mut selected = BTreeMap::new();
        selected.insert(
            "a".to_string(),
            Arc::new(descriptor("a", &[("b", false)])),
        );
        selected.insert(
            "b".to_string(),
            Arc::new(descriptor("b", &[("c", true)])),
        );
        selected.insert("c".to_string(), Arc::new(descriptor("c", &[])));

        let reads = build_reads(&selected, None);
        assert!(reads["a"].contains("b"));
        assert!(reads["a"].contains("c"));
        assert!(reads["b"].contains("c"));
    }
}
