//! Post-graph invariant checks (spec §4.3.2).

use modlink_descriptor::ModuleDescriptor;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::resolution::Resolution;

/// Runs every §4.3.2 check against an already-built readability graph.
///
/// # Errors
///
/// Returns [`Error::SplitPackage`] or [`Error::IllegalName`] (reused here
/// for a self-duplicate, since it is the same "this name is not usable"
/// shape) on the first violation found, in module-name order for
/// determinism.
pub fn run(
    selected: &BTreeMap<String, Arc<ModuleDescriptor>>,
    reads: &BTreeMap<String, BTreeSet<String>>,
    parent: Option<&Resolution>,
) -> Result<()> {
    check_single_supplier(selected, reads)?;
    check_no_self_duplicates(selected, reads)?;
    check_exports_sanity(selected, parent)?;
    Ok(())
}

fn check_single_supplier(
    selected: &BTreeMap<String, Arc<ModuleDescriptor>>,
    reads: &BTreeMap<String, BTreeSet<String>>,
) -> Result<()> {
    for (consumer, targets) in reads {
        let mut supplier_of: BTreeMap<String, String> = BTreeMap::new();
        for target in targets {
            let Some(descriptor) = selected.get(target) else {
                continue;
            };
            for export in descriptor.exports() {
                if !export.exports_to(consumer) {
                    continue;
                }
                if let Some(existing) = supplier_of.get(&export.package) {
                    if existing != target {
                        return Err(Error::SplitPackage {
                            package: export.package.clone(),
                            consumer: consumer.clone(),
                            a: existing.clone(),
                            b: target.clone(),
                        });
                    }
                } else {
                    supplier_of.insert(export.package.clone(), target.clone());
                }
            }
        }
    }
    Ok(())
}

fn check_no_self_duplicates(
    selected: &BTreeMap<String, Arc<ModuleDescriptor>>,
    reads: &BTreeMap<String, BTreeSet<String>>,
) -> Result<()> {
    for (consumer, targets) in reads {
        let Some(own_descriptor) = selected.get(consumer) else {
            continue;
        };
        for target in targets {
            let Some(descriptor) = selected.get(target) else {
                continue;
            };
            for export in descriptor.exports() {
                if export.exports_to(consumer) && own_descriptor.packages().contains(&export.package) {
                    return Err(Error::SplitPackage {
                        package: export.package.clone(),
                        consumer: consumer.clone(),
                        a: consumer.clone(),
                        b: target.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_exports_sanity(
    selected: &BTreeMap<String, Arc<ModuleDescriptor>>,
    parent: Option<&Resolution>,
) -> Result<()> {
    for (name, descriptor) in selected {
        for export in descriptor.exports() {
            let Some(targets) = &export.targets else {
                continue;
            };
            for target in targets {
                let exists = selected.contains_key(target)
                    || parent.is_some_and(|p| p.contains(target));
                if !exists {
                    return Err(Error::IllegalName {
                        kind: "qualified export target",
                        value: format!("{name}/{} -> {target}", export.package),
                    });
                }
            }
        }
        for open in descriptor.opens() {
            let Some(targets) = &open.targets else {
                continue;
            };
            for target in targets {
                let exists = selected.contains_key(target)
                    || parent.is_some_and(|p| p.contains(target));
                if !exists {
                    return Err(Error::IllegalName {
                        kind: "qualified open target",
                        value: format!("{name}/{} -> {target}", open.package),
                    });
                }
            }
        }
    }
    Ok(())
}
