//! The artifact finder: scans an ordered sequence of search roots for
//! modules (spec §4.2).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{FinderError, Result};
use crate::reference::ModuleReference;
use crate::scan::{list_candidates, read_candidate};

#[derive(Debug)]
struct ScanState {
    next_root: usize,
    found: HashMap<String, ModuleReference>,
}

/// Locates modules across a fixed, ordered list of search roots.
///
/// Each root is scanned at most once, the first time it is needed to
/// satisfy a [`ArtifactFinder::find`] or [`ArtifactFinder::find_all`] call.
/// A name that appears twice within one root is fatal; a name that
/// reappears in a later root is silently shadowed by the earlier one.
#[derive(Debug)]
pub struct ArtifactFinder {
    roots: Vec<PathBuf>,
    state: Mutex<ScanState>,
}

impl ArtifactFinder {
    /// Creates a finder over `roots`, in search order.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            state: Mutex::new(ScanState {
                next_root: 0,
                found: HashMap::new(),
            }),
        }
    }

    /// Scans roots lazily until `name` is found or every root has been
    /// scanned.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::DuplicateModuleInRoot`] if a root scanned
    /// along the way contains two candidates with the same name, or any
    /// I/O or descriptor error encountered while reading a candidate.
    pub fn find(&self, name: &str) -> Result<Option<ModuleReference>> {
        let mut state = self.state.lock().expect("finder state lock poisoned");
        while !state.found.contains_key(name) && state.next_root < self.roots.len() {
            self.scan_next_root(&mut state)?;
        }
        Ok(state.found.get(name).cloned())
    }

    /// Forces a full scan of every remaining root and returns every module
    /// found so far, including from already-scanned roots.
    ///
    /// # Errors
    ///
    /// Same as [`ArtifactFinder::find`].
    pub fn find_all(&self) -> Result<Vec<ModuleReference>> {
        let mut state = self.state.lock().expect("finder state lock poisoned");
        while state.next_root < self.roots.len() {
            self.scan_next_root(&mut state)?;
        }
        Ok(state.found.values().cloned().collect())
    }

    fn scan_next_root(&self, state: &mut ScanState) -> Result<()> {
        let root = &self.roots[state.next_root];
        state.next_root += 1;

        let candidates = list_candidates(root)?;
        let mut seen_in_root: HashMap<String, ()> = HashMap::new();
        for candidate in candidates {
            let Some(reference) = read_candidate(&candidate)? else {
                continue;
            };
            let name = reference.name().to_string();
            if seen_in_root.insert(name.clone(), ()).is_some() {
                return Err(FinderError::DuplicateModuleInRoot {
                    name,
                    root: root.clone(),
                });
            }
            // Earlier roots shadow later ones: only insert if not already
            // present from a prior root's scan.
            state.found.entry(name).or_insert(reference);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_descriptor::ModuleDescriptor;
    use std::fs;

    fn write_exploded_module(dir: &std::path::Path, name: &str) {
        fs::create_dir_all(dir).expect("create dir");
        let descriptor = ModuleDescriptor::builder(name)
            .add_package(name)
            .build()
            .expect("builds");
        let bytes = modlink_descriptor::encode(&descriptor).expect("encodes");
        fs::write(dir.join("module-info.class"), bytes).expect("write module-info");
    }

    #[test]
    fn finds_exploded_module_by_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let module_dir = temp.path().join("com.example.app");
        write_exploded_module(&module_dir, "com.example.app");

        let finder = ArtifactFinder::new(vec![temp.path().to_path_buf()]);
        let found = finder
            .find("com.example.app")
            .expect("scan succeeds")
            .expect("module present");
        assert_eq!(found.name(), "com.example.app");
    }

    #[test]
    fn later_root_is_shadowed() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");
        write_exploded_module(&first.path().join("m"), "m");
        write_exploded_module(&second.path().join("m"), "m");

        let finder = ArtifactFinder::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        let all = finder.find_all().expect("scan succeeds");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].location(), &first.path().join("m"));
    }

    #[test]
    fn duplicate_in_same_root_is_fatal() {
        let root = tempfile::tempdir().expect("tempdir");
        write_exploded_module(&root.path().join("a"), "m");
        write_exploded_module(&root.path().join("b"), "m");

        let finder = ArtifactFinder::new(vec![root.path().to_path_buf()]);
        let result = finder.find_all();
        assert!(matches!(
            result,
            Err(FinderError::DuplicateModuleInRoot { .. })
        ));
    }

    #[test]
    fn missing_root_entry_returns_none() {
        let root = tempfile::tempdir().expect("tempdir");
        let finder = ArtifactFinder::new(vec![root.path().to_path_buf()]);
        assert!(finder.find("nothing.here").expect("scan succeeds").is_none());
    }
}
