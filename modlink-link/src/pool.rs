//! The resource pool: an insertion-ordered mapping keyed by resource path
//! (spec §4.5).

use indexmap::IndexMap;
use modlink_resolve::{Error, Result};
use std::sync::Arc;

/// The codec a [`Resource`]'s bytes are stored under, recorded in the image
/// writer's location table (spec §4.6).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Compressor {
    /// Bytes are stored verbatim.
    None,
    /// Bytes are DEFLATE-compressed; [`Resource::uncompressed_size`] holds
    /// the original length.
    Deflate,
}

impl Compressor {
    /// The wire id written to the image's location table.
    #[must_use]
    pub fn id(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Deflate => 1,
        }
    }
}

/// One entry in a [`ResourcePool`]: its owning module, full path, and bytes.
#[derive(Clone, Debug)]
pub struct Resource {
    module: String,
    path: String,
    bytes: Arc<[u8]>,
    compressor: Compressor,
    uncompressed_size: usize,
}

impl Resource {
    /// Creates an uncompressed resource owned by `module` at `sub_path`,
    /// addressed as `/module/sub_path`.
    #[must_use]
    pub fn new(module: impl Into<String>, sub_path: impl AsRef<str>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let module = module.into();
        let path = format!("/{module}/{}", sub_path.as_ref());
        let bytes = bytes.into();
        let uncompressed_size = bytes.len();
        Self {
            module,
            path,
            bytes,
            compressor: Compressor::None,
            uncompressed_size,
        }
    }

    /// Returns a copy of this resource with `bytes` recorded as the
    /// `compressor`-encoded form of `uncompressed_size` original bytes.
    #[must_use]
    pub fn with_compressed(&self, bytes: Arc<[u8]>, compressor: Compressor) -> Self {
        Self {
            module: self.module.clone(),
            path: self.path.clone(),
            bytes,
            compressor,
            uncompressed_size: self.bytes.len(),
        }
    }

    /// The codec this resource's bytes are stored under.
    #[must_use]
    pub fn compressor(&self) -> Compressor {
        self.compressor
    }

    /// The resource's original, uncompressed length.
    #[must_use]
    pub fn uncompressed_size(&self) -> usize {
        self.uncompressed_size
    }

    /// The module this resource belongs to.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The full pool-relative path, `/module/sub_path`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The resource's content bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// An insertion-ordered pool of [`Resource`]s, keyed by path.
///
/// Once [`ResourcePool::freeze`] is called, further writes are rejected;
/// the plugin pipeline passes each stage an immutable snapshot of the
/// previous stage's pool and collects a fresh, unfrozen pool as its output.
#[derive(Clone, Debug, Default)]
pub struct ResourcePool {
    entries: IndexMap<String, Resource>,
    frozen: bool,
}

impl ResourcePool {
    /// An empty, writable pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `resource`, failing if its path is already present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceConflict`] if the path exists, or if the
    /// pool is frozen.
    pub fn add(&mut self, resource: Resource) -> Result<()> {
        if self.frozen {
            return Err(Error::ResourceConflict(format!(
                "pool is frozen, cannot add {}",
                resource.path()
            )));
        }
        if self.entries.contains_key(resource.path()) {
            return Err(Error::ResourceConflict(resource.path().to_string()));
        }
        self.entries.insert(resource.path().to_string(), resource);
        Ok(())
    }

    /// Inserts `resource`, replacing any existing entry at the same path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceConflict`] if the pool is frozen.
    pub fn add_or_replace(&mut self, resource: Resource) -> Result<()> {
        if self.frozen {
            return Err(Error::ResourceConflict(format!(
                "pool is frozen, cannot replace {}",
                resource.path()
            )));
        }
        self.entries.insert(resource.path().to_string(), resource);
        Ok(())
    }

    /// Removes the entry at `path`, returning it if present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceConflict`] if the pool is frozen.
    pub fn forget(&mut self, path: &str) -> Result<Option<Resource>> {
        if self.frozen {
            return Err(Error::ResourceConflict(format!(
                "pool is frozen, cannot forget {path}"
            )));
        }
        Ok(self.entries.shift_remove(path))
    }

    /// Every entry, in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &Resource> {
        self.entries.values()
    }

    /// Every entry belonging to `module`, in insertion order.
    pub fn module_entries<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a Resource> {
        self.entries.values().filter(move |r| r.module() == module)
    }

    /// The entry at `path`, if present.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Resource> {
        self.entries.get(path)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the pool holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rejects all further writes to this pool.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Returns true if [`ResourcePool::freeze`] has been called.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_rejects_duplicate_paths() {
        let mut pool = ResourcePool::new();
        pool.add(Resource::new("m", "a.class", b"one".as_slice())).expect("adds");
        let result = pool.add(Resource::new("m", "a.class", b"two".as_slice()));
        assert!(matches!(result, Err(Error::ResourceConflict(_))));
    }

    #[test]
    fn add_or_replace_overwrites() {
        let mut pool = ResourcePool::new();
        pool.add(Resource::new("m", "a.class", b"one".as_slice())).expect("adds");
        pool.add_or_replace(Resource::new("m", "a.class", b"two".as_slice()))
            .expect("replaces");
        assert_eq!(pool.get("/m/a.class").expect("present").bytes(), b"two");
    }

    #[test]
    fn frozen_pool_rejects_writes() {
        let mut pool = ResourcePool::new();
        pool.freeze();
        let result = pool.add(Resource::new("m", "a.class", b"one".as_slice()));
        assert!(result.is_err());
    }

    #[test]
    fn entries_preserve_insertion_order() {
        let mut pool = ResourcePool::new();
        pool.add(Resource::new("m", "b.class", b"".as_slice())).expect("adds");
        pool.add(Resource::new("m", "a.class", b"".as_slice())).expect("adds");
        let paths: Vec<&str> = pool.entries().map(Resource::path).collect();
        assert_eq!(paths, vec!["/m/b.class", "/m/a.class"]);
    }
}
