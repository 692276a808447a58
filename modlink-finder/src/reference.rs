//! A located module: its descriptor plus where it came from.

use modlink_descriptor::ModuleDescriptor;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;

/// Where a [`ModuleReference`] was discovered.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ModuleOrigin {
    /// A `.jmod` packaged artifact.
    Packaged,
    /// A `.jar` application artifact carrying a `module-info`.
    Application,
    /// An exploded module directory.
    Exploded,
    /// A synthesized automatic module derived from a plain archive.
    Automatic,
}

/// Streams a module's backing bytes through a content digest on demand.
///
/// Constructing a [`ModuleReference`] never reads archive bytes for hashing;
/// the supplier is invoked only when a dependent resolver step needs the
/// digest, per the lazy hash-verification note in the data model.
pub trait HashSupplier: Send + Sync {
    /// Computes the SHA-256 digest of the module's backing bytes.
    fn hash(&self) -> Result<[u8; 32]>;
}

/// A reference to a located module: its descriptor, its origin, and where
/// it lives on disk.
#[derive(Clone)]
pub struct ModuleReference {
    descriptor: Arc<ModuleDescriptor>,
    origin: ModuleOrigin,
    location: PathBuf,
    hash_supplier: Option<Arc<dyn HashSupplier>>,
}

impl ModuleReference {
    /// Creates a new module reference.
    #[must_use]
    pub fn new(
        descriptor: ModuleDescriptor,
        origin: ModuleOrigin,
        location: PathBuf,
        hash_supplier: Option<Arc<dyn HashSupplier>>,
    ) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            origin,
            location,
            hash_supplier,
        }
    }

    /// The module's descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    /// The module's name, per its descriptor.
    #[must_use]
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Where this module was found.
    #[must_use]
    pub fn origin(&self) -> &ModuleOrigin {
        &self.origin
    }

    /// The backing archive or directory path.
    #[must_use]
    pub fn location(&self) -> &PathBuf {
        &self.location
    }

    /// Computes the module's content hash, if a supplier was recorded.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying [`HashSupplier`] returns.
    pub fn content_hash(&self) -> Option<Result<[u8; 32]>> {
        self.hash_supplier.as_ref().map(|supplier| supplier.hash())
    }
}

impl fmt::Debug for ModuleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleReference")
            .field("name", &self.name())
            .field("origin", &self.origin)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ModuleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.descriptor, self.location.display())
    }
}

impl PartialEq for ModuleReference {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name() && self.origin == other.origin
    }
}

impl Eq for ModuleReference {}
