//! Class-loader identity: which runtime loader each module is defined into.

/// A loader's stable identifier. This implementation doesn't model loader
/// instances (no bytecode to actually define); it models only the identity
/// used to group modules for the package-disjointness check (spec §4.4
/// step 1) and to scope each loader's service catalog (step 5).
pub type LoaderId = String;

/// Well-known loader ids mirroring the platform's bootstrap/platform/
/// application delegation chain.
pub const BOOT_LOADER: &str = "boot";
pub const PLATFORM_LOADER: &str = "platform";
pub const APPLICATION_LOADER: &str = "application";

/// Maps a module name to the loader it is defined into.
///
/// A layer built for a single application typically maps every module to
/// [`APPLICATION_LOADER`]; a layer that mirrors the platform's own
/// delegation model uses a lookup table or a name-based rule instead.
pub trait LoaderAssignment: Send + Sync {
    /// Returns the loader `module` is defined into.
    fn loader_for(&self, module: &str) -> LoaderId;
}

/// Assigns every module to the same loader.
#[derive(Clone, Debug)]
pub struct SingleLoader(LoaderId);

impl SingleLoader {
    /// Creates an assignment that maps every module to `loader`.
    #[must_use]
    pub fn new(loader: impl Into<LoaderId>) -> Self {
        Self(loader.into())
    }
}

impl LoaderAssignment for SingleLoader {
    fn loader_for(&self, _module: &str) -> LoaderId {
        self.0.clone()
    }
}

impl Default for SingleLoader {
    fn default() -> Self {
        Self::new(APPLICATION_LOADER)
    }
}
