//! The unified error taxonomy surfaced by the core resolver/linker pipeline.

/// Result alias for this crate, defaulting the error type to [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Every terminal failure the core pipeline can produce.
///
/// The resolver aggregates at most one error per run and surfaces it; every
/// variant here is fatal for the run that produced it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A binary module declaration was malformed or truncated.
    #[error(transparent)]
    InvalidDescriptor(#[from] modlink_descriptor::DescriptorError),

    /// Locating a module on a search path failed.
    #[error(transparent)]
    Finder(#[from] modlink_finder::FinderError),

    /// A root or a `requires` target could not be located by any finder.
    #[error("module not found: {name}{}", required_by.as_deref().map(|r| format!(" (required by {r})")).unwrap_or_default())]
    ModuleNotFound {
        /// The module name that could not be resolved.
        name: String,
        /// The module that named it in a `requires`, if any (`None` for a root).
        required_by: Option<String>,
    },

    /// A back edge was found on the requires-only subgraph.
    #[error("cyclic dependency: {}", .path.join(" -> "))]
    Cycle {
        /// The cycle, in encounter order, closing back on its first element.
        path: Vec<String>,
    },

    /// Two modules both export the same package to a third.
    #[error("package {package} is supplied to {consumer} by both {a} and {b}")]
    SplitPackage {
        /// The contested package.
        package: String,
        /// The module reading the conflicting exports.
        consumer: String,
        /// The first supplying module.
        a: String,
        /// The second supplying module.
        b: String,
    },

    /// Two modules in the same class loader declare the same package.
    #[error("package {package} is declared by both {a} and {b} in loader {loader}")]
    DuplicatePackageInLoader {
        /// The contested package.
        package: String,
        /// The loader both modules would be defined into.
        loader: String,
        /// The first module.
        a: String,
        /// The second module.
        b: String,
    },

    /// A recorded dependency hash did not match the dependency's actual
    /// content hash.
    #[error("hash mismatch for dependency {dependency}: expected {expected}, found {actual}")]
    HashMismatch {
        /// The dependency whose hash was recomputed.
        dependency: String,
        /// The hash recorded by the dependent module.
        expected: String,
        /// The hash actually computed from the dependency's bytes.
        actual: String,
    },

    /// An identifier violated the naming rules.
    #[error("invalid {kind} name: {value}")]
    IllegalName {
        /// What kind of name failed validation.
        kind: &'static str,
        /// The offending value.
        value: String,
    },

    /// A file-system or archive operation failed outside the finder (e.g.
    /// while reading a resource for the link pipeline).
    #[error("io error at {path}: {cause}")]
    IoError {
        /// The path being operated on.
        path: String,
        /// The underlying cause.
        cause: String,
    },

    /// A plugin stage in the link pipeline failed.
    #[error("plugin {plugin} failed: {cause}")]
    PluginError {
        /// The plugin's name.
        plugin: String,
        /// The underlying cause.
        cause: String,
    },

    /// Two writers produced the same resource-pool path.
    #[error("resource conflict at {0}")]
    ResourceConflict(String),
}
