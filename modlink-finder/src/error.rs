//! Errors raised while scanning search roots for modules.

use std::path::{Path, PathBuf};

/// Result alias for this crate, defaulting the error type to [`FinderError`].
pub type Result<T, E = FinderError> = core::result::Result<T, E>;

/// Failures that can occur while locating modules on a search path.
#[derive(Debug, thiserror::Error)]
pub enum FinderError {
    /// Reading or seeking an archive or directory entry failed.
    #[error("io error at {path}: {cause}")]
    IoError {
        /// The path being read.
        path: PathBuf,
        /// The underlying cause.
        cause: String,
    },

    /// Two modules of the same name were found while scanning one root.
    #[error("duplicate module {name} found while scanning root {root}")]
    DuplicateModuleInRoot {
        /// The module name that collided.
        name: String,
        /// The root directory in which the collision occurred.
        root: PathBuf,
    },

    /// An application archive's filename did not yield a usable automatic
    /// module name.
    #[error("cannot derive an automatic module name from {0}")]
    InvalidAutomaticModuleName(String),

    /// Decoding a binary module declaration failed.
    #[error(transparent)]
    Descriptor(#[from] modlink_descriptor::DescriptorError),
}

impl FinderError {
    pub(crate) fn io(path: impl AsRef<Path>, cause: impl ToString) -> Self {
        Self::IoError {
            path: path.as_ref().to_path_buf(),
            cause: cause.to_string(),
        }
    }
}
