//! Maps the core's error taxonomy (spec §7) plus argument-parsing failures
//! onto the CLI's four exit-code classes.

use std::fmt;

/// Everything the driver can fail with.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A `--add-reads`/`--add-exports`/`--add-opens` override didn't match
    /// its expected `SOURCE=TARGET` / `SOURCE/PACKAGE=TARGET` shape.
    #[error("malformed override `{0}`")]
    Usage(String),

    /// Failure from the core pipeline.
    #[error(transparent)]
    Core(#[from] modlink_resolve::Error),
}

/// The CLI's exit-code classes (spec §7: success / config / system / unknown).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExitClass {
    Success,
    Config,
    System,
    Unknown,
}

impl ExitClass {
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Config => 1,
            Self::System => 2,
            Self::Unknown => 3,
        }
    }
}

impl fmt::Display for ExitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::Config => "config",
            Self::System => "system",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Classifies `error` for the process exit code.
#[must_use]
pub fn classify(error: &CliError) -> ExitClass {
    use modlink_resolve::Error as E;
    match error {
        CliError::Usage(_) => ExitClass::Config,
        CliError::Core(E::ModuleNotFound { .. })
        | CliError::Core(E::Cycle { .. })
        | CliError::Core(E::SplitPackage { .. })
        | CliError::Core(E::DuplicatePackageInLoader { .. })
        | CliError::Core(E::HashMismatch { .. })
        | CliError::Core(E::IllegalName { .. })
        | CliError::Core(E::InvalidDescriptor(_))
        | CliError::Core(E::Finder(_)) => ExitClass::Config,
        CliError::Core(E::IoError { .. }) | CliError::Core(E::PluginError { .. }) | CliError::Core(E::ResourceConflict(_)) => {
            ExitClass::System
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_are_config_class() {
        let error = CliError::Usage("bad".to_string());
        assert_eq!(classify(&error).code(), 1);
    }

    #[test]
    fn io_errors_are_system_class() {
        let error = CliError::Core(modlink_resolve::Error::IoError {
            path: "x".to_string(),
            cause: "y".to_string(),
        });
        assert_eq!(classify(&error), ExitClass::System);
    }
}
