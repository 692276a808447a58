//! Errors raised while decoding or constructing module descriptors.

/// Result alias for this crate, defaulting the error type to [`DescriptorError`].
pub type Result<T, E = DescriptorError> = core::result::Result<T, E>;

/// Failures that can occur while parsing a binary module declaration or
/// while building a [`crate::ModuleDescriptor`] from parsed parts.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// The binary did not start with the expected descriptor magic.
    #[error("invalid descriptor: bad magic {0:#010x}")]
    BadMagic(u32),

    /// The major version is below the minimum this decoder accepts.
    #[error("invalid descriptor: major version {0} is below the supported threshold")]
    UnsupportedVersion(u16),

    /// The access flags did not mark this binary as a module declaration.
    #[error("invalid descriptor: ACC_MODULE flag not set")]
    NotAModule,

    /// `this_class` did not resolve to `<name>/module-info`.
    #[error("invalid descriptor: this_class does not name a module-info type: {0}")]
    IllegalThisClass(String),

    /// `super_class`, `interfaces`, `fields` or `methods` was non-zero.
    #[error("invalid descriptor: {0} count must be zero, found {1}")]
    NonZeroSection(&'static str, u16),

    /// An attribute of the same kind appeared more than once.
    #[error("invalid descriptor: duplicate {0} attribute")]
    DuplicateAttribute(&'static str),

    /// The input ended before a value that was declared in a length/count
    /// field could be read.
    #[error("invalid descriptor: truncated input while reading {0}")]
    Truncated(&'static str),

    /// A name failed the identifier rules (empty component, illegal
    /// character, etc).
    #[error("invalid {kind} name: {value}")]
    IllegalName {
        /// What kind of name failed validation (module, package, ...).
        kind: &'static str,
        /// The offending value.
        value: String,
    },

    /// A constant-pool index referenced a slot outside `1..cp_count`, or a
    /// slot of the wrong kind.
    #[error("invalid descriptor: bad constant pool index {index} ({reason})")]
    BadConstantPoolIndex {
        /// The offending index.
        index: u16,
        /// Why the index was rejected.
        reason: &'static str,
    },

    /// A non-`java.base` module declared no requires at all (the implicit
    /// `requires mandated java.base` is added by the builder, not present
    /// in the binary, so an otherwise-empty requires table is legal; this
    /// variant is reserved for builders that explicitly forbid it, e.g.
    /// automatic module synthesis gone wrong).
    #[error("invalid descriptor: required-table for {0} is unexpectedly empty")]
    EmptyRequiresTable(String),

    /// An automatic module builder was asked to declare something other
    /// than a name and version.
    #[error("automatic modules may not declare explicit {0}")]
    IllegalAutomaticDeclaration(&'static str),

    /// A `provides` directive named zero implementation classes.
    #[error("provides {0} declares no implementation classes")]
    EmptyProvidesList(String),
}
