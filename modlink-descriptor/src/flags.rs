//! Modifier bit sets for modules, requires, exports and opens directives.

use bitflags::bitflags;

bitflags! {
    /// Modifiers that can appear on a module declaration itself.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct ModuleFlags: u16 {
        /// The module is open: every package is implicitly opened to every
        /// module that reads it.
        const OPEN = 0x0020;
        /// The module was synthesized (e.g. derived from a plain archive).
        const AUTOMATIC = 0x0800;
        /// The module was not explicitly declared in the source binary.
        const SYNTHETIC = 0x1000;
        /// The module was implicitly declared by the platform.
        const MANDATED = 0x8000;
    }
}

bitflags! {
    /// Modifiers on a single `requires` directive.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct RequiresFlags: u16 {
        /// Re-export: modules that require this module also implicitly
        /// require the named dependency.
        const TRANSITIVE = 0x0020;
        /// Required only for the static (compile-time) phase.
        const STATIC = 0x0040;
        /// Not explicitly declared in the source binary.
        const SYNTHETIC = 0x1000;
        /// Implicitly declared by the platform.
        const MANDATED = 0x8000;
    }
}

bitflags! {
    /// Modifiers on a single `exports` directive.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct ExportsFlags: u16 {
        /// Not explicitly declared in the source binary.
        const SYNTHETIC = 0x1000;
        /// Implicitly declared by the platform.
        const MANDATED = 0x8000;
    }
}

bitflags! {
    /// Modifiers on a single `opens` directive.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct OpensFlags: u16 {
        /// Not explicitly declared in the source binary.
        const SYNTHETIC = 0x1000;
        /// Implicitly declared by the platform.
        const MANDATED = 0x8000;
    }
}
