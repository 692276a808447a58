//! Assembles a [`Resolution`](modlink_resolve::Resolution) into a layer: a
//! loader mapping plus the JPMS-style access checks that run against it.

pub mod access;
pub mod layer;
pub mod loader;

pub use access::{AccessCheck, AccessCheckResult, UNNAMED_MODULE};
pub use layer::ModuleLayer;
pub use loader::{LoaderAssignment, LoaderId, SingleLoader, APPLICATION_LOADER, BOOT_LOADER, PLATFORM_LOADER};
