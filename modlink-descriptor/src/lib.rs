//! Binary module declarations: the data model, wire codec, and version
//! grammar shared by every other crate in this workspace.

pub mod decode;
pub mod descriptor;
pub mod encode;
pub mod error;
pub mod flags;
pub mod pool;
pub mod version;

pub use decode::{decode, NoPackages, PackageFinder, MAGIC, MIN_MAJOR_VERSION};
pub use descriptor::{
    package_of, validate_name, Exports, ModuleDescriptor, ModuleDescriptorBuilder, ModuleHashes,
    Opens, Provides, Requires, BASE_MODULE,
};
pub use encode::encode;
pub use error::{DescriptorError, Result};
pub use flags::{ExportsFlags, ModuleFlags, OpensFlags, RequiresFlags};
pub use version::{Token, Version};
