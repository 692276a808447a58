//! Turns a bound resolution into a runnable layer image: a resource pool,
//! a plugin pipeline that transforms it, and a writer for the result.

pub mod image;
pub mod pipeline;
pub mod plugin;
pub mod pool;
pub mod populate;

pub use image::{write, Endianness};
pub use pipeline::run as run_pipeline;
pub use plugin::{
    CompressPlugin, CopyFilesPlugin, ExcludeFilesPlugin, ExcludeResourcesPlugin, Plugin,
    PluginCategory, SortResourcesPlugin, StripDebugPlugin, LOOSE_FILES_MODULE,
};
pub use pool::{Compressor, Resource, ResourcePool};
pub use populate::populate;
