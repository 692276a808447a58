//! The Tool Surface: the explicit, environment-free request object the
//! core pipeline is driven through (spec §6, §10.3). Only `modlink-cli`
//! builds one; the core never reads process arguments or the environment.

use modlink_link::Endianness;
use std::path::PathBuf;

/// A fully-specified request to resolve, bind, assemble, link and write a
/// single image.
#[derive(Debug, Clone)]
pub struct LinkRequest {
    pub module_path: Vec<PathBuf>,
    pub roots: Vec<String>,
    pub limit_modules: Option<Vec<String>>,
    pub add_reads: Vec<(String, String)>,
    pub add_exports: Vec<(String, String, String)>,
    pub add_opens: Vec<(String, String, String)>,
    pub plugins: PluginConfig,
    pub output: PathBuf,
    pub endianness: Endianness,
}

/// The recognised plugin configuration options (spec §4.5's table).
#[derive(Debug, Clone, Default)]
pub struct PluginConfig {
    pub compress: bool,
    pub compress_level: u8,
    pub compress_filter: Option<String>,
    pub exclude_resources: Option<String>,
    pub exclude_files: Option<String>,
    pub sort_resources: Option<String>,
    pub copy_files: Vec<(String, PathBuf)>,
}
