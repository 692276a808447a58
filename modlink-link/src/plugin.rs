//! The plugin trait, its fixed category ordering, and the built-in plugins
//! recognised by the pipeline (spec §4.5).

use flate2::write::DeflateEncoder;
use flate2::Compression;
use modlink_resolve::{Error, Result};
use regex::Regex;
use std::io::Write;

use crate::pool::{Compressor, Resource, ResourcePool};

/// The module name `copy-files` drops its resources under: loose files
/// aren't owned by any resolved module.
pub const LOOSE_FILES_MODULE: &str = "--files";

/// The fixed bucket a [`Plugin`] is sorted into before the pipeline runs.
/// Declaration order is category order: Sorter, Filter, Transformer,
/// Compressor, Verifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum PluginCategory {
    Sorter,
    Filter,
    Transformer,
    Compressor,
    Verifier,
}

/// A pipeline stage: reads an immutable snapshot and produces a fresh pool.
pub trait Plugin: Send + Sync {
    /// The plugin's stable, diagnostic name.
    fn name(&self) -> &str;

    /// The bucket this plugin runs in.
    fn category(&self) -> PluginCategory;

    /// Transforms `input` into a freshly-built pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginError`] naming this plugin on failure.
    fn apply(&self, input: &ResourcePool) -> Result<ResourcePool>;
}

/// Translates a simple shell glob (`*` and `?` wildcards, no character
/// classes) into an anchored regex.
fn glob_to_regex(plugin: &str, glob: &str) -> Result<Regex> {
    let mut pattern = String::from("^");
    for ch in glob.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            '.' | '+' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$' | '\\' => {
                pattern.push('\\');
                pattern.push(ch);
            }
            c => pattern.push(c),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).map_err(|e| Error::PluginError {
        plugin: plugin.to_string(),
        cause: e.to_string(),
    })
}

fn compile_globs(plugin: &str, globs: &str) -> Result<Vec<Regex>> {
    globs
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(|glob| glob_to_regex(plugin, glob))
        .collect()
}

/// Drops pool resources whose path matches any of `exclude-resources`'
/// comma-separated globs.
#[derive(Debug)]
pub struct ExcludeResourcesPlugin {
    patterns: Vec<Regex>,
}

impl ExcludeResourcesPlugin {
    /// Compiles `globs` (comma-separated, `*`/`?` wildcards).
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginError`] if a glob doesn't compile.
    pub fn new(globs: &str) -> Result<Self> {
        Ok(Self {
            patterns: compile_globs("exclude-resources", globs)?,
        })
    }
}

impl Plugin for ExcludeResourcesPlugin {
    fn name(&self) -> &str {
        "exclude-resources"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Filter
    }

    fn apply(&self, input: &ResourcePool) -> Result<ResourcePool> {
        let mut output = ResourcePool::new();
        for resource in input.entries() {
            if resource.module() == LOOSE_FILES_MODULE {
                output.add_or_replace(resource.clone())?;
                continue;
            }
            if self.patterns.iter().any(|p| p.is_match(resource.path())) {
                continue;
            }
            output.add_or_replace(resource.clone())?;
        }
        Ok(output)
    }
}

/// Drops loose (`copy-files`) entries matching any of `exclude-files`'
/// comma-separated globs; module resources pass through untouched.
#[derive(Debug)]
pub struct ExcludeFilesPlugin {
    patterns: Vec<Regex>,
}

impl ExcludeFilesPlugin {
    /// Compiles `globs` (comma-separated, `*`/`?` wildcards).
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginError`] if a glob doesn't compile.
    pub fn new(globs: &str) -> Result<Self> {
        Ok(Self {
            patterns: compile_globs("exclude-files", globs)?,
        })
    }
}

impl Plugin for ExcludeFilesPlugin {
    fn name(&self) -> &str {
        "exclude-files"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Filter
    }

    fn apply(&self, input: &ResourcePool) -> Result<ResourcePool> {
        let mut output = ResourcePool::new();
        for resource in input.entries() {
            if resource.module() == LOOSE_FILES_MODULE
                && self.patterns.iter().any(|p| p.is_match(resource.path()))
            {
                continue;
            }
            output.add_or_replace(resource.clone())?;
        }
        Ok(output)
    }
}

/// Reorders the pool so paths matching an earlier `sort-resources` prefix
/// sort before later prefixes, and before anything matching no prefix;
/// order within a group is preserved (stable sort).
#[derive(Debug)]
pub struct SortResourcesPlugin {
    prefixes: Vec<String>,
}

impl SortResourcesPlugin {
    /// Builds the plugin from `sort-resources`' comma-separated prefix list.
    #[must_use]
    pub fn new(prefixes: &str) -> Self {
        Self {
            prefixes: prefixes
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(ToString::to_string)
                .collect(),
        }
    }

    fn rank(&self, path: &str) -> usize {
        self.prefixes
            .iter()
            .position(|prefix| path.starts_with(prefix.as_str()))
            .unwrap_or(self.prefixes.len())
    }
}

impl Plugin for SortResourcesPlugin {
    fn name(&self) -> &str {
        "sort-resources"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Sorter
    }

    fn apply(&self, input: &ResourcePool) -> Result<ResourcePool> {
        let mut entries: Vec<&Resource> = input.entries().collect();
        entries.sort_by_key(|r| self.rank(r.path()));
        let mut output = ResourcePool::new();
        for resource in entries {
            output.add_or_replace(resource.clone())?;
        }
        Ok(output)
    }
}

/// Adds `copy-files`' comma-separated source list into the pool verbatim,
/// under [`LOOSE_FILES_MODULE`].
#[derive(Debug)]
pub struct CopyFilesPlugin {
    files: Vec<(String, Vec<u8>)>,
}

impl CopyFilesPlugin {
    /// `files` pairs a destination sub-path with its verbatim content.
    #[must_use]
    pub fn new(files: Vec<(String, Vec<u8>)>) -> Self {
        Self { files }
    }
}

impl Plugin for CopyFilesPlugin {
    fn name(&self) -> &str {
        "copy-files"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Transformer
    }

    fn apply(&self, input: &ResourcePool) -> Result<ResourcePool> {
        let mut output = input.clone();
        for (sub_path, bytes) in &self.files {
            output.add_or_replace(Resource::new(LOOSE_FILES_MODULE, sub_path, bytes.as_slice()))?;
        }
        Ok(output)
    }
}

/// DEFLATE-compresses resources matching `compress-filter`, at
/// `compress-level` (0 = no compression, 1 = fast, 2 = best).
#[derive(Debug)]
pub struct CompressPlugin {
    filter: Option<Regex>,
    level: Compression,
}

impl CompressPlugin {
    /// Builds the plugin from `compress-level` (clamped to 0-2) and an
    /// optional `compress-filter` regex.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginError`] if `filter` doesn't compile as a regex.
    pub fn new(level: u8, filter: Option<&str>) -> Result<Self> {
        let compression = match level {
            0 => Compression::none(),
            1 => Compression::fast(),
            _ => Compression::best(),
        };
        let filter = filter
            .map(Regex::new)
            .transpose()
            .map_err(|e| Error::PluginError {
                plugin: "compress-filter".to_string(),
                cause: e.to_string(),
            })?;
        Ok(Self {
            filter,
            level: compression,
        })
    }
}

impl Plugin for CompressPlugin {
    fn name(&self) -> &str {
        "compress"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Compressor
    }

    fn apply(&self, input: &ResourcePool) -> Result<ResourcePool> {
        let mut output = ResourcePool::new();
        for resource in input.entries() {
            let eligible = self
                .filter
                .as_ref()
                .is_none_or(|pattern| pattern.is_match(resource.path()));
            if !eligible {
                output.add_or_replace(resource.clone())?;
                continue;
            }
            let mut encoder = DeflateEncoder::new(Vec::new(), self.level);
            encoder.write_all(resource.bytes()).map_err(|e| Error::PluginError {
                plugin: self.name().to_string(),
                cause: e.to_string(),
            })?;
            let compressed = encoder.finish().map_err(|e| Error::PluginError {
                plugin: self.name().to_string(),
                cause: e.to_string(),
            })?;
            output.add_or_replace(resource.with_compressed(compressed.into(), Compressor::Deflate))?;
        }
        Ok(output)
    }
}

/// Drops debug-only class attributes.
///
/// This workspace doesn't model class-file structure beyond a module
/// declaration's own attribute table, so there is no byte-level attribute
/// to strip yet; the plugin is wired into the `Transformer` bucket and
/// passes every resource through unchanged until that support exists.
#[derive(Debug)]
pub struct StripDebugPlugin;

impl Plugin for StripDebugPlugin {
    fn name(&self) -> &str {
        "strip-debug"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Transformer
    }

    fn apply(&self, input: &ResourcePool) -> Result<ResourcePool> {
        Ok(input.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_resources_drops_matching_globs() {
        let mut input = ResourcePool::new();
        input.add(Resource::new("m", "a.class", b"".as_slice())).expect("adds");
        input.add(Resource::new("m", "a.txt", b"".as_slice())).expect("adds");

        let plugin = ExcludeResourcesPlugin::new("*.txt").expect("compiles");
        let output = plugin.apply(&input).expect("applies");

        assert!(output.get("/m/a.class").is_some());
        assert!(output.get("/m/a.txt").is_none());
    }

    #[test]
    fn sort_resources_reorders_by_prefix() {
        let mut input = ResourcePool::new();
        input.add(Resource::new("m", "z.class", b"".as_slice())).expect("adds");
        input.add(Resource::new("m", "priority.class", b"".as_slice())).expect("adds");

        let plugin = SortResourcesPlugin::new("/m/priority.class");
        let output = plugin.apply(&input).expect("applies");
        let paths: Vec<&str> = output.entries().map(Resource::path).collect();
        assert_eq!(paths, vec!["/m/priority.class", "/m/z.class"]);
    }

    #[test]
    fn compress_plugin_shrinks_repetitive_bytes() {
        let mut input = ResourcePool::new();
        let repetitive = vec![0u8; 4096];
        input.add(Resource::new("m", "a.bin", repetitive.clone())).expect("adds");

        let plugin = CompressPlugin::new(2, None).expect("builds");
        let output = plugin.apply(&input).expect("applies");
        let resource = output.get("/m/a.bin").expect("present");
        assert_eq!(resource.compressor(), Compressor::Deflate);
        assert!(resource.bytes().len() < resource.uncompressed_size());
    }
}
