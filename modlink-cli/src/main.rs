mod argument;
mod error;
mod logging;
mod request;

use argument::Arguments;
use error::{classify, CliError};
use modlink_descriptor::BASE_MODULE;
use modlink_finder::ArtifactFinder;
use modlink_layer::{ModuleLayer, SingleLoader};
use modlink_link::{
    CompressPlugin, CopyFilesPlugin, Endianness, ExcludeFilesPlugin, ExcludeResourcesPlugin,
    Plugin, ResourcePool, SortResourcesPlugin,
};
use modlink_resolve::Resolver;
use request::{LinkRequest, PluginConfig};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

fn main() -> ExitCode {
    logging::initialize();
    let arguments = Arguments::parse();

    match run(arguments) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let class = classify(&error);
            eprintln!("{error} ({class})");
            ExitCode::from(u8::try_from(class.code()).unwrap_or(3))
        }
    }
}

fn run(arguments: Arguments) -> Result<(), CliError> {
    let request = build_request(arguments)?;
    debug!(roots = ?request.roots, "resolving");

    let finder = ArtifactFinder::new(request.module_path.clone());
    let mut resolver = Resolver::new();
    for (source, target) in &request.add_reads {
        resolver = resolver.add_reads(source.clone(), target.clone());
    }
    for (module, package, target) in &request.add_exports {
        resolver = resolver.add_exports(module.clone(), package.clone(), target.clone());
    }
    for (module, package, target) in &request.add_opens {
        resolver = resolver.add_opens(module.clone(), package.clone(), target.clone());
    }
    if let Some(limit) = &request.limit_modules {
        resolver = resolver.limit_modules(limit.iter().cloned().collect::<BTreeSet<_>>());
    }

    let resolution = resolver.resolve(&finder, None, &finder, &request.roots)?;
    let resolution = resolver.bind(resolution, &finder, &finder, None)?;
    debug!(modules = resolution.len(), "resolved");

    let assignment = SingleLoader::default();
    let layer = ModuleLayer::assemble("boot", resolution.clone(), &assignment, Vec::new())?;
    debug!(layer = layer.name(), "assembled");

    let mut pool = ResourcePool::new();
    modlink_link::populate(&mut pool, &resolution)?;

    let plugins = build_plugins(&request.plugins)?;
    let mut pool = modlink_link::run_pipeline(&plugins, pool)?;
    pool.freeze();

    let mut output = std::fs::File::create(&request.output).map_err(|e| {
        modlink_resolve::Error::IoError {
            path: request.output.display().to_string(),
            cause: e.to_string(),
        }
    })?;
    modlink_link::write(&pool, request.endianness, &mut output)?;
    debug!(path = %request.output.display(), "wrote image");
    Ok(())
}

fn build_plugins(config: &PluginConfig) -> Result<Vec<Box<dyn Plugin>>, CliError> {
    let mut plugins: Vec<Box<dyn Plugin>> = Vec::new();
    if let Some(globs) = &config.exclude_resources {
        plugins.push(Box::new(ExcludeResourcesPlugin::new(globs)?));
    }
    if let Some(globs) = &config.exclude_files {
        plugins.push(Box::new(ExcludeFilesPlugin::new(globs)?));
    }
    if let Some(prefixes) = &config.sort_resources {
        plugins.push(Box::new(SortResourcesPlugin::new(prefixes)));
    }
    if !config.copy_files.is_empty() {
        let mut files = Vec::with_capacity(config.copy_files.len());
        for (dest, src) in &config.copy_files {
            let bytes = fs::read(src).map_err(|e| modlink_resolve::Error::IoError {
                path: src.display().to_string(),
                cause: e.to_string(),
            })?;
            files.push((dest.clone(), bytes));
        }
        plugins.push(Box::new(CopyFilesPlugin::new(files)));
    }
    if config.compress {
        plugins.push(Box::new(CompressPlugin::new(
            config.compress_level,
            config.compress_filter.as_deref(),
        )?));
    }
    Ok(plugins)
}

fn build_request(arguments: Arguments) -> Result<LinkRequest, CliError> {
    let mut roots = arguments.add_modules;
    if !roots.iter().any(|m| m == BASE_MODULE) {
        roots.push(BASE_MODULE.to_string());
    }

    let module_path = arguments.module_path.into_iter().map(PathBuf::from).collect();

    let add_reads = arguments
        .add_reads
        .unwrap_or_default()
        .iter()
        .map(|entry| parse_reads(entry))
        .collect::<Result<Vec<_>, _>>()?;
    let add_exports = arguments
        .add_exports
        .unwrap_or_default()
        .iter()
        .map(|entry| parse_qualified(entry))
        .collect::<Result<Vec<_>, _>>()?;
    let add_opens = arguments
        .add_opens
        .unwrap_or_default()
        .iter()
        .map(|entry| parse_qualified(entry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LinkRequest {
        module_path,
        roots,
        limit_modules: arguments.limit_modules,
        add_reads,
        add_exports,
        add_opens,
        plugins: PluginConfig {
            compress: arguments.compress,
            compress_level: arguments.compress_level,
            compress_filter: arguments.compress_filter,
            exclude_resources: arguments.exclude_resources.map(|v| v.join(",")),
            exclude_files: arguments.exclude_files.map(|v| v.join(",")),
            sort_resources: arguments.sort_resources,
            copy_files: arguments
                .copy_files
                .unwrap_or_default()
                .iter()
                .map(|entry| parse_copy_file(entry))
                .collect::<Result<Vec<_>, _>>()?,
        },
        output: PathBuf::from(arguments.output),
        endianness: if arguments.big_endian {
            Endianness::Big
        } else {
            Endianness::Little
        },
    })
}

/// Parses a `SOURCE=TARGET` override.
fn parse_reads(entry: &str) -> Result<(String, String), CliError> {
    let (source, target) = entry
        .split_once('=')
        .ok_or_else(|| CliError::Usage(entry.to_string()))?;
    Ok((source.to_string(), target.to_string()))
}

/// Parses a `DEST=SRC` copy-files pair.
fn parse_copy_file(entry: &str) -> Result<(String, PathBuf), CliError> {
    let (dest, src) = entry
        .split_once('=')
        .ok_or_else(|| CliError::Usage(entry.to_string()))?;
    Ok((dest.to_string(), PathBuf::from(src)))
}

/// Parses a `SOURCE/PACKAGE=TARGET` override.
fn parse_qualified(entry: &str) -> Result<(String, String, String), CliError> {
    let (left, target) = entry
        .split_once('=')
        .ok_or_else(|| CliError::Usage(entry.to_string()))?;
    let (module, package) = left
        .split_once('/')
        .ok_or_else(|| CliError::Usage(entry.to_string()))?;
    Ok((module.to_string(), package.to_string(), target.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_reads_override() {
        assert_eq!(
            parse_reads("app=util").expect("parses"),
            ("app".to_string(), "util".to_string())
        );
    }

    #[test]
    fn rejects_a_malformed_reads_override() {
        assert!(parse_reads("app-util").is_err());
    }

    #[test]
    fn parses_a_qualified_override() {
        assert_eq!(
            parse_qualified("app/com.example=util").expect("parses"),
            ("app".to_string(), "com.example".to_string(), "util".to_string())
        );
    }

    #[test]
    fn rejects_a_qualified_override_missing_a_package() {
        assert!(parse_qualified("app=util").is_err());
    }
}
