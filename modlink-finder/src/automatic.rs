//! Synthesizes a module descriptor for an application archive that has no
//! `module-info` of its own.

use modlink_descriptor::{ModuleDescriptor, Version};
use std::collections::BTreeSet;

use crate::error::{FinderError, Result};

/// Derives an automatic module's name and optional version from an archive
/// filename, stripping a trailing `-<digits>(.…)?` version suffix and
/// sanitising the remainder into a legal module name.
#[must_use]
pub fn derive_name_and_version(file_stem: &str) -> (String, Option<Version>) {
    let version_start = find_version_suffix(file_stem);
    let (name_part, version_part) = match version_start {
        Some(idx) => (&file_stem[..idx], Some(&file_stem[idx + 1..])),
        None => (file_stem, None),
    };

    let name = sanitize(name_part);
    let version = version_part.and_then(|v| Version::parse(v).ok());
    (name, version)
}

/// Finds the index of the `-` that introduces a trailing version suffix,
/// i.e. the last `-` immediately followed by a digit.
fn find_version_suffix(stem: &str) -> Option<usize> {
    let bytes = stem.as_bytes();
    for (idx, byte) in bytes.iter().enumerate() {
        if *byte == b'-' && bytes.get(idx + 1).is_some_and(u8::is_ascii_digit) {
            return Some(idx);
        }
    }
    None
}

fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_dot = false;
    for c in raw.chars() {
        let mapped = if c.is_ascii_alphanumeric() { c } else { '.' };
        if mapped == '.' {
            if last_was_dot {
                continue;
            }
            last_was_dot = true;
        } else {
            last_was_dot = false;
        }
        out.push(mapped);
    }
    out.trim_matches('.').to_string()
}

/// Builds the automatic module's descriptor from its derived name, an
/// optional manifest-declared name override, its packages, its declared
/// services, and its manifest main class.
///
/// # Errors
///
/// Returns [`FinderError::InvalidAutomaticModuleName`] if neither the
/// derived nor the manifest name survives sanitisation as a non-empty
/// identifier, or propagates descriptor-builder validation failures.
pub fn build_descriptor(
    file_stem: &str,
    manifest_module_name: Option<&str>,
    packages: BTreeSet<String>,
    provides: Vec<(String, Vec<String>)>,
    main_class: Option<String>,
) -> Result<ModuleDescriptor> {
    let (derived_name, version) = derive_name_and_version(file_stem);
    let name = match manifest_module_name {
        Some(declared) if !declared.is_empty() => declared.to_string(),
        _ => derived_name,
    };
    if name.is_empty() {
        return Err(FinderError::InvalidAutomaticModuleName(
            file_stem.to_string(),
        ));
    }

    let mut builder = ModuleDescriptor::builder(name)
        .flags(modlink_descriptor::ModuleFlags::AUTOMATIC)
        .packages(packages);
    if let Some(version) = version {
        builder = builder.version(version);
    }
    if let Some(main_class) = main_class {
        builder = builder.main_class(main_class);
    }
    for (service, providers) in provides {
        if providers.is_empty() {
            continue;
        }
        builder = builder.provide(service, providers)?;
    }

    Ok(builder.build()?)
}

/// Parses a `META-INF/services/<service>` file's contents into provider
/// class names, skipping blank lines and `#`-prefixed comments.
#[must_use]
pub fn parse_service_providers(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_version_suffix() {
        let (name, version) = derive_name_and_version("foo-bar-1.2.3");
        assert_eq!(name, "foo.bar");
        assert_eq!(version.expect("parses").as_str(), "1.2.3");
    }

    #[test]
    fn leaves_name_without_version_suffix_alone() {
        let (name, version) = derive_name_and_version("foo-bar");
        assert_eq!(name, "foo.bar");
        assert!(version.is_none());
    }

    #[test]
    fn sanitizes_non_alphanumeric_runs() {
        let (name, _) = derive_name_and_version("foo--bar__baz-1.0");
        assert_eq!(name, "foo.bar.baz");
    }

    #[test]
    fn parses_service_provider_file() {
        let content = "# comment\n\ncom.example.Impl\n  com.example.OtherImpl  \n";
        let providers = parse_service_providers(content);
        assert_eq!(providers, vec!["com.example.Impl", "com.example.OtherImpl"]);
    }
}
