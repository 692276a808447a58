//! Reads a single candidate entry (a `.jmod`, a `.jar`, or an exploded
//! module directory) into a [`ModuleReference`].

use modlink_descriptor::decode::decode;
use modlink_descriptor::ModuleDescriptor;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Cursor;
use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::ZipArchive;

use crate::automatic::{build_descriptor, parse_service_providers};
use crate::error::{FinderError, Result};
use crate::hash::FileHashSupplier;
use crate::reference::{ModuleOrigin, ModuleReference};

/// Reads a `.jmod` packaged artifact: `classes/module-info` plus packages
/// derived from sibling `classes/*.class` entries.
pub fn read_jmod(path: &Path) -> Result<ModuleReference> {
    let file = File::open(path).map_err(|e| FinderError::io(path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| FinderError::io(path, e))?;

    let mut packages = BTreeSet::new();
    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(|e| FinderError::io(path, e))?;
        let name = entry.name();
        if let Some(rest) = name.strip_prefix("classes/")
            && rest.ends_with(".class")
            && rest != "module-info.class"
            && let Some(slash) = rest.rfind('/')
        {
            packages.insert(rest[..slash].replace('/', "."));
        }
    }

    let mut module_info = archive
        .by_name("classes/module-info.class")
        .map_err(|e| FinderError::io(path, e))?;
    let mut bytes = Vec::new();
    module_info
        .read_to_end(&mut bytes)
        .map_err(|e| FinderError::io(path, e))?;
    drop(module_info);

    let descriptor = decode_with_packages(&bytes, packages)?;
    let supplier = Arc::new(FileHashSupplier::new(path.to_path_buf()));
    Ok(ModuleReference::new(
        descriptor,
        ModuleOrigin::Packaged,
        path.to_path_buf(),
        Some(supplier),
    ))
}

/// Reads a `.jar` application artifact: a modular jar (`module-info.class`
/// at the archive root) or, failing that, a synthesized automatic module.
pub fn read_jar(path: &Path) -> Result<ModuleReference> {
    let file = File::open(path).map_err(|e| FinderError::io(path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| FinderError::io(path, e))?;

    let mut packages = BTreeSet::new();
    let mut service_files: Vec<(String, String)> = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| FinderError::io(path, e))?;
        let name = entry.name().to_string();
        if name.to_ascii_lowercase().ends_with(".class")
            && name != "module-info.class"
            && let Some(slash) = name.rfind('/')
        {
            packages.insert(name[..slash].replace('/', "."));
        }
        if let Some(service) = name.strip_prefix("META-INF/services/")
            && !service.is_empty()
        {
            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .map_err(|e| FinderError::io(path, e))?;
            service_files.push((service.to_string(), content));
        }
    }

    if let Ok(mut module_info) = archive.by_name("module-info.class") {
        let mut bytes = Vec::new();
        module_info
            .read_to_end(&mut bytes)
            .map_err(|e| FinderError::io(path, e))?;
        drop(module_info);
        let descriptor = decode_with_packages(&bytes, packages)?;
        let supplier = Arc::new(FileHashSupplier::new(path.to_path_buf()));
        return Ok(ModuleReference::new(
            descriptor,
            ModuleOrigin::Application,
            path.to_path_buf(),
            Some(supplier),
        ));
    }

    let manifest_module_name = read_manifest_module_name(&mut archive);
    let main_class = read_manifest_main_class(&mut archive);
    let provides = service_files
        .into_iter()
        .map(|(service, content)| (service, parse_service_providers(&content)))
        .collect();

    let file_stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(".jar"))
        .unwrap_or_default();
    let descriptor = build_descriptor(
        file_stem,
        manifest_module_name.as_deref(),
        packages,
        provides,
        main_class,
    )?;
    let supplier = Arc::new(FileHashSupplier::new(path.to_path_buf()));
    Ok(ModuleReference::new(
        descriptor,
        ModuleOrigin::Automatic,
        path.to_path_buf(),
        Some(supplier),
    ))
}

/// Reads an exploded module directory: `module-info.class` at its root,
/// with packages discovered by walking the directory tree.
pub fn read_exploded(path: &Path) -> Result<ModuleReference> {
    let module_info_path = path.join("module-info.class");
    let bytes = std::fs::read(&module_info_path).map_err(|e| FinderError::io(path, e))?;

    let mut packages = BTreeSet::new();
    discover_packages(path, "", &mut packages)?;

    let descriptor = decode_with_packages(&bytes, packages)?;
    Ok(ModuleReference::new(
        descriptor,
        ModuleOrigin::Exploded,
        path.to_path_buf(),
        None,
    ))
}

fn discover_packages(base: &Path, prefix: &str, packages: &mut BTreeSet<String>) -> Result<()> {
    let current = if prefix.is_empty() {
        base.to_path_buf()
    } else {
        base.join(prefix.replace('.', std::path::MAIN_SEPARATOR_STR))
    };
    if !current.is_dir() {
        return Ok(());
    }
    let entries = std::fs::read_dir(&current).map_err(|e| FinderError::io(&current, e))?;

    let mut has_classes = false;
    for entry in entries.flatten() {
        let entry_path = entry.path();
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if entry_path.is_file() && name_str.ends_with(".class") && name_str != "module-info.class"
        {
            has_classes = true;
        } else if entry_path.is_dir() {
            let new_prefix = if prefix.is_empty() {
                name_str.to_string()
            } else {
                format!("{prefix}.{name_str}")
            };
            discover_packages(base, &new_prefix, packages)?;
        }
    }
    if has_classes && !prefix.is_empty() {
        packages.insert(prefix.to_string());
    }
    Ok(())
}

fn decode_with_packages(bytes: &[u8], packages: BTreeSet<String>) -> Result<ModuleDescriptor> {
    struct Supplied(BTreeSet<String>);
    impl modlink_descriptor::decode::PackageFinder for Supplied {
        fn packages_for(&self, _module_name: &str) -> BTreeSet<String> {
            self.0.clone()
        }
    }
    let finder = Supplied(packages);
    let mut cursor = Cursor::new(bytes);
    let descriptor = decode(&mut cursor, &finder)?;
    Ok(descriptor)
}

fn read_manifest_module_name<R: std::io::Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
) -> Option<String> {
    let mut manifest = archive.by_name("META-INF/MANIFEST.MF").ok()?;
    let mut content = String::new();
    manifest.read_to_string(&mut content).ok()?;
    manifest_attribute(&content, "Automatic-Module-Name")
}

fn read_manifest_main_class<R: std::io::Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
) -> Option<String> {
    let mut manifest = archive.by_name("META-INF/MANIFEST.MF").ok()?;
    let mut content = String::new();
    manifest.read_to_string(&mut content).ok()?;
    manifest_attribute(&content, "Main-Class")
}

fn manifest_attribute(content: &str, key: &str) -> Option<String> {
    let prefix = format!("{key}:");
    for line in content.lines() {
        if let Some(value) = line.strip_prefix(&prefix) {
            return Some(value.trim().to_string());
        }
    }
    None
}

/// Lists the immediate children of `root` that look like module artifacts:
/// `.jmod` files, `.jar` files, and exploded module directories.
pub fn list_candidates(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(root).map_err(|e| FinderError::io(root, e))?;
    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| FinderError::io(root, e))?;
        let path = entry.path();
        if path.is_file() {
            let is_artifact = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("jmod") || ext.eq_ignore_ascii_case("jar"));
            if is_artifact {
                candidates.push(path);
            }
        } else if path.is_dir() {
            candidates.push(path);
        }
    }
    Ok(candidates)
}

/// Reads whichever artifact kind `path` names.
pub fn read_candidate(path: &Path) -> Result<Option<ModuleReference>> {
    if path.is_dir() {
        let module_info = path.join("module-info.class");
        if module_info.exists() {
            return Ok(Some(read_exploded(path)?));
        }
        return Ok(None);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("jmod") => Ok(Some(read_jmod(path)?)),
        Some(ext) if ext.eq_ignore_ascii_case("jar") => Ok(Some(read_jar(path)?)),
        _ => Ok(None),
    }
}
