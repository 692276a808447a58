//! Reads a resolved module's backing archive or directory into a
//! [`ResourcePool`], one module at a time in dependency-first order (spec
//! §4.6's resource-ordering rule 1: a module's own resources precede a
//! dependent's); within a module, entries follow the finder's own
//! enumeration order.

use modlink_finder::{ModuleOrigin, ModuleReference};
use modlink_resolve::{Error, Resolution, Result};
use std::fs::File;
use std::io::Read as _;
use zip::ZipArchive;

use crate::pool::{Resource, ResourcePool};

/// Populates `pool` with every resource owned by every module selected in
/// `resolution`, skipping `module-info.class` itself (it carries no
/// resource identity in the linked image).
///
/// # Errors
///
/// Returns [`Error::IoError`] if a module's backing archive or directory
/// can't be read.
pub fn populate(pool: &mut ResourcePool, resolution: &Resolution) -> Result<()> {
    for name in resolution.initialization_order()? {
        if let Some(reference) = resolution.reference(&name) {
            populate_module(pool, &name, reference)?;
        }
    }
    Ok(())
}

fn populate_module(pool: &mut ResourcePool, name: &str, reference: &ModuleReference) -> Result<()> {
    match reference.origin() {
        ModuleOrigin::Exploded => populate_exploded(pool, name, reference),
        ModuleOrigin::Packaged | ModuleOrigin::Application | ModuleOrigin::Automatic => {
            populate_archive(pool, name, reference)
        }
    }
}

fn populate_exploded(pool: &mut ResourcePool, name: &str, reference: &ModuleReference) -> Result<()> {
    let root = reference.location();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(std::result::Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");
        if relative == "module-info.class" {
            continue;
        }
        let bytes = std::fs::read(entry.path()).map_err(|e| io_error(entry.path(), &e))?;
        pool.add_or_replace(Resource::new(name, relative, bytes))?;
    }
    Ok(())
}

fn populate_archive(pool: &mut ResourcePool, name: &str, reference: &ModuleReference) -> Result<()> {
    let path = reference.location();
    let file = File::open(path).map_err(|e| io_error(path, &e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| zip_error(path, &e))?;

    let packaged = matches!(reference.origin(), ModuleOrigin::Packaged);
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| zip_error(path, &e))?;
        if entry.is_dir() {
            continue;
        }
        let entry_name = entry.name().to_string();
        let sub_path = if packaged {
            let Some(rest) = entry_name.strip_prefix("classes/") else {
                continue;
            };
            rest.to_string()
        } else {
            entry_name.clone()
        };
        if sub_path.is_empty() || sub_path == "module-info.class" {
            continue;
        }
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).map_err(|e| io_error(path, &e))?;
        pool.add_or_replace(Resource::new(name, sub_path, bytes))?;
    }
    Ok(())
}

fn io_error(path: &std::path::Path, cause: &std::io::Error) -> Error {
    Error::IoError {
        path: path.display().to_string(),
        cause: cause.to_string(),
    }
}

fn zip_error(path: &std::path::Path, cause: &zip::result::ZipError) -> Error {
    Error::IoError {
        path: path.display().to_string(),
        cause: cause.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_descriptor::ModuleDescriptor;
    use std::fs;

    #[test]
    fn populates_resources_from_an_exploded_module() {
        let temp = tempfile::tempdir().expect("tempdir");
        let module_dir = temp.path().join("app");
        fs::create_dir_all(module_dir.join("com/example")).expect("mkdir");
        fs::write(module_dir.join("com/example/App.class"), b"body").expect("write");

        let descriptor = ModuleDescriptor::builder("app")
            .add_package("com.example")
            .build()
            .expect("builds");
        let reference = ModuleReference::new(descriptor, ModuleOrigin::Exploded, module_dir, None);

        let mut pool = ResourcePool::new();
        populate_module(&mut pool, "app", &reference).expect("populates");

        assert!(pool.get("/app/com/example/App.class").is_some());
    }
}
