//! Binary module-declaration decoder (spec §4.1, wire format in spec §6).

use crate::descriptor::{validate_name, ModuleDescriptor, BASE_MODULE};
use crate::error::{DescriptorError, Result};
use crate::flags::{ExportsFlags, ModuleFlags, OpensFlags, RequiresFlags};
use crate::pool::ConstantPool;
use byteorder::{BigEndian, ReadBytesExt};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

/// Sentinel that must begin every binary module declaration.
pub const MAGIC: u32 = 0x4D4F_444C;

/// The minimum major version this decoder accepts.
pub const MIN_MAJOR_VERSION: u16 = 1;

/// The access-flag bit that marks a binary as a module declaration.
const ACC_MODULE: u16 = 0x8000;

/// Supplies the set of packages a descriptor belongs to when the binary
/// omits its `ConcealedPackages` attribute (spec §4.1 step 5).
pub trait PackageFinder {
    /// Returns every package the named module contains.
    fn packages_for(&self, module_name: &str) -> BTreeSet<String>;
}

/// A [`PackageFinder`] that always returns an empty set.
#[derive(Debug)]
pub struct NoPackages;

impl PackageFinder for NoPackages {
    fn packages_for(&self, _module_name: &str) -> BTreeSet<String> {
        BTreeSet::new()
    }
}

struct RequiresRaw {
    index: u16,
    flags: RequiresFlags,
    version_index: u16,
}

struct ExportsRaw {
    index: u16,
    flags: ExportsFlags,
    to: Vec<u16>,
}

struct OpensRaw {
    index: u16,
    flags: OpensFlags,
    to: Vec<u16>,
}

struct ProvidesRaw {
    index: u16,
    with: Vec<u16>,
}

struct HashEntryRaw {
    module_index: u16,
    digest: Vec<u8>,
}

struct HashesRaw {
    algorithm_index: u16,
    entries: Vec<HashEntryRaw>,
}

struct ModuleAttribute {
    name_index: u16,
    flags: ModuleFlags,
    version_index: u16,
    requires: Vec<RequiresRaw>,
    exports: Vec<ExportsRaw>,
    opens: Vec<OpensRaw>,
    uses: Vec<u16>,
    provides: Vec<ProvidesRaw>,
}

enum ParsedAttribute {
    Module(ModuleAttribute),
    ConcealedPackages(Vec<u16>),
    Version(u16),
    MainClass(u16),
    Hashes(HashesRaw),
    Unknown,
}

/// Decodes a binary module declaration from `reader`.
///
/// # Errors
///
/// Returns a [`DescriptorError`] for any of the malformed-input cases
/// enumerated in spec §4.1.
pub fn decode(reader: &mut impl Read, package_finder: &dyn PackageFinder) -> Result<ModuleDescriptor> {
    let magic = read_u32(reader, "magic")?;
    if magic != MAGIC {
        return Err(DescriptorError::BadMagic(magic));
    }

    let minor = read_u16(reader, "minor version")?;
    let major = read_u16(reader, "major version")?;
    let _ = minor;
    if major < MIN_MAJOR_VERSION {
        return Err(DescriptorError::UnsupportedVersion(major));
    }

    let cp_count = read_u16(reader, "constant pool count")?;
    let pool = ConstantPool::read(reader, cp_count)?;

    let access_flags = read_u16(reader, "access flags")?;
    if access_flags & ACC_MODULE == 0 {
        return Err(DescriptorError::NotAModule);
    }

    let this_class = read_u16(reader, "this_class")?;
    let this_class_name = pool.class_name(this_class)?;
    let module_name = this_class_name
        .strip_suffix("/module-info")
        .ok_or_else(|| DescriptorError::IllegalThisClass(this_class_name.clone()))?
        .to_string();

    let super_class = read_u16(reader, "super_class")?;
    if super_class != 0 {
        return Err(DescriptorError::NonZeroSection("super_class", super_class));
    }
    let interfaces = read_u16(reader, "interfaces count")?;
    if interfaces != 0 {
        return Err(DescriptorError::NonZeroSection("interfaces", interfaces));
    }
    let fields = read_u16(reader, "fields count")?;
    if fields != 0 {
        return Err(DescriptorError::NonZeroSection("fields", fields));
    }
    let methods = read_u16(reader, "methods count")?;
    if methods != 0 {
        return Err(DescriptorError::NonZeroSection("methods", methods));
    }

    let attr_count = read_u16(reader, "attribute count")?;
    let mut module_attr: Option<ModuleAttribute> = None;
    let mut concealed_packages: Option<Vec<u16>> = None;
    let mut version_index: Option<u16> = None;
    let mut main_class_index: Option<u16> = None;
    let mut hashes_raw: Option<HashesRaw> = None;

    for _ in 0..attr_count {
        let name_index = read_u16(reader, "attribute name_index")?;
        let length = read_u32(reader, "attribute length")?;
        let mut payload = vec![0u8; length as usize];
        reader
            .read_exact(&mut payload)
            .map_err(|_| DescriptorError::Truncated("attribute payload"))?;
        let attr_name = pool.utf8_at(name_index).unwrap_or_default();

        let mut cursor = std::io::Cursor::new(payload);
        match parse_attribute(&attr_name, &mut cursor)? {
            ParsedAttribute::Module(attr) => {
                if module_attr.is_some() {
                    return Err(DescriptorError::DuplicateAttribute("Module"));
                }
                module_attr = Some(attr);
            }
            ParsedAttribute::ConcealedPackages(indices) => {
                if concealed_packages.is_some() {
                    return Err(DescriptorError::DuplicateAttribute("ConcealedPackages"));
                }
                concealed_packages = Some(indices);
            }
            ParsedAttribute::Version(index) => {
                if version_index.is_some() {
                    return Err(DescriptorError::DuplicateAttribute("Version"));
                }
                version_index = Some(index);
            }
            ParsedAttribute::MainClass(index) => {
                if main_class_index.is_some() {
                    return Err(DescriptorError::DuplicateAttribute("MainClass"));
                }
                main_class_index = Some(index);
            }
            ParsedAttribute::Hashes(raw) => {
                if hashes_raw.is_some() {
                    return Err(DescriptorError::DuplicateAttribute("Hashes"));
                }
                hashes_raw = Some(raw);
            }
            ParsedAttribute::Unknown => {}
        }
    }

    let Some(module_attr) = module_attr else {
        return Err(DescriptorError::Truncated("Module attribute"));
    };

    let declared_name = pool.module_name(module_attr.name_index)?;
    if declared_name != module_name {
        return Err(DescriptorError::IllegalThisClass(this_class_name));
    }
    validate_name("module", &module_name)?;

    let version = match version_index {
        Some(idx) if idx != 0 => Some(pool.utf8_at(idx)?),
        _ => None,
    };

    let mut builder = ModuleDescriptor::builder(module_name.clone()).flags(module_attr.flags);
    if let Some(v) = &version {
        builder = builder.version(crate::version::Version::parse(v)?);
    }

    let mut packages = BTreeSet::new();
    if let Some(indices) = concealed_packages {
        for idx in indices {
            packages.insert(pool.package_name(idx)?);
        }
    } else {
        packages = package_finder.packages_for(&module_name);
    }
    for export in &module_attr.exports {
        packages.insert(pool.package_name(export.index)?);
    }
    for open in &module_attr.opens {
        packages.insert(pool.package_name(open.index)?);
    }
    builder = builder.packages(packages);

    for requires in &module_attr.requires {
        let name = pool.module_name(requires.index)?;
        let compiled_version = if requires.version_index != 0 {
            Some(pool.utf8_at(requires.version_index)?)
        } else {
            None
        };
        if name != module_name {
            builder = builder.require(name, requires.flags, compiled_version)?;
        }
    }

    for export in &module_attr.exports {
        let package = pool.package_name(export.index)?;
        let targets = if export.to.is_empty() {
            None
        } else {
            let mut set = BTreeSet::new();
            for idx in &export.to {
                set.insert(pool.module_name(*idx)?);
            }
            Some(set)
        };
        builder = builder.export(package, targets, export.flags);
    }

    for open in &module_attr.opens {
        let package = pool.package_name(open.index)?;
        let targets = if open.to.is_empty() {
            None
        } else {
            let mut set = BTreeSet::new();
            for idx in &open.to {
                set.insert(pool.module_name(*idx)?);
            }
            Some(set)
        };
        builder = builder.open(package, targets, open.flags);
    }

    for use_index in &module_attr.uses {
        builder = builder.use_service(pool.class_name(*use_index)?);
    }

    for provides in &module_attr.provides {
        let service = pool.class_name(provides.index)?;
        let mut providers = Vec::with_capacity(provides.with.len());
        for idx in &provides.with {
            providers.push(pool.class_name(*idx)?);
        }
        builder = builder.provide(service, providers)?;
    }

    if let Some(idx) = main_class_index {
        builder = builder.main_class(pool.class_name(idx)?);
    }

    if let Some(raw) = hashes_raw {
        let algorithm = pool.utf8_at(raw.algorithm_index)?;
        let mut entries = BTreeMap::new();
        for entry in raw.entries {
            entries.insert(pool.module_name(entry.module_index)?, entry.digest);
        }
        builder = builder.hashes(algorithm, entries);
    }

    let descriptor = builder.build()?;
    if descriptor.name() != BASE_MODULE && descriptor.requires().is_empty() {
        return Err(DescriptorError::EmptyRequiresTable(module_name));
    }
    Ok(descriptor)
}

fn parse_attribute(name: &str, cursor: &mut std::io::Cursor<Vec<u8>>) -> Result<ParsedAttribute> {
    match name {
        "Module" => Ok(ParsedAttribute::Module(parse_module_attribute(cursor)?)),
        "ConcealedPackages" => {
            let count = read_u16(cursor, "concealed package count")?;
            let mut indices = Vec::with_capacity(count as usize);
            for _ in 0..count {
                indices.push(read_u16(cursor, "concealed package index")?);
            }
            Ok(ParsedAttribute::ConcealedPackages(indices))
        }
        "Version" => Ok(ParsedAttribute::Version(read_u16(cursor, "version index")?)),
        "MainClass" => Ok(ParsedAttribute::MainClass(read_u16(
            cursor,
            "main class index",
        )?)),
        "Hashes" => Ok(ParsedAttribute::Hashes(parse_hashes_attribute(cursor)?)),
        _ => Ok(ParsedAttribute::Unknown),
    }
}

fn parse_hashes_attribute(cursor: &mut std::io::Cursor<Vec<u8>>) -> Result<HashesRaw> {
    let algorithm_index = read_u16(cursor, "hashes algorithm_index")?;
    let count = read_u16(cursor, "hashes count")?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let module_index = read_u16(cursor, "hashes module_index")?;
        let length = read_u16(cursor, "hashes digest length")?;
        let mut digest = vec![0u8; length as usize];
        cursor
            .read_exact(&mut digest)
            .map_err(|_| DescriptorError::Truncated("hashes digest"))?;
        entries.push(HashEntryRaw { module_index, digest });
    }
    Ok(HashesRaw { algorithm_index, entries })
}

fn parse_module_attribute(cursor: &mut std::io::Cursor<Vec<u8>>) -> Result<ModuleAttribute> {
    let name_index = read_u16(cursor, "module name_index")?;
    let flags = ModuleFlags::from_bits_truncate(read_u16(cursor, "module flags")?);
    let version_index = read_u16(cursor, "module version_index")?;

    let requires_count = read_u16(cursor, "requires count")?;
    let mut requires = Vec::with_capacity(requires_count as usize);
    for _ in 0..requires_count {
        requires.push(RequiresRaw {
            index: read_u16(cursor, "requires index")?,
            flags: RequiresFlags::from_bits_truncate(read_u16(cursor, "requires flags")?),
            version_index: read_u16(cursor, "requires version_index")?,
        });
    }

    let exports_count = read_u16(cursor, "exports count")?;
    let mut exports = Vec::with_capacity(exports_count as usize);
    for _ in 0..exports_count {
        let index = read_u16(cursor, "exports index")?;
        let flags = ExportsFlags::from_bits_truncate(read_u16(cursor, "exports flags")?);
        let to_count = read_u16(cursor, "exports to_count")?;
        let mut to = Vec::with_capacity(to_count as usize);
        for _ in 0..to_count {
            to.push(read_u16(cursor, "exports to index")?);
        }
        exports.push(ExportsRaw { index, flags, to });
    }

    let opens_count = read_u16(cursor, "opens count")?;
    let mut opens = Vec::with_capacity(opens_count as usize);
    for _ in 0..opens_count {
        let index = read_u16(cursor, "opens index")?;
        let flags = OpensFlags::from_bits_truncate(read_u16(cursor, "opens flags")?);
        let to_count = read_u16(cursor, "opens to_count")?;
        let mut to = Vec::with_capacity(to_count as usize);
        for _ in 0..to_count {
            to.push(read_u16(cursor, "opens to index")?);
        }
        opens.push(OpensRaw { index, flags, to });
    }

    let uses_count = read_u16(cursor, "uses count")?;
    let mut uses = Vec::with_capacity(uses_count as usize);
    for _ in 0..uses_count {
        uses.push(read_u16(cursor, "uses index")?);
    }

    let provides_count = read_u16(cursor, "provides count")?;
    let mut provides = Vec::with_capacity(provides_count as usize);
    for _ in 0..provides_count {
        let index = read_u16(cursor, "provides index")?;
        let with_count = read_u16(cursor, "provides with_count")?;
        let mut with = Vec::with_capacity(with_count as usize);
        for _ in 0..with_count {
            with.push(read_u16(cursor, "provides with index")?);
        }
        provides.push(ProvidesRaw { index, with });
    }

    Ok(ModuleAttribute {
        name_index,
        flags,
        version_index,
        requires,
        exports,
        opens,
        uses,
        provides,
    })
}

fn read_u16(reader: &mut impl Read, what: &'static str) -> Result<u16> {
    reader
        .read_u16::<BigEndian>()
        .map_err(|_| DescriptorError::Truncated(what))
}

fn read_u32(reader: &mut impl Read, what: &'static str) -> Result<u32> {
    reader
        .read_u32::<BigEndian>()
        .map_err(|_| DescriptorError::Truncated(what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;

    #[test]
    fn decodes_minimal_module() {
        let descriptor = ModuleDescriptor::builder("com.example.app")
            .add_package("com.example.app")
            .build()
            .expect("builds");
        let bytes = encode(&descriptor).expect("encodes");
        let mut cursor = std::io::Cursor::new(bytes);
        let decoded = decode(&mut cursor, &NoPackages).expect("decodes");
        assert_eq!(decoded.name(), "com.example.app");
        assert!(decoded.requires_module(BASE_MODULE));
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; 32];
        let mut cursor = std::io::Cursor::new(bytes);
        let result = decode(&mut cursor, &NoPackages);
        assert!(matches!(result, Err(DescriptorError::BadMagic(0))));
    }

    #[test]
    fn round_trips_requires_exports_provides() {
        let descriptor = ModuleDescriptor::builder("com.example.app")
            .add_package("com.example.app")
            .add_package("com.example.app.impl")
            .require("com.example.api", RequiresFlags::TRANSITIVE, None)
            .expect("ok")
            .export("com.example.app", None, ExportsFlags::empty())
            .use_service("com.example.api.Service")
            .provide(
                "com.example.api.Service",
                vec!["com.example.app.impl.ServiceImpl".to_string()],
            )
            .expect("ok")
            .build()
            .expect("builds");

        let bytes = encode(&descriptor).expect("encodes");
        let mut cursor = std::io::Cursor::new(bytes);
        let decoded = decode(&mut cursor, &NoPackages).expect("decodes");
        assert_eq!(decoded, descriptor);
    }

    #[test]
    fn round_trips_the_hashes_table() {
        let mut entries = BTreeMap::new();
        entries.insert("com.example.api".to_string(), vec![1u8, 2, 3, 4]);
        let descriptor = ModuleDescriptor::builder("com.example.app")
            .add_package("com.example.app")
            .require("com.example.api", RequiresFlags::empty(), None)
            .expect("ok")
            .hashes("SHA-256", entries)
            .build()
            .expect("builds");

        let bytes = encode(&descriptor).expect("encodes");
        let mut cursor = std::io::Cursor::new(bytes);
        let decoded = decode(&mut cursor, &NoPackages).expect("decodes");
        let hashes = decoded.hashes().expect("hashes present");
        assert_eq!(hashes.algorithm, "SHA-256");
        assert_eq!(
            hashes.entries.get("com.example.api"),
            Some(&vec![1u8, 2, 3, 4])
        );
    }
}
