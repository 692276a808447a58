//! Writes a frozen resource pool as a single indexed binary (spec §4.6):
//! header, string table, location table, content blob.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use indexmap::IndexMap;
use modlink_resolve::{Error, Result};
use std::io::Write;

use crate::pool::ResourcePool;

/// Fixed sentinel identifying this workspace's image format.
pub const MAGIC: u32 = 0x4D4C_494D;
/// Format version, written as `(major << 16) | minor`.
pub const VERSION: u32 = (1 << 16) | 0;

/// Byte order an image is written in; fixed per image (spec §4.6).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Endianness {
    Little,
    Big,
}

/// One location-table record.
struct Location {
    module_ref: u32,
    parent_ref: u32,
    base_name_ref: u32,
    extension_ref: u32,
    content_offset: u64,
    content_size: u64,
    uncompressed_size: u64,
    compressor_id: u8,
}

/// Deduplicates strings into a single UTF-8 blob addressed by byte offset.
#[derive(Default)]
struct StringTable {
    blob: Vec<u8>,
    offsets: IndexMap<String, u32>,
}

impl StringTable {
    fn intern(&mut self, value: &str) -> u32 {
        if let Some(offset) = self.offsets.get(value) {
            return *offset;
        }
        let offset = u32::try_from(self.blob.len()).unwrap_or(u32::MAX);
        self.blob.extend_from_slice(value.as_bytes());
        self.blob.push(0);
        self.offsets.insert(value.to_string(), offset);
        offset
    }
}

/// Splits a pool path `/module/a/b/base.ext` into `(module, parent, base,
/// extension)` the way the location table records it.
fn split_path(path: &str) -> (String, String, String, String) {
    let trimmed = path.trim_start_matches('/');
    let mut parts = trimmed.splitn(2, '/');
    let module = parts.next().unwrap_or_default().to_string();
    let rest = parts.next().unwrap_or_default();
    let (parent, file_name) = match rest.rfind('/') {
        Some(idx) => (rest[..idx].to_string(), rest[idx + 1..].to_string()),
        None => (String::new(), rest.to_string()),
    };
    let (base, extension) = match file_name.rfind('.') {
        Some(idx) => (file_name[..idx].to_string(), file_name[idx + 1..].to_string()),
        None => (file_name, String::new()),
    };
    (module, parent, base, extension)
}

/// Writes `pool` as a single image to `output`.
///
/// `pool` must be frozen; resources are written in pool iteration order
/// (spec §4.6's resource-ordering rules govern what that order already is
/// by the time the pool reaches the writer).
///
/// # Errors
///
/// Returns [`Error::IoError`] if writing to `output` fails, or
/// [`Error::PluginError`] if the pool isn't frozen (the writer is the last
/// pipeline consumer and must only ever see a finished pool).
pub fn write(pool: &ResourcePool, endianness: Endianness, output: &mut impl Write) -> Result<()> {
    if !pool.is_frozen() {
        return Err(Error::PluginError {
            plugin: "image-writer".to_string(),
            cause: "resource pool must be frozen before writing".to_string(),
        });
    }

    let mut strings = StringTable::default();
    let mut content = Vec::new();
    let mut locations = Vec::new();

    for resource in pool.entries() {
        let (module, parent, base, extension) = split_path(resource.path());
        let content_offset = u64::try_from(content.len()).unwrap_or(u64::MAX);
        content.extend_from_slice(resource.bytes());
        locations.push(Location {
            module_ref: strings.intern(&module),
            parent_ref: strings.intern(&parent),
            base_name_ref: strings.intern(&base),
            extension_ref: strings.intern(&extension),
            content_offset,
            content_size: resource.bytes().len() as u64,
            uncompressed_size: resource.uncompressed_size() as u64,
            compressor_id: resource.compressor().id(),
        });
    }

    // Per-module package-list section: module name -> sorted sub-path
    // prefixes one level deep, for "which module owns package p" queries.
    let mut packages: IndexMap<String, Vec<String>> = IndexMap::new();
    for resource in pool.entries() {
        let (module, parent, ..) = split_path(resource.path());
        if parent.is_empty() {
            continue;
        }
        let package = parent.replace('/', ".");
        let list = packages.entry(module).or_default();
        if !list.contains(&package) {
            list.push(package);
        }
    }
    let mut package_section = Vec::new();
    for (module, mut owned) in packages {
        owned.sort();
        match endianness {
            Endianness::Little => write_package_entry::<LittleEndian>(&mut package_section, &mut strings, &module, &owned),
            Endianness::Big => write_package_entry::<BigEndian>(&mut package_section, &mut strings, &module, &owned),
        }
    }

    let mut location_table = Vec::new();
    for location in &locations {
        match endianness {
            Endianness::Little => write_location::<LittleEndian>(&mut location_table, location),
            Endianness::Big => write_location::<BigEndian>(&mut location_table, location),
        }
    }

    let locations_offset = 32u64;
    let strings_offset = locations_offset + location_table.len() as u64;
    let packages_offset = strings_offset + strings.blob.len() as u64;
    let content_offset = packages_offset + package_section.len() as u64;
    let table_length = content_offset - locations_offset;

    let resource_count = u32::try_from(locations.len()).unwrap_or(u32::MAX);
    let header_args = HeaderArgs {
        endianness,
        resource_count,
        table_length,
        locations_offset,
        strings_offset,
    };
    match endianness {
        Endianness::Little => write_header::<LittleEndian>(output, &header_args),
        Endianness::Big => write_header::<BigEndian>(output, &header_args),
    }
    .map_err(io_error)?;

    output.write_all(&location_table).map_err(io_error)?;
    output.write_all(&strings.blob).map_err(io_error)?;
    output.write_all(&package_section).map_err(io_error)?;
    output.write_all(&content).map_err(io_error)?;
    Ok(())
}

fn io_error(cause: std::io::Error) -> Error {
    Error::IoError {
        path: "<image output>".to_string(),
        cause: cause.to_string(),
    }
}

struct HeaderArgs {
    endianness: Endianness,
    resource_count: u32,
    table_length: u64,
    locations_offset: u64,
    strings_offset: u64,
}

fn write_header<T: ByteOrder>(output: &mut impl Write, args: &HeaderArgs) -> std::io::Result<()> {
    let mut header = [0u8; 32];
    T::write_u32(&mut header[0..4], MAGIC);
    T::write_u32(&mut header[4..8], VERSION);
    let endian_flag = u32::from(args.endianness == Endianness::Big);
    T::write_u32(&mut header[8..12], endian_flag);
    T::write_u32(&mut header[12..16], args.resource_count);
    T::write_u32(&mut header[16..20], u32::try_from(args.table_length).unwrap_or(u32::MAX));
    T::write_u32(&mut header[20..24], u32::try_from(args.locations_offset).unwrap_or(u32::MAX));
    T::write_u32(&mut header[24..28], u32::try_from(args.strings_offset).unwrap_or(u32::MAX));
    output.write_all(&header)
}

fn write_location<T: ByteOrder>(out: &mut Vec<u8>, location: &Location) {
    let mut buf = [0u8; 40];
    T::write_u32(&mut buf[0..4], location.module_ref);
    T::write_u32(&mut buf[4..8], location.parent_ref);
    T::write_u32(&mut buf[8..12], location.base_name_ref);
    T::write_u32(&mut buf[12..16], location.extension_ref);
    T::write_u64(&mut buf[16..24], location.content_offset);
    T::write_u64(&mut buf[24..32], location.content_size);
    T::write_u64(&mut buf[32..40], location.uncompressed_size);
    out.extend_from_slice(&buf);
    out.push(location.compressor_id);
}

fn write_package_entry<T: ByteOrder>(
    out: &mut Vec<u8>,
    strings: &mut StringTable,
    module: &str,
    packages: &[String],
) {
    let module_ref = strings.intern(module);
    let mut header = [0u8; 8];
    T::write_u32(&mut header[0..4], module_ref);
    T::write_u32(&mut header[4..8], u32::try_from(packages.len()).unwrap_or(u32::MAX));
    out.extend_from_slice(&header);
    for package in packages {
        let package_ref = strings.intern(package);
        let mut entry = [0u8; 4];
        T::write_u32(&mut entry, package_ref);
        out.extend_from_slice(&entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Resource;

    #[test]
    fn writes_a_header_with_the_magic_and_resource_count() {
        let mut pool = ResourcePool::new();
        pool.add(Resource::new("app", "pkg/A.class", b"body".as_slice())).expect("adds");
        pool.freeze();

        let mut buf = Vec::new();
        write(&pool, Endianness::Little, &mut buf).expect("writes");

        assert_eq!(LittleEndian::read_u32(&buf[0..4]), MAGIC);
        assert_eq!(LittleEndian::read_u32(&buf[12..16]), 1);
        assert!(buf.ends_with(b"body"));
    }

    #[test]
    fn rejects_an_unfrozen_pool() {
        let pool = ResourcePool::new();
        let mut buf = Vec::new();
        assert!(write(&pool, Endianness::Little, &mut buf).is_err());
    }
}
