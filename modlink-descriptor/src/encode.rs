//! Encodes a [`ModuleDescriptor`] back to the binary wire format.
//!
//! This exists primarily to support the round-trip property in spec §8
//! (`decode(encode(d)) = d`); nothing in the resolver pipeline depends on
//! it, since descriptors normally arrive already-decoded from an artifact
//! finder.

use crate::decode::MAGIC;
use crate::descriptor::ModuleDescriptor;
use crate::error::Result;
use byteorder::{BigEndian, WriteBytesExt};
use std::collections::HashMap;
use std::io::Write;

#[derive(Default)]
struct PoolBuilder {
    entries: Vec<Vec<u8>>,
    utf8: HashMap<String, u16>,
    class: HashMap<String, u16>,
    module: HashMap<String, u16>,
    package: HashMap<String, u16>,
}

impl PoolBuilder {
    fn push(&mut self, bytes: Vec<u8>) -> u16 {
        self.entries.push(bytes);
        u16::try_from(self.entries.len()).expect("constant pool fits in u16")
    }

    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(&idx) = self.utf8.get(value) {
            return idx;
        }
        let mut bytes = vec![1u8];
        bytes
            .write_u16::<BigEndian>(u16::try_from(value.len()).expect("utf8 length fits in u16"))
            .expect("write to Vec never fails");
        bytes.extend_from_slice(value.as_bytes());
        let idx = self.push(bytes);
        self.utf8.insert(value.to_string(), idx);
        idx
    }

    fn class(&mut self, name: &str) -> u16 {
        if let Some(&idx) = self.class.get(name) {
            return idx;
        }
        let name_index = self.utf8(name);
        let mut bytes = vec![7u8];
        bytes.write_u16::<BigEndian>(name_index).expect("infallible");
        let idx = self.push(bytes);
        self.class.insert(name.to_string(), idx);
        idx
    }

    fn module(&mut self, name: &str) -> u16 {
        if let Some(&idx) = self.module.get(name) {
            return idx;
        }
        let name_index = self.utf8(name);
        let mut bytes = vec![19u8];
        bytes.write_u16::<BigEndian>(name_index).expect("infallible");
        let idx = self.push(bytes);
        self.module.insert(name.to_string(), idx);
        idx
    }

    fn package(&mut self, name: &str) -> u16 {
        if let Some(&idx) = self.package.get(name) {
            return idx;
        }
        let name_index = self.utf8(name);
        let mut bytes = vec![20u8];
        bytes.write_u16::<BigEndian>(name_index).expect("infallible");
        let idx = self.push(bytes);
        self.package.insert(name.to_string(), idx);
        idx
    }

    fn count(&self) -> u16 {
        u16::try_from(self.entries.len() + 1).expect("constant pool fits in u16")
    }

    fn write(&self, out: &mut Vec<u8>) {
        for entry in &self.entries {
            out.extend_from_slice(entry);
        }
    }
}

/// Encodes `descriptor` into the binary wire format documented in spec §6.
///
/// # Errors
///
/// Never fails today; returns `Result` for symmetry with [`crate::decode::decode`]
/// and to leave room for future size-limit checks.
pub fn encode(descriptor: &ModuleDescriptor) -> Result<Vec<u8>> {
    let mut pool = PoolBuilder::default();

    let this_class_name = format!("{}/module-info", descriptor.name());
    let this_class = pool.class(&this_class_name);
    let module_name_const = pool.module(descriptor.name());
    let version_index = descriptor
        .version()
        .map(|v| pool.utf8(v.as_str()))
        .unwrap_or(0);

    let mut requires_bytes = Vec::new();
    requires_bytes
        .write_u16::<BigEndian>(u16::try_from(descriptor.requires().len()).expect("fits"))
        .expect("infallible");
    for requires in descriptor.requires() {
        let index = pool.module(&requires.name);
        let version_idx = requires
            .compiled_version
            .as_ref()
            .map(|v| pool.utf8(v))
            .unwrap_or(0);
        requires_bytes.write_u16::<BigEndian>(index).expect("infallible");
        requires_bytes
            .write_u16::<BigEndian>(requires.flags.bits())
            .expect("infallible");
        requires_bytes
            .write_u16::<BigEndian>(version_idx)
            .expect("infallible");
    }

    let mut exports_bytes = Vec::new();
    exports_bytes
        .write_u16::<BigEndian>(u16::try_from(descriptor.exports().len()).expect("fits"))
        .expect("infallible");
    for export in descriptor.exports() {
        let index = pool.package(&export.package);
        exports_bytes.write_u16::<BigEndian>(index).expect("infallible");
        exports_bytes
            .write_u16::<BigEndian>(export.flags.bits())
            .expect("infallible");
        match &export.targets {
            None => exports_bytes.write_u16::<BigEndian>(0).expect("infallible"),
            Some(targets) => {
                exports_bytes
                    .write_u16::<BigEndian>(u16::try_from(targets.len()).expect("fits"))
                    .expect("infallible");
                for target in targets {
                    let idx = pool.module(target);
                    exports_bytes.write_u16::<BigEndian>(idx).expect("infallible");
                }
            }
        }
    }

    let mut opens_bytes = Vec::new();
    opens_bytes
        .write_u16::<BigEndian>(u16::try_from(descriptor.opens().len()).expect("fits"))
        .expect("infallible");
    for open in descriptor.opens() {
        let index = pool.package(&open.package);
        opens_bytes.write_u16::<BigEndian>(index).expect("infallible");
        opens_bytes
            .write_u16::<BigEndian>(open.flags.bits())
            .expect("infallible");
        match &open.targets {
            None => opens_bytes.write_u16::<BigEndian>(0).expect("infallible"),
            Some(targets) => {
                opens_bytes
                    .write_u16::<BigEndian>(u16::try_from(targets.len()).expect("fits"))
                    .expect("infallible");
                for target in targets {
                    let idx = pool.module(target);
                    opens_bytes.write_u16::<BigEndian>(idx).expect("infallible");
                }
            }
        }
    }

    let mut uses_bytes = Vec::new();
    uses_bytes
        .write_u16::<BigEndian>(u16::try_from(descriptor.uses().len()).expect("fits"))
        .expect("infallible");
    for service in descriptor.uses() {
        let idx = pool.class(service);
        uses_bytes.write_u16::<BigEndian>(idx).expect("infallible");
    }

    let mut provides_bytes = Vec::new();
    provides_bytes
        .write_u16::<BigEndian>(u16::try_from(descriptor.provides().len()).expect("fits"))
        .expect("infallible");
    for provides in descriptor.provides() {
        let index = pool.class(&provides.service);
        provides_bytes.write_u16::<BigEndian>(index).expect("infallible");
        provides_bytes
            .write_u16::<BigEndian>(u16::try_from(provides.providers.len()).expect("fits"))
            .expect("infallible");
        for provider in &provides.providers {
            let idx = pool.class(provider);
            provides_bytes.write_u16::<BigEndian>(idx).expect("infallible");
        }
    }

    let mut module_attr_payload = Vec::new();
    module_attr_payload
        .write_u16::<BigEndian>(module_name_const)
        .expect("infallible");
    module_attr_payload
        .write_u16::<BigEndian>(descriptor.flags().bits())
        .expect("infallible");
    module_attr_payload
        .write_u16::<BigEndian>(version_index)
        .expect("infallible");
    module_attr_payload.extend_from_slice(&requires_bytes);
    module_attr_payload.extend_from_slice(&exports_bytes);
    module_attr_payload.extend_from_slice(&opens_bytes);
    module_attr_payload.extend_from_slice(&uses_bytes);
    module_attr_payload.extend_from_slice(&provides_bytes);

    let mut concealed_payload = Vec::new();
    concealed_payload
        .write_u16::<BigEndian>(u16::try_from(descriptor.packages().len()).expect("fits"))
        .expect("infallible");
    for package in descriptor.packages() {
        let idx = pool.package(package);
        concealed_payload.write_u16::<BigEndian>(idx).expect("infallible");
    }

    let mut attributes: Vec<(String, Vec<u8>)> = vec![
        ("Module".to_string(), module_attr_payload),
        ("ConcealedPackages".to_string(), concealed_payload),
    ];
    if let Some(main_class) = descriptor.main_class() {
        let idx = pool.class(main_class);
        let mut payload = Vec::new();
        payload.write_u16::<BigEndian>(idx).expect("infallible");
        attributes.push(("MainClass".to_string(), payload));
    }
    if let Some(hashes) = descriptor.hashes() {
        let algorithm_index = pool.utf8(&hashes.algorithm);
        let mut payload = Vec::new();
        payload
            .write_u16::<BigEndian>(algorithm_index)
            .expect("infallible");
        payload
            .write_u16::<BigEndian>(u16::try_from(hashes.entries.len()).expect("fits"))
            .expect("infallible");
        for (name, digest) in &hashes.entries {
            let module_index = pool.module(name);
            payload
                .write_u16::<BigEndian>(module_index)
                .expect("infallible");
            payload
                .write_u16::<BigEndian>(u16::try_from(digest.len()).expect("fits"))
                .expect("infallible");
            payload.extend_from_slice(digest);
        }
        attributes.push(("Hashes".to_string(), payload));
    }

    // Attribute name constants must be interned before we know the final
    // pool contents, so resolve them last and rebuild with final indices.
    let mut attr_name_indices = Vec::with_capacity(attributes.len());
    for (name, _) in &attributes {
        attr_name_indices.push(pool.utf8(name));
    }

    let mut out = Vec::new();
    out.write_u32::<BigEndian>(MAGIC).expect("infallible");
    out.write_u16::<BigEndian>(0).expect("infallible"); // minor
    out.write_u16::<BigEndian>(crate::decode::MIN_MAJOR_VERSION)
        .expect("infallible");
    out.write_u16::<BigEndian>(pool.count()).expect("infallible");
    pool.write(&mut out);

    out.write_u16::<BigEndian>(0x8000).expect("infallible"); // ACC_MODULE
    out.write_u16::<BigEndian>(this_class).expect("infallible");
    out.write_u16::<BigEndian>(0).expect("infallible"); // super_class
    out.write_u16::<BigEndian>(0).expect("infallible"); // interfaces
    out.write_u16::<BigEndian>(0).expect("infallible"); // fields
    out.write_u16::<BigEndian>(0).expect("infallible"); // methods

    out.write_u16::<BigEndian>(u16::try_from(attributes.len()).expect("fits"))
        .expect("infallible");
    for ((_, payload), name_index) in attributes.iter().zip(attr_name_indices) {
        out.write_u16::<BigEndian>(name_index).expect("infallible");
        out.write_u32::<BigEndian>(u32::try_from(payload.len()).expect("fits"))
            .expect("infallible");
        out.write_all(payload).expect("infallible");
    }

    Ok(out)
}
