//! The constant pool of a binary module declaration.
//!
//! Mirrors the layout described in spec §4.1/§6: a 1-based array, sized by
//! an unsigned 16-bit count, of tagged records. `Long`/`Double` analogues
//! are two-slot entries that consume two indices even though only the
//! first slot holds data.

use crate::error::{DescriptorError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

/// A single constant-pool entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    StringRef { index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
    /// The phantom second slot consumed by a preceding `Long`/`Double`.
    Unusable,
}

/// A parsed constant pool, addressable by its 1-based indices.
#[derive(Clone, Debug, Default)]
pub struct ConstantPool {
    entries: Vec<Option<Constant>>,
}

impl ConstantPool {
    /// Parses `count - 1` entries from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Truncated`] or [`DescriptorError::BadConstantPoolIndex`]
    /// on malformed input.
    pub fn read(reader: &mut impl Read, count: u16) -> Result<Self> {
        let mut entries: Vec<Option<Constant>> = vec![None];
        let mut index = 1usize;
        while index < count as usize {
            let constant = read_constant(reader)?;
            let is_wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
            entries.push(Some(constant));
            index += 1;
            if is_wide {
                entries.push(Some(Constant::Unusable));
                index += 1;
            }
        }
        Ok(Self { entries })
    }

    /// Looks up the entry at `index`.
    #[must_use]
    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(index as usize).and_then(|e| e.as_ref())
    }

    fn utf8(&self, index: u16) -> Result<String> {
        match self.get(index) {
            Some(Constant::Utf8(s)) => Ok(s.clone()),
            _ => Err(DescriptorError::BadConstantPoolIndex {
                index,
                reason: "expected Utf8",
            }),
        }
    }

    /// Resolves a `Module` constant to its name.
    pub fn module_name(&self, index: u16) -> Result<String> {
        match self.get(index) {
            Some(Constant::Module { name_index }) => self.utf8(*name_index),
            _ => Err(DescriptorError::BadConstantPoolIndex {
                index,
                reason: "expected Module",
            }),
        }
    }

    /// Resolves a `Package` constant to its name.
    pub fn package_name(&self, index: u16) -> Result<String> {
        match self.get(index) {
            Some(Constant::Package { name_index }) => self.utf8(*name_index),
            _ => Err(DescriptorError::BadConstantPoolIndex {
                index,
                reason: "expected Package",
            }),
        }
    }

    /// Resolves a `Class` constant to its name.
    pub fn class_name(&self, index: u16) -> Result<String> {
        match self.get(index) {
            Some(Constant::Class { name_index }) => self.utf8(*name_index),
            _ => Err(DescriptorError::BadConstantPoolIndex {
                index,
                reason: "expected Class",
            }),
        }
    }

    /// Resolves a raw `Utf8` constant, used for versions and algorithm names.
    pub fn utf8_at(&self, index: u16) -> Result<String> {
        self.utf8(index)
    }
}

fn read_constant(reader: &mut impl Read) -> Result<Constant> {
    let tag = reader
        .read_u8()
        .map_err(|_| DescriptorError::Truncated("constant pool tag"))?;
    let constant = match tag {
        1 => {
            let length = reader
                .read_u16::<BigEndian>()
                .map_err(|_| DescriptorError::Truncated("utf8 length"))?;
            let mut buf = vec![0u8; length as usize];
            reader
                .read_exact(&mut buf)
                .map_err(|_| DescriptorError::Truncated("utf8 bytes"))?;
            Constant::Utf8(String::from_utf8_lossy(&buf).into_owned())
        }
        3 => Constant::Integer(read_i32(reader)?),
        4 => Constant::Float(f32::from_bits(read_u32(reader)?)),
        5 => Constant::Long(read_i64(reader)?),
        6 => Constant::Double(f64::from_bits(read_u64(reader)?)),
        7 => Constant::Class {
            name_index: read_u16(reader)?,
        },
        8 => Constant::StringRef {
            index: read_u16(reader)?,
        },
        9 => Constant::FieldRef {
            class_index: read_u16(reader)?,
            name_and_type_index: read_u16(reader)?,
        },
        10 => Constant::MethodRef {
            class_index: read_u16(reader)?,
            name_and_type_index: read_u16(reader)?,
        },
        11 => Constant::InterfaceMethodRef {
            class_index: read_u16(reader)?,
            name_and_type_index: read_u16(reader)?,
        },
        12 => Constant::NameAndType {
            name_index: read_u16(reader)?,
            descriptor_index: read_u16(reader)?,
        },
        15 => {
            let reference_kind = reader
                .read_u8()
                .map_err(|_| DescriptorError::Truncated("method handle kind"))?;
            Constant::MethodHandle {
                reference_kind,
                reference_index: read_u16(reader)?,
            }
        }
        16 => Constant::MethodType {
            descriptor_index: read_u16(reader)?,
        },
        17 => Constant::Dynamic {
            bootstrap_method_attr_index: read_u16(reader)?,
            name_and_type_index: read_u16(reader)?,
        },
        18 => Constant::InvokeDynamic {
            bootstrap_method_attr_index: read_u16(reader)?,
            name_and_type_index: read_u16(reader)?,
        },
        19 => Constant::Module {
            name_index: read_u16(reader)?,
        },
        20 => Constant::Package {
            name_index: read_u16(reader)?,
        },
        other => {
            return Err(DescriptorError::BadConstantPoolIndex {
                index: u16::from(other),
                reason: "unknown constant tag",
            });
        }
    };
    Ok(constant)
}

fn read_u16(reader: &mut impl Read) -> Result<u16> {
    reader
        .read_u16::<BigEndian>()
        .map_err(|_| DescriptorError::Truncated("u16"))
}

fn read_u32(reader: &mut impl Read) -> Result<u32> {
    reader
        .read_u32::<BigEndian>()
        .map_err(|_| DescriptorError::Truncated("u32"))
}

fn read_i32(reader: &mut impl Read) -> Result<i32> {
    reader
        .read_i32::<BigEndian>()
        .map_err(|_| DescriptorError::Truncated("i32"))
}

fn read_i64(reader: &mut impl Read) -> Result<i64> {
    reader
        .read_i64::<BigEndian>()
        .map_err(|_| DescriptorError::Truncated("i64"))
}

fn read_u64(reader: &mut impl Read) -> Result<u64> {
    reader
        .read_u64::<BigEndian>()
        .map_err(|_| DescriptorError::Truncated("u64"))
}
