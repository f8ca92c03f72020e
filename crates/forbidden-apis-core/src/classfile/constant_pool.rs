//! Constant pool decoding, including modified UTF-8 strings.

use super::reader::ClassReader;
use super::ClassParseError;

#[derive(Debug, Clone)]
pub(crate) enum Constant {
    Utf8(String),
    Class {
        name_index: u16,
    },
    String,
    Number,
    FieldRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    MethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType {
        descriptor_index: u16,
    },
    Dynamic,
    InvokeDynamic {
        bootstrap_index: u16,
    },
    Module,
    Package,
    Unusable,
}

/// A symbolic member reference pulled from the pool, in internal form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MemberRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub is_field: bool,
    pub interface: bool,
}

pub(crate) struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    pub(crate) fn parse(reader: &mut ClassReader<'_>) -> Result<Self, ClassParseError> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable); // index 0 unused

        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let length = reader.read_u2()? as usize;
                    let bytes = reader.read_slice(length)?;
                    let text = decode_modified_utf8(bytes).ok_or(ClassParseError::InvalidUtf8 {
                        index: u16::try_from(index).unwrap_or(u16::MAX),
                    })?;
                    Constant::Utf8(text)
                }
                3 | 4 => {
                    reader.skip(4)?;
                    Constant::Number
                }
                5 | 6 => {
                    reader.skip(8)?;
                    entries.push(Constant::Number);
                    index += 1;
                    Constant::Unusable
                }
                7 => Constant::Class {
                    name_index: reader.read_u2()?,
                },
                8 => {
                    reader.read_u2()?;
                    Constant::String
                }
                9..=11 => {
                    let class_index = reader.read_u2()?;
                    let name_and_type_index = reader.read_u2()?;
                    match tag {
                        9 => Constant::FieldRef {
                            class_index,
                            name_and_type_index,
                        },
                        10 => Constant::MethodRef {
                            class_index,
                            name_and_type_index,
                        },
                        _ => Constant::InterfaceMethodRef {
                            class_index,
                            name_and_type_index,
                        },
                    }
                }
                12 => Constant::NameAndType {
                    name_index: reader.read_u2()?,
                    descriptor_index: reader.read_u2()?,
                },
                15 => Constant::MethodHandle {
                    reference_kind: reader.read_u1()?,
                    reference_index: reader.read_u2()?,
                },
                16 => Constant::MethodType {
                    descriptor_index: reader.read_u2()?,
                },
                17 => {
                    reader.skip(4)?;
                    Constant::Dynamic
                }
                18 => {
                    let bootstrap_index = reader.read_u2()?;
                    reader.read_u2()?;
                    Constant::InvokeDynamic { bootstrap_index }
                }
                19 => {
                    reader.read_u2()?;
                    Constant::Module
                }
                20 => {
                    reader.read_u2()?;
                    Constant::Package
                }
                other => return Err(ClassParseError::UnsupportedConstant { tag: other }),
            };

            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    pub(crate) fn get(&self, index: u16) -> Result<&Constant, ClassParseError> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(ClassParseError::InvalidConstantIndex { index }),
            Some(entry) => Ok(entry),
        }
    }

    pub(crate) fn utf8(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    /// Internal-form class name (`java/lang/String`, or an array descriptor).
    pub(crate) fn class_name(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    pub(crate) fn name_and_type(&self, index: u16) -> Result<(&str, &str), ClassParseError> {
        match self.get(index)? {
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    pub(crate) fn member_ref(&self, index: u16) -> Result<MemberRef, ClassParseError> {
        let (class_index, nat_index, is_field, interface) = match self.get(index)? {
            Constant::FieldRef {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index, true, false),
            Constant::MethodRef {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index, false, false),
            Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index, false, true),
            _ => return Err(ClassParseError::InvalidConstantIndex { index }),
        };
        let owner = self.class_name(class_index)?;
        let (name, descriptor) = self.name_and_type(nat_index)?;
        Ok(MemberRef {
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            is_field,
            interface,
        })
    }
}

/// Decodes the JVM's modified UTF-8: `C0 80` for NUL and surrogate pairs
/// encoded as two three-byte sequences.
pub(crate) fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    if bytes.iter().all(|b| *b != 0 && *b < 0x80) {
        return String::from_utf8(bytes.to_vec()).ok();
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = u16::from(bytes[i]);
        if b0 & 0x80 == 0 {
            units.push(b0);
            i += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = u16::from(*bytes.get(i + 1)?);
            if b1 & 0xC0 != 0x80 {
                return None;
            }
            units.push(((b0 & 0x1F) << 6) | (b1 & 0x3F));
            i += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = u16::from(*bytes.get(i + 1)?);
            let b2 = u16::from(*bytes.get(i + 2)?);
            if b1 & 0xC0 != 0x80 || b2 & 0xC0 != 0x80 {
                return None;
            }
            units.push(((b0 & 0x0F) << 12) | ((b1 & 0x3F) << 6) | (b2 & 0x3F));
            i += 3;
        } else {
            return None;
        }
    }
    String::from_utf16(&units).ok()
}
