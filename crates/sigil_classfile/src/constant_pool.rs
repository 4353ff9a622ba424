//! The class-file constant pool and modified UTF-8 handling.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ClassFileError;
use crate::reader::ByteReader;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELD_REF: u8 = 9;
const TAG_METHOD_REF: u8 = 10;
const TAG_INTERFACE_METHOD_REF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// A single constant pool entry.
///
/// Floating-point constants are kept as raw bits so that entries can be
/// compared and hashed exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// `CONSTANT_Utf8`.
    Utf8(JavaString),
    /// `CONSTANT_Integer`.
    Integer(i32),
    /// `CONSTANT_Float`, as IEEE-754 bits.
    Float(u32),
    /// `CONSTANT_Long`. Occupies two slots.
    Long(i64),
    /// `CONSTANT_Double`, as IEEE-754 bits. Occupies two slots.
    Double(u64),
    /// `CONSTANT_Class`, pointing at a `Utf8` name.
    Class(u16),
    /// `CONSTANT_String`, pointing at a `Utf8` value.
    String(u16),
    /// `CONSTANT_Fieldref`.
    FieldRef {
        /// Owning class entry.
        class: u16,
        /// `NameAndType` entry.
        name_and_type: u16,
    },
    /// `CONSTANT_Methodref`.
    MethodRef {
        /// Owning class entry.
        class: u16,
        /// `NameAndType` entry.
        name_and_type: u16,
    },
    /// `CONSTANT_InterfaceMethodref`.
    InterfaceMethodRef {
        /// Owning class entry.
        class: u16,
        /// `NameAndType` entry.
        name_and_type: u16,
    },
    /// `CONSTANT_NameAndType`.
    NameAndType {
        /// `Utf8` name entry.
        name: u16,
        /// `Utf8` descriptor entry.
        descriptor: u16,
    },
    /// `CONSTANT_MethodHandle`.
    MethodHandle {
        /// Reference kind (1..=9).
        kind: u8,
        /// Referenced member entry.
        reference: u16,
    },
    /// `CONSTANT_MethodType`, pointing at a `Utf8` descriptor.
    MethodType(u16),
    /// `CONSTANT_Dynamic`.
    Dynamic {
        /// Bootstrap method table index.
        bootstrap: u16,
        /// `NameAndType` entry.
        name_and_type: u16,
    },
    /// `CONSTANT_InvokeDynamic`.
    InvokeDynamic {
        /// Bootstrap method table index.
        bootstrap: u16,
        /// `NameAndType` entry.
        name_and_type: u16,
    },
    /// `CONSTANT_Module`, pointing at a `Utf8` name.
    Module(u16),
    /// `CONSTANT_Package`, pointing at a `Utf8` name.
    Package(u16),
}

impl Constant {
    /// Human-readable kind name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Constant::Utf8(_) => "Utf8",
            Constant::Integer(_) => "Integer",
            Constant::Float(_) => "Float",
            Constant::Long(_) => "Long",
            Constant::Double(_) => "Double",
            Constant::Class(_) => "Class",
            Constant::String(_) => "String",
            Constant::FieldRef { .. } => "Fieldref",
            Constant::MethodRef { .. } => "Methodref",
            Constant::InterfaceMethodRef { .. } => "InterfaceMethodref",
            Constant::NameAndType { .. } => "NameAndType",
            Constant::MethodHandle { .. } => "MethodHandle",
            Constant::MethodType(_) => "MethodType",
            Constant::Dynamic { .. } => "Dynamic",
            Constant::InvokeDynamic { .. } => "InvokeDynamic",
            Constant::Module(_) => "Module",
            Constant::Package(_) => "Package",
        }
    }

    /// Returns `true` for entries that occupy two pool slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }

    /// The tag byte identifying this entry in the binary format.
    pub fn tag(&self) -> u8 {
        match self {
            Constant::Utf8(_) => TAG_UTF8,
            Constant::Integer(_) => TAG_INTEGER,
            Constant::Float(_) => TAG_FLOAT,
            Constant::Long(_) => TAG_LONG,
            Constant::Double(_) => TAG_DOUBLE,
            Constant::Class(_) => TAG_CLASS,
            Constant::String(_) => TAG_STRING,
            Constant::FieldRef { .. } => TAG_FIELD_REF,
            Constant::MethodRef { .. } => TAG_METHOD_REF,
            Constant::InterfaceMethodRef { .. } => TAG_INTERFACE_METHOD_REF,
            Constant::NameAndType { .. } => TAG_NAME_AND_TYPE,
            Constant::MethodHandle { .. } => TAG_METHOD_HANDLE,
            Constant::MethodType(_) => TAG_METHOD_TYPE,
            Constant::Dynamic { .. } => TAG_DYNAMIC,
            Constant::InvokeDynamic { .. } => TAG_INVOKE_DYNAMIC,
            Constant::Module(_) => TAG_MODULE,
            Constant::Package(_) => TAG_PACKAGE,
        }
    }

    /// Writes the entry (tag and payload) in class-file format.
    ///
    /// Fails if a `Utf8` entry encodes to more than 65535 bytes.
    pub fn write(&self, out: &mut Vec<u8>) -> Result<(), ClassFileError> {
        out.push(self.tag());
        match self {
            Constant::Utf8(s) => {
                let encoded = encode_modified_utf8_units(s.utf16_units());
                let len = u16::try_from(encoded.len()).map_err(|_| ClassFileError::TooLarge {
                    context: "Utf8 constant",
                    count: encoded.len(),
                })?;
                out.extend_from_slice(&len.to_be_bytes());
                out.extend_from_slice(&encoded);
            }
            Constant::Integer(v) => out.extend_from_slice(&v.to_be_bytes()),
            Constant::Float(bits) => out.extend_from_slice(&bits.to_be_bytes()),
            Constant::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
            Constant::Double(bits) => out.extend_from_slice(&bits.to_be_bytes()),
            Constant::Class(i)
            | Constant::String(i)
            | Constant::MethodType(i)
            | Constant::Module(i)
            | Constant::Package(i) => out.extend_from_slice(&i.to_be_bytes()),
            Constant::FieldRef {
                class,
                name_and_type,
            }
            | Constant::MethodRef {
                class,
                name_and_type,
            }
            | Constant::InterfaceMethodRef {
                class,
                name_and_type,
            } => {
                out.extend_from_slice(&class.to_be_bytes());
                out.extend_from_slice(&name_and_type.to_be_bytes());
            }
            Constant::NameAndType { name, descriptor } => {
                out.extend_from_slice(&name.to_be_bytes());
                out.extend_from_slice(&descriptor.to_be_bytes());
            }
            Constant::MethodHandle { kind, reference } => {
                out.push(*kind);
                out.extend_from_slice(&reference.to_be_bytes());
            }
            Constant::Dynamic {
                bootstrap,
                name_and_type,
            }
            | Constant::InvokeDynamic {
                bootstrap,
                name_and_type,
            } => {
                out.extend_from_slice(&bootstrap.to_be_bytes());
                out.extend_from_slice(&name_and_type.to_be_bytes());
            }
        }
        Ok(())
    }
}

/// Text of a `Utf8` constant.
///
/// Java strings are sequences of UTF-16 code units and may contain unpaired
/// surrogates, which `String` cannot hold. Such values are kept as raw code
/// units; everything else is stored as ordinary text. Names and descriptors
/// must be valid text, string literals need not be.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JavaString(Repr);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
enum Repr {
    Text(String),
    Utf16(Vec<u16>),
}

impl JavaString {
    /// Builds a string from UTF-16 code units, keeping unpaired surrogates.
    pub fn from_utf16(units: Vec<u16>) -> Self {
        match String::from_utf16(&units) {
            Ok(text) => JavaString(Repr::Text(text)),
            Err(_) => JavaString(Repr::Utf16(units)),
        }
    }

    /// The value as text, or `None` if it contains an unpaired surrogate.
    pub fn as_str(&self) -> Option<&str> {
        match &self.0 {
            Repr::Text(text) => Some(text),
            Repr::Utf16(_) => None,
        }
    }

    /// The UTF-16 code units of the value.
    pub fn utf16_units(&self) -> Vec<u16> {
        match &self.0 {
            Repr::Text(text) => text.encode_utf16().collect(),
            Repr::Utf16(units) => units.clone(),
        }
    }
}

impl From<&str> for JavaString {
    fn from(value: &str) -> Self {
        JavaString(Repr::Text(value.to_string()))
    }
}

impl From<String> for JavaString {
    fn from(value: String) -> Self {
        JavaString(Repr::Text(value))
    }
}

/// Unpaired surrogates display as U+FFFD.
impl fmt::Display for JavaString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Text(text) => f.write_str(text),
            Repr::Utf16(units) => {
                let lossy: String = char::decode_utf16(units.iter().copied())
                    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect();
                f.write_str(&lossy)
            }
        }
    }
}

/// A loadable constant as it appears in a `ConstantValue` attribute or an
/// annotation element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstantValue {
    /// An `int`-family value (also `byte`, `char`, `short`, `boolean`).
    Int(i32),
    /// A `float`, as IEEE-754 bits.
    Float(u32),
    /// A `long`.
    Long(i64),
    /// A `double`, as IEEE-754 bits.
    Double(u64),
    /// A string literal.
    String(JavaString),
}

/// The parsed constant pool of one class file.
///
/// Slot 0 and the second slot of every long/double entry are empty, so
/// indices from the class file can be used directly.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Option<Constant>>,
}

impl ConstantPool {
    /// Parses `constant_pool_count - 1` entries from the reader.
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self, ClassFileError> {
        let count = reader.u16()?;
        let mut entries: Vec<Option<Constant>> = Vec::with_capacity(count as usize);
        entries.push(None);

        while entries.len() < count as usize {
            let index = entries.len() as u16;
            let tag = reader.u8()?;
            let constant = match tag {
                TAG_UTF8 => {
                    let len = reader.u16()? as usize;
                    let raw = reader.bytes(len)?;
                    let units =
                        decode_modified_utf8(raw).ok_or(ClassFileError::InvalidUtf8 { index })?;
                    Constant::Utf8(JavaString::from_utf16(units))
                }
                TAG_INTEGER => Constant::Integer(reader.u32()? as i32),
                TAG_FLOAT => Constant::Float(reader.u32()?),
                TAG_LONG => Constant::Long(reader.u64()? as i64),
                TAG_DOUBLE => Constant::Double(reader.u64()?),
                TAG_CLASS => Constant::Class(reader.u16()?),
                TAG_STRING => Constant::String(reader.u16()?),
                TAG_FIELD_REF => Constant::FieldRef {
                    class: reader.u16()?,
                    name_and_type: reader.u16()?,
                },
                TAG_METHOD_REF => Constant::MethodRef {
                    class: reader.u16()?,
                    name_and_type: reader.u16()?,
                },
                TAG_INTERFACE_METHOD_REF => Constant::InterfaceMethodRef {
                    class: reader.u16()?,
                    name_and_type: reader.u16()?,
                },
                TAG_NAME_AND_TYPE => Constant::NameAndType {
                    name: reader.u16()?,
                    descriptor: reader.u16()?,
                },
                TAG_METHOD_HANDLE => Constant::MethodHandle {
                    kind: reader.u8()?,
                    reference: reader.u16()?,
                },
                TAG_METHOD_TYPE => Constant::MethodType(reader.u16()?),
                TAG_DYNAMIC => Constant::Dynamic {
                    bootstrap: reader.u16()?,
                    name_and_type: reader.u16()?,
                },
                TAG_INVOKE_DYNAMIC => Constant::InvokeDynamic {
                    bootstrap: reader.u16()?,
                    name_and_type: reader.u16()?,
                },
                TAG_MODULE => Constant::Module(reader.u16()?),
                TAG_PACKAGE => Constant::Package(reader.u16()?),
                _ => return Err(ClassFileError::UnknownConstantTag { tag, index }),
            };

            let wide = constant.is_wide();
            entries.push(Some(constant));
            if wide {
                // A long or double in the last slot would spill past the declared count.
                if entries.len() >= count as usize {
                    return Err(ClassFileError::BadConstantIndex { index });
                }
                entries.push(None);
            }
        }

        Ok(Self { entries })
    }

    /// Number of slots, including the unused slot 0.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the pool declares no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Looks up an entry, failing on unusable indices.
    pub fn get(&self, index: u16) -> Result<&Constant, ClassFileError> {
        self.entries
            .get(index as usize)
            .and_then(Option::as_ref)
            .ok_or(ClassFileError::BadConstantIndex { index })
    }

    fn unexpected(index: u16, expected: &'static str, found: &Constant) -> ClassFileError {
        ClassFileError::UnexpectedConstant {
            index,
            expected,
            found: found.kind_name(),
        }
    }

    /// Resolves a `Utf8` entry that must be valid text, such as a name or
    /// descriptor.
    pub fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        self.java_string(index)?
            .as_str()
            .ok_or(ClassFileError::InvalidUtf8 { index })
    }

    /// Resolves a `Utf8` entry holding a string literal.
    pub fn java_string(&self, index: u16) -> Result<&JavaString, ClassFileError> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            other => Err(Self::unexpected(index, "Utf8", other)),
        }
    }

    /// Resolves a `Class` entry to its internal binary name.
    pub fn class_name(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            Constant::Class(name) => self.utf8(*name),
            other => Err(Self::unexpected(index, "Class", other)),
        }
    }

    /// Resolves an optional `Class` entry, where index 0 means "none".
    pub fn optional_class_name(&self, index: u16) -> Result<Option<&str>, ClassFileError> {
        if index == 0 {
            Ok(None)
        } else {
            self.class_name(index).map(Some)
        }
    }

    /// Resolves an optional `Utf8` entry, where index 0 means "none".
    pub fn optional_utf8(&self, index: u16) -> Result<Option<&str>, ClassFileError> {
        if index == 0 {
            Ok(None)
        } else {
            self.utf8(index).map(Some)
        }
    }

    /// Resolves the target of a `ConstantValue` attribute.
    pub fn constant_value(&self, index: u16) -> Result<ConstantValue, ClassFileError> {
        match self.get(index)? {
            Constant::Integer(v) => Ok(ConstantValue::Int(*v)),
            Constant::Float(bits) => Ok(ConstantValue::Float(*bits)),
            Constant::Long(v) => Ok(ConstantValue::Long(*v)),
            Constant::Double(bits) => Ok(ConstantValue::Double(*bits)),
            Constant::String(utf8) => Ok(ConstantValue::String(self.java_string(*utf8)?.clone())),
            other => Err(Self::unexpected(index, "loadable constant", other)),
        }
    }
}

/// Decodes the JVM's modified UTF-8 into UTF-16 code units.
///
/// Returns `None` for byte sequences the format does not allow: raw NUL,
/// four-byte forms and bad continuation bytes. Surrogates are passed through
/// unpaired or not.
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<Vec<u16>> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        match b0 {
            0x01..=0x7F => {
                units.push(b0 as u16);
                i += 1;
            }
            0xC0..=0xDF => {
                let b1 = *bytes.get(i + 1)?;
                if b1 & 0xC0 != 0x80 {
                    return None;
                }
                units.push(((b0 as u16 & 0x1F) << 6) | (b1 as u16 & 0x3F));
                i += 2;
            }
            0xE0..=0xEF => {
                let b1 = *bytes.get(i + 1)?;
                let b2 = *bytes.get(i + 2)?;
                if b1 & 0xC0 != 0x80 || b2 & 0xC0 != 0x80 {
                    return None;
                }
                units.push(
                    ((b0 as u16 & 0x0F) << 12) | ((b1 as u16 & 0x3F) << 6) | (b2 as u16 & 0x3F),
                );
                i += 3;
            }
            _ => return None,
        }
    }
    Some(units)
}

/// Encodes a string as the JVM's modified UTF-8.
pub fn encode_modified_utf8(s: &str) -> Vec<u8> {
    encode_modified_utf8_units(s.encode_utf16().collect())
}

fn encode_modified_utf8_units(units: Vec<u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(units.len());
    for unit in units {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) as u8 & 0x1F));
                out.push(0x80 | (unit as u8 & 0x3F));
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) as u8 & 0x0F));
                out.push(0x80 | ((unit >> 6) as u8 & 0x3F));
                out.push(0x80 | (unit as u8 & 0x3F));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_bytes(entries: &[Constant]) -> Vec<u8> {
        let slots: usize = entries.iter().map(|c| if c.is_wide() { 2 } else { 1 }).sum();
        let mut out = ((slots + 1) as u16).to_be_bytes().to_vec();
        for c in entries {
            c.write(&mut out).unwrap();
        }
        out
    }

    #[test]
    fn parse_and_resolve_class() {
        let bytes = pool_bytes(&[
            Constant::Utf8("com/example/Foo".into()),
            Constant::Class(1),
        ]);
        let pool = ConstantPool::parse(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.class_name(2).unwrap(), "com/example/Foo");
    }

    #[test]
    fn wide_entries_take_two_slots() {
        let bytes = pool_bytes(&[
            Constant::Long(42),
            Constant::Utf8("after".into()),
        ]);
        let pool = ConstantPool::parse(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(pool.constant_value(1).unwrap(), ConstantValue::Long(42));
        assert_eq!(
            pool.get(2).unwrap_err(),
            ClassFileError::BadConstantIndex { index: 2 }
        );
        assert_eq!(pool.utf8(3).unwrap(), "after");
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let bytes = pool_bytes(&[Constant::Integer(5)]);
        let pool = ConstantPool::parse(&mut ByteReader::new(&bytes)).unwrap();
        assert!(matches!(
            pool.utf8(1),
            Err(ClassFileError::UnexpectedConstant {
                expected: "Utf8",
                found: "Integer",
                ..
            })
        ));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let bytes = [0x00, 0x02, 0x02, 0x00];
        let err = ConstantPool::parse(&mut ByteReader::new(&bytes)).unwrap_err();
        assert_eq!(err, ClassFileError::UnknownConstantTag { tag: 2, index: 1 });
    }

    #[test]
    fn index_zero_is_unusable() {
        let bytes = pool_bytes(&[]);
        let pool = ConstantPool::parse(&mut ByteReader::new(&bytes)).unwrap();
        assert!(pool.is_empty());
        assert!(pool.get(0).is_err());
    }

    #[test]
    fn modified_utf8_roundtrip() {
        for s in ["plain", "nul\u{0}inside", "caf\u{e9}", "\u{20ac}", "emoji \u{1F600}"] {
            let encoded = encode_modified_utf8(s);
            assert!(!encoded.contains(&0), "modified UTF-8 never contains raw NUL");
            let units = decode_modified_utf8(&encoded).unwrap();
            assert_eq!(JavaString::from_utf16(units).as_str(), Some(s));
        }
    }

    #[test]
    fn lone_surrogate_is_kept_as_utf16() {
        let units = decode_modified_utf8(&[0x41, 0xED, 0xA0, 0x80]).unwrap();
        assert_eq!(units, vec![0x41, 0xD800]);

        let value = JavaString::from_utf16(units.clone());
        assert_eq!(value.as_str(), None);
        assert_eq!(value.utf16_units(), units);
        assert_eq!(value.to_string(), "A\u{fffd}");
        assert_ne!(value, JavaString::from_utf16(vec![0x41, 0xDC00]));
    }

    #[test]
    fn string_literal_with_lone_surrogate_resolves() {
        let bytes = pool_bytes(&[
            Constant::Utf8(JavaString::from_utf16(vec![0xD800])),
            Constant::String(1),
        ]);
        let pool = ConstantPool::parse(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(
            pool.constant_value(2).unwrap(),
            ConstantValue::String(JavaString::from_utf16(vec![0xD800]))
        );
        assert_eq!(pool.utf8(1), Err(ClassFileError::InvalidUtf8 { index: 1 }));
    }

    #[test]
    fn oversized_utf8_constant_is_rejected() {
        let long = "x".repeat(70_000);
        let mut out = Vec::new();
        assert!(matches!(
            Constant::Utf8(long.as_str().into()).write(&mut out),
            Err(ClassFileError::TooLarge { .. })
        ));
    }

    #[test]
    fn modified_utf8_rejects_invalid() {
        assert!(decode_modified_utf8(&[0x00]).is_none());
        assert!(decode_modified_utf8(&[0xF0, 0x9F, 0x98, 0x80]).is_none());
        assert!(decode_modified_utf8(&[0xC3]).is_none());
        assert!(decode_modified_utf8(&[0xC3, 0x41]).is_none());
    }
}
