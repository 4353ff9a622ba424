//! Annotations and annotation element values.

use serde::{Deserialize, Serialize};

use crate::constant_pool::{ConstantPool, ConstantValue};
use crate::error::ClassFileError;
use crate::reader::ByteReader;

/// Deepest nesting of arrays and annotations inside one element value.
pub const MAX_ELEMENT_NESTING: usize = 255;

/// One annotation: its type descriptor and its explicitly given elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Annotation {
    /// Field descriptor of the annotation type, e.g. `Ljava/lang/Deprecated;`.
    pub type_descriptor: String,
    /// `(element name, value)` pairs in declaration order.
    pub elements: Vec<(String, ElementValue)>,
}

impl Annotation {
    /// Creates an annotation with no elements.
    pub fn marker(type_descriptor: impl Into<String>) -> Self {
        Self {
            type_descriptor: type_descriptor.into(),
            elements: Vec::new(),
        }
    }

    /// Adds an element.
    pub fn with_element(mut self, name: impl Into<String>, value: ElementValue) -> Self {
        self.elements.push((name.into(), value));
        self
    }

    /// Returns a copy with elements sorted by name, recursively.
    ///
    /// Element order in the class file carries no meaning, so the canonical
    /// form used for ABI hashing is sorted.
    pub fn canonical(&self) -> Annotation {
        let mut elements: Vec<(String, ElementValue)> = self
            .elements
            .iter()
            .map(|(name, value)| (name.clone(), value.canonical()))
            .collect();
        elements.sort_by(|a, b| a.0.cmp(&b.0));
        Annotation {
            type_descriptor: self.type_descriptor.clone(),
            elements,
        }
    }
}

/// The value of an annotation element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementValue {
    /// A primitive or string constant. `tag` is one of `BCDFIJSZs`.
    Const {
        /// The element tag byte.
        tag: u8,
        /// The constant.
        value: ConstantValue,
    },
    /// An enum constant.
    Enum {
        /// Descriptor of the enum type.
        type_descriptor: String,
        /// Name of the constant.
        name: String,
    },
    /// A class literal, as a return descriptor (`V` for `void.class`).
    Class(String),
    /// A nested annotation.
    Annotation(Annotation),
    /// An array of values.
    Array(Vec<ElementValue>),
}

impl ElementValue {
    /// A `String` element.
    pub fn string(value: impl Into<String>) -> Self {
        let value: String = value.into();
        ElementValue::Const {
            tag: b's',
            value: ConstantValue::String(value.into()),
        }
    }

    /// An `int` element.
    pub fn int(value: i32) -> Self {
        ElementValue::Const {
            tag: b'I',
            value: ConstantValue::Int(value),
        }
    }

    fn canonical(&self) -> ElementValue {
        match self {
            ElementValue::Annotation(a) => ElementValue::Annotation(a.canonical()),
            ElementValue::Array(values) => {
                ElementValue::Array(values.iter().map(ElementValue::canonical).collect())
            }
            other => other.clone(),
        }
    }
}

/// Parses a `RuntimeVisibleAnnotations`-style table.
pub fn parse_annotations(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<Annotation>, ClassFileError> {
    let count = reader.u16()?;
    (0..count).map(|_| parse_annotation(reader, pool)).collect()
}

/// Parses a `RuntimeVisibleParameterAnnotations`-style table.
pub fn parse_parameter_annotations(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<Vec<Annotation>>, ClassFileError> {
    let params = reader.u8()?;
    (0..params)
        .map(|_| parse_annotations(reader, pool))
        .collect()
}

/// Parses a single `annotation` structure.
pub fn parse_annotation(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Annotation, ClassFileError> {
    annotation_at(reader, pool, 0)
}

/// Parses an `element_value` structure.
pub fn parse_element_value(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<ElementValue, ClassFileError> {
    element_value_at(reader, pool, 0)
}

fn annotation_at(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> Result<Annotation, ClassFileError> {
    let type_descriptor = pool.utf8(reader.u16()?)?.to_string();
    let pairs = reader.u16()?;
    let mut elements = Vec::with_capacity(pairs as usize);
    for _ in 0..pairs {
        let name = pool.utf8(reader.u16()?)?.to_string();
        let value = element_value_at(reader, pool, depth)?;
        elements.push((name, value));
    }
    Ok(Annotation {
        type_descriptor,
        elements,
    })
}

fn element_value_at(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> Result<ElementValue, ClassFileError> {
    if depth > MAX_ELEMENT_NESTING {
        return Err(ClassFileError::NestingTooDeep {
            limit: MAX_ELEMENT_NESTING,
        });
    }
    let tag = reader.u8()?;
    let value = match tag {
        b'B' | b'C' | b'I' | b'S' | b'Z' | b'D' | b'F' | b'J' => {
            let index = reader.u16()?;
            let value = pool.constant_value(index)?;
            let matches_tag = matches!(
                (tag, &value),
                (b'B' | b'C' | b'I' | b'S' | b'Z', ConstantValue::Int(_))
                    | (b'D', ConstantValue::Double(_))
                    | (b'F', ConstantValue::Float(_))
                    | (b'J', ConstantValue::Long(_))
            );
            if !matches_tag {
                return Err(ClassFileError::UnexpectedConstant {
                    index,
                    expected: "constant matching the element tag",
                    found: "mismatched constant",
                });
            }
            ElementValue::Const { tag, value }
        }
        b's' => ElementValue::Const {
            tag,
            value: ConstantValue::String(pool.java_string(reader.u16()?)?.clone()),
        },
        b'e' => ElementValue::Enum {
            type_descriptor: pool.utf8(reader.u16()?)?.to_string(),
            name: pool.utf8(reader.u16()?)?.to_string(),
        },
        b'c' => ElementValue::Class(pool.utf8(reader.u16()?)?.to_string()),
        b'@' => ElementValue::Annotation(annotation_at(reader, pool, depth + 1)?),
        b'[' => {
            let count = reader.u16()?;
            let values = (0..count)
                .map(|_| element_value_at(reader, pool, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            ElementValue::Array(values)
        }
        _ => return Err(ClassFileError::UnknownElementTag { tag }),
    };
    Ok(value)
}
