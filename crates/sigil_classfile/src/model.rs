//! Owned model of a parsed class file.

use serde::{Deserialize, Serialize};

use crate::access::AccessFlags;
use crate::annotation::{Annotation, ElementValue};
use crate::constant_pool::ConstantValue;

/// A decoded class file.
///
/// Names are internal binary names (`com/example/Outer$Inner`). Only the
/// attributes that can affect a binary interface are decoded; everything
/// else, including method bodies, is kept as opaque [`RawAttribute`]s.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassFile {
    /// Minor version.
    pub minor_version: u16,
    /// Major version.
    pub major_version: u16,
    /// Class access flags.
    pub access: AccessFlags,
    /// This class's binary name.
    pub name: String,
    /// Superclass binary name; `None` only for `java/lang/Object` and module descriptors.
    pub super_name: Option<String>,
    /// Directly implemented interfaces, in declaration order.
    pub interfaces: Vec<String>,
    /// Declared fields.
    pub fields: Vec<Member>,
    /// Declared methods, including constructors and `<clinit>`.
    pub methods: Vec<Member>,
    /// Class-level attributes.
    pub attributes: Attributes,
}

impl ClassFile {
    /// Creates a public class extending `java/lang/Object`, targeting Java 8.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            minor_version: 0,
            major_version: 52,
            access: AccessFlags::PUBLIC | AccessFlags::SUPER,
            name: name.into(),
            super_name: Some("java/lang/Object".to_string()),
            ..Default::default()
        }
    }

    /// Package portion of the binary name (`com/example`), empty for the default package.
    pub fn package(&self) -> &str {
        self.name.rsplit_once('/').map_or("", |(pkg, _)| pkg)
    }

    /// `true` when the class is marked synthetic by flag or attribute.
    pub fn is_synthetic(&self) -> bool {
        self.access.is_synthetic() || self.attributes.synthetic
    }

    /// `true` for a `package-info` class.
    pub fn is_package_info(&self) -> bool {
        self.name == "package-info" || self.name.ends_with("/package-info")
    }
}

/// A field or method.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Member {
    /// Member access flags.
    pub access: AccessFlags,
    /// Simple name (`<init>` for constructors).
    pub name: String,
    /// Field or method descriptor.
    pub descriptor: String,
    /// Member-level attributes.
    pub attributes: Attributes,
}

impl Member {
    /// Creates a member with no attributes.
    pub fn new(access: AccessFlags, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            attributes: Attributes::default(),
        }
    }

    /// `true` when the member is marked synthetic by flag or attribute.
    pub fn is_synthetic(&self) -> bool {
        self.access.is_synthetic() || self.attributes.synthetic
    }
}

/// Decoded attributes of a class, field, or method.
///
/// Which fields are populated depends on where the attributes were found:
/// `constant_value` only on fields, `exceptions` and the parameter and default
/// annotations only on methods, `inner_classes` only on classes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes {
    /// `Signature`: generic signature.
    pub signature: Option<String>,
    /// `RuntimeVisibleAnnotations`.
    pub visible_annotations: Vec<Annotation>,
    /// `RuntimeInvisibleAnnotations`.
    pub invisible_annotations: Vec<Annotation>,
    /// `Deprecated` is present.
    pub deprecated: bool,
    /// `Synthetic` is present.
    pub synthetic: bool,
    /// `ConstantValue` of a field.
    pub constant_value: Option<ConstantValue>,
    /// `Exceptions`: declared thrown types of a method.
    pub exceptions: Vec<String>,
    /// `RuntimeVisibleParameterAnnotations`, one list per parameter.
    pub visible_parameter_annotations: Vec<Vec<Annotation>>,
    /// `RuntimeInvisibleParameterAnnotations`, one list per parameter.
    pub invisible_parameter_annotations: Vec<Vec<Annotation>>,
    /// `AnnotationDefault` of an annotation-interface method.
    pub annotation_default: Option<ElementValue>,
    /// `InnerClasses` entries of a class.
    pub inner_classes: Vec<InnerClass>,
    /// Attributes that are not decoded (`Code`, `SourceFile`, ...).
    pub other: Vec<RawAttribute>,
}

/// One entry of the `InnerClasses` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InnerClass {
    /// Binary name of the nested class.
    pub inner_name: String,
    /// Binary name of the enclosing class, if it is a member class.
    pub outer_name: Option<String>,
    /// Simple source name, absent for anonymous classes.
    pub simple_name: Option<String>,
    /// Access flags as declared in source.
    pub access: AccessFlags,
}

/// An attribute kept as its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    /// Attribute name.
    pub name: String,
    /// Attribute payload, excluding the name index and length.
    pub data: Vec<u8>,
}

impl RawAttribute {
    /// Creates an opaque attribute.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}
