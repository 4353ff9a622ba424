//! Binary-interface extraction.
//!
//! The ABI of a class is everything other compiled code can observe: its
//! name, supertypes, generic signature, annotations, and the signatures of
//! its non-private members. Method bodies, private members, synthetic
//! members, and debug metadata are excluded, so recompiling a class with
//! only implementation changes leaves its ABI encoding unchanged.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::access::AccessFlags;
use crate::annotation::{Annotation, ElementValue};
use crate::constant_pool::ConstantValue;
use crate::error::ClassFileError;
use crate::model::{ClassFile, InnerClass, Member};

/// Version of the extraction algorithm. Bump whenever the canonical
/// encoding or the selection rules change.
pub const EXTRACTOR_VERSION: u32 = 1;

const CLASS_ACCESS_MASK: AccessFlags = flags(&[
    AccessFlags::PUBLIC,
    AccessFlags::FINAL,
    AccessFlags::INTERFACE,
    AccessFlags::ABSTRACT,
    AccessFlags::ANNOTATION,
    AccessFlags::ENUM,
]);
const INNER_ACCESS_MASK: AccessFlags = flags(&[
    AccessFlags::PUBLIC,
    AccessFlags::PROTECTED,
    AccessFlags::STATIC,
    AccessFlags::FINAL,
    AccessFlags::INTERFACE,
    AccessFlags::ABSTRACT,
    AccessFlags::ANNOTATION,
    AccessFlags::ENUM,
]);
const FIELD_ACCESS_MASK: AccessFlags = flags(&[
    AccessFlags::PUBLIC,
    AccessFlags::PROTECTED,
    AccessFlags::STATIC,
    AccessFlags::FINAL,
    AccessFlags::VOLATILE,
    AccessFlags::TRANSIENT,
    AccessFlags::ENUM,
]);
const METHOD_ACCESS_MASK: AccessFlags = flags(&[
    AccessFlags::PUBLIC,
    AccessFlags::PROTECTED,
    AccessFlags::STATIC,
    AccessFlags::FINAL,
    AccessFlags::ABSTRACT,
    AccessFlags::VARARGS,
]);

const fn flags(list: &[AccessFlags]) -> AccessFlags {
    let mut bits = 0;
    let mut i = 0;
    while i < list.len() {
        bits |= list[i].0;
        i += 1;
    }
    AccessFlags(bits)
}

/// The externally observable surface of one class.
///
/// Its `bincode` encoding is the canonical ABI byte sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiClass {
    /// Binary name.
    pub name: String,
    /// Class access flags relevant to callers.
    pub access: AccessFlags,
    /// Superclass binary name.
    pub super_name: Option<String>,
    /// Implemented interfaces, in declaration order.
    pub interfaces: Vec<String>,
    /// Generic signature.
    pub signature: Option<String>,
    /// Runtime-visible annotations, canonicalized.
    pub visible_annotations: Vec<Annotation>,
    /// Class-retention annotations, canonicalized.
    pub invisible_annotations: Vec<Annotation>,
    /// Whether the class is marked `@Deprecated`.
    pub deprecated: bool,
    /// Non-private nested class declarations.
    pub inner_classes: Vec<ApiInnerClass>,
    /// API fields, sorted by name and descriptor.
    pub fields: Vec<ApiField>,
    /// API methods, sorted by name and descriptor.
    pub methods: Vec<ApiMethod>,
}

/// A retained `InnerClasses` entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApiInnerClass {
    /// Binary name of the nested class.
    pub inner_name: String,
    /// Binary name of the enclosing class.
    pub outer_name: Option<String>,
    /// Simple source name.
    pub simple_name: Option<String>,
    /// Access flags relevant to callers.
    pub access: AccessFlags,
}

/// A retained field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiField {
    /// Field name.
    pub name: String,
    /// Field descriptor.
    pub descriptor: String,
    /// Access flags relevant to callers.
    pub access: AccessFlags,
    /// Generic signature.
    pub signature: Option<String>,
    /// Compile-time constant, which callers inline.
    pub constant_value: Option<ConstantValue>,
    /// Runtime-visible annotations.
    pub visible_annotations: Vec<Annotation>,
    /// Class-retention annotations.
    pub invisible_annotations: Vec<Annotation>,
    /// Whether the field is marked `@Deprecated`.
    pub deprecated: bool,
}

/// A retained method or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMethod {
    /// Method name.
    pub name: String,
    /// Method descriptor.
    pub descriptor: String,
    /// Access flags relevant to callers.
    pub access: AccessFlags,
    /// Generic signature.
    pub signature: Option<String>,
    /// Declared exceptions, sorted.
    pub exceptions: Vec<String>,
    /// Runtime-visible annotations.
    pub visible_annotations: Vec<Annotation>,
    /// Class-retention annotations.
    pub invisible_annotations: Vec<Annotation>,
    /// Runtime-visible parameter annotations.
    pub visible_parameter_annotations: Vec<Vec<Annotation>>,
    /// Class-retention parameter annotations.
    pub invisible_parameter_annotations: Vec<Vec<Annotation>>,
    /// Default value of an annotation-interface element.
    pub annotation_default: Option<ElementValue>,
    /// Whether the method is marked `@Deprecated`.
    pub deprecated: bool,
}

impl ApiClass {
    /// `true` when nothing about the class can affect dependents: an empty
    /// marker interface, or an unannotated `package-info`.
    pub fn is_empty_marker(&self) -> bool {
        let unannotated = self.visible_annotations.is_empty()
            && self.invisible_annotations.is_empty()
            && !self.deprecated;
        let memberless = self.fields.is_empty()
            && self.methods.is_empty()
            && self.inner_classes.is_empty()
            && self.signature.is_none();
        let package_info = self.name == "package-info" || self.name.ends_with("/package-info");
        let empty_interface = self.access.is_interface() && self.interfaces.is_empty();
        unannotated && memberless && (package_info || empty_interface)
    }

    /// Canonical ABI bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ClassFileError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(|e| {
            ClassFileError::Encoding {
                reason: e.to_string(),
            }
        })
    }
}

/// Decides which classes and members form a public API and extracts them.
///
/// With no exported packages every package is API-bearing and
/// package-private declarations count as API. Naming exported packages
/// restricts eligible classes to those packages and drops package-private
/// declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiClassExtractor {
    exported_packages: BTreeSet<String>,
}

impl ApiClassExtractor {
    /// Creates an extractor. Package names may use `.` or `/` separators.
    pub fn new<I, S>(exported_packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            exported_packages: exported_packages
                .into_iter()
                .map(|p| p.as_ref().replace('.', "/"))
                .collect(),
        }
    }

    /// Exported packages in `/`-separated form.
    pub fn exported_packages(&self) -> &BTreeSet<String> {
        &self.exported_packages
    }

    fn includes_package_private(&self) -> bool {
        self.exported_packages.is_empty()
    }

    fn is_visible(&self, access: AccessFlags) -> bool {
        access.is_public()
            || access.is_protected()
            || (self.includes_package_private() && access.is_package_private())
    }

    /// Whether the class can contribute to an API at all.
    pub fn is_eligible(&self, class: &ClassFile) -> bool {
        if class.access.is_module() || class.is_synthetic() || is_local_class(&class.name) {
            return false;
        }
        // A nested class records its source-level visibility in its own
        // InnerClasses entry; the header flags never say private.
        let declared = class
            .attributes
            .inner_classes
            .iter()
            .find(|inner| inner.inner_name == class.name)
            .map_or(class.access, |inner| inner.access);
        if !self.is_visible(declared) {
            return false;
        }
        self.includes_package_private() || self.exported_packages.contains(class.package())
    }

    /// Builds the API model of an eligible class.
    pub fn api_class(&self, class: &ClassFile) -> ApiClass {
        let mut fields: Vec<ApiField> = class
            .fields
            .iter()
            .filter(|f| self.is_api_member(f))
            .map(api_field)
            .collect();
        fields.sort_by(|a, b| (&a.name, &a.descriptor).cmp(&(&b.name, &b.descriptor)));

        let mut methods: Vec<ApiMethod> = class
            .methods
            .iter()
            .filter(|m| m.name != "<clinit>" && self.is_api_member(m))
            .map(api_method)
            .collect();
        methods.sort_by(|a, b| (&a.name, &a.descriptor).cmp(&(&b.name, &b.descriptor)));

        let mut inner_classes: Vec<ApiInnerClass> = class
            .attributes
            .inner_classes
            .iter()
            .filter(|inner| self.is_api_inner_class(inner))
            .map(|inner| ApiInnerClass {
                inner_name: inner.inner_name.clone(),
                outer_name: inner.outer_name.clone(),
                simple_name: inner.simple_name.clone(),
                access: inner.access.masked(INNER_ACCESS_MASK),
            })
            .collect();
        inner_classes.sort();

        ApiClass {
            name: class.name.clone(),
            access: class.access.masked(CLASS_ACCESS_MASK),
            super_name: class.super_name.clone(),
            interfaces: class.interfaces.clone(),
            signature: class.attributes.signature.clone(),
            visible_annotations: canonical(&class.attributes.visible_annotations),
            invisible_annotations: canonical(&class.attributes.invisible_annotations),
            deprecated: class.attributes.deprecated,
            inner_classes,
            fields,
            methods,
        }
    }

    /// Produces the canonical ABI bytes of an eligible class, or `None` when
    /// the class has nothing meaningful to contribute.
    pub fn extract(&self, class: &ClassFile) -> Result<Option<Vec<u8>>, ClassFileError> {
        let api = self.api_class(class);
        if api.is_empty_marker() {
            return Ok(None);
        }
        api.encode().map(Some)
    }

    fn is_api_member(&self, member: &Member) -> bool {
        !member.is_synthetic() && self.is_visible(member.access)
    }

    fn is_api_inner_class(&self, inner: &InnerClass) -> bool {
        !inner.access.is_synthetic()
            && !is_local_class(&inner.inner_name)
            && self.is_visible(inner.access)
    }
}

fn canonical(annotations: &[Annotation]) -> Vec<Annotation> {
    let mut out: Vec<Annotation> = annotations.iter().map(Annotation::canonical).collect();
    out.sort();
    out
}

fn api_field(field: &Member) -> ApiField {
    ApiField {
        name: field.name.clone(),
        descriptor: field.descriptor.clone(),
        access: field.access.masked(FIELD_ACCESS_MASK),
        signature: field.attributes.signature.clone(),
        constant_value: field.attributes.constant_value.clone(),
        visible_annotations: canonical(&field.attributes.visible_annotations),
        invisible_annotations: canonical(&field.attributes.invisible_annotations),
        deprecated: field.attributes.deprecated,
    }
}

fn api_method(method: &Member) -> ApiMethod {
    let mut exceptions = method.attributes.exceptions.clone();
    exceptions.sort();
    ApiMethod {
        name: method.name.clone(),
        descriptor: method.descriptor.clone(),
        access: method.access.masked(METHOD_ACCESS_MASK),
        signature: method.attributes.signature.clone(),
        exceptions,
        visible_annotations: canonical(&method.attributes.visible_annotations),
        invisible_annotations: canonical(&method.attributes.invisible_annotations),
        visible_parameter_annotations: method
            .attributes
            .visible_parameter_annotations
            .iter()
            .map(|p| canonical(p))
            .collect(),
        invisible_parameter_annotations: method
            .attributes
            .invisible_parameter_annotations
            .iter()
            .map(|p| canonical(p))
            .collect(),
        annotation_default: method.attributes.annotation_default.clone(),
        deprecated: method.attributes.deprecated,
    }
}

/// `true` for anonymous and local classes, whose binary names end in
/// `$<digits>` optionally followed by a simple name (`Outer$1`, `Outer$1Local`).
pub fn is_local_class(name: &str) -> bool {
    name.char_indices().any(|(i, c)| {
        if c != '$' || i == 0 {
            return false;
        }
        let rest = &name[i + 1..];
        let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
        digits > 0
            && rest[digits..]
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
    })
}
