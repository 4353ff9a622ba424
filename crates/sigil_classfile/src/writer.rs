//! Emitting class-file bytes from a [`ClassFile`] model.
//!
//! The writer builds a fresh, deduplicated constant pool. Opaque attributes
//! are copied verbatim, so any constant pool indices inside them are not
//! remapped; they are emitted exactly as given.

use std::collections::HashMap;

use crate::annotation::{Annotation, ElementValue};
use crate::constant_pool::{Constant, ConstantValue, JavaString};
use crate::error::ClassFileError;
use crate::model::{Attributes, ClassFile, Member};
use crate::parser::MAGIC;

/// Deduplicating constant pool under construction.
#[derive(Default)]
struct PoolBuilder {
    entries: Vec<Constant>,
    index: HashMap<Constant, u16>,
    next_slot: u16,
}

impl PoolBuilder {
    fn new() -> Self {
        Self {
            next_slot: 1,
            ..Default::default()
        }
    }

    fn add(&mut self, constant: Constant) -> Result<u16, ClassFileError> {
        if let Some(&slot) = self.index.get(&constant) {
            return Ok(slot);
        }
        let slot = self.next_slot;
        let width = if constant.is_wide() { 2 } else { 1 };
        self.next_slot = slot
            .checked_add(width)
            .ok_or(ClassFileError::TooLarge {
                context: "constant pool",
                count: usize::from(slot) + usize::from(width),
            })?;
        self.index.insert(constant.clone(), slot);
        self.entries.push(constant);
        Ok(slot)
    }

    fn utf8(&mut self, s: &str) -> Result<u16, ClassFileError> {
        self.add(Constant::Utf8(JavaString::from(s)))
    }

    fn java_string(&mut self, s: &JavaString) -> Result<u16, ClassFileError> {
        self.add(Constant::Utf8(s.clone()))
    }

    fn class(&mut self, name: &str) -> Result<u16, ClassFileError> {
        let name = self.utf8(name)?;
        self.add(Constant::Class(name))
    }

    fn loadable(&mut self, value: &ConstantValue) -> Result<u16, ClassFileError> {
        match value {
            ConstantValue::Int(v) => self.add(Constant::Integer(*v)),
            ConstantValue::Float(bits) => self.add(Constant::Float(*bits)),
            ConstantValue::Long(v) => self.add(Constant::Long(*v)),
            ConstantValue::Double(bits) => self.add(Constant::Double(*bits)),
            ConstantValue::String(s) => {
                let utf8 = self.java_string(s)?;
                self.add(Constant::String(utf8))
            }
        }
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<(), ClassFileError> {
        out.extend_from_slice(&self.next_slot.to_be_bytes());
        for constant in &self.entries {
            constant.write(out)?;
        }
        Ok(())
    }
}

/// Serializes [`ClassFile`] models into class-file bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassWriter;

impl ClassWriter {
    /// Creates a writer.
    pub fn new() -> Self {
        Self
    }

    /// Encodes `class` as a complete class file.
    ///
    /// Fails with [`ClassFileError::TooLarge`] when a table, string or the
    /// constant pool does not fit its length field.
    pub fn write(&self, class: &ClassFile) -> Result<Vec<u8>, ClassFileError> {
        let mut pool = PoolBuilder::new();
        let mut body = Vec::new();

        put_u16(&mut body, class.access.bits());
        let this_class = pool.class(&class.name)?;
        put_u16(&mut body, this_class);
        let super_class = match class.super_name.as_deref() {
            Some(name) => pool.class(name)?,
            None => 0,
        };
        put_u16(&mut body, super_class);

        put_len(&mut body, "interfaces", class.interfaces.len())?;
        for interface in &class.interfaces {
            let index = pool.class(interface)?;
            put_u16(&mut body, index);
        }

        write_members(&mut body, &mut pool, "fields", &class.fields)?;
        write_members(&mut body, &mut pool, "methods", &class.methods)?;
        write_attributes(&mut body, &mut pool, &class.attributes)?;

        let mut out = Vec::with_capacity(body.len() + 256);
        out.extend_from_slice(&MAGIC.to_be_bytes());
        put_u16(&mut out, class.minor_version);
        put_u16(&mut out, class.major_version);
        pool.write(&mut out)?;
        out.extend_from_slice(&body);
        Ok(out)
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_len(out: &mut Vec<u8>, context: &'static str, len: usize) -> Result<(), ClassFileError> {
    let value = u16::try_from(len).map_err(|_| ClassFileError::TooLarge { context, count: len })?;
    put_u16(out, value);
    Ok(())
}

fn optional_index(
    pool: &mut PoolBuilder,
    value: Option<&str>,
    add: fn(&mut PoolBuilder, &str) -> Result<u16, ClassFileError>,
) -> Result<u16, ClassFileError> {
    match value {
        Some(s) => add(pool, s),
        None => Ok(0),
    }
}

fn write_members(
    out: &mut Vec<u8>,
    pool: &mut PoolBuilder,
    context: &'static str,
    members: &[Member],
) -> Result<(), ClassFileError> {
    put_len(out, context, members.len())?;
    for member in members {
        put_u16(out, member.access.bits());
        let name = pool.utf8(&member.name)?;
        put_u16(out, name);
        let descriptor = pool.utf8(&member.descriptor)?;
        put_u16(out, descriptor);
        write_attributes(out, pool, &member.attributes)?;
    }
    Ok(())
}

fn write_attributes(
    out: &mut Vec<u8>,
    pool: &mut PoolBuilder,
    attrs: &Attributes,
) -> Result<(), ClassFileError> {
    let mut encoded: Vec<(u16, Vec<u8>)> = Vec::new();
    let mut push = |pool: &mut PoolBuilder, name: &str, data: Vec<u8>| {
        let name = pool.utf8(name)?;
        encoded.push((name, data));
        Ok::<(), ClassFileError>(())
    };

    if let Some(signature) = &attrs.signature {
        let index = pool.utf8(signature)?;
        push(pool, "Signature", index.to_be_bytes().to_vec())?;
    }
    if let Some(value) = &attrs.constant_value {
        let index = pool.loadable(value)?;
        push(pool, "ConstantValue", index.to_be_bytes().to_vec())?;
    }
    if !attrs.exceptions.is_empty() {
        let mut data = Vec::new();
        put_len(&mut data, "exceptions", attrs.exceptions.len())?;
        for exception in &attrs.exceptions {
            let index = pool.class(exception)?;
            put_u16(&mut data, index);
        }
        push(pool, "Exceptions", data)?;
    }
    if !attrs.inner_classes.is_empty() {
        let mut data = Vec::new();
        put_len(&mut data, "inner classes", attrs.inner_classes.len())?;
        for inner in &attrs.inner_classes {
            let inner_index = pool.class(&inner.inner_name)?;
            let outer_index = optional_index(pool, inner.outer_name.as_deref(), PoolBuilder::class)?;
            let name_index = optional_index(pool, inner.simple_name.as_deref(), PoolBuilder::utf8)?;
            put_u16(&mut data, inner_index);
            put_u16(&mut data, outer_index);
            put_u16(&mut data, name_index);
            put_u16(&mut data, inner.access.bits());
        }
        push(pool, "InnerClasses", data)?;
    }
    if !attrs.visible_annotations.is_empty() {
        let data = encode_annotations(pool, &attrs.visible_annotations)?;
        push(pool, "RuntimeVisibleAnnotations", data)?;
    }
    if !attrs.invisible_annotations.is_empty() {
        let data = encode_annotations(pool, &attrs.invisible_annotations)?;
        push(pool, "RuntimeInvisibleAnnotations", data)?;
    }
    if !attrs.visible_parameter_annotations.is_empty() {
        let data = encode_parameter_annotations(pool, &attrs.visible_parameter_annotations)?;
        push(pool, "RuntimeVisibleParameterAnnotations", data)?;
    }
    if !attrs.invisible_parameter_annotations.is_empty() {
        let data = encode_parameter_annotations(pool, &attrs.invisible_parameter_annotations)?;
        push(pool, "RuntimeInvisibleParameterAnnotations", data)?;
    }
    if let Some(default) = &attrs.annotation_default {
        let mut data = Vec::new();
        encode_element_value(&mut data, pool, default)?;
        push(pool, "AnnotationDefault", data)?;
    }
    if attrs.deprecated {
        push(pool, "Deprecated", Vec::new())?;
    }
    if attrs.synthetic {
        push(pool, "Synthetic", Vec::new())?;
    }
    for raw in &attrs.other {
        push(pool, &raw.name, raw.data.clone())?;
    }

    put_len(out, "attributes", encoded.len())?;
    for (name, data) in encoded {
        put_u16(out, name);
        let len = u32::try_from(data.len()).map_err(|_| ClassFileError::TooLarge {
            context: "attribute",
            count: data.len(),
        })?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&data);
    }
    Ok(())
}

fn encode_annotations(
    pool: &mut PoolBuilder,
    annotations: &[Annotation],
) -> Result<Vec<u8>, ClassFileError> {
    let mut data = Vec::new();
    put_len(&mut data, "annotations", annotations.len())?;
    for annotation in annotations {
        encode_annotation(&mut data, pool, annotation)?;
    }
    Ok(data)
}

fn encode_parameter_annotations(
    pool: &mut PoolBuilder,
    params: &[Vec<Annotation>],
) -> Result<Vec<u8>, ClassFileError> {
    let count = u8::try_from(params.len()).map_err(|_| ClassFileError::TooLarge {
        context: "parameter annotations",
        count: params.len(),
    })?;
    let mut data = vec![count];
    for annotations in params {
        data.extend_from_slice(&encode_annotations(pool, annotations)?);
    }
    Ok(data)
}

fn encode_annotation(
    out: &mut Vec<u8>,
    pool: &mut PoolBuilder,
    annotation: &Annotation,
) -> Result<(), ClassFileError> {
    let type_index = pool.utf8(&annotation.type_descriptor)?;
    put_u16(out, type_index);
    put_len(out, "annotation elements", annotation.elements.len())?;
    for (name, value) in &annotation.elements {
        let name_index = pool.utf8(name)?;
        put_u16(out, name_index);
        encode_element_value(out, pool, value)?;
    }
    Ok(())
}

fn encode_element_value(
    out: &mut Vec<u8>,
    pool: &mut PoolBuilder,
    value: &ElementValue,
) -> Result<(), ClassFileError> {
    match value {
        ElementValue::Const { tag, value } => {
            out.push(*tag);
            let index = match (tag, value) {
                // String elements point straight at a Utf8 entry.
                (b's', ConstantValue::String(s)) => pool.java_string(s)?,
                _ => pool.loadable(value)?,
            };
            put_u16(out, index);
        }
        ElementValue::Enum {
            type_descriptor,
            name,
        } => {
            out.push(b'e');
            let type_index = pool.utf8(type_descriptor)?;
            let name_index = pool.utf8(name)?;
            put_u16(out, type_index);
            put_u16(out, name_index);
        }
        ElementValue::Class(descriptor) => {
            out.push(b'c');
            let index = pool.utf8(descriptor)?;
            put_u16(out, index);
        }
        ElementValue::Annotation(annotation) => {
            out.push(b'@');
            encode_annotation(out, pool, annotation)?;
        }
        ElementValue::Array(values) => {
            out.push(b'[');
            put_len(out, "array elements", values.len())?;
            for value in values {
                encode_element_value(out, pool, value)?;
            }
        }
    }
    Ok(())
}
