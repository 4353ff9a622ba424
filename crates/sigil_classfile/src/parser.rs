//! Decoding class-file bytes into a [`ClassFile`].

use crate::access::AccessFlags;
use crate::annotation::{parse_annotations, parse_element_value, parse_parameter_annotations};
use crate::constant_pool::ConstantPool;
use crate::descriptor::{validate_field_descriptor, validate_method_descriptor};
use crate::error::ClassFileError;
use crate::model::{Attributes, ClassFile, InnerClass, Member, RawAttribute};
use crate::reader::ByteReader;

/// Magic number at the start of every class file.
pub const MAGIC: u32 = 0xCAFE_BABE;

/// Oldest supported major version (JDK 1.1).
///
/// There is no upper bound: the structures read here have not changed since
/// this version, and newer releases only add attributes, which are kept raw.
pub const MIN_MAJOR_VERSION: u16 = 45;

#[derive(Clone, Copy, PartialEq, Eq)]
enum MemberKind {
    Field,
    Method,
}

impl ClassFile {
    /// Parses a complete class file.
    ///
    /// Fails on any structural problem, including bytes left over after the
    /// final attribute table.
    pub fn parse(bytes: &[u8]) -> Result<ClassFile, ClassFileError> {
        let mut reader = ByteReader::new(bytes);

        let magic = reader.u32()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic { found: magic });
        }
        let minor_version = reader.u16()?;
        let major_version = reader.u16()?;
        if major_version < MIN_MAJOR_VERSION {
            return Err(ClassFileError::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }

        let pool = ConstantPool::parse(&mut reader)?;

        let access = AccessFlags(reader.u16()?);
        let name = pool.class_name(reader.u16()?)?.to_string();
        let super_name = pool.optional_class_name(reader.u16()?)?.map(str::to_string);

        let interface_count = reader.u16()?;
        let interfaces = (0..interface_count)
            .map(|_| -> Result<String, ClassFileError> {
                Ok(pool.class_name(reader.u16()?)?.to_string())
            })
            .collect::<Result<Vec<_>, _>>()?;

        let fields = parse_members(&mut reader, &pool, MemberKind::Field)?;
        let methods = parse_members(&mut reader, &pool, MemberKind::Method)?;
        let attributes = parse_attributes(&mut reader, &pool)?;

        reader.finish("class file")?;

        Ok(ClassFile {
            minor_version,
            major_version,
            access,
            name,
            super_name,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }
}

fn parse_members(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    kind: MemberKind,
) -> Result<Vec<Member>, ClassFileError> {
    let count = reader.u16()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access = AccessFlags(reader.u16()?);
        let name = pool.utf8(reader.u16()?)?.to_string();
        let descriptor = pool.utf8(reader.u16()?)?.to_string();
        match kind {
            MemberKind::Field => validate_field_descriptor(&descriptor)?,
            MemberKind::Method => validate_method_descriptor(&descriptor)?,
        }
        let attributes = parse_attributes(reader, pool)?;
        members.push(Member {
            access,
            name,
            descriptor,
            attributes,
        });
    }
    Ok(members)
}

fn parse_attributes(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Attributes, ClassFileError> {
    let count = reader.u16()?;
    let mut attrs = Attributes::default();

    for _ in 0..count {
        let name = pool.utf8(reader.u16()?)?;
        let len = reader.u32()? as usize;
        let mut body = reader.sub_reader(len)?;

        match name {
            "Signature" => {
                attrs.signature = Some(pool.utf8(body.u16()?)?.to_string());
            }
            "ConstantValue" => {
                attrs.constant_value = Some(pool.constant_value(body.u16()?)?);
            }
            "Exceptions" => {
                let n = body.u16()?;
                attrs.exceptions = (0..n)
                    .map(|_| -> Result<String, ClassFileError> {
                        Ok(pool.class_name(body.u16()?)?.to_string())
                    })
                    .collect::<Result<Vec<_>, _>>()?;
            }
            "InnerClasses" => {
                let n = body.u16()?;
                for _ in 0..n {
                    let inner_name = pool.class_name(body.u16()?)?.to_string();
                    let outer_name = pool.optional_class_name(body.u16()?)?.map(str::to_string);
                    let simple_name = pool.optional_utf8(body.u16()?)?.map(str::to_string);
                    let access = AccessFlags(body.u16()?);
                    attrs.inner_classes.push(InnerClass {
                        inner_name,
                        outer_name,
                        simple_name,
                        access,
                    });
                }
            }
            "RuntimeVisibleAnnotations" => {
                attrs.visible_annotations = parse_annotations(&mut body, pool)?;
            }
            "RuntimeInvisibleAnnotations" => {
                attrs.invisible_annotations = parse_annotations(&mut body, pool)?;
            }
            "RuntimeVisibleParameterAnnotations" => {
                attrs.visible_parameter_annotations = parse_parameter_annotations(&mut body, pool)?;
            }
            "RuntimeInvisibleParameterAnnotations" => {
                attrs.invisible_parameter_annotations =
                    parse_parameter_annotations(&mut body, pool)?;
            }
            "AnnotationDefault" => {
                attrs.annotation_default = Some(parse_element_value(&mut body, pool)?);
            }
            "Deprecated" => attrs.deprecated = true,
            "Synthetic" => attrs.synthetic = true,
            _ => {
                let data = body.bytes(len)?.to_vec();
                attrs.other.push(RawAttribute::new(name, data));
            }
        }

        body.finish("attribute")?;
    }

    Ok(attrs)
}
