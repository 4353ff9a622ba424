//! Validation of field and method descriptors.

use crate::error::ClassFileError;

const MAX_ARRAY_DIMENSIONS: usize = 255;

fn invalid(descriptor: &str) -> ClassFileError {
    ClassFileError::InvalidDescriptor {
        descriptor: descriptor.to_string(),
    }
}

/// Consumes one field type from the front of `s`, returning the rest.
fn field_type(s: &str) -> Option<&str> {
    let dims = s.bytes().take_while(|&b| b == b'[').count();
    if dims > MAX_ARRAY_DIMENSIONS {
        return None;
    }
    let rest = &s[dims..];
    match rest.as_bytes().first()? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => Some(&rest[1..]),
        b'L' => {
            let end = rest.find(';')?;
            let name = &rest[1..end];
            if name.is_empty() || name.contains(['.', '[']) {
                return None;
            }
            Some(&rest[end + 1..])
        }
        _ => None,
    }
}

/// Checks a field descriptor such as `Ljava/lang/String;` or `[I`.
pub fn validate_field_descriptor(descriptor: &str) -> Result<(), ClassFileError> {
    match field_type(descriptor) {
        Some("") => Ok(()),
        _ => Err(invalid(descriptor)),
    }
}

/// Checks a method descriptor such as `(ILjava/lang/Object;)V`.
pub fn validate_method_descriptor(descriptor: &str) -> Result<(), ClassFileError> {
    let mut rest = descriptor
        .strip_prefix('(')
        .ok_or_else(|| invalid(descriptor))?;
    while !rest.starts_with(')') {
        rest = field_type(rest).ok_or_else(|| invalid(descriptor))?;
    }
    let ret = &rest[1..];
    if ret == "V" {
        return Ok(());
    }
    validate_field_descriptor(ret).map_err(|_| invalid(descriptor))
}
