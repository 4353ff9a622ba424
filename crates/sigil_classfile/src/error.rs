//! Error types for class-file parsing and ABI extraction.

/// Errors raised while decoding a class file.
///
/// Any of these means the input is not a well-formed class file. Callers
/// decide how to recover; the parser itself never guesses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassFileError {
    /// The input ended before a structure was complete.
    #[error("unexpected end of class file at offset {offset}: needed {needed} more bytes")]
    Truncated {
        /// Absolute byte offset where the read was attempted.
        offset: usize,
        /// Number of bytes missing.
        needed: usize,
    },

    /// The first four bytes are not `0xCAFEBABE`.
    #[error("bad magic number {found:#010x}")]
    BadMagic {
        /// The value found instead.
        found: u32,
    },

    /// The class-file version predates the oldest supported format.
    #[error("unsupported class file version {major}.{minor}")]
    UnsupportedVersion {
        /// Major version.
        major: u16,
        /// Minor version.
        minor: u16,
    },

    /// A constant pool index is zero, out of range, or points at the second
    /// slot of a long/double entry.
    #[error("constant pool index {index} is out of range or unusable")]
    BadConstantIndex {
        /// The offending index.
        index: u16,
    },

    /// A constant pool entry has a different kind than the context requires.
    #[error("constant pool entry {index} is {found}, expected {expected}")]
    UnexpectedConstant {
        /// The entry index.
        index: u16,
        /// The kind the context requires.
        expected: &'static str,
        /// The kind actually stored.
        found: &'static str,
    },

    /// A constant pool tag byte is not defined by the format.
    #[error("unknown constant pool tag {tag} at entry {index}")]
    UnknownConstantTag {
        /// The tag byte.
        tag: u8,
        /// The entry index.
        index: u16,
    },

    /// A `Utf8` constant is not valid modified UTF-8.
    #[error("invalid modified UTF-8 in constant pool entry {index}")]
    InvalidUtf8 {
        /// The entry index.
        index: u16,
    },

    /// A field or method descriptor does not follow the descriptor grammar.
    #[error("invalid descriptor '{descriptor}'")]
    InvalidDescriptor {
        /// The rejected descriptor.
        descriptor: String,
    },

    /// A structure had bytes left over after it was fully decoded.
    #[error("{count} unexpected trailing bytes in {context}")]
    TrailingBytes {
        /// The structure being decoded.
        context: &'static str,
        /// Number of unconsumed bytes.
        count: usize,
    },

    /// An annotation element value uses an undefined tag.
    #[error("unknown annotation element tag {tag:#04x}")]
    UnknownElementTag {
        /// The tag byte.
        tag: u8,
    },

    /// Annotation element values are nested deeper than the parser follows.
    #[error("annotation element values nested deeper than {limit} levels")]
    NestingTooDeep {
        /// The nesting limit.
        limit: usize,
    },

    /// A table or string is too long for its class-file length field.
    #[error("{context} has {count} entries, more than the class file format allows")]
    TooLarge {
        /// The structure being encoded.
        context: &'static str,
        /// The length that did not fit.
        count: usize,
    },

    /// The canonical API encoding could not be produced.
    #[error("failed to encode API signature: {reason}")]
    Encoding {
        /// Description of the encoding failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_display() {
        let err = ClassFileError::Truncated {
            offset: 10,
            needed: 4,
        };
        assert_eq!(
            err.to_string(),
            "unexpected end of class file at offset 10: needed 4 more bytes"
        );
    }

    #[test]
    fn bad_magic_display() {
        let err = ClassFileError::BadMagic { found: 0xDEADBEEF };
        assert_eq!(err.to_string(), "bad magic number 0xdeadbeef");
    }

    #[test]
    fn unexpected_constant_display() {
        let err = ClassFileError::UnexpectedConstant {
            index: 7,
            expected: "Utf8",
            found: "Integer",
        };
        let msg = err.to_string();
        assert!(msg.contains("entry 7"));
        assert!(msg.contains("expected Utf8"));
    }

    #[test]
    fn unknown_element_tag_display() {
        let err = ClassFileError::UnknownElementTag { tag: b'x' };
        assert!(err.to_string().contains("0x78"));
    }
}
