//! Access flags for classes, fields, methods, and inner-class entries.

use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr};

/// The `access_flags` bit set of a class-file structure.
///
/// Several bits are shared between contexts (`0x0020` is `ACC_SUPER` on a
/// class and `ACC_SYNCHRONIZED` on a method); the constants below are named
/// after their most common meaning.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub struct AccessFlags(pub u16);

impl AccessFlags {
    /// `ACC_PUBLIC`.
    pub const PUBLIC: AccessFlags = AccessFlags(0x0001);
    /// `ACC_PRIVATE`.
    pub const PRIVATE: AccessFlags = AccessFlags(0x0002);
    /// `ACC_PROTECTED`.
    pub const PROTECTED: AccessFlags = AccessFlags(0x0004);
    /// `ACC_STATIC`.
    pub const STATIC: AccessFlags = AccessFlags(0x0008);
    /// `ACC_FINAL`.
    pub const FINAL: AccessFlags = AccessFlags(0x0010);
    /// `ACC_SUPER` (classes) / `ACC_SYNCHRONIZED` (methods).
    pub const SUPER: AccessFlags = AccessFlags(0x0020);
    /// `ACC_VOLATILE` (fields) / `ACC_BRIDGE` (methods).
    pub const VOLATILE: AccessFlags = AccessFlags(0x0040);
    /// `ACC_TRANSIENT` (fields) / `ACC_VARARGS` (methods).
    pub const TRANSIENT: AccessFlags = AccessFlags(0x0080);
    /// `ACC_NATIVE`.
    pub const NATIVE: AccessFlags = AccessFlags(0x0100);
    /// `ACC_INTERFACE`.
    pub const INTERFACE: AccessFlags = AccessFlags(0x0200);
    /// `ACC_ABSTRACT`.
    pub const ABSTRACT: AccessFlags = AccessFlags(0x0400);
    /// `ACC_STRICT`.
    pub const STRICT: AccessFlags = AccessFlags(0x0800);
    /// `ACC_SYNTHETIC`.
    pub const SYNTHETIC: AccessFlags = AccessFlags(0x1000);
    /// `ACC_ANNOTATION`.
    pub const ANNOTATION: AccessFlags = AccessFlags(0x2000);
    /// `ACC_ENUM`.
    pub const ENUM: AccessFlags = AccessFlags(0x4000);
    /// `ACC_MODULE`.
    pub const MODULE: AccessFlags = AccessFlags(0x8000);

    /// `ACC_VARARGS`, same bit as [`TRANSIENT`](Self::TRANSIENT).
    pub const VARARGS: AccessFlags = Self::TRANSIENT;

    /// Returns the raw bits.
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set.
    pub fn contains(self, other: AccessFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Keeps only the bits in `mask`.
    pub fn masked(self, mask: AccessFlags) -> AccessFlags {
        self & mask
    }

    /// `ACC_PUBLIC` is set.
    pub fn is_public(self) -> bool {
        self.contains(Self::PUBLIC)
    }

    /// `ACC_PROTECTED` is set.
    pub fn is_protected(self) -> bool {
        self.contains(Self::PROTECTED)
    }

    /// `ACC_PRIVATE` is set.
    pub fn is_private(self) -> bool {
        self.contains(Self::PRIVATE)
    }

    /// None of public, protected, or private is set.
    pub fn is_package_private(self) -> bool {
        self.0 & (Self::PUBLIC | Self::PROTECTED | Self::PRIVATE).0 == 0
    }

    /// `ACC_SYNTHETIC` is set.
    pub fn is_synthetic(self) -> bool {
        self.contains(Self::SYNTHETIC)
    }

    /// `ACC_INTERFACE` is set.
    pub fn is_interface(self) -> bool {
        self.contains(Self::INTERFACE)
    }

    /// `ACC_MODULE` is set.
    pub fn is_module(self) -> bool {
        self.contains(Self::MODULE)
    }
}

impl BitOr for AccessFlags {
    type Output = AccessFlags;

    fn bitor(self, rhs: AccessFlags) -> AccessFlags {
        AccessFlags(self.0 | rhs.0)
    }
}

impl BitAnd for AccessFlags {
    type Output = AccessFlags;

    fn bitand(self, rhs: AccessFlags) -> AccessFlags {
        AccessFlags(self.0 & rhs.0)
    }
}
