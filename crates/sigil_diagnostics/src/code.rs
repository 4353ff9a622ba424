//! Diagnostic codes with category prefixes for structured identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Fatal problems, prefixed with `E`.
    Error,
    /// Recoverable input problems, prefixed with `W`.
    Warning,
    /// Behavior scheduled to change in a future policy version, prefixed with `D`.
    Deprecation,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Deprecation => 'D',
        }
    }
}

/// A structured diagnostic code combining a category prefix and a numeric identifier.
///
/// Displayed as the category prefix followed by a zero-padded 3-digit number,
/// e.g. `W101`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// A classpath entry could not be snapshotted at all.
    pub const SNAPSHOT_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Error, 1);

    /// A class file on a compile classpath could not be parsed.
    pub const MALFORMED_CLASS: DiagnosticCode = DiagnosticCode::new(Category::Warning, 101);

    /// The persistent signature cache could not be used and was bypassed.
    pub const CACHE_UNAVAILABLE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 201);

    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
