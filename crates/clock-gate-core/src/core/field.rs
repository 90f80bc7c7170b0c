// crates/clock-gate-core/src/core/field.rs
// ============================================================================
// Module: Clock Gate Field Paths
// Description: Dotted-path field descriptors with scalar leaf type tags.
// Purpose: Name one typed leaf inside a nested payload document.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`FieldPath`] selects one leaf inside a payload document, e.g.
//! `data.position.x` or `metadata.type_name`. The first segment is the
//! namespace and chooses the document root; the remaining segments walk nested
//! objects down to the leaf.
//! Invariants:
//! - Paths always carry at least two non-empty segments.
//! - The leaf type is fixed at construction and never inferred from payloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Namespace segment selecting the metadata sub-document.
pub const METADATA_NAMESPACE: &str = "metadata";
/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';
/// Maximum accepted length of a dotted field path.
pub const MAX_FIELD_PATH_LENGTH: usize = 512;
/// Maximum number of segments in a dotted field path.
pub const MAX_FIELD_PATH_SEGMENTS: usize = 32;

// ============================================================================
// SECTION: Leaf Types
// ============================================================================

/// Scalar type tag attached to a field path leaf.
///
/// # Invariants
/// - The set is closed; every codec conversion matches on it exhaustively.
/// - `double` and `single` are accepted as aliases for the float types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafType {
    /// 64-bit float.
    #[serde(alias = "double")]
    Float64,
    /// 32-bit float.
    #[serde(alias = "single")]
    Float32,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Unsigned 64-bit integer.
    Uint64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    String,
}

impl LeafType {
    /// All leaf types in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Float64,
        Self::Float32,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Uint64,
        Self::Bool,
        Self::String,
    ];

    /// Returns the canonical label for the leaf type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Float64 => "float64",
            Self::Float32 => "float32",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Bool => "bool",
            Self::String => "string",
        }
    }

    /// Returns true for the integer and float leaf types.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        !matches!(self, Self::Bool | Self::String)
    }
}

impl fmt::Display for LeafType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeafType {
    type Err = FieldPathError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "double" => Ok(Self::Float64),
            "single" => Ok(Self::Float32),
            other => Self::ALL
                .into_iter()
                .find(|leaf| leaf.as_str() == other)
                .ok_or_else(|| FieldPathError::UnknownLeafType(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned when constructing field paths.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldPathError {
    /// Path has fewer than two segments.
    #[error("field path `{0}` needs a namespace and at least one nested segment")]
    TooShort(String),
    /// Path contains an empty segment.
    #[error("field path `{0}` contains an empty segment")]
    EmptySegment(String),
    /// Path exceeds length or segment limits.
    #[error("field path `{0}` exceeds size limits")]
    TooLong(String),
    /// Leaf type label is not recognized.
    #[error("unknown leaf type: {0}")]
    UnknownLeafType(String),
}

// ============================================================================
// SECTION: Field Path
// ============================================================================

/// Dotted path to one typed leaf inside a payload document.
///
/// # Invariants
/// - `segments.len() >= 2` and no segment is empty.
/// - `segments[0]` is the namespace; the last segment names the leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    /// Original dotted text.
    text: String,
    /// Split path segments, namespace first.
    segments: Vec<String>,
    /// Declared leaf type.
    leaf_type: LeafType,
}

impl FieldPath {
    /// Parses a dotted path and attaches the leaf type.
    ///
    /// # Errors
    ///
    /// Returns [`FieldPathError`] when the path is too short, too long, or
    /// contains empty segments.
    pub fn parse(text: &str, leaf_type: LeafType) -> Result<Self, FieldPathError> {
        if text.len() > MAX_FIELD_PATH_LENGTH {
            return Err(FieldPathError::TooLong(text.to_string()));
        }
        let segments: Vec<String> = text.split(PATH_SEPARATOR).map(str::to_string).collect();
        if segments.len() > MAX_FIELD_PATH_SEGMENTS {
            return Err(FieldPathError::TooLong(text.to_string()));
        }
        if segments.iter().any(String::is_empty) {
            return Err(FieldPathError::EmptySegment(text.to_string()));
        }
        if segments.len() < 2 {
            return Err(FieldPathError::TooShort(text.to_string()));
        }
        Ok(Self {
            text: text.to_string(),
            segments,
            leaf_type,
        })
    }

    /// Returns the dotted path text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the declared leaf type.
    #[must_use]
    pub const fn leaf_type(&self) -> LeafType {
        self.leaf_type
    }

    /// Returns the namespace segment.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.segments[0]
    }

    /// Returns the segments below the namespace, leaf last.
    #[must_use]
    pub fn nested(&self) -> &[String] {
        &self.segments[1 ..]
    }

    /// Returns the leaf segment name.
    #[must_use]
    pub fn leaf_name(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// Returns true when the path addresses the metadata sub-document.
    #[must_use]
    pub fn is_metadata(&self) -> bool {
        self.namespace() == METADATA_NAMESPACE
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.text, self.leaf_type)
    }
}
