// crates/clock-gate-core/src/codec/document.rs
// ============================================================================
// Module: Clock Gate Document Walk
// Description: Read and write single typed leaves in nested documents.
// Purpose: Map one field path onto one nested document root.
// Dependencies: serde_json, tracing, crate::core
// ============================================================================

//! ## Overview
//! The caller picks the root (metadata or data sub-document); the namespace
//! segment of the [`FieldPath`] is not walked. Decoding walks existing objects
//! only. Encoding creates missing intermediate objects on demand and always
//! sets the leaf fresh.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use crate::codec::CodecError;
use crate::core::FieldPath;
use crate::core::Scalar;
use crate::core::TypedValue;
use crate::core::value::value_kind;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Nested key/value tree used for payload roots.
pub type Document = Map<String, Value>;

// ============================================================================
// SECTION: Decode
// ============================================================================

/// Reads the leaf scalar addressed by `path`, typed by the document itself.
///
/// # Errors
///
/// Returns [`CodecError::FieldNotFound`] when any segment is absent (or an
/// intermediate segment is not an object) and [`CodecError::TypeMismatch`]
/// when the leaf is not a number, bool, or string.
pub fn read_scalar(root: &Document, path: &FieldPath) -> Result<Scalar, CodecError> {
    let mut current = root;
    let (leaf, parents) = split_leaf(path)?;
    for segment in parents {
        current = match current.get(segment) {
            Some(Value::Object(child)) => child,
            _ => return Err(not_found(path, segment)),
        };
    }
    let value = current.get(leaf).ok_or_else(|| not_found(path, leaf))?;
    Scalar::from_value(value).ok_or_else(|| CodecError::TypeMismatch {
        path: path.as_str().to_string(),
        expected: path.leaf_type(),
        found: value_kind(value),
    })
}

/// Reads the leaf addressed by `path` and converts it to the declared leaf type.
///
/// # Errors
///
/// Returns [`CodecError::FieldNotFound`] or [`CodecError::TypeMismatch`].
pub fn decode_field(root: &Document, path: &FieldPath) -> Result<TypedValue, CodecError> {
    let scalar = read_scalar(root, path)?;
    let found = scalar.kind();
    TypedValue::from_scalar(path.leaf_type(), scalar).ok_or_else(|| CodecError::TypeMismatch {
        path: path.as_str().to_string(),
        expected: path.leaf_type(),
        found,
    })
}

// ============================================================================
// SECTION: Encode
// ============================================================================

/// Sets the leaf addressed by `path`, creating intermediate objects as needed.
///
/// The value is converted to the declared leaf type first. An intermediate
/// segment that already holds a scalar is replaced by an object. Every
/// parent segment is walked, including one that shares the leaf's name.
///
/// # Errors
///
/// Returns [`CodecError::TypeMismatch`] when the value cannot become the
/// declared leaf type.
pub fn encode_field(
    root: &mut Document,
    path: &FieldPath,
    value: &TypedValue,
) -> Result<(), CodecError> {
    let converted = value.cast(path.leaf_type()).ok_or_else(|| CodecError::TypeMismatch {
        path: path.as_str().to_string(),
        expected: path.leaf_type(),
        found: value.leaf_type().as_str(),
    })?;
    let (leaf, parents) = split_leaf(path)?;
    let mut current = root;
    for segment in parents {
        let slot =
            current.entry(segment.clone()).or_insert_with(|| Value::Object(Document::new()));
        if !slot.is_object() {
            debug!(
                path = path.as_str(),
                segment = segment.as_str(),
                "replacing scalar with object"
            );
            *slot = Value::Object(Document::new());
        }
        current = slot.as_object_mut().ok_or_else(|| not_found(path, segment))?;
    }
    current.insert(leaf.clone(), converted.to_json());
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Splits the nested segments into the leaf and its parents.
fn split_leaf(path: &FieldPath) -> Result<(&String, &[String]), CodecError> {
    path.nested().split_last().ok_or_else(|| not_found(path, path.namespace()))
}

/// Builds a field-not-found error.
fn not_found(path: &FieldPath, segment: &str) -> CodecError {
    CodecError::FieldNotFound {
        path: path.as_str().to_string(),
        segment: segment.to_string(),
    }
}
