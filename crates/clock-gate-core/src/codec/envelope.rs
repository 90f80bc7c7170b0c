// crates/clock-gate-core/src/codec/envelope.rs
// ============================================================================
// Module: Clock Gate Payload Envelope
// Description: Metadata/data split and the generic JSON wrapping rule.
// Purpose: Locate decode roots and assemble outbound documents.
// Dependencies: serde_json, crate::codec::document
// ============================================================================

//! ## Overview
//! Every payload is `{"metadata": {...}, "data": ...}`. When
//! `metadata.type_name` equals [`JSON_DATA_TYPE_NAME`], `data` is a wrapper
//! object whose single `data` string holds an independently serialized
//! document; otherwise `data` is the document root itself.
//! Invariants:
//! - Decode unwraps exactly when encode wraps: both key off the metadata type name.
//! - A wrapped payload whose inner string is not an object document is rejected whole.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::codec::CodecError;
use crate::codec::document::Document;
use crate::core::FieldPath;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Metadata type name marking a generic opaque-JSON payload.
pub const JSON_DATA_TYPE_NAME: &str = "aerosim::types::JsonData";
/// Top-level key holding the metadata sub-document.
pub const METADATA_KEY: &str = "metadata";
/// Top-level key holding the data sub-document (and the wrapped string).
pub const DATA_KEY: &str = "data";
/// Metadata key naming the payload type.
pub const TYPE_NAME_KEY: &str = "type_name";

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Parsed payload split into metadata and data roots.
///
/// # Invariants
/// - `data` is the unwrapped inner document when `wrapped` is true.
/// - Missing or non-object sub-documents are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadEnvelope {
    /// Metadata root.
    metadata: Option<Document>,
    /// Data root (already unwrapped).
    data: Option<Document>,
    /// True when the payload used the generic JSON wrapping.
    wrapped: bool,
}

impl PayloadEnvelope {
    /// Parses a payload and resolves its data root.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] when the payload is not a JSON object or
    /// a wrapped payload does not carry a serialized object in `data.data`.
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        let root: Value =
            serde_json::from_slice(bytes).map_err(|err| CodecError::Decode(err.to_string()))?;
        let Value::Object(mut root) = root else {
            return Err(CodecError::Decode("payload root must be an object".to_string()));
        };
        let metadata = match root.remove(METADATA_KEY) {
            Some(Value::Object(metadata)) => Some(metadata),
            _ => None,
        };
        let wrapped = metadata
            .as_ref()
            .and_then(|metadata| metadata.get(TYPE_NAME_KEY))
            .and_then(Value::as_str)
            .is_some_and(|type_name| type_name == JSON_DATA_TYPE_NAME);
        let data = if wrapped {
            Some(unwrap_data(root.get(DATA_KEY))?)
        } else {
            match root.remove(DATA_KEY) {
                Some(Value::Object(data)) => Some(data),
                _ => None,
            }
        };
        Ok(Self {
            metadata,
            data,
            wrapped,
        })
    }

    /// Returns the metadata root.
    #[must_use]
    pub const fn metadata(&self) -> Option<&Document> {
        self.metadata.as_ref()
    }

    /// Returns the (unwrapped) data root.
    #[must_use]
    pub const fn data(&self) -> Option<&Document> {
        self.data.as_ref()
    }

    /// Returns true when the payload used the generic JSON wrapping.
    #[must_use]
    pub const fn is_wrapped(&self) -> bool {
        self.wrapped
    }

    /// Returns the metadata type name when present.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.metadata.as_ref()?.get(TYPE_NAME_KEY)?.as_str()
    }

    /// Returns the root a field path decodes against.
    #[must_use]
    pub fn root_for(&self, path: &FieldPath) -> Option<&Document> {
        if path.is_metadata() { self.metadata() } else { self.data() }
    }
}

// ============================================================================
// SECTION: Assembly
// ============================================================================

/// Returns true when a metadata root requests generic JSON wrapping.
#[must_use]
pub fn requests_wrapping(metadata: &Document) -> bool {
    metadata.get(TYPE_NAME_KEY).and_then(Value::as_str) == Some(JSON_DATA_TYPE_NAME)
}

/// Builds the outbound document from metadata and data roots.
///
/// When `wrap` is true the data root is serialized to a compact string and
/// placed under `data.data`.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] when the data root cannot be serialized.
pub fn assemble_document(
    metadata: Document,
    data: Document,
    wrap: bool,
) -> Result<Value, CodecError> {
    let data_value = if wrap {
        let text = serde_json::to_string(&Value::Object(data))
            .map_err(|err| CodecError::Encode(err.to_string()))?;
        let mut wrapper = Document::new();
        wrapper.insert(DATA_KEY.to_string(), Value::String(text));
        Value::Object(wrapper)
    } else {
        Value::Object(data)
    };
    let mut root = Document::new();
    root.insert(METADATA_KEY.to_string(), Value::Object(metadata));
    root.insert(DATA_KEY.to_string(), data_value);
    Ok(Value::Object(root))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses the nested document carried by a wrapped payload.
fn unwrap_data(wrapper: Option<&Value>) -> Result<Document, CodecError> {
    let text = wrapper
        .and_then(|wrapper| wrapper.get(DATA_KEY))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            CodecError::Decode("wrapped payload is missing data.data string".to_string())
        })?;
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(inner)) => Ok(inner),
        Ok(_) => Err(CodecError::Decode("wrapped data must be an object document".to_string())),
        Err(err) => Err(CodecError::Decode(format!("wrapped data: {err}"))),
    }
}
