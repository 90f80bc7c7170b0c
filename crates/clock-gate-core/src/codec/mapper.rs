// crates/clock-gate-core/src/codec/mapper.rs
// ============================================================================
// Module: Clock Gate Field Codec
// Description: Flat typed field lists to and from enveloped payloads.
// Purpose: Decode inbound payloads into typed outputs and encode snapshots.
// Dependencies: serde_json, tracing, crate::codec, crate::core
// ============================================================================

//! ## Overview
//! A [`FieldCodec`] owns an ordered list of [`FieldPath`] descriptors. Decoding
//! fills one output slot per field and leaves slots untouched when their field
//! cannot be read. Encoding builds metadata and data roots from one value per
//! field, applies the wrapping rule, and serializes compactly into a bounded
//! [`EncodeOutput`].
//! Invariants:
//! - Output slots and value slices match the field list position by position.
//! - A whole-document decode failure attempts no field outputs.
//! - An oversized encode yields an empty payload and a zero (or absent) length.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::codec::CodecError;
use crate::codec::document::Document;
use crate::codec::document::decode_field;
use crate::codec::document::encode_field;
use crate::codec::envelope::PayloadEnvelope;
use crate::codec::envelope::assemble_document;
use crate::codec::envelope::requests_wrapping;
use crate::core::FieldPath;
use crate::core::TypedValue;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default encoded document capacity in bytes.
pub const DEFAULT_MAX_ENCODED_LEN: usize = 1024;

/// Encode capacity and length-output settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecLimits {
    /// Maximum serialized document length in bytes.
    pub max_len: usize,
    /// Whether encode reports a length output.
    pub emit_length: bool,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_ENCODED_LEN,
            emit_length: true,
        }
    }
}

/// How the decoder determines the extent of an input buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputLength {
    /// Input ends at the first nul byte (or the buffer end).
    #[default]
    NulTerminated,
    /// Input is the first `n` bytes of the buffer (clamped to its length).
    Bounded(usize),
}

/// Returns the slice of `bytes` the decoder should parse.
#[must_use]
pub fn frame_input(bytes: &[u8], length: InputLength) -> &[u8] {
    match length {
        InputLength::NulTerminated => {
            let end = bytes.iter().position(|byte| *byte == 0).unwrap_or(bytes.len());
            &bytes[..end]
        }
        InputLength::Bounded(len) => &bytes[..len.min(bytes.len())],
    }
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Field that could not be decoded from an otherwise valid document.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFailure {
    /// Dotted path of the field.
    pub path: String,
    /// Reason the slot was left unchanged.
    pub error: CodecError,
}

/// Summary of one decode call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeReport {
    /// Number of slots written.
    pub decoded: usize,
    /// Fields whose slots kept their previous value.
    pub failures: Vec<FieldFailure>,
}

impl DecodeReport {
    /// Returns true when every field decoded.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Bounded encode output: payload bytes plus optional length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOutput {
    /// Compact serialized document (empty after a failed encode).
    pub payload: Vec<u8>,
    /// Encoded length when length output is enabled.
    pub length: Option<u32>,
}

// ============================================================================
// SECTION: Field Codec
// ============================================================================

/// Ordered field list with encode limits.
///
/// # Invariants
/// - Field paths are unique by dotted text.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCodec {
    /// Field descriptors in slot order.
    fields: Vec<FieldPath>,
    /// Encode limits.
    limits: CodecLimits,
}

impl FieldCodec {
    /// Creates a codec over the given fields.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::DuplicateField`] when two fields share a path.
    pub fn new(fields: Vec<FieldPath>, limits: CodecLimits) -> Result<Self, CodecError> {
        let mut seen = BTreeSet::new();
        for field in &fields {
            if !seen.insert(field.as_str()) {
                return Err(CodecError::DuplicateField(field.as_str().to_string()));
            }
        }
        Ok(Self { fields, limits })
    }

    /// Returns the field descriptors in slot order.
    #[must_use]
    pub fn fields(&self) -> &[FieldPath] {
        &self.fields
    }

    /// Returns the encode limits.
    #[must_use]
    pub const fn limits(&self) -> CodecLimits {
        self.limits
    }

    /// Decodes a payload into `outputs`, one slot per field.
    ///
    /// Slots whose field is missing or mistyped keep their previous value and
    /// are listed in the returned report.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ArityMismatch`] when `outputs` does not match the
    /// field count and [`CodecError::Decode`] when the payload is empty or not a
    /// valid enveloped document. No slot is written in either case.
    pub fn decode_into(
        &self,
        bytes: &[u8],
        length: InputLength,
        outputs: &mut [Option<TypedValue>],
    ) -> Result<DecodeReport, CodecError> {
        self.check_arity(outputs.len())?;
        let framed = frame_input(bytes, length);
        if framed.is_empty() {
            return Err(CodecError::Decode("empty input".to_string()));
        }
        let envelope = PayloadEnvelope::parse(framed)?;
        let mut report = DecodeReport::default();
        for (field, slot) in self.fields.iter().zip(outputs.iter_mut()) {
            let decoded = envelope.root_for(field).map_or_else(
                || {
                    Err(CodecError::FieldNotFound {
                        path: field.as_str().to_string(),
                        segment: field.namespace().to_string(),
                    })
                },
                |root| decode_field(root, field),
            );
            match decoded {
                Ok(value) => {
                    *slot = Some(value);
                    report.decoded += 1;
                }
                Err(error) => {
                    debug!(path = field.as_str(), %error, "field left unchanged");
                    report.failures.push(FieldFailure {
                        path: field.as_str().to_string(),
                        error,
                    });
                }
            }
        }
        Ok(report)
    }

    /// Builds the enveloped document for one value per field.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ArityMismatch`] or [`CodecError::TypeMismatch`].
    pub fn encode_document(&self, values: &[TypedValue]) -> Result<Value, CodecError> {
        self.check_arity(values.len())?;
        let mut metadata = Document::new();
        let mut data = Document::new();
        for (field, value) in self.fields.iter().zip(values) {
            let root = if field.is_metadata() { &mut metadata } else { &mut data };
            encode_field(root, field, value)?;
        }
        let wrap = requests_wrapping(&metadata);
        assemble_document(metadata, data, wrap)
    }

    /// Encodes one value per field into `output`.
    ///
    /// `output` is reset first, so it holds an empty payload on every error.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::LengthExceeded`] when the serialized document is
    /// longer than `max_len`; the length output is then `Some(0)` when enabled.
    /// Other encode errors leave the length output absent.
    pub fn encode_into(
        &self,
        values: &[TypedValue],
        output: &mut EncodeOutput,
    ) -> Result<(), CodecError> {
        output.payload.clear();
        output.length = None;
        let document = self.encode_document(values)?;
        let bytes =
            serde_json::to_vec(&document).map_err(|err| CodecError::Encode(err.to_string()))?;
        if bytes.len() > self.limits.max_len {
            warn!(
                actual = bytes.len(),
                max = self.limits.max_len,
                "max length setting is too small for the encoded message"
            );
            output.length = self.limits.emit_length.then_some(0);
            return Err(CodecError::LengthExceeded {
                actual: bytes.len(),
                max: self.limits.max_len,
            });
        }
        output.length = self
            .limits
            .emit_length
            .then(|| u32::try_from(bytes.len()).unwrap_or(u32::MAX));
        output.payload = bytes;
        Ok(())
    }

    /// Rejects slot counts that differ from the field count.
    fn check_arity(&self, actual: usize) -> Result<(), CodecError> {
        if actual == self.fields.len() {
            Ok(())
        } else {
            Err(CodecError::ArityMismatch {
                expected: self.fields.len(),
                actual,
            })
        }
    }
}
