// crates/clock-gate-core/src/codec/mod.rs
// ============================================================================
// Module: Clock Gate Document Codec
// Description: Bidirectional mapping between typed field lists and documents.
// Purpose: Decode command, clock, and field payloads; encode value snapshots.
// Dependencies: serde_json, thiserror, tracing, crate::core
// ============================================================================

//! ## Overview
//! The codec is split into the per-path document walk ([`document`]), the
//! metadata/data envelope with its wrapping rule ([`envelope`]), and the
//! field-list codec that ties both to bounded buffers ([`mapper`]).
//! Security posture: payloads are untrusted; every failure is a typed error and
//! never a panic.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod document;
pub mod envelope;
pub mod mapper;


// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::FieldPathError;
use crate::core::LeafType;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use document::Document;
pub use document::decode_field;
pub use document::encode_field;
pub use document::read_scalar;
pub use envelope::JSON_DATA_TYPE_NAME;
pub use envelope::PayloadEnvelope;
pub use envelope::assemble_document;
pub use mapper::CodecLimits;
pub use mapper::DecodeReport;
pub use mapper::EncodeOutput;
pub use mapper::FieldCodec;
pub use mapper::FieldFailure;
pub use mapper::InputLength;
pub use mapper::frame_input;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Document codec errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// Input is not a valid enveloped document; no field was attempted.
    #[error("decode error: {0}")]
    Decode(String),
    /// A path segment is absent or an intermediate segment is not an object.
    #[error("field {path} not found at segment {segment}")]
    FieldNotFound {
        /// Dotted field path.
        path: String,
        /// First segment that could not be resolved.
        segment: String,
    },
    /// The leaf holds a value that cannot become the declared type.
    #[error("field {path} expected {expected}, found {found}")]
    TypeMismatch {
        /// Dotted field path.
        path: String,
        /// Declared leaf type.
        expected: LeafType,
        /// Runtime kind that was found.
        found: &'static str,
    },
    /// Serialized document exceeds the output capacity.
    #[error("encoded length {actual} exceeds max length {max}")]
    LengthExceeded {
        /// Serialized length in bytes.
        actual: usize,
        /// Configured capacity in bytes.
        max: usize,
    },
    /// Field path text is malformed.
    #[error(transparent)]
    InvalidFieldPath(#[from] FieldPathError),
    /// Two fields share one dotted path.
    #[error("duplicate field path: {0}")]
    DuplicateField(String),
    /// Slot count differs from the field count.
    #[error("expected {expected} values, got {actual}")]
    ArityMismatch {
        /// Field count.
        expected: usize,
        /// Provided slot count.
        actual: usize,
    },
    /// Document serialization failed.
    #[error("encode error: {0}")]
    Encode(String),
}
