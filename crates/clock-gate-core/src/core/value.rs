// crates/clock-gate-core/src/core/value.rs
// ============================================================================
// Module: Clock Gate Typed Values
// Description: Tagged scalar values and the leaf conversion table.
// Purpose: Convert between document scalars and declared leaf types.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Documents only know three scalar kinds: numbers, booleans, and strings.
//! [`TypedValue`] carries one value per [`LeafType`]. Numbers convert to any
//! numeric leaf at the boundary (integers keep full precision, floats truncate
//! toward zero and saturate at the target range). Booleans and strings never
//! convert to anything else.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Number;
use serde_json::Value;

use crate::core::field::LeafType;

// ============================================================================
// SECTION: Scalars
// ============================================================================

/// Scalar read from a document leaf, typed by the document itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// JSON number.
    Number(Number),
    /// JSON boolean.
    Bool(bool),
    /// JSON string.
    String(String),
}

impl Scalar {
    /// Reads a scalar from a document value; objects, arrays, and null yield `None`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => Some(Self::Number(number.clone())),
            Value::Bool(flag) => Some(Self::Bool(*flag)),
            Value::String(text) => Some(Self::String(text.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Returns the scalar kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
        }
    }
}

/// Returns the kind label for any document value.
#[must_use]
pub const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// SECTION: Typed Values
// ============================================================================

/// Value tagged with one of the supported leaf types.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// 64-bit float.
    Float64(f64),
    /// 32-bit float.
    Float32(f32),
    /// Signed 8-bit integer.
    Int8(i8),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 8-bit integer.
    Uint8(u8),
    /// Unsigned 16-bit integer.
    Uint16(u16),
    /// Unsigned 32-bit integer.
    Uint32(u32),
    /// Unsigned 64-bit integer.
    Uint64(u64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    String(String),
}

impl TypedValue {
    /// Returns the leaf type carried by the value.
    #[must_use]
    pub const fn leaf_type(&self) -> LeafType {
        match self {
            Self::Float64(_) => LeafType::Float64,
            Self::Float32(_) => LeafType::Float32,
            Self::Int8(_) => LeafType::Int8,
            Self::Int16(_) => LeafType::Int16,
            Self::Int32(_) => LeafType::Int32,
            Self::Int64(_) => LeafType::Int64,
            Self::Uint8(_) => LeafType::Uint8,
            Self::Uint16(_) => LeafType::Uint16,
            Self::Uint32(_) => LeafType::Uint32,
            Self::Uint64(_) => LeafType::Uint64,
            Self::Bool(_) => LeafType::Bool,
            Self::String(_) => LeafType::String,
        }
    }

    /// Converts a document scalar into the declared leaf type.
    ///
    /// Returns `None` when the scalar kind cannot become the leaf type
    /// (for example a string read into a numeric leaf).
    #[must_use]
    pub fn from_scalar(leaf: LeafType, scalar: Scalar) -> Option<Self> {
        match (leaf, scalar) {
            (LeafType::Bool, Scalar::Bool(flag)) => Some(Self::Bool(flag)),
            (LeafType::String, Scalar::String(text)) => Some(Self::String(text)),
            (leaf, Scalar::Number(number)) if leaf.is_numeric() => Some(cast_number(leaf, &number)),
            _ => None,
        }
    }

    /// Converts an arbitrary document value into the declared leaf type.
    #[must_use]
    pub fn from_json(leaf: LeafType, value: &Value) -> Option<Self> {
        Scalar::from_value(value).and_then(|scalar| Self::from_scalar(leaf, scalar))
    }

    /// Re-tags the value as another leaf type using the same conversion table.
    #[must_use]
    pub fn cast(&self, leaf: LeafType) -> Option<Self> {
        if self.leaf_type() == leaf {
            return Some(self.clone());
        }
        Self::from_json(leaf, &self.to_json())
    }

    /// Returns the document representation; non-finite floats become null.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Float64(value) => Number::from_f64(*value).map_or(Value::Null, Value::Number),
            Self::Float32(value) => {
                Number::from_f64(f64::from(*value)).map_or(Value::Null, Value::Number)
            }
            Self::Int8(value) => Value::from(*value),
            Self::Int16(value) => Value::from(*value),
            Self::Int32(value) => Value::from(*value),
            Self::Int64(value) => Value::from(*value),
            Self::Uint8(value) => Value::from(*value),
            Self::Uint16(value) => Value::from(*value),
            Self::Uint32(value) => Value::from(*value),
            Self::Uint64(value) => Value::from(*value),
            Self::Bool(value) => Value::Bool(*value),
            Self::String(value) => Value::String(value.clone()),
        }
    }
}

// ============================================================================
// SECTION: Conversion Table
// ============================================================================

/// Converts a document number into a numeric leaf type.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Float-to-float narrowing is the declared leaf conversion."
)]
fn cast_number(leaf: LeafType, number: &Number) -> TypedValue {
    let float = number.as_f64().unwrap_or(0.0);
    match leaf {
        LeafType::Float64 => TypedValue::Float64(float),
        LeafType::Float32 => TypedValue::Float32(float as f32),
        LeafType::Int8 => TypedValue::Int8(narrow_signed(signed_of(number), i8::MIN, i8::MAX)),
        LeafType::Int16 => TypedValue::Int16(narrow_signed(signed_of(number), i16::MIN, i16::MAX)),
        LeafType::Int32 => TypedValue::Int32(narrow_signed(signed_of(number), i32::MIN, i32::MAX)),
        LeafType::Int64 => TypedValue::Int64(signed_of(number)),
        LeafType::Uint8 => TypedValue::Uint8(narrow_unsigned(unsigned_of(number), u8::MAX)),
        LeafType::Uint16 => TypedValue::Uint16(narrow_unsigned(unsigned_of(number), u16::MAX)),
        LeafType::Uint32 => TypedValue::Uint32(narrow_unsigned(unsigned_of(number), u32::MAX)),
        LeafType::Uint64 => TypedValue::Uint64(unsigned_of(number)),
        // Non-numeric leaves never reach this table.
        LeafType::Bool => TypedValue::Bool(float != 0.0),
        LeafType::String => TypedValue::String(number.to_string()),
    }
}

/// Reads a number as `i64`, saturating out-of-range values.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Float-to-int casts saturate and truncate toward zero."
)]
fn signed_of(number: &Number) -> i64 {
    if let Some(value) = number.as_i64() {
        return value;
    }
    if number.as_u64().is_some() {
        return i64::MAX;
    }
    number.as_f64().map_or(0, |value| value as i64)
}

/// Reads a number as `u64`, saturating out-of-range values.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Float-to-int casts saturate and truncate toward zero."
)]
fn unsigned_of(number: &Number) -> u64 {
    if let Some(value) = number.as_u64() {
        return value;
    }
    if number.as_i64().is_some() {
        return 0;
    }
    number.as_f64().map_or(0, |value| value as u64)
}

/// Narrows an `i64` into a smaller signed type, saturating at the bounds.
fn narrow_signed<T>(value: i64, min: T, max: T) -> T
where
    T: TryFrom<i64> + Into<i64> + Copy,
{
    let clamped = value.clamp(min.into(), max.into());
    T::try_from(clamped).unwrap_or(if value < 0 { min } else { max })
}

/// Narrows a `u64` into a smaller unsigned type, saturating at the bound.
fn narrow_unsigned<T>(value: u64, max: T) -> T
where
    T: TryFrom<u64> + Into<u64> + Copy,
{
    T::try_from(value.min(max.into())).unwrap_or(max)
}
