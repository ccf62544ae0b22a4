//! Error types for the GeoNetworking codec.
//!
//! Encoding shares these errors: a value too wide for its field is reported
//! by validation instead of being masked.

use thiserror::Error;

/// Errors raised while decoding a structure from the wire.
///
/// Unknown type codes are not errors: they resolve to "Unknown" codes and
/// placeholder values instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes remain than the structure being read needs.
    #[error("Too short: expected {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// A bit field does not fit inside its container.
    #[error("Bit field out of range: offset {offset} + length {length} in a {width}-bit container")]
    OutOfRange { offset: u32, length: u32, width: u32 },

    /// A field value needs more bits than the field has on the wire.
    #[error("Value {value} does not fit a {length}-bit field")]
    ValueOutOfRange { value: i64, length: u32 },

    /// The `(offset, length)` window does not lie inside the supplied buffer.
    #[error("Window out of bounds: offset {offset} + length {length} exceeds {available} bytes")]
    OutOfBounds {
        offset: usize,
        length: usize,
        available: usize,
    },
}

impl DecodeError {
    /// True for shortfalls that a layer converts into its fallback value.
    pub fn is_structural(&self) -> bool {
        matches!(self, DecodeError::TooShort { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DecodeError::TooShort {
            expected: 24,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Too short: expected 24 bytes, got 3");
        assert!(err.is_structural());

        let err = DecodeError::OutOfRange {
            offset: 6,
            length: 4,
            width: 8,
        };
        assert!(err.to_string().contains("8-bit"));
        assert!(!err.is_structural());

        let err = DecodeError::ValueOutOfRange {
            value: 31,
            length: 4,
        };
        assert_eq!(err.to_string(), "Value 31 does not fit a 4-bit field");
        assert!(!err.is_structural());
    }
}
