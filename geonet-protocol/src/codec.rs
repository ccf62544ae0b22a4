//! Shared encode/decode plumbing.

use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::error::{DecodeError, Result};

/// A structure with an exact wire representation.
pub trait WireEncode {
    /// Number of bytes [`WireEncode::encode`] writes.
    fn wire_len(&self) -> usize;

    /// Append the wire representation to `buf`.
    ///
    /// Values wider than their field are masked; call
    /// [`WireEncode::validate`] first, or use [`WireEncode::try_to_bytes`].
    fn encode(&self, buf: &mut BytesMut);

    /// Check that every field fits its wire width.
    ///
    /// Decoded values always pass; values built by hand may not.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Validate, then encode.
    fn try_to_bytes(&self) -> Result<Bytes> {
        self.validate()?;
        Ok(self.to_bytes())
    }
}

/// Fail with `TooShort` unless `data` holds at least `expected` bytes.
pub(crate) fn check_len(data: &[u8], expected: usize) -> Result<()> {
    if data.len() < expected {
        return Err(DecodeError::TooShort {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Borrow `data[offset..offset + length]`, checking the window first.
pub fn window(data: &[u8], offset: usize, length: usize) -> Result<&[u8]> {
    match offset.checked_add(length) {
        Some(end) if end <= data.len() => Ok(&data[offset..end]),
        _ => Err(DecodeError::OutOfBounds {
            offset,
            length,
            available: data.len(),
        }),
    }
}

/// Write every line of `item` prefixed with `prefix`.
pub(crate) fn write_indented(
    f: &mut fmt::Formatter<'_>,
    prefix: &str,
    item: &dyn fmt::Display,
) -> fmt::Result {
    for line in item.to_string().lines() {
        writeln!(f, "{prefix}{line}")?;
    }
    Ok(())
}

/// Title line followed by `item` indented by two spaces.
pub(crate) fn write_section(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    item: &dyn fmt::Display,
) -> fmt::Result {
    writeln!(f, "{title}")?;
    write_indented(f, "  ", item)
}

/// Lower-case hex without separators.
pub fn hex_string(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

/// Colon separated MAC notation.
pub fn mac_string(mac: &[u8]) -> String {
    mac.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_len() {
        assert!(check_len(&[0; 4], 4).is_ok());
        assert_eq!(
            check_len(&[0; 3], 4),
            Err(DecodeError::TooShort {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_window() {
        let data = [1u8, 2, 3, 4, 5];
        assert_eq!(window(&data, 1, 3).unwrap(), &[2, 3, 4]);
        assert_eq!(window(&data, 5, 0).unwrap(), &[] as &[u8]);
        assert!(matches!(
            window(&data, 4, 2),
            Err(DecodeError::OutOfBounds { available: 5, .. })
        ));
        assert!(window(&data, usize::MAX, 2).is_err());
    }

    #[test]
    fn test_hex_and_mac() {
        assert_eq!(hex_string(&[0x01, 0xAB]), "01ab");
        assert_eq!(mac_string(&[0, 0x11, 0xFF]), "00:11:ff");
    }
}
