//! Bit-field extraction and insertion.
//!
//! Offsets are counted from the most significant bit of the container, the
//! way the ETSI header diagrams number them:
//!
//! ```text
//!  bit   0   1   2   3   4   5   6   7
//!      +---+---+---+---+---+---+---+---+
//!      | M |   station type    | cc..  |
//!      +---+---+---+---+---+---+---+---+
//! ```

use crate::error::{DecodeError, Result};

/// An unsigned integer that can hold bit fields.
pub trait BitContainer: Copy {
    /// Container width in bits.
    const WIDTH: u32;

    fn to_u32(self) -> u32;

    /// Truncating conversion back into the container.
    fn from_u32(value: u32) -> Self;
}

impl BitContainer for u8 {
    const WIDTH: u32 = 8;

    fn to_u32(self) -> u32 {
        self as u32
    }

    fn from_u32(value: u32) -> Self {
        value as u8
    }
}

impl BitContainer for u16 {
    const WIDTH: u32 = 16;

    fn to_u32(self) -> u32 {
        self as u32
    }

    fn from_u32(value: u32) -> Self {
        value as u16
    }
}

fn check_range(width: u32, bit_offset: u32, bit_length: u32) -> Result<()> {
    if bit_length == 0 || bit_offset.saturating_add(bit_length) > width {
        return Err(DecodeError::OutOfRange {
            offset: bit_offset,
            length: bit_length,
            width,
        });
    }
    Ok(())
}

const fn low_mask(length: u32) -> u32 {
    if length >= 32 {
        u32::MAX
    } else {
        (1 << length) - 1
    }
}

/// Extract `bit_length` bits starting `bit_offset` bits below the MSB.
pub fn get_bits<C: BitContainer>(container: C, bit_offset: u32, bit_length: u32) -> Result<C> {
    check_range(C::WIDTH, bit_offset, bit_length)?;
    let shift = C::WIDTH - bit_offset - bit_length;
    Ok(C::from_u32(
        (container.to_u32() >> shift) & low_mask(bit_length),
    ))
}

/// Return `container` with the given bit range replaced by `value`.
///
/// Bits of `value` above `bit_length` are discarded.
pub fn set_bits<C: BitContainer>(
    container: C,
    bit_offset: u32,
    bit_length: u32,
    value: C,
) -> Result<C> {
    check_range(C::WIDTH, bit_offset, bit_length)?;
    let shift = C::WIDTH - bit_offset - bit_length;
    let mask = low_mask(bit_length) << shift;
    let merged = (container.to_u32() & !mask) | ((value.to_u32() << shift) & mask);
    Ok(C::from_u32(merged))
}

/// A bit range whose bounds are checked when the constant is evaluated.
///
/// Codecs declare their sub-byte fields as `const` values of this type, so
/// an invalid range fails the build instead of a decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    offset: u32,
    length: u32,
    width: u32,
}

impl BitField {
    /// A field inside an 8-bit container.
    pub const fn in_byte(offset: u32, length: u32) -> Self {
        Self::new(8, offset, length)
    }

    /// A field inside a 16-bit container.
    pub const fn in_short(offset: u32, length: u32) -> Self {
        Self::new(16, offset, length)
    }

    const fn new(width: u32, offset: u32, length: u32) -> Self {
        assert!(length > 0, "bit field has zero length");
        assert!(offset + length <= width, "bit field exceeds container");
        Self {
            offset,
            length,
            width,
        }
    }

    pub const fn offset(&self) -> u32 {
        self.offset
    }

    pub const fn length(&self) -> u32 {
        self.length
    }

    const fn shift(&self) -> u32 {
        self.width - self.offset - self.length
    }

    /// Largest value the field can hold.
    pub const fn max(&self) -> u32 {
        low_mask(self.length)
    }

    pub const fn get(&self, container: u32) -> u32 {
        (container >> self.shift()) & low_mask(self.length)
    }

    /// Replace the field; bits of `value` above the field width are dropped.
    pub const fn set(&self, container: u32, value: u32) -> u32 {
        let mask = low_mask(self.length) << self.shift();
        (container & !mask) | ((value << self.shift()) & mask)
    }

    /// Like [`BitField::set`], but fails if `value` does not fit.
    pub fn try_set(&self, container: u32, value: u32) -> Result<u32> {
        if value > self.max() {
            return Err(DecodeError::ValueOutOfRange {
                value: value as i64,
                length: self.length,
            });
        }
        Ok(self.set(container, value))
    }

    /// Smallest and largest two's complement value the field can hold.
    pub const fn signed_range(&self) -> (i32, i32) {
        let half = 1i32 << (self.length - 1);
        (-half, half - 1)
    }

    /// Read the field as a two's complement number.
    pub const fn get_signed(&self, container: u32) -> i32 {
        let unused = 32 - self.length;
        ((self.get(container) << unused) as i32) >> unused
    }

    /// Two's complement counterpart of [`BitField::try_set`].
    pub fn try_set_signed(&self, container: u32, value: i32) -> Result<u32> {
        let (min, max) = self.signed_range();
        if value < min || value > max {
            return Err(DecodeError::ValueOutOfRange {
                value: value as i64,
                length: self.length,
            });
        }
        Ok(self.set(container, value as u32))
    }

    /// Analyzer-style picture of the field inside its container.
    ///
    /// Bits outside the field are shown as `.`; 16-bit containers get a
    /// space between the two octets.
    pub fn diagram(&self, container: u32) -> String {
        let mut out = String::with_capacity(self.width as usize + 1);
        for bit in 0..self.width {
            if bit > 0 && bit % 8 == 0 {
                out.push(' ');
            }
            if bit < self.offset || bit >= self.offset + self.length {
                out.push('.');
            } else if container & (1 << (self.width - 1 - bit)) != 0 {
                out.push('1');
            } else {
                out.push('0');
            }
        }
        out
    }
}

/// Render `value` as exactly `bits` binary digits.
pub fn binary_string(value: u32, bits: u32) -> String {
    (0..bits)
        .rev()
        .map(|bit| if value & (1 << bit) != 0 { '1' } else { '0' })
        .collect()
}
