//! GN basic header.
//!
//! ```text
//!  0       4       8              16              24             32
//! +-------+-------+---------------+---------------+---------------+
//! |Version|  NH   |   Reserved    |   Lifetime    |  Remain. HL   |
//! +-------+-------+---------------+---------------+---------------+
//! ```

use std::fmt;
use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};

use crate::bits::BitField;
use crate::codec::{check_len, WireEncode};
use crate::error::Result;
use crate::types::{GnHeaderType, TypeRegistry};

/// Basic header size in bytes.
pub const BASIC_HEADER_LEN: usize = 4;

/// Protocol version written by current stacks.
pub const GN_PROTOCOL_VERSION: u8 = 1;

const VERSION: BitField = BitField::in_byte(0, 4);
const NEXT_HEADER: BitField = BitField::in_byte(4, 4);

/// Lifetime units, indexed by the 2-bit base, in milliseconds.
const LIFETIME_BASE_MS: [u64; 4] = [50, 1_000, 10_000, 100_000];

/// Packet lifetime as carried on the wire: 6-bit multiplier, 2-bit base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Lifetime(u8);

impl Lifetime {
    pub const MULTIPLIER: BitField = BitField::in_byte(0, 6);
    pub const BASE: BitField = BitField::in_byte(6, 2);

    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Fails if `multiplier` needs more than 6 bits or `base` more than 2.
    pub fn new(multiplier: u8, base: u8) -> Result<Self> {
        let raw = Self::MULTIPLIER.try_set(0, multiplier as u32)?;
        Ok(Self(Self::BASE.try_set(raw, base as u32)? as u8))
    }

    pub const fn raw(&self) -> u8 {
        self.0
    }

    pub const fn multiplier(&self) -> u8 {
        Self::MULTIPLIER.get(self.0 as u32) as u8
    }

    pub const fn base(&self) -> u8 {
        Self::BASE.get(self.0 as u32) as u8
    }

    pub fn as_millis(&self) -> u64 {
        self.multiplier() as u64 * LIFETIME_BASE_MS[self.base() as usize]
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.as_millis())
    }
}

fn format_base(base: u8) -> String {
    match LIFETIME_BASE_MS[base as usize] {
        ms if ms < 1_000 => format!("{ms} ms"),
        ms => format!("{} s", ms / 1_000),
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.as_millis();
        if self.base() == 0 {
            write!(f, "{ms} ms")
        } else {
            write!(f, "{} s", ms / 1_000)
        }
    }
}

/// GN basic header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicHeader {
    /// Protocol version (4 bits).
    pub version: u8,
    /// Header following the basic header.
    pub next_header: GnHeaderType,
    pub reserved: u8,
    pub lifetime: Lifetime,
    /// Remaining hop limit.
    pub remaining_hop_limit: u8,
}

impl BasicHeader {
    pub fn decode(data: &[u8], types: &TypeRegistry) -> Result<Self> {
        check_len(data, BASIC_HEADER_LEN)?;
        let mut buf = &data[..BASIC_HEADER_LEN];
        let first = buf.get_u8() as u32;
        Ok(Self {
            version: VERSION.get(first) as u8,
            next_header: types
                .gn_header_types()
                .lookup(NEXT_HEADER.get(first) as u8),
            reserved: buf.get_u8(),
            lifetime: Lifetime::from_raw(buf.get_u8()),
            remaining_hop_limit: buf.get_u8(),
        })
    }

    fn first_byte(&self) -> u32 {
        NEXT_HEADER.set(
            VERSION.set(0, self.version as u32),
            self.next_header.value() as u32,
        )
    }
}

impl WireEncode for BasicHeader {
    fn wire_len(&self) -> usize {
        BASIC_HEADER_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.first_byte() as u8);
        buf.put_u8(self.reserved);
        buf.put_u8(self.lifetime.raw());
        buf.put_u8(self.remaining_hop_limit);
    }

    fn validate(&self) -> Result<()> {
        let first = VERSION.try_set(0, self.version as u32)?;
        NEXT_HEADER.try_set(first, self.next_header.value() as u32)?;
        Ok(())
    }
}

impl fmt::Display for BasicHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.first_byte();
        let lifetime = self.lifetime.raw() as u32;
        writeln!(f, "[Basic Header ({BASIC_HEADER_LEN} bytes)]")?;
        writeln!(f, "  {} = Version: {}", VERSION.diagram(first), self.version)?;
        writeln!(
            f,
            "  {} = Next Header: {}",
            NEXT_HEADER.diagram(first),
            self.next_header
        )?;
        writeln!(f, "  Reserved: {}", self.reserved)?;
        writeln!(f, "  Lifetime: {}", self.lifetime)?;
        writeln!(
            f,
            "    {} = Multiplier: {}",
            Lifetime::MULTIPLIER.diagram(lifetime),
            self.lifetime.multiplier()
        )?;
        writeln!(
            f,
            "    {} = Base: {} ({})",
            Lifetime::BASE.diagram(lifetime),
            format_base(self.lifetime.base()),
            self.lifetime.base()
        )?;
        writeln!(f, "  Router Hop Limit: {}", self.remaining_hop_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    #[test]
    fn test_decode_encode_basic_header() {
        let data = [0x01, 0x00, 0x00, 0x01];
        let header = BasicHeader::decode(&data, &TypeRegistry::with_builtins()).unwrap();

        assert_eq!(header.version, 0);
        assert_eq!(header.next_header, GnHeaderType::COMMON);
        assert_eq!(header.next_header.name(), "Common");
        assert_eq!(header.reserved, 0);
        assert_eq!(header.lifetime.raw(), 0);
        assert_eq!(header.remaining_hop_limit, 1);
        assert_eq!(header.to_bytes().as_ref(), &data);
    }

    #[test]
    fn test_decode_basic_header_too_short() {
        let result = BasicHeader::decode(&[0x11, 0x00, 0x1A], &TypeRegistry::with_builtins());
        assert_eq!(
            result,
            Err(DecodeError::TooShort {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_lifetime() {
        // 001010 10: multiplier 10, base 10 s
        let lifetime = Lifetime::from_raw(0b0010_1010);
        assert_eq!(lifetime.multiplier(), 10);
        assert_eq!(lifetime.base(), 2);
        assert_eq!(lifetime.as_duration(), Duration::from_secs(100));
        assert_eq!(lifetime.to_string(), "100 s");
        assert_eq!(Lifetime::new(10, 2).unwrap(), lifetime);

        let lifetime = Lifetime::new(5, 0).unwrap();
        assert_eq!(lifetime.raw(), 0b0001_0100);
        assert_eq!(lifetime.as_millis(), 250);
        assert_eq!(lifetime.to_string(), "250 ms");

        assert_eq!(Lifetime::new(60, 1).unwrap().to_string(), "60 s");
        assert_eq!(Lifetime::new(63, 3).unwrap().as_duration(), Duration::from_secs(6300));
    }

    #[test]
    fn test_lifetime_rejects_wide_fields() {
        assert_eq!(
            Lifetime::new(64, 0),
            Err(DecodeError::ValueOutOfRange {
                value: 64,
                length: 6
            })
        );
        assert_eq!(
            Lifetime::new(1, 4),
            Err(DecodeError::ValueOutOfRange {
                value: 4,
                length: 2
            })
        );
    }

    #[test]
    fn test_basic_header_fields_checked_on_encode() {
        let header = BasicHeader {
            version: 0x1F,
            next_header: GnHeaderType::COMMON,
            reserved: 0,
            lifetime: Lifetime::default(),
            remaining_hop_limit: 1,
        };
        assert_eq!(
            header.try_to_bytes(),
            Err(DecodeError::ValueOutOfRange {
                value: 31,
                length: 4
            })
        );

        let header = BasicHeader {
            version: GN_PROTOCOL_VERSION,
            next_header: GnHeaderType::new(16, "Vendor"),
            ..header
        };
        assert_eq!(
            header.try_to_bytes(),
            Err(DecodeError::ValueOutOfRange {
                value: 16,
                length: 4
            })
        );

        let header = BasicHeader {
            next_header: GnHeaderType::SECURED,
            ..header
        };
        assert_eq!(header.try_to_bytes().unwrap().as_ref(), &[0x12, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_unknown_next_header() {
        let header =
            BasicHeader::decode(&[0x1F, 0x00, 0x1A, 0x0A], &TypeRegistry::with_builtins()).unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.next_header.value(), 15);
        assert_eq!(header.next_header.name(), "Unknown");
        assert_eq!(header.to_bytes().as_ref(), &[0x1F, 0x00, 0x1A, 0x0A]);
    }

    #[test]
    fn test_render_basic_header() {
        let header = BasicHeader {
            version: GN_PROTOCOL_VERSION,
            next_header: GnHeaderType::COMMON,
            reserved: 0,
            lifetime: Lifetime::new(10, 2).unwrap(),
            remaining_hop_limit: 10,
        };
        let text = header.to_string();
        assert!(text.starts_with("[Basic Header (4 bytes)]\n"));
        assert!(text.contains("  0001.... = Version: 1\n"));
        assert!(text.contains("  ....0001 = Next Header: Common (1)\n"));
        assert!(text.contains("  Lifetime: 100 s\n"));
        assert!(text.contains("    001010.. = Multiplier: 10\n"));
        assert!(text.contains("    ......10 = Base: 10 s (2)\n"));
    }
}
