//! GN common header.
//!
//! ```text
//!  0       4       8       12      16              24             32
//! +-------+-------+-------+-------+---------------+---------------+
//! |  NH   |Reservd|  HT   |  HST  |      TC       |     Flags     |
//! +-------+-------+-------+-------+---------------+---------------+
//! |         Payload Length        |   Max HL      |   Reserved    |
//! +-------------------------------+---------------+---------------+
//! ```

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::bits::BitField;
use crate::codec::{check_len, WireEncode};
use crate::error::Result;
use crate::types::{ExtendedHeaderType, TransportType, TypeRegistry};

/// Common header size in bytes.
pub const COMMON_HEADER_LEN: usize = 8;

const NEXT_HEADER: BitField = BitField::in_byte(0, 4);
const RESERVED: BitField = BitField::in_byte(4, 4);

const STORE_CARRY_FORWARD: BitField = BitField::in_byte(0, 1);
const CHANNEL_OFFLOAD: BitField = BitField::in_byte(1, 1);
const DCC_PROFILE: BitField = BitField::in_byte(2, 6);

const MOBILE: BitField = BitField::in_byte(0, 1);
const FLAGS_RESERVED: BitField = BitField::in_byte(1, 7);

/// Traffic class byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TrafficClass {
    pub store_carry_forward: bool,
    pub channel_offload: bool,
    /// DCC profile identifier (6 bits).
    pub dcc_profile: u8,
}

impl TrafficClass {
    pub fn from_byte(byte: u8) -> Self {
        let byte = byte as u32;
        Self {
            store_carry_forward: STORE_CARRY_FORWARD.get(byte) == 1,
            channel_offload: CHANNEL_OFFLOAD.get(byte) == 1,
            dcc_profile: DCC_PROFILE.get(byte) as u8,
        }
    }

    fn flag_bits(&self) -> u32 {
        let byte = STORE_CARRY_FORWARD.set(0, self.store_carry_forward as u32);
        CHANNEL_OFFLOAD.set(byte, self.channel_offload as u32)
    }

    /// The DCC profile is masked to 6 bits.
    pub fn to_byte(&self) -> u8 {
        DCC_PROFILE.set(self.flag_bits(), self.dcc_profile as u32) as u8
    }

    pub fn try_to_byte(&self) -> Result<u8> {
        Ok(DCC_PROFILE.try_set(self.flag_bits(), self.dcc_profile as u32)? as u8)
    }
}

impl fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let byte = self.to_byte() as u32;
        writeln!(f, "Traffic Class: 0x{byte:02x}")?;
        writeln!(
            f,
            "  {} = Store Carry Forward: {}",
            STORE_CARRY_FORWARD.diagram(byte),
            self.store_carry_forward as u8
        )?;
        writeln!(
            f,
            "  {} = Channel Offload: {}",
            CHANNEL_OFFLOAD.diagram(byte),
            self.channel_offload as u8
        )?;
        writeln!(
            f,
            "  {} = DCC Profile ID: {}",
            DCC_PROFILE.diagram(byte),
            self.dcc_profile
        )
    }
}

/// GN common header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonHeader {
    /// Transport protocol carried after the extended header.
    pub next_header: TransportType,
    /// Low nibble of the first byte.
    pub reserved: u8,
    /// Selects the extended header that follows.
    pub header_type: ExtendedHeaderType,
    pub traffic_class: TrafficClass,
    /// Mobility flag in bit 0, remaining bits reserved.
    pub flags: u8,
    /// Payload length as announced by the sender. Not used for framing.
    pub payload_length: u16,
    pub max_hop_limit: u8,
    pub reserved_tail: u8,
}

impl CommonHeader {
    pub fn decode(data: &[u8], types: &TypeRegistry) -> Result<Self> {
        check_len(data, COMMON_HEADER_LEN)?;
        let mut buf = &data[..COMMON_HEADER_LEN];
        let first = buf.get_u8() as u32;
        Ok(Self {
            next_header: types
                .transport_types()
                .lookup(NEXT_HEADER.get(first) as u8),
            reserved: RESERVED.get(first) as u8,
            header_type: ExtendedHeaderType::from_byte(buf.get_u8(), types),
            traffic_class: TrafficClass::from_byte(buf.get_u8()),
            flags: buf.get_u8(),
            payload_length: buf.get_u16(),
            max_hop_limit: buf.get_u8(),
            reserved_tail: buf.get_u8(),
        })
    }

    pub fn is_mobile(&self) -> bool {
        MOBILE.get(self.flags as u32) == 1
    }

    fn first_byte(&self) -> u32 {
        RESERVED.set(
            NEXT_HEADER.set(0, self.next_header.value() as u32),
            self.reserved as u32,
        )
    }
}

impl WireEncode for CommonHeader {
    fn wire_len(&self) -> usize {
        COMMON_HEADER_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.first_byte() as u8);
        buf.put_u8(self.header_type.to_byte());
        buf.put_u8(self.traffic_class.to_byte());
        buf.put_u8(self.flags);
        buf.put_u16(self.payload_length);
        buf.put_u8(self.max_hop_limit);
        buf.put_u8(self.reserved_tail);
    }

    fn validate(&self) -> Result<()> {
        let first = NEXT_HEADER.try_set(0, self.next_header.value() as u32)?;
        RESERVED.try_set(first, self.reserved as u32)?;
        self.header_type.try_to_byte()?;
        self.traffic_class.try_to_byte()?;
        Ok(())
    }
}

impl fmt::Display for CommonHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.first_byte();
        let type_byte = self.header_type.to_byte() as u32;
        let flags = self.flags as u32;
        writeln!(f, "[Common Header ({COMMON_HEADER_LEN} bytes)]")?;
        writeln!(
            f,
            "  {} = Next Header: {}",
            NEXT_HEADER.diagram(first),
            self.next_header
        )?;
        writeln!(f, "  {} = Reserved: {}", RESERVED.diagram(first), self.reserved)?;
        writeln!(
            f,
            "  {} = Header Type: {}",
            ExtendedHeaderType::TYPE_FIELD.diagram(type_byte),
            self.header_type.header_type
        )?;
        writeln!(
            f,
            "  {} = Header Subtype: {}",
            ExtendedHeaderType::SUBTYPE_FIELD.diagram(type_byte),
            self.header_type.subtype
        )?;
        crate::codec::write_indented(f, "  ", &self.traffic_class)?;
        writeln!(f, "  Flags: 0x{flags:02x}")?;
        writeln!(
            f,
            "    {} = Mobile: {}",
            MOBILE.diagram(flags),
            if self.is_mobile() { "Yes" } else { "No" }
        )?;
        writeln!(
            f,
            "    {} = Reserved: {}",
            FLAGS_RESERVED.diagram(flags),
            FLAGS_RESERVED.get(flags)
        )?;
        writeln!(f, "  Payload Length: {}", self.payload_length)?;
        writeln!(f, "  Maximum Hop Limit: {}", self.max_hop_limit)?;
        writeln!(f, "  Reserved: {}", self.reserved_tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::types::{HeaderSubtype, PacketHeaderType};

    const DATA: [u8; 8] = [0x20, 0x40, 0x83, 0x80, 0x00, 0x10, 0x0A, 0x00];

    #[test]
    fn test_decode_common_header() {
        let header = CommonHeader::decode(&DATA, &TypeRegistry::with_builtins()).unwrap();

        assert_eq!(header.next_header, TransportType::BTP_B);
        assert_eq!(header.reserved, 0);
        assert_eq!(header.header_type, ExtendedHeaderType::GEO_BROADCAST_CIRCLE);
        assert_eq!(header.header_type.subtype, HeaderSubtype::CIRCLE);
        assert!(header.traffic_class.store_carry_forward);
        assert!(!header.traffic_class.channel_offload);
        assert_eq!(header.traffic_class.dcc_profile, 3);
        assert!(header.is_mobile());
        assert_eq!(header.payload_length, 16);
        assert_eq!(header.max_hop_limit, 10);
        assert_eq!(header.to_bytes().as_ref(), &DATA);
    }

    #[test]
    fn test_decode_common_header_too_short() {
        assert!(CommonHeader::decode(&DATA[..7], &TypeRegistry::with_builtins()).is_err());
    }

    #[test]
    fn test_reserved_bits_survive() {
        let data = [0x1F, 0x50, 0xFF, 0x7F, 0xFF, 0xFF, 0x01, 0xAA];
        let header = CommonHeader::decode(&data, &TypeRegistry::with_builtins()).unwrap();
        assert_eq!(header.reserved, 0xF);
        assert_eq!(header.header_type, ExtendedHeaderType::SINGLE_HOP_BROADCAST);
        assert_eq!(header.traffic_class.dcc_profile, 0x3F);
        assert!(!header.is_mobile());
        assert_eq!(header.reserved_tail, 0xAA);
        assert_eq!(header.to_bytes().as_ref(), &data);
    }

    #[test]
    fn test_common_header_fields_checked_on_encode() {
        let valid = CommonHeader::decode(&DATA, &TypeRegistry::with_builtins()).unwrap();
        assert_eq!(valid.try_to_bytes().unwrap().as_ref(), &DATA);

        let wide_profile = CommonHeader {
            traffic_class: TrafficClass {
                dcc_profile: 64,
                ..valid.traffic_class
            },
            ..valid.clone()
        };
        assert_eq!(
            wide_profile.try_to_bytes(),
            Err(DecodeError::ValueOutOfRange {
                value: 64,
                length: 6
            })
        );

        let wide_reserved = CommonHeader {
            reserved: 0x10,
            ..valid.clone()
        };
        assert!(wide_reserved.validate().is_err());

        let wide_type = CommonHeader {
            header_type: ExtendedHeaderType::new(
                PacketHeaderType::new(16, "Vendor"),
                HeaderSubtype::UNSPECIFIED,
            ),
            ..valid
        };
        assert!(wide_type.try_to_bytes().is_err());
    }

    #[test]
    fn test_render_common_header() {
        let header = CommonHeader::decode(&DATA, &TypeRegistry::with_builtins()).unwrap();
        let text = header.to_string();
        assert!(text.contains("  0010.... = Next Header: BTP-B (2)\n"));
        assert!(text.contains("  0100.... = Header Type: GeoBroadcast (4)\n"));
        assert!(text.contains("  ....0000 = Header Subtype: Circle (0)\n"));
        assert!(text.contains("    1....... = Store Carry Forward: 1\n"));
        assert!(text.contains("    1....... = Mobile: Yes\n"));
    }
}
