//! GN extended headers.
//!
//! The common header's header type and subtype select one of these
//! layouts. Sizes are fixed per variant:
//!
//! | Variant               | Layout                                   | Bytes |
//! |-----------------------|------------------------------------------|-------|
//! | Beacon                | SO PV                                    | 24    |
//! | GeoUnicast            | SN, Rsvd, SO PV, DE PV (short)           | 48    |
//! | GeoAnycast/Broadcast  | SN, Rsvd, SO PV, Lat, Long, A, B, Angle, Rsvd | 44 |
//! | Single-hop broadcast  | SO PV, media dependent data (4)          | 28    |
//! | Multi-hop broadcast   | SN, Rsvd, SO PV                          | 28    |
//! | LS request            | SN, Rsvd, SO PV, Request GN_ADDR         | 36    |
//! | LS reply              | SN, Rsvd, SO PV, DE PV (short)           | 48    |

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::secured::SecuredHeader;
use crate::codec::{check_len, hex_string, write_section, WireEncode};
use crate::error::Result;
use crate::position::{
    Address, LongPositionVector, ShortPositionVector, ADDRESS_LEN, LONG_POSITION_VECTOR_LEN,
    SHORT_POSITION_VECTOR_LEN,
};
use crate::types::TypeRegistry;

pub const BEACON_HEADER_LEN: usize = LONG_POSITION_VECTOR_LEN;
pub const GEO_UNICAST_HEADER_LEN: usize = 4 + LONG_POSITION_VECTOR_LEN + SHORT_POSITION_VECTOR_LEN;
pub const GEO_AREA_HEADER_LEN: usize = 4 + LONG_POSITION_VECTOR_LEN + 16;
pub const SINGLE_HOP_BROADCAST_HEADER_LEN: usize = LONG_POSITION_VECTOR_LEN + 4;
pub const MULTI_HOP_BROADCAST_HEADER_LEN: usize = 4 + LONG_POSITION_VECTOR_LEN;
pub const LS_REQUEST_HEADER_LEN: usize = 4 + LONG_POSITION_VECTOR_LEN + ADDRESS_LEN;
pub const LS_REPLY_HEADER_LEN: usize = 4 + LONG_POSITION_VECTOR_LEN + SHORT_POSITION_VECTOR_LEN;

/// Sequence number and reserved word that open most extended headers.
fn read_prefix(data: &[u8]) -> (u16, u16) {
    let mut buf = data;
    (buf.get_u16(), buf.get_u16())
}

fn write_prefix(f: &mut fmt::Formatter<'_>, sequence_number: u16, reserved: u16) -> fmt::Result {
    writeln!(f, "  Sequence Number: {sequence_number}")?;
    writeln!(f, "  Reserved: {reserved}")
}

/// Periodic beacon carrying only the sender's position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconHeader {
    pub source: LongPositionVector,
}

impl BeaconHeader {
    pub fn decode(data: &[u8], types: &TypeRegistry) -> Result<Self> {
        check_len(data, BEACON_HEADER_LEN)?;
        Ok(Self {
            source: LongPositionVector::decode(data, types)?,
        })
    }
}

impl WireEncode for BeaconHeader {
    fn wire_len(&self) -> usize {
        BEACON_HEADER_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        self.source.encode(buf);
    }

    fn validate(&self) -> Result<()> {
        self.source.validate()
    }
}

impl fmt::Display for BeaconHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Beacon Header ({BEACON_HEADER_LEN} bytes)]")?;
        write_section(f, "  Source Position Vector", &Indent(&self.source))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoUnicastHeader {
    pub sequence_number: u16,
    pub reserved: u16,
    pub source: LongPositionVector,
    pub destination: ShortPositionVector,
}

impl GeoUnicastHeader {
    pub fn decode(data: &[u8], types: &TypeRegistry) -> Result<Self> {
        check_len(data, GEO_UNICAST_HEADER_LEN)?;
        let (sequence_number, reserved) = read_prefix(data);
        Ok(Self {
            sequence_number,
            reserved,
            source: LongPositionVector::decode(&data[4..], types)?,
            destination: ShortPositionVector::decode(&data[4 + LONG_POSITION_VECTOR_LEN..], types)?,
        })
    }
}

impl WireEncode for GeoUnicastHeader {
    fn wire_len(&self) -> usize {
        GEO_UNICAST_HEADER_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.sequence_number);
        buf.put_u16(self.reserved);
        self.source.encode(buf);
        self.destination.encode(buf);
    }

    fn validate(&self) -> Result<()> {
        self.source.validate()?;
        self.destination.validate()
    }
}

impl fmt::Display for GeoUnicastHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[GeoUnicast Header ({GEO_UNICAST_HEADER_LEN} bytes)]")?;
        write_prefix(f, self.sequence_number, self.reserved)?;
        write_section(f, "  Source Position Vector", &Indent(&self.source))?;
        write_section(f, "  Destination Position Vector", &Indent(&self.destination))
    }
}

/// Area header shared by GeoAnycast and GeoBroadcast.
///
/// The subtype in the common header says whether the area is a circle,
/// a rectangle or an ellipse; the fields are laid out the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoAreaHeader {
    pub sequence_number: u16,
    pub reserved: u16,
    pub source: LongPositionVector,
    /// Area centre, 1/10 microdegree.
    pub latitude: i32,
    pub longitude: i32,
    /// Metres.
    pub distance_a: u16,
    pub distance_b: u16,
    /// Degrees from north.
    pub angle: u16,
    pub reserved_tail: u16,
}

impl GeoAreaHeader {
    pub fn decode(data: &[u8], types: &TypeRegistry) -> Result<Self> {
        check_len(data, GEO_AREA_HEADER_LEN)?;
        let (sequence_number, reserved) = read_prefix(data);
        let source = LongPositionVector::decode(&data[4..], types)?;
        let mut buf = &data[4 + LONG_POSITION_VECTOR_LEN..GEO_AREA_HEADER_LEN];
        Ok(Self {
            sequence_number,
            reserved,
            source,
            latitude: buf.get_i32(),
            longitude: buf.get_i32(),
            distance_a: buf.get_u16(),
            distance_b: buf.get_u16(),
            angle: buf.get_u16(),
            reserved_tail: buf.get_u16(),
        })
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
        writeln!(f, "[{title} Header ({GEO_AREA_HEADER_LEN} bytes)]")?;
        write_prefix(f, self.sequence_number, self.reserved)?;
        write_section(f, "  Source Position Vector", &Indent(&self.source))?;
        writeln!(
            f,
            "  Area Latitude: {} ({})",
            crate::position::format_coordinate(self.latitude, 'N', 'S'),
            self.latitude
        )?;
        writeln!(
            f,
            "  Area Longitude: {} ({})",
            crate::position::format_coordinate(self.longitude, 'E', 'W'),
            self.longitude
        )?;
        writeln!(f, "  Distance A: {} m", self.distance_a)?;
        writeln!(f, "  Distance B: {} m", self.distance_b)?;
        writeln!(f, "  Angle: {}°", self.angle)?;
        writeln!(f, "  Reserved: {}", self.reserved_tail)
    }
}

impl WireEncode for GeoAreaHeader {
    fn wire_len(&self) -> usize {
        GEO_AREA_HEADER_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.sequence_number);
        buf.put_u16(self.reserved);
        self.source.encode(buf);
        buf.put_i32(self.latitude);
        buf.put_i32(self.longitude);
        buf.put_u16(self.distance_a);
        buf.put_u16(self.distance_b);
        buf.put_u16(self.angle);
        buf.put_u16(self.reserved_tail);
    }

    fn validate(&self) -> Result<()> {
        self.source.validate()
    }
}

/// Topologically-scoped broadcast limited to one hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleHopBroadcastHeader {
    pub source: LongPositionVector,
    /// Media-dependent data, opaque here.
    pub reserved: u32,
}

impl SingleHopBroadcastHeader {
    pub fn decode(data: &[u8], types: &TypeRegistry) -> Result<Self> {
        check_len(data, SINGLE_HOP_BROADCAST_HEADER_LEN)?;
        let source = LongPositionVector::decode(data, types)?;
        let mut buf = &data[LONG_POSITION_VECTOR_LEN..SINGLE_HOP_BROADCAST_HEADER_LEN];
        Ok(Self {
            source,
            reserved: buf.get_u32(),
        })
    }
}

impl WireEncode for SingleHopBroadcastHeader {
    fn wire_len(&self) -> usize {
        SINGLE_HOP_BROADCAST_HEADER_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        self.source.encode(buf);
        buf.put_u32(self.reserved);
    }

    fn validate(&self) -> Result<()> {
        self.source.validate()
    }
}

impl fmt::Display for SingleHopBroadcastHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[Single-Hop Broadcast Header ({SINGLE_HOP_BROADCAST_HEADER_LEN} bytes)]"
        )?;
        write_section(f, "  Source Position Vector", &Indent(&self.source))?;
        writeln!(f, "  Reserved: {}", self.reserved)
    }
}

/// Topologically-scoped broadcast over several hops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiHopBroadcastHeader {
    pub sequence_number: u16,
    pub reserved: u16,
    pub source: LongPositionVector,
}

impl MultiHopBroadcastHeader {
    pub fn decode(data: &[u8], types: &TypeRegistry) -> Result<Self> {
        check_len(data, MULTI_HOP_BROADCAST_HEADER_LEN)?;
        let (sequence_number, reserved) = read_prefix(data);
        Ok(Self {
            sequence_number,
            reserved,
            source: LongPositionVector::decode(&data[4..], types)?,
        })
    }
}

impl WireEncode for MultiHopBroadcastHeader {
    fn wire_len(&self) -> usize {
        MULTI_HOP_BROADCAST_HEADER_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.sequence_number);
        buf.put_u16(self.reserved);
        self.source.encode(buf);
    }

    fn validate(&self) -> Result<()> {
        self.source.validate()
    }
}

impl fmt::Display for MultiHopBroadcastHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[Multi-Hop Broadcast Header ({MULTI_HOP_BROADCAST_HEADER_LEN} bytes)]"
        )?;
        write_prefix(f, self.sequence_number, self.reserved)?;
        write_section(f, "  Source Position Vector", &Indent(&self.source))
    }
}

/// Location service request for the position of `request_address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsRequestHeader {
    pub sequence_number: u16,
    pub reserved: u16,
    pub source: LongPositionVector,
    pub request_address: Address,
}

impl LsRequestHeader {
    pub fn decode(data: &[u8], types: &TypeRegistry) -> Result<Self> {
        check_len(data, LS_REQUEST_HEADER_LEN)?;
        let (sequence_number, reserved) = read_prefix(data);
        Ok(Self {
            sequence_number,
            reserved,
            source: LongPositionVector::decode(&data[4..], types)?,
            request_address: Address::decode(&data[4 + LONG_POSITION_VECTOR_LEN..], types)?,
        })
    }
}

impl WireEncode for LsRequestHeader {
    fn wire_len(&self) -> usize {
        LS_REQUEST_HEADER_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.sequence_number);
        buf.put_u16(self.reserved);
        self.source.encode(buf);
        self.request_address.encode(buf);
    }

    fn validate(&self) -> Result<()> {
        self.source.validate()
    }
}

impl fmt::Display for LsRequestHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[LS Request Header ({LS_REQUEST_HEADER_LEN} bytes)]")?;
        write_prefix(f, self.sequence_number, self.reserved)?;
        write_section(f, "  Source Position Vector", &Indent(&self.source))?;
        write_section(f, "  Request", &Indent(&self.request_address))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsReplyHeader {
    pub sequence_number: u16,
    pub reserved: u16,
    pub source: LongPositionVector,
    pub destination: ShortPositionVector,
}

impl LsReplyHeader {
    pub fn decode(data: &[u8], types: &TypeRegistry) -> Result<Self> {
        check_len(data, LS_REPLY_HEADER_LEN)?;
        let (sequence_number, reserved) = read_prefix(data);
        Ok(Self {
            sequence_number,
            reserved,
            source: LongPositionVector::decode(&data[4..], types)?,
            destination: ShortPositionVector::decode(&data[4 + LONG_POSITION_VECTOR_LEN..], types)?,
        })
    }
}

impl WireEncode for LsReplyHeader {
    fn wire_len(&self) -> usize {
        LS_REPLY_HEADER_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.sequence_number);
        buf.put_u16(self.reserved);
        self.source.encode(buf);
        self.destination.encode(buf);
    }

    fn validate(&self) -> Result<()> {
        self.source.validate()?;
        self.destination.validate()
    }
}

impl fmt::Display for LsReplyHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[LS Reply Header ({LS_REPLY_HEADER_LEN} bytes)]")?;
        write_prefix(f, self.sequence_number, self.reserved)?;
        write_section(f, "  Source Position Vector", &Indent(&self.source))?;
        write_section(f, "  Destination Position Vector", &Indent(&self.destination))
    }
}

/// Renders the wrapped value two spaces deeper than its section title.
struct Indent<'a>(&'a dyn fmt::Display);

impl fmt::Display for Indent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::codec::write_indented(f, "  ", self.0)
    }
}

/// Every header that may follow the basic or common header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendedHeader {
    Beacon(BeaconHeader),
    GeoUnicast(GeoUnicastHeader),
    GeoAnycast(GeoAreaHeader),
    GeoBroadcast(GeoAreaHeader),
    SingleHopBroadcast(SingleHopBroadcastHeader),
    MultiHopBroadcast(MultiHopBroadcastHeader),
    LsRequest(LsRequestHeader),
    LsReply(LsReplyHeader),
    /// Security envelope, framed but not verified.
    Secured(SecuredHeader),
    /// Bytes a registered decoder could not parse.
    Malformed(Bytes),
    /// Placeholder for codes without a decoder; occupies no bytes.
    Empty,
}

impl ExtendedHeader {
    /// Variant name, used as the dispatch target descriptor.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtendedHeader::Beacon(_) => "Beacon",
            ExtendedHeader::GeoUnicast(_) => "GeoUnicast",
            ExtendedHeader::GeoAnycast(_) => "GeoAnycast",
            ExtendedHeader::GeoBroadcast(_) => "GeoBroadcast",
            ExtendedHeader::SingleHopBroadcast(_) => "SingleHopBroadcast",
            ExtendedHeader::MultiHopBroadcast(_) => "MultiHopBroadcast",
            ExtendedHeader::LsRequest(_) => "LsRequest",
            ExtendedHeader::LsReply(_) => "LsReply",
            ExtendedHeader::Secured(_) => "Secured",
            ExtendedHeader::Malformed(_) => "Malformed",
            ExtendedHeader::Empty => "Empty",
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, ExtendedHeader::Malformed(_))
    }

    /// Source position vector, for variants that carry one.
    pub fn source(&self) -> Option<&LongPositionVector> {
        match self {
            ExtendedHeader::Beacon(h) => Some(&h.source),
            ExtendedHeader::GeoUnicast(h) => Some(&h.source),
            ExtendedHeader::GeoAnycast(h) | ExtendedHeader::GeoBroadcast(h) => Some(&h.source),
            ExtendedHeader::SingleHopBroadcast(h) => Some(&h.source),
            ExtendedHeader::MultiHopBroadcast(h) => Some(&h.source),
            ExtendedHeader::LsRequest(h) => Some(&h.source),
            ExtendedHeader::LsReply(h) => Some(&h.source),
            _ => None,
        }
    }
}

impl WireEncode for ExtendedHeader {
    fn wire_len(&self) -> usize {
        match self {
            ExtendedHeader::Beacon(h) => h.wire_len(),
            ExtendedHeader::GeoUnicast(h) => h.wire_len(),
            ExtendedHeader::GeoAnycast(h) | ExtendedHeader::GeoBroadcast(h) => h.wire_len(),
            ExtendedHeader::SingleHopBroadcast(h) => h.wire_len(),
            ExtendedHeader::MultiHopBroadcast(h) => h.wire_len(),
            ExtendedHeader::LsRequest(h) => h.wire_len(),
            ExtendedHeader::LsReply(h) => h.wire_len(),
            ExtendedHeader::Secured(h) => h.wire_len(),
            ExtendedHeader::Malformed(data) => data.len(),
            ExtendedHeader::Empty => 0,
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        match self {
            ExtendedHeader::Beacon(h) => h.encode(buf),
            ExtendedHeader::GeoUnicast(h) => h.encode(buf),
            ExtendedHeader::GeoAnycast(h) | ExtendedHeader::GeoBroadcast(h) => h.encode(buf),
            ExtendedHeader::SingleHopBroadcast(h) => h.encode(buf),
            ExtendedHeader::MultiHopBroadcast(h) => h.encode(buf),
            ExtendedHeader::LsRequest(h) => h.encode(buf),
            ExtendedHeader::LsReply(h) => h.encode(buf),
            ExtendedHeader::Secured(h) => h.encode(buf),
            ExtendedHeader::Malformed(data) => buf.put_slice(data),
            ExtendedHeader::Empty => {}
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            ExtendedHeader::Beacon(h) => h.validate(),
            ExtendedHeader::GeoUnicast(h) => h.validate(),
            ExtendedHeader::GeoAnycast(h) | ExtendedHeader::GeoBroadcast(h) => h.validate(),
            ExtendedHeader::SingleHopBroadcast(h) => h.validate(),
            ExtendedHeader::MultiHopBroadcast(h) => h.validate(),
            ExtendedHeader::LsRequest(h) => h.validate(),
            ExtendedHeader::LsReply(h) => h.validate(),
            ExtendedHeader::Secured(h) => h.validate(),
            ExtendedHeader::Malformed(_) | ExtendedHeader::Empty => Ok(()),
        }
    }
}

impl fmt::Display for ExtendedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtendedHeader::Beacon(h) => fmt::Display::fmt(h, f),
            ExtendedHeader::GeoUnicast(h) => fmt::Display::fmt(h, f),
            ExtendedHeader::GeoAnycast(h) => h.write(f, "GeoAnycast"),
            ExtendedHeader::GeoBroadcast(h) => h.write(f, "GeoBroadcast"),
            ExtendedHeader::SingleHopBroadcast(h) => fmt::Display::fmt(h, f),
            ExtendedHeader::MultiHopBroadcast(h) => fmt::Display::fmt(h, f),
            ExtendedHeader::LsRequest(h) => fmt::Display::fmt(h, f),
            ExtendedHeader::LsReply(h) => fmt::Display::fmt(h, f),
            ExtendedHeader::Secured(h) => fmt::Display::fmt(h, f),
            ExtendedHeader::Malformed(data) => {
                writeln!(f, "[Malformed Header ({} bytes)]", data.len())?;
                writeln!(f, "  Hex stream: {}", hex_string(data))
            }
            ExtendedHeader::Empty => Ok(()),
        }
    }
}
