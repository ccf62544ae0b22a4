//! Basic Transport Protocol header.
//!
//! ```text
//! +--------------------+--------------------+
//! |  Destination port  |     Port info      |
//! |       u16 BE       |       u16 BE       |
//! +--------------------+--------------------+
//! ```
//!
//! Port info is the source port for BTP-A (interactive) and destination
//! port info for BTP-B (non-interactive). Which one applies comes from the
//! GN common header, not from the BTP bytes, so the header does not store it.

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::codec::{check_len, WireEncode};
use crate::error::Result;
use crate::packet::{BtpPacket, Packet};
use crate::types::TransportType;

/// BTP header size in bytes.
pub const BTP_HEADER_LEN: usize = 4;

/// Well-known BTP-B destination ports.
pub mod ports {
    /// Cooperative Awareness Message.
    pub const CAM: u16 = 2001;
    /// Decentralized Environmental Notification Message.
    pub const DENM: u16 = 2002;
    /// MAP (topology) extended message.
    pub const MAPEM: u16 = 2003;
    /// Signal phase and timing extended message.
    pub const SPATEM: u16 = 2004;
    /// Infrastructure to vehicle information message.
    pub const IVIM: u16 = 2006;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BtpKind {
    /// Interactive transport, port info is the source port.
    A,
    /// Non-interactive transport, port info is destination port info.
    B,
}

impl BtpKind {
    pub fn from_transport(transport: &TransportType) -> Option<Self> {
        if *transport == TransportType::BTP_A {
            Some(BtpKind::A)
        } else if *transport == TransportType::BTP_B {
            Some(BtpKind::B)
        } else {
            None
        }
    }

    pub fn transport_type(&self) -> TransportType {
        match self {
            BtpKind::A => TransportType::BTP_A,
            BtpKind::B => TransportType::BTP_B,
        }
    }
}

/// The four BTP bytes.
///
/// Whether `port_info` is a source port or destination port info depends
/// on the transport code that selected the decoder, see
/// [`GeoNetworkingPacket::btp_kind`](crate::gn::GeoNetworkingPacket::btp_kind).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BtpHeader {
    pub destination_port: u16,
    pub port_info: u16,
}

impl BtpHeader {
    pub fn new(destination_port: u16, port_info: u16) -> Self {
        Self {
            destination_port,
            port_info,
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        check_len(data, BTP_HEADER_LEN)?;
        let mut buf = &data[..BTP_HEADER_LEN];
        Ok(Self {
            destination_port: buf.get_u16(),
            port_info: buf.get_u16(),
        })
    }

    pub fn source_port(&self, kind: BtpKind) -> Option<u16> {
        (kind == BtpKind::A).then_some(self.port_info)
    }

    pub fn destination_port_info(&self, kind: BtpKind) -> Option<u16> {
        (kind == BtpKind::B).then_some(self.port_info)
    }

    /// Render with port info named for `kind`; `None` leaves it generic.
    pub fn render(&self, kind: Option<BtpKind>) -> BtpRender<'_> {
        BtpRender { header: self, kind }
    }
}

impl WireEncode for BtpHeader {
    fn wire_len(&self) -> usize {
        BTP_HEADER_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.destination_port);
        buf.put_u16(self.port_info);
    }
}

/// Display adapter returned by [`BtpHeader::render`].
pub struct BtpRender<'a> {
    header: &'a BtpHeader,
    kind: Option<BtpKind>,
}

impl fmt::Display for BtpRender<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self
            .kind
            .map_or_else(|| "BTP".to_string(), |kind| kind.transport_type().name().to_string());
        writeln!(f, "[{title} Header ({BTP_HEADER_LEN} bytes)]")?;
        writeln!(f, "  Destination Port: {}", self.header.destination_port)?;
        let port_info = self.header.port_info;
        match self.kind {
            Some(BtpKind::A) => writeln!(f, "  Source Port: {port_info}"),
            Some(BtpKind::B) => writeln!(f, "  Destination Port Info: {port_info}"),
            None => writeln!(f, "  Port Info: {port_info}"),
        }
    }
}

impl fmt::Display for BtpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.render(None), f)
    }
}

impl BtpPacket {
    /// Decode a BTP header; anything after it is opaque application data.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let header = BtpHeader::decode(data)?;
        let rest = &data[BTP_HEADER_LEN..];
        let payload = (!rest.is_empty()).then(|| Packet::unknown(rest));
        Ok(Self::new(header, payload))
    }
}
