//! Composite packets.
//!
//! A decoded frame is a chain of layers: each layer owns its header(s) and
//! optionally the packet carried in its payload.
//!
//! ```text
//! CohdaRx -> Ethernet -> GeoNetworking -> Btp -> Unknown (application data)
//! ```

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::btp::BtpHeader;
use crate::codec::{hex_string, WireEncode};
use crate::cohda::{CohdaRxHeader, CohdaTxHeader};
use crate::error::{DecodeError, Result};
use crate::ethernet::EthernetHeader;
use crate::gn::GeoNetworkingPacket;

/// A header followed by an optional nested packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayeredPacket<H> {
    header: H,
    payload: Option<Box<Packet>>,
}

pub type CohdaRxPacket = LayeredPacket<CohdaRxHeader>;
pub type CohdaTxPacket = LayeredPacket<CohdaTxHeader>;
pub type EthernetPacket = LayeredPacket<EthernetHeader>;
pub type BtpPacket = LayeredPacket<BtpHeader>;

impl<H> LayeredPacket<H> {
    pub fn new(header: H, payload: Option<Packet>) -> Self {
        Self {
            header,
            payload: payload.map(Box::new),
        }
    }

    pub fn header(&self) -> &H {
        &self.header
    }

    pub fn payload(&self) -> Option<&Packet> {
        self.payload.as_deref()
    }

    /// Copy of this packet carrying a different payload.
    pub fn with_payload(&self, payload: Option<Packet>) -> Self
    where
        H: Clone,
    {
        Self::new(self.header.clone(), payload)
    }

    /// Copy of this packet with a different header.
    pub fn with_header(&self, header: H) -> Self {
        Self {
            header,
            payload: self.payload.clone(),
        }
    }

    pub fn into_parts(self) -> (H, Option<Packet>) {
        (self.header, self.payload.map(|p| *p))
    }
}

impl<H: WireEncode> WireEncode for LayeredPacket<H> {
    fn wire_len(&self) -> usize {
        self.header.wire_len() + self.payload.as_ref().map_or(0, |p| p.wire_len())
    }

    fn encode(&self, buf: &mut BytesMut) {
        self.header.encode(buf);
        if let Some(payload) = &self.payload {
            payload.encode(buf);
        }
    }

    fn validate(&self) -> Result<()> {
        self.header.validate()?;
        self.payload.as_ref().map_or(Ok(()), |p| p.validate())
    }
}

impl<H: fmt::Display> fmt::Display for LayeredPacket<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)?;
        if let Some(payload) = &self.payload {
            write!(f, "{payload}")?;
        }
        Ok(())
    }
}

/// Payload nobody decodes: unregistered codes, IPv6, application data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPacket {
    pub data: Bytes,
}

/// Bytes a registered decoder rejected, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalPacket {
    pub data: Bytes,
    pub reason: DecodeError,
}

/// One layer of a decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    CohdaRx(CohdaRxPacket),
    CohdaTx(CohdaTxPacket),
    Ethernet(EthernetPacket),
    GeoNetworking(GeoNetworkingPacket),
    Btp(BtpPacket),
    Unknown(UnknownPacket),
    Illegal(IllegalPacket),
}

impl Packet {
    pub fn unknown(data: &[u8]) -> Self {
        Packet::Unknown(UnknownPacket {
            data: Bytes::copy_from_slice(data),
        })
    }

    pub fn illegal(data: &[u8], reason: DecodeError) -> Self {
        Packet::Illegal(IllegalPacket {
            data: Bytes::copy_from_slice(data),
            reason,
        })
    }

    /// Variant name, used as the dispatch target descriptor.
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::CohdaRx(_) => "CohdaRx",
            Packet::CohdaTx(_) => "CohdaTx",
            Packet::Ethernet(_) => "Ethernet",
            Packet::GeoNetworking(_) => "GeoNetworking",
            Packet::Btp(_) => "Btp",
            Packet::Unknown(_) => "Unknown",
            Packet::Illegal(_) => "Illegal",
        }
    }

    pub fn payload(&self) -> Option<&Packet> {
        match self {
            Packet::CohdaRx(p) => p.payload(),
            Packet::CohdaTx(p) => p.payload(),
            Packet::Ethernet(p) => p.payload(),
            Packet::GeoNetworking(p) => p.payload(),
            Packet::Btp(p) => p.payload(),
            Packet::Unknown(_) | Packet::Illegal(_) => None,
        }
    }

    /// This packet followed by every nested payload, outermost first.
    pub fn layers(&self) -> Layers<'_> {
        Layers { next: Some(self) }
    }

    /// Bytes taken by this layer's own headers.
    pub fn header_len(&self) -> usize {
        self.wire_len() - self.payload().map_or(0, |p| p.wire_len())
    }

    pub fn as_geonetworking(&self) -> Option<&GeoNetworkingPacket> {
        self.layers().find_map(|layer| match layer {
            Packet::GeoNetworking(p) => Some(p),
            _ => None,
        })
    }

    pub fn as_btp(&self) -> Option<&BtpPacket> {
        self.layers().find_map(|layer| match layer {
            Packet::Btp(p) => Some(p),
            _ => None,
        })
    }
}

impl WireEncode for Packet {
    fn wire_len(&self) -> usize {
        match self {
            Packet::CohdaRx(p) => p.wire_len(),
            Packet::CohdaTx(p) => p.wire_len(),
            Packet::Ethernet(p) => p.wire_len(),
            Packet::GeoNetworking(p) => p.wire_len(),
            Packet::Btp(p) => p.wire_len(),
            Packet::Unknown(p) => p.data.len(),
            Packet::Illegal(p) => p.data.len(),
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        match self {
            Packet::CohdaRx(p) => p.encode(buf),
            Packet::CohdaTx(p) => p.encode(buf),
            Packet::Ethernet(p) => p.encode(buf),
            Packet::GeoNetworking(p) => p.encode(buf),
            Packet::Btp(p) => p.encode(buf),
            Packet::Unknown(p) => buf.put_slice(&p.data),
            Packet::Illegal(p) => buf.put_slice(&p.data),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Packet::CohdaRx(p) => p.validate(),
            Packet::CohdaTx(p) => p.validate(),
            Packet::Ethernet(p) => p.validate(),
            Packet::GeoNetworking(p) => p.validate(),
            Packet::Btp(p) => p.validate(),
            Packet::Unknown(_) | Packet::Illegal(_) => Ok(()),
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packet::CohdaRx(p) => fmt::Display::fmt(p, f),
            Packet::CohdaTx(p) => fmt::Display::fmt(p, f),
            Packet::Ethernet(p) => fmt::Display::fmt(p, f),
            Packet::GeoNetworking(p) => fmt::Display::fmt(p, f),
            Packet::Btp(p) => fmt::Display::fmt(p, f),
            Packet::Unknown(p) => {
                writeln!(f, "[Data ({} bytes)]", p.data.len())?;
                writeln!(f, "  Hex stream: {}", hex_string(&p.data))
            }
            Packet::Illegal(p) => {
                writeln!(f, "[Illegal Packet ({} bytes)]", p.data.len())?;
                writeln!(f, "  Reason: {}", p.reason)?;
                writeln!(f, "  Hex stream: {}", hex_string(&p.data))
            }
        }
    }
}

/// Iterator returned by [`Packet::layers`].
pub struct Layers<'a> {
    next: Option<&'a Packet>,
}

impl<'a> Iterator for Layers<'a> {
    type Item = &'a Packet;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.payload();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btp(payload: Option<Packet>) -> Packet {
        Packet::Btp(BtpPacket::new(
            BtpHeader::new(2001, 5),
            payload,
        ))
    }

    #[test]
    fn test_length_is_additive() {
        let packet = btp(Some(Packet::unknown(&[1, 2, 3])));
        assert_eq!(packet.wire_len(), 7);
        assert_eq!(packet.header_len(), 4);
        assert_eq!(
            packet.to_bytes().as_ref(),
            &[0x07, 0xD1, 0x00, 0x05, 1, 2, 3]
        );
    }

    #[test]
    fn test_layers() {
        let packet = btp(Some(Packet::unknown(&[0xFF])));
        let kinds: Vec<_> = packet.layers().map(Packet::kind).collect();
        assert_eq!(kinds, vec!["Btp", "Unknown"]);
        assert!(packet.as_btp().is_some());
        assert!(packet.as_geonetworking().is_none());
    }

    #[test]
    fn test_copy_with_modification() {
        let original = BtpPacket::new(BtpHeader::new(2001, 5), None);
        let with_data = original.with_payload(Some(Packet::unknown(&[9, 9])));
        assert!(original.payload().is_none());
        assert_eq!(with_data.wire_len(), 6);

        let moved = with_data.with_header(BtpHeader::new(2002, 5));
        assert_eq!(moved.header().destination_port, 2002);
        assert_eq!(moved.payload(), with_data.payload());

        let (header, payload) = moved.into_parts();
        assert_eq!(header.port_info, 5);
        assert!(payload.is_some());
    }

    #[test]
    fn test_illegal_render() {
        let packet = Packet::illegal(
            &[0x01],
            DecodeError::TooShort {
                expected: 4,
                actual: 1,
            },
        );
        let text = packet.to_string();
        assert!(text.contains("[Illegal Packet (1 bytes)]"));
        assert!(text.contains("Reason: Too short: expected 4 bytes, got 1"));
        assert_eq!(packet.to_bytes().as_ref(), &[0x01]);
    }
}
