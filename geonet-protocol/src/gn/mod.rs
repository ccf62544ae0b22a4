//! GeoNetworking headers and packet.
//!
//! A GN packet is a basic header, then whatever its next-header code
//! selects (normally the common header, or a secured envelope), then the
//! extended header chosen by the common header's type and subtype:
//!
//! ```text
//! +-------+--------+-----------------+---------------------+
//! | Basic | Common | Extended header | Payload (BTP, ...)  |
//! +-------+--------+-----------------+---------------------+
//! ```
//!
//! The header length is the sum of the decoded parts; the payload length
//! announced by the common header is not used to split the frame.

mod basic;
mod common;
mod extended;
mod secured;

use std::fmt;

use bytes::{Bytes, BytesMut};
use log::{trace, warn};

pub use basic::{BasicHeader, Lifetime, BASIC_HEADER_LEN, GN_PROTOCOL_VERSION};
pub use common::{CommonHeader, TrafficClass, COMMON_HEADER_LEN};
pub use extended::{
    BeaconHeader, ExtendedHeader, GeoAreaHeader, GeoUnicastHeader, LsReplyHeader,
    LsRequestHeader, MultiHopBroadcastHeader, SingleHopBroadcastHeader, BEACON_HEADER_LEN,
    GEO_AREA_HEADER_LEN, GEO_UNICAST_HEADER_LEN, LS_REPLY_HEADER_LEN, LS_REQUEST_HEADER_LEN,
    MULTI_HOP_BROADCAST_HEADER_LEN, SINGLE_HOP_BROADCAST_HEADER_LEN,
};
pub use secured::{SecuredHeader, SECURED_HEADER_MIN_LEN};

use crate::btp::BtpKind;
use crate::codec::WireEncode;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::packet::Packet;

/// One element of a GN packet's header structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GnHeader {
    Basic(BasicHeader),
    Common(CommonHeader),
    Extended(ExtendedHeader),
}

impl GnHeader {
    pub fn kind(&self) -> &'static str {
        match self {
            GnHeader::Basic(_) => "Basic",
            GnHeader::Common(_) => "Common",
            GnHeader::Extended(h) => h.kind(),
        }
    }
}

impl WireEncode for GnHeader {
    fn wire_len(&self) -> usize {
        match self {
            GnHeader::Basic(h) => h.wire_len(),
            GnHeader::Common(h) => h.wire_len(),
            GnHeader::Extended(h) => h.wire_len(),
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        match self {
            GnHeader::Basic(h) => h.encode(buf),
            GnHeader::Common(h) => h.encode(buf),
            GnHeader::Extended(h) => h.encode(buf),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            GnHeader::Basic(h) => h.validate(),
            GnHeader::Common(h) => h.validate(),
            GnHeader::Extended(h) => h.validate(),
        }
    }
}

impl fmt::Display for GnHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GnHeader::Basic(h) => fmt::Display::fmt(h, f),
            GnHeader::Common(h) => fmt::Display::fmt(h, f),
            GnHeader::Extended(h) => fmt::Display::fmt(h, f),
        }
    }
}

/// Keep `header` only if it fits in `rest`.
///
/// A decoder may report more bytes than it was given; the packet then
/// treats the remainder as malformed rather than slicing past the frame.
fn fit_header(header: GnHeader, rest: &[u8]) -> GnHeader {
    if header.wire_len() <= rest.len() {
        return header;
    }
    warn!(
        "{} header reports {} bytes but {} remain",
        header.kind(),
        header.wire_len(),
        rest.len()
    );
    GnHeader::Extended(ExtendedHeader::Malformed(Bytes::copy_from_slice(rest)))
}

/// Parts of a [`GeoNetworkingPacket`], used to build or rebuild one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoNetworkingBuilder {
    pub structure: Vec<GnHeader>,
    pub payload: Option<Packet>,
}

impl GeoNetworkingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, header: GnHeader) -> Self {
        self.structure.push(header);
        self
    }

    pub fn payload(mut self, payload: Packet) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn build(self) -> GeoNetworkingPacket {
        GeoNetworkingPacket {
            structure: self.structure,
            payload: self.payload.map(Box::new),
        }
    }
}

/// A decoded GN packet: its header structure and optional payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoNetworkingPacket {
    structure: Vec<GnHeader>,
    payload: Option<Box<Packet>>,
}

impl GeoNetworkingPacket {
    pub fn builder() -> GeoNetworkingBuilder {
        GeoNetworkingBuilder::new()
    }

    /// Builder pre-filled with a copy of this packet.
    pub fn to_builder(&self) -> GeoNetworkingBuilder {
        GeoNetworkingBuilder {
            structure: self.structure.clone(),
            payload: self.payload.as_deref().cloned(),
        }
    }

    /// Walk the header chain, then hand what is left to the transport
    /// dispatch named by the common header.
    ///
    /// Only a basic header shortfall is an error; later layers fall back
    /// to `Malformed`/`Empty` placeholders.
    pub fn decode(data: &[u8], dispatcher: &Dispatcher) -> Result<Self> {
        let basic = BasicHeader::decode(data, dispatcher.types())?;
        let mut offset = BASIC_HEADER_LEN;
        let next_header = basic.next_header.clone();
        let mut structure = vec![GnHeader::Basic(basic)];
        let mut transport = None;

        if offset < data.len() {
            let rest = &data[offset..];
            let next = fit_header(dispatcher.decode_gn_header(&next_header, rest), rest);
            offset += next.wire_len();

            if let GnHeader::Common(common) = &next {
                let rest = &data[offset..];
                let extended = GnHeader::Extended(
                    dispatcher.decode_extended(&common.header_type, rest),
                );
                let extended = fit_header(extended, rest);
                offset += extended.wire_len();
                if !matches!(&extended, GnHeader::Extended(h) if h.is_malformed()) {
                    transport = Some(common.next_header.clone());
                }
                structure.push(next);
                structure.push(extended);
            } else {
                structure.push(next);
            }
        }

        let rest = &data[offset..];
        let payload = if rest.is_empty() {
            None
        } else {
            match &transport {
                Some(transport) => Some(dispatcher.decode_transport(transport, rest)),
                None => Some(Packet::unknown(rest)),
            }
        };
        trace!(
            "GN structure [{}], {} payload bytes",
            structure
                .iter()
                .map(GnHeader::kind)
                .collect::<Vec<_>>()
                .join(", "),
            rest.len()
        );

        Ok(Self {
            structure,
            payload: payload.map(Box::new),
        })
    }

    pub fn structure(&self) -> &[GnHeader] {
        &self.structure
    }

    pub fn payload(&self) -> Option<&Packet> {
        self.payload.as_deref()
    }

    /// Sum of every header in the structure.
    pub fn header_len(&self) -> usize {
        self.structure.iter().map(WireEncode::wire_len).sum()
    }

    pub fn basic_header(&self) -> Option<&BasicHeader> {
        self.structure.iter().find_map(|h| match h {
            GnHeader::Basic(h) => Some(h),
            _ => None,
        })
    }

    pub fn common_header(&self) -> Option<&CommonHeader> {
        self.structure.iter().find_map(|h| match h {
            GnHeader::Common(h) => Some(h),
            _ => None,
        })
    }

    /// BTP flavour selected by the common header's next-header code.
    pub fn btp_kind(&self) -> Option<BtpKind> {
        self.common_header()
            .and_then(|common| BtpKind::from_transport(&common.next_header))
    }

    /// The header after the basic (and common) header, if any.
    pub fn extended_header(&self) -> Option<&ExtendedHeader> {
        self.structure.iter().find_map(|h| match h {
            GnHeader::Extended(h) => Some(h),
            _ => None,
        })
    }
}

impl WireEncode for GeoNetworkingPacket {
    fn wire_len(&self) -> usize {
        self.header_len() + self.payload.as_ref().map_or(0, |p| p.wire_len())
    }

    fn encode(&self, buf: &mut BytesMut) {
        for header in &self.structure {
            header.encode(buf);
        }
        if let Some(payload) = &self.payload {
            payload.encode(buf);
        }
    }

    fn validate(&self) -> Result<()> {
        for header in &self.structure {
            header.validate()?;
        }
        self.payload.as_ref().map_or(Ok(()), |p| p.validate())
    }
}

impl fmt::Display for GeoNetworkingPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[GeoNetworking Header ({} bytes)]", self.header_len())?;
        for header in &self.structure {
            crate::codec::write_indented(f, "  ", header)?;
        }
        match self.payload.as_deref() {
            Some(Packet::Btp(btp)) => {
                write!(f, "{}", btp.header().render(self.btp_kind()))?;
                if let Some(data) = btp.payload() {
                    write!(f, "{data}")?;
                }
            }
            Some(payload) => write!(f, "{payload}")?,
            None => {}
        }
        Ok(())
    }
}
