//! Ethernet II framing, just enough to reach the ether type.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::codec::{check_len, mac_string, WireEncode};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::packet::EthernetPacket;
use crate::types::{EtherType, TypeRegistry};

/// Ethernet II header size in bytes.
pub const ETHERNET_HEADER_LEN: usize = 14;

/// Broadcast MAC address.
pub const BROADCAST: [u8; 6] = [0xFF; 6];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetHeader {
    pub destination: [u8; 6],
    pub source: [u8; 6],
    pub ether_type: EtherType,
}

impl EthernetHeader {
    pub fn decode(data: &[u8], types: &TypeRegistry) -> Result<Self> {
        check_len(data, ETHERNET_HEADER_LEN)?;
        let mut destination = [0u8; 6];
        let mut source = [0u8; 6];
        destination.copy_from_slice(&data[0..6]);
        source.copy_from_slice(&data[6..12]);
        let ether_type = types
            .ether_types()
            .lookup(u16::from_be_bytes([data[12], data[13]]));
        Ok(Self {
            destination,
            source,
            ether_type,
        })
    }
}

impl WireEncode for EthernetHeader {
    fn wire_len(&self) -> usize {
        ETHERNET_HEADER_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.destination);
        buf.put_slice(&self.source);
        buf.put_u16(self.ether_type.value());
    }
}

impl fmt::Display for EthernetHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Ethernet Header ({ETHERNET_HEADER_LEN} bytes)]")?;
        writeln!(f, "  Destination address: {}", mac_string(&self.destination))?;
        writeln!(f, "  Source address: {}", mac_string(&self.source))?;
        writeln!(f, "  Type: {}", self.ether_type)
    }
}

impl EthernetPacket {
    /// Decode the header and dispatch the payload on its ether type.
    pub fn decode(data: &[u8], dispatcher: &Dispatcher) -> Result<Self> {
        let header = EthernetHeader::decode(data, dispatcher.types())?;
        let rest = &data[ETHERNET_HEADER_LEN..];
        let payload = if rest.is_empty() {
            None
        } else {
            Some(dispatcher.decode_ether(&header.ether_type, rest))
        };
        Ok(Self::new(header, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;
    use std::sync::Arc;

    fn dispatcher() -> Dispatcher {
        Dispatcher::with_builtins(Arc::new(TypeRegistry::with_builtins()))
    }

    #[test]
    fn test_decode_ethernet_header() {
        let mut data = BROADCAST.to_vec();
        data.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x89, 0x47]);
        let header = EthernetHeader::decode(&data, &TypeRegistry::with_builtins()).unwrap();
        assert_eq!(header.destination, BROADCAST);
        assert_eq!(header.source, [0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(header.ether_type, EtherType::GEONETWORKING);
        assert_eq!(header.to_bytes().as_ref(), data.as_slice());
        assert!(header.to_string().contains("Type: ETSI TC-ITS (0x8947)"));
    }

    #[test]
    fn test_unregistered_ether_type_is_opaque() {
        let mut data = BROADCAST.to_vec();
        data.extend_from_slice(&[0, 0, 0, 0, 0, 1, 0x86, 0xDD, 0x60, 0x00]);
        let packet = EthernetPacket::decode(&data, &dispatcher()).unwrap();
        assert_eq!(packet.header().ether_type, EtherType::IPV6);
        assert!(matches!(packet.payload(), Some(Packet::Unknown(_))));
        assert_eq!(packet.to_bytes().as_ref(), data.as_slice());
    }

    #[test]
    fn test_truncated_ethernet() {
        assert!(EthernetPacket::decode(&BROADCAST, &dispatcher()).is_err());
    }
}
