//! Code-to-decoder dispatch.
//!
//! Every layer that selects its successor by a numeric code owns a
//! [`DispatchTable`]. A lookup that finds a decoder runs it; a decoder
//! error becomes the layer's fallback value, and a code without a decoder
//! becomes the layer's default value. Dispatch itself never fails.
//!
//! | Layer            | Key              | Error fallback | Unregistered   |
//! |------------------|------------------|----------------|----------------|
//! | link layer       | data-link type   | `Illegal`      | `Unknown`      |
//! | ether type       | ether type       | `Illegal`      | `Unknown`      |
//! | GN next header   | basic next hdr   | `Malformed`    | `Empty`        |
//! | extended header  | type/subtype     | `Malformed`    | `Empty`        |
//! | transport        | common next hdr  | `Illegal`      | `Unknown`      |

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use bytes::Bytes;
use log::{debug, trace, warn};
use parking_lot::RwLock;

use crate::btp::BtpKind;
use crate::error::{DecodeError, Result};
use crate::gn::{
    BeaconHeader, CommonHeader, ExtendedHeader, GeoAreaHeader, GeoNetworkingPacket,
    GeoUnicastHeader, GnHeader, LsReplyHeader, LsRequestHeader, MultiHopBroadcastHeader,
    SecuredHeader, SingleHopBroadcastHeader,
};
use crate::packet::{BtpPacket, EthernetPacket, Packet};
use crate::types::{
    DataLinkType, EtherType, ExtendedHeaderType, GnHeaderType, TransportType, TypeRegistry,
};

/// A decoder for one code. It receives the bytes from the start of its
/// layer to the end of the frame, and the dispatcher for nested layers.
pub type DecodeFn<T> = Arc<dyn Fn(&[u8], &Dispatcher) -> Result<T> + Send + Sync>;

struct Instantiator<T> {
    target: &'static str,
    decode: DecodeFn<T>,
}

impl<T> Clone for Instantiator<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target,
            decode: Arc::clone(&self.decode),
        }
    }
}

/// Decoders of one layer keyed by wire code.
pub struct DispatchTable<V, T> {
    layer: &'static str,
    entries: RwLock<HashMap<V, Instantiator<T>>>,
    fallback: fn(&[u8], DecodeError) -> T,
    default: fn(&[u8]) -> T,
    default_target: &'static str,
}

impl<V, T> DispatchTable<V, T>
where
    V: Copy + Eq + Hash + fmt::Display,
{
    pub fn new(
        layer: &'static str,
        fallback: fn(&[u8], DecodeError) -> T,
        default: fn(&[u8]) -> T,
        default_target: &'static str,
    ) -> Self {
        Self {
            layer,
            entries: RwLock::new(HashMap::new()),
            fallback,
            default,
            default_target,
        }
    }

    /// Install `decode` for `key`; returns `true` if it replaced a decoder.
    pub fn register<F>(&self, key: V, target: &'static str, decode: F) -> bool
    where
        F: Fn(&[u8], &Dispatcher) -> Result<T> + Send + Sync + 'static,
    {
        let instantiator = Instantiator {
            target,
            decode: Arc::new(decode),
        };
        match self.entries.write().insert(key, instantiator) {
            Some(previous) => {
                warn!(
                    "{} decoder for {} replaced: {} -> {}",
                    self.layer, key, previous.target, target
                );
                true
            }
            None => false,
        }
    }

    pub fn unregister(&self, key: V) -> bool {
        self.entries.write().remove(&key).is_some()
    }

    pub fn is_registered(&self, key: V) -> bool {
        self.entries.read().contains_key(&key)
    }

    /// Name of the value `decode` produces for `key` on success.
    pub fn target(&self, key: V) -> &'static str {
        self.entries
            .read()
            .get(&key)
            .map_or(self.default_target, |entry| entry.target)
    }

    /// Run the decoder for `key`, or `None` if there is none.
    pub fn try_decode(&self, key: V, data: &[u8], ctx: &Dispatcher) -> Option<Result<T>> {
        // the lock is released before decoding; nested layers take their own
        let entry = self.entries.read().get(&key).cloned()?;
        trace!("{} {} -> {} ({} bytes)", self.layer, key, entry.target, data.len());
        Some((entry.decode)(data, ctx))
    }

    /// Decode `data` with the decoder for `key`, falling back instead of failing.
    pub fn decode(&self, key: V, data: &[u8], ctx: &Dispatcher) -> T {
        match self.try_decode(key, data, ctx) {
            Some(Ok(value)) => value,
            Some(Err(e)) => {
                debug!("{} {}: {}, using fallback", self.layer, key, e);
                (self.fallback)(data, e)
            }
            None => {
                debug!("{} {} not registered, using {}", self.layer, key, self.default_target);
                (self.default)(data)
            }
        }
    }
}

fn malformed_gn_header(data: &[u8], _: DecodeError) -> GnHeader {
    GnHeader::Extended(ExtendedHeader::Malformed(Bytes::copy_from_slice(data)))
}

fn empty_gn_header(_: &[u8]) -> GnHeader {
    GnHeader::Extended(ExtendedHeader::Empty)
}

fn malformed_extended_header(data: &[u8], _: DecodeError) -> ExtendedHeader {
    ExtendedHeader::Malformed(Bytes::copy_from_slice(data))
}

fn empty_extended_header(_: &[u8]) -> ExtendedHeader {
    ExtendedHeader::Empty
}

/// Every dispatch table of the stack, sharing one type registry.
pub struct Dispatcher {
    types: Arc<TypeRegistry>,
    link_layers: DispatchTable<u32, Packet>,
    ether_types: DispatchTable<u16, Packet>,
    gn_headers: DispatchTable<u8, GnHeader>,
    extended_headers: DispatchTable<u8, ExtendedHeader>,
    transports: DispatchTable<u8, Packet>,
}

impl Dispatcher {
    /// Dispatcher with no decoders at all.
    pub fn new(types: Arc<TypeRegistry>) -> Self {
        Self {
            types,
            link_layers: DispatchTable::new(
                "Link type",
                Packet::illegal,
                Packet::unknown,
                "Unknown",
            ),
            ether_types: DispatchTable::new(
                "Ether type",
                Packet::illegal,
                Packet::unknown,
                "Unknown",
            ),
            gn_headers: DispatchTable::new(
                "GN next header",
                malformed_gn_header,
                empty_gn_header,
                "Empty",
            ),
            extended_headers: DispatchTable::new(
                "Extended header",
                malformed_extended_header,
                empty_extended_header,
                "Empty",
            ),
            transports: DispatchTable::new(
                "Transport",
                Packet::illegal,
                Packet::unknown,
                "Unknown",
            ),
        }
    }

    /// Dispatcher for the standard stack: Ethernet, GeoNetworking, BTP.
    ///
    /// IPv6 over GN and the Cohda capture header are not registered here;
    /// the latter depends on the capture direction, see [`crate::cohda::register`].
    pub fn with_builtins(types: Arc<TypeRegistry>) -> Self {
        let dispatcher = Self::new(types);

        dispatcher.register_link_type(DataLinkType::ETHERNET, "Ethernet", |data, ctx| {
            EthernetPacket::decode(data, ctx).map(Packet::Ethernet)
        });
        dispatcher.register_ether_type(EtherType::GEONETWORKING, "GeoNetworking", |data, ctx| {
            GeoNetworkingPacket::decode(data, ctx).map(Packet::GeoNetworking)
        });

        dispatcher
            .gn_headers
            .register(GnHeaderType::COMMON.value(), "Common", |data, ctx| {
                CommonHeader::decode(data, ctx.types()).map(GnHeader::Common)
            });
        dispatcher
            .gn_headers
            .register(GnHeaderType::SECURED.value(), "Secured", |data, _| {
                SecuredHeader::decode(data)
                    .map(ExtendedHeader::Secured)
                    .map(GnHeader::Extended)
            });

        dispatcher.register_extended_header(ExtendedHeaderType::BEACON, "Beacon", |data, ctx| {
            BeaconHeader::decode(data, ctx.types()).map(ExtendedHeader::Beacon)
        });
        dispatcher.register_extended_header(
            ExtendedHeaderType::GEO_UNICAST,
            "GeoUnicast",
            |data, ctx| GeoUnicastHeader::decode(data, ctx.types()).map(ExtendedHeader::GeoUnicast),
        );
        for area in [
            ExtendedHeaderType::GEO_ANYCAST_CIRCLE,
            ExtendedHeaderType::GEO_ANYCAST_RECTANGLE,
            ExtendedHeaderType::GEO_ANYCAST_ELLIPSE,
        ] {
            dispatcher.register_extended_header(area, "GeoAnycast", |data, ctx| {
                GeoAreaHeader::decode(data, ctx.types()).map(ExtendedHeader::GeoAnycast)
            });
        }
        for area in [
            ExtendedHeaderType::GEO_BROADCAST_CIRCLE,
            ExtendedHeaderType::GEO_BROADCAST_RECTANGLE,
            ExtendedHeaderType::GEO_BROADCAST_ELLIPSE,
        ] {
            dispatcher.register_extended_header(area, "GeoBroadcast", |data, ctx| {
                GeoAreaHeader::decode(data, ctx.types()).map(ExtendedHeader::GeoBroadcast)
            });
        }
        dispatcher.register_extended_header(
            ExtendedHeaderType::SINGLE_HOP_BROADCAST,
            "SingleHopBroadcast",
            |data, ctx| {
                SingleHopBroadcastHeader::decode(data, ctx.types())
                    .map(ExtendedHeader::SingleHopBroadcast)
            },
        );
        dispatcher.register_extended_header(
            ExtendedHeaderType::MULTI_HOP_BROADCAST,
            "MultiHopBroadcast",
            |data, ctx| {
                MultiHopBroadcastHeader::decode(data, ctx.types())
                    .map(ExtendedHeader::MultiHopBroadcast)
            },
        );
        dispatcher.register_extended_header(ExtendedHeaderType::LS_REQUEST, "LsRequest", |data, ctx| {
            LsRequestHeader::decode(data, ctx.types()).map(ExtendedHeader::LsRequest)
        });
        dispatcher.register_extended_header(ExtendedHeaderType::LS_REPLY, "LsReply", |data, ctx| {
            LsReplyHeader::decode(data, ctx.types()).map(ExtendedHeader::LsReply)
        });

        for kind in [BtpKind::A, BtpKind::B] {
            dispatcher.register_transport_type(kind.transport_type(), "Btp", |data, _| {
                BtpPacket::decode(data).map(Packet::Btp)
            });
        }

        dispatcher
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn shared_types(&self) -> Arc<TypeRegistry> {
        Arc::clone(&self.types)
    }

    pub fn link_layers(&self) -> &DispatchTable<u32, Packet> {
        &self.link_layers
    }

    pub fn ether_types(&self) -> &DispatchTable<u16, Packet> {
        &self.ether_types
    }

    pub fn gn_headers(&self) -> &DispatchTable<u8, GnHeader> {
        &self.gn_headers
    }

    pub fn extended_headers(&self) -> &DispatchTable<u8, ExtendedHeader> {
        &self.extended_headers
    }

    pub fn transports(&self) -> &DispatchTable<u8, Packet> {
        &self.transports
    }

    pub fn decode_link(&self, link_type: &DataLinkType, data: &[u8]) -> Packet {
        self.link_layers.decode(link_type.value(), data, self)
    }

    pub fn decode_ether(&self, ether_type: &EtherType, data: &[u8]) -> Packet {
        self.ether_types.decode(ether_type.value(), data, self)
    }

    pub fn decode_gn_header(&self, next_header: &GnHeaderType, data: &[u8]) -> GnHeader {
        self.gn_headers.decode(next_header.value(), data, self)
    }

    pub fn decode_extended(&self, header_type: &ExtendedHeaderType, data: &[u8]) -> ExtendedHeader {
        self.extended_headers.decode(header_type.to_byte(), data, self)
    }

    pub fn decode_transport(&self, transport: &TransportType, data: &[u8]) -> Packet {
        self.transports.decode(transport.value(), data, self)
    }

    /// Register a link-layer decoder and name its code in the type registry.
    pub fn register_link_type<F>(&self, link_type: DataLinkType, target: &'static str, decode: F)
    where
        F: Fn(&[u8], &Dispatcher) -> Result<Packet> + Send + Sync + 'static,
    {
        let value = link_type.value();
        self.types.link_types().register(link_type);
        self.link_layers.register(value, target, decode);
    }

    pub fn register_ether_type<F>(&self, ether_type: EtherType, target: &'static str, decode: F)
    where
        F: Fn(&[u8], &Dispatcher) -> Result<Packet> + Send + Sync + 'static,
    {
        let value = ether_type.value();
        self.types.ether_types().register(ether_type);
        self.ether_types.register(value, target, decode);
    }

    pub fn register_transport_type<F>(&self, transport: TransportType, target: &'static str, decode: F)
    where
        F: Fn(&[u8], &Dispatcher) -> Result<Packet> + Send + Sync + 'static,
    {
        let value = transport.value();
        self.types.transport_types().register(transport);
        self.transports.register(value, target, decode);
    }

    /// Register an extended header decoder for one type/subtype pair.
    pub fn register_extended_header<F>(
        &self,
        header_type: ExtendedHeaderType,
        target: &'static str,
        decode: F,
    ) where
        F: Fn(&[u8], &Dispatcher) -> Result<ExtendedHeader> + Send + Sync + 'static,
    {
        let key = header_type.to_byte();
        self.types
            .packet_header_types()
            .register(header_type.header_type.clone());
        self.types
            .subtypes()
            .register(&header_type.header_type, header_type.subtype);
        self.extended_headers.register(key, target, decode);
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::WireEncode;
    use crate::types::{HeaderSubtype, PacketHeaderType};

    fn dispatcher() -> Dispatcher {
        Dispatcher::with_builtins(Arc::new(TypeRegistry::with_builtins()))
    }

    #[test]
    fn test_builtin_targets() {
        let dispatcher = dispatcher();
        assert_eq!(dispatcher.link_layers().target(1), "Ethernet");
        assert_eq!(dispatcher.link_layers().target(158), "Unknown");
        assert_eq!(dispatcher.ether_types().target(0x8947), "GeoNetworking");
        assert_eq!(dispatcher.gn_headers().target(1), "Common");
        assert_eq!(dispatcher.gn_headers().target(2), "Secured");
        assert_eq!(dispatcher.gn_headers().target(3), "Empty");
        assert_eq!(dispatcher.transports().target(1), "Btp");
        assert_eq!(dispatcher.transports().target(2), "Btp");
        assert_eq!(dispatcher.transports().target(3), "Unknown");

        let extended = [
            (0x10, "Beacon"),
            (0x20, "GeoUnicast"),
            (0x30, "GeoAnycast"),
            (0x31, "GeoAnycast"),
            (0x32, "GeoAnycast"),
            (0x40, "GeoBroadcast"),
            (0x41, "GeoBroadcast"),
            (0x42, "GeoBroadcast"),
            (0x50, "SingleHopBroadcast"),
            (0x51, "MultiHopBroadcast"),
            (0x60, "LsRequest"),
            (0x61, "LsReply"),
            (0x00, "Empty"),
            (0x43, "Empty"),
        ];
        for (key, target) in extended {
            assert_eq!(dispatcher.extended_headers().target(key), target, "{key:#04x}");
        }
    }

    #[test]
    fn test_builtin_extended_decoders() {
        use crate::gn::{
            BEACON_HEADER_LEN, GEO_AREA_HEADER_LEN, GEO_UNICAST_HEADER_LEN, LS_REPLY_HEADER_LEN,
            LS_REQUEST_HEADER_LEN, MULTI_HOP_BROADCAST_HEADER_LEN,
            SINGLE_HOP_BROADCAST_HEADER_LEN,
        };

        let dispatcher = dispatcher();
        let data: Vec<u8> = (0..64).collect();
        let cases = [
            (ExtendedHeaderType::BEACON, "Beacon", BEACON_HEADER_LEN),
            (ExtendedHeaderType::GEO_UNICAST, "GeoUnicast", GEO_UNICAST_HEADER_LEN),
            (ExtendedHeaderType::GEO_ANYCAST_CIRCLE, "GeoAnycast", GEO_AREA_HEADER_LEN),
            (ExtendedHeaderType::GEO_ANYCAST_RECTANGLE, "GeoAnycast", GEO_AREA_HEADER_LEN),
            (ExtendedHeaderType::GEO_ANYCAST_ELLIPSE, "GeoAnycast", GEO_AREA_HEADER_LEN),
            (ExtendedHeaderType::GEO_BROADCAST_CIRCLE, "GeoBroadcast", GEO_AREA_HEADER_LEN),
            (ExtendedHeaderType::GEO_BROADCAST_RECTANGLE, "GeoBroadcast", GEO_AREA_HEADER_LEN),
            (ExtendedHeaderType::GEO_BROADCAST_ELLIPSE, "GeoBroadcast", GEO_AREA_HEADER_LEN),
            (
                ExtendedHeaderType::SINGLE_HOP_BROADCAST,
                "SingleHopBroadcast",
                SINGLE_HOP_BROADCAST_HEADER_LEN,
            ),
            (
                ExtendedHeaderType::MULTI_HOP_BROADCAST,
                "MultiHopBroadcast",
                MULTI_HOP_BROADCAST_HEADER_LEN,
            ),
            (ExtendedHeaderType::LS_REQUEST, "LsRequest", LS_REQUEST_HEADER_LEN),
            (ExtendedHeaderType::LS_REPLY, "LsReply", LS_REPLY_HEADER_LEN),
        ];
        for (header_type, kind, len) in cases {
            let key = header_type.to_byte();
            let header = dispatcher.decode_extended(&header_type, &data);
            assert_eq!(header.kind(), kind, "{key:#04x}");
            assert_eq!(header.wire_len(), len, "{key:#04x}");
            assert_eq!(header.to_bytes().as_ref(), &data[..len], "{key:#04x}");

            let short = dispatcher.decode_extended(&header_type, &data[..len - 1]);
            assert!(short.is_malformed(), "{key:#04x}");
        }
    }

    #[test]
    fn test_unregistered_extended_is_empty() {
        let dispatcher = dispatcher();
        let any = ExtendedHeaderType::ANY;
        assert_eq!(dispatcher.decode_extended(&any, &[1, 2, 3]), ExtendedHeader::Empty);
    }

    #[test]
    fn test_failing_extended_is_malformed() {
        let dispatcher = dispatcher();
        let header = dispatcher.decode_extended(&ExtendedHeaderType::BEACON, &[1, 2, 3]);
        assert_eq!(header, ExtendedHeader::Malformed(Bytes::from_static(&[1, 2, 3])));
        assert_eq!(header.wire_len(), 3);
    }

    #[test]
    fn test_transport_fallbacks() {
        let dispatcher = dispatcher();
        match dispatcher.decode_transport(&TransportType::BTP_A, &[0x07]) {
            Packet::Illegal(p) => {
                assert_eq!(p.data.as_ref(), &[0x07]);
                assert!(p.reason.is_structural());
            }
            other => panic!("unexpected packet: {other:?}"),
        }
        assert!(matches!(
            dispatcher.decode_transport(&TransportType::IPV6, &[0x60, 0, 0, 0]),
            Packet::Unknown(_)
        ));
    }

    #[test]
    fn test_register_replaces_and_unregister() {
        let dispatcher = dispatcher();
        let table = dispatcher.transports();
        let replaced = table.register(1, "Opaque", |data, _| Ok(Packet::unknown(data)));
        assert!(replaced);
        assert_eq!(table.target(1), "Opaque");
        assert!(matches!(
            dispatcher.decode_transport(&TransportType::BTP_A, &[0, 1, 0, 2]),
            Packet::Unknown(_)
        ));

        assert!(table.unregister(1));
        assert!(!table.is_registered(1));
        assert!(!table.unregister(1));
        assert!(table.try_decode(1, &[0, 1, 0, 2], &dispatcher).is_none());
    }

    #[test]
    fn test_vendor_extended_header_registers_names() {
        let dispatcher = dispatcher();
        let vendor = ExtendedHeaderType::new(
            PacketHeaderType::new(9, "Vendor"),
            HeaderSubtype::new(3, "Ranging"),
        );
        dispatcher.register_extended_header(vendor.clone(), "Vendor", |data, _| {
            Ok(ExtendedHeader::Malformed(Bytes::copy_from_slice(data)))
        });

        let resolved = ExtendedHeaderType::from_byte(0x93, dispatcher.types());
        assert_eq!(resolved.header_type.name(), "Vendor");
        assert_eq!(resolved.subtype.name(), "Ranging");
        assert_eq!(dispatcher.extended_headers().target(0x93), "Vendor");
        assert_eq!(
            dispatcher.decode_extended(&resolved, &[0xAA]),
            ExtendedHeader::Malformed(Bytes::from_static(&[0xAA]))
        );
    }

    #[test]
    fn test_register_link_type_names_code() {
        let dispatcher = Dispatcher::new(Arc::new(TypeRegistry::empty()));
        dispatcher.register_link_type(DataLinkType::new(147, "User0"), "Opaque", |data, _| {
            Ok(Packet::unknown(data))
        });
        assert_eq!(dispatcher.types().link_types().lookup(147).name(), "User0");
        assert!(dispatcher.link_layers().is_registered(147));
        assert!(matches!(
            dispatcher.decode_link(&DataLinkType::ETHERNET, &[0; 20]),
            Packet::Unknown(_)
        ));
    }
}
