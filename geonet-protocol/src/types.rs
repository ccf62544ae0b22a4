//! Named type codes and the registries that resolve them.
//!
//! Every numeric code found on the wire (header types, subtypes, transport
//! types, station types, link types, ether types) resolves to a [`TypeCode`]
//! through a [`CodeTable`]. Lookups never fail: a value nobody registered
//! comes back as an `Unknown`-named code carrying the raw number.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use log::debug;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::bits::BitField;
use crate::error::Result;

/// Name given to codes that are not registered.
pub const UNKNOWN_NAME: &str = "Unknown";

/// A family of type codes sharing one numeric space.
pub trait CodeKind: 'static {
    /// Wire representation of the code.
    type Value: Copy
        + Eq
        + Ord
        + Hash
        + fmt::Debug
        + fmt::Display
        + fmt::UpperHex
        + Send
        + Sync
        + 'static;

    /// Family name used in log messages.
    const FAMILY: &'static str;

    /// Hex digits used when displaying the value; 0 displays decimal.
    const HEX_DIGITS: usize = 0;
}

macro_rules! code_kind {
    ($(#[$meta:meta])* $kind:ident, $value:ty, $family:literal $(, hex = $digits:literal)?) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $kind {}

        impl CodeKind for $kind {
            type Value = $value;
            const FAMILY: &'static str = $family;
            $(const HEX_DIGITS: usize = $digits;)?
        }
    };
}

code_kind!(
    /// Next-header codes of the GN basic header.
    GnHeaderKind, u8, "GN header type"
);
code_kind!(
    /// The 4-bit header type of the GN common header.
    PacketHeaderKind, u8, "GN packet header type"
);
code_kind!(
    /// The 4-bit header subtype of the GN common header.
    SubtypeKind, u8, "GN header subtype"
);
code_kind!(
    /// Next-header codes of the GN common header.
    TransportKind, u8, "transport type"
);
code_kind!(
    /// ITS station categories.
    StationKind, u8, "station type"
);
code_kind!(
    /// pcap data-link types.
    LinkKind, u32, "data link type"
);
code_kind!(
    /// Ethernet ether types.
    EtherKind, u16, "ether type", hex = 4
);

/// An immutable `(value, name)` pair.
///
/// Equality, ordering and hashing only look at the numeric value.
pub struct TypeCode<K: CodeKind> {
    value: K::Value,
    name: Cow<'static, str>,
    kind: PhantomData<fn() -> K>,
}

pub type GnHeaderType = TypeCode<GnHeaderKind>;
pub type PacketHeaderType = TypeCode<PacketHeaderKind>;
pub type HeaderSubtype = TypeCode<SubtypeKind>;
pub type TransportType = TypeCode<TransportKind>;
pub type StationType = TypeCode<StationKind>;
pub type DataLinkType = TypeCode<LinkKind>;
pub type EtherType = TypeCode<EtherKind>;

impl<K: CodeKind> TypeCode<K> {
    /// A code with a static name, usable in constants.
    pub const fn builtin(value: K::Value, name: &'static str) -> Self {
        Self {
            value,
            name: Cow::Borrowed(name),
            kind: PhantomData,
        }
    }

    pub fn new(value: K::Value, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            value,
            name: name.into(),
            kind: PhantomData,
        }
    }

    /// Placeholder for a value that is not registered.
    pub const fn unknown(value: K::Value) -> Self {
        Self::builtin(value, UNKNOWN_NAME)
    }

    pub fn value(&self) -> K::Value {
        self.value
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<K: CodeKind> Clone for TypeCode<K> {
    fn clone(&self) -> Self {
        Self {
            value: self.value,
            name: self.name.clone(),
            kind: PhantomData,
        }
    }
}

impl<K: CodeKind> fmt::Debug for TypeCode<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCode")
            .field("value", &self.value)
            .field("name", &self.name)
            .finish()
    }
}

impl<K: CodeKind> fmt::Display for TypeCode<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if K::HEX_DIGITS > 0 {
            write!(
                f,
                "{} (0x{:0width$X})",
                self.name,
                self.value,
                width = K::HEX_DIGITS
            )
        } else {
            write!(f, "{} ({})", self.name, self.value)
        }
    }
}

impl<K: CodeKind> PartialEq for TypeCode<K> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<K: CodeKind> Eq for TypeCode<K> {}

impl<K: CodeKind> PartialOrd for TypeCode<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: CodeKind> Ord for TypeCode<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl<K: CodeKind> Hash for TypeCode<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl GnHeaderType {
    pub const ANY: Self = Self::builtin(0, "Any");
    pub const COMMON: Self = Self::builtin(1, "Common");
    pub const SECURED: Self = Self::builtin(2, "Secured");
}

impl PacketHeaderType {
    pub const ANY: Self = Self::builtin(0, "Any");
    pub const BEACON: Self = Self::builtin(1, "Beacon");
    pub const GEO_UNICAST: Self = Self::builtin(2, "GeoUnicast");
    pub const GEO_ANYCAST: Self = Self::builtin(3, "GeoAnycast");
    pub const GEO_BROADCAST: Self = Self::builtin(4, "GeoBroadcast");
    pub const TOPO_BROADCAST: Self = Self::builtin(5, "Topologically-Scoped Broadcast");
    pub const LOCATION_SERVICE: Self = Self::builtin(6, "Location Service");
}

impl HeaderSubtype {
    pub const UNSPECIFIED: Self = Self::builtin(0, "Unspecified");
    pub const CIRCLE: Self = Self::builtin(0, "Circle");
    pub const RECTANGLE: Self = Self::builtin(1, "Rectangle");
    pub const ELLIPSE: Self = Self::builtin(2, "Ellipse");
    pub const SINGLE_HOP: Self = Self::builtin(0, "Single Hop");
    pub const MULTI_HOP: Self = Self::builtin(1, "Multi Hop");
    pub const LS_REQUEST: Self = Self::builtin(0, "Request");
    pub const LS_REPLY: Self = Self::builtin(1, "Reply");
}

impl TransportType {
    pub const ANY: Self = Self::builtin(0, "Any");
    pub const BTP_A: Self = Self::builtin(1, "BTP-A");
    pub const BTP_B: Self = Self::builtin(2, "BTP-B");
    pub const IPV6: Self = Self::builtin(3, "IPv6");
}

impl StationType {
    pub const UNKNOWN: Self = Self::builtin(0, "Unknown");
    pub const PEDESTRIAN: Self = Self::builtin(1, "Pedestrian");
    pub const CYCLIST: Self = Self::builtin(2, "Cyclist");
    pub const MOPED: Self = Self::builtin(3, "Moped");
    pub const MOTORCYCLE: Self = Self::builtin(4, "Motorcycle");
    pub const PASSENGER_CAR: Self = Self::builtin(5, "Passenger Car");
    pub const BUS: Self = Self::builtin(6, "Bus");
    pub const LIGHT_TRUCK: Self = Self::builtin(7, "Light Truck");
    pub const HEAVY_TRUCK: Self = Self::builtin(8, "Heavy Truck");
    pub const TRAILER: Self = Self::builtin(9, "Trailer");
    pub const SPECIAL_VEHICLE: Self = Self::builtin(10, "Special Vehicle");
    pub const TRAM: Self = Self::builtin(11, "Tram");
    pub const ROAD_SIDE_UNIT: Self = Self::builtin(15, "Road Side Unit");
}

impl DataLinkType {
    /// `LINKTYPE_ETHERNET` (EN10MB).
    pub const ETHERNET: Self = Self::builtin(1, "Ethernet");
    /// Cohda Wireless capture header in front of an Ethernet frame.
    pub const COHDA: Self = Self::builtin(158, "Cohda");
}

impl EtherType {
    pub const IPV4: Self = Self::builtin(0x0800, "IPv4");
    pub const ARP: Self = Self::builtin(0x0806, "ARP");
    pub const IPV6: Self = Self::builtin(0x86DD, "IPv6");
    pub const GEONETWORKING: Self = Self::builtin(0x8947, "ETSI TC-ITS");
}

/// A vendor code read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VendorCode<V> {
    pub value: V,
    pub name: String,
}

impl<V> VendorCode<V> {
    pub fn to_code<K: CodeKind<Value = V>>(&self) -> TypeCode<K>
    where
        V: Copy,
    {
        TypeCode::new(self.value, self.name.clone())
    }
}

/// Thread-safe mapping from wire value to named code.
pub struct CodeTable<K: CodeKind> {
    codes: RwLock<HashMap<K::Value, TypeCode<K>>>,
}

impl<K: CodeKind> CodeTable<K> {
    pub fn new() -> Self {
        Self {
            codes: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_codes(codes: impl IntoIterator<Item = TypeCode<K>>) -> Self {
        let table = Self::new();
        for code in codes {
            table.register(code);
        }
        table
    }

    /// Resolve a wire value. Unregistered values give an `Unknown` code.
    pub fn lookup(&self, value: K::Value) -> TypeCode<K> {
        self.codes
            .read()
            .get(&value)
            .cloned()
            .unwrap_or_else(|| TypeCode::unknown(value))
    }

    /// Insert or replace a code; returns the code it replaced.
    pub fn register(&self, code: TypeCode<K>) -> Option<TypeCode<K>> {
        let previous = self.codes.write().insert(code.value(), code.clone());
        if let Some(previous) = &previous {
            if previous.name() != code.name() {
                debug!(
                    "{} {} renamed from {:?} to {:?}",
                    K::FAMILY,
                    code.value(),
                    previous.name(),
                    code.name()
                );
            }
        }
        previous
    }

    pub fn contains(&self, value: K::Value) -> bool {
        self.codes.read().contains_key(&value)
    }

    /// Registered codes in ascending value order.
    pub fn codes(&self) -> Vec<TypeCode<K>> {
        let mut codes: Vec<_> = self.codes.read().values().cloned().collect();
        codes.sort();
        codes
    }
}

impl<K: CodeKind> Default for CodeTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Subtypes keyed by `(header type, subtype value)`.
///
/// Header types reuse the same subtype numbers with different meanings, so
/// a subtype is never looked up on its own.
#[derive(Default)]
pub struct SubtypeTable {
    codes: RwLock<HashMap<(u8, u8), HeaderSubtype>>,
}

impl SubtypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, header_type: &PacketHeaderType, value: u8) -> HeaderSubtype {
        self.codes
            .read()
            .get(&(header_type.value(), value))
            .cloned()
            .unwrap_or_else(|| HeaderSubtype::unknown(value))
    }

    pub fn register(
        &self,
        header_type: &PacketHeaderType,
        subtype: HeaderSubtype,
    ) -> Option<HeaderSubtype> {
        self.codes
            .write()
            .insert((header_type.value(), subtype.value()), subtype)
    }

    pub fn contains(&self, header_type: &PacketHeaderType, value: u8) -> bool {
        self.codes.read().contains_key(&(header_type.value(), value))
    }
}

/// All code tables a decoder consults.
///
/// Build one with [`TypeRegistry::with_builtins`], register vendor codes,
/// then share it (usually behind an `Arc`) between decoding threads.
pub struct TypeRegistry {
    gn_header_types: CodeTable<GnHeaderKind>,
    packet_header_types: CodeTable<PacketHeaderKind>,
    subtypes: SubtypeTable,
    transport_types: CodeTable<TransportKind>,
    station_types: CodeTable<StationKind>,
    link_types: CodeTable<LinkKind>,
    ether_types: CodeTable<EtherKind>,
}

impl TypeRegistry {
    /// Registry with no codes at all.
    pub fn empty() -> Self {
        Self {
            gn_header_types: CodeTable::new(),
            packet_header_types: CodeTable::new(),
            subtypes: SubtypeTable::new(),
            transport_types: CodeTable::new(),
            station_types: CodeTable::new(),
            link_types: CodeTable::new(),
            ether_types: CodeTable::new(),
        }
    }

    /// Registry seeded with the standard codes.
    pub fn with_builtins() -> Self {
        let registry = Self::empty();

        for code in [
            GnHeaderType::ANY,
            GnHeaderType::COMMON,
            GnHeaderType::SECURED,
        ] {
            registry.gn_header_types.register(code);
        }

        for code in [
            PacketHeaderType::ANY,
            PacketHeaderType::BEACON,
            PacketHeaderType::GEO_UNICAST,
            PacketHeaderType::GEO_ANYCAST,
            PacketHeaderType::GEO_BROADCAST,
            PacketHeaderType::TOPO_BROADCAST,
            PacketHeaderType::LOCATION_SERVICE,
        ] {
            registry.packet_header_types.register(code);
        }

        let subtypes = [
            (PacketHeaderType::ANY, HeaderSubtype::UNSPECIFIED),
            (PacketHeaderType::BEACON, HeaderSubtype::UNSPECIFIED),
            (PacketHeaderType::GEO_UNICAST, HeaderSubtype::UNSPECIFIED),
            (PacketHeaderType::GEO_ANYCAST, HeaderSubtype::CIRCLE),
            (PacketHeaderType::GEO_ANYCAST, HeaderSubtype::RECTANGLE),
            (PacketHeaderType::GEO_ANYCAST, HeaderSubtype::ELLIPSE),
            (PacketHeaderType::GEO_BROADCAST, HeaderSubtype::CIRCLE),
            (PacketHeaderType::GEO_BROADCAST, HeaderSubtype::RECTANGLE),
            (PacketHeaderType::GEO_BROADCAST, HeaderSubtype::ELLIPSE),
            (PacketHeaderType::TOPO_BROADCAST, HeaderSubtype::SINGLE_HOP),
            (PacketHeaderType::TOPO_BROADCAST, HeaderSubtype::MULTI_HOP),
            (PacketHeaderType::LOCATION_SERVICE, HeaderSubtype::LS_REQUEST),
            (PacketHeaderType::LOCATION_SERVICE, HeaderSubtype::LS_REPLY),
        ];
        for (header_type, subtype) in subtypes {
            registry.subtypes.register(&header_type, subtype);
        }

        for code in [
            TransportType::ANY,
            TransportType::BTP_A,
            TransportType::BTP_B,
            TransportType::IPV6,
        ] {
            registry.transport_types.register(code);
        }

        for code in [
            StationType::UNKNOWN,
            StationType::PEDESTRIAN,
            StationType::CYCLIST,
            StationType::MOPED,
            StationType::MOTORCYCLE,
            StationType::PASSENGER_CAR,
            StationType::BUS,
            StationType::LIGHT_TRUCK,
            StationType::HEAVY_TRUCK,
            StationType::TRAILER,
            StationType::SPECIAL_VEHICLE,
            StationType::TRAM,
            StationType::ROAD_SIDE_UNIT,
        ] {
            registry.station_types.register(code);
        }

        for code in [DataLinkType::ETHERNET, DataLinkType::COHDA] {
            registry.link_types.register(code);
        }

        for code in [
            EtherType::IPV4,
            EtherType::ARP,
            EtherType::IPV6,
            EtherType::GEONETWORKING,
        ] {
            registry.ether_types.register(code);
        }

        registry
    }

    pub fn gn_header_types(&self) -> &CodeTable<GnHeaderKind> {
        &self.gn_header_types
    }

    pub fn packet_header_types(&self) -> &CodeTable<PacketHeaderKind> {
        &self.packet_header_types
    }

    pub fn subtypes(&self) -> &SubtypeTable {
        &self.subtypes
    }

    pub fn transport_types(&self) -> &CodeTable<TransportKind> {
        &self.transport_types
    }

    pub fn station_types(&self) -> &CodeTable<StationKind> {
        &self.station_types
    }

    pub fn link_types(&self) -> &CodeTable<LinkKind> {
        &self.link_types
    }

    pub fn ether_types(&self) -> &CodeTable<EtherKind> {
        &self.ether_types
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Header type (bits 0-3) and subtype (bits 4-7) of the common header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedHeaderType {
    pub header_type: PacketHeaderType,
    pub subtype: HeaderSubtype,
}

impl ExtendedHeaderType {
    pub const TYPE_FIELD: BitField = BitField::in_byte(0, 4);
    pub const SUBTYPE_FIELD: BitField = BitField::in_byte(4, 4);

    pub const ANY: Self = Self::new(PacketHeaderType::ANY, HeaderSubtype::UNSPECIFIED);
    pub const BEACON: Self = Self::new(PacketHeaderType::BEACON, HeaderSubtype::UNSPECIFIED);
    pub const GEO_UNICAST: Self =
        Self::new(PacketHeaderType::GEO_UNICAST, HeaderSubtype::UNSPECIFIED);
    pub const GEO_ANYCAST_CIRCLE: Self =
        Self::new(PacketHeaderType::GEO_ANYCAST, HeaderSubtype::CIRCLE);
    pub const GEO_ANYCAST_RECTANGLE: Self =
        Self::new(PacketHeaderType::GEO_ANYCAST, HeaderSubtype::RECTANGLE);
    pub const GEO_ANYCAST_ELLIPSE: Self =
        Self::new(PacketHeaderType::GEO_ANYCAST, HeaderSubtype::ELLIPSE);
    pub const GEO_BROADCAST_CIRCLE: Self =
        Self::new(PacketHeaderType::GEO_BROADCAST, HeaderSubtype::CIRCLE);
    pub const GEO_BROADCAST_RECTANGLE: Self =
        Self::new(PacketHeaderType::GEO_BROADCAST, HeaderSubtype::RECTANGLE);
    pub const GEO_BROADCAST_ELLIPSE: Self =
        Self::new(PacketHeaderType::GEO_BROADCAST, HeaderSubtype::ELLIPSE);
    pub const SINGLE_HOP_BROADCAST: Self =
        Self::new(PacketHeaderType::TOPO_BROADCAST, HeaderSubtype::SINGLE_HOP);
    pub const MULTI_HOP_BROADCAST: Self =
        Self::new(PacketHeaderType::TOPO_BROADCAST, HeaderSubtype::MULTI_HOP);
    pub const LS_REQUEST: Self =
        Self::new(PacketHeaderType::LOCATION_SERVICE, HeaderSubtype::LS_REQUEST);
    pub const LS_REPLY: Self =
        Self::new(PacketHeaderType::LOCATION_SERVICE, HeaderSubtype::LS_REPLY);

    pub const fn new(header_type: PacketHeaderType, subtype: HeaderSubtype) -> Self {
        Self {
            header_type,
            subtype,
        }
    }

    /// Split the combined byte and resolve both halves.
    pub fn from_byte(byte: u8, types: &TypeRegistry) -> Self {
        let header_type = types
            .packet_header_types()
            .lookup(Self::TYPE_FIELD.get(byte as u32) as u8);
        let subtype = types
            .subtypes()
            .lookup(&header_type, Self::SUBTYPE_FIELD.get(byte as u32) as u8);
        Self {
            header_type,
            subtype,
        }
    }

    /// Both halves are masked to 4 bits.
    pub fn to_byte(&self) -> u8 {
        let byte = Self::TYPE_FIELD.set(0, self.header_type.value() as u32);
        Self::SUBTYPE_FIELD.set(byte, self.subtype.value() as u32) as u8
    }

    pub fn try_to_byte(&self) -> Result<u8> {
        let byte = Self::TYPE_FIELD.try_set(0, self.header_type.value() as u32)?;
        Ok(Self::SUBTYPE_FIELD.try_set(byte, self.subtype.value() as u32)? as u8)
    }
}

impl fmt::Display for ExtendedHeaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} (0x{:02X})",
            self.header_type.name(),
            self.subtype.name(),
            self.to_byte()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_type_code_equality_by_value() {
        let renamed = GnHeaderType::new(1, "Something else");
        assert_eq!(renamed, GnHeaderType::COMMON);
        assert!(GnHeaderType::ANY < GnHeaderType::SECURED);
        assert_eq!(GnHeaderType::COMMON.to_string(), "Common (1)");
        assert_eq!(EtherType::GEONETWORKING.to_string(), "ETSI TC-ITS (0x8947)");
    }

    #[test]
    fn test_lookup_unknown_never_fails() {
        let registry = TypeRegistry::with_builtins();
        let code = registry.station_types().lookup(12);
        assert_eq!(code.value(), 12);
        assert_eq!(code.name(), UNKNOWN_NAME);
        assert!(!registry.station_types().contains(12));

        let code = registry.station_types().lookup(15);
        assert_eq!(code.name(), "Road Side Unit");
    }

    #[test]
    fn test_register_last_wins() {
        let table: CodeTable<TransportKind> = CodeTable::new();
        assert!(table.register(TransportType::new(9, "Vendor A")).is_none());
        let previous = table.register(TransportType::new(9, "Vendor B"));
        assert_eq!(previous.map(|c| c.name().to_string()), Some("Vendor A".into()));
        assert_eq!(table.lookup(9).name(), "Vendor B");
        assert_eq!(table.codes().len(), 1);
    }

    #[test]
    fn test_subtypes_scoped_by_header_type() {
        let registry = TypeRegistry::with_builtins();
        let subtypes = registry.subtypes();
        assert_eq!(
            subtypes.lookup(&PacketHeaderType::GEO_BROADCAST, 1).name(),
            "Rectangle"
        );
        assert_eq!(
            subtypes.lookup(&PacketHeaderType::TOPO_BROADCAST, 1).name(),
            "Multi Hop"
        );
        assert_eq!(
            subtypes.lookup(&PacketHeaderType::LOCATION_SERVICE, 1).name(),
            "Reply"
        );
        assert_eq!(
            subtypes.lookup(&PacketHeaderType::BEACON, 1).name(),
            UNKNOWN_NAME
        );
    }

    #[test]
    fn test_extended_header_type_byte() {
        let registry = TypeRegistry::with_builtins();
        let code = ExtendedHeaderType::from_byte(0x42, &registry);
        assert_eq!(code, ExtendedHeaderType::GEO_BROADCAST_ELLIPSE);
        assert_eq!(code.subtype.name(), "Ellipse");
        assert_eq!(code.to_byte(), 0x42);
        assert_eq!(ExtendedHeaderType::MULTI_HOP_BROADCAST.to_byte(), 0x51);
        assert_eq!(code.to_string(), "GeoBroadcast / Ellipse (0x42)");

        let code = ExtendedHeaderType::from_byte(0x9A, &registry);
        assert_eq!(code.header_type.name(), UNKNOWN_NAME);
        assert_eq!(code.to_byte(), 0x9A);
        assert_eq!(code.try_to_byte(), Ok(0x9A));

        let wide = ExtendedHeaderType::new(
            PacketHeaderType::BEACON,
            HeaderSubtype::new(17, "Vendor"),
        );
        assert!(wide.try_to_byte().is_err());
    }

    #[test]
    fn test_vendor_code_conversion() {
        let vendor = VendorCode {
            value: 0x1234u16,
            name: "Vendor".to_string(),
        };
        let code: EtherType = vendor.to_code();
        assert_eq!(code.value(), 0x1234);
        assert_eq!(code.name(), "Vendor");
    }

    #[test]
    fn test_concurrent_register_and_lookup() {
        let registry = Arc::new(TypeRegistry::with_builtins());
        let mut handles = Vec::new();
        for i in 0..4u32 {
            let registry = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for n in 0..100u32 {
                    let value = 1000 + i * 100 + n;
                    registry
                        .link_types()
                        .register(DataLinkType::new(value, format!("Vendor {value}")));
                    assert_eq!(registry.link_types().lookup(1).name(), "Ethernet");
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.link_types().codes().len(), 2 + 400);
    }
}
