//! GN addresses and position vectors.
//!
//! ```text
//! GN_ADDR (8 bytes)
//! +-+---------+-------------------+-------------------------------+
//! |M|   ST    |        SCC        |         MID (48 bits)         |
//! +-+---------+-------------------+-------------------------------+
//!
//! Long position vector (24 bytes)
//! +---------+-----+-----+-----+-+---------------+---------------+
//! | GN_ADDR | TST | LAT | LON |P|  speed (15)   |    heading    |
//! +---------+-----+-----+-----+-+---------------+---------------+
//! ```
//!
//! The short position vector stops after the longitude.

use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::{Buf, BufMut, BytesMut};

use crate::bits::BitField;
use crate::codec::{check_len, hex_string, mac_string, WireEncode};
use crate::error::Result;
use crate::types::{StationType, TypeRegistry};

/// Address size in bytes.
pub const ADDRESS_LEN: usize = 8;

/// Short position vector size in bytes.
pub const SHORT_POSITION_VECTOR_LEN: usize = 20;

/// Long position vector size in bytes.
pub const LONG_POSITION_VECTOR_LEN: usize = 24;

const MANUAL: BitField = BitField::in_short(0, 1);
const STATION_TYPE: BitField = BitField::in_short(1, 5);
const COUNTRY_CODE: BitField = BitField::in_short(6, 10);

const ACCURACY: BitField = BitField::in_short(0, 1);
const SPEED: BitField = BitField::in_short(1, 15);

/// A GeoNetworking address.
///
/// The decoded station type is kept next to the raw octets; equality and
/// hashing only use the octets.
#[derive(Debug, Clone)]
pub struct Address {
    raw: [u8; ADDRESS_LEN],
    station_type: StationType,
}

impl Address {
    /// Pack an address.
    ///
    /// Fails with `ValueOutOfRange` if the station type needs more than 5
    /// bits or the country code more than 10.
    pub fn new(
        manual: bool,
        station_type: StationType,
        country_code: u16,
        link_address: [u8; 6],
    ) -> Result<Self> {
        let mut head = MANUAL.set(0, manual as u32);
        head = STATION_TYPE.try_set(head, station_type.value() as u32)?;
        head = COUNTRY_CODE.try_set(head, country_code as u32)?;

        let mut raw = [0u8; ADDRESS_LEN];
        raw[..2].copy_from_slice(&(head as u16).to_be_bytes());
        raw[2..].copy_from_slice(&link_address);
        Ok(Self { raw, station_type })
    }

    pub fn decode(data: &[u8], types: &TypeRegistry) -> Result<Self> {
        check_len(data, ADDRESS_LEN)?;
        let mut raw = [0u8; ADDRESS_LEN];
        raw.copy_from_slice(&data[..ADDRESS_LEN]);
        Ok(Self::from_octets(raw, types))
    }

    pub fn from_octets(raw: [u8; ADDRESS_LEN], types: &TypeRegistry) -> Self {
        let head = u16::from_be_bytes([raw[0], raw[1]]) as u32;
        let station_type = types
            .station_types()
            .lookup(STATION_TYPE.get(head) as u8);
        Self { raw, station_type }
    }

    pub fn octets(&self) -> [u8; ADDRESS_LEN] {
        self.raw
    }

    fn head(&self) -> u32 {
        u16::from_be_bytes([self.raw[0], self.raw[1]]) as u32
    }

    pub fn is_manually_configured(&self) -> bool {
        MANUAL.get(self.head()) == 1
    }

    pub fn station_type(&self) -> &StationType {
        &self.station_type
    }

    /// ITS country code (10 bits).
    pub fn country_code(&self) -> u16 {
        COUNTRY_CODE.get(self.head()) as u16
    }

    pub fn link_address(&self) -> [u8; 6] {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.raw[2..]);
        mac
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl WireEncode for Address {
    fn wire_len(&self) -> usize {
        ADDRESS_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.raw);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self.head();
        writeln!(f, "GN Address: {}", hex_string(&self.raw))?;
        writeln!(
            f,
            "  {} = Manually Configured: {}",
            MANUAL.diagram(head),
            if self.is_manually_configured() { "Yes" } else { "No" }
        )?;
        writeln!(
            f,
            "  {} = Station Type: {}",
            STATION_TYPE.diagram(head),
            self.station_type
        )?;
        writeln!(
            f,
            "  {} = Country Code: {}",
            COUNTRY_CODE.diagram(head),
            self.country_code()
        )?;
        writeln!(f, "  Link-Layer Address: {}", mac_string(&self.raw[2..]))
    }
}

/// Render a coordinate in 1/10 microdegree as degrees, minutes and seconds.
pub fn format_coordinate(value: i32, positive: char, negative: char) -> String {
    let hemisphere = if value < 0 { negative } else { positive };
    let total = (value as i64).unsigned_abs();
    let degrees = total / 10_000_000;
    let minutes_scaled = (total % 10_000_000) * 60;
    let minutes = minutes_scaled / 10_000_000;
    let seconds = ((minutes_scaled % 10_000_000) * 60) as f64 / 10_000_000.0;
    format!("{degrees}°{minutes:02}'{seconds:05.2}\"{hemisphere}")
}

fn write_position(
    f: &mut fmt::Formatter<'_>,
    address: &Address,
    timestamp: u32,
    latitude: i32,
    longitude: i32,
) -> fmt::Result {
    write!(f, "{address}")?;
    writeln!(f, "Timestamp: {timestamp} ms")?;
    writeln!(
        f,
        "Latitude: {} ({latitude})",
        format_coordinate(latitude, 'N', 'S')
    )?;
    writeln!(
        f,
        "Longitude: {} ({longitude})",
        format_coordinate(longitude, 'E', 'W')
    )
}

/// Address, timestamp and position of a station.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShortPositionVector {
    pub address: Address,
    /// Milliseconds since 2004-01-01 TAI, modulo 2^32.
    pub timestamp: u32,
    /// 1/10 microdegree, positive north.
    pub latitude: i32,
    /// 1/10 microdegree, positive east.
    pub longitude: i32,
}

impl ShortPositionVector {
    pub fn decode(data: &[u8], types: &TypeRegistry) -> Result<Self> {
        check_len(data, SHORT_POSITION_VECTOR_LEN)?;
        let address = Address::decode(data, types)?;
        let mut buf = &data[ADDRESS_LEN..SHORT_POSITION_VECTOR_LEN];
        Ok(Self {
            address,
            timestamp: buf.get_u32(),
            latitude: buf.get_i32(),
            longitude: buf.get_i32(),
        })
    }
}

impl WireEncode for ShortPositionVector {
    fn wire_len(&self) -> usize {
        SHORT_POSITION_VECTOR_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        self.address.encode(buf);
        buf.put_u32(self.timestamp);
        buf.put_i32(self.latitude);
        buf.put_i32(self.longitude);
    }
}

impl fmt::Display for ShortPositionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_position(f, &self.address, self.timestamp, self.latitude, self.longitude)
    }
}

/// Short position vector plus accuracy, speed and heading.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LongPositionVector {
    pub address: Address,
    pub timestamp: u32,
    pub latitude: i32,
    pub longitude: i32,
    /// Position accuracy indicator.
    pub position_accuracy: bool,
    /// 0.01 m/s, 15-bit signed (-16384..=16383).
    pub speed: i16,
    /// 0.1 degree from north, clockwise.
    pub heading: u16,
}

impl LongPositionVector {
    pub fn decode(data: &[u8], types: &TypeRegistry) -> Result<Self> {
        check_len(data, LONG_POSITION_VECTOR_LEN)?;
        let address = Address::decode(data, types)?;
        let mut buf = &data[ADDRESS_LEN..LONG_POSITION_VECTOR_LEN];
        let timestamp = buf.get_u32();
        let latitude = buf.get_i32();
        let longitude = buf.get_i32();
        let motion = buf.get_u16() as u32;
        let heading = buf.get_u16();

        Ok(Self {
            address,
            timestamp,
            latitude,
            longitude,
            position_accuracy: ACCURACY.get(motion) == 1,
            speed: SPEED.get_signed(motion) as i16,
            heading,
        })
    }

    /// Speeds the 15-bit field can carry, in 0.01 m/s.
    pub const fn speed_range() -> (i16, i16) {
        let (min, max) = SPEED.signed_range();
        (min as i16, max as i16)
    }

    fn motion_word(&self) -> u32 {
        let word = ACCURACY.set(0, self.position_accuracy as u32);
        SPEED.set(word, self.speed as u32)
    }

    pub fn to_short(&self) -> ShortPositionVector {
        ShortPositionVector {
            address: self.address.clone(),
            timestamp: self.timestamp,
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

impl WireEncode for LongPositionVector {
    fn wire_len(&self) -> usize {
        LONG_POSITION_VECTOR_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        self.address.encode(buf);
        buf.put_u32(self.timestamp);
        buf.put_i32(self.latitude);
        buf.put_i32(self.longitude);
        buf.put_u16(self.motion_word() as u16);
        buf.put_u16(self.heading);
    }

    /// Heading uses its whole 16 bits; only the speed can overflow.
    fn validate(&self) -> Result<()> {
        SPEED.try_set_signed(0, self.speed as i32).map(|_| ())
    }
}

impl fmt::Display for LongPositionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_position(f, &self.address, self.timestamp, self.latitude, self.longitude)?;
        let motion = self.motion_word();
        writeln!(
            f,
            "{} = Position Accuracy: {}",
            ACCURACY.diagram(motion),
            self.position_accuracy as u8
        )?;
        writeln!(
            f,
            "{} = Speed: {:.2} m/s ({})",
            SPEED.diagram(motion),
            self.speed as f64 / 100.0,
            self.speed
        )?;
        writeln!(
            f,
            "Heading: {:.1}° ({})",
            self.heading as f64 / 10.0,
            self.heading
        )
    }
}
