//! Codec for ETSI ITS-G5 GeoNetworking captures.
//!
//! This crate decodes and encodes the frames recorded by vehicular
//! ad-hoc network radios: the Cohda capture header, Ethernet II, the
//! GeoNetworking basic/common/extended headers and BTP.
//!
//! # Layers
//!
//! ```text
//! +-----------------+----------+-------------------------------+-----+------+
//! | Cohda Rx/Tx hdr | Ethernet | GN basic | common | extended   | BTP | data |
//! |  little-endian  | 0x8947   |        big-endian            | BE  |      |
//! +-----------------+----------+-------------------------------+-----+------+
//! ```
//!
//! Each layer picks its successor through a [`Dispatcher`] keyed by the
//! code in its own header. Unknown codes never fail a decode: they become
//! `Unknown`/`Empty` placeholders, and headers a registered decoder rejects
//! become `Illegal`/`Malformed` placeholders that keep the raw bytes.
//!
//! # Example
//!
//! ```rust
//! use geonet_protocol::{Decoder, DecoderConfig, WireEncode};
//!
//! let decoder = Decoder::new(&DecoderConfig {
//!     link_type: 1,
//!     ..DecoderConfig::default()
//! });
//!
//! // Ethernet header carrying a bare GN basic header
//! let mut frame = vec![0xFF; 6];
//! frame.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x89, 0x47]);
//! frame.extend_from_slice(&[0x01, 0x00, 0x00, 0x01]);
//!
//! let decoded = decoder.decode_frame(&frame, 0, frame.len()).unwrap();
//! let gn = decoded.packet.as_geonetworking().unwrap();
//! assert_eq!(gn.header_len(), 4);
//! assert_eq!(decoded.packet.to_bytes().as_ref(), frame.as_slice());
//! ```

pub mod bits;
pub mod btp;
pub mod codec;
pub mod cohda;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod ethernet;
pub mod gn;
pub mod packet;
pub mod position;
pub mod types;

pub use codec::{window, WireEncode};
pub use decoder::{CaptureFrame, Decoder, DecoderConfig};
pub use dispatch::{DispatchTable, Dispatcher};
pub use error::{DecodeError, Result};
pub use gn::{ExtendedHeader, GeoNetworkingBuilder, GeoNetworkingPacket, GnHeader};
pub use packet::{LayeredPacket, Packet};
pub use position::{Address, LongPositionVector, ShortPositionVector};
pub use types::{TypeCode, TypeRegistry};
