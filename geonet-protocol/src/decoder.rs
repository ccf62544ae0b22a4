//! Frame-level entry point.

use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use serde::Deserialize;

use crate::codec::window;
use crate::cohda::{self, CohdaDirection};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::packet::Packet;
use crate::types::{
    DataLinkType, EtherKind, LinkKind, StationKind, TransportKind, TypeRegistry, VendorCode,
};

/// Decoder settings, usually read from the `[decoder]` table of a config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Data-link type of the capture source.
    pub link_type: u32,
    /// Link type the Cohda capture header is registered under.
    pub cohda_link_type: u32,
    pub cohda_direction: CohdaDirection,
    pub vendor_link_types: Vec<VendorCode<u32>>,
    pub vendor_ether_types: Vec<VendorCode<u16>>,
    pub vendor_transport_types: Vec<VendorCode<u8>>,
    pub vendor_station_types: Vec<VendorCode<u8>>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            link_type: DataLinkType::COHDA.value(),
            cohda_link_type: DataLinkType::COHDA.value(),
            cohda_direction: CohdaDirection::Rx,
            vendor_link_types: Vec::new(),
            vendor_ether_types: Vec::new(),
            vendor_transport_types: Vec::new(),
            vendor_station_types: Vec::new(),
        }
    }
}

/// One decoded capture frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFrame {
    pub link_type: DataLinkType,
    pub packet: Packet,
}

impl fmt::Display for CaptureFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Link type: {}", self.link_type)?;
        write!(f, "{}", self.packet)
    }
}

/// Decodes whole capture frames of one link type.
#[derive(Debug, Clone)]
pub struct Decoder {
    dispatcher: Arc<Dispatcher>,
    link_type: u32,
}

impl Decoder {
    /// Build the type registry and dispatcher described by `config`.
    pub fn new(config: &DecoderConfig) -> Self {
        let types = TypeRegistry::with_builtins();
        register_vendor_codes(&types, config);

        let cohda_link_type = if types.link_types().contains(config.cohda_link_type) {
            types.link_types().lookup(config.cohda_link_type)
        } else {
            DataLinkType::new(config.cohda_link_type, DataLinkType::COHDA.name().to_owned())
        };

        let dispatcher = Dispatcher::with_builtins(Arc::new(types));
        cohda::register(&dispatcher, cohda_link_type, config.cohda_direction);

        info!(
            "Decoder ready: link type {}, Cohda {:?} on {}",
            dispatcher.types().link_types().lookup(config.link_type),
            config.cohda_direction,
            config.cohda_link_type
        );
        Self::with_dispatcher(Arc::new(dispatcher), config.link_type)
    }

    /// Decoder over an existing dispatcher, e.g. one shared between captures.
    pub fn with_dispatcher(dispatcher: Arc<Dispatcher>, link_type: u32) -> Self {
        Self {
            dispatcher,
            link_type,
        }
    }

    /// Same dispatcher, different capture link type.
    pub fn with_link_type(&self, link_type: u32) -> Self {
        Self::with_dispatcher(Arc::clone(&self.dispatcher), link_type)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn link_type(&self) -> DataLinkType {
        self.dispatcher.types().link_types().lookup(self.link_type)
    }

    /// Decode `bytes[offset..offset + length]` as one frame.
    ///
    /// Errors from the outermost (capture) layer are returned; everything
    /// nested degrades to placeholder packets instead.
    pub fn decode_frame(&self, bytes: &[u8], offset: usize, length: usize) -> Result<CaptureFrame> {
        let data = window(bytes, offset, length)?;
        let packet = match self
            .dispatcher
            .link_layers()
            .try_decode(self.link_type, data, &self.dispatcher)
        {
            Some(packet) => packet?,
            None => {
                debug!("No decoder for link type {}", self.link_type);
                Packet::unknown(data)
            }
        };
        Ok(CaptureFrame {
            link_type: self.link_type(),
            packet,
        })
    }
}

fn register_vendor_codes(types: &TypeRegistry, config: &DecoderConfig) {
    for code in &config.vendor_link_types {
        types.link_types().register(code.to_code::<LinkKind>());
    }
    for code in &config.vendor_ether_types {
        types.ether_types().register(code.to_code::<EtherKind>());
    }
    for code in &config.vendor_transport_types {
        types.transport_types().register(code.to_code::<TransportKind>());
    }
    for code in &config.vendor_station_types {
        types.station_types().register(code.to_code::<StationKind>());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    #[test]
    fn test_default_config() {
        let config = DecoderConfig::default();
        assert_eq!(config.link_type, 158);
        assert_eq!(config.cohda_link_type, 158);
        assert_eq!(config.cohda_direction, CohdaDirection::Rx);
        assert!(config.vendor_link_types.is_empty());
    }

    #[test]
    fn test_vendor_codes_registered() {
        let config = DecoderConfig {
            vendor_link_types: vec![VendorCode {
                value: 147,
                name: "User0".to_owned(),
            }],
            vendor_station_types: vec![VendorCode {
                value: 14,
                name: "Drone".to_owned(),
            }],
            ..DecoderConfig::default()
        };
        let decoder = Decoder::new(&config);
        let types = decoder.dispatcher().types();
        assert_eq!(types.link_types().lookup(147).name(), "User0");
        assert_eq!(types.station_types().lookup(14).name(), "Drone");
        assert_eq!(decoder.link_type(), DataLinkType::COHDA);
        assert_eq!(decoder.dispatcher().link_layers().target(158), "CohdaRx");
    }

    #[test]
    fn test_cohda_on_vendor_link_type() {
        let config = DecoderConfig {
            link_type: 200,
            cohda_link_type: 200,
            cohda_direction: CohdaDirection::Tx,
            ..DecoderConfig::default()
        };
        let decoder = Decoder::new(&config);
        assert_eq!(decoder.link_type().name(), "Cohda");
        assert_eq!(decoder.dispatcher().link_layers().target(200), "CohdaTx");
        assert_eq!(decoder.dispatcher().link_layers().target(158), "Unknown");
    }

    #[test]
    fn test_window_checked_first() {
        let decoder = Decoder::new(&DecoderConfig::default());
        assert_eq!(
            decoder.decode_frame(&[0; 8], 4, 8),
            Err(DecodeError::OutOfBounds {
                offset: 4,
                length: 8,
                available: 8
            })
        );
    }

    #[test]
    fn test_capture_framing_error_surfaces() {
        let decoder = Decoder::new(&DecoderConfig::default());
        assert_eq!(
            decoder.decode_frame(&[0; 10], 0, 10),
            Err(DecodeError::TooShort {
                expected: 32,
                actual: 10
            })
        );
    }

    #[test]
    fn test_unregistered_link_type_is_opaque() {
        let decoder = Decoder::new(&DecoderConfig::default()).with_link_type(228);
        let frame = decoder.decode_frame(&[1, 2, 3, 4], 1, 2).unwrap();
        assert_eq!(frame.link_type.value(), 228);
        match frame.packet {
            Packet::Unknown(p) => assert_eq!(p.data.as_ref(), &[2, 3]),
            other => panic!("unexpected packet: {other:?}"),
        }
    }
}
