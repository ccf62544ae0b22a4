//! Cohda Wireless capture headers.
//!
//! Cohda radios prepend a little-endian metadata header to every captured
//! frame. Received frames carry a 32-byte Rx header, transmitted frames a
//! 16-byte Tx header; both are followed by an Ethernet frame.
//!
//! ```text
//! Rx: ch | prio | svc | mcs | pwrA | pwrB | noiseA | noiseB | rsvd | tsf |
//!     idle | util | util period | trice | fine freq (24 bits)
//! Tx: ch | prio | svc | mcs | pad | man. power | antenna | expiry
//! ```

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};
use log::debug;
use serde::Deserialize;

use crate::codec::{check_len, WireEncode};
use crate::dispatch::Dispatcher;
use crate::error::{DecodeError, Result};
use crate::packet::{CohdaRxPacket, CohdaTxPacket, Packet};
use crate::types::DataLinkType;

/// Rx header size in bytes.
pub const COHDA_RX_HEADER_LEN: usize = 32;

/// Tx header size in bytes.
pub const COHDA_TX_HEADER_LEN: usize = 16;

const FINE_FREQUENCY_MAX: u32 = 0x00FF_FFFF;

/// Which Cohda header a capture carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CohdaDirection {
    #[default]
    Rx,
    Tx,
}

/// Half-dB steps rendered as dB with one decimal.
fn format_half_db(raw: i16) -> String {
    format!("{:.1} dB", raw as f64 / 2.0)
}

/// Microseconds rendered as seconds with six decimals.
fn format_micros(raw: u64) -> String {
    format!("{}.{:06} s", raw / 1_000_000, raw % 1_000_000)
}

/// Metadata of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CohdaRxHeader {
    pub channel_number: u8,
    pub priority: u8,
    pub service: u8,
    /// Modulation and coding scheme.
    pub mcs: u8,
    /// Received power per antenna, 0.5 dB steps.
    pub rx_power_a: i16,
    pub rx_power_b: i16,
    /// Noise floor per antenna, 0.5 dB steps.
    pub rx_noise_a: i16,
    pub rx_noise_b: i16,
    pub reserved: u32,
    /// Timing synchronisation function counter in microseconds.
    pub tsf: u64,
    pub idle_power: u8,
    pub channel_utilisation: u8,
    /// Scale of `channel_utilisation`.
    pub channel_utilisation_period: u16,
    pub trice: u8,
    /// 24-bit fine frequency offset.
    pub fine_frequency: u32,
}

impl CohdaRxHeader {
    pub fn decode(data: &[u8]) -> Result<Self> {
        check_len(data, COHDA_RX_HEADER_LEN)?;
        let mut buf = &data[..COHDA_RX_HEADER_LEN];
        Ok(Self {
            channel_number: buf.get_u8(),
            priority: buf.get_u8(),
            service: buf.get_u8(),
            mcs: buf.get_u8(),
            rx_power_a: buf.get_i16_le(),
            rx_power_b: buf.get_i16_le(),
            rx_noise_a: buf.get_i16_le(),
            rx_noise_b: buf.get_i16_le(),
            reserved: buf.get_u32_le(),
            tsf: buf.get_u64_le(),
            idle_power: buf.get_u8(),
            channel_utilisation: buf.get_u8(),
            channel_utilisation_period: buf.get_u16_le(),
            trice: buf.get_u8(),
            fine_frequency: buf.get_uint_le(3) as u32,
        })
    }

    /// Channel utilisation in percent, if the period is non-zero.
    pub fn channel_utilisation_percent(&self) -> Option<f64> {
        (self.channel_utilisation_period != 0).then(|| {
            100.0 * self.channel_utilisation as f64 / self.channel_utilisation_period as f64
        })
    }
}

impl WireEncode for CohdaRxHeader {
    fn wire_len(&self) -> usize {
        COHDA_RX_HEADER_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.channel_number);
        buf.put_u8(self.priority);
        buf.put_u8(self.service);
        buf.put_u8(self.mcs);
        buf.put_i16_le(self.rx_power_a);
        buf.put_i16_le(self.rx_power_b);
        buf.put_i16_le(self.rx_noise_a);
        buf.put_i16_le(self.rx_noise_b);
        buf.put_u32_le(self.reserved);
        buf.put_u64_le(self.tsf);
        buf.put_u8(self.idle_power);
        buf.put_u8(self.channel_utilisation);
        buf.put_u16_le(self.channel_utilisation_period);
        buf.put_u8(self.trice);
        buf.put_uint_le((self.fine_frequency & FINE_FREQUENCY_MAX) as u64, 3);
    }

    fn validate(&self) -> Result<()> {
        if self.fine_frequency > FINE_FREQUENCY_MAX {
            return Err(DecodeError::ValueOutOfRange {
                value: self.fine_frequency as i64,
                length: 24,
            });
        }
        Ok(())
    }
}

impl fmt::Display for CohdaRxHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Cohda Rx Header ({COHDA_RX_HEADER_LEN} bytes)]")?;
        writeln!(f, "  Channel Number: {}", self.channel_number)?;
        writeln!(f, "  Priority: {}", self.priority)?;
        writeln!(f, "  Service: {}", self.service)?;
        writeln!(f, "  MCS: {}", self.mcs)?;
        for (name, raw) in [
            ("Rx Power A", self.rx_power_a),
            ("Rx Power B", self.rx_power_b),
            ("Rx Noise A", self.rx_noise_a),
            ("Rx Noise B", self.rx_noise_b),
        ] {
            writeln!(f, "  {name}: {} ({raw})", format_half_db(raw))?;
        }
        writeln!(f, "  Reserved: {}", self.reserved)?;
        writeln!(f, "  TSF: {} ({})", format_micros(self.tsf), self.tsf)?;
        writeln!(f, "  Idle Power: {}", self.idle_power)?;
        match self.channel_utilisation_percent() {
            Some(percent) => writeln!(
                f,
                "  Channel Utilisation: {percent:.1} % ({})",
                self.channel_utilisation
            )?,
            None => writeln!(
                f,
                "  Channel Utilisation: n/a ({})",
                self.channel_utilisation
            )?,
        }
        writeln!(
            f,
            "  Channel Utilisation Period: {}",
            self.channel_utilisation_period
        )?;
        writeln!(f, "  Fine Frequency: {}", self.fine_frequency)?;
        writeln!(f, "  Trice: {}", self.trice)
    }
}

/// Metadata of a transmitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CohdaTxHeader {
    pub channel_number: u8,
    pub priority: u8,
    pub service: u8,
    pub mcs: u8,
    /// Alignment byte at offset 4.
    pub padding: u8,
    /// Manual transmit power, 0.5 dB steps.
    pub manual_power: i16,
    pub antenna: u8,
    /// Expiry time in microseconds; 0 means the frame never expires.
    pub expiry: u64,
}

impl CohdaTxHeader {
    pub fn decode(data: &[u8]) -> Result<Self> {
        check_len(data, COHDA_TX_HEADER_LEN)?;
        let mut buf = &data[..COHDA_TX_HEADER_LEN];
        Ok(Self {
            channel_number: buf.get_u8(),
            priority: buf.get_u8(),
            service: buf.get_u8(),
            mcs: buf.get_u8(),
            padding: buf.get_u8(),
            manual_power: buf.get_i16_le(),
            antenna: buf.get_u8(),
            expiry: buf.get_u64_le(),
        })
    }
}

impl WireEncode for CohdaTxHeader {
    fn wire_len(&self) -> usize {
        COHDA_TX_HEADER_LEN
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.channel_number);
        buf.put_u8(self.priority);
        buf.put_u8(self.service);
        buf.put_u8(self.mcs);
        buf.put_u8(self.padding);
        buf.put_i16_le(self.manual_power);
        buf.put_u8(self.antenna);
        buf.put_u64_le(self.expiry);
    }
}

impl fmt::Display for CohdaTxHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Cohda Tx Header ({COHDA_TX_HEADER_LEN} bytes)]")?;
        writeln!(f, "  Channel Number: {}", self.channel_number)?;
        writeln!(f, "  Priority: {}", self.priority)?;
        writeln!(f, "  Service: {}", self.service)?;
        writeln!(f, "  MCS: {}", self.mcs)?;
        writeln!(
            f,
            "  Manual Power: {} ({})",
            format_half_db(self.manual_power),
            self.manual_power
        )?;
        writeln!(f, "  Antenna: {}", self.antenna)?;
        if self.expiry == 0 {
            writeln!(f, "  Expiry: No expiry (0)")
        } else {
            writeln!(f, "  Expiry: {} ({})", format_micros(self.expiry), self.expiry)
        }
    }
}

fn decode_inner(data: &[u8], dispatcher: &Dispatcher) -> Option<Packet> {
    (!data.is_empty()).then(|| dispatcher.decode_link(&DataLinkType::ETHERNET, data))
}

impl CohdaRxPacket {
    pub fn decode(data: &[u8], dispatcher: &Dispatcher) -> Result<Self> {
        let header = CohdaRxHeader::decode(data)?;
        let payload = decode_inner(&data[COHDA_RX_HEADER_LEN..], dispatcher);
        Ok(Self::new(header, payload))
    }
}

impl CohdaTxPacket {
    pub fn decode(data: &[u8], dispatcher: &Dispatcher) -> Result<Self> {
        let header = CohdaTxHeader::decode(data)?;
        let payload = decode_inner(&data[COHDA_TX_HEADER_LEN..], dispatcher);
        Ok(Self::new(header, payload))
    }
}

/// Plug the Cohda header decoder into the link-layer dispatch under
/// `link_type`, replacing whatever was registered there.
pub fn register(dispatcher: &Dispatcher, link_type: DataLinkType, direction: CohdaDirection) {
    debug!("Registering Cohda {:?} decoder for {}", direction, link_type);
    match direction {
        CohdaDirection::Rx => dispatcher.register_link_type(link_type, "CohdaRx", |data, ctx| {
            CohdaRxPacket::decode(data, ctx).map(Packet::CohdaRx)
        }),
        CohdaDirection::Tx => dispatcher.register_link_type(link_type, "CohdaTx", |data, ctx| {
            CohdaTxPacket::decode(data, ctx).map(Packet::CohdaTx)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;
    use std::sync::Arc;

    fn rx_bytes() -> Vec<u8> {
        let mut data = vec![178, 3, 1, 11];
        data.extend_from_slice(&(-140i16).to_le_bytes());
        data.extend_from_slice(&(-141i16).to_le_bytes());
        data.extend_from_slice(&(-190i16).to_le_bytes());
        data.extend_from_slice(&(-189i16).to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&12_345_678_901u64.to_le_bytes());
        data.extend_from_slice(&[0xA6, 25]);
        data.extend_from_slice(&100u16.to_le_bytes());
        data.extend_from_slice(&[0x07, 0x56, 0x34, 0x12]);
        data
    }

    #[test]
    fn test_decode_rx_header() {
        let data = rx_bytes();
        let header = CohdaRxHeader::decode(&data).unwrap();
        assert_eq!(header.channel_number, 178);
        assert_eq!(header.mcs, 11);
        assert_eq!(header.rx_power_a, -140);
        assert_eq!(header.rx_noise_b, -189);
        assert_eq!(header.tsf, 12_345_678_901);
        assert_eq!(header.idle_power, 0xA6);
        assert_eq!(header.channel_utilisation_percent(), Some(25.0));
        assert_eq!(header.trice, 7);
        assert_eq!(header.fine_frequency, 0x12_3456);
        assert_eq!(header.to_bytes().as_ref(), data.as_slice());
    }

    #[test]
    fn test_render_rx_header_scaling() {
        let header = CohdaRxHeader::decode(&rx_bytes()).unwrap();
        let text = header.to_string();
        assert!(text.contains("  Rx Power A: -70.0 dB (-140)\n"));
        assert!(text.contains("  Rx Noise B: -94.5 dB (-189)\n"));
        assert!(text.contains("  TSF: 12345.678901 s (12345678901)\n"));
        assert!(text.contains("  Channel Utilisation: 25.0 % (25)\n"));

        let idle = CohdaRxHeader::default();
        assert!(idle.to_string().contains("Channel Utilisation: n/a (0)"));
    }

    #[test]
    fn test_decode_tx_header() {
        let mut data = vec![172, 2, 0, 3, 0xEE];
        data.extend_from_slice(&40i16.to_le_bytes());
        data.push(1);
        data.extend_from_slice(&1_500_000u64.to_le_bytes());
        assert_eq!(data.len(), COHDA_TX_HEADER_LEN);

        let header = CohdaTxHeader::decode(&data).unwrap();
        assert_eq!(header.channel_number, 172);
        assert_eq!(header.padding, 0xEE);
        assert_eq!(header.manual_power, 40);
        assert_eq!(header.antenna, 1);
        assert_eq!(header.expiry, 1_500_000);
        assert_eq!(header.to_bytes().as_ref(), data.as_slice());

        let text = header.to_string();
        assert!(text.contains("  Manual Power: 20.0 dB (40)\n"));
        assert!(text.contains("  Expiry: 1.500000 s (1500000)\n"));
        assert!(CohdaTxHeader::default()
            .to_string()
            .contains("Expiry: No expiry (0)"));
    }

    #[test]
    fn test_header_only_has_no_payload() {
        let dispatcher = Dispatcher::with_builtins(Arc::new(TypeRegistry::with_builtins()));
        let packet = CohdaRxPacket::decode(&rx_bytes(), &dispatcher).unwrap();
        assert!(packet.payload().is_none());
        assert_eq!(packet.wire_len(), COHDA_RX_HEADER_LEN);
    }

    #[test]
    fn test_fine_frequency_checked_on_encode() {
        let mut header = CohdaRxHeader::decode(&rx_bytes()).unwrap();
        header.fine_frequency = 0x0100_0000;
        assert_eq!(
            header.try_to_bytes(),
            Err(DecodeError::ValueOutOfRange {
                value: 0x0100_0000,
                length: 24
            })
        );
        // masked by the infallible path
        assert_eq!(&header.to_bytes()[29..], &[0, 0, 0]);

        header.fine_frequency = 0x00FF_FFFF;
        assert!(header.try_to_bytes().is_ok());
    }

    #[test]
    fn test_truncated_headers() {
        assert!(CohdaRxHeader::decode(&rx_bytes()[..31]).is_err());
        assert!(CohdaTxHeader::decode(&[0; 15]).is_err());
    }

    #[test]
    fn test_register_direction() {
        let dispatcher = Dispatcher::with_builtins(Arc::new(TypeRegistry::with_builtins()));
        register(&dispatcher, DataLinkType::new(200, "Cohda Tx"), CohdaDirection::Tx);
        assert_eq!(dispatcher.link_layers().target(200), "CohdaTx");
        assert_eq!(dispatcher.types().link_types().lookup(200).name(), "Cohda Tx");
    }
}
