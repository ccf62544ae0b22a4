//! Secured packet envelope.
//!
//! Only the framing is parsed; header fields and the protected payload are
//! kept as they are, without any cryptographic processing.
//!
//! ```text
//! +---------+---------+--------+----------------+-------------+------+-------------+
//! | Version | Profile | HdrLen | header fields  | Payload len | Type | Data length |
//! |   u8    |   u8    |   u8   | HdrLen bytes   |    u16      |  u8  |    u16      |
//! +---------+---------+--------+----------------+-------------+------+-------------+
//! ```

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{check_len, hex_string, WireEncode};
use crate::error::{DecodeError, Result};

/// Smallest possible secured header: no header fields.
pub const SECURED_HEADER_MIN_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuredHeader {
    pub protocol_version: u8,
    pub security_profile: u8,
    /// Opaque header fields; the length byte is derived from this.
    pub header_fields: Bytes,
    pub payload_length: u16,
    pub payload_type: u8,
    pub payload_data_length: u16,
}

impl SecuredHeader {
    pub fn decode(data: &[u8]) -> Result<Self> {
        check_len(data, SECURED_HEADER_MIN_LEN)?;
        let fields_len = data[2] as usize;
        check_len(data, SECURED_HEADER_MIN_LEN + fields_len)?;

        let mut buf = data;
        let protocol_version = buf.get_u8();
        let security_profile = buf.get_u8();
        buf.advance(1);
        let header_fields = buf.copy_to_bytes(fields_len);
        Ok(Self {
            protocol_version,
            security_profile,
            header_fields,
            payload_length: buf.get_u16(),
            payload_type: buf.get_u8(),
            payload_data_length: buf.get_u16(),
        })
    }

    /// The header fields the one-byte length can frame.
    fn framed_fields(&self) -> &[u8] {
        &self.header_fields[..self.header_fields.len().min(u8::MAX as usize)]
    }
}

impl WireEncode for SecuredHeader {
    fn wire_len(&self) -> usize {
        SECURED_HEADER_MIN_LEN + self.framed_fields().len()
    }

    /// Header fields past 255 bytes cannot be framed and are cut.
    fn encode(&self, buf: &mut BytesMut) {
        let fields = self.framed_fields();
        buf.put_u8(self.protocol_version);
        buf.put_u8(self.security_profile);
        buf.put_u8(fields.len() as u8);
        buf.put_slice(fields);
        buf.put_u16(self.payload_length);
        buf.put_u8(self.payload_type);
        buf.put_u16(self.payload_data_length);
    }

    fn validate(&self) -> Result<()> {
        if self.header_fields.len() > u8::MAX as usize {
            return Err(DecodeError::ValueOutOfRange {
                value: self.header_fields.len() as i64,
                length: 8,
            });
        }
        Ok(())
    }
}

impl fmt::Display for SecuredHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Secured Header ({} bytes)]", self.wire_len())?;
        writeln!(f, "  Protocol Version: {}", self.protocol_version)?;
        writeln!(f, "  Security Profile: {}", self.security_profile)?;
        writeln!(f, "  Header Length: {}", self.header_fields.len())?;
        writeln!(f, "  Header Fields: {}", hex_string(&self.header_fields))?;
        writeln!(f, "  Payload Length: {}", self.payload_length)?;
        writeln!(f, "  Payload Type: {}", self.payload_type)?;
        writeln!(f, "  Payload Data Length: {}", self.payload_data_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_secured_header() {
        let data = [0x02, 0x01, 0x03, 0xAA, 0xBB, 0xCC, 0x00, 0x20, 0x01, 0x00, 0x1C];
        let header = SecuredHeader::decode(&data).unwrap();
        assert_eq!(header.protocol_version, 2);
        assert_eq!(header.security_profile, 1);
        assert_eq!(header.header_fields.as_ref(), &[0xAA, 0xBB, 0xCC]);
        assert_eq!(header.payload_length, 0x20);
        assert_eq!(header.payload_type, 1);
        assert_eq!(header.payload_data_length, 0x1C);
        assert_eq!(header.wire_len(), 11);
        assert_eq!(header.to_bytes().as_ref(), &data);
    }

    #[test]
    fn test_secured_header_field_length_checked() {
        // length byte promises 4 header field bytes but only 3 follow
        let data = [0x02, 0x01, 0x04, 0xAA, 0xBB, 0xCC, 0x00, 0x20, 0x01, 0x00, 0x1C];
        assert_eq!(
            SecuredHeader::decode(&data),
            Err(DecodeError::TooShort {
                expected: 12,
                actual: 11
            })
        );
        assert!(SecuredHeader::decode(&data[..7]).is_err());
    }

    #[test]
    fn test_oversized_header_fields() {
        let header = SecuredHeader {
            protocol_version: 2,
            security_profile: 1,
            header_fields: Bytes::from(vec![0xAB; 300]),
            payload_length: 0,
            payload_type: 1,
            payload_data_length: 0,
        };
        assert_eq!(header.wire_len(), SECURED_HEADER_MIN_LEN + 255);
        assert_eq!(header.to_bytes().len(), header.wire_len());
        assert_eq!(
            header.try_to_bytes(),
            Err(DecodeError::ValueOutOfRange {
                value: 300,
                length: 8
            })
        );

        let framed = SecuredHeader {
            header_fields: Bytes::from(vec![0xAB; 255]),
            ..header
        };
        let bytes = framed.try_to_bytes().unwrap();
        assert_eq!(SecuredHeader::decode(&bytes).unwrap(), framed);
    }
}
