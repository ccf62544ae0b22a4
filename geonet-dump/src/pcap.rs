//! Classic libpcap file reader.
//!
//! ```text
//! +-------------------+------------+--------+------------+--------+----
//! | Global header 24B | Record 16B | frame  | Record 16B | frame  | ...
//! +-------------------+------------+--------+------------+--------+----
//! ```
//!
//! The byte order of every header field follows the magic number. Frames
//! are not copied: a record only carries its offset and length inside the
//! file buffer.

use chrono::{DateTime, TimeZone, Utc};
use nom::bytes::complete::take;
use nom::error::{Error, ErrorKind};
use nom::number::complete::{i32, u16, u32};
use nom::number::Endianness;
use nom::sequence::tuple;
use nom::IResult;

use crate::error::DumpError;

pub const GLOBAL_HEADER_LEN: usize = 24;
pub const RECORD_HEADER_LEN: usize = 16;

/// Resolution of the fractional timestamp field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Micro,
    Nano,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalHeader {
    pub endianness: Endianness,
    pub precision: Precision,
    pub version_major: u16,
    pub version_minor: u16,
    pub thiszone: i32,
    pub sigfigs: u32,
    pub snaplen: u32,
    pub link_type: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub ts_sec: u32,
    pub ts_frac: u32,
    pub incl_len: u32,
    pub orig_len: u32,
}

/// One captured frame: `data[offset..offset + length]` of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub header: RecordHeader,
    pub offset: usize,
    pub length: usize,
}

impl Record {
    pub fn timestamp(&self, precision: Precision) -> Option<DateTime<Utc>> {
        let nanos = match precision {
            Precision::Micro => self.header.ts_frac.checked_mul(1_000)?,
            Precision::Nano => self.header.ts_frac,
        };
        Utc.timestamp_opt(self.header.ts_sec as i64, nanos).single()
    }

    /// The frame was cut by the capture snap length.
    pub fn is_truncated(&self) -> bool {
        self.header.orig_len > self.header.incl_len
    }
}

pub fn global_header(input: &[u8]) -> IResult<&[u8], GlobalHeader> {
    let (rest, magic) = take(4usize)(input)?;
    let (endianness, precision) = match magic {
        [0xA1, 0xB2, 0xC3, 0xD4] => (Endianness::Big, Precision::Micro),
        [0xD4, 0xC3, 0xB2, 0xA1] => (Endianness::Little, Precision::Micro),
        [0xA1, 0xB2, 0x3C, 0x4D] => (Endianness::Big, Precision::Nano),
        [0x4D, 0x3C, 0xB2, 0xA1] => (Endianness::Little, Precision::Nano),
        _ => return Err(nom::Err::Failure(Error::new(input, ErrorKind::Tag))),
    };
    let e = endianness;
    let (rest, (version_major, version_minor, thiszone, sigfigs, snaplen, link_type)) =
        tuple((u16(e), u16(e), i32(e), u32(e), u32(e), u32(e)))(rest)?;
    Ok((
        rest,
        GlobalHeader {
            endianness,
            precision,
            version_major,
            version_minor,
            thiszone,
            sigfigs,
            snaplen,
            link_type,
        },
    ))
}

pub fn record_header(input: &[u8], endianness: Endianness) -> IResult<&[u8], RecordHeader> {
    let e = endianness;
    let (rest, (ts_sec, ts_frac, incl_len, orig_len)) =
        tuple((u32(e), u32(e), u32(e), u32(e)))(input)?;
    Ok((
        rest,
        RecordHeader {
            ts_sec,
            ts_frac,
            incl_len,
            orig_len,
        },
    ))
}

/// A capture file held in memory.
#[derive(Debug)]
pub struct Capture {
    header: GlobalHeader,
    data: Vec<u8>,
}

impl Capture {
    pub fn parse(data: Vec<u8>) -> Result<Self, DumpError> {
        let header = match global_header(&data) {
            Ok((_, header)) => header,
            Err(nom::Err::Failure(_)) => {
                let mut magic = [0u8; 4];
                magic.copy_from_slice(&data[..4]);
                return Err(DumpError::BadMagic(magic));
            }
            Err(_) => {
                return Err(DumpError::Truncated {
                    what: "file header",
                    offset: 0,
                })
            }
        };
        Ok(Self { header, data })
    }

    pub fn header(&self) -> &GlobalHeader {
        &self.header
    }

    /// Whole file; record offsets index into this.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn records(&self) -> Records<'_> {
        Records {
            data: &self.data,
            offset: GLOBAL_HEADER_LEN,
            endianness: self.header.endianness,
            done: false,
        }
    }
}

/// Iterator over the records of a [`Capture`]; stops after the first error.
pub struct Records<'a> {
    data: &'a [u8],
    offset: usize,
    endianness: Endianness,
    done: bool,
}

impl Iterator for Records<'_> {
    type Item = Result<Record, DumpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.data.len() {
            return None;
        }
        let input = &self.data[self.offset..];
        let header = match record_header(input, self.endianness) {
            Ok((_, header)) => header,
            Err(_) => {
                self.done = true;
                return Some(Err(DumpError::Truncated {
                    what: "record header",
                    offset: self.offset,
                }));
            }
        };

        let offset = self.offset + RECORD_HEADER_LEN;
        let length = header.incl_len as usize;
        if self.data.len() - offset < length {
            self.done = true;
            return Some(Err(DumpError::Truncated {
                what: "record",
                offset: self.offset,
            }));
        }
        self.offset = offset + length;
        Some(Ok(Record {
            header,
            offset,
            length,
        }))
    }
}
