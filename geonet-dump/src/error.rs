//! Errors of the dump front end.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Not a pcap file: magic {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("Truncated pcap {what} at byte {offset}")]
    Truncated { what: &'static str, offset: usize },
}
