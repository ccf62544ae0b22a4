//! geonet-dump: print the GeoNetworking frames of a pcap capture.
//!
//! Every record is decoded with `geonet-protocol` and rendered field by
//! field, protocol-analyzer style.

use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Parser;
use geonet_protocol::{Decoder, DecoderConfig};
use log::{debug, info, warn};

mod error;
mod logging;
mod pcap;

use error::DumpError;
use pcap::Capture;

/// geonet-dump - Decode ITS-G5 GeoNetworking captures
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Capture file (classic libpcap format)
    input: PathBuf,

    /// Configuration file path
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Stop after this many frames
    #[arg(short = 'c', long)]
    count: Option<usize>,

    /// Data-link type to decode with, instead of the capture file's
    #[arg(long)]
    link_type: Option<u32>,
}

/// Configuration file format.
#[derive(Debug, serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    decoder: DecoderConfig,
    #[serde(default)]
    dump: DumpSection,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, serde::Deserialize, Default)]
struct DumpSection {
    link_type: Option<u32>,
    count: Option<usize>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct LoggingSection {
    level: Option<String>,
}

fn load_config(path: &Path) -> Result<ConfigFile, DumpError> {
    let contents = std::fs::read_to_string(path)?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load config file: explicit path > auto-detect > default
    let config_path = args.config.clone().or_else(|| {
        let default_path = PathBuf::from("geonet-dump.toml");
        default_path.exists().then_some(default_path)
    });
    let file_config = match &config_path {
        Some(path) => match load_config(path) {
            Ok(c) => {
                eprintln!("Loaded config from: {}", path.display());
                c
            }
            Err(e) => {
                eprintln!("Failed to load config file: {}", e);
                return Err(e.into());
            }
        },
        None => ConfigFile::default(),
    };

    logging::init_logging(file_config.logging.level.as_deref(), args.verbose)?;

    let capture = Capture::parse(std::fs::read(&args.input)?)?;
    let header = *capture.header();
    info!(
        "{}: pcap {}.{}, link type {}, snaplen {}",
        args.input.display(),
        header.version_major,
        header.version_minor,
        header.link_type,
        header.snaplen
    );

    // command line > config file > capture file
    let link_type = args
        .link_type
        .or(file_config.dump.link_type)
        .unwrap_or(header.link_type);
    let count = args.count.or(file_config.dump.count);

    let decoder = Decoder::new(&file_config.decoder).with_link_type(link_type);
    debug!("Decoding as {}", decoder.link_type());

    let mut decoded = 0usize;
    let mut failed = 0usize;
    for (index, record) in capture.records().enumerate() {
        if count.is_some_and(|count| index >= count) {
            break;
        }
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Stopping at frame #{}: {}", index + 1, e);
                break;
            }
        };

        let timestamp = record
            .timestamp(header.precision)
            .map(|ts| {
                ts.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S%.6f")
                    .to_string()
            })
            .unwrap_or_else(|| "-".to_owned());
        println!("#{} {} ({} bytes)", index + 1, timestamp, record.length);
        if record.is_truncated() {
            warn!(
                "Frame #{} truncated by snaplen: {} of {} bytes",
                index + 1,
                record.header.incl_len,
                record.header.orig_len
            );
        }

        match decoder.decode_frame(capture.data(), record.offset, record.length) {
            Ok(frame) => {
                print!("{}", frame);
                decoded += 1;
            }
            Err(e) => {
                warn!("Frame #{}: {}", index + 1, e);
                failed += 1;
            }
        }
        println!();
    }

    info!("{} frames decoded, {} failed", decoded, failed);
    Ok(())
}
