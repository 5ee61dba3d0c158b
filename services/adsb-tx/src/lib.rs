//! ADS-B extended squitter transmitter core
//!
//! Encodes identification frames (DF, CA, ICAO address, type code, callsign,
//! CRC-24 parity) and runs the idle / transmitting lifecycle around an
//! external RF transmitter.

pub mod adsb;
pub mod config;
pub mod tx;

pub use adsb::{encode_frame, DownlinkFormat, Frame, Identifier, StationProfile};
pub use config::Config;
