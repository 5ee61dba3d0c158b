//! Configuration loaded from environment variables

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::adsb::{DownlinkFormat, Identifier, IdentifierError, StationProfile};

/// Malformed configuration value
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("ADSB_CALLSIGN: {0}")]
    Callsign(#[from] IdentifierError),
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Downlink format selector
    pub downlink_format: DownlinkFormat,

    /// Identifier to transmit
    pub callsign: Identifier,

    /// Capability, ICAO address and type code byte
    pub station: StationProfile,

    /// External transmitter program; frames go to stdout when unset
    pub tx_command: Option<PathBuf>,

    /// Extra arguments passed before the frame line
    pub tx_args: Vec<String>,

    /// How long to wait for the transmitter to report completion
    pub tx_timeout: Duration,

    /// Number of transmissions to run
    pub tx_repeat: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup` (environment, or a map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let df = parse_or(&lookup, "ADSB_DF", 17, |s| s.parse::<u8>().map_err(|e| e.to_string()))?;
        let downlink_format = DownlinkFormat::try_from(df).map_err(|e| ConfigError::Invalid {
            var: "ADSB_DF",
            value: df.to_string(),
            reason: e.to_string(),
        })?;

        let callsign = match lookup("ADSB_CALLSIGN") {
            Some(s) => s.parse()?,
            None => Identifier::new("KLM1023"),
        };

        let station = StationProfile {
            capability: parse_or(&lookup, "ADSB_CAPABILITY", StationProfile::DEFAULT_CAPABILITY, |s| {
                match s.parse::<u8>() {
                    Ok(v) if v <= 7 => Ok(v),
                    Ok(_) => Err("must be 0-7".to_string()),
                    Err(e) => Err(e.to_string()),
                }
            })?,
            icao_address: parse_or(&lookup, "ADSB_ICAO", StationProfile::DEFAULT_ICAO_ADDRESS, parse_icao)?,
            type_code: parse_or(&lookup, "ADSB_TYPE_CODE", StationProfile::DEFAULT_TYPE_CODE, |s| {
                u8::from_str_radix(strip_hex_prefix(s), 16).map_err(|e| e.to_string())
            })?,
        };

        let tx_command = lookup("TX_COMMAND")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let tx_args = lookup("TX_ARGS")
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        let timeout_ms = parse_or(&lookup, "TX_TIMEOUT_MS", 5000, |s| {
            s.parse::<u64>().map_err(|e| e.to_string())
        })?;

        let tx_repeat = parse_or(&lookup, "TX_REPEAT", 1, |s| s.parse::<u32>().map_err(|e| e.to_string()))?;

        Ok(Self {
            downlink_format,
            callsign,
            station,
            tx_command,
            tx_args,
            tx_timeout: Duration::from_millis(timeout_ms),
            tx_repeat,
        })
    }
}

fn parse_or<F, T, P>(lookup: &F, var: &'static str, default: T, parse: P) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    P: FnOnce(&str) -> Result<T, String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => parse(value.trim()).map_err(|reason| ConfigError::Invalid { var, value, reason }),
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn parse_icao(s: &str) -> Result<u32, String> {
    let digits = strip_hex_prefix(s);
    if digits.len() != 6 {
        return Err("expected 6 hex digits".to_string());
    }
    let bytes = hex::decode(digits).map_err(|e| e.to_string())?;
    Ok(((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32)
}
