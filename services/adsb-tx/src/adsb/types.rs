//! ADS-B frame data types

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::alphabet::{char_to_index, index_to_char, is_encodable};
use super::bits::get_bits;

/// Extended squitter length in bytes
pub const FRAME_LEN: usize = 14;

/// Extended squitter length in bits
pub const FRAME_BITS: usize = FRAME_LEN * 8;

/// Bits covered by the parity field (everything before it)
pub const DATA_BITS: usize = 88;

/// Identifier width in characters
pub const IDENTIFIER_LEN: usize = 8;

/// Errors building a [`DownlinkFormat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DownlinkFormatError {
    #[error("downlink format {0} out of range (0-31)")]
    OutOfRange(u8),
}

/// 5-bit downlink format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DownlinkFormat(u8);

impl DownlinkFormat {
    pub const SHORT_AIR_SURVEILLANCE: Self = Self(0);
    pub const ALTITUDE_REPLY: Self = Self(4);
    pub const IDENTITY_REPLY: Self = Self(5);
    pub const ALL_CALL_REPLY: Self = Self(11);
    pub const LONG_AIR_SURVEILLANCE: Self = Self(16);
    pub const EXTENDED_SQUITTER: Self = Self(17);
    pub const EXTENDED_SQUITTER_NON_TRANSPONDER: Self = Self(18);
    pub const MILITARY_EXTENDED_SQUITTER: Self = Self(19);
    pub const COMM_B_ALTITUDE: Self = Self(20);
    pub const COMM_B_IDENTITY: Self = Self(21);

    pub fn value(self) -> u8 {
        self.0
    }

    /// Human-readable name for logs
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "short air surveillance",
            4 => "altitude reply",
            5 => "identity reply",
            11 => "all-call reply",
            16 => "long air surveillance",
            17 => "extended squitter",
            18 => "extended squitter (non-transponder)",
            19 => "military extended squitter",
            20 => "Comm-B altitude",
            21 => "Comm-B identity",
            _ => "unassigned",
        }
    }
}

impl Default for DownlinkFormat {
    fn default() -> Self {
        Self::EXTENDED_SQUITTER
    }
}

impl TryFrom<u8> for DownlinkFormat {
    type Error = DownlinkFormatError;

    fn try_from(df: u8) -> Result<Self, Self::Error> {
        if df > 31 {
            Err(DownlinkFormatError::OutOfRange(df))
        } else {
            Ok(Self(df))
        }
    }
}

impl fmt::Display for DownlinkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DF{} ({})", self.0, self.name())
    }
}

/// Errors parsing an [`Identifier`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier is {len} characters, at most 8 allowed")]
    TooLong { len: usize },
}

/// Fixed-width 8 character station identifier (callsign)
///
/// Stored as entered; alphabet normalization happens when the frame is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier([char; IDENTIFIER_LEN]);

impl Identifier {
    /// Build from user text: space-padded to 8, anything past 8 dropped.
    pub fn new(text: &str) -> Self {
        let mut chars = [' '; IDENTIFIER_LEN];
        for (slot, ch) in chars.iter_mut().zip(text.chars()) {
            *slot = ch;
        }
        Self(chars)
    }

    pub fn chars(&self) -> &[char; IDENTIFIER_LEN] {
        &self.0
    }

    /// 6-bit alphabet codes, left to right
    pub fn codes(&self) -> [u8; IDENTIFIER_LEN] {
        self.0.map(char_to_index)
    }

    /// The identifier as it will be transmitted
    pub fn normalized(&self) -> String {
        self.codes().iter().map(|&c| index_to_char(c)).collect()
    }

    /// Whether every character has its own code (nothing becomes a space)
    pub fn is_encodable(&self) -> bool {
        self.0.iter().all(|&c| is_encodable(c))
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Self::new("")
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let len = s.chars().count();
        if len > IDENTIFIER_LEN {
            return Err(IdentifierError::TooLong { len });
        }
        Ok(Self::new(s))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|c| write!(f, "{}", c))
    }
}

/// Fields that would come from a real transponder identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationProfile {
    /// Capability, 3 bits
    pub capability: u8,
    /// ICAO 24-bit address
    pub icao_address: u32,
    /// ME byte 0: type code in the upper 5 bits
    pub type_code: u8,
}

impl StationProfile {
    pub const DEFAULT_CAPABILITY: u8 = 5;
    pub const DEFAULT_ICAO_ADDRESS: u32 = 0x4840D6;
    /// TC 4, aircraft identification
    pub const DEFAULT_TYPE_CODE: u8 = 0x20;
}

impl Default for StationProfile {
    fn default() -> Self {
        Self {
            capability: Self::DEFAULT_CAPABILITY,
            icao_address: Self::DEFAULT_ICAO_ADDRESS,
            type_code: Self::DEFAULT_TYPE_CODE,
        }
    }
}

/// Encoded 112-bit extended squitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    pub(crate) fn from_bytes(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    pub fn downlink_format(&self) -> u8 {
        get_bits(&self.0, 0, 5) as u8
    }

    pub fn capability(&self) -> u8 {
        get_bits(&self.0, 5, 3) as u8
    }

    pub fn icao_address(&self) -> u32 {
        get_bits(&self.0, 8, 24) as u32
    }

    /// ME type code (upper 5 bits of byte 4)
    pub fn type_code(&self) -> u8 {
        get_bits(&self.0, 32, 5) as u8
    }

    /// Packed 48-bit identifier field
    pub fn identifier_field(&self) -> u64 {
        get_bits(&self.0, 40, 48)
    }

    /// 24-bit parity from bytes 11-13
    pub fn checksum(&self) -> u32 {
        get_bits(&self.0, DATA_BITS, 24) as u32
    }

    /// Parity as 6 hex digits, for display
    pub fn checksum_hex(&self) -> String {
        format!("{:06X}", self.checksum())
    }

    /// Whole frame as 28 hex digits
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Frame in dump1090 / rtl_adsb text form: `*<hex>;`
    pub fn to_line(&self) -> String {
        format!("*{};", self.to_hex())
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downlink_format_range() {
        assert_eq!(DownlinkFormat::try_from(17).unwrap(), DownlinkFormat::EXTENDED_SQUITTER);
        assert_eq!(DownlinkFormat::try_from(31).unwrap().value(), 31);
        assert_eq!(
            DownlinkFormat::try_from(32),
            Err(DownlinkFormatError::OutOfRange(32))
        );
    }

    #[test]
    fn test_downlink_format_display() {
        assert_eq!(
            DownlinkFormat::EXTENDED_SQUITTER.to_string(),
            "DF17 (extended squitter)"
        );
        assert_eq!(DownlinkFormat::try_from(3).unwrap().name(), "unassigned");
    }

    #[test]
    fn test_identifier_pads_and_truncates() {
        assert_eq!(Identifier::new("KLM1023").to_string(), "KLM1023 ");
        assert_eq!(Identifier::new("").to_string(), "        ");
        assert_eq!(Identifier::new("ABCDEFGHIJ").to_string(), "ABCDEFGH");
    }

    #[test]
    fn test_identifier_from_str_rejects_long_input() {
        assert!("ABCDEFGH".parse::<Identifier>().is_ok());
        assert_eq!(
            "ABCDEFGHI".parse::<Identifier>(),
            Err(IdentifierError::TooLong { len: 9 })
        );
    }

    #[test]
    fn test_identifier_normalized() {
        assert_eq!(Identifier::new("ab-12").normalized(), "   12   ");
        assert_eq!(Identifier::new("KLM1023").codes(), [11, 12, 13, 49, 48, 50, 51, 32]);
        assert!(Identifier::new("KLM1023").is_encodable());
        assert!(!Identifier::new("klm1023").is_encodable());
    }

    #[test]
    fn test_frame_accessors() {
        let bytes: [u8; FRAME_LEN] = hex::decode("8D4840D6202CC371C32CE0576098")
            .unwrap()
            .try_into()
            .unwrap();
        let frame = Frame::from_bytes(bytes);

        assert_eq!(frame.downlink_format(), 17);
        assert_eq!(frame.capability(), 5);
        assert_eq!(frame.icao_address(), 0x4840D6);
        assert_eq!(frame.type_code(), 4);
        assert_eq!(frame.identifier_field(), 0x2CC371C32CE0);
        assert_eq!(frame.checksum(), 0x576098);
        assert_eq!(frame.checksum_hex(), "576098");
        assert_eq!(frame.to_line(), "*8D4840D6202CC371C32CE0576098;");
    }
}
