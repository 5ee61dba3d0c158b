//! Extended squitter frame encoder
//!
//! Layout (bit offsets from frame start):
//! - 0-4: downlink format
//! - 5-7: capability
//! - 8-31: ICAO address
//! - 32-39: type code byte
//! - 40-87: 8 x 6-bit identifier characters
//! - 88-111: CRC-24 parity

use tracing::debug;

use super::bits::set_bits;
use super::crc::remainder;
use super::types::{DownlinkFormat, Frame, Identifier, StationProfile, DATA_BITS, FRAME_LEN};

/// Build a complete frame. Total: every identifier encodes after normalization.
pub fn encode_frame(df: DownlinkFormat, ident: &Identifier, station: &StationProfile) -> Frame {
    let mut msg = [0u8; FRAME_LEN];

    // DF and CA
    set_bits(&mut msg, 0, 5, df.value() as u64);
    set_bits(&mut msg, 5, 3, station.capability as u64);

    // ICAO24 and TC
    set_bits(&mut msg, 8, 24, station.icao_address as u64);
    msg[4] = station.type_code;

    // Identifier, first character in the highest 6 bits
    let packed = ident
        .codes()
        .iter()
        .fold(0u64, |acc, &code| (acc << 6) | code as u64);
    msg[5..11].copy_from_slice(&packed.to_be_bytes()[2..]);

    // Parity (bytes 11-13 are still zero here)
    let crc = remainder(&msg);
    set_bits(&mut msg, DATA_BITS, 24, crc as u64);

    let frame = Frame::from_bytes(msg);
    debug!(
        "Encoded {} '{}' -> {} (CRC {})",
        df,
        ident.normalized(),
        frame,
        frame.checksum_hex()
    );
    frame
}
