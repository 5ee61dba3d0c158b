//! Mode S extended squitter frame encoding

pub mod alphabet;
mod bits;
mod crc;
mod encoder;
mod types;

pub use crc::{remainder, verify_checksum, GENERATOR};
pub use encoder::encode_frame;
pub use types::{
    DownlinkFormat, DownlinkFormatError, Frame, Identifier, IdentifierError, StationProfile,
    DATA_BITS, FRAME_BITS, FRAME_LEN, IDENTIFIER_LEN,
};
