//! 6-bit identification character set (ICAO Annex 10 subset)

/// Identification alphabet, indexed by 6-bit code.
///
/// `#` fills the reserved codes. Lookup takes the first match, so a `#` in
/// the input encodes as 0.
pub const ALPHABET: &[u8; 64] = b"#ABCDEFGHIJKLMNOPQRSTUVWXYZ##### ###############0123456789######";

/// Index of the space character, used for every unrecognized input
pub const SPACE_INDEX: u8 = 32;

/// Map one identifier character to its 6-bit alphabet index.
///
/// Total: characters outside the alphabet normalize to [`SPACE_INDEX`].
pub fn char_to_index(ch: char) -> u8 {
    if !ch.is_ascii() {
        return SPACE_INDEX;
    }

    ALPHABET
        .iter()
        .position(|&c| c == ch as u8)
        .map(|i| i as u8)
        .unwrap_or(SPACE_INDEX)
}

/// Render a 6-bit index back to its character (reserved codes render as `#`)
pub fn index_to_char(index: u8) -> char {
    ALPHABET[(index & 0x3F) as usize] as char
}

/// Whether `ch` has its own code in the alphabet
pub fn is_encodable(ch: char) -> bool {
    ch == ' ' || char_to_index(ch) != SPACE_INDEX
}
