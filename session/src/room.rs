//! Room code helpers.
//!
//! Codes are short, case-insensitive, and avoid glyphs that read alike
//! (0/O, 1/I/L) since people relay them out loud.

use rand::Rng;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;

/// Generate a six-character room code.
#[must_use]
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Normalize user input into canonical code form (uppercase, trimmed).
#[must_use]
pub fn normalize_room_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

/// Whether a normalized code has the shape of a generated one.
#[must_use]
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}
