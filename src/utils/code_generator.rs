//! Short code generation.
//!
//! Codes are drawn uniformly from a 62-character alphanumeric alphabet. Collision
//! handling is not this module's concern: the allocation loop in
//! [`crate::application::services::UrlService`] checks candidates against the durable
//! store and ultimately relies on its unique index.

use rand::Rng;

/// Default length of generated short codes.
pub const DEFAULT_CODE_LENGTH: usize = 6;

const ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a random short code of the given length.
///
/// Each character is sampled uniformly and independently from the alphanumeric
/// alphabet, so a 6-character code has 62^6 (~57 billion) possible values.
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();

    (0..length)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}
