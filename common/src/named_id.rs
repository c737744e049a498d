//! Prefixed random identifiers.
//!
//! Ids look like `track-3fa94c0b1d22e781`: a caller-chosen prefix followed by
//! hex-encoded random bytes. They are for collision avoidance between
//! generated items, not for secrets.

use std::fmt::Write;

use rand::Rng;

/// Random bytes drawn by [`named_id`].
pub const DEFAULT_ID_BYTES: usize = 8;

fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate `"{prefix}-{hex}"` with [`DEFAULT_ID_BYTES`] random bytes.
#[must_use]
pub fn named_id(prefix: &str) -> String {
    named_id_with_len(prefix, DEFAULT_ID_BYTES)
}

/// Generate `"{prefix}-{hex}"` where the hex part is `2 * byte_len` characters.
///
/// An empty prefix yields the bare hex string.
#[must_use]
pub fn named_id_with_len(prefix: &str, byte_len: usize) -> String {
    let mut bytes = vec![0_u8; byte_len];
    rand::rng().fill(bytes.as_mut_slice());
    let hex = bytes_to_hex(&bytes);
    if prefix.is_empty() { hex } else { format!("{prefix}-{hex}") }
}

#[cfg(test)]
#[path = "named_id_test.rs"]
mod tests;
