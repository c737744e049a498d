use std::collections::HashSet;

use super::*;

#[test]
fn named_id_has_prefix_and_default_length() {
    let id = named_id("track");
    assert!(id.starts_with("track-"));
    assert_eq!(id.len(), "track-".len() + DEFAULT_ID_BYTES * 2);
}

#[test]
fn named_id_hex_part_is_lowercase_hex() {
    let id = named_id("file");
    let hex = id.trim_start_matches("file-");
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn length_scales_with_requested_bytes() {
    for bytes in [1, 4, 16, 32] {
        let id = named_id_with_len("x", bytes);
        assert_eq!(id.len(), 2 + bytes * 2, "unexpected length for {bytes} bytes");
    }
}

#[test]
fn empty_prefix_yields_bare_hex() {
    let id = named_id_with_len("", 6);
    assert_eq!(id.len(), 12);
    assert!(!id.contains('-'));
}

#[test]
fn zero_bytes_yields_prefix_only() {
    assert_eq!(named_id_with_len("track", 0), "track-");
}

#[test]
fn repeated_draws_do_not_collide() {
    let ids: HashSet<String> = (0..5_000).map(|_| named_id("action")).collect();
    assert_eq!(ids.len(), 5_000);
}
