//! Hash functions for the HC, BT, Row, and DDSS tables (§4.2–§4.5).
//!
//! The reference specializes a hash function per `minMatch` value (3..6)
//! via forced-inline templates (§9, "replacing the C template
//! specialization pattern"). Here that becomes a plain match on
//! `min_match` inside one function — monomorphization buys nothing extra
//! since the caller already branches on `min_match` once per block, not
//! per byte.

/// Multiplicative hash constants, one per supported `minMatch`, chosen so
/// each produces a well-distributed hash when multiplied against the raw
/// little-endian bytes and shifted down to `log` bits.
const PRIME_3: u32 = 506_832_829;
const PRIME_4: u32 = 2_654_435_761;
const PRIME_5: u64 = 889_523_592_379;
const PRIME_6: u64 = 227_718_039_650_203;

/// Hash the first `min_match` bytes at `data[0..]` down to `log` bits.
///
/// `data` must contain at least 8 bytes (the largest width read below);
/// callers guarantee this by never calling the hash within 8 bytes of the
/// end of input (§7: the parser's main loop bound is `iend - 16`).
pub fn hash(data: &[u8], min_match: u32, log: u32) -> u32 {
    debug_assert!(data.len() >= 8);
    match min_match {
        3 => hash3(data, log),
        4 => hash4(data, log),
        5 => hash5(data, log),
        _ => hash6(data, log),
    }
}

fn read_u32(data: &[u8]) -> u32 {
    u32::from_le_bytes(data[0..4].try_into().unwrap())
}

fn read_u64(data: &[u8]) -> u64 {
    u64::from_le_bytes(data[0..8].try_into().unwrap())
}

/// 3-byte hash: widen to 4 bytes, mask off the high byte's influence isn't
/// needed since multiplication by a well-chosen odd constant scrambles the
/// low 3 bytes adequately into the high bits we keep.
fn hash3(data: &[u8], log: u32) -> u32 {
    let v = read_u32(data) & 0x00FF_FFFF;
    (v.wrapping_mul(PRIME_3)) >> (32 - log)
}

fn hash4(data: &[u8], log: u32) -> u32 {
    let v = read_u32(data);
    (v.wrapping_mul(PRIME_4)) >> (32 - log)
}

fn hash5(data: &[u8], log: u32) -> u32 {
    let v = read_u64(data) & 0x0000_00FF_FFFF_FFFF;
    ((v.wrapping_mul(PRIME_5)) >> (64 - log as u64)) as u32
}

fn hash6(data: &[u8], log: u32) -> u32 {
    let v = read_u64(data) & 0x0000_FFFF_FFFF_FFFF;
    ((v.wrapping_mul(PRIME_6)) >> (64 - log as u64)) as u32
}

/// Row-hash split (§4.4): a `rowHash` selecting the bucket and an 8-bit
/// `tag` used as a SIMD-comparable pre-filter within the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHash {
    /// Selects which row of the table this position belongs to.
    pub row_index: u32,
    /// Low 8 bits of a wider hash, compared against the row's tag vector.
    pub tag: u8,
}

/// Compute the row index and tag for a position's bytes, given the table's
/// `hash_log` and number of rows (`hash_log - row_log`, where `row_log` is
/// `4` for 16-entry rows or `5` for 32-entry rows).
pub fn row_hash(data: &[u8], min_match: u32, hash_log: u32, row_log: u32) -> RowHash {
    debug_assert!(hash_log > row_log);
    let full = wide_hash(data, min_match);
    let tag = (full & 0xFF) as u8;
    let row_bits = hash_log - row_log;
    let row_index = (full >> 8) & ((1u32 << row_bits) - 1);
    RowHash { row_index, tag }
}

fn wide_hash(data: &[u8], min_match: u32) -> u32 {
    hash(data, min_match, 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"ABCDEFGH";
        for mm in [3, 4, 5, 6] {
            let h1 = hash(data, mm, 16);
            let h2 = hash(data, mm, 16);
            assert_eq!(h1, h2);
            assert!(h1 < (1 << 16));
        }
    }

    #[test]
    fn hash_respects_log_width() {
        let data = b"ABCDEFGH";
        for log in [10u32, 14, 18, 20] {
            let h = hash(data, 4, log);
            assert!(h < (1u32 << log));
        }
    }

    #[test]
    fn hash_differs_for_different_bytes() {
        let a = b"AAAAAAAA";
        let b = b"BBBBBBBB";
        assert_ne!(hash(a, 4, 20), hash(b, 4, 20));
    }

    #[test]
    fn row_hash_splits_tag_and_row_within_bounds() {
        let data = b"ABCDEFGH";
        let rh = row_hash(data, 4, 20, 4);
        assert!(rh.row_index < (1 << (20 - 4)));
    }
}
