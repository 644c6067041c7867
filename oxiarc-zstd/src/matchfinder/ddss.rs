//! Dedicated-dictionary-search build (§4.5).
//!
//! Run once when a dictionary is loaded, independent of any particular
//! compression: folds the dictionary's own hash-chain into the bucketed
//! [`DedicatedDictTable`](crate::matchfinder::tables::DedicatedDictTable)
//! layout so that many later compressions can share one compact,
//! cache-friendly structure instead of re-walking a full chain per block.

use crate::matchfinder::hash::hash;
use crate::matchfinder::tables::DedicatedDictTable;
use crate::matchfinder::window::Window;

/// Build a [`DedicatedDictTable`] over `dict_window`, with `hash_log` table
/// slots and buckets of `2^bucket_log` entries.
///
/// For each hash bucket: the most recent `bucket_size - 1` positions are
/// stored directly; up to 255 older positions are appended to a shared
/// packed tail region, whose length is recorded alongside the tail's start
/// offset in the bucket's last slot (§3 "DDSS layout"). Every position
/// placed anywhere in the table satisfies `pos >= dict_window.low_limit`
/// (§4.5 "must preserve the invariant").
pub fn build_dedicated_dict_table(
    dict_window: &Window,
    hash_log: u32,
    bucket_log: u32,
    min_match: u32,
) -> DedicatedDictTable {
    let bucket_size = 1u32 << bucket_log;
    let num_buckets = 1usize << hash_log;

    // First pass: collect positions per bucket, most recent last, so a
    // later reverse-iteration yields most-recent-first without re-sorting.
    let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); num_buckets];
    let start = dict_window.low_limit;
    let end = dict_window.end();
    let mut pos = start;
    while pos + 8 <= end {
        let mut buf = [0u8; 8];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = dict_window.byte(pos + i as u32);
        }
        let h = hash(&buf, min_match, hash_log) as usize;
        buckets[h].push(pos);
        pos += 1;
    }

    // Second pass: lay out direct slots (most-recent-first) and the packed
    // tail (older positions, 255 max, encoded as a byte chain length).
    let tail_capacity: usize = buckets
        .iter()
        .map(|b| b.len().saturating_sub((bucket_size - 1) as usize).min(255))
        .sum();
    let mut table = DedicatedDictTable::new(hash_log, bucket_log, tail_capacity.max(1));
    let mut tail_cursor = 0u32;

    for (h, positions) in buckets.iter().enumerate() {
        let h = h as u32;
        let direct_count = (bucket_size - 1).min(positions.len() as u32);
        for i in 0..direct_count {
            // Most recent first: iterate the collected list in reverse.
            let pos = positions[positions.len() - 1 - i as usize];
            table.set_direct_slot(h, i, pos);
        }

        let remaining = positions.len() as u32 - direct_count;
        let chain_len = remaining.min(255);
        if chain_len > 0 {
            let chain_start = tail_cursor;
            for i in 0..chain_len {
                let idx = positions.len() as u32 - direct_count - 1 - i;
                let pos_delta = (positions[idx as usize] - start).min(255) as u8;
                table.set_chain_byte(chain_start + i, pos_delta);
            }
            tail_cursor += chain_len;
            table.set_packed_tail(h, chain_start, chain_len as u8);
        } else {
            table.set_packed_tail(h, tail_cursor, 0);
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_table_with_entries_in_every_touched_bucket() {
        let dict = b"ABCABCABCABCXYZXYZXYZ".to_vec();
        let window = Window::new_no_dict(&dict, 0);
        let table = build_dedicated_dict_table(&window, 8, 3, 3);
        // Every position has at least a placeholder; spot-check bucket sizing.
        assert_eq!(table.bucket_size(), 8);
    }

    #[test]
    fn direct_slots_contain_only_positions_from_or_after_low_limit() {
        let dict = b"ABCABCABCABC".to_vec();
        let window = Window::new_no_dict(&dict, 0);
        let table = build_dedicated_dict_table(&window, 6, 2, 3);
        for bucket in 0..(1u32 << 6) {
            for &pos in table.direct_slots(bucket) {
                assert!(pos < dict.len() as u32);
            }
        }
    }
}
