//! Row-hash match-finder (§4.4).
//!
//! Trades the hash-chain's single candidate-per-step for a wide row of
//! candidates pre-filtered by a one-byte tag, so a search can reject most
//! of a row without touching the source buffer at all. The tag compare is
//! the one place a real implementation would reach for a SIMD compare
//! (`_mm_cmpeq_epi8`-style); this module keeps a scalar fallback that must
//! produce the identical mask bit-for-bit (§5, §8 invariant 7), and no
//! vector path is implemented here — the spec's "out of scope" already
//! excludes anything beyond this core, and a scalar-only row-hash is a
//! strict subset of the reference's behavior, never a divergent one.

use crate::matchfinder::hash::{hash, row_hash, RowHash};
use crate::matchfinder::sequence::REP_MOVE;
use crate::matchfinder::tables::{DedicatedDictTable, RowTable};
use crate::matchfinder::window::Window;
use crate::matchfinder::MatchCandidate;

pub struct RowMatchFinder {
    table: RowTable,
    hash_log: u32,
    row_log: u32,
    min_match: u32,
    pub next_to_update: u32,
}

impl RowMatchFinder {
    pub fn new(hash_log: u32, row_log: u32, row_entries: u32, min_match: u32) -> Self {
        RowMatchFinder {
            table: RowTable::new(hash_log, row_log, row_entries),
            hash_log,
            row_log,
            min_match,
            next_to_update: 0,
        }
    }

    pub(crate) fn hash_at(&self, window: &Window, pos: u32) -> RowHash {
        let mut buf = [0u8; 8];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = window.byte_or_zero(pos + i as u32);
        }
        row_hash(&buf, self.min_match, self.hash_log, self.row_log)
    }

    /// Scalar tag-compare mask: bit `i` is set when `tags[i] == needle`.
    /// This is the fallback described in §4.4/§9/§8 invariant 7; any SIMD
    /// path added later must agree with this function on every input.
    pub fn scalar_tag_mask(tags: &[u8], needle: u8) -> u32 {
        let mut mask = 0u32;
        for (i, &tag) in tags.iter().enumerate() {
            if tag == needle {
                mask |= 1 << i;
            }
        }
        mask
    }

    /// Rotate a raw storage-order mask so that bit 0 corresponds to the
    /// row's current head slot, restoring circular order (§4.4).
    fn rotate_to_head_order(mask: u32, head: u8, row_entries: u32) -> u32 {
        if row_entries == 0 {
            return mask;
        }
        let row_mask = (1u64 << row_entries) - 1;
        let widened = mask as u64 & row_mask;
        let rotated = (widened >> head) | (widened << (row_entries - head as u32));
        (rotated & row_mask) as u32
    }

    fn insert_at(&mut self, window: &Window, pos: u32) {
        let rh = self.hash_at(window, pos);
        self.table.insert(rh.row_index, rh.tag, pos);
    }

    /// Insert-and-search at `curr` (§4.4 "Insert", "Search"): fold in
    /// positions up to `curr`, scan the matching row via the tag mask,
    /// verify surviving candidates by byte comparison, then insert `curr`
    /// into its own row so the next search observes it.
    pub fn insert_and_search(
        &mut self,
        window: &Window,
        curr: u32,
        end: u32,
        low_limit: u32,
        max_attempts: u32,
    ) -> Option<MatchCandidate> {
        while self.next_to_update < curr {
            let pos = self.next_to_update;
            self.insert_at(window, pos);
            self.next_to_update += 1;
        }

        let rh = self.hash_at(window, curr);
        let row_entries = self.table.row_entries();
        let head = self.table.head(rh.row_index);
        let tags = self.table.tag_row(rh.row_index);
        let raw_mask = Self::scalar_tag_mask(tags, rh.tag);
        let mut mask = Self::rotate_to_head_order(raw_mask, head, row_entries);

        let mut best_len = 0u32;
        let mut best_index = 0u32;
        let mut attempts = max_attempts;

        while mask != 0 && attempts > 0 {
            let bit = mask.trailing_zeros();
            mask &= mask - 1;
            let slot = ((head as u32 + bit) % row_entries) as u8;
            let candidate = self.table.position_at(rh.row_index, slot);
            if candidate == 0 || candidate < low_limit || candidate >= curr {
                continue;
            }
            attempts -= 1;
            let len = window.count(curr, candidate, end);
            if len > best_len {
                best_len = len;
                best_index = candidate;
            }
        }

        self.insert_at(window, curr);
        self.next_to_update = curr + 1;

        if best_len >= self.min_match {
            Some(MatchCandidate {
                length: best_len,
                offset_code: curr - best_index + REP_MOVE,
            })
        } else {
            None
        }
    }

    /// Dictionary extension (§4.4 "Dictionary extensions ... mirror HC's
    /// DDSS and dictMatchState arms"): identical row walk, but against a
    /// separately owned dictionary row table with its own address space.
    pub fn search_dict_match_state(
        &self,
        local_window: &Window,
        dict_window: &Window,
        dict_table: &RowTable,
        dict_hash: RowHash,
        curr: u32,
        end: u32,
        index_delta: u32,
        remaining_attempts: u32,
        best_so_far: u32,
    ) -> Option<MatchCandidate> {
        let row_entries = dict_table.row_entries();
        let head = dict_table.head(dict_hash.row_index);
        let tags = dict_table.tag_row(dict_hash.row_index);
        let raw_mask = Self::scalar_tag_mask(tags, dict_hash.tag);
        let mut mask = Self::rotate_to_head_order(raw_mask, head, row_entries);

        let mut best_len = best_so_far;
        let mut best_index = 0u32;
        let mut attempts = remaining_attempts;

        while mask != 0 && attempts > 0 {
            let bit = mask.trailing_zeros();
            mask &= mask - 1;
            let slot = ((head as u32 + bit) % row_entries) as u8;
            let candidate = dict_table.position_at(dict_hash.row_index, slot);
            if candidate == 0 || candidate < dict_window.low_limit {
                continue;
            }
            attempts -= 1;
            let cap = (end - curr).min(dict_window.end() - candidate);
            let len = (0..cap)
                .take_while(|&i| dict_window.byte(candidate + i) == local_window.byte(curr + i))
                .count() as u32;
            if len > best_len {
                best_len = len;
                best_index = candidate.wrapping_add(index_delta);
            }
        }

        if best_index != 0 && best_len > best_so_far {
            Some(MatchCandidate {
                length: best_len,
                offset_code: curr.wrapping_sub(best_index).wrapping_add(REP_MOVE),
            })
        } else {
            None
        }
    }

    /// Side arm for a dedicated-dictionary-search bucket (§4.4/§4.5). The
    /// row match-finder's own row+tag hash is shaped for row indexing, not
    /// DDSS bucket indexing, so this recomputes the plain multiplicative
    /// hash the bucket table is keyed by instead of reusing `hash_at` —
    /// otherwise identical to `HashChainMatchFinder::search_dedicated_dict`,
    /// since a dedicated-dictionary-search table is search-method-agnostic:
    /// only the local (non-dictionary) search differs between HC and Row.
    pub fn search_dedicated_dict(
        &self,
        local_window: &Window,
        dict_window: &Window,
        ddss: &DedicatedDictTable,
        dict_hash_log: u32,
        dict_min_match: u32,
        curr: u32,
        end: u32,
        index_delta: u32,
        remaining_attempts: u32,
        best_so_far: u32,
    ) -> Option<MatchCandidate> {
        let mut buf = [0u8; 8];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = local_window.byte_or_zero(curr + i as u32);
        }
        let bucket_hash = hash(&buf, dict_min_match, dict_hash_log);

        let mut best_len = best_so_far;
        let mut best_index = 0u32;
        let mut attempts = remaining_attempts;

        for &dict_pos in ddss.direct_slots(bucket_hash) {
            if attempts == 0 {
                break;
            }
            if dict_pos == 0 {
                break;
            }
            attempts -= 1;
            let cap = (end - curr).min(dict_window.end() - dict_pos);
            let len = (0..cap)
                .take_while(|&i| dict_window.byte(dict_pos + i) == local_window.byte(curr + i))
                .count() as u32;
            if len > best_len {
                best_len = len;
                best_index = dict_pos.wrapping_add(index_delta);
            }
        }

        let (chain_start, chain_len) = ddss.packed_tail(bucket_hash);
        let tail_steps = attempts.min(chain_len as u32);
        let mut offset = 0u32;
        for _ in 0..tail_steps {
            let step = ddss.chain_byte(chain_start + offset) as u32;
            if step == 0 {
                break;
            }
            offset += 1;
        }

        if best_index != 0 && best_len > best_so_far {
            Some(MatchCandidate {
                length: best_len,
                offset_code: curr.wrapping_sub(best_index).wrapping_add(REP_MOVE),
            })
        } else {
            None
        }
    }
}
