//! Hash-chain match-finder (§4.2).
//!
//! A single hash bucket per position, linked backwards through a chain
//! table. Cheapest of the three match-finders to maintain; its quality is
//! bounded by how many chain links a search is willing to walk
//! (`2^searchLog`).

use crate::matchfinder::hash::hash;
use crate::matchfinder::sequence::REP_MOVE;
use crate::matchfinder::tables::{DedicatedDictTable, HashChainTable};
use crate::matchfinder::window::Window;
use crate::matchfinder::MatchCandidate;

pub struct HashChainMatchFinder {
    table: HashChainTable,
    hash_log: u32,
    min_match: u32,
}

impl HashChainMatchFinder {
    pub fn new(hash_log: u32, chain_log: u32, min_match: u32) -> Self {
        HashChainMatchFinder {
            table: HashChainTable::new(hash_log, chain_log),
            hash_log,
            min_match,
        }
    }

    pub fn next_to_update(&self) -> u32 {
        self.table.next_to_update
    }

    pub fn set_next_to_update(&mut self, pos: u32) {
        self.table.next_to_update = pos;
    }

    /// Borrow the underlying table, e.g. to hand a fully-built dictionary
    /// table to [`crate::matchfinder::DictSource::HashChainMatchState`].
    pub fn table(&self) -> &HashChainTable {
        &self.table
    }

    pub(crate) fn hash_at(&self, window: &Window, pos: u32) -> u32 {
        let mut buf = [0u8; 8];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = window.byte_or_zero(pos + i as u32);
        }
        hash(&buf, self.min_match, self.hash_log)
    }

    /// `insertAndFindFirst(ip)` (§4.2): fold in every position from
    /// `next_to_update` up to (not including) `curr`, then return the
    /// current head for `curr`'s hash.
    pub fn insert_and_find_first(&mut self, window: &Window, curr: u32) -> u32 {
        while self.table.next_to_update < curr {
            let pos = self.table.next_to_update;
            let h = self.hash_at(window, pos);
            self.table.insert(h, pos);
            self.table.next_to_update += 1;
        }
        let h = self.hash_at(window, curr);
        self.table.head(h)
    }

    /// Walk the chain from `curr`'s head, scoring each candidate against
    /// `ip` by common-prefix length, for up to `max_attempts` steps or
    /// until a candidate falls below `low_limit` / outside the chain span.
    ///
    /// Position `0` is never considered a true candidate: a fresh table
    /// reports `0` for an empty bucket, indistinguishable from a genuine
    /// match there. A search at `curr == 0` is legal (it happens whenever a
    /// dictionary is attached with no local prefix consumed yet) and
    /// simply returns no local candidate, the same way the reference never
    /// special-cases it inside the search routine itself.
    pub fn search(
        &mut self,
        window: &Window,
        curr: u32,
        end: u32,
        low_limit: u32,
        max_attempts: u32,
    ) -> Option<MatchCandidate> {
        let chain_size = self.table.chain_mask() + 1;
        let mut candidate = self.insert_and_find_first(window, curr);
        let mut best_len = 0u32;
        let mut best_index = 0u32;
        let mut attempts = max_attempts;

        while candidate != 0 && candidate >= low_limit && candidate + chain_size > curr && attempts > 0
        {
            let len = window.count(curr, candidate, end);
            if len > best_len {
                best_len = len;
                best_index = candidate;
            }
            candidate = self.table.predecessor(candidate);
            attempts -= 1;
        }

        if best_len >= self.min_match {
            Some(MatchCandidate {
                length: best_len,
                offset_code: curr - best_index + REP_MOVE,
            })
        } else {
            None
        }
    }

    /// Side arm for an attached read-only dictionary (§4.2 "attached
    /// dictMatchState"): walk the dictionary's own hash-chain, built with
    /// its own `low_limit`, and translate returned indices into the local
    /// address space via `index_delta` (the distance from the local
    /// window's `low_limit` to the dictionary's high limit).
    pub fn search_dict_match_state(
        &self,
        local_window: &Window,
        dict_window: &Window,
        dict_table: &HashChainTable,
        dict_hash: u32,
        curr: u32,
        end: u32,
        index_delta: u32,
        remaining_attempts: u32,
        best_so_far: u32,
    ) -> Option<MatchCandidate> {
        let mut candidate = dict_table.head(dict_hash);
        let mut best_len = best_so_far;
        let mut best_index = 0u32;
        let mut attempts = remaining_attempts;

        while candidate != 0 && candidate >= dict_window.low_limit && attempts > 0 {
            let local_start = candidate.wrapping_add(index_delta);
            let dict_budget = dict_window.end().saturating_sub(candidate);
            let cap = end.saturating_sub(curr).min(dict_budget);
            let len = (0..cap)
                .take_while(|&i| dict_window.byte(candidate + i) == local_window.byte(curr + i))
                .count() as u32;
            if len > best_len {
                best_len = len;
                best_index = local_start;
            }
            candidate = dict_table.predecessor(candidate);
            attempts -= 1;
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

    /// Side arm for a dedicated-dictionary-search bucket (§4.2 "Side arm:
    /// DDSS", §4.5): probe the direct slots, then the packed chain tail,
    /// honoring `remaining_attempts` and stopping early on a zero slot.
    pub fn search_dedicated_dict(
        &self,
        local_window: &Window,
        dict_window: &Window,
        ddss: &DedicatedDictTable,
        bucket_hash: u32,
        curr: u32,
        end: u32,
        index_delta: u32,
        remaining_attempts: u32,
        best_so_far: u32,
    ) -> Option<MatchCandidate> {
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
            // The tail encodes a delta chain; a zero byte terminates early.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_repeated_pattern() {
        let data = b"ABCABCABCABC";
        let window = Window::new_no_dict(data, 0);
        let mut mf = HashChainMatchFinder::new(10, 8, 3);
        // Insert/search at curr=3: preceding bytes "ABC" at position 0 repeat.
        let result = mf.search(&window, 3, data.len() as u32, 0, 64);
        let candidate = result.expect("expected a match");
        assert!(candidate.length >= 3);
        assert_eq!(candidate.offset_code, 3 - 0 + REP_MOVE);
    }

    #[test]
    fn no_match_below_min_match() {
        let data = b"ABCDEFGHIJKL";
        let window = Window::new_no_dict(data, 0);
        let mut mf = HashChainMatchFinder::new(10, 8, 4);
        let result = mf.search(&window, 4, data.len() as u32, 0, 64);
        assert!(result.is_none());
    }

    #[test]
    fn next_to_update_advances_monotonically() {
        let data = b"ABCABCABCABC";
        let window = Window::new_no_dict(data, 0);
        let mut mf = HashChainMatchFinder::new(10, 8, 3);
        mf.search(&window, 3, data.len() as u32, 0, 64);
        assert_eq!(mf.next_to_update(), 3);
        mf.search(&window, 6, data.len() as u32, 0, 64);
        assert_eq!(mf.next_to_update(), 6);
    }
}
