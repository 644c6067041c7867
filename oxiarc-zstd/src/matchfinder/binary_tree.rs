//! Binary-tree match-finder (§4.3).
//!
//! Highest quality of the three match-finders: every inserted position is
//! sorted into a double binary tree keyed by shared-prefix length, so a
//! search can prune entire subtrees instead of walking every candidate.
//! Insertion is deferred (§4.3 "Insert (catch-up)") and the sort happens
//! lazily the first time a search reaches that position.

use crate::matchfinder::hash::hash;
use crate::matchfinder::sequence::REP_MOVE;
use crate::matchfinder::tables::{BinaryTreeTable, TreeChild};
use crate::matchfinder::window::Window;
use crate::matchfinder::MatchCandidate;

pub struct BinaryTreeMatchFinder {
    table: BinaryTreeTable,
    hash_log: u32,
    min_match: u32,
}

impl BinaryTreeMatchFinder {
    pub fn new(hash_log: u32, chain_log: u32, min_match: u32) -> Self {
        BinaryTreeMatchFinder {
            table: BinaryTreeTable::new(hash_log, chain_log),
            hash_log,
            min_match,
        }
    }

    pub fn next_to_update(&self) -> u32 {
        self.table.next_to_update
    }

    /// Borrow the underlying table, for inspecting tree shape in tests and
    /// for handing a dictionary's built tree to [`search_dict`](Self::search_dict).
    pub fn table(&self) -> &BinaryTreeTable {
        &self.table
    }

    fn hash_at(&self, window: &Window, pos: u32) -> u32 {
        let mut buf = [0u8; 8];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = window.byte_or_zero(pos + i as u32);
        }
        hash(&buf, self.min_match, self.hash_log)
    }

    /// Fold in every position from `next_to_update` up to `curr` using the
    /// deferred insert (§4.3 "Insert (catch-up)").
    fn catch_up(&mut self, window: &Window, curr: u32) {
        while self.table.next_to_update < curr {
            let pos = self.table.next_to_update;
            let h = self.hash_at(window, pos);
            self.table.defer_insert(h, pos);
            self.table.next_to_update += 1;
        }
    }

    /// Batch-sort (§4.3): collect the deferred chain rooted at the bucket
    /// head (walking smaller-child links while larger stays `Unsorted`),
    /// then insert each position, oldest first, via `insert_one`.
    fn batch_sort(&mut self, window: &Window, hash: u32, curr: u32, bt_low: u32, end: u32) {
        let mut stack = Vec::new();
        let mut node = self.table.head(hash);
        while node != 0 && node >= bt_low {
            if self.table.larger(node) != TreeChild::Unsorted {
                break;
            }
            stack.push(node);
            match self.table.smaller(node) {
                TreeChild::Position(p) if p != 0 => node = p,
                _ => break,
            }
        }
        while let Some(pos) = stack.pop() {
            if pos == curr {
                continue;
            }
            self.insert_one(window, pos, bt_low, end);
        }
    }

    /// Classic double-binary-tree insertion of a single position (§4.3
    /// "insertOne"): walk the tree from the bucket root, steering by the
    /// tail byte of the longest common extension so far, until an empty
    /// child slot is found.
    fn insert_one(&mut self, window: &Window, pos: u32, bt_low: u32, end: u32) {
        let hash = self.hash_at(window, pos);
        let mut common_smaller = 0u32;
        let mut common_larger = 0u32;
        let mut parent = self.table.head(hash);

        loop {
            if parent == 0 || parent < bt_low {
                break;
            }
            let shared = common_smaller.min(common_larger);
            let len = window.count(pos + shared, parent + shared, end) + shared;
            if pos + len >= end {
                // Cannot determine ordering past the end of input; stop.
                self.table.set_smaller(pos, TreeChild::Unsorted);
                self.table.set_larger(pos, TreeChild::Unsorted);
                self.table.set_head(hash, pos);
                return;
            }
            let tail_parent = window.byte(parent + len);
            let tail_pos = window.byte(pos + len);
            if tail_pos < tail_parent {
                // pos sorts smaller than parent: descend into parent's
                // smaller subtree.
                common_larger = len;
                match self.table.smaller(parent) {
                    TreeChild::Position(p) => parent = p,
                    TreeChild::Unsorted => {
                        self.table.set_smaller(parent, TreeChild::Position(pos));
                        break;
                    }
                }
            } else {
                common_smaller = len;
                match self.table.larger(parent) {
                    TreeChild::Position(p) => parent = p,
                    TreeChild::Unsorted => {
                        self.table.set_larger(parent, TreeChild::Position(pos));
                        break;
                    }
                }
            }
        }

        self.table.set_smaller(pos, TreeChild::Unsorted);
        self.table.set_larger(pos, TreeChild::Unsorted);
        if self.table.head(hash) == 0 {
            self.table.set_head(hash, pos);
        }
    }

    /// Search at `curr`: batch-sort the deferred chain, then walk the tree
    /// from the root tracking `commonSmaller`/`commonLarger`, recording the
    /// best candidate whenever it beats the current best by the cost
    /// criterion `4*deltaLen > highBit(curr-m+1) - highBit(prevOffsetCode+1)`
    /// (§4.3 "Search at curr").
    pub fn search(
        &mut self,
        window: &Window,
        curr: u32,
        end: u32,
        low_limit: u32,
        prev_offset_code: u32,
        max_attempts: u32,
    ) -> Option<MatchCandidate> {
        self.catch_up(window, curr);
        let bt_low = low_limit.max(curr.saturating_sub(self.table.tree_mask()));
        let h = self.hash_at(window, curr);
        self.batch_sort(window, h, curr, bt_low, end);

        let mut node = self.table.head(h);
        let mut common_smaller = 0u32;
        let mut common_larger = 0u32;
        let mut best_len = 0u32;
        let mut best_index = 0u32;
        let mut attempts = max_attempts;

        while node != 0 && node >= bt_low && attempts > 0 {
            attempts -= 1;
            let shared = common_smaller.min(common_larger);
            let len = window.count(curr + shared, node + shared, end) + shared;
            if len > best_len {
                let delta_len = len.saturating_sub(best_len);
                let accept = best_len == 0
                    || 4 * delta_len
                        > high_bit(curr - node + 1).saturating_sub(high_bit(prev_offset_code + 1));
                if accept {
                    best_len = len;
                    best_index = node;
                }
            }
            if curr + len >= end {
                break;
            }
            if window.byte(node + len) < window.byte(curr + len) {
                common_smaller = len;
                node = match self.table.larger(node) {
                    TreeChild::Position(p) => p,
                    TreeChild::Unsorted => 0,
                };
            } else {
                common_larger = len;
                node = match self.table.smaller(node) {
                    TreeChild::Position(p) => p,
                    TreeChild::Unsorted => 0,
                };
            }
        }

        self.table.next_to_update = (curr + best_len).saturating_sub(8).max(self.table.next_to_update);

        if best_len >= self.min_match {
            Some(MatchCandidate {
                length: best_len,
                offset_code: curr - best_index + REP_MOVE,
            })
        } else {
            None
        }
    }

    /// Dictionary extension (§4.3 "Dictionary extension"): after the local
    /// search, recurse into the dictionary's own tree, adjusting returned
    /// indices by `index_delta = low_limit - dict_high_limit`.
    pub fn search_dict(
        &self,
        local_window: &Window,
        dict_window: &Window,
        dict_table: &BinaryTreeTable,
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
        let h = hash(&buf, dict_min_match, dict_hash_log);
        let mut node = dict_table.head(h);
        let mut best_len = best_so_far;
        let mut best_index = 0u32;
        let mut attempts = remaining_attempts;

        while node != 0 && node >= dict_window.low_limit && attempts > 0 {
            attempts -= 1;
            let cap = (end - curr).min(dict_window.end() - node);
            let len = (0..cap)
                .take_while(|&i| dict_window.byte(node + i) == local_window.byte(curr + i))
                .count() as u32;
            if len > best_len {
                best_len = len;
                best_index = node.wrapping_add(index_delta);
            }
            node = match dict_table.smaller(node) {
                TreeChild::Position(p) => p,
                TreeChild::Unsorted => 0,
            };
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

/// Position of the highest set bit, `0` for `0` (used by the BT cost
/// criterion, §4.3).
fn high_bit(v: u32) -> u32 {
    31 - v.leading_zeros()
}
