//! Window index model (§4.1).
//!
//! Every reference into source history is a 32-bit monotone position,
//! resolved to a byte through one of two bases: the current prefix, or a
//! detached external-dictionary region. Keeping everything position-based
//! (rather than raw pointers, unlike the C reference this spec describes)
//! lets the borrow checker enforce the `base`/`dictBase` split instead of
//! relying on manual pointer bookkeeping.

/// A sliding window over source history, split into an optional external
/// dictionary region (`[low_limit, dict_limit)`) and the current prefix
/// (`[dict_limit, dict_limit + prefix.len())`).
///
/// Invariant: for any valid position `p`, `p >= low_limit`; `dict_limit >=
/// low_limit`.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    /// Bytes of the current prefix; logical position `dict_limit` maps to
    /// `prefix[0]`.
    pub prefix: &'a [u8],
    /// Bytes of the external dictionary region, if any; logical position
    /// `low_limit` maps to `ext_dict[0]`.
    pub ext_dict: &'a [u8],
    /// Positions below this value require the external dictionary.
    pub dict_limit: u32,
    /// Positions below this value have no history at all.
    pub low_limit: u32,
    /// End of bytes actually loaded into a dictionary context, if attached.
    pub loaded_dict_end: u32,
}

impl<'a> Window<'a> {
    /// A window over a single contiguous buffer with no external dictionary.
    pub fn new_no_dict(prefix: &'a [u8], dict_limit: u32) -> Self {
        Window {
            prefix,
            ext_dict: &[],
            dict_limit,
            low_limit: dict_limit,
            loaded_dict_end: dict_limit,
        }
    }

    /// One past the last valid position.
    pub fn end(&self) -> u32 {
        self.dict_limit + self.prefix.len() as u32
    }

    /// `true` when `p` falls in the detached external-dictionary region.
    pub fn in_ext_dict(&self, p: u32) -> bool {
        p < self.dict_limit
    }

    /// Resolve a position to its byte.
    ///
    /// `p` must satisfy `low_limit <= p < end()`.
    pub fn byte(&self, p: u32) -> u8 {
        if p >= self.dict_limit {
            self.prefix[(p - self.dict_limit) as usize]
        } else {
            self.ext_dict[(p - self.low_limit) as usize]
        }
    }

    /// Resolve a position to its byte, or `0` if `p` falls outside
    /// `[low_limit, end())`. Used by hashing, which reads a fixed-width
    /// window of bytes that may run past the end of input near `iend`;
    /// the padding bytes never participate in a successful match since
    /// the parser never searches within 16 bytes of `iend` (§7).
    pub fn byte_or_zero(&self, p: u32) -> u8 {
        if p < self.low_limit || p >= self.end() {
            0
        } else {
            self.byte(p)
        }
    }

    /// Read a little-endian `u32` starting at position `p`. `p` and `p+3`
    /// must resolve to the same segment (callers only use this within the
    /// prefix, where 4 contiguous bytes are guaranteed available).
    pub fn read_u32(&self, p: u32) -> u32 {
        let off = (p - self.dict_limit) as usize;
        u32::from_le_bytes(self.prefix[off..off + 4].try_into().unwrap())
    }

    /// Provides `lowestMatchIndex(curr, windowLog)` (§4.1): the smallest
    /// position a search may still consider. When a dictionary is actively
    /// loaded (`using_loaded_dict`), the window does not shrink below
    /// `low_limit` even if `windowLog` would otherwise exclude it.
    pub fn lowest_match_index(&self, curr: u32, window_log: u32, using_loaded_dict: bool) -> u32 {
        if using_loaded_dict {
            self.low_limit
        } else {
            let span = 1u32 << window_log;
            self.low_limit.max(curr.saturating_sub(span))
        }
    }

    /// Length of the common prefix of the byte ranges starting at `a` and
    /// `b`, bounded by `end - a`. Equivalent to `count` (§4.1): `a`'s and
    /// `b`'s segments may differ (one in the prefix, one in the external
    /// dictionary) — each byte is resolved independently so the stitched
    /// comparison is always correct, just not as fast as a same-segment
    /// slice compare.
    pub fn count(&self, a: u32, b: u32, end: u32) -> u32 {
        debug_assert!(end >= a);
        // Fast path: both ranges lie fully within the prefix.
        if a >= self.dict_limit && b >= self.dict_limit {
            let a_off = (a - self.dict_limit) as usize;
            let b_off = (b - self.dict_limit) as usize;
            let max_len = (end - a) as usize;
            let a_slice = &self.prefix[a_off..];
            let b_slice = &self.prefix[b_off..];
            let len = a_slice
                .iter()
                .zip(b_slice.iter())
                .take(max_len)
                .take_while(|(x, y)| x == y)
                .count();
            return len as u32;
        }
        let max_len = end - a;
        let mut len = 0u32;
        while len < max_len && self.byte(a + len) == self.byte(b + len) {
            len += 1;
        }
        len
    }

    /// `count_2segments(a, b, endA, dictEnd, prefixStart)` (§4.1): continues
    /// a match whose candidate (`b`) starts in the external dictionary and
    /// may run past `dict_end` into the current prefix (stitched at
    /// `dict_end -> prefix_start`). `a` is always in the current prefix.
    ///
    /// `dict_end` and `prefix_start` are both expressed as positions; the
    /// byte that continues the match once `b` exhausts the dictionary is
    /// the one at `prefix_start`, not at `dict_end` (they usually coincide
    /// with `dict_limit`, but a caller may pass a shorter loaded-dictionary
    /// span via `dict_end`).
    pub fn count_2segments(&self, a: u32, b: u32, end_a: u32, dict_end: u32, prefix_start: u32) -> u32 {
        debug_assert!(self.in_ext_dict(b));
        // Phase 1: compare within the dictionary until either a mismatch or
        // dict_end is reached.
        let dict_budget = dict_end.saturating_sub(b);
        let phase1_limit = a + dict_budget.min(end_a - a);
        let len1 = self.count(a, b, phase1_limit);
        if a + len1 < phase1_limit || b + len1 < dict_end {
            // Stopped on an actual mismatch before exhausting the dictionary.
            return len1;
        }
        // Phase 2: the candidate's dictionary content ran out; continue
        // matching `a + len1` against the start of the current prefix.
        let len2 = self.count(a + len1, prefix_start, end_a);
        len1 + len2
    }
}
