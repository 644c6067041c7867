//! Repcode engine: two-slot recent-offset memory (§4.6).
//!
//! The reference keeps this interleaved into the parser and guards the
//! candidate-position check with an intentional unsigned-underflow trick
//! (`(prefixLowestIndex - 1) - repIndex >= 3`, §9 open question). Here the
//! same reachability test is a checked integer comparison against
//! `low_limit` instead: the underflow class does not exist in the first
//! place, so there is nothing to detect.

use crate::matchfinder::window::Window;

/// Recent-offset memory carried across sequence emissions within a block,
/// and across blocks via the caller-owned `rep[0..2]` array (§6).
#[derive(Debug, Clone, Copy, Default)]
pub struct RepcodeState {
    /// `(o1, o2)`: primary and secondary repeat offsets. Zero means disabled.
    rep: [u32; 2],
    /// Offset saved when a slot is zeroed by a window slide, restored at
    /// block end if the slot is still zero (§4.6 rule 4).
    saved: [u32; 2],
}

impl RepcodeState {
    /// Build state from a caller-supplied `rep[0..2]` array.
    pub fn new(rep0: u32, rep1: u32) -> Self {
        RepcodeState {
            rep: [rep0, rep1],
            saved: [rep0, rep1],
        }
    }

    /// Current primary offset (`o1`).
    pub fn offset0(&self) -> u32 {
        self.rep[0]
    }

    /// Current secondary offset (`o2`).
    pub fn offset1(&self) -> u32 {
        self.rep[1]
    }

    /// Resolve rep slot `idx` (0 or 1) to a candidate position at `ip`,
    /// or `None` if the slot is disabled or the candidate would fall
    /// outside `[low_limit, ip)`.
    fn candidate_at(&self, idx: usize, ip: u32, low_limit: u32) -> Option<u32> {
        let offset = self.rep[idx];
        if offset == 0 || offset > ip {
            return None;
        }
        let candidate = ip - offset;
        if candidate < low_limit {
            return None;
        }
        Some(candidate)
    }

    /// Rep0 test at `ip` (§4.6 rule 1): if the primary offset's candidate
    /// is reachable and the first 4 bytes match, return the full extended
    /// match length (bounded by `end`).
    pub fn try_rep0(&self, window: &Window, ip: u32, end: u32, low_limit: u32) -> Option<u32> {
        let candidate = self.candidate_at(0, ip, low_limit)?;
        if window.read_u32_checked(ip) != window.read_u32_checked(candidate) {
            return None;
        }
        Some(window.count(ip, candidate, end))
    }

    /// Rep1 test at `ip`: same as [`try_rep0`](Self::try_rep0) but against
    /// the secondary offset. A hit here is emitted as offsetCode 1 with the
    /// rep0/rep1 swap (§4.6 rule 2).
    pub fn try_rep1(&self, window: &Window, ip: u32, end: u32, low_limit: u32) -> Option<u32> {
        let candidate = self.candidate_at(1, ip, low_limit)?;
        if window.read_u32_checked(ip) != window.read_u32_checked(candidate) {
            return None;
        }
        Some(window.count(ip, candidate, end))
    }

    /// Promote a real (non-repcode) offset after it is chosen for emission:
    /// `(o2, o1) <- (o1, offset)` (§4.6 rule 2).
    pub fn promote(&mut self, offset: u32) {
        self.rep = [offset, self.rep[0]];
    }

    /// Apply the rep1-hit swap: `(o1, o2) <- (o2, o1)` (§4.6 rule 2).
    pub fn swap(&mut self) {
        self.rep.swap(0, 1);
    }

    /// Window-slide bookkeeping: any slot whose candidate now falls below
    /// `low_limit` is zeroed, preserving its value as the saved offset
    /// (§4.6 rule 4, §8 boundary case "rep1 > maxRep").
    pub fn slide_window(&mut self, curr: u32, low_limit: u32) {
        for idx in 0..2 {
            let offset = self.rep[idx];
            if offset != 0 && (offset > curr || curr - offset < low_limit) {
                self.saved[idx] = offset;
                self.rep[idx] = 0;
            }
        }
    }

    /// Value to report for rep slot `idx` at block end: the live offset if
    /// still nonzero, else the saved offset from the last time it was
    /// zeroed (§4.6 rule 4, §8 invariant 8).
    pub fn output(&self, idx: usize) -> u32 {
        if self.rep[idx] != 0 {
            self.rep[idx]
        } else {
            self.saved[idx]
        }
    }
}

impl Window<'_> {
    /// Read a 4-byte little-endian value at `p`, resolving across the
    /// prefix/dictionary split a byte at a time (used only by the repcode
    /// engine's equality pre-check, which is not on the hot contiguous
    /// path that [`Window::read_u32`] serves).
    fn read_u32_checked(&self, p: u32) -> u32 {
        u32::from_le_bytes([
            self.byte_or_zero(p),
            self.byte_or_zero(p + 1),
            self.byte_or_zero(p + 2),
            self.byte_or_zero(p + 3),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(data: &[u8]) -> Window<'_> {
        Window::new_no_dict(data, 0)
    }

    #[test]
    fn rep0_miss_on_mismatched_bytes() {
        let data = b"XABCABCY";
        let w = window(data);
        let rep = RepcodeState::new(3, 0);
        // ip=4 ("ABCY") vs candidate=1 ("BCAB..."): first bytes diverge (A vs B).
        let len = rep.try_rep0(&w, 4, data.len() as u32, 0);
        assert_eq!(len, None);
    }

    #[test]
    fn rep0_hit_on_true_repeat() {
        let data = b"ABCABCABC";
        let w = window(data);
        let rep = RepcodeState::new(3, 0);
        let len = rep.try_rep0(&w, 3, data.len() as u32, 0);
        assert_eq!(len, Some(6));
    }

    #[test]
    fn rep0_rejects_out_of_window_candidate() {
        let data = b"ABCABCABC";
        let w = window(data);
        let rep = RepcodeState::new(3, 0);
        // low_limit above the candidate position excludes it.
        assert_eq!(rep.try_rep0(&w, 3, data.len() as u32, 1), None);
    }

    #[test]
    fn rep0_disabled_when_zero() {
        let data = b"ABCABCABC";
        let w = window(data);
        let rep = RepcodeState::new(0, 5);
        assert_eq!(rep.try_rep0(&w, 3, data.len() as u32, 0), None);
    }

    #[test]
    fn promote_shifts_slots() {
        let mut rep = RepcodeState::new(3, 7);
        rep.promote(10);
        assert_eq!(rep.offset0(), 10);
        assert_eq!(rep.offset1(), 3);
    }

    #[test]
    fn swap_exchanges_slots() {
        let mut rep = RepcodeState::new(3, 7);
        rep.swap();
        assert_eq!(rep.offset0(), 7);
        assert_eq!(rep.offset1(), 3);
    }

    #[test]
    fn slide_window_zeroes_and_saves_stale_offset() {
        let mut rep = RepcodeState::new(100, 3);
        rep.slide_window(50, 10); // offset 100 -> candidate underflows (100 > 50)
        assert_eq!(rep.offset0(), 0);
        assert_eq!(rep.output(0), 100);
        // offset 3 -> candidate 47, still >= low_limit 10, stays live.
        assert_eq!(rep.offset1(), 3);
    }

    #[test]
    fn output_falls_back_to_saved_when_zero() {
        let mut rep = RepcodeState::new(5, 0);
        rep.slide_window(3, 10); // candidate = 3-5 underflows -> zeroed, saved=5
        assert_eq!(rep.rep[0], 0);
        assert_eq!(rep.output(0), 5);
    }
}
