//! Emitted sequence representation (§6, §GLOSSARY).
//!
//! A parsed block is a run of `RawSequence` triples plus the trailing
//! literals that follow the last one. This is distinct from
//! [`crate::sequences::Sequence`], which is the decoder's fully-resolved
//! view (offset already un-repcoded); `RawSequence` carries the
//! offset *code*, still entangled with the repcode state at the point
//! it was emitted.

/// Bias separating repeat-offset codes from literal-offset codes (§6,
/// §GLOSSARY): codes `0, 1, 2` select one of the three repeat offsets
/// (code `1` is used uniquely right after a zero-litLen repcode sequence,
/// meaning "swap rep0/rep1"); codes `>= REP_MOVE` encode a literal offset
/// as `offsetCode - REP_MOVE`.
pub const REP_MOVE: u32 = 3;

/// One parsed sequence: a run of literals followed by a back-reference.
///
/// `match_length` is stored with `MIN_MATCH` already subtracted (the wire
/// convention, §GLOSSARY); `offset_code` is the *raw* code as produced by
/// the repcode engine, not yet resolved to a literal distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSequence {
    /// Number of literal bytes preceding this match.
    pub literal_length: u32,
    /// Match length minus `MIN_MATCH`.
    pub match_length: u32,
    /// Raw offset code: `0..=2` for a repeat-offset selection, otherwise
    /// `offset + REP_MOVE`.
    pub offset_code: u32,
}

impl RawSequence {
    /// Build a sequence encoding a literal-offset match (not a repcode hit).
    pub fn with_offset(literal_length: u32, match_length: u32, offset: u32) -> Self {
        RawSequence {
            literal_length,
            match_length,
            offset_code: offset + REP_MOVE,
        }
    }

    /// Build a sequence encoding a repeat-offset selection (`rep_index` in
    /// `0..3`).
    pub fn with_repcode(literal_length: u32, match_length: u32, rep_index: u32) -> Self {
        debug_assert!(rep_index < 3);
        RawSequence {
            literal_length,
            match_length,
            offset_code: rep_index,
        }
    }

    /// `true` when this sequence's offset code selects a repeat offset
    /// rather than carrying a literal distance.
    pub fn is_repcode(&self) -> bool {
        self.offset_code < REP_MOVE
    }
}

/// Destination for sequences as the parser emits them.
///
/// Kept as a trait (rather than hard-coding `Vec<RawSequence>` collection)
/// so a caller can stream sequences straight into an FSE encoder without an
/// intermediate buffer, matching the collector-trait shape already used by
/// [`crate::sequences::SequencesDecoder`]'s counterpart on the decode side.
pub trait SequenceSink {
    /// Record one parsed sequence.
    fn push(&mut self, seq: RawSequence);
}

impl SequenceSink for Vec<RawSequence> {
    fn push(&mut self, seq: RawSequence) {
        Vec::push(self, seq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_sequence_applies_rep_move() {
        let seq = RawSequence::with_offset(5, 10, 100);
        assert_eq!(seq.offset_code, 103);
        assert!(!seq.is_repcode());
    }

    #[test]
    fn repcode_sequence_encodes_index() {
        let seq = RawSequence::with_repcode(0, 4, 0);
        assert_eq!(seq.offset_code, 0);
        assert!(seq.is_repcode());

        let seq = RawSequence::with_repcode(0, 4, 2);
        assert_eq!(seq.offset_code, 2);
        assert!(seq.is_repcode());
    }

    #[test]
    fn vec_sink_collects_in_order() {
        let mut sink: Vec<RawSequence> = Vec::new();
        sink.push(RawSequence::with_repcode(0, 1, 0));
        sink.push(RawSequence::with_offset(2, 3, 50));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[1].offset_code, 53);
    }
}
