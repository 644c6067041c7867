//! Lazy parser (§4.7) and its extDict variant (§4.9).
//!
//! Drives the whole core: for each input position it consults the repcode
//! engine, then the configured match-finder, optionally looks one or two
//! positions further ahead before committing, extends the chosen match
//! backwards ("catch-up"), and emits sequences until the block is
//! exhausted.

use crate::matchfinder::params::CParams;
use crate::matchfinder::repcode::RepcodeState;
use crate::matchfinder::sequence::{RawSequence, SequenceSink, REP_MOVE};
use crate::matchfinder::window::Window;
use crate::matchfinder::{DictSource, MatchFinder};

/// Shift applied to `ip - anchor` when skipping over incompressible bytes
/// (§4.7 step 3): the skip grows the longer a stretch of input has gone
/// without producing a match, same constant the reference calls
/// `SEARCH_STRENGTH`.
const SEARCH_STRENGTH: u32 = 8;

/// The main loop only considers positions with at least this many bytes of
/// margin before `block_end`, so every hash/rep read of up to 8 bytes (and
/// the parser's own small lookahead) stays safely inside the buffer (§4.7
/// "Main loop over ip ∈ [anchor, iend − 16)").
const END_MARGIN: u32 = 16;

fn high_bit(v: u32) -> i64 {
    if v == 0 {
        0
    } else {
        (31 - v.leading_zeros()) as i64
    }
}

/// A match chosen for emission: either a repeat-offset hit (`is_rep`) or a
/// literal-offset match, together with where it starts and how long it is.
#[derive(Debug, Clone, Copy)]
struct Choice {
    start: u32,
    length: u32,
    is_rep: bool,
    /// Real (unbiased) offset; meaningless when `is_rep` is true.
    offset: u32,
}

/// Parse one block's worth of input, `[block_start, block_end)`, appending
/// `(litLength, matchLength - MIN_MATCH, offsetCode)` sequences to `sink`
/// and leaving `rep` updated for the next block.
///
/// `using_loaded_dict` selects between the no-dict `lowestMatchIndex` rule
/// and the "never shrink below low_limit" rule for an actively attached
/// dictionary (§4.1). For the pure extDict regime (§4.9), pass a `window`
/// whose `low_limit` is below `dict_limit` and recompute it fresh per step
/// the same way — this function already does, since it calls
/// `window.lowest_match_index` on every iteration rather than caching it.
///
/// After this returns, the caller reads `rep.output(0)`/`rep.output(1)`
/// for the values to carry into the next block (§4.7 "store rep[0],
/// rep[1] ... substituting savedOffset for any zero").
///
/// `dict` is the attached dictionary's own search structures, if any
/// (§4.8 "Mode matrix"); pass `None` for `DictMode::NoDict` or
/// `DictMode::ExtDict` (the latter reaches its dictionary content through
/// `window`'s `ext_dict` region instead, via `using_loaded_dict`).
#[allow(clippy::too_many_arguments)]
pub fn parse_block(
    window: &Window,
    params: &CParams,
    match_finder: &mut MatchFinder,
    rep: &mut RepcodeState,
    using_loaded_dict: bool,
    block_start: u32,
    block_end: u32,
    sink: &mut impl SequenceSink,
    dict: Option<&DictSource>,
) {
    let min_match_base = if params.min_match <= 3 { 3 } else { 4 };
    let depth = params.strategy.depth();
    let max_attempts = params.max_search_attempts();

    let anchor_start = block_start;
    let mut anchor = block_start;

    // Mirrors zstd_lazy.c's initial `ip += (dictAndPrefixLength == 0)`
    // (`ip += (ip == prefixStart)` in the extDict variant): when there is
    // truly no history anywhere yet — nothing consumed in the local prefix
    // and no dictionary content attached at all — the very first search
    // position is backed off by one. Without this, a search at position 0
    // cannot be told apart from a table's own "empty bucket" sentinel,
    // which is also 0.
    let dict_history = match dict {
        Some(d) => d.window().end() - d.window().low_limit,
        None if using_loaded_dict => window.dict_limit - window.low_limit,
        None => 0,
    };
    let prefix_history = anchor_start - window.dict_limit.min(anchor_start);
    let mut ip = anchor_start + u32::from(prefix_history + dict_history == 0);

    while ip + END_MARGIN < block_end {
        let low_limit = window.lowest_match_index(ip, params.window_log, using_loaded_dict);

        // Step 1: greedy's repcode fast path. Lazy/lazy2 fold the rep0
        // test into the lookahead loop below instead of duplicating it
        // here, since depth >= 1 always re-tests rep0 at ip+1 as part of
        // its first round.
        if depth == 0 && (using_loaded_dict || rep.offset0() != 0) {
            if let Some(len) = rep.try_rep0(window, ip + 1, block_end, low_limit) {
                if len >= min_match_base {
                    emit(
                        sink,
                        rep,
                        anchor,
                        Choice {
                            start: ip + 1,
                            length: len,
                            is_rep: true,
                            offset: 0,
                        },
                        min_match_base,
                    );
                    ip = ip + 1 + len;
                    anchor = ip;
                    ip = immediate_rep_loop(window, params, rep, min_match_base, using_loaded_dict, ip, block_end, sink);
                    anchor = ip;
                    continue;
                }
            }
        }

        // Step 2: the configured match-finder at ip.
        let found = match_finder.find(window, ip, block_end, low_limit, max_attempts, 0, dict);
        let Some(candidate) = found else {
            ip += 1 + ((ip - anchor) >> SEARCH_STRENGTH);
            continue;
        };

        // Step 3: too short to be worth pursuing; skip ahead.
        if candidate.length < 4 {
            ip += 1 + ((ip - anchor) >> SEARCH_STRENGTH);
            continue;
        }

        let mut choice = Choice {
            start: ip,
            length: candidate.length,
            is_rep: false,
            offset: candidate.offset_code - REP_MOVE,
        };

        // Steps 4-5: lazy / lazy2 lookahead.
        if depth >= 1 {
            let mut round = 0u32;
            loop {
                let next_ip = choice.start + 1;
                if next_ip + END_MARGIN >= block_end {
                    break;
                }
                let (rep_mult, rep_bonus, off_bonus) = if round == 0 {
                    (3i64, 1i64, 4i64)
                } else {
                    (4i64, 1i64, 7i64)
                };
                let low2 = window.lowest_match_index(next_ip, params.window_log, using_loaded_dict);
                let mut improved = None;

                if let Some(rep_len) = rep.try_rep0(window, next_ip, block_end, low2) {
                    if rep_len >= min_match_base {
                        let gain_rep = rep_mult * rep_len as i64;
                        let gain_base = 3 * choice.length as i64 - high_bit(choice.offset + 1) + rep_bonus;
                        if gain_rep > gain_base {
                            improved = Some(Choice {
                                start: next_ip,
                                length: rep_len,
                                is_rep: true,
                                offset: 0,
                            });
                        }
                    }
                }

                if improved.is_none() {
                    if let Some(cand2) = match_finder.find(
                        window,
                        next_ip,
                        block_end,
                        low2,
                        max_attempts,
                        choice.offset + REP_MOVE,
                        dict,
                    ) {
                        let offset2 = cand2.offset_code - REP_MOVE;
                        let gain2 = 4 * cand2.length as i64 - high_bit(offset2 + 1);
                        let gain1 = 4 * choice.length as i64 - high_bit(choice.offset + 1) + off_bonus;
                        if gain2 > gain1 {
                            improved = Some(Choice {
                                start: next_ip,
                                length: cand2.length,
                                is_rep: false,
                                offset: offset2,
                            });
                        }
                    }
                }

                match improved {
                    Some(better) => {
                        choice = better;
                        round += 1;
                        if depth == 1 && round >= 1 {
                            break;
                        }
                        if depth == 2 && round >= 2 {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }

        // Step 6: catch-up, only for a real-offset match.
        if !choice.is_rep {
            catch_up(window, anchor, &mut choice);
        }

        // Steps 7-8: promote repcodes (inside `emit`) and write the
        // sequence, then advance past it.
        emit(sink, rep, anchor, choice, min_match_base);
        ip = choice.start + choice.length;
        anchor = ip;

        // Step 9: immediate repcode loop.
        ip = immediate_rep_loop(window, params, rep, min_match_base, using_loaded_dict, ip, block_end, sink);
        anchor = ip;
    }
}

/// Extend `choice.start` backwards while the preceding byte still matches
/// the byte preceding its match target, staying within `anchor` and the
/// window's reachable range (§4.7 step 6).
fn catch_up(window: &Window, anchor: u32, choice: &mut Choice) {
    while choice.start > anchor {
        let prev_src = choice.start - 1;
        if choice.offset > prev_src {
            break;
        }
        let prev_candidate = prev_src - choice.offset;
        if prev_candidate < window.low_limit {
            break;
        }
        if window.byte(prev_src) != window.byte(prev_candidate) {
            break;
        }
        choice.start -= 1;
        choice.length += 1;
    }
}

/// Write `choice` as a sequence relative to `anchor`, and apply the
/// repcode promotion rules (§4.6 rule 2, §4.7 step 7). `min_match_base` is
/// subtracted from the match length per the wire convention (§GLOSSARY).
fn emit(
    sink: &mut impl SequenceSink,
    rep: &mut RepcodeState,
    anchor: u32,
    choice: Choice,
    min_match_base: u32,
) {
    let literal_length = choice.start - anchor;
    let wire_length = choice.length - min_match_base;
    if choice.is_rep {
        sink.push(RawSequence::with_repcode(literal_length, wire_length, 0));
    } else {
        sink.push(RawSequence::with_offset(literal_length, wire_length, choice.offset));
        rep.promote(choice.offset);
    }
}

/// Repeatedly re-check rep0, then rep1, at the current position, emitting
/// a zero-litLen repcode sequence and advancing while one of them keeps
/// hitting (§4.6 rules 2-3, §4.7 step 9). A rep1 hit swaps `(o1, o2)` and
/// is encoded as offsetCode 1, the only way this parser ever reaches that
/// code. Returns the position after the loop.
fn immediate_rep_loop(
    window: &Window,
    params: &CParams,
    rep: &mut RepcodeState,
    min_match_base: u32,
    using_loaded_dict: bool,
    mut ip: u32,
    block_end: u32,
    sink: &mut impl SequenceSink,
) -> u32 {
    loop {
        if ip + END_MARGIN >= block_end {
            return ip;
        }
        let low = window.lowest_match_index(ip, params.window_log, using_loaded_dict);
        if let Some(len) = rep.try_rep0(window, ip, block_end, low) {
            if len >= min_match_base {
                sink.push(RawSequence::with_repcode(0, len - min_match_base, 0));
                ip += len;
                continue;
            }
        }
        if let Some(len) = rep.try_rep1(window, ip, block_end, low) {
            if len >= min_match_base {
                rep.swap();
                sink.push(RawSequence::with_repcode(0, len - min_match_base, 1));
                ip += len;
                continue;
            }
        }
        return ip;
    }
}
