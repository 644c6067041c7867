//! Match-finding and lazy-parsing core.
//!
//! This module scans an input window, locates prior occurrences of the
//! current byte sequence via one of three interchangeable search
//! structures, and emits `(litLength, matchLength, offsetCode)` sequences
//! into an external sink for downstream entropy coding. Entropy coding
//! itself, frame/block framing, and dictionary digestion are out of scope
//! here and remain the job of this crate's `frame`, `fse`, and `literals`
//! modules.

mod binary_tree;
mod ddss;
mod hash;
mod hash_chain;
mod params;
mod parser;
mod repcode;
mod row_hash;
mod sequence;
mod tables;
mod window;

pub use binary_tree::BinaryTreeMatchFinder;
pub use ddss::build_dedicated_dict_table;
pub use params::{CParams, DictMode, ParseStrategy, RowParams, SearchMethod};
pub use parser::parse_block;
pub use repcode::RepcodeState;
pub use row_hash::RowMatchFinder;
pub use sequence::{RawSequence, SequenceSink, REP_MOVE};
pub use tables::{BinaryTreeTable, DedicatedDictTable, HashChainTable, RowTable, TreeChild};
pub use window::Window;

use hash_chain::HashChainMatchFinder;

/// Best candidate a search produced: extended length and the offset code
/// ready for sequence emission (`curr - matchIndex + REP_MOVE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCandidate {
    /// Extended common-prefix length against the search position.
    pub length: u32,
    /// `curr - matchIndex + REP_MOVE`, ready for sequence emission.
    pub offset_code: u32,
}

/// Borrowed view of an attached dictionary's own search structures,
/// selected to match the active `MatchFinder` variant (§4.8 "Mode
/// matrix"). Produced once per dictionary load and passed into every
/// `find` call for the block(s) that use it.
#[derive(Clone, Copy)]
pub enum DictSource<'a> {
    /// `DictMode::DictMatchState` paired with `SearchMethod::HashChain`.
    HashChainMatchState {
        window: Window<'a>,
        table: &'a HashChainTable,
    },
    /// `DictMode::DedicatedDictSearch`, hash-chain only (§4.5).
    DedicatedDictSearch {
        window: Window<'a>,
        table: &'a DedicatedDictTable,
    },
    /// `DictMode::DictMatchState` paired with `SearchMethod::BinaryTree`.
    BinaryTreeMatchState {
        window: Window<'a>,
        table: &'a BinaryTreeTable,
        hash_log: u32,
        min_match: u32,
    },
    /// `DictMode::DictMatchState` paired with `SearchMethod::Row`.
    RowMatchState {
        window: Window<'a>,
        table: &'a RowTable,
    },
    /// `DictMode::DedicatedDictSearch` paired with `SearchMethod::Row`
    /// (§4.4 "Dictionary extensions"): same bucket/packed-tail table DDSS
    /// uses with `SearchMethod::HashChain`, just consumed by a different
    /// local search.
    RowDedicatedDictSearch {
        window: Window<'a>,
        table: &'a DedicatedDictTable,
        hash_log: u32,
        min_match: u32,
    },
}

impl<'a> DictSource<'a> {
    fn window(&self) -> &Window<'a> {
        match self {
            DictSource::HashChainMatchState { window, .. } => window,
            DictSource::DedicatedDictSearch { window, .. } => window,
            DictSource::BinaryTreeMatchState { window, .. } => window,
            DictSource::RowMatchState { window, .. } => window,
            DictSource::RowDedicatedDictSearch { window, .. } => window,
        }
    }
}

/// One of the three interchangeable match-finding data structures (§2,
/// §9 "Replacing the C template specialization pattern").
///
/// An enum dispatch rather than a trait object: the parser's hot loop
/// calls exactly one concrete variant for the lifetime of a block (the
/// search method never changes mid-block), so this is a single branch
/// resolved once per call, not the function-pointer table the design
/// notes warn against.
pub enum MatchFinder {
    /// Single-bucket hash table with a linear chain (§4.2).
    HashChain(HashChainMatchFinder),
    /// Double binary tree with deferred-sort candidates (§4.3).
    BinaryTree(BinaryTreeMatchFinder),
    /// Row-bucketed hash table with a SIMD tag pre-filter (§4.4).
    Row(RowMatchFinder),
}

impl MatchFinder {
    /// Build the match-finder named by `params.search_method`, sized per
    /// `params`.
    pub fn new(params: &CParams) -> Self {
        match params.search_method {
            SearchMethod::HashChain => MatchFinder::HashChain(HashChainMatchFinder::new(
                params.hash_log,
                params.chain_log,
                params.min_match,
            )),
            SearchMethod::BinaryTree => MatchFinder::BinaryTree(BinaryTreeMatchFinder::new(
                params.hash_log,
                params.chain_log,
                params.min_match,
            )),
            SearchMethod::Row => MatchFinder::Row(RowMatchFinder::new(
                params.hash_log,
                row_log_for(params.row.row_entries),
                params.row.row_entries,
                params.min_match,
            )),
        }
    }

    /// Insert positions up to `curr` and search for the best candidate
    /// (§4.2 "Search", §4.3 "Search at curr", §4.4 "Search").
    ///
    /// When `dict` is attached and matches this finder's own variant, the
    /// local result seeds `best_so_far` for the dictionary side arm (§4.2
    /// "attached dictMatchState", §4.5 DDSS, §4.3/§4.4 dictionary
    /// extension), so the dictionary is only allowed to replace the local
    /// candidate by strictly improving on its length.
    pub fn find(
        &mut self,
        window: &Window,
        curr: u32,
        end: u32,
        low_limit: u32,
        max_attempts: u32,
        prev_offset_code: u32,
        dict: Option<&DictSource>,
    ) -> Option<MatchCandidate> {
        let local = match self {
            MatchFinder::HashChain(mf) => mf.search(window, curr, end, low_limit, max_attempts),
            MatchFinder::BinaryTree(mf) => {
                mf.search(window, curr, end, low_limit, prev_offset_code, max_attempts)
            }
            MatchFinder::Row(mf) => mf.insert_and_search(window, curr, end, low_limit, max_attempts),
        };

        let Some(&dict) = dict else { return local };
        let best_so_far = local.map(|c| c.length).unwrap_or(0);
        let index_delta = window.dict_limit.wrapping_sub(dict.window().end());
        let remaining_attempts = max_attempts;

        let dict_result = match (&*self, dict) {
            (MatchFinder::HashChain(mf), DictSource::HashChainMatchState { window: dw, table }) => {
                let dict_hash = mf.hash_at(window, curr);
                mf.search_dict_match_state(
                    window, &dw, table, dict_hash, curr, end, index_delta, remaining_attempts, best_so_far,
                )
            }
            (MatchFinder::HashChain(mf), DictSource::DedicatedDictSearch { window: dw, table }) => {
                let bucket_hash = mf.hash_at(window, curr);
                mf.search_dedicated_dict(
                    window, &dw, table, bucket_hash, curr, end, index_delta, remaining_attempts, best_so_far,
                )
            }
            (
                MatchFinder::BinaryTree(mf),
                DictSource::BinaryTreeMatchState { window: dw, table, hash_log, min_match },
            ) => mf.search_dict(
                window, &dw, table, hash_log, min_match, curr, end, index_delta, remaining_attempts,
                best_so_far,
            ),
            (MatchFinder::Row(mf), DictSource::RowMatchState { window: dw, table }) => {
                let dict_hash = mf.hash_at(window, curr);
                mf.search_dict_match_state(
                    window, &dw, table, dict_hash, curr, end, index_delta, remaining_attempts, best_so_far,
                )
            }
            (
                MatchFinder::Row(mf),
                DictSource::RowDedicatedDictSearch { window: dw, table, hash_log, min_match },
            ) => mf.search_dedicated_dict(
                window, &dw, table, hash_log, min_match, curr, end, index_delta, remaining_attempts,
                best_so_far,
            ),
            _ => None,
        };

        dict_result.or(local)
    }

    /// Lowest position not yet folded into the active table (§5 "Within a
    /// block, `nextToUpdate` is monotone non-decreasing").
    pub fn next_to_update(&self) -> u32 {
        match self {
            MatchFinder::HashChain(mf) => mf.next_to_update(),
            MatchFinder::BinaryTree(mf) => mf.next_to_update(),
            MatchFinder::Row(mf) => mf.next_to_update,
        }
    }
}

fn row_log_for(row_entries: u32) -> u32 {
    if row_entries >= 32 {
        5
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(method: SearchMethod, strategy: ParseStrategy) -> CParams {
        CParams {
            window_log: 20,
            chain_log: 14,
            hash_log: 14,
            search_log: 6,
            min_match: 3,
            target_length: 64,
            search_method: method,
            strategy,
            row: RowParams::default(),
        }
    }

    #[test]
    fn match_finder_dispatches_to_configured_method() {
        for method in [SearchMethod::HashChain, SearchMethod::BinaryTree, SearchMethod::Row] {
            let p = params(method, ParseStrategy::Greedy);
            let mut mf = MatchFinder::new(&p);
            let data = b"ABCABCABCABC";
            let window = Window::new_no_dict(data, 0);
            let result = mf.find(&window, 3, data.len() as u32, 0, 64, 0, None);
            assert!(result.is_some(), "{method:?} should find the repeated ABC pattern");
        }
    }
}
