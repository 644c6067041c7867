//! Compression parameters and the search-method / dictionary-mode matrix.
//!
//! Mirrors the per-block configuration a caller hands to the core: window
//! size, hash/chain/search budgets, the minimum match length, and the choice
//! of match-finder and dictionary regime. Parameter *selection* from a
//! compression level is out of scope here (an external collaborator's job);
//! this module only validates and carries whatever the caller chose.

use oxiarc_core::error::{OxiArcError, Result};

/// Which match-finding data structure is used to search for candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMethod {
    /// Single-bucket hash table with a linear chain, one candidate per step.
    HashChain,
    /// Double binary tree with deferred-sort candidates.
    BinaryTree,
    /// Row-bucketed hash table with a tag pre-filter.
    Row,
}

/// The parser's lookahead strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// No lookahead: emit the first sufficiently long match found.
    Greedy,
    /// One position of lookahead before committing to a match.
    Lazy,
    /// Two positions of lookahead before committing to a match.
    Lazy2,
}

impl ParseStrategy {
    /// Lookahead depth used by the lazy parser (§4.7).
    pub fn depth(self) -> u8 {
        match self {
            ParseStrategy::Greedy => 0,
            ParseStrategy::Lazy => 1,
            ParseStrategy::Lazy2 => 2,
        }
    }
}

/// Dictionary regime in force for a block (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictMode {
    /// No dictionary: only the current window is searched.
    NoDict,
    /// External dictionary in a separate byte buffer (`extDict`).
    ExtDict,
    /// Dictionary shares a match-state tree/chain attached read-only.
    DictMatchState,
    /// Dictionary pre-folded into a compact bucketed layout (DDSS).
    DedicatedDictSearch,
}

/// Tuning parameters specific to the row-hash match-finder (§9, row-hash
/// `shouldPrefetch` open question: exposed as a dial, not a baked constant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowParams {
    /// Row width: 16 or 32 slots.
    pub row_entries: u32,
    /// Whether to issue prefetch hints while scanning a row's candidates.
    /// Pure performance hint; must never affect the result (§5).
    pub prefetch: bool,
}

impl Default for RowParams {
    fn default() -> Self {
        RowParams {
            row_entries: 16,
            prefetch: true,
        }
    }
}

/// Per-block compression parameters (§6).
#[derive(Debug, Clone, Copy)]
pub struct CParams {
    /// log2 of the maximum window size.
    pub window_log: u32,
    /// log2 of the chain table size.
    pub chain_log: u32,
    /// log2 of the hash table size.
    pub hash_log: u32,
    /// log2 of the per-position search-attempt budget.
    pub search_log: u32,
    /// Minimum match length considered (3, 4, 5, or 6).
    pub min_match: u32,
    /// Target match length that short-circuits further search.
    pub target_length: u32,
    /// Which match-finder data structure to use.
    pub search_method: SearchMethod,
    /// The parser's lookahead strategy.
    pub strategy: ParseStrategy,
    /// Row-hash tuning, consulted only when `search_method == Row`.
    pub row: RowParams,
}

impl CParams {
    /// Search-attempt budget derived from `search_log` (`2^searchLog`, §GLOSSARY).
    pub fn max_search_attempts(&self) -> u32 {
        1u32 << self.search_log
    }

    /// Validate a parameter set, surfacing configuration mistakes that the
    /// reference implementation otherwise resolves silently (§9 open
    /// question: `minMatch == 7` is a config error here, not folded into 6).
    pub fn validate(&self) -> Result<()> {
        match self.min_match {
            3 | 4 | 5 | 6 => {}
            7 => {
                return Err(OxiArcError::invalid_config(
                    "minMatch of 7 is not supported; use 6",
                ));
            }
            other => {
                return Err(OxiArcError::invalid_config(format!(
                    "minMatch must be in 3..=6, got {other}"
                )));
            }
        }
        if self.chain_log > 30 || self.hash_log > 30 || self.window_log > 30 {
            return Err(OxiArcError::invalid_config(
                "window/hash/chain log exceeds the 30-bit position space",
            ));
        }
        if self.search_log > 30 {
            return Err(OxiArcError::invalid_config(
                "searchLog is unreasonably large",
            ));
        }
        Ok(())
    }

    /// Validate a `(searchMethod, dictMode)` combination against the legal
    /// mode matrix (§4.8): DDSS supports HashChain and Row only, never
    /// BinaryTree.
    pub fn validate_mode(search_method: SearchMethod, dict_mode: DictMode) -> Result<()> {
        if dict_mode == DictMode::DedicatedDictSearch && search_method == SearchMethod::BinaryTree
        {
            return Err(OxiArcError::invalid_config(
                "dedicatedDictSearch does not support the binary-tree match-finder",
            ));
        }
        Ok(())
    }
}
