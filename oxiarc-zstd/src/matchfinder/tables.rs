//! Table layouts backing the three match-finders and DDSS (§3 "Hash
//! tables", §9 "Replacing sentinel-in-value with tagging").
//!
//! Every table stores 32-bit positions, never pointers, so a table can be
//! reused verbatim across window slides (§5: "tables are not cleared but
//! the search predicate renders stale entries harmless").

/// Single-bucket hash table plus linear chain, backing the hash-chain
/// match-finder (§3 "HC layout").
#[derive(Debug, Clone)]
pub struct HashChainTable {
    hash_table: Vec<u32>,
    chain_table: Vec<u32>,
    chain_mask: u32,
    /// Lowest position not yet folded into the tables.
    pub next_to_update: u32,
}

impl HashChainTable {
    pub fn new(hash_log: u32, chain_log: u32) -> Self {
        HashChainTable {
            hash_table: vec![0; 1usize << hash_log],
            chain_table: vec![0; 1usize << chain_log],
            chain_mask: (1u32 << chain_log) - 1,
            next_to_update: 0,
        }
    }

    pub fn head(&self, hash: u32) -> u32 {
        self.hash_table[hash as usize]
    }

    /// Insert `pos` under `hash`, pushing the prior head into the chain
    /// slot for `pos`. Returns the previous head (the new chain
    /// predecessor of `pos`).
    pub fn insert(&mut self, hash: u32, pos: u32) -> u32 {
        let prev = self.hash_table[hash as usize];
        self.chain_table[(pos & self.chain_mask) as usize] = prev;
        self.hash_table[hash as usize] = pos;
        prev
    }

    pub fn predecessor(&self, pos: u32) -> u32 {
        self.chain_table[(pos & self.chain_mask) as usize]
    }

    pub fn chain_mask(&self) -> u32 {
        self.chain_mask
    }
}

/// Double binary tree, backing the BT match-finder (§3 "BT layout", §4.3).
///
/// A position absent from the tree (not yet sorted) is represented by
/// [`TreeChild::Unsorted`] rather than a reserved position value — the
/// enum removes the "real index equal to sentinel" hazard the reference
/// works around with a magic constant (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeChild {
    /// No child, or not yet sorted into the tree.
    Unsorted,
    /// A child at this position.
    Position(u32),
}

impl TreeChild {
    pub fn position(self) -> Option<u32> {
        match self {
            TreeChild::Unsorted => None,
            TreeChild::Position(p) => Some(p),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TreeNode {
    smaller: TreeChild,
    larger: TreeChild,
}

#[derive(Debug, Clone)]
pub struct BinaryTreeTable {
    hash_table: Vec<u32>,
    nodes: Vec<TreeNode>,
    tree_mask: u32,
    pub next_to_update: u32,
}

impl BinaryTreeTable {
    pub fn new(hash_log: u32, chain_log: u32) -> Self {
        let size = 1usize << chain_log;
        BinaryTreeTable {
            hash_table: vec![0; 1usize << hash_log],
            nodes: vec![
                TreeNode {
                    smaller: TreeChild::Unsorted,
                    larger: TreeChild::Unsorted
                };
                size
            ],
            tree_mask: (size as u32) - 1,
            next_to_update: 0,
        }
    }

    pub fn head(&self, hash: u32) -> u32 {
        self.hash_table[hash as usize]
    }

    pub fn set_head(&mut self, hash: u32, pos: u32) {
        self.hash_table[hash as usize] = pos;
    }

    fn slot(&self, pos: u32) -> usize {
        (pos & self.tree_mask) as usize
    }

    /// Insertion-time bookkeeping (§4.3 "Insert (catch-up)"): remember the
    /// previous bucket head as `pos`'s smaller child and mark `pos`
    /// unsorted in its larger child, deferring the real tree insertion.
    pub fn defer_insert(&mut self, hash: u32, pos: u32) {
        let prev_head = self.hash_table[hash as usize];
        let slot = self.slot(pos);
        self.nodes[slot] = TreeNode {
            smaller: TreeChild::Position(prev_head),
            larger: TreeChild::Unsorted,
        };
        self.hash_table[hash as usize] = pos;
    }

    pub fn smaller(&self, pos: u32) -> TreeChild {
        self.nodes[self.slot(pos)].smaller
    }

    pub fn larger(&self, pos: u32) -> TreeChild {
        self.nodes[self.slot(pos)].larger
    }

    pub fn set_smaller(&mut self, pos: u32, child: TreeChild) {
        let slot = self.slot(pos);
        self.nodes[slot].smaller = child;
    }

    pub fn set_larger(&mut self, pos: u32, child: TreeChild) {
        let slot = self.slot(pos);
        self.nodes[slot].larger = child;
    }

    pub fn tree_mask(&self) -> u32 {
        self.tree_mask
    }
}

/// Row-bucketed hash table with a SIMD-comparable tag pre-filter (§3 "Row
/// layout", §4.4).
#[derive(Debug, Clone)]
pub struct RowTable {
    /// `rowEntries * 2^nbRows` positions, laid out row-major.
    entries: Vec<u32>,
    /// One tag byte per slot, same layout as `entries`.
    tags: Vec<u8>,
    /// One circular head index per row.
    heads: Vec<u8>,
    row_entries: u32,
    num_rows: u32,
    pub next_to_update: u32,
}

impl RowTable {
    pub fn new(hash_log: u32, row_log: u32, row_entries: u32) -> Self {
        let num_rows = 1u32 << (hash_log - row_log);
        RowTable {
            entries: vec![0; (row_entries * num_rows) as usize],
            tags: vec![0; (row_entries * num_rows) as usize],
            heads: vec![0; num_rows as usize],
            row_entries,
            num_rows,
            next_to_update: 0,
        }
    }

    pub fn num_rows(&self) -> u32 {
        self.num_rows
    }

    pub fn row_entries(&self) -> u32 {
        self.row_entries
    }

    pub fn head(&self, row: u32) -> u8 {
        self.heads[row as usize]
    }

    fn slot(&self, row: u32, entry: u8) -> usize {
        (row * self.row_entries + entry as u32) as usize
    }

    /// Row-major tag vector for `row`, in raw storage order (slot 0 first),
    /// used by the scalar/SIMD mask comparators (§4.4, §8 invariant 7).
    pub fn tag_row(&self, row: u32) -> &[u8] {
        let start = (row * self.row_entries) as usize;
        &self.tags[start..start + self.row_entries as usize]
    }

    pub fn position_at(&self, row: u32, entry: u8) -> u32 {
        self.entries[self.slot(row, entry)]
    }

    /// Insert `pos` into `row` under `tag`: the head decrements (circular,
    /// §4.4) and the new head slot receives `pos`/`tag`.
    pub fn insert(&mut self, row: u32, tag: u8, pos: u32) {
        let row_entries = self.row_entries as u8;
        let new_head = self.heads[row as usize].wrapping_sub(1) % row_entries;
        self.heads[row as usize] = new_head;
        let slot = self.slot(row, new_head);
        self.entries[slot] = pos;
        self.tags[slot] = tag;
    }
}

/// Dedicated-dictionary-search bucketed layout (§3 "DDSS layout", §4.5).
///
/// Each bucket holds up to `bucket_size - 1` direct positions; the bucket's
/// last slot packs `(chain_start << 8) | chain_len` pointing into the
/// shared tail region.
#[derive(Debug, Clone)]
pub struct DedicatedDictTable {
    hash_table: Vec<u32>,
    chain_table: Vec<u8>,
    bucket_size: u32,
}

impl DedicatedDictTable {
    pub fn new(hash_log: u32, bucket_log: u32, chain_table_len: usize) -> Self {
        DedicatedDictTable {
            hash_table: vec![0; 1usize << hash_log],
            chain_table: vec![0; chain_table_len],
            bucket_size: 1u32 << bucket_log,
        }
    }

    pub fn bucket_size(&self) -> u32 {
        self.bucket_size
    }

    fn bucket_start(&self, hash: u32) -> usize {
        (hash * self.bucket_size) as usize
    }

    /// Direct slots of the bucket: up to `bucket_size - 1` entries.
    pub fn direct_slots(&self, hash: u32) -> &[u32] {
        let start = self.bucket_start(hash);
        &self.hash_table[start..start + (self.bucket_size - 1) as usize]
    }

    /// The packed `(chainStartIndex, chainLen)` stored in the bucket's
    /// last slot.
    pub fn packed_tail(&self, hash: u32) -> (u32, u8) {
        let packed = self.hash_table[self.bucket_start(hash) + (self.bucket_size - 1) as usize];
        (packed >> 8, (packed & 0xFF) as u8)
    }

    pub fn set_direct_slot(&mut self, hash: u32, index: u32, pos: u32) {
        let slot = self.bucket_start(hash) + index as usize;
        self.hash_table[slot] = pos;
    }

    pub fn set_packed_tail(&mut self, hash: u32, chain_start: u32, chain_len: u8) {
        let slot = self.bucket_start(hash) + (self.bucket_size - 1) as usize;
        self.hash_table[slot] = (chain_start << 8) | chain_len as u32;
    }

    pub fn chain_byte(&self, index: u32) -> u8 {
        self.chain_table[index as usize]
    }

    pub fn set_chain_byte(&mut self, index: u32, value: u8) {
        self.chain_table[index as usize] = value;
    }
}
