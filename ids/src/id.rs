// id.rs — Identifier types and the ascending chunk-id allocator
//
// Module ids are either numeric or named; chunk ids are always numeric.
// "Unassigned" is represented as `None` on the node slot, never as a sentinel
// value, since 0 is a legitimate id.
//
// Preconditions: `order` contains only keys that exist in the graph.
// Postconditions: every chunk in `order` carries an id and `ids == [id]`;
//                 no two chunks in the batch share an id.
// Failure modes: none (negative or fractional ids are unrepresentable).
// Side effects: mutates chunk id slots in place.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::{ChunkGraph, ChunkKey};

/// Stable identifier for an output chunk.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChunkId(pub u32);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier for a module.
///
/// Numeric ids order before named ids, so a chunk mixing both sorts its
/// modules deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleId {
    Numeric(u32),
    Named(String),
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleId::Numeric(n) => write!(f, "{}", n),
            ModuleId::Named(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for ModuleId {
    fn from(name: &str) -> Self {
        ModuleId::Named(name.to_string())
    }
}

impl From<u32> for ModuleId {
    fn from(n: u32) -> Self {
        ModuleId::Numeric(n)
    }
}

/// Hands out the smallest chunk ids not yet in use, in call order.
///
/// With an empty used set the allocator degenerates to a plain counter,
/// which keeps the common "fresh build" case free of set lookups.
#[derive(Debug, Default)]
pub struct IdAllocator {
    used: HashSet<ChunkId>,
    next: u32,
}

impl IdAllocator {
    /// Start from a set of ids that must not be handed out.
    pub fn with_used(used: HashSet<ChunkId>) -> Self {
        IdAllocator { used, next: 0 }
    }

    pub fn alloc_chunk(&mut self) -> ChunkId {
        if !self.used.is_empty() {
            while self.used.contains(&ChunkId(self.next)) {
                self.next += 1;
            }
            self.used.insert(ChunkId(self.next));
        }
        let id = ChunkId(self.next);
        self.next += 1;
        id
    }
}

/// Assign ascending ids to the chunks in `order` that lack one.
///
/// `reserved` holds ids consumed outside this batch (e.g. by a previous
/// build's records). Ids already carried by chunks in `order` are reserved
/// too, even when they come later in the sequence. Returns the number of
/// chunks that received a fresh id.
pub fn assign_ascending_chunk_ids(
    graph: &mut ChunkGraph,
    order: &[ChunkKey],
    reserved: &HashSet<ChunkId>,
) -> usize {
    let mut used: HashSet<ChunkId> = reserved.clone();
    for &key in order {
        if let Some(id) = graph.chunk(key).id {
            used.insert(id);
        }
    }

    let mut alloc = IdAllocator::with_used(used);
    let mut assigned = 0;
    for &key in order {
        if graph.chunk(key).id.is_some() {
            continue;
        }
        let id = alloc.alloc_chunk();
        graph.set_chunk_id(key, id);
        assigned += 1;
    }
    assigned
}
