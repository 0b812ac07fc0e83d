// occurrence.rs — Occurrence-ordered chunk ids
//
// Chunks that appear in more chunk groups (optionally: under more initial
// parents) get smaller ids. Remaining ties are broken by the chunk's module
// ids, so module ids must be assigned before this pass runs.
//
// Preconditions: module ids are final; chunk group membership is final.
// Postconditions: every chunk carries an id and `ids == [id]`; ids are unique
//                 within the batch and disjoint from `reserved`.
// Failure modes: none.
// Side effects: mutates chunk id slots in place.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::graph::{ChunkGraph, ChunkKey};
use crate::id::{assign_ascending_chunk_ids, ChunkId, ModuleId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OccurrenceChunkIdsOptions {
    /// Rank chunks reachable from more initial chunk groups first.
    pub prioritise_initial: bool,
}

/// Sort every chunk of `graph` into id order. The sort is stable, so chunks
/// that compare equal keep their graph order.
pub fn chunks_in_occurrence_order(
    graph: &ChunkGraph,
    options: &OccurrenceChunkIdsOptions,
) -> Vec<ChunkKey> {
    let occurs_in_initial: HashMap<ChunkKey, usize> = graph
        .chunk_keys()
        .map(|c| (c, graph.initial_parent_occurrences(c)))
        .collect();
    // Module-id lists are built and sorted once per chunk, not per comparison.
    let module_ids: HashMap<ChunkKey, Vec<Option<&ModuleId>>> = graph
        .chunk_keys()
        .map(|c| (c, graph.ordered_chunk_module_ids(c)))
        .collect();

    let mut order: Vec<ChunkKey> = graph.chunk_keys().collect();
    order.sort_by(|&a, &b| {
        if options.prioritise_initial {
            let by_initial = occurs_in_initial[&b].cmp(&occurs_in_initial[&a]);
            if by_initial != Ordering::Equal {
                return by_initial;
            }
        }
        // Element-wise on the sorted lists; a prefix sorts first.
        graph
            .number_of_chunk_groups(b)
            .cmp(&graph.number_of_chunk_groups(a))
            .then_with(|| module_ids[&a].cmp(&module_ids[&b]))
    });
    order
}

/// Order the chunks of `graph` and give each one lacking an id the smallest
/// free id. Returns the number of chunks that received a fresh id.
pub fn assign_chunk_ids(
    graph: &mut ChunkGraph,
    options: &OccurrenceChunkIdsOptions,
    reserved: &HashSet<ChunkId>,
) -> usize {
    let order = chunks_in_occurrence_order(graph, options);
    let assigned = assign_ascending_chunk_ids(graph, &order, reserved);
    tracing::debug!(
        chunks = order.len(),
        assigned,
        reserved = reserved.len(),
        prioritise_initial = options.prioritise_initial,
        "occurrence chunk ids"
    );
    assigned
}

// ── Verification ─────────────────────────────────────────────────────────────

/// Machine-checkable evidence for chunk id postconditions (C1-C3).
#[derive(Debug, Clone)]
pub struct ChunkIdCert {
    /// C1: Every chunk carries an id.
    pub c1_all_chunks_numbered: bool,
    /// C2: No two chunks share an id.
    pub c2_ids_unique: bool,
    /// C3: Every chunk's id list is exactly `[id]`.
    pub c3_id_lists_mirror_ids: bool,
}

impl crate::pass::StageCert for ChunkIdCert {
    fn all_pass(&self) -> bool {
        self.c1_all_chunks_numbered && self.c2_ids_unique && self.c3_id_lists_mirror_ids
    }

    fn obligations(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("C1_all_chunks_numbered", self.c1_all_chunks_numbered),
            ("C2_ids_unique", self.c2_ids_unique),
            ("C3_id_lists_mirror_ids", self.c3_id_lists_mirror_ids),
        ]
    }
}

/// Verify chunk id postconditions.
pub fn verify_chunk_ids(graph: &ChunkGraph) -> ChunkIdCert {
    let c1 = graph.chunk_keys().all(|k| graph.chunk(k).id.is_some());
    let mut seen = HashSet::new();
    let c2 = graph
        .chunk_keys()
        .filter_map(|k| graph.chunk(k).id)
        .all(|id| seen.insert(id));
    let c3 = graph.chunk_keys().all(|k| {
        let chunk = graph.chunk(k);
        match (chunk.id, chunk.ids.as_deref()) {
            (Some(id), Some(ids)) => ids == [id],
            (None, None) => true,
            _ => false,
        }
    });
    ChunkIdCert {
        c1_all_chunks_numbered: c1,
        c2_ids_unique: c2,
        c3_id_lists_mirror_ids: c3,
    }
}
