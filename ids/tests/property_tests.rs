// Property-based tests for id assignment invariants.
//
// Graphs are generated as snapshots (random groups, parents, chunk membership
// and module requests) and numbered through the public pipeline.
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use std::collections::HashSet;

use bids::diag::DiagLevel;
use bids::id::{ChunkId, ModuleId};
use bids::pass::PassId;
use bids::pipeline::{run_pipeline, CompilationState, IdsConfig};
use bids::snapshot::{ChunkSnapshot, GraphSnapshot, GroupSnapshot, IdAssignments, ModuleSnapshot};
use proptest::prelude::*;

// ── Graph generator ─────────────────────────────────────────────────────────

/// Small graphs: up to 12 modules spread over 4 request paths (so names
/// collide), up to 8 chunks, 1-4 groups with arbitrary parents.
fn arb_snapshot() -> impl Strategy<Value = GraphSnapshot> {
    (1usize..5, 0usize..12, 0usize..8)
        .prop_flat_map(|(n_groups, n_modules, n_chunks)| {
            let groups = prop::collection::vec(
                (any::<bool>(), prop::collection::vec(0..n_groups, 0..3)),
                n_groups,
            );
            let modules = prop::collection::vec((0usize..4, any::<bool>()), n_modules);
            let chunks = prop::collection::vec(
                (
                    prop::collection::vec(0..n_groups, 0..3),
                    prop::collection::vec(0usize..12, 0..5),
                ),
                n_chunks,
            );
            (groups, modules, chunks, any::<bool>())
        })
        .prop_map(|(groups, modules, chunks, prioritise_initial)| {
            let n_modules = modules.len();
            let mut snapshot = GraphSnapshot {
                context: "/app".into(),
                ..Default::default()
            };
            snapshot.config.chunk_ids.prioritise_initial = prioritise_initial;
            snapshot.groups = groups
                .into_iter()
                .enumerate()
                .map(|(i, (initial, parents))| GroupSnapshot {
                    name: format!("g{i}"),
                    initial,
                    parents,
                })
                .collect();
            snapshot.modules = modules
                .into_iter()
                .enumerate()
                .map(|(i, (path, has_request))| {
                    let request = format!("/app/src/m{path}.js");
                    ModuleSnapshot {
                        identifier: format!("t{i}|{request}"),
                        user_request: has_request.then_some(request),
                        id: None,
                    }
                })
                .collect();
            snapshot.chunks = chunks
                .into_iter()
                .enumerate()
                .map(|(i, (groups, modules))| ChunkSnapshot {
                    name: format!("c{i}"),
                    id: None,
                    groups,
                    modules: modules.into_iter().filter(|&m| m < n_modules).collect(),
                })
                .collect();
            snapshot
        })
}

fn number(snapshot: &GraphSnapshot, config: IdsConfig) -> CompilationState {
    let graph = snapshot.to_graph().expect("generated graph is well formed");
    let mut state = CompilationState::new(graph, snapshot.context.clone(), config);
    run_pipeline(&mut state, PassId::ChunkIds, |_, _| {}).expect("pipeline failed");
    state
}

fn chunk_ids(state: &CompilationState) -> Vec<u32> {
    state
        .graph
        .chunk_keys()
        .map(|k| state.graph.chunk(k).id.expect("chunk numbered").0)
        .collect()
}

// ── Chunk ids ───────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    /// Without reserved ids, N chunks get exactly 0..N.
    #[test]
    fn chunk_ids_are_dense(snapshot in arb_snapshot()) {
        let state = number(&snapshot, snapshot.config.clone());
        let mut ids = chunk_ids(&state);
        ids.sort_unstable();
        let expected: Vec<u32> = (0..snapshot.chunks.len() as u32).collect();
        prop_assert_eq!(ids, expected);
        for key in state.graph.chunk_keys() {
            let chunk = state.graph.chunk(key);
            prop_assert_eq!(chunk.ids.as_deref(), chunk.id.as_ref().map(std::slice::from_ref));
        }
    }

    /// Reserved ids are never handed out, and the ids used are the smallest
    /// free ones.
    #[test]
    fn chunk_ids_skip_reserved(
        snapshot in arb_snapshot(),
        reserved in prop::collection::hash_set(0u32..12, 0..6),
    ) {
        let mut config = snapshot.config.clone();
        config.used_chunk_ids = reserved.iter().copied().map(ChunkId).collect();
        let state = number(&snapshot, config);
        let mut ids = chunk_ids(&state);
        ids.sort_unstable();
        let expected: Vec<u32> = (0u32..)
            .filter(|id| !reserved.contains(id))
            .take(snapshot.chunks.len())
            .collect();
        prop_assert_eq!(ids, expected);
    }

    /// Chunks in more groups never get a larger id than chunks in fewer,
    /// unless initial-parent priority is on.
    #[test]
    fn more_groups_means_smaller_id(snapshot in arb_snapshot()) {
        let mut config = snapshot.config.clone();
        config.chunk_ids.prioritise_initial = false;
        let state = number(&snapshot, config);
        let graph = &state.graph;
        for a in graph.chunk_keys() {
            for b in graph.chunk_keys() {
                if graph.number_of_chunk_groups(a) > graph.number_of_chunk_groups(b) {
                    prop_assert!(graph.chunk(a).id < graph.chunk(b).id);
                }
            }
        }
    }

    // ── Module ids ──────────────────────────────────────────────────────────

    /// Modules in a chunk are named; modules outside every chunk stay bare.
    #[test]
    fn module_ids_follow_chunk_membership(snapshot in arb_snapshot()) {
        let state = number(&snapshot, snapshot.config.clone());
        let graph = &state.graph;
        for key in graph.module_keys() {
            let module = graph.module(key);
            if graph.number_of_module_chunks(key) > 0 {
                prop_assert!(matches!(module.id, Some(ModuleId::Named(_))));
            } else {
                prop_assert_eq!(&module.id, &None);
            }
        }
    }

    /// Suffix collisions are warnings only; the pipeline never errors on a
    /// well-formed graph.
    #[test]
    fn collisions_are_never_errors(snapshot in arb_snapshot()) {
        let state = number(&snapshot, snapshot.config.clone());
        prop_assert!(!state.has_error);
        prop_assert!(state.diagnostics.iter().all(|d| d.level == DiagLevel::Warning));
    }

    // ── Determinism ─────────────────────────────────────────────────────────

    /// Two runs over the same snapshot produce identical assignments.
    #[test]
    fn numbering_is_deterministic(snapshot in arb_snapshot()) {
        let first = IdAssignments::collect(&number(&snapshot, snapshot.config.clone()).graph);
        let second = IdAssignments::collect(&number(&snapshot, snapshot.config.clone()).graph);
        prop_assert_eq!(first, second);
    }

    /// Running the passes again over already-numbered output changes nothing.
    #[test]
    fn numbering_is_idempotent(snapshot in arb_snapshot()) {
        let mut state = number(&snapshot, snapshot.config.clone());
        let before = IdAssignments::collect(&state.graph);
        state.completed.clear();
        run_pipeline(&mut state, PassId::ChunkIds, |_, _| {}).expect("second run failed");
        prop_assert_eq!(before, IdAssignments::collect(&state.graph));
    }
}

// ── Fixed cases ─────────────────────────────────────────────────────────────

#[test]
fn chunk_id_uniqueness_holds_with_preexisting_ids() {
    let mut snapshot = GraphSnapshot {
        context: "/app".into(),
        ..Default::default()
    };
    for (i, id) in [None, Some(ChunkId(1)), None, Some(ChunkId(4)), None].iter().enumerate() {
        snapshot.chunks.push(ChunkSnapshot {
            name: format!("c{i}"),
            id: *id,
            ..Default::default()
        });
    }
    let state = number(&snapshot, IdsConfig::default());
    let ids = chunk_ids(&state);
    let unique: HashSet<u32> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len(), "ids: {:?}", ids);
    assert_eq!(ids[1], 1);
    assert_eq!(ids[3], 4);
}
