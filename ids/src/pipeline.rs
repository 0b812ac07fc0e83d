// pipeline.rs — Compilation state and id pass orchestration
//
// Holds the chunk graph and id configuration, runs the minimal set of passes
// for a given terminal PassId, and checks each pass's certificate.
//
// Preconditions: the graph's chunk membership and chunk groups are final.
// Postconditions: id slots for all required passes are populated, or has_error is set.
// Failure modes: a pass certificate failing (error diagnostic + PipelineError).
// Side effects: mutates the graph's id slots; calls on_pass_complete after each pass.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::diag::{codes, DiagLevel, Diagnostic};
use crate::graph::ChunkGraph;
use crate::hash::{digest, HashFunction};
use crate::id::ChunkId;
use crate::naming::{self, NamedModuleIdsOptions};
use crate::occurrence::{self, OccurrenceChunkIdsOptions};
use crate::pass::{descriptor, required_passes, PassId, StageCert};
use crate::request::RequestShortener;
use crate::snapshot::IdAssignments;

// ── Configuration ──────────────────────────────────────────────────────────

/// Options for both id passes. Every field may be omitted in JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IdsConfig {
    pub naming: NamedModuleIdsOptions,
    pub chunk_ids: OccurrenceChunkIdsOptions,
    /// Chunk ids consumed outside this build (e.g. by records of an earlier one).
    pub used_chunk_ids: Vec<ChunkId>,
    /// Files whose change invalidates cached ids.
    pub build_dependencies: Vec<String>,
}

// ── State ──────────────────────────────────────────────────────────────────

/// The graph being numbered plus everything the passes read or report.
///
/// Built by taking an `IdsConfig` apart; each setting lives in exactly one
/// field afterwards.
pub struct CompilationState {
    pub graph: ChunkGraph,
    /// Build context directory.
    pub context: String,
    pub naming: NamedModuleIdsOptions,
    pub chunk_ids: OccurrenceChunkIdsOptions,
    pub used_chunk_ids: HashSet<ChunkId>,
    pub build_dependencies: BTreeSet<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub has_error: bool,
    pub completed: Vec<PassId>,
}

impl CompilationState {
    pub fn new(graph: ChunkGraph, context: impl Into<String>, config: IdsConfig) -> Self {
        let IdsConfig {
            naming,
            chunk_ids,
            used_chunk_ids,
            build_dependencies,
        } = config;
        Self {
            graph,
            context: context.into(),
            naming,
            chunk_ids,
            used_chunk_ids: used_chunk_ids.into_iter().collect(),
            build_dependencies: build_dependencies.into_iter().collect(),
            diagnostics: Vec::new(),
            has_error: false,
            completed: Vec::new(),
        }
    }

    pub fn add_build_dependencies<I, S>(&mut self, deps: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_dependencies
            .extend(deps.into_iter().map(Into::into));
    }

    /// Context the naming pass uses: its own override, else the build context.
    pub fn naming_context(&self) -> &str {
        self.naming.context.as_deref().unwrap_or(&self.context)
    }
}

// ── Error type ─────────────────────────────────────────────────────────────

/// Pipeline execution failed due to error-level diagnostics in a pass.
/// The specific diagnostics are available in `CompilationState.diagnostics`.
#[derive(Debug)]
pub struct PipelineError {
    /// The pass that produced the error.
    pub failing_pass: PassId,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pass failed", descriptor(self.failing_pass).name)
    }
}

impl std::error::Error for PipelineError {}

// ── Pass bookkeeping ───────────────────────────────────────────────────────

fn has_error_diags(diags: &[Diagnostic]) -> bool {
    diags.iter().any(|d| d.level == DiagLevel::Error)
}

/// Per-pass post-processing: callback, accumulate, log, error check.
fn finish_pass(
    state: &mut CompilationState,
    pass_id: PassId,
    diags: Vec<Diagnostic>,
    elapsed: Duration,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    on_pass_complete(pass_id, &diags);
    let is_err = has_error_diags(&diags);
    tracing::debug!(
        pass = descriptor(pass_id).name,
        diagnostics = diags.len(),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "pass complete"
    );
    state.diagnostics.extend(diags);
    if is_err {
        state.has_error = true;
        return Err(PipelineError {
            failing_pass: pass_id,
        });
    }
    state.completed.push(pass_id);
    Ok(())
}

/// Turn a failed certificate into an error diagnostic.
fn cert_diagnostic(
    cert: &impl StageCert,
    pass_id: PassId,
    what: &str,
    code: crate::diag::DiagCode,
) -> Diagnostic {
    Diagnostic::new(
        DiagLevel::Error,
        format!("{} verification failed: {}", what, cert.failed().join(", ")),
    )
    .with_code(code)
    .with_hint(format!("expected {}", descriptor(pass_id).invariants))
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run the minimal set of passes to produce `terminal`.
///
/// Per-pass sequence: execute → verify → on_pass_complete(callback) → error check.
pub fn run_pipeline(
    state: &mut CompilationState,
    terminal: PassId,
    mut on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    for pass_id in required_passes(terminal) {
        match pass_id {
            PassId::ModuleIds => {
                let t = Instant::now();
                let chunkless = naming::chunkless_unassigned(&state.graph);
                let context = state.naming_context().to_string();
                let shortener = RequestShortener::new(&context);
                let result = naming::assign_module_ids(
                    &mut state.graph,
                    &context,
                    &shortener,
                    state.naming.hash_function,
                );
                let mut diags = result.diagnostics;
                let cert = naming::verify_module_ids(&state.graph, &chunkless);
                if !cert.all_pass() {
                    diags.push(cert_diagnostic(&cert, pass_id, "module id", codes::E0600));
                }
                let elapsed = t.elapsed();
                finish_pass(state, pass_id, diags, elapsed, &mut on_pass_complete)?;
            }
            PassId::ChunkIds => {
                let t = Instant::now();
                occurrence::assign_chunk_ids(
                    &mut state.graph,
                    &state.chunk_ids,
                    &state.used_chunk_ids,
                );
                let cert = occurrence::verify_chunk_ids(&state.graph);
                let diags = if cert.all_pass() {
                    Vec::new()
                } else {
                    vec![cert_diagnostic(&cert, pass_id, "chunk id", codes::E0601)]
                };
                let elapsed = t.elapsed();
                finish_pass(state, pass_id, diags, elapsed, &mut on_pass_complete)?;
            }
        }
    }
    Ok(())
}

// ── Build info ─────────────────────────────────────────────────────────────

/// Record of one id assignment run, for cache keys and reproducibility checks.
///
/// `ids_fingerprint`: SHA-256 of `IdAssignments::canonical_json()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub ids_fingerprint: String,
    pub module_count: usize,
    pub chunk_count: usize,
    pub hash_function: HashFunction,
    pub build_dependencies: Vec<String>,
    pub version: String,
}

impl BuildInfo {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub fn compute_build_info(state: &CompilationState) -> Result<BuildInfo, serde_json::Error> {
    let canonical = IdAssignments::collect(&state.graph).canonical_json()?;
    Ok(BuildInfo {
        ids_fingerprint: digest(&canonical, HashFunction::Sha256),
        module_count: state.graph.module_count(),
        chunk_count: state.graph.chunk_count(),
        hash_function: state.naming.hash_function,
        build_dependencies: state.build_dependencies.iter().cloned().collect(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ChunkKey;
    use crate::id::ModuleId;

    fn sample_graph() -> ChunkGraph {
        let mut g = ChunkGraph::new();
        let entry = g.add_group("main", true);
        let lazy = g.add_group("lazy", false);
        g.add_group_parent(lazy, entry);
        let main = g.add_chunk("main");
        let async_chunk = g.add_chunk("async");
        g.connect_chunk_and_group(main, entry);
        g.connect_chunk_and_group(async_chunk, lazy);
        let index = g.add_module("js|/app/src/index.js", Some("/app/src/index.js".into()));
        let page = g.add_module("js|/app/src/page.js", Some("/app/src/page.js".into()));
        g.add_module("js|/app/src/dead.js", Some("/app/src/dead.js".into()));
        g.connect_chunk_and_module(main, index);
        g.connect_chunk_and_module(async_chunk, page);
        g
    }

    #[test]
    fn runs_both_passes_in_order() {
        let mut state = CompilationState::new(sample_graph(), "/app", IdsConfig::default());
        let mut seen = Vec::new();
        run_pipeline(&mut state, PassId::ChunkIds, |pass, _| seen.push(pass)).unwrap();
        assert_eq!(seen, vec![PassId::ModuleIds, PassId::ChunkIds]);
        assert_eq!(state.completed, seen);
        assert!(!state.has_error);
        assert_eq!(
            state.graph.module(crate::graph::ModuleKey(0)).id,
            Some(ModuleId::from("./src/index.js"))
        );
        assert_eq!(state.graph.module(crate::graph::ModuleKey(2)).id, None);
    }

    #[test]
    fn module_pass_alone_leaves_chunks_unnumbered() {
        let mut state = CompilationState::new(sample_graph(), "/app", IdsConfig::default());
        run_pipeline(&mut state, PassId::ModuleIds, |_, _| {}).unwrap();
        assert!(state.graph.chunk(ChunkKey(0)).id.is_none());
    }

    #[test]
    fn naming_context_override() {
        let config = IdsConfig {
            naming: NamedModuleIdsOptions {
                context: Some("/app/src".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut state = CompilationState::new(sample_graph(), "/app", config);
        run_pipeline(&mut state, PassId::ModuleIds, |_, _| {}).unwrap();
        assert_eq!(
            state.graph.module(crate::graph::ModuleKey(1)).id,
            Some(ModuleId::from("./page.js"))
        );
    }

    #[test]
    fn used_chunk_ids_from_config_are_skipped() {
        let config = IdsConfig {
            used_chunk_ids: vec![ChunkId(0)],
            ..Default::default()
        };
        let mut state = CompilationState::new(sample_graph(), "/app", config);
        run_pipeline(&mut state, PassId::ChunkIds, |_, _| {}).unwrap();
        let mut ids: Vec<u32> = state
            .graph
            .chunk_keys()
            .map(|k| state.graph.chunk(k).id.unwrap().0)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn config_settings_have_a_single_home_in_state() {
        let config = IdsConfig {
            used_chunk_ids: vec![ChunkId(0)],
            build_dependencies: vec!["/app/package.json".into()],
            ..Default::default()
        };
        let mut state = CompilationState::new(sample_graph(), "/app", config);
        // Later edits to the state are what the passes and build info see.
        state.used_chunk_ids.insert(ChunkId(1));
        state.build_dependencies.clear();
        run_pipeline(&mut state, PassId::ChunkIds, |_, _| {}).unwrap();
        let mut ids: Vec<u32> = state
            .graph
            .chunk_keys()
            .map(|k| state.graph.chunk(k).id.unwrap().0)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![2, 3]);
        assert!(compute_build_info(&state).unwrap().build_dependencies.is_empty());
    }

    #[test]
    fn duplicate_preexisting_chunk_ids_fail_certificate() {
        let mut graph = sample_graph();
        graph.set_chunk_id(ChunkKey(0), ChunkId(5));
        graph.set_chunk_id(ChunkKey(1), ChunkId(5));
        let mut state = CompilationState::new(graph, "/app", IdsConfig::default());
        let err = run_pipeline(&mut state, PassId::ChunkIds, |_, _| {}).unwrap_err();
        assert_eq!(err.failing_pass, PassId::ChunkIds);
        assert_eq!(err.to_string(), "chunk_ids pass failed");
        assert!(state.has_error);
        let diag = state.diagnostics.last().unwrap();
        assert_eq!(diag.code, Some(codes::E0601));
        assert_eq!(
            diag.message,
            "chunk id verification failed: C2_ids_unique"
        );
        assert_eq!(
            diag.hint.as_deref(),
            Some("expected every chunk numbered, ids unique, ids list mirrors id")
        );
    }

    #[test]
    fn build_info_is_stable_and_tracks_dependencies() {
        let run = || {
            let mut state = CompilationState::new(sample_graph(), "/app", IdsConfig::default());
            state.add_build_dependencies(["/app/package.json", "/app/bundler.config.js"]);
            run_pipeline(&mut state, PassId::ChunkIds, |_, _| {}).unwrap();
            compute_build_info(&state).unwrap()
        };
        let first = run();
        let second = run();
        assert_eq!(first, second);
        assert_eq!(first.ids_fingerprint.len(), 64);
        assert_eq!(
            first.build_dependencies,
            vec!["/app/bundler.config.js", "/app/package.json"]
        );
        assert!(first.to_json().unwrap().contains("\"idsFingerprint\""));
    }
}
