// naming.rs — Name-based module ids
//
// Every module that sits in at least one chunk and has no id yet is named
// after its library identity (`./src/a.js`). Names shared by several modules,
// and modules without a library identity, get a `?xxxx` suffix taken from a
// digest of the shortened module identifier.
//
// Preconditions: module chunk membership is final for this build.
// Postconditions: every eligible module carries a `ModuleId::Named`; modules
//                 outside all chunks and modules with an id are untouched.
// Failure modes: none. Suffix collisions are reported as W0100 warnings
//                and left in place.
// Side effects: mutates module id slots in place.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::diag::{codes, DiagLevel, Diagnostic};
use crate::graph::{ChunkGraph, ModuleKey};
use crate::hash::{short_digest, HashFunction};
use crate::id::ModuleId;
use crate::request::Shorten;

/// Hex characters kept from the digest. Collisions are reported, not resolved.
pub const HASH_SUFFIX_LEN: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NamedModuleIdsOptions {
    /// Directory names are made relative to. Falls back to the build context.
    pub context: Option<String>,
    pub hash_function: HashFunction,
}

#[derive(Debug)]
pub struct NamingResult {
    pub assigned: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Assign named ids to every eligible module of `graph`.
pub fn assign_module_ids<S>(
    graph: &mut ChunkGraph,
    context: &str,
    shortener: &S,
    hash_function: HashFunction,
) -> NamingResult
where
    S: Shorten + ?Sized,
{
    // Group by candidate name, keeping first-seen order.
    let mut groups: Vec<(String, Vec<ModuleKey>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for key in graph.module_keys() {
        if graph.number_of_module_chunks(key) == 0 {
            continue;
        }
        let module = graph.module(key);
        if module.id.is_some() {
            continue;
        }
        let candidate = module.lib_ident(context).unwrap_or_default();
        match index.get(&candidate) {
            Some(&i) => groups[i].1.push(key),
            None => {
                index.insert(candidate.clone(), groups.len());
                groups.push((candidate, vec![key]));
            }
        }
    }

    let mut assigned = 0;
    for (candidate, members) in groups {
        if members.len() == 1 && !candidate.is_empty() {
            graph.set_module_id(members[0], ModuleId::Named(candidate));
            assigned += 1;
            continue;
        }
        for key in members {
            let shortened = shortener.shorten(&graph.module(key).identifier);
            let suffix = short_digest(&shortened, hash_function, HASH_SUFFIX_LEN);
            graph.set_module_id(key, ModuleId::Named(format!("{}?{}", candidate, suffix)));
            assigned += 1;
        }
    }

    let diagnostics = find_collisions(graph);
    tracing::debug!(
        assigned,
        collisions = diagnostics.len(),
        context,
        hash = hash_function.name(),
        "named module ids"
    );
    NamingResult {
        assigned,
        diagnostics,
    }
}

// ── Verification ─────────────────────────────────────────────────────────────

/// Machine-checkable evidence for module id postconditions (M1-M2).
#[derive(Debug, Clone)]
pub struct ModuleIdCert {
    /// M1: Every module in at least one chunk carries an id.
    pub m1_chunk_modules_named: bool,
    /// M2: Modules outside all chunks that had no id still have none.
    pub m2_chunkless_untouched: bool,
}

impl crate::pass::StageCert for ModuleIdCert {
    fn all_pass(&self) -> bool {
        self.m1_chunk_modules_named && self.m2_chunkless_untouched
    }

    fn obligations(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("M1_chunk_modules_named", self.m1_chunk_modules_named),
            ("M2_chunkless_untouched", self.m2_chunkless_untouched),
        ]
    }
}

/// Modules in no chunk and without an id. Captured before the pass so M2
/// can be checked after it.
pub fn chunkless_unassigned(graph: &ChunkGraph) -> Vec<ModuleKey> {
    graph
        .module_keys()
        .filter(|&k| graph.number_of_module_chunks(k) == 0 && graph.module(k).id.is_none())
        .collect()
}

/// Verify module id postconditions.
pub fn verify_module_ids(graph: &ChunkGraph, chunkless_before: &[ModuleKey]) -> ModuleIdCert {
    let m1 = graph
        .module_keys()
        .filter(|&k| graph.number_of_module_chunks(k) > 0)
        .all(|k| graph.module(k).id.is_some());
    let m2 = chunkless_before
        .iter()
        .all(|&k| graph.module(k).id.is_none());
    ModuleIdCert {
        m1_chunk_modules_named: m1,
        m2_chunkless_untouched: m2,
    }
}

/// Report every module whose id is already held by an earlier module.
pub fn find_collisions(graph: &ChunkGraph) -> Vec<Diagnostic> {
    let mut seen: HashMap<&ModuleId, ModuleKey> = HashMap::new();
    let mut diags = Vec::new();
    for key in graph.module_keys() {
        let Some(id) = graph.module(key).id.as_ref() else {
            continue;
        };
        if let Some(&first) = seen.get(id) {
            diags.push(
                Diagnostic::new(DiagLevel::Warning, format!("module id `{}` is not unique", id))
                    .with_code(codes::W0100)
                    .with_subject(graph.module(key).identifier.clone())
                    .with_related(graph.module(first).identifier.clone())
                    .with_hint("give one of the modules an explicit id"),
            );
        } else {
            seen.insert(id, key);
        }
    }
    diags
}
