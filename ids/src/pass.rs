// pass.rs — Pass descriptor module: metadata and dependency resolution
//
// Declares the id passes and their dependency edges. Chunk ids break ties on module ids, so the chunk pass depends on
// the module pass; the runner never orders them the other way round.

use std::collections::HashSet;

// ── Pass identifiers ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    ModuleIds,
    ChunkIds,
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about an id pass.
pub struct PassDescriptor {
    /// Human-readable name for diagnostics/verbose output.
    pub name: &'static str,
    /// Pass dependencies (other passes whose outputs this pass consumes).
    pub inputs: &'static [PassId],
    /// Postconditions, checked by the pass certificate.
    pub invariants: &'static str,
}

/// Return the static descriptor for a given pass.
pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::ModuleIds => PassDescriptor {
            name: "module_ids",
            inputs: &[],
            invariants: "every module in a chunk named, chunkless modules untouched",
        },
        PassId::ChunkIds => PassDescriptor {
            name: "chunk_ids",
            inputs: &[PassId::ModuleIds],
            invariants: "every chunk numbered, ids unique, ids list mirrors id",
        },
    }
}

/// Machine-checkable evidence for a pass's postconditions.
pub trait StageCert {
    fn all_pass(&self) -> bool;

    /// Each obligation's name and whether it held.
    fn obligations(&self) -> Vec<(&'static str, bool)>;

    /// Names of the obligations that failed.
    fn failed(&self) -> Vec<&'static str> {
        self.obligations()
            .into_iter()
            .filter(|(_, ok)| !ok)
            .map(|(name, _)| name)
            .collect()
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// All pass IDs in declaration order (used for iteration).
pub const ALL_PASSES: [PassId; 2] = [PassId::ModuleIds, PassId::ChunkIds];

/// Compute the minimal ordered set of passes needed to produce `terminal`.
/// Returns passes in topological (execution) order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────
