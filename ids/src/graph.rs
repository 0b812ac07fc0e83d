// graph.rs — Module/chunk graph arena consumed by the id passes
//
// Owns module, chunk and chunk-group nodes addressed by dense typed keys.
// Construction (which module lands in which chunk) belongs to the caller;
// this module only exposes the accessors the id passes need.
//
// Preconditions: keys passed to accessors were returned by this graph.
// Postconditions: module ↔ chunk membership is kept symmetric by `connect`.
// Failure modes: an out-of-range key panics (caller contract violation).
// Side effects: none.

use std::fmt;

use crate::id::{ChunkId, ModuleId};
use crate::request;

// ── Keys ────────────────────────────────────────────────────────────────────

/// Index of a module within a `ChunkGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey(pub u32);

/// Index of a chunk within a `ChunkGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey(pub u32);

/// Index of a chunk group within a `ChunkGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(pub u32);

// ── Nodes ───────────────────────────────────────────────────────────────────

/// A unit of source content.
#[derive(Debug, Clone)]
pub struct ModuleNode {
    /// Unique identifier, e.g. `javascript/auto|/app/src/a.js`.
    pub identifier: String,
    /// Request the library identity is derived from. `None` for synthetic
    /// modules (runtime, raw sources), which have no library identity.
    pub user_request: Option<String>,
    pub id: Option<ModuleId>,
    chunks: Vec<ChunkKey>,
}

impl ModuleNode {
    /// Library identity relative to `context`, e.g. `./src/a.js`.
    pub fn lib_ident(&self, context: &str) -> Option<String> {
        self.user_request
            .as_deref()
            .map(|req| request::contextify(context, req))
    }
}

/// An output bundling unit.
#[derive(Debug, Clone)]
pub struct ChunkNode {
    /// Empty for anonymous chunks.
    pub name: String,
    pub id: Option<ChunkId>,
    pub ids: Option<Vec<ChunkId>>,
    groups: Vec<GroupKey>,
    modules: Vec<ModuleKey>,
}

/// Chunks produced together for one entry or split point.
#[derive(Debug, Clone)]
pub struct ChunkGroup {
    pub name: String,
    pub is_initial: bool,
    parents: Vec<GroupKey>,
}

// ── Graph ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ChunkGraph {
    modules: Vec<ModuleNode>,
    chunks: Vec<ChunkNode>,
    groups: Vec<ChunkGroup>,
}

impl ChunkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Construction ──

    pub fn add_module(
        &mut self,
        identifier: impl Into<String>,
        user_request: Option<String>,
    ) -> ModuleKey {
        let key = ModuleKey(self.modules.len() as u32);
        self.modules.push(ModuleNode {
            identifier: identifier.into(),
            user_request,
            id: None,
            chunks: Vec::new(),
        });
        key
    }

    pub fn add_chunk(&mut self, name: impl Into<String>) -> ChunkKey {
        let key = ChunkKey(self.chunks.len() as u32);
        self.chunks.push(ChunkNode {
            name: name.into(),
            id: None,
            ids: None,
            groups: Vec::new(),
            modules: Vec::new(),
        });
        key
    }

    pub fn add_group(&mut self, name: impl Into<String>, is_initial: bool) -> GroupKey {
        let key = GroupKey(self.groups.len() as u32);
        self.groups.push(ChunkGroup {
            name: name.into(),
            is_initial,
            parents: Vec::new(),
        });
        key
    }

    /// Record `module` as a member of `chunk` (both directions). Idempotent.
    pub fn connect_chunk_and_module(&mut self, chunk: ChunkKey, module: ModuleKey) {
        let c = &mut self.chunks[chunk.0 as usize];
        if c.modules.contains(&module) {
            return;
        }
        c.modules.push(module);
        self.modules[module.0 as usize].chunks.push(chunk);
    }

    /// Record `chunk` as part of `group`. Idempotent.
    pub fn connect_chunk_and_group(&mut self, chunk: ChunkKey, group: GroupKey) {
        let c = &mut self.chunks[chunk.0 as usize];
        if !c.groups.contains(&group) {
            c.groups.push(group);
        }
    }

    pub fn add_group_parent(&mut self, group: GroupKey, parent: GroupKey) {
        let g = &mut self.groups[group.0 as usize];
        if !g.parents.contains(&parent) {
            g.parents.push(parent);
        }
    }

    // ── Accessors ──

    pub fn module(&self, key: ModuleKey) -> &ModuleNode {
        &self.modules[key.0 as usize]
    }

    pub fn chunk(&self, key: ChunkKey) -> &ChunkNode {
        &self.chunks[key.0 as usize]
    }

    pub fn group(&self, key: GroupKey) -> &ChunkGroup {
        &self.groups[key.0 as usize]
    }

    pub fn module_keys(&self) -> impl Iterator<Item = ModuleKey> {
        (0..self.modules.len() as u32).map(ModuleKey)
    }

    pub fn chunk_keys(&self) -> impl Iterator<Item = ChunkKey> {
        (0..self.chunks.len() as u32).map(ChunkKey)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn number_of_module_chunks(&self, key: ModuleKey) -> usize {
        self.module(key).chunks.len()
    }

    pub fn number_of_chunk_groups(&self, key: ChunkKey) -> usize {
        self.chunk(key).groups.len()
    }

    /// Number of initial parent groups across every group `chunk` belongs to.
    /// A parent shared by two groups counts twice.
    pub fn initial_parent_occurrences(&self, key: ChunkKey) -> usize {
        self.chunk(key)
            .groups
            .iter()
            .flat_map(|&g| self.group(g).parents.iter())
            .filter(|&&p| self.group(p).is_initial)
            .count()
    }

    /// Ids of the modules in `chunk`, sorted ascending. Modules without an id
    /// sort first.
    pub fn ordered_chunk_module_ids(&self, key: ChunkKey) -> Vec<Option<&ModuleId>> {
        let mut ids: Vec<Option<&ModuleId>> = self
            .chunk(key)
            .modules
            .iter()
            .map(|&m| self.module(m).id.as_ref())
            .collect();
        ids.sort();
        ids
    }

    // ── Mutation of id slots ──

    pub fn set_module_id(&mut self, key: ModuleKey, id: ModuleId) {
        self.modules[key.0 as usize].id = Some(id);
    }

    /// Set the chunk's id and its single-element id list.
    pub fn set_chunk_id(&mut self, key: ChunkKey, id: ChunkId) {
        let chunk = &mut self.chunks[key.0 as usize];
        chunk.id = Some(id);
        chunk.ids = Some(vec![id]);
    }
}

impl fmt::Display for ChunkGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "graph: {} modules, {} chunks, {} groups",
            self.module_count(),
            self.chunk_count(),
            self.group_count()
        )?;
        for (i, chunk) in self.chunks.iter().enumerate() {
            write!(f, "  chunk #{}", i)?;
            if !chunk.name.is_empty() {
                write!(f, " {}", chunk.name)?;
            }
            writeln!(
                f,
                " ({} modules, {} groups)",
                chunk.modules.len(),
                chunk.groups.len()
            )?;
        }
        Ok(())
    }
}
