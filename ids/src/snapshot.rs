// snapshot.rs — JSON graph snapshots and id assignment records
//
// A snapshot is the serialized form of a `ChunkGraph` plus the build context
// and id options, as handed over by the orchestrator. Nodes refer to each
// other by position in their list. `IdAssignments` is the pass output in the
// same positional order.
//
// Preconditions: none.
// Postconditions: `to_graph` returns a graph whose keys equal list positions.
// Failure modes: malformed JSON, references past the end of a list.
// Side effects: none (callers read and write files).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::{ChunkGraph, ChunkKey, GroupKey, ModuleKey};
use crate::id::{ChunkId, ModuleId};
use crate::pipeline::IdsConfig;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{owner} refers to {kind} #{index}, but only {len} exist")]
    DanglingReference {
        owner: String,
        kind: &'static str,
        index: usize,
        len: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphSnapshot {
    /// Build context directory module names are made relative to.
    pub context: String,
    pub config: IdsConfig,
    pub modules: Vec<ModuleSnapshot>,
    pub chunks: Vec<ChunkSnapshot>,
    pub groups: Vec<GroupSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModuleSnapshot {
    pub identifier: String,
    pub user_request: Option<String>,
    pub id: Option<ModuleId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChunkSnapshot {
    pub name: String,
    pub id: Option<ChunkId>,
    pub groups: Vec<usize>,
    pub modules: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupSnapshot {
    pub name: String,
    pub initial: bool,
    pub parents: Vec<usize>,
}

fn check_ref(
    owner: impl FnOnce() -> String,
    kind: &'static str,
    index: usize,
    len: usize,
) -> Result<(), SnapshotError> {
    if index < len {
        Ok(())
    } else {
        Err(SnapshotError::DanglingReference {
            owner: owner(),
            kind,
            index,
            len,
        })
    }
}

impl GraphSnapshot {
    pub fn from_json(source: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Build the graph arena. Pre-existing ids are carried over.
    pub fn to_graph(&self) -> Result<ChunkGraph, SnapshotError> {
        let mut graph = ChunkGraph::new();

        for module in &self.modules {
            let key = graph.add_module(module.identifier.clone(), module.user_request.clone());
            if let Some(id) = &module.id {
                graph.set_module_id(key, id.clone());
            }
        }

        for group in &self.groups {
            graph.add_group(group.name.clone(), group.initial);
        }
        for (i, group) in self.groups.iter().enumerate() {
            for &parent in &group.parents {
                check_ref(|| format!("group `{}`", group.name), "group", parent, self.groups.len())?;
                graph.add_group_parent(GroupKey(i as u32), GroupKey(parent as u32));
            }
        }

        for chunk in &self.chunks {
            let key = graph.add_chunk(chunk.name.clone());
            if let Some(id) = chunk.id {
                graph.set_chunk_id(key, id);
            }
            for &g in &chunk.groups {
                check_ref(|| format!("chunk `{}`", chunk.name), "group", g, self.groups.len())?;
                graph.connect_chunk_and_group(key, GroupKey(g as u32));
            }
            for &m in &chunk.modules {
                check_ref(|| format!("chunk `{}`", chunk.name), "module", m, self.modules.len())?;
                graph.connect_chunk_and_module(key, ModuleKey(m as u32));
            }
        }

        Ok(graph)
    }
}

// ── Assignment records ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleAssignment {
    pub identifier: String,
    pub id: Option<ModuleId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkAssignment {
    pub name: String,
    pub id: Option<ChunkId>,
    pub ids: Option<Vec<ChunkId>>,
}

/// Every node's id after the passes, in graph order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdAssignments {
    pub modules: Vec<ModuleAssignment>,
    pub chunks: Vec<ChunkAssignment>,
}

impl IdAssignments {
    pub fn collect(graph: &ChunkGraph) -> Self {
        let modules = graph
            .module_keys()
            .map(|k| {
                let m = graph.module(k);
                ModuleAssignment {
                    identifier: m.identifier.clone(),
                    id: m.id.clone(),
                }
            })
            .collect();
        let chunks = graph
            .chunk_keys()
            .map(|k: ChunkKey| {
                let c = graph.chunk(k);
                ChunkAssignment {
                    name: c.name.clone(),
                    id: c.id,
                    ids: c.ids.clone(),
                }
            })
            .collect();
        IdAssignments { modules, chunks }
    }

    /// Compact JSON, stable for identical assignments.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for IdAssignments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "modules:")?;
        for m in &self.modules {
            match &m.id {
                Some(id) => writeln!(f, "  {} <- {}", id, m.identifier)?,
                None => writeln!(f, "  - <- {}", m.identifier)?,
            }
        }
        writeln!(f, "chunks:")?;
        for c in &self.chunks {
            let id = c.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into());
            if c.name.is_empty() {
                writeln!(f, "  {}", id)?;
            } else {
                writeln!(f, "  {} {}", id, c.name)?;
            }
        }
        Ok(())
    }
}
