//! Declarative scene graph for the 3D and network views.
//!
//! Views build a [`Scene`] from state; [`Scene::diff`] turns two scenes into
//! [`ScenePatch`] operations that a [`SceneAdapter`] applies to whatever draws them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NodeShape {
    Sphere,
    Disc,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct SceneNode {
    pub id: String,
    pub shape: NodeShape,
    pub position: [f64; 3],
    pub radius: f64,
    pub color: String,
    pub scale: f64,
    pub emissive: f64,
    pub label: Option<String>,
    /// Client id carried by [`SceneEvent`]s raised on this node; `None` is inert.
    pub selects: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct SceneEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub width: f64,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scene {
    nodes: BTreeMap<String, SceneNode>,
    edges: BTreeMap<String, SceneEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(tag = "op", rename_all = "snake_case")]
#[ts(export)]
pub enum ScenePatch {
    AddNode { node: SceneNode },
    UpdateNode { node: SceneNode },
    RemoveNode { id: String },
    AddEdge { edge: SceneEdge },
    UpdateEdge { edge: SceneEdge },
    RemoveEdge { id: String },
}

/// Pointer interaction reported by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, TS)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
#[ts(export)]
pub enum SceneEvent {
    Select(String),
    HoverIn(String),
    HoverOut(String),
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: SceneNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn add_edge(&mut self, edge: SceneEdge) {
        self.edges.insert(edge.id.clone(), edge);
    }

    pub fn node(&self, id: &str) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// First node whose pointer events refer to `client_id`.
    pub fn node_selecting(&self, client_id: &str) -> Option<&SceneNode> {
        self.nodes().find(|n| n.selects.as_deref() == Some(client_id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &SceneEdge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Operations turning `self` into `next`. Removals come first, edges before nodes.
    pub fn diff(&self, next: &Scene) -> Vec<ScenePatch> {
        let mut patches = Vec::new();

        for id in self.edges.keys() {
            if !next.edges.contains_key(id) {
                patches.push(ScenePatch::RemoveEdge { id: id.clone() });
            }
        }
        for id in self.nodes.keys() {
            if !next.nodes.contains_key(id) {
                patches.push(ScenePatch::RemoveNode { id: id.clone() });
            }
        }
        for (id, node) in &next.nodes {
            match self.nodes.get(id) {
                None => patches.push(ScenePatch::AddNode { node: node.clone() }),
                Some(prev) if prev != node => {
                    patches.push(ScenePatch::UpdateNode { node: node.clone() })
                }
                Some(_) => {}
            }
        }
        for (id, edge) in &next.edges {
            match self.edges.get(id) {
                None => patches.push(ScenePatch::AddEdge { edge: edge.clone() }),
                Some(prev) if prev != edge => {
                    patches.push(ScenePatch::UpdateEdge { edge: edge.clone() })
                }
                Some(_) => {}
            }
        }
        patches
    }

    pub fn apply(&mut self, patch: &ScenePatch) {
        match patch {
            ScenePatch::AddNode { node } | ScenePatch::UpdateNode { node } => {
                self.add_node(node.clone())
            }
            ScenePatch::RemoveNode { id } => {
                self.nodes.remove(id);
            }
            ScenePatch::AddEdge { edge } | ScenePatch::UpdateEdge { edge } => {
                self.add_edge(edge.clone())
            }
            ScenePatch::RemoveEdge { id } => {
                self.edges.remove(id);
            }
        }
    }
}

pub trait SceneAdapter {
    fn apply(&mut self, patch: &ScenePatch);
}

/// Keeps every patch it receives and mirrors the resulting scene.
#[derive(Debug, Default)]
pub struct RecordingAdapter {
    patches: Vec<ScenePatch>,
    mirror: Scene,
}

impl RecordingAdapter {
    pub fn patches(&self) -> &[ScenePatch] {
        &self.patches
    }

    pub fn take_patches(&mut self) -> Vec<ScenePatch> {
        std::mem::take(&mut self.patches)
    }

    pub fn scene(&self) -> &Scene {
        &self.mirror
    }
}

impl SceneAdapter for RecordingAdapter {
    fn apply(&mut self, patch: &ScenePatch) {
        self.mirror.apply(patch);
        self.patches.push(patch.clone());
    }
}

/// Push the difference between `current` and `next` through `adapter`, then adopt `next`.
pub fn reconcile<A: SceneAdapter + ?Sized>(current: &mut Scene, next: Scene, adapter: &mut A) -> usize {
    let patches = current.diff(&next);
    for patch in &patches {
        adapter.apply(patch);
    }
    *current = next;
    patches.len()
}
