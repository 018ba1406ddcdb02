//! Trust rings: the queried client, its similar clients and their second-order links.

use std::{collections::HashMap, f64::consts::TAU};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;
use ts_rs::TS;

use crate::{
    api::types::{NetworkBuildRequest, NetworkLink, NetworkNode, NetworkResponse, SimilarClient},
    scene::{NodeShape, Scene, SceneEdge, SceneNode},
};

pub const MAX_RELATED: usize = 20;
const MAX_SECOND_ORDER: usize = 15;
const BUSINESS_LINK_PROBABILITY: f64 = 0.15;

pub const SIMILARITY_LINK: &str = "similarity";
pub const BUSINESS_LINK: &str = "business_connection";

pub fn build_request(center_client_id: &str, similar: &[SimilarClient]) -> NetworkBuildRequest {
    NetworkBuildRequest {
        center_client_id: center_client_id.to_string(),
        related_clients: similar
            .iter()
            .take(MAX_RELATED)
            .map(|c| c.client_id.clone())
            .collect(),
    }
}

fn seed_for(center_client_id: &str) -> u64 {
    center_client_id
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325, |acc, b| (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3))
}

/// Locally generated network used when the backend cannot build one.
pub fn synthesize(center_client_id: &str, similar: &[SimilarClient]) -> NetworkResponse {
    let mut rng = StdRng::seed_from_u64(seed_for(center_client_id));
    let mut nodes = vec![NetworkNode {
        id: center_client_id.to_string(),
        name: Some("Query Client".to_string()),
        group: "center".to_string(),
        outcome: Some("query".to_string()),
        similarity: None,
        val: 20.0,
    }];
    let mut links = Vec::new();

    for client in similar.iter().take(MAX_RELATED) {
        let repaid = client.outcome().is_repaid();
        nodes.push(NetworkNode {
            id: client.client_id.clone(),
            name: Some(client.client_id.clone()),
            group: if repaid { "good" } else { "bad" }.to_string(),
            outcome: Some(client.outcome().as_str().to_string()),
            similarity: Some(client.similarity),
            val: 10.0 + client.similarity * 10.0,
        });
        links.push(NetworkLink {
            source: center_client_id.to_string(),
            target: client.client_id.clone(),
            value: client.similarity * 10.0,
            link_type: SIMILARITY_LINK.to_string(),
        });
    }

    let limit = similar.len().min(MAX_SECOND_ORDER);
    for i in 0..limit {
        for j in (i + 1)..limit {
            if rng.random_bool(BUSINESS_LINK_PROBABILITY) {
                links.push(NetworkLink {
                    source: similar[i].client_id.clone(),
                    target: similar[j].client_id.clone(),
                    value: rng.random::<f64>() * 3.0,
                    link_type: BUSINESS_LINK.to_string(),
                });
            }
        }
    }

    NetworkResponse { nodes, links }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct NetworkStats {
    pub total_nodes: usize,
    pub connections: usize,
    pub repaid: usize,
}

pub fn node_color(group: &str) -> &'static str {
    match group {
        "center" => "#06b6d4",
        "good" => "#10b981",
        "bad" => "#ef4444",
        _ => "#6b7280",
    }
}

pub fn link_color(link_type: &str) -> &'static str {
    if link_type == SIMILARITY_LINK {
        "rgba(168, 85, 247, 0.3)"
    } else {
        "rgba(6, 182, 212, 0.2)"
    }
}

pub struct TrustGraph {
    graph: StableDiGraph<NetworkNode, NetworkLink>,
    index: HashMap<String, NodeIndex>,
    center: Option<NodeIndex>,
}

impl TrustGraph {
    /// Links pointing at unknown nodes are dropped.
    pub fn from_response(resp: NetworkResponse) -> Self {
        let mut graph = StableDiGraph::with_capacity(resp.nodes.len(), resp.links.len());
        let mut index = HashMap::new();
        let mut center = None;
        for node in resp.nodes {
            let id = node.id.clone();
            let is_center = node.group == "center";
            let idx = graph.add_node(node);
            if is_center && center.is_none() {
                center = Some(idx);
            }
            index.insert(id, idx);
        }
        for link in resp.links {
            let (Some(&source), Some(&target)) = (index.get(&link.source), index.get(&link.target))
            else {
                continue;
            };
            graph.add_edge(source, target, link);
        }
        Self {
            graph,
            index,
            center,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            total_nodes: self.graph.node_count(),
            connections: self.graph.edge_count(),
            repaid: self
                .graph
                .node_weights()
                .filter(|n| n.group == "good")
                .count(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&NetworkNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    /// Ids linked to `id` in either direction.
    pub fn neighbors(&self, id: &str) -> Vec<String> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = self
            .graph
            .neighbors_undirected(idx)
            .map(|n| self.graph[n].id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Center at the origin; others on rings that widen as similarity falls.
    pub fn ring_layout(&self) -> HashMap<String, [f64; 3]> {
        let mut rings: [Vec<NodeIndex>; 3] = Default::default();
        for idx in self.graph.node_indices() {
            if Some(idx) == self.center {
                continue;
            }
            let similarity = self.graph[idx].similarity.unwrap_or(0.0).clamp(0.0, 1.0);
            let ring = (((1.0 - similarity) * 3.0).floor() as usize).min(2);
            rings[ring].push(idx);
        }

        let mut positions = HashMap::new();
        if let Some(center) = self.center {
            positions.insert(self.graph[center].id.clone(), [0.0, 0.0, 0.0]);
        }
        for (ring, members) in rings.iter().enumerate() {
            let radius = 4.0 + ring as f64 * 3.0;
            let count = members.len() as f64;
            for (i, &idx) in members.iter().enumerate() {
                let angle = i as f64 / count * TAU;
                positions.insert(
                    self.graph[idx].id.clone(),
                    [angle.cos() * radius, angle.sin() * radius, 0.0],
                );
            }
        }
        positions
    }

    pub fn scene(&self, selected: Option<&str>) -> Scene {
        let positions = self.ring_layout();
        let mut scene = Scene::new();
        for node in self.graph.node_weights() {
            let lit = selected == Some(node.id.as_str());
            scene.add_node(SceneNode {
                id: node.id.clone(),
                shape: NodeShape::Disc,
                position: positions.get(&node.id).copied().unwrap_or([0.0; 3]),
                radius: if node.val > 0.0 { node.val / 20.0 } else { 0.25 },
                color: node_color(&node.group).to_string(),
                scale: if lit { 1.5 } else { 1.0 },
                emissive: 0.0,
                label: node.name.clone().or_else(|| Some(node.id.clone())),
                selects: (node.group != "center").then(|| node.id.clone()),
            });
        }
        for edge in self.graph.edge_weights() {
            scene.add_edge(SceneEdge {
                id: format!("{}->{}:{}", edge.source, edge.target, edge.link_type),
                from: edge.source.clone(),
                to: edge.target.clone(),
                width: if edge.value > 0.0 { edge.value } else { 1.0 },
                color: link_color(&edge.link_type).to_string(),
            });
        }
        scene
    }

    pub fn to_response(&self) -> NetworkResponse {
        NetworkResponse {
            nodes: self.graph.node_weights().cloned().collect(),
            links: self.graph.edge_weights().cloned().collect(),
        }
    }
}
