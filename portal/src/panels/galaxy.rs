//! Galaxy view: one orb per similar client, laid out around the query point.

use std::f64::consts::TAU;

use serde::Serialize;
use ts_rs::TS;

use crate::{
    api::types::SimilarClient,
    scene::{NodeShape, Scene, SceneNode},
};

pub const REPAID_COLOR: &str = "#10b981";
pub const DEFAULTED_COLOR: &str = "#ef4444";
const CENTER_ID: &str = "__center";

const HIGHLIGHT_SCALE: f64 = 1.5;
const HIGHLIGHT_EMISSIVE: f64 = 0.8;
const RESTING_EMISSIVE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct Orb {
    pub client_id: String,
    pub position: [f64; 3],
    pub radius: f64,
    pub color: String,
}

/// Vertical offset in [-1.5, 1.5], stable for a given index.
fn vertical_spread(index: usize) -> f64 {
    let bucket = (index.wrapping_mul(7919) % 31) as f64;
    bucket / 10.0 - 1.5
}

pub fn layout(clients: &[SimilarClient]) -> Vec<Orb> {
    let count = clients.len() as f64;
    clients
        .iter()
        .enumerate()
        .map(|(i, client)| {
            let angle = i as f64 / count * TAU;
            let similarity = if client.similarity.is_finite() {
                client.similarity.clamp(0.0, 1.0)
            } else {
                0.0
            };
            let distance = 5.0 + (1.0 - similarity) * 10.0;
            let color = if client.outcome().is_repaid() {
                REPAID_COLOR
            } else {
                DEFAULTED_COLOR
            };
            Orb {
                client_id: client.client_id.clone(),
                position: [angle.cos() * distance, vertical_spread(i), angle.sin() * distance],
                radius: 0.2 + similarity * 0.3,
                color: color.to_string(),
            }
        })
        .collect()
}

/// Scene for the current results, highlighting the hovered and selected orbs.
pub fn scene(clients: &[SimilarClient], hovered: Option<&str>, selected: Option<&str>) -> Scene {
    let mut scene = Scene::new();
    if clients.is_empty() {
        return scene;
    }
    scene.add_node(SceneNode {
        id: CENTER_ID.to_string(),
        shape: NodeShape::Sphere,
        position: [0.0, 0.0, 0.0],
        radius: 0.1,
        color: "#ffffff".to_string(),
        scale: 1.0,
        emissive: 0.0,
        label: None,
        selects: None,
    });
    // keyed by position so repeated client ids still get one orb each
    for (index, orb) in layout(clients).into_iter().enumerate() {
        let lit = hovered == Some(orb.client_id.as_str()) || selected == Some(orb.client_id.as_str());
        scene.add_node(SceneNode {
            id: format!("orb-{index}"),
            label: Some(orb.client_id.clone()),
            selects: Some(orb.client_id),
            shape: NodeShape::Sphere,
            position: orb.position,
            radius: orb.radius,
            color: orb.color,
            scale: if lit { HIGHLIGHT_SCALE } else { 1.0 },
            emissive: if lit { HIGHLIGHT_EMISSIVE } else { RESTING_EMISSIVE },
        });
    }
    scene
}
