use serde::Serialize;
use ts_rs::TS;

use crate::{
    api::types::{SearchResponse, SearchStats, SimilarClient},
    model::RiskLevel,
};

pub const MISSING: &str = "---";

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct SearchSummary {
    pub risk_level: RiskLevel,
    pub risk_class: String,
    pub confidence_percent: u32,
    pub repaid_count: u32,
    pub total_count: u32,
    pub recommendation: String,
    pub oracle_explanation: String,
}

impl From<&SearchResponse> for SearchSummary {
    fn from(resp: &SearchResponse) -> Self {
        Self {
            risk_level: resp.risk_level,
            risk_class: resp.risk_level.css_class().to_string(),
            confidence_percent: (resp.confidence.clamp(0.0, 1.0) * 100.0).round() as u32,
            repaid_count: resp.repaid_count,
            total_count: resp.total_count,
            recommendation: resp.recommendation.clone(),
            oracle_explanation: resp.oracle_explanation.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct StatCard {
    pub label: String,
    pub value: String,
}

pub fn stat_cards(stats: Option<&SearchStats>) -> Vec<StatCard> {
    let card = |label: &str, value: Option<String>| StatCard {
        label: label.to_string(),
        value: value.unwrap_or_else(|| MISSING.to_string()),
    };
    vec![
        card("Total Clients", stats.and_then(|s| s.total_clients).map(|v| v.to_string())),
        card("Vector Size", stats.and_then(|s| s.vector_size).map(|v| v.to_string())),
        card(
            "Distance Metric",
            stats.and_then(|s| s.distance_metric.clone()),
        ),
    ]
}

/// Row of the similar-clients list.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct SimilarRow {
    pub client_id: String,
    pub similarity_percent: u32,
    pub outcome: String,
    pub loan_source: String,
    pub selected: bool,
}

pub fn similar_rows(clients: &[SimilarClient], selected: Option<&str>) -> Vec<SimilarRow> {
    clients
        .iter()
        .map(|c| SimilarRow {
            client_id: c.client_id.clone(),
            similarity_percent: (c.similarity.clamp(0.0, 1.0) * 100.0).round() as u32,
            outcome: c.outcome().as_str().to_string(),
            loan_source: c.loan_source.clone(),
            selected: selected == Some(c.client_id.as_str()),
        })
        .collect()
}
