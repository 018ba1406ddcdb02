use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::model::{AlertLevel, ApplicantProfile, Archetype, ClientData, Outcome, RiskLevel};

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub client_data: ClientData,
    pub top_k: usize,
}

#[derive(Default, Clone, Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct SimilarClient {
    pub client_id: String,
    pub similarity: f64,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub loan_source: String,
    #[serde(default)]
    pub debt_ratio: f64,
    #[serde(default)]
    pub years_active: f64,
}

impl SimilarClient {
    pub fn outcome(&self) -> Outcome {
        self.outcome.unwrap_or(Outcome::Unknown)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct SearchResponse {
    #[serde(default)]
    pub similar_clients: Vec<SimilarClient>,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    #[serde(default)]
    pub repaid_count: u32,
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub oracle_explanation: String,
}

#[derive(Default, Clone, Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct SearchStats {
    #[serde(default)]
    pub total_clients: Option<u64>,
    #[serde(default)]
    pub vector_size: Option<u64>,
    #[serde(default)]
    pub distance_metric: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Modifications {
    pub debt_ratio: f64,
    pub years_active: f64,
    pub income_stability: f64,
    pub payment_regularity: f64,
}

impl Default for Modifications {
    fn default() -> Self {
        Self {
            debt_ratio: 0.0,
            years_active: 0.0,
            income_stability: 0.0,
            payment_regularity: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CounterfactualRequest {
    pub original_client: ClientData,
    pub modifications: Modifications,
}

#[derive(Clone, Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct CounterfactualResponse {
    pub original_risk: RiskLevel,
    pub modified_risk: RiskLevel,
    pub confidence_before: f64,
    pub confidence_after: f64,
    #[serde(default)]
    pub risk_change: String,
    #[serde(default)]
    pub improvement_path: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FraudCheckRequest {
    pub client_data: ClientData,
}

#[derive(Clone, Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct FraudCheckResponse {
    pub is_suspicious: bool,
    #[serde(default)]
    pub alert_level: AlertLevel,
    pub fraud_score: f64,
    #[serde(default)]
    pub similar_frauds: Vec<Value>,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub oracle_narrative: String,
}

#[derive(Default, Clone, Debug, PartialEq, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct TemporalSnapshot {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub risk_score: f64,
    #[serde(default)]
    pub debt_ratio: f64,
    #[serde(default)]
    pub income_stability: f64,
    #[serde(default)]
    pub payment_regularity: f64,
    #[serde(default)]
    pub status: String,
}

#[derive(Default, Clone, Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct TemporalResponse {
    pub client_id: String,
    #[serde(default)]
    pub snapshots: Vec<TemporalSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkBuildRequest {
    pub center_client_id: String,
    pub related_clients: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct NetworkNode {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub similarity: Option<f64>,
    /// Node size.
    #[serde(default)]
    pub val: f64,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct NetworkLink {
    pub source: String,
    pub target: String,
    /// Link weight, drawn as thickness.
    #[serde(default)]
    pub value: f64,
    #[serde(default, rename = "type")]
    pub link_type: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct NetworkResponse {
    #[serde(default)]
    pub nodes: Vec<NetworkNode>,
    #[serde(default)]
    pub links: Vec<NetworkLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceExtractRequest {
    pub transcript: String,
    pub language: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct VoiceExtraction {
    pub archetype: Archetype,
    pub years_active: f64,
    pub monthly_income: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub raw_transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Row of the admin application list: a client with only its T0 snapshot.
#[derive(Clone, Debug, Default, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct ApplicationRecord {
    #[serde(default)]
    pub id: Option<Value>,
    pub client_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub archetype: Option<Archetype>,
    #[serde(default)]
    pub years_active: Option<f64>,
    #[serde(default)]
    pub monthly_income: Option<f64>,
    #[serde(default)]
    pub debt_ratio: Option<f64>,
    #[serde(default)]
    pub income_stability: Option<f64>,
    #[serde(default)]
    pub payment_regularity: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct ApplicationList {
    #[serde(default)]
    pub applications: Vec<ApplicationRecord>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitApplicationRequest {
    pub applicant: ApplicantProfile,
    pub documents: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct SubmitApplicationResponse {
    pub client_id: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub next_steps: Option<Vec<String>>,
    #[serde(default)]
    pub created_point: Option<Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct UploadedFile {
    pub path: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct UploadResponse {
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditHistoryRequest {
    pub name: String,
    pub archetype: Archetype,
    pub years_active: f64,
    pub monthly_income: f64,
    pub debt_ratio: f64,
    pub income_stability: f64,
    pub payment_regularity: f64,
    pub client_id: String,
}

impl CreditHistoryRequest {
    pub fn new(applicant: &ApplicantProfile, client_id: &str) -> Self {
        Self {
            name: applicant.name.clone(),
            archetype: applicant.archetype,
            years_active: applicant.years_active,
            monthly_income: applicant.monthly_income,
            debt_ratio: applicant.debt_ratio,
            income_stability: applicant.income_stability,
            payment_regularity: applicant.payment_regularity,
            client_id: client_id.to_string(),
        }
    }
}

/// File picked in the documents step.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn search_request_has_archetype_and_five_numbers() {
        let request = SearchRequest {
            client_data: ClientData::default(),
            top_k: 50,
        };
        let value = serde_json::to_value(&request).unwrap();
        let client_data = value["client_data"].as_object().unwrap();
        assert_eq!(client_data.len(), 6);
        assert_eq!(client_data["archetype"], "market_vendor");
        let numeric = client_data.values().filter(|v| v.is_number()).count();
        assert_eq!(numeric, 5);
        assert_eq!(value["top_k"], 50);
    }

    #[test]
    fn submit_response_variants_parse() {
        let created: SubmitApplicationResponse = serde_json::from_value(json!({
            "client_id": "CLIENT_ab12cd34",
            "status": "submitted",
            "message": "Application received and stored.",
            "created_point": {"timestamp": "T0_application", "risk_score": 0.31}
        }))
        .unwrap();
        assert!(created.created_point.is_some());
        assert!(created.next_steps.is_none());

        let plain: SubmitApplicationResponse = serde_json::from_value(json!({
            "client_id": "CLIENT_1",
            "status": "approved",
            "next_steps": ["Sign the contract"]
        }))
        .unwrap();
        assert!(plain.created_point.is_none());
        assert_eq!(plain.next_steps.unwrap().len(), 1);
    }

    #[test]
    fn network_link_type_is_renamed() {
        let link: NetworkLink = serde_json::from_value(json!({
            "source": "A", "target": "B", "value": 2.5, "type": "business_connection"
        }))
        .unwrap();
        assert_eq!(link.link_type, "business_connection");
        let back = serde_json::to_value(&link).unwrap();
        assert_eq!(back["type"], "business_connection");
    }
}
