use serde::Serialize;
use serde_json::Value;
use ts_rs::TS;

use crate::{api::types::FraudCheckResponse, model::AlertLevel};

pub const SUSPICIOUS_HEADLINE: &str = "Suspicious Activity Detected";
pub const CLEAR_HEADLINE: &str = "No Fraud Detected";

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct FraudSummary {
    pub headline: String,
    pub suspicious: bool,
    pub alert_level: AlertLevel,
    pub alert_class: String,
    pub score_percent: u32,
    pub matched_records: usize,
    pub similar_frauds: Vec<MatchedRecord>,
    pub recommendation: String,
    pub narrative: String,
}

/// One matched fraud record, reduced to what the panel lists.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct MatchedRecord {
    pub client_id: String,
    pub similarity: Option<f64>,
    pub fraud_type: Option<String>,
}

impl MatchedRecord {
    fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            client_id: text("client_id")
                .or_else(|| text("id"))
                .unwrap_or_else(|| "unknown".to_string()),
            similarity: value.get("similarity").and_then(Value::as_f64),
            fraud_type: text("fraud_type").or_else(|| text("type")),
        }
    }
}

impl From<&FraudCheckResponse> for FraudSummary {
    fn from(resp: &FraudCheckResponse) -> Self {
        let headline = if resp.is_suspicious {
            SUSPICIOUS_HEADLINE
        } else {
            CLEAR_HEADLINE
        };
        Self {
            headline: headline.to_string(),
            suspicious: resp.is_suspicious,
            alert_level: resp.alert_level,
            alert_class: resp.alert_level.css_class().to_string(),
            score_percent: (resp.fraud_score.clamp(0.0, 1.0) * 100.0).round() as u32,
            matched_records: resp.similar_frauds.len(),
            similar_frauds: resp.similar_frauds.iter().map(MatchedRecord::from_value).collect(),
            recommendation: resp.recommendation.clone(),
            narrative: resp.oracle_narrative.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn suspicious_result_summarizes_matches() {
        let resp: FraudCheckResponse = serde_json::from_value(json!({
            "is_suspicious": true,
            "alert_level": "high",
            "fraud_score": 0.874,
            "similar_frauds": [
                {"client_id": "FRAUD_01", "similarity": 0.97, "fraud_type": "identity"},
                {"id": "FRAUD_02"}
            ],
            "recommendation": "Manual review",
            "oracle_narrative": "Pattern matches known rings."
        }))
        .unwrap();
        let summary = FraudSummary::from(&resp);
        assert_eq!(summary.headline, SUSPICIOUS_HEADLINE);
        assert_eq!(summary.score_percent, 87);
        assert_eq!(summary.alert_class, "alert-high");
        assert_eq!(summary.matched_records, 2);
        assert_eq!(summary.similar_frauds[1].client_id, "FRAUD_02");
        assert_eq!(summary.similar_frauds[0].fraud_type.as_deref(), Some("identity"));
    }

    #[test]
    fn clean_result_uses_clear_headline() {
        let resp: FraudCheckResponse = serde_json::from_value(json!({
            "is_suspicious": false,
            "fraud_score": 0.05
        }))
        .unwrap();
        let summary = FraudSummary::from(&resp);
        assert_eq!(summary.headline, CLEAR_HEADLINE);
        assert_eq!(summary.alert_level, AlertLevel::None);
        assert_eq!(summary.score_percent, 5);
    }
}
