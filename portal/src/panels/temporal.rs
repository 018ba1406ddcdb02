use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    api::types::{TemporalResponse, TemporalSnapshot},
    model::Outcome,
};

const TREND_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Trend {
    Improving,
    Deteriorating,
    Stable,
}

impl Trend {
    /// Risk going down is an improvement.
    pub fn from_change(change: f64) -> Self {
        if change < -TREND_THRESHOLD {
            Trend::Improving
        } else if change > TREND_THRESHOLD {
            Trend::Deteriorating
        } else {
            Trend::Stable
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Trend::Improving => "Improving",
            Trend::Deteriorating => "Declining",
            Trend::Stable => "Stable",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Trend::Improving => "text-risk-safe",
            Trend::Deteriorating => "text-risk-critical",
            Trend::Stable => "text-risk-medium",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Metric {
    #[default]
    RiskScore,
    DebtRatio,
    IncomeStability,
    PaymentRegularity,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::RiskScore,
        Metric::DebtRatio,
        Metric::IncomeStability,
        Metric::PaymentRegularity,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::RiskScore => "Risk Score",
            Metric::DebtRatio => "Debt Ratio",
            Metric::IncomeStability => "Income Stability",
            Metric::PaymentRegularity => "Payment Regularity",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Metric::RiskScore => "#ef4444",
            Metric::DebtRatio => "#f97316",
            Metric::IncomeStability => "#10b981",
            Metric::PaymentRegularity => "#06b6d4",
        }
    }

    fn read(&self, snapshot: &TemporalSnapshot) -> f64 {
        match self {
            Metric::RiskScore => snapshot.risk_score,
            Metric::DebtRatio => snapshot.debt_ratio,
            Metric::IncomeStability => snapshot.income_stability,
            Metric::PaymentRegularity => snapshot.payment_regularity,
        }
    }
}

pub fn timestamp_label(raw: &str) -> &'static str {
    match raw {
        "T0_application" => "T0: Application",
        "T1_3months" => "T1: 3 Months",
        _ => "T2: 6 Months",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct SeriesPoint {
    pub label: String,
    /// Percent, one decimal.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct Series {
    pub metric: Metric,
    pub label: String,
    pub color: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct TemporalAnalysis {
    pub client_id: String,
    pub final_outcome: Outcome,
    pub risk_change: f64,
    pub trend: Trend,
    pub narrative: String,
    pub snapshots: Vec<TemporalSnapshot>,
}

impl TemporalAnalysis {
    /// None when the backend returned no snapshots.
    pub fn from_response(resp: &TemporalResponse) -> Option<Self> {
        let first = resp.snapshots.first()?;
        let last = resp.snapshots.last()?;
        let risk_change = last.risk_score - first.risk_score;
        let trend = Trend::from_change(risk_change);
        let final_outcome = if last.status == "good" {
            Outcome::Repaid
        } else {
            Outcome::Defaulted
        };
        Some(Self {
            client_id: resp.client_id.clone(),
            final_outcome,
            risk_change,
            trend,
            narrative: narrative(&resp.client_id, trend, first.risk_score, last),
            snapshots: resp.snapshots.clone(),
        })
    }

    pub fn series(&self, metric: Metric) -> Series {
        let points = self
            .snapshots
            .iter()
            .map(|snapshot| SeriesPoint {
                label: timestamp_label(&snapshot.timestamp).to_string(),
                value: (metric.read(snapshot) * 1000.0).round() / 10.0,
            })
            .collect();
        Series {
            metric,
            label: metric.label().to_string(),
            color: metric.color().to_string(),
            points,
        }
    }
}

fn narrative(client_id: &str, trend: Trend, first_risk: f64, last: &TemporalSnapshot) -> String {
    let from = first_risk * 100.0;
    let to = last.risk_score * 100.0;
    match trend {
        Trend::Improving => format!(
            "Client {client_id} demonstrated improving financial health over 6 months, with decreasing risk score from {from:.0}% to {to:.0}%. This positive trajectory indicates reliable repayment capacity."
        ),
        Trend::Deteriorating => format!(
            "Client {client_id}'s financial situation deteriorated over 6 months with increasing risk from {from:.0}% to {to:.0}%. Monitoring required."
        ),
        Trend::Stable => format!(
            "Client {client_id} maintained stable financial metrics over the 6-month period, with risk score hovering around {to:.0}%. Status remains {}.",
            last.status
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(timestamp: &str, risk: f64, status: &str) -> TemporalSnapshot {
        TemporalSnapshot {
            timestamp: timestamp.into(),
            risk_score: risk,
            debt_ratio: 0.4,
            income_stability: 0.8,
            payment_regularity: 0.9,
            status: status.into(),
            ..TemporalSnapshot::default()
        }
    }

    fn response(risks: [(f64, &str); 3]) -> TemporalResponse {
        TemporalResponse {
            client_id: "CLIENT_7".into(),
            snapshots: vec![
                snapshot("T0_application", risks[0].0, risks[0].1),
                snapshot("T1_3months", risks[1].0, risks[1].1),
                snapshot("T2_6months", risks[2].0, risks[2].1),
            ],
        }
    }

    #[test]
    fn falling_risk_is_improving_and_repaid() {
        let analysis =
            TemporalAnalysis::from_response(&response([(0.45, "pending"), (0.35, "improving"), (0.25, "good")]))
                .unwrap();
        assert_eq!(analysis.trend, Trend::Improving);
        assert_eq!(analysis.final_outcome, Outcome::Repaid);
        assert_eq!(
            analysis.narrative,
            "Client CLIENT_7 demonstrated improving financial health over 6 months, with decreasing risk score from 45% to 25%. This positive trajectory indicates reliable repayment capacity."
        );
    }

    #[test]
    fn rising_risk_is_deteriorating() {
        let analysis =
            TemporalAnalysis::from_response(&response([(0.65, "pending"), (0.70, "warning"), (0.78, "default")]))
                .unwrap();
        assert_eq!(analysis.trend, Trend::Deteriorating);
        assert_eq!(analysis.final_outcome, Outcome::Defaulted);
        assert!(analysis.narrative.ends_with("from 65% to 78%. Monitoring required."));
    }

    #[test]
    fn small_changes_are_stable() {
        let analysis =
            TemporalAnalysis::from_response(&response([(0.40, "pending"), (0.42, "pending"), (0.45, "pending")]))
                .unwrap();
        assert_eq!(analysis.trend, Trend::Stable);
        assert!(analysis.narrative.contains("hovering around 45%. Status remains pending."));
        assert_eq!(Trend::from_change(0.1), Trend::Stable);
    }

    #[test]
    fn series_follow_selected_metric() {
        let analysis =
            TemporalAnalysis::from_response(&response([(0.452, "pending"), (0.35, "good"), (0.25, "good")]))
                .unwrap();
        let risk = analysis.series(Metric::RiskScore);
        assert_eq!(risk.points[0].label, "T0: Application");
        assert_eq!(risk.points[0].value, 45.2);
        let debt = analysis.series(Metric::DebtRatio);
        assert_eq!(debt.label, "Debt Ratio");
        assert!(debt.points.iter().all(|p| p.value == 40.0));
    }

    #[test]
    fn empty_history_has_no_analysis() {
        let empty = TemporalResponse {
            client_id: "CLIENT_0".into(),
            snapshots: vec![],
        };
        assert!(TemporalAnalysis::from_response(&empty).is_none());
    }
}
