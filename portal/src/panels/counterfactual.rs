use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{Panel, PanelState, Ticket};
use crate::{
    api::types::{CounterfactualRequest, CounterfactualResponse, Modifications},
    error::FetchResult,
    fetch::Fetched,
    model::{ClientData, RiskLevel},
    sliders::{
        DEBT_RATIO_DELTA, INCOME_STABILITY_DELTA, PAYMENT_REGULARITY_DELTA, SliderSpec,
        SliderView, YEARS_ACTIVE_DELTA,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DeltaField {
    DebtRatio,
    YearsActive,
    IncomeStability,
    PaymentRegularity,
}

impl DeltaField {
    pub const ALL: [DeltaField; 4] = [
        DeltaField::DebtRatio,
        DeltaField::YearsActive,
        DeltaField::IncomeStability,
        DeltaField::PaymentRegularity,
    ];

    pub fn slider(&self) -> SliderSpec {
        match self {
            DeltaField::DebtRatio => DEBT_RATIO_DELTA,
            DeltaField::YearsActive => YEARS_ACTIVE_DELTA,
            DeltaField::IncomeStability => INCOME_STABILITY_DELTA,
            DeltaField::PaymentRegularity => PAYMENT_REGULARITY_DELTA,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeltaField::DebtRatio => "Debt Ratio Change",
            DeltaField::YearsActive => "Years Active Change",
            DeltaField::IncomeStability => "Income Stability Change",
            DeltaField::PaymentRegularity => "Payment Regularity Change",
        }
    }

    fn slot<'a>(&self, deltas: &'a mut Modifications) -> &'a mut f64 {
        match self {
            DeltaField::DebtRatio => &mut deltas.debt_ratio,
            DeltaField::YearsActive => &mut deltas.years_active,
            DeltaField::IncomeStability => &mut deltas.income_stability,
            DeltaField::PaymentRegularity => &mut deltas.payment_regularity,
        }
    }

    fn read(&self, deltas: &Modifications) -> f64 {
        match self {
            DeltaField::DebtRatio => deltas.debt_ratio,
            DeltaField::YearsActive => deltas.years_active,
            DeltaField::IncomeStability => deltas.income_stability,
            DeltaField::PaymentRegularity => deltas.payment_regularity,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct DeltaSlider {
    pub field: DeltaField,
    pub title: String,
    pub slider: SliderView,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct CounterfactualOutcome {
    pub original_risk: RiskLevel,
    pub modified_risk: RiskLevel,
    pub confidence_before: u32,
    pub confidence_after: u32,
    pub confidence_delta: i32,
    pub improved: bool,
    pub risk_change: String,
    pub improvement_path: Vec<String>,
}

impl From<&CounterfactualResponse> for CounterfactualOutcome {
    fn from(resp: &CounterfactualResponse) -> Self {
        let before = (resp.confidence_before * 100.0).round() as i32;
        let after = (resp.confidence_after * 100.0).round() as i32;
        Self {
            original_risk: resp.original_risk,
            modified_risk: resp.modified_risk,
            confidence_before: before.max(0) as u32,
            confidence_after: after.max(0) as u32,
            confidence_delta: after - before,
            improved: resp.modified_risk.rank() < resp.original_risk.rank(),
            risk_change: resp.risk_change.clone(),
            improvement_path: resp.improvement_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CounterfactualView {
    pub base: Option<ClientData>,
    pub sliders: Vec<DeltaSlider>,
    pub result: PanelState<CounterfactualOutcome>,
}

/// What-if panel: slider deltas over a base client, analyzed remotely.
#[derive(Debug, Default)]
pub struct CounterfactualPanel {
    base: Option<ClientData>,
    deltas: Modifications,
    result: Panel<CounterfactualResponse>,
}

impl CounterfactualPanel {
    /// A new base invalidates the previous analysis; deltas are kept.
    pub fn set_base(&mut self, base: ClientData) {
        self.base = Some(base);
        self.result.reset();
    }

    pub fn base(&self) -> Option<&ClientData> {
        self.base.as_ref()
    }

    pub fn deltas(&self) -> Modifications {
        self.deltas
    }

    pub fn set_delta(&mut self, field: DeltaField, value: f64) -> f64 {
        let snapped = field.slider().snap(value);
        *field.slot(&mut self.deltas) = snapped;
        snapped
    }

    pub fn request(&self) -> CounterfactualRequest {
        CounterfactualRequest {
            original_client: self.base.unwrap_or_default(),
            modifications: self.deltas,
        }
    }

    pub fn begin(&mut self) -> (Ticket, CounterfactualRequest) {
        (self.result.begin(), self.request())
    }

    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: FetchResult<Fetched<CounterfactualResponse>>,
    ) -> bool {
        self.result.complete(ticket, result)
    }

    pub fn reset(&mut self) {
        self.deltas = Modifications::default();
        self.result.reset();
    }

    pub fn state(&self) -> &PanelState<CounterfactualResponse> {
        self.result.state()
    }

    pub fn view(&self) -> CounterfactualView {
        let sliders = DeltaField::ALL
            .into_iter()
            .map(|field| DeltaSlider {
                field,
                title: field.label().to_string(),
                slider: field.slider().view(field.read(&self.deltas)),
            })
            .collect();
        CounterfactualView {
            base: self.base,
            sliders,
            result: self.result.state().map(|resp| CounterfactualOutcome::from(resp)),
        }
    }
}
