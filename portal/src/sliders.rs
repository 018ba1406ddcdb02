use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SliderUnit {
    /// `0.45` → `45%`
    Percent,
    /// `0.15` → `+15%`, `-0.2` → `-20%`
    SignedPercent,
    /// `12` → `12 years`
    Years,
    /// `2.5` → `+2.5 years`
    SignedYears,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct SliderSpec {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub unit: SliderUnit,
}

/// Render-ready slider: current value, label and track position.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct SliderView {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub value: f64,
    pub label: String,
    pub fill_percent: f64,
    pub ticks: [String; 3],
}

pub const YEARS_IN_BUSINESS: SliderSpec = SliderSpec {
    min: 1.0,
    max: 30.0,
    step: 1.0,
    unit: SliderUnit::Years,
};

pub const SEARCH_YEARS_ACTIVE: SliderSpec = SliderSpec {
    min: 1.0,
    max: 30.0,
    step: 0.5,
    unit: SliderUnit::Years,
};

pub const PROFILE_RATIO: SliderSpec = SliderSpec {
    min: 0.0,
    max: 1.0,
    step: 0.01,
    unit: SliderUnit::Percent,
};

pub const DEBT_RATIO_DELTA: SliderSpec = SliderSpec {
    min: -1.0,
    max: 1.0,
    step: 0.01,
    unit: SliderUnit::SignedPercent,
};

pub const YEARS_ACTIVE_DELTA: SliderSpec = SliderSpec {
    min: 0.0,
    max: 10.0,
    step: 0.5,
    unit: SliderUnit::SignedYears,
};

pub const INCOME_STABILITY_DELTA: SliderSpec = SliderSpec {
    min: -0.2,
    max: 0.2,
    step: 0.01,
    unit: SliderUnit::SignedPercent,
};

pub const PAYMENT_REGULARITY_DELTA: SliderSpec = INCOME_STABILITY_DELTA;

impl SliderSpec {
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    /// Clamp, then round to the nearest step counted from `min`.
    pub fn snap(&self, value: f64) -> f64 {
        let clamped = self.clamp(value);
        let steps = ((clamped - self.min) / self.step).round();
        let snapped = self.min + steps * self.step;
        // two decimals is the finest step in use; trims float noise like 0.15000000000000002
        let snapped = (snapped * 100.0).round() / 100.0;
        snapped.clamp(self.min, self.max)
    }

    pub fn label(&self, value: f64) -> String {
        match self.unit {
            SliderUnit::Percent => format!("{}%", whole_percent(value)),
            SliderUnit::SignedPercent => {
                let pct = whole_percent(value);
                if pct > 0 {
                    format!("+{pct}%")
                } else {
                    format!("{pct}%")
                }
            }
            SliderUnit::Years => {
                if value.fract() == 0.0 {
                    format!("{} years", value as i64)
                } else {
                    format!("{value:.1} years")
                }
            }
            SliderUnit::SignedYears => format!("+{:.1} years", value.max(0.0)),
        }
    }

    /// Position of `value` along the track, 0..=100, for the filled gradient.
    pub fn fill_percent(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        (self.clamp(value) - self.min) / span * 100.0
    }

    pub fn tick_labels(&self) -> [String; 3] {
        let mid = (self.min + self.max) / 2.0;
        [self.label(self.min), self.label(mid), self.label(self.max)]
    }

    pub fn view(&self, value: f64) -> SliderView {
        SliderView {
            min: self.min,
            max: self.max,
            step: self.step,
            value,
            label: self.label(value),
            fill_percent: self.fill_percent(value),
            ticks: self.tick_labels(),
        }
    }
}

fn whole_percent(value: f64) -> i64 {
    let pct = (value * 100.0).round() as i64;
    if pct == 0 { 0 } else { pct }
}
