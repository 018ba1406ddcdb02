use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Archetype {
    #[default]
    MarketVendor,
    Craftsman,
    GigWorker,
    HomeBusiness,
    ShopOwner,
}

impl Archetype {
    pub const ALL: [Archetype; 5] = [
        Archetype::MarketVendor,
        Archetype::Craftsman,
        Archetype::GigWorker,
        Archetype::HomeBusiness,
        Archetype::ShopOwner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::MarketVendor => "market_vendor",
            Archetype::Craftsman => "craftsman",
            Archetype::GigWorker => "gig_worker",
            Archetype::HomeBusiness => "home_business",
            Archetype::ShopOwner => "shop_owner",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Archetype::MarketVendor => "Market Vendor",
            Archetype::Craftsman => "Craftsman",
            Archetype::GigWorker => "Gig Worker (Taxi/Delivery)",
            Archetype::HomeBusiness => "Home Business",
            Archetype::ShopOwner => "Shop Owner",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|archetype| archetype.as_str() == raw.trim())
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Form object collected by the client application wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ApplicantProfile {
    pub name: String,
    pub archetype: Archetype,
    pub years_active: f64,
    pub monthly_income: f64,
    pub debt_ratio: f64,
    pub income_stability: f64,
    pub payment_regularity: f64,
}

impl Default for ApplicantProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            archetype: Archetype::MarketVendor,
            years_active: 5.0,
            monthly_income: 1500.0,
            debt_ratio: 0.45,
            income_stability: 0.85,
            payment_regularity: 0.88,
        }
    }
}

impl ApplicantProfile {
    pub fn client_data(&self) -> ClientData {
        ClientData {
            archetype: self.archetype,
            debt_ratio: self.debt_ratio,
            years_active: self.years_active,
            income_stability: self.income_stability,
            payment_regularity: self.payment_regularity,
            monthly_income: self.monthly_income,
        }
    }
}

/// Partial form edit. Numeric fields arrive as raw text from form controls.
#[derive(Debug, Default, Clone, Deserialize, TS)]
#[ts(export)]
pub struct ProfilePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub archetype: Option<Archetype>,
    #[serde(default)]
    pub years_active: Option<String>,
    #[serde(default)]
    pub monthly_income: Option<String>,
    #[serde(default)]
    pub debt_ratio: Option<String>,
    #[serde(default)]
    pub income_stability: Option<String>,
    #[serde(default)]
    pub payment_regularity: Option<String>,
}

impl ApplicantProfile {
    /// Fields whose text does not parse keep their previous value.
    pub fn apply(&mut self, patch: ProfilePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(archetype) = patch.archetype {
            self.archetype = archetype;
        }
        let years_slider = crate::sliders::YEARS_IN_BUSINESS;
        let ratio_slider = crate::sliders::PROFILE_RATIO;
        if let Some(value) = patch.years_active.as_deref().and_then(parse_number_field) {
            self.years_active = years_slider.clamp(value.trunc());
        }
        if let Some(value) = patch.monthly_income.as_deref().and_then(parse_number_field) {
            self.monthly_income = value.trunc();
        }
        if let Some(value) = patch.debt_ratio.as_deref().and_then(parse_number_field) {
            self.debt_ratio = ratio_slider.clamp(value);
        }
        if let Some(value) = patch.income_stability.as_deref().and_then(parse_number_field) {
            self.income_stability = ratio_slider.clamp(value);
        }
        if let Some(value) = patch
            .payment_regularity
            .as_deref()
            .and_then(parse_number_field)
        {
            self.payment_regularity = ratio_slider.clamp(value);
        }
    }
}

/// Search payload: archetype plus exactly five numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientData {
    pub archetype: Archetype,
    pub debt_ratio: f64,
    pub years_active: f64,
    pub income_stability: f64,
    pub payment_regularity: f64,
    pub monthly_income: f64,
}

impl Default for ClientData {
    fn default() -> Self {
        Self {
            archetype: Archetype::MarketVendor,
            debt_ratio: 0.45,
            years_active: 15.0,
            income_stability: 0.85,
            payment_regularity: 0.88,
            monthly_income: 2500.0,
        }
    }
}

/// Loosely shaped client fields, as found on application records.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PartialClientData {
    #[serde(default)]
    pub archetype: Option<Archetype>,
    #[serde(default)]
    pub debt_ratio: Option<f64>,
    #[serde(default)]
    pub years_active: Option<f64>,
    #[serde(default)]
    pub income_stability: Option<f64>,
    #[serde(default)]
    pub payment_regularity: Option<f64>,
    #[serde(default)]
    pub monthly_income: Option<f64>,
}

impl From<PartialClientData> for ClientData {
    fn from(partial: PartialClientData) -> Self {
        let defaults = ClientData::default();
        let pick = |value: Option<f64>, fallback: f64| value.filter(|v| v.is_finite()).unwrap_or(fallback);
        Self {
            archetype: partial.archetype.unwrap_or(defaults.archetype),
            debt_ratio: pick(partial.debt_ratio, defaults.debt_ratio),
            years_active: pick(partial.years_active, defaults.years_active),
            income_stability: pick(partial.income_stability, defaults.income_stability),
            payment_regularity: pick(partial.payment_regularity, defaults.payment_regularity),
            monthly_income: pick(partial.monthly_income, defaults.monthly_income),
        }
    }
}

/// Numeric parsing for form inputs: leading numeric prefix, like a browser's `parseFloat`.
pub fn parse_number_field(raw: &str) -> Option<f64> {
    let text = raw.trim();
    let bytes = text.as_bytes();
    let digits_end = |mut at: usize| {
        while bytes.get(at).is_some_and(u8::is_ascii_digit) {
            at += 1;
        }
        at
    };

    let start = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let mut end = digits_end(start);
    let mut has_mantissa = end > start;
    if bytes.get(end) == Some(&b'.') {
        let fraction_end = digits_end(end + 1);
        has_mantissa |= fraction_end > end + 1;
        end = fraction_end;
    }
    if !has_mantissa {
        return None;
    }
    // an exponent only counts when it has digits: "2e" reads as 2
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let exponent_end = digits_end(exponent);
        if exponent_end > exponent {
            end = exponent_end;
        }
    }
    text[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Outcome {
    Repaid,
    Defaulted,
    #[serde(other)]
    Unknown,
}

impl Outcome {
    pub fn is_repaid(&self) -> bool {
        matches!(self, Outcome::Repaid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Repaid => "repaid",
            Outcome::Defaulted => "defaulted",
            Outcome::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    #[serde(other)]
    Unknown,
}

impl RiskLevel {
    /// Lower is safer. Unknown levels sort after every known one.
    pub fn rank(&self) -> u8 {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 1,
            RiskLevel::High => 2,
            RiskLevel::Critical => 3,
            RiskLevel::Unknown => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::Unknown => "UNKNOWN",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            RiskLevel::Low => "text-risk-safe",
            RiskLevel::Medium => "text-risk-medium",
            RiskLevel::High => "text-risk-high",
            RiskLevel::Critical => "text-risk-critical",
            RiskLevel::Unknown => "text-muted",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AlertLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::None => "none",
            AlertLevel::Low => "low",
            AlertLevel::Medium => "medium",
            AlertLevel::High => "high",
            AlertLevel::Critical => "critical",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "alert-critical",
            AlertLevel::High => "alert-high",
            AlertLevel::Medium => "alert-medium",
            AlertLevel::Low => "alert-low",
            AlertLevel::None => "alert-none",
        }
    }

    pub fn is_severe(&self) -> bool {
        matches!(self, AlertLevel::High | AlertLevel::Critical)
    }
}
