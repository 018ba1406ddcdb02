use super::{Page, client::state_script, escape, percent};
use crate::{
    dashboard::{ApplicationRow, DashboardView, NetworkView},
    panels::{
        PanelState,
        counterfactual::{CounterfactualOutcome, CounterfactualView},
        fraud::FraudSummary,
        galaxy::Orb,
        search::{SearchSummary, SimilarRow},
        temporal::{Metric, Series, TemporalAnalysis},
    },
};

const SAMPLE_NOTE: &str = r#"<p class="sample-note">Sample data: the backend was unreachable</p>"#;

fn panel<T>(
    state: &PanelState<T>,
    idle: &str,
    loading: &str,
    ready: impl FnOnce(&T) -> String,
) -> String {
    match state {
        PanelState::Idle => format!(r#"<p class="text-gray-400 text-center py-12">{idle}</p>"#),
        PanelState::Loading => format!(r#"<p class="spinner text-gray-400 text-center py-12">{loading}</p>"#),
        PanelState::Ready { data, synthetic } => {
            let note = if *synthetic { SAMPLE_NOTE } else { "" };
            format!("{note}{}", ready(data))
        }
        PanelState::Failed { message } => {
            format!(r#"<p class="alert alert-critical">{}</p>"#, escape(message))
        }
    }
}

fn applications(rows: &[ApplicationRow]) -> String {
    if rows.is_empty() {
        return r#"<p class="text-gray-400">No applications yet</p>"#.to_string();
    }
    rows.iter()
        .map(|row| {
            let class = if row.selected { "app-row selected" } else { "app-row" };
            let risk = row
                .risk_percent
                .map(|r| format!("{r}%"))
                .unwrap_or_else(|| "---".to_string());
            format!(
                r#"<button class="{class}" data-select-application="{id}"><span>{id}</span><span>{archetype}</span><span>{date}</span><span>{risk}</span><span class="status">{status}</span></button>"#,
                id = escape(&row.client_id),
                archetype = escape(&row.archetype),
                date = escape(&row.date),
                status = escape(&row.status),
            )
        })
        .collect()
}

fn search_summary(summary: &SearchSummary) -> String {
    format!(
        r#"<div class="risk-summary">
  <div class="risk-badge {class}">{level}</div>
  <div><span class="text-3xl font-bold">{confidence}%</span> confidence</div>
  <div>{repaid} of {total} similar clients repaid</div>
  <p class="recommendation">{recommendation}</p>
  <p class="oracle">{oracle}</p>
</div>"#,
        class = summary.risk_class,
        level = summary.risk_level.as_str(),
        confidence = summary.confidence_percent,
        repaid = summary.repaid_count,
        total = summary.total_count,
        recommendation = escape(&summary.recommendation),
        oracle = escape(&summary.oracle_explanation),
    )
}

fn similar_list(rows: &[SimilarRow]) -> String {
    rows.iter()
        .map(|row| {
            let class = if row.selected { "similar-row selected" } else { "similar-row" };
            format!(
                r#"<button class="{class} outcome-{outcome}" data-select-similar="{id}"><span>{id}</span><span>{sim}%</span><span>{outcome}</span><span>{source}</span></button>"#,
                id = escape(&row.client_id),
                sim = row.similarity_percent,
                outcome = row.outcome,
                source = escape(&row.loan_source),
            )
        })
        .collect()
}

/// Top-down projection of the galaxy; the browser upgrades it to the 3D scene.
fn galaxy(orbs: &[Orb]) -> String {
    if orbs.is_empty() {
        return r#"<p class="text-gray-400 text-center py-12">Run a search to see Galaxy View</p>"#.to_string();
    }
    let circles: String = orbs
        .iter()
        .map(|orb| {
            format!(
                r##"<circle cx="{x:.2}" cy="{z:.2}" r="{r:.2}" fill="{color}" data-select-similar="{id}"><title>{id}</title></circle>"##,
                x = orb.position[0],
                z = orb.position[2],
                r = orb.radius,
                color = orb.color,
                id = escape(&orb.client_id),
            )
        })
        .collect();
    format!(
        r##"<svg class="galaxy" viewBox="-16 -16 32 32"><circle cx="0" cy="0" r="0.1" fill="#ffffff"/>{circles}</svg>"##
    )
}

/// Serialized name of a unit enum, as the browser posts it back.
fn wire_name<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn series_table(series: &Series) -> String {
    let cells: String = series
        .points
        .iter()
        .map(|p| format!("<tr><td>{}</td><td>{:.1}%</td></tr>", p.label, p.value))
        .collect();
    format!(
        r#"<table class="series" style="--series-color:{color}"><caption>{label}</caption>{cells}</table>"#,
        color = series.color,
        label = series.label,
    )
}

fn metric_tabs(selected: Metric) -> String {
    Metric::ALL
        .iter()
        .map(|m| {
            let class = if *m == selected { "tab active" } else { "tab" };
            format!(
                r#"<button class="{class}" data-metric="{}">{}</button>"#,
                wire_name(m),
                m.label()
            )
        })
        .collect()
}

fn temporal(
    analysis: &Option<TemporalAnalysis>,
    metric: Metric,
    series: Option<&Series>,
) -> String {
    let Some(analysis) = analysis else {
        return r#"<p class="text-gray-400">No history recorded for this client</p>"#.to_string();
    };
    format!(
        r#"<div class="flex justify-between"><span class="{trend_class}">{trend}</span><span>Final outcome: {outcome}</span></div>
<div class="tabs">{tabs}</div>
{series}
<p class="narrative">{narrative}</p>"#,
        trend_class = analysis.trend.css_class(),
        trend = analysis.trend.label(),
        outcome = analysis.final_outcome.as_str(),
        tabs = metric_tabs(metric),
        series = series.map(series_table).unwrap_or_default(),
        narrative = escape(&analysis.narrative),
    )
}

fn network(view: &NetworkView) -> String {
    format!(
        r#"<div class="grid grid-cols-3 gap-4">
  <div class="stat"><div class="text-2xl font-bold">{nodes}</div><div>Total Nodes</div></div>
  <div class="stat"><div class="text-2xl font-bold">{links}</div><div>Connections</div></div>
  <div class="stat"><div class="text-2xl font-bold text-risk-safe">{repaid}</div><div>Repaid</div></div>
</div>
<div id="trust-network-canvas" class="network-canvas"></div>"#,
        nodes = view.stats.total_nodes,
        links = view.stats.connections,
        repaid = view.stats.repaid,
    )
}

fn counterfactual_result(outcome: &CounterfactualOutcome) -> String {
    let steps: String = outcome
        .improvement_path
        .iter()
        .enumerate()
        .map(|(i, step)| format!("<li><span>{}</span> {}</li>", i + 1, escape(step)))
        .collect();
    let delta = if outcome.confidence_delta > 0 {
        format!("+{}", outcome.confidence_delta)
    } else {
        outcome.confidence_delta.to_string()
    };
    format!(
        r#"<div class="grid grid-cols-2 gap-4">
  <div><div class="label">Current Risk</div><div class="{before_class}">{before}</div><div>{cb}% confidence</div></div>
  <div><div class="label">After Changes</div><div class="{after_class}">{after}</div><div>{ca}% confidence ({delta})</div></div>
</div>
<p>{change}</p>
<ol class="improvement-path">{steps}</ol>"#,
        before_class = outcome.original_risk.css_class(),
        before = outcome.original_risk.as_str(),
        cb = outcome.confidence_before,
        after_class = outcome.modified_risk.css_class(),
        after = outcome.modified_risk.as_str(),
        ca = outcome.confidence_after,
        change = escape(&outcome.risk_change),
    )
}

fn counterfactual(view: &CounterfactualView) -> String {
    let sliders: String = view
        .sliders
        .iter()
        .map(|s| {
            format!(
                r#"<label class="block mb-4"><span class="flex justify-between"><span>{title}</span><span>{label}</span></span><input type="range" data-delta="{field}" min="{min}" max="{max}" step="{step}" value="{value}" style="--fill:{fill:.1}%"></label>"#,
                title = s.title,
                label = s.slider.label,
                field = wire_name(&s.field),
                min = s.slider.min,
                max = s.slider.max,
                step = s.slider.step,
                value = s.slider.value,
                fill = s.slider.fill_percent,
            )
        })
        .collect();
    let result = panel(
        &view.result,
        "Adjust the sliders and run the analysis",
        "Analyzing scenario...",
        counterfactual_result,
    );
    format!(
        r#"{sliders}
<div class="flex gap-4"><button data-action="counterfactual" class="btn-primary">Analyze Scenario</button><button data-action="counterfactual-reset" class="btn-ghost">Reset</button></div>
{result}"#
    )
}

fn fraud(summary: &FraudSummary) -> String {
    let matches: String = summary
        .similar_frauds
        .iter()
        .map(|m| {
            format!(
                "<li>{} {} {}</li>",
                escape(&m.client_id),
                m.similarity.map(percent).unwrap_or_default(),
                escape(m.fraud_type.as_deref().unwrap_or(""))
            )
        })
        .collect();
    format!(
        r#"<div class="alert {class}">
  <h4 class="text-xl font-bold">{headline}</h4>
  <div>Fraud score {score}% · alert level {level}</div>
  <div>{count} matched record(s)</div>
  <ul>{matches}</ul>
  <p>{recommendation}</p>
  <p class="oracle">{narrative}</p>
</div>"#,
        class = summary.alert_class,
        headline = summary.headline,
        score = summary.score_percent,
        level = summary.alert_level.as_str(),
        count = summary.matched_records,
        recommendation = escape(&summary.recommendation),
        narrative = escape(&summary.narrative),
    )
}

fn card(title: &str, id: &str, inner: String) -> String {
    format!(
        r#"<section class="glass-card" id="{id}"><h3 class="text-2xl font-bold mb-4">{title}</h3>{inner}</section>"#
    )
}

pub fn render(view: &DashboardView) -> anyhow::Result<Page> {
    let stats: String = view
        .stats
        .iter()
        .map(|c| {
            format!(
                r#"<div class="stat-card"><div class="stat-value">{}</div><div class="stat-label">{}</div></div>"#,
                escape(&c.value),
                c.label
            )
        })
        .collect();

    let apps = panel(
        &view.applications,
        "Loading applications...",
        "Loading applications...",
        |rows| applications(rows),
    );

    let search = if view.selected_application.is_none() {
        r#"<p class="text-gray-400">Select an application to analyze</p>"#.to_string()
    } else {
        let button = r#"<button data-action="search" class="btn-primary">Find Similar Clients</button>"#;
        let results = if view.search_triggered {
            panel(&view.search, "", "Searching vector space...", search_summary)
        } else {
            String::new()
        };
        format!("{button}{results}")
    };

    let similar = if view.similar.is_empty() {
        String::new()
    } else {
        card("Similar Clients", "similar-panel", similar_list(&view.similar))
    };

    let temporal_html = if view.selected_similar.is_none() {
        r#"<p class="text-gray-400 text-center py-12">Select a client to view temporal evolution</p>"#.to_string()
    } else {
        panel(&view.temporal, "No temporal data", "Loading temporal data...", |analysis| {
            temporal(analysis, view.metric, view.series.as_ref())
        })
    };

    let network_html = panel(
        &view.network,
        "Search for a client to view trust network",
        "Building trust network...",
        network,
    );

    let fraud_html = if view.selected_application.is_none() {
        r#"<p class="text-gray-400">Select an application to run a fraud check</p>"#.to_string()
    } else {
        format!(
            r#"<button data-action="fraud" class="btn-secondary">Run Fraud Check</button>{}"#,
            panel(&view.fraud, "", "Checking fraud patterns...", fraud)
        )
    };

    let body = format!(
        r#"<div class="min-h-screen p-8"><div class="max-w-7xl mx-auto space-y-8">
  <a href="/" class="btn-ghost inline-flex">← Back to Home</a>
  <h1 class="text-4xl font-bold neon-text">Admin Dashboard</h1>
  <div class="stats-grid">{stats}</div>
  <div class="grid lg:grid-cols-3 gap-8">
    {apps_card}
    <div class="lg:col-span-2 space-y-8">
      {search_card}
      {galaxy_card}
      {similar}
    </div>
  </div>
  <div class="grid lg:grid-cols-2 gap-8">
    {temporal_card}
    {network_card}
    {counterfactual_card}
    {fraud_card}
  </div>
  {state}
</div></div>"#,
        apps_card = card("Applications", "applications-panel", apps),
        search_card = card("Similarity Search", "search-panel", search),
        galaxy_card = card("Galaxy View", "galaxy-panel", galaxy(&view.galaxy)),
        temporal_card = card("Temporal Evolution", "temporal-panel", temporal_html),
        network_card = card("Trust Rings Network", "network-panel", network_html),
        counterfactual_card = card(
            "Counterfactual Engine",
            "counterfactual-panel",
            counterfactual(&view.counterfactual)
        ),
        fraud_card = card("Fraud Detection", "fraud-panel", fraud_html),
        state = state_script("dashboard-state", view)?,
    );
    Ok(Page::new("Admin Dashboard", body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::AdminDashboard;

    #[test]
    fn fresh_dashboard_renders_placeholders() {
        let page = render(&AdminDashboard::default().view()).unwrap();
        assert!(page.body.contains("Admin Dashboard"));
        assert!(page.body.contains("Run a search to see Galaxy View"));
        assert!(page.body.contains("Select a client to view temporal evolution"));
        assert!(page.body.contains("---"));
    }

    #[test]
    fn failed_panels_show_inline_alert() {
        let state: PanelState<u8> = PanelState::Failed {
            message: "backend returned 500: <oops>".into(),
        };
        let html = panel(&state, "", "", |_| String::new());
        assert!(html.contains("alert-critical"));
        assert!(html.contains("&lt;oops&gt;"));
    }

    #[test]
    fn synthetic_data_is_labelled() {
        let state = PanelState::Ready {
            data: 1u8,
            synthetic: true,
        };
        assert!(panel(&state, "", "", |_| "x".into()).starts_with(SAMPLE_NOTE));
    }
}
