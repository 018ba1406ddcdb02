use anyhow::Context;
use serde::Serialize;

use super::{Page, escape};
use crate::{
    model::Archetype,
    sliders::SliderView,
    wizard::{ApplicationOutcome, EntryMode, WizardStep, WizardView},
};

/// Inline JSON the browser script hydrates from.
pub(crate) fn state_script<T: Serialize>(id: &str, state: &T) -> anyhow::Result<String> {
    let json = serde_json::to_string(state).context("failed to serialize view state")?;
    Ok(format!(
        r#"<script id="{id}" type="application/json">{}</script>"#,
        json.replace("</", "<\\/")
    ))
}

fn progress(step: WizardStep) -> String {
    (1..=4u8)
        .map(|s| {
            let dot = if step.number() >= s { "step-dot active" } else { "step-dot" };
            let bar = match s {
                4 => String::new(),
                _ if step.number() > s => r#"<div class="step-bar active"></div>"#.to_string(),
                _ => r#"<div class="step-bar"></div>"#.to_string(),
            };
            format!(r#"<div class="flex items-center"><div class="{dot}">{s}</div>{bar}</div>"#)
        })
        .collect()
}

fn slider(name: &str, title: &str, view: &SliderView) -> String {
    format!(
        r#"<label class="block mb-4">
  <span class="flex justify-between"><span>{title}</span><span class="slider-value">{label}</span></span>
  <input type="range" name="{name}" min="{min}" max="{max}" step="{step}" value="{value}" style="--fill:{fill:.1}%">
  <span class="flex justify-between text-xs text-gray-500"><span>{t0}</span><span>{t1}</span><span>{t2}</span></span>
</label>"#,
        label = escape(&view.label),
        min = view.min,
        max = view.max,
        step = view.step,
        value = view.value,
        fill = view.fill_percent,
        t0 = view.ticks[0],
        t1 = view.ticks[1],
        t2 = view.ticks[2],
    )
}

fn archetype_options(selected: Archetype) -> String {
    Archetype::ALL
        .iter()
        .map(|a| {
            let attr = if *a == selected { " selected" } else { "" };
            format!(r#"<option value="{}"{attr}>{}</option>"#, a.as_str(), a.label())
        })
        .collect()
}

fn voice_panel(view: &WizardView) -> String {
    let voice = &view.voice;
    let status = match (&voice.error, voice.listening) {
        (Some(err), _) => format!(r#"<p class="alert alert-critical">{}</p>"#, escape(err)),
        (None, true) => r#"<p class="text-accent-cyan">Listening...</p>"#.to_string(),
        (None, false) => String::new(),
    };
    let extraction = match view.extraction.as_ref().and_then(|f| f.as_ref().map(|e| (e, f.is_synthetic()))) {
        Some((e, synthetic)) => format!(
            r#"<div class="extraction-preview">
  <p>{archetype} · {years} years · {income} TND/month · confidence {confidence}</p>
  {note}
  <button data-action="voice-apply" class="btn-primary">Use these details</button>
</div>"#,
            archetype = e.archetype.label(),
            years = e.years_active,
            income = e.monthly_income,
            confidence = super::percent(e.confidence),
            note = if synthetic { r#"<p class="text-xs text-gray-400">Sample data (offline extraction)</p>"# } else { "" },
        ),
        None => String::new(),
    };
    format!(
        r#"<section class="glass-card mb-8" id="voice-panel">
  <h3 class="text-xl font-bold mb-4">Voice Application</h3>
  <p class="text-sm text-gray-400 mb-2">Language: {language}</p>
  <button data-action="voice-toggle" class="btn-secondary">{toggle}</button>
  {status}
  <p class="transcript">{transcript}<span class="interim">{interim}</span></p>
  <button data-action="voice-complete" class="btn-primary">Extract details</button>
  {extraction}
</section>"#,
        language = voice.language.label(),
        toggle = if voice.listening { "Stop" } else { "Start speaking" },
        transcript = escape(&voice.transcript),
        interim = escape(&voice.interim),
    )
}

fn basic_info(view: &WizardView) -> String {
    let form = &view.form;
    let disabled = if view.can_continue { "" } else { " disabled" };
    format!(
        r#"<section class="glass-card">
  <h2 class="text-2xl font-bold mb-6">{title}</h2>
  <label class="block mb-4"><span>Full Name</span><input type="text" name="name" value="{name}" placeholder="Enter your name"></label>
  <label class="block mb-4"><span>Business Type</span><select name="archetype">{options}</select></label>
  {years}
  <label class="block mb-4"><span>Monthly Income (TND)</span><input type="number" name="monthly_income" value="{income}"></label>
  {debt}
  {stability}
  {regularity}
  <button data-action="next" class="btn-primary w-full"{disabled}>Continue to Documents →</button>
</section>"#,
        title = view.title,
        name = escape(&form.name),
        options = archetype_options(form.archetype),
        years = slider("years_active", "Years in Business", &view.sliders.years_active),
        income = form.monthly_income,
        debt = slider("debt_ratio", "Debt Ratio", &view.sliders.debt_ratio),
        stability = slider("income_stability", "Income Stability", &view.sliders.income_stability),
        regularity = slider(
            "payment_regularity",
            "Payment Regularity",
            &view.sliders.payment_regularity
        ),
    )
}

fn documents(view: &WizardView) -> String {
    let files: String = if view.documents.is_empty() {
        r#"<li class="text-gray-500">No files selected</li>"#.to_string()
    } else {
        view.documents
            .iter()
            .map(|name| format!("<li>{}</li>", escape(name)))
            .collect()
    };
    format!(
        r#"<section class="glass-card">
  <h2 class="text-2xl font-bold mb-6">{title}</h2>
  <input type="file" name="files" multiple accept="image/*">
  <ul class="file-list">{files}</ul>
  <div class="flex gap-4">
    <button data-action="back" class="btn-ghost">← Back</button>
    <button data-action="next" class="btn-primary">Continue to Review →</button>
  </div>
</section>"#,
        title = view.title,
    )
}

fn review(view: &WizardView) -> String {
    let form = &view.form;
    let error = view
        .error
        .as_deref()
        .map(|e| format!(r#"<p class="alert alert-critical">{}</p>"#, escape(e)))
        .unwrap_or_default();
    let submit = if view.submitting { "Submitting..." } else { "Submit Application" };
    format!(
        r#"<section class="glass-card">
  <h2 class="text-2xl font-bold mb-6">{title}</h2>
  <dl class="review-grid">
    <dt>Name</dt><dd>{name}</dd>
    <dt>Business Type</dt><dd>{archetype}</dd>
    <dt>Years Active</dt><dd>{years}</dd>
    <dt>Monthly Income</dt><dd>{income} TND</dd>
    <dt>Debt Ratio</dt><dd>{debt}</dd>
    <dt>Documents</dt><dd>{docs} file(s)</dd>
  </dl>
  {error}
  <div class="flex gap-4">
    <button data-action="back" class="btn-ghost">← Back</button>
    <button data-action="submit" class="btn-primary">{submit}</button>
  </div>
</section>"#,
        title = view.title,
        name = escape(&form.name),
        archetype = form.archetype.label(),
        years = view.sliders.years_active.label,
        income = form.monthly_income,
        debt = view.sliders.debt_ratio.label,
        docs = view.documents.len(),
    )
}

fn result(outcome: &ApplicationOutcome) -> anyhow::Result<String> {
    let headline = outcome.headline();
    let details = match outcome {
        ApplicationOutcome::PointCreated { client_id, snapshot } => {
            let pretty = serde_json::to_string_pretty(snapshot).context("failed to format created point")?;
            format!(
                r#"<p>Your application is recorded under <strong>{}</strong>.</p>
<pre class="bg-space-dark p-3 rounded text-sm overflow-auto">{}</pre>"#,
                escape(client_id),
                escape(&pretty)
            )
        }
        ApplicationOutcome::Received {
            client_id,
            message,
            next_steps,
            ..
        } => {
            let steps: String = next_steps
                .iter()
                .map(|s| format!("<li>{}</li>", escape(s)))
                .collect();
            format!(
                r#"<p>Reference <strong>{}</strong></p><p>{}</p><ol class="next-steps">{steps}</ol>"#,
                escape(client_id),
                escape(message)
            )
        }
    };
    Ok(format!(
        r#"<section class="glass-card text-center">
  <h2 class="text-3xl font-bold mb-4 text-risk-safe">{headline}</h2>
  {details}
  <a href="/" class="btn-ghost mt-6 inline-block">Back to Home</a>
</section>"#
    ))
}

pub fn render(view: &WizardView) -> anyhow::Result<Page> {
    let step_html = match view.step {
        WizardStep::BasicInfo => basic_info(view),
        WizardStep::Documents => documents(view),
        WizardStep::Review => review(view),
        WizardStep::Result => {
            let outcome = view
                .outcome
                .as_ref()
                .context("wizard reached the result step without an outcome")?;
            result(outcome)?
        }
    };
    let voice = if view.entry_mode == EntryMode::Voice && view.step == WizardStep::BasicInfo {
        voice_panel(view)
    } else {
        String::new()
    };
    let (manual_class, voice_class) = match view.entry_mode {
        EntryMode::Manual => ("btn-toggle active", "btn-toggle"),
        EntryMode::Voice => ("btn-toggle", "btn-toggle active"),
    };

    let body = format!(
        r#"<div class="min-h-screen p-8"><div class="max-w-3xl mx-auto">
  <a href="/" class="btn-ghost mb-8 inline-flex">← Back to Home</a>
  <div class="text-center mb-12">
    <h1 class="text-4xl font-bold mb-2 neon-text">Client Portal</h1>
    <p class="text-gray-400">Apply for credit in just a few simple steps</p>
  </div>
  <div class="flex items-center justify-center mb-12">{progress}</div>
  <div class="flex justify-center gap-2 mb-8">
    <button data-mode="manual" class="{manual_class}">Manual Entry</button>
    <button data-mode="voice" class="{voice_class}">Voice Entry</button>
  </div>
  {voice}
  {step_html}
  {state}
</div></div>"#,
        progress = progress(view.step),
        state = state_script("wizard-state", view)?,
    );
    Ok(Page::new("Client Portal", body))
}
