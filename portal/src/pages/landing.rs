use super::Page;

struct RoleCard {
    href: &'static str,
    title: &'static str,
    blurb: &'static str,
    bullets: [&'static str; 4],
    cta: &'static str,
}

const ROLE_CARDS: [RoleCard; 2] = [
    RoleCard {
        href: "/client",
        title: "Client Portal",
        blurb: "Intuitive interface for applicants to submit credit applications and track their progress in real-time",
        bullets: [
            "Streamlined application workflow",
            "Document upload and verification",
            "Real-time status updates",
            "Personalized recommendations",
        ],
        cta: "Access Client Portal →",
    },
    RoleCard {
        href: "/admin",
        title: "Admin Dashboard",
        blurb: "Comprehensive analytics platform for credit officers and risk managers. Vector-powered intelligence.",
        bullets: [
            "3D vector space visualization",
            "Advanced fraud detection",
            "Counterfactual modeling",
            "Temporal risk tracking",
        ],
        cta: "Access Admin Center →",
    },
];

const FEATURES: [(&str, &str); 3] = [
    (
        "Evidence-Based",
        "Decisions backed by 50 similar cases, not opaque algorithms",
    ),
    (
        "AI-Generated Insights",
        "LLM-powered explanations for transparency and compliance",
    ),
    (
        "Fraud Detection",
        "Vector fingerprinting identifies synthetic identities and patterns",
    ),
];

fn render_card(card: &RoleCard) -> String {
    let bullets: String = card
        .bullets
        .iter()
        .map(|b| format!(r#"<li class="flex items-start gap-3"><span class="text-blue-400">→</span><span>{b}</span></li>"#))
        .collect();
    format!(
        r#"<a href="{href}" class="group role-card">
    <div class="card-surface">
        <h2 class="text-3xl font-bold mb-3">{title}</h2>
        <p class="text-slate-400 mb-8">{blurb}</p>
        <ul class="space-y-3 mb-8">{bullets}</ul>
        <div class="cta">{cta}</div>
    </div>
</a>"#,
        href = card.href,
        title = card.title,
        blurb = card.blurb,
        cta = card.cta,
    )
}

pub fn render() -> Page {
    let cards: String = ROLE_CARDS.iter().map(render_card).collect();
    let features: String = FEATURES
        .iter()
        .map(|(title, text)| {
            format!(
                r#"<div class="feature-card"><h3 class="font-bold text-lg mb-2">{title}</h3><p class="text-slate-400 text-sm">{text}</p></div>"#
            )
        })
        .collect();

    let body = format!(
        r#"<div class="min-h-screen flex items-center justify-center px-4">
  <div class="max-w-6xl w-full">
    <div class="text-center mb-20">
      <span class="pill">Enterprise Credit Intelligence</span>
      <h1 class="text-6xl font-bold mb-6">Vector CM</h1>
      <p class="text-xl text-slate-300 mb-4">Next-Generation Credit Scoring for Emerging Markets</p>
      <p class="text-slate-400 text-lg max-w-2xl mx-auto">Advanced vector similarity matching and AI-powered credit intelligence for the informal economy. Evidence-based decisions, not black boxes.</p>
    </div>
    <div class="grid md:grid-cols-2 gap-8 max-w-4xl mx-auto mb-20">{cards}</div>
    <div class="grid md:grid-cols-3 gap-6">{features}</div>
  </div>
</div>"#
    );
    Page::new("Vector CM", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_both_roles() {
        let page = render();
        assert!(page.body.contains(r#"href="/client""#));
        assert!(page.body.contains(r#"href="/admin""#));
        assert!(page.body.contains("Vector CM"));
        assert!(page.body.contains("Fraud Detection"));
    }
}
