//! Page-level catch-all: a failed or panicking render becomes a fallback screen.

use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
};

use tracing::error;

use crate::pages::{Page, escape};

pub const FALLBACK_TITLE: &str = "Something went wrong";
pub const RELOAD_LABEL: &str = "Reload page";

#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Page(Page),
    Fallback(Page),
}

impl Rendered {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Rendered::Fallback(_))
    }

    pub fn into_page(self) -> Page {
        match self {
            Rendered::Page(page) | Rendered::Fallback(page) => page,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ErrorBoundary {
    reload_href: &'static str,
}

impl ErrorBoundary {
    pub fn new(reload_href: &'static str) -> Self {
        Self { reload_href }
    }

    pub fn render<F>(&self, render: F) -> Rendered
    where
        F: FnOnce() -> anyhow::Result<Page>,
    {
        match catch_unwind(AssertUnwindSafe(render)) {
            Ok(Ok(page)) => Rendered::Page(page),
            Ok(Err(err)) => {
                error!(page = self.reload_href, error = %format!("{err:#}"), "page render failed");
                Rendered::Fallback(self.fallback(&format!("{err:#}")))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(page = self.reload_href, error = %message, "page render panicked");
                Rendered::Fallback(self.fallback(&message))
            }
        }
    }

    fn fallback(&self, message: &str) -> Page {
        let body = format!(
            r#"<div class="min-h-screen flex items-center justify-center p-8">
  <div class="glass-card max-w-xl w-full">
    <h2 class="text-2xl font-bold mb-4">{FALLBACK_TITLE}</h2>
    <pre class="bg-space-dark p-3 rounded text-sm overflow-auto">{message}</pre>
    <a class="btn-primary mt-6 inline-block" href="{href}">{RELOAD_LABEL}</a>
  </div>
</div>"#,
            message = escape(message),
            href = self.reload_href,
        );
        Page::new(FALLBACK_TITLE, body)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "render panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn successful_render_passes_through() {
        let rendered = ErrorBoundary::new("/client").render(|| Ok(Page::new("Client", "<p>ok</p>".into())));
        assert!(!rendered.is_fallback());
        assert_eq!(rendered.into_page().body, "<p>ok</p>");
    }

    #[test]
    fn errors_show_message_and_reload() {
        let rendered = ErrorBoundary::new("/client").render(|| Err(anyhow!("bad <state>")));
        assert!(rendered.is_fallback());
        let page = rendered.into_page();
        assert!(page.body.contains(FALLBACK_TITLE));
        assert!(page.body.contains("bad &lt;state&gt;"));
        assert!(page.body.contains(r#"href="/client">Reload page"#));
    }

    #[test]
    fn panics_are_caught() {
        let rendered = ErrorBoundary::new("/admin").render(|| panic!("boom"));
        assert!(rendered.is_fallback());
        assert!(rendered.into_page().body.contains("boom"));
    }
}
