//! Server-rendered pages and the shared shell around them.

pub mod admin;
pub mod client;
pub mod landing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Landing,
    Client,
    Admin,
}

impl Route {
    /// Exactly one page per known path; anything else is not a page.
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/" => Some(Route::Landing),
            "/client" => Some(Route::Client),
            "/admin" => Some(Route::Admin),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Client => "/client",
            Route::Admin => "/admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub title: String,
    pub body: String,
}

impl Page {
    pub fn new(title: &str, body: String) -> Self {
        Self {
            title: title.to_string(),
            body,
        }
    }
}

const BACKGROUND_HTML: &str = r#"<div class="particle-background" aria-hidden="true">
    <div class="stars stars-small"></div>
    <div class="stars stars-medium"></div>
    <div class="stars stars-large"></div>
</div>"#;

/// Full document: shared background behind the page body.
pub fn layout(page: &Page) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title} | Vector CM</title>
    <link rel="stylesheet" href="/static/css/portal.css">
</head>
<body class="bg-space-darkest text-white">
{background}
<main class="relative z-10">
{body}
</main>
</body>
</html>"#,
        title = escape(&page.title),
        background = BACKGROUND_HTML,
        body = page.body,
    )
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_known_path_maps_to_one_page() {
        assert_eq!(Route::from_path("/"), Some(Route::Landing));
        assert_eq!(Route::from_path("/client"), Some(Route::Client));
        assert_eq!(Route::from_path("/admin"), Some(Route::Admin));
        assert_eq!(Route::from_path("/admin/"), None);
        assert_eq!(Route::from_path("/nope"), None);
        assert_eq!(Route::Client.path(), "/client");
    }

    #[test]
    fn layout_wraps_body_in_shared_background() {
        let html = layout(&Page::new("Admin <1>", "<section>x</section>".into()));
        assert!(html.contains("particle-background"));
        assert!(html.contains("<section>x</section>"));
        assert!(html.contains("Admin &lt;1&gt; | Vector CM"));
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}
