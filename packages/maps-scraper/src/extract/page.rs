//! Snapshot of a rendered listing page.
//!
//! Extraction runs against a parsed copy of the DOM rather than the live
//! session, so every field strategy is a pure function of the snapshot.

use scraper::{ElementRef, Html, Selector};

/// Parsed listing page plus the URL the browser settled on.
pub struct DetailPage {
    current_url: String,
    html: String,
    document: Html,
}

impl DetailPage {
    pub fn parse(current_url: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let document = Html::parse_document(&html);
        Self {
            current_url: current_url.into(),
            html,
            document,
        }
    }

    /// URL after navigation and client-side rewrites.
    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    /// Raw markup, including inline script payloads.
    pub fn html(&self) -> &str {
        &self.html
    }

    /// First element matching `css`. Invalid selectors match nothing.
    pub fn first(&self, css: &str) -> Option<ElementRef<'_>> {
        let selector = Selector::parse(css).ok()?;
        self.document.select(&selector).next()
    }

    /// Every element matching `css`.
    pub fn all(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(selector) => self.document.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Cleaned text of the first match, if non-empty.
    pub fn text(&self, css: &str) -> Option<String> {
        self.first(css).and_then(|el| non_empty(element_text(el)))
    }

    /// Trimmed attribute of the first match, if non-empty.
    pub fn attr(&self, css: &str, name: &str) -> Option<String> {
        self.first(css)
            .and_then(|el| el.value().attr(name))
            .and_then(|v| non_empty(clean_text(v)))
    }
}

/// All descendant text of `el`, cleaned.
pub fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Drop icon-font glyphs (Unicode private use area) and collapse whitespace.
pub fn clean_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !('\u{e000}'..='\u{f8ff}').contains(c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_strips_icon_glyphs() {
        assert_eq!(clean_text("\u{e0c8}  Jl. Sudirman\n No. 1 "), "Jl. Sudirman No. 1");
    }

    #[test]
    fn test_text_and_attr() {
        let page = DetailPage::parse(
            "https://maps/x",
            r#"<html><body><h1 class="a"> Kopi <b>Kenangan</b> </h1><a id="w" href=" https://kk.id ">x</a><p></p></body></html>"#,
        );

        assert_eq!(page.text("h1.a").as_deref(), Some("Kopi Kenangan"));
        assert_eq!(page.attr("a#w", "href").as_deref(), Some("https://kk.id"));
        assert_eq!(page.text("p"), None);
        assert_eq!(page.text("h2"), None);
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let page = DetailPage::parse("u", "<p>x</p>");
        assert!(page.first("p[").is_none());
        assert!(page.all("p[").is_empty());
    }
}
