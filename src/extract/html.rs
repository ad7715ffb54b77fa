// src/extract/html.rs
// =============================================================================
// Small helpers over the `scraper` crate shared by all site rules.
//
// They mirror how the rules think about a page: "the text of the first
// element matching X", "attribute Y of the first element matching X".
// A missing element gives an empty string, never an error, since a page
// that lacks a field is normal.
//
// We also use the `url` crate here for the URL side of the rules:
// query parameters, scheme://host of a site, relative link resolution.
// =============================================================================

use scraper::{ElementRef, Html, Selector};
use url::Url;

// Text of the first element matching `css`, all descendant text included
pub fn select_text(doc: &Html, css: &str) -> String {
    first(doc, css)
        .map(|element| element.text().collect())
        .unwrap_or_default()
}

// Attribute of the first element matching `css`
pub fn select_attr(doc: &Html, css: &str, attr: &str) -> String {
    first(doc, css)
        .and_then(|element| element.value().attr(attr))
        .unwrap_or_default()
        .to_string()
}

// Attribute of every element matching `css`, in document order
pub fn select_attrs(doc: &Html, css: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::to_string)
        .collect()
}

// (href, trimmed text) of every link matching `css`, in document order
pub fn select_links(doc: &Html, css: &str) -> Vec<(String, String)> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let text: String = element.text().collect();
            Some((href.to_string(), text.trim().to_string()))
        })
        .collect()
}

pub fn exists(doc: &Html, css: &str) -> bool {
    first(doc, css).is_some()
}

// Readable text of the first element matching `css`, skipping the contents
// of <script> and <style> tags
pub fn select_visible_text(doc: &Html, css: &str) -> String {
    first(doc, css).map(visible_text).unwrap_or_default()
}

// Readable text of the whole <body>
pub fn body_text(doc: &Html) -> String {
    select_visible_text(doc, "body")
}

fn first<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    // Selectors are string literals in the site rules; an invalid one
    // simply never matches
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector).next()
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        let Some(chunk) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style"))
        });
        if !hidden {
            text.push_str(chunk);
        }
    }
    text
}

// host[:port] of a parsed URL, the routing key of the pipeline
pub fn netloc(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

// scheme://host[:port] of a URL, or "" when it does not parse
//
// Example:
//   "https://pantheon.io/careers/apply?x=1" -> "https://pantheon.io"
pub fn site_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => format!("{}://{}", parsed.scheme(), netloc(&parsed)),
        Err(_) => String::new(),
    }
}

// First non-empty value of a query parameter
pub fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(name, value)| name == key && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

// Resolves a possibly relative or scheme-less link found on a page
//
// Examples:
//   base = "https://acme.com/careers"
//   "//boards.greenhouse.io/embed/job_board/js?for=acme" -> https://boards...
//   "/jobs" -> https://acme.com/jobs
pub fn resolve(base: &str, href: &str) -> Option<Url> {
    if let Ok(url) = Url::parse(href) {
        return Some(url);
    }
    if let Some(url) = Url::parse(base).ok().and_then(|base| base.join(href).ok()) {
        return Some(url);
    }
    if href.starts_with("//") {
        return Url::parse(&format!("https:{}", href)).ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head><title>Job</title><meta property="og:url" content=" https://x.io/1 "></head>
          <body>
            <div id="job">Rust <b>developer</b><script>var python = 1;</script></div>
            <style>.go { color: red }</style>
            <a href="/about">About</a>
            <a href="https://acme.io/careers">Careers</a>
          </body>
        </html>
    "#;

    #[test]
    fn test_select_text_and_attr() {
        let doc = Html::parse_document(PAGE);
        assert_eq!(select_text(&doc, "div#job b"), "developer");
        assert_eq!(
            select_attr(&doc, r#"meta[property="og:url"]"#, "content").trim(),
            "https://x.io/1"
        );
        assert_eq!(select_text(&doc, "div#missing"), "");
        assert!(exists(&doc, "div#job"));
    }

    #[test]
    fn test_visible_text_skips_scripts_and_styles() {
        let doc = Html::parse_document(PAGE);
        let text = body_text(&doc);
        assert!(text.contains("Rust developer"));
        assert!(!text.contains("python"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn test_select_attrs() {
        let doc = Html::parse_document(PAGE);
        assert_eq!(
            select_attrs(&doc, "a[href]", "href"),
            vec!["/about", "https://acme.io/careers"]
        );
    }

    #[test]
    fn test_select_links() {
        let doc = Html::parse_document(PAGE);
        assert_eq!(
            select_links(&doc, "a"),
            vec![
                ("/about".to_string(), "About".to_string()),
                ("https://acme.io/careers".to_string(), "Careers".to_string()),
            ]
        );
    }

    #[test]
    fn test_site_url() {
        assert_eq!(site_url("https://pantheon.io/careers/apply?x=1"), "https://pantheon.io");
        assert_eq!(site_url("http://localhost:8080/a"), "http://localhost:8080");
        assert_eq!(site_url("not a url"), "");
    }

    #[test]
    fn test_query_value_skips_blank_values() {
        let url = Url::parse("https://a.io/?gh_jid=&gh_jid=42&for=acme").unwrap();
        assert_eq!(query_value(&url, "gh_jid"), Some("42".to_string()));
        assert_eq!(query_value(&url, "missing"), None);
    }

    #[test]
    fn test_resolve_scheme_relative() {
        let url = resolve("", "//boards.greenhouse.io/embed/job_board/js?for=acme").unwrap();
        assert_eq!(url.host_str(), Some("boards.greenhouse.io"));
        let url = resolve("http://acme.com/careers", "//cdn.acme.com/x.js").unwrap();
        assert_eq!(url.scheme(), "http");
    }
}
