//! Link policing: only allow-listed hosts survive, everything else points at
//! the site's events page.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

/// Hosts a newsletter link may point at. Subdomains are allowed.
const ALLOWED_DOMAINS: &[&str] = &[
    "sanluisway.com",
    "facebook.com",
    "fb.me",
    "instagram.com",
    "twitter.com",
    "x.com",
    "tiktok.com",
    "youtube.com",
    "youtu.be",
    "eventbrite.com",
    "eventbrite.com.mx",
    "ticketmaster.com.mx",
    "boletia.com",
    "eticket.mx",
    "google.com",
    "goo.gl",
];

/// Hosts models tend to invent when they have no real link.
const PLACEHOLDER_DOMAINS: &[&str] = &["example.com", "example.org", "yourwebsite", "website.com", "link.com"];

// A real attribute is preceded by whitespace, which keeps `data-href` out.
static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\s)href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

/// One matched `href` attribute.
struct Href<'a> {
    lead: &'a str,
    value: &'a str,
    quote: Option<char>,
}

impl<'a> Href<'a> {
    fn from_captures(caps: &Captures<'a>) -> Self {
        let lead = caps.get(1).map_or("", |m| m.as_str());
        let (value, quote) = if let Some(m) = caps.get(2) {
            (m.as_str(), Some('"'))
        } else if let Some(m) = caps.get(3) {
            (m.as_str(), Some('\''))
        } else {
            (caps.get(4).map_or("", |m| m.as_str()), None)
        };
        Self { lead, value, quote }
    }

    /// The attribute pointing at `target`, in the original quote style.
    /// Unquoted values come back double-quoted.
    fn pointing_at(&self, target: &str) -> String {
        let q = self.quote.unwrap_or('"');
        format!("{}href={q}{target}{q}", self.lead)
    }
}

pub fn is_allowed(href: &str) -> bool {
    let href = href.trim();
    if href.starts_with('#') || href.to_ascii_lowercase().starts_with("mailto:") {
        return true;
    }
    let Ok(parsed) = Url::parse(href) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    ALLOWED_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
}

fn looks_like_placeholder(href: &str) -> bool {
    if href.contains('[') || href.contains(']') {
        return true;
    }
    let host = Url::parse(href.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase));
    match host {
        Some(host) => PLACEHOLDER_DOMAINS.iter().any(|d| host.contains(d)),
        None => false,
    }
}

/// Rewrites every href outside the allow-list to `fallback`, then sweeps
/// anything still carrying brackets or a placeholder host.
pub fn validate_links(html: &str, fallback: &str) -> String {
    let mut replaced = 0usize;
    let first = HREF.replace_all(html, |caps: &Captures| {
        let href = Href::from_captures(caps);
        if is_allowed(href.value) {
            caps[0].to_string()
        } else {
            tracing::debug!(href = href.value, "replacing disallowed link");
            replaced += 1;
            href.pointing_at(fallback)
        }
    });

    let second = HREF.replace_all(&first, |caps: &Captures| {
        let href = Href::from_captures(caps);
        if looks_like_placeholder(href.value) {
            replaced += 1;
            href.pointing_at(fallback)
        } else {
            caps[0].to_string()
        }
    });

    if replaced > 0 {
        tracing::info!("Replaced {} unverified links with {}", replaced, fallback);
    }
    second.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: &str = "https://www.sanluisway.com/events";

    #[test]
    fn disallowed_links_fall_back() {
        let html = r#"<a href="https://example.com/fake">x</a>"#;
        assert_eq!(
            validate_links(html, EVENTS),
            r#"<a href="https://www.sanluisway.com/events">x</a>"#
        );
    }

    #[test]
    fn every_attribute_form_is_checked() {
        assert_eq!(
            validate_links("<a href='https://example.com/fake'>x</a>", EVENTS),
            "<a href='https://www.sanluisway.com/events'>x</a>"
        );
        assert_eq!(
            validate_links("<a href=https://example.com/fake>x</a>", EVENTS),
            r#"<a href="https://www.sanluisway.com/events">x</a>"#
        );
        assert_eq!(
            validate_links(r#"<a class="btn" HREF = "http://tickets.biz/a">x</a>"#, EVENTS),
            r#"<a class="btn" href="https://www.sanluisway.com/events">x</a>"#
        );
    }

    #[test]
    fn allowed_single_quoted_links_are_untouched() {
        let html = "<a href='https://www.instagram.com/sanluisway'>ig</a>";
        assert_eq!(validate_links(html, EVENTS), html);
    }

    #[test]
    fn relative_links_fall_back() {
        assert_eq!(
            validate_links(r#"<a href="/events">x</a>"#, EVENTS),
            r#"<a href="https://www.sanluisway.com/events">x</a>"#
        );
    }

    #[test]
    fn data_href_is_not_a_link() {
        let html = r#"<div data-href="https://example.com/track"><a href="https://www.sanluisway.com">x</a></div>"#;
        assert_eq!(validate_links(html, EVENTS), html);
    }

    #[test]
    fn allowed_links_are_untouched() {
        let html = concat!(
            r#"<a href="https://www.sanluisway.com/blog/enchiladas">a</a>"#,
            r#"<a href="https://www.facebook.com/events/123">b</a>"#,
            r#"<a href="https://www.eventbrite.com.mx/e/concierto">c</a>"#,
            r##"<a href="#events">d</a>"##,
            r#"<a href="mailto:info@sanluisway.com">e</a>"#,
        );
        assert_eq!(validate_links(html, EVENTS), html);
    }

    #[test]
    fn placeholder_hosts_are_matched_on_host_only() {
        let html = r#"<a href="https://www.sanluisway.com/blog/best-link.com-shorteners">x</a>"#;
        assert_eq!(validate_links(html, EVENTS), html);
        assert!(looks_like_placeholder("https://yourwebsite.com/page"));
        assert!(!looks_like_placeholder("https://www.sanluisway.com/website.com"));
    }

    #[test]
    fn lookalike_hosts_are_rejected() {
        assert!(!is_allowed("https://notfacebook.com/page"));
        assert!(!is_allowed("https://sanluisway.com.evil.io/"));
        assert!(!is_allowed("javascript:alert(1)"));
        assert!(!is_allowed("[NEWS_LINK_1]"));
        assert!(is_allowed("https://m.facebook.com/sanluisway"));
    }

    #[test]
    fn bracketed_hrefs_fall_back() {
        let html = r#"<a href="https://www.sanluisway.com/[SLUG]">x</a>"#;
        assert_eq!(
            validate_links(html, EVENTS),
            r#"<a href="https://www.sanluisway.com/events">x</a>"#
        );
    }
}
