//! Splicing fixed fragments (closing footer, community block) into a
//! generated document at the first anchor that matches.

use crate::models::SectionType;

use super::template::{
    section_end, section_start, CLOSING_FOOTER, CLOSING_FOOTER_MARKER, COMMUNITY_MARKER,
};

/// Where a fragment can go, tried in order until one anchor is present.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Anchor {
    /// Replace this exact marker.
    Replace(String),
    /// Insert immediately before the first occurrence.
    Before(String),
    /// Insert immediately after the last occurrence.
    AfterLast(String),
}

impl Anchor {
    fn describe(&self) -> String {
        match self {
            Anchor::Replace(m) => format!("replace {m}"),
            Anchor::Before(m) => format!("before {m}"),
            Anchor::AfterLast(m) => format!("after {m}"),
        }
    }

    fn apply(&self, html: &str, fragment: &str) -> Option<String> {
        match self {
            Anchor::Replace(marker) => {
                let at = html.find(marker.as_str())?;
                Some(splice(html, at, at + marker.len(), fragment))
            }
            Anchor::Before(marker) => {
                let at = find_ci(html, marker)?;
                Some(splice(html, at, at, &format!("{fragment}\n")))
            }
            Anchor::AfterLast(marker) => {
                let at = rfind_ci(html, marker)? + marker.len();
                Some(splice(html, at, at, &format!("\n{fragment}")))
            }
        }
    }
}

fn splice(html: &str, from: usize, to: usize, fragment: &str) -> String {
    let mut out = String::with_capacity(html.len() + fragment.len());
    out.push_str(&html[..from]);
    out.push_str(fragment);
    out.push_str(&html[to..]);
    out
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

fn rfind_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .rfind(&needle.to_ascii_lowercase())
}

/// Tries each anchor in order; appends when none matches.
fn inject_with(label: &str, html: &str, fragment: &str, anchors: &[Anchor]) -> String {
    for (i, anchor) in anchors.iter().enumerate() {
        if let Some(out) = anchor.apply(html, fragment) {
            if i == 0 {
                tracing::debug!("{} injected ({})", label, anchor.describe());
            } else {
                tracing::info!("{} injected via fallback: {}", label, anchor.describe());
            }
            return out;
        }
    }
    tracing::warn!("{} anchors not found, appending to the end of the document", label);
    format!("{html}\n{fragment}")
}

fn footer_anchors() -> Vec<Anchor> {
    vec![
        Anchor::Replace(CLOSING_FOOTER_MARKER.to_string()),
        Anchor::AfterLast(section_end(SectionType::Cta)),
        Anchor::AfterLast(section_end(SectionType::Community)),
        Anchor::AfterLast(section_end(SectionType::Place)),
        Anchor::AfterLast("<!-- SECTION_END:".to_string()),
        Anchor::Before("</table>\n</td>\n</tr>\n</table>".to_string()),
        Anchor::Before("</body>".to_string()),
    ]
}

fn community_anchors() -> Vec<Anchor> {
    vec![
        Anchor::Replace(COMMUNITY_MARKER.to_string()),
        Anchor::Before(section_start(SectionType::Cta)),
        Anchor::AfterLast(section_end(SectionType::Place)),
        Anchor::Before(section_start(SectionType::Footer)),
        Anchor::Before(CLOSING_FOOTER_MARKER.to_string()),
        Anchor::Before("</body>".to_string()),
    ]
}

/// Splices the fixed sign-off into the document. Idempotent.
pub fn inject_footer(html: &str) -> String {
    if html.contains(&section_start(SectionType::Footer)) {
        return html.replace(CLOSING_FOOTER_MARKER, "");
    }
    inject_with("Closing footer", html, CLOSING_FOOTER, &footer_anchors())
}

pub fn inject_community(html: &str, fragment: &str) -> String {
    inject_with("Community section", html, fragment, &community_anchors())
}

/// Drops the community marker when there is nothing to put there.
pub fn clear_community_marker(html: &str) -> String {
    html.replace(COMMUNITY_MARKER, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footer_replaces_marker() {
        let html = format!("<p>a</p>{CLOSING_FOOTER_MARKER}<p>b</p>");
        let out = inject_footer(&html);
        assert_eq!(out, format!("<p>a</p>{CLOSING_FOOTER}<p>b</p>"));
    }

    #[test]
    fn footer_falls_back_to_after_cta() {
        let html = format!(
            "{}<p>cta</p>{}<p>tail</p>",
            section_start(SectionType::Cta),
            section_end(SectionType::Cta)
        );
        let out = inject_footer(&html);
        let cta_end = out.find(&section_end(SectionType::Cta)).unwrap();
        let footer_at = out.find("Hasta la próxima").unwrap();
        let tail_at = out.find("<p>tail</p>").unwrap();
        assert!(cta_end < footer_at && footer_at < tail_at);
    }

    #[test]
    fn footer_goes_before_body_close() {
        let out = inject_footer("<body><p>x</p></BODY>");
        assert!(out.find("Hasta la próxima").unwrap() < out.find("</BODY>").unwrap());
    }

    #[test]
    fn footer_appends_as_last_resort() {
        let out = inject_footer("<p>bare</p>");
        assert!(out.starts_with("<p>bare</p>"));
        assert!(out.ends_with(CLOSING_FOOTER));
    }

    #[test]
    fn footer_is_not_duplicated() {
        let once = inject_footer(CLOSING_FOOTER_MARKER);
        let twice = inject_footer(&once);
        assert_eq!(once, twice);
        assert_eq!(twice.matches("Hasta la próxima").count(), 1);
    }

    #[test]
    fn community_goes_before_cta_without_marker() {
        let html = format!("<p>place</p>{}<p>cta</p>", section_start(SectionType::Cta));
        let out = inject_community(&html, "<tr>community</tr>");
        assert!(out.find("community").unwrap() < out.find("SECTION_START:cta").unwrap());
    }

    #[test]
    fn community_replaces_marker() {
        let html = format!("<p>a</p>{COMMUNITY_MARKER}<p>b</p>");
        assert_eq!(
            inject_community(&html, "<tr>c</tr>"),
            "<p>a</p><tr>c</tr><p>b</p>"
        );
    }
}
