//! Cleanup applied to raw model output before it is stored or sent.
//!
//! Every step is a plain `&str -> String` function so they can be tested and
//! reused individually (section regeneration runs a subset). The order in
//! [`PostProcessor::process`] matters: placeholders must be gone before empty
//! containers are detected, and the document shell must be gone before the
//! footer cascade runs.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::inject::inject_footer;
use super::links::validate_links;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| re(r"(?m)^[ \t]*```[A-Za-z]*[ \t]*\r?\n?"));
static META_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?s)<!--\s*NEWSLETTER_META.*?-->\s*"));

static PREFIXED_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    re(r"\[(?:HERO|WEATHER|NEWS|EVENT|FACT|TIP|PLACE|CTA|NEWSLETTER|COMMUNITY)_[A-Z0-9_]*\]")
});
static BARE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    re(r"\[(?:DATE|TIME|LINK|URL|TITLE|NAME|LOCATION|ADDRESS|PRICE|DESCRIPTION|IMAGE|IMAGE_URL|SOURCE|VENUE)\]")
});
static AUTHORING_HINT: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\[(?:insert|add|include|write|describe|enter|replace|your|optional|placeholder)\b[^\]\n]{0,200}\]")
});

static EMPTY_WHY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)<p\b[^>]*>\s*<strong>\s*Why it matters:?\s*</strong>\s*(?:&nbsp;)?\s*</p>\s*")
});
static EMPTY_WHY_INLINE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)<strong>\s*Why it matters:?\s*</strong>\s*(</(?:p|li|div|span)>)")
});
static EMPTY_LI: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)<li\b[^>]*>(?:\s|&nbsp;|</?(?:p|a|strong|em|b|i|span|br|div)\b[^>]*>)*?</li>\s*")
});
static EMPTY_EVENT_CARD: LazyLock<Regex> = LazyLock::new(|| {
    re(r#"(?is)<div\s+class="event-card"[^>]*>\s*<p\b[^>]*>\s*</p>.*?</div>\s*"#)
});

static DOCTYPE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)<!DOCTYPE[^>]*>\s*"));
static CONDITIONAL_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)<!--\[if[^\]]*\]>.*?<!\[endif\]-->\s*"));
static HEAD: LazyLock<Regex> = LazyLock::new(|| re(r"(?is)<head\b.*?</head>\s*"));
static STYLE: LazyLock<Regex> = LazyLock::new(|| re(r"(?is)<style\b.*?</style>\s*"));
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)</?html\b[^>]*>\s*"));
static BODY_TAG: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)</?body\b[^>]*>\s*"));

static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| re(r#"(?i)\s+class\s*=\s*"[^"]*""#));
static ROLE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?i)\s+role\s*=\s*"presentation""#));

static GRADIENT: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)background(?:-image)?\s*:\s*linear-gradient\(((?:[^()]|\([^()]*\))*)\)")
});
static COLOR: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)#[0-9a-f]{3,8}\b|rgba?\([^()]*\)"));
static BOX_SHADOW: LazyLock<Regex> = LazyLock::new(|| re(r#"(?i)\s*box-shadow\s*:[^;"]*;?"#));

static IMG: LazyLock<Regex> = LazyLock::new(|| re(r"(?is)<img\b[^>]*>\s*"));
static EMPTY_CONTAINERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["a", "p", "div", "center", "span"]
        .iter()
        .map(|tag| re(&format!(r"(?i)<{tag}\b[^>]*>(?:\s|&nbsp;)*</{tag}>\s*")))
        .collect()
});

/// Flat replacements for the template's own gradients, keyed by first stop.
const KNOWN_GRADIENTS: &[(&str, &str)] = &[
    ("#1e3a8a", "#1e40af"),
    ("#e0f2fe", "#e0f2fe"),
    ("#f59e0b", "#f97316"),
];
const GRADIENT_DEFAULT: &str = "#ffffff";

pub fn strip_meta_comment(html: &str) -> String {
    META_COMMENT.replace_all(html, "").into_owned()
}

pub fn strip_code_fences(html: &str) -> String {
    CODE_FENCE.replace_all(html, "").trim().to_string()
}

pub fn remove_placeholders(html: &str) -> String {
    let html = PREFIXED_PLACEHOLDER.replace_all(html, "");
    let html = BARE_PLACEHOLDER.replace_all(&html, "");
    AUTHORING_HINT.replace_all(&html, "").into_owned()
}

pub fn remove_empty_items(html: &str) -> String {
    let html = EMPTY_WHY_LINE.replace_all(html, "");
    let html = EMPTY_WHY_INLINE.replace_all(&html, "$1");
    let html = EMPTY_EVENT_CARD.replace_all(&html, "");
    EMPTY_LI.replace_all(&html, "").into_owned()
}

pub fn strip_document_shell(html: &str) -> String {
    let html = DOCTYPE.replace_all(html, "");
    let html = CONDITIONAL_COMMENT.replace_all(&html, "");
    let html = HEAD.replace_all(&html, "");
    let html = STYLE.replace_all(&html, "");
    let html = HTML_TAG.replace_all(&html, "");
    BODY_TAG.replace_all(&html, "").into_owned()
}

pub fn strip_layout_attributes(html: &str) -> String {
    let html = CLASS_ATTR.replace_all(html, "");
    ROLE_ATTR.replace_all(&html, "").into_owned()
}

pub fn flatten_styles(html: &str) -> String {
    let html = GRADIENT.replace_all(html, |caps: &Captures| {
        let first = COLOR
            .find(&caps[1])
            .map(|m| m.as_str().to_ascii_lowercase());
        let flat = match first.as_deref() {
            Some(color) => KNOWN_GRADIENTS
                .iter()
                .find(|(stop, _)| *stop == color)
                .map(|(_, flat)| (*flat).to_string())
                .unwrap_or_else(|| color.to_string()),
            None => GRADIENT_DEFAULT.to_string(),
        };
        format!("background-color: {flat}")
    });
    BOX_SHADOW.replace_all(&html, "").into_owned()
}

/// Drops every `<img>` and any container left empty by it. Stable when
/// applied twice.
pub fn remove_images(html: &str) -> String {
    let mut out = IMG.replace_all(html, "").into_owned();
    // nested empties collapse one level per pass; each pass only shrinks
    loop {
        let before = out.len();
        for pattern in EMPTY_CONTAINERS.iter() {
            out = pattern.replace_all(&out, "").into_owned();
        }
        if out.len() == before {
            return out;
        }
    }
}

pub struct PostProcessor {
    fallback_link: String,
}

impl PostProcessor {
    pub fn new(fallback_link: impl Into<String>) -> Self {
        Self {
            fallback_link: fallback_link.into(),
        }
    }

    pub fn process(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            tracing::warn!("post-processing an empty document");
        }
        let html = strip_meta_comment(raw);
        let html = strip_code_fences(&html);
        let html = remove_placeholders(&html);
        let html = remove_empty_items(&html);
        let html = strip_document_shell(&html);
        let html = strip_layout_attributes(&html);
        let html = flatten_styles(&html);
        let html = validate_links(&html, &self.fallback_link);
        let html = remove_images(&html);
        inject_footer(&html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newsletter::template::{CLOSING_FOOTER_MARKER, NEWSLETTER_TEMPLATE};

    #[test]
    fn images_are_removed() {
        let out = remove_images(r#"<p>before</p><img src="x.jpg"><p>after</p>"#);
        assert!(!out.contains("<img"));
        assert_eq!(out, "<p>before</p><p>after</p>");
    }

    #[test]
    fn image_removal_is_stable() {
        let html = r#"<div><a href="https://www.sanluisway.com"><img src="a.png" /></a></div><p>keep</p>"#;
        let once = remove_images(html);
        assert_eq!(once, "<p>keep</p>");
        assert_eq!(remove_images(&once), once);
    }

    #[test]
    fn deeply_nested_empties_collapse_in_one_call() {
        let html = format!(
            "{}<img src=\"a.png\">{}<p>keep</p>",
            "<div>".repeat(8),
            "</div>".repeat(8)
        );
        let once = remove_images(&html);
        assert_eq!(once, "<p>keep</p>");
        assert_eq!(remove_images(&once), once);
    }

    #[test]
    fn empty_input_does_not_panic() {
        let processor = PostProcessor::new("https://www.sanluisway.com/events");
        let out = processor.process("");
        assert!(out.contains("Hasta la próxima"));
        assert_eq!(remove_images(""), "");
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fences("```html\n<p>x</p>\n```"), "<p>x</p>");
        assert_eq!(strip_code_fences("<p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn placeholders_and_hints_are_removed() {
        let html = "<p>[NEWS_SUMMARY_2]</p><p>[DATE]</p><p>[Insert a fun fact here]</p><p>[sic]</p>";
        assert_eq!(remove_placeholders(html), "<p></p><p></p><p></p><p>[sic]</p>");
    }

    #[test]
    fn empty_news_items_are_dropped() {
        let html = concat!(
            "<ul>",
            "<li><p><a href=\"https://www.sanluisway.com\">Real</a></p><p><strong>Why it matters:</strong> Traffic.</p></li>",
            "<li><p><a href=\"\"></a></p><p></p><p><strong>Why it matters:</strong> </p></li>",
            "</ul>"
        );
        let out = remove_empty_items(html);
        assert_eq!(out.matches("<li>").count(), 1);
        assert!(out.contains("Traffic."));
        assert!(out.ends_with("</ul>"));
    }

    #[test]
    fn document_shell_is_stripped() {
        let out = strip_document_shell(NEWSLETTER_TEMPLATE);
        assert!(!out.to_lowercase().contains("<!doctype"));
        assert!(!out.contains("<head"));
        assert!(!out.contains("<style"));
        assert!(!out.contains("<body"));
        assert!(!out.contains("</html>"));
        assert!(!out.contains("[if mso]"));
        assert!(out.contains("SECTION_START:header"));
    }

    #[test]
    fn gradients_become_flat_colors() {
        let html = r#"<td style="background: linear-gradient(135deg, #1e3a8a 0%, #3b82f6 100%); padding: 4px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">"#;
        assert_eq!(
            flatten_styles(html),
            r#"<td style="background-color: #1e40af; padding: 4px;">"#
        );

        let unknown = r#"<td style="background: linear-gradient(to right, rgba(1,2,3,0.5), #fff)">"#;
        assert_eq!(
            flatten_styles(unknown),
            r#"<td style="background-color: rgba(1,2,3,0.5)">"#
        );
    }

    #[test]
    fn layout_attributes_are_removed() {
        let html = r#"<table role="presentation" class="container" width="600">"#;
        assert_eq!(strip_layout_attributes(html), r#"<table width="600">"#);
    }

    #[test]
    fn full_pipeline_on_unfilled_template() {
        let processor = PostProcessor::new("https://www.sanluisway.com/events");
        let raw = format!(
            "```html\n{}\n<!-- NEWSLETTER_META {{\"fact\":null}} -->\n```",
            NEWSLETTER_TEMPLATE
        );
        let out = processor.process(&raw);

        assert!(!out.contains('['), "placeholder left in output");
        assert!(!out.contains("<img"));
        assert!(!out.contains("```"));
        assert!(!out.contains("NEWSLETTER_META"));
        assert!(!out.contains("linear-gradient"));
        assert!(!out.contains("class="));
        assert!(!out.contains(CLOSING_FOOTER_MARKER));
        assert_eq!(out.matches("Hasta la próxima").count(), 1);
        assert!(out.contains("SECTION_START:fact"));
    }
}
