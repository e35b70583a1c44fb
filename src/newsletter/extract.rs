//! Pulls the fact, tip and place an issue featured out of the model output.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::models::{SectionType, UsedItem, UsedKind};

use super::sections::definition;

static META: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--\s*NEWSLETTER_META\s*(\{.*?\})\s*-->").unwrap());
static TITLED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h3\b[^>]*>(.*?)</h3>\s*<p\b[^>]*>(.*?)</p>").unwrap()
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// How far past a heading the fallback looks when a section has no markers.
const HEADING_WINDOW: usize = 3000;

#[derive(Debug, Default, Deserialize)]
struct Meta {
    fact: Option<MetaItem>,
    tip: Option<MetaItem>,
    place: Option<MetaItem>,
}

#[derive(Debug, Deserialize)]
struct MetaItem {
    #[serde(alias = "name")]
    title: String,
    #[serde(alias = "description", default)]
    body: String,
}

impl MetaItem {
    fn into_used(self) -> Option<UsedItem> {
        let title = clean_text(&self.title);
        (!title.is_empty()).then(|| UsedItem::new(title, clean_text(&self.body)))
    }
}

/// The fact, tip and place an issue featured.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractedItems {
    pub fact: Option<UsedItem>,
    pub tip: Option<UsedItem>,
    pub place: Option<UsedItem>,
}

impl ExtractedItems {
    pub fn is_empty(&self) -> bool {
        self.fact.is_none() && self.tip.is_none() && self.place.is_none()
    }

    pub fn into_records(self) -> Vec<(UsedKind, UsedItem)> {
        [
            (UsedKind::Fact, self.fact),
            (UsedKind::Tip, self.tip),
            (UsedKind::Place, self.place),
        ]
        .into_iter()
        .filter_map(|(kind, item)| item.map(|item| (kind, item)))
        .collect()
    }

    fn or(self, other: ExtractedItems) -> ExtractedItems {
        ExtractedItems {
            fact: self.fact.or(other.fact),
            tip: self.tip.or(other.tip),
            place: self.place.or(other.place),
        }
    }
}

/// Reads the structured comment from the raw model output, then fills any
/// gaps by scanning the cleaned HTML.
pub fn extract_used_items(raw: &str, cleaned: &str) -> ExtractedItems {
    let from_meta = extract_from_meta(raw);
    if from_meta.is_empty() {
        tracing::debug!("No usable NEWSLETTER_META comment, scanning sections");
    }
    from_meta.or(extract_from_html(cleaned))
}

pub fn extract_from_meta(raw: &str) -> ExtractedItems {
    let Some(caps) = META.captures(raw) else {
        return ExtractedItems::default();
    };
    match serde_json::from_str::<Meta>(&caps[1]) {
        Ok(meta) => ExtractedItems {
            fact: meta.fact.and_then(MetaItem::into_used),
            tip: meta.tip.and_then(MetaItem::into_used),
            place: meta.place.and_then(MetaItem::into_used),
        },
        Err(e) => {
            tracing::warn!("NEWSLETTER_META comment is not valid JSON: {}", e);
            ExtractedItems::default()
        }
    }
}

pub fn extract_from_html(html: &str) -> ExtractedItems {
    ExtractedItems {
        fact: titled_block(html, SectionType::Fact, "Did You Know"),
        tip: titled_block(html, SectionType::Tip, "Expat Tip"),
        place: titled_block(html, SectionType::Place, "Place of the Week"),
    }
}

fn section_slice<'a>(html: &'a str, section_type: SectionType, heading: &str) -> Option<&'a str> {
    if let Some(def) = definition(section_type) {
        if let Some(start) = def.start_pattern.find(html) {
            if let Some(end) = def.end_pattern.find_at(html, start.end()) {
                return Some(&html[start.end()..end.start()]);
            }
        }
    }
    let at = html.find(heading)?;
    let end = html[at..]
        .char_indices()
        .nth(HEADING_WINDOW)
        .map(|(i, _)| at + i)
        .unwrap_or(html.len());
    Some(&html[at..end])
}

fn titled_block(html: &str, section_type: SectionType, heading: &str) -> Option<UsedItem> {
    let slice = section_slice(html, section_type, heading)?;
    let caps = TITLED_BLOCK.captures(slice)?;
    let title = clean_text(&caps[1]);
    if title.is_empty() {
        return None;
    }
    Some(UsedItem::new(title, clean_text(&caps[2])))
}

fn clean_text(fragment: &str) -> String {
    let text = TAG.replace_all(fragment, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    SPACES.replace_all(text.trim(), " ").into_owned()
}
