//! Splitting a stored newsletter into editable sections and splicing edited
//! sections back in.

use std::sync::{Arc, LazyLock};

use chrono::NaiveDate;
use regex::Regex;

use crate::ai::{validate_response, GenerationRequest, ProviderChain};
use crate::error::{AppError, Result};
use crate::models::{NewsletterSection, SectionType};
use crate::services::WeatherClient;

use super::dates::{GenerationWindow, MonthContext};
use super::links::validate_links;
use super::postprocess::{remove_images, strip_code_fences};
use super::prompt::{build_section_prompt, NEWSLETTER_SYSTEM};
use super::template::{section_end, section_start};

/// Fallback extent of a section whose end marker is missing.
pub const MISSING_END_SLICE: usize = 5000;
/// Anything shorter is a stray marker pair, not a section.
pub const MIN_SECTION_LEN: usize = 80;

pub struct SectionDef {
    pub id: &'static str,
    pub name: &'static str,
    pub section_type: SectionType,
    pub start_pattern: Regex,
    pub end_pattern: Regex,
    pub editable: bool,
}

impl SectionDef {
    fn new(section_type: SectionType, name: &'static str, editable: bool) -> Self {
        let id = section_type.id();
        Self {
            id,
            name,
            section_type,
            start_pattern: Regex::new(&format!(r"<!--\s*SECTION_START:{id}\s*-->")).unwrap(),
            end_pattern: Regex::new(&format!(r"<!--\s*SECTION_END:{id}\s*-->")).unwrap(),
            editable,
        }
    }

    /// Byte range of this section, and whether the end marker was found.
    fn locate(&self, html: &str) -> Option<(usize, usize, bool)> {
        let start = self.start_pattern.find(html)?;
        match self.end_pattern.find_at(html, start.end()) {
            Some(end) => Some((start.start(), end.end(), true)),
            None => {
                let end = char_boundary_after(html, start.start(), MISSING_END_SLICE);
                Some((start.start(), end, false))
            }
        }
    }
}

fn char_boundary_after(html: &str, from: usize, max_chars: usize) -> usize {
    html[from..]
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| from + i)
        .unwrap_or(html.len())
}

pub static SECTION_DEFS: LazyLock<Vec<SectionDef>> = LazyLock::new(|| {
    vec![
        SectionDef::new(SectionType::Header, "Header", true),
        SectionDef::new(SectionType::Weather, "Weather", true),
        SectionDef::new(SectionType::News, "Local News", true),
        SectionDef::new(SectionType::Events, "Events", true),
        SectionDef::new(SectionType::Fact, "Did You Know?", true),
        SectionDef::new(SectionType::Tip, "Expat Tip", true),
        SectionDef::new(SectionType::Place, "Place of the Week", true),
        SectionDef::new(SectionType::Community, "Community", false),
        SectionDef::new(SectionType::Cta, "Call to Action", true),
        SectionDef::new(SectionType::Footer, "Footer", false),
    ]
});

pub fn definition(section_type: SectionType) -> Option<&'static SectionDef> {
    SECTION_DEFS.iter().find(|d| d.section_type == section_type)
}

/// Finds every known section in document order.
pub fn parse_sections(html: &str) -> Vec<NewsletterSection> {
    let mut found: Vec<(usize, NewsletterSection)> = Vec::new();

    for def in SECTION_DEFS.iter() {
        let Some((start, end, end_found)) = def.locate(html) else {
            continue;
        };
        if !end_found {
            tracing::warn!(
                "Section '{}' has no end marker, using the next {} characters",
                def.id,
                MISSING_END_SLICE
            );
        }
        let slice = &html[start..end];
        if slice.len() < MIN_SECTION_LEN {
            tracing::debug!("Skipping section '{}' ({} bytes)", def.id, slice.len());
            continue;
        }
        found.push((
            start,
            NewsletterSection {
                id: def.id.to_string(),
                name: def.name.to_string(),
                section_type: def.section_type,
                html: slice.to_string(),
                editable: def.editable,
                end_found,
            },
        ));
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, section)| section).collect()
}

/// Splices edited sections back into `original` by re-locating their
/// markers. Sections that can no longer be located are left as they were.
pub fn reconstruct(original: &str, edits: &[NewsletterSection]) -> String {
    let mut html = original.to_string();
    for edit in edits {
        let Some(def) = definition(edit.section_type) else {
            continue;
        };
        match def.locate(&html) {
            Some((start, end, true)) => html.replace_range(start..end, &edit.html),
            _ => tracing::warn!(
                "Section '{}' could not be located in the document, edit skipped",
                edit.id
            ),
        }
    }
    html
}

const LEGACY_HEADERS: &[(SectionType, &str)] = &[
    (SectionType::Weather, "☀"),
    (SectionType::News, "📰"),
    (SectionType::Events, "🎉"),
    (SectionType::Fact, "💡"),
    (SectionType::Tip, "🧭"),
    (SectionType::Place, "📍"),
    (SectionType::Community, "💬"),
    (SectionType::Cta, "✨"),
];

static LEGACY_FOOTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?:p|td|div)\b[^>]*>\s*¡?Hasta la próxima").unwrap());

/// Adds section markers to documents generated before markers existed,
/// using the emoji headings as boundaries. Documents that already carry
/// markers are returned unchanged.
pub fn repair_legacy_markers(html: &str) -> String {
    if html.contains("SECTION_START:") {
        return html.to_string();
    }

    let mut starts: Vec<(usize, SectionType)> = LEGACY_HEADERS
        .iter()
        .filter_map(|(section_type, emoji)| {
            let pattern = format!(
                r"<h[1-3]\b[^>]*>\s*(?:<[^>]+>\s*)*{}",
                regex::escape(emoji)
            );
            let found = Regex::new(&pattern).ok()?.find(html)?;
            Some((found.start(), *section_type))
        })
        .collect();
    if starts.is_empty() {
        return html.to_string();
    }
    starts.sort_by_key(|(at, _)| *at);

    let last_start = starts.last().map(|(at, _)| *at).unwrap_or(0);
    let tail = LEGACY_FOOTER
        .find_at(html, last_start)
        .map(|m| m.start())
        .unwrap_or(html.len());

    let mut out = String::with_capacity(html.len() + starts.len() * 64);
    out.push_str(&html[..starts[0].0]);
    for (i, (at, section_type)) in starts.iter().enumerate() {
        let until = starts.get(i + 1).map(|(next, _)| *next).unwrap_or(tail);
        out.push_str(&section_start(*section_type));
        out.push('\n');
        out.push_str(&html[*at..until]);
        out.push_str(&section_end(*section_type));
        out.push('\n');
    }
    out.push_str(&html[tail..]);

    tracing::info!("Repaired {} legacy section headings", starts.len());
    out
}

/// Wraps `html` in the section's markers unless it already carries them.
pub fn ensure_markers(section_type: SectionType, html: &str) -> String {
    let start = section_start(section_type);
    let end = section_end(section_type);
    let mut out = html.trim().to_string();
    if !out.contains(&start) {
        out = format!("{start}\n{out}");
    }
    if !out.contains(&end) {
        out = format!("{out}\n{end}");
    }
    out
}

/// Rewrites one section with the primary provider.
#[derive(Clone)]
pub struct SectionRegenerator {
    chain: Arc<ProviderChain>,
    weather: Arc<WeatherClient>,
    fallback_link: String,
    temperature: f32,
}

impl SectionRegenerator {
    pub fn new(
        chain: Arc<ProviderChain>,
        weather: Arc<WeatherClient>,
        fallback_link: String,
        temperature: f32,
    ) -> Self {
        Self {
            chain,
            weather,
            fallback_link,
            temperature,
        }
    }

    pub async fn regenerate(
        &self,
        section: &NewsletterSection,
        today: NaiveDate,
    ) -> Result<NewsletterSection> {
        if !section.editable {
            return Err(AppError::Config(format!(
                "section '{}' is not editable",
                section.id
            )));
        }

        let weather = if section.section_type == SectionType::Weather {
            match self.weather.fetch_forecast().await {
                Ok(forecast) => Some(forecast),
                Err(e) => {
                    tracing::warn!("Weather forecast unavailable for regeneration: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let window = GenerationWindow::starting(today);
        let months = MonthContext::for_date(today);
        let prompt = build_section_prompt(
            section.section_type,
            &section.html,
            &window,
            &months,
            weather.as_ref(),
        );
        let request = GenerationRequest::new(prompt)
            .with_system(NEWSLETTER_SYSTEM)
            .with_grounding(true)
            .with_temperature(self.temperature);

        let provider = self.chain.primary();
        tracing::info!(
            provider = provider.name(),
            "regenerating section '{}'",
            section.id
        );
        let raw = provider.generate(&request).await?;
        validate_response(&raw)?;

        let html = strip_code_fences(&raw);
        let html = remove_images(&html);
        let html = validate_links(&html, &self.fallback_link);

        Ok(NewsletterSection {
            html: ensure_markers(section.section_type, &html),
            end_found: true,
            ..section.clone()
        })
    }
}
