//! Community announcements: a small-model rewrite and the escaped HTML block.

use serde::Deserialize;

use crate::ai::{GeminiClient, GenerationRequest};
use crate::models::SectionType;

use super::prompt::{build_community_prompt, COMMUNITY_SYSTEM};
use super::template::{section_end, section_start};

const DEFAULT_TITLE: &str = "💬 Community Corner";
const COMMUNITY_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommunityContent {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub cta: Option<String>,
}

impl CommunityContent {
    /// The user's own words under a neutral heading.
    pub fn verbatim(text: &str) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            body: text.trim().to_string(),
            cta: None,
        }
    }
}

/// Restyles a community announcement with the small model. Never fails: any
/// problem falls back to the original text.
pub struct CommunityWriter {
    client: GeminiClient,
    temperature: f32,
}

impl CommunityWriter {
    pub fn new(client: GeminiClient, temperature: f32) -> Self {
        Self {
            client,
            temperature,
        }
    }

    pub async fn rewrite(&self, text: &str) -> CommunityContent {
        if text.trim().is_empty() {
            return CommunityContent::verbatim(text);
        }

        let request = GenerationRequest::new(build_community_prompt(text))
            .with_system(COMMUNITY_SYSTEM)
            .with_temperature(self.temperature)
            .with_max_output_tokens(COMMUNITY_MAX_TOKENS);

        match self.client.generate(&request).await {
            Ok(reply) => parse_community_json(&reply).unwrap_or_else(|| {
                tracing::warn!("Community rewrite was not valid JSON, using the original text");
                CommunityContent::verbatim(text)
            }),
            Err(e) => {
                tracing::warn!("Community rewrite failed, using the original text: {}", e);
                CommunityContent::verbatim(text)
            }
        }
    }
}

/// Reads the first `{` to the last `}` of a reply as the JSON object.
pub fn parse_community_json(reply: &str) -> Option<CommunityContent> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    let mut content: CommunityContent = serde_json::from_str(&reply[start..=end]).ok()?;
    content.title = content.title.trim().to_string();
    content.body = content.body.trim().to_string();
    content.cta = content
        .cta
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if content.body.is_empty() {
        return None;
    }
    if content.title.is_empty() {
        content.title = DEFAULT_TITLE.to_string();
    }
    Some(content)
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the block that sits between "Place of the Week" and the CTA.
pub fn render_community(content: &CommunityContent) -> String {
    let paragraphs: String = content
        .body
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            format!(
                "<p style=\"margin: 0 0 8px; font-size: 14px; line-height: 1.6; color: #374151;\">{}</p>\n",
                escape_html(p).replace('\n', "<br>")
            )
        })
        .collect();

    let cta = content
        .cta
        .as_deref()
        .map(|c| {
            format!(
                "<p style=\"margin: 8px 0 0; font-size: 14px; font-weight: bold; color: #1e40af;\">{}</p>\n",
                escape_html(c)
            )
        })
        .unwrap_or_default();

    format!(
        "{start}\n<tr>\n<td style=\"padding: 24px;\">\n\
<table width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" border=\"0\" style=\"background-color: #fef3c7; border-radius: 8px;\">\n\
<tr>\n<td style=\"padding: 16px;\">\n\
<h2 style=\"margin: 0 0 12px; color: #92400e; font-size: 20px;\">{title}</h2>\n\
{paragraphs}{cta}</td>\n</tr>\n</table>\n</td>\n</tr>\n{end}",
        start = section_start(SectionType::Community),
        end = section_end(SectionType::Community),
        title = escape_html(&content.title),
    )
}
