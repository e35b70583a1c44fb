use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Header,
    Weather,
    News,
    Events,
    Fact,
    Tip,
    Place,
    Community,
    Cta,
    Footer,
}

impl SectionType {
    /// Identifier used inside the section marker comments.
    pub fn id(self) -> &'static str {
        match self {
            SectionType::Header => "header",
            SectionType::Weather => "weather",
            SectionType::News => "news",
            SectionType::Events => "events",
            SectionType::Fact => "fact",
            SectionType::Tip => "tip",
            SectionType::Place => "place",
            SectionType::Community => "community",
            SectionType::Cta => "cta",
            SectionType::Footer => "footer",
        }
    }
}

/// One named region of a rendered newsletter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsletterSection {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub html: String,
    pub editable: bool,
    /// False when the closing marker was missing and `html` is a bounded slice.
    #[serde(default = "default_true")]
    pub end_found: bool,
}

fn default_true() -> bool {
    true
}

/// Progress of a background section rewrite in the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegenerationStatus {
    #[default]
    Idle,
    Generating,
    Regenerated,
    Failed,
    NoApiKey,
}
