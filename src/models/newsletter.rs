use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a generation run hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsletterDraft {
    pub subject: String,
    pub html_content: String,
    pub date_range: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredNewsletter {
    pub id: i64,
    pub subject: String,
    pub html_content: String,
    pub date_range: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The three append-only logs used to keep content from repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsedKind {
    Fact,
    Tip,
    Place,
}

impl UsedKind {
    pub fn table(self) -> &'static str {
        match self {
            UsedKind::Fact => "newsletter_facts",
            UsedKind::Tip => "newsletter_tips",
            UsedKind::Place => "newsletter_places",
        }
    }

    /// Column names for (title, body) in this kind's table.
    pub fn columns(self) -> (&'static str, &'static str) {
        match self {
            UsedKind::Fact | UsedKind::Tip => ("title", "body"),
            UsedKind::Place => ("name", "description"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UsedKind::Fact => "fact",
            UsedKind::Tip => "tip",
            UsedKind::Place => "place",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsedItem {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub used_at: Option<DateTime<Utc>>,
}

impl UsedItem {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            used_at: None,
        }
    }
}
