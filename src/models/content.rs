use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the site's `events` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub url: Option<String>,
}

impl Event {
    /// The ticket or source page when the row has one, otherwise the event's
    /// page on the site.
    pub fn link(&self, site_url: &str) -> String {
        match self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => url.to_string(),
            None => format!("{}/events/{}", site_url.trim_end_matches('/'), self.id),
        }
    }
}

/// A published row of the site's `blog_posts` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl BlogPost {
    pub fn link(&self, site_url: &str) -> String {
        format!("{}/blog/{}", site_url.trim_end_matches('/'), self.slug)
    }
}
