use chrono::NaiveDate;

use crate::db::Repository;
use crate::error::Result;
use crate::models::{BlogPost, Event, UsedItem, UsedKind, WeatherForecast};
use crate::services::WeatherClient;

use super::dates::{GenerationWindow, MonthContext};

/// How many rows of each used-item log the prompt excludes.
pub const USED_HISTORY: usize = 50;
const RECENT_POSTS: usize = 5;

/// Everything the prompt needs to stay grounded in time and place.
#[derive(Debug, Clone)]
pub struct NewsletterContext {
    pub window: GenerationWindow,
    pub months: MonthContext,
    pub site_url: String,
    pub events: Vec<Event>,
    pub blog_posts: Vec<BlogPost>,
    pub used_facts: Vec<UsedItem>,
    pub used_tips: Vec<UsedItem>,
    pub used_places: Vec<UsedItem>,
    pub weather: Option<WeatherForecast>,
}

pub struct ContextAssembler<'a> {
    repository: &'a Repository,
    weather: &'a WeatherClient,
    site_url: String,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(repository: &'a Repository, weather: &'a WeatherClient, site_url: String) -> Self {
        Self {
            repository,
            weather,
            site_url,
        }
    }

    /// Gathers context for `today`. Never fails: each source that cannot be
    /// read is logged and left empty.
    pub async fn assemble_for(&self, today: NaiveDate) -> NewsletterContext {
        let window = GenerationWindow::starting(today);
        let (start, end) = window.utc_bounds();

        let (events, blog_posts, used_facts, used_tips, used_places, weather) = futures::join!(
            self.repository.upcoming_events(start, end),
            self.repository.recent_blog_posts(RECENT_POSTS),
            self.repository.recent_used(UsedKind::Fact, USED_HISTORY),
            self.repository.recent_used(UsedKind::Tip, USED_HISTORY),
            self.repository.recent_used(UsedKind::Place, USED_HISTORY),
            self.weather.fetch_forecast(),
        );

        let context = NewsletterContext {
            months: MonthContext::for_date(today),
            window,
            site_url: self.site_url.clone(),
            events: or_empty("events", events),
            blog_posts: or_empty("blog posts", blog_posts),
            used_facts: or_empty(UsedKind::Fact.table(), used_facts),
            used_tips: or_empty(UsedKind::Tip.table(), used_tips),
            used_places: or_empty(UsedKind::Place.table(), used_places),
            weather: match weather {
                Ok(forecast) => Some(forecast),
                Err(e) => {
                    tracing::warn!("Weather forecast unavailable, model will search instead: {}", e);
                    None
                }
            },
        };

        tracing::info!(
            events = context.events.len(),
            blog_posts = context.blog_posts.len(),
            used_facts = context.used_facts.len(),
            used_tips = context.used_tips.len(),
            used_places = context.used_places.len(),
            weather = context.weather.is_some(),
            "assembled newsletter context for {}",
            context.window.label
        );

        context
    }
}

fn or_empty<T>(source: &str, result: Result<Vec<T>>) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!("Failed to load {}, continuing without them: {}", source, e);
            Vec::new()
        }
    }
}
