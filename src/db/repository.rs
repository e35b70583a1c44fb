use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{BlogPost, Event, NewsletterDraft, StoredNewsletter, UsedItem, UsedKind};

use super::schema::SCHEMA;

#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::with_connection(conn).await
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Site content (read only)

    pub async fn upcoming_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let events = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, title, description, start_date, end_date, location, category, url
                       FROM events
                       WHERE datetime(start_date) >= datetime(?1)
                         AND datetime(start_date) <= datetime(?2)
                       ORDER BY datetime(start_date) ASC"#,
                )?;
                let events = stmt
                    .query_map(params![start.to_rfc3339(), end.to_rfc3339()], event_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(events)
            })
            .await?;
        Ok(events)
    }

    pub async fn recent_blog_posts(&self, limit: usize) -> Result<Vec<BlogPost>> {
        let posts = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, title, slug, excerpt, published_at
                       FROM blog_posts
                       WHERE status = 'published' AND published_at IS NOT NULL
                       ORDER BY datetime(published_at) DESC
                       LIMIT ?1"#,
                )?;
                let posts = stmt
                    .query_map(params![limit as i64], blog_post_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(posts)
            })
            .await?;
        Ok(posts)
    }

    // Anti-repetition logs

    pub async fn recent_used(&self, kind: UsedKind, limit: usize) -> Result<Vec<UsedItem>> {
        let (title_col, body_col) = kind.columns();
        let sql = format!(
            "SELECT {title_col}, {body_col}, used_at FROM {} ORDER BY id DESC LIMIT ?1",
            kind.table()
        );
        let items = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let items = stmt
                    .query_map(params![limit as i64], used_item_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?;
        Ok(items)
    }

    pub async fn record_used(&self, kind: UsedKind, item: UsedItem) -> Result<i64> {
        let (title_col, body_col) = kind.columns();
        let sql = format!(
            "INSERT INTO {} ({title_col}, {body_col}) VALUES (?1, ?2)",
            kind.table()
        );
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(&sql, params![item.title, item.body])?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    // Drafts

    pub async fn save_newsletter(&self, draft: NewsletterDraft) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO newsletters (subject, html_content, date_range) VALUES (?1, ?2, ?3)",
                    params![draft.subject, draft.html_content, draft.date_range],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn get_newsletter(&self, id: i64) -> Result<Option<StoredNewsletter>> {
        let newsletter = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, subject, html_content, date_range, created_at, updated_at FROM newsletters WHERE id = ?1",
                )?;
                let newsletter = stmt
                    .query_row(params![id], newsletter_from_row)
                    .optional()?;
                Ok(newsletter)
            })
            .await?;
        Ok(newsletter)
    }

    pub async fn latest_newsletter(&self) -> Result<Option<StoredNewsletter>> {
        let newsletter = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, subject, html_content, date_range, created_at, updated_at FROM newsletters ORDER BY id DESC LIMIT 1",
                )?;
                let newsletter = stmt.query_row([], newsletter_from_row).optional()?;
                Ok(newsletter)
            })
            .await?;
        Ok(newsletter)
    }

    pub async fn update_newsletter_html(&self, id: i64, html: String) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE newsletters SET html_content = ?1, updated_at = datetime('now') WHERE id = ?2",
                    params![html, id],
                )?;
                Ok(changed > 0)
            })
            .await?;
        Ok(changed)
    }

    #[cfg(test)]
    pub async fn insert_event(&self, event: Event) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO events (title, description, start_date, end_date, location, category, url)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                    params![
                        event.title,
                        event.description,
                        event.start_date.to_rfc3339(),
                        event.end_date.map(|dt| dt.to_rfc3339()),
                        event.location,
                        event.category,
                        event.url,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    #[cfg(test)]
    pub async fn insert_blog_post(&self, post: BlogPost, status: &'static str) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO blog_posts (title, slug, excerpt, status, published_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        post.title,
                        post.slug,
                        post.excerpt,
                        status,
                        post.published_at.to_rfc3339()
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    #[cfg(test)]
    pub async fn drop_table(&self, table: &'static str) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute_batch(&format!("DROP TABLE {table}"))?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // RFC3339 as written by this crate
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime('now') defaults
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn required_datetime(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid timestamp: {raw}").into(),
        )
    })
}

fn event_from_row(row: &Row) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        start_date: required_datetime(row, 3)?,
        end_date: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| parse_datetime(&s)),
        location: row.get(5)?,
        category: row.get(6)?,
        url: row.get(7)?,
    })
}

fn blog_post_from_row(row: &Row) -> rusqlite::Result<BlogPost> {
    Ok(BlogPost {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        excerpt: row.get(3)?,
        published_at: required_datetime(row, 4)?,
    })
}

fn used_item_from_row(row: &Row) -> rusqlite::Result<UsedItem> {
    Ok(UsedItem {
        title: row.get(0)?,
        body: row.get(1)?,
        used_at: row
            .get::<_, Option<String>>(2)?
            .and_then(|s| parse_datetime(&s)),
    })
}

fn newsletter_from_row(row: &Row) -> rusqlite::Result<StoredNewsletter> {
    Ok(StoredNewsletter {
        id: row.get(0)?,
        subject: row.get(1)?,
        html_content: row.get(2)?,
        date_range: row.get(3)?,
        created_at: required_datetime(row, 4)?,
        updated_at: required_datetime(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn event_at(title: &str, start: DateTime<Utc>) -> Event {
        Event {
            id: 0,
            title: title.to_string(),
            description: Some("Live music".to_string()),
            start_date: start,
            end_date: None,
            location: Some("Plaza de Armas".to_string()),
            category: Some("music".to_string()),
            url: None,
        }
    }

    #[tokio::test]
    async fn upcoming_events_are_limited_to_window() {
        let repo = Repository::in_memory().await.unwrap();
        let start = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();

        repo.insert_event(event_at("Before", start - Duration::days(1)))
            .await
            .unwrap();
        repo.insert_event(event_at("Second", start + Duration::days(3)))
            .await
            .unwrap();
        repo.insert_event(event_at("First", start + Duration::hours(5)))
            .await
            .unwrap();
        repo.insert_event(event_at("After", start + Duration::days(9)))
            .await
            .unwrap();

        let events = repo
            .upcoming_events(start, start + Duration::days(7))
            .await
            .unwrap();

        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
        assert_eq!(events[0].location.as_deref(), Some("Plaza de Armas"));
    }

    #[tokio::test]
    async fn only_published_posts_are_returned() {
        let repo = Repository::in_memory().await.unwrap();
        let now = Utc::now();
        for (i, status) in ["published", "draft", "published"].into_iter().enumerate() {
            repo.insert_blog_post(
                BlogPost {
                    id: 0,
                    title: format!("Post {i}"),
                    slug: format!("post-{i}"),
                    excerpt: None,
                    published_at: now - Duration::days(i as i64),
                },
                status,
            )
            .await
            .unwrap();
        }

        let posts = repo.recent_blog_posts(5).await.unwrap();
        let slugs: Vec<_> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["post-0", "post-2"]);
    }

    #[tokio::test]
    async fn used_items_come_back_newest_first() {
        let repo = Repository::in_memory().await.unwrap();
        for i in 0..3 {
            repo.record_used(UsedKind::Place, UsedItem::new(format!("Place {i}"), "desc"))
                .await
                .unwrap();
        }

        let items = repo.recent_used(UsedKind::Place, 2).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Place 2");
        assert_eq!(items[1].title, "Place 1");
        assert!(items[0].used_at.is_some());
        assert!(repo.recent_used(UsedKind::Fact, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_log_table_is_an_error() {
        let repo = Repository::in_memory().await.unwrap();
        repo.drop_table("newsletter_tips").await.unwrap();

        assert!(repo.recent_used(UsedKind::Tip, 50).await.is_err());
    }

    #[tokio::test]
    async fn drafts_can_be_saved_and_updated() {
        let repo = Repository::in_memory().await.unwrap();
        assert!(repo.latest_newsletter().await.unwrap().is_none());

        let id = repo
            .save_newsletter(NewsletterDraft {
                subject: "San Luis Way Weekly".to_string(),
                html_content: "<p>v1</p>".to_string(),
                date_range: "October 19 - October 26, 2026".to_string(),
            })
            .await
            .unwrap();

        assert!(repo
            .update_newsletter_html(id, "<p>v2</p>".to_string())
            .await
            .unwrap());
        assert!(!repo
            .update_newsletter_html(id + 1, "<p>x</p>".to_string())
            .await
            .unwrap());

        let stored = repo.latest_newsletter().await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.html_content, "<p>v2</p>");
        assert_eq!(
            repo.get_newsletter(id).await.unwrap().unwrap().subject,
            "San Luis Way Weekly"
        );
    }

    #[test]
    fn on_disk_database_persists_between_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("newsletter.db");
        let path = path.to_string_lossy().to_string();

        tokio_test::block_on(async {
            let repo = Repository::new(&path).await.unwrap();
            repo.record_used(UsedKind::Fact, UsedItem::new("Cactus", "Many kinds"))
                .await
                .unwrap();
        });

        let items = tokio_test::block_on(async {
            let repo = Repository::new(&path).await.unwrap();
            repo.recent_used(UsedKind::Fact, 50).await.unwrap()
        });
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Cactus");
    }
}
