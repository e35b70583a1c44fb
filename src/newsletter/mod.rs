//! The weekly newsletter pipeline: context, prompt, generation, cleanup and
//! persistence.

mod community;
mod context;
mod dates;
mod extract;
mod inject;
mod links;
mod postprocess;
mod prompt;
mod sections;
mod template;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::ai::{GeminiClient, GenerationRequest, ProviderChain};
use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;
use crate::models::NewsletterDraft;
use crate::services::WeatherClient;

use community::{render_community, CommunityWriter};
use context::ContextAssembler;
use extract::extract_used_items;
use inject::{clear_community_marker, inject_community};
use postprocess::PostProcessor;
use prompt::{build_newsletter_prompt, NEWSLETTER_SYSTEM};

pub use dates::{city_today, current_newsletter_dates};
pub use sections::{parse_sections, reconstruct, repair_legacy_markers, SectionRegenerator};

/// A finished run: the stored draft and where it came from.
#[derive(Debug, Clone)]
pub struct GeneratedNewsletter {
    pub id: i64,
    pub draft: NewsletterDraft,
    pub provider: &'static str,
}

pub fn subject_for(date_range: &str) -> String {
    format!("San Luis Way Weekly: {date_range}")
}

pub struct NewsletterGenerator {
    repository: Repository,
    chain: Arc<ProviderChain>,
    weather: Arc<WeatherClient>,
    community: CommunityWriter,
    postprocessor: PostProcessor,
    site_url: String,
    fallback_link: String,
    temperature: f32,
}

impl NewsletterGenerator {
    /// Fails when the primary provider has no credential.
    pub fn from_config(config: &Config, repository: Repository) -> Result<Self> {
        let chain = ProviderChain::from_config(config)?;
        let http_timeout = Duration::from_secs(config.http_timeout_secs);
        let weather = WeatherClient::new(
            config.weather_base_url.clone(),
            config.latitude,
            config.longitude,
            http_timeout,
        )?;
        let community_client = GeminiClient::new(
            config.gemini_api_key.clone().unwrap_or_default(),
            config.community_model.clone(),
            config.gemini_base_url.clone(),
            config.fallback_max_tokens,
            http_timeout,
        )?;

        Ok(Self {
            repository,
            chain: Arc::new(chain),
            weather: Arc::new(weather),
            community: CommunityWriter::new(community_client, config.temperature),
            postprocessor: PostProcessor::new(config.fallback_link()),
            site_url: config.site_url.trim_end_matches('/').to_string(),
            fallback_link: config.fallback_link(),
            temperature: config.temperature,
        })
    }

    /// A regenerator sharing this generator's provider and weather clients.
    pub fn section_regenerator(&self) -> SectionRegenerator {
        SectionRegenerator::new(
            self.chain.clone(),
            self.weather.clone(),
            self.fallback_link.clone(),
            self.temperature,
        )
    }

    pub async fn generate(&self, community_text: Option<&str>) -> Result<GeneratedNewsletter> {
        self.generate_for(city_today(), community_text).await
    }

    pub async fn generate_for(
        &self,
        today: NaiveDate,
        community_text: Option<&str>,
    ) -> Result<GeneratedNewsletter> {
        let assembler =
            ContextAssembler::new(&self.repository, &self.weather, self.site_url.clone());
        let context = assembler.assemble_for(today).await;

        let request = GenerationRequest::new(build_newsletter_prompt(&context))
            .with_system(NEWSLETTER_SYSTEM)
            .with_grounding(true)
            .with_temperature(self.temperature);

        let generated = self.chain.generate(&request).await?;
        tracing::info!(
            provider = generated.provider,
            bytes = generated.text.len(),
            "newsletter generated"
        );

        let mut html = self.postprocessor.process(&generated.text);
        html = match community_text.filter(|t| !t.trim().is_empty()) {
            Some(text) => {
                let content = self.community.rewrite(text).await;
                inject_community(&html, &render_community(&content))
            }
            None => clear_community_marker(&html),
        };

        let used = extract_used_items(&generated.text, &html);
        if used.is_empty() {
            tracing::warn!("No fact, tip or place found in the newsletter, repetition log not updated");
        }
        for (kind, item) in used.into_records() {
            let title = item.title.clone();
            match self.repository.record_used(kind, item).await {
                Ok(_) => tracing::debug!("Recorded used {}: {}", kind.label(), title),
                Err(e) => tracing::warn!("Failed to record used {} '{}': {}", kind.label(), title, e),
            }
        }

        let date_range = context.window.label.clone();
        let draft = NewsletterDraft {
            subject: subject_for(&date_range),
            html_content: html,
            date_range,
        };
        let id = self.repository.save_newsletter(draft.clone()).await?;
        tracing::info!("Saved newsletter draft #{}", id);

        Ok(GeneratedNewsletter {
            id,
            draft,
            provider: generated.provider,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::UsedKind;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn filled_newsletter() -> String {
        let body = super::template::NEWSLETTER_TEMPLATE
            .replace("[FACT_TITLE]", "The Caja Real")
            .replace("[FACT_BODY]", "Built in 1767 as the royal treasury.")
            .replace("[TIP_TITLE]", "Carry cash")
            .replace("[TIP_BODY]", "Many market stalls only take pesos.")
            .replace("[PLACE_NAME]", "Museo Laberinto")
            .replace("[PLACE_DESCRIPTION]", "A science museum by Ricardo Legorreta.")
            .replace("[NEWS_LINK_1]", "https://example.com/story")
            .replace("[NEWS_HEADLINE_1]", "New bike lanes on Carranza");
        format!(
            "```html\n{body}\n<!-- NEWSLETTER_META {{\"place\":{{\"name\":\"Museo Laberinto\",\"description\":\"Science museum\"}}}} -->\n```"
        )
    }

    async fn generator(server: &MockServer, repository: Repository) -> NewsletterGenerator {
        let config = Config {
            gemini_api_key: Some("test-key".to_string()),
            gemini_model: "gemini-pro-test".to_string(),
            community_model: "gemini-flash-test".to_string(),
            gemini_base_url: server.uri(),
            weather_base_url: server.uri(),
            generation_timeout_secs: 10,
            http_timeout_secs: 5,
            ..Config::default()
        };
        NewsletterGenerator::from_config(&config, repository).unwrap()
    }

    fn gemini_reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        }))
    }

    #[test]
    fn subject_names_the_week() {
        assert_eq!(
            subject_for("October 19 - October 26, 2026"),
            "San Luis Way Weekly: October 19 - October 26, 2026"
        );
    }

    #[test]
    fn missing_key_is_fatal() {
        let err = tokio_test::block_on(async {
            let repository = Repository::in_memory().await.unwrap();
            NewsletterGenerator::from_config(&Config::default(), repository).err()
        })
        .unwrap();
        assert!(err.is_fatal());
        assert!(matches!(err, AppError::MissingCredential(_)));
    }

    #[tokio::test]
    async fn end_to_end_run_stores_draft_and_used_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-pro-test:generateContent"))
            .respond_with(gemini_reply(&filled_newsletter()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex("gemini-flash-test"))
            .respond_with(gemini_reply(
                r#"{"title":"🧺 Food drive","body":"Bring cans to <Centro> library.","cta":null}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let repository = Repository::in_memory().await.unwrap();
        let generator = generator(&server, repository.clone()).await;
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let result = generator
            .generate_for(today, Some("food drive at the library"))
            .await
            .unwrap();

        assert_eq!(result.provider, "gemini");
        assert_eq!(result.draft.date_range, "October 19 - October 26, 2026");
        let html = &result.draft.html_content;
        assert!(html.contains("The Caja Real"));
        assert!(html.contains("Bring cans to &lt;Centro&gt; library."));
        assert!(html.find("SECTION_START:community").unwrap() < html.find("SECTION_START:cta").unwrap());
        assert!(html.contains("Hasta la próxima"));
        assert!(!html.contains("example.com"));
        assert!(!html.contains("<img"));
        assert!(!html.contains("NEWSLETTER_META"));

        let stored = repository.latest_newsletter().await.unwrap().unwrap();
        assert_eq!(stored.id, result.id);
        assert_eq!(stored.subject, "San Luis Way Weekly: October 19 - October 26, 2026");

        let facts = repository.recent_used(UsedKind::Fact, 10).await.unwrap();
        assert_eq!(facts[0].title, "The Caja Real");
        let places = repository.recent_used(UsedKind::Place, 10).await.unwrap();
        assert_eq!(places[0].body, "Science museum");
        assert_eq!(
            repository.recent_used(UsedKind::Tip, 10).await.unwrap()[0].title,
            "Carry cash"
        );
    }

    #[tokio::test]
    async fn exhausted_providers_fail_the_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let repository = Repository::in_memory().await.unwrap();
        let generator = generator(&server, repository.clone()).await;
        let err = generator.generate(None).await.unwrap_err();

        assert!(err.is_fatal());
        assert!(repository.latest_newsletter().await.unwrap().is_none());
    }
}
