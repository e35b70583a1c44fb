use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub gemini_api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_community_model")]
    pub community_model: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,

    #[serde(default = "default_site_url")]
    pub site_url: String,

    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_primary_max_tokens")]
    pub primary_max_tokens: u32,
    #[serde(default = "default_fallback_max_tokens")]
    pub fallback_max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slw-newsletter");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("newsletter.db").to_string_lossy().to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_community_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_weather_base_url() -> String {
    "https://api.open-meteo.com".to_string()
}

fn default_latitude() -> f64 {
    22.1565
}

fn default_longitude() -> f64 {
    -100.9855
}

fn default_site_url() -> String {
    "https://www.sanluisway.com".to_string()
}

fn default_generation_timeout() -> u64 {
    300
}

fn default_http_timeout() -> u64 {
    30
}

fn default_primary_max_tokens() -> u32 {
    16384
}

fn default_fallback_max_tokens() -> u32 {
    8192
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
            community_model: default_community_model(),
            gemini_base_url: default_gemini_base_url(),
            openai_api_key: None,
            openai_model: default_openai_model(),
            openai_base_url: default_openai_base_url(),
            weather_base_url: default_weather_base_url(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            site_url: default_site_url(),
            generation_timeout_secs: default_generation_timeout(),
            http_timeout_secs: default_http_timeout(),
            primary_max_tokens: default_primary_max_tokens(),
            fallback_max_tokens: default_fallback_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Reads the TOML file at `path`, writing a default one if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slw-newsletter")
            .join("config.toml")
    }

    /// Secrets and the database location may come from the environment so
    /// they never have to live in the config file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(path) = non_empty("SLW_NEWSLETTER_DB") {
            self.db_path = path;
        }
    }

    /// The page every rejected link is rewritten to.
    pub fn fallback_link(&self) -> String {
        format!("{}/events", self.site_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn writes_default_config_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.site_url, "https://www.sanluisway.com");
        assert_eq!(config.gemini_model, "gemini-2.5-pro");
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn partial_file_uses_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "db_path = \"/tmp/test.db\"\ngemini_api_key = \"abc\"\ntemperature = 0.2\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.db_path, "/tmp/test.db");
        assert_eq!(config.gemini_api_key.as_deref(), Some("abc"));
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.generation_timeout_secs, 300);
        assert_eq!(config.fallback_max_tokens, 8192);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "temperature = \"hot\"").unwrap();

        assert!(matches!(Config::load_from(&path), Err(AppError::Toml(_))));
    }

    #[test]
    fn environment_overrides_secrets() {
        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "from-env"),
            ("OPENAI_API_KEY", "  "),
            ("SLW_NEWSLETTER_DB", "/var/lib/slw.db"),
        ]
        .into_iter()
        .collect();

        let mut config = Config {
            openai_api_key: Some("from-file".to_string()),
            ..Config::default()
        };
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.gemini_api_key.as_deref(), Some("from-env"));
        assert_eq!(config.openai_api_key.as_deref(), Some("from-file"));
        assert_eq!(config.db_path, "/var/lib/slw.db");
    }

    #[test]
    fn fallback_link_points_at_events_page() {
        let config = Config {
            site_url: "https://www.sanluisway.com/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.fallback_link(), "https://www.sanluisway.com/events");
    }
}
