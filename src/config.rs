use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const APP_DIR: &str = "news-script-pipeline";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_content_db_path")]
    pub content_db_path: String,

    #[serde(default = "default_schedule_db_path")]
    pub schedule_db_path: String,

    pub gemini_api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default)]
    pub scraper: ScraperConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub search_url: String,
    pub page_size: u32,
    pub min_content_chars: usize,
    pub base_delay_ms: u64,
    pub delay_step_ms: u64,
    pub delay_step_every: usize,
    pub error_delay_ms: u64,
    pub page_delay_min_ms: u64,
    pub page_delay_max_ms: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            search_url: "https://www.kontan.co.id/search/indeks".to_string(),
            page_size: 20,
            min_content_chars: 200,
            base_delay_ms: 2000,
            delay_step_ms: 500,
            delay_step_every: 10,
            error_delay_ms: 5000,
            page_delay_min_ms: 3000,
            page_delay_max_ms: 5000,
            request_timeout_secs: 60,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Pause between consecutive AI calls in one-to-one mode.
    pub request_delay_ms: u64,
    /// Longest raw response kept when parsing falls back.
    pub fallback_chars: usize,
    pub request_timeout_secs: u64,
    /// Generate from all filtered articles in a single call.
    pub batch: bool,
    /// Keywords must match whole words in titles instead of any substring.
    pub strict_match: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: 2000,
            fallback_chars: 3000,
            request_timeout_secs: 120,
            batch: false,
            strict_match: false,
        }
    }
}

fn data_file(name: &str) -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join(name).to_string_lossy().to_string()
}

fn default_content_db_path() -> String {
    data_file("content.db")
}

fn default_schedule_db_path() -> String {
    data_file("schedule.db")
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_db_path: default_content_db_path(),
            schedule_db_path: default_schedule_db_path(),
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
            listen_addr: default_listen_addr(),
            scraper: ScraperConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path` (or the default location), writing defaults when the
    /// file does not exist yet. `GEMINI_API_KEY` and `GEMINI_MODEL` win over
    /// the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            tracing::info!(path = %config_path.display(), "wrote default config");
            config
        };

        let config = config.with_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
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
            .join(APP_DIR)
            .join("config.toml")
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.gemini_api_key = Some(key);
        }
        if let Some(model) = lookup("GEMINI_MODEL").filter(|m| !m.trim().is_empty()) {
            self.gemini_model = model;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let scraper = &self.scraper;
        if scraper.page_size == 0 {
            return Err(AppError::Config("scraper.page_size must be positive".into()));
        }
        if scraper.page_delay_min_ms > scraper.page_delay_max_ms {
            return Err(AppError::Config(
                "scraper.page_delay_min_ms exceeds page_delay_max_ms".into(),
            ));
        }
        if self.generation.fallback_chars == 0 {
            return Err(AppError::Config(
                "generation.fallback_chars must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.scraper.page_size, 20);
        assert_eq!(config.scraper.min_content_chars, 200);
        assert_eq!(config.generation.fallback_chars, 3000);
        assert!(!config.generation.batch);
        assert!(!config.generation.strict_match);
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            content_db_path = "/tmp/c.db"
            [scraper]
            base_delay_ms = 10
            [generation]
            batch = true
            strict_match = true
            "#,
        )
        .unwrap();
        assert_eq!(config.content_db_path, "/tmp/c.db");
        assert_eq!(config.scraper.base_delay_ms, 10);
        assert_eq!(config.scraper.error_delay_ms, 5000);
        assert!(config.generation.batch);
        assert!(config.generation.strict_match);
        assert_eq!(config.generation.request_delay_ms, 2000);
    }

    #[test]
    fn load_writes_defaults_then_reads_them_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let first = Config::load(Some(&path)).unwrap();
        assert!(path.exists());

        let second = Config::load(Some(&path)).unwrap();
        assert_eq!(first.content_db_path, second.content_db_path);
        assert_eq!(first.scraper.search_url, second.scraper.search_url);
    }

    #[test]
    fn environment_overrides_file() {
        let config = Config::default().with_overrides(|key| match key {
            "GEMINI_API_KEY" => Some("secret".to_string()),
            "GEMINI_MODEL" => Some("gemini-test".to_string()),
            _ => None,
        });
        assert_eq!(config.gemini_api_key.as_deref(), Some("secret"));
        assert_eq!(config.gemini_model, "gemini-test");

        let config = Config::default().with_overrides(|_| Some("  ".to_string()));
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn inverted_page_delay_is_rejected() {
        let mut config = Config::default();
        config.scraper.page_delay_min_ms = 9000;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
