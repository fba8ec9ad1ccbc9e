use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::ai::GeminiClient;
use crate::config::Config;
use crate::db::ContentRepository;
use crate::error::Result;
use crate::ingest::{Ingestor, KontanSource, RatePolicy};
use crate::pipeline::{Dispatcher, GenerationMode, Generator, Pipeline};
use crate::services::SqliteScheduleStore;

pub struct App {
    pub pipeline: Arc<Pipeline>,
    pub listen_addr: String,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Arc::new(ContentRepository::new(&config.content_db_path).await?);
        let schedule = Arc::new(SqliteScheduleStore::new(&config.schedule_db_path).await?);

        let source = Arc::new(KontanSource::new(&config.scraper)?);
        let ingestor = Ingestor::new(
            source,
            repository.clone(),
            RatePolicy::from_config(&config.scraper),
            config.scraper.min_content_chars,
        );

        let generator = match &config.gemini_api_key {
            Some(key) => {
                let client = GeminiClient::new(
                    key.clone(),
                    config.gemini_model.clone(),
                    Duration::from_secs(config.generation.request_timeout_secs),
                )?;
                info!(model = client.model(), "AI generation enabled");
                Some(Generator::new(
                    repository.clone(),
                    Arc::new(client),
                    &config.generation,
                ))
            }
            None => {
                warn!("gemini_api_key is not set, script generation is disabled");
                None
            }
        };

        let dispatcher = Dispatcher::new(repository.clone(), schedule);
        let mode = if config.generation.batch {
            GenerationMode::Batch
        } else {
            GenerationMode::PerArticle
        };

        Ok(Self {
            pipeline: Arc::new(Pipeline::new(
                repository, ingestor, generator, dispatcher, mode,
            )),
            listen_addr: config.listen_addr.clone(),
        })
    }
}
