use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::db::ContentRepository;
use crate::error::{AppError, Result};
use crate::ingest::{IngestLimits, IngestReport, Ingestor};
use crate::models::StatusCount;

use super::dispatch::{DispatchReport, Dispatcher};
use super::generation::{GenerationMode, GenerationReport, Generator};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowSummary {
    pub scraped: usize,
    pub generated: usize,
    pub sent: usize,
    pub failed: usize,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub news: Vec<StatusCount>,
    pub artifacts: Vec<StatusCount>,
}

/// The three stages over shared stores. Generation is absent when no AI key
/// is configured.
pub struct Pipeline {
    repository: Arc<ContentRepository>,
    ingestor: Ingestor,
    generator: Option<Generator>,
    dispatcher: Dispatcher,
    mode: GenerationMode,
}

impl Pipeline {
    pub fn new(
        repository: Arc<ContentRepository>,
        ingestor: Ingestor,
        generator: Option<Generator>,
        dispatcher: Dispatcher,
        mode: GenerationMode,
    ) -> Self {
        Self {
            repository,
            ingestor,
            generator,
            dispatcher,
            mode,
        }
    }

    pub fn default_mode(&self) -> GenerationMode {
        self.mode
    }

    pub async fn scrape(&self, limits: IngestLimits) -> Result<IngestReport> {
        self.ingestor.ingest_today(limits).await
    }

    pub async fn scrape_date(&self, date: NaiveDate, limits: IngestLimits) -> Result<IngestReport> {
        self.ingestor.ingest_for_date(date, limits).await
    }

    pub async fn generate(&self, mode: GenerationMode) -> Result<GenerationReport> {
        let generator = self.generator.as_ref().ok_or_else(|| {
            AppError::Config("gemini_api_key is not set; generation is unavailable".to_string())
        })?;
        generator.run(mode).await
    }

    pub async fn dispatch(&self) -> Result<DispatchReport> {
        self.dispatcher.dispatch_pending().await
    }

    pub async fn stats(&self) -> Result<PipelineStats> {
        Ok(PipelineStats {
            news: self.repository.article_stats().await?,
            artifacts: self.repository.artifact_stats().await?,
        })
    }

    /// Scrape, generate, dispatch. Stops with `success: false` as soon as a
    /// stage produces nothing for the next one.
    #[instrument(skip(self))]
    pub async fn run(&self, limits: IngestLimits, mode: GenerationMode) -> Result<WorkflowSummary> {
        let started = Instant::now();
        let mut summary = WorkflowSummary::default();

        info!("step 1: scraping");
        summary.scraped = self.scrape(limits).await?.stored;
        if summary.scraped == 0 {
            warn!("no new articles scraped, workflow stopped");
            return Ok(summary);
        }

        info!("step 2: generating scripts");
        summary.generated = self.generate(mode).await?.artifact_ids.len();
        if summary.generated == 0 {
            warn!("no scripts generated, workflow stopped");
            return Ok(summary);
        }

        info!("step 3: dispatching");
        let dispatch = self.dispatch().await?;
        summary.sent = dispatch.sent;
        summary.failed = dispatch.failed;
        summary.success = true;

        let stats = self.stats().await?;
        info!(
            scraped = summary.scraped,
            generated = summary.generated,
            sent = summary.sent,
            failed = summary.failed,
            news = ?stats.news,
            artifacts = ?stats.artifacts,
            secs = started.elapsed().as_secs(),
            "workflow completed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSource, RecordingScheduleStore, ScriptedGenerator};

    const SCRIPT: &str = r#"```json
{"title": "Naskah", "description": "d", "body": "Isi naskah video."}
```"#;

    async fn pipeline(
        source: FakeSource,
        ai: Option<ScriptedGenerator>,
    ) -> (Pipeline, Arc<RecordingScheduleStore>) {
        let store = Arc::new(RecordingScheduleStore::default());
        let (pipeline, _) = crate::testing::pipeline(source, ai, store.clone()).await;
        (pipeline, store)
    }

    fn body() -> String {
        "kata ".repeat(60)
    }

    #[tokio::test]
    async fn full_run_aggregates_counts() {
        let source = FakeSource::default()
            .page(1, &["https://k.test/harga-emas-naik", "https://k.test/timnas-menang", "https://k.test/saham-bank"])
            .article("https://k.test/harga-emas-naik", &body())
            .article("https://k.test/timnas-menang", &body())
            .article("https://k.test/saham-bank", &body());
        let (pipeline, store) =
            pipeline(source, Some(ScriptedGenerator::new([Ok(SCRIPT), Ok(SCRIPT)]))).await;

        let summary = pipeline
            .run(IngestLimits::default(), GenerationMode::PerArticle)
            .await
            .unwrap();

        assert_eq!(
            summary,
            WorkflowSummary {
                scraped: 3,
                generated: 2,
                sent: 2,
                failed: 0,
                success: true,
            }
        );
        assert_eq!(store.titles().len(), 2);

        let stats = pipeline.stats().await.unwrap();
        assert_eq!(
            stats.artifacts,
            vec![StatusCount { status: "sent_to_schedule".into(), total: 2 }]
        );
    }

    #[tokio::test]
    async fn stops_when_nothing_was_scraped() {
        let ai = ScriptedGenerator::default();
        let (pipeline, store) = pipeline(FakeSource::default(), Some(ai)).await;

        let summary = pipeline
            .run(IngestLimits::default(), GenerationMode::PerArticle)
            .await
            .unwrap();
        assert!(!summary.success);
        assert_eq!(summary.scraped, 0);
        assert!(store.titles().is_empty());
    }

    #[tokio::test]
    async fn stops_when_nothing_was_generated() {
        let source = FakeSource::default()
            .page(1, &["https://k.test/timnas-menang"])
            .article("https://k.test/timnas-menang", &body());
        let (pipeline, _) = pipeline(source, Some(ScriptedGenerator::default())).await;

        let summary = pipeline
            .run(IngestLimits::default(), GenerationMode::PerArticle)
            .await
            .unwrap();
        assert_eq!(summary.scraped, 1);
        assert_eq!(summary.generated, 0);
        assert!(!summary.success);
    }

    #[tokio::test]
    async fn generation_without_ai_is_a_config_error() {
        let (pipeline, _) = pipeline(FakeSource::default(), None).await;
        let err = pipeline.generate(GenerationMode::Batch).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
