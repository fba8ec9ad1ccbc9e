//! Fixtures and in-process fakes shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::ai::TextGenerator;
use crate::clock;
use crate::config::GenerationConfig;
use crate::db::ContentRepository;
use crate::error::{AppError, Result};
use crate::ingest::{ArticlePage, IndexEntry, Ingestor, NewsSource, RatePolicy};
use crate::models::{Article, ArticleStatus, NewArticle, NewArtifact, SourceIds};
use crate::pipeline::{Dispatcher, GenerationMode, Generator, Pipeline};
use crate::services::{ScheduleEntry, ScheduleStore};

const BODY: &str = "Pasar keuangan domestik bergerak dinamis sepanjang hari perdagangan \
    seiring investor mencermati data ekonomi terbaru dan arah kebijakan bank sentral.";

pub fn article(id: i64, title: &str) -> Article {
    Article {
        id,
        url: format!("https://www.kontan.co.id/news/{id}"),
        title: title.to_string(),
        body: BODY.to_string(),
        published_at: clock::parse_timestamp("2025-10-13 09:00:00").unwrap(),
        status: ArticleStatus::Pending,
        processed_at: None,
    }
}

pub fn new_article(url: &str, title: &str, published_at: &str) -> NewArticle {
    NewArticle {
        url: url.to_string(),
        title: title.to_string(),
        body: BODY.to_string(),
        published_at: clock::parse_timestamp(published_at).unwrap(),
    }
}

pub fn new_artifact(title: &str, ids: &[i64]) -> NewArtifact {
    NewArtifact {
        title: title.to_string(),
        hashtags: "#BeritaEkonomi".to_string(),
        description: format!("Tentang {title}"),
        body: "Naskah video lengkap.".to_string(),
        source_ids: SourceIds::new(ids.iter().copied()),
    }
}

/// Store `(title, published_at)` rows and return their ids in the same order.
pub async fn seed(repo: &ContentRepository, rows: &[(&str, &str)]) -> Vec<i64> {
    let mut ids = Vec::new();
    for (i, (title, published_at)) in rows.iter().enumerate() {
        let url = format!("https://www.kontan.co.id/seed/{i}");
        ids.push(
            repo.upsert_article(new_article(&url, title, published_at))
                .await
                .unwrap(),
        );
    }
    ids
}

/// A pipeline over an in-memory repository with no pacing delays.
pub async fn pipeline(
    source: FakeSource,
    ai: Option<ScriptedGenerator>,
    store: Arc<RecordingScheduleStore>,
) -> (Pipeline, Arc<ContentRepository>) {
    let repo = Arc::new(ContentRepository::in_memory().await.unwrap());
    let ingestor = Ingestor::new(Arc::new(source), repo.clone(), RatePolicy::immediate(), 200);
    let config = GenerationConfig {
        request_delay_ms: 0,
        ..Default::default()
    };
    let generator = ai.map(|ai| Generator::new(repo.clone(), Arc::new(ai), &config));
    let dispatcher = Dispatcher::new(repo.clone(), store);
    let pipeline = Pipeline::new(
        repo.clone(),
        ingestor,
        generator,
        dispatcher,
        GenerationMode::PerArticle,
    );
    (pipeline, repo)
}

#[derive(Default)]
pub struct FakeSource {
    pages: HashMap<u32, Vec<IndexEntry>>,
    failing_pages: HashSet<u32>,
    articles: HashMap<String, ArticlePage>,
    index_requests: Mutex<Vec<u32>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn page(mut self, page: u32, urls: &[&str]) -> Self {
        let entries = urls
            .iter()
            .map(|url| IndexEntry {
                url: url.to_string(),
                title: format!("Judul {url}"),
            })
            .collect();
        self.pages.insert(page, entries);
        self
    }

    pub fn failing_page(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    pub fn article(mut self, url: &str, content: &str) -> Self {
        self.articles.insert(
            url.to_string(),
            ArticlePage {
                content: Some(content.to_string()),
                published_at: None,
            },
        );
        self
    }

    pub fn article_at(mut self, url: &str, content: &str, published_at: &str) -> Self {
        self.articles.insert(
            url.to_string(),
            ArticlePage {
                content: Some(content.to_string()),
                published_at: clock::parse_timestamp(published_at),
            },
        );
        self
    }

    pub fn index_requests(&self) -> Vec<u32> {
        self.index_requests.lock().unwrap().clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl NewsSource for FakeSource {
    async fn index_page(&self, _date: NaiveDate, page: u32) -> Result<Vec<IndexEntry>> {
        self.index_requests.lock().unwrap().push(page);
        if self.failing_pages.contains(&page) {
            return Err(anyhow::anyhow!("index page {page} unavailable").into());
        }
        Ok(self.pages.get(&page).cloned().unwrap_or_default())
    }

    async fn article(&self, url: &str) -> Result<ArticlePage> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.articles
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("GET {url} returned 500").into())
    }
}

/// Replays canned responses in order; `Err` entries become AI failures.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<S: Into<String>>(
        responses: impl IntoIterator<Item = std::result::Result<S, S>>,
    ) -> Self {
        Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|r| r.map(Into::into).map_err(Into::into))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AppError::AiApi(message)),
            None => Err(AppError::AiApi("no scripted response left".to_string())),
        }
    }
}

/// Accepts inserts with ids starting at 100; titles in `failing` are refused.
#[derive(Default)]
pub struct RecordingScheduleStore {
    failing: HashSet<String>,
    entries: Mutex<Vec<ScheduleEntry>>,
}

impl RecordingScheduleStore {
    pub fn failing_on(titles: &[&str]) -> Self {
        Self {
            failing: titles.iter().map(|t| t.to_string()).collect(),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn titles(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.title.clone())
            .collect()
    }
}

#[async_trait]
impl ScheduleStore for RecordingScheduleStore {
    async fn insert_schedule(&self, entry: ScheduleEntry) -> Result<i64> {
        if self.failing.contains(&entry.title) {
            return Err(AppError::Schedule(format!("refused '{}'", entry.title)));
        }
        let mut entries = self.entries.lock().unwrap();
        entries.push(entry);
        Ok(99 + entries.len() as i64)
    }
}
