use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::clock;
use crate::config::ScraperConfig;
use crate::db::ContentRepository;
use crate::error::Result;
use crate::models::NewArticle;

use super::extract::IndexEntry;
use super::source::NewsSource;

/// Pacing applied between requests to the news site.
#[derive(Debug, Clone, PartialEq)]
pub struct RatePolicy {
    pub base_delay: Duration,
    /// Added once for every `step_every` articles stored so far.
    pub step: Duration,
    pub step_every: usize,
    pub error_delay: Duration,
    pub page_delay_min: Duration,
    pub page_delay_max: Duration,
}

impl RatePolicy {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.base_delay_ms),
            step: Duration::from_millis(config.delay_step_ms),
            step_every: config.delay_step_every,
            error_delay: Duration::from_millis(config.error_delay_ms),
            page_delay_min: Duration::from_millis(config.page_delay_min_ms),
            page_delay_max: Duration::from_millis(config.page_delay_max_ms),
        }
    }

    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            step: Duration::ZERO,
            step_every: 10,
            error_delay: Duration::ZERO,
            page_delay_min: Duration::ZERO,
            page_delay_max: Duration::ZERO,
        }
    }

    pub fn article_delay(&self, stored: usize) -> Duration {
        if self.step_every == 0 {
            return self.base_delay;
        }
        let steps = u32::try_from(stored / self.step_every).unwrap_or(u32::MAX);
        self.base_delay.saturating_add(self.step.saturating_mul(steps))
    }

    pub fn page_delay(&self) -> Duration {
        if self.page_delay_max <= self.page_delay_min {
            return self.page_delay_min;
        }
        let min = self.page_delay_min.as_millis() as u64;
        let max = self.page_delay_max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestLimits {
    pub max_pages: Option<u32>,
    pub max_articles: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub stored: usize,
    pub duplicates: usize,
    pub too_short: usize,
    pub failed: usize,
    pub pages: u32,
}

enum Outcome {
    Stored,
    Duplicate,
    TooShort(usize),
}

pub struct Ingestor {
    source: Arc<dyn NewsSource>,
    repository: Arc<ContentRepository>,
    policy: RatePolicy,
    min_content_chars: usize,
}

impl Ingestor {
    pub fn new(
        source: Arc<dyn NewsSource>,
        repository: Arc<ContentRepository>,
        policy: RatePolicy,
        min_content_chars: usize,
    ) -> Self {
        Self {
            source,
            repository,
            policy,
            min_content_chars,
        }
    }

    pub async fn ingest_today(&self, limits: IngestLimits) -> Result<IngestReport> {
        self.ingest_for_date(clock::today(), limits).await
    }

    /// Walk the index for `date` page by page until a page lists nothing.
    #[instrument(skip(self), fields(%date))]
    pub async fn ingest_for_date(
        &self,
        date: NaiveDate,
        limits: IngestLimits,
    ) -> Result<IngestReport> {
        let started = clock::now();
        let mut report = IngestReport::default();
        let mut page = 1u32;

        if limits.max_articles == Some(0) || limits.max_pages == Some(0) {
            return Ok(report);
        }

        'pages: loop {
            let entries = match self.source.index_page(date, page).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(page, error = %e, "index page fetch failed, stopping pagination");
                    break;
                }
            };
            report.pages += 1;
            info!(page, count = entries.len(), "index page fetched");

            if entries.is_empty() {
                break;
            }

            // Undated detail pages fall back to the index date.
            let fallback_date = date.and_time(started.time());
            for (i, entry) in entries.iter().enumerate() {
                debug!(n = i + 1, of = entries.len(), title = %entry.title, "processing");
                let delay = match self.ingest_entry(entry, fallback_date).await {
                    Ok(Outcome::Duplicate) => {
                        report.duplicates += 1;
                        debug!(url = %entry.url, "already stored, skipped");
                        continue;
                    }
                    Ok(Outcome::Stored) => {
                        report.stored += 1;
                        info!(url = %entry.url, "article stored");
                        if limits.max_articles.is_some_and(|max| report.stored >= max) {
                            info!(stored = report.stored, "article limit reached");
                            break 'pages;
                        }
                        self.policy.article_delay(report.stored)
                    }
                    Ok(Outcome::TooShort(chars)) => {
                        report.too_short += 1;
                        info!(url = %entry.url, chars, "content too short, skipped");
                        self.policy.article_delay(report.stored)
                    }
                    Err(e) => {
                        report.failed += 1;
                        warn!(url = %entry.url, error = %e, "article failed");
                        self.policy.error_delay
                    }
                };
                tokio::time::sleep(delay).await;
            }

            if limits.max_pages.is_some_and(|max| page >= max) {
                info!(page, "page limit reached");
                break;
            }
            page += 1;
            let pause = self.policy.page_delay();
            debug!(ms = pause.as_millis() as u64, "waiting before next page");
            tokio::time::sleep(pause).await;
        }

        info!(
            stored = report.stored,
            duplicates = report.duplicates,
            too_short = report.too_short,
            failed = report.failed,
            pages = report.pages,
            "ingestion finished"
        );
        Ok(report)
    }

    async fn ingest_entry(
        &self,
        entry: &IndexEntry,
        fallback_date: NaiveDateTime,
    ) -> Result<Outcome> {
        if self.repository.article_exists(&entry.url).await? {
            return Ok(Outcome::Duplicate);
        }

        let page = self.source.article(&entry.url).await?;
        let body = page.content.unwrap_or_default();
        let chars = body.chars().count();
        if chars <= self.min_content_chars {
            return Ok(Outcome::TooShort(chars));
        }

        self.repository
            .upsert_article(NewArticle {
                url: entry.url.clone(),
                title: entry.title.clone(),
                body,
                published_at: page.published_at.unwrap_or(fallback_date),
            })
            .await?;
        Ok(Outcome::Stored)
    }
}
