use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::ai::response::{self, sanitize_body, strip_fences, truncate_chars};
use crate::ai::{prompt, ScriptDraft, TextGenerator};
use crate::config::GenerationConfig;
use crate::db::ContentRepository;
use crate::error::Result;
use crate::filter::{KeywordClassifier, MatchMode};
use crate::models::{FilteredArticle, NewArtifact, SourceIds};

use super::filtering::articles_ready_for_generation;

const FALLBACK_TITLE_CHARS: usize = 80;

const DIGEST_TITLE: &str = "Update Berita Ekonomi dan Bisnis Hari Ini";
const DIGEST_HASHTAGS: &str = "#BeritaEkonomi #BisnisIndonesia #UpdatePasar #Investasi #FinancialNews";
const DIGEST_DESCRIPTION: &str = "Rangkuman berita ekonomi dan bisnis terkini beserta analisis dan tips untuk investor dan entrepreneur";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationMode {
    /// One script per filtered article.
    #[default]
    PerArticle,
    /// One AI call over every filtered article, several scripts out.
    Batch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Filtered articles handed to generation.
    pub considered: usize,
    pub artifact_ids: Vec<i64>,
    /// Artifacts built from the raw response because parsing failed.
    pub fallbacks: usize,
    pub failed: usize,
    pub marked_processed: usize,
}

fn category_hashtags(category: &str) -> String {
    format!("#{category} #BeritaEkonomi #FinancialNews")
}

/// Usable body from an unparseable response, or `None` when nothing is left.
fn fallback_body(raw: &str, max_chars: usize) -> Option<String> {
    let body = truncate_chars(&sanitize_body(&strip_fences(raw)), max_chars);
    let body = body.trim_end().to_string();
    (!body.is_empty()).then_some(body)
}

pub struct Generator {
    repository: Arc<ContentRepository>,
    ai: Arc<dyn TextGenerator>,
    classifier: KeywordClassifier,
    request_delay: Duration,
    fallback_chars: usize,
}

impl Generator {
    pub fn new(
        repository: Arc<ContentRepository>,
        ai: Arc<dyn TextGenerator>,
        config: &GenerationConfig,
    ) -> Self {
        Self {
            repository,
            ai,
            classifier: KeywordClassifier::new(if config.strict_match {
                MatchMode::Strict
            } else {
                MatchMode::Lenient
            }),
            request_delay: Duration::from_millis(config.request_delay_ms),
            fallback_chars: config.fallback_chars,
        }
    }

    pub async fn run(&self, mode: GenerationMode) -> Result<GenerationReport> {
        match mode {
            GenerationMode::PerArticle => self.generate_per_article().await,
            GenerationMode::Batch => self.generate_batch().await,
        }
    }

    #[instrument(skip_all)]
    pub async fn generate_per_article(&self) -> Result<GenerationReport> {
        let filtered = articles_ready_for_generation(&self.repository, &self.classifier).await?;
        let mut report = GenerationReport {
            considered: filtered.len(),
            ..Default::default()
        };
        if filtered.is_empty() {
            info!("no financial articles waiting for a script");
            return Ok(report);
        }

        let mut processed = Vec::new();
        for (i, item) in filtered.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.request_delay).await;
            }
            info!(
                n = i + 1,
                of = filtered.len(),
                title = %item.article.title,
                category = item.category,
                "generating script"
            );

            let text = match self.ai.generate(&prompt::single_article(item)).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(article = item.article.id, error = %e, "AI call failed, skipping");
                    report.failed += 1;
                    continue;
                }
            };

            let Some((artifact, is_fallback)) = self.single_artifact(item, &text) else {
                warn!(article = item.article.id, "response had no usable script, skipping");
                report.failed += 1;
                continue;
            };

            match self.repository.insert_artifact(artifact).await {
                Ok(id) => {
                    info!(article = item.article.id, artifact = id, fallback = is_fallback, "script stored");
                    report.artifact_ids.push(id);
                    if is_fallback {
                        report.fallbacks += 1;
                    }
                    processed.push(item.article.id);
                }
                Err(e) => {
                    warn!(article = item.article.id, error = %e, "storing script failed");
                    report.failed += 1;
                }
            }
        }

        report.marked_processed = self.repository.mark_articles_processed(&processed).await?;
        info!(
            generated = report.artifact_ids.len(),
            fallbacks = report.fallbacks,
            failed = report.failed,
            marked = report.marked_processed,
            "per-article generation finished"
        );
        Ok(report)
    }

    fn single_artifact(&self, item: &FilteredArticle, text: &str) -> Option<(NewArtifact, bool)> {
        let article = &item.article;
        let source_ids = SourceIds::new([article.id]);

        match response::parse_single(text) {
            Ok(draft) => Some((
                NewArtifact {
                    title: draft.title.unwrap_or_else(|| article.title.clone()),
                    hashtags: draft
                        .hashtags
                        .unwrap_or_else(|| category_hashtags(item.category)),
                    description: draft.description.unwrap_or_else(|| article.title.clone()),
                    body: draft.body,
                    source_ids,
                },
                false,
            )),
            Err(e) => {
                debug!(article = article.id, error = %e, "unparseable response, using raw text");
                let body = fallback_body(text, self.fallback_chars)?;
                Some((
                    NewArtifact {
                        title: truncate_chars(&article.title, FALLBACK_TITLE_CHARS),
                        hashtags: category_hashtags(item.category),
                        description: article.title.clone(),
                        body,
                        source_ids,
                    },
                    true,
                ))
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn generate_batch(&self) -> Result<GenerationReport> {
        let filtered = articles_ready_for_generation(&self.repository, &self.classifier).await?;
        let mut report = GenerationReport {
            considered: filtered.len(),
            ..Default::default()
        };
        if filtered.is_empty() {
            info!("no financial articles waiting for a script");
            return Ok(report);
        }

        let input: Vec<i64> = filtered.iter().map(|f| f.article.id).collect();
        info!(articles = input.len(), "generating batch scripts");
        let text = self.ai.generate(&prompt::batch(&filtered)).await?;

        let artifacts = match response::parse_batch(&text) {
            Ok(drafts) => drafts
                .into_iter()
                .map(|draft| batch_artifact(draft, &input))
                .collect(),
            Err(e) => {
                warn!(error = %e, "batch response unusable, storing digest fallback");
                match fallback_body(&text, self.fallback_chars) {
                    Some(body) => {
                        report.fallbacks += 1;
                        vec![NewArtifact {
                            title: DIGEST_TITLE.to_string(),
                            hashtags: DIGEST_HASHTAGS.to_string(),
                            description: DIGEST_DESCRIPTION.to_string(),
                            body,
                            source_ids: SourceIds::new(input.iter().copied()),
                        }]
                    }
                    None => Vec::new(),
                }
            }
        };

        if artifacts.is_empty() {
            warn!("batch response produced nothing to store");
            report.failed += 1;
            return Ok(report);
        }

        let mut referenced = Vec::new();
        for artifact in artifacts {
            let ids = artifact.source_ids.clone();
            let title = artifact.title.clone();
            match self.repository.insert_artifact(artifact).await {
                Ok(id) => {
                    info!(artifact = id, %title, sources = ?ids.as_slice(), "script stored");
                    report.artifact_ids.push(id);
                    referenced.extend_from_slice(ids.as_slice());
                }
                Err(e) => {
                    warn!(%title, error = %e, "storing script failed");
                    report.failed += 1;
                }
            }
        }

        let referenced = SourceIds::new(referenced);
        report.marked_processed = self
            .repository
            .mark_articles_processed(referenced.as_slice())
            .await?;
        info!(
            generated = report.artifact_ids.len(),
            fallbacks = report.fallbacks,
            marked = report.marked_processed,
            "batch generation finished"
        );
        Ok(report)
    }
}

/// Keep only the ids that were actually in the batch; a script that names none
/// of them is attributed to the whole batch.
fn batch_artifact(draft: ScriptDraft, input: &[i64]) -> NewArtifact {
    let claimed = SourceIds::new(draft.source_ids.into_iter().filter(|id| input.contains(id)));
    let source_ids = if claimed.is_empty() {
        SourceIds::new(input.iter().copied())
    } else {
        claimed
    };
    let title = draft.title.unwrap_or_else(|| DIGEST_TITLE.to_string());

    NewArtifact {
        hashtags: draft.hashtags.unwrap_or_else(|| DIGEST_HASHTAGS.to_string()),
        description: draft.description.unwrap_or_else(|| title.clone()),
        title,
        body: draft.body,
        source_ids,
    }
}
