use tracing::info;

use crate::db::ContentRepository;
use crate::error::Result;
use crate::filter::{FilterStats, KeywordClassifier};
use crate::models::FilteredArticle;

/// Pending articles without an artifact that match a financial keyword,
/// newest first.
pub async fn articles_ready_for_generation(
    repository: &ContentRepository,
    classifier: &KeywordClassifier,
) -> Result<Vec<FilteredArticle>> {
    let candidates = repository.articles_without_artifact().await?;
    let total = candidates.len();
    let filtered = classifier.filter_articles(candidates);

    let stats = FilterStats::compute(total, &filtered);
    info!(
        total = stats.total,
        matched = stats.matched,
        match_rate = stats.match_rate,
        categories = ?stats.categories,
        "keyword filter applied"
    );

    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{new_artifact, seed};

    #[tokio::test]
    async fn keeps_only_financial_titles_in_order() {
        let repo = ContentRepository::in_memory().await.unwrap();
        let ids = seed(
            &repo,
            &[
                ("Harga Emas Antam Naik", "2025-10-13 10:00:00"),
                ("Timnas Menang Telak", "2025-10-13 09:00:00"),
                ("IHSG Ditutup Menguat", "2025-10-13 08:00:00"),
            ],
        )
        .await;

        let ready = articles_ready_for_generation(&repo, &KeywordClassifier::default())
            .await
            .unwrap();

        let got: Vec<i64> = ready.iter().map(|f| f.article.id).collect();
        assert_eq!(got, vec![ids[0], ids[2]]);
        assert!(ready.iter().all(|f| !f.matched_terms.is_empty()));
        assert_eq!(ready[0].category, "gold");
        assert_eq!(ready[1].category, "stock");
    }

    #[tokio::test]
    async fn articles_with_an_artifact_are_excluded() {
        let repo = ContentRepository::in_memory().await.unwrap();
        let ids = seed(
            &repo,
            &[
                ("Rupiah Melemah", "2025-10-13 10:00:00"),
                ("Saham Bank Naik", "2025-10-13 09:00:00"),
            ],
        )
        .await;
        repo.insert_artifact(new_artifact("Video", &[ids[0]]))
            .await
            .unwrap();

        let ready = articles_ready_for_generation(&repo, &KeywordClassifier::default())
            .await
            .unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].article.id, ids[1]);
    }
}
