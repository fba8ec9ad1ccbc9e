//! Financial keyword classification over article titles.
//!
//! The keyword universe is an ordered list of categories. Order matters:
//! [`KeywordClassifier::categorize`] returns the first category with a hit,
//! so an article about "emas dan dolar" lands in `usd`, not `gold`.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::models::{Article, FilteredArticle};

pub const UNCATEGORIZED: &str = "uncategorized";

pub const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "usd",
        &[
            "usd", "dolar", "dollar", "rupiah", "idr", "kurs", "nilai tukar", "mata uang",
            "forex", "valuta asing", "exchange rate",
        ],
    ),
    (
        "fed",
        &[
            "federal reserve", "the fed", "fed rate", "suku bunga", "interest rate", "inflasi",
            "inflation", "deflasi", "kebijakan moneter", "monetary policy",
        ],
    ),
    ("gold", &["emas", "gold", "perak", "silver", "logam mulia"]),
    (
        "oil",
        &["minyak", "oil", "crude", "brent", "wti", "opec", "bbm", "energi"],
    ),
    (
        "commodity",
        &["komoditas", "commodity", "bahan baku", "raw material"],
    ),
    (
        "stock",
        &[
            "saham", "stock", "bursa", "ihsg", "idx", "wall street", "nasdaq", "dow jones",
            "s&p", "s&p500", "nyse",
        ],
    ),
    (
        "crypto",
        &[
            "bitcoin", "btc", "ethereum", "eth", "crypto", "kripto", "blockchain", "altcoin",
        ],
    ),
    (
        "economy",
        &[
            "ekonomi", "economy", "gdp", "pdb", "pertumbuhan ekonomi", "resesi", "recession",
            "ekspor", "impor", "perdagangan", "trade", "tarif",
        ],
    ),
    (
        "banking",
        &[
            "bank", "banking", "bi", "bank indonesia", "ojk", "kredit", "loan", "financing",
            "likuiditas",
        ],
    ),
    (
        "investment",
        &[
            "investasi", "investment", "investor", "reksadana", "obligasi", "bond", "yield",
            "return", "profit", "dividen",
        ],
    ),
];

// Whole-word patterns for every term, in universe order.
static STRICT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    all_terms()
        .map(|term| {
            RegexBuilder::new(&format!(r"\b{}\b", regex::escape(term)))
                .case_insensitive(true)
                .build()
                .expect("escaped keyword is a valid pattern")
        })
        .collect()
});

fn all_terms() -> impl Iterator<Item = &'static str> {
    CATEGORIES.iter().flat_map(|(_, terms)| terms.iter().copied())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Term must appear as a whole word.
    Strict,
    /// Term may appear anywhere as a case-insensitive substring.
    #[default]
    Lenient,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier {
    mode: MatchMode,
}

impl KeywordClassifier {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }

    pub fn matches(&self, title: &str) -> bool {
        if title.trim().is_empty() {
            return false;
        }
        match self.mode {
            MatchMode::Lenient => {
                let lower = title.to_lowercase();
                all_terms().any(|term| lower.contains(term))
            }
            MatchMode::Strict => STRICT_PATTERNS.iter().any(|re| re.is_match(title)),
        }
    }

    /// First category, in declared order, with a substring hit.
    pub fn categorize(&self, title: &str) -> &'static str {
        if title.trim().is_empty() {
            return UNCATEGORIZED;
        }
        let lower = title.to_lowercase();
        CATEGORIES
            .iter()
            .find(|(_, terms)| terms.iter().any(|term| lower.contains(term)))
            .map(|(category, _)| *category)
            .unwrap_or(UNCATEGORIZED)
    }

    /// Every term in the universe that occurs as a substring, across all categories.
    pub fn matched_terms(&self, title: &str) -> Vec<&'static str> {
        if title.trim().is_empty() {
            return Vec::new();
        }
        let lower = title.to_lowercase();
        all_terms().filter(|term| lower.contains(term)).collect()
    }

    pub fn filter_articles(&self, articles: Vec<Article>) -> Vec<FilteredArticle> {
        articles
            .into_iter()
            .filter(|a| self.matches(&a.title))
            .map(|article| FilteredArticle {
                category: self.categorize(&article.title),
                matched_terms: self.matched_terms(&article.title),
                article,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterStats {
    pub total: usize,
    pub matched: usize,
    /// Percentage of titles that matched, 0.0 when there were none.
    pub match_rate: f64,
    /// Matched articles per category, in declared category order.
    pub categories: Vec<(&'static str, usize)>,
}

impl FilterStats {
    pub fn compute(total: usize, filtered: &[FilteredArticle]) -> Self {
        let mut categories: Vec<(&'static str, usize)> = Vec::new();
        for name in CATEGORIES
            .iter()
            .map(|(name, _)| *name)
            .chain(std::iter::once(UNCATEGORIZED))
        {
            let count = filtered.iter().filter(|f| f.category == name).count();
            if count > 0 {
                categories.push((name, count));
            }
        }
        let match_rate = if total == 0 {
            0.0
        } else {
            filtered.len() as f64 * 100.0 / total as f64
        };
        Self {
            total,
            matched: filtered.len(),
            match_rate,
            categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::article;

    #[test]
    fn lenient_matches_substrings_case_insensitively() {
        let c = KeywordClassifier::default();
        assert!(c.matches("Harga EMAS Antam Naik Hari Ini"));
        assert!(c.matches("Rupiah melemah terhadap USD"));
        assert!(c.matches("Prospek Reksadana Pendapatan Tetap"));
        assert!(!c.matches("Timnas Menang Telak di Kualifikasi"));
    }

    #[test]
    fn lenient_hits_inside_longer_words() {
        let c = KeywordClassifier::new(MatchMode::Lenient);
        // "bi" occurs inside "bisnis"
        assert!(c.matches("Peluang Bisnis Kuliner"));
    }

    #[test]
    fn strict_requires_whole_words() {
        let c = KeywordClassifier::new(MatchMode::Strict);
        assert!(!c.matches("Peluang Bisnis Kuliner"));
        assert!(c.matches("BI Tahan Suku Bunga"));
        assert!(c.matches("Indeks S&P 500 Ditutup Menguat"));
    }

    #[test]
    fn empty_title_has_no_classification() {
        for mode in [MatchMode::Strict, MatchMode::Lenient] {
            let c = KeywordClassifier::new(mode);
            assert!(!c.matches(""));
            assert!(!c.matches("   "));
            assert_eq!(c.categorize(""), UNCATEGORIZED);
            assert!(c.matched_terms("").is_empty());
        }
    }

    #[test]
    fn categorize_picks_first_declared_category() {
        let c = KeywordClassifier::default();
        // gold and usd both hit; usd is declared first
        assert_eq!(c.categorize("Harga Emas Turun Saat Dolar Menguat"), "usd");
        assert_eq!(c.categorize("Harga Emas Antam Stagnan"), "gold");
        assert_eq!(c.categorize("Timnas Menang"), UNCATEGORIZED);
    }

    #[test]
    fn categorize_is_deterministic() {
        let c = KeywordClassifier::default();
        let title = "Saham Bank Besar Tertekan Isu Resesi";
        let first = c.categorize(title);
        for _ in 0..10 {
            assert_eq!(c.categorize(title), first);
        }
        assert_eq!(first, "stock");
    }

    #[test]
    fn matched_terms_span_all_categories() {
        let c = KeywordClassifier::default();
        let terms = c.matched_terms("Harga Emas Turun Saat Dolar Menguat");
        assert_eq!(terms, vec!["dolar", "emas"]);
    }

    #[test]
    fn matches_iff_some_term_found() {
        let c = KeywordClassifier::default();
        for title in [
            "IHSG Dibuka Menguat",
            "Cuaca Cerah di Jakarta",
            "Harga Minyak Brent Melonjak",
            "Jadwal Kereta Lebaran",
        ] {
            assert_eq!(c.matches(title), !c.matched_terms(title).is_empty());
        }
    }

    #[test]
    fn filter_keeps_order_and_decorates() {
        let c = KeywordClassifier::default();
        let articles = vec![
            article(1, "IHSG Dibuka Menguat"),
            article(2, "Cuaca Cerah di Jakarta"),
            article(3, "Harga Minyak Brent Melonjak"),
        ];
        let filtered = c.filter_articles(articles);
        let ids: Vec<i64> = filtered.iter().map(|f| f.article.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(filtered[0].category, "stock");
        assert_eq!(filtered[1].category, "oil");
        assert!(filtered.iter().all(|f| !f.matched_terms.is_empty()));
    }

    #[test]
    fn stats_count_per_category() {
        let c = KeywordClassifier::default();
        let filtered = c.filter_articles(vec![
            article(1, "IHSG Dibuka Menguat"),
            article(2, "Saham Teknologi Anjlok"),
            article(3, "Harga Minyak Brent Melonjak"),
        ]);
        let stats = FilterStats::compute(4, &filtered);
        assert_eq!(stats.matched, 3);
        assert_eq!(stats.match_rate, 75.0);
        assert_eq!(stats.categories, vec![("oil", 1), ("stock", 2)]);
    }

    #[test]
    fn stats_handle_empty_input() {
        let stats = FilterStats::compute(0, &[]);
        assert_eq!(stats.match_rate, 0.0);
        assert!(stats.categories.is_empty());
    }
}
