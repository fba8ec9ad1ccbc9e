//! HTML extraction for the Kontan index and article pages.
//!
//! Everything here is synchronous and works on a borrowed HTML string, so the
//! parsed document never lives across an `.await`.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::clock;

/// Content regions, most specific first.
const CONTENT_REGIONS: &[&str] = &[
    ".img-detail-desk",
    ".box-det-desk-2",
    ".detail-content",
    ".detail-desk",
    "article",
    ".post-content",
];

const REGION_MIN_PARAGRAPH: usize = 50;
const FALLBACK_MIN_PARAGRAPH: usize = 100;

const NOISE: &[&str] = &[
    "©",
    "baca juga",
    "cek berita",
    "selengkapnya",
    "sumber:",
    "editor:",
    "reporter:",
];
const FALLBACK_NOISE: &[&str] = &["iklan", "advertisement"];
const SITE_LABEL: &str = "KONTAN.CO.ID";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid CSS")
}

static LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| selector(".list-berita li"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h1, h2, h3"));
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static DATE: LazyLock<Selector> = LazyLock::new(|| selector("time, .date, .font-gray"));
static REGIONS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| CONTENT_REGIONS.iter().map(|css| selector(css)).collect());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub url: String,
    pub title: String,
}

/// Concatenated text nodes with whitespace runs collapsed. Inline markup adds
/// no separators of its own.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Article links on an index page. Items without a link or heading are skipped;
/// relative links are resolved against `base`.
pub fn index_entries(html: &str, base: &Url) -> Vec<IndexEntry> {
    let doc = Html::parse_document(html);
    let mut entries = Vec::new();

    for item in doc.select(&LIST_ITEM) {
        let Some(href) = item
            .select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        let Some(title) = item.select(&HEADING).next().map(element_text) else {
            continue;
        };
        if title.is_empty() {
            continue;
        }
        match base.join(href.trim()) {
            Ok(url) => entries.push(IndexEntry {
                url: url.to_string(),
                title,
            }),
            Err(e) => tracing::debug!(href, error = %e, "skipping unparseable link"),
        }
    }

    entries
}

fn is_noise(text: &str, extra: &[&str]) -> bool {
    let lower = text.to_lowercase();
    text.starts_with(SITE_LABEL)
        || NOISE.iter().chain(extra).any(|phrase| lower.contains(phrase))
}

fn collect_paragraphs<'a>(
    paragraphs: impl Iterator<Item = ElementRef<'a>>,
    min_chars: usize,
    extra_noise: &[&str],
) -> String {
    paragraphs
        .map(element_text)
        .filter(|p| p.chars().count() > min_chars && !is_noise(p, extra_noise))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Body text of an article page.
///
/// Returns the first content region whose text exceeds `min_chars`, then the
/// whole-document paragraph fallback if that does. Otherwise the longest
/// candidate is returned so the caller can report it as too short; `None`
/// means nothing readable was found at all.
pub fn article_content(html: &str, min_chars: usize) -> Option<String> {
    let doc = Html::parse_document(html);
    let mut best = String::new();

    for region in REGIONS.iter() {
        let Some(el) = doc.select(region).next() else {
            continue;
        };
        let text = collect_paragraphs(el.select(&PARAGRAPH), REGION_MIN_PARAGRAPH, &[]);
        if text.chars().count() > min_chars {
            return Some(text);
        }
        if text.chars().count() > best.chars().count() {
            best = text;
        }
    }

    let fallback = collect_paragraphs(
        doc.select(&PARAGRAPH),
        FALLBACK_MIN_PARAGRAPH,
        FALLBACK_NOISE,
    );
    if fallback.chars().count() > best.chars().count() {
        best = fallback;
    }

    (!best.is_empty()).then_some(best)
}

/// Publication time advertised on the article page, if it parses.
pub fn published_at(html: &str) -> Option<NaiveDateTime> {
    let doc = Html::parse_document(html);
    let el = doc.select(&DATE).next()?;
    let raw = el
        .value()
        .attr("datetime")
        .map(str::to_string)
        .unwrap_or_else(|| element_text(el));
    clock::parse_timestamp(&raw)
}
