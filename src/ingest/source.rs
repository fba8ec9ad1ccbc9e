use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use reqwest::Client;
use url::Url;

use crate::config::ScraperConfig;
use crate::error::Result;

use super::extract::{self, IndexEntry};

/// What the ingestion loop needs from a news site.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Entries listed on the given 1-based index page for `date`.
    async fn index_page(&self, date: NaiveDate, page: u32) -> Result<Vec<IndexEntry>>;

    /// Fetch and extract a single article page.
    async fn article(&self, url: &str) -> Result<ArticlePage>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticlePage {
    pub content: Option<String>,
    pub published_at: Option<NaiveDateTime>,
}

/// Index page URL for a date. Page 1 carries an empty offset.
pub fn index_url(search_url: &Url, date: NaiveDate, page: u32, page_size: u32) -> Url {
    let offset = if page <= 1 {
        String::new()
    } else {
        ((page - 1) * page_size).to_string()
    };
    let mut url = search_url.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("kanal", "")
        .append_pair("tanggal", &date.day().to_string())
        .append_pair("bulan", &date.month().to_string())
        .append_pair("tahun", &date.year().to_string())
        .append_pair("pos", "indeks")
        .append_pair("per_page", &offset);
    url
}

pub struct KontanSource {
    client: Client,
    search_url: Url,
    page_size: u32,
    min_content_chars: usize,
}

impl KontanSource {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            search_url: Url::parse(&config.search_url)?,
            page_size: config.page_size,
            min_content_chars: config.min_content_chars,
        })
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("GET {url} returned {status}").into());
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl NewsSource for KontanSource {
    async fn index_page(&self, date: NaiveDate, page: u32) -> Result<Vec<IndexEntry>> {
        let url = index_url(&self.search_url, date, page, self.page_size);
        tracing::debug!(%url, "fetching index page");
        let html = self.fetch_html(url.as_str()).await?;
        Ok(extract::index_entries(&html, &url))
    }

    async fn article(&self, url: &str) -> Result<ArticlePage> {
        let html = self.fetch_html(url).await?;
        Ok(ArticlePage {
            content: extract::article_content(&html, self.min_content_chars),
            published_at: extract::published_at(&html),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search() -> Url {
        Url::parse("https://www.kontan.co.id/search/indeks").unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 13).unwrap()
    }

    #[test]
    fn first_page_has_empty_offset() {
        assert_eq!(
            index_url(&search(), day(), 1, 20).as_str(),
            "https://www.kontan.co.id/search/indeks?kanal=&tanggal=13&bulan=10&tahun=2025&pos=indeks&per_page="
        );
    }

    #[test]
    fn later_pages_offset_by_page_size() {
        let url = index_url(&search(), day(), 3, 20);
        assert!(url.as_str().ends_with("&per_page=40"));
    }

    #[test]
    fn builds_from_default_config() {
        assert!(KontanSource::new(&ScraperConfig::default()).is_ok());
    }
}
