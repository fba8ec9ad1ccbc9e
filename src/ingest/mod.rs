mod extract;
mod ingestor;
mod source;

#[cfg(test)]
pub use extract::IndexEntry;
pub use ingestor::{IngestLimits, IngestReport, Ingestor, RatePolicy};
pub use source::KontanSource;
#[cfg(test)]
pub use source::{ArticlePage, NewsSource};
