mod keywords;

pub use keywords::{FilterStats, KeywordClassifier, MatchMode};
