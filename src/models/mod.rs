mod article;
mod artifact;

pub use article::{Article, ArticleStatus, FilteredArticle, NewArticle};
pub use artifact::{ArtifactStatus, GeneratedArtifact, NewArtifact, SourceIds, StatusCount};

#[derive(Debug, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);
