//! Backing-store adapters.
//!
//! The core consumes two stores through traits: the [`LexicalStore`] owns
//! the authoritative article records and answers BM25-style multi-field
//! queries; the [`VectorStore`] holds the derived embeddings and answers
//! cosine-similarity searches. Both ship with in-memory implementations
//! that are safe for concurrent use, so the server runs without external
//! services and tests run hermetically.

/// Lexical (BM25) store trait and in-memory implementation.
pub mod lexical;
/// Vector store trait and in-memory implementation.
pub mod vector;

pub use lexical::{InMemoryLexicalStore, LexicalHit, LexicalStore};
pub use vector::{InMemoryVectorStore, VectorHit, VectorStore};

/// Suffix of a title embedding point id.
pub const TITLE_SUFFIX: &str = "_title";
/// Suffix of a summary embedding point id.
pub const SUMMARY_SUFFIX: &str = "_summary";

/// Derive the title point id for an article.
pub fn title_point_id(article_id: &str) -> String {
    format!("{}{}", article_id, TITLE_SUFFIX)
}

/// Derive the summary point id for an article.
pub fn summary_point_id(article_id: &str) -> String {
    format!("{}{}", article_id, SUMMARY_SUFFIX)
}

/// Recover the article id from a point id by stripping the known suffix.
///
/// Point ids are always `<article-id>_title` or `<article-id>_summary`;
/// anything else is an invariant violation and returns `None`.
pub fn article_id_of_point(point_id: &str) -> Option<&str> {
    point_id
        .strip_suffix(TITLE_SUFFIX)
        .or_else(|| point_id.strip_suffix(SUMMARY_SUFFIX))
}

/// True if the point id refers to a title embedding.
pub fn is_title_point(point_id: &str) -> bool {
    point_id.ends_with(TITLE_SUFFIX)
}
