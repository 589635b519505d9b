//! Lexical store: authoritative article records plus BM25 retrieval.
//!
//! The trait mirrors what the service needs from a full-text engine:
//! index-returning-id, get, multi-get, delete, a boosted multi-field query,
//! and registrar-scoped listing. The in-memory implementation keeps one
//! BM25 index per searchable field and combines field scores with fixed
//! boosts, OR semantics across query terms.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{AppError, Article, Result};

/// Per-field boost factors applied to BM25 scores at query time.
/// Title dominates, summary and tags carry medium weight, content and
/// author act as weak signals.
const TITLE_BOOST: f32 = 5.0;
const SUMMARY_BOOST: f32 = 3.0;
const CONTENT_BOOST: f32 = 1.5;
const TAGS_BOOST: f32 = 2.0;
const AUTHOR_BOOST: f32 = 1.0;

/// A raw lexical hit: article id plus unbounded nonnegative BM25 score.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalHit {
    /// Article id.
    pub id: String,
    /// Raw BM25 score (≥ 0, unbounded).
    pub score: f32,
}

/// Contract the core requires from the lexical search engine.
#[async_trait]
pub trait LexicalStore: Send + Sync {
    /// Persist an article and return the authoritative id assigned to it.
    /// Any id already present on `article` is ignored.
    async fn index(&self, article: &Article) -> Result<String>;

    /// Fetch an article by id.
    async fn get(&self, id: &str) -> Result<Option<Article>>;

    /// Fetch several articles; missing ids are silently skipped and the
    /// returned order follows `ids`.
    async fn get_many(&self, ids: &[String]) -> Result<Vec<Article>>;

    /// Delete an article. Returns `NotFound` if the id does not exist.
    async fn delete(&self, id: &str) -> Result<()>;

    /// BM25 query across the boosted fields, OR semantics, top `limit`
    /// hits in descending score order.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<LexicalHit>>;

    /// Articles submitted by `registrar`, optionally bounded by creation
    /// date, newest first.
    async fn list_by_registrar(
        &self,
        registrar: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Article>>;

    /// The most recently created articles, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Article>>;

    /// Number of stored articles.
    async fn count(&self) -> Result<usize>;
}

// ============================================================================
// BM25 field index
// ============================================================================

/// BM25 index over one field of the article record.
#[derive(Debug, Default)]
struct FieldIndex {
    /// Document id -> tokenized field value.
    documents: HashMap<String, Vec<String>>,
    /// Term -> ids of documents containing it.
    inverted: HashMap<String, HashSet<String>>,
    /// Term -> number of documents containing it.
    doc_freq: HashMap<String, usize>,
    /// Running total of token counts, for the average length.
    total_tokens: usize,
    k1: f32,
    b: f32,
}

impl FieldIndex {
    fn new() -> Self {
        Self {
            k1: 1.2,
            b: 0.75,
            ..Default::default()
        }
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    fn add(&mut self, id: &str, text: &str) {
        let tokens = Self::tokenize(text);
        let unique: HashSet<_> = tokens.iter().cloned().collect();
        for term in unique {
            *self.doc_freq.entry(term.clone()).or_insert(0) += 1;
            self.inverted.entry(term).or_default().insert(id.to_string());
        }
        self.total_tokens += tokens.len();
        self.documents.insert(id.to_string(), tokens);
    }

    fn remove(&mut self, id: &str) {
        if let Some(tokens) = self.documents.remove(id) {
            self.total_tokens = self.total_tokens.saturating_sub(tokens.len());
            let unique: HashSet<_> = tokens.into_iter().collect();
            for term in unique {
                if let Some(df) = self.doc_freq.get_mut(&term) {
                    *df = df.saturating_sub(1);
                    if *df == 0 {
                        self.doc_freq.remove(&term);
                    }
                }
                if let Some(docs) = self.inverted.get_mut(&term) {
                    docs.remove(id);
                    if docs.is_empty() {
                        self.inverted.remove(&term);
                    }
                }
            }
        }
    }

    fn avg_doc_length(&self) -> f32 {
        if self.documents.is_empty() {
            0.0
        } else {
            self.total_tokens as f32 / self.documents.len() as f32
        }
    }

    fn idf(&self, term: &str) -> f32 {
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
        let n = self.documents.len() as f32;
        if df == 0.0 || n == 0.0 {
            return 0.0;
        }
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn candidates(&self, query_terms: &[String], out: &mut HashSet<String>) {
        for term in query_terms {
            if let Some(docs) = self.inverted.get(term) {
                out.extend(docs.iter().cloned());
            }
        }
    }

    fn score(&self, id: &str, query_terms: &[String]) -> f32 {
        let doc_tokens = match self.documents.get(id) {
            Some(tokens) if !tokens.is_empty() => tokens,
            _ => return 0.0,
        };

        let doc_len = doc_tokens.len() as f32;
        let avg_len = self.avg_doc_length();
        let mut term_freq: HashMap<&str, usize> = HashMap::new();
        for token in doc_tokens {
            *term_freq.entry(token.as_str()).or_insert(0) += 1;
        }

        let mut score = 0.0;
        for term in query_terms {
            let tf = term_freq.get(term.as_str()).copied().unwrap_or(0) as f32;
            if tf == 0.0 {
                continue;
            }
            let idf = self.idf(term);
            let numerator = tf * (self.k1 + 1.0);
            let denominator = tf + self.k1 * (1.0 - self.b + self.b * doc_len / avg_len);
            score += idf * numerator / denominator;
        }
        score
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
struct LexicalInner {
    articles: HashMap<String, Article>,
    title: FieldIndex,
    summary: FieldIndex,
    content: FieldIndex,
    tags: FieldIndex,
    author: FieldIndex,
}

/// In-memory lexical store. Thread-safe via `RwLock`; reentrant across
/// sessions as the adapter contract requires.
#[derive(Debug)]
pub struct InMemoryLexicalStore {
    inner: RwLock<LexicalInner>,
}

impl Default for InMemoryLexicalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLexicalStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LexicalInner {
                title: FieldIndex::new(),
                summary: FieldIndex::new(),
                content: FieldIndex::new(),
                tags: FieldIndex::new(),
                author: FieldIndex::new(),
                ..Default::default()
            }),
        }
    }

    fn read_inner(&self) -> Result<std::sync::RwLockReadGuard<'_, LexicalInner>> {
        self.inner
            .read()
            .map_err(|e| AppError::Internal(format!("Lexical store lock error: {}", e)))
    }

    fn write_inner(&self) -> Result<std::sync::RwLockWriteGuard<'_, LexicalInner>> {
        self.inner
            .write()
            .map_err(|e| AppError::Internal(format!("Lexical store lock error: {}", e)))
    }
}

#[async_trait]
impl LexicalStore for InMemoryLexicalStore {
    async fn index(&self, article: &Article) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let mut stored = article.clone();
        stored.id = id.clone();

        let mut inner = self.write_inner()?;
        inner.title.add(&id, &stored.title);
        inner.summary.add(&id, &stored.summary);
        inner.content.add(&id, &stored.content);
        inner.tags.add(&id, &stored.tags.join(" "));
        if let Some(author) = &stored.author {
            inner.author.add(&id, author);
        }
        inner.articles.insert(id.clone(), stored);

        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<Article>> {
        Ok(self.read_inner()?.articles.get(id).cloned())
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<Article>> {
        let inner = self.read_inner()?;
        Ok(ids
            .iter()
            .filter_map(|id| inner.articles.get(id).cloned())
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.write_inner()?;
        if inner.articles.remove(id).is_none() {
            return Err(AppError::NotFound(format!("Article {} not found", id)));
        }
        inner.title.remove(id);
        inner.summary.remove(id);
        inner.content.remove(id);
        inner.tags.remove(id);
        inner.author.remove(id);
        Ok(())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<LexicalHit>> {
        let query_terms = FieldIndex::tokenize(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let inner = self.read_inner()?;
        let mut candidates: HashSet<String> = HashSet::new();
        inner.title.candidates(&query_terms, &mut candidates);
        inner.summary.candidates(&query_terms, &mut candidates);
        inner.content.candidates(&query_terms, &mut candidates);
        inner.tags.candidates(&query_terms, &mut candidates);
        inner.author.candidates(&query_terms, &mut candidates);

        let mut hits: Vec<LexicalHit> = candidates
            .into_iter()
            .map(|id| {
                let score = TITLE_BOOST * inner.title.score(&id, &query_terms)
                    + SUMMARY_BOOST * inner.summary.score(&id, &query_terms)
                    + CONTENT_BOOST * inner.content.score(&id, &query_terms)
                    + TAGS_BOOST * inner.tags.score(&id, &query_terms)
                    + AUTHOR_BOOST * inner.author.score(&id, &query_terms);
                LexicalHit { id, score }
            })
            .filter(|hit| hit.score > 0.0)
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn list_by_registrar(
        &self,
        registrar: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Article>> {
        let inner = self.read_inner()?;
        let mut articles: Vec<Article> = inner
            .articles
            .values()
            .filter(|a| a.registrar == registrar)
            .filter(|a| from.is_none_or(|f| a.created_date >= f))
            .filter(|a| to.is_none_or(|t| a.created_date <= t))
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.created_date.cmp(&a.created_date));
        Ok(articles)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Article>> {
        let inner = self.read_inner()?;
        let mut articles: Vec<Article> = inner.articles.values().cloned().collect();
        articles.sort_by(|a, b| b.created_date.cmp(&a.created_date));
        articles.truncate(limit);
        Ok(articles)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read_inner()?.articles.len())
    }
}
