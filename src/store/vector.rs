//! Vector store: 768-dimension cosine-similarity point store.
//!
//! Points are keyed by composite ids (`<article-id>_title`,
//! `<article-id>_summary`) and tagged with the article's language so
//! searches can filter by it.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::lang::Lang;
use crate::types::{AppError, Result};

/// A vector search hit: point id plus cosine score.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    /// Composite point id.
    pub point_id: String,
    /// Cosine similarity, effectively in [0, 1] for normalized embeddings.
    pub score: f32,
}

/// Contract the core requires from the vector store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace a point.
    async fn upsert(&self, point_id: &str, vector: Vec<f32>, lang: Lang) -> Result<()>;

    /// Delete a point. Deleting a missing point is not an error.
    async fn delete(&self, point_id: &str) -> Result<()>;

    /// Top-`k` points by cosine similarity, optionally restricted to one
    /// language, descending score order.
    async fn search(&self, vector: &[f32], k: usize, lang: Option<Lang>) -> Result<Vec<VectorHit>>;

    /// Number of stored points.
    async fn count(&self) -> Result<usize>;
}

#[derive(Debug, Clone)]
struct StoredPoint {
    vector: Vec<f32>,
    lang: Lang,
}

/// In-memory cosine-similarity store. Thread-safe via `RwLock`.
#[derive(Debug)]
pub struct InMemoryVectorStore {
    points: RwLock<HashMap<String, StoredPoint>>,
    dimensions: usize,
}

impl InMemoryVectorStore {
    /// Create an empty store expecting vectors of the given width.
    pub fn new(dimensions: usize) -> Self {
        Self {
            points: RwLock::new(HashMap::new()),
            dimensions,
        }
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(AppError::Internal(format!(
                "Vector dimension mismatch: expected {}, got {}",
                self.dimensions,
                vector.len()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, point_id: &str, vector: Vec<f32>, lang: Lang) -> Result<()> {
        self.check_dimensions(&vector)?;
        let mut points = self
            .points
            .write()
            .map_err(|e| AppError::Internal(format!("Vector store lock error: {}", e)))?;
        points.insert(point_id.to_string(), StoredPoint { vector, lang });
        Ok(())
    }

    async fn delete(&self, point_id: &str) -> Result<()> {
        let mut points = self
            .points
            .write()
            .map_err(|e| AppError::Internal(format!("Vector store lock error: {}", e)))?;
        points.remove(point_id);
        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize, lang: Option<Lang>) -> Result<Vec<VectorHit>> {
        self.check_dimensions(vector)?;
        let points = self
            .points
            .read()
            .map_err(|e| AppError::Internal(format!("Vector store lock error: {}", e)))?;

        let mut hits: Vec<VectorHit> = points
            .iter()
            .filter(|(_, point)| lang.is_none_or(|l| point.lang == l))
            .map(|(id, point)| VectorHit {
                point_id: id.clone(),
                score: cosine_similarity(vector, &point.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.point_id.cmp(&b.point_id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self
            .points
            .read()
            .map_err(|e| AppError::Internal(format!("Vector store lock error: {}", e)))?
            .len())
    }
}

/// Cosine similarity between two vectors of equal length.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIM: usize = 768;

    fn unit_vector(axis: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; DIM];
        v[axis] = 1.0;
        v
    }

    #[tokio::test]
    async fn test_upsert_and_search() {
        let store = InMemoryVectorStore::new(DIM);
        store
            .upsert("a_title", unit_vector(0), Lang::En)
            .await
            .unwrap();
        store
            .upsert("b_title", unit_vector(1), Lang::En)
            .await
            .unwrap();

        let hits = store.search(&unit_vector(0), 10, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].point_id, "a_title");
        assert!(hits[0].score > 0.99);
        assert!(hits[1].score < 0.01);
    }

    #[tokio::test]
    async fn test_language_filter() {
        let store = InMemoryVectorStore::new(DIM);
        store
            .upsert("ko_title", unit_vector(0), Lang::Ko)
            .await
            .unwrap();
        store
            .upsert("en_title", unit_vector(0), Lang::En)
            .await
            .unwrap();

        let hits = store
            .search(&unit_vector(0), 10, Some(Lang::Ko))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].point_id, "ko_title");
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let store = InMemoryVectorStore::new(DIM);
        store
            .upsert("a_title", unit_vector(0), Lang::En)
            .await
            .unwrap();
        store
            .upsert("a_title", unit_vector(1), Lang::En)
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.search(&unit_vector(1), 1, None).await.unwrap();
        assert!(hits[0].score > 0.99);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryVectorStore::new(DIM);
        store
            .upsert("a_title", unit_vector(0), Lang::En)
            .await
            .unwrap();
        store.delete("a_title").await.unwrap();
        store.delete("a_title").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = InMemoryVectorStore::new(DIM);
        let result = store.upsert("bad", vec![1.0, 2.0], Lang::En).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.0001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.0001);

        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &zero), 0.0);
    }
}
