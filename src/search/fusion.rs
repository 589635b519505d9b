//! Hybrid score fusion.
//!
//! Vector hits (cosine, [0,1]) and lexical hits (BM25, unbounded ≥ 0) live
//! in different score spaces. Fusion maps them into one ranking:
//!
//! 1. Collapse per-article vector points (title boosted ×1.2, capped at
//!    1.0; keep the max of title/summary), retain the top 2N articles.
//! 2. Squash BM25 into [0,1] with a sigmoid centered at `x0`.
//! 3. Merge by article id: both signals → `hybrid` with the weighted
//!    blend; one signal → `vector`/`keyword` with a single-source penalty.
//! 4. Gate out everything below the minimum score, sort, truncate to N.
//!
//! The asymmetric weights reflect observed signal strength: semantic
//! similarity transfers across languages better than BM25, and titles are
//! a stronger positive than summaries. The penalty biases the ranking
//! toward hits both signals agree on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::store::{article_id_of_point, is_title_point, LexicalHit, VectorHit};
use crate::types::HitSource;

/// Tuning knobs for fusion. Defaults are the production values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Weight of the vector score in hybrid blending.
    pub vector_weight: f32,
    /// Weight of the normalized lexical score in hybrid blending.
    pub lexical_weight: f32,
    /// Multiplier applied to single-signal hits.
    pub single_source_penalty: f32,
    /// Hits scoring below this are dropped.
    pub min_score: f32,
    /// Sigmoid steepness for BM25 normalization.
    pub sigmoid_k: f32,
    /// Sigmoid midpoint: the raw BM25 score that maps to 0.5.
    pub sigmoid_x0: f32,
    /// Boost applied to title-point scores before the per-article max.
    pub title_boost: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            vector_weight: 0.6,
            lexical_weight: 0.4,
            single_source_penalty: 0.75,
            min_score: 0.35,
            sigmoid_k: 0.65,
            sigmoid_x0: 20.0,
            title_boost: 1.2,
        }
    }
}

/// A fused hit: article id, score in [0,1], and provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    /// Article id.
    pub id: String,
    /// Fused score in [0, 1].
    pub score: f32,
    /// Which signal(s) produced the hit.
    pub source: HitSource,
}

/// Map a raw BM25 score into [0,1].
///
/// `1 / (1 + e^(-k·(s - x0)))`; non-positive scores map to 0 so that
/// "no lexical evidence" never contributes.
pub fn normalize_bm25(score: f32, config: &FusionConfig) -> f32 {
    if score <= 0.0 {
        return 0.0;
    }
    1.0 / (1.0 + (-config.sigmoid_k * (score - config.sigmoid_x0)).exp())
}

/// Collapse raw vector points into per-article scores.
///
/// Each article owns up to two points (`_title`, `_summary`). Title scores
/// get the configured boost, capped at 1.0; the retained per-article score
/// is the max of the two. Points with an unknown suffix are skipped.
/// Returns the top `2 * limit` articles in descending score order.
pub fn collapse_vector_hits(
    hits: &[VectorHit],
    limit: usize,
    config: &FusionConfig,
) -> Vec<(String, f32)> {
    let mut per_article: HashMap<&str, f32> = HashMap::new();

    for hit in hits {
        let Some(article_id) = article_id_of_point(&hit.point_id) else {
            continue;
        };
        let score = if is_title_point(&hit.point_id) {
            (hit.score * config.title_boost).min(1.0)
        } else {
            hit.score
        };
        per_article
            .entry(article_id)
            .and_modify(|s| *s = s.max(score))
            .or_insert(score);
    }

    let mut collapsed: Vec<(String, f32)> = per_article
        .into_iter()
        .map(|(id, score)| (id.to_string(), score))
        .collect();
    collapsed.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    collapsed.truncate(limit * 2);
    collapsed
}

/// Fuse collapsed vector hits with raw lexical hits into at most `limit`
/// ranked [`FusedHit`]s.
///
/// Ties break on article id, so a ranking is deterministic within a
/// request.
pub fn fuse(
    vector_hits: &[(String, f32)],
    lexical_hits: &[LexicalHit],
    limit: usize,
    config: &FusionConfig,
) -> Vec<FusedHit> {
    let mut merged: HashMap<String, FusedHit> = HashMap::new();

    for (id, score) in vector_hits {
        merged.insert(
            id.clone(),
            FusedHit {
                id: id.clone(),
                score: *score,
                source: HitSource::Vector,
            },
        );
    }

    for hit in lexical_hits {
        let normalized = normalize_bm25(hit.score, config);
        match merged.get_mut(&hit.id) {
            Some(existing) => {
                existing.score =
                    config.vector_weight * existing.score + config.lexical_weight * normalized;
                existing.source = HitSource::Hybrid;
            }
            None => {
                merged.insert(
                    hit.id.clone(),
                    FusedHit {
                        id: hit.id.clone(),
                        score: normalized,
                        source: HitSource::Keyword,
                    },
                );
            }
        }
    }

    let mut fused: Vec<FusedHit> = merged
        .into_values()
        .map(|mut hit| {
            if hit.source != HitSource::Hybrid {
                hit.score *= config.single_source_penalty;
            }
            hit
        })
        .filter(|hit| hit.score >= config.min_score)
        .collect();

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    fused.truncate(limit);
    fused
}
