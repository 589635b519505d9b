//! LLM-driven relevance gate.
//!
//! After fusion, each candidate is scored 0–10 against the query by the
//! LLM and pruned below a threshold. The gate is an optimization, not a
//! dependency: any failure of the LLM call passes the candidate list
//! through unchanged (fail-open), so retrieval never goes down with it.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::lang::Lang;
use crate::llm::LlmClient;
use crate::search::RankedArticle;
use crate::types::Article;

/// Tuning knobs for the relevance gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RelevanceConfig {
    /// Candidates scoring below this (0–10 scale) are dropped.
    pub threshold: f32,
    /// Weight of the relevance score in the final blend; the fused score
    /// keeps the remainder.
    pub weight: f32,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            threshold: 5.0,
            weight: 0.3,
        }
    }
}

/// Accepts document labels in any of the four prompt languages, with
/// half-width or full-width colons, so parsing survives the model
/// answering in a language other than the one it was asked in.
static SCORE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:Document|문서|文書|文档)\s*(\d+)\s*[:：]\s*(\d+(?:\.\d+)?)")
        .expect("score-line regex is valid")
});

/// Relevance gate over fused candidates.
pub struct RelevanceGate {
    llm: Arc<dyn LlmClient>,
    config: RelevanceConfig,
}

impl RelevanceGate {
    /// Create a gate backed by the given LLM client.
    pub fn new(llm: Arc<dyn LlmClient>, config: RelevanceConfig) -> Self {
        Self { llm, config }
    }

    /// Score candidates against the query and prune the irrelevant ones.
    ///
    /// Candidates whose score line cannot be parsed are kept at their
    /// original score. If the LLM call fails entirely, the input is
    /// returned unchanged.
    pub async fn filter(
        &self,
        query: &str,
        lang: Lang,
        candidates: Vec<RankedArticle>,
    ) -> Vec<RankedArticle> {
        if candidates.is_empty() {
            return candidates;
        }

        let prompt = build_prompt(query, lang, &candidates);
        let response = match self.llm.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Relevance scoring failed; passing candidates through");
                return candidates;
            }
        };

        let scores = parse_scores(&response);
        let relevance_weight = self.config.weight;
        let fused_weight = 1.0 - relevance_weight;

        let mut kept: Vec<RankedArticle> = candidates
            .into_iter()
            .enumerate()
            .filter_map(|(idx, mut candidate)| {
                match scores.get(&(idx + 1)) {
                    Some(&relevance) if relevance < self.config.threshold => {
                        tracing::debug!(
                            article_id = %candidate.article.id,
                            relevance,
                            "Candidate pruned by relevance gate"
                        );
                        None
                    }
                    Some(&relevance) => {
                        candidate.score = fused_weight * candidate.score
                            + relevance_weight * (relevance / 10.0);
                        Some(candidate)
                    }
                    // Unparseable line: keep the candidate untouched.
                    None => Some(candidate),
                }
            })
            .collect();

        kept.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.article.id.cmp(&b.article.id))
        });
        kept
    }
}

/// Field labels for the candidate block, per prompt language.
fn field_labels(lang: Lang) -> (&'static str, &'static str) {
    match lang {
        Lang::Ko => ("제목", "내용"),
        Lang::Ja => ("タイトル", "内容"),
        Lang::Zh => ("标题", "内容"),
        _ => ("Title", "Content"),
    }
}

/// Snippet shown to the scorer: the summary when one exists, otherwise the
/// first 1000 characters of content.
fn candidate_snippet(article: &Article) -> String {
    if !article.summary.is_empty() {
        article.summary.clone()
    } else {
        article.content.chars().take(1000).collect()
    }
}

fn build_prompt(query: &str, lang: Lang, candidates: &[RankedArticle]) -> String {
    let (title_label, content_label) = field_labels(lang);

    let mut documents = String::new();
    for (idx, candidate) in candidates.iter().enumerate() {
        documents.push_str(&format!(
            "Document{}:\n{}: {}\n{}: {}\n\n",
            idx + 1,
            title_label,
            candidate.article.title,
            content_label,
            candidate_snippet(&candidate.article),
        ));
    }

    let rubric = match lang {
        Lang::Ko => format!(
            "다음 질문에 대한 각 문서의 관련성을 0에서 10 사이의 정수로 평가하세요.\n\
             질문: {query}\n\n{documents}\
             각 문서마다 한 줄씩, 정확히 다음 형식으로만 답하세요:\nDocument1: 7"
        ),
        Lang::Ja => format!(
            "次の質問に対する各文書の関連性を0から10の整数で評価してください。\n\
             質問: {query}\n\n{documents}\
             各文書について1行ずつ、次の形式だけで答えてください:\nDocument1: 7"
        ),
        Lang::Zh => format!(
            "请用0到10的整数评估每个文档与以下问题的相关性。\n\
             问题: {query}\n\n{documents}\
             每个文档一行，只按以下格式回答:\nDocument1: 7"
        ),
        _ => format!(
            "Rate how relevant each document is to the question on an integer \
             scale from 0 to 10.\nQuestion: {query}\n\n{documents}\
             Answer with one line per document, in exactly this format:\nDocument1: 7"
        ),
    };

    rubric
}

/// Parse `Document<N>: <score>` lines into a 1-based index → score map.
/// Scores are clamped to [0, 10]; lines that do not match are ignored.
fn parse_scores(response: &str) -> HashMap<usize, f32> {
    let mut scores = HashMap::new();
    for capture in SCORE_LINE.captures_iter(response) {
        let Ok(index) = capture[1].parse::<usize>() else {
            continue;
        };
        let Ok(score) = capture[2].parse::<f32>() else {
            continue;
        };
        scores.insert(index, score.clamp(0.0, 10.0));
    }
    scores
}
