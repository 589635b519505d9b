//! Answer composition and streaming.
//!
//! The composer assembles a prompt from the surviving sources in the
//! language of the query (Korean, Japanese, Chinese, or English templates;
//! every other language uses the English one), then streams the LLM's
//! answer chunk by chunk to the session transport.

use std::sync::Arc;

use crate::lang::Lang;
use crate::llm::client::ChunkStream;
use crate::llm::LlmClient;
use crate::types::{Article, Result};

/// Full content is inlined into the prompt below this many characters;
/// longer articles contribute their summary instead. Decided per article,
/// so one prompt may mix both.
const INLINE_CONTENT_LIMIT: usize = 4000;

/// One answer template: a fallback for empty source lists, an introduction
/// for the sources block, the prompt with its two substitution sites, and
/// the localized labels used when enumerating sources.
struct AnswerTemplate {
    no_results: &'static str,
    context_intro: &'static str,
    prompt: &'static str,
    title_label: &'static str,
    content_label: &'static str,
    summary_label: &'static str,
    author_label: &'static str,
}

const KO_TEMPLATE: AnswerTemplate = AnswerTemplate {
    no_results: "질문과 관련된 문서를 찾지 못했습니다. 일반적인 지식으로 답변하되, \
                 등록된 문서에 근거가 없다는 점을 먼저 밝히세요.\n질문: {query}",
    context_intro: "다음은 검색된 문서들입니다:",
    prompt: "아래 문서들만 근거로 하여 질문에 답변하세요. 한국어로 답변하세요.\n\n\
             {sources}\n질문: {query}\n답변:",
    title_label: "제목",
    content_label: "내용",
    summary_label: "요약",
    author_label: "저자",
};

const JA_TEMPLATE: AnswerTemplate = AnswerTemplate {
    no_results: "質問に関連する文書が見つかりませんでした。一般的な知識で回答し、\
                 登録文書に根拠がないことを最初に明示してください。\n質問: {query}",
    context_intro: "以下は検索された文書です:",
    prompt: "以下の文書のみを根拠として質問に回答してください。日本語で回答してください。\n\n\
             {sources}\n質問: {query}\n回答:",
    title_label: "タイトル",
    content_label: "内容",
    summary_label: "要約",
    author_label: "著者",
};

const ZH_TEMPLATE: AnswerTemplate = AnswerTemplate {
    no_results: "没有找到与问题相关的文档。请用一般知识回答，并首先说明没有登记文档作为依据。\n\
                 问题: {query}",
    context_intro: "以下是检索到的文档:",
    prompt: "请仅根据以下文档回答问题。请用中文回答。\n\n{sources}\n问题: {query}\n回答:",
    title_label: "标题",
    content_label: "内容",
    summary_label: "摘要",
    author_label: "作者",
};

const EN_TEMPLATE: AnswerTemplate = AnswerTemplate {
    no_results: "No documents related to the question were found. Answer from general \
                 knowledge, and state up front that no registered document backs the \
                 answer.\nQuestion: {query}",
    context_intro: "The following documents were retrieved:",
    prompt: "Answer the question using only the documents below. Answer in English.\n\n\
             {sources}\nQuestion: {query}\nAnswer:",
    title_label: "Title",
    content_label: "Content",
    summary_label: "Summary",
    author_label: "Author",
};

fn template_for(lang: Lang) -> &'static AnswerTemplate {
    match lang {
        Lang::Ko => &KO_TEMPLATE,
        Lang::Ja => &JA_TEMPLATE,
        Lang::Zh => &ZH_TEMPLATE,
        _ => &EN_TEMPLATE,
    }
}

/// Streams grounded answers for queries.
pub struct AnswerComposer {
    llm: Arc<dyn LlmClient>,
}

impl AnswerComposer {
    /// Create a composer backed by the given LLM client.
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Assemble the generation prompt for a query and its sources.
    ///
    /// Public so tests and debug tooling can inspect template routing
    /// without invoking the runtime.
    pub fn prompt_for(&self, query: &str, lang: Lang, sources: &[Article]) -> String {
        build_prompt(query, lang, sources)
    }

    /// Stream the answer for a query over the given sources.
    ///
    /// Chunks arrive in generation order; the caller forwards each one
    /// unchanged to the session transport. Dropping the stream abandons
    /// the in-flight generation.
    pub async fn stream_answer(
        &self,
        query: &str,
        lang: Lang,
        sources: &[Article],
    ) -> Result<ChunkStream> {
        let prompt = build_prompt(query, lang, sources);
        self.llm.stream(&prompt).await
    }
}

fn build_prompt(query: &str, lang: Lang, sources: &[Article]) -> String {
    let template = template_for(lang);

    if sources.is_empty() {
        return template.no_results.replace("{query}", query);
    }

    let mut enumerated = String::new();
    for (idx, article) in sources.iter().enumerate() {
        enumerated.push_str(&format!(
            "{}. {}: {}\n",
            idx + 1,
            template.title_label,
            article.title
        ));
        if article.content.chars().count() < INLINE_CONTENT_LIMIT {
            enumerated.push_str(&format!("{}: {}\n", template.content_label, article.content));
        } else {
            enumerated.push_str(&format!("{}: {}\n", template.summary_label, article.summary));
        }
        if let Some(author) = &article.author {
            enumerated.push_str(&format!("{}: {}\n", template.author_label, author));
        }
        enumerated.push('\n');
    }

    let sources_block = format!("{}\n{}", template.context_intro, enumerated);
    template
        .prompt
        .replace("{sources}", &sources_block)
        .replace("{query}", query)
}
