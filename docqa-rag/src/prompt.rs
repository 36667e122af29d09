//! The answer prompt and context assembly.

use crate::document::SearchResult;

/// Separator placed between retrieved chunks in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// What the model is told to say when the context has no answer.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str = "根據提供的資料，我無法回答這個問題。";

/// Answer-from-context prompt. `{context}` and `{question}` are filled in.
pub const RAG_PROMPT_TEMPLATE: &str = "
作為一個樂於助人的問答機器人，請根據提供的上下文 (Context) 來回答問題 (Question)。
如果你無法從上下文中找到答案，請誠實地回答「根據提供的資料，我無法回答這個問題。」
請使用繁體中文回答。

Context:
{context}

Question:
{question}
";

/// Join retrieved chunk texts into one context block, best match first.
pub fn format_context(results: &[SearchResult]) -> String {
    results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Fill [`RAG_PROMPT_TEMPLATE`].
///
/// The question is substituted after the context so that a literal
/// `{question}` inside a document is left alone.
pub fn build_prompt(context: &str, question: &str) -> String {
    let (head, tail) = RAG_PROMPT_TEMPLATE
        .split_once("{question}")
        .unwrap_or((RAG_PROMPT_TEMPLATE, ""));
    let mut prompt = head.replace("{context}", context);
    prompt.push_str(question);
    prompt.push_str(tail);
    prompt
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::document::Chunk;

    fn result(text: &str) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: text.to_string(),
                text: text.to_string(),
                metadata: HashMap::new(),
                document_id: "doc".to_string(),
            },
            score: 1.0,
        }
    }

    #[test]
    fn context_joins_chunks_with_rule() {
        assert_eq!(format_context(&[result("a"), result("b")]), "a\n\n---\n\nb");
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn prompt_contains_context_question_and_instructions() {
        let prompt = build_prompt("台北是台灣的首都。", "台灣的首都是哪裡？");
        assert!(prompt.contains("Context:\n台北是台灣的首都。\n\nQuestion:\n台灣的首都是哪裡？\n"));
        assert!(prompt.contains("請使用繁體中文回答"));
        assert!(prompt.contains(INSUFFICIENT_CONTEXT_ANSWER));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
    }

    #[test]
    fn placeholders_inside_documents_are_not_expanded() {
        let prompt = build_prompt("see {question}", "q?");
        assert!(prompt.contains("Context:\nsee {question}\n"));
        assert!(prompt.ends_with("Question:\nq?\n"));
    }
}
