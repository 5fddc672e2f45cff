//! Retrieval QA chat prompt.
//!
//! Retrieved chunks are "stuffed" into a single system message; the question
//! follows as the user message.

use super::store::ChunkSearchResult;
use crate::llm::ChatMessage;

const SYSTEM_TEMPLATE: &str =
    "Answer any use questions based solely on the context below:\n\n<context>\n{context}\n</context>";

/// Separator placed between retrieved chunks.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Joins retrieved chunk contents in retrieval order.
pub fn format_context(results: &[ChunkSearchResult]) -> String {
    results
        .iter()
        .map(|r| r.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}

pub fn build_messages(context: &str, input: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_TEMPLATE.replace("{context}", context)),
        ChatMessage::user(input),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::store::StoredChunk;

    fn result(content: &str) -> ChunkSearchResult {
        ChunkSearchResult {
            chunk: StoredChunk {
                chunk_id: content.to_string(),
                content: content.to_string(),
                source: "a.pdf".to_string(),
                document_hash: "h".to_string(),
                page: 0,
                metadata: None,
            },
            score: 1.0,
        }
    }

    #[test]
    fn context_joins_chunks_in_order() {
        let context = format_context(&[result("first"), result("second")]);
        assert_eq!(context, "first\n\nsecond");
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn messages_wrap_context_and_question() {
        let messages = build_messages("The sky is blue.", "What colour is the sky?");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(
            messages[0].content,
            "Answer any use questions based solely on the context below:\n\n<context>\nThe sky is blue.\n</context>"
        );
        assert_eq!(messages[1], ChatMessage::user("What colour is the sky?"));
    }

    #[test]
    fn braces_in_question_are_left_alone() {
        let messages = build_messages("ctx", "what is {context}?");
        assert_eq!(messages[1].content, "what is {context}?");
    }
}
