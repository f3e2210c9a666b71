//! Local conversation filtering.
//!
//! Provides consistent matching semantics for the conversation list:
//! - Multi-term AND queries with the '+' operator
//! - ASCII case-insensitive matching

use crate::models::Conversation;

/// Parse a filter query into individual terms.
///
/// The '+' operator splits the query into multiple terms that must ALL match
/// (AND semantics at the conversation level). Each term is trimmed and
/// lowercased; empty terms are ignored.
pub fn parse_query_terms(query: &str) -> Vec<String> {
    query
        .split('+')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

/// Check if text contains a term, ASCII case-insensitive. An empty term
/// matches everything.
pub fn text_contains_term(text: &str, term: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let term: Vec<char> = term.chars().collect();

    if term.is_empty() {
        return true;
    }
    if text.len() < term.len() {
        return false;
    }

    text.windows(term.len()).any(|window| {
        window
            .iter()
            .zip(term.iter())
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    })
}

/// Check if text contains ALL terms. An empty term list matches everything.
pub fn text_contains_all_terms(text: &str, terms: &[String]) -> bool {
    terms.iter().all(|term| text_contains_term(text, term))
}

/// Filter conversations whose title matches every term of `query`,
/// preserving their order.
pub fn filter_conversations(conversations: &[Conversation], query: &str) -> Vec<Conversation> {
    let terms = parse_query_terms(query);
    conversations
        .iter()
        .filter(|conversation| text_contains_all_terms(&conversation.title, &terms))
        .cloned()
        .collect()
}
