//! Prompt assembly for chat and roadmap calls.

use crate::db::{ChatMessage, SessionState};

const PERSONA: &str = include_str!("../../prompts/persona.txt");
const STUDY_CONTEXT: &str = include_str!("../../prompts/study_context.txt");
const TOPIC_RESOLUTION: &str = include_str!("../../prompts/topic.txt");
const ROADMAP: &str = include_str!("../../prompts/roadmap.txt");

/// System message that keeps roadmap calls on the JSON contract
const ROADMAP_SYSTEM: &str =
    "You design learning roadmaps for Orbii, a study buddy. You reply with strict JSON only.";

/// Persona, optional study context, recent history, then the new message.
pub(super) fn chat_messages(
    state: &SessionState,
    message: &str,
    max_history_entries: usize,
    max_study_text_chars: usize,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(PERSONA.trim())];

    if let Some(study_text) = state.study_text.as_deref()
        && !study_text.trim().is_empty()
    {
        let excerpt: String = study_text.chars().take(max_study_text_chars).collect();
        messages.push(ChatMessage::system(
            STUDY_CONTEXT.trim().replace("{study_text}", &excerpt),
        ));
    }

    let skip = state.history.len().saturating_sub(max_history_entries);
    messages.extend(state.history.iter().skip(skip).cloned());
    messages.push(ChatMessage::user(message));
    messages
}

pub(super) fn topic_prompt(topic: &str) -> String {
    TOPIC_RESOLUTION.trim().replace("{topic}", topic)
}

pub(super) fn roadmap_messages(topic: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(ROADMAP_SYSTEM),
        ChatMessage::user(ROADMAP.trim().replace("{topic}", topic)),
    ]
}
