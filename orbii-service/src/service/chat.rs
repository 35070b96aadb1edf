//! Chat turns and study text.

use tracing::{debug, info, warn};

use super::OrbiiService;
use super::prompts;
use crate::db::ChatMessage;
use crate::error::{ServiceError, ServiceResult, format_error_chain_ref};
use crate::i18n::keys;
use crate::inference::CompletionRequest;

impl OrbiiService {
    /// Run one chat turn and return the assistant's reply.
    ///
    /// Inference failures turn into the fallback reply; both sides of the
    /// turn are stored either way.
    pub async fn append_user_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> ServiceResult<String> {
        let message = text.trim();
        if message.is_empty() {
            return Err(ServiceError::InvalidRequest {
                message: self.i18n.text(keys::INVALID_MESSAGE),
            });
        }

        let chat = &self.config.chat;
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let mut state = self.db.get_session_state(session_id)?.unwrap_or_default();
        debug!(
            session_id,
            history = state.history.len(),
            has_study_text = state.study_text.is_some(),
            "Loaded session state"
        );

        let messages = prompts::chat_messages(
            &state,
            message,
            chat.max_history_entries,
            chat.max_prompt_study_text_chars,
        );
        let request = CompletionRequest::new(messages)
            .with_temperature(self.config.inference.temperature);

        let reply = match self.bounded(self.inference.complete(request)).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    session_id,
                    error = %format_error_chain_ref(&e),
                    "Chat inference failed, using fallback reply"
                );
                self.i18n.text(keys::CHAT_FALLBACK_REPLY)
            }
        };

        state.history.push(ChatMessage::user(message));
        state.history.push(ChatMessage::assistant(reply.clone()));
        state.truncate_history(chat.max_history_entries);
        self.db.put_session_state(session_id, &state)?;

        info!(session_id, history = state.history.len(), "Chat turn stored");
        Ok(reply)
    }

    /// Replace the session's study text, returning its length in characters.
    ///
    /// History is left untouched. The size cap is enforced by the HTTP layer.
    pub async fn set_study_text(&self, session_id: &str, text: &str) -> ServiceResult<usize> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ServiceError::InvalidRequest {
                message: self.i18n.text(keys::MISSING_SESSION),
            });
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::InvalidRequest {
                message: self.i18n.text(keys::MISSING_STUDY_TEXT),
            });
        }

        let characters = text.chars().count();
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let mut state = self.db.get_session_state(session_id)?.unwrap_or_default();
        state.study_text = Some(text.to_string());
        self.db.put_session_state(session_id, &state)?;

        info!(session_id, characters, "Study text saved");
        Ok(characters)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::OrbiiConfig;
    use crate::db::models::MessageRole;
    use crate::db::{ChatMessage, SessionState};
    use crate::error::ServiceError;
    use crate::inference::testing::{Scripted, ScriptedInference};
    use crate::service::test_support::service_with;
    use std::sync::Arc;

    const FALLBACK: &str = "I ran into a hiccup reaching the study buddy brain. Please try again.";

    #[tokio::test]
    async fn test_first_turn_is_stored() {
        let backend = Arc::new(ScriptedInference::replying(
            "Photosynthesis turns light into sugar.",
        ));
        let service = service_with(OrbiiConfig::default(), backend.clone());

        let reply = service
            .append_user_message("s1", "  What is photosynthesis?  ")
            .await
            .unwrap();
        assert_eq!(reply, "Photosynthesis turns light into sugar.");

        let state = service.db.get_session_state("s1").unwrap().unwrap();
        assert_eq!(
            state.history,
            vec![
                ChatMessage::user("What is photosynthesis?"),
                ChatMessage::assistant("Photosynthesis turns light into sugar."),
            ]
        );

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].role, MessageRole::System);
        assert_eq!(
            requests[0].messages.last().unwrap(),
            &ChatMessage::user("What is photosynthesis?")
        );
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let service = service_with(
            OrbiiConfig::default(),
            Arc::new(ScriptedInference::replying("ok")),
        );

        for turn in 1..=7 {
            service
                .append_user_message("s1", &format!("question {turn}"))
                .await
                .unwrap();
            let state = service.db.get_session_state("s1").unwrap().unwrap();
            assert_eq!(state.history.len(), (2 * turn).min(10));
        }

        let state = service.db.get_session_state("s1").unwrap().unwrap();
        assert_eq!(state.history[0], ChatMessage::user("question 3"));
        assert_eq!(state.history[9], ChatMessage::assistant("ok"));
    }

    #[tokio::test]
    async fn test_backend_failure_uses_fallback_reply() {
        let service = service_with(OrbiiConfig::default(), Arc::new(ScriptedInference::failing()));

        let reply = service.append_user_message("s1", "hello").await.unwrap();
        assert_eq!(reply, FALLBACK);

        let state = service.db.get_session_state("s1").unwrap().unwrap();
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history[1], ChatMessage::assistant(FALLBACK));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_backend_uses_fallback_reply() {
        let mut config = OrbiiConfig::default();
        config.inference.request_timeout_secs = 5;
        let backend = Arc::new(ScriptedInference::replying("late").then(Scripted::Hang));
        let service = service_with(config, backend);

        let reply = service.append_user_message("s1", "hello").await.unwrap();
        assert_eq!(reply, FALLBACK);
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let backend = Arc::new(ScriptedInference::replying("ok"));
        let service = service_with(OrbiiConfig::default(), backend.clone());

        let result = service.append_user_message("s1", "   ").await;
        assert!(matches!(result, Err(ServiceError::InvalidRequest { .. })));
        assert!(backend.requests().is_empty());
        assert!(service.db.get_session_state("s1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_study_text_reaches_prompt_truncated() {
        let mut config = OrbiiConfig::default();
        config.chat.max_prompt_study_text_chars = 20;
        let backend = Arc::new(ScriptedInference::replying("ok"));
        let service = service_with(config, backend.clone());

        let text = format!("{}{}", "x".repeat(20), "TAIL");
        assert_eq!(service.set_study_text("s1", &text).await.unwrap(), 24);
        service.append_user_message("s1", "quiz me").await.unwrap();

        let request = &backend.requests()[0];
        assert_eq!(request.messages.len(), 3);
        assert!(request.messages[1].content.contains(&"x".repeat(20)));
        assert!(!request.messages[1].content.contains("TAIL"));

        // Full text is kept in the store
        let state = service.db.get_session_state("s1").unwrap().unwrap();
        assert_eq!(state.study_text.as_deref(), Some(text.as_str()));
    }

    #[tokio::test]
    async fn test_study_text_keeps_history() {
        let service = service_with(
            OrbiiConfig::default(),
            Arc::new(ScriptedInference::replying("ok")),
        );
        service.append_user_message("s1", "hi").await.unwrap();
        service.set_study_text("s1", "first").await.unwrap();
        service.set_study_text("s1", "  second  ").await.unwrap();

        let state = service.db.get_session_state("s1").unwrap().unwrap();
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.study_text.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_study_text_validation() {
        let service = service_with(
            OrbiiConfig::default(),
            Arc::new(ScriptedInference::replying("ok")),
        );
        service.set_study_text("s1", "original").await.unwrap();

        for (session, text) in [("", "text"), ("  ", "text"), ("s1", "  ")] {
            let result = service.set_study_text(session, text).await;
            assert!(matches!(result, Err(ServiceError::InvalidRequest { .. })));
        }

        let state = service.db.get_session_state("s1").unwrap().unwrap();
        assert_eq!(state.study_text.as_deref(), Some("original"));
    }

    #[tokio::test]
    async fn test_legacy_state_is_extended() {
        let service = service_with(
            OrbiiConfig::default(),
            Arc::new(ScriptedInference::replying("sure")),
        );
        service
            .db
            .put_raw_session_state(
                "old",
                r#"[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]"#,
            )
            .unwrap();

        service.append_user_message("old", "again").await.unwrap();

        let state = service.db.get_session_state("old").unwrap().unwrap();
        assert_eq!(state.history.len(), 4);
        assert_eq!(state.history[0], ChatMessage::user("hi"));
        assert_eq!(state.study_text, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_turns_do_not_lose_updates() {
        let mut config = OrbiiConfig::default();
        config.chat.max_history_entries = 100;
        let service = service_with(config, Arc::new(ScriptedInference::replying("ok")));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .append_user_message("shared", &format!("message {i}"))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let state: SessionState = service.db.get_session_state("shared").unwrap().unwrap();
        assert_eq!(state.history.len(), 16);
        for pair in state.history.chunks(2) {
            assert_eq!(pair[0].role, MessageRole::User);
            assert_eq!(pair[1], ChatMessage::assistant("ok"));
        }
    }
}
