//! Study text API endpoint.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::{ServiceError, format_error_chain_ref};
use crate::i18n::keys;

use super::{AppState, text_field};

/// Study text request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyTextRequest {
    #[serde(default)]
    pub text: Option<Value>,
    #[serde(default)]
    pub session_id: Option<Value>,
}

/// Study text response
#[derive(Serialize)]
pub struct StudyTextResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characters: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Replace a session's study text
pub async fn study_text_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StudyTextRequest>, JsonRejection>,
) -> Result<Json<StudyTextResponse>, Response> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection, "Rejected study text body");
            let message = state.service.i18n.text(keys::INVALID_BODY);
            return Err(failure(StatusCode::BAD_REQUEST, message));
        }
    };

    let i18n = &state.service.i18n;
    let Some(session_id) = text_field(&request.session_id) else {
        return Err(failure(StatusCode::BAD_REQUEST, i18n.text(keys::MISSING_SESSION)));
    };
    let Some(text) = text_field(&request.text) else {
        return Err(failure(StatusCode::BAD_REQUEST, i18n.text(keys::MISSING_STUDY_TEXT)));
    };
    if text.chars().count() > state.service.config.chat.max_study_text_chars {
        return Err(failure(StatusCode::BAD_REQUEST, i18n.text(keys::STUDY_TEXT_TOO_LONG)));
    }

    match state.service.set_study_text(session_id, text).await {
        Ok(characters) => Ok(Json(StudyTextResponse {
            ok: true,
            characters: Some(characters),
            error: None,
        })),
        Err(ServiceError::InvalidRequest { message }) => {
            Err(failure(StatusCode::BAD_REQUEST, message))
        }
        Err(e) => {
            error!(session_id, error = %format_error_chain_ref(&e), "Failed to save study text");
            let message = state.service.i18n.text(keys::STUDY_TEXT_SAVE);
            Err(failure(StatusCode::INTERNAL_SERVER_ERROR, message))
        }
    }
}

fn failure(status: StatusCode, error: String) -> Response {
    let body = StudyTextResponse {
        ok: false,
        characters: None,
        error: Some(error),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use crate::api::router;
    use crate::api::test_support::post_json;
    use crate::config::OrbiiConfig;
    use crate::inference::testing::ScriptedInference;
    use crate::service::test_support::service_with;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    fn service() -> Arc<crate::service::OrbiiService> {
        service_with(
            OrbiiConfig::default(),
            Arc::new(ScriptedInference::replying("ok")),
        )
    }

    #[tokio::test]
    async fn test_save_reports_characters() {
        let service = service();
        let body = json!({"text": "Mitochondria are the powerhouse of the cell.", "sessionId": "S"});

        let (status, reply) =
            post_json(router(service.clone()), "/api/study-text", &body.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply, json!({"ok": true, "characters": 44}));
        let state = service.db.get_session_state("S").unwrap().unwrap();
        assert_eq!(
            state.study_text.as_deref(),
            Some("Mitochondria are the powerhouse of the cell.")
        );
    }

    #[tokio::test]
    async fn test_oversized_text_leaves_state_untouched() {
        let service = service();
        let first = json!({"text": "short notes", "sessionId": "S"}).to_string();
        post_json(router(service.clone()), "/api/study-text", &first).await;

        let huge = json!({"text": "x".repeat(20_001), "sessionId": "S"}).to_string();
        let (status, reply) = post_json(router(service.clone()), "/api/study-text", &huge).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply, json!({"ok": false, "error": "Study text is too long."}));
        let state = service.db.get_session_state("S").unwrap().unwrap();
        assert_eq!(state.study_text.as_deref(), Some("short notes"));
    }

    #[tokio::test]
    async fn test_text_at_limit_is_accepted() {
        let body = json!({"text": "x".repeat(20_000), "sessionId": "S"}).to_string();
        let (status, reply) = post_json(router(service()), "/api/study-text", &body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["characters"], json!(20_000));
    }

    #[tokio::test]
    async fn test_store_failure_is_server_error() {
        let service = service();
        service.db.drop_sessions_table().unwrap();

        let body = json!({"text": "notes", "sessionId": "S"}).to_string();
        let (status, reply) = post_json(router(service), "/api/study-text", &body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            reply,
            json!({"ok": false, "error": "Could not save study text."})
        );
    }

    #[tokio::test]
    async fn test_validation_messages() {
        let service = service();
        let cases = [
            (r#"{"text":"notes"}"#, "Missing session ID."),
            (r#"{"text":"notes","sessionId":7}"#, "Missing session ID."),
            (r#"{"sessionId":"S"}"#, "Please send study text."),
            (r#"{"text":"  ","sessionId":"S"}"#, "Please send study text."),
            (r#"{"text":"notes","#, "Invalid request body"),
        ];

        for (body, error) in cases {
            let (status, reply) = post_json(router(service.clone()), "/api/study-text", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(reply, json!({"ok": false, "error": error}));
        }

        assert!(service.db.get_session_state("S").unwrap().is_none());
    }
}
