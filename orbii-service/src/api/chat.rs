//! Chat API endpoint.

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
use crate::service::ANONYMOUS_SESSION_ID;

use super::{AppState, text_field};

/// Chat request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub session_id: Option<Value>,
}

/// Chat response; also the shape of the 400 payload
#[derive(Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Run one chat turn
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, Response> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection, "Rejected chat body");
            return Err(invalid_message(&state));
        }
    };

    let Some(message) = text_field(&request.message) else {
        return Err(invalid_message(&state));
    };
    let session_id = text_field(&request.session_id).unwrap_or(ANONYMOUS_SESSION_ID);

    match state.service.append_user_message(session_id, message).await {
        Ok(reply) => Ok(Json(ChatResponse { reply })),
        Err(ServiceError::InvalidRequest { .. }) => Err(invalid_message(&state)),
        Err(e) => {
            error!(session_id, error = %format_error_chain_ref(&e), "Chat turn failed");
            Err(e.into_response())
        }
    }
}

fn invalid_message(state: &AppState) -> Response {
    let reply = state.service.i18n.text(keys::INVALID_MESSAGE);
    (StatusCode::BAD_REQUEST, Json(ChatResponse { reply })).into_response()
}
