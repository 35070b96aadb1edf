//! Roadmap API endpoint.

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
use crate::roadmap::{Roadmap, fallback_roadmap};

use super::{AppState, text_field};

/// Roadmap request
#[derive(Deserialize)]
pub struct RoadmapRequest {
    #[serde(default)]
    pub topic: Option<Value>,
}

#[derive(Serialize)]
struct RoadmapError {
    error: String,
}

/// Generate a roadmap; always 200 once the topic is valid
pub async fn roadmap_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RoadmapRequest>, JsonRejection>,
) -> Result<Json<Roadmap>, Response> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection, "Rejected roadmap body");
            return Err(bad_request(&state, keys::INVALID_BODY));
        }
    };

    let Some(topic) = text_field(&request.topic) else {
        return Err(bad_request(&state, keys::MISSING_TOPIC));
    };

    match state.service.generate_roadmap(topic).await {
        Ok(roadmap) => Ok(Json(roadmap)),
        Err(ServiceError::InvalidRequest { .. }) => Err(bad_request(&state, keys::MISSING_TOPIC)),
        Err(e) => {
            error!(topic, error = %format_error_chain_ref(&e), "Roadmap generation failed");
            Ok(Json(fallback_roadmap(topic, None)))
        }
    }
}

fn bad_request(state: &AppState, key: &str) -> Response {
    let error = state.service.i18n.text(key);
    (StatusCode::BAD_REQUEST, Json(RoadmapError { error })).into_response()
}

#[cfg(test)]
mod tests {
    use crate::api::router;
    use crate::api::test_support::post_json;
    use crate::config::OrbiiConfig;
    use crate::inference::testing::{Scripted, ScriptedInference};
    use crate::service::test_support::service_with;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unparseable_backend_returns_fallback() {
        let service = service_with(
            OrbiiConfig::default(),
            Arc::new(ScriptedInference::replying("Sorry, I can only chat.")),
        );

        let (status, body) =
            post_json(router(service), "/api/roadmap", r#"{"topic":"machine learning"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["canonicalTopic"], json!("Machine Learning"));
        let sections = body["sections"].as_array().unwrap();
        assert!(!sections.is_empty());
        for section in sections {
            assert!(!section["steps"].as_array().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_generated_roadmap_is_normalized() {
        let raw = r#"{
            "overview": "Web basics",
            "sections": [
                {"name": "HTML", "category": "foundation", "order": "2",
                 "steps": [{"title": "Learn tags", "resources": ["<b>MDN</b>", "https://mdn.dev", "MDN Web Docs", "MDN Web Docs"]},
                           {"title": "Learn tags"}]},
                {"title": "Start", "category": "FOUNDATIONS", "index": 1,
                 "steps": ["Install a browser"]}
            ]
        }"#;
        let backend = Arc::new(
            ScriptedInference::failing()
                .then(Scripted::Reply(r#"{"canonicalTopic":"Web Development"}"#.to_string()))
                .then(Scripted::Reply(raw.to_string())),
        );
        let service = service_with(OrbiiConfig::default(), backend);

        let (status, body) =
            post_json(router(service), "/api/roadmap", r#"{"topic":"web dev"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["canonicalTopic"], json!("Web Development"));
        assert_eq!(
            body["correctionNote"],
            json!("Showing a roadmap for \"Web Development\".")
        );

        let sections = body["sections"].as_array().unwrap();
        assert_eq!(sections[0]["title"], json!("Start"));
        assert_eq!(sections[1]["title"], json!("HTML"));
        assert_eq!(sections[1]["index"], json!(2));

        let ids: Vec<&str> = sections
            .iter()
            .flat_map(|s| s["steps"].as_array().unwrap())
            .map(|step| step["id"].as_str().unwrap())
            .collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), unique.len());

        let resources = &sections[1]["steps"][0]["resources"];
        assert_eq!(resources, &json!(["MDN Web Docs"]));
    }

    #[tokio::test]
    async fn test_missing_topic() {
        let backend = Arc::new(ScriptedInference::replying("{}"));
        let service = service_with(OrbiiConfig::default(), backend.clone());

        for body in [r#"{}"#, r#"{"topic":"   "}"#, r#"{"topic":["rust"]}"#] {
            let (status, reply) = post_json(router(service.clone()), "/api/roadmap", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(reply, json!({"error": "Missing topic"}));
        }
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let service = service_with(
            OrbiiConfig::default(),
            Arc::new(ScriptedInference::replying("{}")),
        );

        let (status, reply) = post_json(router(service), "/api/roadmap", "topic=rust").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply, json!({"error": "Invalid request body"}));
    }
}
