//! Roadmap generation: topic cleanup, optional resolution, generation,
//! normalization, fallback.

use serde_json::Value;
use tracing::{info, warn};

use super::OrbiiService;
use super::prompts;
use crate::error::{ServiceError, ServiceResult, format_error_chain_ref};
use crate::i18n::keys;
use crate::inference::CompletionRequest;
use crate::roadmap::normalize::parse_object;
use crate::roadmap::{NormalizedTopic, Roadmap, fallback_roadmap, normalize, normalize_topic};

/// Resolver answers longer than this are treated as noise
const MAX_RESOLVED_TOPIC_CHARS: usize = 120;

impl OrbiiService {
    /// Build a roadmap for a user-typed topic.
    ///
    /// Only a blank topic is an error; every generation failure degrades to
    /// the generic roadmap.
    pub async fn generate_roadmap(&self, raw_topic: &str) -> ServiceResult<Roadmap> {
        let topic = normalize_topic(raw_topic);
        if topic.display.is_empty() {
            return Err(ServiceError::InvalidRequest {
                message: self.i18n.text(keys::MISSING_TOPIC),
            });
        }

        let (canonical, resolver_note) = if self.config.roadmap.resolve_topic {
            self.resolve_topic(&topic).await
        } else {
            (topic.display.clone(), None)
        };

        let correction_note = resolver_note.or_else(|| {
            let renamed = canonical.to_lowercase() != topic.display.to_lowercase();
            (renamed || topic.spelling_changed()).then(|| {
                self.i18n
                    .text_with(keys::ROADMAP_CORRECTION_NOTE, &[("topic", canonical.as_str())])
            })
        });

        info!(
            raw = %topic.raw,
            topic = %canonical,
            cleaned = topic.was_corrected,
            noted = correction_note.is_some(),
            "Generating roadmap"
        );

        let request = CompletionRequest::new(prompts::roadmap_messages(&canonical))
            .with_temperature(self.config.roadmap.temperature)
            .json();

        let roadmap = match self.bounded(self.inference.complete(request)).await {
            Ok(raw) => normalize(&raw, &canonical, correction_note.as_deref())
                .unwrap_or_else(|_| fallback_roadmap(&canonical, correction_note)),
            Err(e) => {
                warn!(
                    topic = %canonical,
                    error = %format_error_chain_ref(&e),
                    "Roadmap generation failed, using fallback"
                );
                fallback_roadmap(&canonical, correction_note)
            }
        };

        Ok(roadmap)
    }

    /// Ask the model for the standard name of a topic.
    ///
    /// Falls back to the locally cleaned display form on any failure.
    async fn resolve_topic(&self, topic: &NormalizedTopic) -> (String, Option<String>) {
        let prompt = prompts::topic_prompt(&topic.display);

        let raw = match self.bounded(self.inference.generate(&prompt)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    topic = %topic.display,
                    error = %format_error_chain_ref(&e),
                    "Topic resolution failed"
                );
                return (topic.display.clone(), None);
            }
        };

        let Some(fields) = parse_object(&raw) else {
            warn!(topic = %topic.display, "Topic resolution returned no JSON object");
            return (topic.display.clone(), None);
        };

        let text_field = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| fields.get(*name).and_then(Value::as_str))
                .map(str::trim)
                .filter(|text| !text.is_empty() && !text.eq_ignore_ascii_case("null"))
                .map(str::to_string)
        };

        let canonical = text_field(&["canonicalTopic", "canonical_topic", "topic"])
            .filter(|text| text.chars().count() <= MAX_RESOLVED_TOPIC_CHARS)
            .unwrap_or_else(|| topic.display.clone());
        let note = text_field(&["correctionNote", "correction_note"]);

        (canonical, note)
    }
}
