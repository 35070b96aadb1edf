use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, warn};
use unic_langid::LanguageIdentifier;

/// Message keys used by the HTTP layer and the service
pub mod keys {
    pub const INVALID_MESSAGE: &str = "error-invalid-message";
    pub const MISSING_STUDY_TEXT: &str = "error-missing-study-text";
    pub const MISSING_SESSION: &str = "error-missing-session";
    pub const STUDY_TEXT_TOO_LONG: &str = "error-study-text-too-long";
    pub const STUDY_TEXT_SAVE: &str = "error-study-text-save";
    pub const MISSING_TOPIC: &str = "error-missing-topic";
    pub const INVALID_BODY: &str = "error-invalid-body";
    pub const CHAT_FALLBACK_REPLY: &str = "chat-fallback-reply";
    pub const ROADMAP_CORRECTION_NOTE: &str = "roadmap-correction-note";
    pub const HEALTH_HEALTHY: &str = "health-status-healthy";
    pub const HEALTH_DEGRADED: &str = "health-status-degraded";
}

/// Internationalization service using Fluent (thread-safe)
pub struct I18n {
    bundles: RwLock<HashMap<String, FluentBundle<FluentResource>>>,
    default_locale: String,
}

impl I18n {
    /// Create a new i18n service with embedded English translations
    pub fn new() -> Self {
        let i18n = Self {
            bundles: RwLock::new(HashMap::new()),
            default_locale: "en".to_string(),
        };

        i18n.load_embedded_en();

        i18n
    }

    /// Add a locale with translations
    pub fn add_locale(&self, locale: &str, content: &str) -> Result<(), String> {
        let lang_id: LanguageIdentifier = locale
            .parse()
            .map_err(|e| format!("Invalid locale '{}': {}", locale, e))?;

        let resource = FluentResource::try_new(content.to_string())
            .map_err(|(_, errors)| format!("Failed to parse Fluent resource: {:?}", errors))?;

        let mut bundle = FluentBundle::new_concurrent(vec![lang_id]);
        // Messages end up inside JSON payloads; no bidi isolation marks
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|errors| format!("Failed to add resource to bundle: {:?}", errors))?;

        let mut bundles = self
            .bundles
            .write()
            .map_err(|_| "i18n bundle lock poisoned".to_string())?;
        bundles.insert(locale.to_string(), bundle);

        debug!(locale = %locale, "Loaded translations");

        Ok(())
    }

    /// Get a translated message
    pub fn get(&self, locale: &str, key: &str, args: Option<&FluentArgs>) -> String {
        // Requested locale, then default locale, then the key itself
        self.try_get(locale, key, args)
            .or_else(|| self.try_get(&self.default_locale, key, args))
            .unwrap_or_else(|| key.to_string())
    }

    fn try_get(&self, locale: &str, key: &str, args: Option<&FluentArgs>) -> Option<String> {
        let bundles = self.bundles.read().ok()?;
        let bundle = bundles.get(locale)?;
        let message = bundle.get_message(key)?;
        let pattern = message.value()?;

        let mut errors = vec![];
        let result = bundle.format_pattern(pattern, args, &mut errors);

        if !errors.is_empty() {
            warn!(key = %key, errors = ?errors, "Fluent formatting errors");
        }

        Some(result.to_string())
    }

    /// Get a translated message with arguments
    pub fn format(&self, locale: &str, key: &str, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (k, v) in args {
            fluent_args.set(*k, *v);
        }
        self.get(locale, key, Some(&fluent_args))
    }

    /// Shorthand for the default locale without arguments
    pub fn text(&self, key: &str) -> String {
        self.get(&self.default_locale, key, None)
    }

    /// Shorthand for the default locale with arguments
    pub fn text_with(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.format(&self.default_locale, key, args)
    }

    fn load_embedded_en(&self) {
        let en_translations = r#"
# Orbii - English Translations

# Validation
error-invalid-message = Please send a valid message.
error-missing-study-text = Please send study text.
error-missing-session = Missing session ID.
error-study-text-too-long = Study text is too long.
error-study-text-save = Could not save study text.
error-missing-topic = Missing topic
error-invalid-body = Invalid request body

# Chat
chat-fallback-reply = I ran into a hiccup reaching the study buddy brain. Please try again.

# Roadmap
roadmap-correction-note = Showing a roadmap for "{ $topic }".

# Health
health-status-healthy = Service is healthy
health-status-degraded = Service is degraded: { $reason }
"#;

        if let Err(e) = self.add_locale("en", en_translations) {
            warn!(error = %e, "Failed to load embedded English translations");
        }
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new()
    }
}
