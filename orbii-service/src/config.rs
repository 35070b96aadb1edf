//! Service configuration loaded from an optional `config` file and
//! `ORBII__`-prefixed environment variables.

use config::{Config as ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Top-level service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OrbiiConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_assets")]
    pub assets: AssetsConfig,

    #[serde(default = "default_inference")]
    pub inference: InferenceConfig,

    #[serde(default = "default_chat")]
    pub chat: ChatConfig,

    #[serde(default = "default_roadmap")]
    pub roadmap: RoadmapConfig,

    #[serde(default = "default_session")]
    pub session: SessionConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Static asset configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    /// Directory served for every path that is not an API route
    #[serde(default = "default_assets_dir")]
    pub dir: PathBuf,
}

/// Hosted text-generation backend (Ollama-compatible chat API)
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_inference_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl InferenceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Chat history and study text bounds
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// History entries kept per session (and replayed into prompts)
    #[serde(default = "default_max_history_entries")]
    pub max_history_entries: usize,

    /// Study text characters embedded into a chat prompt
    #[serde(default = "default_max_prompt_study_text_chars")]
    pub max_prompt_study_text_chars: usize,

    /// Largest study text accepted by the API
    #[serde(default = "default_max_study_text_chars")]
    pub max_study_text_chars: usize,
}

/// Roadmap generation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RoadmapConfig {
    /// Ask the model for a canonical spelling of the topic before generating
    #[serde(default = "default_resolve_topic")]
    pub resolve_topic: bool,

    #[serde(default = "default_roadmap_temperature")]
    pub temperature: f32,
}

/// Session retention configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Sessions idle longer than this are evicted (0 = keep forever)
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,

    /// Run eviction every N seconds
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

impl OrbiiConfig {
    /// Load configuration from `config.*` (optional) and the environment
    pub fn load() -> ServiceResult<Self> {
        ConfigBuilder::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("ORBII")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to build config: {}", e),
            })?
            .try_deserialize()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to deserialize config: {}", e),
            })
    }
}

impl Default for OrbiiConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            assets: default_assets(),
            inference: default_inference(),
            chat: default_chat(),
            roadmap: default_roadmap(),
            session: default_session(),
        }
    }
}

// ==================== Default Value Functions ====================

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_storage() -> StorageConfig {
    StorageConfig {
        data_dir: default_data_dir(),
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_assets() -> AssetsConfig {
    AssetsConfig {
        dir: default_assets_dir(),
    }
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("./public")
}

fn default_inference() -> InferenceConfig {
    InferenceConfig {
        base_url: default_inference_url(),
        model: default_model(),
        temperature: default_temperature(),
        request_timeout_secs: default_request_timeout_secs(),
    }
}

fn default_inference_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_chat() -> ChatConfig {
    ChatConfig {
        max_history_entries: default_max_history_entries(),
        max_prompt_study_text_chars: default_max_prompt_study_text_chars(),
        max_study_text_chars: default_max_study_text_chars(),
    }
}

fn default_max_history_entries() -> usize {
    10
}

fn default_max_prompt_study_text_chars() -> usize {
    4000
}

fn default_max_study_text_chars() -> usize {
    20000
}

fn default_roadmap() -> RoadmapConfig {
    RoadmapConfig {
        resolve_topic: default_resolve_topic(),
        temperature: default_roadmap_temperature(),
    }
}

fn default_resolve_topic() -> bool {
    true
}

fn default_roadmap_temperature() -> f32 {
    0.4
}

fn default_session() -> SessionConfig {
    SessionConfig {
        ttl_secs: default_session_ttl_secs(),
        cleanup_interval_secs: default_cleanup_interval_secs(),
    }
}

fn default_session_ttl_secs() -> u64 {
    90 * 24 * 60 * 60
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}
