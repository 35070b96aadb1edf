//! Learning roadmaps.
//!
//! - [`model`]: the canonical roadmap returned to the UI
//! - [`normalize`]: tolerant decoding of model output into that shape
//! - [`topic`]: cleanup of the user's raw topic input
//! - [`fallback`]: the generic roadmap served when generation fails

pub mod fallback;
pub mod model;
pub mod normalize;
pub mod topic;

pub use fallback::fallback_roadmap;
pub use model::Roadmap;
pub use normalize::normalize;
pub use topic::{NormalizedTopic, normalize_topic};
