//! Canonical roadmap structures.

use serde::Serialize;

/// A generated curriculum for one topic
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    pub canonical_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction_note: Option<String>,
    pub overview: String,
    /// Always sorted by `index`
    pub sections: Vec<RoadmapSection>,
    /// Index of the main-path section that branch sections attach after
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_anchor: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<RoadmapNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<RoadmapEdge>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapSection {
    pub title: String,
    pub summary: String,
    pub steps: Vec<RoadmapStep>,
    pub category: SectionCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_key: Option<String>,
    pub index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoadmapStep {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionCategory {
    Foundations,
    CoreSkills,
    Project,
    NextSteps,
    Branch,
    Other,
}

impl SectionCategory {
    /// Sections a branch can hang off
    pub fn is_main_path(&self) -> bool {
        matches!(self, SectionCategory::Foundations | SectionCategory::CoreSkills)
    }
}

/// Alternate graph representation some responses use instead of sections
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoadmapNode {
    pub id: String,
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoadmapEdge {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Roadmap {
    /// Recompute `branch_anchor` from the (sorted) sections
    pub fn infer_branch_anchor(&mut self) {
        let has_branch = self
            .sections
            .iter()
            .any(|s| s.category == SectionCategory::Branch);

        self.branch_anchor = if has_branch {
            self.sections
                .iter()
                .rev()
                .find(|s| s.category.is_main_path())
                .map(|s| s.index)
        } else {
            None
        };
    }
}
