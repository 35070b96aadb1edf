//! Roadmap parsing from LLM responses.
//!
//! The model is asked for JSON in the canonical [`Roadmap`] shape, but what
//! comes back varies: fenced code blocks, prose around the object, legacy
//! field names, object maps where arrays were expected, numbers where
//! strings were expected. [`normalize`] recovers what it can and reports
//! anything unusable as a [`MalformedRoadmap`].

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

use super::model::{
    Roadmap, RoadmapEdge, RoadmapNode, RoadmapSection, RoadmapStep, SectionCategory,
};

/// Characters of raw model output included in diagnostics
const SNIPPET_CHARS: usize = 200;

/// Longest slug produced for generated ids
const MAX_SLUG_CHARS: usize = 60;

const SECTION_LIST_KEYS: &[&str] = &["sections", "section", "plan"];
const STEP_LIST_KEYS: &[&str] = &["steps", "items", "tasks", "actions"];
const TITLE_KEYS: &[&str] = &["title", "name"];
const SUMMARY_KEYS: &[&str] = &["summary", "description"];

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://").expect("valid URL pattern"));

static HTML_TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[A-Za-z][A-Za-z0-9-]*(\s[^<>]*)?/?>").expect("valid tag pattern")
});

/// Why a model response could not be turned into a roadmap
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRoadmap {
    #[error("response contains no parseable JSON object")]
    NotJson,

    #[error("response has no sections, steps or nodes")]
    NoSections,

    #[error("no sections with steps survived normalization")]
    Empty,

    #[error("no canonical topic available")]
    MissingTopic,
}

/// Turn raw model output into a [`Roadmap`].
///
/// `canonical_topic` and `correction_note` are used when the payload does
/// not carry its own. Never panics; failures are logged with a bounded
/// snippet of the input.
pub fn normalize(
    raw: &str,
    canonical_topic: &str,
    correction_note: Option<&str>,
) -> Result<Roadmap, MalformedRoadmap> {
    let result = parse_object(raw)
        .ok_or(MalformedRoadmap::NotJson)
        .and_then(|root| normalize_object(&root, canonical_topic, correction_note));

    match &result {
        Ok(roadmap) => debug!(
            topic = %roadmap.canonical_topic,
            sections = roadmap.sections.len(),
            "Normalized roadmap response"
        ),
        Err(reason) => warn!(
            reason = %reason,
            snippet = %snippet(raw),
            "Discarding malformed roadmap response"
        ),
    }

    result
}

/// Parse the first usable JSON object out of model output.
///
/// Tries the fence-stripped text as-is, then the span between the first
/// `{` and the last `}`. A bare top-level array is read as a section list.
pub(crate) fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    let cleaned = strip_code_fences(raw);

    match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(map)) => return Some(map),
        Ok(Value::Array(items)) => {
            let mut map = Map::new();
            map.insert("sections".to_string(), Value::Array(items));
            return Some(map);
        }
        _ => {}
    }

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&cleaned[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Remove a leading ```` ```json ```` / ```` ``` ```` fence and a trailing ```` ``` ````.
fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the language tag, if any
        text = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

fn normalize_object(
    root: &Map<String, Value>,
    default_topic: &str,
    default_note: Option<&str>,
) -> Result<Roadmap, MalformedRoadmap> {
    let canonical_topic = first_string(root, &["canonicalTopic", "canonical_topic", "topic"])
        .or_else(|| non_empty(default_topic))
        .ok_or(MalformedRoadmap::MissingTopic)?;

    let correction_note = first_string(root, &["correctionNote", "correction_note"])
        .or_else(|| default_note.and_then(non_empty));

    let overview = first_string(root, &["overview"]).unwrap_or_default();

    let nodes = root.get("nodes").and_then(normalize_nodes);
    let edges = root.get("edges").and_then(normalize_edges);

    let candidates = locate_sections(root, &canonical_topic);
    if candidates.is_none() && nodes.is_none() {
        return Err(MalformedRoadmap::NoSections);
    }

    let mut ids = IdRegistry::default();
    let mut sections: Vec<RoadmapSection> = candidates
        .unwrap_or_default()
        .iter()
        .enumerate()
        .filter_map(|(i, candidate)| normalize_section(candidate, i + 1, &mut ids))
        .collect();

    if sections.is_empty() && nodes.is_none() {
        return Err(MalformedRoadmap::Empty);
    }

    // Stable: sections sharing an index keep their response order
    sections.sort_by_key(|s| s.index);

    let mut roadmap = Roadmap {
        canonical_topic,
        correction_note,
        overview,
        sections,
        branch_anchor: None,
        nodes,
        edges,
    };
    roadmap.infer_branch_anchor();

    Ok(roadmap)
}

/// Find the list of section candidates, checking legacy layouts in order.
fn locate_sections(root: &Map<String, Value>, topic: &str) -> Option<Vec<Value>> {
    for key in SECTION_LIST_KEYS {
        if let Some(Value::Array(items)) = root.get(*key)
            && !items.is_empty()
        {
            return Some(items.clone());
        }
    }

    // A flat step list becomes one section named after the topic
    if let Some(Value::Array(steps)) = root.get("steps")
        && !steps.is_empty()
    {
        let mut section = Map::new();
        section.insert("title".to_string(), Value::String(topic.to_string()));
        section.insert("steps".to_string(), Value::Array(steps.clone()));
        return Some(vec![Value::Object(section)]);
    }

    if let Some(Value::Object(map)) = root.get("sections")
        && !map.is_empty()
    {
        return Some(map.values().cloned().collect());
    }

    None
}

fn normalize_section(
    candidate: &Value,
    position: usize,
    ids: &mut IdRegistry,
) -> Option<RoadmapSection> {
    let empty = Map::new();
    let (fields, raw_title) = match candidate {
        Value::Object(map) => (map, first_string(map, TITLE_KEYS)),
        Value::String(_) | Value::Number(_) => (&empty, coerce_string(candidate)),
        _ => return None,
    };

    let summary = first_string(fields, SUMMARY_KEYS).unwrap_or_default();

    let mut steps: Vec<RoadmapStep> = first_collection(fields, STEP_LIST_KEYS)
        .into_iter()
        .filter_map(|step| normalize_step(step, ids))
        .collect();

    if steps.is_empty() {
        let (title, step_summary) = match (&raw_title, summary.is_empty()) {
            (Some(title), _) => (title.clone(), summary.clone()),
            (None, false) => (summary.clone(), String::new()),
            (None, true) => return None,
        };
        steps.push(RoadmapStep {
            id: ids.claim(&title),
            title,
            summary: step_summary,
            resources: vec![],
        });
    }

    let raw_category = first_string(fields, &["category"]);
    let category = raw_category
        .as_deref()
        .map(parse_category)
        .unwrap_or(SectionCategory::Other);

    let (branch_label, branch_key) = if category == SectionCategory::Branch {
        let label = first_string(fields, &["branchLabel", "branch_label", "branch"])
            .or_else(|| raw_category.as_deref().and_then(branch_suffix));
        let key = first_string(fields, &["branchKey", "branch_key"])
            .map(|k| slugify(&k))
            .filter(|k| !k.is_empty())
            .or_else(|| label.as_deref().map(slugify).filter(|k| !k.is_empty()));
        (label, key)
    } else {
        (None, None)
    };

    let index = ["index", "order"]
        .iter()
        .find_map(|key| fields.get(*key).and_then(coerce_number))
        .map(|n| n.round() as i64)
        .unwrap_or(position as i64);

    Some(RoadmapSection {
        title: raw_title.unwrap_or_else(|| format!("Section {position}")),
        summary,
        steps,
        category,
        branch_label,
        branch_key,
        index,
    })
}

fn normalize_step(value: &Value, ids: &mut IdRegistry) -> Option<RoadmapStep> {
    match value {
        Value::String(_) | Value::Number(_) => {
            let title = coerce_string(value)?;
            Some(RoadmapStep {
                id: ids.claim(&title),
                title,
                summary: String::new(),
                resources: vec![],
            })
        }
        Value::Object(fields) => {
            let summary = first_string(fields, SUMMARY_KEYS).unwrap_or_default();
            let (title, summary) = match first_string(fields, TITLE_KEYS) {
                Some(title) => (title, summary),
                None if !summary.is_empty() => (summary, String::new()),
                None => return None,
            };

            let id = match fields.get("id").and_then(coerce_string) {
                Some(explicit) => ids.claim_explicit(explicit),
                None => ids.claim(&title),
            };

            Some(RoadmapStep {
                id,
                title,
                summary,
                resources: fields
                    .get("resources")
                    .map(sanitize_resources)
                    .unwrap_or_default(),
            })
        }
        _ => None,
    }
}

/// Resource strings: trimmed, no URLs, no HTML tags, no duplicates.
fn sanitize_resources(value: &Value) -> Vec<String> {
    let entries: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(fields) => first_string(fields, TITLE_KEYS),
                other => coerce_string(other),
            })
            .collect(),
        other => coerce_string(other).into_iter().collect(),
    };

    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| !URL_PATTERN.is_match(entry) && !HTML_TAG_PATTERN.is_match(entry))
        .filter(|entry| seen.insert(entry.clone()))
        .collect()
}

/// Map a free-form category label onto the fixed set.
fn parse_category(raw: &str) -> SectionCategory {
    let key = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
        .replace('-', "_");

    match key.as_str() {
        "FOUNDATIONS" | "FOUNDATION" => SectionCategory::Foundations,
        "CORE_SKILLS" | "CORE_SKILL" | "CORE" => SectionCategory::CoreSkills,
        "PROJECT" | "PROJECTS" => SectionCategory::Project,
        "NEXT_STEPS" | "NEXT_STEP" => SectionCategory::NextSteps,
        k if k.starts_with("BRANCH") => SectionCategory::Branch,
        _ => SectionCategory::Other,
    }
}

/// Label embedded in a category such as `"BRANCH: Data Science"`.
fn branch_suffix(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let prefix = trimmed.get(..6)?;
    if !prefix.eq_ignore_ascii_case("branch") {
        return None;
    }

    let is_separator = |c: char| c == ':' || c == '-' || c == '_' || c.is_whitespace();

    // "Branches", "Branching": no label
    let rest = &trimmed[6..];
    if !rest.starts_with(is_separator) {
        return None;
    }

    let rest = rest.trim_matches(is_separator).replace('_', " ");
    non_empty(&rest)
}

fn normalize_nodes(value: &Value) -> Option<Vec<RoadmapNode>> {
    let Value::Array(items) = value else {
        return None;
    };

    let nodes: Vec<RoadmapNode> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let fields = item.as_object()?;
            let title = first_string(fields, &["title", "name", "label"]);
            let id = fields.get("id").and_then(coerce_string);
            let (id, title) = match (id, title) {
                (None, None) => return None,
                (Some(id), title) => {
                    let title = title.unwrap_or_else(|| id.clone());
                    (id, title)
                }
                (None, Some(title)) => {
                    let slug = slugify(&title);
                    let id = if slug.is_empty() {
                        format!("node-{}", i + 1)
                    } else {
                        slug
                    };
                    (id, title)
                }
            };

            Some(RoadmapNode {
                id,
                title,
                summary: first_string(fields, SUMMARY_KEYS).unwrap_or_default(),
                level: fields
                    .get("level")
                    .and_then(coerce_number)
                    .map(|n| n.round() as i64),
            })
        })
        .collect();

    (!nodes.is_empty()).then_some(nodes)
}

fn normalize_edges(value: &Value) -> Option<Vec<RoadmapEdge>> {
    let Value::Array(items) = value else {
        return None;
    };

    let edges: Vec<RoadmapEdge> = items
        .iter()
        .filter_map(|item| {
            let fields = item.as_object()?;
            let from = ["from", "source"]
                .iter()
                .find_map(|k| fields.get(*k).and_then(coerce_string))?;
            let to = ["to", "target"]
                .iter()
                .find_map(|k| fields.get(*k).and_then(coerce_string))?;
            Some(RoadmapEdge {
                from,
                to,
                reason: first_string(fields, &["reason"]),
            })
        })
        .collect();

    (!edges.is_empty()).then_some(edges)
}

/// Hands out step ids, keeping them unique within one roadmap
#[derive(Default)]
struct IdRegistry {
    taken: HashSet<String>,
    generated: usize,
}

impl IdRegistry {
    /// Slug of `title`, or `step-<n>` when the slug is empty
    fn claim(&mut self, title: &str) -> String {
        self.generated += 1;
        let slug = slugify(title);
        let base = if slug.is_empty() {
            format!("step-{}", self.generated)
        } else {
            slug
        };
        self.unique(base)
    }

    fn claim_explicit(&mut self, id: String) -> String {
        self.generated += 1;
        self.unique(id)
    }

    fn unique(&mut self, base: String) -> String {
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Lowercase kebab-case slug of the alphanumeric runs in `text`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.chars().count() > MAX_SLUG_CHARS {
        slug = slug.chars().take(MAX_SLUG_CHARS).collect();
        slug.truncate(slug.trim_end_matches('-').len());
    }

    slug
}

/// First key holding a non-empty string (or number) value, trimmed.
fn first_string(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| fields.get(*key).and_then(coerce_string))
}

/// First key holding a non-empty array or object; objects yield their values.
fn first_collection<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Vec<&'a Value> {
    keys.iter()
        .find_map(|key| match fields.get(*key) {
            Some(Value::Array(items)) if !items.is_empty() => Some(items.iter().collect()),
            Some(Value::Object(map)) if !map.is_empty() => Some(map.values().collect()),
            _ => None,
        })
        .unwrap_or_default()
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn snippet(raw: &str) -> String {
    raw.chars().take(SNIPPET_CHARS).collect()
}
