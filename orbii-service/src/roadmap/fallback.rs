//! Generic roadmap served when generation fails.

use super::model::{Roadmap, RoadmapSection, RoadmapStep, SectionCategory};
use super::normalize::slugify;

struct SectionTemplate {
    title: &'static str,
    summary: &'static str,
    category: SectionCategory,
    branch_label: Option<&'static str>,
    /// (title, summary, resources); `{topic}` is substituted
    steps: [(&'static str, &'static str, &'static [&'static str]); 3],
}

const TEMPLATE: [SectionTemplate; 6] = [
    SectionTemplate {
        title: "Foundations",
        summary: "Get oriented and learn the vocabulary of {topic}.",
        category: SectionCategory::Foundations,
        branch_label: None,
        steps: [
            (
                "Define what {topic} is",
                "Write a two-sentence explanation of {topic} in your own words.",
                &["An introductory textbook chapter on {topic}"],
            ),
            (
                "Learn the key terms",
                "Build a glossary of the ten terms that come up most often.",
                &["Your own flashcard deck"],
            ),
            (
                "Map the landscape",
                "List the main subtopics of {topic} and how they relate.",
                &[],
            ),
        ],
    },
    SectionTemplate {
        title: "Core Skills",
        summary: "Build the skills every {topic} learner relies on.",
        category: SectionCategory::CoreSkills,
        branch_label: None,
        steps: [
            (
                "Study the core concepts",
                "Work through the fundamental ideas one at a time.",
                &["A beginner course on {topic}"],
            ),
            (
                "Work through examples",
                "Follow worked examples and redo them without looking.",
                &[],
            ),
            (
                "Check your understanding",
                "Explain each concept aloud or to a study partner.",
                &[],
            ),
        ],
    },
    SectionTemplate {
        title: "Practice",
        summary: "Turn knowledge into fluency with deliberate practice.",
        category: SectionCategory::CoreSkills,
        branch_label: None,
        steps: [
            (
                "Solve practice problems",
                "Do short exercises every day rather than long sessions rarely.",
                &["Practice exercises from your course or textbook"],
            ),
            (
                "Review your mistakes",
                "Keep a log of errors and revisit them weekly.",
                &[],
            ),
            (
                "Teach it back",
                "Summarize what you learned this week in a short note.",
                &[],
            ),
        ],
    },
    SectionTemplate {
        title: "Build a Project",
        summary: "Apply {topic} to something real.",
        category: SectionCategory::Project,
        branch_label: None,
        steps: [
            (
                "Pick a small project",
                "Choose a project you can finish in a week or two.",
                &[],
            ),
            (
                "Build it step by step",
                "Break the project into milestones and finish one at a time.",
                &[],
            ),
            (
                "Share and get feedback",
                "Show your work to someone and note what to improve.",
                &["A study group or online community for {topic}"],
            ),
        ],
    },
    SectionTemplate {
        title: "Choose a Specialization",
        summary: "Go deeper into the part of {topic} that interests you most.",
        category: SectionCategory::Branch,
        branch_label: Some("Specialization"),
        steps: [
            (
                "Explore specializations",
                "Skim two or three advanced areas of {topic}.",
                &[],
            ),
            (
                "Pick one to focus on",
                "Choose the area that fits your goals.",
                &[],
            ),
            (
                "Find an advanced resource",
                "Start an intermediate book or course in that area.",
                &["An intermediate book on {topic}"],
            ),
        ],
    },
    SectionTemplate {
        title: "Next Steps",
        summary: "Keep momentum after the basics.",
        category: SectionCategory::NextSteps,
        branch_label: None,
        steps: [
            (
                "Set a learning goal",
                "Decide what you want to be able to do in three months.",
                &[],
            ),
            (
                "Build a routine",
                "Schedule regular study sessions.",
                &[],
            ),
            (
                "Keep asking questions",
                "Bring what confuses you back to Orbii.",
                &[],
            ),
        ],
    },
];

/// Six-section generic roadmap for `topic`.
pub fn fallback_roadmap(topic: &str, correction_note: Option<String>) -> Roadmap {
    let topic = match topic.trim() {
        "" => "Your Topic",
        trimmed => trimmed,
    };
    let fill = |text: &str| text.replace("{topic}", topic);

    let sections = TEMPLATE
        .iter()
        .enumerate()
        .map(|(i, template)| RoadmapSection {
            title: template.title.to_string(),
            summary: fill(template.summary),
            steps: template
                .steps
                .iter()
                .map(|(title, summary, resources)| {
                    let title = fill(title);
                    RoadmapStep {
                        id: format!("{}-{}", slugify(template.title), slugify(&title)),
                        title,
                        summary: fill(summary),
                        resources: resources.iter().map(|r| fill(r)).collect(),
                    }
                })
                .collect(),
            category: template.category,
            branch_label: template.branch_label.map(str::to_string),
            branch_key: template.branch_label.map(slugify),
            index: i as i64 + 1,
        })
        .collect();

    let mut roadmap = Roadmap {
        canonical_topic: topic.to_string(),
        correction_note,
        overview: format!(
            "A general path for learning {topic}: start with the foundations, build core skills, \
             practice, apply them in a project, then specialize."
        ),
        sections,
        branch_anchor: None,
        nodes: None,
        edges: None,
    };
    roadmap.infer_branch_anchor();
    roadmap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roadmap::normalize;
    use std::collections::HashSet;

    #[test]
    fn test_fallback_shape() {
        let roadmap = fallback_roadmap("Git Basics", None);

        assert_eq!(roadmap.canonical_topic, "Git Basics");
        assert_eq!(roadmap.sections.len(), 6);
        assert!(roadmap.sections.iter().all(|s| s.steps.len() == 3));
        assert_eq!(
            roadmap.sections.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5, 6]
        );
        assert_eq!(roadmap.sections[4].category, SectionCategory::Branch);
        assert_eq!(roadmap.sections[4].branch_key.as_deref(), Some("specialization"));
        assert_eq!(roadmap.branch_anchor, Some(3));
        assert!(roadmap.sections[0].summary.contains("Git Basics"));
    }

    #[test]
    fn test_fallback_step_ids_are_unique() {
        let roadmap = fallback_roadmap("Chemistry", None);
        let ids: Vec<_> = roadmap
            .sections
            .iter()
            .flat_map(|s| s.steps.iter().map(|st| st.id.clone()))
            .collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn test_fallback_survives_normalization() {
        let roadmap = fallback_roadmap("Chemistry", Some("note".to_string()));
        let raw = serde_json::to_string(&roadmap).unwrap();

        assert_eq!(normalize(&raw, "ignored", None).unwrap(), roadmap);
    }

    #[test]
    fn test_blank_topic_gets_placeholder() {
        let roadmap = fallback_roadmap("  ", None);
        assert_eq!(roadmap.canonical_topic, "Your Topic");
    }
}
