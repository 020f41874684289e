//! Extraction and embedding of the resume's existing technical skills

use crate::providers::EmbeddingProvider;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::collections::HashMap;

/// Category used when the resume lists technical skills as a flat list.
pub const DEFAULT_TECHNICAL_CATEGORY: &str = "_DEFAULT_TECHNICAL_SKILLS_";

/// A resume skill with its embedding.
#[derive(Debug, Clone)]
pub struct EmbeddedSkill {
    pub skill: String,
    pub embedding: Vec<f32>,
}

/// Extract technical skills from the resume, preserving categories when they
/// exist, and embed each skill.
///
/// Accepts `Skills["Technical Skills"]` as either a mapping of category to
/// skill list or a flat list (placed under [`DEFAULT_TECHNICAL_CATEGORY`]).
/// Anything else is treated as empty with a warning; invalid entries are
/// skipped. This never fails the pipeline.
pub async fn extract_resume_skills(
    provider: &dyn EmbeddingProvider,
    resume_data: &Value,
) -> HashMap<String, Vec<EmbeddedSkill>> {
    let mut structured_skills: HashMap<String, Vec<EmbeddedSkill>> = HashMap::new();

    let skills_section = match resume_data.get("Skills") {
        Some(Value::Object(section)) => section,
        Some(other) => {
            warn!(
                "Resume 'Skills' section is not an object as expected ({}), treating as empty",
                value_kind(other)
            );
            return structured_skills;
        }
        None => {
            warn!("Resume has no 'Skills' section, treating as empty");
            return structured_skills;
        }
    };

    match skills_section.get("Technical Skills") {
        Some(Value::Object(categories)) => {
            debug!("Resume technical skills appear to be categorized");
            for (category, skills_in_category) in categories {
                match skills_in_category.as_array() {
                    Some(entries) => {
                        let embedded = embed_skill_entries(provider, entries, category).await;
                        if !embedded.is_empty() {
                            structured_skills.insert(category.clone(), embedded);
                        }
                    }
                    None => warn!(
                        "Category '{}' in Technical Skills does not contain a list of skills, skipping",
                        category
                    ),
                }
            }
        }
        Some(Value::Array(entries)) => {
            debug!("Resume technical skills are a flat list, using default category");
            let embedded = embed_skill_entries(provider, entries, DEFAULT_TECHNICAL_CATEGORY).await;
            if !embedded.is_empty() {
                structured_skills.insert(DEFAULT_TECHNICAL_CATEGORY.to_string(), embedded);
            }
        }
        Some(other) => {
            warn!(
                "'Technical Skills' data is not a recognized object or list ({}), no skills extracted",
                value_kind(other)
            );
        }
        None => debug!("Resume has no 'Technical Skills' entry"),
    }

    let total: usize = structured_skills.values().map(Vec::len).sum();
    info!(
        "Extracted and embedded {} technical skills from {} resume categories",
        total,
        structured_skills.len()
    );
    structured_skills
}

async fn embed_skill_entries(
    provider: &dyn EmbeddingProvider,
    entries: &[Value],
    category: &str,
) -> Vec<EmbeddedSkill> {
    let mut embedded = Vec::new();

    for entry in entries {
        let skill_name = match entry.as_str() {
            Some(name) if !name.trim().is_empty() => name.trim(),
            _ => {
                warn!("Invalid skill item in category '{}', skipping", category);
                continue;
            }
        };

        match provider.embed(skill_name).await {
            Ok(embedding) => embedded.push(EmbeddedSkill {
                skill: skill_name.to_string(),
                embedding,
            }),
            Err(e) => error!(
                "Failed to generate embedding for resume skill '{}' in category '{}': {}",
                skill_name, category, e
            ),
        }
    }

    embedded
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn model_id(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_extract_categorized_skills() {
        let resume = json!({
            "Skills": {
                "Technical Skills": {
                    "Languages": ["Python", "  Rust  "],
                    "Cloud": ["AWS"]
                }
            }
        });

        let skills = extract_resume_skills(&FixedEmbedder, &resume).await;
        assert_eq!(skills.len(), 2);
        assert_eq!(skills["Languages"].len(), 2);
        assert_eq!(skills["Languages"][1].skill, "Rust");
        assert_eq!(skills["Cloud"][0].skill, "AWS");
    }

    #[tokio::test]
    async fn test_extract_flat_list_uses_default_category() {
        let resume = json!({
            "Skills": {
                "Technical Skills": ["Python", "SQL"]
            }
        });

        let skills = extract_resume_skills(&FixedEmbedder, &resume).await;
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[DEFAULT_TECHNICAL_CATEGORY].len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_entries_skipped() {
        let resume = json!({
            "Skills": {
                "Technical Skills": {
                    "Languages": ["Python", "", 42, null],
                    "Broken": "not a list"
                }
            }
        });

        let skills = extract_resume_skills(&FixedEmbedder, &resume).await;
        assert_eq!(skills.len(), 1);
        assert_eq!(skills["Languages"].len(), 1);
        assert_eq!(skills["Languages"][0].skill, "Python");
    }

    #[tokio::test]
    async fn test_unexpected_shapes_yield_empty() {
        for resume in [
            json!({}),
            json!({"Skills": "oops"}),
            json!({"Skills": {"Technical Skills": "oops"}}),
            json!({"Skills": {}}),
        ] {
            let skills = extract_resume_skills(&FixedEmbedder, &resume).await;
            assert!(skills.is_empty());
        }
    }
}
