//! Assignment of job-description hard skills to resume skill categories

use crate::matching::keywords::EmbeddedKeyword;
use crate::providers::CategoryProvider;
use log::{debug, error, info, warn};

/// Category assigned when the categorization call fails.
pub const UNCATEGORIZED_FALLBACK: &str = "Uncategorized JD Skills";
/// Category assigned to every skill when the resume has no categories at all.
pub const NO_CATEGORIES_FALLBACK: &str = "New Skills";
/// Prefix the provider uses to propose a category that does not exist yet.
pub const NEW_CATEGORY_PREFIX: &str = "New Category:";

/// A job-description hard skill with its categorizer-assigned category.
#[derive(Debug, Clone)]
pub struct CategorizedSkill {
    pub keyword: EmbeddedKeyword,
    pub assigned_category: String,
}

/// Assign each JD hard skill to one of the resume's existing skill
/// categories, or to a new category proposed by the provider.
///
/// With no resume categories to map against, every skill lands in
/// [`NO_CATEGORIES_FALLBACK`] without any external call. A failed call is
/// never fatal: the skill falls back to [`UNCATEGORIZED_FALLBACK`].
pub async fn categorize_jd_skills(
    provider: &dyn CategoryProvider,
    jd_hard_skills: &[EmbeddedKeyword],
    resume_categories: &[String],
) -> Vec<CategorizedSkill> {
    debug!(
        "Categorizing {} JD hard skills against resume categories: {:?}",
        jd_hard_skills.len(),
        resume_categories
    );

    if resume_categories.is_empty() {
        warn!(
            "No existing resume skill categories to map JD skills into, assigning all to '{}'",
            NO_CATEGORIES_FALLBACK
        );
        return jd_hard_skills
            .iter()
            .map(|skill| CategorizedSkill {
                keyword: skill.clone(),
                assigned_category: NO_CATEGORIES_FALLBACK.to_string(),
            })
            .collect();
    }

    let mut categorized = Vec::with_capacity(jd_hard_skills.len());

    for skill in jd_hard_skills {
        let assigned_category = match provider
            .categorize_skill(skill.name(), &skill.keyword.context, resume_categories)
            .await
        {
            Ok(response) => resolve_category(&response, skill.name(), resume_categories),
            Err(e) => {
                error!(
                    "Error categorizing skill '{}': {}. Assigning to '{}'",
                    skill.name(),
                    e,
                    UNCATEGORIZED_FALLBACK
                );
                UNCATEGORIZED_FALLBACK.to_string()
            }
        };

        categorized.push(CategorizedSkill {
            keyword: skill.clone(),
            assigned_category,
        });
    }

    info!("Categorized {} JD hard skills", categorized.len());
    categorized
}

/// Interpret a raw categorization response.
///
/// `"New Category: <name>"` strips the prefix (an empty remainder becomes
/// `"New - {skill}"`). A bare name outside the known categories is accepted
/// as an implicitly new category; this leniency is deliberate and logged.
pub fn resolve_category(response: &str, skill_name: &str, resume_categories: &[String]) -> String {
    let response = response.trim();

    if let Some(rest) = response.strip_prefix(NEW_CATEGORY_PREFIX) {
        let name = rest.trim();
        if name.is_empty() {
            return format!("New - {}", skill_name);
        }
        return name.to_string();
    }

    if !resume_categories.iter().any(|c| c == response) {
        warn!(
            "Categorizer suggested '{}' for skill '{}', which is not an existing category or a '{}' response. Treating as a new category",
            response, skill_name, NEW_CATEGORY_PREFIX
        );
    }

    response.to_string()
}
