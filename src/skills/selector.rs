//! Final technical-skill selection across resume and job-description skills

use crate::matching::similarity::cosine_similarity;
use crate::skills::categorizer::CategorizedSkill;
use crate::skills::extractor::EmbeddedSkill;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Similarity above which two skills in the same category are duplicates.
pub const SKILL_DEDUP_THRESHOLD: f32 = 0.90;

/// A skill carried through consolidation and selection.
#[derive(Debug, Clone)]
pub struct SkillRecord {
    pub skill: String,
    pub embedding: Vec<f32>,
    pub relevance: f32,
    pub is_original: bool,
    pub jd_context: Option<String>,
}

/// One dedup decision: which skill was kept, which duplicates were dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupDecision {
    pub category: String,
    pub kept: String,
    pub discarded_duplicates: Vec<String>,
}

/// Record of how the final skill selection was made.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionLog {
    pub input_resume_categories: Vec<String>,
    pub input_resume_skill_counts: BTreeMap<String, usize>,
    pub input_jd_skill_count: usize,
    pub overall_skill_limit: usize,
    pub deduplication_info: Vec<DedupDecision>,
    pub category_skill_counts_before_limit: BTreeMap<String, usize>,
    pub category_processing_order: Vec<String>,
    pub final_skill_counts_by_category: BTreeMap<String, usize>,
}

/// Select the final technical skills, combining original resume skills and
/// categorized job-description skills under an overall limit.
///
/// Original skills enter at relevance 1.0. Each category is deduplicated and
/// ranked (originals first, then by relevance), then a round-robin pass over
/// the categories fills the result one skill at a time until the limit is
/// reached or every category is exhausted. A skill name is selected at most
/// once across all categories (case-insensitive).
pub fn select_final_skills(
    resume_skills: &HashMap<String, Vec<EmbeddedSkill>>,
    categorized_jd_skills: &[CategorizedSkill],
    overall_skill_limit: usize,
) -> (BTreeMap<String, Vec<String>>, SelectionLog) {
    let mut log = SelectionLog {
        input_resume_categories: {
            let mut categories: Vec<String> = resume_skills.keys().cloned().collect();
            categories.sort();
            categories
        },
        input_resume_skill_counts: resume_skills
            .iter()
            .map(|(category, skills)| (category.clone(), skills.len()))
            .collect(),
        input_jd_skill_count: categorized_jd_skills.len(),
        overall_skill_limit,
        ..SelectionLog::default()
    };

    // 1. Consolidate skills by category.
    let mut consolidated: HashMap<String, Vec<SkillRecord>> = HashMap::new();

    for (category, skills) in resume_skills {
        let records = consolidated.entry(category.clone()).or_default();
        for skill in skills {
            records.push(SkillRecord {
                skill: skill.skill.clone(),
                embedding: skill.embedding.clone(),
                relevance: 1.0,
                is_original: true,
                jd_context: None,
            });
        }
    }

    for jd_skill in categorized_jd_skills {
        consolidated
            .entry(jd_skill.assigned_category.clone())
            .or_default()
            .push(SkillRecord {
                skill: jd_skill.keyword.name().to_string(),
                embedding: jd_skill.keyword.embedding.clone(),
                relevance: jd_skill.keyword.keyword.relevance_score,
                is_original: false,
                jd_context: Some(jd_skill.keyword.keyword.context.clone()),
            });
    }

    // 2. Deduplicate within each category.
    for (category, records) in &mut consolidated {
        let (deduped, decisions) = deduplicate_category(category, records);
        *records = deduped;
        log.deduplication_info.extend(decisions);
    }

    log.category_skill_counts_before_limit = consolidated
        .iter()
        .map(|(category, records)| (category.clone(), records.len()))
        .collect();

    // 3. Rank within each category: originals first, then by relevance.
    for records in consolidated.values_mut() {
        records.sort_by(|a, b| {
            b.is_original
                .cmp(&a.is_original)
                .then(b.relevance.total_cmp(&a.relevance))
        });
    }

    // 4. Category order: original categories first, then new ones,
    //    alphabetically within each group.
    let original_categories: HashSet<&String> = resume_skills.keys().collect();
    let mut ordered_categories: Vec<String> = consolidated.keys().cloned().collect();
    ordered_categories.sort_by_key(|c| (!original_categories.contains(c), c.clone()));
    log.category_processing_order = ordered_categories.clone();

    // 5. Round-robin selection up to the overall limit.
    let mut final_skills: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut selected_globally: HashSet<String> = HashSet::new();
    let mut pointers: HashMap<&String, usize> = ordered_categories.iter().map(|c| (c, 0)).collect();
    let mut current_total = 0;

    while current_total < overall_skill_limit {
        let mut added_this_round = false;

        for category in &ordered_categories {
            let records = &consolidated[category];
            let pointer = pointers.entry(category).or_insert(0);

            if *pointer < records.len() {
                let record = &records[*pointer];
                *pointer += 1;

                let key = record.skill.to_lowercase();
                if !selected_globally.contains(&key) {
                    final_skills
                        .entry(category.clone())
                        .or_default()
                        .push(record.skill.clone());
                    selected_globally.insert(key);
                    current_total += 1;
                    added_this_round = true;
                }

                if current_total >= overall_skill_limit {
                    break;
                }
            }
        }

        if !added_this_round {
            break;
        }
    }

    log.final_skill_counts_by_category = final_skills
        .iter()
        .map(|(category, skills)| (category.clone(), skills.len()))
        .collect();

    info!(
        "Selected final {} technical skills across {} categories",
        current_total,
        final_skills.len()
    );
    debug!("Final skills structure: {:?}", final_skills);

    (final_skills, log)
}

/// Collapse duplicate skills within one category.
///
/// Two skills are duplicates when their trimmed lowercased text matches or
/// their embeddings' similarity to the cluster anchor exceeds
/// [`SKILL_DEDUP_THRESHOLD`]. The kept member prefers original resume skills
/// over job-description ones, then higher relevance.
fn deduplicate_category(
    category: &str,
    records: &[SkillRecord],
) -> (Vec<SkillRecord>, Vec<DedupDecision>) {
    let mut deduped = Vec::new();
    let mut decisions = Vec::new();
    let mut processed = vec![false; records.len()];

    for i in 0..records.len() {
        if processed[i] {
            continue;
        }
        processed[i] = true;

        let anchor_norm = records[i].skill.trim().to_lowercase();
        let mut cluster = vec![i];

        for j in (i + 1)..records.len() {
            if processed[j] {
                continue;
            }
            let candidate_norm = records[j].skill.trim().to_lowercase();
            let is_duplicate = anchor_norm == candidate_norm
                || cosine_similarity(&records[i].embedding, &records[j].embedding)
                    > SKILL_DEDUP_THRESHOLD;
            if is_duplicate {
                cluster.push(j);
                processed[j] = true;
            }
        }

        let mut best = cluster[0];
        for &candidate in &cluster[1..] {
            let better = (records[candidate].is_original && !records[best].is_original)
                || (records[candidate].is_original == records[best].is_original
                    && records[candidate].relevance > records[best].relevance);
            if better {
                best = candidate;
            }
        }

        if cluster.len() > 1 {
            decisions.push(DedupDecision {
                category: category.to_string(),
                kept: records[best].skill.clone(),
                discarded_duplicates: cluster
                    .iter()
                    .filter(|&&idx| idx != best)
                    .map(|&idx| records[idx].skill.clone())
                    .collect(),
            });
        }

        deduped.push(records[best].clone());
    }

    (deduped, decisions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::keywords::{EmbeddedKeyword, Keyword, SkillType};

    fn resume_skill(name: &str, embedding: Vec<f32>) -> EmbeddedSkill {
        EmbeddedSkill {
            skill: name.to_string(),
            embedding,
        }
    }

    fn jd_skill(name: &str, relevance: f32, category: &str, embedding: Vec<f32>) -> CategorizedSkill {
        CategorizedSkill {
            keyword: EmbeddedKeyword {
                keyword: Keyword {
                    keyword: name.to_string(),
                    context: format!("{} context", name),
                    relevance_score: relevance,
                    skill_type: SkillType::Hard,
                },
                embedding,
            },
            assigned_category: category.to_string(),
        }
    }

    #[test]
    fn test_original_skill_wins_first_round() {
        let mut resume_skills = HashMap::new();
        resume_skills.insert(
            "Languages".to_string(),
            vec![resume_skill("Python", vec![1.0, 0.0])],
        );
        let jd_skills = vec![jd_skill("Go", 0.9, "Languages", vec![0.0, 1.0])];

        let (selected, _log) = select_final_skills(&resume_skills, &jd_skills, 1);

        assert_eq!(selected.len(), 1);
        assert_eq!(selected["Languages"], vec!["Python"]);
    }

    #[test]
    fn test_budget_invariant() {
        let mut resume_skills = HashMap::new();
        resume_skills.insert(
            "Languages".to_string(),
            vec![
                resume_skill("Python", vec![1.0, 0.0, 0.0]),
                resume_skill("Rust", vec![0.0, 1.0, 0.0]),
            ],
        );
        let jd_skills = vec![
            jd_skill("Go", 0.9, "Languages", vec![0.0, 0.0, 1.0]),
            jd_skill("Kafka", 0.8, "Messaging", vec![0.5, 0.5, 0.0]),
        ];

        for limit in 0..5 {
            let (selected, _log) = select_final_skills(&resume_skills, &jd_skills, limit);
            let total: usize = selected.values().map(Vec::len).sum();
            assert!(total <= limit);
        }
    }

    #[test]
    fn test_global_case_insensitive_uniqueness() {
        let mut resume_skills = HashMap::new();
        resume_skills.insert(
            "A".to_string(),
            vec![resume_skill("Python", vec![1.0, 0.0, 0.0])],
        );
        resume_skills.insert(
            "B".to_string(),
            vec![
                resume_skill("python", vec![0.0, 1.0, 0.0]),
                resume_skill("Go", vec![0.0, 0.0, 1.0]),
            ],
        );

        let (selected, _log) = select_final_skills(&resume_skills, &[], 10);

        let mut all: Vec<String> = selected
            .values()
            .flatten()
            .map(|s| s.to_lowercase())
            .collect();
        all.sort();
        let mut unique = all.clone();
        unique.dedup();
        assert_eq!(all, unique);

        // The duplicate is consumed, not re-offered: B still contributes Go.
        assert_eq!(selected["A"], vec!["Python"]);
        assert_eq!(selected["B"], vec!["Go"]);
    }

    #[test]
    fn test_round_robin_cycles_categories() {
        let mut resume_skills = HashMap::new();
        resume_skills.insert(
            "A".to_string(),
            vec![
                resume_skill("A1", vec![1.0, 0.0, 0.0, 0.0]),
                resume_skill("A2", vec![0.0, 1.0, 0.0, 0.0]),
            ],
        );
        resume_skills.insert(
            "B".to_string(),
            vec![
                resume_skill("B1", vec![0.0, 0.0, 1.0, 0.0]),
                resume_skill("B2", vec![0.0, 0.0, 0.0, 1.0]),
            ],
        );

        let (selected, log) = select_final_skills(&resume_skills, &[], 3);

        // One skill per category per pass: A1, B1, then A2.
        assert_eq!(selected["A"], vec!["A1", "A2"]);
        assert_eq!(selected["B"], vec!["B1"]);
        assert_eq!(log.category_processing_order, vec!["A", "B"]);
    }

    #[test]
    fn test_new_categories_processed_after_original() {
        let mut resume_skills = HashMap::new();
        resume_skills.insert(
            "Zoo Tools".to_string(),
            vec![resume_skill("Zebra", vec![1.0, 0.0, 0.0])],
        );
        let jd_skills = vec![
            jd_skill("Athena", 0.9, "Analytics", vec![0.0, 1.0, 0.0]),
            jd_skill("Bigtable", 0.8, "Databases", vec![0.0, 0.0, 1.0]),
        ];

        let (_selected, log) = select_final_skills(&resume_skills, &jd_skills, 10);

        assert_eq!(
            log.category_processing_order,
            vec!["Zoo Tools", "Analytics", "Databases"]
        );
    }

    #[test]
    fn test_duplicate_prefers_original_and_logs_discard() {
        let mut resume_skills = HashMap::new();
        resume_skills.insert(
            "Languages".to_string(),
            vec![resume_skill("Python", vec![1.0, 0.0])],
        );
        // Same normalized text, JD-sourced, higher nominal relevance.
        let jd_skills = vec![jd_skill("python", 0.99, "Languages", vec![0.0, 1.0])];

        let (selected, log) = select_final_skills(&resume_skills, &jd_skills, 10);

        assert_eq!(selected["Languages"], vec!["Python"]);
        assert_eq!(log.deduplication_info.len(), 1);
        assert_eq!(log.deduplication_info[0].kept, "Python");
        assert_eq!(log.deduplication_info[0].discarded_duplicates, vec!["python"]);
    }

    #[test]
    fn test_embedding_similarity_dedup() {
        let mut resume_skills = HashMap::new();
        resume_skills.insert(
            "Cloud".to_string(),
            vec![resume_skill("AWS", vec![1.0, 0.0])],
        );
        // Different text, nearly identical embedding.
        let jd_skills = vec![jd_skill("Amazon Web Services", 0.9, "Cloud", vec![0.999, 0.01])];

        let (selected, log) = select_final_skills(&resume_skills, &jd_skills, 10);

        assert_eq!(selected["Cloud"], vec!["AWS"]);
        assert_eq!(log.deduplication_info.len(), 1);
    }

    #[test]
    fn test_exhaustion_stops_before_limit() {
        let mut resume_skills = HashMap::new();
        resume_skills.insert(
            "Languages".to_string(),
            vec![resume_skill("Python", vec![1.0, 0.0])],
        );

        let (selected, log) = select_final_skills(&resume_skills, &[], 15);

        let total: usize = selected.values().map(Vec::len).sum();
        assert_eq!(total, 1);
        assert_eq!(log.final_skill_counts_by_category["Languages"], 1);
    }

    #[test]
    fn test_jd_skills_ranked_by_relevance_within_category() {
        let resume_skills = HashMap::new();
        let jd_skills = vec![
            jd_skill("Low", 0.6, "New Skills", vec![1.0, 0.0, 0.0]),
            jd_skill("High", 0.95, "New Skills", vec![0.0, 1.0, 0.0]),
            jd_skill("Mid", 0.8, "New Skills", vec![0.0, 0.0, 1.0]),
        ];

        let (selected, _log) = select_final_skills(&resume_skills, &jd_skills, 2);

        assert_eq!(selected["New Skills"], vec!["High", "Mid"]);
    }
}
