//! Bullet point extraction and keyword-to-bullet matching

use crate::error::{Result, ResumeTailorError};
use crate::matching::keywords::{DedupedKeyword, SkillType, Synonym};
use crate::matching::similarity::cosine_similarity;
use crate::providers::EmbeddingProvider;
use aho_corasick::AhoCorasick;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const MAX_HARD_SKILLS_PER_BULLET: usize = 2;
pub const MAX_SOFT_SKILLS_PER_BULLET: usize = 1;
pub const MAX_MATCHES_PER_BULLET: usize = 3;

/// A bullet point pulled from the resume's Experience entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletPoint {
    pub bullet_text: String,
    pub company: String,
    pub position: String,
    pub section: String,
    pub experience_idx: usize,
    pub bullet_idx: usize,
}

/// Bullet point with its embedding attached.
#[derive(Debug, Clone)]
pub struct EmbeddedBullet {
    pub bullet: BulletPoint,
    pub embedding: Vec<f32>,
}

/// One (keyword, bullet) pair at or above the similarity threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub keyword: String,
    pub keyword_context: String,
    pub relevance_score: f32,
    pub skill_type: SkillType,
    pub bullet_text: String,
    pub company: String,
    pub position: String,
    pub section: String,
    pub experience_idx: usize,
    pub bullet_idx: usize,
    pub similarity_score: f32,
    pub has_synonyms: bool,
    pub synonyms: Vec<Synonym>,
}

/// A keyword recommendation attached to one bullet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletMatch {
    pub keyword: String,
    pub context: String,
    pub relevance_score: f32,
    pub skill_type: SkillType,
    pub similarity_score: f32,
    pub synonyms: Vec<Synonym>,
}

/// Extract bullet points from the resume's Experience section.
/// Entries of unexpected shape are skipped, never fatal.
pub fn extract_bullet_points(resume_data: &Value) -> Vec<BulletPoint> {
    let mut bullet_points = Vec::new();

    let experiences = match resume_data.get("Experience").and_then(Value::as_array) {
        Some(experiences) => experiences,
        None => {
            warn!("Resume has no Experience array; no bullet points extracted");
            return bullet_points;
        }
    };

    for (experience_idx, experience) in experiences.iter().enumerate() {
        let company = experience
            .get("company")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let position = experience
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let bullets = experience
            .get("responsibilities/achievements")
            .and_then(Value::as_array);

        if let Some(bullets) = bullets {
            for (bullet_idx, bullet) in bullets.iter().enumerate() {
                match bullet.as_str() {
                    Some(text) => bullet_points.push(BulletPoint {
                        bullet_text: text.to_string(),
                        company: company.to_string(),
                        position: position.to_string(),
                        section: "Experience".to_string(),
                        experience_idx,
                        bullet_idx,
                    }),
                    None => warn!(
                        "Non-string bullet at experience {} index {}, skipping",
                        experience_idx, bullet_idx
                    ),
                }
            }
        }
    }

    debug!("Extracted {} bullet points from resume", bullet_points.len());
    bullet_points
}

/// Embed each bullet point. Bullets whose embedding fails are logged and dropped.
pub async fn embed_bullets(
    provider: &dyn EmbeddingProvider,
    bullets: &[BulletPoint],
) -> Vec<EmbeddedBullet> {
    let mut embedded = Vec::with_capacity(bullets.len());

    for bullet in bullets {
        match provider.embed(&bullet.bullet_text).await {
            Ok(embedding) => embedded.push(EmbeddedBullet {
                bullet: bullet.clone(),
                embedding,
            }),
            Err(e) => {
                let preview: String = bullet.bullet_text.chars().take(30).collect();
                error!("Error generating embedding for bullet '{}...': {}", preview, e);
            }
        }
    }

    debug!("Generated embeddings for {} bullet points", embedded.len());
    embedded
}

/// Compute cosine similarity for every (keyword, bullet) pair, keep pairs at
/// or above `threshold`, sorted by similarity descending.
pub fn calculate_similarity(
    keywords: &[DedupedKeyword],
    bullets: &[EmbeddedBullet],
    threshold: f32,
) -> Vec<SimilarityResult> {
    let mut similarity_results = Vec::new();

    for keyword in keywords {
        for bullet in bullets {
            let similarity = cosine_similarity(&keyword.embedding, &bullet.embedding);
            if similarity >= threshold {
                similarity_results.push(SimilarityResult {
                    keyword: keyword.keyword.keyword.clone(),
                    keyword_context: keyword.keyword.context.clone(),
                    relevance_score: keyword.keyword.relevance_score,
                    skill_type: keyword.keyword.skill_type,
                    bullet_text: bullet.bullet.bullet_text.clone(),
                    company: bullet.bullet.company.clone(),
                    position: bullet.bullet.position.clone(),
                    section: bullet.bullet.section.clone(),
                    experience_idx: bullet.bullet.experience_idx,
                    bullet_idx: bullet.bullet.bullet_idx,
                    similarity_score: similarity,
                    has_synonyms: !keyword.synonyms.is_empty(),
                    synonyms: keyword.synonyms.clone(),
                });
            }
        }
    }

    similarity_results.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));

    debug!(
        "Calculated {} similarity scores above threshold {}",
        similarity_results.len(),
        threshold
    );
    similarity_results
}

/// Group similarity results by bullet text and trim each bullet's matches to
/// the per-bullet quotas (top 2 hard skills + top 1 soft skill, 3 total),
/// ranked by (relevance_score, similarity_score) descending.
///
/// A match whose keyword already appears in the bullet text (case-insensitive
/// substring) is skipped: there is nothing to recommend.
pub fn group_matches_by_bullet(
    similarity_results: &[SimilarityResult],
) -> Result<BTreeMap<String, Vec<BulletMatch>>> {
    let mut patterns: Vec<String> = Vec::new();
    let mut pattern_index: HashMap<&str, usize> = HashMap::new();
    for result in similarity_results {
        if !pattern_index.contains_key(result.keyword.as_str()) {
            pattern_index.insert(result.keyword.as_str(), patterns.len());
            patterns.push(result.keyword.clone());
        }
    }

    let matcher = AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(&patterns)
        .map_err(|e| ResumeTailorError::Processing(format!("Failed to build keyword matcher: {}", e)))?;

    // Which keywords are already present in each bullet, computed once per bullet.
    let mut present_in_bullet: HashMap<&str, HashSet<usize>> = HashMap::new();

    let mut matches_by_bullet: BTreeMap<String, Vec<BulletMatch>> = BTreeMap::new();

    for result in similarity_results {
        let present = present_in_bullet
            .entry(result.bullet_text.as_str())
            .or_insert_with(|| {
                matcher
                    .find_iter(result.bullet_text.as_str())
                    .map(|m| m.pattern().as_usize())
                    .collect()
            });

        if let Some(&pattern_id) = pattern_index.get(result.keyword.as_str()) {
            if present.contains(&pattern_id) {
                continue;
            }
        }

        matches_by_bullet
            .entry(result.bullet_text.clone())
            .or_default()
            .push(BulletMatch {
                keyword: result.keyword.clone(),
                context: result.keyword_context.clone(),
                relevance_score: result.relevance_score,
                skill_type: result.skill_type,
                similarity_score: result.similarity_score,
                synonyms: result.synonyms.clone(),
            });
    }

    for matches in matches_by_bullet.values_mut() {
        matches.sort_by(rank_by_relevance_then_similarity);

        let hard_skills: Vec<BulletMatch> = matches
            .iter()
            .filter(|m| m.skill_type == SkillType::Hard)
            .take(MAX_HARD_SKILLS_PER_BULLET)
            .cloned()
            .collect();
        let soft_skills: Vec<BulletMatch> = matches
            .iter()
            .filter(|m| m.skill_type == SkillType::Soft)
            .take(MAX_SOFT_SKILLS_PER_BULLET)
            .cloned()
            .collect();

        let mut combined = hard_skills;
        combined.extend(soft_skills);
        combined.sort_by(rank_by_relevance_then_similarity);
        combined.truncate(MAX_MATCHES_PER_BULLET);

        *matches = combined;
    }

    debug!("Grouped matches for {} bullets", matches_by_bullet.len());
    Ok(matches_by_bullet)
}

fn rank_by_relevance_then_similarity(a: &BulletMatch, b: &BulletMatch) -> std::cmp::Ordering {
    b.relevance_score
        .total_cmp(&a.relevance_score)
        .then(b.similarity_score.total_cmp(&a.similarity_score))
}

/// Cap how often one keyword may be recommended across all bullets.
///
/// Bullets are processed best-first by a quality score
/// (0.7 * average relevance + 0.3 * average similarity); within the cap,
/// matches are kept greedily. Returns the filtered matches together with the
/// final per-keyword usage counts (keys lowercased).
pub fn filter_keyword_usage(
    matches_by_bullet: &BTreeMap<String, Vec<BulletMatch>>,
    max_keyword_usage: usize,
) -> (BTreeMap<String, Vec<BulletMatch>>, HashMap<String, usize>) {
    let mut bullet_quality: Vec<(&String, f32)> = matches_by_bullet
        .iter()
        .map(|(bullet, matches)| {
            let quality = if matches.is_empty() {
                0.0
            } else {
                let avg_relevance: f32 =
                    matches.iter().map(|m| m.relevance_score).sum::<f32>() / matches.len() as f32;
                let avg_similarity: f32 =
                    matches.iter().map(|m| m.similarity_score).sum::<f32>() / matches.len() as f32;
                avg_relevance * 0.7 + avg_similarity * 0.3
            };
            (bullet, quality)
        })
        .collect();

    bullet_quality.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut keyword_usage: HashMap<String, usize> = HashMap::new();
    let mut filtered: BTreeMap<String, Vec<BulletMatch>> = BTreeMap::new();

    for (bullet, _) in bullet_quality {
        let mut kept = Vec::new();

        for m in &matches_by_bullet[bullet] {
            let usage = keyword_usage.entry(m.keyword.to_lowercase()).or_insert(0);
            if *usage >= max_keyword_usage {
                continue;
            }
            *usage += 1;
            kept.push(m.clone());
        }

        filtered.insert(bullet.clone(), kept);
    }

    debug!("Filtered keyword usage across {} bullets", filtered.len());
    (filtered, keyword_usage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deduped(name: &str, relevance: f32, skill_type: SkillType, embedding: Vec<f32>) -> DedupedKeyword {
        DedupedKeyword {
            keyword: crate::matching::keywords::Keyword {
                keyword: name.to_string(),
                context: format!("{} context", name),
                relevance_score: relevance,
                skill_type,
            },
            embedding,
            synonyms: Vec::new(),
        }
    }

    fn embedded_bullet(text: &str, embedding: Vec<f32>) -> EmbeddedBullet {
        EmbeddedBullet {
            bullet: BulletPoint {
                bullet_text: text.to_string(),
                company: "Acme".to_string(),
                position: "Engineer".to_string(),
                section: "Experience".to_string(),
                experience_idx: 0,
                bullet_idx: 0,
            },
            embedding,
        }
    }

    fn bullet_match(keyword: &str, relevance: f32, similarity: f32, skill_type: SkillType) -> BulletMatch {
        BulletMatch {
            keyword: keyword.to_string(),
            context: String::new(),
            relevance_score: relevance,
            skill_type,
            similarity_score: similarity,
            synonyms: Vec::new(),
        }
    }

    #[test]
    fn test_extract_bullet_points() {
        let resume = json!({
            "Experience": [
                {
                    "company": "Acme",
                    "title": "Engineer",
                    "responsibilities/achievements": ["Built a pipeline", "Shipped a service"]
                },
                {
                    "company": "Globex",
                    "title": "Analyst",
                    "responsibilities/achievements": ["Analyzed data"]
                }
            ]
        });

        let bullets = extract_bullet_points(&resume);
        assert_eq!(bullets.len(), 3);
        assert_eq!(bullets[0].company, "Acme");
        assert_eq!(bullets[0].position, "Engineer");
        assert_eq!(bullets[0].section, "Experience");
        assert_eq!(bullets[2].experience_idx, 1);
        assert_eq!(bullets[2].bullet_idx, 0);
    }

    #[test]
    fn test_extract_bullet_points_tolerates_bad_shapes() {
        let no_experience = json!({"Skills": {}});
        assert!(extract_bullet_points(&no_experience).is_empty());

        let mixed = json!({
            "Experience": [
                {"company": "Acme", "responsibilities/achievements": ["Real bullet", 42, null]},
                {"title": "Engineer"}
            ]
        });
        let bullets = extract_bullet_points(&mixed);
        assert_eq!(bullets.len(), 1);
        assert_eq!(bullets[0].bullet_text, "Real bullet");
        assert_eq!(bullets[0].position, "");
    }

    #[test]
    fn test_threshold_invariant() {
        let keywords = vec![
            deduped("Python", 0.9, SkillType::Hard, vec![1.0, 0.0]),
            deduped("SQL", 0.8, SkillType::Hard, vec![0.0, 1.0]),
        ];
        let bullets = vec![embedded_bullet("Automated reporting with scripts", vec![0.9, 0.1])];

        let results = calculate_similarity(&keywords, &bullets, 0.75);
        assert!(results.iter().all(|r| r.similarity_score >= 0.75));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].keyword, "Python");
    }

    #[test]
    fn test_results_sorted_by_similarity_descending() {
        let keywords = vec![
            deduped("A", 0.5, SkillType::Hard, vec![0.8, 0.2]),
            deduped("B", 0.5, SkillType::Hard, vec![1.0, 0.0]),
        ];
        let bullets = vec![embedded_bullet("some bullet", vec![1.0, 0.0])];

        let results = calculate_similarity(&keywords, &bullets, 0.1);
        assert_eq!(results.len(), 2);
        assert!(results[0].similarity_score >= results[1].similarity_score);
        assert_eq!(results[0].keyword, "B");
    }

    #[test]
    fn test_group_skips_keywords_already_in_bullet() {
        let results = vec![SimilarityResult {
            keyword: "Python".to_string(),
            keyword_context: "ctx".to_string(),
            relevance_score: 0.9,
            skill_type: SkillType::Hard,
            bullet_text: "Wrote python scripts for reporting".to_string(),
            company: "Acme".to_string(),
            position: "Engineer".to_string(),
            section: "Experience".to_string(),
            experience_idx: 0,
            bullet_idx: 0,
            similarity_score: 0.9,
            has_synonyms: false,
            synonyms: Vec::new(),
        }];

        let grouped = group_matches_by_bullet(&results).unwrap();
        assert!(grouped.is_empty());
    }

    #[test]
    fn test_per_bullet_quota_invariant() {
        let mk = |keyword: &str, relevance: f32, similarity: f32, skill_type: SkillType| SimilarityResult {
            keyword: keyword.to_string(),
            keyword_context: "ctx".to_string(),
            relevance_score: relevance,
            skill_type,
            bullet_text: "Delivered several cross-team initiatives".to_string(),
            company: "Acme".to_string(),
            position: "Engineer".to_string(),
            section: "Experience".to_string(),
            experience_idx: 0,
            bullet_idx: 0,
            similarity_score: similarity,
            has_synonyms: false,
            synonyms: Vec::new(),
        };

        let results = vec![
            mk("Kubernetes", 0.95, 0.90, SkillType::Hard),
            mk("Terraform", 0.90, 0.88, SkillType::Hard),
            mk("Ansible", 0.85, 0.86, SkillType::Hard),
            mk("Leadership", 0.80, 0.84, SkillType::Soft),
            mk("Communication", 0.75, 0.82, SkillType::Soft),
        ];

        let grouped = group_matches_by_bullet(&results).unwrap();
        assert_eq!(grouped.len(), 1);
        let matches = grouped.values().next().unwrap();

        assert!(matches.len() <= MAX_MATCHES_PER_BULLET);
        let hard = matches.iter().filter(|m| m.skill_type == SkillType::Hard).count();
        let soft = matches.iter().filter(|m| m.skill_type == SkillType::Soft).count();
        assert!(hard <= MAX_HARD_SKILLS_PER_BULLET);
        assert!(soft <= MAX_SOFT_SKILLS_PER_BULLET);

        // Best hard skills and the best soft skill survive, ranked.
        assert_eq!(matches[0].keyword, "Kubernetes");
        assert_eq!(matches[1].keyword, "Terraform");
        assert_eq!(matches[2].keyword, "Leadership");
    }

    #[test]
    fn test_filter_keyword_usage_caps_repetition() {
        let mut matches_by_bullet = BTreeMap::new();
        matches_by_bullet.insert(
            "high quality bullet".to_string(),
            vec![bullet_match("Python", 0.9, 0.9, SkillType::Hard)],
        );
        matches_by_bullet.insert(
            "medium quality bullet".to_string(),
            vec![bullet_match("Python", 0.8, 0.8, SkillType::Hard)],
        );
        matches_by_bullet.insert(
            "low quality bullet".to_string(),
            vec![bullet_match("python", 0.5, 0.76, SkillType::Hard)],
        );

        let (filtered, usage) = filter_keyword_usage(&matches_by_bullet, 2);

        let total: usize = filtered.values().map(|v| v.len()).sum();
        assert_eq!(total, 2);
        assert_eq!(usage["python"], 2);
        // The lowest quality bullet loses its match but keeps its entry.
        assert!(filtered["low quality bullet"].is_empty());
        assert_eq!(filtered["high quality bullet"].len(), 1);
        assert_eq!(filtered["medium quality bullet"].len(), 1);
    }
}
