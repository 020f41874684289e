//! End-to-end keyword and skill processing pipeline

use crate::config::MatchingConfig;
use crate::error::Result;
use crate::matching::bullets::{self, BulletMatch, SimilarityResult};
use crate::matching::keywords::{self, KeywordSummary, KeywordsDocument, SkillType};
use crate::providers::{CategoryProvider, EmbeddingProvider};
use crate::skills::categorizer;
use crate::skills::extractor;
use crate::skills::selector::{self, SelectionLog};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tunable parameters for one pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Minimum cosine similarity for keyword-to-bullet matches.
    pub similarity_threshold: f32,
    /// Minimum relevance for JD hard skills entering the skills section.
    pub relevance_threshold: f32,
    /// Target total number of technical skills after selection.
    pub overall_skill_limit: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.75,
            relevance_threshold: 0.6,
            overall_skill_limit: 15,
        }
    }
}

impl From<&MatchingConfig> for PipelineOptions {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            relevance_threshold: config.relevance_threshold,
            overall_skill_limit: config.overall_skill_limit,
        }
    }
}

/// Counts at every stage of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStatistics {
    pub original_keywords: usize,
    pub deduplicated_keywords: usize,
    pub bullets_processed: usize,
    pub bullets_with_matches: usize,
    pub total_bullet_matches: usize,
    pub initial_skill_categories: usize,
    pub initial_technical_skills: usize,
    pub jd_hard_skills_considered: usize,
    pub final_skill_categories: usize,
    pub final_technical_skills: usize,
}

/// Result of one pipeline invocation. Contains no embeddings; every field is
/// plain JSON-serializable data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub deduplicated_keywords: Vec<KeywordSummary>,
    pub similarity_results: Vec<SimilarityResult>,
    pub matches_by_bullet: BTreeMap<String, Vec<BulletMatch>>,
    pub final_technical_skills: BTreeMap<String, Vec<String>>,
    pub statistics: PipelineStatistics,
    pub skill_selection_log: SelectionLog,
}

/// Orchestrates embedding, deduplication, bullet matching, and skill
/// selection for one (resume, job description) pair.
pub struct SemanticPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    categorizer: Arc<dyn CategoryProvider>,
}

impl SemanticPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        categorizer: Arc<dyn CategoryProvider>,
    ) -> Self {
        Self {
            embedder,
            categorizer,
        }
    }

    /// Process keywords and resume data through the complete pipeline.
    ///
    /// Per-item embedding failures are logged and the item dropped; only the
    /// grouping stage can fail as a whole, and only on matcher construction.
    pub async fn process(
        &self,
        keywords_data: &KeywordsDocument,
        resume_data: &Value,
        options: &PipelineOptions,
    ) -> Result<PipelineResult> {
        info!(
            "Starting semantic processing pipeline ({} keywords, model {})",
            keywords_data.keywords.len(),
            self.embedder.model_id()
        );

        info!("Step 1: Generating embeddings for JD keywords");
        let keywords_with_embeddings =
            keywords::embed_keywords(self.embedder.as_ref(), &keywords_data.keywords).await;

        info!("Step 2: Deduplicating JD keywords");
        let deduplicated_keywords = keywords::deduplicate_keywords(keywords_with_embeddings.clone());

        info!("Step 3: Extracting bullet points from resume");
        let bullet_points = bullets::extract_bullet_points(resume_data);

        info!("Step 4: Generating embeddings for {} bullet points", bullet_points.len());
        let bullets_with_embeddings =
            bullets::embed_bullets(self.embedder.as_ref(), &bullet_points).await;

        info!("Step 5: Calculating similarity between JD keywords and resume bullets");
        let similarity_results = bullets::calculate_similarity(
            &deduplicated_keywords,
            &bullets_with_embeddings,
            options.similarity_threshold,
        );

        info!("Step 6: Grouping matches by bullet point");
        let matches_by_bullet = bullets::group_matches_by_bullet(&similarity_results)?;

        info!("Step 7: Extracting and embedding resume technical skills");
        let resume_skills = extractor::extract_resume_skills(self.embedder.as_ref(), resume_data).await;

        info!("Step 8: Filtering JD keywords for hard skills");
        let jd_hard_skills: Vec<_> = keywords_with_embeddings
            .iter()
            .filter(|kw| {
                kw.keyword.skill_type == SkillType::Hard
                    && kw.keyword.relevance_score >= options.relevance_threshold
            })
            .cloned()
            .collect();
        debug!(
            "Found {} JD hard skills meeting relevance threshold {}",
            jd_hard_skills.len(),
            options.relevance_threshold
        );

        // Categories are sorted so categorization prompts are deterministic.
        let mut resume_categories: Vec<String> = resume_skills.keys().cloned().collect();
        resume_categories.sort();

        info!(
            "Step 9: Categorizing {} JD hard skills against resume categories {:?}",
            jd_hard_skills.len(),
            resume_categories
        );
        let categorized_jd_skills = categorizer::categorize_jd_skills(
            self.categorizer.as_ref(),
            &jd_hard_skills,
            &resume_categories,
        )
        .await;

        info!("Step 10: Selecting final technical skills");
        let (final_technical_skills, skill_selection_log) = selector::select_final_skills(
            &resume_skills,
            &categorized_jd_skills,
            options.overall_skill_limit,
        );
        debug!("Skill selection log: {:?}", skill_selection_log);

        let statistics = PipelineStatistics {
            original_keywords: keywords_data.keywords.len(),
            deduplicated_keywords: deduplicated_keywords.len(),
            bullets_processed: bullet_points.len(),
            bullets_with_matches: matches_by_bullet.values().filter(|m| !m.is_empty()).count(),
            total_bullet_matches: matches_by_bullet.values().map(Vec::len).sum(),
            initial_skill_categories: resume_skills.len(),
            initial_technical_skills: resume_skills.values().map(Vec::len).sum(),
            jd_hard_skills_considered: jd_hard_skills.len(),
            final_skill_categories: final_technical_skills.len(),
            final_technical_skills: final_technical_skills.values().map(Vec::len).sum(),
        };

        info!(
            "Semantic processing complete: {} bullet matches, {} technical skills selected",
            statistics.total_bullet_matches, statistics.final_technical_skills
        );

        Ok(PipelineResult {
            deduplicated_keywords: deduplicated_keywords.iter().map(KeywordSummary::from).collect(),
            similarity_results,
            matches_by_bullet,
            final_technical_skills,
            statistics,
            skill_selection_log,
        })
    }
}
