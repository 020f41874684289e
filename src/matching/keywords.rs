//! Job-description keyword embedding and deduplication

use crate::matching::similarity::cosine_similarity;
use crate::providers::EmbeddingProvider;
use log::error;
use serde::{Deserialize, Serialize};

/// Similarity above which two keywords are treated as duplicates.
/// High threshold to avoid false merges.
pub const KEYWORD_DEDUP_THRESHOLD: f32 = 0.92;

/// A job-description keyword as produced by upstream extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub keyword: String,
    pub context: String,
    #[serde(default)]
    pub relevance_score: f32,
    pub skill_type: SkillType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillType {
    #[serde(rename = "hard skill")]
    Hard,
    #[serde(rename = "soft skill")]
    Soft,
}

/// The `keywords_data` input document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsDocument {
    pub keywords: Vec<Keyword>,
}

/// Keyword with its embedding attached.
#[derive(Debug, Clone)]
pub struct EmbeddedKeyword {
    pub keyword: Keyword,
    pub embedding: Vec<f32>,
}

impl EmbeddedKeyword {
    /// The keyword text itself.
    pub fn name(&self) -> &str {
        &self.keyword.keyword
    }
}

/// A merged-away duplicate, kept as keyword text plus context only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synonym {
    pub keyword: String,
    pub context: String,
}

/// Primary keyword surviving deduplication, with its merged synonyms.
#[derive(Debug, Clone)]
pub struct DedupedKeyword {
    pub keyword: Keyword,
    pub embedding: Vec<f32>,
    pub synonyms: Vec<Synonym>,
}

/// Embedding-free form of a deduplicated keyword, as exposed in results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordSummary {
    pub keyword: String,
    pub context: String,
    pub relevance_score: f32,
    pub skill_type: SkillType,
    pub synonyms: Vec<Synonym>,
}

impl From<&DedupedKeyword> for KeywordSummary {
    fn from(deduped: &DedupedKeyword) -> Self {
        Self {
            keyword: deduped.keyword.keyword.clone(),
            context: deduped.keyword.context.clone(),
            relevance_score: deduped.keyword.relevance_score,
            skill_type: deduped.keyword.skill_type,
            synonyms: deduped.synonyms.clone(),
        }
    }
}

/// Embed each keyword as `"{keyword}: {context}"` for richer context.
/// Keywords whose embedding fails are logged and dropped.
pub async fn embed_keywords(
    provider: &dyn EmbeddingProvider,
    keywords: &[Keyword],
) -> Vec<EmbeddedKeyword> {
    let mut embedded = Vec::with_capacity(keywords.len());

    for keyword in keywords {
        let text = format!("{}: {}", keyword.keyword, keyword.context);
        match provider.embed(&text).await {
            Ok(embedding) => embedded.push(EmbeddedKeyword {
                keyword: keyword.clone(),
                embedding,
            }),
            Err(e) => {
                error!(
                    "Error generating embedding for keyword '{}': {}",
                    keyword.keyword, e
                );
            }
        }
    }

    embedded
}

/// Cluster near-duplicate keywords by embedding similarity.
///
/// Greedy single pass in input order: each not-yet-clustered keyword anchors
/// a cluster and absorbs every later keyword whose similarity to it exceeds
/// [`KEYWORD_DEDUP_THRESHOLD`]. The cluster member with the highest relevance
/// score becomes the primary; the rest survive as its synonyms.
pub fn deduplicate_keywords(keywords: Vec<EmbeddedKeyword>) -> Vec<DedupedKeyword> {
    if keywords.len() <= 1 {
        return keywords
            .into_iter()
            .map(|kw| DedupedKeyword {
                keyword: kw.keyword,
                embedding: kw.embedding,
                synonyms: Vec::new(),
            })
            .collect();
    }

    let mut processed = vec![false; keywords.len()];
    let mut grouped = Vec::new();

    for i in 0..keywords.len() {
        if processed[i] {
            continue;
        }
        processed[i] = true;

        let mut cluster = vec![i];
        for j in (i + 1)..keywords.len() {
            if processed[j] {
                continue;
            }
            let similarity = cosine_similarity(&keywords[i].embedding, &keywords[j].embedding);
            if similarity > KEYWORD_DEDUP_THRESHOLD {
                cluster.push(j);
                processed[j] = true;
            }
        }

        // Highest relevance wins the cluster; stable sort keeps input order on ties.
        cluster.sort_by(|&a, &b| {
            keywords[b]
                .keyword
                .relevance_score
                .total_cmp(&keywords[a].keyword.relevance_score)
        });

        let primary = &keywords[cluster[0]];
        let synonyms = cluster[1..]
            .iter()
            .map(|&idx| Synonym {
                keyword: keywords[idx].keyword.keyword.clone(),
                context: keywords[idx].keyword.context.clone(),
            })
            .collect();

        grouped.push(DedupedKeyword {
            keyword: primary.keyword.clone(),
            embedding: primary.embedding.clone(),
            synonyms,
        });
    }

    grouped
}
