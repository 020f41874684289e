//! Console summary and JSON persistence for pipeline results

use crate::error::Result;
use crate::pipeline::PipelineResult;
use chrono::{DateTime, Utc};
use colored::Colorize;
use log::info;
use serde::Serialize;
use std::path::Path;

/// Envelope written to disk: the pipeline result plus generation metadata.
#[derive(Debug, Serialize)]
struct SavedReport<'a> {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    result: &'a PipelineResult,
}

/// Save a pipeline result as pretty-printed JSON.
/// The result carries no embeddings, so the file is safe to persist as-is.
pub fn save_results(result: &PipelineResult, path: &Path) -> Result<()> {
    let report = SavedReport {
        generated_at: Utc::now(),
        result,
    };

    let content = serde_json::to_string_pretty(&report)?;
    std::fs::write(path, content)?;

    info!("Results saved to {}", path.display());
    Ok(())
}

/// Print a human-readable summary of a pipeline run.
pub fn print_summary(result: &PipelineResult) {
    let stats = &result.statistics;

    println!("{}", "Semantic processing complete".bold());
    println!();
    println!("{}", "Keywords".cyan().bold());
    println!("  Original keywords:      {}", stats.original_keywords);
    println!("  After deduplication:    {}", stats.deduplicated_keywords);
    println!();
    println!("{}", "Bullet matching".cyan().bold());
    println!("  Bullets processed:      {}", stats.bullets_processed);
    println!("  Bullets with matches:   {}", stats.bullets_with_matches);
    println!("  Total bullet matches:   {}", stats.total_bullet_matches);

    for (bullet, matches) in &result.matches_by_bullet {
        if matches.is_empty() {
            continue;
        }
        println!();
        println!("  {}", truncate(bullet, 70).italic());
        for m in matches {
            println!(
                "    {} {} (relevance {:.2}, similarity {:.2})",
                "+".green(),
                m.keyword.bold(),
                m.relevance_score,
                m.similarity_score
            );
        }
    }

    println!();
    println!("{}", "Technical skills".cyan().bold());
    println!(
        "  {} skills selected across {} categories (limit {})",
        stats.final_technical_skills,
        stats.final_skill_categories,
        result.skill_selection_log.overall_skill_limit
    );
    for (category, skills) in &result.final_technical_skills {
        println!("  {}: {}", category.bold(), skills.join(", "));
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(max_chars).collect();
        format!("{}...", prefix)
    }
}
