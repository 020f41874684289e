//! CLI interface for the resume tailor

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "resume-tailor")]
#[command(about = "Semantic keyword-to-resume matching and skill selection")]
#[command(long_about = "Match job-description keywords to resume bullet points with embeddings \
and select the strongest technical skills under a global budget")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match job-description keywords against a resume
    Match {
        /// Path to extracted keywords JSON file
        #[arg(short, long)]
        keywords: PathBuf,

        /// Path to parsed resume JSON file
        #[arg(short, long)]
        resume: PathBuf,

        /// Similarity threshold for keyword-to-bullet matches (0-1)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Minimum relevance for JD hard skills entering the skills section (0-1)
        #[arg(long)]
        relevance: Option<f32>,

        /// Target total number of technical skills
        #[arg(long)]
        skill_limit: Option<usize>,

        /// Cap how often one keyword may be recommended across bullets
        #[arg(long)]
        limit_keyword_usage: bool,

        /// Save results to a JSON file
        #[arg(short, long)]
        save: Option<PathBuf>,

        /// Print the full result as JSON instead of a console summary
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Print the configuration file path
    Path,
}

/// Validate that a threshold-like argument is within [0, 1].
pub fn validate_unit_interval(name: &str, value: f32) -> Result<(), String> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("{} must be between 0.0 and 1.0, got {}", name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_unit_interval() {
        assert!(validate_unit_interval("threshold", 0.0).is_ok());
        assert!(validate_unit_interval("threshold", 0.75).is_ok());
        assert!(validate_unit_interval("threshold", 1.0).is_ok());
        assert!(validate_unit_interval("threshold", -0.1).is_err());
        assert!(validate_unit_interval("threshold", 1.5).is_err());
    }
}
