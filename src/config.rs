//! Configuration management for the resume tailor

use crate::error::{Result, ResumeTailorError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub provider: ProviderConfig,
    pub matching: MatchingConfig,
    pub output: OutputConfig,
}

/// Settings for the remote embedding/categorization provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_base: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
}

/// Default thresholds and limits for the matching pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum cosine similarity for a keyword-to-bullet match.
    pub similarity_threshold: f32,
    /// Minimum relevance score for a JD hard skill to reach the skills section.
    pub relevance_threshold: f32,
    /// Target total number of technical skills after selection.
    pub overall_skill_limit: usize,
    /// Maximum times one keyword may be recommended across all bullets.
    pub max_keyword_usage: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color_output: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig {
                api_base: "https://api.openai.com/v1".to_string(),
                embedding_model: "text-embedding-ada-002".to_string(),
                generation_model: "gpt-3.5-turbo".to_string(),
                request_timeout_secs: 30,
                max_retries: 3,
            },
            matching: MatchingConfig {
                similarity_threshold: 0.75,
                relevance_threshold: 0.6,
                overall_skill_limit: 15,
                max_keyword_usage: 2,
            },
            output: OutputConfig {
                format: OutputFormat::Console,
                color_output: true,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| ResumeTailorError::Configuration(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ResumeTailorError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("resume-tailor")
            .join("config.toml")
    }
}
