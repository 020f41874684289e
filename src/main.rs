//! Resume tailor: semantic keyword-to-resume matching and skill selection

mod cli;
mod config;
mod error;
mod matching;
mod output;
mod pipeline;
mod providers;
mod skills;

use clap::Parser;
use cli::{Cli, Commands, ConfigAction};
use config::{Config, OutputFormat};
use error::{Result, ResumeTailorError};
use log::{error, info};
use matching::bullets;
use matching::keywords::KeywordsDocument;
use pipeline::{PipelineOptions, SemanticPipeline};
use providers::openai::OpenAiClient;
use std::path::Path;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    // Execute command
    if let Err(e) = run_command(cli.command, config).await {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Match {
            keywords,
            resume,
            threshold,
            relevance,
            skill_limit,
            limit_keyword_usage,
            save,
            json,
        } => {
            info!("Starting semantic matching run");

            let mut options = PipelineOptions::from(&config.matching);
            if let Some(threshold) = threshold {
                cli::validate_unit_interval("threshold", threshold)
                    .map_err(ResumeTailorError::InvalidInput)?;
                options.similarity_threshold = threshold;
            }
            if let Some(relevance) = relevance {
                cli::validate_unit_interval("relevance", relevance)
                    .map_err(ResumeTailorError::InvalidInput)?;
                options.relevance_threshold = relevance;
            }
            if let Some(skill_limit) = skill_limit {
                options.overall_skill_limit = skill_limit;
            }

            let keywords_data = load_keywords(&keywords)?;
            let resume_data = load_json(&resume)?;

            if !config.output.color_output {
                colored::control::set_override(false);
            }

            // The same client provides embeddings and categorization.
            let client = Arc::new(OpenAiClient::from_env(&config.provider)?);
            let tailor_pipeline = SemanticPipeline::new(client.clone(), client);

            let mut result = tailor_pipeline
                .process(&keywords_data, &resume_data, &options)
                .await?;

            if limit_keyword_usage {
                let (filtered, usage) = bullets::filter_keyword_usage(
                    &result.matches_by_bullet,
                    config.matching.max_keyword_usage,
                );
                info!(
                    "Keyword usage capped at {} ({} distinct keywords used)",
                    config.matching.max_keyword_usage,
                    usage.len()
                );
                result.matches_by_bullet = filtered;
            }

            match (json, &config.output.format) {
                (true, _) | (false, OutputFormat::Json) => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                (false, OutputFormat::Console) => output::report::print_summary(&result),
            }

            if let Some(save_path) = save {
                output::report::save_results(&result, &save_path)?;
            }

            Ok(())
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let content = toml::to_string_pretty(&config).map_err(|e| {
                    ResumeTailorError::Configuration(format!("Failed to serialize config: {}", e))
                })?;
                println!("{}", content);
                Ok(())
            }
            ConfigAction::Reset => {
                let defaults = Config::default();
                defaults.save()?;
                println!("Configuration reset to defaults");
                Ok(())
            }
            ConfigAction::Path => {
                println!("{}", Config::config_path().display());
                Ok(())
            }
        },
    }
}

fn load_keywords(path: &Path) -> Result<KeywordsDocument> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        ResumeTailorError::InvalidInput(format!(
            "Failed to parse keywords file {}: {}",
            path.display(),
            e
        ))
    })
}

fn load_json(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        ResumeTailorError::InvalidInput(format!(
            "Failed to parse JSON file {}: {}",
            path.display(),
            e
        ))
    })
}
