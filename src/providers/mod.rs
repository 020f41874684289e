//! External embedding and categorization providers
//! The pipeline depends only on these narrow traits; tests use in-memory fakes.

pub mod openai;

use crate::error::Result;
use async_trait::async_trait;

/// Turns a text string into a fixed-length embedding vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text. Callers treat a failure as
    /// skippable: the offending item is dropped, the pipeline continues.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Identifier of the model behind this provider, for logging.
    fn model_id(&self) -> &str;
}

/// Assigns a skill to one of the given categories, or proposes a new one.
#[async_trait]
pub trait CategoryProvider: Send + Sync {
    /// Returns an existing category name from `categories`, or a response in
    /// the form `"New Category: <name>"`.
    async fn categorize_skill(
        &self,
        skill: &str,
        context: &str,
        categories: &[String],
    ) -> Result<String>;
}
