//! Pluggable generation backend.

pub use crate::error::GenerationError;

/// A language-model backend that turns a prompt into message text.
///
/// The enrichment job treats implementations as a black box: plain text
/// back, or one of the two failure classes. Swapping providers never
/// touches the orchestrator.
pub trait MessageGenerator: Send + Sync {
    /// Generate text for `prompt`, bounded to roughly `max_tokens` of output.
    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError>;

    /// Generator display name (for logs).
    fn name(&self) -> &str;
}
