//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait and a built-in feature-hashing
//! implementation. The provider is created via [`create_provider`] from
//! configuration. Model-backed providers (ONNX, remote APIs) plug in behind
//! the same trait; the memory manager only requires that `embed` behaves as a
//! pure function of its input and produces vectors of a fixed dimension.

pub mod hash;

use anyhow::Result;

/// Trait for embedding text into vectors.
///
/// Implementations produce vectors of exactly [`dimensions`](Self::dimensions)
/// entries for the lifetime of the index — changing the dimension invalidates
/// every stored vector. `embed` must be deterministic: search correctness is
/// only meaningful when identical text always maps to the same vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize;
}

/// Create an embedding provider from config.
///
/// Currently only `"hash"` is supported (deterministic feature hashing, no
/// model files or network access required).
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hash" => {
            let provider = hash::HashEmbeddingProvider::new(config.dimensions)?;
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: hash"),
    }
}
