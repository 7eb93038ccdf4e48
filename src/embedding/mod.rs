//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait, a local implementation using
//! all-MiniLM-L6-v2 (384 dimensions, L2-normalized), and the
//! [`EmbeddingResolver`] that lazily initializes a shared provider.

pub mod local;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::config::EmbeddingConfig;
use crate::error::JournalError;

/// Number of dimensions in the embedding vectors (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Trait for embedding text into vectors.
///
/// Implementations produce fixed-length vectors; the model's internals are
/// irrelevant to the rest of the crate. All methods are synchronous —
/// callers in async contexts should use `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for
    /// batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Create an embedding provider from config.
///
/// Currently only `"local"` is supported (ONNX Runtime + all-MiniLM-L6-v2).
/// Returns an error if model files are not found — run `quill model download`
/// first.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => {
            let provider = local::LocalEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local"),
    }
}

enum ResolverState {
    Uninitialized,
    Ready(Arc<dyn EmbeddingProvider>),
    Failed(String),
}

/// Lazily-initialized shared access to the embedding provider.
///
/// The first caller triggers initialization; callers that arrive during
/// initialization wait on the same lock and observe its outcome. A failed
/// initialization is sticky — every subsequent call returns the same error
/// until [`reset`](Self::reset) is invoked.
pub struct EmbeddingResolver {
    config: EmbeddingConfig,
    state: Mutex<ResolverState>,
}

impl EmbeddingResolver {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ResolverState::Uninitialized),
        }
    }

    /// Build a resolver that is already `Ready` with the given provider.
    /// Used by tests and anywhere a provider is constructed eagerly.
    pub fn with_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            config: EmbeddingConfig::default(),
            state: Mutex::new(ResolverState::Ready(provider)),
        }
    }

    /// Resolve the shared provider, initializing it on first use.
    pub async fn get(&self) -> Result<Arc<dyn EmbeddingProvider>, JournalError> {
        let mut state = self.state.lock().await;
        match &*state {
            ResolverState::Ready(provider) => Ok(Arc::clone(provider)),
            ResolverState::Failed(message) => Err(JournalError::Derivation(message.clone())),
            ResolverState::Uninitialized => {
                let config = self.config.clone();
                let result = tokio::task::spawn_blocking(move || create_provider(&config))
                    .await
                    .map_err(|e| JournalError::Derivation(format!("init task failed: {e}")))?;
                match result {
                    Ok(provider) => {
                        let provider: Arc<dyn EmbeddingProvider> = Arc::from(provider);
                        *state = ResolverState::Ready(Arc::clone(&provider));
                        Ok(provider)
                    }
                    Err(e) => {
                        let message = e.to_string();
                        *state = ResolverState::Failed(message.clone());
                        Err(JournalError::Derivation(message))
                    }
                }
            }
        }
    }

    /// Clear a sticky failure (or a ready provider) so the next call
    /// re-initializes from scratch.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = ResolverState::Uninitialized;
    }

    /// Embed a single text on the blocking pool.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, JournalError> {
        let provider = self.get().await?;
        let text = text.to_string();
        tokio::task::spawn_blocking(move || provider.embed(&text))
            .await
            .map_err(|e| JournalError::Derivation(format!("embed task failed: {e}")))?
            .map_err(|e| JournalError::Derivation(e.to_string()))
    }
}
