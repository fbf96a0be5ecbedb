//! Text embedding collaborator and helpers.
//!
//! The engine only needs `embed(text) -> vector` with a fixed dimensionality
//! per encoder instance. `HashingEmbedder` is a deterministic stand-in that
//! needs no model download; `FastEmbedEncoder` (feature `fastembed`) wraps a
//! real sentence encoder.

use crate::error::EngineError;
use anyhow::Result;

pub type Embedding = Vec<f32>;

pub trait Embedder: Send + Sync {
    /// Output dimensionality; constant for the lifetime of the encoder.
    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Embedding>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Euclidean distance between two vectors of equal length.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32, EngineError> {
    if a.len() != b.len() {
        return Err(EngineError::dimension_mismatch(
            "euclidean distance",
            a.len(),
            b.len(),
        ));
    }
    Ok(a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt())
}

/// Split a long message into word windows of at most `max_words` words.
///
/// Messages that fit in one window produce no chunks; the main embedding
/// already covers them. `max_words == 0` disables chunking.
pub fn chunk_message(text: &str, max_words: usize) -> Vec<String> {
    if max_words == 0 {
        return Vec::new();
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return Vec::new();
    }
    words.chunks(max_words).map(|w| w.join(" ")).collect()
}

/// Embed a message and, when it is long enough, each of its chunks.
pub fn embed_with_chunks(
    embedder: &dyn Embedder,
    text: &str,
    max_words: usize,
) -> Result<(Embedding, Option<Vec<Embedding>>)> {
    let main = embedder.embed(text)?;
    let chunks = chunk_message(text, max_words);
    if chunks.is_empty() {
        return Ok((main, None));
    }
    let chunked = embedder.embed_batch(&chunks)?;
    Ok((main, Some(chunked)))
}

// ============================================================================
// Hashing encoder
// ============================================================================

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |h, b| (h ^ *b as u64).wrapping_mul(FNV_PRIME))
}

/// Signed feature-hashing bag-of-words encoder, L2-normalised.
///
/// Identical text (up to case and punctuation) maps to the identical vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Result<Self, EngineError> {
        if dimensions == 0 {
            return Err(EngineError::config("embedding dimensions must be > 0"));
        }
        Ok(Self { dimensions })
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dimensions: 64 }
    }
}

impl Embedder for HashingEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut v = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        let tokens = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty());
        for token in tokens {
            let h = fnv1a(token.as_bytes());
            let bucket = (h % self.dimensions as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(v)
    }
}

// ============================================================================
// FastEmbed encoder
// ============================================================================

#[cfg(feature = "fastembed")]
pub use self::fast::FastEmbedEncoder;

#[cfg(feature = "fastembed")]
mod fast {
    use super::{Embedder, Embedding};
    use anyhow::Result;
    use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
    use std::sync::Arc;

    /// all-MiniLM-L6-v2 output width.
    const MINILM_DIMENSIONS: usize = 384;

    #[derive(Clone)]
    pub struct FastEmbedEncoder {
        model: Arc<TextEmbedding>,
    }

    impl FastEmbedEncoder {
        pub fn new() -> Result<Self> {
            let mut options = InitOptions::default();
            options.model_name = FastEmbedModel::AllMiniLML6V2;
            options.show_download_progress = true;

            let model = TextEmbedding::try_new(options)?;
            Ok(Self {
                model: Arc::new(model),
            })
        }
    }

    impl Embedder for FastEmbedEncoder {
        fn dimensions(&self) -> usize {
            MINILM_DIMENSIONS
        }

        fn embed(&self, text: &str) -> Result<Embedding> {
            let embeddings = self.model.embed(vec![text], None)?;
            embeddings
                .into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("Failed to generate embedding"))
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
            Ok(self.model.embed(texts.to_vec(), None)?)
        }
    }
}
