//! Deterministic feature-hashing embedder.
//!
//! Maps each lowercased token to a bucket via FNV-1a, with a second hash bit
//! choosing the sign, then L2-normalizes the accumulated vector. Texts
//! sharing tokens land near each other; unrelated texts are close to
//! orthogonal. Not a substitute for a learned model, but a pure function of
//! its input, which is all the memory manager requires.

use anyhow::Result;

use super::EmbeddingProvider;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Feature-hashing embedding provider with a configurable dimension.
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dimensions: usize) -> Result<Self> {
        anyhow::ensure!(dimensions > 0, "embedding dimension must be positive");
        Ok(Self { dimensions })
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dimensions];

        for token in tokenize(text) {
            let h = fnv1a(token.as_bytes());
            let bucket = (h % self.dimensions as u64) as usize;
            // Low bit of a second-round hash picks the sign, spreading
            // collisions instead of always accumulating positively.
            let sign = if fnv1a(&h.to_le_bytes()) & 1 == 0 {
                1.0
            } else {
                -1.0
            };
            v[bucket] += sign;
        }

        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Lowercased alphanumeric tokens.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_deterministic() {
        let provider = HashEmbeddingProvider::new(384).unwrap();
        let a = provider.embed("the cat sat on the mat").unwrap();
        let b = provider.embed("the cat sat on the mat").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn embedding_has_configured_dimension() {
        let provider = HashEmbeddingProvider::new(128).unwrap();
        let v = provider.embed("hello world").unwrap();
        assert_eq!(v.len(), 128);
        assert_eq!(provider.dimensions(), 128);
    }

    #[test]
    fn embedding_is_normalized() {
        let provider = HashEmbeddingProvider::new(384).unwrap();
        let v = provider.embed("quarterly revenue grew twelve percent").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn overlapping_texts_are_closer_than_disjoint() {
        let provider = HashEmbeddingProvider::new(384).unwrap();
        let cat = provider.embed("the cat sat on the mat").unwrap();
        let cat_query = provider.embed("cat on a mat").unwrap();
        let revenue = provider.embed("quarterly revenue grew").unwrap();

        let dot = |a: &[f32], b: &[f32]| -> f32 {
            a.iter().zip(b).map(|(x, y)| x * y).sum()
        };
        assert!(dot(&cat, &cat_query) > dot(&cat, &revenue));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let provider = HashEmbeddingProvider::new(64).unwrap();
        let v = provider.embed("").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn zero_dimension_rejected() {
        assert!(HashEmbeddingProvider::new(0).is_err());
    }
}
