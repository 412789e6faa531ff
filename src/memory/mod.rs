pub mod manager;
pub mod stats;
pub mod store;
pub mod types;

use crate::error::{MemoryError, Result};

/// Encode an f32 embedding as little-endian bytes for BLOB storage.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Decode a stored BLOB back into an f32 embedding.
pub fn bytes_to_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(MemoryError::Decode(format!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_bytes_round_trip() {
        let v = vec![0.0f32, 1.5, -2.25, 1e-7];
        let bytes = embedding_to_bytes(&v);
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), v);
    }

    #[test]
    fn truncated_blob_rejected() {
        assert!(bytes_to_embedding(&[0, 0, 0]).is_err());
    }
}
