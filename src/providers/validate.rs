//! Input validation shared by every provider.

use super::ProviderError;
use crate::models::{ChunkParams, SearchParams, MAX_K, MIN_K};

/// Validate search parameters
pub fn validate_search(params: &SearchParams) -> Result<(), ProviderError> {
    if params.query.is_empty() {
        return Err(ProviderError::Validation(
            "Query cannot be empty".to_string(),
        ));
    }
    if !(MIN_K..=MAX_K).contains(&params.k) {
        return Err(ProviderError::Validation(format!(
            "k must be between {} and {}",
            MIN_K, MAX_K
        )));
    }
    Ok(())
}

/// Validate chunk lookup parameters
pub fn validate_chunk(params: &ChunkParams) -> Result<(), ProviderError> {
    if params.chunk_id.is_empty() {
        return Err(ProviderError::Validation(
            "Chunk ID cannot be empty".to_string(),
        ));
    }
    Ok(())
}
