//! BLAKE3 hashing for cache point ids and sparse term indices.

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// # Truncation Rationale
///
/// 64 bits is plenty for the two places this is used:
///
/// - **Cache point ids**: a collision overwrites an unrelated cache entry,
///   which downgrades to a cache miss on the next lookup. No data is served
///   incorrectly because lookups verify similarity against the stored vector.
/// - **Deduplication keys**: a false merge costs one candidate, never
///   correctness.
///
/// With the birthday bound at ~4.3 billion entries, practical cache sizes
/// (millions) see negligible collision probability. Nothing here is used for
/// cryptographic verification.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Content-addressed point id for a semantic cache entry.
///
/// Derived from the query text alone so that re-answering the same query
/// upserts over the previous entry instead of accumulating duplicates.
#[inline]
pub fn cache_point_id(query: &str) -> u64 {
    hash_to_u64(query.as_bytes())
}

/// 32-bit index for a sparse (BM25-like) query term.
///
/// Qdrant sparse vectors address dimensions with u32 indices; hashing the
/// term into that space keeps the query side vocabulary-free. The indexing
/// pipeline must use the same function for term dimensions to line up.
#[inline]
pub fn hash_term_u32(term: &str) -> u32 {
    let hash = blake3::hash(term.as_bytes());
    let bytes: [u8; 4] = hash.as_bytes()[0..4]
        .try_into()
        .expect("BLAKE3 always produces at least 4 bytes");
    u32::from_le_bytes(bytes)
}
