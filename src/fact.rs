//! Fact types - durable statements remembered by an agent
//!
//! A fact is either:
//! - **Live** (`superseded_by = None`): eligible for recall and listing
//! - **Superseded** (`superseded_by = Some(id)`): replaced by a newer fact,
//!   kept for history until a retention sweep removes it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of hex characters of the digest kept as the dedup key.
pub const CONTENT_HASH_LEN: usize = 16;

/// Deduplication key for fact content.
///
/// Case and surrounding whitespace are normalized away, so
/// `"  Paris "` and `"paris"` collide.
pub fn content_hash(content: &str) -> String {
    let normalized = content.trim().to_lowercase();
    let digest = blake3::hash(normalized.as_bytes()).to_hex();
    digest.as_str()[..CONTENT_HASH_LEN].to_string()
}

/// A remembered statement with provenance and access metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub id: i64,
    pub content: String,
    pub tags: Vec<String>,
    /// Expected in `[0, 1]`, not enforced
    pub confidence: f64,
    /// Optional link into the entity registry (dangling links are tolerated)
    pub entity_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    pub access_count: u32,
    pub superseded_by: Option<i64>,
    pub content_hash: String,
}

impl Fact {
    /// Check if this fact is still eligible for recall
    pub fn is_live(&self) -> bool {
        self.superseded_by.is_none()
    }

    /// Check if this fact has been replaced by a newer one
    pub fn is_superseded(&self) -> bool {
        self.superseded_by.is_some()
    }
}

/// Recall result with its full-text rank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactMatch {
    pub fact: Fact,
    /// BM25 rank; lower is a stronger match
    pub rank: f64,
}

impl FactMatch {
    pub fn new(fact: Fact, rank: f64) -> Self {
        Self { fact, rank }
    }
}

/// Optional attributes for `remember` and `supersede`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RememberOptions {
    pub tags: Vec<String>,
    pub confidence: f64,
    pub entity: Option<String>,
}

impl Default for RememberOptions {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            confidence: 1.0,
            entity: None,
        }
    }
}

impl RememberOptions {
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

/// Options for listing facts without a search query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub include_superseded: bool,
    pub limit: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            include_superseded: false,
            limit: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_normalizes_case_and_whitespace() {
        let a = content_hash("Paris is the capital of France");
        let b = content_hash("   paris IS the capital of france\n");
        assert_eq!(a, b);
        assert_eq!(a.len(), CONTENT_HASH_LEN);
    }

    #[test]
    fn test_hash_distinguishes_content() {
        assert_ne!(content_hash("alpha"), content_hash("beta"));
        // Inner whitespace is significant
        assert_ne!(content_hash("a b"), content_hash("a  b"));
    }

    #[test]
    fn test_remember_options_builder() {
        let opts = RememberOptions::default()
            .with_tags(["geo", "europe"])
            .with_confidence(0.5)
            .with_entity("france");

        assert_eq!(opts.tags, vec!["geo".to_string(), "europe".to_string()]);
        assert_eq!(opts.confidence, 0.5);
        assert_eq!(opts.entity.as_deref(), Some("france"));
    }
}
