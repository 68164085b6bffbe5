//! Content graph configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How `semantic_search` computes similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Fraction of query terms found as substrings of title and content
    #[default]
    Lexical,
    /// Cosine similarity between the query vector and stored embeddings
    Embedding,
    /// Mean of lexical and embedding similarity
    Hybrid,
}

impl std::str::FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lexical" => Ok(Self::Lexical),
            "embedding" => Ok(Self::Embedding),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(Error::Config(format!("unknown search mode: {}", other))),
        }
    }
}

/// Tuning knobs for ranking, traversal and snippets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Days until the recency factor decays to zero
    pub recency_window_days: f64,
    /// Connection count at which the connectivity factor saturates
    pub connectivity_saturation: usize,
    /// Characters kept before the first matching term
    pub snippet_before: usize,
    /// Characters kept from the first matching term onward
    pub snippet_after: usize,
    /// Characters kept when no term matches
    pub snippet_fallback: usize,
    pub default_search_limit: usize,
    pub default_max_depth: usize,
    pub search_mode: SearchMode,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            recency_window_days: 30.0,
            connectivity_saturation: 10,
            snippet_before: 50,
            snippet_after: 100,
            snippet_fallback: 150,
            default_search_limit: 10,
            default_max_depth: 2,
            search_mode: SearchMode::Lexical,
        }
    }
}

impl GraphConfig {
    /// Create configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            search_mode: std::env::var("RK_SEARCH_MODE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.search_mode),
            recency_window_days: std::env::var("RK_RECENCY_WINDOW_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.recency_window_days),
            ..defaults
        }
    }

    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// Check that every field is in range.
    pub fn validate(&self) -> Result<()> {
        if self.recency_window_days <= 0.0 {
            return Err(Error::Config("recency_window_days must be > 0".into()));
        }
        if self.connectivity_saturation == 0 {
            return Err(Error::Config("connectivity_saturation must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_mode_parse() {
        assert_eq!("Hybrid".parse::<SearchMode>().unwrap(), SearchMode::Hybrid);
        assert!("cosine".parse::<SearchMode>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = GraphConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search_mode, SearchMode::Lexical);
        assert_eq!(config.default_max_depth, 2);
    }

    #[test]
    fn test_zero_saturation_rejected() {
        let config = GraphConfig {
            connectivity_saturation: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
