//! Environment configuration.
//!
//! One flat record covering every tunable of the workflow, loaded from
//! `TRAWL_*` variables with per-field parse helpers. Subsystem config
//! structs are derived from it via the `*_config()` methods so the engine
//! wires nodes without re-reading the environment.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::analyze::AnalyzerConfig;
use crate::cache::CacheConfig;
use crate::constants::{
    DEFAULT_CACHE_SIMILARITY_THRESHOLD, DEFAULT_CACHE_TTL_SECONDS, DEFAULT_CANDIDATES_PER_PROBE,
    DEFAULT_FUSION_TOP_N, DEFAULT_HIGH_QUALITY_MIN, DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_COVERAGE,
    DEFAULT_RRF_K, DEFAULT_SUFFICIENCY_THRESHOLD,
};
use crate::enrich::EnricherConfig;
use crate::rerank::RerankStageConfig;
use crate::retrieve::RetrieverConfig;
use crate::workflow::SufficiencyConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub qdrant_url: String,

    pub chunk_collection: String,

    pub cache_enabled: bool,

    pub cache_similarity_threshold: f32,

    pub cache_ttl_seconds: u64,

    pub cache_collection: String,

    pub candidates_per_probe: u64,

    pub probe_timeout_ms: u64,

    pub max_concurrent_probes: usize,

    pub rrf_k: f32,

    pub fusion_top_n: usize,

    pub rerank_batch_size: usize,

    pub rerank_timeout_ms: u64,

    pub sufficiency_threshold: f32,

    pub high_quality_min: f32,

    pub min_coverage: usize,

    pub max_iterations: u32,

    pub request_deadline_ms: u64,

    pub embed_timeout_ms: u64,

    pub llm_timeout_ms: u64,

    pub metadata_timeout_ms: u64,

    pub acl_timeout_ms: u64,
}

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            chunk_collection: crate::vectordb::DEFAULT_CHUNK_COLLECTION.to_string(),
            cache_enabled: true,
            cache_similarity_threshold: DEFAULT_CACHE_SIMILARITY_THRESHOLD,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            cache_collection: crate::vectordb::DEFAULT_CACHE_COLLECTION.to_string(),
            candidates_per_probe: DEFAULT_CANDIDATES_PER_PROBE,
            probe_timeout_ms: 800,
            max_concurrent_probes: 4,
            rrf_k: DEFAULT_RRF_K,
            fusion_top_n: DEFAULT_FUSION_TOP_N,
            rerank_batch_size: 100,
            rerank_timeout_ms: 30_000,
            sufficiency_threshold: DEFAULT_SUFFICIENCY_THRESHOLD,
            high_quality_min: DEFAULT_HIGH_QUALITY_MIN,
            min_coverage: DEFAULT_MIN_COVERAGE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            request_deadline_ms: 5_000,
            embed_timeout_ms: 500,
            llm_timeout_ms: 2_000,
            metadata_timeout_ms: 500,
            acl_timeout_ms: 300,
        }
    }
}

impl Config {
    const ENV_QDRANT_URL: &'static str = "TRAWL_QDRANT_URL";
    const ENV_CHUNK_COLLECTION: &'static str = "TRAWL_CHUNK_COLLECTION";
    const ENV_CACHE_ENABLED: &'static str = "TRAWL_CACHE_ENABLED";
    const ENV_CACHE_SIMILARITY_THRESHOLD: &'static str = "TRAWL_CACHE_SIMILARITY_THRESHOLD";
    const ENV_CACHE_TTL_SECONDS: &'static str = "TRAWL_CACHE_TTL_SECONDS";
    const ENV_CACHE_COLLECTION: &'static str = "TRAWL_CACHE_COLLECTION";
    const ENV_CANDIDATES_PER_PROBE: &'static str = "TRAWL_CANDIDATES_PER_PROBE";
    const ENV_PROBE_TIMEOUT_MS: &'static str = "TRAWL_PROBE_TIMEOUT_MS";
    const ENV_MAX_CONCURRENT_PROBES: &'static str = "TRAWL_MAX_CONCURRENT_PROBES";
    const ENV_RRF_K: &'static str = "TRAWL_RRF_K";
    const ENV_FUSION_TOP_N: &'static str = "TRAWL_FUSION_TOP_N";
    const ENV_RERANK_BATCH_SIZE: &'static str = "TRAWL_RERANK_BATCH_SIZE";
    const ENV_RERANK_TIMEOUT_MS: &'static str = "TRAWL_RERANK_TIMEOUT_MS";
    const ENV_SUFFICIENCY_THRESHOLD: &'static str = "TRAWL_SUFFICIENCY_THRESHOLD";
    const ENV_HIGH_QUALITY_MIN: &'static str = "TRAWL_HIGH_QUALITY_MIN";
    const ENV_MIN_COVERAGE: &'static str = "TRAWL_MIN_COVERAGE";
    const ENV_MAX_ITERATIONS: &'static str = "TRAWL_MAX_ITERATIONS";
    const ENV_REQUEST_DEADLINE_MS: &'static str = "TRAWL_REQUEST_DEADLINE_MS";
    const ENV_EMBED_TIMEOUT_MS: &'static str = "TRAWL_EMBED_TIMEOUT_MS";
    const ENV_LLM_TIMEOUT_MS: &'static str = "TRAWL_LLM_TIMEOUT_MS";
    const ENV_METADATA_TIMEOUT_MS: &'static str = "TRAWL_METADATA_TIMEOUT_MS";
    const ENV_ACL_TIMEOUT_MS: &'static str = "TRAWL_ACL_TIMEOUT_MS";

    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            qdrant_url: string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url),
            chunk_collection: string_from_env(Self::ENV_CHUNK_COLLECTION, defaults.chunk_collection),
            cache_enabled: parse_from_env(Self::ENV_CACHE_ENABLED, defaults.cache_enabled)?,
            cache_similarity_threshold: parse_from_env(
                Self::ENV_CACHE_SIMILARITY_THRESHOLD,
                defaults.cache_similarity_threshold,
            )?,
            cache_ttl_seconds: parse_from_env(
                Self::ENV_CACHE_TTL_SECONDS,
                defaults.cache_ttl_seconds,
            )?,
            cache_collection: string_from_env(Self::ENV_CACHE_COLLECTION, defaults.cache_collection),
            candidates_per_probe: parse_from_env(
                Self::ENV_CANDIDATES_PER_PROBE,
                defaults.candidates_per_probe,
            )?,
            probe_timeout_ms: parse_from_env(Self::ENV_PROBE_TIMEOUT_MS, defaults.probe_timeout_ms)?,
            max_concurrent_probes: parse_from_env(
                Self::ENV_MAX_CONCURRENT_PROBES,
                defaults.max_concurrent_probes,
            )?,
            rrf_k: parse_from_env(Self::ENV_RRF_K, defaults.rrf_k)?,
            fusion_top_n: parse_from_env(Self::ENV_FUSION_TOP_N, defaults.fusion_top_n)?,
            rerank_batch_size: parse_from_env(
                Self::ENV_RERANK_BATCH_SIZE,
                defaults.rerank_batch_size,
            )?,
            rerank_timeout_ms: parse_from_env(
                Self::ENV_RERANK_TIMEOUT_MS,
                defaults.rerank_timeout_ms,
            )?,
            sufficiency_threshold: parse_from_env(
                Self::ENV_SUFFICIENCY_THRESHOLD,
                defaults.sufficiency_threshold,
            )?,
            high_quality_min: parse_from_env(Self::ENV_HIGH_QUALITY_MIN, defaults.high_quality_min)?,
            min_coverage: parse_from_env(Self::ENV_MIN_COVERAGE, defaults.min_coverage)?,
            max_iterations: parse_from_env(Self::ENV_MAX_ITERATIONS, defaults.max_iterations)?,
            request_deadline_ms: parse_from_env(
                Self::ENV_REQUEST_DEADLINE_MS,
                defaults.request_deadline_ms,
            )?,
            embed_timeout_ms: parse_from_env(Self::ENV_EMBED_TIMEOUT_MS, defaults.embed_timeout_ms)?,
            llm_timeout_ms: parse_from_env(Self::ENV_LLM_TIMEOUT_MS, defaults.llm_timeout_ms)?,
            metadata_timeout_ms: parse_from_env(
                Self::ENV_METADATA_TIMEOUT_MS,
                defaults.metadata_timeout_ms,
            )?,
            acl_timeout_ms: parse_from_env(Self::ENV_ACL_TIMEOUT_MS, defaults.acl_timeout_ms)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.cache_similarity_threshold)
            || self.cache_similarity_threshold == 0.0
        {
            return Err(ConfigError::OutOfRange {
                key: Self::ENV_CACHE_SIMILARITY_THRESHOLD,
                reason: "must be in (0, 1]".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.sufficiency_threshold) {
            return Err(ConfigError::OutOfRange {
                key: Self::ENV_SUFFICIENCY_THRESHOLD,
                reason: "must be in [0, 1]".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.high_quality_min) {
            return Err(ConfigError::OutOfRange {
                key: Self::ENV_HIGH_QUALITY_MIN,
                reason: "must be in [0, 1]".to_string(),
            });
        }
        if self.rrf_k <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: Self::ENV_RRF_K,
                reason: "must be positive".to_string(),
            });
        }
        if self.candidates_per_probe == 0 {
            return Err(ConfigError::OutOfRange {
                key: Self::ENV_CANDIDATES_PER_PROBE,
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_concurrent_probes == 0 {
            return Err(ConfigError::OutOfRange {
                key: Self::ENV_MAX_CONCURRENT_PROBES,
                reason: "must be at least 1".to_string(),
            });
        }
        if self.fusion_top_n == 0 {
            return Err(ConfigError::OutOfRange {
                key: Self::ENV_FUSION_TOP_N,
                reason: "must be at least 1".to_string(),
            });
        }
        if self.rerank_batch_size == 0 {
            return Err(ConfigError::OutOfRange {
                key: Self::ENV_RERANK_BATCH_SIZE,
                reason: "must be at least 1".to_string(),
            });
        }
        if self.request_deadline_ms == 0 {
            return Err(ConfigError::OutOfRange {
                key: Self::ENV_REQUEST_DEADLINE_MS,
                reason: "must be non-zero".to_string(),
            });
        }
        if self.cache_ttl_seconds == 0 {
            return Err(ConfigError::OutOfRange {
                key: Self::ENV_CACHE_TTL_SECONDS,
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            enabled: self.cache_enabled,
            similarity_threshold: self.cache_similarity_threshold,
            ttl: Duration::from_secs(self.cache_ttl_seconds),
            collection_name: self.cache_collection.clone(),
            acl_timeout: Duration::from_millis(self.acl_timeout_ms),
        }
    }

    pub fn retriever_config(&self) -> RetrieverConfig {
        RetrieverConfig {
            chunk_collection: self.chunk_collection.clone(),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            max_concurrent_probes: self.max_concurrent_probes,
        }
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            embed_timeout: Duration::from_millis(self.embed_timeout_ms),
            llm_timeout: Duration::from_millis(self.llm_timeout_ms),
            ..Default::default()
        }
    }

    pub fn rerank_stage_config(&self) -> RerankStageConfig {
        RerankStageConfig {
            batch_size: self.rerank_batch_size,
            timeout: Duration::from_millis(self.rerank_timeout_ms),
        }
    }

    pub fn enricher_config(&self) -> EnricherConfig {
        EnricherConfig {
            fetch_timeout: Duration::from_millis(self.metadata_timeout_ms),
        }
    }

    pub fn sufficiency_config(&self) -> SufficiencyConfig {
        SufficiencyConfig {
            threshold: self.sufficiency_threshold,
            high_quality_min: self.high_quality_min,
            min_coverage: self.min_coverage,
        }
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }

    pub fn acl_timeout(&self) -> Duration {
        Duration::from_millis(self.acl_timeout_ms)
    }
}

fn string_from_env(key: &'static str, default: String) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

fn parse_from_env<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            key,
            value,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
