//! Configuration management
//!
//! Scalar knobs from environment variables; the keyword/regex tables live in
//! `rules` and reload separately.

use crate::intent::IntentConfig;
use crate::pipeline::PipelineConfig;
use crate::recheck::RecheckConfig;
use crate::tone::ToneConfig;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Anthropic API key (optional - without it classification is rules-only)
    pub anthropic_api_key: Option<String>,

    /// Model used for classification calls
    pub llm_model: String,

    /// Optional rules JSON to load at startup
    pub rules_path: Option<PathBuf>,

    /// Per-stage LLM timeout in milliseconds
    pub stage_timeout_ms: u64,

    /// LLM verdicts below this confidence fall back to keywords
    pub min_llm_confidence: u8,

    /// Search-intent cache TTL in seconds
    pub intent_cache_ttl_secs: u64,
    pub intent_cache_capacity: usize,

    /// Tone cache TTL in seconds and its force-refresh message bound
    pub tone_cache_ttl_secs: u64,
    pub tone_refresh_after: u32,

    /// Recheck slot TTL in seconds (generous - hours, not minutes)
    pub recheck_ttl_secs: u64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        let llm_model = std::env::var("SAATHI_LLM_MODEL")
            .unwrap_or_else(|_| "claude-3-5-haiku-20241022".to_string());
        let rules_path = std::env::var("SAATHI_RULES_PATH").ok().map(PathBuf::from);

        Ok(Self {
            anthropic_api_key,
            llm_model,
            rules_path,
            stage_timeout_ms: env_parse("SAATHI_STAGE_TIMEOUT_MS", 2_500),
            min_llm_confidence: env_parse("SAATHI_MIN_LLM_CONFIDENCE", 50),
            intent_cache_ttl_secs: env_parse("SAATHI_INTENT_CACHE_TTL", 300),
            intent_cache_capacity: env_parse("SAATHI_INTENT_CACHE_CAPACITY", 1_000),
            tone_cache_ttl_secs: env_parse("SAATHI_TONE_CACHE_TTL", 600),
            tone_refresh_after: env_parse("SAATHI_TONE_REFRESH_AFTER", 10),
            recheck_ttl_secs: env_parse("SAATHI_RECHECK_TTL", 6 * 60 * 60),
        })
    }

    pub fn intent_config(&self) -> IntentConfig {
        IntentConfig {
            llm_timeout_ms: self.stage_timeout_ms,
            min_llm_confidence: self.min_llm_confidence,
            cache_ttl: Duration::from_secs(self.intent_cache_ttl_secs),
            cache_capacity: self.intent_cache_capacity,
            ..IntentConfig::default()
        }
    }

    pub fn tone_config(&self) -> ToneConfig {
        ToneConfig {
            llm_timeout_ms: self.stage_timeout_ms.min(2_000),
            refresh_after_messages: self.tone_refresh_after,
            cache_ttl: Duration::from_secs(self.tone_cache_ttl_secs),
            ..ToneConfig::default()
        }
    }

    pub fn recheck_config(&self) -> RecheckConfig {
        RecheckConfig {
            slot_ttl: Duration::from_secs(self.recheck_ttl_secs),
            ..RecheckConfig::default()
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.min_llm_confidence, 50);
        assert!(config.recheck_ttl_secs >= 60 * 60);
    }
}
