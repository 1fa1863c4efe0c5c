//! Search-Intent Classifier
//!
//! Hybrid verdict with an explicit fallback chain: cache lookup, then an LLM
//! structured classification, then the keyword chain when the model fails,
//! times out or returns junk. Every result is written back to the cache, so
//! repeated inputs are O(1). Never returns an error.

use crate::cache::ExpiringCache;
use crate::llm::{CompletionOptions, LlmService};
use crate::parse::parse_llm_json;
use crate::patterns::PatternClassifier;
use crate::types::{Intent, ResultSource, SearchIntentResult, SearchType};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Tuning knobs for the classifier
#[derive(Debug, Clone)]
pub struct IntentConfig {
    pub llm_timeout_ms: u64,
    /// LLM verdicts below this confidence are discarded for the keyword chain
    pub min_llm_confidence: u8,
    /// Messages with fewer trimmed chars resolve to the default immediately
    pub near_empty_chars: usize,
    /// Cache keys are normalized text truncated to this many chars
    pub key_max_chars: usize,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            llm_timeout_ms: 2_500,
            min_llm_confidence: 50,
            near_empty_chars: 2,
            key_max_chars: 200,
            cache_ttl: Duration::from_secs(5 * 60),
            cache_capacity: 1_000,
        }
    }
}

/// Hybrid LLM/keyword search-intent classifier
#[derive(Clone)]
pub struct SearchIntentClassifier {
    llm: Option<Arc<dyn LlmService>>,
    patterns: PatternClassifier,
    cache: ExpiringCache<String, SearchIntentResult>,
    config: IntentConfig,
}

impl SearchIntentClassifier {
    pub fn new(
        llm: Option<Arc<dyn LlmService>>,
        patterns: PatternClassifier,
        config: IntentConfig,
    ) -> Self {
        let cache = ExpiringCache::new(config.cache_ttl, config.cache_capacity);
        Self {
            llm,
            patterns,
            cache,
            config,
        }
    }

    /// Lowercased, truncated message text; the cache key
    fn normalize_key(&self, text: &str) -> String {
        text.trim()
            .to_lowercase()
            .chars()
            .take(self.config.key_max_chars)
            .collect()
    }

    /// Classify one message. Infallible: the worst case is the low-confidence
    /// "no search" default.
    pub async fn classify(&self, user_id: &str, text: &str) -> SearchIntentResult {
        // Near-empty input never reaches the LLM
        if text.trim().chars().count() < self.config.near_empty_chars {
            return SearchIntentResult::no_search(10, ResultSource::Default);
        }

        let key = self.normalize_key(text);
        if let Some(mut hit) = self.cache.get(&key) {
            debug!("Search-intent cache hit for {:?}", key);
            hit.source = ResultSource::Cache;
            return hit;
        }

        let result = match &self.llm {
            Some(llm) => match self.classify_with_llm(llm.as_ref(), user_id, text).await {
                Some(verdict) if verdict.confidence >= self.config.min_llm_confidence => verdict,
                Some(verdict) => {
                    debug!(
                        "LLM verdict confidence {} below threshold, using keyword chain",
                        verdict.confidence
                    );
                    self.patterns.keyword_search_intent(text)
                }
                None => self.patterns.keyword_search_intent(text),
            },
            None => self.patterns.keyword_search_intent(text),
        };

        // Write-back regardless of source, so identical inputs stay cheap
        self.cache.set(key, result.clone());
        result
    }

    /// One structured classification call. Any transport error, timeout or
    /// parse failure returns None and the caller falls back.
    async fn classify_with_llm(
        &self,
        llm: &dyn LlmService,
        user_id: &str,
        text: &str,
    ) -> Option<SearchIntentResult> {
        let prompt = format!(
            r#"Decide whether this chat message needs a live external search. Reply with only a JSON object:
{{"intent": "greeting|gratitude|question|request|chitchat", "needs_search": true/false, "search_type": "local|web|news|shopping|knowledge|none", "query": "cleaned search query or null", "confidence": 0-100}}

Message: {}"#,
            text
        );
        let options = CompletionOptions {
            max_tokens: 150,
            temperature: 0.0,
            timeout_ms: self.config.llm_timeout_ms,
            user_id: user_id.to_string(),
        };

        let call = llm.generate_completion(&prompt, &options);
        let reply =
            match tokio::time::timeout(Duration::from_millis(self.config.llm_timeout_ms), call)
                .await
            {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => {
                    warn!("Search-intent LLM call failed: {}", e);
                    return None;
                }
                Err(_) => {
                    warn!("Search-intent LLM call timed out");
                    return None;
                }
            };

        let value = match parse_llm_json(&reply) {
            Ok(v) => v,
            Err(e) => {
                warn!("Unparseable search-intent verdict: {}", e);
                return None;
            }
        };

        // Schema validation: needs_search is required, the rest defaults
        let needs_search = value.get("needs_search")?.as_bool()?;
        let search_type = value
            .get("search_type")
            .and_then(|v| v.as_str())
            .and_then(SearchType::from_name)
            .unwrap_or(if needs_search {
                SearchType::Web
            } else {
                SearchType::None
            });
        let intent = value
            .get("intent")
            .and_then(|v| v.as_str())
            .and_then(Intent::from_name)
            .unwrap_or(Intent::Chitchat);
        let suggested_query = value
            .get("query")
            .and_then(|v| v.as_str())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && *s != "null")
            .map(|s| s.to_string());
        let confidence = value
            .get("confidence")
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
            .min(100) as u8;

        Some(SearchIntentResult {
            needs_search,
            search_type: if needs_search {
                search_type
            } else {
                SearchType::None
            },
            intent,
            suggested_query,
            confidence,
            source: ResultSource::Llm,
        })
    }

    /// Cache statistics, for observability endpoints
    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.cache.stats()
    }

    /// Start the background expiry sweep for the verdict cache
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        self.cache.spawn_sweeper(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum MockBehavior {
        Reply(String),
        Fail,
    }

    struct MockLlm {
        behavior: MockBehavior,
        calls: AtomicUsize,
    }

    impl MockLlm {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                behavior: MockBehavior::Reply(reply.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                behavior: MockBehavior::Fail,
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmService for MockLlm {
        async fn generate_completion(
            &self,
            _prompt: &str,
            _options: &CompletionOptions,
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                MockBehavior::Reply(r) => Ok(r.clone()),
                MockBehavior::Fail => anyhow::bail!("connection refused"),
            }
        }
    }

    fn classifier(llm: Option<Arc<dyn LlmService>>) -> SearchIntentClassifier {
        let patterns = PatternClassifier::new(RuleSet::new());
        SearchIntentClassifier::new(llm, patterns, IntentConfig::default())
    }

    #[tokio::test]
    async fn test_llm_verdict_used_when_confident() {
        let llm = MockLlm::replying(
            r#"{"intent": "request", "needs_search": true, "search_type": "local", "query": "pizza near andheri", "confidence": 90}"#,
        );
        let c = classifier(Some(llm.clone()));

        let r = c.classify("u1", "best pizza near andheri").await;
        assert!(r.needs_search);
        assert_eq!(r.search_type, SearchType::Local);
        assert_eq!(r.source, ResultSource::Llm);
        assert_eq!(r.suggested_query.as_deref(), Some("pizza near andheri"));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back_to_keywords() {
        let llm = MockLlm::failing();
        let c = classifier(Some(llm));

        let r = c.classify("u1", "good cafe near me").await;
        assert!(r.needs_search);
        assert_eq!(r.search_type, SearchType::Local);
        assert_eq!(r.source, ResultSource::KeywordFallback);
    }

    #[tokio::test]
    async fn test_garbage_output_falls_back() {
        let llm = MockLlm::replying("I think you probably want a search maybe?");
        let c = classifier(Some(llm));

        let r = c.classify("u1", "ipl score today").await;
        assert_eq!(r.source, ResultSource::KeywordFallback);
        assert_eq!(r.search_type, SearchType::News);
    }

    #[tokio::test]
    async fn test_low_confidence_falls_back() {
        let llm = MockLlm::replying(
            r#"{"intent": "question", "needs_search": true, "search_type": "web", "query": "x", "confidence": 20}"#,
        );
        let c = classifier(Some(llm));

        let r = c.classify("u1", "thank you so much").await;
        assert_eq!(r.source, ResultSource::KeywordFallback);
        assert!(!r.needs_search);
    }

    #[tokio::test]
    async fn test_fenced_verdict_parses() {
        let llm = MockLlm::replying(
            "```json\n{\"intent\": \"question\", \"needs_search\": true, \"search_type\": \"news\", \"query\": \"ipl score\", \"confidence\": 85}\n```",
        );
        let c = classifier(Some(llm));

        let r = c.classify("u1", "what is the ipl score").await;
        assert_eq!(r.source, ResultSource::Llm);
        assert_eq!(r.search_type, SearchType::News);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_llm() {
        let llm = MockLlm::replying(
            r#"{"intent": "question", "needs_search": true, "search_type": "web", "query": "q", "confidence": 80}"#,
        );
        let c = classifier(Some(llm.clone()));

        let first = c.classify("u1", "Who won the match yesterday").await;
        assert_eq!(first.source, ResultSource::Llm);
        assert_eq!(llm.call_count(), 1);

        // same text, different case: normalized key hits
        let second = c.classify("u1", "who won the MATCH yesterday").await;
        assert_eq!(second.source, ResultSource::Cache);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_near_empty_never_reaches_llm() {
        let llm = MockLlm::replying(r#"{"needs_search": true}"#);
        let c = classifier(Some(llm.clone()));

        let r = c.classify("u1", " ").await;
        assert!(!r.needs_search);
        assert_eq!(r.source, ResultSource::Default);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_llm_configured_uses_keywords() {
        let c = classifier(None);
        let r = c.classify("u1", "best phone under 500").await;
        assert_eq!(r.source, ResultSource::KeywordFallback);
        assert_eq!(r.search_type, SearchType::Shopping);
    }

    #[tokio::test]
    async fn test_needs_search_false_forces_none_type() {
        let llm = MockLlm::replying(
            r#"{"intent": "chitchat", "needs_search": false, "search_type": "web", "confidence": 95}"#,
        );
        let c = classifier(Some(llm));

        let r = c.classify("u1", "just chilling at home today").await;
        assert!(!r.needs_search);
        assert_eq!(r.search_type, SearchType::None);
    }
}
