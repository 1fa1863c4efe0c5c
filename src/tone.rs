//! Tone/Language Analyzer
//!
//! Statistical Hindi/English mix detection with an optional LLM formality
//! refinement, cached per user. The statistical pass always runs and the
//! LLM path can only upgrade it; no failure on this path ever reaches the
//! caller.

use crate::cache::ExpiringCache;
use crate::llm::{CompletionOptions, LlmService};
use crate::rules::RuleSet;
use crate::types::{Formality, LanguageFamily, ToneAnalysis};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Tuning knobs for the analyzer
#[derive(Debug, Clone)]
pub struct ToneConfig {
    /// Messages shorter than this never go to the LLM
    pub min_chars_for_llm: usize,
    /// Force-refresh a cached entry after serving this many messages
    pub refresh_after_messages: u32,
    pub llm_timeout_ms: u64,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            min_chars_for_llm: 20,
            refresh_after_messages: 10,
            llm_timeout_ms: 2_000,
            cache_ttl: Duration::from_secs(10 * 60),
            cache_capacity: 500,
        }
    }
}

#[derive(Clone)]
struct CachedTone {
    analysis: ToneAnalysis,
    served: u32,
}

/// Per-user tone analyzer. `NEW → STATISTICAL → (LLM_REFINED) → CACHED`.
#[derive(Clone)]
pub struct ToneAnalyzer {
    rules: RuleSet,
    llm: Option<Arc<dyn LlmService>>,
    cache: ExpiringCache<String, CachedTone>,
    config: ToneConfig,
}

impl ToneAnalyzer {
    pub fn new(rules: RuleSet, llm: Option<Arc<dyn LlmService>>, config: ToneConfig) -> Self {
        let cache = ExpiringCache::new(config.cache_ttl, config.cache_capacity);
        Self {
            rules,
            llm,
            cache,
            config,
        }
    }

    /// Analyze one message for a user. Serves from the per-user cache when
    /// warm; never returns an error.
    pub async fn analyze(&self, user_id: &str, text: &str) -> ToneAnalysis {
        let key = user_id.to_string();

        if let Some(cached) = self.cache.get(&key) {
            let served = cached.served + 1;
            if served < self.config.refresh_after_messages {
                // bump the serve counter; entry replaced wholesale
                self.cache.set(
                    key,
                    CachedTone {
                        analysis: cached.analysis.clone(),
                        served,
                    },
                );
                return cached.analysis;
            }
            debug!("Tone cache for {} hit refresh bound, re-analyzing", user_id);
            self.cache.clear_key(&key);
        }

        let mut analysis = self.statistical(text);

        if let Some(llm) = &self.llm {
            if text.trim().len() >= self.config.min_chars_for_llm {
                if let Some(formality) = self.refine_formality(llm.as_ref(), user_id, text).await {
                    analysis.formality = formality;
                    analysis.suggested_style = suggested_style(analysis.language, formality);
                }
            }
        }

        self.cache.set(
            key,
            CachedTone {
                analysis: analysis.clone(),
                served: 0,
            },
        );
        analysis
    }

    /// Statistical pass: romanized-Hindi vocabulary plus Devanagari script
    /// counting, and an indicator-list formality heuristic. Sub-millisecond.
    /// Public so short-circuit paths can get a tone without touching the
    /// LLM or the cache.
    pub fn statistical(&self, text: &str) -> ToneAnalysis {
        let snap = self.rules.snapshot();
        let lower = text.to_lowercase();

        let words: Vec<&str> = lower.split_whitespace().collect();
        let total = words.len().max(1);

        let hindi_words = words
            .iter()
            .filter(|w| {
                snap.hinglish_words.is_match(w)
                    || w.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c))
            })
            .count();

        let hindi_percent = ((hindi_words * 100) / total).min(100) as u8;
        let english_percent = 100 - hindi_percent;

        let language = match hindi_percent {
            0 => LanguageFamily::English,
            p if p >= 80 => LanguageFamily::Hindi,
            p if p >= 40 => LanguageFamily::Mixed,
            _ => LanguageFamily::Hinglish,
        };

        let casual = snap
            .tables
            .casual_indicators
            .iter()
            .filter(|i| lower.contains(i.as_str()))
            .count();
        let formal = snap
            .tables
            .formal_indicators
            .iter()
            .filter(|i| lower.contains(i.as_str()))
            .count();

        let formality = if formal > casual && formal > 0 {
            Formality::Formal
        } else if casual > 0 {
            Formality::Casual
        } else {
            Formality::SemiFormal
        };

        ToneAnalysis {
            language,
            formality,
            hindi_percent,
            english_percent,
            suggested_style: suggested_style(language, formality),
        }
    }

    /// Single constrained LLM call asking only for a formality label.
    /// Timeout, error or an unparseable label all mean "keep the
    /// statistical verdict".
    async fn refine_formality(
        &self,
        llm: &dyn LlmService,
        user_id: &str,
        text: &str,
    ) -> Option<Formality> {
        let prompt = format!(
            "Classify the formality of this chat message. Reply with exactly one word: \
             casual, semi_formal, or formal.\n\nMessage: {}",
            text
        );
        let options = CompletionOptions {
            max_tokens: 5,
            temperature: 0.0,
            timeout_ms: self.config.llm_timeout_ms,
            user_id: user_id.to_string(),
        };

        let call = llm.generate_completion(&prompt, &options);
        match tokio::time::timeout(Duration::from_millis(self.config.llm_timeout_ms), call).await {
            Ok(Ok(reply)) => {
                let label = reply.split_whitespace().next().unwrap_or("");
                let parsed = Formality::from_name(label);
                if parsed.is_none() {
                    debug!("Unparseable formality label {:?}, keeping statistical", reply);
                }
                parsed
            }
            Ok(Err(e)) => {
                debug!("Formality refinement failed: {}, keeping statistical", e);
                None
            }
            Err(_) => {
                debug!("Formality refinement timed out, keeping statistical");
                None
            }
        }
    }

    /// Drop a user's cached tone (e.g. on an explicit style change request)
    pub fn invalidate(&self, user_id: &str) {
        self.cache.clear_key(&user_id.to_string());
    }

    /// Start the background expiry sweep for the per-user cache
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        self.cache.spawn_sweeper(interval)
    }
}

fn suggested_style(language: LanguageFamily, formality: Formality) -> String {
    format!("{} {}", formality.as_str(), language.as_str())
}
