//! Orchestration Pipeline
//!
//! The state machine that sequences every classifier and merges their
//! outputs into one `RoutingDecision` under the latency budget:
//!
//! ```text
//! START → RECHECK_CHECK → GREETING_CHECK → SEQUEL_PATTERN_CHECK
//!       → SEARCH_CLASSIFY ∥ TONE_ANALYZE → MERGE → ROUTE_DECIDE → DONE
//! ```
//!
//! The first three stages are short-circuits: a match returns a fully-formed
//! decision and skips everything after it, which is the dominant cheap path
//! for casual turns. A classifier error never fails the request; the worst
//! case is a low-confidence "no search, fast tier" decision.

use crate::intent::SearchIntentClassifier;
use crate::patterns::PatternClassifier;
use crate::recheck::RecheckBridge;
use crate::tone::ToneAnalyzer;
use crate::types::{
    ClassificationResult, Complexity, Domain, Intent, ResultSource, RoutingDecision,
    SearchIntentResult, SearchType, Tier,
};
use std::time::Instant;
use tracing::{debug, info};

/// Explicit request context threaded through the pipeline instead of a bare
/// user-id string
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Confidence assigned to rule-based short-circuit decisions
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub greeting_confidence: u8,
    pub recheck_confidence: u8,
    pub sequel_confidence: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            greeting_confidence: 95,
            recheck_confidence: 90,
            sequel_confidence: 85,
        }
    }
}

/// The orchestrator. All collaborators are injected at construction; a
/// missing one is a construction-time error, never a masked runtime failure.
pub struct IntentPipeline {
    patterns: PatternClassifier,
    tone: ToneAnalyzer,
    intent: SearchIntentClassifier,
    recheck: RecheckBridge,
    config: PipelineConfig,
}

impl IntentPipeline {
    pub fn new(
        patterns: PatternClassifier,
        tone: ToneAnalyzer,
        intent: SearchIntentClassifier,
        recheck: RecheckBridge,
        config: PipelineConfig,
    ) -> Self {
        Self {
            patterns,
            tone,
            intent,
            recheck,
            config,
        }
    }

    /// Route one message. Infallible: every path produces a decision.
    pub async fn route(&self, session: &Session, text: &str) -> RoutingDecision {
        let start = Instant::now();

        // RECHECK_CHECK: "dobara check karo" repeats the last search, but
        // only when a topic is actually on record; otherwise classification
        // proceeds normally instead of forcing a stale re-search.
        if self.patterns.is_recheck_phrase(text) {
            if let Some(slot) = self.recheck.recall(&session.user_id).await {
                debug!("Recheck short-circuit for {}: {:?}", session.user_id, slot.query);
                return self.recheck_decision(text, slot.query, slot.domain, start);
            }
            debug!("Recheck phrase without stored topic, classifying normally");
        }

        // GREETING_CHECK: casual openers skip everything
        if self.patterns.is_greeting(text) {
            debug!("Greeting short-circuit");
            return self.greeting_decision(text, start);
        }

        // SEQUEL_PATTERN_CHECK: "pushpa 2", "season 4" is a search on its own
        if self.patterns.is_sequel_query(text) {
            debug!("Sequel short-circuit");
            return self.sequel_decision(session, text, start);
        }

        // SEARCH_CLASSIFY ∥ TONE_ANALYZE: independent, joined before merge.
        // Each carries its own timeout and degrades alone.
        let (search, tone) = tokio::join!(
            self.intent.classify(&session.user_id, text),
            self.tone.analyze(&session.user_id, text),
        );

        // DOMAIN/COMPLEXITY_MERGE
        let classification = ClassificationResult {
            complexity: self.patterns.classify_complexity(text),
            domain: self.patterns.classify_domain(text),
            core_text: self.patterns.core_text(text),
        };

        if search.needs_search {
            let query = search
                .suggested_query
                .clone()
                .unwrap_or_else(|| classification.core_text.clone());
            self.recheck
                .record(&session.user_id, &query, classification.domain);
        }

        // ROUTE_DECIDE: search necessity dominates complexity
        let routed_to = if search.needs_search {
            Tier::Enriched
        } else if classification.complexity == Complexity::Simple {
            Tier::Fast
        } else {
            Tier::Enriched
        };

        let decision = RoutingDecision {
            classification,
            search,
            tone,
            routed_to,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Routed user={} tier={} search={} in {}ms",
            session.user_id,
            decision.routed_to.as_str(),
            decision.search.needs_search,
            decision.processing_time_ms
        );
        decision
    }

    fn greeting_decision(&self, text: &str, start: Instant) -> RoutingDecision {
        RoutingDecision {
            classification: ClassificationResult {
                complexity: Complexity::Simple,
                domain: Domain::General,
                core_text: text.trim().to_string(),
            },
            search: SearchIntentResult {
                needs_search: false,
                search_type: SearchType::None,
                intent: Intent::Greeting,
                suggested_query: None,
                confidence: self.config.greeting_confidence,
                source: ResultSource::KeywordFallback,
            },
            tone: self.tone.statistical(text),
            routed_to: Tier::Fast,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn recheck_decision(
        &self,
        text: &str,
        query: String,
        domain: Domain,
        start: Instant,
    ) -> RoutingDecision {
        RoutingDecision {
            classification: ClassificationResult {
                complexity: Complexity::Simple,
                domain,
                core_text: query.clone(),
            },
            search: SearchIntentResult {
                needs_search: true,
                search_type: search_type_for(domain),
                intent: Intent::Recheck,
                suggested_query: Some(query),
                confidence: self.config.recheck_confidence,
                source: ResultSource::Cache,
            },
            tone: self.tone.statistical(text),
            routed_to: Tier::Enriched,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn sequel_decision(&self, session: &Session, text: &str, start: Instant) -> RoutingDecision {
        let domain = self.patterns.classify_domain(text);
        let query = self.patterns.build_query(text, domain);
        self.recheck.record(&session.user_id, &query, domain);

        RoutingDecision {
            classification: ClassificationResult {
                complexity: Complexity::Simple,
                domain,
                core_text: self.patterns.core_text(text),
            },
            search: SearchIntentResult {
                needs_search: true,
                search_type: search_type_for(domain),
                intent: Intent::Question,
                suggested_query: Some(query),
                confidence: self.config.sequel_confidence,
                source: ResultSource::KeywordFallback,
            },
            tone: self.tone.statistical(text),
            routed_to: Tier::Enriched,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// Search type implied by a domain when only the domain is known
fn search_type_for(domain: Domain) -> SearchType {
    match domain {
        Domain::Sports | Domain::News => SearchType::News,
        Domain::Food | Domain::Travel => SearchType::Local,
        Domain::Shopping => SearchType::Shopping,
        _ => SearchType::Web,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LanguageFamily;
    use test_support::pipeline_with;

    // Unit tests for the short-circuit decisions; the end-to-end scenarios
    // live in tests/pipeline_test.rs.
    mod test_support {
        use super::super::*;
        use crate::intent::IntentConfig;
        use crate::llm::LlmService;
        use crate::recheck::RecheckConfig;
        use crate::rules::RuleSet;
        use crate::tone::ToneConfig;
        use std::sync::Arc;

        pub fn pipeline_with(llm: Option<Arc<dyn LlmService>>) -> IntentPipeline {
            let rules = RuleSet::new();
            let patterns = PatternClassifier::new(rules.clone());
            let tone = ToneAnalyzer::new(rules.clone(), llm.clone(), ToneConfig::default());
            let intent =
                SearchIntentClassifier::new(llm, patterns.clone(), IntentConfig::default());
            let recheck = RecheckBridge::new(patterns.clone(), None, RecheckConfig::default());
            IntentPipeline::new(patterns, tone, intent, recheck, PipelineConfig::default())
        }
    }

    #[tokio::test]
    async fn test_greeting_short_circuit_shape() {
        let pipeline = pipeline_with(None);
        let decision = pipeline.route(&Session::new("u1"), "namaste!").await;

        assert_eq!(decision.routed_to, Tier::Fast);
        assert_eq!(decision.search.intent, Intent::Greeting);
        assert!(!decision.search.needs_search);
        assert_eq!(decision.classification.complexity, Complexity::Simple);
    }

    #[tokio::test]
    async fn test_sequel_short_circuit_records_topic() {
        let pipeline = pipeline_with(None);
        let session = Session::new("u1");

        let decision = pipeline.route(&session, "pushpa 2 movie kab release").await;
        assert_eq!(decision.routed_to, Tier::Enriched);
        assert!(decision.search.needs_search);

        // the sequel search became the recheck topic
        let recheck = pipeline.route(&session, "dobara check karo").await;
        assert_eq!(recheck.search.intent, Intent::Recheck);
        assert!(recheck
            .search
            .suggested_query
            .as_deref()
            .unwrap()
            .contains("pushpa"));
    }

    #[tokio::test]
    async fn test_recheck_without_context_classifies_normally() {
        let pipeline = pipeline_with(None);
        let decision = pipeline.route(&Session::new("fresh"), "dobara check karo").await;

        assert_ne!(decision.search.intent, Intent::Recheck);
    }

    #[tokio::test]
    async fn test_short_circuit_tone_is_statistical() {
        let pipeline = pipeline_with(None);
        let decision = pipeline.route(&Session::new("u1"), "kya haal hai").await;
        assert_ne!(decision.tone.language, LanguageFamily::English);
    }

    #[tokio::test]
    async fn test_medium_complexity_without_search_is_enriched() {
        let pipeline = pipeline_with(None);
        // "suggest" is a medium pattern; no search keywords match
        let decision = pipeline
            .route(&Session::new("u1"), "suggest something fun yaar")
            .await;
        assert!(!decision.search.needs_search);
        assert_eq!(decision.routed_to, Tier::Enriched);
    }
}
