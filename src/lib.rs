//! Saathi Router
//!
//! Intent & routing orchestrator for a Hinglish conversational assistant.
//! Decides, within a tight latency budget, whether a message needs live
//! external information, how to speak back, and which processing tier
//! should handle it.
//!
//! # Architecture
//!
//! ```text
//! Message ──► IntentPipeline ──► RoutingDecision (FAST | ENRICHED)
//!                 │
//!                 ├── PatternClassifier  (rule tables, zero I/O)
//!                 ├── SearchIntentClassifier (LLM + keyword fallback, cached)
//!                 ├── ToneAnalyzer       (statistical + LLM refinement, cached)
//!                 ├── RecheckBridge      (last search query per user)
//!                 └── ExpiringCache      (TTL + size-bounded, shared building block)
//! ```
//!
//! Short-circuit stages (recheck, greeting, sequel) terminate the pipeline
//! early; otherwise search and tone classification run concurrently and the
//! merged decision carries the routing tier. Classifier failures degrade to
//! keyword/statistical verdicts; a request is never failed by this crate.

pub mod cache;
pub mod config;
pub mod intent;
pub mod llm;
pub mod parse;
pub mod patterns;
pub mod pipeline;
pub mod recheck;
pub mod rules;
pub mod tone;
pub mod types;

pub use cache::{CacheStats, Clock, ExpiringCache, ManualClock, SystemClock};
pub use config::Config;
pub use intent::{IntentConfig, SearchIntentClassifier};
pub use llm::{ClaudeLlm, CompletionOptions, ContextTurn, LlmService, MemoryStore};
pub use patterns::{PatternClassifier, PatternConfidence};
pub use pipeline::{IntentPipeline, PipelineConfig, Session};
pub use recheck::{RecheckBridge, RecheckConfig};
pub use rules::{RuleSet, RuleTables, RulesError};
pub use tone::{ToneAnalyzer, ToneConfig};
pub use types::{
    ClassificationResult, Complexity, Domain, Formality, Intent, LanguageFamily, LastSearchQuery,
    ResultSource, RoutingDecision, SearchIntentResult, SearchType, Tier, ToneAnalysis,
};
