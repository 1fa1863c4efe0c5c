//! Pattern/Keyword Classifier
//!
//! Zero-latency, no-I/O classification from the active rule tables:
//! greetings, complexity, domain category, language family, sequel queries,
//! recheck phrasing and the keyword search-intent fallback chain.

use crate::rules::{CompiledRules, RuleSet};
use crate::types::{
    Complexity, Domain, Intent, LanguageFamily, ResultSource, SearchIntentResult, SearchType,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

/// "word followed by a number or ordinal" half of the sequel detector.
/// Structural, not table-driven: the table supplies the context keywords.
static SEQUEL_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b[\w']+\s+(?:\d{1,3}|1st|2nd|3rd|[4-9]th|one|two|three|four|five|first|second|third|fourth|fifth|pehla|dusra|doosra|teesra|chautha)\b",
    )
    .expect("sequel number pattern must compile")
});

/// Devanagari block, for language-family detection
fn is_devanagari(c: char) -> bool {
    ('\u{0900}'..='\u{097F}').contains(&c)
}

/// Strip punctuation and collapse whitespace for greeting comparison.
/// Punctuation is removed, not spaced out, so "hi-tech" stays one token
/// and never matches "hi".
fn normalize_greeting(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Confidence constants for rule-based verdicts. Heuristic, therefore
/// configurable rather than baked in.
#[derive(Debug, Clone, Copy)]
pub struct PatternConfidence {
    /// Assigned when a keyword table decided the verdict
    pub keyword: u8,
    /// Assigned when nothing matched and the safe default applied
    pub fallback_default: u8,
}

impl Default for PatternConfidence {
    fn default() -> Self {
        Self {
            keyword: 70,
            fallback_default: 30,
        }
    }
}

/// Table-driven classifier over a [`RuleSet`]. Holds no per-message state;
/// every call takes a fresh snapshot so reloads apply between requests.
#[derive(Clone)]
pub struct PatternClassifier {
    rules: RuleSet,
    confidence: PatternConfidence,
}

impl PatternClassifier {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            confidence: PatternConfidence::default(),
        }
    }

    pub fn with_confidence(rules: RuleSet, confidence: PatternConfidence) -> Self {
        Self { rules, confidence }
    }

    fn snap(&self) -> Arc<CompiledRules> {
        self.rules.snapshot()
    }

    /// Exact greeting match after punctuation stripping. Short inputs also
    /// match on their first token alone; substrings never match, so
    /// "hi-tech camera price" is not a greeting.
    pub fn is_greeting(&self, text: &str) -> bool {
        let normalized = normalize_greeting(text);
        if normalized.is_empty() {
            return false;
        }

        let snap = self.snap();
        if snap.tables.greetings.iter().any(|g| *g == normalized) {
            return true;
        }

        // "hey bot", "hello ji" — first token only, and only for short input
        let words: Vec<&str> = normalized.split_whitespace().collect();
        if words.len() <= 3 {
            if let Some(first) = words.first() {
                return snap.tables.greetings.iter().any(|g| g == first);
            }
        }
        false
    }

    /// HIGH pattern > MEDIUM pattern/word count > SIMPLE
    pub fn classify_complexity(&self, text: &str) -> Complexity {
        let snap = self.snap();
        if snap.high_complexity.is_match(text) {
            return Complexity::High;
        }
        let word_count = text.split_whitespace().count();
        if snap.medium_complexity.is_match(text) || word_count > snap.tables.medium_word_threshold {
            return Complexity::Medium;
        }
        Complexity::Simple
    }

    /// First matching category in table order wins
    pub fn classify_domain(&self, text: &str) -> Domain {
        let lower = text.to_lowercase();
        let snap = self.snap();
        for (domain, keywords) in &snap.categories {
            if keywords.iter().any(|kw| lower.contains(kw.as_str())) {
                return *domain;
            }
        }
        Domain::General
    }

    /// Romanized function words and Devanagari script decide the family
    pub fn detect_language_family(&self, text: &str) -> LanguageFamily {
        let has_devanagari = text.chars().any(is_devanagari);
        let has_roman = text.chars().any(|c| c.is_ascii_alphabetic());
        let has_hinglish_words = self.snap().hinglish_words.is_match(text);

        match (has_devanagari, has_roman, has_hinglish_words) {
            (true, true, _) => LanguageFamily::Mixed,
            (true, false, _) => LanguageFamily::Hindi,
            (false, _, true) => LanguageFamily::Hinglish,
            _ => LanguageFamily::English,
        }
    }

    /// Sequel/entity detector. Both halves must hold: a number/ordinal after
    /// a word AND a media/venue context keyword. "room 204" alone is not a
    /// sequel.
    pub fn is_sequel_query(&self, text: &str) -> bool {
        if !SEQUEL_NUMBER.is_match(text) {
            return false;
        }
        let lower = text.to_lowercase();
        self.snap()
            .tables
            .sequel_context_keywords
            .iter()
            .any(|kw| lower.contains(kw.as_str()))
    }

    /// Does this look like "do it again"? Phrase-list substring match only;
    /// whether it actually triggers is up to the recheck bridge.
    pub fn is_recheck_phrase(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.snap()
            .tables
            .recheck_phrases
            .iter()
            .any(|p| lower.contains(p.as_str()))
    }

    /// Message text minus stop words and edge punctuation, for
    /// suggested-query construction
    pub fn core_text(&self, text: &str) -> String {
        let snap = self.snap();
        let kept: Vec<&str> = text
            .split_whitespace()
            .filter_map(|w| {
                let trimmed = w.trim_matches(|c: char| c.is_ascii_punctuation());
                if trimmed.is_empty() || snap.tables.stop_words.contains(&trimmed.to_lowercase()) {
                    None
                } else {
                    Some(trimmed)
                }
            })
            .collect();
        if kept.is_empty() {
            text.trim().to_string()
        } else {
            kept.join(" ")
        }
    }

    /// Core text plus the domain's query suffix, if one is configured
    pub fn build_query(&self, text: &str, domain: Domain) -> String {
        let core = self.core_text(text);
        let snap = self.snap();
        match snap.domain_suffixes.iter().find(|(d, _)| *d == domain) {
            Some((_, suffix)) if !core.to_lowercase().contains(&suffix.to_lowercase()) => {
                format!("{} {}", core, suffix)
            }
            _ => core,
        }
    }

    /// Keyword search-intent fallback chain. Priority: no-search phrases >
    /// news > local > shopping > knowledge > safe default (no search).
    pub fn keyword_search_intent(&self, text: &str) -> SearchIntentResult {
        let lower = text.to_lowercase();
        let snap = self.snap();
        let contains_any =
            |list: &[String]| list.iter().any(|kw| lower.contains(kw.as_str()));

        if contains_any(&snap.tables.no_search_phrases) {
            let intent = if lower.contains("thank") || lower.contains("shukriya")
                || lower.contains("dhanyavaad")
            {
                Intent::Gratitude
            } else {
                Intent::Chitchat
            };
            debug!("Keyword fallback: no-search phrase");
            return SearchIntentResult {
                needs_search: false,
                search_type: SearchType::None,
                intent,
                suggested_query: None,
                confidence: self.confidence.keyword,
                source: ResultSource::KeywordFallback,
            };
        }

        let verdict = if contains_any(&snap.tables.news_keywords) {
            Some((SearchType::News, Intent::Question))
        } else if contains_any(&snap.tables.local_keywords) {
            Some((SearchType::Local, Intent::Request))
        } else if contains_any(&snap.tables.shopping_keywords) {
            Some((SearchType::Shopping, Intent::Request))
        } else if contains_any(&snap.tables.knowledge_keywords) {
            Some((SearchType::Knowledge, Intent::Question))
        } else {
            None
        };

        match verdict {
            Some((search_type, intent)) => {
                let domain = self.classify_domain(text);
                debug!("Keyword fallback: {} search", search_type.as_str());
                SearchIntentResult {
                    needs_search: true,
                    search_type,
                    intent,
                    suggested_query: Some(self.build_query(text, domain)),
                    confidence: self.confidence.keyword,
                    source: ResultSource::KeywordFallback,
                }
            }
            // Not triggering a search is the safer default
            None => SearchIntentResult::no_search(
                self.confidence.fallback_default,
                ResultSource::Default,
            ),
        }
    }
}
