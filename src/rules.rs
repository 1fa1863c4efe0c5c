//! Rule Tables
//!
//! All keyword/regex tables driving the pattern classifiers, loadable from a
//! JSON document at runtime. Loaded tables are immutable; a reload swaps the
//! whole compiled set atomically, so a bad document never disturbs the
//! tables already in service.

use crate::types::Domain;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Rule table load/validation failures. The previous tables stay active.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("invalid rules document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("unknown category {0:?} in rules document")]
    UnknownCategory(String),

    #[error("rules table {0:?} must not be empty")]
    EmptyTable(&'static str),
}

/// One domain category and the keywords that select it. Table order matters:
/// the first matching category wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

/// The raw, serializable rule tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleTables {
    /// Exact greeting forms (matched after punctuation stripping)
    pub greetings: Vec<String>,
    /// Regex fragments marking high-complexity messages
    pub high_complexity_patterns: Vec<String>,
    /// Regex fragments marking medium-complexity messages
    pub medium_complexity_patterns: Vec<String>,
    /// Word count beyond which an unmatched message is at least MEDIUM
    pub medium_word_threshold: usize,
    /// Ordered category keyword table
    pub categories: Vec<CategoryRule>,
    /// Romanized Hindi function words (pronouns, postpositions, verbs)
    pub hinglish_function_words: Vec<String>,
    /// Media/venue context terms required by the sequel detector
    pub sequel_context_keywords: Vec<String>,
    /// Phrases asking to repeat a previous search
    pub recheck_phrases: Vec<String>,
    /// Phrases that definitely need no search (greetings, thanks, fillers)
    pub no_search_phrases: Vec<String>,
    pub news_keywords: Vec<String>,
    pub local_keywords: Vec<String>,
    pub shopping_keywords: Vec<String>,
    pub knowledge_keywords: Vec<String>,
    pub casual_indicators: Vec<String>,
    pub formal_indicators: Vec<String>,
    /// Dropped when extracting core text for query construction
    pub stop_words: Vec<String>,
    /// Query suffix appended per domain when building a suggested query
    pub domain_suffixes: Vec<(String, String)>,
}

impl Default for RuleTables {
    fn default() -> Self {
        default_tables()
    }
}

fn strs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_tables() -> RuleTables {
    RuleTables {
        greetings: strs(&[
            "hi", "hii", "hiii", "hello", "hey", "heyy", "yo", "sup", "wassup", "hola",
            "namaste", "namaskar", "good morning", "good afternoon", "good evening",
            "good night", "gm", "gn", "kya haal hai", "kaise ho",
        ]),
        high_complexity_patterns: strs(&[
            "explain in detail", "step by step", "architecture", "algorithm",
            "compare", "difference between", "pros and cons", "analyz", "in depth",
            "why does", "how does .* work", "design",
        ]),
        medium_complexity_patterns: strs(&[
            "how to", "what is", "recommend", "suggest", "best way", "help me",
            "plan", "list of", "ideas for",
        ]),
        medium_word_threshold: 12,
        categories: vec![
            CategoryRule {
                name: "sports".into(),
                keywords: strs(&[
                    "cricket", "ipl", "match", "score", "wicket", "football",
                    "tournament", "world cup", "team",
                ]),
            },
            CategoryRule {
                name: "news".into(),
                keywords: strs(&["news", "headline", "breaking", "taaza khabar", "khabar"]),
            },
            CategoryRule {
                name: "entertainment".into(),
                keywords: strs(&[
                    "movie", "film", "song", "series", "season", "episode",
                    "bollywood", "actor", "actress", "trailer", "show", "web series",
                ]),
            },
            CategoryRule {
                name: "food".into(),
                keywords: strs(&[
                    "restaurant", "pizza", "biryani", "cafe", "food", "khana",
                    "recipe", "dhaba", "tiffin",
                ]),
            },
            CategoryRule {
                name: "travel".into(),
                keywords: strs(&["flight", "train", "hotel", "trip", "ticket", "visa"]),
            },
            CategoryRule {
                name: "shopping".into(),
                keywords: strs(&[
                    "buy", "price", "discount", "order", "amazon", "flipkart", "sale",
                ]),
            },
            CategoryRule {
                name: "technology".into(),
                keywords: strs(&[
                    "phone", "laptop", "app", "software", "code", "internet", "wifi",
                ]),
            },
            CategoryRule {
                name: "health".into(),
                keywords: strs(&["doctor", "medicine", "fever", "workout", "diet", "yoga"]),
            },
            CategoryRule {
                name: "education".into(),
                keywords: strs(&["exam", "course", "college", "syllabus", "result", "admission"]),
            },
        ],
        hinglish_function_words: strs(&[
            "hai", "hain", "kya", "kaise", "kyun", "kaun", "kab", "kahan", "nahi",
            "nahin", "mera", "tera", "apna", "karo", "karna", "chahiye", "batao",
            "bata", "dobara", "phir", "wala", "wali", "acha", "accha", "theek",
            "thik", "yaar", "bhai", "matlab", "aur", "lekin", "mein", "bohot",
            "bahut", "abhi", "kal", "aaj",
        ]),
        sequel_context_keywords: strs(&[
            "movie", "film", "part", "season", "episode", "series", "game",
            "book", "sequel", "installment",
        ]),
        recheck_phrases: strs(&[
            "check again", "check karo again", "again check", "dobara", "phir se",
            "ek baar aur", "recheck", "refresh karo", "wapas check", "update batao",
            "fir se dekho",
        ]),
        no_search_phrases: strs(&[
            "thank", "thanks", "thank you", "shukriya", "dhanyavaad", "ok", "okay",
            "bye", "lol", "haha", "hmm", "cool", "nice", "great", "welcome",
            "sorry", "good night", "love you",
        ]),
        news_keywords: strs(&[
            "news", "latest", "today", "breaking", "update", "score", "result",
            "taaza", "aaj ka", "live",
        ]),
        local_keywords: strs(&[
            "near me", "nearby", "paas mein", "paas me", "restaurant", "cafe",
            "shop", "hospital", "atm", "petrol pump", "directions", "address",
            "timing", "open now",
        ]),
        shopping_keywords: strs(&[
            "buy", "price", "cost", "discount", "deal", "order", "cheapest",
            "kitne ka", "under 500", "online",
        ]),
        knowledge_keywords: strs(&[
            "what", "who", "when", "where", "why", "how", "kya", "kaun", "kab",
            "kahan", "kyun", "kaise", "meaning", "define", "capital of", "matlab",
        ]),
        casual_indicators: strs(&[
            "yaar", "bhai", "bro", "dude", "lol", "haha", "arre", "abe", "omg",
            "btw", "pls", "plz",
        ]),
        formal_indicators: strs(&[
            "please", "kindly", "could you", "would you", "sir", "madam", "ji",
            "request", "regards", "grateful",
        ]),
        stop_words: strs(&[
            "the", "a", "an", "is", "are", "was", "be", "to", "of", "in", "on",
            "for", "me", "my", "i", "you", "it", "this", "that", "please", "can",
            "could", "what", "who", "when", "where", "why", "which", "how",
            "hai", "ka", "ki", "ko", "se", "mein", "kya", "karo", "batao",
        ]),
        domain_suffixes: vec![
            ("sports".into(), "latest score".into()),
            ("news".into(), "today latest news".into()),
            ("food".into(), "near me".into()),
            ("shopping".into(), "price online india".into()),
            ("entertainment".into(), "release date review".into()),
        ],
    }
}

/// Build a case-insensitive alternation regex from pattern fragments
fn compile_alternation(fragments: &[String]) -> Result<Regex, RulesError> {
    // Validate fragments individually so a reload error names the culprit
    for f in fragments {
        Regex::new(f).map_err(|source| RulesError::InvalidPattern {
            pattern: f.clone(),
            source,
        })?;
    }
    let joined = format!("(?i)(?:{})", fragments.join("|"));
    Regex::new(&joined).map_err(|source| RulesError::InvalidPattern {
        pattern: joined.clone(),
        source,
    })
}

/// Word-boundary-anchored alternation over literal words
fn compile_word_alternation(words: &[String]) -> Result<Regex, RulesError> {
    let escaped: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    let joined = format!(r"(?i)\b(?:{})\b", escaped.join("|"));
    Regex::new(&joined).map_err(|source| RulesError::InvalidPattern {
        pattern: joined.clone(),
        source,
    })
}

/// Rule tables with their regexes compiled and category names resolved
pub struct CompiledRules {
    pub tables: RuleTables,
    pub high_complexity: Regex,
    pub medium_complexity: Regex,
    pub hinglish_words: Regex,
    /// (domain, keywords) in table order
    pub categories: Vec<(Domain, Vec<String>)>,
    pub domain_suffixes: Vec<(Domain, String)>,
}

fn compile(tables: RuleTables) -> Result<CompiledRules, RulesError> {
    if tables.greetings.is_empty() {
        return Err(RulesError::EmptyTable("greetings"));
    }
    if tables.hinglish_function_words.is_empty() {
        return Err(RulesError::EmptyTable("hinglish_function_words"));
    }
    if tables.categories.is_empty() {
        return Err(RulesError::EmptyTable("categories"));
    }
    // an empty list would join to `(?:)`, which matches everything
    if tables.high_complexity_patterns.is_empty() {
        return Err(RulesError::EmptyTable("high_complexity_patterns"));
    }
    if tables.medium_complexity_patterns.is_empty() {
        return Err(RulesError::EmptyTable("medium_complexity_patterns"));
    }

    let mut categories = Vec::with_capacity(tables.categories.len());
    for rule in &tables.categories {
        let domain = Domain::from_name(&rule.name)
            .ok_or_else(|| RulesError::UnknownCategory(rule.name.clone()))?;
        let keywords = rule.keywords.iter().map(|k| k.to_lowercase()).collect();
        categories.push((domain, keywords));
    }

    let mut domain_suffixes = Vec::with_capacity(tables.domain_suffixes.len());
    for (name, suffix) in &tables.domain_suffixes {
        let domain =
            Domain::from_name(name).ok_or_else(|| RulesError::UnknownCategory(name.clone()))?;
        domain_suffixes.push((domain, suffix.clone()));
    }

    let high_complexity = compile_alternation(&tables.high_complexity_patterns)?;
    let medium_complexity = compile_alternation(&tables.medium_complexity_patterns)?;
    let hinglish_words = compile_word_alternation(&tables.hinglish_function_words)?;

    Ok(CompiledRules {
        high_complexity,
        medium_complexity,
        hinglish_words,
        categories,
        domain_suffixes,
        tables,
    })
}

static DEFAULT_RULES: Lazy<Arc<CompiledRules>> = Lazy::new(|| {
    Arc::new(compile(default_tables()).expect("built-in rule tables must compile"))
});

/// Handle to the active rule tables. Readers take a cheap `Arc` snapshot;
/// reloads replace the whole set atomically (copy-on-write).
#[derive(Clone)]
pub struct RuleSet {
    current: Arc<RwLock<Arc<CompiledRules>>>,
}

impl RuleSet {
    /// Rule set with the compiled-in default tables
    pub fn new() -> Self {
        Self {
            current: Arc::new(RwLock::new(DEFAULT_RULES.clone())),
        }
    }

    /// Snapshot of the active rules. Valid for the whole request even if a
    /// reload lands mid-flight.
    pub fn snapshot(&self) -> Arc<CompiledRules> {
        self.current.read().clone()
    }

    /// Load tables from a JSON document. On any parse/validation error the
    /// active tables are untouched.
    pub fn load_json(&self, json: &str) -> Result<(), RulesError> {
        let tables: RuleTables = serde_json::from_str(json)?;
        let compiled = compile(tables)?;
        *self.current.write() = Arc::new(compiled);
        info!("Rule tables reloaded");
        Ok(())
    }

    /// Load tables from a JSON file on disk
    pub fn reload_from_path(&self, path: &Path) -> Result<(), RulesError> {
        let json = std::fs::read_to_string(path)?;
        self.load_json(&json)
    }

    /// Restore the compiled-in defaults
    pub fn reset(&self) {
        *self.current.write() = DEFAULT_RULES.clone();
        info!("Rule tables reset to defaults");
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_compile() {
        let rules = RuleSet::new();
        let snap = rules.snapshot();
        assert!(snap.tables.greetings.contains(&"namaste".to_string()));
        assert!(snap.hinglish_words.is_match("kya haal hai"));
    }

    #[test]
    fn test_reload_replaces_tables() {
        let rules = RuleSet::new();
        let json = serde_json::json!({
            "greetings": ["howdy"],
        })
        .to_string();

        rules.load_json(&json).unwrap();
        let snap = rules.snapshot();
        assert_eq!(snap.tables.greetings, vec!["howdy".to_string()]);
        // unspecified tables fall back to defaults
        assert!(!snap.tables.recheck_phrases.is_empty());
    }

    #[test]
    fn test_bad_category_rejected_previous_kept() {
        let rules = RuleSet::new();
        let before = rules.snapshot().tables.greetings.clone();

        let json = serde_json::json!({
            "categories": [{"name": "astrology", "keywords": ["rashi"]}],
        })
        .to_string();

        let err = rules.load_json(&json).unwrap_err();
        assert!(matches!(err, RulesError::UnknownCategory(_)));
        assert_eq!(rules.snapshot().tables.greetings, before);
    }

    #[test]
    fn test_bad_regex_rejected() {
        let rules = RuleSet::new();
        let json = serde_json::json!({
            "high_complexity_patterns": ["(unclosed"],
        })
        .to_string();

        let err = rules.load_json(&json).unwrap_err();
        assert!(matches!(err, RulesError::InvalidPattern { .. }));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let rules = RuleSet::new();
        rules
            .load_json(&serde_json::json!({"greetings": ["howdy"]}).to_string())
            .unwrap();
        rules.reset();
        assert!(rules
            .snapshot()
            .tables
            .greetings
            .contains(&"hello".to_string()));
    }

    #[test]
    fn test_empty_complexity_patterns_rejected() {
        let rules = RuleSet::new();
        for table in ["high_complexity_patterns", "medium_complexity_patterns"] {
            let json = serde_json::json!({ table: [] }).to_string();
            assert!(matches!(
                rules.load_json(&json),
                Err(RulesError::EmptyTable(_))
            ));
        }
    }

    #[test]
    fn test_empty_greetings_rejected() {
        let rules = RuleSet::new();
        let json = serde_json::json!({"greetings": []}).to_string();
        assert!(matches!(
            rules.load_json(&json),
            Err(RulesError::EmptyTable("greetings"))
        ));
    }
}
