//! Routing Data Model
//!
//! Plain-data contract between the classifiers, the orchestration pipeline
//! and the downstream prompt builder. Everything here is serde-serializable
//! and carries no behavior beyond accessors.

use serde::{Deserialize, Serialize};

/// Message complexity tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Complexity {
    Simple,
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "SIMPLE",
            Complexity::Medium => "MEDIUM",
            Complexity::High => "HIGH",
        }
    }
}

/// Topic domain of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    General,
    Technology,
    Entertainment,
    Sports,
    News,
    Food,
    Travel,
    Shopping,
    Education,
    Health,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::General => "general",
            Domain::Technology => "technology",
            Domain::Entertainment => "entertainment",
            Domain::Sports => "sports",
            Domain::News => "news",
            Domain::Food => "food",
            Domain::Travel => "travel",
            Domain::Shopping => "shopping",
            Domain::Education => "education",
            Domain::Health => "health",
        }
    }

    /// Parse a rule-table category name. Unknown names are rejected so a bad
    /// rules document fails at load time, not at classification time.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "general" => Domain::General,
            "technology" | "tech" => Domain::Technology,
            "entertainment" => Domain::Entertainment,
            "sports" => Domain::Sports,
            "news" => Domain::News,
            "food" => Domain::Food,
            "travel" => Domain::Travel,
            "shopping" => Domain::Shopping,
            "education" => Domain::Education,
            "health" => Domain::Health,
            _ => return None,
        })
    }
}

/// What kind of external lookup a message needs, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Local,
    Web,
    News,
    Shopping,
    Knowledge,
    None,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Local => "local",
            SearchType::Web => "web",
            SearchType::News => "news",
            SearchType::Shopping => "shopping",
            SearchType::Knowledge => "knowledge",
            SearchType::None => "none",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "local" => SearchType::Local,
            "web" => SearchType::Web,
            "news" => SearchType::News,
            "shopping" => SearchType::Shopping,
            "knowledge" => SearchType::Knowledge,
            "none" => SearchType::None,
            _ => return None,
        })
    }
}

/// Conversational intent category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Gratitude,
    Question,
    Request,
    Recheck,
    Chitchat,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::Gratitude => "gratitude",
            Intent::Question => "question",
            Intent::Request => "request",
            Intent::Recheck => "recheck",
            Intent::Chitchat => "chitchat",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "greeting" => Intent::Greeting,
            "gratitude" | "thanks" => Intent::Gratitude,
            "question" => Intent::Question,
            "request" => Intent::Request,
            "recheck" => Intent::Recheck,
            "chitchat" | "casual" => Intent::Chitchat,
            _ => return None,
        })
    }
}

/// Which classifier actually produced a search verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Llm,
    KeywordFallback,
    Cache,
    Default,
}

impl ResultSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultSource::Llm => "llm",
            ResultSource::KeywordFallback => "keyword_fallback",
            ResultSource::Cache => "cache",
            ResultSource::Default => "default",
        }
    }
}

/// Search-intent verdict. Immutable once produced; cached by normalized text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchIntentResult {
    pub needs_search: bool,
    pub search_type: SearchType,
    pub intent: Intent,
    pub suggested_query: Option<String>,
    /// 0..=100, heuristic
    pub confidence: u8,
    pub source: ResultSource,
}

impl SearchIntentResult {
    /// Safe default: no search, low confidence. Used for empty input and as
    /// the last rung of the fallback chain.
    pub fn no_search(confidence: u8, source: ResultSource) -> Self {
        Self {
            needs_search: false,
            search_type: SearchType::None,
            intent: Intent::Chitchat,
            suggested_query: None,
            confidence,
            source,
        }
    }
}

/// Language family detected in a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageFamily {
    English,
    Hindi,
    Hinglish,
    Mixed,
}

impl LanguageFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageFamily::English => "english",
            LanguageFamily::Hindi => "hindi",
            LanguageFamily::Hinglish => "hinglish",
            LanguageFamily::Mixed => "mixed",
        }
    }
}

/// Register of the reply the persona layer should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formality {
    Casual,
    SemiFormal,
    Formal,
}

impl Formality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Formality::Casual => "casual",
            Formality::SemiFormal => "semi_formal",
            Formality::Formal => "formal",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.trim().to_lowercase().as_str() {
            "casual" => Formality::Casual,
            "semi_formal" | "semi-formal" | "semiformal" => Formality::SemiFormal,
            "formal" => Formality::Formal,
            _ => return None,
        })
    }
}

/// Tone/language analysis for one user, cached between messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToneAnalysis {
    pub language: LanguageFamily,
    pub formality: Formality,
    pub hindi_percent: u8,
    pub english_percent: u8,
    /// Style hint for the prompt builder, e.g. "casual hinglish"
    pub suggested_style: String,
}

/// Per-message complexity/domain classification. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub complexity: Complexity,
    pub domain: Domain,
    /// Message text with stop words removed, for query construction
    pub core_text: String,
}

/// The last query that triggered a search, one slot per user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastSearchQuery {
    pub query: String,
    pub domain: Domain,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Downstream processing tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    /// Cheap path, no external context
    Fast,
    /// Search-augmented path
    Enriched,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Fast => "FAST",
            Tier::Enriched => "ENRICHED",
        }
    }
}

/// Final pipeline output, handed to the external prompt builder and dropped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub classification: ClassificationResult,
    pub search: SearchIntentResult,
    pub tone: ToneAnalysis,
    pub routed_to: Tier,
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_round_trip() {
        for d in [Domain::General, Domain::Sports, Domain::Food] {
            assert_eq!(Domain::from_name(d.as_str()), Some(d));
        }
        assert_eq!(Domain::from_name("astrology"), None);
    }

    #[test]
    fn test_decision_serializes_flat_json() {
        let decision = RoutingDecision {
            classification: ClassificationResult {
                complexity: Complexity::Simple,
                domain: Domain::General,
                core_text: "hi".to_string(),
            },
            search: SearchIntentResult::no_search(30, ResultSource::Default),
            tone: ToneAnalysis {
                language: LanguageFamily::English,
                formality: Formality::Casual,
                hindi_percent: 0,
                english_percent: 100,
                suggested_style: "casual english".to_string(),
            },
            routed_to: Tier::Fast,
            processing_time_ms: 3,
        };

        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["routed_to"], "FAST");
        assert_eq!(json["search"]["source"], "default");
        assert_eq!(json["classification"]["complexity"], "SIMPLE");
    }

    #[test]
    fn test_formality_parse_variants() {
        assert_eq!(Formality::from_name(" Semi-Formal "), Some(Formality::SemiFormal));
        assert_eq!(Formality::from_name("FORMAL"), Some(Formality::Formal));
        assert_eq!(Formality::from_name("shouty"), None);
    }
}
