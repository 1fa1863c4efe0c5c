//! Recheck Bridge
//!
//! Remembers, per user, the last query that triggered a search so "dobara
//! check karo" can repeat it. One slot per user, overwritten on every
//! search-worthy message, with a generous TTL (users come back to a topic
//! hours later). A stale or missing slot abandons the recheck intent.

use crate::cache::ExpiringCache;
use crate::llm::MemoryStore;
use crate::patterns::PatternClassifier;
use crate::types::{Domain, LastSearchQuery};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RecheckConfig {
    pub slot_ttl: Duration,
    pub capacity: usize,
    /// How many prior turns to scan when falling back to the memory store
    pub memory_scan_limit: usize,
}

impl Default for RecheckConfig {
    fn default() -> Self {
        Self {
            slot_ttl: Duration::from_secs(6 * 60 * 60),
            capacity: 1_000,
            memory_scan_limit: 10,
        }
    }
}

/// Per-user last-search-query bridge
#[derive(Clone)]
pub struct RecheckBridge {
    slots: ExpiringCache<String, LastSearchQuery>,
    memory: Option<Arc<dyn MemoryStore>>,
    patterns: PatternClassifier,
    config: RecheckConfig,
}

impl RecheckBridge {
    pub fn new(
        patterns: PatternClassifier,
        memory: Option<Arc<dyn MemoryStore>>,
        config: RecheckConfig,
    ) -> Self {
        let slots = ExpiringCache::new(config.slot_ttl, config.capacity);
        Self {
            slots,
            memory,
            patterns,
            config,
        }
    }

    /// Overwrite the user's slot. Called for every search-worthy message,
    /// whichever classifier decided it.
    pub fn record(&self, user_id: &str, query: &str, domain: Domain) {
        self.slots.set(
            user_id.to_string(),
            LastSearchQuery {
                query: query.to_string(),
                domain,
                timestamp: chrono::Utc::now(),
            },
        );
    }

    /// Fetch the user's last search query. When the slot is gone, optionally
    /// scans the external memory store's recent turns for the newest
    /// search-worthy one. None means the recheck intent should be abandoned.
    pub async fn recall(&self, user_id: &str) -> Option<LastSearchQuery> {
        if let Some(slot) = self.slots.get(&user_id.to_string()) {
            return Some(slot);
        }

        let memory = self.memory.as_ref()?;
        let turns = match memory
            .recent_context(user_id, self.config.memory_scan_limit)
            .await
        {
            Ok(turns) => turns,
            Err(e) => {
                debug!("Memory store scan failed for {}: {}", user_id, e);
                return None;
            }
        };

        // newest first; only user turns can carry a search topic
        for turn in turns.iter().rev().filter(|t| t.role == "user") {
            let verdict = self.patterns.keyword_search_intent(&turn.content);
            if verdict.needs_search {
                let domain = self.patterns.classify_domain(&turn.content);
                let query = verdict
                    .suggested_query
                    .unwrap_or_else(|| turn.content.clone());
                debug!("Recheck topic recovered from memory store for {}", user_id);
                let recovered = LastSearchQuery {
                    query,
                    domain,
                    timestamp: turn.timestamp,
                };
                // re-seed the slot so the next recheck is a cache hit
                self.slots.set(user_id.to_string(), recovered.clone());
                return Some(recovered);
            }
        }
        None
    }

    /// Drop a user's slot
    pub fn forget(&self, user_id: &str) {
        self.slots.clear_key(&user_id.to_string());
    }

    /// Start the background expiry sweep for the slot cache
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        self.slots.spawn_sweeper(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ContextTurn;
    use crate::rules::RuleSet;
    use anyhow::Result;
    use async_trait::async_trait;

    struct FixedMemory {
        turns: Vec<ContextTurn>,
    }

    #[async_trait]
    impl MemoryStore for FixedMemory {
        async fn recent_context(&self, _user_id: &str, limit: usize) -> Result<Vec<ContextTurn>> {
            Ok(self.turns.iter().take(limit).cloned().collect())
        }
    }

    fn bridge(memory: Option<Arc<dyn MemoryStore>>) -> RecheckBridge {
        RecheckBridge::new(
            PatternClassifier::new(RuleSet::new()),
            memory,
            RecheckConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_record_then_recall() {
        let b = bridge(None);
        b.record("u1", "ipl score today", Domain::Sports);

        let slot = b.recall("u1").await.unwrap();
        assert_eq!(slot.query, "ipl score today");
        assert_eq!(slot.domain, Domain::Sports);
    }

    #[tokio::test]
    async fn test_empty_slot_without_memory_is_none() {
        let b = bridge(None);
        assert!(b.recall("u1").await.is_none());
    }

    #[tokio::test]
    async fn test_record_overwrites() {
        let b = bridge(None);
        b.record("u1", "ipl score", Domain::Sports);
        b.record("u1", "pizza near me", Domain::Food);

        let slot = b.recall("u1").await.unwrap();
        assert_eq!(slot.query, "pizza near me");
    }

    #[tokio::test]
    async fn test_memory_fallback_finds_search_worthy_turn() {
        let now = chrono::Utc::now();
        let memory = Arc::new(FixedMemory {
            turns: vec![
                ContextTurn {
                    role: "user".into(),
                    content: "what is the ipl score today".into(),
                    timestamp: now,
                },
                ContextTurn {
                    role: "assistant".into(),
                    content: "CSK won by 5 wickets".into(),
                    timestamp: now,
                },
                ContextTurn {
                    role: "user".into(),
                    content: "haha nice".into(),
                    timestamp: now,
                },
            ],
        });

        let b = bridge(Some(memory));
        let slot = b.recall("u1").await.unwrap();
        assert!(slot.query.contains("ipl score"));
        assert_eq!(slot.domain, Domain::Sports);
    }

    #[tokio::test]
    async fn test_memory_fallback_prefers_newest_search_worthy_turn() {
        let now = chrono::Utc::now();
        // oldest-first, per the MemoryStore contract
        let memory = Arc::new(FixedMemory {
            turns: vec![
                ContextTurn {
                    role: "user".into(),
                    content: "pizza place near me".into(),
                    timestamp: now - chrono::Duration::minutes(10),
                },
                ContextTurn {
                    role: "user".into(),
                    content: "ipl score today".into(),
                    timestamp: now,
                },
            ],
        });

        let b = bridge(Some(memory));
        let slot = b.recall("u1").await.unwrap();
        assert!(slot.query.contains("ipl score"));
    }

    #[tokio::test]
    async fn test_memory_with_no_search_worthy_turns_is_none() {
        let now = chrono::Utc::now();
        let memory = Arc::new(FixedMemory {
            turns: vec![ContextTurn {
                role: "user".into(),
                content: "haha acha theek".into(),
                timestamp: now,
            }],
        });

        let b = bridge(Some(memory));
        assert!(b.recall("u1").await.is_none());
    }
}
