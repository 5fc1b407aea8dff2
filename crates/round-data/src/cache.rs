//! Round metadata cache
//!
//! Injected into [`RoundMetadataLoader`](crate::RoundMetadataLoader). Entries
//! are keyed by `(chain, round id)` and expire after an explicit TTL.

use std::collections::HashMap;
use std::time::Duration;

use common::{Address, ChainId, RoundMetadata};
use parking_lot::Mutex;
use tokio::time::Instant;

pub trait MetadataCache: Send + Sync {
    fn get(&self, chain: ChainId, round: &Address) -> Option<RoundMetadata>;

    fn put(&self, metadata: RoundMetadata);

    /// Drop one entry; returns whether it was present
    fn invalidate(&self, chain: ChainId, round: &Address) -> bool;

    fn clear(&self);
}

/// Never stores anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl MetadataCache for NoopCache {
    fn get(&self, _chain: ChainId, _round: &Address) -> Option<RoundMetadata> {
        None
    }

    fn put(&self, _metadata: RoundMetadata) {}

    fn invalidate(&self, _chain: ChainId, _round: &Address) -> bool {
        false
    }

    fn clear(&self) {}
}

struct Entry {
    stored_at: Instant,
    metadata: RoundMetadata,
}

/// Bounded in-memory cache with a fixed time-to-live.
///
/// When full, expired entries are purged first, then the oldest entry is evicted.
pub struct TtlCache {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<(ChainId, Address), Entry>>,
}

impl TtlCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .field("len", &self.len())
            .finish()
    }
}

impl MetadataCache for TtlCache {
    fn get(&self, chain: ChainId, round: &Address) -> Option<RoundMetadata> {
        let mut entries = self.entries.lock();
        let key = (chain, *round);
        match entries.get(&key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.metadata.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    fn put(&self, metadata: RoundMetadata) {
        let key = (metadata.chain_id(), metadata.id());
        let mut entries = self.entries.lock();

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, e| e.stored_at.elapsed() < ttl);
            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.stored_at)
                    .map(|(k, _)| *k);
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                metadata,
            },
        );
    }

    fn invalidate(&self, chain: ChainId, round: &Address) -> bool {
        self.entries.lock().remove(&(chain, *round)).is_some()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{MetaPtr, RoundOnChain, TokenAmount, VotingStrategy};

    fn metadata(round: Address) -> RoundMetadata {
        RoundMetadata {
            on_chain: RoundOnChain {
                id: round,
                chain_id: ChainId::POLYGON,
                token: Address::ZERO,
                round_start_time: 0,
                round_end_time: 100,
                voting_strategy: VotingStrategy {
                    id: "0xvs".into(),
                    strategy_name: "LINEAR_QUADRATIC_FUNDING".into(),
                },
                round_meta_ptr: MetaPtr::ipfs("round"),
                projects_meta_ptr: None,
            },
            name: "Round".into(),
            description: None,
            token_symbol: None,
            token_decimals: 18,
            matching_pool: TokenAmount::from_u128(1),
            matching_cap_percentage: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60), 10);
        let round = Address::repeat_byte(1);
        cache.put(metadata(round));

        assert!(cache.get(ChainId::POLYGON, &round).is_some());
        assert!(cache.get(ChainId::MAINNET, &round).is_none());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get(ChainId::POLYGON, &round).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oldest_evicted_when_full() {
        let cache = TtlCache::new(Duration::from_secs(600), 2);
        let (a, b, c) = (Address::repeat_byte(1), Address::repeat_byte(2), Address::repeat_byte(3));

        cache.put(metadata(a));
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put(metadata(b));
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put(metadata(c));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(ChainId::POLYGON, &a).is_none());
        assert!(cache.get(ChainId::POLYGON, &c).is_some());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = TtlCache::new(Duration::from_secs(600), 10);
        let (a, b) = (Address::repeat_byte(1), Address::repeat_byte(2));
        cache.put(metadata(a));
        cache.put(metadata(b));

        assert!(cache.invalidate(ChainId::POLYGON, &a));
        assert!(!cache.invalidate(ChainId::POLYGON, &a));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_noop_cache_stores_nothing() {
        let round = Address::repeat_byte(1);
        NoopCache.put(metadata(round));
        assert!(NoopCache.get(ChainId::POLYGON, &round).is_none());
    }
}
