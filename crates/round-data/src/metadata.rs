//! Round metadata loader
//!
//! Reads the round's on-chain fields from the subgraph, then the metadata
//! document its `roundMetaPtr` points at. A round that exists on-chain but
//! whose document is missing or malformed is reported with its on-chain
//! fields so callers can still show something.

use std::sync::Arc;

use common::{
    canonical_address, checksum, Address, ChainConfig, MetaPtr, RoundMetadata, RoundOnChain,
    TokenAmount, VotingStrategy,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::cache::MetadataCache;
use crate::error::{Result, RoundDataError};
use crate::source::{ContentSource, SubgraphSource};

pub(crate) const ROUND_QUERY: &str = r#"
query GetMetadata($roundId: String) {
  rounds(where: { id: $roundId }) {
    id
    votingStrategy { id strategyName }
    roundStartTime
    roundEndTime
    token
    roundMetaPtr { protocol pointer }
    projectsMetaPtr { protocol pointer }
  }
}
"#;

/// Only IPFS pointers are dereferenced
pub const IPFS_PROTOCOL: u64 = 1;

/// Subgraph scalars: BigInt arrives as a string, Int as a number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Text(String),
    Int(i64),
}

impl Scalar {
    pub(crate) fn as_i64(&self, field: &str) -> Result<i64> {
        match self {
            Scalar::Int(v) => Ok(*v),
            Scalar::Text(s) => s.trim().parse().map_err(|_| {
                RoundDataError::validation(format!("{} is not an integer: '{}'", field, s))
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMetaPtr {
    protocol: Scalar,
    pointer: String,
}

impl RawMetaPtr {
    pub(crate) fn into_meta_ptr(self) -> Result<MetaPtr> {
        let protocol = self.protocol.as_i64("protocol")?;
        let protocol = u64::try_from(protocol)
            .map_err(|_| RoundDataError::validation(format!("negative protocol {}", protocol)))?;
        Ok(MetaPtr {
            protocol,
            pointer: self.pointer,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRound {
    id: String,
    voting_strategy: VotingStrategy,
    round_start_time: Scalar,
    round_end_time: Scalar,
    token: String,
    round_meta_ptr: RawMetaPtr,
    #[serde(default)]
    projects_meta_ptr: Option<RawMetaPtr>,
}

impl RawRound {
    fn into_on_chain(self, chain: &ChainConfig) -> Result<RoundOnChain> {
        Ok(RoundOnChain {
            id: canonical_address(&self.id)?,
            chain_id: chain.id,
            token: canonical_address(&self.token)?,
            round_start_time: self.round_start_time.as_i64("roundStartTime")?,
            round_end_time: self.round_end_time.as_i64("roundEndTime")?,
            voting_strategy: self.voting_strategy,
            round_meta_ptr: self.round_meta_ptr.into_meta_ptr()?,
            projects_meta_ptr: self
                .projects_meta_ptr
                .map(RawMetaPtr::into_meta_ptr)
                .transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoundDocument {
    name: String,
    #[serde(default)]
    eligibility: Option<Eligibility>,
    matching_funds: MatchingFunds,
}

#[derive(Debug, Deserialize)]
struct Eligibility {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchingFunds {
    /// Whole tokens; number or numeric string
    matching_funds_available: Value,
    #[serde(default)]
    matching_cap: Option<bool>,
    #[serde(default)]
    matching_cap_amount: Option<f64>,
}

impl MatchingFunds {
    fn pool(&self, decimals: u8) -> std::result::Result<TokenAmount, String> {
        let raw = match &self.matching_funds_available {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            other => return Err(format!("matchingFundsAvailable is not numeric: {}", other)),
        };
        TokenAmount::from_decimal_str(&raw, decimals).map_err(|e| e.to_string())
    }

    /// The cap applies unless the document explicitly disables it
    fn cap(&self) -> Option<f64> {
        match self.matching_cap {
            Some(false) => None,
            _ => self.matching_cap_amount,
        }
    }
}

/// Resolves a round id to its [`RoundMetadata`]
#[derive(Clone)]
pub struct RoundMetadataLoader {
    subgraph: Arc<dyn SubgraphSource>,
    content: Arc<dyn ContentSource>,
    cache: Arc<dyn MetadataCache>,
}

impl RoundMetadataLoader {
    pub fn new(
        subgraph: Arc<dyn SubgraphSource>,
        content: Arc<dyn ContentSource>,
        cache: Arc<dyn MetadataCache>,
    ) -> Self {
        Self {
            subgraph,
            content,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<dyn MetadataCache> {
        &self.cache
    }

    pub async fn round_metadata(
        &self,
        chain: &ChainConfig,
        round_id: Address,
    ) -> Result<RoundMetadata> {
        if let Some(cached) = self.cache.get(chain.id, &round_id) {
            debug!(chain_id = %chain.id, round = %checksum(&round_id), "Round metadata cache hit");
            return Ok(cached);
        }

        let on_chain = self.on_chain_round(chain, round_id).await?;
        let metadata = self.with_document(chain, on_chain).await?;

        info!(
            chain_id = %chain.id,
            round = %checksum(&round_id),
            name = %metadata.name,
            pool = %metadata.matching_pool,
            cap = ?metadata.matching_cap_percentage,
            "Loaded round metadata"
        );
        self.cache.put(metadata.clone());
        Ok(metadata)
    }

    async fn on_chain_round(&self, chain: &ChainConfig, round_id: Address) -> Result<RoundOnChain> {
        let round_key = checksum(&round_id).to_lowercase();
        let data = self
            .subgraph
            .query(chain, ROUND_QUERY, json!({ "roundId": round_key }))
            .await?;

        let mut rounds: Vec<RawRound> = serde_json::from_value(data["rounds"].clone())
            .map_err(|e| RoundDataError::validation(format!("round record: {}", e)))?;
        if rounds.is_empty() {
            return Err(RoundDataError::RoundNotFound {
                chain_id: chain.id,
                round_id: checksum(&round_id),
            });
        }
        rounds.swap_remove(0).into_on_chain(chain)
    }

    async fn with_document(
        &self,
        chain: &ChainConfig,
        on_chain: RoundOnChain,
    ) -> Result<RoundMetadata> {
        let ptr = &on_chain.round_meta_ptr;
        if ptr.protocol != IPFS_PROTOCOL {
            let reason = format!("unsupported metadata protocol {}", ptr.protocol);
            return Err(RoundDataError::metadata_unavailable(on_chain, reason));
        }

        let raw = match self.content.fetch(&ptr.pointer).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    round = %checksum(&on_chain.id),
                    error = %e,
                    "Round metadata document unavailable"
                );
                return Err(RoundDataError::metadata_unavailable(on_chain, e));
            }
        };

        let document: RoundDocument = match serde_json::from_value(raw) {
            Ok(document) => document,
            Err(e) => return Err(RoundDataError::metadata_unavailable(on_chain, e)),
        };

        let decimals = chain.token_decimals(&on_chain.token);
        let matching_pool = match document.matching_funds.pool(decimals) {
            Ok(pool) => pool,
            Err(reason) => return Err(RoundDataError::metadata_unavailable(on_chain, reason)),
        };

        Ok(RoundMetadata {
            name: document.name,
            description: document.eligibility.and_then(|e| e.description),
            token_symbol: chain.token_symbol(&on_chain.token).map(str::to_string),
            token_decimals: decimals,
            matching_pool,
            matching_cap_percentage: document.matching_funds.cap(),
            on_chain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{NoopCache, TtlCache};
    use crate::memory::{MemoryContent, MemorySubgraph};
    use assert_matches::assert_matches;
    use common::{ChainId, ChainRegistry};
    use std::time::Duration;

    const ROUND: &str = "0x1111111111111111111111111111111111111111";
    const WMATIC: &str = "0x0d500b1d8e8ef31e21c99d1db9a6444d3adf1270";

    fn polygon() -> ChainConfig {
        ChainRegistry::builtin().get(ChainId::POLYGON).unwrap().clone()
    }

    fn round_record(token: &str) -> Value {
        json!({
            "id": ROUND,
            "votingStrategy": { "id": "0xvs", "strategyName": "LINEAR_QUADRATIC_FUNDING" },
            "roundStartTime": "1000",
            "roundEndTime": "2000",
            "token": token,
            "roundMetaPtr": { "protocol": "1", "pointer": "round-doc" },
            "projectsMetaPtr": { "protocol": 1, "pointer": "projects-doc" }
        })
    }

    fn document(matching_funds: Value) -> Value {
        json!({
            "name": "Tipping Round",
            "eligibility": { "description": "Posts about Rust" },
            "matchingFunds": matching_funds
        })
    }

    fn loader(subgraph: MemorySubgraph, content: MemoryContent) -> RoundMetadataLoader {
        RoundMetadataLoader::new(Arc::new(subgraph), Arc::new(content), Arc::new(NoopCache))
    }

    fn round_id() -> Address {
        canonical_address(ROUND).unwrap()
    }

    #[tokio::test]
    async fn test_loads_round_and_document() {
        let loader = loader(
            MemorySubgraph::new().with_round(ChainId::POLYGON, round_record(WMATIC)),
            MemoryContent::new().with_document(
                "round-doc",
                document(json!({ "matchingFundsAvailable": 1000.5, "matchingCapAmount": 20 })),
            ),
        );

        let metadata = loader.round_metadata(&polygon(), round_id()).await.unwrap();

        assert_eq!(metadata.name, "Tipping Round");
        assert_eq!(metadata.description.as_deref(), Some("Posts about Rust"));
        assert_eq!(metadata.on_chain.round_start_time, 1000);
        assert_eq!(metadata.on_chain.voting_strategy.id, "0xvs");
        assert_eq!(metadata.on_chain.projects_meta_ptr, Some(MetaPtr::ipfs("projects-doc")));
        assert_eq!(metadata.token_symbol.as_deref(), Some("WMATIC"));
        assert_eq!(metadata.token_decimals, 18);
        assert_eq!(
            metadata.matching_pool,
            TokenAmount::from_u128(1_000_500_000_000_000_000_000)
        );
        assert_eq!(metadata.matching_cap_percentage, Some(20.0));
    }

    #[tokio::test]
    async fn test_disabled_cap_is_ignored() {
        let loader = loader(
            MemorySubgraph::new().with_round(ChainId::POLYGON, round_record(WMATIC)),
            MemoryContent::new().with_document(
                "round-doc",
                document(json!({
                    "matchingFundsAvailable": "10",
                    "matchingCap": false,
                    "matchingCapAmount": 20
                })),
            ),
        );

        let metadata = loader.round_metadata(&polygon(), round_id()).await.unwrap();
        assert_eq!(metadata.matching_cap_percentage, None);
    }

    #[tokio::test]
    async fn test_unknown_round_is_not_found() {
        let loader = loader(MemorySubgraph::new(), MemoryContent::new());
        assert_matches!(
            loader.round_metadata(&polygon(), round_id()).await,
            Err(RoundDataError::RoundNotFound { chain_id: ChainId::POLYGON, .. })
        );
    }

    #[tokio::test]
    async fn test_missing_document_carries_on_chain_fields() {
        let loader = loader(
            MemorySubgraph::new().with_round(ChainId::POLYGON, round_record(WMATIC)),
            MemoryContent::new(),
        );

        let err = loader.round_metadata(&polygon(), round_id()).await.unwrap_err();
        assert_matches!(
            err,
            RoundDataError::MetadataUnavailable { round, .. }
                if round.id == round_id() && round.round_end_time == 2000
        );
    }

    #[tokio::test]
    async fn test_malformed_document_is_metadata_unavailable() {
        let loader = loader(
            MemorySubgraph::new().with_round(ChainId::POLYGON, round_record(WMATIC)),
            MemoryContent::new().with_document("round-doc", json!({ "name": "no funds" })),
        );

        assert_matches!(
            loader.round_metadata(&polygon(), round_id()).await,
            Err(RoundDataError::MetadataUnavailable { .. })
        );
    }

    #[tokio::test]
    async fn test_subgraph_failure_propagates() {
        let loader = loader(MemorySubgraph::new().failing(), MemoryContent::new());
        let err = loader.round_metadata(&polygon(), round_id()).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_lookups() {
        let content = Arc::new(MemoryContent::new().with_document(
            "round-doc",
            document(json!({ "matchingFundsAvailable": 1 })),
        ));
        let cache = Arc::new(TtlCache::new(Duration::from_secs(300), 10));
        let loader = RoundMetadataLoader::new(
            Arc::new(MemorySubgraph::new().with_round(ChainId::POLYGON, round_record(WMATIC))),
            content.clone(),
            cache.clone(),
        );

        loader.round_metadata(&polygon(), round_id()).await.unwrap();
        loader.round_metadata(&polygon(), round_id()).await.unwrap();
        assert_eq!(content.fetches().len(), 1);

        assert!(cache.invalidate(ChainId::POLYGON, &round_id()));
        loader.round_metadata(&polygon(), round_id()).await.unwrap();
        assert_eq!(content.fetches().len(), 2);
    }
}
