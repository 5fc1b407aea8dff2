//! Funding overview assembler
//!
//! Loads one round end to end and runs the matching engine over it:
//!
//! 1. round metadata (the feed and registry keys come from it)
//! 2. contribution feed and project registry, concurrently
//! 3. token prices, spot or averaged over the round window
//! 4. [`compute_distribution`]
//!
//! Any failed fetch fails the round. Nothing is cached here beyond what the
//! metadata loader's injected cache holds.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::address::checksummed;
use common::{
    checksum, Address, ChainConfig, ChainId, ChainRegistry, Contribution, ExplorerKind,
    PriceTable, PricingPolicy, RoundMetadata,
};
use config::MasterConfig;
use matching_engine::{compute_distribution, DistributionResult, RoundParameters};
use observability::RoundMetrics;
use price_oracle::{
    ChainRoutingOracle, CoinGeckoConfig, CoinGeckoOracle, FixedRateOracle, PriceOracle,
};
use round_data::{
    ContentSource, ContributionFeedLoader, HttpSourceConfig, IpfsGateway, MetadataCache,
    NoopCache, ProjectResolver, RoundMetadataLoader, SubgraphClient, SubgraphSource, TtlCache,
    DEFAULT_PAGE_SIZE,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{OverviewError, Result};
use crate::summary::ContributionSummary;

/// One funding overview request
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewRequest {
    pub round_id: Address,
    /// Falls back to the registry's default chain
    pub chain_id: Option<ChainId>,
    /// Falls back to the configured policy
    pub pricing: Option<PricingPolicy>,
}

impl OverviewRequest {
    pub fn new(round_id: Address) -> Self {
        Self {
            round_id,
            chain_id: None,
            pricing: None,
        }
    }

    pub fn on_chain(mut self, chain_id: ChainId) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_pricing(mut self, pricing: PricingPolicy) -> Self {
        self.pricing = Some(pricing);
        self
    }
}

#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    pub default_pricing: PricingPolicy,
    /// Upper bound on one round, fetches included
    pub timeout: Duration,
    pub page_size: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            default_pricing: PricingPolicy::Average,
            timeout: Duration::from_secs(60),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Everything known about one round's funding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingOverview {
    #[serde(with = "checksummed")]
    pub round_id: Address,
    pub chain_id: ChainId,
    pub pricing: PricingPolicy,
    pub round_metadata: RoundMetadata,
    pub contributions: Vec<Contribution>,
    pub contribution_summary: ContributionSummary,
    pub distribution_results: DistributionResult,
}

/// Wires the loaders, the oracle and the engine together
pub struct OverviewAssembler {
    chains: Arc<ChainRegistry>,
    metadata: RoundMetadataLoader,
    feed: ContributionFeedLoader,
    projects: ProjectResolver,
    oracle: Arc<dyn PriceOracle>,
    config: AssemblerConfig,
    metrics: RoundMetrics,
}

impl OverviewAssembler {
    pub fn new(
        chains: Arc<ChainRegistry>,
        subgraph: Arc<dyn SubgraphSource>,
        content: Arc<dyn ContentSource>,
        cache: Arc<dyn MetadataCache>,
        oracle: Arc<dyn PriceOracle>,
        config: AssemblerConfig,
    ) -> Self {
        Self {
            chains,
            metadata: RoundMetadataLoader::new(subgraph.clone(), content.clone(), cache),
            feed: ContributionFeedLoader::new(subgraph, config.page_size),
            projects: ProjectResolver::new(content),
            oracle,
            config,
            metrics: RoundMetrics::new(),
        }
    }

    /// Build the production stack: subgraph and gateway clients, the
    /// metadata cache, and the live oracle routed per chain
    pub fn from_config(config: &MasterConfig) -> Result<Self> {
        let chains = Arc::new(config.chain_registry()?);
        let upstream = config.upstream();
        let engine = config.engine();
        let cache_config = config.cache();

        let http = HttpSourceConfig {
            timeout: Duration::from_millis(upstream.request_timeout_ms),
            max_concurrent_requests: upstream.max_concurrent_requests,
            retry: upstream.retry,
        };
        let subgraph = SubgraphClient::new(&http)?;
        let gateway = IpfsGateway::new(&upstream.ipfs_gateway, &http)?;

        let cache: Arc<dyn MetadataCache> = if cache_config.enabled {
            Arc::new(TtlCache::new(
                Duration::from_secs(cache_config.ttl_seconds),
                cache_config.max_entries,
            ))
        } else {
            Arc::new(NoopCache)
        };

        let live = CoinGeckoOracle::new(CoinGeckoConfig {
            base_url: upstream.price_api_base.clone(),
            api_key: upstream.price_api_key.clone(),
            timeout: http.timeout,
            max_concurrent_requests: upstream.max_concurrent_requests,
            retry: upstream.retry,
        })?;
        let oracle = ChainRoutingOracle::new(
            Arc::new(live),
            FixedRateOracle::new(engine.testnet_usd_rate),
        );

        info!(
            chains = chains.chains().count(),
            default_chain = %chains.default_chain(),
            gateway = %upstream.ipfs_gateway,
            cache = cache_config.enabled,
            pricing = %engine.pricing,
            "Overview assembler configured"
        );

        Ok(Self::new(
            chains,
            Arc::new(subgraph),
            Arc::new(gateway),
            cache,
            Arc::new(oracle),
            AssemblerConfig {
                default_pricing: engine.pricing,
                timeout: Duration::from_secs(engine.round_timeout_seconds),
                page_size: upstream.page_size,
            },
        ))
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Drop a cached round so the next request reloads it
    pub fn invalidate_round(&self, chain_id: ChainId, round_id: &Address) -> bool {
        self.metadata.cache().invalidate(chain_id, round_id)
    }

    /// Compute the funding overview for one round under the configured
    /// timeout. Cancelling `cancel` abandons every in-flight fetch.
    pub async fn funding_overview(
        &self,
        request: OverviewRequest,
        cancel: CancellationToken,
    ) -> Result<FundingOverview> {
        let timer = self.metrics.start();
        let round = checksum(&request.round_id);
        let timeout = self.config.timeout;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OverviewError::Cancelled),
            result = tokio::time::timeout(timeout, self.assemble(&request)) => {
                result.unwrap_or(Err(OverviewError::Timeout(timeout)))
            }
        };

        match &outcome {
            Ok(overview) => {
                let diagnostics = &overview.distribution_results.diagnostics;
                self.metrics.round_computed(
                    timer.elapsed(),
                    diagnostics.discarded_contributions as u64,
                    diagnostics.unresolved_tokens.len() as u64,
                );
                info!(
                    round = %round,
                    chain_id = %overview.chain_id,
                    contributions = overview.contributions.len(),
                    projects = overview.distribution_results.distribution.len(),
                    saturated = overview.distribution_results.is_saturated,
                    elapsed_ms = timer.elapsed().as_millis() as u64,
                    "Funding overview computed"
                );
            }
            Err(e) => {
                self.metrics.round_failed(e.kind(), timer.elapsed());
                if e.is_internal() {
                    error!(round = %round, kind = e.kind(), error = %e, "Funding overview failed");
                } else {
                    warn!(round = %round, kind = e.kind(), error = %e, "Funding overview failed");
                }
            }
        }
        outcome
    }

    async fn assemble(&self, request: &OverviewRequest) -> Result<FundingOverview> {
        let chain_id = request.chain_id.unwrap_or_else(|| self.chains.default_chain());
        let chain = self
            .chains
            .get(chain_id)
            .ok_or(OverviewError::UnknownChain(chain_id))?;
        let pricing = request.pricing.unwrap_or(self.config.default_pricing);

        let metadata = self.metadata.round_metadata(chain, request.round_id).await?;

        let (contributions, registry) = tokio::try_join!(
            self.feed
                .contributions(chain, &metadata.on_chain.voting_strategy.id),
            self.projects
                .resolve_projects(metadata.on_chain.projects_meta_ptr.as_ref()),
        )?;

        let prices = self.prices(chain, &metadata, &contributions, pricing).await?;

        let params = RoundParameters::from_round(&metadata, chain);
        let distribution = compute_distribution(&params, &contributions, &registry, &prices)?
            .with_explorer_links(|address| chain.explorer_link(ExplorerKind::Address, address));
        let summary = ContributionSummary::from_contributions(&contributions, &params, &prices);

        Ok(FundingOverview {
            round_id: request.round_id,
            chain_id,
            pricing,
            round_metadata: metadata,
            contributions,
            contribution_summary: summary,
            distribution_results: distribution,
        })
    }

    /// Prices for every contribution token plus the pool token.
    ///
    /// `average` samples `[roundStartTime, min(roundEndTime, now)]`; a round
    /// that has not started yet has no window and is priced at spot.
    async fn prices(
        &self,
        chain: &ChainConfig,
        metadata: &RoundMetadata,
        contributions: &[Contribution],
        pricing: PricingPolicy,
    ) -> Result<PriceTable> {
        let mut tokens: Vec<Address> = contributions.iter().map(|c| c.token).collect();
        tokens.push(metadata.token());
        tokens.sort();
        tokens.dedup();

        let table = match pricing {
            PricingPolicy::Average => match price_window(metadata, Utc::now().timestamp()) {
                Some((start, end)) => {
                    debug!(
                        chain_id = %chain.id,
                        tokens = tokens.len(),
                        start,
                        end,
                        "Averaging prices"
                    );
                    self.oracle.average_prices(chain, &tokens, start, end).await?
                }
                None => {
                    debug!(chain_id = %chain.id, "Round window is empty; using spot prices");
                    self.oracle.current_prices(chain, &tokens).await?
                }
            },
            PricingPolicy::Spot => self.oracle.current_prices(chain, &tokens).await?,
        };
        Ok(table)
    }
}

/// `[start, min(end, now)]`, or `None` when that window is empty
fn price_window(metadata: &RoundMetadata, now: i64) -> Option<(i64, i64)> {
    let start = metadata.on_chain.round_start_time;
    let end = metadata.on_chain.round_end_time.min(now);
    (end > start).then_some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{MetaPtr, RoundOnChain, TokenAmount, VotingStrategy};

    fn metadata(start: i64, end: i64) -> RoundMetadata {
        RoundMetadata {
            on_chain: RoundOnChain {
                id: Address::repeat_byte(1),
                chain_id: ChainId::POLYGON,
                token: Address::ZERO,
                round_start_time: start,
                round_end_time: end,
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
            matching_pool: TokenAmount::ZERO,
            matching_cap_percentage: None,
        }
    }

    #[test]
    fn test_price_window_closed_round() {
        assert_eq!(price_window(&metadata(100, 200), 500), Some((100, 200)));
    }

    #[test]
    fn test_price_window_running_round_ends_now() {
        assert_eq!(price_window(&metadata(100, 900), 500), Some((100, 500)));
    }

    #[test]
    fn test_price_window_not_started() {
        assert_eq!(price_window(&metadata(600, 900), 500), None);
        assert_eq!(price_window(&metadata(100, 100), 500), None);
    }

    #[test]
    fn test_request_builder() {
        let request = OverviewRequest::new(Address::repeat_byte(2))
            .on_chain(ChainId::MUMBAI)
            .with_pricing(PricingPolicy::Spot);
        assert_eq!(request.chain_id, Some(ChainId::MUMBAI));
        assert_eq!(request.pricing, Some(PricingPolicy::Spot));
    }
}
