//! Contribution feed loader

use std::sync::Arc;

use common::{canonical_address, ChainConfig, Contribution, TokenAmount, U256};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{Result, RoundDataError};
use crate::source::SubgraphSource;

/// Default number of votes requested per page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

pub(crate) const VOTES_QUERY: &str = r#"
query GetVotes($votingStrategyId: String, $first: Int, $lastId: String) {
  qfvotes(
    first: $first
    where: { votingStrategy: $votingStrategyId, id_gt: $lastId }
    orderBy: id
    orderDirection: asc
  ) {
    id
    to
    amount
    token
    from
    projectId
  }
}
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVote {
    id: String,
    to: String,
    amount: Value,
    token: String,
    from: String,
    #[serde(default)]
    project_id: Option<String>,
}

impl RawVote {
    fn into_contribution(self) -> Result<Contribution> {
        let context =
            |e: common::Error| RoundDataError::validation(format!("vote {}: {}", self.id, e));

        let amount = match &self.amount {
            Value::String(s) => TokenAmount::parse(s).map_err(context)?,
            Value::Number(n) => match n.as_u64() {
                Some(v) => TokenAmount::new(U256::from(v)),
                None => {
                    return Err(RoundDataError::validation(format!(
                        "vote {}: amount {} is not a non-negative integer",
                        self.id, n
                    )))
                }
            },
            other => {
                return Err(RoundDataError::validation(format!(
                    "vote {}: amount {} is not numeric",
                    self.id, other
                )))
            }
        };

        Ok(Contribution {
            amount,
            token: canonical_address(&self.token).map_err(context)?,
            contributor: canonical_address(&self.from).map_err(context)?,
            payout_address: canonical_address(&self.to).map_err(context)?,
            project_ref: self.project_id.filter(|p| !p.is_empty()),
            usd_value: None,
            id: self.id,
        })
    }
}

/// Pages through every vote cast under a voting strategy
#[derive(Clone)]
pub struct ContributionFeedLoader {
    subgraph: Arc<dyn SubgraphSource>,
    page_size: usize,
}

impl ContributionFeedLoader {
    pub fn new(subgraph: Arc<dyn SubgraphSource>, page_size: usize) -> Self {
        Self {
            subgraph,
            page_size: page_size.max(1),
        }
    }

    pub async fn contributions(
        &self,
        chain: &ChainConfig,
        voting_strategy_id: &str,
    ) -> Result<Vec<Contribution>> {
        let strategy = voting_strategy_id.to_lowercase();
        let mut contributions = Vec::new();
        let mut last_id = String::new();
        let mut pages = 0usize;

        loop {
            let variables = json!({
                "votingStrategyId": strategy,
                "first": self.page_size,
                "lastId": last_id,
            });
            let data = self.subgraph.query(chain, VOTES_QUERY, variables).await?;
            let page: Vec<RawVote> = serde_json::from_value(data["qfvotes"].clone())
                .map_err(|e| RoundDataError::validation(format!("vote record: {}", e)))?;
            pages += 1;

            let received = page.len();
            debug!(chain_id = %chain.id, page = pages, received, "Fetched vote page");

            if let Some(last) = page.last() {
                if last.id <= last_id {
                    return Err(RoundDataError::validation(format!(
                        "vote feed did not advance past id '{}'",
                        last_id
                    )));
                }
                last_id = last.id.clone();
            }
            for vote in page {
                contributions.push(vote.into_contribution()?);
            }

            if received < self.page_size {
                break;
            }
        }

        info!(
            chain_id = %chain.id,
            voting_strategy = %strategy,
            contributions = contributions.len(),
            pages,
            "Loaded contribution feed"
        );
        Ok(contributions)
    }
}
