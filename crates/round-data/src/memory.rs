//! In-memory sources for tests
//!
//! [`MemorySubgraph`] understands the two queries the loaders issue: the
//! round lookup (`rounds(...)`, keyed by `$roundId`) and the vote page
//! (`qfvotes(...)`, keyed by `$votingStrategyId` with `$first`/`$lastId`).

use std::collections::HashMap;

use async_trait::async_trait;
use common::{ChainConfig, ChainId};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::error::{Result, RoundDataError};
use crate::source::{ContentSource, SubgraphSource};

#[derive(Debug, Default)]
pub struct MemorySubgraph {
    rounds: HashMap<(ChainId, String), Value>,
    votes: HashMap<String, Vec<Value>>,
    fail: bool,
    queries: Mutex<Vec<Value>>,
}

impl MemorySubgraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a round record; the key is the record's lowercase `id`
    pub fn with_round(mut self, chain: ChainId, round: Value) -> Self {
        let id = round
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        self.rounds.insert((chain, id), round);
        self
    }

    /// Append vote records for a voting strategy
    pub fn with_votes(mut self, strategy: &str, votes: Vec<Value>) -> Self {
        self.votes
            .entry(strategy.to_lowercase())
            .or_default()
            .extend(votes);
        self
    }

    /// Every query fails as if the subgraph were down
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Variables of every query received so far
    pub fn queries(&self) -> Vec<Value> {
        self.queries.lock().clone()
    }

    fn round_page(&self, chain: ChainId, variables: &Value) -> Value {
        let id = variables["roundId"].as_str().unwrap_or_default().to_lowercase();
        let rounds: Vec<Value> = self.rounds.get(&(chain, id)).cloned().into_iter().collect();
        json!({ "rounds": rounds })
    }

    fn vote_page(&self, variables: &Value) -> Value {
        let strategy = variables["votingStrategyId"]
            .as_str()
            .unwrap_or_default()
            .to_lowercase();
        let first = variables["first"].as_u64().unwrap_or(100) as usize;
        let last_id = variables["lastId"].as_str().unwrap_or_default().to_string();

        let mut votes: Vec<Value> = self.votes.get(&strategy).cloned().unwrap_or_default();
        votes.sort_by(|a, b| {
            a["id"]
                .as_str()
                .unwrap_or_default()
                .cmp(b["id"].as_str().unwrap_or_default())
        });
        let page: Vec<Value> = votes
            .into_iter()
            .filter(|v| v["id"].as_str().unwrap_or_default() > last_id.as_str())
            .take(first)
            .collect();
        json!({ "qfvotes": page })
    }
}

#[async_trait]
impl SubgraphSource for MemorySubgraph {
    async fn query(&self, chain: &ChainConfig, query: &str, variables: Value) -> Result<Value> {
        self.queries.lock().push(variables.clone());
        if self.fail {
            return Err(RoundDataError::Unavailable {
                service: "subgraph",
                url: "memory://subgraph".to_string(),
                reason: "configured to fail".to_string(),
            });
        }

        if query.contains("qfvotes") {
            Ok(self.vote_page(&variables))
        } else if query.contains("rounds") {
            Ok(self.round_page(chain.id, &variables))
        } else {
            Err(RoundDataError::Decode {
                service: "subgraph",
                url: "memory://subgraph".to_string(),
                reason: "unsupported query".to_string(),
            })
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryContent {
    documents: HashMap<String, Value>,
    fetches: Mutex<Vec<String>>,
}

impl MemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, pointer: impl Into<String>, document: Value) -> Self {
        self.documents.insert(pointer.into(), document);
        self
    }

    /// Pointers fetched so far, in order
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().clone()
    }
}

#[async_trait]
impl ContentSource for MemoryContent {
    async fn fetch(&self, pointer: &str) -> Result<Value> {
        self.fetches.lock().push(pointer.to_string());
        self.documents
            .get(pointer)
            .cloned()
            .ok_or_else(|| RoundDataError::Status {
                service: "ipfs gateway",
                url: format!("memory://ipfs/{}", pointer),
                status: 404,
            })
    }
}
