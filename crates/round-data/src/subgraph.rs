//! GraphQL subgraph client

use async_trait::async_trait;
use common::ChainConfig;
use serde_json::{json, Value};

use crate::error::{Result, RoundDataError};
use crate::source::{HttpSourceConfig, JsonTransport, SubgraphSource};

/// POSTs `{query, variables}` to the chain's subgraph URL
#[derive(Debug, Clone)]
pub struct SubgraphClient {
    transport: JsonTransport,
}

impl SubgraphClient {
    pub fn new(config: &HttpSourceConfig) -> Result<Self> {
        Ok(Self {
            transport: JsonTransport::new("subgraph", config)?,
        })
    }
}

/// Pull `data` out of a GraphQL response, failing on a non-empty `errors` list
fn graphql_data(transport: &JsonTransport, url: &str, mut body: Value) -> Result<Value> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect();
            return Err(transport.decode(url, format!("GraphQL errors: {}", messages.join("; "))));
        }
    }

    match body.get_mut("data").map(Value::take) {
        Some(data) if data.is_object() => Ok(data),
        _ => Err(transport.decode(url, "response has no data object")),
    }
}

#[async_trait]
impl SubgraphSource for SubgraphClient {
    async fn query(&self, chain: &ChainConfig, query: &str, variables: Value) -> Result<Value> {
        let url = chain.subgraph_url.trim();
        if url.is_empty() || url.contains("${") {
            return Err(RoundDataError::Config(format!(
                "no subgraph endpoint configured for chain {}",
                chain.id
            )));
        }

        let payload = json!({ "query": query, "variables": variables });
        let body = self
            .transport
            .send(url, |client| client.post(url).json(&payload))
            .await?;
        graphql_data(&self.transport, url, body)
    }
}
