//! IPFS gateway client

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, RoundDataError};
use crate::source::{ContentSource, HttpSourceConfig, JsonTransport};

/// Fetches JSON documents from `https://<gateway>/ipfs/<cid>`
#[derive(Debug, Clone)]
pub struct IpfsGateway {
    base_url: String,
    transport: JsonTransport,
}

impl IpfsGateway {
    /// `gateway` is a host name, or a full base URL for non-HTTPS gateways
    pub fn new(gateway: &str, config: &HttpSourceConfig) -> Result<Self> {
        let gateway = gateway.trim().trim_end_matches('/');
        if gateway.is_empty() {
            return Err(RoundDataError::Config("empty IPFS gateway".to_string()));
        }
        let base_url = if gateway.contains("://") {
            gateway.to_string()
        } else {
            format!("https://{}", gateway)
        };

        Ok(Self {
            base_url,
            transport: JsonTransport::new("ipfs gateway", config)?,
        })
    }

    pub fn url_for(&self, cid: &str) -> String {
        format!("{}/ipfs/{}", self.base_url, cid.trim())
    }
}

#[async_trait]
impl ContentSource for IpfsGateway {
    async fn fetch(&self, pointer: &str) -> Result<Value> {
        if pointer.trim().is_empty() {
            return Err(RoundDataError::validation("empty content pointer"));
        }
        let url = self.url_for(pointer);
        self.transport.send(&url, |client| client.get(&url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_host() {
        let gateway =
            IpfsGateway::new("gitcoin.mypinata.cloud", &HttpSourceConfig::default()).unwrap();
        assert_eq!(
            gateway.url_for("bafkreiabc"),
            "https://gitcoin.mypinata.cloud/ipfs/bafkreiabc"
        );
    }

    #[test]
    fn test_url_for_full_base() {
        let gateway =
            IpfsGateway::new("http://127.0.0.1:8080/", &HttpSourceConfig::default()).unwrap();
        assert_eq!(gateway.url_for("Qm1"), "http://127.0.0.1:8080/ipfs/Qm1");
    }

    #[test]
    fn test_empty_gateway_rejected() {
        assert!(IpfsGateway::new("  ", &HttpSourceConfig::default()).is_err());
    }
}
