//! Request parsing and response bodies for the overview API

use std::collections::BTreeMap;

use common::{canonical_address, ChainId, PricingPolicy, RoundOnChain};
use serde::{Deserialize, Serialize};

use crate::assembler::OverviewRequest;
use crate::error::{OverviewError, Result};

/// Error body; `message` is stable across releases
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    pub round_id: Option<String>,
    /// On-chain round fields, present when only the metadata document failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<RoundOnChain>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub invalidated: bool,
}

/// Query parameters grouped by key, keeping repeats
#[derive(Debug, Default)]
pub struct QueryParams(BTreeMap<String, Vec<String>>);

impl QueryParams {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Some(raw) = raw {
            for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
                params.entry(key.into_owned()).or_default().push(value.into_owned());
            }
        }
        Self(params)
    }

    /// At most one value for `key`
    pub fn single(&self, key: &str) -> Result<Option<&str>> {
        match self.0.get(key).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([value]) => Ok(Some(value.as_str())),
            Some(_) => Err(OverviewError::invalid_input(format!(
                "query parameter '{}' must be given once",
                key
            ))),
        }
    }

    /// Exactly one non-empty value for `key`
    pub fn required(&self, key: &str) -> Result<&str> {
        match self.single(key)? {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(OverviewError::invalid_input(format!(
                "missing query parameter '{}'",
                key
            ))),
        }
    }
}

/// `round` (required, once), `chain` and `pricing` (optional, once each)
pub fn parse_overview_request(raw: Option<&str>) -> Result<OverviewRequest> {
    let params = QueryParams::parse(raw);

    let round_id = canonical_address(params.required("round")?)?;
    let chain_id = params
        .single("chain")?
        .map(str::parse::<ChainId>)
        .transpose()?;
    let pricing = params
        .single("pricing")?
        .map(str::parse::<PricingPolicy>)
        .transpose()?;

    Ok(OverviewRequest {
        round_id,
        chain_id,
        pricing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use common::Address;

    const ROUND: &str = "0x1111111111111111111111111111111111111111";

    #[test]
    fn test_parses_all_parameters() {
        let raw = format!("round={ROUND}&chain=137&pricing=spot");
        let request = parse_overview_request(Some(&raw)).unwrap();

        assert_eq!(request.round_id, Address::repeat_byte(0x11));
        assert_eq!(request.chain_id, Some(ChainId::POLYGON));
        assert_eq!(request.pricing, Some(PricingPolicy::Spot));
    }

    #[test]
    fn test_round_only() {
        let request = parse_overview_request(Some(&format!("round={ROUND}"))).unwrap();
        assert_eq!(request.chain_id, None);
        assert_eq!(request.pricing, None);
    }

    #[test]
    fn test_missing_round() {
        assert_matches!(parse_overview_request(None), Err(OverviewError::InvalidInput(_)));
        assert_matches!(
            parse_overview_request(Some("round=&chain=1")),
            Err(OverviewError::InvalidInput(_))
        );
    }

    #[test]
    fn test_repeated_round() {
        let raw = format!("round={ROUND}&round={ROUND}");
        assert_matches!(
            parse_overview_request(Some(&raw)),
            Err(OverviewError::InvalidInput(msg)) if msg.contains("once")
        );
    }

    #[test]
    fn test_bad_values() {
        assert_matches!(
            parse_overview_request(Some("round=0x1234")),
            Err(OverviewError::InvalidInput(_))
        );
        assert_matches!(
            parse_overview_request(Some(&format!("round={ROUND}&chain=polygon"))),
            Err(OverviewError::InvalidInput(_))
        );
        assert_matches!(
            parse_overview_request(Some(&format!("round={ROUND}&pricing=median"))),
            Err(OverviewError::InvalidInput(_))
        );
    }
}
