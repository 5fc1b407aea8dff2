//! Chain routing table
//!
//! Maps a chain id to everything that differs per chain: the price platform,
//! the subgraph endpoint, the block explorer, the testnet flag, known tokens,
//! and price aliases. Built once at startup from configuration.

use std::collections::BTreeMap;
use std::str::FromStr;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::address::{checksum, NATIVE_TOKEN};
use crate::error::{Error, Result};

/// Decimals assumed for tokens missing from the chain table
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// Default subgraph used by the local round lab deployment
pub const ROUND_LAB_SUBGRAPH: &str = "https://api.thegraph.com/subgraphs/name/bitbeckers/ql-dev";

/// EVM chain id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const MAINNET: ChainId = ChainId(1);
    pub const LOCAL_ROUND_LAB: ChainId = ChainId(3);
    pub const GOERLI: ChainId = ChainId(5);
    pub const OPTIMISM: ChainId = ChainId(10);
    pub const POLYGON: ChainId = ChainId(137);
    pub const FANTOM: ChainId = ChainId(250);
    pub const FANTOM_TESTNET: ChainId = ChainId(4002);
    pub const MUMBAI: ChainId = ChainId(80001);
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChainId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(ChainId)
            .map_err(|_| Error::invalid_input(format!("invalid chain id '{}'", s)))
    }
}

/// A token known to the chain table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    DEFAULT_TOKEN_DECIMALS
}

impl TokenInfo {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
        }
    }
}

/// Per-chain routing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub id: ChainId,
    pub name: String,
    /// Price API platform id; `None` for chains the price API does not cover
    #[serde(default)]
    pub price_platform: Option<String>,
    #[serde(default)]
    pub testnet: bool,
    pub subgraph_url: String,
    #[serde(default)]
    pub explorer_url: Option<String>,
    #[serde(default)]
    pub tokens: Vec<TokenInfo>,
    /// Token address → address whose price is used in its place
    #[serde(default)]
    pub price_aliases: BTreeMap<Address, Address>,
}

impl ChainConfig {
    pub fn token(&self, address: &Address) -> Option<&TokenInfo> {
        self.tokens.iter().find(|t| t.address == *address)
    }

    pub fn token_symbol(&self, address: &Address) -> Option<&str> {
        self.token(address).map(|t| t.symbol.as_str())
    }

    pub fn token_decimals(&self, address: &Address) -> u8 {
        self.token(address)
            .map(|t| t.decimals)
            .unwrap_or(DEFAULT_TOKEN_DECIMALS)
    }

    /// Address to query the price API with
    pub fn price_address(&self, address: &Address) -> Address {
        self.price_aliases.get(address).copied().unwrap_or(*address)
    }

    pub fn explorer_link(&self, kind: ExplorerKind, address: &Address) -> Option<String> {
        let base = self.explorer_url.as_deref()?.trim_end_matches('/');
        let segment = match kind {
            ExplorerKind::Address => "address",
            ExplorerKind::Token => "token",
        };
        Some(format!("{}/{}/{}", base, segment, checksum(address)))
    }
}

/// What an explorer link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerKind {
    Address,
    Token,
}

/// Chain id → chain config lookup, with a default chain
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: BTreeMap<ChainId, ChainConfig>,
    default_chain: ChainId,
}

impl ChainRegistry {
    /// Build the registry, rejecting duplicate ids and a missing default
    pub fn new(chains: Vec<ChainConfig>, default_chain: ChainId) -> Result<Self> {
        let mut map = BTreeMap::new();
        for chain in chains {
            let id = chain.id;
            if map.insert(id, chain).is_some() {
                return Err(Error::config(format!("duplicate chain id {}", id)));
            }
        }
        if !map.contains_key(&default_chain) {
            return Err(Error::config(format!(
                "default chain {} is not in the chain table",
                default_chain
            )));
        }
        Ok(Self {
            chains: map,
            default_chain,
        })
    }

    /// Registry over [`builtin_chains`]
    pub fn builtin() -> Self {
        let chains = builtin_chains()
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        Self {
            chains,
            default_chain: ChainId::LOCAL_ROUND_LAB,
        }
    }

    pub fn get(&self, id: ChainId) -> Option<&ChainConfig> {
        self.chains.get(&id)
    }

    pub fn require(&self, id: ChainId) -> Result<&ChainConfig> {
        self.get(id)
            .ok_or_else(|| Error::not_found(format!("unknown chain id {}", id)))
    }

    pub fn default_chain(&self) -> ChainId {
        self.default_chain
    }

    pub fn is_testnet(&self, id: ChainId) -> bool {
        self.get(id).map(|c| c.testnet).unwrap_or(false)
    }

    pub fn token_symbol(&self, id: ChainId, token: &Address) -> Option<&str> {
        self.get(id)?.token_symbol(token)
    }

    pub fn explorer_link(
        &self,
        id: ChainId,
        kind: ExplorerKind,
        address: &Address,
    ) -> Option<String> {
        self.get(id)?.explorer_link(kind, address)
    }

    pub fn chains(&self) -> impl Iterator<Item = &ChainConfig> {
        self.chains.values()
    }
}

const FANTOM_DAI: Address = address!("8d11ec38a3eb5e956b052f67da8bdc9bef8abf3e");
const FANTOM_BUSD: Address = address!("c931f61b1534eb21d8c11b24f3f5ab2471d4ab50");

/// The chains the service knows about out of the box.
///
/// Mainnet subgraph endpoints are deployment specific and are left empty
/// here; the default config file fills them from the environment.
pub fn builtin_chains() -> Vec<ChainConfig> {
    let native = |symbol: &str| TokenInfo::new(NATIVE_TOKEN, symbol, 18);

    vec![
        ChainConfig {
            id: ChainId::MAINNET,
            name: "Ethereum".into(),
            price_platform: Some("ethereum".into()),
            testnet: false,
            subgraph_url: String::new(),
            explorer_url: Some("https://etherscan.io".into()),
            tokens: vec![
                native("ETH"),
                TokenInfo::new(
                    address!("6b175474e89094c44da98b954eedeac495271d0f"),
                    "DAI",
                    18,
                ),
            ],
            price_aliases: BTreeMap::new(),
        },
        ChainConfig {
            id: ChainId::LOCAL_ROUND_LAB,
            name: "Local round lab".into(),
            price_platform: None,
            testnet: true,
            subgraph_url: ROUND_LAB_SUBGRAPH.into(),
            explorer_url: None,
            tokens: vec![native("ETH")],
            price_aliases: BTreeMap::new(),
        },
        ChainConfig {
            id: ChainId::GOERLI,
            name: "Goerli".into(),
            price_platform: None,
            testnet: true,
            subgraph_url: String::new(),
            explorer_url: Some("https://goerli.etherscan.io".into()),
            tokens: vec![native("ETH")],
            price_aliases: BTreeMap::new(),
        },
        ChainConfig {
            id: ChainId::OPTIMISM,
            name: "Optimism".into(),
            price_platform: Some("optimistic-ethereum".into()),
            testnet: false,
            subgraph_url: String::new(),
            explorer_url: Some("https://optimistic.etherscan.io".into()),
            tokens: vec![
                native("ETH"),
                TokenInfo::new(
                    address!("da10009cbd5d07dd0cecc66161fc93d7c9000da1"),
                    "DAI",
                    18,
                ),
            ],
            price_aliases: BTreeMap::new(),
        },
        ChainConfig {
            id: ChainId::POLYGON,
            name: "Polygon".into(),
            price_platform: Some("polygon-pos".into()),
            testnet: false,
            subgraph_url: ROUND_LAB_SUBGRAPH.into(),
            explorer_url: Some("https://polygonscan.com".into()),
            tokens: vec![
                native("MATIC"),
                TokenInfo::new(
                    address!("0d500b1d8e8ef31e21c99d1db9a6444d3adf1270"),
                    "WMATIC",
                    18,
                ),
            ],
            price_aliases: BTreeMap::new(),
        },
        ChainConfig {
            id: ChainId::FANTOM,
            name: "Fantom".into(),
            price_platform: Some("fantom".into()),
            testnet: false,
            subgraph_url: String::new(),
            explorer_url: Some("https://ftmscan.com".into()),
            tokens: vec![
                native("FTM"),
                TokenInfo::new(FANTOM_DAI, "DAI", 18),
                TokenInfo::new(FANTOM_BUSD, "BUSD", 18),
            ],
            price_aliases: BTreeMap::from([(FANTOM_BUSD, FANTOM_DAI)]),
        },
        ChainConfig {
            id: ChainId::FANTOM_TESTNET,
            name: "Fantom testnet".into(),
            price_platform: None,
            testnet: true,
            subgraph_url: String::new(),
            explorer_url: Some("https://testnet.ftmscan.com".into()),
            tokens: vec![native("FTM")],
            price_aliases: BTreeMap::new(),
        },
        ChainConfig {
            id: ChainId::MUMBAI,
            name: "Mumbai".into(),
            price_platform: None,
            testnet: true,
            subgraph_url: ROUND_LAB_SUBGRAPH.into(),
            explorer_url: Some("https://mumbai.polygonscan.com".into()),
            tokens: vec![
                native("MATIC"),
                TokenInfo::new(
                    address!("9c3c9283d3e44854697cd22d3faa240cfb032889"),
                    "WMATIC",
                    18,
                ),
            ],
            price_aliases: BTreeMap::new(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_builtin_table() {
        let registry = ChainRegistry::builtin();
        assert_eq!(registry.default_chain(), ChainId::LOCAL_ROUND_LAB);
        assert!(registry.is_testnet(ChainId::GOERLI));
        assert!(registry.is_testnet(ChainId::MUMBAI));
        assert!(!registry.is_testnet(ChainId::POLYGON));
        assert_eq!(
            registry.get(ChainId::OPTIMISM).unwrap().price_platform.as_deref(),
            Some("optimistic-ethereum")
        );
    }

    #[test]
    fn test_token_symbol_and_decimals() {
        let registry = ChainRegistry::builtin();
        let wmatic = address!("0d500b1d8e8ef31e21c99d1db9a6444d3adf1270");
        assert_eq!(registry.token_symbol(ChainId::POLYGON, &wmatic), Some("WMATIC"));
        assert_eq!(registry.token_symbol(ChainId::MAINNET, &wmatic), None);

        let polygon = registry.get(ChainId::POLYGON).unwrap();
        assert_eq!(polygon.token_decimals(&Address::repeat_byte(0x42)), DEFAULT_TOKEN_DECIMALS);
    }

    #[test]
    fn test_explorer_link() {
        let registry = ChainRegistry::builtin();
        let addr = address!("0d500b1d8e8ef31e21c99d1db9a6444d3adf1270");

        assert_eq!(
            registry.explorer_link(ChainId::POLYGON, ExplorerKind::Token, &addr),
            Some("https://polygonscan.com/token/0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270".into())
        );
        assert_eq!(
            registry.explorer_link(ChainId::MUMBAI, ExplorerKind::Address, &addr),
            Some(
                "https://mumbai.polygonscan.com/address/0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270"
                    .into()
            )
        );
        assert_eq!(
            registry.explorer_link(ChainId::LOCAL_ROUND_LAB, ExplorerKind::Address, &addr),
            None
        );
    }

    #[test]
    fn test_price_alias() {
        let registry = ChainRegistry::builtin();
        let fantom = registry.get(ChainId::FANTOM).unwrap();
        assert_eq!(fantom.price_address(&FANTOM_BUSD), FANTOM_DAI);
        assert_eq!(fantom.price_address(&FANTOM_DAI), FANTOM_DAI);
    }

    #[test]
    fn test_registry_rejects_bad_tables() {
        let mut chains = builtin_chains();
        chains.push(chains[0].clone());
        assert_matches!(
            ChainRegistry::new(chains, ChainId::MAINNET),
            Err(Error::Config(_))
        );

        assert_matches!(
            ChainRegistry::new(builtin_chains(), ChainId(999)),
            Err(Error::Config(_))
        );
    }

    #[test]
    fn test_chain_id_parse() {
        assert_eq!("137".parse::<ChainId>().unwrap(), ChainId::POLYGON);
        assert!("polygon".parse::<ChainId>().is_err());
    }
}
