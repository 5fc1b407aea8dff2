//! Round data loaders
//!
//! Everything the matching engine needs to know about a round, read from
//! the chain's subgraph and the IPFS gateway.
//!
//! # Core Components
//!
//! - [`RoundMetadataLoader`] - round id → [`RoundMetadata`](common::RoundMetadata)
//! - [`ContributionFeedLoader`] - voting strategy → ordered vote events
//! - [`ProjectResolver`] - projects document to an approved
//!   [`ProjectRegistry`](common::ProjectRegistry)
//! - [`MetadataCache`] - injected cache for round metadata ([`TtlCache`], [`NoopCache`])
//! - [`SubgraphSource`] / [`ContentSource`] - the upstream seams, with
//!   reqwest clients and in-memory fakes

pub mod cache;
pub mod contributions;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod metadata;
pub mod projects;
pub mod source;
pub mod subgraph;

pub use cache::{MetadataCache, NoopCache, TtlCache};
pub use contributions::{ContributionFeedLoader, DEFAULT_PAGE_SIZE};
pub use error::{Result, RoundDataError};
pub use gateway::IpfsGateway;
pub use memory::{MemoryContent, MemorySubgraph};
pub use metadata::RoundMetadataLoader;
pub use projects::ProjectResolver;
pub use source::{ContentSource, HttpSourceConfig, SubgraphSource};
pub use subgraph::SubgraphClient;
