//! Address canonicalization
//!
//! Every address entering the system (feed records, registry payout
//! addresses, round ids, token addresses) goes through [`canonical_address`].
//! All-lowercase and all-uppercase inputs are accepted as-is; mixed-case
//! inputs must carry a valid EIP-55 checksum.

use std::str::FromStr;

use alloy_primitives::Address;

use crate::error::{Error, Result};

/// The zero address, used as the token address of a chain's native gas token
pub const NATIVE_TOKEN: Address = Address::ZERO;

/// Parse and validate an address string.
pub fn canonical_address(raw: &str) -> Result<Address> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex.len() != 40 {
        return Err(Error::invalid_address(raw, "expected 20 bytes of hex"));
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::invalid_address(raw, "non-hex character"));
    }

    let address =
        Address::from_str(hex).map_err(|e| Error::invalid_address(raw, e.to_string()))?;

    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        let expected = checksum(&address);
        if &expected[2..] != hex {
            return Err(Error::invalid_address(raw, "bad checksum"));
        }
    }

    Ok(address)
}

/// EIP-55 checksummed form of an address
pub fn checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Serde adapter emitting checksummed addresses and validating on input.
pub mod checksummed {
    use alloy_primitives::Address;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::checksum(address))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::canonical_address(&raw).map_err(D::Error::custom)
    }

    /// Same as the parent module, for `Option<Address>` fields.
    pub mod option {
        use alloy_primitives::Address;
        use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            address: &Option<Address>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match address {
                Some(address) => serializer.serialize_str(&super::super::checksum(address)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Address>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::super::canonical_address(&raw).map_err(D::Error::custom))
                .transpose()
        }
    }
}
