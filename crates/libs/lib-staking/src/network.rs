//! # Networks and Services
//!
//! Static per-network parameters and the set of optional external services.

use crate::error::StakingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chain-enforced maximum number of unlocking chunks per ledger.
pub const MAX_UNLOCKING_CHUNKS: u32 = 32;

/// Supported networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Polkadot,
    Kusama,
    Westend,
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::Polkadot => "polkadot",
            Network::Kusama => "kusama",
            Network::Westend => "westend",
        }
    }

    /// Token symbol.
    pub fn unit(&self) -> &'static str {
        match self {
            Network::Polkadot => "DOT",
            Network::Kusama => "KSM",
            Network::Westend => "WND",
        }
    }

    /// Market ticker queried from the price oracle.
    ///
    /// Westend tokens have no market, so the testnet mirrors the Polkadot price.
    pub fn price_ticker(&self) -> &'static str {
        match self {
            Network::Polkadot | Network::Westend => "DOTUSDT",
            Network::Kusama => "KSMUSDT",
        }
    }

    pub fn max_unlocking_chunks(&self) -> u32 {
        MAX_UNLOCKING_CHUNKS
    }

    /// `true` once no further unbond can be queued without withdrawing first.
    pub fn unlock_chunks_exhausted(&self, total_unlock_chunks: u32) -> bool {
        total_unlock_chunks >= self.max_unlocking_chunks()
    }

    /// Local-store key namespaced to this network, e.g. `"polkadot_prices"`.
    pub fn storage_key(&self, suffix: &str) -> String {
        format!("{}_{}", self.name(), suffix)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = StakingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "polkadot" => Ok(Network::Polkadot),
            "kusama" => Ok(Network::Kusama),
            "westend" => Ok(Network::Westend),
            other => Err(StakingError::UnknownNetwork(other.to_string())),
        }
    }
}

/// Optional external services the user can switch on and off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    /// Spot price ticker backing the price feed.
    BinanceSpot,
    /// Indexer used for reward history.
    Subscan,
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Service::BinanceSpot => "binance_spot",
            Service::Subscan => "subscan",
        }
    }

    /// Parse a list of service names, skipping (and logging) unknown entries.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Vec<Service> {
        names
            .iter()
            .filter_map(|name| match name.as_ref().trim() {
                "binance_spot" => Some(Service::BinanceSpot),
                "subscan" => Some(Service::Subscan),
                unknown => {
                    tracing::warn!(service = unknown, "Ignoring unknown service");
                    None
                }
            })
            .collect()
    }
}
