//! # Staking Reconciliation Core
//!
//! Combines chain balances, nomination locks and pool membership into the derived
//! [`TransferOptions`](shared::TransferOptions) a staking dashboard displays, alongside two
//! sibling feeds: the market [`PriceFeed`] and the pending-transaction [`FeeEstimator`].
//!
//! ## Modules
//!
//! - [`feed`]: reactive single-value cache shared by every component
//! - [`ledger`]: per-account chain state behind a context guard
//! - [`resolver`]: pure derivation of transfer options, memoized
//! - [`engine`]: account lifecycle and chain subscriptions
//! - [`price`] / [`oracle`] / [`store`]: polled, persisted market price
//! - [`fees`]: fee estimate bound to sender and intent
//!
//! ## Example
//!
//! ```rust,no_run
//! use lib_staking::{HttpPriceOracle, MemoryStore, Network, PriceFeed, PriceFeedOptions};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> lib_staking::Result<()> {
//! let oracle = HttpPriceOracle::new("https://api.binance.com/api/v3/ticker/24hr", Duration::from_secs(10))?;
//! let prices = PriceFeed::new(Arc::new(oracle), Arc::new(MemoryStore::new()), PriceFeedOptions::default());
//! prices.start(Network::Polkadot);
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod engine;
pub mod error;
pub mod feed;
pub mod fees;
pub mod ledger;
pub mod network;
pub mod oracle;
pub mod price;
pub mod resolver;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;

pub use chain::ChainSource;
pub use engine::{ChangeCallback, StakingCommands, StakingEngine, StakingReadModel};
pub use error::{Result, StakingError};
pub use feed::{SourceFeed, Subscription};
pub use fees::{FeeEstimator, FeeQuoter, FeeSession};
pub use ledger::{CommitmentLedger, ContextId, LedgerChange, LedgerSnapshot};
pub use network::{Network, Service, MAX_UNLOCKING_CHUNKS};
pub use oracle::{HttpPriceOracle, PriceOracle, PriceQuote};
pub use price::{PriceFeed, PriceFeedOptions};
pub use resolver::{resolve_transfer_options, TransferOptionsResolver};
pub use store::{FileStore, LocalStore, MemoryStore};
pub use types::{
    AccountBalanceSnapshot, AccountCommitments, CommitmentEntry, CommitmentSystem, EraIndex,
    LockChunk,
};
