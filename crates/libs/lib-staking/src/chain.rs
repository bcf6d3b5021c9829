//! # Chain Source
//!
//! Boundary to the chain subscription transport. Implementations deliver whole values;
//! the engine never patches ledger state from partial updates.

use crate::types::{AccountBalanceSnapshot, AccountCommitments};
use futures::stream::BoxStream;
use shared::Address;

/// Push-based source of per-account chain state.
///
/// Each call opens an independent subscription. Dropping the stream ends it.
pub trait ChainSource: Send + Sync {
    /// Balance snapshots for `account`, each replacing the last.
    fn subscribe_balance(&self, account: &Address) -> BoxStream<'static, AccountBalanceSnapshot>;

    /// Nomination and pool commitments for `account`, each replacing the last.
    fn subscribe_commitments(&self, account: &Address) -> BoxStream<'static, AccountCommitments>;
}
