//! # Staking Read-Model DTOs
//!
//! Snapshots handed to presentation code. All of them are plain values: the reconciliation
//! core builds a fresh one on every change and consumers never mutate them in place.

use crate::quantity::Quantity;
use crate::utils::truncate_address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// SS58-encoded account address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for logs and labels (`"1FRM...uYKz"`).
    pub fn short(&self) -> String {
        truncate_address(&self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

/// Identifies one transaction-building cycle (e.g. `"bond_extra"`, `"pool_unbond"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentId(String);

impl IntentId {
    pub fn new(intent: impl Into<String>) -> Self {
        Self(intent.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IntentId {
    fn from(intent: &str) -> Self {
        Self(intent.to_string())
    }
}

/// Per-system view of what is bonded, unlocking and still bondable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentBreakdown {
    /// Currently bonded and earning.
    pub active: Quantity,
    /// Sum of chunks whose release era has not been reached.
    pub total_unlocking: Quantity,
    /// Sum of chunks that can be withdrawn now.
    pub total_unlocked: Quantity,
    /// Largest active bond this system could hold given the free balance.
    pub total_possible_bond: Quantity,
    /// How much more can be bonded on top of `active`.
    pub total_additional_bond: Quantity,
    /// Number of unlocking chunks, compared against the chain's chunk limit.
    pub total_unlock_chunks: u32,
}

/// What an account can do with its balance right now.
///
/// `TransferOptions::default()` is the neutral "no data yet" snapshot: every amount is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOptions {
    /// Free balance after the existential deposit portion drawn from free funds.
    pub free_balance: Quantity,
    /// Free balance not committed to either staking system.
    pub transferrable_balance: Quantity,
    /// Portion of the existential deposit held back to keep the account alive.
    pub ed_reserved: Quantity,
    /// Reserved funds beyond the existential deposit (application-specific reservations).
    pub force_reserved: Quantity,
    pub nominate: CommitmentBreakdown,
    pub pool: CommitmentBreakdown,
}

/// Last known market price for the active network's token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceState {
    /// Price in USD.
    pub last_price: Decimal,
    /// 24-hour change, in percent.
    pub change: Decimal,
    /// Unix timestamp (seconds) of the poll that produced this value; 0 when never polled.
    pub timestamp: u64,
}

/// Fee estimate for the pending transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeState {
    pub fee: Quantity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_for: Option<IntentId>,
    /// `false` whenever the fee was not quoted for the current sender and intent.
    pub valid: bool,
}
