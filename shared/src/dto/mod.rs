//! # Data Transfer Objects (DTOs)
//!
//! Read-model snapshots the reconciliation core hands to presentation code.
//!
//! ## Module Organization
//!
//! - [`staking`] - Transfer options, price and fee snapshots, address and intent identifiers
//!
//! ## Serialization Format
//!
//! All DTOs use `serde_json` for JSON serialization:
//!
//! - **Field naming**: snake_case (default serde behavior)
//! - **Optional fields**: Omitted when `None` using `#[serde(skip_serializing_if = "Option::is_none")]`
//! - **Amounts**: [`crate::Quantity`] serializes as a decimal string
//! - **Prices**: `rust_decimal::Decimal` serializes as a decimal string
//!
//! ## Example JSON
//!
//! ```text
//! {
//!   "free_balance": "1000000000000",
//!   "transferrable_balance": "400000000000",
//!   "ed_reserved": "10000000000",
//!   "force_reserved": "0",
//!   "nominate": {
//!     "active": "500000000000",
//!     "total_unlocking": "100000000000",
//!     "total_unlocked": "0",
//!     "total_possible_bond": "900000000000",
//!     "total_additional_bond": "400000000000",
//!     "total_unlock_chunks": 1
//!   },
//!   "pool": { ... }
//! }
//! ```

pub mod staking;

pub use staking::*;
