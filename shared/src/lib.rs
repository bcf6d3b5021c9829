//! # Shared Value Types Library
//!
//! Types exchanged between the reconciliation core and the presentation layer.
//!
//! ## Structure
//!
//! - **[`quantity`]**: [`Quantity`], the exact planck amount used for every on-chain balance
//! - **[`dto`]**: Read-model snapshots
//!   - **[`dto::staking`]**: `TransferOptions`, `CommitmentBreakdown`, `PriceState`, `FeeState`,
//!     `Address`, `IntentId`
//! - **[`utils`]**: Address formatting helpers
//!
//! ## Usage
//!
//! ```rust
//! use shared::{Quantity, TransferOptions};
//!
//! let options = TransferOptions::default();
//! assert_eq!(options.free_balance, Quantity::ZERO);
//! ```

pub mod dto;
pub mod quantity;
pub mod utils;

// Wildcard re-exports: shared is a DTO library where all exports are public API
pub use dto::*;
pub use quantity::{ParseQuantityError, Quantity};
pub use utils::*;
