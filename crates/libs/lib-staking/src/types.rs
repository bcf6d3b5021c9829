//! # Chain-State Types
//!
//! Inputs delivered by the chain subscription collaborator. Each value arrives whole and
//! replaces the previous one; nothing here is patched field by field.
//!
//! Constructors enforce the structural invariants (non-zero chunks, era ordering) so the
//! resolver can rely on them without re-checking.

use crate::error::{Result, StakingError};
use serde::{Deserialize, Serialize};
use shared::Quantity;
use std::fmt;

/// Era counter.
pub type EraIndex = u32;

/// The two competing ways an account can commit stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentSystem {
    /// Direct nomination from the account's own stash.
    Nominate,
    /// Membership in a nomination pool.
    Pool,
}

impl CommitmentSystem {
    pub fn other(&self) -> CommitmentSystem {
        match self {
            CommitmentSystem::Nominate => CommitmentSystem::Pool,
            CommitmentSystem::Pool => CommitmentSystem::Nominate,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CommitmentSystem::Nominate => "nominate",
            CommitmentSystem::Pool => "pool",
        }
    }
}

impl fmt::Display for CommitmentSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An unbonded amount waiting for its release era.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockChunk {
    amount: Quantity,
    release_era: EraIndex,
}

impl LockChunk {
    pub fn new(amount: Quantity, release_era: EraIndex) -> Result<Self> {
        if amount.is_zero() {
            return Err(StakingError::InvalidChainData(format!(
                "unlocking chunk for era {} has zero amount",
                release_era
            )));
        }
        Ok(Self { amount, release_era })
    }

    pub fn amount(&self) -> Quantity {
        self.amount
    }

    pub fn release_era(&self) -> EraIndex {
        self.release_era
    }

    /// Withdrawable once the current era reaches the release era.
    pub fn is_unlocked_at(&self, current_era: EraIndex) -> bool {
        self.release_era <= current_era
    }
}

/// One system's commitment for one account: active bond plus pending unlocks.
///
/// Chunks are held in ascending release-era order. Chunks sharing an era stay distinct;
/// only the chain consolidates them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitmentEntry {
    active: Quantity,
    unlocking: Vec<LockChunk>,
}

impl CommitmentEntry {
    pub fn new(active: Quantity, mut unlocking: Vec<LockChunk>) -> Self {
        // stable: chunks with equal eras keep their delivery order
        unlocking.sort_by_key(LockChunk::release_era);
        Self { active, unlocking }
    }

    /// Build from raw `(amount, release_era)` pairs, rejecting zero-amount chunks.
    pub fn from_raw(active: Quantity, chunks: &[(Quantity, EraIndex)]) -> Result<Self> {
        let unlocking = chunks
            .iter()
            .map(|&(amount, era)| LockChunk::new(amount, era))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(active, unlocking))
    }

    pub fn active(&self) -> Quantity {
        self.active
    }

    pub fn unlocking(&self) -> &[LockChunk] {
        &self.unlocking
    }

    /// Sum of all unlocking chunks, `None` on overflow.
    pub fn unlocking_total(&self) -> Option<Quantity> {
        Quantity::checked_sum(self.unlocking.iter().map(LockChunk::amount))
    }

    /// `active + Σ chunks`, `None` on overflow.
    pub fn total(&self) -> Option<Quantity> {
        self.unlocking_total()?.checked_add(self.active)
    }
}

/// Both commitment systems for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountCommitments {
    pub nominate: CommitmentEntry,
    pub pool: CommitmentEntry,
}

impl AccountCommitments {
    pub fn get(&self, system: CommitmentSystem) -> &CommitmentEntry {
        match system {
            CommitmentSystem::Nominate => &self.nominate,
            CommitmentSystem::Pool => &self.pool,
        }
    }
}

/// Balance state of one account as of `current_era`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalanceSnapshot {
    pub free: Quantity,
    pub reserved: Quantity,
    pub existential_deposit: Quantity,
    pub current_era: EraIndex,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(v: u128) -> Quantity {
        Quantity::new(v)
    }

    #[test]
    fn test_zero_chunk_rejected() {
        assert!(matches!(
            LockChunk::new(Quantity::ZERO, 12),
            Err(StakingError::InvalidChainData(_))
        ));
        assert!(CommitmentEntry::from_raw(q(5), &[(q(1), 3), (q(0), 4)]).is_err());
    }

    #[test]
    fn test_chunks_sorted_without_merging() {
        let entry = CommitmentEntry::from_raw(q(50), &[(q(3), 90), (q(1), 80), (q(2), 80)]).unwrap();
        let chunks: Vec<(u128, EraIndex)> = entry
            .unlocking()
            .iter()
            .map(|c| (c.amount().planck(), c.release_era()))
            .collect();
        assert_eq!(chunks, vec![(1, 80), (2, 80), (3, 90)]);
    }

    #[test]
    fn test_totals() {
        let entry = CommitmentEntry::from_raw(q(50), &[(q(10), 100), (q(5), 101)]).unwrap();
        assert_eq!(entry.unlocking_total(), Some(q(15)));
        assert_eq!(entry.total(), Some(q(65)));

        let huge = CommitmentEntry::from_raw(q(u128::MAX), &[(q(1), 1)]).unwrap();
        assert_eq!(huge.total(), None);
    }

    #[test]
    fn test_other_system() {
        assert_eq!(CommitmentSystem::Nominate.other(), CommitmentSystem::Pool);
        assert_eq!(CommitmentSystem::Pool.other(), CommitmentSystem::Nominate);
    }

    #[test]
    fn test_get_by_system() {
        let commitments = AccountCommitments {
            nominate: CommitmentEntry::new(q(7), Vec::new()),
            pool: CommitmentEntry::new(q(3), Vec::new()),
        };
        assert_eq!(commitments.get(CommitmentSystem::Nominate).active(), q(7));
        assert_eq!(commitments.get(CommitmentSystem::Pool).active(), q(3));
        assert_eq!(CommitmentSystem::Pool.to_string(), "pool");
    }
}
