//! # Transfer Options Resolver
//!
//! Derives [`TransferOptions`] from an account's balance snapshot and commitments.
//!
//! ## Balance Partition
//!
//! The existential deposit is covered from reserved funds first, then from free funds:
//!
//! ```text
//! ed_from_reserved = min(reserved, ed)
//! ed_from_free     = min(free, ed - ed_from_reserved)
//! ed_reserved      = ed_from_reserved + ed_from_free
//! force_reserved   = reserved - ed_from_reserved
//! free_balance     = free - ed_from_free
//! ```
//!
//! `free_balance + force_reserved + ed_reserved == free + reserved` is checked on every
//! resolution, as is the unlocked/unlocking split of each system's chunks.
//!
//! ## Bond Capacity
//!
//! Each system's capacity is computed against the same `free_balance` minus everything
//! committed to the *other* system. The two capacities are not capped jointly.
//!
//! ## Memoization
//!
//! [`TransferOptionsResolver`] caches one result per account keyed by ledger context,
//! era and ledger version, so unchanged inputs never recompute.

use crate::error::{Result, StakingError};
use crate::ledger::{CommitmentLedger, ContextId};
use crate::types::{AccountBalanceSnapshot, AccountCommitments, CommitmentSystem, EraIndex};
use parking_lot::Mutex;
use shared::{Address, CommitmentBreakdown, Quantity, TransferOptions};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Pure derivation of [`TransferOptions`]; identical inputs give identical output.
pub fn resolve_transfer_options(
    balance: &AccountBalanceSnapshot,
    commitments: &AccountCommitments,
) -> Result<TransferOptions> {
    let free = balance.free;
    let reserved = balance.reserved;
    let ed = balance.existential_deposit;

    let ed_from_reserved = reserved.min(ed);
    let ed_from_free = free.min(ed.saturating_sub(ed_from_reserved));
    let ed_reserved = ed_from_reserved
        .checked_add(ed_from_free)
        .ok_or(StakingError::Overflow("ed_reserved"))?;
    let force_reserved = reserved.saturating_sub(ed_from_reserved);
    let free_balance = free.saturating_sub(ed_from_free);

    let inputs = free
        .checked_add(reserved)
        .ok_or(StakingError::Overflow("free + reserved"))?;
    let parts = free_balance
        .checked_add(force_reserved)
        .and_then(|sum| sum.checked_add(ed_reserved))
        .ok_or(StakingError::Overflow("balance partition"))?;
    if parts != inputs {
        return Err(StakingError::Invariant(format!(
            "balance partition {} does not match free + reserved {}",
            parts, inputs
        )));
    }

    let nominate_total = committed(commitments, CommitmentSystem::Nominate)?;
    let pool_total = committed(commitments, CommitmentSystem::Pool)?;

    let nominate = breakdown(
        commitments,
        CommitmentSystem::Nominate,
        free_balance,
        pool_total,
        balance.current_era,
    )?;
    let pool = breakdown(
        commitments,
        CommitmentSystem::Pool,
        free_balance,
        nominate_total,
        balance.current_era,
    )?;

    let transferrable_balance = free_balance
        .saturating_sub(nominate_total)
        .saturating_sub(pool_total);

    Ok(TransferOptions {
        free_balance,
        transferrable_balance,
        ed_reserved,
        force_reserved,
        nominate,
        pool,
    })
}

fn committed(commitments: &AccountCommitments, system: CommitmentSystem) -> Result<Quantity> {
    commitments
        .get(system)
        .total()
        .ok_or(StakingError::Overflow(system.label()))
}

/// `other_committed` is the full commitment of `system.other()`.
fn breakdown(
    commitments: &AccountCommitments,
    system: CommitmentSystem,
    free_balance: Quantity,
    other_committed: Quantity,
    current_era: EraIndex,
) -> Result<CommitmentBreakdown> {
    let entry = commitments.get(system);
    let overflow = || StakingError::Overflow(system.label());
    let mut total_unlocked = Quantity::ZERO;
    let mut total_unlocking = Quantity::ZERO;

    for chunk in entry.unlocking() {
        let bucket = if chunk.is_unlocked_at(current_era) {
            &mut total_unlocked
        } else {
            &mut total_unlocking
        };
        *bucket = bucket
            .checked_add(chunk.amount())
            .ok_or_else(overflow)?;
    }

    let all_chunks = entry.unlocking_total().ok_or_else(overflow)?;
    let split = total_unlocked
        .checked_add(total_unlocking)
        .ok_or_else(overflow)?;
    if split != all_chunks {
        return Err(StakingError::Invariant(format!(
            "{} chunks split into {} but sum to {}",
            system, split, all_chunks
        )));
    }

    let total_possible_bond = free_balance
        .saturating_sub(other_committed)
        .saturating_sub(total_unlocking)
        .saturating_sub(total_unlocked);
    let total_additional_bond = total_possible_bond.saturating_sub(entry.active());

    Ok(CommitmentBreakdown {
        active: entry.active(),
        total_unlocking,
        total_unlocked,
        total_possible_bond,
        total_additional_bond,
        total_unlock_chunks: u32::try_from(entry.unlocking().len())
            .map_err(|_| overflow())?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MemoKey {
    context: ContextId,
    era: EraIndex,
    version: u64,
}

/// Memoizing front end over [`resolve_transfer_options`] reading from the ledger.
pub struct TransferOptionsResolver {
    ledger: Arc<CommitmentLedger>,
    memo: Mutex<HashMap<Address, (MemoKey, TransferOptions)>>,
}

impl TransferOptionsResolver {
    pub fn new(ledger: Arc<CommitmentLedger>) -> Self {
        Self {
            ledger,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Current options for `account`. Untracked accounts and missing balances resolve to
    /// the all-zero default.
    pub fn resolve(&self, account: &Address) -> Result<TransferOptions> {
        let Some(snapshot) = self.ledger.snapshot(account) else {
            return Ok(TransferOptions::default());
        };
        let Some(balance) = snapshot.balance else {
            return Ok(TransferOptions::default());
        };

        let key = MemoKey {
            context: snapshot.context,
            era: balance.current_era,
            version: snapshot.version,
        };

        if let Some((cached_key, options)) = self.memo.lock().get(account) {
            if *cached_key == key {
                debug!(account = %account.short(), version = key.version, "Transfer options cache hit");
                return Ok(*options);
            }
        }

        let options = resolve_transfer_options(&balance, &snapshot.commitments).map_err(|e| {
            warn!(account = %account.short(), error = %e, "Transfer options failed to reconcile");
            e
        })?;

        self.memo.lock().insert(account.clone(), (key, options));
        debug!(
            account = %account.short(),
            era = key.era,
            version = key.version,
            "Transfer options recomputed"
        );
        Ok(options)
    }

    pub fn invalidate(&self, account: &Address) {
        if self.memo.lock().remove(account).is_some() {
            debug!(account = %account.short(), "Transfer options cache invalidated");
        }
    }

    pub fn ledger(&self) -> &Arc<CommitmentLedger> {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CommitmentEntry;

    fn q(v: u128) -> Quantity {
        Quantity::new(v)
    }

    fn balance(free: u128, reserved: u128, ed: u128, era: EraIndex) -> AccountBalanceSnapshot {
        AccountBalanceSnapshot {
            free: q(free),
            reserved: q(reserved),
            existential_deposit: q(ed),
            current_era: era,
        }
    }

    fn entry(active: u128, chunks: &[(u128, EraIndex)]) -> CommitmentEntry {
        let chunks: Vec<(Quantity, EraIndex)> = chunks.iter().map(|&(a, e)| (q(a), e)).collect();
        CommitmentEntry::from_raw(q(active), &chunks).unwrap()
    }

    fn assert_partition(b: &AccountBalanceSnapshot, o: &TransferOptions) {
        let lhs = o.free_balance.planck() + o.force_reserved.planck() + o.ed_reserved.planck();
        assert_eq!(lhs, b.free.planck() + b.reserved.planck());
    }

    #[test]
    fn test_no_commitments_reserved_covers_ed() {
        let b = balance(100, 5, 5, 10);
        let options = resolve_transfer_options(&b, &AccountCommitments::default()).unwrap();

        assert_eq!(options.free_balance, q(100));
        assert_eq!(options.force_reserved, q(0));
        assert_eq!(options.ed_reserved, q(5));
        assert_eq!(options.transferrable_balance, q(100));
        for breakdown in [options.nominate, options.pool] {
            assert_eq!(breakdown.active, q(0));
            assert_eq!(breakdown.total_unlocking, q(0));
            assert_eq!(breakdown.total_unlocked, q(0));
            assert_eq!(breakdown.total_unlock_chunks, 0);
            assert_eq!(breakdown.total_possible_bond, q(100));
            assert_eq!(breakdown.total_additional_bond, q(100));
        }
        assert_partition(&b, &options);
    }

    #[test]
    fn test_ed_taken_from_free_when_reserved_short() {
        let b = balance(100, 2, 5, 1);
        let options = resolve_transfer_options(&b, &AccountCommitments::default()).unwrap();

        assert_eq!(options.free_balance, q(97));
        assert_eq!(options.force_reserved, q(0));
        assert_eq!(options.ed_reserved, q(5));
        assert_partition(&b, &options);
    }

    #[test]
    fn test_excess_reserved_is_force_reserved() {
        let b = balance(40, 25, 10, 1);
        let options = resolve_transfer_options(&b, &AccountCommitments::default()).unwrap();

        assert_eq!(options.free_balance, q(40));
        assert_eq!(options.force_reserved, q(15));
        assert_eq!(options.ed_reserved, q(10));
        assert_partition(&b, &options);
    }

    #[test]
    fn test_chunk_at_current_era_is_unlocked() {
        let b = balance(1_000, 0, 0, 100);
        let commitments = AccountCommitments {
            nominate: entry(50, &[(10, 100)]),
            pool: CommitmentEntry::default(),
        };
        let options = resolve_transfer_options(&b, &commitments).unwrap();

        assert_eq!(options.nominate.active, q(50));
        assert_eq!(options.nominate.total_unlocked, q(10));
        assert_eq!(options.nominate.total_unlocking, q(0));
        assert_eq!(options.nominate.total_unlock_chunks, 1);
    }

    #[test]
    fn test_era_advance_moves_chunk_whole() {
        let commitments = AccountCommitments {
            nominate: entry(0, &[(7, 50), (3, 51)]),
            pool: CommitmentEntry::default(),
        };

        let before = resolve_transfer_options(&balance(100, 0, 0, 49), &commitments).unwrap();
        assert_eq!(before.nominate.total_unlocking, q(10));
        assert_eq!(before.nominate.total_unlocked, q(0));

        let at = resolve_transfer_options(&balance(100, 0, 0, 50), &commitments).unwrap();
        assert_eq!(at.nominate.total_unlocking, q(3));
        assert_eq!(at.nominate.total_unlocked, q(7));
        assert_eq!(at.nominate.total_unlock_chunks, 2);
    }

    #[test]
    fn test_bond_capacity_per_system() {
        let b = balance(1_000, 0, 10, 20);
        let commitments = AccountCommitments {
            nominate: entry(300, &[(50, 25), (20, 10)]),
            pool: entry(100, &[(30, 30)]),
        };
        let options = resolve_transfer_options(&b, &commitments).unwrap();

        // free_balance = 990, nominate total = 370, pool total = 130
        assert_eq!(options.free_balance, q(990));
        assert_eq!(options.nominate.total_possible_bond, q(990 - 130 - 50 - 20));
        assert_eq!(options.nominate.total_additional_bond, q(990 - 130 - 70 - 300));
        assert_eq!(options.pool.total_possible_bond, q(990 - 370 - 30));
        assert_eq!(options.pool.total_additional_bond, q(990 - 370 - 30 - 100));
        assert_eq!(options.transferrable_balance, q(990 - 370 - 130));
    }

    #[test]
    fn test_capacity_saturates_at_zero() {
        let b = balance(10, 0, 1, 1);
        let commitments = AccountCommitments {
            nominate: entry(500, &[]),
            pool: entry(0, &[(100, 5)]),
        };
        let options = resolve_transfer_options(&b, &commitments).unwrap();

        assert_eq!(options.pool.total_possible_bond, q(0));
        assert_eq!(options.nominate.total_additional_bond, q(0));
        assert_eq!(options.transferrable_balance, q(0));
    }

    #[test]
    fn test_overflow_reported() {
        let b = balance(u128::MAX, 1, 0, 1);
        assert!(matches!(
            resolve_transfer_options(&b, &AccountCommitments::default()),
            Err(StakingError::Overflow(_))
        ));

        let b = balance(10, 0, 0, 1);
        let commitments = AccountCommitments {
            nominate: entry(u128::MAX, &[(1, 1)]),
            pool: CommitmentEntry::default(),
        };
        assert!(matches!(
            resolve_transfer_options(&b, &commitments),
            Err(StakingError::Overflow("nominate"))
        ));

        let commitments = AccountCommitments {
            nominate: CommitmentEntry::default(),
            pool: entry(1, &[(u128::MAX, 1)]),
        };
        assert!(matches!(
            resolve_transfer_options(&b, &commitments),
            Err(StakingError::Overflow("pool"))
        ));
    }

    #[test]
    fn test_resolver_defaults_and_memo() {
        let ledger = Arc::new(CommitmentLedger::new());
        let resolver = TransferOptionsResolver::new(Arc::clone(&ledger));
        let account = Address::from("alice");

        assert_eq!(resolver.resolve(&account).unwrap(), TransferOptions::default());

        let ctx = ledger.open(&account);
        assert_eq!(resolver.resolve(&account).unwrap(), TransferOptions::default());

        ledger.apply_balance(ctx, &account, balance(100, 0, 1, 1));
        let first = resolver.resolve(&account).unwrap();
        let second = resolver.resolve(&account).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.free_balance, q(99));

        let commitments = AccountCommitments {
            nominate: entry(40, &[]),
            pool: CommitmentEntry::default(),
        };
        ledger.apply_commitments(ctx, &account, commitments);
        assert_eq!(resolver.resolve(&account).unwrap().transferrable_balance, q(59));
    }

    #[test]
    fn test_reopened_account_does_not_hit_old_memo() {
        let ledger = Arc::new(CommitmentLedger::new());
        let resolver = TransferOptionsResolver::new(Arc::clone(&ledger));
        let account = Address::from("alice");

        let ctx = ledger.open(&account);
        ledger.apply_balance(ctx, &account, balance(100, 0, 0, 1));
        assert_eq!(resolver.resolve(&account).unwrap().free_balance, q(100));

        // same era and version under a fresh context
        let ctx = ledger.open(&account);
        ledger.apply_balance(ctx, &account, balance(7, 0, 0, 1));
        assert_eq!(resolver.resolve(&account).unwrap().free_balance, q(7));

        resolver.invalidate(&account);
        assert_eq!(resolver.resolve(&account).unwrap().free_balance, q(7));
    }
}
