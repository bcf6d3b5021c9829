//! # Commitment Ledger
//!
//! Per-account store of the latest balance snapshot and staking commitments.
//!
//! ## Context Guard
//!
//! Every tracked account is opened under a fresh [`ContextId`]. Chain updates carry the
//! context they were subscribed under, and [`CommitmentLedger::apply_balance`] /
//! [`CommitmentLedger::apply_commitments`] reject any write whose context is no longer the
//! account's current one. The check and the write happen under the same lock, so an update
//! that was already in flight when its account was switched away can never land.
//!
//! ## Versioning
//!
//! Each accepted write bumps the account's version. The resolver memoizes on it, and the
//! [`LedgerChange`] feed announces it to presentation code. Changes are published in the
//! order the writes were accepted, after the account lock is released, so a change
//! subscriber may read the ledger but must not write to it.

use crate::feed::SourceFeed;
use crate::types::{AccountBalanceSnapshot, AccountCommitments};
use parking_lot::{Mutex, RwLock};
use shared::Address;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Identity of one activation of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Announced after every accepted write or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerChange {
    pub account: Address,
    /// Ledger version after the change; `None` when the account was forgotten.
    pub version: Option<u64>,
}

/// Consistent copy of one account's ledger state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub context: ContextId,
    pub balance: Option<AccountBalanceSnapshot>,
    pub commitments: AccountCommitments,
    pub version: u64,
}

#[derive(Debug)]
struct AccountState {
    context: ContextId,
    balance: Option<AccountBalanceSnapshot>,
    commitments: Option<AccountCommitments>,
    version: u64,
}

impl AccountState {
    fn new(context: ContextId) -> Self {
        Self {
            context,
            balance: None,
            commitments: None,
            version: 0,
        }
    }
}

/// Owner of all per-account balance and commitment state.
pub struct CommitmentLedger {
    accounts: RwLock<HashMap<Address, AccountState>>,
    next_context: AtomicU64,
    /// Held from a write until its change is published.
    publish: Mutex<()>,
    changes: SourceFeed<LedgerChange>,
}

impl Default for CommitmentLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl CommitmentLedger {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            next_context: AtomicU64::new(1),
            publish: Mutex::new(()),
            changes: SourceFeed::new(),
        }
    }

    /// Start tracking `account` under a new context, discarding anything held for it.
    pub fn open(&self, account: &Address) -> ContextId {
        let context = ContextId(self.next_context.fetch_add(1, Ordering::Relaxed));
        let replaced = self
            .accounts
            .write()
            .insert(account.clone(), AccountState::new(context))
            .is_some();

        info!(account = %account.short(), %context, replaced, "Ledger context opened");
        context
    }

    /// Drop every piece of state held for `account`. Later writes under its old context fail.
    pub fn forget(&self, account: &Address) -> bool {
        let _publish = self.publish.lock();
        let removed = self.accounts.write().remove(account).is_some();
        if removed {
            info!(account = %account.short(), "Ledger state discarded");
            self.changes.set(LedgerChange {
                account: account.clone(),
                version: None,
            });
        }
        removed
    }

    /// Replace the balance snapshot. Returns `false` if `context` is stale.
    pub fn apply_balance(
        &self,
        context: ContextId,
        account: &Address,
        snapshot: AccountBalanceSnapshot,
    ) -> bool {
        self.apply(context, account, "balance", |state| {
            state.balance = Some(snapshot);
        })
    }

    /// Replace both commitment entries. Returns `false` if `context` is stale.
    pub fn apply_commitments(
        &self,
        context: ContextId,
        account: &Address,
        commitments: AccountCommitments,
    ) -> bool {
        self.apply(context, account, "commitments", |state| {
            state.commitments = Some(commitments);
        })
    }

    fn apply<F>(&self, context: ContextId, account: &Address, kind: &'static str, write: F) -> bool
    where
        F: FnOnce(&mut AccountState),
    {
        let _publish = self.publish.lock();
        let version = {
            let mut accounts = self.accounts.write();
            match accounts.get_mut(account) {
                Some(state) if state.context == context => {
                    write(state);
                    state.version += 1;
                    state.version
                }
                _ => {
                    warn!(account = %account.short(), %context, kind, "Dropping stale-context update");
                    return false;
                }
            }
        };

        debug!(account = %account.short(), kind, version, "Ledger updated");
        self.changes.set(LedgerChange {
            account: account.clone(),
            version: Some(version),
        });
        true
    }

    /// Copy of the account's state, `None` if the account is not tracked.
    pub fn snapshot(&self, account: &Address) -> Option<LedgerSnapshot> {
        self.accounts.read().get(account).map(|state| LedgerSnapshot {
            context: state.context,
            balance: state.balance,
            commitments: state.commitments.clone().unwrap_or_default(),
            version: state.version,
        })
    }

    pub fn version(&self, account: &Address) -> Option<u64> {
        self.accounts.read().get(account).map(|state| state.version)
    }

    pub fn current_context(&self, account: &Address) -> Option<ContextId> {
        self.accounts.read().get(account).map(|state| state.context)
    }

    /// Change notifications for every tracked account.
    pub fn changes(&self) -> &SourceFeed<LedgerChange> {
        &self.changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CommitmentEntry;
    use shared::Quantity;
    use std::sync::Arc;

    fn alice() -> Address {
        Address::from("15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5")
    }

    fn balance(free: u128, era: u32) -> AccountBalanceSnapshot {
        AccountBalanceSnapshot {
            free: Quantity::new(free),
            reserved: Quantity::ZERO,
            existential_deposit: Quantity::new(1),
            current_era: era,
        }
    }

    #[test]
    fn test_apply_requires_open_context() {
        let ledger = CommitmentLedger::new();
        let ctx = ledger.open(&alice());

        assert!(ledger.apply_balance(ctx, &alice(), balance(100, 1)));
        let snapshot = ledger.snapshot(&alice()).unwrap();
        assert_eq!(snapshot.balance, Some(balance(100, 1)));
        assert_eq!(snapshot.commitments, AccountCommitments::default());
        assert_eq!(snapshot.version, 1);
    }

    #[test]
    fn test_stale_context_rejected_after_reopen() {
        let ledger = CommitmentLedger::new();
        let old = ledger.open(&alice());
        let new = ledger.open(&alice());
        assert_ne!(old, new);

        assert!(!ledger.apply_balance(old, &alice(), balance(999, 1)));
        assert!(ledger.apply_balance(new, &alice(), balance(100, 1)));
        assert_eq!(ledger.snapshot(&alice()).unwrap().balance, Some(balance(100, 1)));
    }

    #[test]
    fn test_forget_discards_and_blocks_writes() {
        let ledger = CommitmentLedger::new();
        let ctx = ledger.open(&alice());
        assert!(ledger.apply_balance(ctx, &alice(), balance(100, 1)));

        assert!(ledger.forget(&alice()));
        assert!(ledger.snapshot(&alice()).is_none());

        let commitments = AccountCommitments {
            nominate: CommitmentEntry::new(Quantity::new(5), Vec::new()),
            pool: CommitmentEntry::default(),
        };
        assert!(!ledger.apply_commitments(ctx, &alice(), commitments));
        assert!(!ledger.forget(&alice()));
    }

    #[test]
    fn test_changes_announce_versions() {
        let ledger = CommitmentLedger::new();
        let ctx = ledger.open(&alice());
        ledger.apply_balance(ctx, &alice(), balance(1, 1));
        ledger.apply_commitments(ctx, &alice(), AccountCommitments::default());

        let last = ledger.changes().get().unwrap();
        assert_eq!(last.version, Some(2));

        ledger.forget(&alice());
        assert_eq!(ledger.changes().get().unwrap().version, None);
    }

    #[test]
    fn test_change_subscriber_reads_ledger() {
        let ledger = Arc::new(CommitmentLedger::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let reader = Arc::downgrade(&ledger);
        let sink = Arc::clone(&seen);
        let _sub = ledger.changes().subscribe(move |change: &LedgerChange| {
            if let Some(ledger) = reader.upgrade() {
                let current = ledger.version(&change.account);
                sink.lock().push((change.version, current));
            }
        });

        let ctx = ledger.open(&alice());
        ledger.apply_balance(ctx, &alice(), balance(1, 1));
        ledger.forget(&alice());

        assert_eq!(*seen.lock(), vec![(Some(1), Some(1)), (None, None)]);
    }

    #[test]
    fn test_concurrent_writes_publish_in_order() {
        let ledger = Arc::new(CommitmentLedger::new());
        let ctx = ledger.open(&alice());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _sub = ledger.changes().subscribe(move |change: &LedgerChange| {
            sink.lock().push(change.version);
        });

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for era in 0..50 {
                        ledger.apply_balance(ctx, &alice(), balance(i, era));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let expected: Vec<_> = (1..=200).map(Some).collect();
        assert_eq!(*seen.lock(), expected);
        assert_eq!(ledger.changes().get().unwrap().version, ledger.version(&alice()));
    }
}
