//! # Fee Estimator
//!
//! Holds the last quoted fee for the pending transaction. A fee is only reported valid for
//! the sender and intent it was quoted under; changing either invalidates it until a new
//! fee is set.
//!
//! ```rust
//! use lib_staking::fees::FeeEstimator;
//! use shared::{Address, IntentId, Quantity};
//!
//! let fees = FeeEstimator::new();
//! fees.set_sender(Some(Address::from("alice")));
//! let _session = fees.begin(IntentId::from("bond"));
//! fees.set_fee(Quantity::new(10));
//! assert!(fees.is_valid());
//!
//! fees.set_sender(Some(Address::from("bob")));
//! assert!(!fees.is_valid());
//! assert_eq!(fees.has_sufficient_funds(Quantity::new(100)), None);
//! ```
//!
//! Subscribers are called after the state lock is released, so they may read the
//! estimator. They must not write to it.

use crate::error::Result;
use crate::feed::{SourceFeed, Subscription};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared::{Address, FeeState, IntentId, Quantity};
use std::sync::Arc;
use tracing::{debug, warn};

/// One-shot fee quotation for a transaction intent.
#[async_trait]
pub trait FeeQuoter: Send + Sync {
    async fn quote_fee(&self, intent: &IntentId, sender: &Address) -> Result<Quantity>;
}

#[derive(Debug, Default)]
struct FeeContext {
    intent: Option<IntentId>,
    state: FeeState,
}

impl FeeContext {
    fn invalidate(&mut self) {
        self.state.valid = false;
        self.state.valid_for = None;
    }
}

struct FeeInner {
    context: Mutex<FeeContext>,
    /// Orders publication so subscribers see states in update order.
    publish: Mutex<()>,
    feed: SourceFeed<FeeState>,
}

/// Fee state for the pending transaction. Clones share the same state.
#[derive(Clone)]
pub struct FeeEstimator {
    inner: Arc<FeeInner>,
}

impl Default for FeeEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl FeeEstimator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FeeInner {
                context: Mutex::new(FeeContext::default()),
                publish: Mutex::new(()),
                feed: SourceFeed::new(),
            }),
        }
    }

    fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut FeeContext),
    {
        let _publish = self.inner.publish.lock();
        let state = {
            let mut context = self.inner.context.lock();
            change(&mut context);
            context.state.clone()
        };
        self.inner.feed.set(state);
    }

    pub fn set_sender(&self, sender: Option<Address>) {
        self.update(|context| {
            if context.state.sender != sender {
                debug!(sender = ?sender.as_ref().map(Address::short), "Fee sender changed");
                context.state.sender = sender;
                context.invalidate();
            }
        });
    }

    pub fn set_intent(&self, intent: Option<IntentId>) {
        self.update(|context| {
            if context.intent != intent {
                debug!(intent = ?intent, "Fee intent changed");
                context.intent = intent;
                context.invalidate();
            }
        });
    }

    /// Record `fee` for the current sender and intent.
    pub fn set_fee(&self, fee: Quantity) {
        self.update(|context| {
            context.state.fee = fee;
            context.state.valid = context.state.sender.is_some();
            context.state.valid_for = if context.state.valid {
                context.intent.clone()
            } else {
                None
            };
            debug!(%fee, valid = context.state.valid, "Fee set");
        });
    }

    /// Zero the fee, mark it invalid and clear the intent.
    pub fn reset(&self) {
        self.update(|context| {
            context.state.fee = Quantity::ZERO;
            context.intent = None;
            context.invalidate();
        });
    }

    pub fn is_valid(&self) -> bool {
        self.inner.context.lock().state.valid
    }

    pub fn get_fee(&self) -> FeeState {
        self.inner.context.lock().state.clone()
    }

    pub fn intent(&self) -> Option<IntentId> {
        self.inner.context.lock().intent.clone()
    }

    /// Whether `available` covers the fee; `None` while the fee is not valid.
    pub fn has_sufficient_funds(&self, available: Quantity) -> Option<bool> {
        let context = self.inner.context.lock();
        context.state.valid.then(|| available >= context.state.fee)
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&FeeState) + Send + Sync + 'static,
    {
        self.inner.feed.subscribe(callback)
    }

    /// Quote the current intent and apply the fee if sender and intent are unchanged.
    ///
    /// Returns `Ok(false)` when there is nothing to quote or the answer arrived too late.
    pub async fn request_quote(&self, quoter: &dyn FeeQuoter) -> Result<bool> {
        let (sender, intent) = {
            let context = self.inner.context.lock();
            match (&context.state.sender, &context.intent) {
                (Some(sender), Some(intent)) => (sender.clone(), intent.clone()),
                _ => {
                    debug!("No sender or intent, skipping fee quote");
                    return Ok(false);
                }
            }
        };

        let fee = quoter.quote_fee(&intent, &sender).await.map_err(|e| {
            warn!(intent = %intent, error = %e, "Fee quote failed");
            e
        })?;

        let _publish = self.inner.publish.lock();
        let state = {
            let mut context = self.inner.context.lock();
            if context.state.sender.as_ref() != Some(&sender)
                || context.intent.as_ref() != Some(&intent)
            {
                debug!(intent = %intent, "Dropping fee quote for abandoned intent");
                return Ok(false);
            }

            context.state.fee = fee;
            context.state.valid = true;
            context.state.valid_for = Some(intent);
            context.state.clone()
        };
        self.inner.feed.set(state);
        debug!(%fee, "Fee quote applied");
        Ok(true)
    }

    /// Reset and bind `intent` for the lifetime of the returned session.
    pub fn begin(&self, intent: IntentId) -> FeeSession {
        self.update(|context| {
            context.state.fee = Quantity::ZERO;
            context.intent = Some(intent.clone());
            context.invalidate();
        });
        FeeSession {
            estimator: self.clone(),
            intent,
        }
    }
}

/// Pending-transaction scope. Dropping it resets the estimator if its intent is still
/// the current one.
#[must_use = "dropping a FeeSession immediately resets the fee"]
pub struct FeeSession {
    estimator: FeeEstimator,
    intent: IntentId,
}

impl FeeSession {
    pub fn intent(&self) -> &IntentId {
        &self.intent
    }
}

impl Drop for FeeSession {
    fn drop(&mut self) {
        let intent = &self.intent;
        self.estimator.update(|context| {
            if context.intent.as_ref() == Some(intent) {
                context.state.fee = Quantity::ZERO;
                context.intent = None;
                context.invalidate();
            }
        });
    }
}
