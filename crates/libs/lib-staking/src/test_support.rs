//! Test doubles for the external collaborators.

use crate::chain::ChainSource;
use crate::error::{Result, StakingError};
use crate::fees::FeeQuoter;
use crate::oracle::{PriceOracle, PriceQuote};
use crate::types::{AccountBalanceSnapshot, AccountCommitments};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use shared::{Address, IntentId, Quantity};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Channel-backed chain source. Each subscription registers a sender the test pushes into.
#[derive(Default)]
pub struct ChannelChain {
    balances: Mutex<HashMap<Address, Vec<mpsc::UnboundedSender<AccountBalanceSnapshot>>>>,
    commitments: Mutex<HashMap<Address, Vec<mpsc::UnboundedSender<AccountCommitments>>>>,
}

impl ChannelChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Push to every open balance subscription of `account`. Returns how many received it.
    pub fn push_balance(&self, account: &Address, snapshot: AccountBalanceSnapshot) -> usize {
        let mut balances = self.balances.lock();
        let senders = balances.entry(account.clone()).or_default();
        senders.retain(|tx| tx.send(snapshot).is_ok());
        senders.len()
    }

    pub fn push_commitments(&self, account: &Address, commitments: AccountCommitments) -> usize {
        let mut all = self.commitments.lock();
        let senders = all.entry(account.clone()).or_default();
        senders.retain(|tx| tx.send(commitments.clone()).is_ok());
        senders.len()
    }

    /// Open balance subscriptions for `account` whose receiver is still alive.
    pub fn open_balance_subscriptions(&self, account: &Address) -> usize {
        self.balances
            .lock()
            .get(account)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

impl ChainSource for ChannelChain {
    fn subscribe_balance(&self, account: &Address) -> BoxStream<'static, AccountBalanceSnapshot> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.balances.lock().entry(account.clone()).or_default().push(tx);
        UnboundedReceiverStream::new(rx).boxed()
    }

    fn subscribe_commitments(&self, account: &Address) -> BoxStream<'static, AccountCommitments> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.commitments.lock().entry(account.clone()).or_default().push(tx);
        UnboundedReceiverStream::new(rx).boxed()
    }
}

/// Oracle answering from a script; falls back to the last answer once exhausted.
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Result<PriceQuote>>>,
    fallback: Mutex<Option<Result<PriceQuote>>>,
    delay: Duration,
    pub calls: AtomicUsize,
    pub tickers: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(script: Vec<Result<PriceQuote>>) -> Arc<Self> {
        Self::with_delay(script, Duration::ZERO)
    }

    pub fn with_delay(script: Vec<Result<PriceQuote>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback: Mutex::new(None),
            delay,
            calls: AtomicUsize::new(0),
            tickers: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for ScriptedOracle {
    async fn fetch_price(&self, ticker: &str) -> Result<PriceQuote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tickers.lock().push(ticker.to_string());

        let next = {
            let mut script = self.script.lock();
            match script.pop_front() {
                Some(answer) => {
                    *self.fallback.lock() = Some(answer.clone());
                    answer
                }
                None => self
                    .fallback
                    .lock()
                    .clone()
                    .unwrap_or_else(|| Err(StakingError::Oracle("script exhausted".to_string()))),
            }
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        next
    }
}

/// Fee quoter returning a fixed fee after an optional delay.
pub struct ScriptedQuoter {
    pub fee: Result<Quantity>,
    pub delay: Duration,
}

#[async_trait]
impl FeeQuoter for ScriptedQuoter {
    async fn quote_fee(&self, _intent: &IntentId, _sender: &Address) -> Result<Quantity> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.fee.clone()
    }
}
