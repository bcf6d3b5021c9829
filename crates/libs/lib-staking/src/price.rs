//! # Price Feed
//!
//! Polls the market oracle for the active network's token price and keeps the last
//! known value in a [`SourceFeed`], persisted per network to the [`LocalStore`].
//!
//! ## Lifecycle
//!
//! - [`PriceFeed::start`] seeds from the persisted `"<network>_prices"` entry and, when the
//!   price service is enabled, fetches once immediately and then every interval.
//! - [`PriceFeed::on_network_change`] stops, reseeds from the new network and restarts.
//! - [`PriceFeed::on_service_toggle`] freezes the last value when the price service is
//!   switched off and resumes with an immediate fetch when it comes back.
//!
//! ## Stale Results
//!
//! Every polling task is tagged with a generation. Stopping, switching network or toggling
//! the service bumps it, and a task only publishes while its generation is current, so a
//! fetch that completes after a switch never overwrites the new network's price.
//!
//! Publication is ordered by its own lock, separate from the lifecycle state, so
//! subscribers run with no lifecycle lock held.

use crate::feed::{SourceFeed, Subscription};
use crate::network::{Network, Service};
use crate::oracle::{PriceOracle, PriceQuote};
use crate::store::LocalStore;
use lib_core::Config;
use lib_utils::unix_timestamp;
use parking_lot::Mutex;
use shared::PriceState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const STORAGE_SUFFIX: &str = "prices";

#[derive(Debug, Clone)]
pub struct PriceFeedOptions {
    /// Period between polls after the immediate first fetch.
    pub interval: Duration,
    /// Services enabled at construction.
    pub enabled_services: Vec<Service>,
}

impl Default for PriceFeedOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(lib_core::config::DEFAULT_PRICE_POLL_INTERVAL_SECS),
            enabled_services: vec![Service::BinanceSpot],
        }
    }
}

impl PriceFeedOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: Duration::from_secs(config.price_poll_interval_secs),
            enabled_services: Service::parse_list(&config.enabled_services),
        }
    }
}

/// State shared with the polling task.
struct Shared {
    oracle: Arc<dyn PriceOracle>,
    store: Arc<dyn LocalStore>,
    feed: SourceFeed<PriceState>,
    /// Current poll generation.
    generation: AtomicU64,
    /// Serializes every write to `feed` and the store. Never taken by a read.
    publish: Mutex<()>,
}

impl Shared {
    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish and persist `quote` if `generation` is still current.
    fn publish(&self, network: Network, generation: u64, quote: PriceQuote) -> bool {
        let _publish = self.publish.lock();
        let current = self.current_generation();
        if current != generation {
            debug!(%network, generation, current, "Discarding price from stale poll");
            return false;
        }

        let state = PriceState {
            last_price: quote.last_price,
            change: quote.change,
            timestamp: unix_timestamp(),
        };
        self.feed.set(state);
        debug!(%network, price = %state.last_price, change = %state.change, "Price updated");

        let key = network.storage_key(STORAGE_SUFFIX);
        match serde_json::to_string(&state) {
            Ok(json) => {
                if let Err(e) = self.store.set(&key, &json) {
                    warn!(%network, error = %e, "Failed to persist price");
                }
            }
            Err(e) => warn!(%network, error = %e, "Failed to serialize price"),
        }
        true
    }

    /// Replace the value with `network`'s persisted state if `generation` is still current.
    ///
    /// Waits for any in-flight publication, so a stale poll never lands after the seed.
    fn reseed(&self, network: Network, generation: u64) -> bool {
        let _publish = self.publish.lock();
        if self.current_generation() != generation {
            return false;
        }
        self.feed.set(self.load(network));
        true
    }

    fn load(&self, network: Network) -> PriceState {
        let key = network.storage_key(STORAGE_SUFFIX);
        match self.store.get(&key) {
            None => PriceState::default(),
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(%network, key = %key, error = %e, "Ignoring unreadable persisted price");
                PriceState::default()
            }),
        }
    }
}

struct Control {
    network: Option<Network>,
    enabled: bool,
    task: Option<JoinHandle<()>>,
}

/// Last-known market price for the active network.
///
/// Subscribers are called without any lifecycle lock held. They may read the feed and
/// call [`PriceFeed::stop`] or [`PriceFeed::on_service_toggle`], but must not call
/// [`PriceFeed::start`] or [`PriceFeed::on_network_change`], which write the same feed.
pub struct PriceFeed {
    shared: Arc<Shared>,
    interval: Duration,
    control: Mutex<Control>,
}

impl PriceFeed {
    pub fn new(
        oracle: Arc<dyn PriceOracle>,
        store: Arc<dyn LocalStore>,
        options: PriceFeedOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                oracle,
                store,
                feed: SourceFeed::new(),
                generation: AtomicU64::new(0),
                publish: Mutex::new(()),
            }),
            interval: options.interval,
            control: Mutex::new(Control {
                network: None,
                enabled: options.enabled_services.contains(&Service::BinanceSpot),
                task: None,
            }),
        }
    }

    /// Seed from `network`'s persisted price and start polling if enabled.
    pub fn start(&self, network: Network) {
        let generation = {
            let mut control = self.control.lock();
            Self::abort(&mut control);
            control.network = Some(network);
            self.shared.next_generation()
        };

        if !self.shared.reseed(network, generation) {
            debug!(%network, generation, "Superseded before seeding");
            return;
        }

        let mut control = self.control.lock();
        if self.shared.current_generation() != generation || control.network != Some(network) {
            debug!(%network, generation, "Superseded before polling");
            return;
        }
        if control.enabled {
            self.spawn_poll(&mut control, network, generation);
        } else {
            info!(%network, "Price service disabled, showing persisted price");
        }
    }

    /// Cancel polling. The current value stays.
    pub fn stop(&self) {
        let mut control = self.control.lock();
        self.shared.next_generation();
        if Self::abort(&mut control) {
            info!("Price polling stopped");
        }
    }

    pub fn on_network_change(&self, network: Network) {
        info!(%network, "Network changed, restarting price feed");
        self.start(network);
    }

    /// Apply the user's enabled-service list.
    pub fn on_service_toggle(&self, enabled_services: &[Service]) {
        let enabled = enabled_services.contains(&Service::BinanceSpot);
        let mut control = self.control.lock();
        if control.enabled == enabled {
            return;
        }
        control.enabled = enabled;

        if enabled {
            if let Some(network) = control.network {
                let generation = self.shared.next_generation();
                info!(%network, "Price service enabled, resuming");
                self.spawn_poll(&mut control, network, generation);
            }
        } else {
            Self::abort(&mut control);
            self.shared.next_generation();
            info!("Price service disabled, freezing last price");
        }
    }

    /// Last known price; zero before any value is available.
    pub fn get_price(&self) -> PriceState {
        self.shared.feed.get().map(|state| *state).unwrap_or_default()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PriceState) + Send + Sync + 'static,
    {
        self.shared.feed.subscribe(callback)
    }

    pub fn feed(&self) -> &SourceFeed<PriceState> {
        &self.shared.feed
    }

    pub fn network(&self) -> Option<Network> {
        self.control.lock().network
    }

    pub fn is_polling(&self) -> bool {
        self.control
            .lock()
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn abort(control: &mut Control) -> bool {
        match control.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    fn spawn_poll(&self, control: &mut Control, network: Network, generation: u64) {
        let shared = Arc::clone(&self.shared);
        let period = self.interval;

        control.task = Some(tokio::spawn(poll(shared, network, generation, period)));
        info!(%network, generation, interval_secs = period.as_secs(), "Price polling started");
    }
}

impl Drop for PriceFeed {
    fn drop(&mut self) {
        Self::abort(self.control.get_mut());
    }
}

async fn poll(shared: Arc<Shared>, network: Network, generation: u64, period: Duration) {
    let ticker = network.price_ticker();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        match shared.oracle.fetch_price(ticker).await {
            Ok(quote) => {
                if !shared.publish(network, generation, quote) {
                    return;
                }
            }
            Err(e) => {
                warn!(%network, ticker, error = %e, "Price fetch failed, keeping last value");
            }
        }
    }
}
