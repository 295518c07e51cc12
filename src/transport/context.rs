//! Process-lifetime wiring.
//!
//! `AppContext` owns the shared components and is injected into every
//! connection handler, instead of components reaching for ambient globals.

use std::sync::{Arc, Mutex};

use crate::broker::Broker;
use crate::config::Settings;
use crate::directory::{ChannelDirectory, StaticDirectory};
use crate::fanout::FanoutRouter;
use crate::ingest::IngestGateway;
use crate::persistence::{HistoryStore, SledHistory};
use crate::stats::Stats;
use crate::utils::error::StorageError;

#[derive(Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub stats: Arc<Stats>,
    pub directory: Arc<dyn ChannelDirectory>,
    pub store: Arc<dyn HistoryStore>,
    pub broker: Arc<Mutex<Broker>>,
    pub fanout: Arc<FanoutRouter>,
    pub gateway: Arc<IngestGateway>,
}

impl AppContext {
    /// Build the full component graph from settings, opening the history
    /// store at the configured path.
    pub fn new(settings: Settings) -> Result<Self, StorageError> {
        let ttl = if settings.storage.history_ttl_secs > 0 {
            Some(settings.storage.history_ttl_secs)
        } else {
            None
        };
        let store: Arc<dyn HistoryStore> =
            Arc::new(SledHistory::open(&settings.storage.path, ttl)?);
        Self::with_store(settings, store)
    }

    /// Same wiring with a caller-provided store; used by tests to point at
    /// a temp directory.
    pub fn with_store(
        settings: Settings,
        store: Arc<dyn HistoryStore>,
    ) -> Result<Self, StorageError> {
        let stats = Arc::new(Stats::new());
        let directory: Arc<dyn ChannelDirectory> =
            Arc::new(StaticDirectory::from_config(&settings.channels));
        let broker = Arc::new(Mutex::new(Broker::new(&settings.broker, stats.clone())));
        let fanout = Arc::new(FanoutRouter::new(stats.clone()));
        let gateway = Arc::new(IngestGateway::new(
            directory.clone(),
            store.clone(),
            fanout.clone(),
            stats.clone(),
        ));
        Ok(Self {
            settings,
            stats,
            directory,
            store,
            broker,
            fanout,
            gateway,
        })
    }
}
