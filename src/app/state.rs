//! Application state shared across routes

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::game::GameRegistry;
use crate::hub::{ConnectionRegistry, GameHub, HubEvent, HubStats, SharedStats};

/// Queued hub events before connections start waiting
const HUB_CHANNEL_CAPACITY: usize = 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Inbound events for the game hub
    pub hub_tx: mpsc::Sender<HubEvent>,
    pub connections: ConnectionRegistry,
    pub stats: SharedStats,
}

impl AppState {
    /// Build the state together with the hub it talks to.
    /// The caller spawns the hub.
    pub fn new(config: Config) -> (Self, GameHub, mpsc::Receiver<HubEvent>) {
        let config = Arc::new(config);
        let (hub_tx, hub_rx) = mpsc::channel(HUB_CHANNEL_CAPACITY);
        let connections = ConnectionRegistry::new();
        let stats = Arc::new(RwLock::new(HubStats::default()));

        let hub = GameHub::new(
            GameRegistry::new(config.game_settings()),
            connections.clone(),
            stats.clone(),
        );

        let state = Self {
            config,
            hub_tx,
            connections,
            stats,
        };
        (state, hub, hub_rx)
    }
}
