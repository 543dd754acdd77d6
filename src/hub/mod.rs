//! Game hub - owns every session and routes player events to them

pub mod connections;
pub mod service;

pub use connections::ConnectionRegistry;
pub use service::GameHub;

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::game::SessionState;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Player input received from a WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub player_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}

/// Everything the hub reacts to besides its own timers
#[derive(Debug)]
pub enum HubEvent {
    Input(PlayerInput),
    Disconnected(Uuid),
}

/// Who an outbound message is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Player(Uuid),
    /// Every member of a session, resolved at delivery time
    Game(Uuid),
}

/// An outbound message and its audience
#[derive(Debug, Clone)]
pub struct Envelope {
    pub to: Recipient,
    pub msg: ServerMsg,
}

impl Envelope {
    pub fn player(id: Uuid, msg: ServerMsg) -> Self {
        Self {
            to: Recipient::Player(id),
            msg,
        }
    }

    pub fn game(id: Uuid, msg: ServerMsg) -> Self {
        Self {
            to: Recipient::Game(id),
            msg,
        }
    }
}

/// Public summary of one session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: Uuid,
    pub state: SessionState,
    pub player_count: usize,
}

/// Counts the hub publishes for the HTTP side
#[derive(Debug, Clone, Default)]
pub struct HubStats {
    pub active_games: usize,
    pub lobby_players: usize,
    pub active_players: usize,
    pub games: HashMap<Uuid, GameSummary>,
}

pub type SharedStats = Arc<RwLock<HubStats>>;
