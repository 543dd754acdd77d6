//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::fire::FireCell;
use crate::game::hose::ConnectionType;
use crate::game::level::Level;
use crate::game::session::Civilian;
use crate::game::{GameResult, GameStats, Point, Role, SessionState};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Join a lobby, optionally a specific one
    JoinLobby {
        #[serde(default)]
        game_id: Option<String>,
        #[serde(default)]
        player_name: String,
    },

    /// Pick a crew role while in the lobby
    SelectRole { role: Role },

    /// Start the game once every role is filled
    StartGame,

    LeaveLobby,

    PlayerMove { x: f32, y: f32 },

    /// Spray from (x, y) along `direction` radians
    SprayWater { x: f32, y: f32, direction: f32 },

    RescueCivilian { civilian_id: Uuid },

    ToggleHoseConnection,

    ExtendHose { x: f32, y: f32 },

    RetractHose,

    RefillWater,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Sent once after the socket opens
    Welcome { player_id: Uuid, server_time: u64 },

    LobbyJoined {
        game_id: Uuid,
        player_id: Uuid,
        lobby_state: LobbyState,
    },

    LobbyUpdated(LobbyState),

    /// Sent to each player when their lobby starts
    GameJoined {
        game_id: Uuid,
        player_id: Uuid,
        game_state: Box<GameStateSnapshot>,
    },

    GameStarted {
        game_id: Uuid,
        started_at: DateTime<Utc>,
        time_limit: f32,
    },

    /// Full state, sent at the broadcast rate
    GameStateUpdate(Box<GameStateSnapshot>),

    PlayerMoved {
        player_id: Uuid,
        x: f32,
        y: f32,
        strained: bool,
    },

    WaterSprayed {
        player_id: Uuid,
        x: f32,
        y: f32,
        end_x: f32,
        end_y: f32,
        direction: f32,
    },

    CivilianRescued { civilian_id: Uuid },

    HoseConnectionToggled {
        player_id: Uuid,
        connected: bool,
        connection_type: ConnectionType,
    },

    HoseExtended { player_id: Uuid, segments: Vec<Point> },

    HoseRetracted { player_id: Uuid, segments: Vec<Point> },

    WaterRefilled {
        player_id: Uuid,
        water_level: f32,
        truck_water_level: f32,
    },

    PlayerLeft { player_id: Uuid },

    GameEnded { result: GameResult, stats: GameStats },

    Error { message: String },
}

/// Lobby roster as shown to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LobbyState {
    pub id: Uuid,
    pub state: SessionState,
    pub players: Vec<LobbyMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LobbyMember {
    pub id: Uuid,
    pub name: String,
    pub role: Option<Role>,
}

/// Full session state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateSnapshot {
    pub id: Uuid,
    pub state: SessionState,
    pub players: Vec<PlayerSnapshot>,
    /// Fire cells, row-major
    pub fire: Vec<Vec<FireCell>>,
    pub civilians: Vec<Civilian>,
    pub structural_integrity: f32,
    pub water_supply: f32,
    pub level: Level,
    pub fire_truck: FireTruckSnapshot,
    pub hydrant: HydrantSnapshot,
    pub time_remaining: f32,
    pub result: Option<GameResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: Uuid,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub role: Role,
    /// Health (0-100)
    pub health: f32,
    /// Tank water (0-100)
    pub water: f32,
    pub is_alive: bool,
    pub hose: HoseSnapshot,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoseSnapshot {
    pub connected: bool,
    pub connection_type: ConnectionType,
    pub connection_point: Option<Point>,
    pub segments: Vec<Point>,
    pub max_length: f32,
    pub strained: bool,
    /// Laid length in world units, up to the holder
    pub length: f32,
    pub length_feet: f32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FireTruckSnapshot {
    pub x: f32,
    pub y: f32,
    pub water_level: f32,
    pub max_water: f32,
    pub hose_connections: Vec<HoseSlotSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoseSlotSnapshot {
    pub occupied: bool,
    pub player_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrantSnapshot {
    pub x: f32,
    pub y: f32,
    pub connected: bool,
}
