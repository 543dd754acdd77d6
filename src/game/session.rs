//! Session state machine - lobby, roles, spawning

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::error::GameError;
use super::fire::FireGrid;
use super::hose::{Hose, WaterSources, PLAYER_WATER_CAPACITY};
use super::level::{cell_center, Level};
use super::tick::GameOutcome;
use super::{GameSettings, Point};

/// Roster size of a full session
pub const MAX_PLAYERS: usize = 4;

/// Spawn coordinates, indexed by lobby join order
pub const SPAWN_POINTS: [Point; MAX_PLAYERS] = [
    Point::new(150.0, 450.0),
    Point::new(180.0, 450.0),
    Point::new(210.0, 450.0),
    Point::new(240.0, 450.0),
];

/// Temperature of seeded hotspots
pub const HOTSPOT_TEMPERATURE: f32 = 80.0;

const HOTSPOTS_MIN: usize = 3;
const HOTSPOTS_MAX: usize = 5;
const CIVILIANS_MIN: usize = 2;
const CIVILIANS_MAX: usize = 5;

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Roster being assembled
    Lobby,
    /// Simulation running
    Playing,
    /// Terminal; stats frozen
    Ended,
}

/// Crew roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    PumpOperator,
    SectionCommander,
    Firefighter,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::PumpOperator, Role::SectionCommander, Role::Firefighter];

    /// Seats available for this role in one session
    pub const fn capacity(self) -> usize {
        match self {
            Role::PumpOperator => 1,
            Role::SectionCommander => 1,
            Role::Firefighter => 2,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::PumpOperator => "pump-operator",
            Role::SectionCommander => "section-commander",
            Role::Firefighter => "firefighter",
        };
        f.write_str(name)
    }
}

/// A member of a session that has not started yet
#[derive(Debug, Clone, PartialEq)]
pub struct LobbyPlayer {
    pub id: Uuid,
    pub name: String,
    pub role: Option<Role>,
}

/// A member of a running session
#[derive(Debug, Clone)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub position: Point,
    pub role: Role,
    pub health: f32,
    pub water: f32,
    pub alive: bool,
    pub hose: Hose,
}

impl Player {
    fn spawn(lobby: LobbyPlayer, role: Role, position: Point) -> Self {
        Self {
            id: lobby.id,
            name: lobby.name,
            position,
            role,
            health: 100.0,
            water: PLAYER_WATER_CAPACITY,
            alive: true,
            hose: Hose::default(),
        }
    }
}

/// Someone waiting to be rescued
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Civilian {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub rescued: bool,
    pub unconscious: bool,
}

impl Civilian {
    pub fn new(id: Uuid, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            health: 100.0,
            rescued: false,
            unconscious: false,
        }
    }
}

/// One game: lobby, simulation and result
pub struct Session {
    pub id: Uuid,
    pub seed: u64,
    pub state: SessionState,
    pub settings: GameSettings,
    /// Lobby roster in join order; emptied on start
    pub lobby: Vec<LobbyPlayer>,
    /// In-game roster; filled on start
    pub players: Vec<Player>,
    pub level: Level,
    pub fire: FireGrid,
    pub civilians: Vec<Civilian>,
    pub structural_integrity: f32,
    pub water_used: f32,
    pub sources: WaterSources,
    pub started_at: Option<DateTime<Utc>>,
    /// Seconds simulated since start
    pub elapsed: f32,
    pub outcome: Option<GameOutcome>,
    pub(crate) rng: ChaCha8Rng,
}

impl Session {
    pub fn new(id: Uuid, seed: u64, settings: GameSettings) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let level = Level::generate(&mut rng);
        Self::with_level(id, seed, settings, level, rng)
    }

    fn with_level(
        id: Uuid,
        seed: u64,
        settings: GameSettings,
        level: Level,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            id,
            seed,
            state: SessionState::Lobby,
            settings,
            lobby: Vec::new(),
            players: Vec::new(),
            fire: FireGrid::from_level(&level),
            level,
            civilians: Vec::new(),
            structural_integrity: 100.0,
            water_used: 0.0,
            sources: WaterSources::default(),
            started_at: None,
            elapsed: 0.0,
            outcome: None,
            rng,
        }
    }

    /// Session on an all-floor level
    #[cfg(test)]
    pub fn open_for_test(seed: u64) -> Self {
        use super::level::{LEVEL_HEIGHT, LEVEL_WIDTH};
        Self::with_level(
            Uuid::new_v4(),
            seed,
            GameSettings::default(),
            Level::open(LEVEL_WIDTH, LEVEL_HEIGHT),
            ChaCha8Rng::seed_from_u64(seed),
        )
    }

    /// Lobby members plus in-game players
    pub fn member_count(&self) -> usize {
        self.lobby.len() + self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_count() == 0
    }

    /// Still accepting lobby joins
    pub fn is_joinable(&self) -> bool {
        self.state == SessionState::Lobby && self.lobby.len() < MAX_PLAYERS
    }

    pub fn member_ids(&self) -> Vec<Uuid> {
        self.lobby
            .iter()
            .map(|p| p.id)
            .chain(self.players.iter().map(|p| p.id))
            .collect()
    }

    pub fn in_lobby(&self, id: Uuid) -> bool {
        self.lobby.iter().any(|p| p.id == id)
    }

    pub fn player(&self, id: Uuid) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: Uuid) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn add_lobby_player(&mut self, id: Uuid, name: String) -> Result<(), GameError> {
        if !self.is_joinable() {
            return Err(GameError::LobbyFull);
        }
        if self.in_lobby(id) {
            return Err(GameError::AlreadyInSession);
        }
        self.lobby.push(LobbyPlayer {
            id,
            name,
            role: None,
        });
        Ok(())
    }

    pub fn remove_lobby_player(&mut self, id: Uuid) -> Option<LobbyPlayer> {
        let pos = self.lobby.iter().position(|p| p.id == id)?;
        Some(self.lobby.remove(pos))
    }

    /// Remove an in-game player, freeing any water source they held
    pub fn remove_player(&mut self, id: Uuid) -> Option<Player> {
        let pos = self.players.iter().position(|p| p.id == id)?;
        let mut player = self.players.remove(pos);
        self.sources.disconnect(id, &mut player.hose);
        Some(player)
    }

    /// Lobby members holding `role`, not counting `except`
    fn role_occupancy(&self, role: Role, except: Uuid) -> usize {
        self.lobby
            .iter()
            .filter(|p| p.id != except && p.role == Some(role))
            .count()
    }

    /// Pick a role. Switching is free until the target role is full.
    pub fn set_role(&mut self, id: Uuid, role: Role) -> Result<(), GameError> {
        if self.state != SessionState::Lobby {
            return Err(GameError::NotInLobby);
        }
        if self.role_occupancy(role, id) >= role.capacity() {
            return Err(GameError::RoleFull(role));
        }
        let member = self
            .lobby
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(GameError::NotInLobby)?;
        member.role = Some(role);
        Ok(())
    }

    /// Full roster with every role seat filled exactly
    pub fn can_start(&self) -> bool {
        self.state == SessionState::Lobby
            && self.lobby.len() == MAX_PLAYERS
            && Role::ALL
                .iter()
                .all(|&role| self.role_occupancy(role, Uuid::nil()) == role.capacity())
    }

    /// Move the whole lobby into play in one step
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), GameError> {
        if !self.can_start() {
            return Err(GameError::CannotStart);
        }

        let lobby = std::mem::take(&mut self.lobby);
        self.players = lobby
            .into_iter()
            .zip(SPAWN_POINTS)
            .filter_map(|(member, spawn)| {
                let role = member.role?;
                Some(Player::spawn(member, role, spawn))
            })
            .collect();

        self.seed_fire();
        self.spawn_civilians();

        self.state = SessionState::Playing;
        self.started_at = Some(now);
        self.elapsed = 0.0;

        info!(
            game_id = %self.id,
            seed = self.seed,
            hotspots = self.fire.burning_cells(),
            civilians = self.civilians.len(),
            "Game started"
        );
        Ok(())
    }

    fn seed_fire(&mut self) {
        let passable = self.level.passable_tiles();
        let count = self.rng.gen_range(HOTSPOTS_MIN..=HOTSPOTS_MAX);
        for &(x, y) in passable.choose_multiple(&mut self.rng, count) {
            self.fire.ignite(x, y, HOTSPOT_TEMPERATURE);
        }
    }

    fn spawn_civilians(&mut self) {
        let passable = self.level.passable_tiles();
        let count = self.rng.gen_range(CIVILIANS_MIN..=CIVILIANS_MAX);
        let spots: Vec<(i32, i32)> = passable
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect();
        self.civilians = spots
            .into_iter()
            .map(|(x, y)| {
                let (cx, cy) = cell_center(x, y);
                Civilian::new(seeded_uuid(&mut self.rng), cx, cy)
            })
            .collect();
    }

    /// Seconds left before the time limit
    pub fn time_remaining(&self) -> f32 {
        (self.settings.time_limit_secs - self.elapsed).max(0.0)
    }
}

/// Random v4 id drawn from a seeded generator
fn seeded_uuid(rng: &mut ChaCha8Rng) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}
