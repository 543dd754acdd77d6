//! Registry of live sessions and of which session each member belongs to

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::error::GameError;
use super::session::{Session, SessionState};
use super::GameSettings;

/// What happened when a member left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    pub game_id: Uuid,
    /// Left from the lobby rather than a running game
    pub from_lobby: bool,
    /// The session emptied and was deleted
    pub session_closed: bool,
}

/// Owns every session. Sessions live exactly as long as they have members.
pub struct GameRegistry {
    sessions: HashMap<Uuid, Session>,
    /// member id -> session id
    members: HashMap<Uuid, Uuid>,
    settings: GameSettings,
    seeds: ChaCha8Rng,
}

impl GameRegistry {
    pub fn new(settings: GameSettings) -> Self {
        Self::with_seed(settings, rand::random::<u64>())
    }

    /// Registry whose sessions are seeded deterministically
    pub fn with_seed(settings: GameSettings, seed: u64) -> Self {
        Self {
            sessions: HashMap::new(),
            members: HashMap::new(),
            settings,
            seeds: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The requested session if it still takes lobby joins, otherwise a
    /// fresh one under a new id
    pub fn get_or_create(&mut self, requested: Option<Uuid>) -> &mut Session {
        let reuse = requested.filter(|id| {
            self.sessions
                .get(id)
                .map(Session::is_joinable)
                .unwrap_or(false)
        });

        let (id, seed) = match reuse {
            Some(id) => (id, 0),
            None => {
                let id = Uuid::new_v4();
                let seed = self.seeds.gen::<u64>();
                info!(game_id = %id, seed, "Created new game");
                (id, seed)
            }
        };

        let settings = self.settings;
        self.sessions
            .entry(id)
            .or_insert_with(|| Session::new(id, seed, settings))
    }

    /// Put a connection into a lobby. Returns the session id.
    pub fn join_lobby(
        &mut self,
        player_id: Uuid,
        requested: Option<Uuid>,
        name: String,
    ) -> Result<Uuid, GameError> {
        if self.members.contains_key(&player_id) {
            return Err(GameError::AlreadyInSession);
        }
        let session = self.get_or_create(requested);
        let game_id = session.id;
        let joined = session.add_lobby_player(player_id, name);
        if let Err(e) = joined {
            self.close_if_empty(game_id);
            return Err(e);
        }
        self.members.insert(player_id, game_id);
        Ok(game_id)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Session> {
        self.sessions.get(id)
    }

    #[cfg(test)]
    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Session id of a member
    pub fn game_of(&self, player_id: &Uuid) -> Option<Uuid> {
        self.members.get(player_id).copied()
    }

    /// Session a member belongs to
    pub fn session_of_mut(&mut self, player_id: &Uuid) -> Result<&mut Session, GameError> {
        let game_id = self.game_of(player_id).ok_or(GameError::NotInSession)?;
        self.sessions
            .get_mut(&game_id)
            .ok_or(GameError::NotInSession)
    }

    /// Remove a lobby member; the session is deleted when it empties
    pub fn remove_lobby_player(&mut self, player_id: Uuid) -> Result<Departure, GameError> {
        let session = self.session_of_mut(&player_id)?;
        if session.remove_lobby_player(player_id).is_none() {
            return Err(GameError::NotInLobby);
        }
        Ok(self.finish_departure(player_id, true))
    }

    /// Remove an in-game player, releasing any water source they held;
    /// the session is deleted when it empties
    pub fn remove_player(&mut self, player_id: Uuid) -> Result<Departure, GameError> {
        let session = self.session_of_mut(&player_id)?;
        if session.remove_player(player_id).is_none() {
            return Err(GameError::NotInSession);
        }
        Ok(self.finish_departure(player_id, false))
    }

    /// Remove a member from whichever roster they are on
    pub fn remove_member(&mut self, player_id: Uuid) -> Option<Departure> {
        let in_lobby = self
            .game_of(&player_id)
            .and_then(|id| self.sessions.get(&id))
            .map(|s| s.in_lobby(player_id))?;

        let departed = if in_lobby {
            self.remove_lobby_player(player_id)
        } else {
            self.remove_player(player_id)
        };
        departed.ok()
    }

    fn finish_departure(&mut self, player_id: Uuid, from_lobby: bool) -> Departure {
        let game_id = self.members.remove(&player_id).unwrap_or_default();
        let session_closed = self.close_if_empty(game_id);
        Departure {
            game_id,
            from_lobby,
            session_closed,
        }
    }

    fn close_if_empty(&mut self, game_id: Uuid) -> bool {
        let empty = self
            .sessions
            .get(&game_id)
            .map(Session::is_empty)
            .unwrap_or(false);
        if empty {
            self.sessions.remove(&game_id);
            info!(game_id = %game_id, "Game closed");
        }
        empty
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn sessions_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn lobby_player_count(&self) -> usize {
        self.sessions.values().map(|s| s.lobby.len()).sum()
    }

    pub fn active_player_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| s.state != SessionState::Lobby)
            .map(|s| s.players.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::tests::CREW;
    use chrono::Utc;

    fn registry() -> GameRegistry {
        GameRegistry::with_seed(GameSettings::default(), 42)
    }

    fn fill_lobby(registry: &mut GameRegistry) -> (Uuid, Vec<Uuid>) {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let game_id = registry.join_lobby(ids[0], None, "a".into()).unwrap();
        for &id in &ids[1..] {
            assert_eq!(registry.join_lobby(id, Some(game_id), "b".into()), Ok(game_id));
        }
        (game_id, ids)
    }

    #[test]
    fn unknown_id_creates_fresh_game() {
        let mut registry = registry();
        let requested = Uuid::new_v4();
        let id = registry.get_or_create(Some(requested)).id;
        assert_ne!(id, requested);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn known_open_lobby_is_reused() {
        let mut registry = registry();
        let first = registry.join_lobby(Uuid::new_v4(), None, "a".into()).unwrap();
        let second = registry.join_lobby(Uuid::new_v4(), Some(first), "b".into()).unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lobby_player_count(), 2);
    }

    #[test]
    fn full_lobby_sends_joiner_elsewhere() {
        let mut registry = registry();
        let (game_id, _) = fill_lobby(&mut registry);
        let other = registry.join_lobby(Uuid::new_v4(), Some(game_id), "e".into()).unwrap();
        assert_ne!(other, game_id);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn started_game_sends_joiner_elsewhere() {
        let mut registry = registry();
        let (game_id, ids) = fill_lobby(&mut registry);
        let session = registry.get_mut(&game_id).unwrap();
        for (id, role) in ids.iter().zip(CREW) {
            session.set_role(*id, role).unwrap();
        }
        session.start(Utc::now()).unwrap();
        assert_eq!(registry.active_player_count(), 4);

        let other = registry.join_lobby(Uuid::new_v4(), Some(game_id), "e".into()).unwrap();
        assert_ne!(other, game_id);
    }

    #[test]
    fn double_join_is_rejected() {
        let mut registry = registry();
        let id = Uuid::new_v4();
        registry.join_lobby(id, None, "a".into()).unwrap();
        assert_eq!(
            registry.join_lobby(id, None, "a".into()),
            Err(GameError::AlreadyInSession)
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn last_lobby_member_closes_game() {
        let mut registry = registry();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let game_id = registry.join_lobby(a, None, "a".into()).unwrap();
        registry.join_lobby(b, Some(game_id), "b".into()).unwrap();

        let left = registry.remove_lobby_player(a).unwrap();
        assert!(left.from_lobby);
        assert!(!left.session_closed);

        let left = registry.remove_member(b).unwrap();
        assert!(left.session_closed);
        assert!(registry.is_empty());
        assert_eq!(registry.game_of(&b), None);
    }

    #[test]
    fn last_player_closes_running_game() {
        let mut registry = registry();
        let (game_id, ids) = fill_lobby(&mut registry);
        let session = registry.get_mut(&game_id).unwrap();
        for (id, role) in ids.iter().zip(CREW) {
            session.set_role(*id, role).unwrap();
        }
        session.start(Utc::now()).unwrap();

        assert_eq!(registry.remove_lobby_player(ids[0]), Err(GameError::NotInLobby));
        for (i, id) in ids.iter().enumerate() {
            let left = registry.remove_member(*id).unwrap();
            assert!(!left.from_lobby);
            assert_eq!(left.session_closed, i == ids.len() - 1);
        }
        assert!(registry.get(&game_id).is_none());
    }

    #[test]
    fn strangers_cannot_leave() {
        let mut registry = registry();
        assert_eq!(registry.remove_member(Uuid::new_v4()), None);
        assert_eq!(
            registry.remove_player(Uuid::new_v4()),
            Err(GameError::NotInSession)
        );
    }
}
