//! The hub task: applies player events, ticks sessions and fans out results

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::game::snapshot::{game_state, lobby_state, SnapshotStats};
use crate::game::{GameError, GameRegistry, Point, Role, SessionState};
use crate::util::time::{tick_period, unix_millis, Timer};
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::connections::{ConnectionRegistry, Frame};
use super::{Envelope, GameSummary, HubEvent, HubStats, PlayerInput, Recipient, SharedStats};

/// Longest display name kept from a join request
pub const MAX_NAME_LEN: usize = 24;

/// Name shown for a player, derived from what they asked for
pub fn display_name(player_id: Uuid, requested: &str) -> String {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        format!("Firefighter-{}", &player_id.to_string()[..8])
    } else {
        trimmed.chars().take(MAX_NAME_LEN).collect()
    }
}

/// Single owner of all game state. Every mutation happens on the task
/// running [`GameHub::run`], one event or tick at a time.
pub struct GameHub {
    registry: GameRegistry,
    connections: ConnectionRegistry,
    stats: SharedStats,
    snapshot_stats: SnapshotStats,
}

impl GameHub {
    pub fn new(registry: GameRegistry, connections: ConnectionRegistry, stats: SharedStats) -> Self {
        Self {
            registry,
            connections,
            stats,
            snapshot_stats: SnapshotStats::default(),
        }
    }

    /// Run until every event sender is gone
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<HubEvent>,
        simulation_tps: u32,
        broadcast_tps: u32,
    ) {
        info!(simulation_tps, broadcast_tps, "Game hub started");

        let mut simulation = interval(tick_period(simulation_tps));
        simulation.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut broadcast = interval(tick_period(broadcast_tps));
        broadcast.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut clock = Timer::new();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(HubEvent::Input(input)) => {
                        let out = self.handle_input(input);
                        self.dispatch(out);
                        self.publish_stats();
                    }
                    Some(HubEvent::Disconnected(player_id)) => {
                        let out = self.disconnect(player_id);
                        self.dispatch(out);
                        self.publish_stats();
                    }
                    None => break,
                },
                _ = simulation.tick() => {
                    let out = self.tick_all(clock.lap());
                    self.dispatch(out);
                    self.publish_stats();
                }
                _ = broadcast.tick() => {
                    let out = self.broadcast_all();
                    self.dispatch(out);
                }
            }
        }

        info!(
            snapshots = self.snapshot_stats.total_snapshots,
            avg_bytes = self.snapshot_stats.avg_bytes(),
            "Game hub stopped"
        );
    }

    /// Apply one input. Rejections come back as an `error` reply when the
    /// sender should hear about them and are dropped otherwise.
    pub fn handle_input(&mut self, input: PlayerInput) -> Vec<Envelope> {
        let player_id = input.player_id;
        match self.apply(player_id, input.msg) {
            Ok(out) => out,
            Err(e) if e.notify_client() => {
                debug!(player_id = %player_id, error = %e, "Rejected intent");
                vec![Envelope::player(
                    player_id,
                    ServerMsg::Error {
                        message: e.to_string(),
                    },
                )]
            }
            Err(e) => {
                debug!(
                    player_id = %player_id,
                    error = %e,
                    age_ms = unix_millis().saturating_sub(input.received_at),
                    "Ignored intent"
                );
                Vec::new()
            }
        }
    }

    fn apply(&mut self, player_id: Uuid, msg: ClientMsg) -> Result<Vec<Envelope>, GameError> {
        match msg {
            ClientMsg::JoinLobby {
                game_id,
                player_name,
            } => self.join_lobby(player_id, game_id.as_deref(), &player_name),
            ClientMsg::SelectRole { role } => self.select_role(player_id, role),
            ClientMsg::StartGame => self.start_game(player_id),
            ClientMsg::LeaveLobby => self.leave_lobby(player_id),
            ClientMsg::PlayerMove { x, y } => {
                let session = self.registry.session_of_mut(&player_id)?;
                let moved = session.move_player(player_id, Point::new(x, y))?;
                Ok(vec![Envelope::game(
                    session.id,
                    ServerMsg::PlayerMoved {
                        player_id,
                        x: moved.point.x,
                        y: moved.point.y,
                        strained: moved.strained,
                    },
                )])
            }
            ClientMsg::SprayWater { x, y, direction } => {
                let session = self.registry.session_of_mut(&player_id)?;
                let spray = session.spray(player_id, Point::new(x, y), direction)?;
                Ok(vec![Envelope::game(
                    session.id,
                    ServerMsg::WaterSprayed {
                        player_id,
                        x: spray.origin.x,
                        y: spray.origin.y,
                        end_x: spray.end.x,
                        end_y: spray.end.y,
                        direction: spray.direction,
                    },
                )])
            }
            ClientMsg::RescueCivilian { civilian_id } => {
                let session = self.registry.session_of_mut(&player_id)?;
                if session.player(player_id).is_none() {
                    return Err(GameError::NotPlaying);
                }
                session.rescue(civilian_id)?;
                info!(game_id = %session.id, player_id = %player_id, civilian_id = %civilian_id, "Civilian rescued");
                Ok(vec![Envelope::game(
                    session.id,
                    ServerMsg::CivilianRescued { civilian_id },
                )])
            }
            ClientMsg::ToggleHoseConnection => {
                let session = self.registry.session_of_mut(&player_id)?;
                let toggle = session.toggle_hose(player_id)?;
                Ok(vec![Envelope::game(
                    session.id,
                    ServerMsg::HoseConnectionToggled {
                        player_id,
                        connected: toggle.connected,
                        connection_type: toggle.connection_type,
                    },
                )])
            }
            ClientMsg::ExtendHose { x, y } => {
                let session = self.registry.session_of_mut(&player_id)?;
                let segments = session.extend_hose(player_id, Point::new(x, y))?;
                Ok(vec![Envelope::game(
                    session.id,
                    ServerMsg::HoseExtended {
                        player_id,
                        segments,
                    },
                )])
            }
            ClientMsg::RetractHose => {
                let session = self.registry.session_of_mut(&player_id)?;
                let segments = session.retract_hose(player_id)?;
                Ok(vec![Envelope::game(
                    session.id,
                    ServerMsg::HoseRetracted {
                        player_id,
                        segments,
                    },
                )])
            }
            ClientMsg::RefillWater => {
                let session = self.registry.session_of_mut(&player_id)?;
                let refill = session.refill(player_id)?;
                Ok(vec![Envelope::game(
                    session.id,
                    ServerMsg::WaterRefilled {
                        player_id,
                        water_level: refill.water_level,
                        truck_water_level: refill.truck_water_level,
                    },
                )])
            }
        }
    }

    fn join_lobby(
        &mut self,
        player_id: Uuid,
        requested: Option<&str>,
        name: &str,
    ) -> Result<Vec<Envelope>, GameError> {
        // An id that does not parse is treated like one that does not exist
        let requested = requested.and_then(|id| Uuid::parse_str(id).ok());
        let name = display_name(player_id, name);
        let game_id = self.registry.join_lobby(player_id, requested, name.clone())?;
        let session = self.registry.get(&game_id).ok_or(GameError::NotInSession)?;
        let lobby = lobby_state(session);

        info!(game_id = %game_id, player_id = %player_id, name = %name, "Player joined lobby");

        Ok(vec![
            Envelope::player(
                player_id,
                ServerMsg::LobbyJoined {
                    game_id,
                    player_id,
                    lobby_state: lobby.clone(),
                },
            ),
            Envelope::game(game_id, ServerMsg::LobbyUpdated(lobby)),
        ])
    }

    fn select_role(&mut self, player_id: Uuid, role: Role) -> Result<Vec<Envelope>, GameError> {
        let session = self.registry.session_of_mut(&player_id)?;
        session.set_role(player_id, role)?;
        debug!(game_id = %session.id, player_id = %player_id, role = %role, "Role selected");
        Ok(vec![Envelope::game(
            session.id,
            ServerMsg::LobbyUpdated(lobby_state(session)),
        )])
    }

    fn start_game(&mut self, player_id: Uuid) -> Result<Vec<Envelope>, GameError> {
        let session = self.registry.session_of_mut(&player_id)?;
        if !session.in_lobby(player_id) {
            return Err(GameError::NotInLobby);
        }
        let started_at = Utc::now();
        session.start(started_at)?;

        let game_id = session.id;
        let snapshot = game_state(session);
        let mut out: Vec<Envelope> = session
            .players
            .iter()
            .map(|p| {
                Envelope::player(
                    p.id,
                    ServerMsg::GameJoined {
                        game_id,
                        player_id: p.id,
                        game_state: Box::new(snapshot.clone()),
                    },
                )
            })
            .collect();
        out.push(Envelope::game(
            game_id,
            ServerMsg::GameStarted {
                game_id,
                started_at,
                time_limit: session.settings.time_limit_secs,
            },
        ));
        Ok(out)
    }

    fn leave_lobby(&mut self, player_id: Uuid) -> Result<Vec<Envelope>, GameError> {
        let departure = self.registry.remove_lobby_player(player_id)?;
        info!(game_id = %departure.game_id, player_id = %player_id, "Player left lobby");
        Ok(self.lobby_update(departure.game_id))
    }

    fn lobby_update(&self, game_id: Uuid) -> Vec<Envelope> {
        self.registry
            .get(&game_id)
            .map(|session| Envelope::game(game_id, ServerMsg::LobbyUpdated(lobby_state(session))))
            .into_iter()
            .collect()
    }

    /// Remove a closed connection from whatever it belonged to
    pub fn disconnect(&mut self, player_id: Uuid) -> Vec<Envelope> {
        let Some(departure) = self.registry.remove_member(player_id) else {
            return Vec::new();
        };
        info!(
            game_id = %departure.game_id,
            player_id = %player_id,
            from_lobby = departure.from_lobby,
            "Player disconnected"
        );

        if departure.session_closed {
            Vec::new()
        } else if departure.from_lobby {
            self.lobby_update(departure.game_id)
        } else {
            vec![Envelope::game(
                departure.game_id,
                ServerMsg::PlayerLeft { player_id },
            )]
        }
    }

    /// Advance every running session by `dt` seconds
    pub fn tick_all(&mut self, dt: f32) -> Vec<Envelope> {
        self.registry
            .sessions_mut()
            .filter_map(|session| {
                let outcome = session.tick(dt)?;
                Some(Envelope::game(
                    session.id,
                    ServerMsg::GameEnded {
                        result: outcome.result,
                        stats: outcome.stats,
                    },
                ))
            })
            .collect()
    }

    /// Full state for every running session
    pub fn broadcast_all(&self) -> Vec<Envelope> {
        self.registry
            .sessions()
            .filter(|s| s.state == SessionState::Playing)
            .map(|s| Envelope::game(s.id, ServerMsg::GameStateUpdate(Box::new(game_state(s)))))
            .collect()
    }

    fn dispatch(&mut self, envelopes: Vec<Envelope>) {
        for envelope in envelopes {
            let is_snapshot = matches!(envelope.msg, ServerMsg::GameStateUpdate(_));
            if let Some(bytes) = self.deliver(&envelope) {
                if is_snapshot {
                    self.snapshot_stats.record(bytes);
                }
            }
        }
    }

    /// Serialize once and queue the frame for each recipient.
    /// Returns the frame size.
    fn deliver(&self, envelope: &Envelope) -> Option<usize> {
        let frame: Frame = match serde_json::to_string(&envelope.msg) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                error!(error = %e, "Failed to serialize outbound message");
                return None;
            }
        };

        match envelope.to {
            Recipient::Player(player_id) => {
                self.connections.send(player_id, frame.clone());
            }
            Recipient::Game(game_id) => {
                if let Some(session) = self.registry.get(&game_id) {
                    for member in session.member_ids() {
                        self.connections.send(member, frame.clone());
                    }
                }
            }
        }
        Some(frame.len())
    }

    fn publish_stats(&self) {
        let games = self
            .registry
            .sessions()
            .map(|s| {
                (
                    s.id,
                    GameSummary {
                        id: s.id,
                        state: s.state,
                        player_count: s.member_count(),
                    },
                )
            })
            .collect();

        *self.stats.write() = HubStats {
            active_games: self.registry.len(),
            lobby_players: self.registry.lobby_player_count(),
            active_players: self.registry.active_player_count(),
            games,
        };
    }

    #[cfg(test)]
    pub fn registry(&self) -> &GameRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub fn registry_mut(&mut self) -> &mut GameRegistry {
        &mut self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::tests::CREW;
    use crate::game::{GameResult, GameSettings};
    use parking_lot::RwLock;
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn hub() -> GameHub {
        GameHub::new(
            GameRegistry::with_seed(GameSettings::default(), 11),
            ConnectionRegistry::new(),
            Arc::new(RwLock::new(HubStats::default())),
        )
    }

    fn input(player_id: Uuid, msg: ClientMsg) -> PlayerInput {
        PlayerInput {
            player_id,
            msg,
            received_at: unix_millis(),
        }
    }

    fn join(hub: &mut GameHub, player_id: Uuid, game_id: Option<Uuid>) -> Vec<Envelope> {
        hub.handle_input(input(
            player_id,
            ClientMsg::JoinLobby {
                game_id: game_id.map(|id| id.to_string()),
                player_name: String::new(),
            },
        ))
    }

    fn error_message(out: &[Envelope]) -> Option<&str> {
        match out {
            [Envelope {
                msg: ServerMsg::Error { message },
                ..
            }] => Some(message.as_str()),
            _ => None,
        }
    }

    /// Four players in one lobby, roles picked; returns (game id, player ids)
    fn full_lobby(hub: &mut GameHub) -> (Uuid, Vec<Uuid>) {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        join(hub, ids[0], None);
        let game_id = hub.registry().game_of(&ids[0]).unwrap();
        for &id in &ids[1..] {
            join(hub, id, Some(game_id));
        }
        for (&id, role) in ids.iter().zip(CREW) {
            let out = hub.handle_input(input(id, ClientMsg::SelectRole { role }));
            assert!(matches!(out[0].msg, ServerMsg::LobbyUpdated(_)));
        }
        (game_id, ids)
    }

    #[test]
    fn names_are_cleaned_up() {
        let id = Uuid::new_v4();
        let fallback = display_name(id, "   ");
        assert_eq!(fallback, format!("Firefighter-{}", &id.to_string()[..8]));
        assert_eq!(display_name(id, "  Sam  "), "Sam");
        assert_eq!(display_name(id, &"x".repeat(40)).len(), MAX_NAME_LEN);
    }

    #[test]
    fn join_replies_and_updates_lobby() {
        let mut hub = hub();
        let id = Uuid::new_v4();
        let out = join(&mut hub, id, None);
        assert_eq!(out.len(), 2);

        let game_id = hub.registry().game_of(&id).unwrap();
        match &out[0] {
            Envelope {
                to: Recipient::Player(to),
                msg:
                    ServerMsg::LobbyJoined {
                        game_id: joined,
                        lobby_state,
                        ..
                    },
            } => {
                assert_eq!(*to, id);
                assert_eq!(*joined, game_id);
                assert_eq!(lobby_state.players.len(), 1);
                assert!(lobby_state.players[0].name.starts_with("Firefighter-"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(out[1].to, Recipient::Game(game_id));
    }

    #[test]
    fn second_join_is_reported() {
        let mut hub = hub();
        let id = Uuid::new_v4();
        join(&mut hub, id, None);
        let out = join(&mut hub, id, None);
        assert_eq!(error_message(&out), Some("Already in a game"));
        assert_eq!(hub.registry().len(), 1);
    }

    #[test]
    fn malformed_game_id_gets_a_fresh_lobby() {
        let mut hub = hub();
        let id = Uuid::new_v4();
        let out = hub.handle_input(input(
            id,
            ClientMsg::JoinLobby {
                game_id: Some("not-a-uuid".into()),
                player_name: "Sam".into(),
            },
        ));
        assert!(matches!(out[0].msg, ServerMsg::LobbyJoined { .. }));
        assert_eq!(hub.registry().len(), 1);
    }

    #[test]
    fn lobby_rejections_are_reported() {
        let mut hub = hub();
        let ids: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        join(&mut hub, ids[0], None);
        let game_id = hub.registry().game_of(&ids[0]).unwrap();
        join(&mut hub, ids[1], Some(game_id));

        hub.handle_input(input(ids[0], ClientMsg::SelectRole { role: Role::PumpOperator }));
        let out = hub.handle_input(input(ids[1], ClientMsg::SelectRole { role: Role::PumpOperator }));
        assert_eq!(error_message(&out), Some("Role is already full"));

        let out = hub.handle_input(input(ids[0], ClientMsg::StartGame));
        assert_eq!(
            error_message(&out),
            Some("Cannot start game - not all roles filled")
        );
    }

    #[test]
    fn out_of_context_intents_are_silent() {
        let mut hub = hub();
        let stranger = Uuid::new_v4();
        assert!(hub
            .handle_input(input(stranger, ClientMsg::PlayerMove { x: 1.0, y: 1.0 }))
            .is_empty());
        assert!(hub.handle_input(input(stranger, ClientMsg::LeaveLobby)).is_empty());

        let id = Uuid::new_v4();
        join(&mut hub, id, None);
        let lobby_intents = [
            ClientMsg::PlayerMove { x: 1.0, y: 1.0 },
            ClientMsg::SprayWater {
                x: 1.0,
                y: 1.0,
                direction: 0.0,
            },
            ClientMsg::ToggleHoseConnection,
            ClientMsg::RefillWater,
            ClientMsg::RetractHose,
        ];
        for msg in lobby_intents {
            assert!(hub.handle_input(input(id, msg)).is_empty());
        }
    }

    #[test]
    fn start_sends_each_player_the_game() {
        let mut hub = hub();
        let (game_id, ids) = full_lobby(&mut hub);

        let out = hub.handle_input(input(ids[2], ClientMsg::StartGame));
        assert_eq!(out.len(), 5);
        for (envelope, id) in out.iter().zip(&ids) {
            assert_eq!(envelope.to, Recipient::Player(*id));
            match &envelope.msg {
                ServerMsg::GameJoined {
                    player_id,
                    game_state,
                    ..
                } => {
                    assert_eq!(player_id, id);
                    assert_eq!(game_state.state, SessionState::Playing);
                    assert_eq!(game_state.players.len(), 4);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(matches!(
            out[4],
            Envelope {
                to: Recipient::Game(g),
                msg: ServerMsg::GameStarted { time_limit, .. },
            } if g == game_id && time_limit == 300.0
        ));

        // Nobody else can join a running game
        let late = Uuid::new_v4();
        join(&mut hub, late, Some(game_id));
        assert_ne!(hub.registry().game_of(&late), Some(game_id));
    }

    #[test]
    fn gameplay_intents_are_broadcast() {
        let mut hub = hub();
        let (game_id, ids) = full_lobby(&mut hub);
        hub.handle_input(input(ids[0], ClientMsg::StartGame));

        let out = hub.handle_input(input(ids[0], ClientMsg::PlayerMove { x: -10.0, y: 50.0 }));
        assert!(matches!(
            out[..],
            [Envelope {
                to: Recipient::Game(g),
                msg: ServerMsg::PlayerMoved { x, y, strained: false, .. },
            }] if g == game_id && x == 0.0 && y == 50.0
        ));

        let out = hub.handle_input(input(
            ids[1],
            ClientMsg::SprayWater {
                x: 100.0,
                y: 100.0,
                direction: 0.0,
            },
        ));
        assert!(matches!(
            out[0].msg,
            ServerMsg::WaterSprayed { end_x, end_y, .. } if end_x == 160.0 && end_y == 100.0
        ));

        let civilian_id = hub.registry().get(&game_id).unwrap().civilians[0].id;
        let out = hub.handle_input(input(ids[2], ClientMsg::RescueCivilian { civilian_id }));
        assert!(matches!(out[0].msg, ServerMsg::CivilianRescued { .. }));
        // A second rescue of the same civilian is ignored
        assert!(hub
            .handle_input(input(ids[3], ClientMsg::RescueCivilian { civilian_id }))
            .is_empty());

        // Nowhere near a water source
        let out = hub.handle_input(input(ids[3], ClientMsg::ToggleHoseConnection));
        assert!(matches!(
            out[0].msg,
            ServerMsg::HoseConnectionToggled { connected: false, .. }
        ));
        assert!(hub
            .handle_input(input(ids[3], ClientMsg::ExtendHose { x: 1.0, y: 1.0 }))
            .is_empty());
    }

    #[test]
    fn disconnects_update_the_rest() {
        let mut hub = hub();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        join(&mut hub, a, None);
        let game_id = hub.registry().game_of(&a).unwrap();
        join(&mut hub, b, Some(game_id));

        let out = hub.disconnect(a);
        match &out[..] {
            [Envelope {
                msg: ServerMsg::LobbyUpdated(lobby),
                ..
            }] => assert_eq!(lobby.players.len(), 1),
            other => panic!("unexpected {other:?}"),
        }

        assert!(hub.disconnect(b).is_empty());
        assert!(hub.registry().is_empty());
        assert!(hub.disconnect(b).is_empty());
    }

    #[test]
    fn in_game_disconnect_announces_player_left() {
        let mut hub = hub();
        let (_, ids) = full_lobby(&mut hub);
        hub.handle_input(input(ids[0], ClientMsg::StartGame));

        let out = hub.disconnect(ids[1]);
        assert!(matches!(
            out[..],
            [Envelope {
                msg: ServerMsg::PlayerLeft { player_id },
                ..
            }] if player_id == ids[1]
        ));
        assert_eq!(hub.registry().active_player_count(), 3);
    }

    #[test]
    fn game_end_is_announced_once() {
        let mut hub = hub();
        let (game_id, ids) = full_lobby(&mut hub);
        hub.handle_input(input(ids[0], ClientMsg::StartGame));
        hub.registry_mut()
            .get_mut(&game_id)
            .unwrap()
            .structural_integrity = 0.0;

        let out = hub.tick_all(0.1);
        assert!(matches!(
            out[..],
            [Envelope {
                msg: ServerMsg::GameEnded {
                    result: GameResult::Defeat,
                    ..
                },
                ..
            }]
        ));
        assert!(hub.tick_all(0.1).is_empty());
        // Ended sessions are no longer broadcast
        assert!(hub.broadcast_all().is_empty());
    }

    #[test]
    fn only_running_games_are_broadcast() {
        let mut hub = hub();
        let (_, ids) = full_lobby(&mut hub);
        assert!(hub.broadcast_all().is_empty());
        hub.handle_input(input(ids[0], ClientMsg::StartGame));
        assert_eq!(hub.broadcast_all().len(), 1);
    }

    #[test]
    fn game_envelopes_reach_every_member() {
        let mut hub = hub();
        let (game_id, ids) = full_lobby(&mut hub);
        let mut receivers: Vec<_> = ids.iter().map(|id| hub.connections.register(*id)).collect();

        hub.dispatch(vec![Envelope::game(game_id, ServerMsg::PlayerLeft { player_id: ids[0] })]);
        for rx in receivers.iter_mut() {
            let frame = rx.try_recv().unwrap();
            assert!(frame.contains(r#""type":"playerLeft""#));
        }

        hub.dispatch(vec![Envelope::player(ids[1], ServerMsg::Error { message: "x".into() })]);
        assert!(receivers[0].try_recv().is_err());
        assert!(receivers[1].try_recv().is_ok());
    }

    #[test]
    fn published_stats_track_sessions() {
        let mut hub = hub();
        let (game_id, ids) = full_lobby(&mut hub);
        hub.publish_stats();
        {
            let stats = hub.stats.read();
            assert_eq!(stats.active_games, 1);
            assert_eq!(stats.lobby_players, 4);
            assert_eq!(stats.games[&game_id].state, SessionState::Lobby);
        }

        hub.handle_input(input(ids[0], ClientMsg::StartGame));
        hub.publish_stats();
        let stats = hub.stats.read();
        assert_eq!(stats.lobby_players, 0);
        assert_eq!(stats.active_players, 4);
        assert_eq!(stats.games[&game_id].player_count, 4);
    }

    #[tokio::test]
    async fn run_loop_serves_connections() {
        let connections = ConnectionRegistry::new();
        let stats = Arc::new(RwLock::new(HubStats::default()));
        let hub = GameHub::new(
            GameRegistry::with_seed(GameSettings::default(), 3),
            connections.clone(),
            stats.clone(),
        );
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(hub.run(rx, 50, 25));

        let id = Uuid::new_v4();
        let mut outbound = connections.register(id);
        assert_ok!(
            tx.send(HubEvent::Input(input(
                id,
                ClientMsg::JoinLobby {
                    game_id: None,
                    player_name: "Sam".into(),
                },
            )))
            .await
        );

        let first = tokio::time::timeout(Duration::from_secs(1), outbound.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(first.contains(r#""type":"lobbyJoined""#));
        let second = tokio::time::timeout(Duration::from_secs(1), outbound.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(second.contains(r#""type":"lobbyUpdated""#));
        assert_eq!(stats.read().lobby_players, 1);

        assert_ok!(tx.send(HubEvent::Disconnected(id)).await);
        drop(tx);
        let finished = tokio::time::timeout(Duration::from_secs(1), task).await;
        let joined = assert_ok!(finished);
        assert_ok!(joined);
        assert_eq!(stats.read().active_games, 0);
    }
}
