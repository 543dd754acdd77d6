//! Snapshot building for network transmission

use crate::ws::protocol::{
    FireTruckSnapshot, GameStateSnapshot, HoseSlotSnapshot, HoseSnapshot, HydrantSnapshot,
    LobbyMember, LobbyState, PlayerSnapshot,
};

use super::session::{Player, Session};

/// Water available to the crew at the start of a game
pub const WATER_SUPPLY: f32 = 1000.0;

/// Lobby roster in join order
pub fn lobby_state(session: &Session) -> LobbyState {
    LobbyState {
        id: session.id,
        state: session.state,
        players: session
            .lobby
            .iter()
            .map(|p| LobbyMember {
                id: p.id,
                name: p.name.clone(),
                role: p.role,
            })
            .collect(),
    }
}

/// Full state of a session
pub fn game_state(session: &Session) -> GameStateSnapshot {
    let truck = &session.sources.truck;
    let hydrant = &session.sources.hydrant;

    GameStateSnapshot {
        id: session.id,
        state: session.state,
        players: session.players.iter().map(player_snapshot).collect(),
        fire: session.fire.rows(),
        civilians: session.civilians.clone(),
        structural_integrity: session.structural_integrity,
        water_supply: (WATER_SUPPLY - session.water_used).max(0.0),
        level: session.level.clone(),
        fire_truck: FireTruckSnapshot {
            x: truck.position.x,
            y: truck.position.y,
            water_level: truck.water_level,
            max_water: truck.max_water,
            hose_connections: truck
                .slots
                .iter()
                .map(|slot| HoseSlotSnapshot {
                    occupied: slot.occupant.is_some(),
                    player_id: slot.occupant,
                })
                .collect(),
        },
        hydrant: HydrantSnapshot {
            x: hydrant.position.x,
            y: hydrant.position.y,
            connected: hydrant.connections > 0,
        },
        time_remaining: session.time_remaining(),
        result: session.outcome.as_ref().map(|o| o.result),
    }
}

fn player_snapshot(player: &Player) -> PlayerSnapshot {
    let hose = &player.hose;
    PlayerSnapshot {
        id: player.id,
        name: player.name.clone(),
        x: player.position.x,
        y: player.position.y,
        role: player.role,
        health: player.health,
        water: player.water,
        is_alive: player.alive,
        hose: HoseSnapshot {
            connected: hose.connected,
            connection_type: hose.connection_type,
            connection_point: hose.connection_point,
            segments: hose.segments.clone(),
            max_length: hose.max_length,
            strained: hose.strained,
            length: hose.length_to(player.position),
            length_feet: hose.length_feet(player.position),
        },
    }
}

/// Running totals of broadcast snapshots
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub total_bytes: u64,
}

impl SnapshotStats {
    pub fn record(&mut self, bytes: usize) {
        self.total_snapshots += 1;
        self.total_bytes += bytes as u64;
    }

    pub fn avg_bytes(&self) -> u64 {
        self.total_bytes.checked_div(self.total_snapshots).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::hose::TRUCK_POSITION;
    use crate::game::level::{LEVEL_HEIGHT, LEVEL_WIDTH};
    use crate::game::session::tests::{lobby_with, playing};
    use crate::game::{Point, Role, SessionState};

    #[test]
    fn lobby_lists_members_in_join_order() {
        let (session, ids) = lobby_with(&[Some(Role::Firefighter), None]);
        let state = lobby_state(&session);
        assert_eq!(state.state, SessionState::Lobby);
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.players[0].id, ids[0]);
        assert_eq!(state.players[0].role, Some(Role::Firefighter));
        assert_eq!(state.players[1].role, None);
    }

    #[test]
    fn game_state_covers_the_session() {
        let (mut session, ids) = playing();
        session.move_player(ids[0], TRUCK_POSITION).unwrap();
        session.toggle_hose(ids[0]).unwrap();
        session.spray(ids[1], Point::new(300.0, 300.0), 0.0).unwrap();

        let snap = game_state(&session);
        assert_eq!(snap.players.len(), 4);
        assert_eq!(snap.fire.len(), LEVEL_HEIGHT);
        assert!(snap.fire.iter().all(|row| row.len() == LEVEL_WIDTH));
        assert_eq!(snap.water_supply, WATER_SUPPLY - 2.0);
        assert_eq!(snap.time_remaining, 300.0);
        assert_eq!(snap.result, None);

        let holder = &snap.players[0];
        assert!(holder.hose.connected);
        assert!(holder.hose.length > 0.0);
        assert_eq!(holder.hose.length_feet, holder.hose.length / 4.0);
        let occupied: Vec<_> = snap
            .fire_truck
            .hose_connections
            .iter()
            .filter_map(|s| s.player_id)
            .collect();
        assert_eq!(occupied, vec![ids[0]]);
    }

    #[test]
    fn snapshot_serializes_with_wire_names() {
        let (session, _) = playing();
        let json = serde_json::to_value(game_state(&session)).unwrap();
        assert_eq!(json["state"], "playing");
        assert!(json["structuralIntegrity"].is_number());
        assert!(json["fireTruck"]["hoseConnections"].is_array());
        assert!(json["level"]["tiles"][0][0]["type"].is_string());
        assert!(json["players"][0]["hose"]["lengthFeet"].is_number());
    }

    #[test]
    fn stats_average() {
        let mut stats = SnapshotStats::default();
        assert_eq!(stats.avg_bytes(), 0);
        stats.record(100);
        stats.record(300);
        assert_eq!(stats.avg_bytes(), 200);
    }
}
