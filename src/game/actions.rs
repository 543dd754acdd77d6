//! In-game player intents, applied immediately in arrival order

use uuid::Uuid;

use super::error::GameError;
use super::hose::{ConnectionType, Constrained};
use super::level::world_to_cell;
use super::session::{Player, Session, SessionState};
use super::Point;

/// How far ahead of the nozzle the spray lands
pub const SPRAY_DISTANCE: f32 = 60.0;
/// Extinguish amount applied to each cell of the spray footprint
pub const SPRAY_STRENGTH: f32 = 0.3;
/// Tank water used per spray
pub const SPRAY_COST: f32 = 2.0;

/// Where a spray landed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spray {
    pub origin: Point,
    pub end: Point,
    pub direction: f32,
}

/// Hose state after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoseToggle {
    pub connected: bool,
    pub connection_type: ConnectionType,
}

/// Water levels after a refill
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Refill {
    pub water_level: f32,
    pub truck_water_level: f32,
}

impl Session {
    fn ensure_playing(&self) -> Result<(), GameError> {
        match self.state {
            SessionState::Playing => Ok(()),
            _ => Err(GameError::NotPlaying),
        }
    }

    fn active_player(&mut self, id: Uuid) -> Result<&mut Player, GameError> {
        self.ensure_playing()?;
        self.player_mut(id).ok_or(GameError::NotInSession)
    }

    /// Move a player, clamped to the world and then to their hose reach
    pub fn move_player(&mut self, id: Uuid, to: Point) -> Result<Constrained, GameError> {
        let player = self.active_player(id)?;
        let out = player.hose.constrain(player.position, to.clamp_to_world());
        player.position = out.point;
        player.hose.strained = out.strained;
        Ok(out)
    }

    /// Spray water from `origin` along `direction` (radians)
    pub fn spray(&mut self, id: Uuid, origin: Point, direction: f32) -> Result<Spray, GameError> {
        if !direction.is_finite() {
            return Err(GameError::InvalidDirection);
        }
        let player = self.active_player(id)?;
        if player.water <= 0.0 {
            return Err(GameError::NoWater);
        }

        let used = SPRAY_COST.min(player.water);
        player.water -= used;

        let origin = origin.clamp_to_world();
        let end = Point::new(
            origin.x + direction.cos() * SPRAY_DISTANCE,
            origin.y + direction.sin() * SPRAY_DISTANCE,
        );
        let (gx, gy) = world_to_cell(end.x, end.y);
        for dy in -1..=1 {
            for dx in -1..=1 {
                self.fire.extinguish(gx + dx, gy + dy, SPRAY_STRENGTH);
            }
        }
        self.water_used += used;

        Ok(Spray {
            origin,
            end,
            direction,
        })
    }

    /// Mark a civilian as rescued
    pub fn rescue(&mut self, civilian_id: Uuid) -> Result<(), GameError> {
        self.ensure_playing()?;
        let civilian = self
            .civilians
            .iter_mut()
            .find(|c| c.id == civilian_id)
            .ok_or(GameError::UnknownCivilian)?;
        if civilian.rescued {
            return Err(GameError::AlreadyRescued);
        }
        civilian.rescued = true;
        Ok(())
    }

    pub fn toggle_hose(&mut self, id: Uuid) -> Result<HoseToggle, GameError> {
        self.ensure_playing()?;
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(GameError::NotInSession)?;
        let connected = self.sources.toggle(id, player.position, &mut player.hose);
        Ok(HoseToggle {
            connected,
            connection_type: player.hose.connection_type,
        })
    }

    /// Lay a waypoint; returns the hose's waypoints
    pub fn extend_hose(&mut self, id: Uuid, at: Point) -> Result<Vec<Point>, GameError> {
        let player = self.active_player(id)?;
        player.hose.extend(at.clamp_to_world(), player.position)?;
        Ok(player.hose.segments.clone())
    }

    /// Pick up the latest waypoint; returns the hose's waypoints
    pub fn retract_hose(&mut self, id: Uuid) -> Result<Vec<Point>, GameError> {
        let player = self.active_player(id)?;
        player.hose.retract()?;
        Ok(player.hose.segments.clone())
    }

    pub fn refill(&mut self, id: Uuid) -> Result<Refill, GameError> {
        self.ensure_playing()?;
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(GameError::NotInSession)?;
        self.sources.refill(&player.hose, &mut player.water)?;
        Ok(Refill {
            water_level: player.water,
            truck_water_level: self.sources.truck.water_level,
        })
    }
}
