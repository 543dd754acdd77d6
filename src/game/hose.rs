//! Water resources - hoses, the fire truck and the hydrant

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::GameError;
use super::Point;

/// Maximum hose length in world units
pub const HOSE_MAX_LENGTH: f32 = 300.0;
/// Stored waypoints per hose; the oldest is dropped beyond this
pub const MAX_HOSE_SEGMENTS: usize = 20;
/// World units per reported foot of hose
pub const HOSE_UNITS_PER_FOOT: f32 = 4.0;
/// Players must be closer than this to a source to connect
pub const CONNECTION_RANGE: f32 = 50.0;

/// Player water tank capacity
pub const PLAYER_WATER_CAPACITY: f32 = 100.0;
/// Water moved from the truck per refill
pub const TRUCK_REFILL_STEP: f32 = 20.0;

pub const TRUCK_POSITION: Point = Point::new(100.0, 500.0);
pub const TRUCK_ANCHOR_OFFSET: Point = Point::new(30.0, 20.0);
pub const TRUCK_WATER_CAPACITY: f32 = 2000.0;
pub const TRUCK_HOSE_SLOTS: usize = 4;
pub const HYDRANT_POSITION: Point = Point::new(200.0, 300.0);

// Tolerance for accumulated float error on polyline lengths
const LENGTH_EPSILON: f32 = 1e-3;

/// What a hose is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    #[default]
    None,
    Truck,
    Hydrant,
}

/// Result of constraining a move against the hose length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constrained {
    pub point: Point,
    pub strained: bool,
}

/// A player's hose
#[derive(Debug, Clone, PartialEq)]
pub struct Hose {
    pub connected: bool,
    pub connection_type: ConnectionType,
    pub connection_point: Option<Point>,
    pub segments: Vec<Point>,
    pub max_length: f32,
    pub strained: bool,
}

impl Default for Hose {
    fn default() -> Self {
        Self {
            connected: false,
            connection_type: ConnectionType::None,
            connection_point: None,
            segments: Vec::new(),
            max_length: HOSE_MAX_LENGTH,
            strained: false,
        }
    }
}

impl Hose {
    fn attach(&mut self, kind: ConnectionType, anchor: Point, at: Point) {
        self.connected = true;
        self.connection_type = kind;
        self.connection_point = Some(anchor);
        self.segments = vec![at];
        self.strained = false;
    }

    fn detach(&mut self) {
        *self = Hose {
            max_length: self.max_length,
            ..Hose::default()
        };
    }

    /// Last fixed point of the hose (last waypoint, else the anchor)
    fn tail(&self) -> Option<Point> {
        self.segments.last().copied().or(self.connection_point)
    }

    /// Length from the anchor through every waypoint
    pub fn laid_length(&self) -> f32 {
        let Some(anchor) = self.connection_point else {
            return 0.0;
        };
        let mut length = 0.0;
        let mut prev = anchor;
        for &p in &self.segments {
            length += prev.distance(p);
            prev = p;
        }
        length
    }

    /// Full polyline length from the anchor to `holder`
    pub fn length_to(&self, holder: Point) -> f32 {
        match self.tail() {
            Some(tail) if self.connected => self.laid_length() + tail.distance(holder),
            _ => 0.0,
        }
    }

    /// Reported length in feet
    pub fn length_feet(&self, holder: Point) -> f32 {
        self.length_to(holder) / HOSE_UNITS_PER_FOOT
    }

    /// Clamp a proposed holder position so the hose never exceeds its
    /// maximum length. With no slack left the holder stays at `prior`.
    pub fn constrain(&self, prior: Point, proposed: Point) -> Constrained {
        let Some(tail) = self.tail().filter(|_| self.connected) else {
            return Constrained {
                point: proposed,
                strained: false,
            };
        };

        let budget = self.max_length - self.laid_length();
        if budget <= 0.0 {
            return Constrained {
                point: prior,
                strained: true,
            };
        }

        let reach = tail.distance(proposed);
        if reach <= budget {
            return Constrained {
                point: proposed,
                strained: false,
            };
        }

        let scale = budget / reach;
        Constrained {
            point: Point::new(
                tail.x + (proposed.x - tail.x) * scale,
                tail.y + (proposed.y - tail.y) * scale,
            ),
            strained: true,
        }
    }

    /// Lay a new waypoint. Rejected when the hose could no longer reach
    /// the holder through it.
    pub fn extend(&mut self, waypoint: Point, holder: Point) -> Result<(), GameError> {
        if !self.connected {
            return Err(GameError::HoseNotConnected);
        }
        let tail = self.tail().unwrap_or(waypoint);
        let length = self.laid_length() + tail.distance(waypoint) + waypoint.distance(holder);
        if length > self.max_length + LENGTH_EPSILON {
            return Err(GameError::HoseTooLong);
        }

        self.segments.push(waypoint);
        if self.segments.len() > MAX_HOSE_SEGMENTS {
            self.segments.remove(0);
        }
        Ok(())
    }

    /// Pick up the most recent waypoint, keeping at least one
    pub fn retract(&mut self) -> Result<(), GameError> {
        if !self.connected {
            return Err(GameError::HoseNotConnected);
        }
        if self.segments.len() > 1 {
            self.segments.pop();
        }
        Ok(())
    }
}

/// One hose coupling on the truck
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoseSlot {
    pub occupant: Option<Uuid>,
}

/// Fire truck: finite water, limited couplings
#[derive(Debug, Clone)]
pub struct FireTruck {
    pub position: Point,
    pub water_level: f32,
    pub max_water: f32,
    pub slots: Vec<HoseSlot>,
}

impl Default for FireTruck {
    fn default() -> Self {
        Self {
            position: TRUCK_POSITION,
            water_level: TRUCK_WATER_CAPACITY,
            max_water: TRUCK_WATER_CAPACITY,
            slots: vec![HoseSlot::default(); TRUCK_HOSE_SLOTS],
        }
    }
}

impl FireTruck {
    pub fn anchor(&self) -> Point {
        Point::new(
            self.position.x + TRUCK_ANCHOR_OFFSET.x,
            self.position.y + TRUCK_ANCHOR_OFFSET.y,
        )
    }

    #[cfg(test)]
    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.occupant.is_none()).count()
    }

    fn claim(&mut self, player_id: Uuid) -> bool {
        match self.slots.iter_mut().find(|s| s.occupant.is_none()) {
            Some(slot) => {
                slot.occupant = Some(player_id);
                true
            }
            None => false,
        }
    }

    /// Free every slot held by `player_id`
    pub fn release(&mut self, player_id: Uuid) {
        for slot in self.slots.iter_mut() {
            if slot.occupant == Some(player_id) {
                slot.occupant = None;
            }
        }
    }
}

/// Hydrant: unlimited water and couplings
#[derive(Debug, Clone)]
pub struct Hydrant {
    pub position: Point,
    /// Hoses currently attached
    pub connections: usize,
}

impl Default for Hydrant {
    fn default() -> Self {
        Self {
            position: HYDRANT_POSITION,
            connections: 0,
        }
    }
}

impl Hydrant {
    pub fn anchor(&self) -> Point {
        self.position
    }
}

/// The fixed water sources of a session
#[derive(Debug, Clone, Default)]
pub struct WaterSources {
    pub truck: FireTruck,
    pub hydrant: Hydrant,
}

impl WaterSources {
    /// Connect or disconnect a hose. Returns whether it is now connected.
    ///
    /// Connecting tries the truck first (needs a free slot), then the
    /// hydrant; both must be in range of `holder`.
    pub fn toggle(&mut self, player_id: Uuid, holder: Point, hose: &mut Hose) -> bool {
        if hose.connected {
            self.disconnect(player_id, hose);
            return false;
        }

        if holder.distance(self.truck.position) < CONNECTION_RANGE && self.truck.claim(player_id) {
            hose.attach(ConnectionType::Truck, self.truck.anchor(), holder);
        } else if holder.distance(self.hydrant.position) < CONNECTION_RANGE {
            hose.attach(ConnectionType::Hydrant, self.hydrant.anchor(), holder);
            self.hydrant.connections += 1;
        }
        hose.connected
    }

    /// Detach a hose and give back whatever it held
    pub fn disconnect(&mut self, player_id: Uuid, hose: &mut Hose) {
        match hose.connection_type {
            ConnectionType::Truck => self.truck.release(player_id),
            ConnectionType::Hydrant => {
                self.hydrant.connections = self.hydrant.connections.saturating_sub(1)
            }
            ConnectionType::None => {}
        }
        hose.detach();
    }

    /// Top up a player's tank from the connected source. Returns the
    /// amount added.
    pub fn refill(&mut self, hose: &Hose, water: &mut f32) -> Result<f32, GameError> {
        if !hose.connected {
            return Err(GameError::HoseNotConnected);
        }
        let before = *water;
        match hose.connection_type {
            ConnectionType::Truck => {
                if self.truck.water_level > 0.0 {
                    let amount = TRUCK_REFILL_STEP
                        .min(PLAYER_WATER_CAPACITY - *water)
                        .min(self.truck.water_level)
                        .max(0.0);
                    *water += amount;
                    self.truck.water_level -= amount;
                }
            }
            ConnectionType::Hydrant => *water = PLAYER_WATER_CAPACITY,
            ConnectionType::None => return Err(GameError::HoseNotConnected),
        }
        Ok(*water - before)
    }
}
