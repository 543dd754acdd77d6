//! Authoritative fire simulation

pub mod actions;
pub mod error;
pub mod fire;
pub mod hose;
pub mod level;
pub mod registry;
pub mod session;
pub mod snapshot;
pub mod tick;

pub use error::GameError;
pub use registry::GameRegistry;
pub use session::{Role, SessionState};
pub use tick::{GameResult, GameStats};

use serde::{Deserialize, Serialize};

/// World width in units
pub const WORLD_WIDTH: f32 = 800.0;
/// World height in units
pub const WORLD_HEIGHT: f32 = 600.0;

/// A point in world units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Clamp into the world rectangle; NaN collapses to the origin edge
    pub fn clamp_to_world(self) -> Self {
        let x = if self.x.is_nan() { 0.0 } else { self.x };
        let y = if self.y.is_nan() { 0.0 } else { self.y };
        Self {
            x: x.clamp(0.0, WORLD_WIDTH),
            y: y.clamp(0.0, WORLD_HEIGHT),
        }
    }
}

/// Per-session tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameSettings {
    /// Seconds of play before the building is lost
    pub time_limit_secs: f32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            time_limit_secs: 300.0,
        }
    }
}
