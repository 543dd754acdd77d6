//! Fixed-period simulation step and win/lose evaluation

use serde::Serialize;
use tracing::info;

use super::level::world_to_cell;
use super::session::{Session, SessionState};

/// Civilians in cells hotter than this take damage
pub const CIVILIAN_DAMAGE_INTENSITY: f32 = 0.3;
const CIVILIAN_DAMAGE_RATE: f32 = 10.0;
const STRUCTURE_DECAY_RATE: f32 = 0.5;
/// Below this total intensity the fire counts as out
pub const FIRE_OUT_THRESHOLD: f32 = 0.1;
/// Share of civilians that must be rescued to win
pub const RESCUE_QUOTA: f32 = 0.7;

/// How a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Victory,
    Defeat,
}

/// Final numbers, computed once when the game ends
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    pub time_elapsed: f32,
    pub structural_integrity: f32,
    pub civilians_rescued: usize,
    pub total_civilians: usize,
    pub water_used: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameOutcome {
    pub result: GameResult,
    pub stats: GameStats,
}

impl Session {
    pub fn rescued_count(&self) -> usize {
        self.civilians.iter().filter(|c| c.rescued).count()
    }

    /// Rescues needed for victory
    pub fn rescue_target(&self) -> usize {
        (self.civilians.len() as f32 * RESCUE_QUOTA).ceil() as usize
    }

    /// Advance the session by `dt` seconds.
    ///
    /// Returns the outcome on the tick the game ends and `None` on every
    /// other tick, including all ticks after the end.
    pub fn tick(&mut self, dt: f32) -> Option<GameOutcome> {
        if self.state != SessionState::Playing {
            return None;
        }
        self.elapsed += dt;

        self.fire.advance(dt);
        self.damage_civilians(dt);

        let total_fire = self.fire.total_intensity();
        if total_fire > 0.0 {
            self.structural_integrity =
                (self.structural_integrity - total_fire * dt * STRUCTURE_DECAY_RATE).max(0.0);
        }

        let result = self.evaluate(total_fire)?;
        Some(self.end(result))
    }

    fn damage_civilians(&mut self, dt: f32) {
        for civilian in self.civilians.iter_mut() {
            if civilian.rescued || civilian.unconscious {
                continue;
            }
            let (cx, cy) = world_to_cell(civilian.x, civilian.y);
            let intensity = self.fire.intensity_at(cx, cy);
            if intensity > CIVILIAN_DAMAGE_INTENSITY {
                civilian.health = (civilian.health - intensity * dt * CIVILIAN_DAMAGE_RATE).max(0.0);
                if civilian.health <= 0.0 {
                    civilian.unconscious = true;
                }
            }
        }
    }

    /// First matching end condition, defeat before victory
    fn evaluate(&self, total_fire: f32) -> Option<GameResult> {
        if self.structural_integrity <= 0.0 || self.elapsed >= self.settings.time_limit_secs {
            Some(GameResult::Defeat)
        } else if total_fire < FIRE_OUT_THRESHOLD && self.rescued_count() >= self.rescue_target() {
            Some(GameResult::Victory)
        } else {
            None
        }
    }

    fn end(&mut self, result: GameResult) -> GameOutcome {
        self.state = SessionState::Ended;
        let outcome = GameOutcome {
            result,
            stats: self.stats(),
        };
        self.outcome = Some(outcome.clone());

        info!(
            game_id = %self.id,
            result = ?result,
            elapsed = self.elapsed,
            rescued = outcome.stats.civilians_rescued,
            "Game ended"
        );
        outcome
    }

    pub fn stats(&self) -> GameStats {
        GameStats {
            time_elapsed: self.elapsed,
            structural_integrity: self.structural_integrity,
            civilians_rescued: self.rescued_count(),
            total_civilians: self.civilians.len(),
            water_used: self.water_used,
        }
    }
}
