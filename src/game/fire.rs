//! Cellular fire model - temperature, fuel, oxygen and intensity per cell

use serde::Serialize;

use super::level::Level;

/// Ambient temperature in °C; cells never cool below this
pub const AMBIENT_TEMPERATURE: f32 = 20.0;
/// Cells at or below this intensity are not burning
pub const ACTIVE_INTENSITY: f32 = 0.05;
/// Burning cells above this intensity heat their neighbours
pub const SPREAD_INTENSITY: f32 = 0.3;
/// Neighbour temperature at which it catches fire
pub const IGNITION_TEMPERATURE: f32 = 70.0;

const FUEL_BURN_RATE: f32 = 0.08;
const OXYGEN_BURN_RATE: f32 = 0.15;
const STARVE_INTENSITY_RATE: f32 = 1.5;
const STARVE_COOLING_RATE: f32 = 25.0;
const HEAT_TRANSFER_RATE: f32 = 0.2;
const HEAT_TRANSFER_SCALE: f32 = 15.0;
const PASSIVE_COOLING_RATE: f32 = 3.0;
const SPREAD_MIN_FUEL: f32 = 0.2;
const SPREAD_MIN_OXYGEN: f32 = 0.2;
const SPREAD_MAX_INTENSITY: f32 = 0.1;
const SPREAD_IGNITION_CAP: f32 = 0.6;

/// Fuel of a fresh floor cell
pub const DEFAULT_FUEL: f32 = 0.8;

/// One fire cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FireCell {
    /// Temperature in °C
    pub temperature: f32,
    /// Remaining fuel (0-1)
    pub fuel: f32,
    /// Remaining oxygen (0-1)
    pub oxygen: f32,
    /// Fire strength (0-1)
    pub intensity: f32,
}

impl FireCell {
    fn fresh(fuel: f32) -> Self {
        Self {
            temperature: AMBIENT_TEMPERATURE,
            fuel,
            oxygen: 1.0,
            intensity: 0.0,
        }
    }

    fn is_burning(&self) -> bool {
        self.intensity > ACTIVE_INTENSITY
    }
}

/// 2D fire cellular automaton
#[derive(Debug, Clone)]
pub struct FireGrid {
    width: usize,
    height: usize,
    cells: Vec<FireCell>,
    /// Working set reused across ticks
    active: Vec<usize>,
    /// Marks cells already queued in `active` this tick
    queued: Vec<bool>,
}

impl FireGrid {
    /// Uniform grid of unburnt floor cells
    #[cfg(test)]
    pub fn new(width: usize, height: usize) -> Self {
        Self::from_cells(width, height, vec![FireCell::fresh(DEFAULT_FUEL); width * height])
    }

    /// Grid matching a level; walls carry no fuel
    pub fn from_level(level: &Level) -> Self {
        let mut cells = Vec::with_capacity(level.width() * level.height());
        for y in 0..level.height() {
            for x in 0..level.width() {
                let fuel = if level.is_passable(x as i32, y as i32) {
                    DEFAULT_FUEL
                } else {
                    0.0
                };
                cells.push(FireCell::fresh(fuel));
            }
        }
        Self::from_cells(level.width(), level.height(), cells)
    }

    fn from_cells(width: usize, height: usize, cells: Vec<FireCell>) -> Self {
        Self {
            width,
            height,
            queued: vec![false; cells.len()],
            active: Vec::new(),
            cells,
        }
    }

    #[cfg(test)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[cfg(test)]
    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// Cell at (x, y), if inside the grid
    pub fn cell(&self, x: i32, y: i32) -> Option<&FireCell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Override fuel and oxygen of a cell
    #[cfg(test)]
    pub fn set_supply(&mut self, x: i32, y: i32, fuel: f32, oxygen: f32) {
        if let Some(i) = self.index(x, y) {
            self.cells[i].fuel = fuel.clamp(0.0, 1.0);
            self.cells[i].oxygen = oxygen.clamp(0.0, 1.0);
        }
    }

    /// Set a cell's temperature and derive its intensity. No-op out of bounds.
    pub fn ignite(&mut self, x: i32, y: i32, temperature: f32) {
        if let Some(i) = self.index(x, y) {
            let cell = &mut self.cells[i];
            cell.temperature = temperature;
            cell.intensity = (temperature / 100.0).clamp(0.0, 1.0);
        }
    }

    /// Cool a cell by `amount * 50` °C and reduce intensity by `amount`.
    /// No-op out of bounds.
    pub fn extinguish(&mut self, x: i32, y: i32, amount: f32) {
        if let Some(i) = self.index(x, y) {
            let cell = &mut self.cells[i];
            cell.temperature = (cell.temperature - amount * 50.0).max(AMBIENT_TEMPERATURE);
            cell.intensity = (cell.intensity - amount).max(0.0);
        }
    }

    /// Intensity at (x, y); 0 outside the grid
    pub fn intensity_at(&self, x: i32, y: i32) -> f32 {
        self.cell(x, y).map(|c| c.intensity).unwrap_or(0.0)
    }

    /// Sum of all cell intensities
    pub fn total_intensity(&self) -> f32 {
        self.cells.iter().map(|c| c.intensity).sum()
    }

    /// Number of cells currently burning
    pub fn burning_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_burning()).count()
    }

    /// Rows of cells for snapshots
    pub fn rows(&self) -> Vec<Vec<FireCell>> {
        self.cells.chunks(self.width.max(1)).map(|row| row.to_vec()).collect()
    }

    /// Advance the fire by `dt` seconds.
    ///
    /// Only burning cells and their 8-neighbours are visited; a grid with
    /// no burning cell is left untouched.
    pub fn advance(&mut self, dt: f32) {
        self.collect_active();

        let active = std::mem::take(&mut self.active);
        for &i in &active {
            self.update_cell(i, dt);
        }
        self.active = active;
    }

    /// Rebuild the working set of cells to process this tick
    fn collect_active(&mut self) {
        self.active.clear();
        self.queued.iter_mut().for_each(|q| *q = false);

        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let i = y as usize * self.width + x as usize;
                if !self.cells[i].is_burning() {
                    continue;
                }
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if let Some(n) = self.index(x + dx, y + dy) {
                            if !self.queued[n] {
                                self.queued[n] = true;
                                self.active.push(n);
                            }
                        }
                    }
                }
            }
        }
    }

    fn update_cell(&mut self, i: usize, dt: f32) {
        let cell = &mut self.cells[i];

        if !cell.is_burning() {
            if cell.temperature > AMBIENT_TEMPERATURE {
                cell.temperature =
                    (cell.temperature - dt * PASSIVE_COOLING_RATE).max(AMBIENT_TEMPERATURE);
            }
            return;
        }

        cell.fuel = (cell.fuel - dt * FUEL_BURN_RATE).max(0.0);
        cell.oxygen = (cell.oxygen - dt * OXYGEN_BURN_RATE).max(0.0);

        // Starved fire dies down
        if cell.fuel <= 0.0 || cell.oxygen <= 0.0 {
            cell.intensity = (cell.intensity - dt * STARVE_INTENSITY_RATE).max(0.0);
            cell.temperature = (cell.temperature - dt * STARVE_COOLING_RATE).max(AMBIENT_TEMPERATURE);
        }

        let intensity = cell.intensity;
        if intensity <= SPREAD_INTENSITY {
            return;
        }

        let x = (i % self.width) as i32;
        let y = (i / self.width) as i32;
        let heat = intensity * dt * HEAT_TRANSFER_RATE * HEAT_TRANSFER_SCALE;

        for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
            let Some(n) = self.index(nx, ny) else {
                continue;
            };
            let neighbor = &mut self.cells[n];
            if neighbor.fuel > SPREAD_MIN_FUEL
                && neighbor.oxygen > SPREAD_MIN_OXYGEN
                && neighbor.intensity < SPREAD_MAX_INTENSITY
            {
                neighbor.temperature += heat;
                if neighbor.temperature > IGNITION_TEMPERATURE {
                    neighbor.intensity = ((neighbor.temperature - IGNITION_TEMPERATURE) / 30.0)
                        .min(SPREAD_IGNITION_CAP);
                }
            }
        }
    }
}
