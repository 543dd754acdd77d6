//! Procedural building layout

use rand::Rng;
use serde::Serialize;

/// Level width in tiles
pub const LEVEL_WIDTH: usize = 40;
/// Level height in tiles
pub const LEVEL_HEIGHT: usize = 30;
/// World units per tile
pub const TILE_SIZE: f32 = 20.0;

const WALL_CHANCE: f64 = 0.1;
const HYDRANT_ATTEMPTS: usize = 3;

/// Tile kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TileType {
    Wall,
    Floor,
    Hydrant,
}

/// A single level tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tile {
    #[serde(rename = "type")]
    pub kind: TileType,
    pub passable: bool,
}

impl Tile {
    const WALL: Tile = Tile {
        kind: TileType::Wall,
        passable: false,
    };
    const FLOOR: Tile = Tile {
        kind: TileType::Floor,
        passable: true,
    };
    const HYDRANT: Tile = Tile {
        kind: TileType::Hydrant,
        passable: true,
    };
}

/// Immutable tile grid generated once per session
#[derive(Debug, Clone, Serialize)]
pub struct Level {
    width: usize,
    height: usize,
    tiles: Vec<Vec<Tile>>,
}

impl Level {
    /// Generate a walled building with scattered interior walls and hydrants
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::generate_sized(rng, LEVEL_WIDTH, LEVEL_HEIGHT)
    }

    pub fn generate_sized<R: Rng + ?Sized>(rng: &mut R, width: usize, height: usize) -> Self {
        let mut tiles = vec![vec![Tile::FLOOR; width]; height];

        for (y, row) in tiles.iter_mut().enumerate() {
            for (x, tile) in row.iter_mut().enumerate() {
                let border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                if border || rng.gen_bool(WALL_CHANCE) {
                    *tile = Tile::WALL;
                }
            }
        }

        if width > 2 && height > 2 {
            for _ in 0..HYDRANT_ATTEMPTS {
                let x = rng.gen_range(1..width - 1);
                let y = rng.gen_range(1..height - 1);
                if tiles[y][x].kind == TileType::Floor {
                    tiles[y][x] = Tile::HYDRANT;
                }
            }
        }

        Self {
            width,
            height,
            tiles,
        }
    }

    /// Build a level from explicit rows
    #[cfg(test)]
    pub fn from_rows(tiles: Vec<Vec<Tile>>) -> Self {
        let height = tiles.len();
        let width = tiles.first().map(Vec::len).unwrap_or(0);
        Self {
            width,
            height,
            tiles,
        }
    }

    /// All-floor level, handy for deterministic tests
    #[cfg(test)]
    pub fn open(width: usize, height: usize) -> Self {
        Self::from_rows(vec![vec![Tile::FLOOR; width]; height])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<Tile> {
        if x < 0 || y < 0 {
            return None;
        }
        self.tiles
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .copied()
    }

    /// False outside the level
    pub fn is_passable(&self, x: i32, y: i32) -> bool {
        self.tile(x, y).map(|t| t.passable).unwrap_or(false)
    }

    /// Coordinates of every passable tile, row-major
    pub fn passable_tiles(&self) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        for (y, row) in self.tiles.iter().enumerate() {
            for (x, tile) in row.iter().enumerate() {
                if tile.passable {
                    out.push((x as i32, y as i32));
                }
            }
        }
        out
    }
}

/// Grid cell containing a world coordinate
pub fn world_to_cell(x: f32, y: f32) -> (i32, i32) {
    ((x / TILE_SIZE).floor() as i32, (y / TILE_SIZE).floor() as i32)
}

/// World coordinate of a tile's centre
pub fn cell_center(x: i32, y: i32) -> (f32, f32) {
    (
        x as f32 * TILE_SIZE + TILE_SIZE / 2.0,
        y as f32 * TILE_SIZE + TILE_SIZE / 2.0,
    )
}
