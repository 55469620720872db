//! Procedural maze generation.
//!
//! Mazes are carved by a randomized depth-first backtracker over the
//! odd-coordinate lattice: path cells sit at odd `(x, y)`, and the even
//! coordinates between them hold either a wall or the passage joining two
//! lattice cells. The result is a spanning tree, which is then loosened by
//! punching a few extra holes (loops) and opening the outer wall in a few
//! places.

use maze_shared::direction::Direction;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Smallest width or height the generator accepts.
pub const MIN_DIMENSION: usize = 3;

/// Largest width or height the generator accepts, after rounding up to odd.
pub const MAX_DIMENSION: usize = 1001;

/// Number of border openings attempted after carving.
const PERIMETER_BREACHES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Wall,
    Open,
}

/// Immutable grid of cells, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maze {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Maze {
    /// Generate a maze from a seed. Even dimensions are bumped to the next odd
    /// number.
    pub fn generate(width: usize, height: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let width = odd(width);
        let height = odd(height);
        assert!(
            (MIN_DIMENSION..=MAX_DIMENSION).contains(&width)
                && (MIN_DIMENSION..=MAX_DIMENSION).contains(&height),
            "maze must be between {MIN_DIMENSION} and {MAX_DIMENSION} cells per side, got {width}x{height}"
        );

        let mut maze = Self {
            width,
            height,
            cells: vec![Cell::Wall; width * height],
        };
        maze.carve(&mut rng);
        maze.inject_loops(&mut rng);
        maze.breach_perimeter(&mut rng);
        maze
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell at `(x, y)`, or `None` outside the grid.
    pub fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        self.index(x, y).map(|i| self.cells[i])
    }

    pub fn is_open(&self, x: i32, y: i32) -> bool {
        self.cell(x, y) == Some(Cell::Open)
    }

    /// Whether `(x, y)` lies strictly inside the outer wall ring.
    pub fn is_interior(&self, x: i32, y: i32) -> bool {
        x > 0 && y > 0 && (x as usize) < self.width - 1 && (y as usize) < self.height - 1
    }

    /// All open cells, row by row.
    pub fn open_cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell == Cell::Open)
            .map(|(i, _)| ((i % self.width) as i32, (i / self.width) as i32))
    }

    /// Wire encoding: one row per `y`, `0` for open and `1` for wall.
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.cells
            .chunks(self.width)
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Cell::Open => 0,
                        Cell::Wall => 1,
                    })
                    .collect()
            })
            .collect()
    }

    /// Build a maze from text rows, `#` for wall and anything else open.
    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        let cells = rows
            .iter()
            .flat_map(|row| {
                assert_eq!(row.len(), width, "ragged maze rows");
                row.chars()
                    .map(|c| if c == '#' { Cell::Wall } else { Cell::Open })
            })
            .collect();
        Self {
            width,
            height,
            cells,
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    fn open(&mut self, x: i32, y: i32) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = Cell::Open;
        }
    }

    fn random_odd_x(&self, rng: &mut impl Rng) -> i32 {
        random_odd(self.width, rng)
    }

    fn random_odd_y(&self, rng: &mut impl Rng) -> i32 {
        random_odd(self.height, rng)
    }

    fn carve(&mut self, rng: &mut impl Rng) {
        let start = (self.random_odd_x(rng), self.random_odd_y(rng));
        let mut visited = vec![false; self.cells.len()];
        let mut directions = Direction::ALL;

        self.open(start.0, start.1);
        if let Some(i) = self.index(start.0, start.1) {
            visited[i] = true;
        }
        let mut stack = vec![start];

        while let Some(&(x, y)) = stack.last() {
            directions.shuffle(rng);

            let next = directions.iter().find_map(|dir| {
                let (dx, dy) = dir.delta();
                let (nx, ny) = (x + 2 * dx, y + 2 * dy);
                if !self.is_interior(nx, ny) {
                    return None;
                }
                let i = self.index(nx, ny)?;
                (!visited[i]).then_some((nx, ny, i, dx, dy))
            });

            match next {
                Some((nx, ny, i, dx, dy)) => {
                    self.open(x + dx, y + dy);
                    self.open(nx, ny);
                    visited[i] = true;
                    stack.push((nx, ny));
                }
                None => {
                    stack.pop();
                }
            }
        }
    }

    /// Open roughly one wall in twenty next to a lattice cell, creating cycles.
    fn inject_loops(&mut self, rng: &mut impl Rng) {
        let attempts = self.width * self.height / 20;
        for _ in 0..attempts {
            let (x, y) = (self.random_odd_x(rng), self.random_odd_y(rng));
            let (nx, ny) = Direction::random(rng).step(x, y);
            if self.is_interior(nx, ny) && self.cell(nx, ny) == Some(Cell::Wall) {
                self.open(nx, ny);
            }
        }
    }

    /// Open one border cell on each of a few randomly drawn sides. Openings sit
    /// at odd offsets so they always touch a carved lattice cell.
    fn breach_perimeter(&mut self, rng: &mut impl Rng) {
        let right = self.width as i32 - 1;
        let bottom = self.height as i32 - 1;
        for _ in 0..PERIMETER_BREACHES {
            let (x, y) = match Direction::random(rng) {
                Direction::Up => (self.random_odd_x(rng), 0),
                Direction::Right => (right, self.random_odd_y(rng)),
                Direction::Down => (self.random_odd_x(rng), bottom),
                Direction::Left => (0, self.random_odd_y(rng)),
            };
            self.open(x, y);
        }
    }
}

fn odd(n: usize) -> usize {
    if n % 2 == 0 {
        n + 1
    } else {
        n
    }
}

/// Uniform odd coordinate in `1..=len-2` for an odd `len`.
fn random_odd(len: usize, rng: &mut impl Rng) -> i32 {
    (rng.gen_range(0..(len - 1) / 2) * 2 + 1) as i32
}
