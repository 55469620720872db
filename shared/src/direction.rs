use rand::Rng;
use serde::{Deserialize, Serialize};

/// Cardinal direction, used both for player facing and projectile travel.
///
/// On the wire this is one of `"up"`, `"down"`, `"left"`, `"right"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Grid offset of one step in this direction. `y` grows downwards.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// The cell one step away from `(x, y)`.
    pub fn step(self, x: i32, y: i32) -> (i32, i32) {
        let (dx, dy) = self.delta();
        (x + dx, y + dy)
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_moves_one_cell() {
        assert_eq!(Direction::Up.step(3, 3), (3, 2));
        assert_eq!(Direction::Down.step(3, 3), (3, 4));
        assert_eq!(Direction::Left.step(3, 3), (2, 3));
        assert_eq!(Direction::Right.step(3, 3), (4, 3));
    }

    #[test]
    fn serializes_as_lowercase_string() {
        assert_eq!(serde_json::to_string(&Direction::Left).unwrap(), "\"left\"");
        let parsed: Direction = serde_json::from_str("\"down\"").unwrap();
        assert_eq!(parsed, Direction::Down);
        assert!(serde_json::from_str::<Direction>("\"north\"").is_err());
    }
}
