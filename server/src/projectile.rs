use maze_shared::direction::Direction;
use maze_shared::protocol::BulletWire;

/// A bullet in flight. Moves one cell per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projectile {
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub owner: u32,
    /// Cells traveled since it was fired
    pub distance: u32,
}

impl Projectile {
    pub fn fired_by(owner: u32, x: i32, y: i32, direction: Direction) -> Self {
        Self {
            x,
            y,
            direction,
            owner,
            distance: 0,
        }
    }

    pub fn advance(&mut self) {
        (self.x, self.y) = self.direction.step(self.x, self.y);
        self.distance += 1;
    }

    pub fn to_wire(&self) -> BulletWire {
        BulletWire {
            x: self.x,
            y: self.y,
            direction: self.direction,
            owner: self.owner,
            distance: self.distance,
        }
    }
}
