use maze_shared::direction::Direction;
use maze_shared::protocol::PlayerWire;

/// A connected player's avatar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub facing: Direction,
    /// Running score. Shots cost points, so this may go negative.
    pub score: i32,
    pub name: String,
}

impl Player {
    pub fn to_wire(&self) -> PlayerWire {
        PlayerWire {
            x: self.x,
            y: self.y,
            direction: self.facing,
            score: self.score,
            name: self.name.clone(),
        }
    }

    pub fn is_at(&self, x: i32, y: i32) -> bool {
        self.x == x && self.y == y
    }
}

/// Name shown for players who did not send a usable one.
pub fn default_name(id: u32) -> String {
    format!("Player{id}")
}

/// Clean up a client-supplied display name.
///
/// Returns `None` when nothing usable is left, or when the payload looks like a
/// protocol message sent in place of the name.
pub fn sanitize_name(raw: &str, max_chars: usize) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return None;
    }
    let name: String = trimmed
        .chars()
        .filter(|c| !c.is_control())
        .take(max_chars)
        .collect();
    let name = name.trim_end().to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_is_kept() {
        assert_eq!(sanitize_name("  Alice \n", 24), Some("Alice".to_string()));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert_eq!(sanitize_name("", 24), None);
        assert_eq!(sanitize_name("   \r\n", 24), None);
    }

    #[test]
    fn structured_payload_is_rejected() {
        assert_eq!(sanitize_name(r#"{"type":"move","direction":"up"}"#, 24), None);
        assert_eq!(sanitize_name("[1,2]", 24), None);
    }

    #[test]
    fn long_name_is_truncated() {
        let name = sanitize_name(&"x".repeat(100), 24).unwrap();
        assert_eq!(name.chars().count(), 24);
    }

    #[test]
    fn control_characters_are_stripped() {
        assert_eq!(sanitize_name("Bo\u{7}b", 24), Some("Bob".to_string()));
    }

    #[test]
    fn default_name_uses_id() {
        assert_eq!(default_name(12), "Player12");
    }
}
