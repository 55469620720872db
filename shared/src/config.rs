/// Scoring and pacing rules of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRules {
    /// Cells a player's projectile must travel before that player may fire again
    pub fire_rate_distance: u32,
    /// Points gained by the owner of a projectile that hits another player
    pub hit_reward: i32,
    /// Points lost by the player who was hit
    pub hit_penalty: i32,
    /// Points charged for every accepted shot
    pub shot_cost: i32,
    /// Number of most recent status entries sent with each update
    pub status_tail: usize,
    pub max_name_chars: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            fire_rate_distance: 4,
            hit_reward: 11,
            hit_penalty: 5,
            shot_cost: 1,
            status_tail: 5,
            max_name_chars: 24,
        }
    }
}

impl GameRules {
    pub fn validate(&self) -> Result<(), String> {
        if self.fire_rate_distance == 0 {
            return Err("fire_rate_distance must be >= 1".to_string());
        }
        if self.hit_reward < 0 || self.hit_penalty < 0 || self.shot_cost < 0 {
            return Err("hit_reward, hit_penalty and shot_cost must be >= 0".to_string());
        }
        if self.status_tail == 0 {
            return Err("status_tail must be >= 1".to_string());
        }
        if self.max_name_chars == 0 {
            return Err("max_name_chars must be >= 1".to_string());
        }
        Ok(())
    }
}
