use std::collections::BTreeMap;

use maze_shared::config::GameRules;
use maze_shared::direction::Direction;
use maze_shared::protocol::{InitMsg, PlayerWire, UpdateMsg};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::ServerConfig;
use crate::maze::Maze;
use crate::player::{default_name, sanitize_name, Player};
use crate::projectile::Projectile;
use crate::status::StatusLog;

/// Random draws tried before falling back to a full scan for a free cell.
const SPAWN_SAMPLE_ATTEMPTS: usize = 256;

/// Result of applying one client action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Player stepped into the target cell (and faces it)
    Moved,
    /// Move was blocked; only the facing changed
    Turned,
    Fired,
    /// Shot refused by the fire-rate gate
    OnCooldown,
    UnknownPlayer,
}

impl ActionOutcome {
    /// Whether the action changed state that clients should see.
    pub fn is_accepted(self) -> bool {
        matches!(
            self,
            ActionOutcome::Moved | ActionOutcome::Turned | ActionOutcome::Fired
        )
    }
}

/// A projectile striking a player during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub shooter: u32,
    pub victim: u32,
}

/// Central game state owned by the game loop task.
pub struct GameState {
    maze: Maze,
    /// Keyed by id; iteration order is the hit tie-break order
    pub players: BTreeMap<u32, Player>,
    /// In firing order
    pub projectiles: Vec<Projectile>,
    pub status: StatusLog,
    pub rules: GameRules,
    rng: ChaCha8Rng,
    next_player_id: u32,
    max_players: usize,
}

impl GameState {
    pub fn new(config: &ServerConfig) -> Self {
        let seed = config.rng_seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let maze = Maze::generate(config.maze_width, config.maze_height, rng.gen());
        tracing::info!(
            "Generated {}x{} maze (seed {})",
            maze.width(),
            maze.height(),
            seed
        );
        Self::with_maze(maze, config.rules, config.max_players, rng)
    }

    pub fn with_maze(maze: Maze, rules: GameRules, max_players: usize, rng: ChaCha8Rng) -> Self {
        Self {
            maze,
            players: BTreeMap::new(),
            projectiles: Vec::new(),
            status: StatusLog::new(),
            rules,
            rng,
            next_player_id: 1,
            max_players,
        }
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    /// Add a player at a random free cell. `raw_name` is sanitized; an unusable
    /// name falls back to `Player<id>`.
    ///
    /// Returns `None` when the server is full or no free cell is left.
    pub fn admit_player(&mut self, raw_name: &str) -> Option<u32> {
        if self.players.len() >= self.max_players {
            return None;
        }
        let (x, y) = self.random_free_cell()?;
        let facing = self.clear_facing(x, y);

        let id = self.next_player_id;
        self.next_player_id += 1;
        let name = sanitize_name(raw_name, self.rules.max_name_chars)
            .unwrap_or_else(|| default_name(id));

        self.status.push(format!("{name} joined!"));
        self.players.insert(
            id,
            Player {
                id,
                x,
                y,
                facing,
                score: 0,
                name,
            },
        );
        Some(id)
    }

    /// Remove a player. Their projectiles stay in flight.
    pub fn remove_player(&mut self, id: u32) -> Option<Player> {
        let player = self.players.remove(&id)?;
        self.status.push(format!("{} left", player.name));
        Some(player)
    }

    /// Turn towards `direction` and step into that cell if it is open and free.
    pub fn apply_move(&mut self, id: u32, direction: Direction) -> ActionOutcome {
        let Some(player) = self.players.get(&id) else {
            return ActionOutcome::UnknownPlayer;
        };
        let (tx, ty) = direction.step(player.x, player.y);
        let can_enter = self.is_free(tx, ty);

        let Some(player) = self.players.get_mut(&id) else {
            return ActionOutcome::UnknownPlayer;
        };
        player.facing = direction;
        if can_enter {
            player.x = tx;
            player.y = ty;
            ActionOutcome::Moved
        } else {
            ActionOutcome::Turned
        }
    }

    /// Fire along the player's facing, unless one of their projectiles is still
    /// inside the fire-rate distance.
    pub fn apply_shoot(&mut self, id: u32) -> ActionOutcome {
        if !self.players.contains_key(&id) {
            return ActionOutcome::UnknownPlayer;
        }
        let gate = self.rules.fire_rate_distance;
        if self
            .projectiles
            .iter()
            .any(|p| p.owner == id && p.distance < gate)
        {
            return ActionOutcome::OnCooldown;
        }
        let Some(player) = self.players.get_mut(&id) else {
            return ActionOutcome::UnknownPlayer;
        };
        player.score -= self.rules.shot_cost;
        self.projectiles
            .push(Projectile::fired_by(id, player.x, player.y, player.facing));
        ActionOutcome::Fired
    }

    /// Advance every projectile one cell and resolve what it runs into.
    pub fn tick(&mut self) -> Vec<Hit> {
        let mut hits = Vec::new();
        let in_flight = std::mem::take(&mut self.projectiles);

        for mut projectile in in_flight {
            projectile.advance();
            if !self.maze.is_open(projectile.x, projectile.y) {
                continue;
            }

            let victim = self
                .players
                .values()
                .find(|p| p.id != projectile.owner && p.is_at(projectile.x, projectile.y))
                .map(|p| p.id);

            match victim {
                Some(victim) => hits.push(self.resolve_hit(projectile.owner, victim)),
                None => self.projectiles.push(projectile),
            }
        }

        hits
    }

    /// Full snapshot for a newly joined client.
    pub fn init_snapshot(&self, id: u32) -> InitMsg {
        InitMsg {
            id,
            maze: self.maze.to_rows(),
            players: self.players_wire(),
            bullets: self.projectiles.iter().map(Projectile::to_wire).collect(),
        }
    }

    /// Snapshot broadcast after every tick and accepted action.
    pub fn update_snapshot(&self) -> UpdateMsg {
        UpdateMsg {
            players: self.players_wire(),
            bullets: self.projectiles.iter().map(Projectile::to_wire).collect(),
            status: self.status.tail(self.rules.status_tail).to_vec(),
        }
    }

    fn players_wire(&self) -> BTreeMap<u32, PlayerWire> {
        self.players
            .iter()
            .map(|(&id, player)| (id, player.to_wire()))
            .collect()
    }

    fn resolve_hit(&mut self, shooter: u32, victim: u32) -> Hit {
        // The shooter may have disconnected while the projectile was in flight
        let shooter_name = match self.players.get_mut(&shooter) {
            Some(player) => {
                player.score += self.rules.hit_reward;
                player.name.clone()
            }
            None => default_name(shooter),
        };

        let respawn = self.random_free_cell();
        if let Some(player) = self.players.get(&victim) {
            let (x, y) = respawn.unwrap_or((player.x, player.y));
            if respawn.is_none() {
                tracing::warn!("No free cell to respawn player {}", victim);
            }
            let facing = self.clear_facing(x, y);
            if let Some(player) = self.players.get_mut(&victim) {
                player.score -= self.rules.hit_penalty;
                player.x = x;
                player.y = y;
                player.facing = facing;
                self.status
                    .push(format!("{} just vaporized {}", shooter_name, player.name));
            }
        }

        Hit { shooter, victim }
    }

    fn is_occupied(&self, x: i32, y: i32) -> bool {
        self.players.values().any(|p| p.is_at(x, y))
    }

    fn is_free(&self, x: i32, y: i32) -> bool {
        self.maze.is_open(x, y) && !self.is_occupied(x, y)
    }

    /// Uniformly random open, unoccupied cell inside the outer wall ring.
    fn random_free_cell(&mut self) -> Option<(i32, i32)> {
        let width = self.maze.width() as i32;
        let height = self.maze.height() as i32;

        for _ in 0..SPAWN_SAMPLE_ATTEMPTS {
            let x = self.rng.gen_range(1..width - 1);
            let y = self.rng.gen_range(1..height - 1);
            if self.is_free(x, y) {
                return Some((x, y));
            }
        }

        // Crowded maze: pick from the exact set instead of sampling forever
        let free: Vec<(i32, i32)> = self
            .maze
            .open_cells()
            .filter(|&(x, y)| self.maze.is_interior(x, y) && !self.is_occupied(x, y))
            .collect();
        free.choose(&mut self.rng).copied()
    }

    /// Random facing whose next cell is open, so nobody spawns staring at a wall.
    fn clear_facing(&mut self, x: i32, y: i32) -> Direction {
        let open: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|dir| {
                let (nx, ny) = dir.step(x, y);
                self.maze.is_open(nx, ny)
            })
            .collect();
        match open.choose(&mut self.rng) {
            Some(&dir) => dir,
            None => Direction::random(&mut self.rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(12345)
    }

    fn corridor_state() -> GameState {
        let maze = Maze::from_rows(&[
            "##############",
            "#............#",
            "#.##########.#",
            "#............#",
            "##############",
        ]);
        GameState::with_maze(maze, GameRules::default(), 16, rng())
    }

    fn place(state: &mut GameState, id: u32, x: i32, y: i32, facing: Direction) {
        let player = state.players.get_mut(&id).unwrap();
        player.x = x;
        player.y = y;
        player.facing = facing;
    }

    fn assert_legal_spawn(state: &GameState, id: u32) {
        let player = &state.players[&id];
        assert!(state.maze().is_open(player.x, player.y));
        assert_eq!(
            state
                .players
                .values()
                .filter(|p| p.is_at(player.x, player.y))
                .count(),
            1,
            "player {id} shares a cell"
        );
        let (ax, ay) = player.facing.step(player.x, player.y);
        assert!(state.maze().is_open(ax, ay), "player {id} faces a wall");
    }

    #[test]
    fn admitted_players_get_increasing_ids_and_legal_cells() {
        let config = ServerConfig {
            rng_seed: Some(7),
            ..Default::default()
        };
        let mut state = GameState::new(&config);
        let mut last = 0;
        for i in 0..30 {
            let id = state.admit_player(&format!("p{i}")).unwrap();
            assert!(id > last);
            last = id;
            assert_legal_spawn(&state, id);
            assert_eq!(state.players[&id].score, 0);
        }
    }

    #[test]
    fn ids_are_not_reused_after_leave() {
        let mut state = corridor_state();
        let a = state.admit_player("A").unwrap();
        state.remove_player(a);
        let b = state.admit_player("B").unwrap();
        assert!(b > a);
    }

    #[test]
    fn unusable_names_get_default() {
        let mut state = corridor_state();
        let a = state.admit_player("   ").unwrap();
        let b = state.admit_player(r#"{"type":"shoot"}"#).unwrap();
        assert_eq!(state.players[&a].name, format!("Player{a}"));
        assert_eq!(state.players[&b].name, format!("Player{b}"));
    }

    #[test]
    fn join_and_leave_are_logged() {
        let mut state = corridor_state();
        let id = state.admit_player("Alice").unwrap();
        state.remove_player(id);
        assert_eq!(state.status.tail(2), &["Alice joined!", "Alice left"]);
    }

    #[test]
    fn full_maze_rejects_join() {
        let maze = Maze::from_rows(&["###", "#.#", "###"]);
        let mut state = GameState::with_maze(maze, GameRules::default(), 16, rng());
        assert!(state.admit_player("A").is_some());
        assert_eq!(state.admit_player("B"), None);
    }

    #[test]
    fn crowded_maze_still_finds_last_cell() {
        let maze = Maze::from_rows(&["#####", "#...#", "#####"]);
        let mut state = GameState::with_maze(maze, GameRules::default(), 16, rng());
        for _ in 0..3 {
            assert!(state.admit_player("p").is_some());
        }
        assert_eq!(state.admit_player("p"), None);
        assert_eq!(state.players.len(), 3);
    }

    #[test]
    fn max_players_caps_admission() {
        let maze = Maze::from_rows(&["#####", "#...#", "#####"]);
        let mut state = GameState::with_maze(maze, GameRules::default(), 1, rng());
        assert!(state.admit_player("A").is_some());
        assert_eq!(state.admit_player("B"), None);
    }

    #[test]
    fn move_into_open_cell() {
        let mut state = corridor_state();
        let a = state.admit_player("A").unwrap();
        place(&mut state, a, 1, 1, Direction::Up);
        assert_eq!(state.apply_move(a, Direction::Right), ActionOutcome::Moved);
        let player = &state.players[&a];
        assert_eq!((player.x, player.y, player.facing), (2, 1, Direction::Right));
    }

    #[test]
    fn move_into_wall_only_turns() {
        let mut state = corridor_state();
        let a = state.admit_player("A").unwrap();
        place(&mut state, a, 2, 1, Direction::Right);
        assert_eq!(state.apply_move(a, Direction::Down), ActionOutcome::Turned);
        let player = &state.players[&a];
        assert_eq!((player.x, player.y, player.facing), (2, 1, Direction::Down));
    }

    #[test]
    fn move_into_occupied_cell_only_turns() {
        let mut state = corridor_state();
        let a = state.admit_player("A").unwrap();
        let b = state.admit_player("B").unwrap();
        place(&mut state, a, 3, 1, Direction::Up);
        place(&mut state, b, 4, 1, Direction::Left);
        assert_eq!(state.apply_move(a, Direction::Right), ActionOutcome::Turned);
        let player = &state.players[&a];
        assert_eq!((player.x, player.y, player.facing), (3, 1, Direction::Right));
    }

    #[test]
    fn actions_for_unknown_player() {
        let mut state = corridor_state();
        assert_eq!(state.apply_move(99, Direction::Up), ActionOutcome::UnknownPlayer);
        assert_eq!(state.apply_shoot(99), ActionOutcome::UnknownPlayer);
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn shooting_costs_a_point_and_spawns_projectile() {
        let mut state = corridor_state();
        let a = state.admit_player("A").unwrap();
        place(&mut state, a, 1, 1, Direction::Right);
        assert_eq!(state.apply_shoot(a), ActionOutcome::Fired);
        assert_eq!(state.players[&a].score, -1);
        assert_eq!(
            state.projectiles,
            vec![Projectile::fired_by(a, 1, 1, Direction::Right)]
        );
    }

    #[test]
    fn fire_rate_gate_opens_after_four_cells() {
        let mut state = corridor_state();
        let a = state.admit_player("A").unwrap();
        place(&mut state, a, 1, 1, Direction::Right);

        assert_eq!(state.apply_shoot(a), ActionOutcome::Fired);
        assert_eq!(state.apply_shoot(a), ActionOutcome::OnCooldown);
        for _ in 0..3 {
            state.tick();
            assert_eq!(state.apply_shoot(a), ActionOutcome::OnCooldown);
        }
        state.tick();
        assert_eq!(state.projectiles[0].distance, 4);
        assert_eq!(state.apply_shoot(a), ActionOutcome::Fired);
        assert_eq!(state.players[&a].score, -2);
    }

    #[test]
    fn fire_rate_gate_opens_when_projectile_is_removed() {
        let mut state = corridor_state();
        let a = state.admit_player("A").unwrap();
        place(&mut state, a, 1, 1, Direction::Up);
        assert_eq!(state.apply_shoot(a), ActionOutcome::Fired);
        assert_eq!(state.apply_shoot(a), ActionOutcome::OnCooldown);
        state.tick();
        assert!(state.projectiles.is_empty());
        assert_eq!(state.apply_shoot(a), ActionOutcome::Fired);
    }

    #[test]
    fn projectile_leaving_the_grid_is_dropped() {
        let maze = Maze::from_rows(&["####", "#...", "####"]);
        let mut state = GameState::with_maze(maze, GameRules::default(), 16, rng());
        let a = state.admit_player("A").unwrap();
        place(&mut state, a, 2, 1, Direction::Right);
        state.apply_shoot(a);
        state.tick();
        assert_eq!((state.projectiles[0].x, state.projectiles[0].y), (3, 1));
        state.tick();
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn hit_scores_and_respawns_victim() {
        let mut state = corridor_state();
        let a = state.admit_player("A").unwrap();
        let b = state.admit_player("B").unwrap();
        place(&mut state, a, 1, 1, Direction::Right);
        place(&mut state, b, 3, 1, Direction::Down);
        state.players.get_mut(&a).unwrap().score = 20;
        state.players.get_mut(&b).unwrap().score = 20;

        state.apply_shoot(a);
        assert!(state.tick().is_empty());
        let hits = state.tick();

        assert_eq!(hits, vec![Hit { shooter: a, victim: b }]);
        assert_eq!(state.players[&a].score, 20 - 1 + 11);
        assert_eq!(state.players[&b].score, 20 - 5);
        assert!(state.projectiles.is_empty());
        assert_ne!((state.players[&b].x, state.players[&b].y), (3, 1));
        assert_legal_spawn(&state, b);
        assert_eq!(state.status.tail(1), &["A just vaporized B"]);
    }

    #[test]
    fn own_projectile_does_not_hit_owner() {
        let mut state = corridor_state();
        let a = state.admit_player("A").unwrap();
        place(&mut state, a, 1, 1, Direction::Right);
        state.apply_shoot(a);
        // Walk along behind the bullet
        state.tick();
        state.apply_move(a, Direction::Right);
        assert!(state.tick().is_empty());
        assert_eq!(state.players[&a].score, -1);
    }

    #[test]
    fn projectile_outlives_its_owner() {
        let mut state = corridor_state();
        let a = state.admit_player("A").unwrap();
        let b = state.admit_player("B").unwrap();
        place(&mut state, a, 1, 1, Direction::Right);
        place(&mut state, b, 2, 1, Direction::Up);

        state.apply_shoot(a);
        state.remove_player(a);
        assert_eq!(state.projectiles.len(), 1);

        let hits = state.tick();
        assert_eq!(hits, vec![Hit { shooter: a, victim: b }]);
        assert_eq!(state.players[&b].score, -5);
        assert_eq!(
            state.status.tail(1),
            &[format!("Player{a} just vaporized B")]
        );
    }

    #[test]
    fn stacked_players_lowest_id_is_hit() {
        let mut state = corridor_state();
        let a = state.admit_player("A").unwrap();
        let b = state.admit_player("B").unwrap();
        let c = state.admit_player("C").unwrap();
        place(&mut state, a, 1, 1, Direction::Right);
        place(&mut state, b, 2, 1, Direction::Up);
        place(&mut state, c, 2, 1, Direction::Up);

        state.apply_shoot(a);
        let hits = state.tick();
        assert_eq!(hits, vec![Hit { shooter: a, victim: b }]);
        assert_eq!(state.players[&c].score, 0);
    }

    #[test]
    fn blocked_approach_then_shot() {
        let mut state = corridor_state();
        let a = state.admit_player("A").unwrap();
        let b = state.admit_player("B").unwrap();
        place(&mut state, a, 1, 1, Direction::Up);
        place(&mut state, b, 4, 1, Direction::Up);

        let mut outcomes = Vec::new();
        for _ in 0..4 {
            outcomes.push(state.apply_move(a, Direction::Right));
        }
        assert_eq!(
            outcomes,
            vec![
                ActionOutcome::Moved,
                ActionOutcome::Moved,
                ActionOutcome::Turned,
                ActionOutcome::Turned
            ]
        );
        assert_eq!((state.players[&a].x, state.players[&a].y), (3, 1));

        assert_eq!(state.apply_shoot(a), ActionOutcome::Fired);
        let mut hits = Vec::new();
        for _ in 0..4 {
            hits.extend(state.tick());
            if !hits.is_empty() {
                break;
            }
        }
        assert_eq!(hits, vec![Hit { shooter: a, victim: b }]);
        assert_eq!(state.players[&a].score, 10);
        assert_eq!(state.players[&b].score, -5);
        assert!(state
            .update_snapshot()
            .status
            .contains(&"A just vaporized B".to_string()));
    }

    #[test]
    fn update_snapshot_sends_status_tail_only() {
        let mut state = corridor_state();
        for i in 0..8 {
            state.status.push(format!("event {i}"));
        }
        let update = state.update_snapshot();
        assert_eq!(update.status.len(), 5);
        assert_eq!(update.status[4], "event 7");
        assert_eq!(state.status.tail(usize::MAX).len(), 8);
    }

    #[test]
    fn init_snapshot_carries_maze_and_everyone() {
        let mut state = corridor_state();
        let a = state.admit_player("A").unwrap();
        let b = state.admit_player("B").unwrap();
        let init = state.init_snapshot(b);
        assert_eq!(init.id, b);
        assert_eq!(init.maze, state.maze().to_rows());
        assert!(init.players.contains_key(&a) && init.players.contains_key(&b));
        assert!(init.bullets.is_empty());
    }
}
