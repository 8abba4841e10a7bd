//! Authoritative game state store

use std::fmt;

use super::{BALL_SPEED, CANVAS_HEIGHT, CANVAS_WIDTH, PADDLE_MAX_Y, PADDLE_STEP};

/// Which side a player controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerSlot {
    /// Left paddle
    Player1,
    /// Right paddle
    Player2,
}

impl PlayerSlot {
    /// Map a wire name to a slot; anything else is not a player
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "player1" => Some(Self::Player1),
            "player2" => Some(Self::Player2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player1 => "player1",
            Self::Player2 => "player2",
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paddle movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn delta(self) -> i32 {
        match self {
            Self::Up => -PADDLE_STEP,
            Self::Down => PADDLE_STEP,
        }
    }
}

/// One player's paddle, score and readiness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Top edge of the paddle, always within `0..=PADDLE_MAX_Y`
    pub y: i32,
    pub score: u32,
    /// Set by the first valid command; never cleared
    pub ready: bool,
}

impl Player {
    fn new() -> Self {
        Self {
            y: CANVAS_HEIGHT / 2,
            score: 0,
            ready: false,
        }
    }
}

/// The ball, treated as a point
#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    pub x: f64,
    pub y: f64,
    pub speed_x: f64,
    pub speed_y: f64,
}

impl Ball {
    /// Centered ball with the default serve velocity
    pub fn serve() -> Self {
        Self {
            x: CANVAS_WIDTH / 2.0,
            y: f64::from(CANVAS_HEIGHT) / 2.0,
            speed_x: BALL_SPEED,
            speed_y: BALL_SPEED,
        }
    }
}

/// Result of applying a paddle command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Paddle y after the move
    pub y: i32,
    /// This command flipped the player's readiness
    pub became_ready: bool,
    /// This command completed the WAITING -> RUNNING transition
    pub match_started: bool,
}

/// The shared match record
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub player1: Player,
    pub player2: Player,
    pub ball: Ball,
    /// False until both players are ready; never reverts
    pub started: bool,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            player1: Player::new(),
            player2: Player::new(),
            ball: Ball::serve(),
            started: false,
        }
    }

    pub fn player_mut(&mut self, slot: PlayerSlot) -> &mut Player {
        match slot {
            PlayerSlot::Player1 => &mut self.player1,
            PlayerSlot::Player2 => &mut self.player2,
        }
    }

    pub fn both_ready(&self) -> bool {
        self.player1.ready && self.player2.ready
    }

    /// Move a paddle one step, mark its owner ready, and start the match
    /// if this made both players ready.
    pub fn apply_move(&mut self, slot: PlayerSlot, direction: Direction) -> MoveOutcome {
        let player = self.player_mut(slot);
        player.y = (player.y + direction.delta()).clamp(0, PADDLE_MAX_Y);

        let became_ready = !player.ready;
        player.ready = true;
        let y = player.y;

        MoveOutcome {
            y,
            became_ready,
            match_started: self.try_start(),
        }
    }

    /// WAITING -> RUNNING; returns true only on the transition itself
    pub fn try_start(&mut self) -> bool {
        if self.started || !self.both_ready() {
            return false;
        }
        self.started = true;
        true
    }

    /// Credit a point and re-serve from the center
    pub fn award_point(&mut self, slot: PlayerSlot) {
        self.player_mut(slot).score += 1;
        self.ball = Ball::serve();
    }

    pub fn scores(&self) -> (u32, u32) {
        (self.player1.score, self.player2.score)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
