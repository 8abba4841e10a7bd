//! Game simulation modules

pub mod input;
pub mod r#match;
pub mod physics;
pub mod snapshot;
pub mod state;

pub use r#match::PongMatch;
pub use state::Direction;

use std::str::FromStr;

/// Playfield width
pub const CANVAS_WIDTH: f64 = 800.0;
/// Playfield height
pub const CANVAS_HEIGHT: i32 = 400;
/// Paddle thickness; only gates the x threshold of a paddle hit
pub const PADDLE_WIDTH: f64 = 10.0;
/// Paddle length
pub const PADDLE_HEIGHT: i32 = 100;
/// Units a paddle moves per command
pub const PADDLE_STEP: i32 = 10;
/// Ball speed magnitude on both axes after a reset
pub const BALL_SPEED: f64 = 4.0;

/// Highest y a paddle's top edge can reach
pub const PADDLE_MAX_Y: i32 = CANVAS_HEIGHT - PADDLE_HEIGHT;

/// What happens when the ball crosses a left/right edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeMode {
    /// The opposing player scores and the ball is re-served from the center
    #[default]
    Score,
    /// The ball is clamped to the edge and bounces back
    Rebound,
}

impl FromStr for EdgeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score" => Ok(Self::Score),
            "rebound" => Ok(Self::Rebound),
            other => Err(format!("unknown edge mode: {other}")),
        }
    }
}
