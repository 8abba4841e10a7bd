//! Ball physics: integration, wall/paddle collisions, edge handling

use rand::Rng;

use super::state::{GameState, Player, PlayerSlot};
use super::{EdgeMode, CANVAS_HEIGHT, CANVAS_WIDTH, PADDLE_HEIGHT, PADDLE_WIDTH};

/// Source of the ±1 vertical nudge applied on every bounce
pub trait BounceRng: Send {
    /// Returns either -1.0 or 1.0
    fn nudge(&mut self) -> f64;
}

impl<R: Rng + Send> BounceRng for R {
    fn nudge(&mut self) -> f64 {
        if self.gen_bool(0.5) {
            1.0
        } else {
            -1.0
        }
    }
}

/// What a single step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Match not started; nothing moved
    Idle,
    /// Ball advanced without a point being scored
    Moved,
    /// Ball left the field and this player was credited
    Scored(PlayerSlot),
}

/// Stateless physics for the pong field
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance the match by one tick.
    ///
    /// Rules are evaluated in a fixed order: integrate, walls, left paddle,
    /// right paddle, then the edge policy. A paddle bounce and a score can
    /// both fire in the same tick; the reset from scoring wins.
    pub fn step(
        state: &mut GameState,
        rng: &mut dyn BounceRng,
        edge_mode: EdgeMode,
    ) -> StepOutcome {
        if !state.started {
            return StepOutcome::Idle;
        }

        let ball = &mut state.ball;
        ball.x += ball.speed_x;
        ball.y += ball.speed_y;

        if ball.y <= 0.0 || ball.y >= f64::from(CANVAS_HEIGHT) {
            ball.speed_y = -ball.speed_y + rng.nudge();
        }

        if ball.x <= PADDLE_WIDTH && Self::within_paddle(&state.player1, ball.y) {
            ball.speed_x = -ball.speed_x;
            ball.speed_y += rng.nudge();
        }

        if ball.x >= CANVAS_WIDTH - PADDLE_WIDTH && Self::within_paddle(&state.player2, ball.y) {
            ball.speed_x = -ball.speed_x;
            ball.speed_y += rng.nudge();
        }

        match edge_mode {
            EdgeMode::Score => {
                if ball.x <= 0.0 {
                    state.award_point(PlayerSlot::Player2);
                    return StepOutcome::Scored(PlayerSlot::Player2);
                }
                if ball.x >= CANVAS_WIDTH {
                    state.award_point(PlayerSlot::Player1);
                    return StepOutcome::Scored(PlayerSlot::Player1);
                }
            }
            EdgeMode::Rebound => {
                if ball.x <= 0.0 {
                    ball.x = 0.0;
                    ball.speed_x = -ball.speed_x;
                }
                if ball.x >= CANVAS_WIDTH {
                    ball.x = CANVAS_WIDTH;
                    ball.speed_x = -ball.speed_x;
                }
            }
        }

        StepOutcome::Moved
    }

    /// Closed-interval test of the ball's y against a paddle's span
    pub fn within_paddle(paddle: &Player, ball_y: f64) -> bool {
        let top = f64::from(paddle.y);
        let bottom = f64::from(paddle.y + PADDLE_HEIGHT);
        ball_y >= top && ball_y <= bottom
    }
}
