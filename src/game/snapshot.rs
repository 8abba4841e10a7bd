//! Snapshot building for network transmission

use std::sync::Arc;

use crate::ws::protocol::{BallSnapshot, PlayerSnapshot, StateSnapshot};

use super::state::{GameState, Player};

/// Builds wire snapshots from the authoritative state
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// Copy the state into its wire shape
    pub fn build(state: &GameState) -> StateSnapshot {
        StateSnapshot {
            player1: Self::player(&state.player1),
            player2: Self::player(&state.player2),
            ball: BallSnapshot {
                x: state.ball.x,
                y: state.ball.y,
                speed_x: state.ball.speed_x,
                speed_y: state.ball.speed_y,
            },
        }
    }

    /// Serialize once so a broadcast can share the same text with every peer
    pub fn encode(state: &GameState) -> Result<Arc<str>, serde_json::Error> {
        serde_json::to_string(&Self::build(state)).map(Arc::from)
    }

    fn player(player: &Player) -> PlayerSnapshot {
        PlayerSnapshot {
            y: player.y,
            score: player.score,
            ready: player.ready,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_initial_state() {
        let encoded = SnapshotBuilder::encode(&GameState::new()).unwrap();
        let decoded: StateSnapshot = serde_json::from_str(&encoded).unwrap();

        assert_eq!(
            decoded.player1,
            PlayerSnapshot {
                y: 200,
                score: 0,
                ready: false,
            }
        );
        assert_eq!(
            decoded.player2,
            PlayerSnapshot {
                y: 200,
                score: 0,
                ready: false,
            }
        );
        assert_eq!(
            decoded.ball,
            BallSnapshot {
                x: 400.0,
                y: 200.0,
                speed_x: 4.0,
                speed_y: 4.0,
            }
        );
    }

    #[test]
    fn test_build_reflects_mutations() {
        let mut state = GameState::new();
        state.player2.y = 40;
        state.player2.score = 3;
        state.player2.ready = true;
        state.ball.speed_x = -5.0;

        let snapshot = SnapshotBuilder::build(&state);
        assert_eq!(
            snapshot.player2,
            PlayerSnapshot {
                y: 40,
                score: 3,
                ready: true,
            }
        );
        assert_eq!(snapshot.ball.speed_x, -5.0);
    }
}
