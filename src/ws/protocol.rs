//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::Direction;

/// Paddle command sent from client to server
///
/// `player` stays a plain string so an unknown name can be told apart
/// from a payload that does not parse at all.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientCommand {
    pub player: String,
    pub direction: Direction,
}

/// Full game state as sent to every client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub player1: PlayerSnapshot,
    pub player2: PlayerSnapshot,
    pub ball: BallSnapshot,
}

/// One paddle in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub y: i32,
    pub score: u32,
    pub ready: bool,
}

/// Ball position and velocity in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub x: f64,
    pub y: f64,
    pub speed_x: f64,
    pub speed_y: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        let cmd: ClientCommand =
            serde_json::from_str(r#"{"player":"player2","direction":"down"}"#).unwrap();
        assert_eq!(cmd.player, "player2");
        assert_eq!(cmd.direction, Direction::Down);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let cmd: ClientCommand =
            serde_json::from_str(r#"{"player":"player1","direction":"up","seq":9}"#).unwrap();
        assert_eq!(cmd.direction, Direction::Up);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        for raw in [
            "not json",
            r#"{"player":"player1"}"#,
            r#"{"player":"player1","direction":"left"}"#,
            r#"{"player":1,"direction":"up"}"#,
            r#"{"direction":"up"}"#,
        ] {
            assert!(serde_json::from_str::<ClientCommand>(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn test_snapshot_field_names() {
        let snapshot = StateSnapshot {
            player1: PlayerSnapshot {
                y: 200,
                score: 1,
                ready: true,
            },
            player2: PlayerSnapshot {
                y: 180,
                score: 0,
                ready: false,
            },
            ball: BallSnapshot {
                x: 400.0,
                y: 200.0,
                speed_x: 4.0,
                speed_y: -4.0,
            },
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["player1"]["score"], 1);
        assert_eq!(value["player2"]["ready"], false);
        assert_eq!(value["ball"]["speed_x"], 4.0);
        assert_eq!(value["ball"]["speed_y"], -4.0);
        assert!(value.get("started").is_none());
    }
}
