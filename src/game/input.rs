//! Inbound paddle commands

use crate::ws::protocol::ClientCommand;

use super::state::{Direction, PlayerSlot};

/// A command that names a real player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddleCommand {
    pub slot: PlayerSlot,
    pub direction: Direction,
}

/// Why an inbound message was discarded
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Malformed command: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parse raw message text.
///
/// `Ok(None)` means the message was well formed but named an unknown
/// player; callers drop it without complaint.
pub fn parse_command(raw: &str) -> Result<Option<PaddleCommand>, InputError> {
    let command: ClientCommand = serde_json::from_str(raw)?;

    Ok(PlayerSlot::from_wire(&command.player).map(|slot| PaddleCommand {
        slot,
        direction: command.direction,
    }))
}
