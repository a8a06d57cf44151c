//! Error taxonomy for the player wall.
//!
//! Per-file validation problems are not errors; they travel as
//! [`crate::model::FileProblem`] batches. Autoplay refusals are recovered
//! inside the player and come back as a [`crate::player::PlayOutcome`].

use crate::model::{FileProblem, PlayerId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WallError {
    /// Player ceiling reached; nothing was created.
    #[error("Maximum 9 players allowed for optimal performance!")]
    Capacity,

    /// Player floor reached; nothing was removed.
    #[error("Cannot remove the last player!")]
    LastPlayer,

    #[error("Player {0} does not exist")]
    UnknownPlayer(PlayerId),

    #[error("No active player selected. Select a player first.")]
    NoActivePlayer,

    #[error("No valid video files found for Player {player}. Please check your files and try again.")]
    NoValidFiles {
        player: PlayerId,
        problems: Vec<FileProblem>,
    },

    #[error("No video loaded in Player {0}")]
    NothingLoaded(PlayerId),

    #[error("{0} requires confirmation")]
    ConfirmationRequired(&'static str),

    #[error("Error importing playlist: {0}")]
    Import(#[from] serde_json::Error),

    #[error("Error exporting playlist: {0}")]
    Export(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WallError {
    /// Capacity-class refusals leave every player untouched.
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::Capacity | Self::LastPlayer)
    }
}

pub type Result<T> = std::result::Result<T, WallError>;
