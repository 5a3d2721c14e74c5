// src/error.rs

use thiserror::Error;

/// Failures of the control surface. The audio thread itself never fails.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    #[error("no looper track {track} (engine has {num_tracks})")]
    UnknownTrack { track: usize, num_tracks: usize },

    #[error("command queue full, command dropped")]
    QueueFull,
}

pub type Result<T> = std::result::Result<T, ControlError>;
