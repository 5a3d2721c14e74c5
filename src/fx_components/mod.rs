// src/fx_components/mod.rs

pub mod history;
pub mod pitch_shift;

pub use history::HistoryBuffer;
pub use pitch_shift::{Params as PitchShiftParams, PitchShifter};
