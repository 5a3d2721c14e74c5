// src/audio_engine/command.rs

use crate::looper::LooperRequest;

/// Control messages drained by the audio thread at the start of each block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioCommand {
    Looper(usize, LooperRequest),
    SetLoopLength { track: usize, scale: f32 },
    SetTempo(f32),
    StopAll,
}
