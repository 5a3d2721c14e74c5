// src/looper.rs
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

pub const DEFAULT_NUM_TRACKS: usize = 4;
pub const MIN_LOOP_BEATS: u32 = 4;
pub const MAX_LOOP_SECONDS: u32 = 60;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LooperState {
    Stopped,
    Recording,
    PlayQueued,
    Playing,
    RecordQueued,
}

impl From<u8> for LooperState {
    fn from(val: u8) -> Self {
        match val {
            0 => LooperState::Stopped,
            1 => LooperState::Recording,
            2 => LooperState::PlayQueued,
            3 => LooperState::Playing,
            4 => LooperState::RecordQueued,
            _ => LooperState::Stopped, // Default fallback
        }
    }
}

impl LooperState {
    pub fn is_queued(self) -> bool {
        matches!(self, LooperState::PlayQueued | LooperState::RecordQueued)
    }

    pub fn label(self) -> &'static str {
        match self {
            LooperState::Stopped => "Stopped",
            LooperState::Recording => "Recording",
            LooperState::PlayQueued => "Play queued",
            LooperState::Playing => "Playing",
            LooperState::RecordQueued => "Record queued",
        }
    }
}

/// What the user asked a looper to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LooperRequest {
    Record,
    Play,
    Stop,
}

/// State that is shared between the UI and audio threads.
#[derive(Clone, Debug)]
pub struct SharedLooperState {
    state: Arc<AtomicU8>,
    length_in_beats: Arc<AtomicU32>,
    stop_is_queued: Arc<AtomicBool>,
}

impl Default for SharedLooperState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedLooperState {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(LooperState::Stopped as u8)),
            length_in_beats: Arc::new(AtomicU32::new(MIN_LOOP_BEATS)),
            stop_is_queued: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn get(&self) -> LooperState {
        self.state.load(Ordering::Relaxed).into()
    }

    pub fn set(&self, state: LooperState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    pub fn get_length_in_beats(&self) -> u32 {
        self.length_in_beats.load(Ordering::Relaxed)
    }

    pub fn set_length_in_beats(&self, beats: u32) {
        self.length_in_beats.store(beats, Ordering::Relaxed);
    }

    pub fn is_stop_queued(&self) -> bool {
        self.stop_is_queued.load(Ordering::Relaxed)
    }

    pub fn set_stop_is_queued(&self, queued: bool) {
        self.stop_is_queued.store(queued, Ordering::Relaxed);
    }
}
