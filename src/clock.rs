// src/clock.rs

//! Bar/beat clock. Counts frames and reports, per block, which beat and bar
//! boundaries fall inside it so the engine can deliver them before the block
//! is processed.

pub const DEFAULT_BPM: f32 = 120.0;
pub const DEFAULT_BEATS_PER_BAR: u32 = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockTick {
    /// Beat boundaries inside the block.
    pub beats: u32,
    /// Whether one of those beats starts a bar.
    pub bar: bool,
}

#[derive(Debug)]
pub struct BeatClock {
    frames_per_beat: f64,
    beats_per_bar: u32,
    frame: u64,
    next_beat_frame: f64,
    beat_index: u64,
}

impl BeatClock {
    pub fn new(sample_rate: f32, bpm: f32, beats_per_bar: u32) -> Self {
        Self {
            frames_per_beat: Self::frames_per_beat_for(sample_rate, bpm),
            beats_per_bar: beats_per_bar.max(1),
            frame: 0,
            next_beat_frame: 0.0,
            beat_index: 0,
        }
    }

    fn frames_per_beat_for(sample_rate: f32, bpm: f32) -> f64 {
        let bpm = if bpm.is_finite() && bpm > 0.0 { bpm } else { DEFAULT_BPM };
        sample_rate as f64 * 60.0 / bpm as f64
    }

    pub fn frames_per_beat(&self) -> f32 {
        self.frames_per_beat as f32
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    /// Changes tempo from the next beat on.
    pub fn set_tempo(&mut self, sample_rate: f32, bpm: f32) {
        let previous_beat = self.next_beat_frame - self.frames_per_beat;
        self.frames_per_beat = Self::frames_per_beat_for(sample_rate, bpm);
        if self.beat_index > 0 {
            // a shorter beat may already have elapsed; fire it at the next block
            self.next_beat_frame = (previous_beat + self.frames_per_beat).max(self.frame as f64);
        }
    }

    /// Advances by `frames` and returns the boundaries in `[frame, frame + frames)`.
    pub fn advance(&mut self, frames: usize) -> ClockTick {
        let block_end = (self.frame + frames as u64) as f64;
        let mut tick = ClockTick::default();
        while self.next_beat_frame < block_end {
            tick.beats += 1;
            if self.beat_index % self.beats_per_bar as u64 == 0 {
                tick.bar = true;
            }
            self.beat_index += 1;
            self.next_beat_frame += self.frames_per_beat;
        }
        self.frame += frames as u64;
        tick
    }
}
