// src/audio_engine/looper_track.rs

//! The record/play transport of a single track.
//!
//! Holds the sample buffer, the cursors and the beat accounting. All changes
//! to the state are either requests, which only ever queue, or bar boundaries,
//! which resolve what was queued. Nothing here allocates after `new`.

use crate::looper::{LooperRequest, LooperState, MIN_LOOP_BEATS};

/// Allowed request edges. Any (state, request) pair not listed is ignored.
/// `Recording` is absent on purpose: requests while recording only arm the
/// stop-on-bar flag.
const TRANSITIONS: &[(LooperState, LooperRequest, LooperState)] = &[
    (LooperState::Stopped, LooperRequest::Record, LooperState::RecordQueued),
    (LooperState::Stopped, LooperRequest::Play, LooperState::PlayQueued),
    (LooperState::PlayQueued, LooperRequest::Record, LooperState::RecordQueued),
    (LooperState::PlayQueued, LooperRequest::Stop, LooperState::Stopped),
    (LooperState::RecordQueued, LooperRequest::Play, LooperState::PlayQueued),
    (LooperState::RecordQueued, LooperRequest::Stop, LooperState::Stopped),
    (LooperState::Playing, LooperRequest::Record, LooperState::RecordQueued),
    (LooperState::Playing, LooperRequest::Stop, LooperState::Stopped),
];

fn allowed_edge(from: LooperState, request: LooperRequest) -> Option<LooperState> {
    TRANSITIONS
        .iter()
        .find(|(state, req, _)| *state == from && *req == request)
        .map(|(_, _, to)| *to)
}

/// Result of a state request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The request was already active or queued.
    Ignored,
    /// Recording will finish at the next bar.
    StopRecordOnBar,
    Changed { from: LooperState, to: LooperState },
}

/// What a bar boundary did to the transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BarOutcome {
    pub transition: Option<(LooperState, LooperState)>,
    pub wrapped: bool,
}

pub struct Looper {
    state: LooperState,
    stop_record_on_bar: bool,
    audio: Box<[f32]>,
    last_written: usize,
    play_point: usize,
    end_point: usize,
    num_beats: u32,
    played_beats: u32,
}

impl Looper {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: LooperState::Stopped,
            stop_record_on_bar: false,
            audio: vec![0.0; capacity].into_boxed_slice(),
            last_written: 0,
            play_point: 0,
            end_point: 0,
            num_beats: MIN_LOOP_BEATS,
            played_beats: 0,
        }
    }

    pub fn state(&self) -> LooperState {
        self.state
    }

    pub fn stop_record_on_bar(&self) -> bool {
        self.stop_record_on_bar
    }

    pub fn capacity(&self) -> usize {
        self.audio.len()
    }

    pub fn last_written(&self) -> usize {
        self.last_written
    }

    pub fn play_point(&self) -> usize {
        self.play_point
    }

    pub fn end_point(&self) -> usize {
        self.end_point
    }

    pub fn num_beats(&self) -> u32 {
        self.num_beats
    }

    pub fn played_beats(&self) -> u32 {
        self.played_beats
    }

    /// The recorded region, `[0, last_written)`.
    pub fn recorded(&self) -> &[f32] {
        &self.audio[..self.last_written]
    }

    pub fn request(&mut self, request: LooperRequest) -> Transition {
        if self.state == LooperState::Recording {
            if self.stop_record_on_bar {
                return Transition::Ignored;
            }
            self.stop_record_on_bar = true;
            return Transition::StopRecordOnBar;
        }

        match allowed_edge(self.state, request) {
            Some(to) => {
                let from = self.state;
                self.state = to;
                if to == LooperState::Stopped {
                    self.play_point = 0;
                }
                Transition::Changed { from, to }
            }
            None => Transition::Ignored,
        }
    }

    pub fn beat(&mut self) {
        if self.state == LooperState::Recording {
            self.num_beats = self.num_beats.saturating_add(1);
        }
        self.played_beats = self.played_beats.saturating_add(1);
    }

    pub fn bar(&mut self) -> BarOutcome {
        let mut outcome = BarOutcome::default();

        if self.stop_record_on_bar {
            self.stop_record_on_bar = false;
            if self.state == LooperState::Recording {
                self.state = LooperState::Stopped;
                self.end_point = self.last_written;
                self.num_beats = self.num_beats.max(MIN_LOOP_BEATS);
                outcome.transition = Some((LooperState::Recording, LooperState::Stopped));
            }
        }

        if self.played_beats >= self.num_beats {
            self.play_point = 0;
            self.played_beats = 0;
            outcome.wrapped = true;
        }

        match self.state {
            LooperState::PlayQueued => {
                self.state = LooperState::Playing;
                self.play_point = 0;
                self.played_beats = 0;
                self.end_point = self.last_written;
                outcome.transition = Some((LooperState::PlayQueued, LooperState::Playing));
            }
            LooperState::RecordQueued => {
                self.state = LooperState::Recording;
                self.play_point = 0;
                self.end_point = 0;
                self.last_written = 0;
                self.num_beats = 0;
                self.played_beats = 0;
                outcome.transition = Some((LooperState::RecordQueued, LooperState::Recording));
            }
            _ => {}
        }

        outcome
    }

    /// Scales the loop length, never below `MIN_LOOP_BEATS`. Returns the new length.
    pub fn set_loop_length(&mut self, scale: f32) -> u32 {
        // float -> int casts saturate, so NaN and negatives land on 0 here
        let scaled = (self.num_beats as f32 * scale) as u32;
        self.num_beats = scaled.max(MIN_LOOP_BEATS);
        self.num_beats
    }

    /// Adds the loop into `mix`, one sample per frame. The cursor advances for
    /// every frame, also past `end_point`, so progress keeps moving until the
    /// next wrap.
    pub fn play_into(&mut self, mix: &mut [f32]) {
        for slot in mix.iter_mut() {
            if self.play_point < self.end_point {
                *slot += self.audio[self.play_point];
            }
            self.play_point += 1;
        }
    }

    /// Appends `input` to the recording. Frames beyond capacity are dropped.
    pub fn record_from(&mut self, input: &[f32]) {
        let room = self.audio.len() - self.last_written;
        let take = input.len().min(room);
        self.audio[self.last_written..self.last_written + take].copy_from_slice(&input[..take]);
        self.last_written += take;
    }

    /// Playback position as a fraction of the loop length, clamped to `[0, 1]`.
    pub fn progress(&self, frames_per_beat: f32) -> f32 {
        let loop_frames = frames_per_beat * self.num_beats as f32;
        if loop_frames > 0.0 {
            (self.play_point as f32 / loop_frames).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
