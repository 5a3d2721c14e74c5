// src/audio_engine/looper_engine.rs

//! One track: transport, pitch shifter and event reporting wired together.

use crate::audio_engine::event::{EngineEvent, EventSink, StatusMessage};
use crate::audio_engine::looper_track::{Looper, Transition};
use crate::fx_components::{PitchShiftParams, PitchShifter};
use crate::looper::{LooperRequest, LooperState, SharedLooperState};
use std::fmt::{self, Write};

/// Frames mixed per pass. Longer driver blocks are split into chunks of this size.
pub const TMP_BUFFER_SIZE: usize = 1024;

pub struct LooperEngine {
    track: usize,
    transport: Looper,
    pitch_shifter: PitchShifter,
    tmp_buffer: Box<[f32]>,
    frames_per_beat: f32,
    shared_state: SharedLooperState,
}

impl LooperEngine {
    /// Allocates every buffer the track will ever use. `capacity` is the
    /// maximum loop length in samples.
    pub fn new(
        track: usize,
        capacity: usize,
        pitch_params: PitchShiftParams,
        shared_state: SharedLooperState,
    ) -> Self {
        let engine = Self {
            track,
            transport: Looper::new(capacity),
            pitch_shifter: PitchShifter::new(pitch_params),
            tmp_buffer: vec![0.0; TMP_BUFFER_SIZE].into_boxed_slice(),
            frames_per_beat: 0.0,
            shared_state,
        };
        engine.sync_shared_state();
        engine
    }

    pub fn track(&self) -> usize {
        self.track
    }

    pub fn state(&self) -> LooperState {
        self.transport.state()
    }

    pub fn transport(&self) -> &Looper {
        &self.transport
    }

    pub fn num_beats(&self) -> u32 {
        self.transport.num_beats()
    }

    pub fn frames_per_beat(&self) -> f32 {
        self.frames_per_beat
    }

    pub fn pitch_params(&self) -> &PitchShiftParams {
        self.pitch_shifter.params()
    }

    pub fn shared_state(&self) -> &SharedLooperState {
        &self.shared_state
    }

    /// Tempo as supplied by the clock. Only used to scale progress.
    pub fn set_frames_per_beat(&mut self, frames_per_beat: f32) {
        self.frames_per_beat = frames_per_beat;
    }

    pub fn request_record<S: EventSink>(&mut self, sink: &mut S) {
        self.request(LooperRequest::Record, sink);
    }

    pub fn request_play<S: EventSink>(&mut self, sink: &mut S) {
        self.request(LooperRequest::Play, sink);
    }

    pub fn request_stop<S: EventSink>(&mut self, sink: &mut S) {
        self.request(LooperRequest::Stop, sink);
    }

    pub fn request<S: EventSink>(&mut self, request: LooperRequest, sink: &mut S) {
        match self.transport.request(request) {
            Transition::Ignored => {}
            Transition::StopRecordOnBar => {
                self.post_status(sink, format_args!("stop recording on bar"));
            }
            Transition::Changed { from, to } => {
                self.post_status(sink, format_args!("{} -> {}", from.label(), to.label()));
            }
        }
        self.sync_shared_state();
    }

    pub fn set_loop_length<S: EventSink>(&mut self, scale: f32, sink: &mut S) {
        let beats = self.transport.set_loop_length(scale);
        self.post_status(sink, format_args!("loop length = {} beats", beats));
        self.sync_shared_state();
    }

    pub fn set_pitch(&self, semitones: f32) {
        self.pitch_shifter.params().set_semitones(semitones);
    }

    pub fn set_pitch_window(&self, samples: u32) {
        self.pitch_shifter.params().set_window(samples);
    }

    pub fn set_crossfade(&self, samples: u32) {
        self.pitch_shifter.params().set_crossfade(samples);
    }

    pub fn beat(&mut self) {
        self.transport.beat();
        if self.transport.state() == LooperState::Recording {
            self.shared_state
                .set_length_in_beats(self.transport.num_beats());
        }
    }

    pub fn bar<S: EventSink>(&mut self, sink: &mut S) {
        let outcome = self.transport.bar();
        if let Some((from, to)) = outcome.transition {
            self.post_status(sink, format_args!("{} -> {}", from.label(), to.label()));
        }
        self.sync_shared_state();
    }

    /// Runs one driver block. The pitch shifter always runs, so its history
    /// stays continuous while the transport changes state.
    pub fn process<S: EventSink>(&mut self, input: &[f32], output: &mut [f32], sink: &mut S) {
        let frames = input.len().min(output.len());
        let state = self.transport.state();

        let mut offset = 0;
        while offset < frames {
            let len = (frames - offset).min(self.tmp_buffer.len());
            let mix = &mut self.tmp_buffer[..len];
            mix.fill(0.0);

            match state {
                LooperState::Playing => self.transport.play_into(mix),
                LooperState::Recording => {
                    self.transport.record_from(&input[offset..offset + len])
                }
                _ => {}
            }

            self.pitch_shifter
                .process(mix, &mut output[offset..offset + len]);
            offset += len;
        }

        if state == LooperState::Playing {
            sink.post(EngineEvent::Progress {
                track: self.track,
                progress: self.transport.progress(self.frames_per_beat),
            });
        }
    }

    fn post_status<S: EventSink>(&self, sink: &mut S, args: fmt::Arguments<'_>) {
        let mut message = StatusMessage::empty();
        // writes into a StatusMessage truncate, they never fail
        write!(message, "Looper {}: ", self.track).ok();
        message.write_fmt(args).ok();
        sink.post(EngineEvent::Status {
            track: self.track,
            message,
        });
    }

    fn sync_shared_state(&self) {
        self.shared_state.set(self.transport.state());
        self.shared_state
            .set_length_in_beats(self.transport.num_beats());
        self.shared_state
            .set_stop_is_queued(self.transport.stop_record_on_bar());
    }
}
