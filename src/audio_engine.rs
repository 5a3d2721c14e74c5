// src/audio_engine.rs

pub mod command;
pub mod event;
pub mod looper_engine;
pub mod looper_track;

use crate::clock::{BeatClock, DEFAULT_BEATS_PER_BAR, DEFAULT_BPM};
use crate::controller::{EngineController, TrackHandle};
use crate::fx_components::pitch_shift::{DEFAULT_CROSSFADE, DEFAULT_WINDOW};
use crate::fx_components::PitchShiftParams;
use crate::looper::{LooperRequest, SharedLooperState, DEFAULT_NUM_TRACKS, MAX_LOOP_SECONDS};
use crate::monitor::LooperMonitor;
use crate::settings::AppSettings;
use command::AudioCommand;
use event::{EngineEvent, EventProducer};
use looper_engine::LooperEngine;
use ringbuf::{HeapConsumer, HeapRb};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Everything fixed at engine construction.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub bpm: f32,
    pub beats_per_bar: u32,
    pub num_tracks: usize,
    pub max_loop_seconds: u32,
    pub pitch_window: u32,
    pub crossfade: u32,
    pub command_queue_capacity: usize,
    pub event_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            bpm: DEFAULT_BPM,
            beats_per_bar: DEFAULT_BEATS_PER_BAR,
            num_tracks: DEFAULT_NUM_TRACKS,
            max_loop_seconds: MAX_LOOP_SECONDS,
            pitch_window: DEFAULT_WINDOW,
            crossfade: DEFAULT_CROSSFADE,
            command_queue_capacity: 256,
            event_queue_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Engine config for a stream running at `sample_rate`.
    pub fn from_settings(settings: &AppSettings, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            bpm: settings.bpm,
            beats_per_bar: settings.beats_per_bar,
            num_tracks: settings.num_tracks,
            max_loop_seconds: settings.max_loop_seconds,
            pitch_window: settings.pitch_window,
            crossfade: settings.crossfade,
            command_queue_capacity: settings.command_queue_capacity,
            event_queue_capacity: settings.event_queue_capacity,
        }
    }

    /// Sample buffer length of one track.
    pub fn loop_capacity(&self) -> usize {
        self.sample_rate as usize * self.max_loop_seconds as usize
    }
}

pub struct AudioEngine {
    command_consumer: HeapConsumer<AudioCommand>,
    events: EventProducer,
    loopers: Vec<LooperEngine>,
    clock: BeatClock,
    sample_rate: f32,
}

impl AudioEngine {
    /// Wires an engine to its control and event queues. The engine goes to the
    /// audio thread, the controller and monitor stay on the UI side.
    pub fn build(config: &EngineConfig) -> (Self, EngineController, LooperMonitor) {
        let (command_producer, command_consumer) =
            HeapRb::<AudioCommand>::new(config.command_queue_capacity.max(1)).split();
        let (event_producer, event_consumer) =
            HeapRb::<EngineEvent>::new(config.event_queue_capacity.max(1)).split();

        let (engine, tracks) = Self::new(config, command_consumer, EventProducer::new(event_producer));
        let monitor = LooperMonitor::new(event_consumer, tracks.len(), engine.dropped_events());
        let controller = EngineController::new(command_producer, tracks);
        (engine, controller, monitor)
    }

    pub fn new(
        config: &EngineConfig,
        command_consumer: HeapConsumer<AudioCommand>,
        events: EventProducer,
    ) -> (Self, Vec<TrackHandle>) {
        let clock = BeatClock::new(config.sample_rate as f32, config.bpm, config.beats_per_bar);
        let capacity = config.loop_capacity();

        let mut tracks = Vec::with_capacity(config.num_tracks);
        let mut loopers = Vec::with_capacity(config.num_tracks);
        for track in 0..config.num_tracks {
            let handle = TrackHandle {
                shared_state: SharedLooperState::new(),
                pitch_params: PitchShiftParams::new(config.pitch_window, config.crossfade),
            };
            let mut looper = LooperEngine::new(
                track,
                capacity,
                handle.pitch_params.clone(),
                handle.shared_state.clone(),
            );
            looper.set_frames_per_beat(clock.frames_per_beat());
            loopers.push(looper);
            tracks.push(handle);
        }

        let engine = Self {
            command_consumer,
            events,
            loopers,
            clock,
            sample_rate: config.sample_rate as f32,
        };
        (engine, tracks)
    }

    pub fn loopers(&self) -> &[LooperEngine] {
        &self.loopers
    }

    pub fn clock(&self) -> &BeatClock {
        &self.clock
    }

    pub fn dropped_events(&self) -> Arc<AtomicUsize> {
        self.events.dropped_counter()
    }

    pub fn handle_commands(&mut self) {
        while let Some(command) = self.command_consumer.pop() {
            match command {
                AudioCommand::Looper(track, request) => {
                    if let Some(looper) = self.loopers.get_mut(track) {
                        looper.request(request, &mut self.events);
                    }
                }
                AudioCommand::SetLoopLength { track, scale } => {
                    if let Some(looper) = self.loopers.get_mut(track) {
                        looper.set_loop_length(scale, &mut self.events);
                    }
                }
                AudioCommand::SetTempo(bpm) => {
                    self.clock.set_tempo(self.sample_rate, bpm);
                    let frames_per_beat = self.clock.frames_per_beat();
                    for looper in self.loopers.iter_mut() {
                        looper.set_frames_per_beat(frames_per_beat);
                    }
                }
                AudioCommand::StopAll => {
                    for looper in self.loopers.iter_mut() {
                        looper.request(LooperRequest::Stop, &mut self.events);
                    }
                }
            }
        }
    }

    /// One driver block: commands, clock boundaries, then every track. Track
    /// outputs are summed into `output`, which is cleared first.
    pub fn process_buffer(&mut self, input: &[f32], output: &mut [f32]) {
        self.handle_commands();
        output.fill(0.0);

        let frames = input.len().min(output.len());
        let tick = self.clock.advance(frames);

        for looper in self.loopers.iter_mut() {
            // beats first, so the beat on a bar line counts toward a recording it ends
            for _ in 0..tick.beats {
                looper.beat();
            }
            if tick.bar {
                looper.bar(&mut self.events);
            }
            looper.process(&input[..frames], &mut output[..frames], &mut self.events);
        }
    }
}
