// src/controller.rs

//! UI-side control surface for a running `AudioEngine`.
//!
//! State requests and loop length changes travel through the command queue and
//! take effect at the start of the next audio block. Pitch parameters are
//! written straight into the shared atomics.

use crate::audio_engine::command::AudioCommand;
use crate::error::{ControlError, Result};
use crate::fx_components::PitchShiftParams;
use crate::looper::{LooperRequest, LooperState, SharedLooperState};
use ringbuf::HeapProducer;

/// The UI's view of one track.
#[derive(Debug, Clone)]
pub struct TrackHandle {
    pub shared_state: SharedLooperState,
    pub pitch_params: PitchShiftParams,
}

pub struct EngineController {
    command_producer: HeapProducer<AudioCommand>,
    tracks: Vec<TrackHandle>,
}

impl EngineController {
    pub fn new(command_producer: HeapProducer<AudioCommand>, tracks: Vec<TrackHandle>) -> Self {
        Self {
            command_producer,
            tracks,
        }
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn track(&self, track: usize) -> Result<&TrackHandle> {
        self.tracks.get(track).ok_or(ControlError::UnknownTrack {
            track,
            num_tracks: self.tracks.len(),
        })
    }

    pub fn state(&self, track: usize) -> Result<LooperState> {
        Ok(self.track(track)?.shared_state.get())
    }

    pub fn request_record(&mut self, track: usize) -> Result<()> {
        self.request(track, LooperRequest::Record)
    }

    pub fn request_play(&mut self, track: usize) -> Result<()> {
        self.request(track, LooperRequest::Play)
    }

    pub fn request_stop(&mut self, track: usize) -> Result<()> {
        self.request(track, LooperRequest::Stop)
    }

    pub fn request(&mut self, track: usize, request: LooperRequest) -> Result<()> {
        self.track(track)?;
        self.send(AudioCommand::Looper(track, request))
    }

    pub fn stop_all(&mut self) -> Result<()> {
        self.send(AudioCommand::StopAll)
    }

    pub fn set_loop_length(&mut self, track: usize, scale: f32) -> Result<()> {
        self.track(track)?;
        self.send(AudioCommand::SetLoopLength { track, scale })
    }

    pub fn set_tempo(&mut self, bpm: f32) -> Result<()> {
        self.send(AudioCommand::SetTempo(bpm))
    }

    pub fn set_pitch(&self, track: usize, semitones: f32) -> Result<()> {
        self.track(track)?.pitch_params.set_semitones(semitones);
        Ok(())
    }

    pub fn set_pitch_window(&self, track: usize, samples: u32) -> Result<()> {
        self.track(track)?.pitch_params.set_window(samples);
        Ok(())
    }

    pub fn set_crossfade(&self, track: usize, samples: u32) -> Result<()> {
        self.track(track)?.pitch_params.set_crossfade(samples);
        Ok(())
    }

    fn send(&mut self, command: AudioCommand) -> Result<()> {
        self.command_producer
            .push(command)
            .map_err(|_| ControlError::QueueFull)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::HeapRb;

    fn controller(queue: usize) -> (EngineController, ringbuf::HeapConsumer<AudioCommand>) {
        let (producer, consumer) = HeapRb::<AudioCommand>::new(queue).split();
        let tracks = (0..2)
            .map(|_| TrackHandle {
                shared_state: SharedLooperState::new(),
                pitch_params: PitchShiftParams::default(),
            })
            .collect();
        (EngineController::new(producer, tracks), consumer)
    }

    #[test]
    fn requests_are_queued_as_commands() {
        let (mut controller, mut commands) = controller(8);
        controller.request_record(1).unwrap();
        controller.set_loop_length(0, 0.5).unwrap();
        assert_eq!(
            commands.pop(),
            Some(AudioCommand::Looper(1, LooperRequest::Record))
        );
        assert_eq!(
            commands.pop(),
            Some(AudioCommand::SetLoopLength {
                track: 0,
                scale: 0.5
            })
        );
    }

    #[test]
    fn unknown_tracks_are_rejected_before_queueing() {
        let (mut controller, mut commands) = controller(8);
        assert_eq!(
            controller.request_play(5),
            Err(ControlError::UnknownTrack {
                track: 5,
                num_tracks: 2
            })
        );
        assert!(controller.set_pitch(2, 1.0).is_err());
        assert_eq!(commands.pop(), None);
    }

    #[test]
    fn full_queue_is_reported() {
        let (mut controller, _commands) = controller(1);
        controller.request_play(0).unwrap();
        assert_eq!(controller.request_stop(0), Err(ControlError::QueueFull));
    }

    #[test]
    fn pitch_changes_bypass_the_queue() {
        let (controller, mut commands) = controller(8);
        controller.set_pitch(0, 12.0).unwrap();
        controller.set_pitch_window(0, 2048).unwrap();
        controller.set_crossfade(0, 256).unwrap();
        let params = &controller.track(0).unwrap().pitch_params;
        assert!((params.semitones() - 12.0).abs() < 1e-4);
        assert_eq!(params.window(), 2048);
        assert_eq!(params.crossfade(), 256);
        assert_eq!(commands.pop(), None);
    }
}
