// src/fx_components/pitch_shift.rs

//! A granular pitch shifter.
//!
//! Two grains are read from the input history: one at a fractional delay that
//! sweeps through `[0, window)` at a speed set by the pitch ratio, and one a full
//! window further back. A linear ramp over the first `crossfade` samples of the
//! sweep hands the output from the older grain to the newer one, hiding the jump
//! when the sweep wraps.

use crate::fx_components::history::HistoryBuffer;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

// Scaler for storing float values in atomics.
pub const PARAM_SCALER: f32 = 1_000_000.0;
// Offset for the shift so negative semitones fit an unsigned atomic.
pub const SEMITONE_OFFSET: f32 = 24.0;

pub const HISTORY_CAPACITY: usize = 65536;

pub const MIN_SEMITONES: f32 = -24.0;
pub const MAX_SEMITONES: f32 = 24.0;
pub const MIN_WINDOW: u32 = 64;
pub const MAX_WINDOW: u32 = (HISTORY_CAPACITY / 2 - 1) as u32;
pub const MIN_CROSSFADE: u32 = 1;

pub const DEFAULT_WINDOW: u32 = 1000;
pub const DEFAULT_CROSSFADE: u32 = 1000;

/// Shared, automatable parameters for the pitch shifter.
#[derive(Debug, Clone)]
pub struct Params {
    /// Shift in semitones (-24.0 to 24.0). Stored as `(semitones + 24.0) * PARAM_SCALER`.
    pub semitones: Arc<AtomicU32>,
    /// Grain length in samples.
    pub window: Arc<AtomicU32>,
    /// Crossfade ramp length in samples, never longer than the window.
    pub crossfade: Arc<AtomicU32>,
}

impl Default for Params {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_CROSSFADE)
    }
}

impl Params {
    pub fn new(window: u32, crossfade: u32) -> Self {
        let params = Self {
            semitones: Arc::new(AtomicU32::new((SEMITONE_OFFSET * PARAM_SCALER) as u32)),
            window: Arc::new(AtomicU32::new(DEFAULT_WINDOW)),
            crossfade: Arc::new(AtomicU32::new(DEFAULT_CROSSFADE)),
        };
        params.set_window(window);
        params.set_crossfade(crossfade);
        params
    }

    pub fn semitones(&self) -> f32 {
        self.semitones.load(Ordering::Relaxed) as f32 / PARAM_SCALER - SEMITONE_OFFSET
    }

    pub fn window(&self) -> u32 {
        self.window.load(Ordering::Relaxed)
    }

    pub fn crossfade(&self) -> u32 {
        self.crossfade.load(Ordering::Relaxed)
    }

    /// Stores a new shift, clamped to +/- two octaves. NaN is treated as no shift.
    pub fn set_semitones(&self, semitones: f32) {
        let semitones = if semitones.is_nan() {
            0.0
        } else {
            semitones.clamp(MIN_SEMITONES, MAX_SEMITONES)
        };
        let stored = ((semitones + SEMITONE_OFFSET) * PARAM_SCALER).round() as u32;
        self.semitones.store(stored, Ordering::Relaxed);
    }

    /// Stores a new window length. A crossfade longer than the new window is
    /// pulled down to it.
    pub fn set_window(&self, samples: u32) {
        let window = samples.clamp(MIN_WINDOW, MAX_WINDOW);
        self.window.store(window, Ordering::Relaxed);
        if self.crossfade() > window {
            self.crossfade.store(window, Ordering::Relaxed);
        }
    }

    pub fn set_crossfade(&self, samples: u32) {
        let crossfade = samples.clamp(MIN_CROSSFADE, self.window());
        self.crossfade.store(crossfade, Ordering::Relaxed);
    }
}

/// The audio-thread state for the pitch shifter.
#[derive(Debug)]
pub struct PitchShifter {
    params: Params,
    history: HistoryBuffer,
    // Fractional read position, current and previous sample.
    rec: [f32; 2],
}

impl PitchShifter {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            history: HistoryBuffer::new(HISTORY_CAPACITY),
            rec: [0.0; 2],
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Shifts `input` and adds the result into `output`. Parameters are read
    /// once per call.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        let semitones = self.params.semitones();
        let window = self.params.window() as f32;
        let crossfade = self.params.crossfade().max(MIN_CROSSFADE) as f32;

        let ratio = 2.0_f32.powf(semitones / 12.0);
        let speed = 1.0 + window - ratio;
        let ramp_scale = 1.0 / crossfade;

        for (&sample, out) in input.iter().zip(output.iter_mut()) {
            self.history.store(sample);

            self.rec[0] = (self.rec[1] + speed) % window;
            let position = self.rec[0];
            let ramp = (ramp_scale * position).min(1.0);

            let newer = self.history.tap_interpolated(position);
            let older = self.history.tap_interpolated(window + position);
            *out += (1.0 - ramp) * older + ramp * newer;

            self.rec[1] = self.rec[0];
            self.history.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(len: usize, period: f32) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * std::f32::consts::PI * n as f32 / period).sin())
            .collect()
    }

    #[test]
    fn zero_shift_is_a_pure_window_delay() {
        let params = Params::new(256, 256);
        let mut shifter = PitchShifter::new(params);
        let input = sine(256 * 8, 37.0);
        let mut output = vec![0.0; input.len()];

        shifter.process(&input, &mut output);

        for n in 256..input.len() {
            assert!(
                (output[n] - input[n - 256]).abs() < 1e-5,
                "sample {} differs: {} vs {}",
                n,
                output[n],
                input[n - 256]
            );
        }
        assert!(output[..256].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn output_is_summed_not_overwritten() {
        let mut shifter = PitchShifter::new(Params::new(64, 64));
        let input = vec![0.0; 128];
        let mut output = vec![0.5; 128];
        shifter.process(&input, &mut output);
        assert!(output.iter().all(|s| *s == 0.5));
    }

    #[test]
    fn state_carries_across_block_boundaries() {
        let input = sine(4096, 50.0);

        let mut whole = PitchShifter::new(Params::new(512, 128));
        whole.params().set_semitones(7.0);
        let mut expected = vec![0.0; input.len()];
        whole.process(&input, &mut expected);

        let mut split = PitchShifter::new(Params::new(512, 128));
        split.params().set_semitones(7.0);
        let mut actual = vec![0.0; input.len()];
        for (inp, out) in input.chunks(100).zip(actual.chunks_mut(100)) {
            split.process(inp, out);
        }

        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-5);
        }
    }

    #[test]
    fn shifted_output_stays_bounded() {
        for semitones in [-24.0, -12.0, -5.0, 3.0, 12.0, 24.0] {
            let mut shifter = PitchShifter::new(Params::new(1000, 1000));
            shifter.params().set_semitones(semitones);
            let input = sine(20_000, 80.0);
            let mut output = vec![0.0; input.len()];
            shifter.process(&input, &mut output);
            assert!(output.iter().all(|s| s.is_finite() && s.abs() <= 1.0 + 1e-4));
        }
    }

    #[test]
    fn parameters_are_clamped_to_their_domain() {
        let params = Params::default();
        params.set_semitones(100.0);
        assert!((params.semitones() - MAX_SEMITONES).abs() < 1e-4);
        params.set_semitones(-3.5);
        assert!((params.semitones() + 3.5).abs() < 1e-4);
        params.set_semitones(f32::NAN);
        assert!(params.semitones().abs() < 1e-4);

        params.set_window(1);
        assert_eq!(params.window(), MIN_WINDOW);
        params.set_window(1_000_000);
        assert_eq!(params.window(), MAX_WINDOW);

        params.set_crossfade(0);
        assert_eq!(params.crossfade(), MIN_CROSSFADE);
        params.set_crossfade(MAX_WINDOW + 10);
        assert_eq!(params.crossfade(), MAX_WINDOW);

        params.set_window(128);
        assert_eq!(params.crossfade(), 128);
    }
}
