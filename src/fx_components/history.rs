// src/fx_components/history.rs

//! A power-of-two circular buffer of past input samples.
//!
//! Positions are addressed relative to the current write index, so a tap at
//! delay `0` is the sample most recently stored. Wraparound is a bit mask,
//! never a branch or a modulo.

/// Fixed-capacity sample history with mask-wrapped indexing.
#[derive(Debug)]
pub struct HistoryBuffer {
    data: Box<[f32]>,
    mask: usize,
    write_index: usize,
}

impl HistoryBuffer {
    /// Allocates a zeroed history. `capacity` is rounded up to a power of two.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        Self {
            data: vec![0.0; capacity].into_boxed_slice(),
            mask: capacity - 1,
            write_index: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Writes `sample` at the current write index without advancing it.
    #[inline]
    pub fn store(&mut self, sample: f32) {
        self.data[self.write_index & self.mask] = sample;
    }

    /// Reads the sample `delay` positions behind the write index.
    #[inline]
    pub fn tap(&self, delay: usize) -> f32 {
        self.data[self.write_index.wrapping_sub(delay & self.mask) & self.mask]
    }

    /// Linear interpolation between the two integer taps around `delay`.
    #[inline]
    pub fn tap_interpolated(&self, delay: f32) -> f32 {
        let whole = delay as usize;
        let frac = delay - whole as f32;
        (1.0 - frac) * self.tap(whole) + frac * self.tap(whole + 1)
    }

    #[inline]
    pub fn advance(&mut self) {
        self.write_index = self.write_index.wrapping_add(1);
    }
}
