// src/audio_engine/event.rs

//! Records posted from the audio thread to the UI.
//!
//! Every type here is `Copy` and fixed-size so that posting an event never
//! touches the allocator.

use ringbuf::HeapProducer;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const STATUS_CAPACITY: usize = 64;

/// Fixed-capacity UTF-8 text. Writes past the capacity are truncated at a
/// char boundary.
#[derive(Clone, Copy)]
pub struct StatusMessage {
    bytes: [u8; STATUS_CAPACITY],
    len: u8,
}

impl StatusMessage {
    pub const fn empty() -> Self {
        Self {
            bytes: [0; STATUS_CAPACITY],
            len: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        // only ever filled from whole chars of a &str
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }

    fn push_str(&mut self, s: &str) {
        let start = self.len as usize;
        let mut take = s.len().min(STATUS_CAPACITY - start);
        while !s.is_char_boundary(take) {
            take -= 1;
        }
        self.bytes[start..start + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len = (start + take) as u8;
    }
}

impl Default for StatusMessage {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&str> for StatusMessage {
    fn from(s: &str) -> Self {
        let mut message = Self::empty();
        message.push_str(s);
        message
    }
}

impl fmt::Write for StatusMessage {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

impl fmt::Debug for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for StatusMessage {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineEvent {
    /// Playback position of a track, `0.0..=1.0` of the loop.
    Progress { track: usize, progress: f32 },
    /// Human-readable diagnostics.
    Status { track: usize, message: StatusMessage },
}

/// Where the audio thread posts events. Implementations must never block.
pub trait EventSink {
    /// Returns `false` if the event had to be dropped.
    fn post(&mut self, event: EngineEvent) -> bool;
}

impl EventSink for HeapProducer<EngineEvent> {
    fn post(&mut self, event: EngineEvent) -> bool {
        self.push(event).is_ok()
    }
}

/// Ring buffer producer that counts what it had to drop.
pub struct EventProducer {
    producer: HeapProducer<EngineEvent>,
    dropped: Arc<AtomicUsize>,
}

impl EventProducer {
    pub fn new(producer: HeapProducer<EngineEvent>) -> Self {
        Self {
            producer,
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle to the drop counter, readable from any thread.
    pub fn dropped_counter(&self) -> Arc<AtomicUsize> {
        self.dropped.clone()
    }
}

impl EventSink for EventProducer {
    fn post(&mut self, event: EngineEvent) -> bool {
        if self.producer.post(event) {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }
}
