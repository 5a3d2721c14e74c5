// src/monitor.rs

//! UI-side consumer of engine events.

use crate::audio_engine::event::EngineEvent;
use chrono::{DateTime, Local};
use ringbuf::HeapConsumer;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const STATUS_LOG_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub at: DateTime<Local>,
    pub track: usize,
    pub message: String,
}

pub struct LooperMonitor {
    consumer: HeapConsumer<EngineEvent>,
    progress: Vec<f32>,
    status_log: VecDeque<StatusLine>,
    dropped_events: Arc<AtomicUsize>,
    dropped_reported: usize,
}

impl LooperMonitor {
    pub fn new(
        consumer: HeapConsumer<EngineEvent>,
        num_tracks: usize,
        dropped_events: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            consumer,
            progress: vec![0.0; num_tracks],
            status_log: VecDeque::with_capacity(STATUS_LOG_CAPACITY),
            dropped_events,
            dropped_reported: 0,
        }
    }

    /// Drains every pending event. Returns how many were handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.consumer.pop() {
            handled += 1;
            match event {
                EngineEvent::Progress { track, progress } => {
                    if let Some(slot) = self.progress.get_mut(track) {
                        *slot = progress;
                    }
                }
                EngineEvent::Status { track, message } => {
                    tracing::info!(track, "{}", message);
                    if self.status_log.len() == STATUS_LOG_CAPACITY {
                        self.status_log.pop_front();
                    }
                    self.status_log.push_back(StatusLine {
                        at: Local::now(),
                        track,
                        message: message.to_string(),
                    });
                }
            }
        }

        let dropped = self.dropped_events.load(Ordering::Relaxed);
        if dropped > self.dropped_reported {
            tracing::warn!(
                "event queue full, {} events dropped",
                dropped - self.dropped_reported
            );
            self.dropped_reported = dropped;
        }
        handled
    }

    /// Latest reported playback progress of `track`.
    pub fn progress(&self, track: usize) -> Option<f32> {
        self.progress.get(track).copied()
    }

    pub fn status_log(&self) -> impl Iterator<Item = &StatusLine> {
        self.status_log.iter()
    }

    pub fn dropped_events(&self) -> usize {
        self.dropped_events.load(Ordering::Relaxed)
    }
}
