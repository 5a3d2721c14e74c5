// src/settings.rs
use crate::clock::{DEFAULT_BEATS_PER_BAR, DEFAULT_BPM};
use crate::fx_components::pitch_shift::{
    DEFAULT_CROSSFADE, DEFAULT_WINDOW, MAX_WINDOW, MIN_CROSSFADE, MIN_WINDOW,
};
use crate::looper::{DEFAULT_NUM_TRACKS, MAX_LOOP_SECONDS};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";
const MAX_TRACKS: usize = 16;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub host_name: Option<String>,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub sample_rate: Option<u32>,
    pub buffer_size: Option<u32>,
    pub input_latency_compensation_ms: f32,
    pub bpm: f32,
    pub beats_per_bar: u32,
    pub num_tracks: usize,
    pub max_loop_seconds: u32,
    pub pitch_window: u32,
    pub crossfade: u32,
    pub command_queue_capacity: usize,
    pub event_queue_capacity: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            host_name: None,
            input_device: None,
            output_device: None,
            sample_rate: None,
            buffer_size: None,
            input_latency_compensation_ms: 5.0, // Default to 5ms safety buffer
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

impl AppSettings {
    /// Pulls every field back into a range the engine can run with.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if !(self.bpm.is_finite() && self.bpm >= 20.0 && self.bpm <= 400.0) {
            tracing::warn!("bpm {} out of range, using {}", self.bpm, defaults.bpm);
            self.bpm = defaults.bpm;
        }
        if !(self.input_latency_compensation_ms.is_finite()
            && self.input_latency_compensation_ms >= 0.0)
        {
            self.input_latency_compensation_ms = defaults.input_latency_compensation_ms;
        }
        self.beats_per_bar = self.beats_per_bar.clamp(1, 16);
        self.num_tracks = self.num_tracks.clamp(1, MAX_TRACKS);
        self.max_loop_seconds = self.max_loop_seconds.clamp(1, MAX_LOOP_SECONDS);
        self.pitch_window = self.pitch_window.clamp(MIN_WINDOW, MAX_WINDOW);
        self.crossfade = self.crossfade.clamp(MIN_CROSSFADE, self.pitch_window);
        self.command_queue_capacity = self.command_queue_capacity.max(16);
        self.event_queue_capacity = self.event_queue_capacity.max(64);
        self
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "pitchloop")?;
    let dir = dirs.config_dir().to_path_buf();
    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!("Failed to create directory at {}: {}", dir.display(), e);
            return None;
        }
    }
    Some(dir)
}

pub fn settings_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(SETTINGS_FILE))
}

pub fn save_settings_to(settings: &AppSettings, path: &Path) -> anyhow::Result<()> {
    let json_string = serde_json::to_string_pretty(settings)?;
    fs::write(path, json_string)?;
    Ok(())
}

/// Reads settings from `path`. Missing or unreadable files give the defaults.
pub fn load_settings_from(path: &Path) -> AppSettings {
    if !path.exists() {
        return AppSettings::default();
    }
    let settings = match fs::read_to_string(path) {
        Ok(json_string) => match serde_json::from_str::<AppSettings>(&json_string) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to parse settings file, using defaults. Error: {}", e);
                AppSettings::default()
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read settings file, using defaults. Error: {}", e);
            AppSettings::default()
        }
    };
    settings.validated()
}

pub fn save_settings(settings: &AppSettings) {
    if let Some(path) = settings_path() {
        match save_settings_to(settings, &path) {
            Ok(()) => tracing::debug!("Saved settings to {}", path.display()),
            Err(e) => tracing::warn!("Failed to write settings to {}: {}", path.display(), e),
        }
    }
}

pub fn load_settings() -> AppSettings {
    match settings_path() {
        Some(path) => load_settings_from(&path),
        None => AppSettings::default(),
    }
}
