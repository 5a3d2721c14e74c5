//! Beat-quantized audio looper with a granular pitch shifter on each track.
//!
//! The audio thread owns an [`audio_engine::AudioEngine`]; the UI side talks to
//! it through an [`controller::EngineController`] and reads events back with a
//! [`monitor::LooperMonitor`]. Nothing on the audio thread blocks or allocates.

pub mod audio_engine;
pub mod clock;
pub mod console;
pub mod controller;
pub mod error;
pub mod fx_components;
pub mod looper;
pub mod monitor;
pub mod settings;

#[cfg(feature = "audio-io")]
pub mod audio_device;
#[cfg(feature = "audio-io")]
pub mod audio_io;

pub use audio_engine::{AudioEngine, EngineConfig};
pub use controller::EngineController;
pub use error::ControlError;
pub use looper::LooperState;
pub use monitor::LooperMonitor;
