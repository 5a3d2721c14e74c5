use pitchloop::audio_engine::{AudioEngine, EngineConfig};
use pitchloop::console::{self, ConsoleCommand, HELP};
use pitchloop::controller::EngineController;
use pitchloop::monitor::LooperMonitor;
use pitchloop::{audio_device, audio_io, settings};
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const MONITOR_INTERVAL: Duration = Duration::from_millis(50);

fn print_status(controller: &EngineController, monitor: &Mutex<LooperMonitor>) {
    let monitor = match monitor.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    for track in 0..controller.num_tracks() {
        if let Ok(handle) = controller.track(track) {
            let state = handle.shared_state.get();
            let pending = if state.is_queued() || handle.shared_state.is_stop_queued() {
                "*"
            } else {
                " "
            };
            println!(
                "track {}: {}{:<13} {:>3} beats  {:>5.1}%  pitch {:+.1}",
                track,
                pending,
                state.label(),
                handle.shared_state.get_length_in_beats(),
                monitor.progress(track).unwrap_or(0.0) * 100.0,
                handle.pitch_params.semitones(),
            );
        }
    }
    for line in monitor.status_log().rev().take(5) {
        println!("  [{}] {}", line.at.format("%H:%M:%S"), line.message);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if std::env::args().any(|arg| arg == "--list-devices") {
        for line in audio_device::describe_devices()? {
            println!("{}", line);
        }
        return Ok(());
    }

    let app_settings = settings::load_settings();
    if settings::settings_path().is_some_and(|path| !path.exists()) {
        settings::save_settings(&app_settings);
    }

    let setup = audio_io::configure(&app_settings)?;
    let config = EngineConfig::from_settings(&app_settings, setup.sample_rate());
    tracing::info!(
        "{} tracks, {} s per loop, {} bpm in {}/4",
        config.num_tracks,
        config.max_loop_seconds,
        config.bpm,
        config.beats_per_bar
    );

    let (engine, mut controller, monitor) = AudioEngine::build(&config);
    let xrun_count = Arc::new(AtomicUsize::new(0));
    let _streams = setup.run(engine, xrun_count.clone())?;

    let monitor = Arc::new(Mutex::new(monitor));
    let running = Arc::new(AtomicBool::new(true));
    let monitor_thread = {
        let monitor = monitor.clone();
        let running = running.clone();
        thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                if let Ok(mut monitor) = monitor.lock() {
                    monitor.poll();
                }
                thread::sleep(MONITOR_INTERVAL);
            }
        })
    };

    println!("{}", HELP);
    for line in io::stdin().lock().lines() {
        let line = line?;
        match console::parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Quit)) => break,
            Ok(Some(ConsoleCommand::Help)) => println!("{}", HELP),
            Ok(Some(ConsoleCommand::Status)) => print_status(&controller, &monitor),
            Ok(Some(command)) => {
                if let Err(e) = console::apply(command, &mut controller) {
                    tracing::warn!("{}", e);
                }
            }
            Err(e) => println!("{} (type help)", e),
        }
    }

    running.store(false, Ordering::Relaxed);
    if let Err(e) = monitor_thread.join() {
        tracing::error!("Error joining monitor thread: {:?}", e);
    }
    let xruns = xrun_count.load(Ordering::Relaxed);
    if xruns > 0 {
        tracing::warn!("{} stream errors during the session", xruns);
    }
    tracing::info!("Audio engine stopped.");
    Ok(())
}
