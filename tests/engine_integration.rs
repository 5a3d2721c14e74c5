//! End-to-end behaviour of the engine as the audio driver and UI see it.

use approx::assert_abs_diff_eq;
use pitchloop::audio_engine::{AudioEngine, EngineConfig};
use pitchloop::controller::EngineController;
use pitchloop::monitor::LooperMonitor;
use pitchloop::LooperState;
use rand::Rng;

const BLOCK: usize = 100;
// 1000 Hz at 60 bpm: one beat per 10 blocks, one bar per 40
const SAMPLE_RATE: u32 = 1000;

fn config() -> EngineConfig {
    EngineConfig {
        sample_rate: SAMPLE_RATE,
        bpm: 60.0,
        beats_per_bar: 4,
        num_tracks: 2,
        max_loop_seconds: 10,
        pitch_window: 64,
        crossfade: 64,
        ..EngineConfig::default()
    }
}

fn signal(frame: usize) -> f32 {
    (frame as f32 * 0.05).sin() * 0.8
}

struct Rig {
    engine: AudioEngine,
    controller: EngineController,
    monitor: LooperMonitor,
    frame: usize,
    output: Vec<f32>,
}

impl Rig {
    fn new(config: &EngineConfig) -> Self {
        let (engine, controller, monitor) = AudioEngine::build(config);
        Self {
            engine,
            controller,
            monitor,
            frame: 0,
            output: vec![0.0; BLOCK],
        }
    }

    fn block(&mut self) {
        let input: Vec<f32> = (self.frame..self.frame + BLOCK).map(signal).collect();
        self.engine.process_buffer(&input, &mut self.output);
        self.frame += BLOCK;
    }

    fn blocks(&mut self, n: usize) {
        for _ in 0..n {
            self.block();
        }
    }
}

#[test]
fn record_one_bar_then_play_it_back() {
    let mut rig = Rig::new(&config());

    rig.controller.request_record(0).unwrap();
    rig.block(); // bar at frame 0 starts the recording
    assert_eq!(rig.controller.state(0).unwrap(), LooperState::Recording);

    rig.blocks(20);
    rig.controller.request_stop(0).unwrap();
    rig.blocks(19);
    assert_eq!(rig.engine.loopers()[0].num_beats(), 3);

    rig.block(); // bar at frame 4000
    let track = rig.engine.loopers()[0].transport();
    assert_eq!(track.state(), LooperState::Stopped);
    assert_eq!(track.end_point(), 4000);
    assert_eq!(track.num_beats(), 4);

    rig.controller.request_play(0).unwrap();
    rig.blocks(39);
    assert_eq!(rig.controller.state(0).unwrap(), LooperState::PlayQueued);

    rig.block(); // bar at frame 8000
    assert_eq!(rig.controller.state(0).unwrap(), LooperState::Playing);
    assert_eq!(rig.engine.loopers()[0].transport().end_point(), 4000);

    // zero shift: the loop comes back one 64-sample window late
    for (k, sample) in rig.output.iter().enumerate().skip(64) {
        assert_abs_diff_eq!(*sample, signal(k - 64), epsilon = 1e-5);
    }
}

#[test]
fn playback_wraps_on_the_bar_after_the_loop_ends() {
    let mut rig = Rig::new(&config());
    rig.controller.request_record(0).unwrap();
    rig.blocks(20);
    rig.controller.request_stop(0).unwrap();
    rig.blocks(21); // stops on the bar at block 40
    rig.controller.request_play(0).unwrap();
    rig.blocks(40); // plays from the bar at block 80

    rig.blocks(39);
    assert_eq!(rig.engine.loopers()[0].transport().play_point(), 4000);
    rig.block(); // bar at block 120, four beats played
    let track = rig.engine.loopers()[0].transport();
    assert_eq!(track.play_point(), BLOCK);
    assert_eq!(track.played_beats(), 0);
}

#[test]
fn progress_reports_stay_in_range_and_only_while_playing() {
    let mut rig = Rig::new(&config());
    rig.blocks(40);
    assert_eq!(rig.monitor.poll(), 0);

    rig.controller.request_record(0).unwrap();
    rig.blocks(20); // recording from the bar at block 40
    rig.controller.request_stop(0).unwrap();
    rig.blocks(21); // stopped on the bar at block 80
    rig.monitor.poll();
    assert_eq!(rig.monitor.progress(0), Some(0.0));

    rig.controller.request_play(0).unwrap();
    rig.blocks(40); // playing from the bar at block 120
    let mut last = 0.0;
    for _ in 0..39 {
        rig.block();
        rig.monitor.poll();
        let progress = rig.monitor.progress(0).unwrap();
        assert!((0.0..=1.0).contains(&progress));
        assert!(progress >= last);
        last = progress;
    }
    assert_abs_diff_eq!(last, 1.0, epsilon = 1e-6);
    assert_eq!(rig.monitor.progress(1), Some(0.0));

    let messages: Vec<String> = rig.monitor.status_log().map(|l| l.message.clone()).collect();
    assert_eq!(
        messages,
        vec![
            "Looper 0: Stopped -> Record queued",
            "Looper 0: Record queued -> Recording",
            "Looper 0: stop recording on bar",
            "Looper 0: Recording -> Stopped",
            "Looper 0: Stopped -> Play queued",
            "Looper 0: Play queued -> Playing",
        ]
    );
}

#[test]
fn recording_never_runs_past_capacity() {
    let config = EngineConfig {
        max_loop_seconds: 1,
        ..config()
    };
    let (mut engine, mut controller, _monitor) = AudioEngine::build(&config);
    controller.request_record(1).unwrap();

    let mut rng = rand::thread_rng();
    let mut output = vec![0.0; 300];
    for _ in 0..200 {
        let len = rng.gen_range(50..=300);
        let input = vec![0.25; len];
        engine.process_buffer(&input, &mut output[..len]);
        let track = engine.loopers()[1].transport();
        assert!(track.last_written() <= track.capacity());
    }
    let track = engine.loopers()[1].transport();
    assert_eq!(track.state(), LooperState::Recording);
    assert_eq!(track.last_written(), 1000);
    assert!(track.recorded().iter().all(|s| *s == 0.25));
}

#[test]
fn repeated_play_request_changes_nothing() {
    let mut rig = Rig::new(&config());
    rig.controller.request_play(1).unwrap();
    rig.block();
    rig.blocks(5);
    let before = rig.engine.loopers()[1].transport().play_point();

    rig.controller.request_play(1).unwrap();
    rig.block();
    let track = rig.engine.loopers()[1].transport();
    assert_eq!(track.state(), LooperState::Playing);
    assert_eq!(track.play_point(), before + BLOCK);
}

#[test]
fn loop_length_and_tempo_commands_reach_the_tracks() {
    let mut rig = Rig::new(&config());
    rig.controller.set_loop_length(0, 4.0).unwrap();
    rig.controller.set_loop_length(0, 0.5).unwrap();
    rig.controller.set_tempo(120.0).unwrap();
    rig.block();

    assert_eq!(rig.engine.loopers()[0].num_beats(), 8);
    assert_eq!(rig.controller.track(0).unwrap().shared_state.get_length_in_beats(), 8);
    assert_eq!(rig.engine.loopers()[1].num_beats(), 4);
    for looper in rig.engine.loopers() {
        assert_eq!(looper.frames_per_beat(), 500.0);
    }

    rig.controller.set_loop_length(0, 0.1).unwrap();
    rig.block();
    assert_eq!(rig.engine.loopers()[0].num_beats(), 4);
}

#[test]
fn stop_all_stops_every_track() {
    let mut rig = Rig::new(&config());
    rig.controller.request_play(0).unwrap();
    rig.controller.request_play(1).unwrap();
    rig.block();
    rig.controller.stop_all().unwrap();
    rig.block();
    for looper in rig.engine.loopers() {
        assert_eq!(looper.state(), LooperState::Stopped);
    }
}

#[test]
fn full_event_queue_drops_without_stalling() {
    let config = EngineConfig {
        event_queue_capacity: 4,
        ..config()
    };
    let mut rig = Rig::new(&config);
    rig.controller.request_play(0).unwrap();
    rig.blocks(50);

    assert!(rig.monitor.dropped_events() > 0);
    assert_eq!(rig.monitor.poll(), 4);
    rig.block();
    assert_eq!(rig.monitor.poll(), 1);
}

#[test]
fn pitch_changes_apply_from_the_next_block() {
    let mut rig = Rig::new(&config());
    rig.controller.set_pitch(0, 12.0).unwrap();
    rig.controller.set_pitch_window(0, 4096).unwrap();
    rig.controller.set_crossfade(0, 8192).unwrap();

    let params = rig.engine.loopers()[0].pitch_params();
    assert_abs_diff_eq!(params.semitones(), 12.0, epsilon = 1e-4);
    assert_eq!(params.window(), 4096);
    assert_eq!(params.crossfade(), 4096);
    assert_abs_diff_eq!(rig.engine.loopers()[1].pitch_params().semitones(), 0.0, epsilon = 1e-4);
}
