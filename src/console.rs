// src/console.rs

//! Line commands typed at the terminal, standing in for the UI buttons.

use crate::controller::EngineController;
use crate::error::ControlError;
use std::str::FromStr;

pub const HELP: &str = "\
commands:
  rec <track>             queue recording (or stop recording on the next bar)
  play <track>            queue playback
  stop <track>            stop a track
  stopall                 stop every track
  len <track> <scale>     scale the loop length, e.g. 0.5 or 2
  pitch <track> <semis>   pitch shift in semitones (-24..24)
  window <track> <n>      grain window in samples
  xfade <track> <n>       crossfade length in samples
  tempo <bpm>             change tempo
  status                  show track states
  quit";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    Record(usize),
    Play(usize),
    Stop(usize),
    StopAll,
    LoopLength(usize, f32),
    Pitch(usize, f32),
    Window(usize, u32),
    Crossfade(usize, u32),
    Tempo(f32),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn arg<T: FromStr>(parts: &[&str], index: usize, what: &str) -> Result<T, ParseError> {
    let raw = parts
        .get(index)
        .ok_or_else(|| ParseError(format!("missing {}", what)))?;
    raw.parse()
        .map_err(|_| ParseError(format!("bad {}: {}", what, raw)))
}

/// Parses one line. Blank lines give `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, ParseError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&verb) = parts.first() else {
        return Ok(None);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "rec" | "r" => ConsoleCommand::Record(arg(&parts, 1, "track")?),
        "play" | "p" => ConsoleCommand::Play(arg(&parts, 1, "track")?),
        "stop" | "s" => ConsoleCommand::Stop(arg(&parts, 1, "track")?),
        "stopall" => ConsoleCommand::StopAll,
        "len" => ConsoleCommand::LoopLength(arg(&parts, 1, "track")?, arg(&parts, 2, "scale")?),
        "pitch" => ConsoleCommand::Pitch(arg(&parts, 1, "track")?, arg(&parts, 2, "semitones")?),
        "window" => ConsoleCommand::Window(arg(&parts, 1, "track")?, arg(&parts, 2, "samples")?),
        "xfade" => ConsoleCommand::Crossfade(arg(&parts, 1, "track")?, arg(&parts, 2, "samples")?),
        "tempo" => ConsoleCommand::Tempo(arg(&parts, 1, "bpm")?),
        "status" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "q" | "exit" => ConsoleCommand::Quit,
        other => return Err(ParseError(format!("unknown command: {}", other))),
    };
    Ok(Some(command))
}

/// Forwards a parsed command to the engine. Commands with no engine
/// counterpart (`Status`, `Help`, `Quit`) are left to the caller.
pub fn apply(command: ConsoleCommand, controller: &mut EngineController) -> Result<(), ControlError> {
    match command {
        ConsoleCommand::Record(track) => controller.request_record(track),
        ConsoleCommand::Play(track) => controller.request_play(track),
        ConsoleCommand::Stop(track) => controller.request_stop(track),
        ConsoleCommand::StopAll => controller.stop_all(),
        ConsoleCommand::LoopLength(track, scale) => controller.set_loop_length(track, scale),
        ConsoleCommand::Pitch(track, semitones) => controller.set_pitch(track, semitones),
        ConsoleCommand::Window(track, samples) => controller.set_pitch_window(track, samples),
        ConsoleCommand::Crossfade(track, samples) => controller.set_crossfade(track, samples),
        ConsoleCommand::Tempo(bpm) => controller.set_tempo(bpm),
        ConsoleCommand::Status | ConsoleCommand::Help | ConsoleCommand::Quit => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_track_commands() {
        assert_eq!(parse_line("rec 0"), Ok(Some(ConsoleCommand::Record(0))));
        assert_eq!(parse_line("  P 3 "), Ok(Some(ConsoleCommand::Play(3))));
        assert_eq!(
            parse_line("len 1 0.5"),
            Ok(Some(ConsoleCommand::LoopLength(1, 0.5)))
        );
        assert_eq!(
            parse_line("pitch 0 -12"),
            Ok(Some(ConsoleCommand::Pitch(0, -12.0)))
        );
        assert_eq!(
            parse_line("xfade 2 256"),
            Ok(Some(ConsoleCommand::Crossfade(2, 256)))
        );
        assert_eq!(parse_line("q"), Ok(Some(ConsoleCommand::Quit)));
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(parse_line("   "), Ok(None));
    }

    #[test]
    fn bad_input_is_explained() {
        assert_eq!(
            parse_line("rec"),
            Err(ParseError("missing track".to_string()))
        );
        assert_eq!(
            parse_line("window 0 big"),
            Err(ParseError("bad samples: big".to_string()))
        );
        assert_eq!(
            parse_line("jump 1"),
            Err(ParseError("unknown command: jump".to_string()))
        );
    }
}
