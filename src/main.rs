use std::path::PathBuf;
use std::time::Duration;

use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{info, warn};

use stepseq::audio::{self, AudioHandle};
use stepseq::audio_api::{AudioCommand, TrackTriggered, TriggerSink};
use stepseq::pipeline::persistence;
use stepseq::shared::InputEvent;
use stepseq::tui::{self, input, mode::TuiState, view};
use stepseq::{EngineConfig, EngineError, Pattern, PatternStore, PlaybackCoordinator, TransportClock};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let project_dir: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    stepseq::trace::setup(&persistence::log_file_path(&project_dir))?;
    info!(project = %project_dir.display(), "starting");

    let config = persistence::load_config(&project_dir)?;
    // a pattern we couldn't read is moved aside before anything can save over it;
    // if even that fails, saving stays off for the session
    let mut can_save = true;
    let mut load_status = None;
    let pattern = match persistence::load_pattern(&project_dir, config.step_count) {
        Ok(Some(pattern)) => pattern,
        Ok(None) => demo_pattern(&config)?,
        Err(e) => {
            warn!("{e:#}, starting from the demo pattern");
            load_status = Some(match persistence::set_aside_pattern(&project_dir) {
                Ok(backup) => format!("could not load pattern ({e}), kept it as {}", backup.display()),
                Err(move_err) => {
                    warn!("{move_err:#}");
                    can_save = false;
                    format!("could not load pattern ({e}), saving disabled")
                }
            });
            demo_pattern(&config)?
        }
    };

    // no output device just means a silent sequencer
    let audio = match audio::start_audio() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("audio disabled: {e:#}");
            None
        }
    };
    let mut audio_sink = audio.as_ref().map(AudioHandle::sink);
    let sink = move |event: &TrackTriggered| {
        if let Some(sink) = &mut audio_sink {
            sink.trigger(event);
        }
    };

    let mut coordinator = PlaybackCoordinator::new(
        PatternStore::new(pattern)?,
        TransportClock::new(config.subdivisions_per_beat),
        sink,
    );

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let frame_rate = Duration::from_millis(16); // ~60fps
    let mut tui_state = TuiState {
        status: load_status,
        ..TuiState::default()
    };

    loop {
        let ds = coordinator.display_state();
        tui_state.sync(&ds);

        term.draw(|frame| {
            view::render(frame, frame.area(), &ds, &tui_state);
        })?;

        let events = input::poll_input(frame_rate, &mut tui_state)?;
        for event in events {
            match event {
                InputEvent::Quit => {
                    // save before quitting
                    coordinator.stop();
                    if can_save {
                        if let Err(e) = persistence::save_pattern(&project_dir, &coordinator.pattern()) {
                            warn!("{e:#}");
                        }
                    }
                    drop(term);
                    return Ok(());
                }
                InputEvent::Save => {
                    tui_state.status = Some(if !can_save {
                        "saving disabled, the unreadable pattern file is still in place".to_owned()
                    } else {
                        match persistence::save_pattern(&project_dir, &coordinator.pattern()) {
                            Ok(()) => "saved".to_owned(),
                            Err(e) => format!("save failed: {e:#}"),
                        }
                    });
                }
                event => {
                    let was_playing = coordinator.is_playing();
                    tui_state.status = match tui::apply(&mut coordinator, &event) {
                        Ok(()) => None,
                        Err(e) => {
                            warn!(%e, "input rejected");
                            Some(e.to_string())
                        }
                    };
                    if was_playing && !coordinator.is_playing() {
                        if let Some(audio) = &audio {
                            audio.send(AudioCommand::Silence);
                        }
                    }
                }
            }
        }
    }
}

// what a fresh project starts with
fn demo_pattern(config: &EngineConfig) -> Result<Pattern, EngineError> {
    config.validate()?;
    let mut store = PatternStore::new(Pattern::new("Demo Beat", config.bpm, config.step_count)?)?;
    let n = config.step_count;
    let parts: [(&str, &str, Vec<usize>); 4] = [
        ("Kick", "kick", (0..n).step_by(4).collect()),
        ("Snare", "snare", (4..n).step_by(8).collect()),
        ("Hi-Hat", "hihat", (2..n).step_by(4).collect()),
        ("Bass", "bass", (0..n).filter(|s| s % 8 == 0 || s % 8 == 3).collect()),
    ];
    for (name, instrument, steps) in parts {
        let id = store.add_track(name, instrument);
        for step in steps {
            store.toggle_step(&id, step)?;
        }
    }
    Ok(store.into_pattern())
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
