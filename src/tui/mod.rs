// Terminal front end for the demo binary. It renders a `DisplayState` each frame
// and turns key presses into edits on the coordinator.

pub mod input;
pub mod mode;
pub mod view;

use tracing::debug;

use crate::clock::Clock;
use crate::error::EngineError;
use crate::middle::PlaybackCoordinator;
use crate::pipeline::store::PatternStore;
use crate::shared::{InputEvent, MAX_BPM, MIN_BPM, TrackId};

const NEW_TRACK_INSTRUMENTS: [(&str, &str); 5] = [
    ("Kick", "kick"),
    ("Snare", "snare"),
    ("Hi-Hat", "hihat"),
    ("Bass", "bass"),
    ("Lead", "lead"),
];

fn row_id(store: &PatternStore, row: usize) -> Option<TrackId> {
    store.tracks().get(row).map(|t| t.id.clone())
}

/// Applies one input event. Events naming a row that no longer exists do nothing;
/// `Save` and `Quit` are the host's business and do nothing here either.
pub fn apply<C: Clock>(c: &mut PlaybackCoordinator<C>, event: &InputEvent) -> Result<(), EngineError> {
    debug!(?event, "input");
    match *event {
        InputEvent::PlayPress => c.toggle_play(),
        InputEvent::AdjustBpm(delta) => {
            let bpm = (c.bpm() + delta).clamp(MIN_BPM, MAX_BPM);
            c.set_tempo(bpm)
        }
        InputEvent::AddTrack => {
            c.edit(|s| {
                let (name, instrument) = NEW_TRACK_INSTRUMENTS[s.len() % NEW_TRACK_INSTRUMENTS.len()];
                s.add_track(name, instrument);
            });
            Ok(())
        }
        InputEvent::ToggleStep { row, step } => c.edit(|s| match row_id(s, row) {
            Some(id) => s.toggle_step(&id, step).map(drop),
            None => Ok(()),
        }),
        InputEvent::ToggleMute(row) => c.edit(|s| match row_id(s, row) {
            Some(id) => {
                let muted = s.tracks()[row].muted;
                s.set_mute(&id, !muted)
            }
            None => Ok(()),
        }),
        InputEvent::ToggleSolo(row) => c.edit(|s| match row_id(s, row) {
            Some(id) => {
                let solo = s.tracks()[row].solo;
                s.set_solo(&id, !solo)
            }
            None => Ok(()),
        }),
        InputEvent::AdjustGain { row, delta } => c.edit(|s| match row_id(s, row) {
            Some(id) => {
                let gain = s.tracks()[row].gain;
                s.set_gain(&id, gain + delta)
            }
            None => Ok(()),
        }),
        InputEvent::ClearTrack(row) => c.edit(|s| match row_id(s, row) {
            Some(id) => s.clear_track(&id),
            None => Ok(()),
        }),
        InputEvent::RemoveTrack(row) => {
            c.edit(|s| {
                if let Some(id) = row_id(s, row) {
                    s.remove_track(&id);
                }
            });
            Ok(())
        }
        InputEvent::Save | InputEvent::Quit => Ok(()),
    }
}
