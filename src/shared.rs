// Types shared between the engine and whatever host renders it.
//
// The host (the terminal demo here) never looks at the store directly while drawing:
// each frame it asks the coordinator for a `DisplayState` and draws that.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_STEP_COUNT: usize = 16;
pub const SUBDIVISIONS_PER_BEAT: u32 = 4; // sixteenth notes
pub const DEFAULT_BPM: f32 = 120.0;
pub const MIN_BPM: f32 = 60.0;
pub const MAX_BPM: f32 = 200.0;

/// Stable identifier of a track within a pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

// semantic events, already resolved from raw keys by the tui
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    PlayPress,
    ToggleStep { row: usize, step: usize },
    ToggleMute(usize),
    ToggleSolo(usize),
    AdjustGain { row: usize, delta: f32 },
    AdjustBpm(f32),
    AddTrack,
    RemoveTrack(usize),
    ClearTrack(usize),
    Save,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedState {
    Off,
    On,
    Playhead, // empty step under the playhead
    Hit,      // active step under the playhead
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackRow {
    pub id: TrackId,
    pub name: String,
    pub instrument: String,
    pub color: String,
    pub muted: bool,
    pub solo: bool,
    pub audible: bool, // after the solo overlay is applied
    pub gain: f32,
    pub leds: Vec<LedState>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DisplayState {
    pub name: String,
    pub bpm: f32,
    pub playing: bool,
    pub playing_step: Option<usize>,
    pub step_count: usize,
    pub rows: Vec<TrackRow>,
}
