// The data the store finagles. All of it is plain values: cloning a Pattern
// clones every track and every step.
//
// "pattern": the whole grid, every track sharing one step count and one tempo.
// "track": one instrument's row of steps.
// "step": one slot in the row (a sixteenth note at the default subdivision).

use serde::{Deserialize, Serialize};

use crate::config::validate_bpm;
use crate::error::EngineError;
use crate::shared::TrackId;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub active: bool,
    pub velocity: f32, // 0.0 to 1.0, kept while the step is off so a re-toggle restores it
}

impl Default for Step {
    fn default() -> Self {
        Self {
            active: false,
            velocity: 1.0,
        }
    }
}

impl Step {
    /// Velocity the step fires with, 0.0 when it is off.
    pub fn level(&self) -> f32 {
        if self.active { self.velocity } else { 0.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub instrument: String, // opaque to the engine, sinks pick a sound from it
    pub color: String,      // same, for renderers
    pub steps: Vec<Step>,
    pub muted: bool,
    pub solo: bool,
    pub gain: f32, // 0.0 to 1.0
}

impl Track {
    pub fn new(id: TrackId, name: &str, instrument: &str, step_count: usize) -> Self {
        Self {
            id,
            name: name.to_owned(),
            instrument: instrument.to_owned(),
            color: default_color(instrument).to_owned(),
            steps: vec![Step::default(); step_count],
            muted: false,
            solo: false,
            gain: 0.8,
        }
    }

    pub fn is_on(&self, step: usize) -> bool {
        self.steps.get(step).is_some_and(|s| s.active)
    }

    /// Whether the track sounds at all once the solo overlay is applied: while any
    /// track is soloed only soloed tracks play, whatever their own mute flag says.
    pub fn is_audible(&self, any_solo: bool) -> bool {
        if any_solo { self.solo } else { !self.muted }
    }

    pub fn active_steps(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, _)| i)
    }
}

// one color per instrument family, renderers may override it
fn default_color(instrument: &str) -> &'static str {
    match instrument {
        "kick" => "#ef4444",
        "snare" => "#f59e0b",
        "hihat" | "hat" => "#10b981",
        "bass" => "#3b82f6",
        "lead" => "#8b5cf6",
        _ => "#6b7280",
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    pub bpm: f32,
    pub step_count: usize,
    pub tracks: Vec<Track>,
}

impl Pattern {
    pub fn new(name: &str, bpm: f32, step_count: usize) -> Result<Self, EngineError> {
        validate_bpm(bpm)?;
        if step_count == 0 {
            return Err(EngineError::ZeroSteps);
        }
        Ok(Self {
            name: name.to_owned(),
            bpm,
            step_count,
            tracks: Vec::new(),
        })
    }

    /// Checks what `new` checks plus that every track is exactly `step_count` long,
    /// since the fields are public and a pattern can be assembled by hand.
    pub fn validate(&self) -> Result<(), EngineError> {
        validate_bpm(self.bpm)?;
        if self.step_count == 0 {
            return Err(EngineError::ZeroSteps);
        }
        match self.tracks.iter().find(|t| t.steps.len() != self.step_count) {
            Some(t) => Err(EngineError::StepCountMismatch {
                track: t.id.clone(),
                expected: self.step_count,
                found: t.steps.len(),
            }),
            None => Ok(()),
        }
    }

    pub fn any_solo(&self) -> bool {
        self.tracks.iter().any(|t| t.solo)
    }

    pub fn track(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.id == id)
    }

    pub fn track_mut(&mut self, id: &TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| &t.id == id)
    }
}
