// The authoritative in-memory holder of the pattern grid.
//
// Mutations that name a step or a track that doesn't exist are rejected with an
// error and change nothing. Reads never fail: asking about a step past the end of
// the grid just finds nothing playing there.

use tracing::warn;

use crate::config::validate_bpm;
use crate::error::EngineError;
use crate::pipeline::pattern::{Pattern, Step, Track};
use crate::shared::TrackId;

/// One track firing at a step, with everything a sink needs to voice it.
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub track_id: TrackId,
    pub instrument: String,
    pub velocity: f32,
    pub gain: f32,
}

#[derive(Clone, Debug)]
pub struct PatternStore {
    pattern: Pattern,
    next_id: u64,
}

impl PatternStore {
    /// Takes ownership of a pattern. Rejects one whose tracks don't all match its
    /// step count.
    pub fn new(pattern: Pattern) -> Result<Self, EngineError> {
        pattern.validate()?;
        // skip past any "track-N" ids the pattern already uses
        let next_id = pattern
            .tracks
            .iter()
            .filter_map(|t| t.id.as_str().strip_prefix("track-")?.parse::<u64>().ok())
            .max()
            .map_or(0, |n| n + 1);
        Ok(Self { pattern, next_id })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn into_pattern(self) -> Pattern {
        self.pattern
    }

    pub fn step_count(&self) -> usize {
        self.pattern.step_count
    }

    pub fn bpm(&self) -> f32 {
        self.pattern.bpm
    }

    pub fn set_bpm(&mut self, bpm: f32) -> Result<(), EngineError> {
        validate_bpm(bpm)?;
        self.pattern.bpm = bpm;
        Ok(())
    }

    pub fn tracks(&self) -> &[Track] {
        &self.pattern.tracks
    }

    pub fn track(&self, id: &TrackId) -> Option<&Track> {
        self.pattern.track(id)
    }

    pub fn len(&self) -> usize {
        self.pattern.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.tracks.is_empty()
    }

    /// Appends a track with every step off.
    pub fn add_track(&mut self, name: &str, instrument: &str) -> TrackId {
        let id = TrackId(format!("track-{}", self.next_id));
        self.next_id += 1;
        self.pattern
            .tracks
            .push(Track::new(id.clone(), name, instrument, self.pattern.step_count));
        id
    }

    /// Removes a track. Unknown ids are ignored and return `None`.
    pub fn remove_track(&mut self, id: &TrackId) -> Option<Track> {
        let index = self.pattern.tracks.iter().position(|t| &t.id == id)?;
        Some(self.pattern.tracks.remove(index))
    }

    /// Flips one step and returns its new state.
    pub fn toggle_step(&mut self, id: &TrackId, step: usize) -> Result<bool, EngineError> {
        let s = self.step_mut(id, step)?;
        s.active = !s.active;
        Ok(s.active)
    }

    /// Sets a step's velocity; anything above zero also switches it on.
    pub fn set_velocity(&mut self, id: &TrackId, step: usize, velocity: f32) -> Result<(), EngineError> {
        let s = self.step_mut(id, step)?;
        let velocity = velocity.clamp(0.0, 1.0);
        if velocity > 0.0 {
            s.velocity = velocity;
            s.active = true;
        } else {
            s.active = false;
        }
        Ok(())
    }

    pub fn set_mute(&mut self, id: &TrackId, muted: bool) -> Result<(), EngineError> {
        self.track_mut(id)?.muted = muted;
        Ok(())
    }

    // only the named track changes; the other tracks' mute flags are left alone
    pub fn set_solo(&mut self, id: &TrackId, solo: bool) -> Result<(), EngineError> {
        self.track_mut(id)?.solo = solo;
        Ok(())
    }

    pub fn set_gain(&mut self, id: &TrackId, gain: f32) -> Result<(), EngineError> {
        self.track_mut(id)?.gain = gain.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn set_color(&mut self, id: &TrackId, color: &str) -> Result<(), EngineError> {
        self.track_mut(id)?.color = color.to_owned();
        Ok(())
    }

    pub fn rename_track(&mut self, id: &TrackId, name: &str) -> Result<(), EngineError> {
        self.track_mut(id)?.name = name.to_owned();
        Ok(())
    }

    pub fn clear_track(&mut self, id: &TrackId) -> Result<(), EngineError> {
        for step in &mut self.track_mut(id)?.steps {
            step.active = false;
        }
        Ok(())
    }

    /// Switches every step of every track off. Tracks and their settings stay.
    pub fn clear_all(&mut self) {
        for track in &mut self.pattern.tracks {
            for step in &mut track.steps {
                step.active = false;
            }
        }
    }

    /// Tracks that fire at `step`, in insertion order, with mute and solo applied.
    pub fn tracks_active_at_step(&self, step: usize) -> Vec<TrackId> {
        self.audible_at(step).map(|t| t.id.clone()).collect()
    }

    pub fn hits_at_step(&self, step: usize) -> Vec<Hit> {
        self.audible_at(step)
            .map(|t| Hit {
                track_id: t.id.clone(),
                instrument: t.instrument.clone(),
                velocity: t.steps[step].velocity,
                gain: t.gain,
            })
            .collect()
    }

    fn audible_at(&self, step: usize) -> impl Iterator<Item = &Track> + '_ {
        let any_solo = self.pattern.any_solo();
        self.pattern
            .tracks
            .iter()
            .filter(move |t| t.is_on(step) && t.is_audible(any_solo))
    }

    fn track_mut(&mut self, id: &TrackId) -> Result<&mut Track, EngineError> {
        match self.pattern.track_mut(id) {
            Some(track) => Ok(track),
            None => {
                warn!(track = %id, "rejected edit of unknown track");
                Err(EngineError::UnknownTrack(id.clone()))
            }
        }
    }

    fn step_mut(&mut self, id: &TrackId, step: usize) -> Result<&mut Step, EngineError> {
        let step_count = self.pattern.step_count;
        if step >= step_count {
            warn!(track = %id, step, step_count, "rejected out of range step");
            return Err(EngineError::StepOutOfRange {
                index: step,
                step_count,
            });
        }
        let track = self.track_mut(id)?;
        let found = track.steps.len();
        track.steps.get_mut(step).ok_or_else(|| EngineError::StepCountMismatch {
            track: id.clone(),
            expected: step_count,
            found,
        })
    }
}
