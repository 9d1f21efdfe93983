// to be called on startup and quit; writes the pattern out as a plain JSON
// document so it can be reloaded later (or read by anything else that speaks JSON)
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::pipeline::pattern::{Pattern, Step, Track};
use crate::shared::TrackId;

const STATE_DIR: &str = ".stepseq";
const PATTERN_FILE: &str = "pattern.json";
const PATTERN_BACKUP_FILE: &str = "pattern.json.bak";
const CONFIG_FILE: &str = "config.json";
const LOG_FILE: &str = "stepseq.log";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternDocument {
    pub name: String,
    pub bpm: f32,
    pub tracks: Vec<TrackDocument>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackDocument {
    pub id: TrackId,
    pub name: String,
    pub instrument: String,
    pub pattern: Vec<f32>, // one velocity per step, 0 = off
    pub color: String,
    pub volume: f32,
    pub muted: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub solo: bool,
}

impl From<&Pattern> for PatternDocument {
    fn from(pattern: &Pattern) -> Self {
        Self {
            name: pattern.name.clone(),
            bpm: pattern.bpm,
            tracks: pattern.tracks.iter().map(TrackDocument::from).collect(),
        }
    }
}

impl From<&Track> for TrackDocument {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            name: track.name.clone(),
            instrument: track.instrument.clone(),
            pattern: track.steps.iter().map(Step::level).collect(),
            color: track.color.clone(),
            volume: track.gain,
            muted: track.muted,
            solo: track.solo,
        }
    }
}

impl PatternDocument {
    /// Rebuilds the pattern. The step count comes from the tracks (which must all
    /// agree); an empty document falls back to `default_step_count`.
    pub fn into_pattern(self, default_step_count: usize) -> Result<Pattern, EngineError> {
        let step_count = self
            .tracks
            .first()
            .map_or(default_step_count, |t| t.pattern.len());
        let mut pattern = Pattern::new(&self.name, self.bpm, step_count)?;

        for doc in self.tracks {
            if doc.pattern.len() != step_count {
                return Err(EngineError::StepCountMismatch {
                    track: doc.id,
                    expected: step_count,
                    found: doc.pattern.len(),
                });
            }
            let steps = doc
                .pattern
                .iter()
                .map(|&v| {
                    let v = v.clamp(0.0, 1.0);
                    if v > 0.0 {
                        Step { active: true, velocity: v }
                    } else {
                        Step::default()
                    }
                })
                .collect();
            pattern.tracks.push(Track {
                id: doc.id,
                name: doc.name,
                instrument: doc.instrument,
                color: doc.color,
                steps,
                muted: doc.muted,
                solo: doc.solo,
                gain: doc.volume.clamp(0.0, 1.0),
            });
        }
        Ok(pattern)
    }
}

pub fn to_json(pattern: &Pattern) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&PatternDocument::from(pattern))?)
}

pub fn from_json(json: &str, default_step_count: usize) -> anyhow::Result<Pattern> {
    let doc: PatternDocument = serde_json::from_str(json).context("malformed pattern document")?;
    Ok(doc.into_pattern(default_step_count)?)
}

// <project_dir>/.stepseq/
pub fn state_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(STATE_DIR)
}

pub fn log_file_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(LOG_FILE)
}

/// `Ok(None)` when nothing has been saved yet.
pub fn load_pattern(project_dir: &Path, default_step_count: usize) -> anyhow::Result<Option<Pattern>> {
    let path = state_dir(project_dir).join(PATTERN_FILE);
    if !path.exists() {
        debug!(path = %path.display(), "no saved pattern");
        return Ok(None);
    }
    let data = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let pattern = from_json(&data, default_step_count)
        .with_context(|| format!("failed to load {}", path.display()))?;
    info!(path = %path.display(), tracks = pattern.tracks.len(), "loaded pattern");
    Ok(Some(pattern))
}

// Save the pattern to disk, making the files if they don't exist already
pub fn save_pattern(project_dir: &Path, pattern: &Pattern) -> anyhow::Result<()> {
    let dir = state_dir(project_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(PATTERN_FILE);
    std::fs::write(&path, to_json(pattern)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "saved pattern");
    Ok(())
}

/// Moves a pattern file that failed to load to `pattern.json.bak`, so the next save
/// can't overwrite it. Replaces any older backup.
pub fn set_aside_pattern(project_dir: &Path) -> anyhow::Result<PathBuf> {
    let dir = state_dir(project_dir);
    let from = dir.join(PATTERN_FILE);
    let to = dir.join(PATTERN_BACKUP_FILE);
    std::fs::rename(&from, &to)
        .with_context(|| format!("failed to move {} to {}", from.display(), to.display()))?;
    warn!(path = %to.display(), "unreadable pattern set aside");
    Ok(to)
}

/// Reads `<project_dir>/.stepseq/config.json`, defaults when it is missing.
pub fn load_config(project_dir: &Path) -> anyhow::Result<EngineConfig> {
    let path = state_dir(project_dir).join(CONFIG_FILE);
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    let data = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&data)
        .with_context(|| format!("malformed config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::store::PatternStore;

    fn demo() -> Pattern {
        let mut store = PatternStore::new(Pattern::new("Groove", 96.0, 8).unwrap()).unwrap();
        let kick = store.add_track("Kick", "kick");
        let hat = store.add_track("Hat", "hihat");
        store.toggle_step(&kick, 0).unwrap();
        store.set_velocity(&hat, 3, 0.25).unwrap();
        store.set_mute(&hat, true).unwrap();
        store.set_solo(&kick, true).unwrap();
        store.into_pattern()
    }

    #[test]
    fn document_uses_the_export_field_names() {
        let json = to_json(&demo()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["name"], "Groove");
        assert_eq!(value["bpm"], 96.0);
        let hat = &value["tracks"][1];
        assert_eq!(hat["id"], "track-1");
        assert_eq!(hat["instrument"], "hihat");
        assert_eq!(hat["muted"], true);
        assert_eq!(hat["volume"].as_f64().unwrap() as f32, 0.8);
        assert_eq!(hat["pattern"][3], 0.25);
        assert_eq!(hat["pattern"][0], 0.0);
        // solo is only written when set
        assert!(hat.get("solo").is_none());
        assert_eq!(value["tracks"][0]["solo"], true);
    }

    #[test]
    fn json_reloads_to_the_same_pattern() {
        let pattern = demo();
        let back = from_json(&to_json(&pattern).unwrap(), 16).unwrap();
        assert_eq!(back, pattern);
    }

    #[test]
    fn accepts_plain_on_off_documents() {
        let json = r##"{
            "name": "Beat",
            "bpm": 120,
            "tracks": [
                { "id": "k", "name": "Kick", "instrument": "kick",
                  "pattern": [1, 0, 0, 0, 1, 0, 0, 0],
                  "color": "#ef4444", "volume": 0.9, "muted": false }
            ]
        }"##;
        let pattern = from_json(json, 16).unwrap();
        assert_eq!(pattern.step_count, 8);
        let kick = &pattern.tracks[0];
        assert_eq!(kick.active_steps().collect::<Vec<_>>(), vec![0, 4]);
        assert!(!kick.solo);
    }

    #[test]
    fn empty_document_uses_default_step_count() {
        let json = r#"{ "name": "Empty", "bpm": 100, "tracks": [] }"#;
        assert_eq!(from_json(json, 12).unwrap().step_count, 12);
    }

    #[test]
    fn ragged_tracks_are_rejected() {
        let json = r#"{ "name": "Bad", "bpm": 120, "tracks": [
            { "id": "a", "name": "A", "instrument": "kick", "pattern": [1, 0, 0, 0], "color": "", "volume": 1, "muted": false },
            { "id": "b", "name": "B", "instrument": "kick", "pattern": [1, 0], "color": "", "volume": 1, "muted": false }
        ] }"#;
        let err = from_json(json, 16).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::StepCountMismatch { expected: 4, found: 2, .. })
        ));
    }

    #[test]
    fn save_then_load_from_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_pattern(dir.path(), 16).unwrap().is_none());

        let pattern = demo();
        save_pattern(dir.path(), &pattern).unwrap();
        assert!(dir.path().join(".stepseq").join("pattern.json").exists());

        let loaded = load_pattern(dir.path(), 16).unwrap().unwrap();
        assert_eq!(loaded, pattern);
    }

    #[test]
    fn corrupt_pattern_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(state_dir(dir.path())).unwrap();
        std::fs::write(state_dir(dir.path()).join("pattern.json"), "{ not json").unwrap();
        assert!(load_pattern(dir.path(), 16).is_err());
    }

    #[test]
    fn unreadable_pattern_survives_the_next_save() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(state_dir(dir.path())).unwrap();
        let original = r#"{ "name": "Mine", "bpm": 250, "tracks": [] }"#;
        std::fs::write(state_dir(dir.path()).join("pattern.json"), original).unwrap();
        assert!(load_pattern(dir.path(), 16).is_err());

        let backup = set_aside_pattern(dir.path()).unwrap();
        assert_eq!(backup, state_dir(dir.path()).join("pattern.json.bak"));
        assert!(load_pattern(dir.path(), 16).unwrap().is_none());

        save_pattern(dir.path(), &demo()).unwrap();
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), original);
        assert_eq!(load_pattern(dir.path(), 16).unwrap().unwrap(), demo());
    }

    #[test]
    fn set_aside_without_a_pattern_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(set_aside_pattern(dir.path()).is_err());
    }

    #[test]
    fn config_defaults_when_missing_and_validates_when_present() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(dir.path()).unwrap(), EngineConfig::default());

        std::fs::create_dir_all(state_dir(dir.path())).unwrap();
        let path = state_dir(dir.path()).join("config.json");
        std::fs::write(&path, r#"{ "bpm": 140, "stepCount": 32 }"#).unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.bpm, 140.0);
        assert_eq!(config.step_count, 32);
        assert_eq!(config.subdivisions_per_beat, 4);

        std::fs::write(&path, r#"{ "bpm": 500 }"#).unwrap();
        assert!(load_config(dir.path()).is_err());
    }
}
