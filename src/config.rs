use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::shared::{DEFAULT_BPM, DEFAULT_STEP_COUNT, MAX_BPM, MIN_BPM, SUBDIVISIONS_PER_BEAT};

/// Engine input configuration. Every field falls back to its default when missing
/// from the config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub bpm: f32,
    pub step_count: usize,
    pub subdivisions_per_beat: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            step_count: DEFAULT_STEP_COUNT,
            subdivisions_per_beat: SUBDIVISIONS_PER_BEAT,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        validate_bpm(self.bpm)?;
        if self.step_count == 0 {
            return Err(EngineError::ZeroSteps);
        }
        if self.subdivisions_per_beat == 0 {
            return Err(EngineError::ZeroSubdivisions);
        }
        Ok(())
    }
}

pub fn validate_bpm(bpm: f32) -> Result<(), EngineError> {
    // NaN fails the range check too
    if (MIN_BPM..=MAX_BPM).contains(&bpm) {
        Ok(())
    } else {
        Err(EngineError::TempoOutOfRange(bpm))
    }
}
