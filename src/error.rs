use crate::shared::{MAX_BPM, MIN_BPM, TrackId};

// Nothing in here is fatal: every variant means "the mutation was rejected and
// nothing changed".
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("step {index} is out of range for a {step_count}-step pattern")]
    StepOutOfRange { index: usize, step_count: usize },

    #[error("unknown track '{0}'")]
    UnknownTrack(TrackId),

    #[error("tempo {0} bpm is outside {min}..={max}", min = MIN_BPM, max = MAX_BPM)]
    TempoOutOfRange(f32),

    #[error("a pattern needs at least one step")]
    ZeroSteps,

    #[error("subdivisions per beat must be at least 1")]
    ZeroSubdivisions,

    #[error("track '{track}' has {found} steps, expected {expected}")]
    StepCountMismatch {
        track: TrackId,
        expected: usize,
        found: usize,
    },

    #[error("failed to spawn the clock thread: {0}")]
    ClockSpawn(#[source] std::io::Error),
}
