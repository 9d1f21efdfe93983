//! A step-pattern playback engine: a grid of tracks over a fixed number of steps,
//! a tempo-driven transport clock, and a coordinator that turns clock ticks into
//! per-track trigger events for an external sound or visual sink.

pub mod audio;
pub mod audio_api;
pub mod clock;
pub mod config;
pub mod error;
pub mod middle;
pub mod pipeline;
pub mod shared;
pub mod trace;
pub mod tui;

pub use audio_api::{ChannelSink, TrackTriggered, TriggerSink};
pub use clock::{Clock, ManualClock, TransportClock};
pub use config::EngineConfig;
pub use error::EngineError;
pub use middle::{PlaybackCoordinator, PlaybackState};
pub use pipeline::pattern::{Pattern, Step, Track};
pub use pipeline::store::PatternStore;
pub use shared::TrackId;
