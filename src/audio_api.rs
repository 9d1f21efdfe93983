// The engine's only output: one event per track that fires at a step. Whatever
// consumes them (a tone generator, a canvas highlighting cells, a test) is a sink.

use crossbeam_channel::Sender;

use crate::shared::TrackId;

#[derive(Clone, Debug, PartialEq)]
pub struct TrackTriggered {
    pub track_id: TrackId,
    pub step_index: usize,
    pub timestamp_logical: u64, // ticks since play, the first tick is 0
    pub instrument: String,
    pub velocity: f32,
    pub gain: f32,
}

/// Receives trigger events on the clock's thread, in step order and, within a step,
/// in track insertion order.
///
/// A sink must not call back into the coordinator that feeds it.
pub trait TriggerSink: Send {
    fn trigger(&mut self, event: &TrackTriggered);
}

impl<F> TriggerSink for F
where
    F: FnMut(&TrackTriggered) + Send,
{
    fn trigger(&mut self, event: &TrackTriggered) {
        self(event)
    }
}

/// Forwards events over a channel. Events are dropped, not queued, when a bounded
/// channel is full or the receiver is gone.
#[derive(Clone, Debug)]
pub struct ChannelSink(pub Sender<TrackTriggered>);

impl TriggerSink for ChannelSink {
    fn trigger(&mut self, event: &TrackTriggered) {
        let _ = self.0.try_send(event.clone());
    }
}

/// What the tone generator needs to voice one trigger.
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerParams {
    pub instrument: String,
    pub gain: f32, // velocity times track gain
}

impl From<&TrackTriggered> for TriggerParams {
    fn from(event: &TrackTriggered) -> Self {
        Self {
            instrument: event.instrument.clone(),
            gain: (event.velocity * event.gain).clamp(0.0, 1.0),
        }
    }
}

#[derive(Clone, Debug)]
pub enum AudioCommand {
    Trigger(TriggerParams),
    // cut every ringing voice, sent when the transport stops
    Silence,
}
