// The middle layer: glues clock ticks to store queries and trigger emission, and is
// the only thing that moves the playhead.
//
// Lock order is state -> store -> sink everywhere. A tick holds the state lock while
// it emits, so `stop()` (which needs that lock to clear the running flag) can't
// return while an emission is half done, and any tick that runs afterwards sees
// the flag cleared and emits nothing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace, warn};

use crate::audio_api::{TrackTriggered, TriggerSink};
use crate::clock::{Clock, TransportClock};
use crate::error::EngineError;
use crate::pipeline::pattern::Pattern;
use crate::pipeline::store::PatternStore;
use crate::shared::{DisplayState, LedState, TrackRow};

/// Where the playhead is. `step` is `None` while stopped and before the first tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub step: Option<usize>,
    pub running: bool,
    pub ticks: u64,
}

impl PlaybackState {
    /// The playhead as a signed index, -1 when stopped.
    pub fn step_index(&self) -> i64 {
        self.step.map_or(-1, |s| s as i64)
    }
}

struct Shared {
    state: Mutex<PlaybackState>,
    store: RwLock<PatternStore>,
    sink: Mutex<Box<dyn TriggerSink>>,
}

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn tick(&self) {
        let mut state = lock(&self.state);
        if !state.running {
            return;
        }
        let store = read(&self.store);
        let step = match state.step {
            Some(prev) => (prev + 1) % store.step_count().max(1),
            None => 0,
        };
        state.step = Some(step);
        let timestamp = state.ticks;
        state.ticks += 1;

        let hits = store.hits_at_step(step);
        drop(store);
        trace!(step, timestamp, hits = hits.len(), "tick");

        let mut sink = lock(&self.sink);
        for hit in hits {
            sink.trigger(&TrackTriggered {
                track_id: hit.track_id,
                step_index: step,
                timestamp_logical: timestamp,
                instrument: hit.instrument,
                velocity: hit.velocity,
                gain: hit.gain,
            });
        }
    }
}

pub struct PlaybackCoordinator<C: Clock = TransportClock> {
    shared: Arc<Shared>,
    clock: C,
}

impl<C: Clock> PlaybackCoordinator<C> {
    pub fn new(store: PatternStore, clock: C, sink: impl TriggerSink + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PlaybackState::default()),
                store: RwLock::new(store),
                sink: Mutex::new(Box::new(sink)),
            }),
            clock,
        }
    }

    /// Starts playback from the top of the pattern. Does nothing when already playing.
    pub fn play(&mut self) -> Result<(), EngineError> {
        {
            let mut state = lock(&self.shared.state);
            if state.running {
                debug!("play ignored, already playing");
                return Ok(());
            }
            *state = PlaybackState {
                step: None,
                running: true,
                ticks: 0,
            };
        }

        let bpm = read(&self.shared.store).bpm();
        let shared = Arc::clone(&self.shared);
        if let Err(err) = self.clock.start(bpm, Box::new(move || shared.tick())) {
            *lock(&self.shared.state) = PlaybackState::default();
            return Err(err);
        }
        debug!(bpm, "playing");
        Ok(())
    }

    /// Stops playback and parks the playhead. No trigger is emitted after this
    /// returns. Does nothing when already stopped.
    pub fn stop(&mut self) {
        let was_running = {
            let mut state = lock(&self.shared.state);
            let was_running = state.running;
            state.running = false;
            state.step = None;
            was_running
        };
        self.clock.stop();
        if was_running {
            debug!("stopped");
        }
    }

    /// Same as [`stop`](Self::stop); there is no separate paused position.
    pub fn pause(&mut self) {
        self.stop();
    }

    pub fn toggle_play(&mut self) -> Result<(), EngineError> {
        if self.is_playing() {
            self.stop();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Changes tempo. While playing, later ticks use the new interval and the
    /// playhead stays where it is.
    pub fn set_tempo(&mut self, bpm: f32) -> Result<(), EngineError> {
        write(&self.shared.store).set_bpm(bpm)?;
        if self.clock.is_running() {
            self.clock.set_tempo(bpm)?;
        }
        debug!(bpm, "tempo set");
        Ok(())
    }

    pub fn bpm(&self) -> f32 {
        read(&self.shared.store).bpm()
    }

    pub fn state(&self) -> PlaybackState {
        *lock(&self.shared.state)
    }

    pub fn current_step(&self) -> Option<usize> {
        self.state().step
    }

    pub fn is_playing(&self) -> bool {
        self.state().running
    }

    pub fn read<R>(&self, f: impl FnOnce(&PatternStore) -> R) -> R {
        f(&read(&self.shared.store))
    }

    /// Edits the store. Safe while playing; the next tick sees the change. A tempo
    /// change made through the store reaches the clock too.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut PatternStore) -> R) -> R {
        let (out, bpm_before, bpm_after) = {
            let mut store = write(&self.shared.store);
            let before = store.bpm();
            let out = f(&mut store);
            (out, before, store.bpm())
        };
        if bpm_before != bpm_after && self.clock.is_running() {
            if let Err(err) = self.clock.set_tempo(bpm_after) {
                warn!(bpm = bpm_after, %err, "clock rejected tempo from store edit");
            }
        }
        out
    }

    /// A copy of the pattern as it is right now.
    pub fn pattern(&self) -> Pattern {
        read(&self.shared.store).pattern().clone()
    }

    /// Swaps in another pattern and stops playback. A pattern the store rejects
    /// leaves everything as it was, playing or not.
    pub fn replace_pattern(&mut self, pattern: Pattern) -> Result<(), EngineError> {
        let store = PatternStore::new(pattern)?;
        self.stop();
        *write(&self.shared.store) = store;
        Ok(())
    }

    /// Stops and clears every step, keeping the tracks.
    pub fn reset(&mut self) {
        self.stop();
        write(&self.shared.store).clear_all();
    }

    pub fn set_sink(&mut self, sink: impl TriggerSink + 'static) {
        *lock(&self.shared.sink) = Box::new(sink);
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Host-driven clocks are advanced through here.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn display_state(&self) -> DisplayState {
        let state = self.state();
        let store = read(&self.shared.store);
        let pattern = store.pattern();
        let any_solo = pattern.any_solo();

        let rows = pattern
            .tracks
            .iter()
            .map(|track| TrackRow {
                id: track.id.clone(),
                name: track.name.clone(),
                instrument: track.instrument.clone(),
                color: track.color.clone(),
                muted: track.muted,
                solo: track.solo,
                audible: track.is_audible(any_solo),
                gain: track.gain,
                leds: track
                    .steps
                    .iter()
                    .enumerate()
                    .map(|(i, s)| match (s.active, state.step == Some(i)) {
                        (true, true) => LedState::Hit,
                        (true, false) => LedState::On,
                        (false, true) => LedState::Playhead,
                        (false, false) => LedState::Off,
                    })
                    .collect(),
            })
            .collect();

        DisplayState {
            name: pattern.name.clone(),
            bpm: pattern.bpm,
            playing: state.running,
            playing_step: state.step,
            step_count: pattern.step_count,
            rows,
        }
    }
}

impl<C: Clock> Drop for PlaybackCoordinator<C> {
    fn drop(&mut self) {
        self.stop();
    }
}
