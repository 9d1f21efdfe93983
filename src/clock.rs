// Transport clocks: something that calls a tick callback at a tempo-derived interval.
//
// A clock owns at most one running timer. Starting a running clock stops the old
// timer first, so two timers can never feed the same coordinator.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};
use tracing::{debug, trace};

use crate::error::EngineError;

pub type TickFn = Box<dyn FnMut() + Send + 'static>;

/// Milliseconds between ticks: one beat split into `subdivisions_per_beat` steps.
pub fn interval_ms(bpm: f32, subdivisions_per_beat: u32) -> f64 {
    (60.0 / bpm as f64) * 1000.0 / subdivisions_per_beat as f64
}

pub fn interval_for(bpm: f32, subdivisions_per_beat: u32) -> Result<Duration, EngineError> {
    if subdivisions_per_beat == 0 {
        return Err(EngineError::ZeroSubdivisions);
    }
    // the clock itself only needs a positive tempo; range limits live in the config
    if !(bpm.is_finite() && bpm > 0.0) {
        return Err(EngineError::TempoOutOfRange(bpm));
    }
    let nanos = (interval_ms(bpm, subdivisions_per_beat) * 1_000_000.0).round();
    Ok(Duration::from_nanos(nanos as u64))
}

pub trait Clock: Send {
    /// Starts ticking. A clock that is already running is stopped first.
    fn start(&mut self, bpm: f32, on_tick: TickFn) -> Result<(), EngineError>;

    /// Stops ticking. Once this returns no further tick is delivered. Safe to call
    /// when already stopped.
    fn stop(&mut self);

    /// Changes the interval of subsequent ticks without restarting.
    fn set_tempo(&mut self, bpm: f32) -> Result<(), EngineError>;

    fn is_running(&self) -> bool;

    /// Current tick interval, `None` while stopped.
    fn interval(&self) -> Option<Duration>;
}

enum Control {
    Tempo(Duration),
    Stop,
}

struct Timer {
    control: Sender<Control>,
    handle: JoinHandle<()>,
    interval: Duration,
}

/// Wall-clock transport: one background thread per running clock.
///
/// The first tick fires as soon as the clock starts, then one every interval,
/// scheduled against deadlines so callback time doesn't accumulate as drift.
/// Callbacks run one after another on the timer thread. A callback that runs past
/// the next deadline makes the clock skip the missed ticks rather than fire them in
/// a burst; slow callbacks lose ticks, they never overlap.
pub struct TransportClock {
    subdivisions_per_beat: u32,
    timer: Option<Timer>,
}

impl TransportClock {
    pub fn new(subdivisions_per_beat: u32) -> Self {
        Self {
            subdivisions_per_beat,
            timer: None,
        }
    }
}

impl Default for TransportClock {
    fn default() -> Self {
        Self::new(crate::shared::SUBDIVISIONS_PER_BEAT)
    }
}

impl Clock for TransportClock {
    fn start(&mut self, bpm: f32, on_tick: TickFn) -> Result<(), EngineError> {
        let interval = interval_for(bpm, self.subdivisions_per_beat)?;
        self.stop();

        let (control, rx) = crossbeam_channel::unbounded();
        let handle = thread::Builder::new()
            .name("transport-clock".into())
            .spawn(move || run_timer(rx, interval, on_tick))
            .map_err(EngineError::ClockSpawn)?;
        debug!(bpm, interval_ms = interval.as_secs_f64() * 1000.0, "clock started");

        self.timer = Some(Timer {
            control,
            handle,
            interval,
        });
        Ok(())
    }

    fn stop(&mut self) {
        let Some(timer) = self.timer.take() else {
            return;
        };
        let _ = timer.control.send(Control::Stop);
        // joining is what guarantees no tick is still in flight once we return
        if timer.handle.thread().id() != thread::current().id() {
            let _ = timer.handle.join();
        }
        debug!("clock stopped");
    }

    fn set_tempo(&mut self, bpm: f32) -> Result<(), EngineError> {
        let interval = interval_for(bpm, self.subdivisions_per_beat)?;
        if let Some(timer) = &mut self.timer {
            timer.interval = interval;
            let _ = timer.control.send(Control::Tempo(interval));
            debug!(bpm, "clock tempo changed");
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    fn interval(&self) -> Option<Duration> {
        self.timer.as_ref().map(|t| t.interval)
    }
}

impl Drop for TransportClock {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_timer(control: crossbeam_channel::Receiver<Control>, mut interval: Duration, mut on_tick: TickFn) {
    let mut last_tick: Option<Instant> = None;
    loop {
        let deadline = match last_tick {
            Some(at) => at + interval,
            None => Instant::now(),
        };
        match control.recv_deadline(deadline) {
            Ok(Control::Tempo(next)) => {
                // re-evaluated against the last tick, so the step in progress keeps its start
                interval = next;
                continue;
            }
            Ok(Control::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        on_tick();

        let now = Instant::now();
        let late = now.saturating_duration_since(deadline);
        if late >= interval {
            trace!(late_ms = late.as_millis() as u64, "tick overran, skipping missed ticks");
            last_tick = Some(now);
        } else {
            last_tick = Some(deadline);
        }
    }
}

/// Host-driven clock. Nothing happens until the host calls [`ManualClock::advance`]
/// with the time that passed (from a frame loop, say) or [`ManualClock::fire`].
///
/// Like [`TransportClock`] the downbeat is immediate: the first `advance` after
/// `start` fires once before any time is counted.
pub struct ManualClock {
    subdivisions_per_beat: u32,
    interval: Option<Duration>,
    on_tick: Option<TickFn>,
    pending: Duration,
    downbeat: bool,
    starts: usize,
}

impl ManualClock {
    pub fn new(subdivisions_per_beat: u32) -> Self {
        Self {
            subdivisions_per_beat,
            interval: None,
            on_tick: None,
            pending: Duration::ZERO,
            downbeat: false,
            starts: 0,
        }
    }

    /// Delivers one tick right now. Returns false when stopped.
    pub fn fire(&mut self) -> bool {
        match &mut self.on_tick {
            Some(on_tick) => {
                self.downbeat = false;
                on_tick();
                true
            }
            None => false,
        }
    }

    /// Lets `elapsed` pass and delivers every tick that falls due. Returns how many fired.
    pub fn advance(&mut self, elapsed: Duration) -> usize {
        let Some(interval) = self.interval else {
            return 0;
        };
        let mut fired = 0;
        if self.downbeat && self.fire() {
            fired += 1;
        }
        self.pending += elapsed;
        while self.pending >= interval {
            self.pending -= interval;
            if !self.fire() {
                break;
            }
            fired += 1;
        }
        fired
    }

    /// How many times the clock has been started, for checking that a host doesn't
    /// restart it needlessly.
    pub fn start_count(&self) -> usize {
        self.starts
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(crate::shared::SUBDIVISIONS_PER_BEAT)
    }
}

impl Clock for ManualClock {
    fn start(&mut self, bpm: f32, on_tick: TickFn) -> Result<(), EngineError> {
        let interval = interval_for(bpm, self.subdivisions_per_beat)?;
        self.stop();
        self.interval = Some(interval);
        self.on_tick = Some(on_tick);
        self.downbeat = true;
        self.starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.interval = None;
        self.on_tick = None;
        self.pending = Duration::ZERO;
        self.downbeat = false;
    }

    fn set_tempo(&mut self, bpm: f32) -> Result<(), EngineError> {
        let interval = interval_for(bpm, self.subdivisions_per_beat)?;
        if self.interval.is_some() {
            self.interval = Some(interval);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.on_tick.is_some()
    }

    fn interval(&self) -> Option<Duration> {
        self.interval
    }
}
