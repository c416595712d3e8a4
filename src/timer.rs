//! Performance measurement tools.
//!
//! [`FrameTimer`] keeps the timestamps of the last few frames in a ring buffer. Each frame is
//! bracketed by [`FrameTimer::start`] and [`FrameTimer::stop`], and can record any number of named
//! checkpoints in between via [`FrameTimer::mark`]. Stopping a frame yields a frames-per-second
//! estimate derived from the start times of this frame and the one before it.

use std::{borrow::Cow, fmt, time::Instant};

use crate::config;

/// Receives the frame rate estimates of a [`FrameTimer`].
pub trait FpsSink {
    fn update_fps(&mut self, fps: u32);
}

/// An [`FpsSink`] that drops every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl FpsSink for Discard {
    fn update_fps(&mut self, _fps: u32) {}
}

impl<F: FnMut(u32)> FpsSink for F {
    fn update_fps(&mut self, fps: u32) {
        self(fps)
    }
}

/// A source of monotonic timestamps, in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// A [`Clock`] backed by [`Instant`], counting from its creation.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Named checkpoints recorded for a single frame, in recording order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingRecord {
    entries: Vec<(Cow<'static, str>, f64)>,
}

impl TimingRecord {
    /// Returns the time recorded under `label`.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|&(_, time)| time)
    }

    /// Records `time` under `label`, replacing any earlier time with the same label.
    pub fn insert(&mut self, label: impl Into<Cow<'static, str>>, time: f64) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = time,
            None => self.entries.push((label, time)),
        }
    }

    /// Returns the time between the checkpoints `from` and `to`, in seconds.
    pub fn interval(&self, from: &str, to: &str) -> Option<f64> {
        Some(self.get(to)? - self.get(from)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(label, time)| (&**label, *time))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Displays the time between consecutive checkpoints, eg. `start→end 12.5ms`.
impl fmt::Display for TimingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps = self.entries.iter().zip(self.entries.iter().skip(1));
        for (i, ((from, t0), (to, t1))) in steps.enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            let ms = (t1 - t0) * 1000.0;
            write!(f, "{from}→{to} {ms:.01}ms")?;
        }
        Ok(())
    }
}

/// Measures frame rate and per-frame latencies over a fixed window of frames.
///
/// The timer stores one [`TimingRecord`] per frame in a ring buffer. [`FrameTimer::start`] moves
/// on to the next slot (overwriting the oldest frame), so the slot before the current one always
/// holds the previous frame.
///
/// A timer is meant to be owned by a single frame processing pipeline. All operations take
/// `&mut self`; sharing one between threads requires external synchronization.
pub struct FrameTimer<S = Discard, C = MonotonicClock> {
    slots: Box<[TimingRecord]>,
    cursor: usize,
    sink: S,
    clock: C,
}

impl FrameTimer {
    /// Creates a timer with the configured window size (see [`config::frame_window`]).
    pub fn new() -> Self {
        Self::with_capacity(config::frame_window())
    }

    /// Creates a timer that keeps `capacity` frames.
    ///
    /// # Panics
    ///
    /// This method will panic if `capacity` is 0.
    #[track_caller]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "frame timer needs room for at least 1 frame");
        Self {
            slots: vec![TimingRecord::default(); capacity].into_boxed_slice(),
            cursor: capacity - 1,
            sink: Discard,
            clock: MonotonicClock::new(),
        }
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FpsSink, C: Clock> FrameTimer<S, C> {
    /// Replaces the [`FpsSink`] that receives frame rate estimates.
    pub fn with_sink<T: FpsSink>(self, sink: T) -> FrameTimer<T, C> {
        FrameTimer {
            slots: self.slots,
            cursor: self.cursor,
            sink,
            clock: self.clock,
        }
    }

    /// Replaces the [`Clock`] used to timestamp checkpoints.
    pub fn with_clock<D: Clock>(self, clock: D) -> FrameTimer<S, D> {
        FrameTimer {
            slots: self.slots,
            cursor: self.cursor,
            sink: self.sink,
            clock,
        }
    }

    /// Returns the number of frames the timer keeps.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Starts timing a new frame.
    ///
    /// Advances to the next slot, discards what it held and records the `start` checkpoint.
    pub fn start(&mut self) {
        self.cursor = (self.cursor + 1) % self.slots.len();
        let now = self.clock.now();
        let slot = &mut self.slots[self.cursor];
        slot.clear();
        slot.insert("start", now);
    }

    /// Records the current time under `label` in the current frame.
    ///
    /// Before the first call to [`FrameTimer::start`], this writes into the last slot, which the
    /// first frame then treats as its (start-less) predecessor.
    pub fn mark(&mut self, label: impl Into<Cow<'static, str>>) {
        let now = self.clock.now();
        self.slots[self.cursor].insert(label, now);
    }

    /// Finishes timing the current frame and estimates the frame rate.
    ///
    /// The estimate is `1 / (start of this frame - start of the previous frame)`, truncated
    /// towards zero. It is passed to the [`FpsSink`] and returned. If the previous slot has no
    /// start time yet (right after creation), or the interval is not positive, nothing is
    /// reported and `None` is returned.
    pub fn stop(&mut self) -> Option<u32> {
        self.mark("end");

        let start = self.current().get("start");
        let before = self.previous().get("start");
        let (Some(start), Some(before)) = (start, before) else {
            log::trace!("no previous frame to estimate FPS from");
            return None;
        };

        let interval = start - before;
        if !(interval > 0.0 && interval.is_finite()) {
            log::trace!("frame interval of {interval}s does not give a frame rate");
            return None;
        }

        let fps = (1.0 / interval) as u32;
        self.sink.update_fps(fps);
        Some(fps)
    }

    /// Returns the record of the current (most recently started) frame.
    pub fn current(&self) -> &TimingRecord {
        &self.slots[self.cursor]
    }

    /// Returns the record of the frame before the current one.
    pub fn previous(&self) -> &TimingRecord {
        let len = self.slots.len();
        &self.slots[(self.cursor + len - 1) % len]
    }
}

/// Displays the checkpoint latencies of the current frame.
impl<S, C> fmt::Display for FrameTimer<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.slots[self.cursor], f)
    }
}
