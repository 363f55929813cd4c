//! Single-threaded cooperative host loop.
//!
//! One timeline carries both display refresh callbacks (`request_frame`, fired
//! at every vsync boundary of the configured refresh rate) and periodic timers
//! (`set_interval`). The clock is virtual: `advance` moves it deterministically,
//! `run_for` follows wall-clock time and sleeps between events.
//!
//! Callbacks requested while a frame is being dispatched run on the next
//! vsync. Cancelling a request removes it from the queue, so a cancelled
//! callback is never invoked, even when it was due on the frame currently
//! being dispatched.

use crate::error::{ensure_positive, Result};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRequestId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Passed to every frame callback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTime {
    pub now_ms: f64,
    /// 1-based index of the dispatched vsync.
    pub frame: u64,
}

type FrameCallback = Box<dyn FnOnce(FrameTime)>;
type TimerCallback = Rc<RefCell<dyn FnMut(f64)>>;

struct TimerEntry {
    id: TimerId,
    period_ms: f64,
    due_ms: f64,
    callback: TimerCallback,
}

struct LoopState {
    now_ms: f64,
    frame_interval_ms: f64,
    next_vsync_ms: f64,
    frames_dispatched: u64,
    next_id: u64,
    frames: Vec<(FrameRequestId, FrameCallback)>,
    timers: Vec<TimerEntry>,
}

impl LoopState {
    fn earliest_timer(&self) -> f64 {
        self.timers
            .iter()
            .map(|t| t.due_ms)
            .fold(f64::INFINITY, f64::min)
    }

    fn next_event(&self) -> f64 {
        let vsync = if self.frames.is_empty() {
            f64::INFINITY
        } else {
            self.next_vsync_ms
        };
        vsync.min(self.earliest_timer())
    }
}

enum Step {
    Frame,
    Timer,
}

/// Cheap handle; clones share the same loop.
#[derive(Clone)]
pub struct FrameLoop {
    inner: Rc<RefCell<LoopState>>,
}

/// Non-owning handle, for callbacks stored inside the loop itself.
#[derive(Clone)]
pub struct WeakFrameLoop {
    inner: Weak<RefCell<LoopState>>,
}

impl WeakFrameLoop {
    pub fn upgrade(&self) -> Option<FrameLoop> {
        self.inner.upgrade().map(|inner| FrameLoop { inner })
    }
}

impl FrameLoop {
    pub fn new(refresh_rate_hz: f64) -> Result<Self> {
        let hz = ensure_positive("refresh_rate_hz", refresh_rate_hz)?;
        let interval = 1000.0 / hz;
        Ok(Self {
            inner: Rc::new(RefCell::new(LoopState {
                now_ms: 0.0,
                frame_interval_ms: interval,
                next_vsync_ms: interval,
                frames_dispatched: 0,
                next_id: 1,
                frames: Vec::new(),
                timers: Vec::new(),
            })),
        })
    }

    pub fn downgrade(&self) -> WeakFrameLoop {
        WeakFrameLoop {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.inner.borrow().now_ms
    }

    pub fn frame_interval_ms(&self) -> f64 {
        self.inner.borrow().frame_interval_ms
    }

    pub fn frames_dispatched(&self) -> u64 {
        self.inner.borrow().frames_dispatched
    }

    pub fn pending_frames(&self) -> usize {
        self.inner.borrow().frames.len()
    }

    pub fn active_timers(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    fn next_id(state: &mut LoopState) -> u64 {
        let id = state.next_id;
        state.next_id += 1;
        id
    }

    /// Runs `callback` once, on the next vsync.
    pub fn request_frame(&self, callback: impl FnOnce(FrameTime) + 'static) -> FrameRequestId {
        let mut s = self.inner.borrow_mut();
        let id = FrameRequestId(Self::next_id(&mut s));
        s.frames.push((id, Box::new(callback)));
        id
    }

    /// Returns false when the request already ran or was cancelled.
    pub fn cancel_frame(&self, id: FrameRequestId) -> bool {
        let mut s = self.inner.borrow_mut();
        match s.frames.iter().position(|(i, _)| *i == id) {
            Some(pos) => {
                drop(s.frames.remove(pos));
                true
            }
            None => false,
        }
    }

    /// Runs `callback` every `period_ms`, first after one full period.
    pub fn set_interval(
        &self,
        period_ms: f64,
        callback: impl FnMut(f64) + 'static,
    ) -> Result<TimerId> {
        let period_ms = ensure_positive("period_ms", period_ms)?;
        let mut s = self.inner.borrow_mut();
        let id = TimerId(Self::next_id(&mut s));
        let due_ms = s.now_ms + period_ms;
        s.timers.push(TimerEntry {
            id,
            period_ms,
            due_ms,
            callback: Rc::new(RefCell::new(callback)),
        });
        Ok(id)
    }

    pub fn clear_interval(&self, id: TimerId) -> bool {
        let mut s = self.inner.borrow_mut();
        let before = s.timers.len();
        s.timers.retain(|t| t.id != id);
        s.timers.len() != before
    }

    /// Moves the virtual clock forward, dispatching every event on the way.
    pub fn advance(&self, ms: f64) {
        let target = self.now_ms() + ms.max(0.0);
        self.advance_to(target);
    }

    /// Advances the clock in real time for `duration`, sleeping between events.
    /// The wall clock is re-read after every dispatch, so a frame that
    /// overruns its interval drops the vsyncs it missed instead of queueing
    /// them.
    pub fn run_for(&self, duration: Duration) {
        let started = Instant::now();
        let base = self.now_ms();
        let end = base + duration.as_secs_f64() * 1000.0;
        let wall_clock = move || (base + started.elapsed().as_secs_f64() * 1000.0).min(end);
        let wall: &dyn Fn() -> f64 = &wall_clock;
        loop {
            let now = wall();
            if self.step(now, Some(wall)) {
                continue;
            }
            if now >= end {
                break;
            }
            let next = self.inner.borrow().next_event().min(end);
            let wait_ms = next - wall();
            if wait_ms > 0.0 {
                std::thread::sleep(Duration::from_secs_f64(wait_ms / 1000.0));
            }
        }
    }

    fn advance_to(&self, target_ms: f64) {
        while self.step(target_ms, None) {}
    }

    /// Dispatches the earliest event due at or before `target_ms`. Returns
    /// false, with the clock moved to `target_ms`, when nothing is due.
    fn step(&self, target_ms: f64, wall: Option<&dyn Fn() -> f64>) -> bool {
        let step = {
            let mut s = self.inner.borrow_mut();
            let timer_due = s.earliest_timer();
            if s.frames.is_empty() {
                // Nothing listens to these vsyncs; skip them in one go.
                let horizon = timer_due.min(target_ms);
                if s.next_vsync_ms <= horizon {
                    let skipped = ((horizon - s.next_vsync_ms) / s.frame_interval_ms).floor() + 1.0;
                    s.next_vsync_ms += skipped * s.frame_interval_ms;
                }
            }
            let next = s.next_vsync_ms.min(timer_due);
            if next > target_ms {
                s.now_ms = s.now_ms.max(target_ms);
                return false;
            }
            s.now_ms = s.now_ms.max(next);
            if timer_due <= s.next_vsync_ms {
                Step::Timer
            } else {
                Step::Frame
            }
        };
        match step {
            Step::Timer => self.fire_due_timer(),
            Step::Frame => self.fire_frame(wall),
        }
        true
    }

    fn fire_frame(&self, wall: Option<&dyn Fn() -> f64>) {
        let (batch, time) = {
            let mut s = self.inner.borrow_mut();
            s.frames_dispatched += 1;
            s.next_vsync_ms += s.frame_interval_ms;
            let ids: Vec<FrameRequestId> = s.frames.iter().map(|(id, _)| *id).collect();
            (
                ids,
                FrameTime {
                    now_ms: s.now_ms,
                    frame: s.frames_dispatched,
                },
            )
        };
        for id in batch {
            let callback = {
                let mut s = self.inner.borrow_mut();
                s.frames
                    .iter()
                    .position(|(i, _)| *i == id)
                    .map(|pos| s.frames.remove(pos).1)
            };
            if let Some(callback) = callback {
                callback(time);
            }
        }

        let mut s = self.inner.borrow_mut();
        let now = wall.map_or(s.now_ms, |w| w().max(s.now_ms));
        s.now_ms = now;
        if s.next_vsync_ms <= now {
            let missed = ((now - s.next_vsync_ms) / s.frame_interval_ms).floor() + 1.0;
            s.next_vsync_ms += missed * s.frame_interval_ms;
            trace!(missed, now_ms = now, "vsyncs missed behind a slow frame");
        }
    }

    fn fire_due_timer(&self) {
        let (callback, now) = {
            let mut s = self.inner.borrow_mut();
            let now = s.now_ms;
            let Some(timer) = s
                .timers
                .iter_mut()
                .filter(|t| t.due_ms <= now)
                .min_by(|a, b| a.due_ms.total_cmp(&b.due_ms))
            else {
                return;
            };
            timer.due_ms += timer.period_ms;
            (Rc::clone(&timer.callback), now)
        };
        (&mut *callback.borrow_mut())(now);
    }
}
