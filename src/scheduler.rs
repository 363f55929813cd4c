//! Frame-synchronized render scheduler.
//!
//! `Idle -> Running -> Idle`. While running, the draw callback is invoked
//! exactly once per vsync of the host [`FrameLoop`], never overlapping. Each
//! `start`/`stop` bumps a generation counter and cancels the pending frame
//! request, so a callback scheduled by an earlier run can neither fire nor
//! reschedule itself.
//!
//! A failing or panicking draw is reported on the error channel and the next
//! frame is scheduled as usual.

use crate::error::TransientDrawError;
use crate::frame_loop::{FrameLoop, FrameRequestId, FrameTime, WeakFrameLoop};
use crate::telemetry::SharedTelemetry;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::Instant;
use tracing::{debug, warn};

/// Errors beyond this many undrained reports are counted but dropped.
const ERROR_CHANNEL_CAPACITY: usize = 64;

pub type DrawCallback = Box<dyn FnMut(&FrameTime) -> eyre::Result<()>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

struct Inner {
    state: SchedulerState,
    generation: u64,
    pending: Option<FrameRequestId>,
    draw: Option<DrawCallback>,
    in_tick: bool,
    frames_drawn: u64,
    failures: u64,
    dropped_errors: u64,
    errors_tx: Sender<TransientDrawError>,
    telemetry: Option<SharedTelemetry>,
}

pub struct RenderScheduler {
    host: FrameLoop,
    inner: Rc<RefCell<Inner>>,
    errors_rx: Receiver<TransientDrawError>,
}

impl RenderScheduler {
    pub fn new(host: FrameLoop) -> Self {
        let (errors_tx, errors_rx) = crossbeam_channel::bounded(ERROR_CHANNEL_CAPACITY);
        Self {
            host,
            inner: Rc::new(RefCell::new(Inner {
                state: SchedulerState::Idle,
                generation: 0,
                pending: None,
                draw: None,
                in_tick: false,
                frames_drawn: 0,
                failures: 0,
                dropped_errors: 0,
                errors_tx,
                telemetry: None,
            })),
            errors_rx,
        }
    }

    /// Every tick reports its timestamp and draw duration here.
    pub fn with_telemetry(self, telemetry: SharedTelemetry) -> Self {
        self.inner.borrow_mut().telemetry = Some(telemetry);
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.inner.borrow().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    pub fn frames_drawn(&self) -> u64 {
        self.inner.borrow().frames_drawn
    }

    pub fn failures(&self) -> u64 {
        self.inner.borrow().failures
    }

    /// Failures that could not be queued because nobody drained the channel.
    pub fn dropped_errors(&self) -> u64 {
        self.inner.borrow().dropped_errors
    }

    /// Receiving end of the per-frame failure channel.
    pub fn errors(&self) -> Receiver<TransientDrawError> {
        self.errors_rx.clone()
    }

    /// Handle that can stop the scheduler from inside a draw callback.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            host: self.host.downgrade(),
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Starts ticking `draw`. A running loop is cancelled first.
    pub fn start<F>(&self, draw: F)
    where
        F: FnMut(&FrameTime) -> eyre::Result<()> + 'static,
    {
        let generation = {
            let mut inner = self.inner.borrow_mut();
            if let Some(id) = inner.pending.take() {
                self.host.cancel_frame(id);
            }
            inner.generation += 1;
            inner.draw = Some(Box::new(draw));
            inner.state = SchedulerState::Running;
            debug!(generation = inner.generation, "render scheduler started");
            inner.generation
        };
        schedule(&self.host, &self.inner, generation);
    }

    /// Cancels the pending tick. No-op when idle.
    pub fn stop(&self) {
        stop_inner(&self.host, &self.inner);
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Clone)]
pub struct SchedulerHandle {
    host: WeakFrameLoop,
    inner: Weak<RefCell<Inner>>,
}

impl SchedulerHandle {
    pub fn stop(&self) {
        if let (Some(host), Some(inner)) = (self.host.upgrade(), self.inner.upgrade()) {
            stop_inner(&host, &inner);
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.borrow().state == SchedulerState::Running)
    }
}

fn stop_inner(host: &FrameLoop, inner: &Rc<RefCell<Inner>>) {
    let mut inner = inner.borrow_mut();
    if inner.state == SchedulerState::Idle {
        return;
    }
    inner.state = SchedulerState::Idle;
    inner.generation += 1;
    if let Some(id) = inner.pending.take() {
        host.cancel_frame(id);
    }
    inner.draw = None;
    debug!(frames = inner.frames_drawn, "render scheduler stopped");
}

fn schedule(host: &FrameLoop, inner: &Rc<RefCell<Inner>>, generation: u64) {
    let weak_inner = Rc::downgrade(inner);
    let weak_host = host.downgrade();
    let id = host.request_frame(move |time| {
        if let (Some(host), Some(inner)) = (weak_host.upgrade(), weak_inner.upgrade()) {
            tick(&host, &inner, generation, time);
        }
    });
    inner.borrow_mut().pending = Some(id);
}

fn tick(host: &FrameLoop, inner_rc: &Rc<RefCell<Inner>>, generation: u64, time: FrameTime) {
    let mut draw = {
        let mut inner = inner_rc.borrow_mut();
        if inner.generation != generation
            || inner.state != SchedulerState::Running
            || inner.in_tick
        {
            return;
        }
        inner.pending = None;
        let Some(draw) = inner.draw.take() else {
            return;
        };
        inner.in_tick = true;
        draw
    };

    // The borrow is released: the callback may call start/stop on a handle.
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| draw(&time)));
    let render_ms = started.elapsed().as_secs_f64() * 1000.0;

    let mut inner = inner_rc.borrow_mut();
    inner.in_tick = false;
    inner.frames_drawn += 1;
    if let Some(telemetry) = &inner.telemetry {
        let mut t = telemetry.lock();
        t.on_tick(time.now_ms);
        t.set_render_time(render_ms);
    }

    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(TransientDrawError::Failed {
            frame: time.frame,
            message: format!("{err:#}"),
        }),
        Err(payload) => Some(TransientDrawError::Panicked {
            frame: time.frame,
            message: panic_message(payload.as_ref()),
        }),
    };
    if let Some(failure) = failure {
        inner.failures += 1;
        warn!(%failure, "frame dropped");
        if let Err(TrySendError::Full(_)) = inner.errors_tx.try_send(failure) {
            inner.dropped_errors += 1;
        }
    }

    if inner.generation == generation && inner.state == SchedulerState::Running {
        inner.draw = Some(draw);
        drop(inner);
        schedule(host, inner_rc, generation);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
