use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};
use stream_chart::config::TelemetryConfig;
use stream_chart::{
    FrameLoop, PerformanceAggregator, RenderScheduler, SchedulerState, TransientDrawError,
};

fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
    let c = Rc::new(Cell::new(0));
    (c.clone(), c)
}

#[test]
fn test_draw_runs_once_per_vsync() {
    let host = FrameLoop::new(50.0).unwrap();
    let scheduler = RenderScheduler::new(host.clone());
    let (count, c) = counter();
    scheduler.start(move |_| {
        c.set(c.get() + 1);
        Ok(())
    });

    assert_eq!(scheduler.state(), SchedulerState::Running);
    host.advance(1000.0);
    assert_eq!(count.get(), 50);
    assert_eq!(scheduler.frames_drawn(), 50);
    assert_eq!(host.pending_frames(), 1);
}

#[test]
fn test_restart_leaves_a_single_loop() {
    let host = FrameLoop::new(100.0).unwrap();
    let scheduler = RenderScheduler::new(host.clone());
    let (first, f) = counter();
    let (second, s) = counter();

    scheduler.start(move |_| {
        f.set(f.get() + 1);
        Ok(())
    });
    host.advance(50.0);
    scheduler.start(move |_| {
        s.set(s.get() + 1);
        Ok(())
    });
    host.advance(100.0);

    assert_eq!(first.get(), 5);
    assert_eq!(second.get(), 10);
    assert_eq!(host.pending_frames(), 1);
}

#[test]
fn test_stop_is_idempotent_and_cancels_pending_tick() {
    let host = FrameLoop::new(60.0).unwrap();
    let scheduler = RenderScheduler::new(host.clone());
    scheduler.stop();
    assert_eq!(scheduler.state(), SchedulerState::Idle);

    let (count, c) = counter();
    scheduler.start(move |_| {
        c.set(c.get() + 1);
        Ok(())
    });
    host.advance(100.0);
    let seen = count.get();

    scheduler.stop();
    scheduler.stop();
    assert_eq!(host.pending_frames(), 0, "pending tick must be removed, not ignored");
    host.advance(1000.0);
    assert_eq!(count.get(), seen);
    assert!(!scheduler.is_running());
}

#[test]
fn test_failing_frames_do_not_halt_the_loop() {
    let host = FrameLoop::new(100.0).unwrap();
    let scheduler = RenderScheduler::new(host.clone());
    let errors = scheduler.errors();
    let (count, c) = counter();
    scheduler.start(move |time| {
        c.set(c.get() + 1);
        match time.frame {
            2 => Err(eyre::eyre!("surface lost")),
            4 => panic!("bad geometry"),
            _ => Ok(()),
        }
    });
    host.advance(100.0);

    assert_eq!(count.get(), 10);
    assert_eq!(scheduler.failures(), 2);
    let reported: Vec<TransientDrawError> = errors.try_iter().collect();
    assert_eq!(
        reported,
        vec![
            TransientDrawError::Failed {
                frame: 2,
                message: "surface lost".into()
            },
            TransientDrawError::Panicked {
                frame: 4,
                message: "bad geometry".into()
            },
        ]
    );
    assert!(scheduler.is_running());
}

#[test]
fn test_undrained_errors_are_counted_not_blocking() {
    let host = FrameLoop::new(100.0).unwrap();
    let scheduler = RenderScheduler::new(host.clone());
    scheduler.start(|_| Err(eyre::eyre!("always")));
    host.advance(1000.0);

    assert_eq!(scheduler.failures(), 100);
    assert_eq!(scheduler.errors().len(), 64);
    assert_eq!(scheduler.dropped_errors(), 36);
}

#[test]
fn test_stop_from_inside_draw() {
    let host = FrameLoop::new(100.0).unwrap();
    let scheduler = RenderScheduler::new(host.clone());
    let handle = scheduler.handle();
    let (count, c) = counter();
    scheduler.start(move |_| {
        c.set(c.get() + 1);
        if c.get() == 3 {
            handle.stop();
        }
        Ok(())
    });
    host.advance(500.0);

    assert_eq!(count.get(), 3);
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(host.pending_frames(), 0);
}

#[test]
fn test_invocations_never_overlap() {
    let host = FrameLoop::new(125.0).unwrap();
    let scheduler = RenderScheduler::new(host.clone());
    let active = Rc::new(Cell::new(false));
    let order = Rc::new(RefCell::new(Vec::new()));
    let (a, o) = (active.clone(), order.clone());
    scheduler.start(move |time| {
        assert!(!a.replace(true), "reentrant draw");
        o.borrow_mut().push(time.now_ms);
        a.set(false);
        Ok(())
    });
    host.advance(250.0);

    let order = order.borrow();
    assert_eq!(order.len(), 31);
    assert!(order.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_dropping_scheduler_leaves_no_callback() {
    let host = FrameLoop::new(60.0).unwrap();
    {
        let scheduler = RenderScheduler::new(host.clone());
        scheduler.start(|_| Ok(()));
        assert_eq!(host.pending_frames(), 1);
    }
    assert_eq!(host.pending_frames(), 0);
}

#[test]
fn test_ticks_feed_telemetry() {
    let host = FrameLoop::new(60.0).unwrap();
    let telemetry = PerformanceAggregator::new(&TelemetryConfig::default(), 30.0).shared();
    let scheduler = RenderScheduler::new(host.clone()).with_telemetry(telemetry.clone());
    scheduler.start(|_| Ok(()));
    host.advance(2000.0);

    let metrics = telemetry.lock().metrics();
    // 60 Hz ticks are reported at the 30 fps ceiling.
    assert_eq!(metrics.fps, 30.0);
    assert!(metrics.render_time_ms >= 0.0);
}

#[test]
fn test_slow_draws_do_not_build_a_backlog() {
    let host = FrameLoop::new(100.0).unwrap();
    let telemetry = PerformanceAggregator::new(&TelemetryConfig::default(), 100.0).shared();
    let scheduler = RenderScheduler::new(host.clone()).with_telemetry(telemetry.clone());
    scheduler.start(|_| {
        std::thread::sleep(Duration::from_millis(25));
        Ok(())
    });

    let started = Instant::now();
    host.run_for(Duration::from_millis(300));
    let wall_ms = started.elapsed().as_millis();

    // A 25 ms draw at 100 Hz fits one frame per 30 ms.
    assert!(scheduler.frames_drawn() <= 12, "drew {}", scheduler.frames_drawn());
    assert!(wall_ms < 450, "run_for overran to {wall_ms} ms");
    let fps = telemetry.lock().fps();
    assert!(fps < 50.0, "reported {fps} fps");
    assert_eq!(host.pending_frames(), 1);
}
