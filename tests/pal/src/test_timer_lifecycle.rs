// Licensed under the Apache-2.0 license

//! Timer service init / deinit behaviour

use crate::common::{init_logging, sleep_ms, FireCounter};
use pal_os::{PalError, TimerKind, TimerService, TimerServiceConfig};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

/// deinit on a service whose thread never started neither fails nor blocks
#[test]
fn test_deinit_without_thread() {
    init_logging();
    let service = TimerService::new();
    let start = Instant::now();
    service.deinit().expect("deinit without init should succeed");
    service.deinit().expect("repeated deinit should succeed");
    assert!(start.elapsed() < Duration::from_millis(100));
    assert!(!service.is_running().unwrap());
}

/// An idle engine thread is joined promptly
#[test]
fn test_deinit_idle_engine() {
    init_logging();
    let service = TimerService::new();
    service.init().expect("Failed to start timer service");
    service.init().expect("Second init should be a no-op");
    assert!(service.is_running().unwrap());
    sleep_ms(20);

    let start = Instant::now();
    service.deinit().expect("Failed to stop timer service");
    assert!(
        start.elapsed() < Duration::from_millis(500),
        "deinit took {:?}",
        start.elapsed()
    );
    assert!(!service.is_running().unwrap());
}

/// Nothing fires once deinit has returned, and armed timers are disarmed
#[test]
fn test_deinit_with_armed_timers() {
    init_logging();
    let service = TimerService::new();
    service.init().expect("Failed to start timer service");

    let counter = FireCounter::new();
    let timers: Vec<_> = (0..4)
        .map(|i| {
            service
                .create("armed", TimerKind::Periodic, 30 + i * 10, true, counter.callback())
                .expect("Failed to create timer")
        })
        .collect();

    sleep_ms(100);
    service.deinit().expect("Failed to stop timer service");
    let after_deinit = counter.count();
    assert!(timers.iter().all(|t| !t.is_active()));
    assert_eq!(service.armed_count().unwrap(), 0);

    sleep_ms(200);
    assert_eq!(counter.count(), after_deinit, "Timer fired after deinit");
}

/// The service can be started again after a deinit
#[test]
fn test_reinit_after_deinit() {
    init_logging();
    let service = TimerService::with_config(TimerServiceConfig {
        thread_name: "reinit-timer".to_string(),
        ..Default::default()
    });
    let counter = FireCounter::new();
    let timer = service
        .create("again", TimerKind::OneShot, 30, false, counter.callback())
        .expect("Failed to create timer");

    for round in 1..=3 {
        service.init().expect("Failed to start timer service");
        timer.start().expect("Failed to start timer");
        sleep_ms(150);
        service.deinit().expect("Failed to stop timer service");
        assert_eq!(counter.count(), round);
    }
}

/// Timers armed before the thread exists fire once it is started
#[test]
fn test_timer_armed_before_init() {
    init_logging();
    let service = TimerService::new();
    let counter = FireCounter::new();
    let _timer = service
        .create("early", TimerKind::OneShot, 20, true, counter.callback())
        .expect("Failed to create timer");

    sleep_ms(100);
    assert_eq!(counter.count(), 0, "Fired without a running service");

    service.init().expect("Failed to start timer service");
    sleep_ms(150);
    assert_eq!(counter.count(), 1);
    service.deinit().expect("Failed to stop timer service");
}

/// A callback cannot tear down the service that runs it
#[test]
fn test_deinit_from_callback_is_refused() {
    init_logging();
    let service = Arc::new(TimerService::new());
    service.init().expect("Failed to start timer service");

    let outcome = Arc::new(Mutex::new(None));
    let (svc, out) = (Arc::downgrade(&service), Arc::clone(&outcome));
    let _timer = service
        .create("suicide", TimerKind::OneShot, 20, true, move || {
            if let Some(svc) = svc.upgrade() {
                *out.lock().unwrap() = Some(svc.deinit());
            }
        })
        .expect("Failed to create timer");

    sleep_ms(150);
    assert_eq!(
        outcome.lock().unwrap().clone(),
        Some(Err(PalError::PermissionDenied))
    );
    assert!(service.is_running().unwrap());
    service.deinit().expect("Failed to stop timer service");
}

/// Dropping the service stops its thread
#[test]
fn test_drop_stops_service() {
    init_logging();
    let counter = FireCounter::new();
    let timer = {
        let service = TimerService::new();
        service.init().expect("Failed to start timer service");
        service
            .create("orphan", TimerKind::Periodic, 30, true, counter.callback())
            .expect("Failed to create timer")
    };
    assert!(!timer.is_active(), "Service drop should disarm timers");

    let before = counter.count();
    sleep_ms(150);
    assert_eq!(counter.count(), before);
}

/// A callback may query or restart the service while another thread is
/// stopping it
#[test]
fn test_callback_uses_service_during_deinit() {
    init_logging();
    let service = Arc::new(TimerService::new());
    service.init().expect("Failed to start timer service");

    let seen = Arc::new(Mutex::new(None));
    let (svc, out) = (Arc::downgrade(&service), Arc::clone(&seen));
    let _timer = service
        .create("slow", TimerKind::OneShot, 20, true, move || {
            sleep_ms(200);
            if let Some(svc) = svc.upgrade() {
                *out.lock().unwrap() = Some((svc.is_running(), svc.init()));
            }
        })
        .expect("Failed to create timer");

    // Let the callback start before stopping the service under it
    sleep_ms(80);
    let (tx, rx) = mpsc::channel();
    let stopper = Arc::clone(&service);
    let worker = std::thread::spawn(move || {
        let _ = tx.send(stopper.deinit());
    });

    let result = rx
        .recv_timeout(Duration::from_secs(3))
        .expect("deinit did not return while a callback used the service");
    assert_eq!(result, Ok(()));
    worker.join().unwrap();

    assert_eq!(
        seen.lock().unwrap().clone(),
        Some((Ok(false), Err(PalError::ResourceUnavailable)))
    );
    assert!(!service.is_running().unwrap());

    service.init().expect("init after deinit should succeed");
    assert!(service.is_running().unwrap());
    service.deinit().expect("Failed to stop timer service");
}

/// Releasing the last reference to the service from one of its callbacks
/// still stops every timer
#[test]
fn test_service_dropped_from_callback() {
    init_logging();
    let holder: Arc<Mutex<Option<TimerService>>> = Arc::new(Mutex::new(None));
    let service = TimerService::new();
    service.init().expect("Failed to start timer service");

    let counter = FireCounter::new();
    let ticker = service
        .create("ticker", TimerKind::Periodic, 20, true, counter.callback())
        .expect("Failed to create timer");
    let slot = Arc::clone(&holder);
    let _dropper = service
        .create("dropper", TimerKind::OneShot, 50, true, move || {
            drop(slot.lock().unwrap().take());
        })
        .expect("Failed to create timer");
    *holder.lock().unwrap() = Some(service);

    sleep_ms(150);
    assert!(holder.lock().unwrap().is_none(), "Callback did not run");
    assert!(!ticker.is_active(), "Service drop should disarm timers");

    let before = counter.count();
    sleep_ms(200);
    assert_eq!(counter.count(), before, "Timer fired after service drop");
}
