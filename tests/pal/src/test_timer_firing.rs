// Licensed under the Apache-2.0 license

//! Expiry behaviour of one-shot and periodic timers

use crate::common::{init_logging, sleep_ms, test_constants::*, FireCounter};
use pal_os::{TimerKind, TimerService};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A one-shot timer fires exactly once and then reports inactive
#[test]
fn test_one_shot_fires_once() {
    init_logging();
    let service = TimerService::new();
    service.init().expect("Failed to start timer service");

    let counter = FireCounter::new();
    let timer = service
        .create(
            "one-shot",
            TimerKind::OneShot,
            ONE_SHOT_PERIOD_MS,
            true,
            counter.callback(),
        )
        .expect("Failed to create timer");
    assert!(timer.is_active(), "Auto-started timer should be active");

    sleep_ms(OBSERVE_MS);

    assert_eq!(counter.count(), 1, "One-shot timer should fire once");
    assert!(!timer.is_active(), "One-shot timer should be inactive after firing");
    service.deinit().expect("Failed to stop timer service");
}

/// A periodic timer keeps firing at its period while active
#[test]
fn test_periodic_fires_repeatedly() {
    init_logging();
    let service = TimerService::new();
    service.init().expect("Failed to start timer service");

    let counter = FireCounter::new();
    let timer = service
        .create(
            "periodic",
            TimerKind::Periodic,
            PERIODIC_PERIOD_MS,
            true,
            counter.callback(),
        )
        .expect("Failed to create timer");

    sleep_ms(OBSERVE_MS);

    let fired = counter.count();
    log::info!("periodic timer fired {} times", fired);
    assert!(
        (2..=4).contains(&fired),
        "Expected about 3 fires in {} ms, got {}",
        OBSERVE_MS,
        fired
    );
    assert!(timer.is_active(), "Periodic timer should stay active");
    service.deinit().expect("Failed to stop timer service");
}

/// Timers fire in deadline order regardless of creation order
#[test]
fn test_fire_order_follows_deadlines() {
    init_logging();
    let service = TimerService::new();
    service.init().expect("Failed to start timer service");

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut timers = Vec::new();
    for (label, period) in [("c", 150u64), ("a", 50), ("b", 100)] {
        let order = Arc::clone(&order);
        timers.push(
            service
                .create(label, TimerKind::OneShot, period, true, move || {
                    order.lock().unwrap().push(label);
                })
                .expect("Failed to create timer"),
        );
    }

    sleep_ms(400);

    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    service.deinit().expect("Failed to stop timer service");
}

/// Arming an earlier timer while the engine waits on a later one is noticed
#[test]
fn test_earlier_timer_preempts_wait() {
    init_logging();
    let service = TimerService::new();
    service.init().expect("Failed to start timer service");

    let _late = service
        .create("late", TimerKind::OneShot, 10_000, true, || {})
        .expect("Failed to create timer");
    // Give the engine time to block on the late deadline.
    sleep_ms(50);

    let (tx, rx) = std::sync::mpsc::channel();
    let armed_at = Instant::now();
    let _early = service
        .create("early", TimerKind::OneShot, 50, true, move || {
            let _ = tx.send(Instant::now());
        })
        .expect("Failed to create timer");

    let fired_at = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("Early timer did not fire");
    let latency = fired_at.duration_since(armed_at);
    assert!(
        latency < Duration::from_millis(1000),
        "Early timer fired after {:?}",
        latency
    );
    service.deinit().expect("Failed to stop timer service");
}

/// Periodic rearm is anchored to the previous deadline, so slow callbacks
/// do not push later expiries back
#[test]
fn test_periodic_rearm_does_not_drift() {
    init_logging();
    let service = TimerService::new();
    service.init().expect("Failed to start timer service");

    let counter = FireCounter::new();
    let mut tick = counter.callback();
    let _timer = service
        .create("slow-callback", TimerKind::Periodic, 100, true, move || {
            tick();
            sleep_ms(40);
        })
        .expect("Failed to create timer");

    sleep_ms(1050);

    let fired = counter.count();
    assert!(
        (9..=11).contains(&fired),
        "Expected about 10 fires, got {}",
        fired
    );
    service.deinit().expect("Failed to stop timer service");
}

/// Each service runs its own thread; stopping one leaves the other running
#[test]
fn test_services_are_independent() {
    init_logging();
    let first = TimerService::new();
    let second = TimerService::new();
    first.init().expect("Failed to start first service");
    second.init().expect("Failed to start second service");

    let a = FireCounter::new();
    let b = FireCounter::new();
    let _ta = first
        .create("a", TimerKind::Periodic, 50, true, a.callback())
        .expect("Failed to create timer");
    let _tb = second
        .create("b", TimerKind::Periodic, 50, true, b.callback())
        .expect("Failed to create timer");

    sleep_ms(200);
    first.deinit().expect("Failed to stop first service");
    let a_stopped_at = a.count();
    let b_before = b.count();
    sleep_ms(200);

    assert_eq!(a.count(), a_stopped_at, "Stopped service kept firing");
    assert!(b.count() > b_before, "Running service stopped firing");
    second.deinit().expect("Failed to stop second service");
}
