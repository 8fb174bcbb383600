//! Tests for the single-flight repeating timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use viewsync_core::{RepeatingTimer, TimerConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_executions_never_overlap() {
    init_tracing();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let overlapped = Arc::new(AtomicBool::new(false));
    let executions = Arc::new(AtomicUsize::new(0));

    let (in_flight_c, overlapped_c, executions_c) =
        (in_flight.clone(), overlapped.clone(), executions.clone());

    // The callback takes longer than the interval
    let timer = RepeatingTimer::new(
        TimerConfig::new(Duration::from_millis(5)).name("overlap-test"),
        move || {
            if in_flight_c.fetch_add(1, Ordering::SeqCst) > 0 {
                overlapped_c.store(true, Ordering::SeqCst);
            }
            thread::sleep(Duration::from_millis(20));
            executions_c.fetch_add(1, Ordering::SeqCst);
            in_flight_c.fetch_sub(1, Ordering::SeqCst);
        },
    )
    .unwrap();

    timer.start().unwrap();
    thread::sleep(Duration::from_millis(150));

    // Pausing and resuming quickly must not spawn a second concurrent firing
    timer.stop(false);
    timer.start().unwrap();
    thread::sleep(Duration::from_millis(100));
    timer.stop(true);

    assert!(!overlapped.load(Ordering::SeqCst));
    assert!(executions.load(Ordering::SeqCst) >= 2);
}

#[test]
fn test_stop_waits_for_in_flight_execution() {
    init_tracing();
    let started = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));
    let (started_c, finished_c) = (started.clone(), finished.clone());

    let timer = RepeatingTimer::new(TimerConfig::new(Duration::from_millis(5)), move || {
        started_c.store(true, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(60));
        finished_c.store(true, Ordering::SeqCst);
    })
    .unwrap();

    timer.start().unwrap();
    while !started.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(1));
    }

    timer.stop(true);
    assert!(finished.load(Ordering::SeqCst));
}

#[test]
fn test_no_execution_after_drop() {
    let count = Arc::new(AtomicUsize::new(0));
    let count_c = count.clone();

    {
        let timer = RepeatingTimer::new(TimerConfig::new(Duration::from_millis(5)), move || {
            count_c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        timer.start().unwrap();
        thread::sleep(Duration::from_millis(40));
    }

    let after_drop = count.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(40));
    assert_eq!(count.load(Ordering::SeqCst), after_drop);
}

#[test]
fn test_fired_count_tracks_executions() {
    let timer = RepeatingTimer::new(TimerConfig::new(Duration::from_millis(10)), || {}).unwrap();
    assert_eq!(timer.fired_count(), 0);
    assert_eq!(timer.interval(), Duration::from_millis(10));

    timer.start().unwrap();
    thread::sleep(Duration::from_millis(80));
    timer.stop(true);

    assert!(timer.fired_count() >= 1);
}
