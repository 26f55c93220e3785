// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Per-run timers. One background loop ticks at ~16 ms and drains every due
//! timer in wake-up order; callbacks can stretch, shrink, or stop their own
//! timer through the scope they receive.

use crate::{CommonError, CommonErrorType, CommonResult, StdMutex, ok};
use std::sync::{Arc,
                atomic::{AtomicU64, Ordering}};
use tokio::{sync::broadcast,
            time::{Duration, Instant, MissedTickBehavior, interval}};

/// How often the timer loop wakes up to look for due timers.
pub const TIMER_TICK: Duration = Duration::from_millis(16);

static NEXT_TIMER_KEY: AtomicU64 = AtomicU64::new(1);

/// Identity used for timer deduplication: scheduling with a key that a live
/// timer already holds is a no-op. Animations use one unique key per instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerKey(u64);

impl TimerKey {
    #[must_use]
    pub fn unique() -> Self { Self(NEXT_TIMER_KEY.fetch_add(1, Ordering::Relaxed)) }
}

/// What a timer callback sees on each fire.
pub struct TimerScope<'a> {
    /// Time since this timer last fired (or was enqueued, for the first fire).
    pub elapsed: Duration,
    /// Time since the timer was enqueued.
    pub total_elapsed: Duration,
    /// The period. May be reassigned; setting it to zero removes the timer.
    pub duration: &'a mut Duration,
    /// Whether the timer reschedules after this fire.
    pub repeat: &'a mut bool,
}

type TimerCallback = Box<dyn FnMut(&mut TimerScope<'_>) + Send>;

struct TimerEntry {
    wake_up: Instant,
    enqueued: Instant,
    last_fire: Instant,
    duration: Duration,
    repeat: bool,
    key: Option<TimerKey>,
    /// Tie-break for equal wake-up times; stable, semantically irrelevant.
    sequence: u64,
    callback: TimerCallback,
}

#[derive(Default)]
struct TimerManagerInner {
    timers: Vec<TimerEntry>,
    next_sequence: u64,
    stopped: bool,
}

/// The per-run timer set. Cloneable handle; the run lifecycle disposes it
/// (discarding every timer) before the section's finishing hooks observe the
/// world, so those hooks see a quiescent system.
#[derive(Clone)]
pub struct TimerManager {
    inner: Arc<StdMutex<TimerManagerInner>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl TimerManager {
    /// Create the manager and spawn its background loop.
    pub(crate) fn start() -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let inner = Arc::new(StdMutex::new(TimerManagerInner::default()));
        tokio::spawn(run_loop(inner.clone(), shutdown_rx));
        Self { inner, shutdown_tx }
    }

    /// Schedule a timer. `duration` must be non-zero.
    pub fn add_timer(
        &self,
        duration: Duration,
        repeat: bool,
        callback: impl FnMut(&mut TimerScope<'_>) + Send + 'static,
    ) -> CommonResult<()> {
        self.add_internal(duration, repeat, None, Box::new(callback))
    }

    /// Schedule a timer with a dedup key: a no-op when a live timer already
    /// holds `key`.
    pub fn add_timer_keyed(
        &self,
        key: TimerKey,
        duration: Duration,
        repeat: bool,
        callback: impl FnMut(&mut TimerScope<'_>) + Send + 'static,
    ) -> CommonResult<()> {
        self.add_internal(duration, repeat, Some(key), Box::new(callback))
    }

    fn add_internal(
        &self,
        duration: Duration,
        repeat: bool,
        key: Option<TimerKey>,
        callback: TimerCallback,
    ) -> CommonResult<()> {
        if duration.is_zero() {
            return CommonError::new_error_result(
                CommonErrorType::InvalidTimer,
                "timer duration must be positive",
            );
        }
        let mut inner = self.inner.lock().unwrap();
        if inner.stopped {
            return CommonError::new_error_result(
                CommonErrorType::InvalidState,
                "timer manager has been disposed",
            );
        }
        if key.is_some() && inner.timers.iter().any(|it| it.key == key) {
            return ok!();
        }
        let now = Instant::now();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.timers.push(TimerEntry {
            wake_up: now + duration,
            enqueued: now,
            last_fire: now,
            duration,
            repeat,
            key,
            sequence,
            callback,
        });
        ok!()
    }

    /// How many timers are currently live.
    #[must_use]
    pub fn timer_count(&self) -> usize { self.inner.lock().unwrap().timers.len() }

    /// Discard every timer and stop the loop. Idempotent.
    pub(crate) fn shutdown(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.stopped = true;
            inner.timers.clear();
        }
        _ = self.shutdown_tx.send(());
    }
}

async fn run_loop(
    inner: Arc<StdMutex<TimerManagerInner>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = interval(TIMER_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            // Cancel safe: recv is cancel safe.
            _ = shutdown_rx.recv() => break,
            // Cancel safe: tick is cancel safe.
            _ = ticker.tick() => fire_due_timers(&inner),
        }
    }
}

/// Fire every timer whose wake-up time has passed, in `(wake_up, sequence)`
/// order. Callbacks run outside the lock so they can schedule further timers.
fn fire_due_timers(inner: &Arc<StdMutex<TimerManagerInner>>) {
    let now = Instant::now();
    loop {
        let mut entry = {
            let mut guard = inner.lock().unwrap();
            if guard.stopped {
                return;
            }
            let due_index = guard
                .timers
                .iter()
                .enumerate()
                .filter(|(_, it)| it.wake_up <= now)
                .min_by_key(|(_, it)| (it.wake_up, it.sequence))
                .map(|(index, _)| index);
            match due_index {
                Some(index) => guard.timers.remove(index),
                None => return,
            }
        };

        let mut duration = entry.duration;
        let mut repeat = entry.repeat;
        {
            let mut scope = TimerScope {
                elapsed: now - entry.last_fire,
                total_elapsed: now - entry.enqueued,
                duration: &mut duration,
                repeat: &mut repeat,
            };
            (entry.callback)(&mut scope);
        }

        if repeat && !duration.is_zero() {
            entry.duration = duration;
            entry.last_fire = now;
            entry.wake_up = now + duration;
            let mut guard = inner.lock().unwrap();
            if !guard.stopped {
                guard.timers.push(entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    async fn advance(duration: Duration) { tokio::time::sleep(duration).await; }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_timer_fires_once() {
        let manager = TimerManager::start();
        let fires = Arc::new(AtomicUsize::new(0));
        let fires_clone = fires.clone();
        manager
            .add_timer(Duration::from_millis(50), false, move |_| {
                fires_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        advance(Duration::from_millis(200)).await;
        assert_eq!(fires.load(Ordering::SeqCst), 1);
        assert_eq!(manager.timer_count(), 0);
        manager.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_until_callback_stops() {
        let manager = TimerManager::start();
        let fires = Arc::new(AtomicUsize::new(0));
        let fires_clone = fires.clone();
        manager
            .add_timer(Duration::from_millis(20), true, move |scope| {
                let count = fires_clone.fetch_add(1, Ordering::SeqCst) + 1;
                if count == 3 {
                    *scope.repeat = false;
                }
            })
            .unwrap();

        advance(Duration::from_millis(500)).await;
        // Fires exactly n times when the callback flips repeat off on fire n.
        assert_eq!(fires.load(Ordering::SeqCst), 3);
        assert_eq!(manager.timer_count(), 0);
        manager.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_is_rejected() {
        let manager = TimerManager::start();
        let report = manager
            .add_timer(Duration::ZERO, false, |_| {})
            .unwrap_err();
        assert!(CommonError::is_error_type(
            &report,
            CommonErrorType::InvalidTimer
        ));
        manager.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_keyed_dedup() {
        let manager = TimerManager::start();
        let key = TimerKey::unique();
        let fires = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let fires_clone = fires.clone();
            manager
                .add_timer_keyed(key, Duration::from_millis(30), false, move |_| {
                    fires_clone.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        assert_eq!(manager.timer_count(), 1);

        advance(Duration::from_millis(100)).await;
        assert_eq!(fires.load(Ordering::SeqCst), 1);

        // The keyed timer fired and was removed; the key is reusable.
        let fires_clone = fires.clone();
        manager
            .add_timer_keyed(key, Duration::from_millis(30), false, move |_| {
                fires_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(manager.timer_count(), 1);
        manager.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_timers() {
        let manager = TimerManager::start();
        let fires = Arc::new(AtomicUsize::new(0));
        let fires_clone = fires.clone();
        manager
            .add_timer(Duration::from_millis(10), true, move |_| {
                fires_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        manager.shutdown();

        let before = fires.load(Ordering::SeqCst);
        advance(Duration::from_millis(100)).await;
        assert_eq!(fires.load(Ordering::SeqCst), before);
        assert!(manager.add_timer(Duration::from_millis(10), false, |_| {}).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_can_mutate_duration() {
        let manager = TimerManager::start();
        let fire_times = Arc::new(StdMutex::new(Vec::new()));
        let fire_times_clone = fire_times.clone();
        let start = Instant::now();
        manager
            .add_timer(Duration::from_millis(16), true, move |scope| {
                fire_times_clone.lock().unwrap().push(start.elapsed());
                // Slow down after the first fire.
                *scope.duration = Duration::from_millis(100);
            })
            .unwrap();

        advance(Duration::from_millis(400)).await;
        let times = fire_times.lock().unwrap().clone();
        assert!(times.len() >= 2);
        // Second fire happens ~100ms after the first, not ~16ms.
        assert!(times[1] - times[0] >= Duration::from_millis(100));
        manager.shutdown();
    }
}
