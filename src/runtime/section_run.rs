// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The handle a run block receives: signaling, cancellation, asides, timers,
//! and callback registration. Clones are cheap and share the run.

use crate::{CommonError, CommonErrorType, CommonResult, Key, OnInputChangedScope,
            OnInputEnteredScope, RenderScope, SectionShared, SessionInner,
            TimerKey, TimerScope, ok};
use std::{future::Future,
          sync::Arc,
          time::Duration};
use tokio::sync::broadcast;

/// The suspendable foreground of a running section. Passed to the block given
/// to [`crate::Section::run_with`] and friends.
#[derive(Clone)]
pub struct SectionRun {
    pub(crate) shared: Arc<SectionShared>,
}

impl SectionRun {
    fn session(&self) -> CommonResult<Arc<SessionInner>> {
        match self.shared.session.upgrade() {
            Some(session) => ok!(session),
            None => CommonError::new_error_result(
                CommonErrorType::InvalidState,
                "the owning session is gone",
            ),
        }
    }

    /// Unblock every current and future [`SectionRun::wait_for_signal`].
    pub fn signal(&self) { self.shared.signal(); }

    /// Suspend until [`SectionRun::signal`] is called. Returns immediately if
    /// it already was.
    pub async fn wait_for_signal(&self) {
        let mut signal_rx = self.shared.signal_rx.clone();
        _ = signal_rx.wait_for(|signaled| *signaled).await;
    }

    /// Cooperatively cancel the run block. Treated as an orderly exit: the
    /// section still drains renders and runs its finishing hooks, and `run`
    /// returns `Ok`.
    pub fn abort(&self) { _ = self.shared.shutdown_tx.send(()); }

    /// Request a rerender of the section (coalesced).
    pub fn request_rerender(&self) { self.shared.request_rerender(); }

    /// Emit a one-shot line above the live region. Asides flush in enqueue
    /// order on the next repaint and become immutable history.
    pub fn aside(&self, block: impl FnOnce(&mut RenderScope) + Send + 'static) {
        self.shared.enqueue_aside(Box::new(block));
    }

    /// Schedule a timer on this run. See [`crate::TimerManager::add_timer`].
    pub fn add_timer(
        &self,
        duration: Duration,
        repeat: bool,
        callback: impl FnMut(&mut TimerScope<'_>) + Send + 'static,
    ) -> CommonResult<()> {
        let session = self.session()?;
        match self.shared.run_timers(&session) {
            Some(timers) => timers.add_timer(duration, repeat, callback),
            None => CommonError::new_error_result(
                CommonErrorType::InvalidState,
                "no timer manager; the run is not active",
            ),
        }
    }

    /// Schedule a deduplicated timer on this run. See
    /// [`crate::TimerManager::add_timer_keyed`].
    pub fn add_timer_keyed(
        &self,
        key: TimerKey,
        duration: Duration,
        repeat: bool,
        callback: impl FnMut(&mut TimerScope<'_>) + Send + 'static,
    ) -> CommonResult<()> {
        let session = self.session()?;
        match self.shared.run_timers(&session) {
            Some(timers) => timers.add_timer_keyed(key, duration, repeat, callback),
            None => CommonError::new_error_result(
                CommonErrorType::InvalidState,
                "no timer manager; the run is not active",
            ),
        }
    }

    /// Suspend the run block for `duration`.
    pub async fn pause_for(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Spawn a child task that is cancelled when the run ends.
    pub fn spawn(&self, future: impl Future<Output = ()> + Send + 'static) {
        let handle = tokio::spawn(future);
        self.shared.child_tasks.lock().unwrap().push(handle);
    }

    /// Subscribe to the session's logical key stream.
    pub fn subscribe_keys(&self) -> CommonResult<broadcast::Receiver<Key>> {
        let session = self.session()?;
        ok!(session.key_tx.subscribe())
    }

    /// Register a callback invoked (in registration order) for every key the
    /// session reads while this run is live.
    pub fn on_key_pressed(&self, callback: impl FnMut(Key) + Send + 'static) {
        self.shared
            .callbacks
            .key_pressed
            .lock()
            .unwrap()
            .push(Box::new(callback));
    }

    /// Register a callback invoked whenever the input widget's text is about
    /// to change. Callbacks run in registration order and may rewrite or
    /// reject the proposed text.
    pub fn on_input_changed(
        &self,
        callback: impl FnMut(&mut OnInputChangedScope) + Send + 'static,
    ) {
        self.shared
            .callbacks
            .input_changed
            .lock()
            .unwrap()
            .push(Box::new(callback));
    }

    /// Register a callback invoked when Enter is pressed in the input widget,
    /// before the section's internal enter handling.
    pub fn on_input_entered(
        &self,
        callback: impl FnMut(&mut OnInputEnteredScope) + Send + 'static,
    ) {
        self.shared
            .callbacks
            .input_entered
            .lock()
            .unwrap()
            .push(Box::new(callback));
    }

    /// Register a finishing hook. See [`crate::Section::on_finishing`].
    pub fn on_finishing(&self, hook: impl FnOnce() + Send + 'static) {
        self.shared
            .callbacks
            .finishing
            .lock()
            .unwrap()
            .push(Box::new(hook));
    }
}
