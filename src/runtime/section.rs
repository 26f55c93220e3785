// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The unit of atomic repaint. A section binds a render block to the session's
//! single active-block slot, coalesces rerender requests, drains asides into
//! history, and redraws its previous rectangle in place with one terminal
//! write per pass.

use crate::{CommonError, CommonErrorType, CommonResult, CsiCode, InputState, Key,
            Lifecycle, OnInputChangedScope, OnInputEnteredScope, RenderScope,
            ScopedKey, SectionRun, SessionInner, StdMutex, TimerManager, ok,
            runtime::input::input_state::handle_key_for_section,
            runtime::session::RenderJob};
use std::{future::Future,
          panic::{AssertUnwindSafe, catch_unwind},
          sync::{Arc, Weak,
                 atomic::{AtomicBool, Ordering}}};
use tokio::{sync::{broadcast, watch},
            task::JoinHandle};

pub(crate) type RenderBlockFn = Arc<dyn Fn(&mut RenderScope) + Send + Sync>;
pub(crate) type AsideRenderFn = Box<dyn FnOnce(&mut RenderScope) + Send>;
pub(crate) type KeyPressedCallback = Box<dyn FnMut(Key) + Send>;
pub(crate) type InputChangedCallback = Box<dyn FnMut(&mut OnInputChangedScope) + Send>;
pub(crate) type InputEnteredCallback = Box<dyn FnMut(&mut OnInputEnteredScope) + Send>;
pub(crate) type FinishingCallback = Box<dyn FnOnce() + Send>;

/// Mutable render bookkeeping, guarded by the section's render lock.
pub(crate) struct SectionRenderState {
    /// The coalescing flag: set while a render job is queued but not started.
    pub render_requested: bool,
    /// `num_lines` of the previous pass's area; `None` before the first pass.
    pub prev_lines: Option<usize>,
    /// First `input()` misuse seen during a pass; `run` propagates it.
    pub policy_error: Option<String>,
    /// Set when the run is over; late rerender requests are ignored.
    pub closed: bool,
}

/// The typed keys a run parks its state under. Stopping the run lifecycle
/// reclaims both.
#[derive(Clone)]
pub(crate) struct RunKeys {
    pub timers: ScopedKey<TimerManager>,
    pub input: ScopedKey<InputState>,
}

#[derive(Default)]
pub(crate) struct SectionCallbacks {
    pub key_pressed: StdMutex<Vec<KeyPressedCallback>>,
    pub input_changed: StdMutex<Vec<InputChangedCallback>>,
    pub input_entered: StdMutex<Vec<InputEnteredCallback>>,
    pub finishing: StdMutex<Vec<FinishingCallback>>,
}

pub(crate) struct SectionShared {
    pub(crate) session: Weak<SessionInner>,
    pub(crate) render_block: RenderBlockFn,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) run_lifecycle: Lifecycle,
    pub(crate) state: StdMutex<SectionRenderState>,
    pub(crate) asides: StdMutex<Vec<AsideRenderFn>>,
    pub(crate) callbacks: SectionCallbacks,
    pub(crate) run_keys: StdMutex<Option<RunKeys>>,
    pub(crate) consumed: AtomicBool,
    /// Signals `run_until_input_entered` to stop on an accepted enter.
    pub(crate) signal_on_input_entered: AtomicBool,
    /// Keys that signal the run (`run_until_key_pressed`). Checked by the key
    /// dispatch task, so no keypress can race callback registration.
    pub(crate) signal_on_keys: StdMutex<Vec<Key>>,
    pub(crate) signal_tx: watch::Sender<bool>,
    pub(crate) signal_rx: watch::Receiver<bool>,
    /// Cooperative cancellation for the run block and the key dispatch task.
    pub(crate) shutdown_tx: broadcast::Sender<()>,
    /// Tasks spawned through the run scope; cancelled when the run ends.
    pub(crate) child_tasks: StdMutex<Vec<JoinHandle<()>>>,
}

impl SectionShared {
    pub(crate) fn new(
        session: Weak<SessionInner>,
        section_lifecycle: Lifecycle,
        render_block: RenderBlockFn,
    ) -> Arc<Self> {
        let (signal_tx, signal_rx) = watch::channel(false);
        let (shutdown_tx, _) = broadcast::channel(1);
        let run_lifecycle = section_lifecycle.child("run");
        Arc::new(Self {
            session,
            render_block,
            lifecycle: section_lifecycle,
            run_lifecycle,
            state: StdMutex::new(SectionRenderState {
                render_requested: false,
                prev_lines: None,
                policy_error: None,
                closed: false,
            }),
            asides: StdMutex::new(Vec::new()),
            callbacks: SectionCallbacks::default(),
            run_keys: StdMutex::new(None),
            consumed: AtomicBool::new(false),
            signal_on_input_entered: AtomicBool::new(false),
            signal_on_keys: StdMutex::new(Vec::new()),
            signal_tx,
            signal_rx,
            shutdown_tx,
            child_tasks: StdMutex::new(Vec::new()),
        })
    }

    /// Coalescing rerender request: any number of calls while a render is
    /// already queued collapse into that one queued pass.
    pub(crate) fn request_rerender(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().unwrap();
            if state.closed || state.render_requested {
                return;
            }
            state.render_requested = true;
        }
        if let Some(session) = self.session.upgrade() {
            session.enqueue_render(RenderJob::Pass(Arc::downgrade(self), None));
        }
    }

    pub(crate) fn enqueue_aside(self: &Arc<Self>, aside: AsideRenderFn) {
        self.asides.lock().unwrap().push(aside);
        self.request_rerender();
    }

    pub(crate) fn record_policy_error(&self, message: &str) {
        let mut state = self.state.lock().unwrap();
        if state.policy_error.is_none() {
            state.policy_error = Some(message.to_string());
        }
    }

    pub(crate) fn input_key(&self) -> Option<ScopedKey<InputState>> {
        self.run_keys.lock().unwrap().as_ref().map(|keys| keys.input.clone())
    }

    /// The run's timer manager, if a run is in progress.
    pub(crate) fn run_timers(
        &self,
        session: &Arc<SessionInner>,
    ) -> Option<TimerManager> {
        let keys = self.run_keys.lock().unwrap().clone()?;
        session.data.get(&keys.timers)
    }

    pub(crate) fn signal(&self) { _ = self.signal_tx.send(true); }

    /// One render pass, executed on the session's render executor. Emits the
    /// clear-previous-area prefix, runs the render block (panics are swallowed
    /// and the partial area still flushes), drains queued asides into history,
    /// and writes the new area — all in a single terminal write.
    pub(crate) fn render_pass(self: &Arc<Self>) {
        let Some(session) = self.session.upgrade() else { return };

        let prev_lines = {
            let mut state = self.state.lock().unwrap();
            state.render_requested = false;
            state.prev_lines
        };

        let render_lifecycle = self.lifecycle.child("render");
        let render_lifecycle_started =
            session.data.start(&render_lifecycle).is_ok();

        let mut out = String::new();
        if let Some(lines) = prev_lines {
            // Step over the trailing newline of the previous pass, then erase
            // each of its lines bottom-up, ending at the top-left of the old
            // rectangle.
            push_clear_line(&mut out, true);
            for index in 0..lines {
                push_clear_line(&mut out, false);
                if index + 1 < lines {
                    out.push_str(&CsiCode::CursorPrevLine.to_string());
                }
            }
        }

        let mut scope = RenderScope::new_main(Arc::downgrade(self));
        let render_block = self.render_block.clone();
        if catch_unwind(AssertUnwindSafe(|| render_block(&mut scope))).is_err() {
            tracing::warn!("render block panicked; flushing the partial area");
        }

        let pending_asides: Vec<AsideRenderFn> =
            std::mem::take(&mut *self.asides.lock().unwrap());
        for aside in pending_asides {
            let mut aside_scope = RenderScope::new_aside(Arc::downgrade(self));
            if catch_unwind(AssertUnwindSafe(|| aside(&mut aside_scope))).is_err() {
                tracing::warn!("aside block panicked; flushing the partial line");
            }
            out.push_str(&aside_scope.into_area().to_output_string());
        }

        let area = scope.into_area();
        self.state.lock().unwrap().prev_lines = Some(area.num_lines());
        out.push_str(&area.to_output_string());

        session.terminal.write(&out);

        if render_lifecycle_started {
            session.data.stop(&render_lifecycle);
        }
    }
}

fn push_clear_line(out: &mut String, cursor_up_first: bool) {
    use std::fmt::Write as _;
    if cursor_up_first {
        _ = write!(out, "{}", CsiCode::CursorPrevLine);
    }
    out.push('\r');
    _ = write!(out, "{}", CsiCode::EraseToLineEnd);
}

/// One invocation of [`crate::Session::section`]: a render block bound to the
/// active-block slot. Register finishing hooks up front, then consume it with
/// one of the `run*` methods.
pub struct Section {
    pub(crate) shared: Arc<SectionShared>,
}

impl Section {
    /// Register a hook that runs after the run block completes and timers are
    /// quiesced. A hook may request one last rerender.
    pub fn on_finishing(&self, hook: impl FnOnce() + Send + 'static) -> &Self {
        self.callbacks_finishing_push(Box::new(hook));
        self
    }

    fn callbacks_finishing_push(&self, hook: FinishingCallback) {
        self.shared.callbacks.finishing.lock().unwrap().push(hook);
    }

    /// Render once and finish (no run block).
    pub async fn run(&self) -> CommonResult<()> {
        self.run_with(|_| async { ok!() }).await
    }

    /// Run with a background block. The block executes on its own task and may
    /// suspend freely; the section keeps rerendering reactively until it
    /// returns. Errors from the block propagate; a cooperative
    /// [`SectionRun::abort`] does not.
    pub async fn run_with<F, Fut>(&self, block: F) -> CommonResult<()>
    where
        F: FnOnce(SectionRun) -> Fut + Send + 'static,
        Fut: Future<Output = CommonResult<()>> + Send + 'static,
    {
        let shared = &self.shared;
        let Some(session) = shared.session.upgrade() else {
            return CommonError::new_error_result(
                CommonErrorType::InvalidState,
                "the owning session is gone",
            );
        };

        if shared.consumed.swap(true, Ordering::SeqCst) {
            return CommonError::new_error_result_with_only_type(
                CommonErrorType::SectionConsumed,
            );
        }
        session.stake_active_section(shared)?;
        tracing::debug!(lifecycle = ?shared.lifecycle, "section run starting");

        if let Err(report) = setup_run_state(shared, &session) {
            session.clear_active_section(shared);
            return Err(report);
        }

        // Key dispatch: one task per run consumes the shared key stream and
        // feeds callbacks + the input widget, in arrival order.
        let dispatch_handle = spawn_key_dispatch(shared, &session);

        // Initial synchronous render.
        session
            .enqueue_render_with_ack(Arc::downgrade(shared))
            .await;

        // The user's run block, with cooperative cancellation.
        let mut shutdown_rx = shared.shutdown_tx.subscribe();
        let run_scope = SectionRun {
            shared: shared.clone(),
        };
        let user_future = block(run_scope);
        let run_handle = tokio::spawn(async move {
            tokio::select! {
                result = user_future => result,
                _ = shutdown_rx.recv() => ok!(),
            }
        });
        let run_result: CommonResult<()> = match run_handle.await {
            Ok(result) => result,
            Err(join_error) => CommonError::new_error_result(
                CommonErrorType::General,
                &format!("run block panicked: {join_error}"),
            ),
        };

        // Quiesce timers before the finishing hooks observe the world.
        if let Some(timers) = shared.run_timers(&session) {
            timers.shutdown();
        }
        for child in shared.child_tasks.lock().unwrap().drain(..) {
            child.abort();
        }

        // Drain remaining rerenders (the run block may have requested one).
        session.drain_renders().await;

        let finishing_hooks: Vec<FinishingCallback> =
            shared.callbacks.finishing.lock().unwrap().drain(..).collect();
        for hook in finishing_hooks {
            hook();
        }
        // The finishing hooks may have requested one last rerender.
        session.drain_renders().await;

        _ = shared.shutdown_tx.send(());
        dispatch_handle.abort();
        shared.state.lock().unwrap().closed = true;

        session.data.stop(&shared.run_lifecycle);
        session.clear_active_section(shared);
        session.data.stop(&shared.lifecycle);
        tracing::debug!(lifecycle = ?shared.lifecycle, "section run finished");

        let policy_error = shared.state.lock().unwrap().policy_error.take();
        match (run_result, policy_error) {
            (Err(report), _) => Err(report),
            (Ok(()), Some(message)) => CommonError::new_error_result(
                CommonErrorType::InvalidInputContext,
                &message,
            ),
            (Ok(()), None) => ok!(),
        }
    }

    /// Run `block`, then keep the section live until [`SectionRun::signal`] is
    /// called.
    pub async fn run_until_signal<F, Fut>(&self, block: F) -> CommonResult<()>
    where
        F: FnOnce(SectionRun) -> Fut + Send + 'static,
        Fut: Future<Output = CommonResult<()>> + Send + 'static,
    {
        self.run_with(move |run| async move {
            block(run.clone()).await?;
            run.wait_for_signal().await;
            ok!()
        })
        .await
    }

    /// Keep the section live until one of `keys` is pressed.
    pub async fn run_until_key_pressed(
        &self,
        keys: impl IntoIterator<Item = Key>,
    ) -> CommonResult<()> {
        *self.shared.signal_on_keys.lock().unwrap() = keys.into_iter().collect();
        self.run_with(|run| async move {
            run.wait_for_signal().await;
            ok!()
        })
        .await
    }

    /// Keep the section live until the input widget accepts an entered line.
    pub async fn run_until_input_entered(&self) -> CommonResult<()> {
        self.shared
            .signal_on_input_entered
            .store(true, Ordering::SeqCst);
        self.run_with(|run| async move {
            run.wait_for_signal().await;
            ok!()
        })
        .await
    }
}

/// Start the run lifecycle and park the run-scoped state (timer manager, the
/// input widget's slot) in the data store under it.
fn setup_run_state(
    shared: &Arc<SectionShared>,
    session: &Arc<SessionInner>,
) -> CommonResult<()> {
    session.data.start(&shared.run_lifecycle)?;
    let timers_key = shared.run_lifecycle.create_key::<TimerManager>("timers");
    let input_key = shared.run_lifecycle.create_key::<InputState>("input");
    session
        .data
        .put_with_dispose(&timers_key, TimerManager::start(), |manager| {
            manager.shutdown();
        })?;
    *shared.run_keys.lock().unwrap() = Some(RunKeys {
        timers: timers_key,
        input: input_key,
    });
    ok!()
}

fn spawn_key_dispatch(
    shared: &Arc<SectionShared>,
    session: &Arc<SessionInner>,
) -> JoinHandle<()> {
    let mut key_rx = session.key_tx.subscribe();
    let mut shutdown_rx = shared.shutdown_tx.subscribe();
    let weak_section = Arc::downgrade(shared);
    let weak_session = Arc::downgrade(session);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                received = key_rx.recv() => match received {
                    Ok(key) => {
                        let (Some(section), Some(session)) =
                            (weak_section.upgrade(), weak_session.upgrade())
                        else {
                            break;
                        };
                        handle_key_for_section(&section, &session, key);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "key dispatch lagged; keys dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    })
}
