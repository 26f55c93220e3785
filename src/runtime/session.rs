// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The top-level lifetime: one terminal, one data store, one render executor,
//! one key reader, and at most one active section at a time.

use crate::{CommonError, CommonErrorType, CommonResult, ConcurrentScopedData, Key,
            Lifecycle, LiveList, LiveMap, LiveVar, RenderAnim, RenderScope,
            SafeTerminal, Section, SectionShared, StdMutex, Terminal, TextAnim,
            runtime::input::key_reader::spawn_key_reader};
use std::{hash::Hash,
          sync::{Arc, Weak,
                 atomic::{AtomicBool, Ordering}}};
use tokio::{sync::{broadcast, mpsc, oneshot},
            task::JoinHandle,
            time::Duration};

/// Capacity of the broadcast channel fanning keys out to consumers.
const KEY_CHANNEL_CAPACITY: usize = 1024;

/// A unit of work for the render executor. `Pass` renders one section
/// (optionally acknowledging completion); `Drain` just acknowledges, which —
/// because the executor is FIFO — proves every previously queued pass has
/// completed.
pub(crate) enum RenderJob {
    Pass(Weak<SectionShared>, Option<oneshot::Sender<()>>),
    Drain(oneshot::Sender<()>),
}

pub(crate) struct SessionInner {
    pub(crate) terminal: SafeTerminal,
    pub(crate) data: ConcurrentScopedData,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) key_tx: broadcast::Sender<Key>,
    active_section: StdMutex<Option<Arc<SectionShared>>>,
    render_tx: mpsc::UnboundedSender<RenderJob>,
    executor_handle: StdMutex<Option<JoinHandle<()>>>,
    reader_handle: StdMutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl SessionInner {
    pub(crate) fn active_section(&self) -> Option<Arc<SectionShared>> {
        self.active_section.lock().unwrap().clone()
    }

    pub(crate) fn is_active_section(&self, section: &Arc<SectionShared>) -> bool {
        self.active_section
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(active, section))
    }

    /// Atomically claim the single active-section slot.
    pub(crate) fn stake_active_section(
        &self,
        section: &Arc<SectionShared>,
    ) -> CommonResult<()> {
        let mut slot = self.active_section.lock().unwrap();
        if slot.is_some() {
            return CommonError::new_error_result(
                CommonErrorType::MultipleActiveSections,
                "another section is already active in this session",
            );
        }
        *slot = Some(section.clone());
        Ok(())
    }

    pub(crate) fn clear_active_section(&self, section: &Arc<SectionShared>) {
        let mut slot = self.active_section.lock().unwrap();
        if slot.as_ref().is_some_and(|active| Arc::ptr_eq(active, section)) {
            *slot = None;
        }
    }

    pub(crate) fn enqueue_render(&self, job: RenderJob) {
        _ = self.render_tx.send(job);
    }

    /// Queue a pass and wait for it to complete (the "initial synchronous
    /// render" of a run).
    pub(crate) async fn enqueue_render_with_ack(&self, section: Weak<SectionShared>) {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.enqueue_render(RenderJob::Pass(section, Some(ack_tx)));
        _ = ack_rx.await;
    }

    /// Wait until every currently queued render has completed.
    pub(crate) async fn drain_renders(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.enqueue_render(RenderJob::Drain(ack_tx));
        _ = ack_rx.await;
    }

    fn shutdown_internal(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!("session shutting down");
        *self.active_section.lock().unwrap() = None;
        // Cascading disposal: sections, runs, timers, the lot.
        self.data.stop(&self.lifecycle);
        if let Some(handle) = self.executor_handle.lock().unwrap().take() {
            handle.abort();
        }
        if let Some(handle) = self.reader_handle.lock().unwrap().take() {
            handle.abort();
        }
        self.terminal.close();
    }
}

/// The top-level runtime object. Owns the terminal exclusively; create
/// sections with [`Session::section`] and reactive state with the `live_*`
/// constructors. Dropping the session (or calling [`Session::shutdown`])
/// disposes everything in lifecycle order and closes the terminal.
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Create a session over the given terminal backend.
    ///
    /// Must be called from within a tokio runtime: the session spawns its
    /// render executor and key reader tasks here.
    pub fn try_new(terminal: impl Terminal + 'static) -> CommonResult<Session> {
        Self::try_new_shared(Arc::new(terminal))
    }

    /// [`Session::try_new`] for an already-shared terminal.
    pub fn try_new_shared(terminal: SafeTerminal) -> CommonResult<Session> {
        let data = ConcurrentScopedData::new();
        let lifecycle = Lifecycle::root("session");
        data.start(&lifecycle)?;

        // The single-threaded FIFO render executor: the only place the active
        // region's bytes are written to the terminal.
        let (render_tx, mut render_rx) = mpsc::unbounded_channel::<RenderJob>();
        let executor_handle = tokio::spawn(async move {
            while let Some(job) = render_rx.recv().await {
                match job {
                    RenderJob::Pass(weak_section, maybe_ack) => {
                        if let Some(section) = weak_section.upgrade() {
                            section.render_pass();
                        }
                        if let Some(ack) = maybe_ack {
                            _ = ack.send(());
                        }
                    }
                    RenderJob::Drain(ack) => {
                        _ = ack.send(());
                    }
                }
            }
        });

        let (key_tx, _) = broadcast::channel(KEY_CHANNEL_CAPACITY);
        let reader_handle = spawn_key_reader(&terminal, key_tx.clone());

        Ok(Session {
            inner: Arc::new(SessionInner {
                terminal,
                data,
                lifecycle,
                key_tx,
                active_section: StdMutex::new(None),
                render_tx,
                executor_handle: StdMutex::new(Some(executor_handle)),
                reader_handle: StdMutex::new(Some(reader_handle)),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Create a section from a render block. The block is re-evaluated from
    /// scratch on every (coalesced) rerender while the section runs.
    pub fn section(
        &self,
        render: impl Fn(&mut RenderScope) + Send + Sync + 'static,
    ) -> Section {
        let lifecycle = self.inner.lifecycle.child("section");
        if let Err(report) = self.inner.data.start(&lifecycle) {
            tracing::warn!(%report, "section lifecycle not started; session is closed");
        }
        Section {
            shared: SectionShared::new(
                Arc::downgrade(&self.inner),
                lifecycle,
                Arc::new(render),
            ),
        }
    }

    /// A reactive scalar bound to this session.
    pub fn live_var<T: Send>(&self, initial: T) -> LiveVar<T> {
        LiveVar::new(Arc::downgrade(&self.inner), initial)
    }

    /// A reactive list bound to this session.
    pub fn live_list<T: Clone + Send>(&self) -> LiveList<T> {
        LiveList::new(Arc::downgrade(&self.inner))
    }

    /// A reactive list seeded with `items`.
    pub fn live_list_of<T: Clone + Send>(
        &self,
        items: impl IntoIterator<Item = T>,
    ) -> LiveList<T> {
        let list = self.live_list();
        list.extend(items);
        list
    }

    /// A reactive map bound to this session.
    pub fn live_map<K, V>(&self) -> LiveMap<K, V>
    where
        K: Eq + Hash + Clone + Send,
        V: Clone + Send,
    {
        LiveMap::new(Arc::downgrade(&self.inner))
    }

    /// A string-frame animation. See [`TextAnim`].
    pub fn text_anim_of(
        &self,
        frames: impl IntoIterator<Item = impl Into<String>>,
        frame_duration: Duration,
    ) -> CommonResult<TextAnim> {
        TextAnim::new(
            Arc::downgrade(&self.inner),
            frames.into_iter().map(Into::into).collect(),
            frame_duration,
        )
    }

    /// A draw-callback animation. See [`RenderAnim`].
    pub fn render_anim_of(
        &self,
        frame_count: usize,
        frame_duration: Duration,
        draw: impl Fn(&mut RenderScope, usize) + Send + Sync + 'static,
    ) -> CommonResult<RenderAnim> {
        RenderAnim::new(Arc::downgrade(&self.inner), frame_count, frame_duration, draw)
    }

    /// The session's data store. Application code can park its own
    /// lifecycle-scoped state here.
    #[must_use]
    pub fn data(&self) -> &ConcurrentScopedData { &self.inner.data }

    /// The session's root lifecycle.
    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle { &self.inner.lifecycle }

    /// Dispose the session: stop all lifecycles (cancelling reader and timer
    /// tasks), then close the terminal. Idempotent; also runs on [`Drop`].
    pub fn shutdown(&self) { self.inner.shutdown_internal(); }
}

impl Drop for Session {
    fn drop(&mut self) { self.inner.shutdown_internal(); }
}
