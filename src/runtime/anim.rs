// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Frame-indexed animations. The current frame lives in a [`LiveVar`], so a
//! render block that reads it subscribes to frame changes automatically; the
//! frames advance on a repeating timer that is lazily registered (and
//! deduplicated per instance) on first read from a live section.

use crate::{CommonError, CommonErrorType, CommonResult, LiveVar, RenderScope,
            SessionInner, StdMutex, TIMER_TICK, TimerKey};
use std::{fmt::{Display, Formatter},
          sync::{Arc, Weak}};
use tokio::time::Duration;

/// The shared clock driving one animation instance.
struct AnimClock {
    frame_ms: u64,
    anim_ms: u64,
    frame_count: usize,
    elapsed_ms: StdMutex<u64>,
    current_frame: LiveVar<usize>,
    timer_key: TimerKey,
}

impl AnimClock {
    fn new(
        session: Weak<SessionInner>,
        frame_count: usize,
        frame_duration: Duration,
    ) -> CommonResult<Arc<Self>> {
        if frame_count == 0 {
            return CommonError::new_error_result(
                CommonErrorType::InvalidState,
                "an animation needs at least one frame",
            );
        }
        let frame_ms = frame_duration.as_millis() as u64;
        if frame_ms == 0 {
            return CommonError::new_error_result(
                CommonErrorType::InvalidTimer,
                "frame duration must be at least 1ms",
            );
        }
        Ok(Arc::new(Self {
            frame_ms,
            anim_ms: frame_ms * frame_count as u64,
            frame_count,
            elapsed_ms: StdMutex::new(0),
            current_frame: LiveVar::new(session, 0),
            timer_key: TimerKey::unique(),
        }))
    }

    /// Register the driving timer on the active section's run, if there is
    /// one. Deduplicated by the per-instance key, so calling this on every
    /// render read is cheap. Outside a live section this is a no-op and the
    /// animation just shows its current frame.
    fn ensure_timer(self: &Arc<Self>, session: &Weak<SessionInner>) {
        let Some(session) = session.upgrade() else { return };
        let Some(section) = session.active_section() else { return };
        let Some(timers) = section.run_timers(&session) else { return };
        let clock = self.clone();
        _ = timers.add_timer_keyed(self.timer_key, TIMER_TICK, true, move |_| {
            let frame = {
                let mut elapsed = clock.elapsed_ms.lock().unwrap();
                *elapsed = (*elapsed + TIMER_TICK.as_millis() as u64) % clock.anim_ms;
                (*elapsed / clock.frame_ms) as usize
            };
            clock.current_frame.set(frame.min(clock.frame_count - 1));
        });
    }

    fn read_frame(self: &Arc<Self>, session: &Weak<SessionInner>) -> usize {
        self.ensure_timer(session);
        self.current_frame.get().min(self.frame_count - 1)
    }
}

/// A string-per-frame animation. Create via [`crate::Session::text_anim_of`];
/// read it from a render block (it implements [`Display`]) and the block
/// rerenders as frames advance.
#[derive(Clone)]
pub struct TextAnim {
    session: Weak<SessionInner>,
    frames: Arc<Vec<String>>,
    clock: Arc<AnimClock>,
}

impl TextAnim {
    pub(crate) fn new(
        session: Weak<SessionInner>,
        frames: Vec<String>,
        frame_duration: Duration,
    ) -> CommonResult<Self> {
        let clock = AnimClock::new(session.clone(), frames.len(), frame_duration)?;
        Ok(Self {
            session,
            frames: Arc::new(frames),
            clock,
        })
    }

    /// The current frame's text. Reading from a live render pass subscribes
    /// the section and starts the animation timer.
    #[must_use]
    pub fn current_frame(&self) -> &str {
        &self.frames[self.clock.read_frame(&self.session)]
    }
}

impl Display for TextAnim {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.current_frame())
    }
}

type DrawFn = Arc<dyn Fn(&mut RenderScope, usize) + Send + Sync>;

/// A callback-per-frame animation: the draw function receives the scope and
/// the current frame index and may emit arbitrary commands. Same timer and
/// [`LiveVar`] machinery as [`TextAnim`]. Create via
/// [`crate::Session::render_anim_of`].
#[derive(Clone)]
pub struct RenderAnim {
    session: Weak<SessionInner>,
    draw: DrawFn,
    clock: Arc<AnimClock>,
}

impl RenderAnim {
    pub(crate) fn new(
        session: Weak<SessionInner>,
        frame_count: usize,
        frame_duration: Duration,
        draw: impl Fn(&mut RenderScope, usize) + Send + Sync + 'static,
    ) -> CommonResult<Self> {
        let clock = AnimClock::new(session.clone(), frame_count, frame_duration)?;
        Ok(Self {
            session,
            draw: Arc::new(draw),
            clock,
        })
    }

    /// Draw the current frame into `scope`.
    pub fn render(&self, scope: &mut RenderScope) {
        let frame = self.clock.read_frame(&self.session);
        (self.draw)(scope, frame);
    }
}
