// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The single-line editable `input` widget: per-section state with a blinking
//! cursor, optional autocompletion, and the key handling that drives it
//! through the registered change/enter callbacks.

use crate::{Color, ColorValue, InputChangedCallback, InputEnteredCallback, Key,
            KeyPressedCallback, RenderScope, ScopedKey, SectionShared, SessionInner,
            StdMutex, TIMER_TICK,
            render_scope::RenderScopeKind};
use std::sync::{Arc, atomic::Ordering};

/// Blink phase length: the cursor flips visibility this often.
pub const BLINK_INTERVAL_MS: u64 = 500;

/// Produces completion suffixes for the input widget.
pub trait InputCompleter: Send + Sync {
    /// The suffix that would complete `input`, if any.
    fn complete(&self, input: &str) -> Option<String>;

    /// The color the suggested suffix renders in.
    fn color(&self) -> ColorValue { ColorValue::Basic(Color::BrightBlack) }
}

/// A completer backed by a fixed list of values; the first (optionally
/// case-insensitive) prefix match wins.
pub struct Completions {
    values: Vec<String>,
    ignore_case: bool,
}

impl Completions {
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            ignore_case: true,
        }
    }

    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.ignore_case = false;
        self
    }
}

impl InputCompleter for Completions {
    fn complete(&self, input: &str) -> Option<String> {
        let input_len = input.chars().count();
        for value in &self.values {
            let matches = if self.ignore_case {
                value.to_lowercase().starts_with(&input.to_lowercase())
            } else {
                value.starts_with(input)
            };
            if matches && value.chars().count() > input_len {
                return Some(value.chars().skip(input_len).collect());
            }
        }
        None
    }
}

/// Arguments to [`RenderScope::input`].
#[derive(Default)]
pub struct InputOptions {
    pub completer: Option<Arc<dyn InputCompleter>>,
    pub initial_text: String,
}

impl InputOptions {
    #[must_use]
    pub fn with_completer(completer: impl InputCompleter + 'static) -> Self {
        Self {
            completer: Some(Arc::new(completer)),
            initial_text: String::new(),
        }
    }
}

/// Per-section widget state. Lives in the data store under the run lifecycle,
/// so a finished run reclaims it.
///
/// Invariant: `0 <= index <= text char count`.
pub struct InputState {
    pub text: String,
    /// Cursor position, in chars.
    pub index: usize,
    pub blink_on: bool,
    blink_elapsed_ms: u64,
    pub(crate) completer: Option<Arc<dyn InputCompleter>>,
}

impl InputState {
    fn new(initial_text: String, completer: Option<Arc<dyn InputCompleter>>) -> Self {
        let index = initial_text.chars().count();
        Self {
            text: initial_text,
            index,
            blink_on: true,
            blink_elapsed_ms: 0,
            completer,
        }
    }

    fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            text: self.text.clone(),
            index: self.index,
            blink_on: self.blink_on,
            completer: self.completer.clone(),
        }
    }

    fn reset_blink(&mut self) {
        self.blink_on = true;
        self.blink_elapsed_ms = 0;
    }

    /// Advance the blink clock; returns whether the visibility flipped.
    fn advance_blink(&mut self, elapsed_ms: u64) -> bool {
        self.blink_elapsed_ms += elapsed_ms;
        if self.blink_elapsed_ms >= BLINK_INTERVAL_MS {
            self.blink_elapsed_ms %= BLINK_INTERVAL_MS;
            self.blink_on = !self.blink_on;
            true
        } else {
            false
        }
    }
}

struct InputSnapshot {
    text: String,
    index: usize,
    blink_on: bool,
    completer: Option<Arc<dyn InputCompleter>>,
}

/// What an `on_input_changed` callback sees: the proposed text (mutable) and
/// the previous text. Rejecting commits the previous text instead; when
/// several callbacks disagree, the scope's final state wins.
pub struct OnInputChangedScope {
    pub input: String,
    pub prev_input: String,
    rejected: bool,
}

impl OnInputChangedScope {
    pub fn reject_input(&mut self) { self.rejected = true; }

    #[must_use]
    pub fn is_rejected(&self) -> bool { self.rejected }
}

/// What an `on_input_entered` callback sees. Rejecting suppresses the
/// section's internal enter handling; `clear_input` empties the widget after
/// the callbacks run.
pub struct OnInputEnteredScope {
    pub input: String,
    rejected: bool,
    clear_requested: bool,
}

impl OnInputEnteredScope {
    pub fn reject_input(&mut self) { self.rejected = true; }

    #[must_use]
    pub fn is_rejected(&self) -> bool { self.rejected }

    /// Empty the widget once the enter handling completes.
    pub fn clear_input(&mut self) { self.clear_requested = true; }
}

impl RenderScope {
    /// Render the editable input line: the current text, the completion
    /// suggestion (if any), and a blinking inverted cursor.
    ///
    /// Policy: only valid in the main render pass, at most once per pass.
    /// Violations are recorded and propagate out of the section's `run` as
    /// `InvalidInputContext`.
    pub fn input(&mut self, options: InputOptions) {
        let Some(section) = self.section.upgrade() else { return };
        if self.kind != RenderScopeKind::Main {
            section.record_policy_error(
                "input() may only be called from the main render pass",
            );
            return;
        }
        if self.input_called {
            section
                .record_policy_error("input() may only be called once per render pass");
            return;
        }
        self.input_called = true;

        let Some(session) = section.session.upgrade() else { return };
        let Some(input_key) = section.input_key() else {
            section.record_policy_error("input() called outside a running section");
            return;
        };

        // The completer may be a fresh closure each pass; refresh it so key
        // handling sees the latest one.
        let existing = session.data.with_mut(&input_key, |state| {
            state.completer = options.completer.clone();
            state.snapshot()
        });
        let snapshot = match existing {
            Some(snapshot) => snapshot,
            None => {
                let state = InputState::new(options.initial_text, options.completer);
                let snapshot = state.snapshot();
                if session.data.put(&input_key, state).is_ok() {
                    register_blink_timer(&section, &session, &input_key);
                }
                snapshot
            }
        };

        render_input(self, &snapshot);
    }
}

fn render_input(scope: &mut RenderScope, snapshot: &InputSnapshot) {
    let completion = snapshot
        .completer
        .as_ref()
        .and_then(|completer| completer.complete(&snapshot.text));
    let completion_color = snapshot.completer.as_ref().map(|it| it.color());
    let text_len = snapshot.text.chars().count();

    scope.scoped_state(|styled| {
        let all_chars = snapshot
            .text
            .chars()
            .chain(completion.iter().flat_map(|it| it.chars()))
            .chain(std::iter::once(' '));
        for (position, ch) in all_chars.enumerate() {
            if position == text_len && completion.is_some() {
                if let Some(color) = completion_color {
                    styled.fg(color);
                }
            }
            if position == snapshot.index && snapshot.blink_on {
                styled.scoped_state(|inverted| {
                    inverted.invert();
                    inverted.text_char(ch);
                });
            } else {
                styled.text_char(ch);
            }
        }
    });
}

fn register_blink_timer(
    section: &Arc<SectionShared>,
    session: &Arc<SessionInner>,
    input_key: &ScopedKey<InputState>,
) {
    let Some(timers) = section.run_timers(session) else { return };
    let weak_section = Arc::downgrade(section);
    let data = session.data.clone();
    let input_key = input_key.clone();
    let result = timers.add_timer(TIMER_TICK, true, move |scope| {
        let elapsed_ms = scope.elapsed.as_millis() as u64;
        let Some(section) = weak_section.upgrade() else {
            *scope.repeat = false;
            return;
        };
        match data.with_mut(&input_key, |state| state.advance_blink(elapsed_ms)) {
            Some(true) => section.request_rerender(),
            Some(false) => {}
            None => *scope.repeat = false,
        }
    });
    if result.is_err() {
        tracing::debug!("blink timer not registered; run is already over");
    }
}

/// Run every callback in `slot` in registration order, tolerating callbacks
/// that register further callbacks while running.
fn for_each_callback<C>(slot: &StdMutex<Vec<C>>, mut invoke: impl FnMut(&mut C)) {
    let mut taken = std::mem::take(&mut *slot.lock().unwrap());
    for callback in &mut taken {
        invoke(callback);
    }
    let mut guard = slot.lock().unwrap();
    let registered_meanwhile = std::mem::take(&mut *guard);
    taken.extend(registered_meanwhile);
    *guard = taken;
}

/// Entry point of the per-run key dispatch task: user key callbacks first,
/// then the input widget (when one exists this run).
pub(crate) fn handle_key_for_section(
    section: &Arc<SectionShared>,
    session: &Arc<SessionInner>,
    key: Key,
) {
    for_each_callback::<KeyPressedCallback>(&section.callbacks.key_pressed, |callback| {
        callback(key);
    });

    let watched = section.signal_on_keys.lock().unwrap().contains(&key);
    if watched {
        section.signal();
    }

    let Some(input_key) = section.input_key() else { return };
    let Some(snapshot) = session.data.with(&input_key, InputState::snapshot) else {
        return;
    };
    let text_len = snapshot.text.chars().count();

    match key {
        Key::Left => commit_index(section, session, &input_key, snapshot.index.saturating_sub(1)),
        Key::Right => {
            if snapshot.index < text_len {
                commit_index(section, session, &input_key, snapshot.index + 1);
            } else if let Some(suffix) = snapshot
                .completer
                .as_ref()
                .and_then(|completer| completer.complete(&snapshot.text))
            {
                // Accept the whole completion.
                let accepted = format!("{}{suffix}", snapshot.text);
                let accepted_len = accepted.chars().count();
                propose_text(section, session, &input_key, &snapshot, accepted, accepted_len);
            }
        }
        Key::Home => commit_index(section, session, &input_key, 0),
        Key::End => commit_index(section, session, &input_key, text_len),
        Key::Delete => {
            if snapshot.index < text_len {
                let proposed = remove_char_at(&snapshot.text, snapshot.index);
                propose_text(section, session, &input_key, &snapshot, proposed, snapshot.index);
            }
        }
        Key::Backspace => {
            if snapshot.index > 0 {
                let proposed = remove_char_at(&snapshot.text, snapshot.index - 1);
                propose_text(
                    section,
                    session,
                    &input_key,
                    &snapshot,
                    proposed,
                    snapshot.index - 1,
                );
            }
        }
        Key::Enter => handle_enter(section, session, &input_key, &snapshot),
        Key::Char(ch) => {
            let proposed = insert_char_at(&snapshot.text, snapshot.index, ch);
            propose_text(
                section,
                session,
                &input_key,
                &snapshot,
                proposed,
                snapshot.index + 1,
            );
        }
        _ => {}
    }
}

fn byte_index(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(byte, _)| byte)
}

fn insert_char_at(text: &str, char_index: usize, ch: char) -> String {
    let at = byte_index(text, char_index);
    let mut acc = String::with_capacity(text.len() + ch.len_utf8());
    acc.push_str(&text[..at]);
    acc.push(ch);
    acc.push_str(&text[at..]);
    acc
}

fn remove_char_at(text: &str, char_index: usize) -> String {
    let start = byte_index(text, char_index);
    let end = byte_index(text, char_index + 1);
    let mut acc = String::with_capacity(text.len());
    acc.push_str(&text[..start]);
    acc.push_str(&text[end..]);
    acc
}

/// Move the cursor without changing the text. Clamps, resets the blink, and
/// rerenders when something actually moved.
fn commit_index(
    section: &Arc<SectionShared>,
    session: &Arc<SessionInner>,
    input_key: &ScopedKey<InputState>,
    new_index: usize,
) {
    let changed = session
        .data
        .with_mut(input_key, |state| {
            let clamped = new_index.min(state.text.chars().count());
            if clamped == state.index {
                false
            } else {
                state.index = clamped;
                state.reset_blink();
                true
            }
        })
        .unwrap_or(false);
    if changed {
        section.request_rerender();
    }
}

/// Run a proposed text change through the `on_input_changed` callbacks and
/// commit the outcome.
fn propose_text(
    section: &Arc<SectionShared>,
    session: &Arc<SessionInner>,
    input_key: &ScopedKey<InputState>,
    snapshot: &InputSnapshot,
    proposed_text: String,
    proposed_index: usize,
) {
    let mut scope = OnInputChangedScope {
        input: proposed_text,
        prev_input: snapshot.text.clone(),
        rejected: false,
    };
    for_each_callback::<InputChangedCallback>(
        &section.callbacks.input_changed,
        |callback| callback(&mut scope),
    );

    let final_text = if scope.rejected {
        scope.prev_input
    } else {
        scope.input
    };
    let final_index = proposed_index.min(final_text.chars().count());

    let changed = session
        .data
        .with_mut(input_key, |state| {
            let changed = state.text != final_text || state.index != final_index;
            if changed {
                state.text = final_text.clone();
                state.index = final_index;
                state.reset_blink();
            }
            changed
        })
        .unwrap_or(false);
    if changed {
        section.request_rerender();
    }
}

fn handle_enter(
    section: &Arc<SectionShared>,
    session: &Arc<SessionInner>,
    input_key: &ScopedKey<InputState>,
    snapshot: &InputSnapshot,
) {
    let mut scope = OnInputEnteredScope {
        input: snapshot.text.clone(),
        rejected: false,
        clear_requested: false,
    };
    for_each_callback::<InputEnteredCallback>(
        &section.callbacks.input_entered,
        |callback| callback(&mut scope),
    );

    if !scope.rejected && section.signal_on_input_entered.load(Ordering::SeqCst) {
        section.signal();
    }

    if scope.clear_requested {
        let changed = session
            .data
            .with_mut(input_key, |state| {
                let changed = !state.text.is_empty() || state.index != 0;
                state.text.clear();
                state.index = 0;
                state.reset_blink();
                changed
            })
            .unwrap_or(false);
        if changed {
            section.request_rerender();
        }
    }
}
