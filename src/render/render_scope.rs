// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The per-pass builder handed to render blocks. A scope accumulates
//! [`TerminalCommand`]s into a fresh [`TextArea`] and maintains the stack of
//! nested style frames.

use crate::{ColorValue, Decoration, InlineString, Layer, OffscreenBuffer, Rgb,
            SectionShared, SectionState, TerminalCommand, TextArea};
use std::sync::Weak;

/// Which flavor of render pass a scope belongs to. Only the main pass may host
/// the `input` widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RenderScopeKind {
    Main,
    Aside,
    Offscreen,
}

/// The builder passed to every render block. All content and styling flows
/// through this type; each pass starts from an empty [`TextArea`] and a plain
/// style state.
pub struct RenderScope {
    pub(crate) kind: RenderScopeKind,
    area: TextArea,
    commands: Vec<TerminalCommand>,
    /// Saved parent frames for [`RenderScope::scoped_state`].
    state_stack: Vec<SectionState>,
    pub(crate) section: Weak<SectionShared>,
    pub(crate) input_called: bool,
}

impl RenderScope {
    pub(crate) fn new_main(section: Weak<SectionShared>) -> Self {
        Self::new(RenderScopeKind::Main, SectionState::default(), section)
    }

    pub(crate) fn new_aside(section: Weak<SectionShared>) -> Self {
        Self::new(RenderScopeKind::Aside, SectionState::default(), section)
    }

    pub(crate) fn new_offscreen(
        initial_state: SectionState,
        section: Weak<SectionShared>,
    ) -> Self {
        Self::new(RenderScopeKind::Offscreen, initial_state, section)
    }

    fn new(
        kind: RenderScopeKind,
        initial_state: SectionState,
        section: Weak<SectionShared>,
    ) -> Self {
        let mut area = TextArea::new();
        // Seed the pending style without emitting commands; an offscreen scope
        // inherits the outer scope's state at creation time.
        for command in SectionState::default().restore_commands_to(&initial_state) {
            area.apply(&command);
        }
        Self {
            kind,
            area,
            commands: Vec::new(),
            state_stack: Vec::new(),
            section,
            input_called: false,
        }
    }

    /// Append a raw command. All the convenience methods below funnel through
    /// here, as does offscreen row replay.
    pub(crate) fn push_command(&mut self, command: TerminalCommand) {
        self.area.apply(&command);
        self.commands.push(command);
    }

    // ==================== Content ====================

    /// Append text. Embedded `\n` chars behave like [`RenderScope::new_line`].
    pub fn text(&mut self, text: impl AsRef<str>) {
        self.push_command(TerminalCommand::Text(InlineString::from(text.as_ref())));
    }

    /// Append text followed by a newline.
    pub fn text_line(&mut self, text: impl AsRef<str>) {
        self.text(text);
        self.new_line();
    }

    pub fn text_char(&mut self, ch: char) {
        self.push_command(TerminalCommand::Char(ch));
    }

    pub fn new_line(&mut self) { self.push_command(TerminalCommand::Newline); }

    /// Render `block` as a paragraph: exactly one blank line above and below
    /// its content, with no blank line at the very start of the section and no
    /// doubling-up when a blank line is already present.
    pub fn p(&mut self, block: impl FnOnce(&mut Self)) {
        self.ensure_paragraph_gap();
        block(self);
        self.ensure_paragraph_gap();
    }

    fn ensure_paragraph_gap(&mut self) {
        if self.area.is_empty() {
            return;
        }
        while self.area.trailing_newlines(2) < 2 {
            self.new_line();
        }
    }

    // ==================== Styling ====================

    /// Set the foreground color.
    pub fn fg(&mut self, color: impl Into<ColorValue>) {
        self.push_command(TerminalCommand::SetForeground(color.into()));
    }

    /// Set the background color.
    pub fn bg(&mut self, color: impl Into<ColorValue>) {
        self.push_command(TerminalCommand::SetBackground(color.into()));
    }

    /// Set a color on the given layer.
    pub fn color(&mut self, color: impl Into<ColorValue>, layer: Layer) {
        match layer {
            Layer::Foreground => self.fg(color),
            Layer::Background => self.bg(color),
        }
    }

    /// Set a truecolor value from a `0xRRGGBB` literal.
    pub fn rgb(&mut self, value: u32, layer: Layer) {
        self.color(Rgb::from_u32(value), layer);
    }

    /// Set a color from HSV components (`hue` in degrees, `saturation` and
    /// `value` in `[0, 1]`).
    pub fn hsv(&mut self, hue: f64, saturation: f64, value: f64, layer: Layer) {
        self.color(Rgb::from_hsv(hue, saturation, value), layer);
    }

    pub fn bold(&mut self) {
        self.push_command(TerminalCommand::SetDecoration(Decoration::Bold));
    }

    pub fn underline(&mut self) {
        self.push_command(TerminalCommand::SetDecoration(Decoration::Underline));
    }

    pub fn strikethrough(&mut self) {
        self.push_command(TerminalCommand::SetDecoration(Decoration::Strikethrough));
    }

    pub fn invert(&mut self) {
        self.push_command(TerminalCommand::SetDecoration(Decoration::Invert));
    }

    pub fn clear_fg(&mut self) { self.push_command(TerminalCommand::ClearForeground); }

    pub fn clear_bg(&mut self) { self.push_command(TerminalCommand::ClearBackground); }

    pub fn clear_bold(&mut self) {
        self.push_command(TerminalCommand::ClearDecoration(Decoration::Bold));
    }

    pub fn clear_underline(&mut self) {
        self.push_command(TerminalCommand::ClearDecoration(Decoration::Underline));
    }

    pub fn clear_strikethrough(&mut self) {
        self.push_command(TerminalCommand::ClearDecoration(Decoration::Strikethrough));
    }

    pub fn clear_invert(&mut self) {
        self.push_command(TerminalCommand::ClearDecoration(Decoration::Invert));
    }

    /// Clear every attribute that is currently set.
    pub fn clear_all(&mut self) {
        let current = self.area.pending_style();
        for command in current.restore_commands_to(&SectionState::default()) {
            self.push_command(command);
        }
    }

    /// Run `block` in a child style frame. Style mutations inside the block are
    /// confined to it; the parent state is fully restored on exit, including
    /// attributes the block cleared.
    pub fn scoped_state(&mut self, block: impl FnOnce(&mut Self)) {
        let saved = self.area.pending_style();
        self.state_stack.push(saved);
        block(self);
        let saved = self.state_stack.pop().unwrap_or_default();
        let current = self.area.pending_style();
        for command in current.restore_commands_to(&saved) {
            self.push_command(command);
        }
    }

    // ==================== Composition ====================

    /// Run `block` into a private buffer that is measured but not emitted. The
    /// buffer inherits this scope's current style; style changes inside the
    /// block stay inside it. See [`OffscreenBuffer`] for replaying rows.
    pub fn offscreen(&mut self, block: impl FnOnce(&mut RenderScope)) -> OffscreenBuffer {
        let mut inner = RenderScope::new_offscreen(
            self.area.pending_style(),
            self.section.clone(),
        );
        block(&mut inner);
        OffscreenBuffer::new(inner.commands, inner.area.line_lengths())
    }

    /// Enqueue a one-shot render whose output becomes history above the live
    /// region on the next flush. Ordering among asides is their enqueue order.
    pub fn aside(&mut self, block: impl FnOnce(&mut RenderScope) + Send + 'static) {
        if let Some(section) = self.section.upgrade() {
            section.enqueue_aside(Box::new(block));
        }
    }

    // ==================== Pass plumbing ====================

    pub(crate) fn area(&self) -> &TextArea { &self.area }

    pub(crate) fn into_area(self) -> TextArea { self.area }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;
    use pretty_assertions::assert_eq;

    fn detached() -> RenderScope { RenderScope::new_main(Weak::new()) }

    #[test]
    fn test_text_and_text_line() {
        let mut scope = detached();
        scope.text_line("Line 1");
        scope.text("Line 2");
        assert_eq!(scope.area().plain_text(), "Line 1\nLine 2");
    }

    #[test]
    fn test_scoped_state_is_isolated() {
        let mut scope = detached();
        scope.fg(Color::Red);
        scope.scoped_state(|inner| {
            inner.bold();
            inner.clear_fg();
            inner.text("inner");
        });
        scope.text("outer");
        let out = scope.into_area().to_output_string();
        // Inside the scope: red is cleared, bold set. On exit both are
        // restored; turning bold off forces a reset, then red is re-applied.
        assert_eq!(out, "\x1b[1minner\x1b[0m\x1b[31mouter\x1b[0m\n");
    }

    #[test]
    fn test_clear_inside_scope_restores_on_exit() {
        let mut scope = detached();
        scope.fg(Color::Green);
        scope.text("a");
        scope.scoped_state(|inner| {
            inner.clear_fg();
            inner.text("b");
        });
        scope.text("c");
        let out = scope.into_area().to_output_string();
        assert_eq!(out, "\x1b[32ma\x1b[39mb\x1b[32mc\x1b[0m\n");
    }

    #[test]
    fn test_paragraph_spacing() {
        let mut scope = detached();
        for content in ["one", "two", "three", "four"] {
            scope.p(|p| p.text_line(content));
        }
        assert_eq!(
            scope.area().plain_text(),
            "one\n\ntwo\n\nthree\n\nfour\n\n"
        );
    }

    #[test]
    fn test_paragraph_after_existing_blank_line() {
        let mut scope = detached();
        scope.text_line("intro");
        scope.new_line();
        scope.p(|p| p.text_line("para"));
        // Already one blank line above; no doubling.
        assert_eq!(scope.area().plain_text(), "intro\n\npara\n\n");
    }

    #[test]
    fn test_clear_all() {
        let mut scope = detached();
        scope.fg(Color::Red);
        scope.bg(Color::Blue);
        scope.bold();
        scope.clear_all();
        assert!(scope.area().pending_style().is_plain());
    }

    #[test]
    fn test_hsv_and_rgb_helpers() {
        let mut scope = detached();
        scope.rgb(0xFF0000, Layer::Foreground);
        scope.text("r");
        let out = scope.into_area().to_output_string();
        assert_eq!(out, "\x1b[38;2;255;0;0mr\x1b[0m\n");
    }
}
