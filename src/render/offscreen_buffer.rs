// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A measured-but-not-emitted render: the substrate for decorations that need
//! content dimensions (borders, indents) before drawing.

use crate::{ColorValue, Decoration, RenderScope, TerminalCommand};

/// The captured result of [`RenderScope::offscreen`]. Holds the command stream
/// and the per-row char widths; nothing has reached the terminal.
#[derive(Debug)]
pub struct OffscreenBuffer {
    commands: Vec<TerminalCommand>,
    line_lengths: Vec<usize>,
}

impl OffscreenBuffer {
    pub(crate) fn new(commands: Vec<TerminalCommand>, line_lengths: Vec<usize>) -> Self {
        Self {
            commands,
            line_lengths,
        }
    }

    #[must_use]
    pub fn line_lengths(&self) -> &[usize] { &self.line_lengths }

    /// Char width of `row`, or 0 past the end.
    #[must_use]
    pub fn width(&self, row: usize) -> usize {
        self.line_lengths.get(row).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn row_count(&self) -> usize { self.line_lengths.len() }

    /// A replay cursor over the buffered rows.
    #[must_use]
    pub fn create_renderer(&self) -> OffscreenRenderer<'_> {
        OffscreenRenderer {
            buffer: self,
            command_cursor: 0,
            row: 0,
            carried: CarriedStyle::default(),
        }
    }
}

/// Replays one buffered row at a time into an outer scope. Every row is
/// wrapped in a scoped state, but style mutations from earlier rows are
/// re-applied first so interior state survives row boundaries.
pub struct OffscreenRenderer<'a> {
    buffer: &'a OffscreenBuffer,
    command_cursor: usize,
    row: usize,
    carried: CarriedStyle,
}

impl OffscreenRenderer<'_> {
    #[must_use]
    pub fn has_next_row(&self) -> bool { self.row < self.buffer.row_count() }

    /// Push the next row's commands into `scope`. Does nothing when all rows
    /// are consumed. No newline is emitted; row layout belongs to the caller.
    pub fn render_next_row(&mut self, scope: &mut RenderScope) {
        if !self.has_next_row() {
            return;
        }
        scope.scoped_state(|inner| {
            self.carried.replay_into(inner);
            while let Some(command) = self.buffer.commands.get(self.command_cursor) {
                self.command_cursor += 1;
                if matches!(command, TerminalCommand::Newline) {
                    break;
                }
                if command.is_style_command() {
                    self.carried.record(command);
                }
                inner.push_command(command.clone());
            }
        });
        self.row += 1;
    }
}

/// The net style effect of the commands consumed so far. `None` fields were
/// never touched inside the offscreen block and must not be overridden at row
/// start (the row inherits them from the outer scope instead).
#[derive(Clone, Copy, Debug, Default)]
struct CarriedStyle {
    foreground: Option<Option<ColorValue>>,
    background: Option<Option<ColorValue>>,
    bold: Option<bool>,
    underline: Option<bool>,
    strikethrough: Option<bool>,
    invert: Option<bool>,
}

impl CarriedStyle {
    fn record(&mut self, command: &TerminalCommand) {
        match command {
            TerminalCommand::SetForeground(color) => self.foreground = Some(Some(*color)),
            TerminalCommand::SetBackground(color) => self.background = Some(Some(*color)),
            TerminalCommand::ClearForeground => self.foreground = Some(None),
            TerminalCommand::ClearBackground => self.background = Some(None),
            TerminalCommand::SetDecoration(decoration) => {
                self.set(*decoration, true);
            }
            TerminalCommand::ClearDecoration(decoration) => {
                self.set(*decoration, false);
            }
            _ => {}
        }
    }

    fn set(&mut self, decoration: Decoration, on: bool) {
        match decoration {
            Decoration::Bold => self.bold = Some(on),
            Decoration::Underline => self.underline = Some(on),
            Decoration::Strikethrough => self.strikethrough = Some(on),
            Decoration::Invert => self.invert = Some(on),
        }
    }

    fn replay_into(&self, scope: &mut RenderScope) {
        match self.foreground {
            Some(Some(color)) => {
                scope.push_command(TerminalCommand::SetForeground(color));
            }
            Some(None) => scope.push_command(TerminalCommand::ClearForeground),
            None => {}
        }
        match self.background {
            Some(Some(color)) => {
                scope.push_command(TerminalCommand::SetBackground(color));
            }
            Some(None) => scope.push_command(TerminalCommand::ClearBackground),
            None => {}
        }
        for (decoration, value) in [
            (Decoration::Bold, self.bold),
            (Decoration::Underline, self.underline),
            (Decoration::Strikethrough, self.strikethrough),
            (Decoration::Invert, self.invert),
        ] {
            match value {
                Some(true) => {
                    scope.push_command(TerminalCommand::SetDecoration(decoration));
                }
                Some(false) => {
                    scope.push_command(TerminalCommand::ClearDecoration(decoration));
                }
                None => {}
            }
        }
    }
}
