// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The output of a render pass: an append-only grid of styled cells with
//! tracked per-line widths, and its linearization into ANSI bytes.

use crate::{SectionState, SgrCode, TerminalCommand};
use std::fmt::Write as _;

/// One character plus the effective SGR state at that position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: SectionState,
}

/// The styled content produced by applying a sequence of [`TerminalCommand`]s.
///
/// Line widths are char counts; SGR bytes never enter the cell grid, so widths
/// are escape-free by construction.
#[derive(Clone, Debug, Default)]
pub struct TextArea {
    cells: Vec<Cell>,
    pending: SectionState,
    /// Widths of every completed line (a line completes at each newline).
    completed_line_widths: Vec<usize>,
    current_line_width: usize,
}

impl TextArea {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Apply one command: content commands append cells carrying the pending
    /// style; style commands mutate the pending style.
    pub fn apply(&mut self, command: &TerminalCommand) {
        if self.pending.apply_command(command) {
            return;
        }
        match command {
            TerminalCommand::Char(ch) => self.push_char(*ch),
            TerminalCommand::Text(text) => {
                for ch in text.chars() {
                    self.push_char(ch);
                }
            }
            TerminalCommand::Newline => self.push_char('\n'),
            _ => {}
        }
    }

    fn push_char(&mut self, ch: char) {
        self.cells.push(Cell {
            ch,
            style: self.pending,
        });
        if ch == '\n' {
            self.completed_line_widths.push(self.current_line_width);
            self.current_line_width = 0;
        } else {
            self.current_line_width += 1;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.cells.is_empty() }

    /// Count of newlines + 1 when non-empty; 0 when empty. This is the number
    /// of terminal lines the serialized content occupies (the trailing reset
    /// rides on the last of them).
    #[must_use]
    pub fn num_lines(&self) -> usize {
        if self.cells.is_empty() {
            0
        } else {
            self.completed_line_widths.len() + 1
        }
    }

    /// Char widths per line. A trailing newline does not open a new (empty)
    /// line; `"ab\ncdef\n"` has widths `[2, 4]`.
    #[must_use]
    pub fn line_lengths(&self) -> Vec<usize> {
        if self.cells.is_empty() {
            return Vec::new();
        }
        let mut acc = self.completed_line_widths.clone();
        if self.current_line_width > 0 {
            acc.push(self.current_line_width);
        }
        acc
    }

    /// How many consecutive newlines end the content (capped at `limit`).
    #[must_use]
    pub fn trailing_newlines(&self, limit: usize) -> usize {
        self.cells
            .iter()
            .rev()
            .take(limit)
            .take_while(|cell| cell.ch == '\n')
            .count()
    }

    /// The style that the next appended cell would carry.
    #[must_use]
    pub fn pending_style(&self) -> SectionState { self.pending }

    /// The content without any styling, for diagnostics.
    #[must_use]
    pub fn plain_text(&self) -> String { self.cells.iter().map(|cell| cell.ch).collect() }

    /// Linearize to a byte stream: cells with minimal SGR transitions between
    /// consecutive cells, then `SGR RESET` and exactly one newline. The
    /// trailing newline guarantees the section always terminates on its own
    /// line.
    #[must_use]
    pub fn to_output_string(&self) -> String {
        let mut acc = String::with_capacity(self.cells.len() + 16);
        let mut current = SectionState::default();
        for cell in &self.cells {
            if cell.ch == '\n' {
                acc.push('\n');
                continue;
            }
            if cell.style != current {
                current.emit_transition_to(&cell.style, &mut acc);
                current = cell.style;
            }
            acc.push(cell.ch);
        }
        _ = write!(acc, "{}", SgrCode::Reset);
        acc.push('\n');
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, InlineString};
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> TerminalCommand { TerminalCommand::Text(InlineString::from(s)) }

    #[test]
    fn test_empty_area() {
        let area = TextArea::new();
        assert!(area.is_empty());
        assert_eq!(area.num_lines(), 0);
        assert_eq!(area.line_lengths(), Vec::<usize>::new());
        assert_eq!(area.to_output_string(), "\x1b[0m\n");
    }

    #[test]
    fn test_line_accounting() {
        let mut area = TextArea::new();
        for command in [text("ab"), TerminalCommand::Newline, text("cdef")] {
            area.apply(&command);
        }
        assert_eq!(area.num_lines(), 2);
        assert_eq!(area.line_lengths(), vec![2, 4]);

        area.apply(&TerminalCommand::Newline);
        // A trailing newline occupies a terminal line but opens no new row.
        assert_eq!(area.num_lines(), 3);
        assert_eq!(area.line_lengths(), vec![2, 4]);
    }

    #[test]
    fn test_plain_serialization() {
        let mut area = TextArea::new();
        area.apply(&text("Line 1"));
        area.apply(&TerminalCommand::Newline);
        area.apply(&text("Line 2"));
        area.apply(&TerminalCommand::Newline);
        assert_eq!(area.to_output_string(), "Line 1\nLine 2\n\x1b[0m\n");
    }

    #[test]
    fn test_minimal_sgr_transitions() {
        let mut area = TextArea::new();
        area.apply(&TerminalCommand::SetForeground(Color::Red.into()));
        area.apply(&text("ab"));
        area.apply(&text("cd"));
        area.apply(&TerminalCommand::ClearForeground);
        area.apply(&text("ef"));
        // One color change going in, one default-fg going out, one trailing
        // reset. No per-cell repetition.
        assert_eq!(area.to_output_string(), "\x1b[31mabcd\x1b[39mef\x1b[0m\n");
    }

    #[test]
    fn test_styles_do_not_leak_into_widths() {
        let mut area = TextArea::new();
        area.apply(&TerminalCommand::SetDecoration(crate::Decoration::Bold));
        area.apply(&text("hi"));
        assert_eq!(area.line_lengths(), vec![2]);
    }

    #[test]
    fn test_trailing_newlines() {
        let mut area = TextArea::new();
        area.apply(&text("x"));
        assert_eq!(area.trailing_newlines(2), 0);
        area.apply(&TerminalCommand::Newline);
        assert_eq!(area.trailing_newlines(2), 1);
        area.apply(&TerminalCommand::Newline);
        assert_eq!(area.trailing_newlines(2), 2);
        area.apply(&TerminalCommand::Newline);
        assert_eq!(area.trailing_newlines(2), 2);
    }
}
