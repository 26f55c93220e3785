// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{ColorValue, InlineString};

/// The text decorations the runtime supports. Italic and blink are deliberately
/// not modeled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Decoration {
    Bold,
    Underline,
    Strikethrough,
    Invert,
}

impl Decoration {
    pub const ALL: [Decoration; 4] = [
        Decoration::Bold,
        Decoration::Underline,
        Decoration::Strikethrough,
        Decoration::Invert,
    ];
}

/// One atomic instruction produced by a render block. A render pass is nothing
/// more than a fresh sequence of these; applying them to a
/// [`crate::TextArea`] yields the styled cell grid that gets diffed and
/// flushed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminalCommand {
    Char(char),
    Text(InlineString),
    SetForeground(ColorValue),
    SetBackground(ColorValue),
    SetDecoration(Decoration),
    ClearForeground,
    ClearBackground,
    ClearDecoration(Decoration),
    Newline,
}

impl TerminalCommand {
    /// Whether this command mutates style state (as opposed to emitting
    /// content).
    #[must_use]
    pub fn is_style_command(&self) -> bool {
        matches!(
            self,
            TerminalCommand::SetForeground(_)
                | TerminalCommand::SetBackground(_)
                | TerminalCommand::SetDecoration(_)
                | TerminalCommand::ClearForeground
                | TerminalCommand::ClearBackground
                | TerminalCommand::ClearDecoration(_)
        )
    }
}
