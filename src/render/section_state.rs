// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The effective SGR state of a cell, plus the diffing logic that turns state
//! transitions into a minimal byte sequence.

use crate::{ColorValue, Decoration, SgrCode, TerminalCommand};
use std::fmt::Write as _;

/// One style frame: the effective SGR state at a point in the output. Frames
/// are stacked by [`crate::RenderScope::scoped_state`]; the child starts as a
/// copy of its parent and the parent is restored on scope exit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SectionState {
    pub foreground: Option<ColorValue>,
    pub background: Option<ColorValue>,
    pub bold: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub invert: bool,
}

impl SectionState {
    #[must_use]
    pub fn is_plain(&self) -> bool { *self == SectionState::default() }

    #[must_use]
    pub fn decoration(&self, decoration: Decoration) -> bool {
        match decoration {
            Decoration::Bold => self.bold,
            Decoration::Underline => self.underline,
            Decoration::Strikethrough => self.strikethrough,
            Decoration::Invert => self.invert,
        }
    }

    pub fn set_decoration(&mut self, decoration: Decoration, on: bool) {
        match decoration {
            Decoration::Bold => self.bold = on,
            Decoration::Underline => self.underline = on,
            Decoration::Strikethrough => self.strikethrough = on,
            Decoration::Invert => self.invert = on,
        }
    }

    /// Mutate this state with a style command. Returns `false` (and does
    /// nothing) for content commands.
    pub fn apply_command(&mut self, command: &TerminalCommand) -> bool {
        match command {
            TerminalCommand::SetForeground(color) => self.foreground = Some(*color),
            TerminalCommand::SetBackground(color) => self.background = Some(*color),
            TerminalCommand::SetDecoration(decoration) => {
                self.set_decoration(*decoration, true);
            }
            TerminalCommand::ClearForeground => self.foreground = None,
            TerminalCommand::ClearBackground => self.background = None,
            TerminalCommand::ClearDecoration(decoration) => {
                self.set_decoration(*decoration, false);
            }
            _ => return false,
        }
        true
    }

    /// Emit the SGR bytes that take a terminal from `self` to `to`.
    ///
    /// Bold, underline, and strikethrough have no dedicated off-codes in the
    /// supported set, so turning any of them off forces a full `RESET` followed
    /// by re-application of every attribute still on in `to`. Foreground,
    /// background, and invert transition additively (`39`/`49`/`27`).
    ///
    /// Attribute emission order is stable: fg, bg, bold, underline,
    /// strikethrough, invert.
    pub fn emit_transition_to(&self, to: &SectionState, acc: &mut String) {
        let needs_reset = (self.bold && !to.bold)
            || (self.underline && !to.underline)
            || (self.strikethrough && !to.strikethrough);

        let from = if needs_reset {
            _ = write!(acc, "{}", SgrCode::Reset);
            SectionState::default()
        } else {
            *self
        };

        if from.foreground != to.foreground {
            match to.foreground {
                Some(ColorValue::Basic(color)) => {
                    _ = write!(acc, "{}", SgrCode::Foreground(color));
                }
                Some(ColorValue::Rgb(rgb)) => {
                    _ = write!(acc, "{}", SgrCode::ForegroundRgb(rgb));
                }
                None => _ = write!(acc, "{}", SgrCode::DefaultForeground),
            }
        }
        if from.background != to.background {
            match to.background {
                Some(ColorValue::Basic(color)) => {
                    _ = write!(acc, "{}", SgrCode::Background(color));
                }
                Some(ColorValue::Rgb(rgb)) => {
                    _ = write!(acc, "{}", SgrCode::BackgroundRgb(rgb));
                }
                None => _ = write!(acc, "{}", SgrCode::DefaultBackground),
            }
        }
        if to.bold && !from.bold {
            _ = write!(acc, "{}", SgrCode::Bold);
        }
        if to.underline && !from.underline {
            _ = write!(acc, "{}", SgrCode::Underline);
        }
        if to.strikethrough && !from.strikethrough {
            _ = write!(acc, "{}", SgrCode::Strikethrough);
        }
        if to.invert && !from.invert {
            _ = write!(acc, "{}", SgrCode::Invert);
        } else if !to.invert && from.invert {
            _ = write!(acc, "{}", SgrCode::ClearInvert);
        }
    }

    /// The commands that take the pending style from `self` back to `target`.
    /// Used when a scoped-state block exits.
    pub fn restore_commands_to(&self, target: &SectionState) -> Vec<TerminalCommand> {
        let mut acc = Vec::new();
        if self.foreground != target.foreground {
            acc.push(match target.foreground {
                Some(color) => TerminalCommand::SetForeground(color),
                None => TerminalCommand::ClearForeground,
            });
        }
        if self.background != target.background {
            acc.push(match target.background {
                Some(color) => TerminalCommand::SetBackground(color),
                None => TerminalCommand::ClearBackground,
            });
        }
        for decoration in Decoration::ALL {
            match (self.decoration(decoration), target.decoration(decoration)) {
                (true, false) => acc.push(TerminalCommand::ClearDecoration(decoration)),
                (false, true) => acc.push(TerminalCommand::SetDecoration(decoration)),
                _ => {}
            }
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;
    use pretty_assertions::assert_eq;

    fn transition(from: &SectionState, to: &SectionState) -> String {
        let mut acc = String::new();
        from.emit_transition_to(to, &mut acc);
        acc
    }

    #[test]
    fn test_additive_transitions_do_not_reset() {
        let plain = SectionState::default();
        let red_bold = SectionState {
            foreground: Some(Color::Red.into()),
            bold: true,
            ..Default::default()
        };
        assert_eq!(transition(&plain, &red_bold), "\x1b[31m\x1b[1m");
    }

    #[test]
    fn test_clearing_bold_forces_reset_and_reapply() {
        let red_bold = SectionState {
            foreground: Some(Color::Red.into()),
            bold: true,
            ..Default::default()
        };
        let red = SectionState {
            foreground: Some(Color::Red.into()),
            ..Default::default()
        };
        // Reset, then the surviving foreground is re-applied.
        assert_eq!(transition(&red_bold, &red), "\x1b[0m\x1b[31m");
    }

    #[test]
    fn test_invert_clears_additively() {
        let inverted = SectionState {
            invert: true,
            ..Default::default()
        };
        assert_eq!(transition(&inverted, &SectionState::default()), "\x1b[27m");
        assert_eq!(transition(&SectionState::default(), &inverted), "\x1b[7m");
    }

    #[test]
    fn test_color_clears_use_default_codes() {
        let green = SectionState {
            foreground: Some(Color::Green.into()),
            background: Some(Color::Black.into()),
            ..Default::default()
        };
        assert_eq!(
            transition(&green, &SectionState::default()),
            "\x1b[39m\x1b[49m"
        );
    }

    #[test]
    fn test_no_bytes_for_equal_states() {
        let state = SectionState {
            underline: true,
            ..Default::default()
        };
        assert_eq!(transition(&state, &state), "");
    }

    #[test]
    fn test_restore_commands_round_trip() {
        let mut current = SectionState {
            foreground: Some(Color::Cyan.into()),
            invert: true,
            ..Default::default()
        };
        let target = SectionState {
            bold: true,
            ..Default::default()
        };
        for command in current.restore_commands_to(&target) {
            current.apply_command(&command);
        }
        assert_eq!(current, target);
    }
}
