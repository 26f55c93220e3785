// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Generation of the CSI escape sequences the runtime emits. The full set is
//! deliberately small: SGR styling, cursor-to-previous-line, and
//! erase-to-line-end are all a section repaint needs.

use super::color::{Color, Rgb};
use std::fmt::{Display, Formatter, Result};

/// Control Sequence Introducer.
pub const CSI: &str = "\x1b[";

/// SGR (Select Graphic Rendition) codes. [`Display`] produces the full escape
/// sequence, e.g. `SgrCode::Bold` renders as `\x1b[1m`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SgrCode {
    Reset,
    Bold,
    Underline,
    Strikethrough,
    Invert,
    ClearInvert,
    Foreground(Color),
    Background(Color),
    ForegroundRgb(Rgb),
    BackgroundRgb(Rgb),
    DefaultForeground,
    DefaultBackground,
}

impl SgrCode {
    /// The numeric SGR parameter for a basic color on the given layer. Bright
    /// variants use the `90..=97` / `100..=107` ranges.
    fn basic_color_param(color: Color, background: bool) -> u8 {
        let base: u8 = match (color.is_bright(), background) {
            (false, false) => 30,
            (false, true) => 40,
            (true, false) => 90,
            (true, true) => 100,
        };
        base + (color.index() % 8)
    }
}

impl Display for SgrCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            SgrCode::Reset => write!(f, "{CSI}0m"),
            SgrCode::Bold => write!(f, "{CSI}1m"),
            SgrCode::Underline => write!(f, "{CSI}4m"),
            SgrCode::Strikethrough => write!(f, "{CSI}9m"),
            SgrCode::Invert => write!(f, "{CSI}7m"),
            SgrCode::ClearInvert => write!(f, "{CSI}27m"),
            SgrCode::Foreground(color) => {
                write!(f, "{CSI}{}m", SgrCode::basic_color_param(*color, false))
            }
            SgrCode::Background(color) => {
                write!(f, "{CSI}{}m", SgrCode::basic_color_param(*color, true))
            }
            SgrCode::ForegroundRgb(rgb) => {
                write!(f, "{CSI}38;2;{};{};{}m", rgb.red, rgb.green, rgb.blue)
            }
            SgrCode::BackgroundRgb(rgb) => {
                write!(f, "{CSI}48;2;{};{};{}m", rgb.red, rgb.green, rgb.blue)
            }
            SgrCode::DefaultForeground => write!(f, "{CSI}39m"),
            SgrCode::DefaultBackground => write!(f, "{CSI}49m"),
        }
    }
}

/// Non-SGR CSI sequences the repaint loop uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsiCode {
    /// Move the cursor to the start of the previous line (`CSI 1F`).
    CursorPrevLine,
    /// Erase from the cursor to the end of the line (`CSI 0K`).
    EraseToLineEnd,
}

impl Display for CsiCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            CsiCode::CursorPrevLine => write!(f, "{CSI}1F"),
            CsiCode::EraseToLineEnd => write!(f, "{CSI}0K"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sgr_basic_colors() {
        assert_eq!(SgrCode::Foreground(Color::Black).to_string(), "\x1b[30m");
        assert_eq!(SgrCode::Foreground(Color::White).to_string(), "\x1b[37m");
        assert_eq!(SgrCode::Foreground(Color::BrightRed).to_string(), "\x1b[91m");
        assert_eq!(SgrCode::Background(Color::Blue).to_string(), "\x1b[44m");
        assert_eq!(
            SgrCode::Background(Color::BrightWhite).to_string(),
            "\x1b[107m"
        );
    }

    #[test]
    fn test_sgr_truecolor_and_defaults() {
        assert_eq!(
            SgrCode::ForegroundRgb(Rgb::new(1, 2, 3)).to_string(),
            "\x1b[38;2;1;2;3m"
        );
        assert_eq!(
            SgrCode::BackgroundRgb(Rgb::new(255, 0, 128)).to_string(),
            "\x1b[48;2;255;0;128m"
        );
        assert_eq!(SgrCode::DefaultForeground.to_string(), "\x1b[39m");
        assert_eq!(SgrCode::DefaultBackground.to_string(), "\x1b[49m");
    }

    #[test]
    fn test_sgr_decorations() {
        assert_eq!(SgrCode::Reset.to_string(), "\x1b[0m");
        assert_eq!(SgrCode::Bold.to_string(), "\x1b[1m");
        assert_eq!(SgrCode::Underline.to_string(), "\x1b[4m");
        assert_eq!(SgrCode::Strikethrough.to_string(), "\x1b[9m");
        assert_eq!(SgrCode::Invert.to_string(), "\x1b[7m");
        assert_eq!(SgrCode::ClearInvert.to_string(), "\x1b[27m");
    }

    #[test]
    fn test_cursor_and_erase() {
        assert_eq!(CsiCode::CursorPrevLine.to_string(), "\x1b[1F");
        assert_eq!(CsiCode::EraseToLineEnd.to_string(), "\x1b[0K");
    }
}
