// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Folding of the terminal's raw codepoint stream into the logical [`Key`]
//! stream. One reader task per session owns the escape accumulator; consumers
//! fan out through a broadcast channel so the accumulator is never shared.

use crate::{CsiParseOutcome, InlineString, InlineVec, Key, SafeTerminal,
            is_csi_terminator, parse_csi_body};
use futures_util::StreamExt;
use tokio::{sync::broadcast, task::JoinHandle};

const ESC: u32 = 0x1B;
const BACKSPACE: u32 = 0x08;
const DEL: u32 = 0x7F;

/// The escape-sequence accumulator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum EscapeState {
    #[default]
    Idle,
    /// Saw ESC; deciding between a bare Esc keypress and a CSI sequence.
    GotEsc,
    /// Inside `ESC [ ...`, accumulating until a terminator byte.
    InCsi(InlineString),
}

/// Feed one codepoint; returns zero or more keys. A bare ESC followed by a
/// non-`[` byte yields `Esc` plus whatever the next byte maps to, hence the
/// small vec.
pub(crate) fn fold_codepoint(state: &mut EscapeState, codepoint: u32) -> InlineVec<Key> {
    let mut acc = InlineVec::new();
    fold_into(state, codepoint, &mut acc);
    acc
}

fn fold_into(state: &mut EscapeState, codepoint: u32, acc: &mut InlineVec<Key>) {
    match state {
        EscapeState::Idle => match codepoint {
            ESC => *state = EscapeState::GotEsc,
            cp if cp == u32::from('\r') || cp == u32::from('\n') => {
                acc.push(Key::Enter);
            }
            BACKSPACE | DEL => acc.push(Key::Backspace),
            cp => {
                // Remaining control bytes are dropped; printable codepoints
                // become chars.
                if let Some(ch) = char::from_u32(cp) {
                    if !ch.is_control() {
                        acc.push(Key::Char(ch));
                    }
                }
            }
        },
        EscapeState::GotEsc => match codepoint {
            cp if cp == u32::from('[') => *state = EscapeState::InCsi(InlineString::new()),
            ESC => acc.push(Key::Esc),
            cp => {
                // A lone Esc keypress, then reprocess this byte normally.
                acc.push(Key::Esc);
                *state = EscapeState::Idle;
                fold_into(state, cp, acc);
            }
        },
        EscapeState::InCsi(buffer) => {
            let Some(ch) = char::from_u32(codepoint) else {
                *state = EscapeState::Idle;
                return;
            };
            buffer.push(ch);
            if is_csi_terminator(ch) {
                match parse_csi_body(buffer.as_str()) {
                    CsiParseOutcome::Key(csi_key) => acc.push(Key::from(csi_key)),
                    CsiParseOutcome::Unknown => {
                        tracing::debug!(sequence = %buffer, "dropping unknown CSI input");
                    }
                    CsiParseOutcome::Incomplete => {}
                }
                *state = EscapeState::Idle;
            }
        }
    }
}

/// Spawn the session's key reader: consume the terminal's codepoint stream and
/// broadcast logical keys. The task ends when the stream does; the session
/// aborts it on shutdown via the returned handle.
pub(crate) fn spawn_key_reader(
    terminal: &SafeTerminal,
    key_tx: broadcast::Sender<Key>,
) -> JoinHandle<()> {
    let mut stream = terminal.read();
    tokio::spawn(async move {
        let mut state = EscapeState::default();
        while let Some(codepoint) = stream.next().await {
            for key in fold_codepoint(&mut state, codepoint) {
                // No receivers is fine; keys are dropped until someone
                // subscribes.
                _ = key_tx.send(key);
            }
        }
        tracing::debug!("terminal input stream ended; key reader stopping");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fold_all(input: &str) -> Vec<Key> {
        let mut state = EscapeState::default();
        let mut acc = Vec::new();
        for ch in input.chars() {
            acc.extend(fold_codepoint(&mut state, ch as u32));
        }
        acc
    }

    #[test]
    fn test_printable_chars() {
        assert_eq!(
            fold_all("hi!"),
            vec![Key::Char('h'), Key::Char('i'), Key::Char('!')]
        );
    }

    #[test]
    fn test_enter_and_backspace() {
        assert_eq!(fold_all("\r"), vec![Key::Enter]);
        assert_eq!(fold_all("\n"), vec![Key::Enter]);
        assert_eq!(fold_all("\u{7f}"), vec![Key::Backspace]);
        assert_eq!(fold_all("\u{8}"), vec![Key::Backspace]);
    }

    #[test]
    fn test_other_control_bytes_are_dropped() {
        assert_eq!(fold_all("\u{1}\u{2}\t"), Vec::<Key>::new());
    }

    #[test]
    fn test_csi_arrows_and_navigation() {
        assert_eq!(fold_all("\x1b[A"), vec![Key::Up]);
        assert_eq!(fold_all("\x1b[D\x1b[C"), vec![Key::Left, Key::Right]);
        assert_eq!(fold_all("\x1b[3~"), vec![Key::Delete]);
        assert_eq!(fold_all("\x1b[5~\x1b[6~"), vec![Key::PageUp, Key::PageDown]);
        assert_eq!(fold_all("\x1b[1~x"), vec![Key::Home, Key::Char('x')]);
    }

    #[test]
    fn test_unknown_csi_is_dropped_and_accumulator_resets() {
        assert_eq!(fold_all("\x1b[200~a"), vec![Key::Char('a')]);
    }

    #[test]
    fn test_bare_esc_followed_by_char() {
        assert_eq!(fold_all("\x1bq"), vec![Key::Esc, Key::Char('q')]);
    }

    #[test]
    fn test_double_esc() {
        assert_eq!(fold_all("\x1b\x1b[A"), vec![Key::Esc, Key::Up]);
    }
}
