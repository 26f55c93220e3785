// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A tiny terminal-byte interpreter for assertions: it applies exactly the
//! cursor/erase codes the repaint loop emits (`CR`, `0K`, `1F`, newline) and
//! treats everything else — SGR included — as literal content. Resolving a
//! stream of repaints therefore yields the final visible text.

use crate::{NULL_CHAR, TextPtr};

/// Resolve a byte stream into visible lines. The last element is the line the
/// cursor ends on (usually empty, since every pass ends with a newline).
#[must_use]
pub fn resolve_output(bytes: &str) -> Vec<String> {
    let mut lines: Vec<Vec<char>> = vec![Vec::new()];
    let mut row = 0usize;
    let mut col = 0usize;
    let mut ptr = TextPtr::new(bytes);

    loop {
        let ch = ptr.curr_char();
        if ch == NULL_CHAR {
            break;
        }
        match ch {
            '\n' => {
                ptr.increment();
                row += 1;
                if row == lines.len() {
                    lines.push(Vec::new());
                }
                col = 0;
            }
            '\r' => {
                ptr.increment();
                col = 0;
            }
            '\x1b' if ptr.lookahead(1) == Some('[') => {
                let mut probe = ptr;
                probe.increment_by(2);
                if probe.starts_with("0K") {
                    probe.increment_by(2);
                    ptr = probe;
                    lines[row].truncate(col);
                } else if probe.starts_with("1F") {
                    probe.increment_by(2);
                    ptr = probe;
                    row = row.saturating_sub(1);
                    col = 0;
                } else {
                    // SGR and anything else stays in the content verbatim.
                    write_char(&mut lines[row], &mut col, ch);
                    ptr.increment();
                }
            }
            _ => {
                write_char(&mut lines[row], &mut col, ch);
                ptr.increment();
            }
        }
    }

    lines.into_iter().map(|line| line.into_iter().collect()).collect()
}

/// [`resolve_output`], joined back into one string.
#[must_use]
pub fn resolve_output_text(bytes: &str) -> String { resolve_output(bytes).join("\n") }

fn write_char(line: &mut Vec<char>, col: &mut usize, ch: char) {
    if *col < line.len() {
        line[*col] = ch;
    } else {
        while line.len() < *col {
            line.push(' ');
        }
        line.push(ch);
    }
    *col += 1;
}
