// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Decorations built on [`RenderScope::offscreen`]: the content is rendered
//! into a buffer first so its dimensions are known, then replayed row by row
//! inside the frame.

use crate::RenderScope;

/// The glyph set for [`RenderScope::bordered`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BorderCharacters {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
}

impl BorderCharacters {
    pub const ASCII: Self = Self {
        top_left: '+',
        top_right: '+',
        bottom_left: '+',
        bottom_right: '+',
        horizontal: '-',
        vertical: '|',
    };

    pub const BOX_THIN: Self = Self {
        top_left: '┌',
        top_right: '┐',
        bottom_left: '└',
        bottom_right: '┘',
        horizontal: '─',
        vertical: '│',
    };

    pub const BOX_DOUBLE: Self = Self {
        top_left: '╔',
        top_right: '╗',
        bottom_left: '╚',
        bottom_right: '╝',
        horizontal: '═',
        vertical: '║',
    };

    pub const CURVED: Self = Self {
        top_left: '╭',
        top_right: '╮',
        bottom_left: '╰',
        bottom_right: '╯',
        horizontal: '─',
        vertical: '│',
    };
}

impl RenderScope {
    /// Draw `block` inside a box. The interior width is the widest content row
    /// plus `padding` spaces on each side; narrower rows are padded out so the
    /// right edge is straight.
    pub fn bordered(
        &mut self,
        border: BorderCharacters,
        padding: usize,
        block: impl FnOnce(&mut RenderScope),
    ) {
        let buffer = self.offscreen(block);
        let content_width =
            buffer.line_lengths().iter().copied().max().unwrap_or(0) + padding * 2;

        self.text_char(border.top_left);
        for _ in 0..content_width {
            self.text_char(border.horizontal);
        }
        self.text_char(border.top_right);
        self.new_line();

        let mut renderer = buffer.create_renderer();
        let mut row = 0;
        while renderer.has_next_row() {
            self.text_char(border.vertical);
            for _ in 0..padding {
                self.text_char(' ');
            }
            renderer.render_next_row(self);
            for _ in 0..(content_width - padding - buffer.width(row)) {
                self.text_char(' ');
            }
            self.text_char(border.vertical);
            self.new_line();
            row += 1;
        }

        self.text_char(border.bottom_left);
        for _ in 0..content_width {
            self.text_char(border.horizontal);
        }
        self.text_char(border.bottom_right);
        self.new_line();
    }

    /// Indent every row of `block` by `columns` spaces.
    pub fn shift_right(&mut self, columns: usize, block: impl FnOnce(&mut RenderScope)) {
        let buffer = self.offscreen(block);
        let mut renderer = buffer.create_renderer();
        while renderer.has_next_row() {
            for _ in 0..columns {
                self.text_char(' ');
            }
            renderer.render_next_row(self);
            self.new_line();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Weak;

    fn detached() -> RenderScope { RenderScope::new_main(Weak::new()) }

    #[test]
    fn test_bordered_ascii() {
        let mut scope = detached();
        scope.bordered(BorderCharacters::ASCII, 0, |inner| {
            inner.text_line("ab");
            inner.text_line("cdef");
        });
        assert_eq!(
            scope.area().plain_text(),
            "+----+\n|ab  |\n|cdef|\n+----+\n"
        );
    }

    #[test]
    fn test_bordered_with_padding() {
        let mut scope = detached();
        scope.bordered(BorderCharacters::ASCII, 1, |inner| {
            inner.text_line("hi");
        });
        assert_eq!(scope.area().plain_text(), "+----+\n| hi |\n+----+\n");
    }

    #[test]
    fn test_bordered_box_thin() {
        let mut scope = detached();
        scope.bordered(BorderCharacters::BOX_THIN, 0, |inner| {
            inner.text_line("x");
        });
        assert_eq!(scope.area().plain_text(), "┌─┐\n│x│\n└─┘\n");
    }

    #[test]
    fn test_shift_right() {
        let mut scope = detached();
        scope.shift_right(2, |inner| {
            inner.text_line("a");
            inner.text_line("bc");
        });
        assert_eq!(scope.area().plain_text(), "  a\n  bc\n");
    }

    #[test]
    fn test_empty_bordered_block() {
        let mut scope = detached();
        scope.bordered(BorderCharacters::ASCII, 0, |_| {});
        assert_eq!(scope.area().plain_text(), "++\n++\n");
    }
}
