// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::CsiKey;

/// A logical keypress, as produced by the session's key reader. Printable
/// input arrives as [`Key::Char`]; everything else is a named key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Delete,
    Enter,
    Backspace,
    Esc,
    Tab,
}

macro_rules! letter_keys {
    ($($name:ident => $ch:literal),* $(,)?) => {
        impl Key {
            $(pub const $name: Key = Key::Char($ch);)*
        }
    };
}

// Letter and space aliases, for consumers matching on shortcut keys.
letter_keys! {
    SPACE => ' ',
    A => 'a', B => 'b', C => 'c', D => 'd', E => 'e', F => 'f', G => 'g',
    H => 'h', I => 'i', J => 'j', K => 'k', L => 'l', M => 'm', N => 'n',
    O => 'o', P => 'p', Q => 'q', R => 'r', S => 's', T => 't', U => 'u',
    V => 'v', W => 'w', X => 'x', Y => 'y', Z => 'z',
}

impl From<CsiKey> for Key {
    fn from(csi_key: CsiKey) -> Self {
        match csi_key {
            CsiKey::Up => Key::Up,
            CsiKey::Down => Key::Down,
            CsiKey::Left => Key::Left,
            CsiKey::Right => Key::Right,
            CsiKey::Home => Key::Home,
            CsiKey::End => Key::End,
            CsiKey::Delete => Key::Delete,
            CsiKey::PageUp => Key::PageUp,
            CsiKey::PageDown => Key::PageDown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_aliases_are_chars() {
        assert_eq!(Key::Q, Key::Char('q'));
        assert_eq!(Key::SPACE, Key::Char(' '));
    }

    #[test]
    fn test_csi_key_conversion() {
        assert_eq!(Key::from(CsiKey::Up), Key::Up);
        assert_eq!(Key::from(CsiKey::PageDown), Key::PageDown);
    }
}
