//! Translation between macro [`Key`]s and rdev's physical key codes.

use crate::event::{Key, NamedKey};

const NAMED: &[(rdev::Key, NamedKey)] = &[
    (rdev::Key::Alt, NamedKey::Alt),
    (rdev::Key::AltGr, NamedKey::AltGr),
    (rdev::Key::Backspace, NamedKey::Backspace),
    (rdev::Key::CapsLock, NamedKey::CapsLock),
    (rdev::Key::MetaLeft, NamedKey::Cmd),
    (rdev::Key::MetaRight, NamedKey::CmdRight),
    (rdev::Key::ControlLeft, NamedKey::Ctrl),
    (rdev::Key::ControlRight, NamedKey::CtrlRight),
    (rdev::Key::Delete, NamedKey::Delete),
    (rdev::Key::DownArrow, NamedKey::Down),
    (rdev::Key::End, NamedKey::End),
    (rdev::Key::Return, NamedKey::Enter),
    (rdev::Key::KpReturn, NamedKey::Enter),
    (rdev::Key::Escape, NamedKey::Esc),
    (rdev::Key::F1, NamedKey::F1),
    (rdev::Key::F2, NamedKey::F2),
    (rdev::Key::F3, NamedKey::F3),
    (rdev::Key::F4, NamedKey::F4),
    (rdev::Key::F5, NamedKey::F5),
    (rdev::Key::F6, NamedKey::F6),
    (rdev::Key::F7, NamedKey::F7),
    (rdev::Key::F8, NamedKey::F8),
    (rdev::Key::F9, NamedKey::F9),
    (rdev::Key::F10, NamedKey::F10),
    (rdev::Key::F11, NamedKey::F11),
    (rdev::Key::F12, NamedKey::F12),
    (rdev::Key::Home, NamedKey::Home),
    (rdev::Key::Insert, NamedKey::Insert),
    (rdev::Key::LeftArrow, NamedKey::Left),
    (rdev::Key::NumLock, NamedKey::NumLock),
    (rdev::Key::PageDown, NamedKey::PageDown),
    (rdev::Key::PageUp, NamedKey::PageUp),
    (rdev::Key::Pause, NamedKey::Pause),
    (rdev::Key::PrintScreen, NamedKey::PrintScreen),
    (rdev::Key::RightArrow, NamedKey::Right),
    (rdev::Key::ScrollLock, NamedKey::ScrollLock),
    (rdev::Key::ShiftLeft, NamedKey::Shift),
    (rdev::Key::ShiftRight, NamedKey::ShiftRight),
    (rdev::Key::Space, NamedKey::Space),
    (rdev::Key::Tab, NamedKey::Tab),
    (rdev::Key::UpArrow, NamedKey::Up),
];

// US layout; the character typed without modifiers.
const CHARS: &[(rdev::Key, char)] = &[
    (rdev::Key::KeyA, 'a'),
    (rdev::Key::KeyB, 'b'),
    (rdev::Key::KeyC, 'c'),
    (rdev::Key::KeyD, 'd'),
    (rdev::Key::KeyE, 'e'),
    (rdev::Key::KeyF, 'f'),
    (rdev::Key::KeyG, 'g'),
    (rdev::Key::KeyH, 'h'),
    (rdev::Key::KeyI, 'i'),
    (rdev::Key::KeyJ, 'j'),
    (rdev::Key::KeyK, 'k'),
    (rdev::Key::KeyL, 'l'),
    (rdev::Key::KeyM, 'm'),
    (rdev::Key::KeyN, 'n'),
    (rdev::Key::KeyO, 'o'),
    (rdev::Key::KeyP, 'p'),
    (rdev::Key::KeyQ, 'q'),
    (rdev::Key::KeyR, 'r'),
    (rdev::Key::KeyS, 's'),
    (rdev::Key::KeyT, 't'),
    (rdev::Key::KeyU, 'u'),
    (rdev::Key::KeyV, 'v'),
    (rdev::Key::KeyW, 'w'),
    (rdev::Key::KeyX, 'x'),
    (rdev::Key::KeyY, 'y'),
    (rdev::Key::KeyZ, 'z'),
    (rdev::Key::Num0, '0'),
    (rdev::Key::Num1, '1'),
    (rdev::Key::Num2, '2'),
    (rdev::Key::Num3, '3'),
    (rdev::Key::Num4, '4'),
    (rdev::Key::Num5, '5'),
    (rdev::Key::Num6, '6'),
    (rdev::Key::Num7, '7'),
    (rdev::Key::Num8, '8'),
    (rdev::Key::Num9, '9'),
    (rdev::Key::BackQuote, '`'),
    (rdev::Key::Minus, '-'),
    (rdev::Key::Equal, '='),
    (rdev::Key::LeftBracket, '['),
    (rdev::Key::RightBracket, ']'),
    (rdev::Key::BackSlash, '\\'),
    (rdev::Key::SemiColon, ';'),
    (rdev::Key::Quote, '\''),
    (rdev::Key::Comma, ','),
    (rdev::Key::Dot, '.'),
    (rdev::Key::Slash, '/'),
    (rdev::Key::KpMinus, '-'),
    (rdev::Key::KpPlus, '+'),
    (rdev::Key::KpMultiply, '*'),
    (rdev::Key::KpDivide, '/'),
];

// Characters reached with shift on a US layout.
const SHIFTED: &[(char, char)] = &[
    ('!', '1'),
    ('@', '2'),
    ('#', '3'),
    ('$', '4'),
    ('%', '5'),
    ('^', '6'),
    ('&', '7'),
    ('*', '8'),
    ('(', '9'),
    (')', '0'),
    ('~', '`'),
    ('_', '-'),
    ('+', '='),
    ('{', '['),
    ('}', ']'),
    ('|', '\\'),
    (':', ';'),
    ('"', '\''),
    ('<', ','),
    ('>', '.'),
    ('?', '/'),
];

/// Builds a macro key from a hook event.
///
/// `typed` is the text the OS reports for the key press, if any. A single
/// printable character wins over the physical key so layouts other than
/// US record what the user actually typed.
pub fn from_rdev(key: rdev::Key, typed: Option<&str>) -> Key {
    if let Some((_, named)) = NAMED.iter().find(|(k, _)| *k == key) {
        return Key::Named(*named);
    }

    if let Some(text) = typed {
        let mut chars = text.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if !c.is_control() && !c.is_whitespace() {
                return Key::Char(c);
            }
        }
    }

    if let Some((_, c)) = CHARS.iter().find(|(k, _)| *k == key) {
        return Key::Char(*c);
    }

    match key {
        rdev::Key::Unknown(code) => Key::Code(code),
        other => Key::Code(rdev_code(other)),
    }
}

/// The physical key that produces `key`, if rdev can simulate it.
pub fn to_rdev(key: Key) -> Option<rdev::Key> {
    match key {
        Key::Named(named) => NAMED
            .iter()
            .find(|(_, n)| *n == named)
            .map(|(k, _)| *k),
        Key::Char(c) => {
            let base = base_char(c);
            CHARS.iter().find(|(_, ch)| *ch == base).map(|(k, _)| *k)
        }
        Key::Code(code) => Some(rdev::Key::Unknown(code)),
    }
}

/// The physical key for `key` and whether Shift must be held to type it.
///
/// `'A'` is `KeyA` with Shift, `'?'` is `Slash` with Shift.
pub fn to_rdev_stroke(key: Key) -> Option<(rdev::Key, bool)> {
    let shift = matches!(key, Key::Char(c) if base_char(c) != c);
    to_rdev(key).map(|raw| (raw, shift))
}

/// Strips shift from a character: `'A'` becomes `'a'`, `'!'` becomes `'1'`.
pub fn base_char(c: char) -> char {
    if c.is_ascii_uppercase() {
        return c.to_ascii_lowercase();
    }
    SHIFTED
        .iter()
        .find(|(shifted, _)| *shifted == c)
        .map(|(_, base)| *base)
        .unwrap_or(c)
}

fn rdev_code(key: rdev::Key) -> u32 {
    match key {
        rdev::Key::Kp0 => 96,
        rdev::Key::Kp1 => 97,
        rdev::Key::Kp2 => 98,
        rdev::Key::Kp3 => 99,
        rdev::Key::Kp4 => 100,
        rdev::Key::Kp5 => 101,
        rdev::Key::Kp6 => 102,
        rdev::Key::Kp7 => 103,
        rdev::Key::Kp8 => 104,
        rdev::Key::Kp9 => 105,
        rdev::Key::KpDelete => 110,
        rdev::Key::IntlBackslash => 226,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_keys_map_both_ways() {
        assert_eq!(from_rdev(rdev::Key::ShiftLeft, None), Key::Named(NamedKey::Shift));
        assert_eq!(to_rdev(Key::Named(NamedKey::Enter)), Some(rdev::Key::Return));
        assert_eq!(from_rdev(rdev::Key::Space, Some(" ")), Key::Named(NamedKey::Space));
    }

    #[test]
    fn test_typed_character_wins() {
        assert_eq!(from_rdev(rdev::Key::KeyA, Some("A")), Key::Char('A'));
        assert_eq!(from_rdev(rdev::Key::KeyQ, Some("a")), Key::Char('a'));
        assert_eq!(from_rdev(rdev::Key::KeyA, None), Key::Char('a'));
        assert_eq!(from_rdev(rdev::Key::KeyA, Some("\u{1}")), Key::Char('a'));
    }

    #[test]
    fn test_unknown_keys_keep_code() {
        assert_eq!(from_rdev(rdev::Key::Unknown(187), None), Key::Code(187));
        assert_eq!(from_rdev(rdev::Key::Kp5, None), Key::Code(101));
    }

    #[test]
    fn test_shifted_characters_use_base_key() {
        assert_eq!(to_rdev(Key::Char('A')), Some(rdev::Key::KeyA));
        assert_eq!(to_rdev(Key::Char('?')), Some(rdev::Key::Slash));
        assert_eq!(to_rdev(Key::Char('é')), None);
    }

    #[test]
    fn test_strokes_report_shift() {
        assert_eq!(to_rdev_stroke(Key::Char('A')), Some((rdev::Key::KeyA, true)));
        assert_eq!(to_rdev_stroke(Key::Char('!')), Some((rdev::Key::Num1, true)));
        assert_eq!(to_rdev_stroke(Key::Char('a')), Some((rdev::Key::KeyA, false)));
        assert_eq!(
            to_rdev_stroke(Key::Named(NamedKey::Shift)),
            Some((rdev::Key::ShiftLeft, false))
        );
    }
}
