use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::types::Ack;

/// Map one key press at the batch prompt. Raw mode turns Ctrl+C into a key
/// event, so it is handled here as an interrupt.
pub fn ack_from_key(k: KeyEvent) -> Ack {
    if k.modifiers.contains(KeyModifiers::CONTROL) && matches!(k.code, KeyCode::Char('c' | 'C')) {
        return Ack::Interrupt;
    }
    match k.code {
        KeyCode::Char('c' | 'C') => Ack::ClearNow,
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Ack::Quit,
        _ => Ack::Next,
    }
}

/// Line-mode equivalent of [`ack_from_key`]. `None` means end of input.
pub fn ack_from_line(line: Option<&str>) -> Ack {
    match line.map(str::trim) {
        None => Ack::Quit,
        Some("c" | "C") => Ack::ClearNow,
        Some("q" | "Q") => Ack::Quit,
        Some(_) => Ack::Next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn ctrl_c_is_an_interrupt() {
        assert_eq!(ack_from_key(key(KeyCode::Char('c'), KeyModifiers::CONTROL)), Ack::Interrupt);
    }

    #[test]
    fn plain_keys() {
        assert_eq!(ack_from_key(key(KeyCode::Char('c'), KeyModifiers::NONE)), Ack::ClearNow);
        assert_eq!(ack_from_key(key(KeyCode::Esc, KeyModifiers::NONE)), Ack::Quit);
        assert_eq!(ack_from_key(key(KeyCode::Char('Q'), KeyModifiers::SHIFT)), Ack::Quit);
        assert_eq!(ack_from_key(key(KeyCode::Enter, KeyModifiers::NONE)), Ack::Next);
        assert_eq!(ack_from_key(key(KeyCode::Char('x'), KeyModifiers::NONE)), Ack::Next);
    }

    #[test]
    fn line_mode() {
        assert_eq!(ack_from_line(Some("\n")), Ack::Next);
        assert_eq!(ack_from_line(Some(" c \n")), Ack::ClearNow);
        assert_eq!(ack_from_line(Some("q")), Ack::Quit);
        assert_eq!(ack_from_line(None), Ack::Quit);
    }
}
