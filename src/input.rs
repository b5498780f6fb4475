use crate::app::SelectMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
    ToggleMark,
    Accept,
    Cancel,
    Backspace,
    ClearQuery,
    InputChar(char),
}

pub fn map_key(mode: SelectMode, key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('g') if ctrl => Some(Action::Cancel),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Enter => Some(Action::Accept),
        KeyCode::Char('m') if ctrl => Some(Action::Accept),
        KeyCode::Tab | KeyCode::BackTab if mode == SelectMode::Multi => Some(Action::ToggleMark),
        KeyCode::Up => Some(Action::Up),
        KeyCode::Char('p') | KeyCode::Char('k') if ctrl => Some(Action::Up),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('n') | KeyCode::Char('j') if ctrl => Some(Action::Down),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::Home => Some(Action::Top),
        KeyCode::End => Some(Action::Bottom),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char('h') if ctrl => Some(Action::Backspace),
        KeyCode::Char('u') if ctrl => Some(Action::ClearQuery),
        KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn typing_edits_the_query() {
        assert_eq!(
            map_key(SelectMode::Single, key(KeyCode::Char('j'))),
            Some(Action::InputChar('j'))
        );
        assert_eq!(
            map_key(
                SelectMode::Single,
                KeyEvent::new(KeyCode::Char('P'), KeyModifiers::SHIFT)
            ),
            Some(Action::InputChar('P'))
        );
        assert_eq!(map_key(SelectMode::Single, ctrl('u')), Some(Action::ClearQuery));
    }

    #[test]
    fn ctrl_chords_navigate_and_cancel() {
        assert_eq!(map_key(SelectMode::Single, ctrl('n')), Some(Action::Down));
        assert_eq!(map_key(SelectMode::Single, ctrl('k')), Some(Action::Up));
        assert_eq!(map_key(SelectMode::Single, ctrl('c')), Some(Action::Cancel));
        assert_eq!(map_key(SelectMode::Multi, key(KeyCode::Esc)), Some(Action::Cancel));
    }

    #[test]
    fn tab_marks_only_in_multi_mode() {
        assert_eq!(
            map_key(SelectMode::Multi, key(KeyCode::Tab)),
            Some(Action::ToggleMark)
        );
        assert_eq!(map_key(SelectMode::Single, key(KeyCode::Tab)), None);
    }
}
