use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Discrete inputs understood by the graph view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Pan(PanDirection),
    ZoomIn,
    ZoomOut,
    SelectNext,
    SelectPrevious,
    Expand,
    Collapse,
    ToggleExpand,
    TogglePin,
    Center,
    Relayout,
    Step,
    ResetView,
    Search(String),
    Activate,
    Resize { width: u16, height: u16 },
}

/// What a key press means to the terminal host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Command(Command),
    StartSearch,
    Quit,
}

pub fn key_action(key: KeyEvent) -> Option<KeyAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(KeyAction::Quit);
    }

    let command = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(KeyAction::Quit),
        KeyCode::Char('/') => return Some(KeyAction::StartSearch),
        KeyCode::Char('h') | KeyCode::Left => Command::Pan(PanDirection::Left),
        KeyCode::Char('l') | KeyCode::Right => Command::Pan(PanDirection::Right),
        KeyCode::Char('k') | KeyCode::Up => Command::Pan(PanDirection::Up),
        KeyCode::Char('j') | KeyCode::Down => Command::Pan(PanDirection::Down),
        KeyCode::Char('+') | KeyCode::Char('=') => Command::ZoomIn,
        KeyCode::Char('-') | KeyCode::Char('_') => Command::ZoomOut,
        KeyCode::Char('0') => Command::ResetView,
        KeyCode::Char('c') => Command::Center,
        KeyCode::Char(' ') => Command::Step,
        KeyCode::Char('r') => Command::Relayout,
        KeyCode::Tab => Command::SelectNext,
        KeyCode::BackTab => Command::SelectPrevious,
        KeyCode::Enter => Command::Activate,
        KeyCode::Char('e') => Command::Expand,
        KeyCode::Char('x') => Command::Collapse,
        KeyCode::Char('t') => Command::ToggleExpand,
        KeyCode::Char('p') => Command::TogglePin,
        _ => return None,
    };
    Some(KeyAction::Command(command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn vim_keys_and_arrows_pan() {
        for (code, direction) in [
            (KeyCode::Char('h'), PanDirection::Left),
            (KeyCode::Left, PanDirection::Left),
            (KeyCode::Char('j'), PanDirection::Down),
            (KeyCode::Up, PanDirection::Up),
            (KeyCode::Char('l'), PanDirection::Right),
        ] {
            assert_eq!(
                key_action(press(code)),
                Some(KeyAction::Command(Command::Pan(direction)))
            );
        }
    }

    #[test]
    fn selection_and_layout_keys() {
        assert_eq!(
            key_action(press(KeyCode::Tab)),
            Some(KeyAction::Command(Command::SelectNext))
        );
        assert_eq!(
            key_action(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT)),
            Some(KeyAction::Command(Command::SelectPrevious))
        );
        assert_eq!(
            key_action(press(KeyCode::Char(' '))),
            Some(KeyAction::Command(Command::Step))
        );
        assert_eq!(
            key_action(press(KeyCode::Char('r'))),
            Some(KeyAction::Command(Command::Relayout))
        );
        assert_eq!(key_action(press(KeyCode::Char('/'))), Some(KeyAction::StartSearch));
    }

    #[test]
    fn quit_keys_and_releases() {
        assert_eq!(key_action(press(KeyCode::Char('q'))), Some(KeyAction::Quit));
        assert_eq!(
            key_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyAction::Quit)
        );
        assert_eq!(
            key_action(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL)),
            None
        );

        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(key_action(release), None);
        assert_eq!(key_action(press(KeyCode::Char('?'))), None);
    }
}
