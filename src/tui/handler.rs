use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    MoveUp,
    MoveDown,
    RegenerateSection,
    UndoSection,
    WriteDraft,
    OpenPreview,
    ShowHelp,
    HideHelp,
}

pub fn handle_key_event(key: KeyEvent, show_help: bool) -> Option<AppAction> {
    // If help is showing, any key closes it
    if show_help {
        return Some(AppAction::HideHelp);
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) => Some(AppAction::Quit),
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(AppAction::Quit),

        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(AppAction::MoveDown),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(AppAction::MoveUp),

        (KeyCode::Char('g'), _) => Some(AppAction::RegenerateSection),
        (KeyCode::Char('u'), _) => Some(AppAction::UndoSection),
        (KeyCode::Char('w'), _) => Some(AppAction::WriteDraft),
        (KeyCode::Char('o'), _) => Some(AppAction::OpenPreview),

        (KeyCode::Char('?'), _) => Some(AppAction::ShowHelp),

        _ => None,
    }
}
