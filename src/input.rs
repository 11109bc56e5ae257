use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Quit,
    ThemeToggle,
    StyleToggle,
    WarpToggle,
    PauseToggle,
    Reseed,
    SpeedUp,
    SpeedDown,
    StarsUp,
    StarsDown,
    HelpToggle,
}

/// Everything the run loop reacts to in one stream: mapped keys plus the
/// terminal's box-size-change notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AppEvent {
    Key(Action),
    Resized(u16, u16),
}

/// Drain pending terminal events without blocking past `max_wait`.
pub(crate) fn collect_events(max_wait: Duration) -> anyhow::Result<Vec<AppEvent>> {
    let mut out = Vec::new();
    let timeout = std::cmp::min(Duration::from_millis(1), max_wait);
    while event::poll(timeout)? {
        match event::read()? {
            Event::Key(k) if k.kind != KeyEventKind::Release => {
                if let Some(action) = map_key(k.code) {
                    out.push(AppEvent::Key(action));
                    if out.len() >= 32 {
                        break;
                    }
                }
            }
            Event::Resize(w, h) => out.push(AppEvent::Resized(w, h)),
            _ => {}
        }
    }
    Ok(out)
}

pub(crate) fn map_key(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('t') | KeyCode::Char('T') => Some(Action::ThemeToggle),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(Action::StyleToggle),
        KeyCode::Char('w') | KeyCode::Char('W') => Some(Action::WarpToggle),
        KeyCode::Char(' ') => Some(Action::PauseToggle),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::Reseed),
        KeyCode::Char('h') | KeyCode::Char('H') => Some(Action::HelpToggle),
        KeyCode::Up => Some(Action::SpeedUp),
        KeyCode::Down => Some(Action::SpeedDown),
        KeyCode::Right => Some(Action::StarsUp),
        KeyCode::Left => Some(Action::StarsDown),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_keys() {
        assert_eq!(map_key(KeyCode::Char('q')), Some(Action::Quit));
        assert_eq!(map_key(KeyCode::Char('Q')), Some(Action::Quit));
        assert_eq!(map_key(KeyCode::Esc), Some(Action::Quit));
    }

    #[test]
    fn control_keys_map_to_actions() {
        assert_eq!(map_key(KeyCode::Char('t')), Some(Action::ThemeToggle));
        assert_eq!(map_key(KeyCode::Char('s')), Some(Action::StyleToggle));
        assert_eq!(map_key(KeyCode::Char('w')), Some(Action::WarpToggle));
        assert_eq!(map_key(KeyCode::Char(' ')), Some(Action::PauseToggle));
        assert_eq!(map_key(KeyCode::Up), Some(Action::SpeedUp));
        assert_eq!(map_key(KeyCode::Left), Some(Action::StarsDown));
    }

    #[test]
    fn unmapped_keys_are_dropped() {
        assert_eq!(map_key(KeyCode::Char('x')), None);
        assert_eq!(map_key(KeyCode::Tab), None);
        assert_eq!(map_key(KeyCode::Enter), None);
    }
}
