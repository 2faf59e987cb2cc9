use crate::model::{ControlId, SceneId};
use crate::sim::Action;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::time::Duration;

#[derive(Clone, Copy, Debug)]
pub(crate) enum Msg {
    Sim(Action),
    Quit,
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<KeyCode>> {
    let mut out = Vec::new();
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                out.push(k.code);
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

pub(crate) fn map_key(key: KeyCode) -> Option<Msg> {
    let msg = match key {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Msg::Quit,
        KeyCode::Char(' ') => Msg::Sim(Action::ToggleRun),
        KeyCode::Char('r') | KeyCode::Char('R') => Msg::Sim(Action::Reset),
        KeyCode::Char('s') | KeyCode::Char('S') => Msg::Sim(Action::CycleSubstance),
        KeyCode::Tab | KeyCode::Char('t') | KeyCode::Char('T') => Msg::Sim(Action::NextTab),
        KeyCode::Char(c @ '1'..='5') => {
            let idx = c as usize - '1' as usize;
            Msg::Sim(Action::SetScene(SceneId::all()[idx]))
        }
        KeyCode::Up => Msg::Sim(Action::Nudge(ControlId::Temp, 1.0)),
        KeyCode::Down => Msg::Sim(Action::Nudge(ControlId::Temp, -1.0)),
        KeyCode::Right => Msg::Sim(Action::Nudge(ControlId::Wind, 1.0)),
        KeyCode::Left => Msg::Sim(Action::Nudge(ControlId::Wind, -1.0)),
        KeyCode::Char(']') => Msg::Sim(Action::Nudge(ControlId::Area, 1.0)),
        KeyCode::Char('[') => Msg::Sim(Action::Nudge(ControlId::Area, -1.0)),
        KeyCode::Char('=') | KeyCode::Char('+') => Msg::Sim(Action::Nudge(ControlId::Pressure, 1.0)),
        KeyCode::Char('-') => Msg::Sim(Action::Nudge(ControlId::Pressure, -1.0)),
        _ => return None,
    };
    Some(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_keys_map_in_order() {
        for (i, scene) in SceneId::all().iter().enumerate() {
            let key = KeyCode::Char(char::from(b'1' + i as u8));
            match map_key(key) {
                Some(Msg::Sim(Action::SetScene(s))) => assert_eq!(s, *scene),
                other => panic!("unexpected mapping: {other:?}"),
            }
        }
    }

    #[test]
    fn quit_keys() {
        assert!(matches!(map_key(KeyCode::Esc), Some(Msg::Quit)));
        assert!(matches!(map_key(KeyCode::Char('q')), Some(Msg::Quit)));
        assert!(map_key(KeyCode::Char('z')).is_none());
    }
}
