use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use super::mode::TuiState;
use crate::shared::InputEvent;

const BPM_STEP: f32 = 5.0;
const GAIN_STEP: f32 = 0.05;

// poll for input from the terminal, moving the cursor in TuiState and resolving
// everything else into semantic InputEvents for the coordinator
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

pub fn handle_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    let row = ts.cursor_row;
    match code {
        KeyCode::Esc | KeyCode::Char('q') => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::PlayPress],
        KeyCode::Char('w') => vec![InputEvent::Save],
        KeyCode::Char('a') => vec![InputEvent::AddTrack],

        KeyCode::Up => { ts.move_cursor(-1, 0); vec![] }
        KeyCode::Down => { ts.move_cursor(1, 0); vec![] }
        KeyCode::Left => { ts.move_cursor(0, -1); vec![] }
        KeyCode::Right => { ts.move_cursor(0, 1); vec![] }

        KeyCode::Char('+' | '=') => vec![InputEvent::AdjustBpm(BPM_STEP)],
        KeyCode::Char('-') => vec![InputEvent::AdjustBpm(-BPM_STEP)],

        // everything below acts on the track under the cursor
        _ if ts.rows == 0 => vec![],
        KeyCode::Enter | KeyCode::Char('x') => vec![InputEvent::ToggleStep { row, step: ts.cursor_step }],
        KeyCode::Char('m') => vec![InputEvent::ToggleMute(row)],
        KeyCode::Char('s') => vec![InputEvent::ToggleSolo(row)],
        KeyCode::Char(']') => vec![InputEvent::AdjustGain { row, delta: GAIN_STEP }],
        KeyCode::Char('[') => vec![InputEvent::AdjustGain { row, delta: -GAIN_STEP }],
        KeyCode::Char('c') => vec![InputEvent::ClearTrack(row)],
        KeyCode::Char('d') => vec![InputEvent::RemoveTrack(row)],

        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> TuiState {
        TuiState { rows: 2, steps: 16, ..Default::default() }
    }

    #[test]
    fn enter_toggles_the_step_under_the_cursor() {
        let mut ts = state();
        handle_key(KeyCode::Down, &mut ts);
        handle_key(KeyCode::Right, &mut ts);
        handle_key(KeyCode::Right, &mut ts);
        assert_eq!(handle_key(KeyCode::Enter, &mut ts), vec![InputEvent::ToggleStep { row: 1, step: 2 }]);
        assert_eq!(handle_key(KeyCode::Char('x'), &mut ts), vec![InputEvent::ToggleStep { row: 1, step: 2 }]);
    }

    #[test]
    fn transport_keys() {
        let mut ts = state();
        assert_eq!(handle_key(KeyCode::Char(' '), &mut ts), vec![InputEvent::PlayPress]);
        assert_eq!(handle_key(KeyCode::Esc, &mut ts), vec![InputEvent::Quit]);
        assert_eq!(handle_key(KeyCode::Char('+'), &mut ts), vec![InputEvent::AdjustBpm(5.0)]);
        assert_eq!(handle_key(KeyCode::Char('-'), &mut ts), vec![InputEvent::AdjustBpm(-5.0)]);
    }

    #[test]
    fn track_keys_need_a_track() {
        let mut ts = TuiState { steps: 16, ..Default::default() };
        assert!(handle_key(KeyCode::Enter, &mut ts).is_empty());
        assert!(handle_key(KeyCode::Char('m'), &mut ts).is_empty());
        assert_eq!(handle_key(KeyCode::Char('a'), &mut ts), vec![InputEvent::AddTrack]);
    }

    #[test]
    fn mute_solo_and_gain_target_the_cursor_row() {
        let mut ts = state();
        handle_key(KeyCode::Down, &mut ts);
        assert_eq!(handle_key(KeyCode::Char('m'), &mut ts), vec![InputEvent::ToggleMute(1)]);
        assert_eq!(handle_key(KeyCode::Char('s'), &mut ts), vec![InputEvent::ToggleSolo(1)]);
        assert_eq!(
            handle_key(KeyCode::Char(']'), &mut ts),
            vec![InputEvent::AdjustGain { row: 1, delta: 0.05 }]
        );
    }
}
