use crate::shared::DisplayState;

// state local to the tui: where the cursor is, plus the grid size synced from
// DisplayState every frame so key handling can clamp against it
#[derive(Clone, Debug, Default)]
pub struct TuiState {
    pub cursor_row: usize,
    pub cursor_step: usize,
    pub rows: usize,
    pub steps: usize,
    pub status: Option<String>, // one line of feedback under the grid
}

impl TuiState {
    pub fn sync(&mut self, ds: &DisplayState) {
        self.rows = ds.rows.len();
        self.steps = ds.step_count;
        self.clamp();
    }

    pub fn move_cursor(&mut self, d_row: isize, d_step: isize) {
        if self.rows > 0 {
            self.cursor_row = wrap(self.cursor_row, d_row, self.rows);
        }
        if self.steps > 0 {
            self.cursor_step = wrap(self.cursor_step, d_step, self.steps);
        }
    }

    fn clamp(&mut self) {
        self.cursor_row = self.cursor_row.min(self.rows.saturating_sub(1));
        self.cursor_step = self.cursor_step.min(self.steps.saturating_sub(1));
    }
}

fn wrap(pos: usize, delta: isize, len: usize) -> usize {
    (pos as isize + delta).rem_euclid(len as isize) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_wraps_around_the_grid() {
        let mut ts = TuiState { rows: 3, steps: 16, ..Default::default() };
        ts.move_cursor(-1, -1);
        assert_eq!((ts.cursor_row, ts.cursor_step), (2, 15));
        ts.move_cursor(1, 1);
        assert_eq!((ts.cursor_row, ts.cursor_step), (0, 0));
    }

    #[test]
    fn sync_pulls_the_cursor_back_inside() {
        let mut ts = TuiState { cursor_row: 5, cursor_step: 20, ..Default::default() };
        let ds = DisplayState {
            name: "p".into(),
            bpm: 120.0,
            playing: true,
            playing_step: None,
            step_count: 8,
            rows: Vec::new(),
        };
        ts.sync(&ds);
        assert_eq!((ts.cursor_row, ts.cursor_step), (0, 7));
    }
}
