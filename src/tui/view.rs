use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::mode::TuiState;
use crate::shared::{DisplayState, LedState, TrackRow};

const NAME_WIDTH: usize = 10;
const HELP: &str = "space play/stop  arrows move  enter toggle  m mute  s solo  [ ] gain  +/- bpm  a add  d remove  c clear  w save  esc quit";

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // transport header
            Constraint::Min(4),    // step grid
            Constraint::Length(2), // status + help
        ])
        .split(area);

    draw_header(frame, sections[0], state);
    draw_grid(frame, sections[1], state, ts);
    draw_footer(frame, sections[2], ts);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let transport = if state.playing { "▶ PLAY" } else { "■ STOP" };
    let step = state
        .playing_step
        .map_or_else(|| "--".to_owned(), |s| format!("{:02}", s + 1));
    let line = Line::from(vec![
        Span::styled(transport, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("   {:.0} BPM   step {step}/{}", state.bpm, state.step_count)),
    ]);
    let block = Block::default().borders(Borders::ALL).title(format!(" {} ", state.name));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_grid(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let mut lines: Vec<Line> = state
        .rows
        .iter()
        .enumerate()
        .map(|(row, track)| track_line(track, row, ts))
        .collect();
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "no tracks, press a to add one",
            Style::default().fg(Color::DarkGray),
        )));
    }
    let block = Block::default().borders(Borders::ALL).title(" pattern ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn track_line<'a>(track: &'a TrackRow, row: usize, ts: &TuiState) -> Line<'a> {
    let color = parse_hex(&track.color).unwrap_or(Color::Gray);
    let name_style = if track.audible {
        Style::default().fg(color)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mut name: String = track.name.chars().take(NAME_WIDTH).collect();
    while name.chars().count() < NAME_WIDTH {
        name.push(' ');
    }

    let mut spans = vec![
        Span::styled(name, name_style),
        Span::raw(format!(
            " {}{} {:>3}% ",
            if track.muted { 'M' } else { '·' },
            if track.solo { 'S' } else { '·' },
            (track.gain * 100.0).round() as u32
        )),
    ];

    for (step, led) in track.leds.iter().enumerate() {
        if step > 0 && step % 4 == 0 {
            spans.push(Span::raw(" "));
        }
        let (glyph, mut style) = match led {
            LedState::Off => ("·", Style::default().fg(Color::DarkGray)),
            LedState::On => ("■", Style::default().fg(color)),
            LedState::Playhead => ("▫", Style::default().fg(Color::White)),
            LedState::Hit => ("■", Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        };
        if row == ts.cursor_row && step == ts.cursor_step {
            style = style.add_modifier(Modifier::REVERSED);
        }
        spans.push(Span::styled(glyph, style));
    }
    Line::from(spans)
}

fn draw_footer(frame: &mut Frame, area: Rect, ts: &TuiState) {
    let status = ts.status.clone().unwrap_or_default();
    let lines = vec![
        Line::from(Span::styled(status, Style::default().fg(Color::Yellow))),
        Line::from(Span::styled(HELP, Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

// "#rrggbb" -> Color::Rgb
fn parse_hex(color: &str) -> Option<Color> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use crate::shared::TrackId;

    fn display() -> DisplayState {
        let mut leds = vec![LedState::Off; 16];
        leds[0] = LedState::Hit;
        leds[4] = LedState::On;
        DisplayState {
            name: "Demo Beat".into(),
            bpm: 120.0,
            playing: true,
            playing_step: Some(0),
            step_count: 16,
            rows: vec![TrackRow {
                id: TrackId::new("track-0"),
                name: "Kick".into(),
                instrument: "kick".into(),
                color: "#ef4444".into(),
                muted: false,
                solo: true,
                audible: true,
                gain: 0.8,
                leds,
            }],
        }
    }

    fn screen(ds: &DisplayState, ts: &TuiState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 12)).unwrap();
        terminal.draw(|frame| render(frame, frame.area(), ds, ts)).unwrap();
        terminal.backend().buffer().content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn renders_transport_and_tracks() {
        let text = screen(&display(), &TuiState::default());
        assert!(text.contains("Demo Beat"));
        assert!(text.contains("PLAY"));
        assert!(text.contains("120 BPM"));
        assert!(text.contains("step 01/16"));
        assert!(text.contains("Kick"));
        assert!(text.contains("·S  80%"));
    }

    #[test]
    fn empty_pattern_shows_a_hint() {
        let mut ds = display();
        ds.rows.clear();
        ds.playing = false;
        ds.playing_step = None;
        let text = screen(&ds, &TuiState::default());
        assert!(text.contains("STOP"));
        assert!(text.contains("step --/16"));
        assert!(text.contains("no tracks"));
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex("#ff0080"), Some(Color::Rgb(255, 0, 128)));
        assert_eq!(parse_hex("ff0080"), None);
        assert_eq!(parse_hex("#fff"), None);
    }
}
