use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Status};
use crate::session::Phase;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const CURSOR: &str = "▏";

/// Rows needed to show `text` wrapped at `width` columns, one row minimum
fn wrapped_rows(text: &str, width: u16) -> u16 {
    if width == 0 {
        return 1;
    }
    text.lines()
        .map(|line| line.width().div_ceil(width as usize).max(1))
        .fold(0u16, |rows, n| {
            rows.saturating_add(u16::try_from(n).unwrap_or(u16::MAX))
        })
        .max(1)
}

fn legend(phase: Phase) -> &'static str {
    match phase {
        Phase::Expired => "(a)nalyze / (c)lear / (ctrl+n) new passage / (esc)ape",
        Phase::Idle | Phase::Running => {
            "(ctrl+a) analyze / (ctrl+l) clear / (ctrl+n) new passage / (esc)ape"
        }
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let session = self.session();

        // styles
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let accent_style = Style::default().fg(Color::Rgb(186, 127, 127));
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let inner_width = area
            .width
            .saturating_sub(HORIZONTAL_MARGIN * 2)
            .saturating_sub(2);
        let sample_rows = wrapped_rows(self.sample(), inner_width).saturating_add(1);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1),               // title
                Constraint::Length(sample_rows.saturating_add(2)), // passage
                Constraint::Min(3),                  // typed text
                Constraint::Length(1),               // timer
                Constraint::Length(1),               // legend
                Constraint::Length(5),               // results
                Constraint::Length(1),               // status
            ])
            .split(area);

        Paragraph::new(Span::styled("Typing Tally", accent_style.patch(bold_style)))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        let passage = Paragraph::new(vec![
            Line::from(Span::styled("Type this:", bold_style)),
            Line::from(Span::styled(format!("\"{}\"", self.sample()), italic_style)),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(accent_style),
        )
        .wrap(Wrap { trim: false });
        passage.render(chunks[1], buf);

        let accepting = session.accepts_input();
        let text_style = if accepting { accent_style } else { dim_style };
        let mut typed = TypedText::new(self.text(), text_style);
        if accepting {
            typed.push_cursor();
        }
        let placeholder = self.text().is_empty() && session.phase() == Phase::Idle;
        let text_area = if placeholder {
            Paragraph::new(Span::styled("Start typing...", dim_style.patch(italic_style)))
        } else {
            Paragraph::new(typed.into_lines())
        };
        text_area
            .block(Block::default().borders(Borders::ALL).border_style(text_style))
            .wrap(Wrap { trim: false })
            .render(chunks[2], buf);

        let timer = if session.has_started {
            format!("Time left: {}s", session.seconds_remaining)
        } else {
            "Start typing to begin countdown".to_string()
        };
        Paragraph::new(Span::styled(timer, bold_style))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);

        let legend_style = if session.locked {
            dim_style.patch(italic_style)
        } else {
            italic_style
        };
        Paragraph::new(Span::styled(legend(session.phase()), legend_style))
            .alignment(Alignment::Center)
            .render(chunks[4], buf);

        if let Some(result) = self.result() {
            let lines = vec![
                Line::from(format!("Words: {}", result.word_count)),
                Line::from(format!("Symbols: {}", result.symbol_count)),
                Line::from(vec![
                    Span::styled("Your typing level: ", bold_style),
                    Span::raw(result.summary()),
                ]),
            ];
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::TOP))
                .render(chunks[5], buf);
        }

        match self.status() {
            Some(Status::Analyzing) => {
                Paragraph::new(Span::styled(
                    "Analyzing...",
                    Style::default().fg(Color::Yellow).patch(italic_style),
                ))
                .alignment(Alignment::Center)
                .render(chunks[6], buf);
            }
            Some(Status::Failed(message)) => {
                Paragraph::new(Span::styled(
                    format!("Error: {message}"),
                    Style::default().fg(Color::Red).patch(bold_style),
                ))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(chunks[6], buf);
            }
            None => {}
        }
    }
}

/// Typed text split into styled lines, keeping newlines the user entered
struct TypedText {
    lines: Vec<String>,
    style: Style,
    cursor: bool,
}

impl TypedText {
    fn new(text: &str, style: Style) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
            style,
            cursor: false,
        }
    }

    fn push_cursor(&mut self) {
        self.cursor = true;
    }

    fn into_lines(self) -> Vec<Line<'static>> {
        let last = self.lines.len().saturating_sub(1);
        let style = self.style;
        let cursor = self.cursor;

        self.lines
            .into_iter()
            .enumerate()
            .map(|(idx, line)| {
                let mut spans = vec![Span::styled(line, style)];
                if cursor && idx == last {
                    spans.push(Span::styled(CURSOR, style.add_modifier(Modifier::SLOW_BLINK)));
                }
                Line::from(spans)
            })
            .collect()
    }
}
