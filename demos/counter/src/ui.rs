//! Rendering

use flow_dispatch::debug::ActionLog;
use ratatui::{
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::AppState;

const HELP: &str = "k/Up: +step  j/Down: -step  d: delayed +step  r: reset  l: log  q: quit";

pub fn render(frame: &mut Frame, state: &AppState, log: Option<&ActionLog>) {
    let [body, help_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(frame.area());

    let counter_area = match log {
        Some(log) if state.show_log => {
            let [counter, side] =
                Layout::horizontal([Constraint::Fill(1), Constraint::Length(44)]).areas(body);
            render_log(frame, side, log);
            counter
        }
        _ => body,
    };

    render_counter(frame, counter_area, state);

    let help = Paragraph::new(HELP)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, help_area);
}

fn render_counter(frame: &mut Frame, area: Rect, state: &AppState) {
    let [_, center, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(5),
        Constraint::Fill(1),
    ])
    .areas(area);

    let [_, center, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(30),
        Constraint::Fill(1),
    ])
    .flex(Flex::Center)
    .areas(center);

    let block = Block::default()
        .title(" Counter ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mut lines = vec![Line::from(state.count.to_string())];
    if state.pending > 0 {
        lines.push(Line::from(Span::styled(
            format!("{} pending", state.pending),
            Style::default().fg(Color::Yellow),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, center);
}

fn render_log(frame: &mut Frame, area: Rect, log: &ActionLog) {
    let visible = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = log
        .recent(visible)
        .map(|entry| {
            let marker = match entry.reached_reducer {
                Some(true) => Span::styled("● ", Style::default().fg(Color::Green)),
                Some(false) => Span::styled("○ ", Style::default().fg(Color::Red)),
                None => Span::raw("  "),
            };
            ListItem::new(Line::from(vec![
                marker,
                Span::styled(
                    format!("{:>6} ", entry.elapsed_display()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(entry.summary.clone()),
            ]))
        })
        .collect();

    let block = Block::default()
        .title(format!(" Actions ({}) ", log.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    frame.render_widget(List::new(items).block(block), area);
}
