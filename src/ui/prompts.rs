//! Text entry overlays: place search with suggestions, and the name prompt

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::help_overlay::centered_rect;
use super::Palette;
use crate::app::App;
use crate::search::MIN_QUERY_CHARS;

/// Renders the search box and its suggestion list
pub fn render_search(frame: &mut Frame, app: &App, palette: &Palette) {
    let area = centered_rect(60, 14, frame.area());
    frame.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let input = Paragraph::new(Line::from(vec![
        Span::styled(app.query.as_str(), Style::default().fg(palette.text)),
        Span::styled("_", Style::default().fg(palette.highlight)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Search city ")
            .border_style(Style::default().fg(palette.accent)),
    );
    frame.render_widget(input, chunks[0]);

    let block = Block::default().borders(Borders::ALL).title(" Suggestions ");

    if app.suggestions.is_empty() {
        let hint = if app.query.trim().chars().count() < MIN_QUERY_CHARS {
            "Type at least 2 letters"
        } else {
            "No matches yet"
        };
        let empty = Paragraph::new(hint)
            .style(Style::default().fg(palette.muted))
            .block(block);
        frame.render_widget(empty, chunks[1]);
        return;
    }

    let items: Vec<ListItem> = app
        .suggestions
        .iter()
        .map(|place| ListItem::new(place.display_name()))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(palette.highlight)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.selected_suggestion));
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

/// Renders the prompt for the greeting name
pub fn render_name_prompt(frame: &mut Frame, app: &App, palette: &Palette) {
    let area = centered_rect(50, 5, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(vec![
            Span::styled(app.name_input.as_str(), Style::default().fg(palette.text)),
            Span::styled("_", Style::default().fg(palette.highlight)),
        ]),
        Line::from(Span::styled(
            "Enter to save, Esc to cancel",
            Style::default().fg(palette.muted),
        )),
    ];

    let prompt = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Your name ")
            .border_style(Style::default().fg(palette.accent)),
    );
    frame.render_widget(prompt, area);
}
