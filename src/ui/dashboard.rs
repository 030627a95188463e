//! Dashboard screen rendering
//!
//! Shows the greeting and place title, current conditions, astronomy times,
//! the forecast strip and a status bar. All strings come from `DashboardView`.

use chrono::{Local, Timelike};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::Palette;
use crate::app::App;
use crate::pipeline::Freshness;
use crate::render::{greeting, DashboardView, ForecastRow};

/// Renders the dashboard for the current view, or a notice when there is none
pub fn render(frame: &mut Frame, app: &App, palette: &Palette) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(9), // Current conditions
            Constraint::Min(6),    // Forecast
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header(frame, chunks[0], app, palette);

    match &app.view {
        Some(view) => {
            render_current(frame, chunks[1], view, palette);
            render_forecast(frame, chunks[2], &view.forecast, palette);
        }
        None => {
            let message = Paragraph::new("No weather to show yet. Press / to search.")
                .style(Style::default().fg(palette.muted))
                .alignment(Alignment::Center);
            frame.render_widget(message, chunks[1]);
        }
    }

    render_status_bar(frame, chunks[3], app, palette);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let hello = greeting(Local::now().hour(), &app.settings.user_name);
    let title = app
        .view
        .as_ref()
        .map(|v| v.title.clone())
        .unwrap_or_default();

    let line = Line::from(vec![
        Span::styled(hello, Style::default().fg(palette.muted)),
        Span::raw("   "),
        Span::styled(
            title,
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ),
    ]);

    let header = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" wxdash ")
            .border_style(Style::default().fg(palette.accent)),
    );
    frame.render_widget(header, area);
}

fn detail_line<'a>(label: &'a str, value: &'a str, palette: &Palette) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{:<12}", label), Style::default().fg(palette.muted)),
        Span::styled(value, Style::default().fg(palette.text)),
    ])
}

fn render_current(frame: &mut Frame, area: Rect, view: &DashboardView, palette: &Palette) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(35),
            Constraint::Percentage(30),
        ])
        .split(area);

    let summary = vec![
        Line::from(Span::styled(
            view.temperature.as_str(),
            Style::default()
                .fg(palette.highlight)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            view.description.as_str(),
            Style::default().fg(palette.text),
        )),
        Line::from(Span::styled(
            format!("Feels like {}", view.feels_like),
            Style::default().fg(palette.muted),
        )),
    ];
    frame.render_widget(
        Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title(" Now ")),
        columns[0],
    );

    let details = vec![
        detail_line("Humidity", &view.humidity, palette),
        detail_line("Wind", &view.wind, palette),
        detail_line("Visibility", &view.visibility, palette),
        detail_line("Pressure", &view.pressure, palette),
        detail_line("UV index", &view.uv, palette),
    ];
    frame.render_widget(
        Paragraph::new(details).block(Block::default().borders(Borders::ALL).title(" Details ")),
        columns[1],
    );

    let astro = match &view.astro {
        Some(astro) => vec![
            detail_line("Sunrise", &astro.sunrise, palette),
            detail_line("Sunset", &astro.sunset, palette),
            detail_line("Moonrise", &astro.moonrise, palette),
            detail_line("Moonset", &astro.moonset, palette),
        ],
        None => vec![Line::from(Span::styled(
            "Not available",
            Style::default().fg(palette.muted),
        ))],
    };
    frame.render_widget(
        Paragraph::new(astro).block(Block::default().borders(Borders::ALL).title(" Sun & Moon ")),
        columns[2],
    );
}

fn render_forecast(frame: &mut Frame, area: Rect, rows: &[ForecastRow], palette: &Palette) {
    let block = Block::default().borders(Borders::ALL).title(" Next days ");

    if rows.is_empty() {
        let empty = Paragraph::new("No forecast available")
            .style(Style::default().fg(palette.muted))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let constraints = vec![Constraint::Ratio(1, rows.len() as u32); rows.len()];
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(inner);

    for (row, cell) in rows.iter().zip(cells.iter()) {
        let lines = vec![
            Line::from(Span::styled(
                row.weekday.as_str(),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                row.month_day.as_str(),
                Style::default().fg(palette.muted),
            )),
            Line::from(vec![
                Span::styled(row.max.as_str(), Style::default().fg(palette.highlight)),
                Span::raw(" / "),
                Span::styled(row.min.as_str(), Style::default().fg(palette.text)),
            ]),
            Line::from(Span::styled(
                row.description.as_str(),
                Style::default().fg(palette.text),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), *cell);
    }
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let line = if let Some(notice) = &app.notice {
        Line::from(Span::styled(
            notice.as_str(),
            Style::default().fg(palette.warning),
        ))
    } else if let Some(view) = &app.view {
        let freshness = match app.freshness {
            Some(Freshness::Cached) => " (cached, refreshing)",
            _ => "",
        };
        Line::from(vec![
            Span::styled(
                format!("{}{}", view.updated, freshness),
                Style::default().fg(palette.muted),
            ),
            Span::styled(
                format!("  via {}", view.source),
                Style::default().fg(palette.muted),
            ),
            Span::styled("  ? help", Style::default().fg(palette.muted)),
        ])
    } else {
        Line::from(Span::styled("? help", Style::default().fg(palette.muted)))
    };

    frame.render_widget(Paragraph::new(line), area);
}
