//! UI rendering module for wxdash
//!
//! This module contains all the rendering logic for the terminal user interface,
//! using the ratatui library for TUI components. Views only read `App` state and
//! the strings already derived by `render`.

pub mod dashboard;
pub mod help_overlay;
pub mod prompts;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, AppState};
use crate::config::Theme;

/// Colors for one theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub highlight: Color,
    pub warning: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                text: Color::Black,
                muted: Color::DarkGray,
                accent: Color::Blue,
                highlight: Color::Magenta,
                warning: Color::Red,
            },
            Theme::Dark => Palette {
                text: Color::White,
                muted: Color::Gray,
                accent: Color::Cyan,
                highlight: Color::Yellow,
                warning: Color::LightRed,
            },
        }
    }
}

/// Renders the UI based on the current application state
pub fn render_app(frame: &mut Frame, app: &App) {
    let palette = Palette::for_theme(app.settings.theme);

    match app.state {
        AppState::Loading => render_loading(frame, app, &palette),
        AppState::Dashboard => dashboard::render(frame, app, &palette),
        AppState::Search => {
            if app.view.is_some() {
                dashboard::render(frame, app, &palette);
            }
            prompts::render_search(frame, app, &palette);
        }
        AppState::EditName => {
            dashboard::render(frame, app, &palette);
            prompts::render_name_prompt(frame, app, &palette);
        }
    }

    if app.show_help {
        help_overlay::render(frame, &palette);
    }
}

/// Renders a loading message while the first load is in flight
fn render_loading(frame: &mut Frame, app: &App, palette: &Palette) {
    let area = frame.area();

    // Center the loading message vertically
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Percentage(45),
        ])
        .split(area);

    let text = app.notice.as_deref().unwrap_or("Loading weather...");
    let loading_text = Paragraph::new(text)
        .style(Style::default().fg(palette.accent))
        .alignment(Alignment::Center);

    frame.render_widget(loading_text, chunks[1]);
}
