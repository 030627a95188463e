//! Application state management for wxdash
//!
//! The app is a synchronous state machine: key presses and incoming load or
//! search messages update state, and anything needing the network is queued
//! as an `AppCommand` for the event loop to run.

use chrono::Locale;
use crossterm::event::{KeyCode, KeyEvent};

use crate::config::Settings;
use crate::data::{NormalizedWeather, Place};
use crate::pipeline::{Freshness, LoadEvent};
use crate::render::{render_dashboard, DashboardView, RenderContext};
use crate::search::SearchMessage;

/// Application state enum representing the current view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    /// Nothing rendered yet
    Loading,
    /// Current conditions and forecast
    Dashboard,
    /// Search box with suggestion list
    Search,
    /// Editing the greeting name
    EditName,
}

/// Side effects requested by the app, run by the event loop
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Load weather for coordinates, with the place they came from if known
    Load {
        lat: f64,
        lon: f64,
        place: Option<Place>,
    },
    /// Schedule a suggestion lookup (short queries clear the list)
    Search(String),
    /// Drop any pending suggestion lookup
    CancelSearch,
    /// Locate by IP and load that place
    Locate,
    /// Persist the current settings
    SaveSettings,
}

/// Main application struct managing state and data
pub struct App {
    /// Current application state/view
    pub state: AppState,
    /// User preferences
    pub settings: Settings,
    /// Locale for weekday and month names
    pub locale: Locale,
    /// Last rendered record and the place it is shown for
    pub current: Option<(NormalizedWeather, Place)>,
    /// Display strings for `current` under the current settings
    pub view: Option<DashboardView>,
    /// Whether `view` came from the cache or a fresh fetch
    pub freshness: Option<Freshness>,
    /// Non-blocking message shown in the status bar
    pub notice: Option<String>,
    /// Text typed into the search box
    pub query: String,
    /// Suggestions for `query`
    pub suggestions: Vec<Place>,
    /// Highlighted suggestion
    pub selected_suggestion: usize,
    /// Text typed into the name prompt
    pub name_input: String,
    /// Flag to show help overlay
    pub show_help: bool,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    commands: Vec<AppCommand>,
}

impl App {
    pub fn new(settings: Settings, locale: Locale) -> Self {
        Self {
            state: AppState::Loading,
            settings,
            locale,
            current: None,
            view: None,
            freshness: None,
            notice: None,
            query: String::new(),
            suggestions: Vec::new(),
            selected_suggestion: 0,
            name_input: String::new(),
            show_help: false,
            should_quit: false,
            commands: Vec::new(),
        }
    }

    pub fn render_context(&self) -> RenderContext {
        RenderContext::new(self.settings.units, self.locale)
    }

    /// Takes the queued commands, leaving the queue empty
    pub fn take_commands(&mut self) -> Vec<AppCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Queues a load for coordinates
    pub fn request_load(&mut self, lat: f64, lon: f64, place: Option<Place>) {
        self.commands.push(AppCommand::Load { lat, lon, place });
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    /// Replaces the whole view with a load result
    pub fn apply_load_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Rendered {
                weather,
                place,
                freshness,
            } => {
                self.current = Some((weather, place));
                self.freshness = Some(freshness);
                if freshness == Freshness::Fresh {
                    self.notice = None;
                }
                self.rerender();
                if self.state == AppState::Loading {
                    self.state = AppState::Dashboard;
                }
            }
            LoadEvent::Failed { notice } => {
                self.notice = Some(notice);
                if self.state == AppState::Loading {
                    self.state = AppState::Dashboard;
                }
            }
        }
    }

    /// Shows suggestions; the caller drops messages from superseded searches
    pub fn apply_search_message(&mut self, message: SearchMessage) {
        match message {
            SearchMessage::Suggestions { query, places, .. } => {
                if query == self.query.trim() {
                    self.suggestions = places;
                    self.selected_suggestion = 0;
                }
            }
            SearchMessage::Cleared { .. } => {
                self.suggestions.clear();
                self.selected_suggestion = 0;
            }
        }
    }

    /// Re-derives display strings from held data; no network access
    fn rerender(&mut self) {
        let ctx = self.render_context();
        self.view = self
            .current
            .as_ref()
            .map(|(weather, place)| render_dashboard(weather, place, &ctx));
    }

    /// Handles keyboard input based on current state
    ///
    /// Key bindings:
    /// - `q`: Quit (outside text entry)
    /// - `/` or `s`: Open search
    /// - `u`: Toggle metric/imperial
    /// - `t`: Toggle light/dark theme
    /// - `l`: Use my location (IP based)
    /// - `r`: Refresh the current place
    /// - `n`: Set the greeting name
    /// - `?`: Help overlay
    /// - In search: type to get suggestions, `Up`/`Down` to pick, `Enter` to load, `Esc` to close
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        // Handle help overlay - intercepts all keys when shown
        if self.show_help {
            match key_event.code {
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => {
                    self.show_help = false;
                }
                _ => {}
            }
            return;
        }

        match self.state {
            AppState::Loading => match key_event.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.should_quit = true;
                }
                KeyCode::Char('/') | KeyCode::Char('s') => {
                    self.open_search();
                }
                KeyCode::Char('?') => {
                    self.show_help = true;
                }
                _ => {}
            },
            AppState::Dashboard => match key_event.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.should_quit = true;
                }
                KeyCode::Char('/') | KeyCode::Char('s') => {
                    self.open_search();
                }
                KeyCode::Char('u') => {
                    self.toggle_units();
                }
                KeyCode::Char('t') => {
                    self.settings.toggle_theme();
                    self.commands.push(AppCommand::SaveSettings);
                }
                KeyCode::Char('l') => {
                    self.notice = Some("Locating...".to_string());
                    self.commands.push(AppCommand::Locate);
                }
                KeyCode::Char('r') => {
                    if let Some((_, place)) = &self.current {
                        let place = place.clone();
                        self.request_load(place.lat, place.lon, Some(place));
                    }
                }
                KeyCode::Char('n') => {
                    self.name_input = self.settings.user_name.clone();
                    self.state = AppState::EditName;
                }
                KeyCode::Char('?') => {
                    self.show_help = true;
                }
                _ => {}
            },
            AppState::Search => match key_event.code {
                KeyCode::Esc => {
                    self.close_search();
                }
                KeyCode::Enter => {
                    if let Some(place) = self.suggestions.get(self.selected_suggestion).cloned() {
                        self.close_search();
                        self.request_load(place.lat, place.lon, Some(place));
                    }
                }
                KeyCode::Up => {
                    self.move_suggestion_up();
                }
                KeyCode::Down => {
                    self.move_suggestion_down();
                }
                KeyCode::Backspace => {
                    self.query.pop();
                    self.commands.push(AppCommand::Search(self.query.clone()));
                }
                KeyCode::Char(c) => {
                    self.query.push(c);
                    self.commands.push(AppCommand::Search(self.query.clone()));
                }
                _ => {}
            },
            AppState::EditName => match key_event.code {
                KeyCode::Esc => {
                    self.state = AppState::Dashboard;
                }
                KeyCode::Enter => {
                    self.settings.user_name = self.name_input.trim().to_string();
                    self.commands.push(AppCommand::SaveSettings);
                    self.state = AppState::Dashboard;
                }
                KeyCode::Backspace => {
                    self.name_input.pop();
                }
                KeyCode::Char(c) => {
                    self.name_input.push(c);
                }
                _ => {}
            },
        }
    }

    /// Switches unit system and re-renders what is already on screen
    pub fn toggle_units(&mut self) {
        self.settings.toggle_units();
        self.rerender();
        self.commands.push(AppCommand::SaveSettings);
    }

    fn open_search(&mut self) {
        self.query.clear();
        self.suggestions.clear();
        self.selected_suggestion = 0;
        self.state = AppState::Search;
    }

    fn close_search(&mut self) {
        self.commands.push(AppCommand::CancelSearch);
        self.suggestions.clear();
        self.selected_suggestion = 0;
        self.state = if self.current.is_some() || self.notice.is_some() {
            AppState::Dashboard
        } else {
            AppState::Loading
        };
    }

    /// Moves the highlight up, wrapping to the bottom
    fn move_suggestion_up(&mut self) {
        let count = self.suggestions.len();
        if count == 0 {
            return;
        }
        self.selected_suggestion = if self.selected_suggestion == 0 {
            count - 1
        } else {
            self.selected_suggestion - 1
        };
    }

    /// Moves the highlight down, wrapping to the top
    fn move_suggestion_down(&mut self) {
        let count = self.suggestions.len();
        if count == 0 {
            return;
        }
        self.selected_suggestion = (self.selected_suggestion + 1) % count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Theme;
    use crate::data::{
        CurrentConditions, Location, Source, Temperature, TimeZoneRef, UnitSystem, Visibility,
        Wind,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    /// Helper to create a KeyEvent for testing
    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_app() -> App {
        App::new(Settings::default(), Locale::en_US)
    }

    fn sample_weather() -> NormalizedWeather {
        NormalizedWeather {
            location: Location {
                zone: TimeZoneRef::Offset(0),
                name: String::new(),
                country: String::new(),
            },
            current: CurrentConditions {
                dt: 1_721_044_800,
                temp: Temperature { c: 23.6, f: 74.5 },
                feels_like: Temperature { c: 23.6, f: 74.5 },
                humidity: 60,
                pressure: 1012,
                visibility: Visibility { km: 10.0, mi: 6.2 },
                wind: Wind { kph: 15.1, mph: 9.4 },
                uvi: 2.0,
                weather: vec![],
            },
            daily: vec![],
            astro: None,
            source: Source::WeatherApi,
        }
    }

    fn rendered(freshness: Freshness) -> LoadEvent {
        LoadEvent::Rendered {
            weather: sample_weather(),
            place: Place::default_place(),
            freshness,
        }
    }

    fn place(name: &str, lat: f64) -> Place {
        Place {
            name: name.to_string(),
            state: String::new(),
            country: String::new(),
            lat,
            lon: 0.0,
        }
    }

    #[test]
    fn test_initial_state_is_loading() {
        let app = test_app();
        assert_eq!(app.state, AppState::Loading);
        assert!(app.view.is_none());
        assert!(!app.should_quit);
    }

    #[test]
    fn test_render_event_moves_to_dashboard() {
        let mut app = test_app();

        app.apply_load_event(rendered(Freshness::Cached));

        assert_eq!(app.state, AppState::Dashboard);
        assert_eq!(app.freshness, Some(Freshness::Cached));
        assert_eq!(app.view.as_ref().unwrap().temperature, "24°");
    }

    #[test]
    fn test_failed_event_sets_notice() {
        let mut app = test_app();

        app.apply_load_event(LoadEvent::Failed {
            notice: "offline".to_string(),
        });

        assert_eq!(app.state, AppState::Dashboard);
        assert_eq!(app.notice.as_deref(), Some("offline"));
        assert!(app.view.is_none());
    }

    #[test]
    fn test_fresh_render_clears_notice() {
        let mut app = test_app();
        app.set_notice("Locating...");

        app.apply_load_event(rendered(Freshness::Fresh));

        assert!(app.notice.is_none());
    }

    #[test]
    fn test_toggle_units_rerenders_without_loading() {
        let mut app = test_app();
        app.apply_load_event(rendered(Freshness::Fresh));
        app.take_commands();

        app.handle_key(key_event(KeyCode::Char('u')));

        assert_eq!(app.settings.units, UnitSystem::Imperial);
        let view = app.view.as_ref().unwrap();
        assert_eq!(view.temperature, "75°");
        assert_eq!(view.wind, "9 mph");
        assert_eq!(view.visibility, "6.2 mi");
        let commands = app.take_commands();
        assert_eq!(commands, vec![AppCommand::SaveSettings]);
    }

    #[test]
    fn test_theme_toggle_saves() {
        let mut app = test_app();
        app.state = AppState::Dashboard;

        app.handle_key(key_event(KeyCode::Char('t')));

        assert_eq!(app.settings.theme, Theme::Dark);
        assert_eq!(app.take_commands(), vec![AppCommand::SaveSettings]);
    }

    #[test]
    fn test_refresh_reloads_current_place() {
        let mut app = test_app();
        app.apply_load_event(rendered(Freshness::Fresh));

        app.handle_key(key_event(KeyCode::Char('r')));

        let expected = Place::default_place();
        assert_eq!(
            app.take_commands(),
            vec![AppCommand::Load {
                lat: expected.lat,
                lon: expected.lon,
                place: Some(expected)
            }]
        );
    }

    #[test]
    fn test_locate_key_queues_locate() {
        let mut app = test_app();
        app.state = AppState::Dashboard;

        app.handle_key(key_event(KeyCode::Char('l')));

        assert_eq!(app.take_commands(), vec![AppCommand::Locate]);
        assert!(app.notice.is_some());
    }

    #[test]
    fn test_typing_in_search_dispatches_each_keystroke() {
        let mut app = test_app();
        app.state = AppState::Dashboard;
        app.handle_key(key_event(KeyCode::Char('/')));
        assert_eq!(app.state, AppState::Search);

        app.handle_key(key_event(KeyCode::Char('P')));
        app.handle_key(key_event(KeyCode::Char('a')));
        app.handle_key(key_event(KeyCode::Backspace));

        assert_eq!(
            app.take_commands(),
            vec![
                AppCommand::Search("P".to_string()),
                AppCommand::Search("Pa".to_string()),
                AppCommand::Search("P".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_keys_are_text_not_shortcuts() {
        let mut app = test_app();
        app.state = AppState::Search;

        app.handle_key(key_event(KeyCode::Char('q')));

        assert!(!app.should_quit);
        assert_eq!(app.query, "q");
    }

    #[test]
    fn test_selecting_suggestion_loads_it() {
        let mut app = test_app();
        app.state = AppState::Search;
        app.query = "Lon".to_string();
        app.apply_search_message(SearchMessage::Suggestions {
            generation: 1,
            query: "Lon".to_string(),
            places: vec![place("London", 51.5), place("Londrina", -23.3)],
        });

        app.handle_key(key_event(KeyCode::Down));
        app.handle_key(key_event(KeyCode::Enter));

        let commands = app.take_commands();
        assert_eq!(commands[0], AppCommand::CancelSearch);
        assert_eq!(
            commands[1],
            AppCommand::Load {
                lat: -23.3,
                lon: 0.0,
                place: Some(place("Londrina", -23.3))
            }
        );
        assert_eq!(app.state, AppState::Loading);
    }

    #[test]
    fn test_suggestions_for_old_query_are_ignored() {
        let mut app = test_app();
        app.query = "Lond".to_string();

        app.apply_search_message(SearchMessage::Suggestions {
            generation: 1,
            query: "Lo".to_string(),
            places: vec![place("Lome", 6.1)],
        });

        assert!(app.suggestions.is_empty());
    }

    #[test]
    fn test_cleared_message_empties_suggestions() {
        let mut app = test_app();
        app.suggestions = vec![place("London", 51.5)];
        app.selected_suggestion = 0;

        app.apply_search_message(SearchMessage::Cleared { generation: 3 });

        assert!(app.suggestions.is_empty());
    }

    #[test]
    fn test_suggestion_navigation_wraps() {
        let mut app = test_app();
        app.state = AppState::Search;
        app.suggestions = vec![place("A", 1.0), place("B", 2.0)];

        app.handle_key(key_event(KeyCode::Up));
        assert_eq!(app.selected_suggestion, 1);
        app.handle_key(key_event(KeyCode::Down));
        assert_eq!(app.selected_suggestion, 0);
    }

    #[test]
    fn test_esc_closes_search_back_to_dashboard() {
        let mut app = test_app();
        app.apply_load_event(rendered(Freshness::Fresh));
        app.handle_key(key_event(KeyCode::Char('s')));

        app.handle_key(key_event(KeyCode::Esc));

        assert_eq!(app.state, AppState::Dashboard);
        assert_eq!(app.take_commands(), vec![AppCommand::CancelSearch]);
    }

    #[test]
    fn test_edit_name_saves_trimmed() {
        let mut app = test_app();
        app.state = AppState::Dashboard;
        app.handle_key(key_event(KeyCode::Char('n')));
        assert_eq!(app.state, AppState::EditName);

        for c in " Asha ".chars() {
            app.handle_key(key_event(KeyCode::Char(c)));
        }
        app.handle_key(key_event(KeyCode::Enter));

        assert_eq!(app.settings.user_name, "Asha");
        assert_eq!(app.state, AppState::Dashboard);
        assert_eq!(app.take_commands(), vec![AppCommand::SaveSettings]);
    }

    #[test]
    fn test_edit_name_esc_discards() {
        let mut app = test_app();
        app.state = AppState::EditName;
        app.handle_key(key_event(KeyCode::Char('x')));

        app.handle_key(key_event(KeyCode::Esc));

        assert_eq!(app.settings.user_name, "");
        assert!(app.take_commands().is_empty());
    }

    #[test]
    fn test_help_overlay_intercepts_keys() {
        let mut app = test_app();
        app.state = AppState::Dashboard;
        app.handle_key(key_event(KeyCode::Char('?')));
        assert!(app.show_help);

        app.handle_key(key_event(KeyCode::Char('u')));
        assert_eq!(app.settings.units, UnitSystem::Metric);

        app.handle_key(key_event(KeyCode::Esc));
        assert!(!app.show_help);
    }

    #[test]
    fn test_q_quits_from_dashboard_and_loading() {
        let mut app = test_app();
        app.handle_key(key_event(KeyCode::Char('q')));
        assert!(app.should_quit);

        let mut app = test_app();
        app.state = AppState::Dashboard;
        app.handle_key(key_event(KeyCode::Char('q')));
        assert!(app.should_quit);
    }
}
