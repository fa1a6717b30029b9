use std::io::Stdout;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::config::AppConfig;
use crate::filter::ApplyOutcome;
use crate::modal::ModalId;
use crate::page::Page;
use crate::refresh::{self, RefreshEffect};
use crate::status::{LoadPurpose, StatusLoader};
use crate::ui::{self, HitMap, HitTarget};

pub mod actions;
pub mod state;

pub use actions::{Control, ControlDispatcher, ControlEffect};
pub use state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    StartSearch,
    OpenModal(ModalId),
    ToggleTypeMenu,
    ClearFilter,
    OpenLightbox,
    Reload,
}

/// Mouse press that has not been released yet.
#[derive(Debug, Clone, Copy)]
struct Press {
    column: u16,
    row: u16,
    moved: bool,
}

pub struct App {
    config: AppConfig,
    state: AppState,
    list_state: ListState,
    loader: StatusLoader,
    hits: HitMap,
    press: Option<Press>,
    touch: bool,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: AppConfig, page: &Path) -> Result<Self> {
        let page = Page::load(page).context("loading start page")?;
        let touch = refresh::touch_enabled(config.gestures.touch);
        tracing::info!(touch, path = %page.location.path.display(), "starting browser");
        let state = AppState::new(page, &config, touch);
        let tick_rate = config.ui.tick_rate();
        let mut app = Self {
            config,
            state,
            list_state: ListState::default(),
            loader: StatusLoader::new(),
            hits: HitMap::default(),
            press: None,
            touch,
            should_quit: false,
            tick_rate,
        };
        app.prefetch_status();
        Ok(app)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    self.hits = ui::draw_app(frame, &self.state, &mut self.list_state);
                })
                .context("rendering frame")?;
            self.state.offset = self.list_state.offset();

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick(Instant::now());
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn on_tick(&mut self, now: Instant) {
        if let Some(message) = self.loader.drain() {
            self.state.status.apply(message);
        }
        if let Some(RefreshEffect::Reload) = self.state.poll_pull(now) {
            let path = self.state.location.path.clone();
            tracing::info!(path = %path.display(), "pull-to-refresh reload");
            self.load_page(path);
        }
    }

    fn prefetch_status(&mut self) {
        if self.config.status.prefetch {
            self.request_status(LoadPurpose::Prefetch);
        }
    }

    fn request_status(&mut self, purpose: LoadPurpose) {
        let path = self
            .state
            .location
            .status_path(&self.config.status.file_name);
        self.loader.request(path, purpose);
    }

    /// Replaces the current page; on failure the old page stays up.
    fn load_page(&mut self, path: PathBuf) {
        match Page::load(&path) {
            Ok(page) => {
                let status = std::mem::take(&mut self.state.status);
                self.state = AppState::new(page, &self.config, self.touch);
                self.state.status = status;
                self.list_state = ListState::default();
                self.press = None;
                self.prefetch_status();
            }
            Err(err) => {
                tracing::error!(?err, path = %path.display(), "failed to load page");
                self.state
                    .set_status_message(Some(format!("Could not open {}", path.display())));
            }
        }
    }

    fn activate(&mut self, control: Control) {
        let effect = ControlDispatcher::new(&mut self.state).activate(control);
        match effect {
            ControlEffect::None => {}
            ControlEffect::Filtered(ApplyOutcome::Applied { scroll_to_top, .. }) => {
                if scroll_to_top {
                    *self.list_state.offset_mut() = 0;
                }
                self.state.set_status_message(None::<String>);
            }
            ControlEffect::Filtered(ApplyOutcome::Cleared) => {
                self.state.set_status_message(None::<String>);
            }
            ControlEffect::Navigate(path) => self.load_page(path),
        }
    }

    fn open_modal(&mut self, id: ModalId) {
        if self.state.open_modal(id) {
            self.request_status(LoadPurpose::Full);
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.state.lightbox().is_open() {
            self.handle_lightbox_key(key);
            return;
        }
        if self.state.modals().any_open() {
            self.handle_modal_key(key);
            return;
        }
        if self.state.type_menu().open {
            self.handle_type_menu_key(key);
            return;
        }

        if self.state.is_search_active() {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => {
                    self.state.finish_search();
                    return;
                }
                KeyCode::Backspace => {
                    self.state.pop_search_char();
                    return;
                }
                KeyCode::Char(ch)
                    if !key.modifiers.intersects(
                        KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                    ) =>
                {
                    self.state.push_search_char(ch);
                    return;
                }
                _ => {}
            }
        }

        let plain = !key.modifiers.intersects(
            KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
        );
        let action = match key.code {
            KeyCode::Char('q') if plain => Some(Action::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Char('/') if plain => Some(Action::StartSearch),
            KeyCode::Char('t') if plain => Some(Action::OpenModal(ModalId::Tags)),
            KeyCode::Char('T') => Some(Action::OpenModal(ModalId::Themes)),
            KeyCode::Char('c') if plain => Some(Action::OpenModal(ModalId::Archive)),
            KeyCode::Char('s') if plain => Some(Action::OpenModal(ModalId::ModelStatus)),
            KeyCode::Char('y') if plain => Some(Action::ToggleTypeMenu),
            KeyCode::Char('x') if plain => Some(Action::ClearFilter),
            KeyCode::Char('i') if plain => Some(Action::OpenLightbox),
            KeyCode::Enter => Some(Action::OpenLightbox),
            KeyCode::Char('r') => Some(Action::Reload),
            KeyCode::F(5) => Some(Action::Reload),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::SelectNext => self.state.move_selection(1),
            Action::SelectPrevious => self.state.move_selection(-1),
            Action::StartSearch => self.state.begin_search(),
            Action::OpenModal(id) => self.open_modal(id),
            Action::ToggleTypeMenu => self.state.toggle_type_menu(),
            Action::ClearFilter => self.activate(Control::ClearFilter),
            Action::OpenLightbox => {
                self.state.open_lightbox();
            }
            Action::Reload => {
                let path = self.state.location.path.clone();
                self.load_page(path);
            }
        }
    }

    fn handle_lightbox_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.state.close_lightbox(),
            KeyCode::Left | KeyCode::Char('h') => self.state.navigate_lightbox(-1),
            KeyCode::Right | KeyCode::Char('l') => self.state.navigate_lightbox(1),
            _ => {}
        }
    }

    fn handle_type_menu_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('y') => self.state.close_type_menu(),
            KeyCode::Char('j') | KeyCode::Down => self.state.move_type_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_type_cursor(-1),
            KeyCode::Enter => {
                let choice = self.state.type_cursor_choice();
                self.activate(Control::TypeOption(choice));
            }
            _ => {}
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.state.close_modals();
            return;
        }
        let Some(top) = self.state.modals().topmost() else {
            return;
        };
        match top {
            ModalId::Tags => match key.code {
                KeyCode::Char('j') | KeyCode::Down => self.state.move_tag_cursor(1),
                KeyCode::Char('k') | KeyCode::Up => self.state.move_tag_cursor(-1),
                KeyCode::Enter => {
                    if let Some(tag) = self.state.current_tag().map(str::to_string) {
                        self.activate(Control::Tag(tag));
                    }
                }
                _ => {}
            },
            ModalId::Themes => match key.code {
                KeyCode::Char('j') | KeyCode::Down => self.state.move_theme_cursor(1),
                KeyCode::Char('k') | KeyCode::Up => self.state.move_theme_cursor(-1),
                KeyCode::Enter => {
                    let idx = self.state.theme_cursor();
                    self.activate(Control::Theme(idx));
                }
                _ => {}
            },
            ModalId::Archive => match key.code {
                KeyCode::Left | KeyCode::Char('h') => self.state.calendar.move_cursor(-1),
                KeyCode::Right | KeyCode::Char('l') => self.state.calendar.move_cursor(1),
                KeyCode::Up | KeyCode::Char('k') => self.state.calendar.move_cursor(-7),
                KeyCode::Down | KeyCode::Char('j') => self.state.calendar.move_cursor(7),
                KeyCode::Char('[') => {
                    self.state.calendar.step_month(-1);
                }
                KeyCode::Char(']') => {
                    self.state.calendar.step_month(1);
                }
                KeyCode::Char('m') => self.activate(Control::MonthFilter),
                KeyCode::Char('f') => self.activate(Control::DayFilter),
                KeyCode::Enter => {
                    if let Some(date) = self.state.calendar.cursor_date().map(str::to_string) {
                        self.activate(Control::CalendarDay(date));
                    }
                }
                _ => {}
            },
            ModalId::ModelStatus => {
                if key.code == KeyCode::Char('r') {
                    self.open_modal(ModalId::ModelStatus);
                }
            }
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.state.touch_start(mouse.row);
                self.press = Some(Press {
                    column: mouse.column,
                    row: mouse.row,
                    moved: false,
                });
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                self.state.touch_move(mouse.row);
                if let Some(press) = self.press.as_mut() {
                    if press.column != mouse.column || press.row != mouse.row {
                        press.moved = true;
                    }
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.state.touch_end(Instant::now());
                if let Some(press) = self.press.take() {
                    if !press.moved {
                        self.click(press.column, press.row);
                    }
                }
            }
            MouseEventKind::ScrollDown => self.state.move_selection(1),
            MouseEventKind::ScrollUp => self.state.move_selection(-1),
            _ => {}
        }
    }

    fn click(&mut self, column: u16, row: u16) {
        let target = self.hits.hit(column, row).cloned();
        tracing::trace!(column, row, ?target, "click");

        if self.state.lightbox().is_open() {
            match target {
                Some(HitTarget::LightboxPrev) => self.state.navigate_lightbox(-1),
                Some(HitTarget::LightboxNext) => self.state.navigate_lightbox(1),
                Some(HitTarget::ModalPanel) => {}
                _ => self.state.close_lightbox(),
            }
            return;
        }

        if self.state.type_menu().open
            && !matches!(
                target,
                Some(HitTarget::TypeOption(_)) | Some(HitTarget::TypeTrigger)
            )
        {
            self.state.close_type_menu();
        }

        let Some(target) = target else {
            return;
        };
        match target {
            HitTarget::Backdrop | HitTarget::ModalClose => {
                self.state.close_modals();
            }
            HitTarget::ModalPanel => {}
            HitTarget::Post(position) => self.state.select_visible(position),
            HitTarget::Image { post, src } => {
                self.state.open_lightbox_at(post, &src);
            }
            HitTarget::Tag(name) => self.activate(Control::Tag(name)),
            HitTarget::Theme(idx) => self.activate(Control::Theme(idx)),
            HitTarget::Month(key) => {
                self.state.calendar.render(&key);
            }
            HitTarget::CalendarDay(date) => self.activate(Control::CalendarDay(date)),
            HitTarget::MonthFilter => self.activate(Control::MonthFilter),
            HitTarget::DayFilter => self.activate(Control::DayFilter),
            HitTarget::SearchBox => self.state.begin_search(),
            HitTarget::OpenModal(id) => self.open_modal(id),
            HitTarget::TypeTrigger => self.state.toggle_type_menu(),
            HitTarget::TypeOption(choice) => self.activate(Control::TypeOption(choice)),
            HitTarget::ClearFilter => self.activate(Control::ClearFilter),
            HitTarget::LightboxPrev | HitTarget::LightboxNext | HitTarget::LightboxClose => {}
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("entering alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("creating terminal backend")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("leaving alternate screen")?;
    terminal.show_cursor().context("showing cursor")?;
    Ok(())
}
