use std::{cmp, fs, io, thread, time::Duration};

use anyhow::{Context, Result};
use chipcheck_core::{
    config::AppConfig,
    stats::SessionDuration,
    summary::{format_amount, format_signed, SessionSummary},
    validate, Amount, FileStore, Persisted, PlayerName, SessionConfig, SessionController,
    ValidationError,
};
use chrono::{Local, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
        Wrap,
    },
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_INPUT_LEN: usize = 48;
const EXPORT_DIR: &str = "exports";
const SETUP_LABEL_WIDTH: usize = 18;
const CHART_LABEL_WIDTH: usize = 12;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    accent_alt: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            accent_alt: Color::Magenta,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

impl Theme {
    fn net_color(&self, net: Amount) -> Color {
        if net > 0.0 {
            self.success
        } else if net < 0.0 {
            self.danger
        } else {
            self.primary_fg
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Setup,
    Game,
    Summary,
    History,
    Registry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetupField {
    Name,
    Location,
    BuyIn,
    Denominations,
    RunningBalance,
}

impl SetupField {
    const ALL: [SetupField; 5] = [
        SetupField::Name,
        SetupField::Location,
        SetupField::BuyIn,
        SetupField::Denominations,
        SetupField::RunningBalance,
    ];

    fn label(self) -> &'static str {
        match self {
            SetupField::Name => "Session name",
            SetupField::Location => "Location",
            SetupField::BuyIn => "Default buy-in",
            SetupField::Denominations => "Chips",
            SetupField::RunningBalance => "Running balance",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    fn step(self, delta: isize) -> Self {
        let len = Self::ALL.len() as isize;
        let next = (self.index() as isize + delta).rem_euclid(len);
        Self::ALL[next as usize]
    }
}

/// Single-line editor; the cursor counts characters, not bytes.
#[derive(Debug, Clone, Default)]
struct TextField {
    input: String,
    cursor: usize,
}

impl TextField {
    fn with_value(value: impl Into<String>) -> Self {
        let input = value.into();
        let cursor = input.chars().count();
        Self { input, cursor }
    }

    fn len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.input.len())
    }

    fn move_cursor(&mut self, delta: isize) {
        let next = (self.cursor as isize + delta).clamp(0, self.len() as isize);
        self.cursor = next as usize;
    }

    fn insert(&mut self, ch: char) {
        if self.len() >= MAX_INPUT_LEN || ch.is_control() {
            return;
        }
        let idx = self.byte_index();
        self.input.insert(idx, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let idx = self.byte_index();
        self.input.remove(idx);
    }

    fn delete(&mut self) {
        if self.cursor < self.len() {
            let idx = self.byte_index();
            self.input.remove(idx);
        }
    }

    fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    fn value(&self) -> &str {
        self.input.trim()
    }

    /// Apply an editing key; returns false when the key is not an edit.
    fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_cursor(-1),
            KeyCode::Right => self.move_cursor(1),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.len(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.insert(ch)
            }
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone)]
struct SetupForm {
    name: TextField,
    location: TextField,
    buy_in: TextField,
    denominations: TextField,
    running_balance: bool,
    focus: SetupField,
}

impl SetupForm {
    fn new(config: &AppConfig) -> Self {
        Self {
            name: TextField::default(),
            location: TextField::default(),
            buy_in: TextField::with_value(config.default_buy_in.to_string()),
            denominations: TextField::with_value(config.chip_denominations.join(", ")),
            running_balance: false,
            focus: SetupField::Name,
        }
    }

    fn field(&self, field: SetupField) -> Option<&TextField> {
        match field {
            SetupField::Name => Some(&self.name),
            SetupField::Location => Some(&self.location),
            SetupField::BuyIn => Some(&self.buy_in),
            SetupField::Denominations => Some(&self.denominations),
            SetupField::RunningBalance => None,
        }
    }

    fn field_mut(&mut self, field: SetupField) -> Option<&mut TextField> {
        match field {
            SetupField::Name => Some(&mut self.name),
            SetupField::Location => Some(&mut self.location),
            SetupField::BuyIn => Some(&mut self.buy_in),
            SetupField::Denominations => Some(&mut self.denominations),
            SetupField::RunningBalance => None,
        }
    }

    fn to_config(&self) -> Result<SessionConfig, ValidationError> {
        let default_buy_in = validate::parse_amount(self.buy_in.value())?;
        Ok(SessionConfig {
            name: self.name.value().to_string(),
            location: self.location.value().to_string(),
            default_buy_in,
            denominations: split_denominations(self.denominations.value()),
            running_balance: self.running_balance,
            started_at: None,
        })
    }

    /// Fill every field except the session name from `config`.
    fn apply(&mut self, config: &SessionConfig) {
        self.location = TextField::with_value(config.location.clone());
        self.buy_in = TextField::with_value(config.default_buy_in.to_string());
        self.denominations = TextField::with_value(config.denominations.join(", "));
        self.running_balance = config.running_balance;
    }
}

#[derive(Debug, Clone)]
enum PromptKind {
    AddPlayer,
    BuyIn(PlayerName),
    CashOut(PlayerName),
    Leave(PlayerName),
    SaveTemplate,
}

impl PromptKind {
    fn title(&self) -> String {
        match self {
            PromptKind::AddPlayer => "Add Player".to_string(),
            PromptKind::BuyIn(name) => format!("Buy-in · {name}"),
            PromptKind::CashOut(name) => format!("Cash-out · {name}"),
            PromptKind::Leave(name) => format!("Leave · {name}"),
            PromptKind::SaveTemplate => "Save Template".to_string(),
        }
    }

    fn instruction(&self, default_buy_in: &str) -> String {
        match self {
            PromptKind::AddPlayer => {
                format!("Name, optionally followed by an amount (default {default_buy_in})")
            }
            PromptKind::BuyIn(_) => "Buy-in amount".to_string(),
            PromptKind::CashOut(_) => "Chips counted at the end".to_string(),
            PromptKind::Leave(_) => "Chips taken when leaving".to_string(),
            PromptKind::SaveTemplate => "Template name for the current setup".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Prompt {
    kind: PromptKind,
    field: TextField,
}

impl Prompt {
    fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            field: TextField::default(),
        }
    }

    fn prefilled(kind: PromptKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            field: TextField::with_value(value),
        }
    }
}

#[derive(Debug, Clone)]
enum Confirm {
    EndSession,
    AbandonSession,
    ClearHistory,
    DeleteTemplate(String),
}

impl Confirm {
    fn question(&self) -> String {
        match self {
            Confirm::EndSession => "End the session and settle up?".to_string(),
            Confirm::AbandonSession => "Discard the session without archiving it?".to_string(),
            Confirm::ClearHistory => "Delete every archived session?".to_string(),
            Confirm::DeleteTemplate(name) => format!("Delete template \"{name}\"?"),
        }
    }
}

struct SummaryView {
    title: String,
    summary: SessionSummary,
    from_history: bool,
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// Terminal front-end driving a [`SessionController`].
pub struct ChipCheckApp {
    controller: SessionController<FileStore>,
    config: AppConfig,
    state: UiState,
    screen: Screen,
    setup: SetupForm,
    prompt: Option<Prompt>,
    confirm: Option<Confirm>,
    summary: Option<SummaryView>,
    theme: Theme,
}

impl ChipCheckApp {
    pub fn new(controller: SessionController<FileStore>, config: AppConfig) -> Self {
        let setup = SetupForm::new(&config);
        Self {
            controller,
            config,
            state: UiState::default(),
            screen: Screen::Setup,
            setup,
            prompt: None,
            confirm: None,
            summary: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.screen = self.home_screen();
        let status = match self.controller.active() {
            Some(active) => format!(
                "Resumed {} with {} players",
                session_label(&active.config),
                active.ledger.len()
            ),
            None => format!(
                "{} archived sessions • {} known players",
                self.controller.archive().len(),
                self.controller.registry().len()
            ),
        };
        self.state.set_status(status);

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        info!("ChipCheck closed");
        Ok(())
    }

    fn home_screen(&self) -> Screen {
        if self.controller.active().is_some() {
            Screen::Game
        } else {
            Screen::Setup
        }
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                if key.kind != KeyEventKind::Press {
                    return true;
                }
                let result = if self.confirm.is_some() {
                    self.handle_confirm_key(key)
                } else if self.prompt.is_some() {
                    self.handle_prompt_key(key)
                } else {
                    self.handle_key(key)
                };
                if let Err(err) = result {
                    error!(?err, "Action failed");
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Input(_)) | Some(AppEvent::Tick) => true,
            None => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return Ok(());
        }
        match self.screen {
            Screen::Setup => self.handle_setup_key(key),
            Screen::Game => self.handle_game_key(key),
            Screen::Summary => self.handle_summary_key(key),
            Screen::History => self.handle_history_key(key),
            Screen::Registry => self.handle_registry_key(key),
        }
    }

    fn handle_setup_key(&mut self, key: KeyEvent) -> Result<()> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.state.should_quit = true,
            KeyCode::Enter => self.start_session()?,
            KeyCode::Tab | KeyCode::Down => self.setup.focus = self.setup.focus.step(1),
            KeyCode::BackTab | KeyCode::Up => self.setup.focus = self.setup.focus.step(-1),
            KeyCode::F(2) => self.open_history(),
            KeyCode::F(3) => self.open_registry(),
            KeyCode::PageDown | KeyCode::PageUp => {
                let delta = if key.code == KeyCode::PageDown { 1 } else { -1 };
                let total = self.template_count();
                self.state.move_template_cursor(delta, total);
            }
            KeyCode::Char('s') if ctrl => {
                self.prompt = Some(Prompt::prefilled(
                    PromptKind::SaveTemplate,
                    self.setup.location.value().to_string(),
                ));
            }
            KeyCode::Char('l') if ctrl => self.apply_selected_template(),
            KeyCode::Char('d') if ctrl => {
                if let Some(name) = self.selected_template() {
                    self.confirm = Some(Confirm::DeleteTemplate(name));
                }
            }
            KeyCode::Char(' ') if self.setup.focus == SetupField::RunningBalance => {
                self.setup.running_balance = !self.setup.running_balance;
            }
            _ => {
                let focus = self.setup.focus;
                if let Some(field) = self.setup.field_mut(focus) {
                    field.handle_key(&key);
                }
            }
        }
        Ok(())
    }

    fn handle_game_key(&mut self, key: KeyEvent) -> Result<()> {
        let roster_len = self.roster_len();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.state.should_quit = true;
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.move_roster_cursor(1, roster_len),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_roster_cursor(-1, roster_len),
            KeyCode::Char('a') => self.prompt = Some(Prompt::new(PromptKind::AddPlayer)),
            KeyCode::Char('t') => {
                if let Some(name) = self.selected_player() {
                    let outcome = self.controller.add_buy_in(name.as_str(), None)?;
                    let message = format!(
                        "{} topped up {}",
                        outcome.value,
                        self.money(self.default_buy_in())
                    );
                    self.report(outcome, message);
                }
            }
            KeyCode::Char('b') => {
                if let Some(name) = self.selected_player() {
                    let default = self.default_buy_in().to_string();
                    self.prompt = Some(Prompt::prefilled(PromptKind::BuyIn(name), default));
                }
            }
            KeyCode::Char('c') | KeyCode::Enter => {
                if let Some(name) = self.selected_player() {
                    let current = self.current_cash_out(&name);
                    self.prompt = Some(Prompt::prefilled(PromptKind::CashOut(name), current));
                }
            }
            KeyCode::Char('l') => {
                if let Some(name) = self.selected_player() {
                    let current = self.current_cash_out(&name);
                    self.prompt = Some(Prompt::prefilled(PromptKind::Leave(name), current));
                }
            }
            KeyCode::Char('e') => self.confirm = Some(Confirm::EndSession),
            KeyCode::Char('x') => self.confirm = Some(Confirm::AbandonSession),
            KeyCode::Char('h') | KeyCode::F(2) => self.open_history(),
            KeyCode::Char('r') | KeyCode::F(3) => self.open_registry(),
            _ => {}
        }
        Ok(())
    }

    fn handle_summary_key(&mut self, key: KeyEvent) -> Result<()> {
        let from_history = self
            .summary
            .as_ref()
            .map(|view| view.from_history)
            .unwrap_or(false);
        match key.code {
            KeyCode::Char('q') => self.state.should_quit = true,
            KeyCode::Char('s') => self.export_summary()?,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('n') => {
                self.summary = None;
                if from_history {
                    self.screen = Screen::History;
                } else {
                    self.screen = self.home_screen();
                    self.state.set_status("Ready for the next session".to_string());
                }
            }
            KeyCode::Char('h') | KeyCode::F(2) => self.open_history(),
            _ => {}
        }
        Ok(())
    }

    fn handle_history_key(&mut self, key: KeyEvent) -> Result<()> {
        let total = self.controller.archive().len();
        match key.code {
            KeyCode::Char('q') => self.state.should_quit = true,
            KeyCode::Esc => self.screen = self.home_screen(),
            KeyCode::Char('j') | KeyCode::Down => self.state.move_history_cursor(1, total),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_history_cursor(-1, total),
            KeyCode::Enter => self.open_history_entry(),
            KeyCode::Char('c') if total > 0 => self.confirm = Some(Confirm::ClearHistory),
            KeyCode::Char('r') | KeyCode::F(3) => self.open_registry(),
            _ => {}
        }
        Ok(())
    }

    fn handle_registry_key(&mut self, key: KeyEvent) -> Result<()> {
        let total = self.controller.registry().len();
        match key.code {
            KeyCode::Char('q') => self.state.should_quit = true,
            KeyCode::Esc => self.screen = self.home_screen(),
            KeyCode::Char('j') | KeyCode::Down => self.state.move_registry_cursor(1, total),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_registry_cursor(-1, total),
            KeyCode::Char('h') | KeyCode::F(2) => self.open_history(),
            _ => {}
        }
        Ok(())
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(mut prompt) = self.prompt.take() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => {
                self.state.set_status("Cancelled".to_string());
            }
            KeyCode::Enter => {
                if let Err(err) = self.submit_prompt(&prompt) {
                    // Keep the prompt open so the value can be corrected.
                    self.prompt = Some(prompt);
                    return Err(err);
                }
            }
            _ => {
                if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('u') {
                    prompt.field.clear();
                } else {
                    prompt.field.handle_key(&key);
                }
                self.prompt = Some(prompt);
            }
        }
        Ok(())
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(confirm) = self.confirm.take() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => match confirm {
                Confirm::EndSession => self.end_session()?,
                Confirm::AbandonSession => {
                    let outcome = self.controller.reset();
                    self.report(outcome, "Session discarded".to_string());
                    self.screen = Screen::Setup;
                }
                Confirm::ClearHistory => {
                    let outcome = self.controller.clear_history();
                    self.report(outcome, "History cleared".to_string());
                    self.state.history_cursor = 0;
                }
                Confirm::DeleteTemplate(name) => {
                    let outcome = self.controller.delete_template(&name);
                    let message = format!("Template \"{name}\" deleted");
                    self.report(outcome, message);
                    let total = self.template_count();
                    self.state.move_template_cursor(0, total);
                }
            },
            _ => self.state.set_status("Cancelled".to_string()),
        }
        Ok(())
    }

    fn submit_prompt(&mut self, prompt: &Prompt) -> Result<()> {
        let input = prompt.field.value();
        match &prompt.kind {
            PromptKind::AddPlayer => {
                let (name, amount) = split_player_entry(input);
                let amount = amount.transpose()?;
                let outcome = self.controller.add_buy_in(name, amount)?;
                let message = format!(
                    "Buy-in recorded for {} ({})",
                    outcome.value,
                    self.money(amount.unwrap_or(self.default_buy_in()))
                );
                let name = self.report(outcome, message);
                self.select_player(&name);
            }
            PromptKind::BuyIn(name) => {
                let amount = validate::parse_amount(input)?;
                let outcome = self.controller.add_buy_in(name.as_str(), Some(amount))?;
                let message = format!("{name} bought in for {}", self.money(amount));
                self.report(outcome, message);
            }
            PromptKind::CashOut(name) => {
                let amount = validate::parse_amount(input)?;
                let outcome = self.controller.set_cash_out(name.as_str(), amount)?;
                let message = format!("{name} cashed out {}", self.money(amount));
                self.report(outcome, message);
            }
            PromptKind::Leave(name) => {
                let amount = validate::parse_amount(input)?;
                let outcome = self.controller.mark_left(name.as_str(), amount)?;
                let message = format!("{name} left with {}", self.money(amount));
                self.report(outcome, message);
                let total = self.roster_len();
                self.state.move_roster_cursor(0, total);
            }
            PromptKind::SaveTemplate => {
                let template = self.setup.to_config()?.to_template();
                let outcome = self.controller.save_template(input, template)?;
                let message = format!("Template \"{input}\" saved");
                self.report(outcome, message);
            }
        }
        Ok(())
    }

    fn start_session(&mut self) -> Result<()> {
        let config = self.setup.to_config()?;
        let label = session_label(&config);
        let outcome = self.controller.start_session(config)?;
        let message = format!("{label} started • press a to add players");
        self.report(outcome, message);
        self.state.roster_cursor = 0;
        self.setup.name.clear();
        self.screen = Screen::Game;
        Ok(())
    }

    fn end_session(&mut self) -> Result<()> {
        let title = self
            .controller
            .active()
            .map(|active| session_label(&active.config))
            .unwrap_or_else(|| "Session".to_string());
        let outcome = self.controller.end_session()?;
        let message = if outcome.value.is_unbalanced() {
            format!(
                "Session archived • nets are off by {}, check the cash-outs",
                self.money(outcome.value.imbalance)
            )
        } else {
            "Session archived • press s to export the results".to_string()
        };
        let summary = self.report(outcome, message);
        self.summary = Some(SummaryView {
            title,
            summary,
            from_history: false,
        });
        self.state.history_cursor = 0;
        self.screen = Screen::Summary;
        Ok(())
    }

    fn export_summary(&mut self) -> Result<()> {
        let Some(view) = self.summary.as_ref() else {
            return Ok(());
        };
        let dir = self.config.data_dir.join(EXPORT_DIR);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(format!(
            "chipcheck-{}.txt",
            Local::now().format("%Y%m%d-%H%M%S")
        ));
        let text = view.summary.share_text(self.controller.currency());
        fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "Results exported");
        self.state
            .set_status(format!("Results exported to {}", path.display()));
        Ok(())
    }

    fn open_history(&mut self) {
        let total = self.controller.archive().len();
        self.state.move_history_cursor(0, total);
        self.screen = Screen::History;
        if total == 0 {
            self.state.set_status("No sessions archived yet".to_string());
        }
    }

    fn open_history_entry(&mut self) {
        let index = self.state.history_cursor;
        let Some(record) = self.controller.archive().get(index) else {
            return;
        };
        let title = record.title();
        if let Some(summary) = self.controller.view_history(index) {
            debug!(index, title = %title, "Opening archived session");
            self.summary = Some(SummaryView {
                title,
                summary,
                from_history: true,
            });
            self.screen = Screen::Summary;
        }
    }

    fn open_registry(&mut self) {
        let total = self.controller.registry().len();
        self.state.move_registry_cursor(0, total);
        self.screen = Screen::Registry;
    }

    fn apply_selected_template(&mut self) {
        let Some(name) = self.selected_template() else {
            self.state.set_status("No templates saved".to_string());
            return;
        };
        if let Some(config) = self.controller.apply_template(&name) {
            self.setup.apply(&config);
            self.state.set_status(format!("Template \"{name}\" loaded"));
        }
    }

    fn report<T>(&mut self, outcome: Persisted<T>, message: String) -> T {
        match outcome.failures.first() {
            None => self.state.set_status(message),
            Some(err) => self
                .state
                .set_status(format!("{message} • NOT SAVED: {err}")),
        }
        outcome.into_value()
    }

    fn money(&self, value: Amount) -> String {
        format_amount(value, self.controller.currency())
    }

    fn default_buy_in(&self) -> Amount {
        self.controller
            .active()
            .map(|active| active.config.default_buy_in)
            .unwrap_or(self.config.default_buy_in)
    }

    fn roster_len(&self) -> usize {
        self.controller
            .ledger()
            .map(|ledger| ledger.active_count())
            .unwrap_or(0)
    }

    fn selected_player(&self) -> Option<PlayerName> {
        let ledger = self.controller.ledger()?;
        ledger
            .active_roster()
            .get(self.state.roster_cursor)
            .map(|participant| participant.name.clone())
    }

    fn select_player(&mut self, name: &PlayerName) {
        if let Some(ledger) = self.controller.ledger() {
            if let Some(index) = ledger.active_roster().iter().position(|p| &p.name == name) {
                self.state.roster_cursor = index;
            }
        }
    }

    fn current_cash_out(&self, name: &PlayerName) -> String {
        self.controller
            .ledger()
            .and_then(|ledger| ledger.get(name.as_str()))
            .filter(|participant| participant.cash_out > 0.0)
            .map(|participant| participant.cash_out.to_string())
            .unwrap_or_default()
    }

    fn template_count(&self) -> usize {
        self.controller.templates().len()
    }

    fn selected_template(&self) -> Option<String> {
        self.controller
            .templates()
            .names()
            .get(self.state.template_cursor)
            .map(|name| name.to_string())
    }

    fn draw(&mut self, frame: &mut Frame) {
        match self.screen {
            Screen::Setup => self.draw_setup(frame),
            Screen::Game => self.draw_game(frame),
            Screen::Summary => self.draw_summary(frame),
            Screen::History => self.draw_history(frame),
            Screen::Registry => self.draw_registry(frame),
        }
        if let Some(prompt) = &self.prompt {
            self.render_prompt(frame, prompt);
        }
        if let Some(confirm) = &self.confirm {
            self.render_confirm(frame, confirm);
        }
    }

    /// Header, body and status areas shared by every screen.
    fn screen_layout(area: Rect) -> (Rect, Rect, Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(4),
            ])
            .split(area);
        (chunks[0], chunks[1], chunks[2])
    }

    fn draw_setup(&mut self, frame: &mut Frame) {
        let (header, body, status) = Self::screen_layout(frame.size());
        self.render_header(frame, header, "New session");

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(body);
        self.render_setup_form(frame, columns[0]);
        self.render_templates(frame, columns[1]);
        self.render_status(
            frame,
            status,
            "Enter start  Tab next field  Space toggle  ^S save template  PgUp/PgDn pick  ^L load  ^D delete  F2 history  F3 players  Esc quit",
        );
    }

    fn render_setup_form(&self, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        for field in SetupField::ALL {
            let focused = self.setup.focus == field;
            let marker = if focused { "▶ " } else { "  " };
            let label_style = if focused {
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.muted)
            };
            let value = match self.setup.field(field) {
                Some(text) => Span::styled(
                    text.input.clone(),
                    Style::default().fg(self.theme.primary_fg),
                ),
                None => {
                    let checkbox = if self.setup.running_balance {
                        "[x] settle against every archived session"
                    } else {
                        "[ ] settle this session only"
                    };
                    Span::styled(checkbox, Style::default().fg(self.theme.primary_fg))
                }
            };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{marker}{:<width$}", field.label(), width = SETUP_LABEL_WIDTH - 2),
                    label_style,
                ),
                value,
            ]));
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            format!(
                "Currency {}  •  chips are comma separated",
                self.controller.currency()
            ),
            Style::default().fg(self.theme.muted),
        )));

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Session Setup"),
        );
        frame.render_widget(paragraph, area);

        if self.prompt.is_none() && self.confirm.is_none() {
            if let Some(text) = self.setup.field(self.setup.focus) {
                let row = self.setup.focus.index() as u16 * 2;
                let cursor_x = (area.x + 1 + SETUP_LABEL_WIDTH as u16 + text.cursor as u16)
                    .min(area.x + area.width.saturating_sub(2));
                let cursor_y = (area.y + 1 + row).min(area.y + area.height.saturating_sub(2));
                frame.set_cursor(cursor_x, cursor_y);
            }
        }
    }

    fn render_templates(&self, frame: &mut Frame, area: Rect) {
        let templates = self.controller.templates();
        let names = templates.names();
        let items: Vec<ListItem> = names
            .iter()
            .filter_map(|name| templates.get(name).map(|template| (name, template)))
            .map(|(name, template)| {
                let mut details = vec![self.money(template.buy_in)];
                if !template.location.is_empty() && template.location != "-" {
                    details.push(template.location.clone());
                }
                if template.running_balance {
                    details.push("running".to_string());
                }
                ListItem::new(vec![
                    Line::from(Span::styled(
                        name.to_string(),
                        Style::default()
                            .fg(self.theme.primary_fg)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        format!("  {}", details.join(" · ")),
                        Style::default().fg(self.theme.muted),
                    )),
                ])
            })
            .collect();

        let mut list_state = ListState::default();
        if !items.is_empty() {
            list_state.select(Some(self.state.template_cursor.min(items.len() - 1)));
        }
        let title = if items.is_empty() {
            "Templates (none)"
        } else {
            "Templates"
        };
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn draw_game(&mut self, frame: &mut Frame) {
        let (header, body, status) = Self::screen_layout(frame.size());
        let subtitle = self
            .controller
            .active()
            .map(|active| session_label(&active.config))
            .unwrap_or_else(|| "No session".to_string());
        self.render_header(frame, header, &subtitle);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(body);
        self.render_roster(frame, columns[0]);
        self.render_session_info(frame, columns[1]);
        self.render_status(
            frame,
            status,
            "a add  t top-up  b buy-in  c cash-out  l leave  e end  x discard  h history  r players  q quit",
        );
    }

    fn render_roster(&mut self, frame: &mut Frame, area: Rect) {
        let Some(ledger) = self.controller.ledger() else {
            return;
        };
        let roster = ledger.active_roster();
        let total = roster.len();
        self.state.move_roster_cursor(0, total);

        let rows: Vec<Row> = roster
            .iter()
            .map(|participant| {
                let net = participant.net();
                Row::new(vec![
                    Cell::from(Span::styled(
                        participant.name.to_string(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Cell::from(self.money(participant.buy_in)),
                    Cell::from(format!("x{}", participant.buy_in_count)),
                    Cell::from(self.money(participant.cash_out)),
                    Cell::from(Span::styled(
                        format_signed(net, self.controller.currency()),
                        Style::default().fg(self.theme.net_color(net)),
                    )),
                ])
            })
            .collect();

        let header = Row::new(vec!["Player", "Buy-in", "#", "Cash-out", "Net"]).style(
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        );
        let widths = [
            Constraint::Min(12),
            Constraint::Length(10),
            Constraint::Length(4),
            Constraint::Length(10),
            Constraint::Length(10),
        ];
        let title = format!("At the table ({total})");
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");

        let mut table_state = TableState::default();
        if total > 0 {
            table_state.select(Some(self.state.roster_cursor));
        }
        frame.render_stateful_widget(table, area, &mut table_state);
    }

    fn render_session_info(&self, frame: &mut Frame, area: Rect) {
        let Some(active) = self.controller.active() else {
            return;
        };
        let config = &active.config;
        let ledger = &active.ledger;
        let muted = Style::default().fg(self.theme.muted);
        let cashed: Amount = ledger.participants().iter().map(|p| p.cash_out).sum();
        let unaccounted = ledger.total_buy_in() - cashed;

        let elapsed = config
            .started_at
            .map(|start| SessionDuration::between(start, Utc::now()).to_string())
            .unwrap_or_else(|| "-".to_string());
        let started = config
            .started_at
            .map(|start| start.with_timezone(&Local).format("%H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let chips = if config.denominations.is_empty() {
            "-".to_string()
        } else {
            config.denominations.join(" / ")
        };
        let mode = if config.running_balance {
            "running balance"
        } else {
            "this session"
        };

        let mut lines = vec![
            info_line("Location", config.location.clone(), muted),
            info_line("Started", format!("{started} ({elapsed})"), muted),
            info_line("Buy-in", self.money(config.default_buy_in), muted),
            info_line("Chips", chips, muted),
            info_line("Settle", mode.to_string(), muted),
            Line::from(""),
            Line::from(vec![
                Span::styled(format!("{:<10}", "Pot"), muted),
                Span::styled(
                    self.money(ledger.total_buy_in()),
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            info_line(
                "Players",
                format!("{} playing / {} total", ledger.active_count(), ledger.len()),
                muted,
            ),
            Line::from(vec![
                Span::styled(format!("{:<10}", "Unpaid"), muted),
                Span::styled(
                    self.money(unaccounted),
                    Style::default().fg(if unaccounted.abs() < 0.5 {
                        self.theme.success
                    } else {
                        self.theme.warning
                    }),
                ),
            ]),
        ];

        let left: Vec<_> = ledger.participants().iter().filter(|p| p.is_left).collect();
        if !left.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Left the table",
                Style::default()
                    .fg(self.theme.accent_alt)
                    .add_modifier(Modifier::BOLD),
            )));
            for participant in left {
                let net = participant.net();
                lines.push(Line::from(vec![
                    Span::raw(format!("{:<12}", participant.name.as_str())),
                    Span::styled(
                        format_signed(net, self.controller.currency()),
                        Style::default().fg(self.theme.net_color(net)),
                    ),
                ]));
            }
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Session"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_summary(&mut self, frame: &mut Frame) {
        let (header, body, status) = Self::screen_layout(frame.size());
        let Some(view) = self.summary.as_ref() else {
            self.render_header(frame, header, "Results");
            self.render_status(frame, status, "Esc back");
            return;
        };
        self.render_header(frame, header, &view.title);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(6)])
            .split(body);
        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30),
                Constraint::Percentage(30),
                Constraint::Percentage(40),
            ])
            .split(rows[0]);
        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(rows[1]);

        let currency = self.controller.currency();
        let (shark_name, shark_amount) = view.summary.shark_label(currency);
        let (atm_name, atm_amount) = view.summary.atm_label(currency);
        self.render_standing(frame, top[0], "🏆 Shark", &shark_name, &shark_amount, self.theme.success);
        self.render_standing(frame, top[1], "💀 ATM", &atm_name, &atm_amount, self.theme.danger);
        self.render_insights(frame, top[2], &view.summary);
        self.render_chart(frame, bottom[0], &view.summary);
        self.render_settlements(frame, bottom[1], &view.summary);

        let hint = if view.from_history {
            "s export  Esc back to history  q quit"
        } else {
            "s export  n new session  h history  q quit"
        };
        self.render_status(frame, status, hint);
    }

    fn render_standing(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        name: &str,
        amount: &str,
        color: Color,
    ) {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                name.to_string(),
                Style::default()
                    .fg(self.theme.primary_fg)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                amount.to_string(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title.to_string()))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }

    fn render_insights(&self, frame: &mut Frame, area: Rect, summary: &SessionSummary) {
        let muted = Style::default().fg(self.theme.muted);
        let lines = match &summary.insights {
            Some(insights) => vec![
                info_line("Swing", self.money(insights.biggest_swing), muted),
                info_line("Rebuys", insights.most_rebuys_label(), muted),
                info_line("Tightest", insights.tightest_label(), muted),
                info_line("Duration", insights.duration_label(), muted),
                info_line("Avg in", self.money(insights.avg_buy_in), muted),
            ],
            None => vec![Line::from(Span::styled("No insights recorded", muted))],
        };
        let paragraph =
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Insights"));
        frame.render_widget(paragraph, area);
    }

    fn render_chart(&self, frame: &mut Frame, area: Rect, summary: &SessionSummary) {
        let currency = self.controller.currency();
        let chart = summary.chart_rows();
        let bar_space = (area.width as usize).saturating_sub(CHART_LABEL_WIDTH + 14).max(1);

        let mut lines = Vec::new();
        for (rows, color) in [
            (&chart.winners, self.theme.success),
            (&chart.losers, self.theme.danger),
        ] {
            for row in rows {
                let mut bar_len = (row.width * bar_space as f64).round() as usize;
                if bar_len == 0 && row.net != 0.0 {
                    bar_len = 1;
                }
                let name: String = row.name.chars().take(CHART_LABEL_WIDTH - 1).collect();
                lines.push(Line::from(vec![
                    Span::raw(format!("{name:<width$}", width = CHART_LABEL_WIDTH)),
                    Span::styled("█".repeat(bar_len), Style::default().fg(color)),
                    Span::styled(
                        format!(" {}", format_signed(row.net, currency)),
                        Style::default().fg(color),
                    ),
                ]));
            }
        }
        if lines.is_empty() {
            lines.push(Line::from(Span::styled(
                "Nobody played",
                Style::default().fg(self.theme.muted),
            )));
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Results"));
        frame.render_widget(paragraph, area);
    }

    fn render_settlements(&self, frame: &mut Frame, area: Rect, summary: &SessionSummary) {
        let mut lines = Vec::new();
        if summary.is_unbalanced() {
            lines.push(Line::from(Span::styled(
                format!(
                    "⚠ Nets are off by {}. Check the cash-outs.",
                    self.money(summary.imbalance)
                ),
                Style::default()
                    .fg(self.theme.warning)
                    .add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));
        }
        lines.extend(summary.settlements.iter().map(|line| {
            Line::from(Span::styled(
                line.clone(),
                Style::default().fg(self.theme.primary_fg),
            ))
        }));

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Settle Up"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_history(&mut self, frame: &mut Frame) {
        let (header, body, status) = Self::screen_layout(frame.size());
        self.render_header(frame, header, "History");

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(body);

        let archive = self.controller.archive();
        let items: Vec<ListItem> = archive
            .iter()
            .map(|record| {
                ListItem::new(vec![
                    Line::from(Span::styled(
                        record.title(),
                        Style::default()
                            .fg(self.theme.primary_fg)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        format!(
                            "  {} · {} · {}",
                            record.date.with_timezone(&Local).format("%d %b %Y"),
                            record.location,
                            self.money(record.total_pot)
                        ),
                        Style::default().fg(self.theme.muted),
                    )),
                ])
            })
            .collect();
        let mut list_state = ListState::default();
        if !items.is_empty() {
            list_state.select(Some(self.state.history_cursor));
        }
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Sessions ({})", archive.len())),
            )
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, columns[0], &mut list_state);

        self.render_history_detail(frame, columns[1]);
        self.render_status(
            frame,
            status,
            "Enter open  j/k move  c clear history  r players  Esc back  q quit",
        );
    }

    fn render_history_detail(&self, frame: &mut Frame, area: Rect) {
        let muted = Style::default().fg(self.theme.muted);
        let currency = self.controller.currency();
        let lines = match self.controller.archive().get(self.state.history_cursor) {
            Some(record) => {
                let mut lines = vec![
                    info_line(
                        "Closed",
                        record
                            .date
                            .with_timezone(&Local)
                            .format("%a %d %b %Y %H:%M")
                            .to_string(),
                        muted,
                    ),
                    info_line("Location", record.location.clone(), muted),
                    info_line("Pot", self.money(record.total_pot), muted),
                    info_line(
                        "Shark",
                        record
                            .shark
                            .as_ref()
                            .map(PlayerName::to_string)
                            .unwrap_or_else(|| "-".to_string()),
                        muted,
                    ),
                    info_line(
                        "Settled",
                        if record.is_running_balance {
                            "running balance".to_string()
                        } else {
                            "this session".to_string()
                        },
                        muted,
                    ),
                    Line::from(""),
                ];
                lines.extend(record.settlements.iter().map(|line| Line::from(line.clone())));
                lines.push(Line::from(""));
                for result in &record.results {
                    lines.push(Line::from(vec![
                        Span::raw(format!("{:<12}", result.name.as_str())),
                        Span::styled(
                            format_signed(result.net, currency),
                            Style::default().fg(self.theme.net_color(result.net)),
                        ),
                    ]));
                }
                lines
            }
            None => vec![Line::from(Span::styled("Nothing archived yet", muted))],
        };
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Details"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_registry(&mut self, frame: &mut Frame) {
        let (header, body, status) = Self::screen_layout(frame.size());
        self.render_header(frame, header, "Players");

        let currency = self.controller.currency();
        let leaderboard = self.controller.registry().leaderboard();
        let rows: Vec<Row> = leaderboard
            .iter()
            .map(|(name, entry)| {
                Row::new(vec![
                    Cell::from(Span::styled(
                        name.to_string(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Cell::from(entry.sessions.to_string()),
                    Cell::from(Span::styled(
                        format_signed(entry.total_profit, currency),
                        Style::default().fg(self.theme.net_color(entry.total_profit)),
                    )),
                    Cell::from(self.money(entry.total_buy_ins)),
                    Cell::from(entry.total_rebuys.to_string()),
                    Cell::from(format_signed(entry.biggest_win, currency)),
                    Cell::from(self.money(entry.biggest_loss)),
                    Cell::from(
                        entry
                            .last_played
                            .map(|date| date.with_timezone(&Local).format("%d %b %Y").to_string())
                            .unwrap_or_else(|| "-".to_string()),
                    ),
                ])
            })
            .collect();

        let header_row = Row::new(vec![
            "Player", "Sessions", "Profit", "Buy-ins", "Rebuys", "Best", "Worst", "Last played",
        ])
        .style(
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        );
        let widths = [
            Constraint::Min(12),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(7),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(12),
        ];
        let total = rows.len();
        let table = Table::new(rows, widths)
            .header(header_row)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Leaderboard ({total})")),
            )
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");
        let mut table_state = TableState::default();
        if total > 0 {
            table_state.select(Some(self.state.registry_cursor.min(total - 1)));
        }
        frame.render_stateful_widget(table, body, &mut table_state);
        self.render_status(frame, status, "j/k move  h history  Esc back  q quit");
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, subtitle: &str) {
        let line = Line::from(vec![
            Span::styled("♠ ", Style::default().fg(self.theme.primary_fg)),
            Span::styled("♥ ", Style::default().fg(self.theme.danger)),
            Span::styled(
                "ChipCheck",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" ♦", Style::default().fg(self.theme.danger)),
            Span::styled(" ♣", Style::default().fg(self.theme.primary_fg)),
            Span::styled(format!("   {subtitle}"), Style::default().fg(self.theme.muted)),
        ]);
        let paragraph = Paragraph::new(line)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect, hint: &str) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let paragraph = Paragraph::new(vec![
            Line::from(self.state.status.clone()),
            Line::from(Span::styled(
                hint.to_string(),
                Style::default().fg(self.theme.muted),
            )),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_prompt(&self, frame: &mut Frame, prompt: &Prompt) {
        let frame_area = frame.size();
        let width = cmp::max(cmp::min(64_u16, frame_area.width.saturating_sub(4)), 24_u16);
        let height = 7_u16.min(frame_area.height.saturating_sub(2)).max(5_u16);
        let area = centered_rect(width, height, frame_area);

        frame.render_widget(Clear, area);

        let default_buy_in = self.money(self.default_buy_in());
        let input_line = Line::from(vec![
            Span::styled("> ", Style::default().fg(self.theme.accent)),
            Span::raw(prompt.field.input.clone()),
        ]);
        let helper = Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" confirm  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel  "),
            Span::styled("^U", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" clear"),
        ]);

        let paragraph = Paragraph::new(vec![
            input_line,
            Line::from(""),
            Line::from(Span::styled(
                prompt.kind.instruction(&default_buy_in),
                Style::default().fg(self.theme.muted),
            )),
            helper,
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(prompt.kind.title()),
        )
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);

        let cursor_x = (area.x + 3 + prompt.field.cursor as u16)
            .min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 1);
    }

    fn render_confirm(&self, frame: &mut Frame, confirm: &Confirm) {
        let frame_area = frame.size();
        let width = cmp::max(cmp::min(56_u16, frame_area.width.saturating_sub(4)), 24_u16);
        let area = centered_rect(width, 5, frame_area);
        frame.render_widget(Clear, area);

        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(
                confirm.question(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("y", Style::default().fg(self.theme.warning)),
                Span::raw(" confirm  "),
                Span::styled("n", Style::default().fg(self.theme.accent)),
                Span::raw(" cancel"),
            ]),
        ])
        .block(Block::default().borders(Borders::ALL).title("Confirm"))
        .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    status: String,
    should_quit: bool,
    roster_cursor: usize,
    history_cursor: usize,
    registry_cursor: usize,
    template_cursor: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            status: "Ready".to_string(),
            should_quit: false,
            roster_cursor: 0,
            history_cursor: 0,
            registry_cursor: 0,
            template_cursor: 0,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn move_roster_cursor(&mut self, delta: isize, total: usize) {
        self.roster_cursor = step_cursor(self.roster_cursor, delta, total);
    }

    fn move_history_cursor(&mut self, delta: isize, total: usize) {
        self.history_cursor = step_cursor(self.history_cursor, delta, total);
    }

    fn move_registry_cursor(&mut self, delta: isize, total: usize) {
        self.registry_cursor = step_cursor(self.registry_cursor, delta, total);
    }

    fn move_template_cursor(&mut self, delta: isize, total: usize) {
        self.template_cursor = step_cursor(self.template_cursor, delta, total);
    }
}

/// Move `cursor` by `delta`, clamped to `0..total`.
fn step_cursor(cursor: usize, delta: isize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    (cursor as isize + delta).clamp(0, total as isize - 1) as usize
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn info_line(label: &str, value: String, label_style: Style) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<10}"), label_style),
        Span::raw(value),
    ])
}

fn session_label(config: &SessionConfig) -> String {
    if config.name.trim().is_empty() {
        "Untitled session".to_string()
    } else {
        config.name.clone()
    }
}

fn split_denominations(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|denomination| !denomination.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split `"Rahul 1500"` into a name and an optional amount.
///
/// A last word that does not look like a number stays part of the name.
fn split_player_entry(raw: &str) -> (&str, Option<Result<Amount, ValidationError>>) {
    let raw = raw.trim();
    if let Some((name, last)) = raw.rsplit_once(char::is_whitespace) {
        if last.chars().any(|ch| ch.is_ascii_digit()) {
            return (name.trim_end(), Some(validate::parse_amount(last)));
        }
    }
    (raw, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_entry_splits_trailing_amount() {
        assert_eq!(split_player_entry("Rahul 1500"), ("Rahul", Some(Ok(1500.0))));
        assert_eq!(split_player_entry("  Rahul  "), ("Rahul", None));
        assert_eq!(split_player_entry("Rahul K"), ("Rahul K", None));
        assert_eq!(
            split_player_entry("Rahul K ₹1,000"),
            ("Rahul K", Some(Ok(1000.0)))
        );
        assert!(matches!(
            split_player_entry("Amit 12abc"),
            ("Amit", Some(Err(ValidationError::InvalidAmount(_))))
        ));
    }

    #[test]
    fn denominations_ignore_blanks() {
        assert_eq!(
            split_denominations("10, 25,,  100 ,"),
            vec!["10".to_string(), "25".to_string(), "100".to_string()]
        );
        assert!(split_denominations("  ").is_empty());
    }

    #[test]
    fn text_field_edits_by_character() {
        let mut field = TextField::with_value("₹50");
        field.move_cursor(-2);
        field.insert('1');
        assert_eq!(field.input, "₹150");
        field.cursor = 1;
        field.backspace();
        assert_eq!(field.input, "150");
        field.delete();
        assert_eq!(field.value(), "50");
    }

    #[test]
    fn cursor_steps_clamp_to_bounds() {
        assert_eq!(step_cursor(0, -1, 3), 0);
        assert_eq!(step_cursor(2, 1, 3), 2);
        assert_eq!(step_cursor(5, 0, 3), 2);
        assert_eq!(step_cursor(4, 1, 0), 0);
    }

    #[test]
    fn setup_form_builds_session_config() {
        let mut form = SetupForm::new(&AppConfig::default());
        form.name = TextField::with_value("Friday");
        form.buy_in = TextField::with_value("1,000");
        let config = form.to_config().expect("valid setup");
        assert_eq!(config.name, "Friday");
        assert_eq!(config.default_buy_in, 1000.0);
        assert_eq!(config.denominations.len(), 5);

        form.buy_in = TextField::with_value("lots");
        assert!(form.to_config().is_err());
    }
}
