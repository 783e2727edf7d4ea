// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use menupick_app::{
    AppCommand, AppEvent, AppState, AuthGate, DEFAULT_AUTO_DISMISS, DEFAULT_PAGE_SIZE,
    DEFAULT_SPIN_DURATION, DEFAULT_SPIN_TICK, MutationPipeline, MutationRequest, MutationTicket,
    NotificationKind, NotificationScheduler, PageView, Record, RemoteOp, RemoteOutcome, Screen,
    SelectionEngine, SpinEvent, StoreError, StoreResult,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::io;
use std::num::NonZeroUsize;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const IDLE_POLL: Duration = Duration::from_millis(120);
const CURSOR_MARK: &str = ">";
const INPUT_CARET: &str = "_";

/// Backend hooks the event loop needs. Mutations report back through the
/// internal channel so an implementation may run them on another thread.
pub trait AppRuntime {
    fn load_records(&mut self) -> StoreResult<Vec<Record>>;
    fn execute(&mut self, op: &RemoteOp) -> RemoteOutcome;
    fn spawn_mutation(
        &mut self,
        request: MutationRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let outcome = self.execute(&request.op);
        tx.send(InternalEvent::MutationFinished {
            ticket: request.ticket,
            outcome,
        })
        .map_err(|_| anyhow!("mutation event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    MutationFinished {
        ticket: MutationTicket,
        outcome: RemoteOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiConfig {
    pub page_size: NonZeroUsize,
    pub notification_timeout: Duration,
    pub spin_tick: Duration,
    pub spin_duration: Duration,
    pub auth: AuthGate,
}

impl UiConfig {
    pub fn new(auth: AuthGate) -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            notification_timeout: DEFAULT_AUTO_DISMISS,
            spin_tick: DEFAULT_SPIN_TICK,
            spin_duration: DEFAULT_SPIN_DURATION,
            auth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LoginField {
    #[default]
    Username,
    Password,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct LoginForm {
    username: String,
    password: String,
    focus: LoginField,
    error: Option<String>,
}

impl LoginForm {
    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum AdminFocus {
    #[default]
    List,
    AddInput,
    EditInput,
    ConfirmDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct AdminUiState {
    cursor: usize,
    focus: AdminFocus,
}

#[derive(Debug)]
struct ViewData {
    pipeline: MutationPipeline,
    selection: SelectionEngine,
    gate: AuthGate,
    login: LoginForm,
    admin: AdminUiState,
    rng: StdRng,
}

impl ViewData {
    fn new(config: &UiConfig, rng: StdRng) -> Self {
        Self {
            pipeline: MutationPipeline::new(
                PageView::new(config.page_size),
                NotificationScheduler::new(config.notification_timeout),
            ),
            selection: SelectionEngine::new(config.spin_tick, config.spin_duration),
            gate: config.auth.clone(),
            login: LoginForm::default(),
            admin: AdminUiState::default(),
            rng,
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        match (
            self.pipeline.notifications().due_at(),
            self.selection.next_deadline(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    config: &UiConfig,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(config, StdRng::from_entropy());
    let (internal_tx, internal_rx) = mpsc::channel();

    reload_records(runtime, &mut view_data, Instant::now());

    let mut result = Ok(());
    loop {
        let now = Instant::now();
        process_internal_events(&mut view_data, &internal_rx, now);
        advance_timers(state, &mut view_data, now);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let timeout = poll_timeout(&view_data, Instant::now());
        let has_event = match event::poll(timeout).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(
                        state,
                        runtime,
                        &mut view_data,
                        &internal_tx,
                        key,
                        Instant::now(),
                    ) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    view_data.selection.cancel();
    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn poll_timeout(view_data: &ViewData, now: Instant) -> Duration {
    view_data.next_deadline().map_or(IDLE_POLL, |due| {
        due.saturating_duration_since(now).min(IDLE_POLL)
    })
}

fn process_internal_events(view_data: &mut ViewData, rx: &Receiver<InternalEvent>, now: Instant) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::MutationFinished { ticket, outcome } => {
                view_data.pipeline.complete(ticket, outcome, now);
            }
        }
    }
    sync_admin(view_data);
}

fn advance_timers(state: &mut AppState, view_data: &mut ViewData, now: Instant) {
    view_data.pipeline.tick(now);
    for event in view_data.selection.poll(now, &mut view_data.rng) {
        if let SpinEvent::Finished(record) = event {
            state.dispatch(AppCommand::SetStatus(format!("tonight: {}", record.name)));
        }
    }
}

fn reload_records<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData, now: Instant) {
    let listing = runtime.load_records();
    if let Ok(count) = view_data.pipeline.apply_listing(listing, now) {
        debug!(count, "menu loaded");
    }
    sync_admin(view_data);
}

fn dispatch_mutation<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    request: MutationRequest,
    now: Instant,
) {
    let ticket = request.ticket;
    if let Err(error) = runtime.spawn_mutation(request, internal_tx.clone()) {
        warn!(%error, "could not start mutation");
        view_data.pipeline.complete(
            ticket,
            Err(StoreError::transport(format!("{error:#}"))),
            now,
        );
    }
    sync_admin(view_data);
}

/// Keeps the cursor on a visible row and drops focus from dialogs the
/// pipeline has closed.
fn sync_admin(view_data: &mut ViewData) {
    let visible = view_data.pipeline.visible_records().len();
    let admin = &mut view_data.admin;
    admin.cursor = admin.cursor.min(visible.saturating_sub(1));
    admin.focus = match admin.focus {
        AdminFocus::EditInput if view_data.pipeline.edit_session().is_none() => AdminFocus::List,
        AdminFocus::ConfirmDelete if view_data.pipeline.delete_confirmation().is_none() => {
            AdminFocus::List
        }
        focus => focus,
    };
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
    now: Instant,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match state.screen {
        Screen::Picker => handle_picker_key(state, runtime, view_data, key, now),
        Screen::Login => {
            handle_login_key(state, view_data, key);
            false
        }
        Screen::Admin => {
            handle_admin_key(state, runtime, view_data, internal_tx, key, now);
            false
        }
    }
}

fn handle_picker_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
    now: Instant,
) -> bool {
    match key.code {
        KeyCode::Char(' ') | KeyCode::Enter => {
            if view_data.selection.is_spinning() {
                return false;
            }
            if view_data
                .selection
                .start(view_data.pipeline.list().records(), now)
            {
                state.dispatch(AppCommand::ClearStatus);
            } else {
                state.dispatch(AppCommand::SetStatus(
                    "the menu is empty; press a to add dishes".to_owned(),
                ));
            }
        }
        KeyCode::Char('a') => {
            view_data.selection.cancel();
            open_admin(state, view_data);
        }
        KeyCode::Char('r') => reload_records(runtime, view_data, now),
        KeyCode::Char('q') => return true,
        _ => {}
    }
    false
}

fn open_admin(state: &mut AppState, view_data: &mut ViewData) {
    let events = state.dispatch(AppCommand::OpenAdmin);
    if events.contains(&AppEvent::RedirectedToLogin) {
        view_data.login = LoginForm::default();
        state.dispatch(AppCommand::SetStatus(
            "sign in to manage the menu".to_owned(),
        ));
    }
}

fn handle_login_key(state: &mut AppState, view_data: &mut ViewData, key: KeyEvent) {
    let login = &mut view_data.login;
    match key.code {
        KeyCode::Esc => {
            *login = LoginForm::default();
            state.dispatch(AppCommand::OpenPicker);
        }
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => login.toggle_focus(),
        KeyCode::Enter if login.focus == LoginField::Username => {
            login.focus = LoginField::Password;
        }
        KeyCode::Enter => match view_data.gate.login(&login.username, &login.password) {
            Ok(session) => {
                info!(operator = session.operator(), "operator signed in");
                let status = format!("signed in as {}", session.operator());
                *login = LoginForm::default();
                view_data.admin = AdminUiState::default();
                state.dispatch(AppCommand::SignIn(session));
                state.dispatch(AppCommand::SetStatus(status));
            }
            Err(error) => {
                warn!(username = %login.username, "sign in rejected");
                login.password.clear();
                login.error = Some(error.to_string());
            }
        },
        KeyCode::Backspace => {
            login.focused_mut().pop();
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            login.focused_mut().push(ch);
        }
        _ => {}
    }
}

fn handle_admin_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
    now: Instant,
) {
    if !state.is_signed_in() {
        open_admin(state, view_data);
        return;
    }

    match view_data.admin.focus {
        AdminFocus::List => handle_admin_list_key(state, runtime, view_data, key, now),
        AdminFocus::AddInput => handle_add_input_key(runtime, view_data, internal_tx, key, now),
        AdminFocus::EditInput => handle_edit_input_key(runtime, view_data, internal_tx, key, now),
        AdminFocus::ConfirmDelete => {
            handle_confirm_delete_key(state, runtime, view_data, internal_tx, key, now);
        }
    }
    sync_admin(view_data);
}

fn handle_admin_list_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
    now: Instant,
) {
    let visible = view_data.pipeline.visible_records().len();
    let admin = &mut view_data.admin;
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if admin.cursor + 1 < visible {
                admin.cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            admin.cursor = admin.cursor.saturating_sub(1);
        }
        KeyCode::Char('l') | KeyCode::Right => {
            if view_data.pipeline.next_page() {
                view_data.admin.cursor = 0;
            }
        }
        KeyCode::Char('h') | KeyCode::Left => {
            if view_data.pipeline.prev_page() {
                view_data.admin.cursor = 0;
            }
        }
        KeyCode::Char('a') => admin.focus = AdminFocus::AddInput,
        KeyCode::Char('e') | KeyCode::Enter => match view_data.pipeline.start_edit(admin.cursor) {
            Ok(_) => view_data.admin.focus = AdminFocus::EditInput,
            Err(error) => {
                state.dispatch(AppCommand::SetStatus(error.to_string()));
            }
        },
        KeyCode::Char('d') => match view_data.pipeline.request_delete(admin.cursor) {
            Ok(_) => view_data.admin.focus = AdminFocus::ConfirmDelete,
            Err(error) => {
                state.dispatch(AppCommand::SetStatus(error.to_string()));
            }
        },
        KeyCode::Char('r') => reload_records(runtime, view_data, now),
        KeyCode::Char('L') => {
            view_data.pipeline.cancel_edit();
            view_data.pipeline.cancel_delete();
            view_data.admin = AdminUiState::default();
            state.dispatch(AppCommand::Logout);
        }
        KeyCode::Esc => {
            state.dispatch(AppCommand::OpenPicker);
        }
        _ => {}
    }
}

fn handle_add_input_key<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
    now: Instant,
) {
    match key.code {
        KeyCode::Esc => view_data.admin.focus = AdminFocus::List,
        KeyCode::Enter => {
            if let Ok(request) = view_data.pipeline.begin_add(now) {
                dispatch_mutation(runtime, view_data, internal_tx, request, now);
            }
        }
        KeyCode::Backspace => {
            view_data.pipeline.add_input_mut().pop();
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.pipeline.add_input_mut().push(ch);
        }
        _ => {}
    }
}

fn handle_edit_input_key<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
    now: Instant,
) {
    let saving = view_data
        .pipeline
        .edit_session()
        .is_some_and(|session| session.saving.is_some());
    match key.code {
        KeyCode::Esc => {
            if !saving {
                view_data.pipeline.cancel_edit();
            }
            view_data.admin.focus = AdminFocus::List;
        }
        KeyCode::Enter => {
            if let Ok(request) = view_data.pipeline.begin_rename(now) {
                dispatch_mutation(runtime, view_data, internal_tx, request, now);
            }
        }
        KeyCode::Backspace if !saving => {
            if let Some(draft) = view_data.pipeline.edit_draft_mut() {
                draft.pop();
            }
        }
        KeyCode::Char(ch) if !saving && !key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(draft) = view_data.pipeline.edit_draft_mut() {
                draft.push(ch);
            }
        }
        _ => {}
    }
}

fn handle_confirm_delete_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
    now: Instant,
) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            if let Ok(request) = view_data.pipeline.confirm_delete(now) {
                dispatch_mutation(runtime, view_data, internal_tx, request, now);
            }
        }
        KeyCode::Char('n') | KeyCode::Esc => {
            if view_data.pipeline.cancel_delete() {
                view_data.admin.focus = AdminFocus::List;
            } else {
                state.dispatch(AppCommand::SetStatus("delete in progress".to_owned()));
            }
        }
        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(render_header_text(state)).block(
        Block::default()
            .title("menupick")
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(header, layout[0]);

    let body = match state.screen {
        Screen::Picker => render_picker_text(view_data),
        Screen::Login => render_login_text(&view_data.login),
        Screen::Admin => render_admin_text(view_data),
    };
    let body_style = if view_data.selection.is_spinning() {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let body_widget = Paragraph::new(body).style(body_style).block(
        Block::default()
            .borders(Borders::ALL)
            .title(state.screen.label()),
    );
    frame.render_widget(body_widget, layout[1]);

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(status_style(view_data))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if state.screen == Screen::Admin && view_data.admin.focus == AdminFocus::ConfirmDelete {
        let area = centered_rect(50, 30, frame.area());
        frame.render_widget(Clear, area);
        let dialog = Paragraph::new(render_delete_dialog_text(view_data)).block(
            Block::default()
                .title("delete")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Red)),
        );
        frame.render_widget(dialog, area);
    }
}

fn render_header_text(state: &AppState) -> String {
    match &state.session {
        Some(session) => format!("{} | operator: {}", state.screen.label(), session.operator()),
        None => state.screen.label().to_owned(),
    }
}

fn render_picker_text(view_data: &ViewData) -> String {
    let selection = &view_data.selection;
    if selection.is_spinning() {
        let name = selection.display().map_or("...", |record| record.name.as_str());
        return format!("spinning...\n\n  {name}");
    }
    if let Some(record) = selection.result() {
        return format!("you should eat:\n\n  {}\n\nspace to spin again", record.name);
    }
    let count = view_data.pipeline.list().len();
    if count == 0 {
        return "no dishes yet\n\npress a to add some".to_owned();
    }
    let noun = if count == 1 { "dish" } else { "dishes" };
    format!("{count} {noun} on the menu\n\npress space to pick one")
}

fn render_login_text(login: &LoginForm) -> String {
    let marker = |field: LoginField| if login.focus == field { CURSOR_MARK } else { " " };
    let mut lines = vec![
        "sign in to manage the menu".to_owned(),
        String::new(),
        format!("{} username: {}", marker(LoginField::Username), login.username),
        format!(
            "{} password: {}",
            marker(LoginField::Password),
            "*".repeat(login.password.chars().count())
        ),
    ];
    if let Some(error) = &login.error {
        lines.push(String::new());
        lines.push(error.clone());
    }
    lines.join("\n")
}

fn render_admin_text(view_data: &ViewData) -> String {
    let pipeline = &view_data.pipeline;
    let view = pipeline.view();
    let admin = view_data.admin;
    let mut lines = vec![format!(
        "page {}/{} | {} dishes | {} pending",
        view.current_page(),
        pipeline.page_count(),
        pipeline.list().len(),
        pipeline.pending_count()
    )];
    lines.push(String::new());

    if pipeline.visible_records().is_empty() {
        lines.push("  (empty)".to_owned());
    }
    for (row, record) in pipeline.visible_records().iter().enumerate() {
        let marker = if row == admin.cursor && admin.focus == AdminFocus::List {
            CURSOR_MARK
        } else {
            " "
        };
        let position = view.absolute(row) + 1;
        match pipeline.edit_session() {
            Some(session) if session.id == record.id => {
                let suffix = if session.saving.is_some() {
                    " (saving)"
                } else if admin.focus == AdminFocus::EditInput {
                    INPUT_CARET
                } else {
                    ""
                };
                lines.push(format!("{marker} {position}. [{}{suffix}]", session.draft));
            }
            _ => lines.push(format!("{marker} {position}. {}", record.name)),
        }
    }

    lines.push(String::new());
    let caret = if admin.focus == AdminFocus::AddInput {
        INPUT_CARET
    } else {
        ""
    };
    lines.push(format!("add: {}{caret}", pipeline.add_input()));
    lines.join("\n")
}

fn render_delete_dialog_text(view_data: &ViewData) -> String {
    let pipeline = &view_data.pipeline;
    let name = pipeline.delete_target_name().unwrap_or("this dish");
    if pipeline
        .delete_confirmation()
        .is_some_and(|confirmation| confirmation.is_loading())
    {
        return format!("deleting {name}...");
    }
    format!("delete {name}?\n\ny confirm | n keep")
}

fn key_hints(state: &AppState, view_data: &ViewData) -> &'static str {
    match state.screen {
        Screen::Picker => "space spin | a admin | r reload | q quit",
        Screen::Login => "tab field | enter sign in | esc back",
        Screen::Admin => match view_data.admin.focus {
            AdminFocus::List => {
                "j/k row | h/l page | a add | e edit | d delete | r reload | L logout | esc picker"
            }
            AdminFocus::AddInput => "type a name | enter add | esc done",
            AdminFocus::EditInput => "enter save | esc cancel",
            AdminFocus::ConfirmDelete => "y delete | n keep",
        },
    }
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let hints = key_hints(state, view_data);
    let message = view_data
        .pipeline
        .notifications()
        .current()
        .map(|notification| notification.message.as_str())
        .or(state.status_line.as_deref());
    match message {
        Some(message) => format!("{message} | {hints} | ctrl+q"),
        None => format!("{hints} | ctrl+q"),
    }
}

fn status_style(view_data: &ViewData) -> Style {
    let color = match view_data.pipeline.notifications().current() {
        Some(notification) => match notification.kind {
            NotificationKind::Success => Color::Green,
            NotificationKind::Error => Color::Red,
            NotificationKind::Progress => Color::Yellow,
        },
        None => Color::Yellow,
    };
    Style::default().fg(color)
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
