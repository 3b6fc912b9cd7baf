use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tui_textarea::TextArea;

use dl_core::{export_json, AuthState, Autosave, Draft, Entry, Journal, Session, EXPORT_FILE_NAME};
use dl_fs::{resolve_data_path, JsonStore};

const TICK_RATE: Duration = Duration::from_millis(200);
const STATUS_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Register,
    Login,
    Locked,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    List,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modal {
    None,
    ConfirmDelete,
    ImportPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditorField {
    Title,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthField {
    Username,
    Passphrase,
    Confirm,
    Pin,
}

struct App {
    screen: Screen,
    focus: Focus,
    modal: Modal,
    entries_state: ListState,
    searching: bool,
    search_input: TextInput,
    active_query: Option<String>,
    editor_field: EditorField,
    title_input: TextInput,
    body_editor: TextArea<'static>,
    editing_id: Option<String>,
    path_input: TextInput,
    autosave: Autosave,
    status: Option<(String, Instant)>,
    dark_mode: bool,
    data_path: PathBuf,
    auth_field: AuthField,
    username_input: TextInput,
    passphrase_input: TextInput,
    confirm_input: TextInput,
    pin_input: TextInput,
}

#[derive(Debug, Default, Clone)]
struct TextInput {
    content: String,
    cursor: usize,
}

impl TextInput {
    fn from(content: String) -> Self {
        let cursor = content.chars().count();
        Self { content, cursor }
    }

    // `cursor` counts chars; the byte offset for edits is derived here
    // so `String::insert`/`remove` always hit a char boundary.
    fn byte_cursor(&self) -> usize {
        self.content
            .char_indices()
            .nth(self.cursor)
            .map_or(self.content.len(), |(at, _)| at)
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_cursor();
        self.content.insert(at, c);
        self.cursor += 1;
    }

    fn delete_back(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_cursor();
            self.content.remove(at);
        }
    }

    fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    fn move_right(&mut self) {
        if self.cursor < self.content.chars().count() {
            self.cursor += 1;
        }
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.content.chars().count();
    }

    fn reset(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }
}

impl App {
    fn new() -> Self {
        let mut entries_state = ListState::default();
        entries_state.select(Some(0));
        Self {
            screen: Screen::Login,
            focus: Focus::List,
            modal: Modal::None,
            entries_state,
            searching: false,
            search_input: TextInput::default(),
            active_query: None,
            editor_field: EditorField::Title,
            title_input: TextInput::default(),
            body_editor: make_body_editor(""),
            editing_id: None,
            path_input: TextInput::default(),
            autosave: Autosave::new(),
            status: None,
            dark_mode: false,
            data_path: PathBuf::new(),
            auth_field: AuthField::Username,
            username_input: TextInput::default(),
            passphrase_input: TextInput::default(),
            confirm_input: TextInput::default(),
            pin_input: TextInput::default(),
        }
    }

    fn visible<'a>(&self, journal: &'a Journal<JsonStore>) -> Vec<&'a Entry> {
        match &self.active_query {
            Some(query) => journal.search(query),
            None => journal.all().iter().collect(),
        }
    }

    fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some((text.into(), Instant::now()));
    }

    fn expire_status(&mut self) {
        if let Some((_, shown)) = &self.status {
            if shown.elapsed() >= STATUS_TTL {
                self.status = None;
            }
        }
    }

    fn next_auth_field(&mut self) {
        self.auth_field = match (self.screen, self.auth_field) {
            (Screen::Register, AuthField::Username) => AuthField::Passphrase,
            (Screen::Register, AuthField::Passphrase) => AuthField::Confirm,
            (Screen::Register, AuthField::Confirm) => AuthField::Pin,
            (Screen::Register, AuthField::Pin) => AuthField::Username,
            (_, AuthField::Username) => AuthField::Passphrase,
            (_, _) => AuthField::Username,
        };
    }

    fn prev_auth_field(&mut self) {
        self.auth_field = match (self.screen, self.auth_field) {
            (Screen::Register, AuthField::Username) => AuthField::Pin,
            (Screen::Register, AuthField::Passphrase) => AuthField::Username,
            (Screen::Register, AuthField::Confirm) => AuthField::Passphrase,
            (Screen::Register, AuthField::Pin) => AuthField::Confirm,
            (_, AuthField::Passphrase) => AuthField::Username,
            (_, _) => AuthField::Passphrase,
        };
    }

    fn active_auth_input(&mut self) -> &mut TextInput {
        match self.auth_field {
            AuthField::Username => &mut self.username_input,
            AuthField::Passphrase => &mut self.passphrase_input,
            AuthField::Confirm => &mut self.confirm_input,
            AuthField::Pin => &mut self.pin_input,
        }
    }

    fn select_next(list_state: &mut ListState, len: usize) {
        let i = match list_state.selected() {
            Some(i) => {
                if i + 1 >= len {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        list_state.select(Some(i));
    }

    fn select_prev(list_state: &mut ListState, len: usize) {
        let i = match list_state.selected() {
            Some(i) => {
                if i == 0 {
                    len.saturating_sub(1)
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        list_state.select(Some(i));
    }

    fn select_first(list_state: &mut ListState) {
        list_state.select(Some(0));
    }

    fn select_last(list_state: &mut ListState, len: usize) {
        if len > 0 {
            list_state.select(Some(len - 1));
        }
    }

    fn select_page_down(list_state: &mut ListState, len: usize) {
        if len == 0 {
            return;
        }
        let i = list_state.selected().unwrap_or(0);
        let next = (i + 5).min(len - 1);
        list_state.select(Some(next));
    }

    fn select_page_up(list_state: &mut ListState) {
        let i = list_state.selected().unwrap_or(0);
        let next = i.saturating_sub(5);
        list_state.select(Some(next));
    }
}

pub fn run() -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Restore the terminal even when the loop bails with an error.
    let result = run_app(&mut terminal);
    restore_terminal(terminal)?;
    result
}

fn run_app(terminal: &mut Terminal<ratatui::backend::CrosstermBackend<Stdout>>) -> Result<()> {
    let store = JsonStore::new(resolve_data_path()?);
    let mut app = App::new();
    app.data_path = store.path().to_path_buf();
    let mut session = Session::new(store.clone())?;
    let mut journal = Journal::open(store)?;

    match session.state() {
        AuthState::Unregistered => app.screen = Screen::Register,
        _ => {
            app.screen = Screen::Login;
            if let Some(username) = session.stored_username()? {
                app.username_input = TextInput::from(username);
            }
        }
    }

    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| render_app(frame, &app, &session, &journal))?;

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && handle_key(&mut session, &mut journal, &mut app, key)?
                {
                    break;
                }
            }
        }

        flush_due_autosave(&mut journal, &mut app)?;

        if last_tick.elapsed() >= TICK_RATE {
            app.expire_status();
            last_tick = Instant::now();
        }
    }

    flush_pending_autosave(&mut journal, &mut app)?;
    Ok(())
}

fn handle_key(
    session: &mut Session<JsonStore>,
    journal: &mut Journal<JsonStore>,
    app: &mut App,
    key: KeyEvent,
) -> Result<bool> {
    match app.screen {
        Screen::Register => return handle_register_key(session, app, key),
        Screen::Login => return handle_login_key(session, app, key),
        Screen::Locked => return handle_locked_key(session, journal, app, key),
        Screen::Main => {}
    }

    if !matches!(app.modal, Modal::None) {
        return handle_modal_key(journal, app, key);
    }
    if app.searching {
        return handle_search_input(journal, app, key);
    }
    if app.focus == Focus::Editor {
        return handle_editor_key(journal, app, key);
    }

    match key.code {
        KeyCode::Char('q') => return Ok(true),
        KeyCode::Char('j') | KeyCode::Down => move_selection(journal, app, Move::Down)?,
        KeyCode::Char('k') | KeyCode::Up => move_selection(journal, app, Move::Up)?,
        KeyCode::PageDown => move_selection(journal, app, Move::PageDown)?,
        KeyCode::PageUp => move_selection(journal, app, Move::PageUp)?,
        KeyCode::Home | KeyCode::Char('g') => move_selection(journal, app, Move::First)?,
        KeyCode::End | KeyCode::Char('G') => move_selection(journal, app, Move::Last)?,
        KeyCode::Enter | KeyCode::Char('e') => open_editor(journal, app)?,
        KeyCode::Char('n') => create_entry(journal, app)?,
        KeyCode::Char('d') => {
            if current_entry_id(app, journal).is_some() {
                app.modal = Modal::ConfirmDelete;
            }
        }
        KeyCode::Char('/') => {
            app.searching = true;
            app.search_input.reset();
            if let Some(current) = &app.active_query {
                app.search_input = TextInput::from(current.clone());
            }
        }
        KeyCode::Char('x') => export_entries(session, journal, app),
        KeyCode::Char('i') => {
            app.modal = Modal::ImportPath;
            app.path_input.reset();
        }
        KeyCode::Char('L') => lock_screen(session, app),
        KeyCode::Char('m') => app.dark_mode = !app.dark_mode,
        KeyCode::Esc => logout_to_login(session, journal, app)?,
        _ => {}
    }

    Ok(false)
}

fn handle_register_key(
    session: &mut Session<JsonStore>,
    app: &mut App,
    key: KeyEvent,
) -> Result<bool> {
    match key.code {
        KeyCode::Esc => return Ok(true),
        KeyCode::Tab | KeyCode::Down => app.next_auth_field(),
        KeyCode::BackTab | KeyCode::Up => app.prev_auth_field(),
        KeyCode::Enter => submit_register(session, app)?,
        KeyCode::Char(c) => app.active_auth_input().insert(c),
        KeyCode::Backspace => app.active_auth_input().delete_back(),
        KeyCode::Left => app.active_auth_input().move_left(),
        KeyCode::Right => app.active_auth_input().move_right(),
        KeyCode::Home => app.active_auth_input().move_home(),
        KeyCode::End => app.active_auth_input().move_end(),
        _ => {}
    }
    Ok(false)
}

fn handle_login_key(
    session: &mut Session<JsonStore>,
    app: &mut App,
    key: KeyEvent,
) -> Result<bool> {
    match key.code {
        KeyCode::Esc => return Ok(true),
        KeyCode::Tab | KeyCode::Down | KeyCode::BackTab | KeyCode::Up => app.next_auth_field(),
        KeyCode::Enter => submit_login(session, app)?,
        KeyCode::Char(c) => app.active_auth_input().insert(c),
        KeyCode::Backspace => app.active_auth_input().delete_back(),
        KeyCode::Left => app.active_auth_input().move_left(),
        KeyCode::Right => app.active_auth_input().move_right(),
        KeyCode::Home => app.active_auth_input().move_home(),
        KeyCode::End => app.active_auth_input().move_end(),
        _ => {}
    }
    Ok(false)
}

fn handle_locked_key(
    session: &mut Session<JsonStore>,
    journal: &mut Journal<JsonStore>,
    app: &mut App,
    key: KeyEvent,
) -> Result<bool> {
    match key.code {
        KeyCode::Enter => {
            let code = app.pin_input.content.clone();
            match session.unlock_with_code(&code) {
                Ok(()) => {
                    app.screen = Screen::Main;
                    app.pin_input.reset();
                    app.status = None;
                }
                Err(err) => {
                    app.set_status(err.to_string());
                    app.pin_input.reset();
                }
            }
        }
        KeyCode::Esc => logout_to_login(session, journal, app)?,
        KeyCode::Char(c) => app.pin_input.insert(c),
        KeyCode::Backspace => app.pin_input.delete_back(),
        _ => {}
    }
    Ok(false)
}

fn handle_search_input(
    journal: &Journal<JsonStore>,
    app: &mut App,
    key: KeyEvent,
) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.searching = false;
            app.active_query = None;
            app.search_input.reset();
        }
        KeyCode::Enter => {
            app.searching = false;
            if app.search_input.content.trim().is_empty() {
                app.active_query = None;
                app.search_input.reset();
            } else {
                app.active_query = Some(app.search_input.content.clone());
                let found = app.visible(journal).len();
                app.set_status(format!("Found {found} entries"));
            }
        }
        KeyCode::Char(c) => {
            app.search_input.insert(c);
            app.active_query = if app.search_input.content.is_empty() {
                None
            } else {
                Some(app.search_input.content.clone())
            };
            app.entries_state.select(Some(0));
        }
        KeyCode::Backspace => {
            app.search_input.delete_back();
            app.active_query = if app.search_input.content.is_empty() {
                None
            } else {
                Some(app.search_input.content.clone())
            };
            app.entries_state.select(Some(0));
        }
        KeyCode::Left => app.search_input.move_left(),
        KeyCode::Right => app.search_input.move_right(),
        KeyCode::Home => app.search_input.move_home(),
        KeyCode::End => app.search_input.move_end(),
        _ => {}
    }
    Ok(false)
}

fn handle_editor_key(
    journal: &mut Journal<JsonStore>,
    app: &mut App,
    key: KeyEvent,
) -> Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char('s') = key.code {
            save_now(journal, app)?;
            return Ok(false);
        }
    }

    match key.code {
        KeyCode::Esc => {
            leave_editor(journal, app)?;
            return Ok(false);
        }
        KeyCode::Tab => {
            app.editor_field = match app.editor_field {
                EditorField::Title => EditorField::Body,
                EditorField::Body => EditorField::Title,
            };
            return Ok(false);
        }
        _ => {}
    }

    match app.editor_field {
        EditorField::Title => match key.code {
            KeyCode::Char(c) => {
                app.title_input.insert(c);
                schedule_autosave(app);
            }
            KeyCode::Backspace => {
                app.title_input.delete_back();
                schedule_autosave(app);
            }
            KeyCode::Enter => app.editor_field = EditorField::Body,
            KeyCode::Left => app.title_input.move_left(),
            KeyCode::Right => app.title_input.move_right(),
            KeyCode::Home => app.title_input.move_home(),
            KeyCode::End => app.title_input.move_end(),
            _ => {}
        },
        EditorField::Body => {
            if app.body_editor.input(key) {
                schedule_autosave(app);
            }
        }
    }
    Ok(false)
}

fn handle_modal_key(
    journal: &mut Journal<JsonStore>,
    app: &mut App,
    key: KeyEvent,
) -> Result<bool> {
    match app.modal {
        Modal::ConfirmDelete => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                app.modal = Modal::None;
                delete_selected(journal, app)?;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.modal = Modal::None;
                app.set_status("Delete cancelled");
            }
            _ => {}
        },
        Modal::ImportPath => match key.code {
            KeyCode::Esc => {
                app.modal = Modal::None;
                app.path_input.reset();
            }
            KeyCode::Enter => {
                let path = app.path_input.content.trim().to_string();
                app.modal = Modal::None;
                app.path_input.reset();
                if !path.is_empty() {
                    import_from(journal, app, &path);
                }
            }
            KeyCode::Char(c) => app.path_input.insert(c),
            KeyCode::Backspace => app.path_input.delete_back(),
            KeyCode::Left => app.path_input.move_left(),
            KeyCode::Right => app.path_input.move_right(),
            KeyCode::Home => app.path_input.move_home(),
            KeyCode::End => app.path_input.move_end(),
            _ => {}
        },
        Modal::None => {}
    }
    Ok(false)
}

fn submit_register(session: &mut Session<JsonStore>, app: &mut App) -> Result<()> {
    let username = app.username_input.content.trim().to_string();
    if username.is_empty() {
        app.set_status("Username must not be empty");
        return Ok(());
    }
    if app.passphrase_input.content.is_empty() {
        app.set_status("Passphrase must not be empty");
        return Ok(());
    }
    if app.passphrase_input.content != app.confirm_input.content {
        app.set_status("Passphrases do not match");
        return Ok(());
    }
    // The quick code is stored as entered; four digits is a convention,
    // not a rule the gate enforces.
    let pin = app.pin_input.content.clone();
    let pin = if pin.is_empty() { None } else { Some(pin) };

    let passphrase = app.passphrase_input.content.clone();
    match session.register(&username, &passphrase, pin) {
        Ok(()) => enter_main(app),
        Err(err) => app.set_status(err.to_string()),
    }
    Ok(())
}

fn submit_login(session: &mut Session<JsonStore>, app: &mut App) -> Result<()> {
    let username = app.username_input.content.trim().to_string();
    if username.is_empty() {
        app.set_status("Username must not be empty");
        return Ok(());
    }
    if app.passphrase_input.content.is_empty() {
        app.set_status("Passphrase must not be empty");
        return Ok(());
    }
    let passphrase = app.passphrase_input.content.clone();
    match session.login(&username, &passphrase) {
        Ok(()) => enter_main(app),
        Err(err) => {
            app.set_status(err.to_string());
            app.passphrase_input.reset();
        }
    }
    Ok(())
}

fn enter_main(app: &mut App) {
    app.screen = Screen::Main;
    app.focus = Focus::List;
    app.status = None;
    app.passphrase_input.reset();
    app.confirm_input.reset();
    app.pin_input.reset();
    app.entries_state.select(Some(0));
}

fn logout_to_login(
    session: &mut Session<JsonStore>,
    journal: &mut Journal<JsonStore>,
    app: &mut App,
) -> Result<()> {
    flush_pending_autosave(journal, app)?;
    session.logout();
    app.screen = Screen::Login;
    app.focus = Focus::List;
    app.auth_field = AuthField::Username;
    app.passphrase_input.reset();
    app.pin_input.reset();
    app.search_input.reset();
    app.active_query = None;
    app.editing_id = None;
    app.entries_state.select(Some(0));
    app.dark_mode = false;
    app.status = None;
    if let Some(username) = session.stored_username()? {
        app.username_input = TextInput::from(username);
    }
    Ok(())
}

fn lock_screen(session: &mut Session<JsonStore>, app: &mut App) {
    match session.lock() {
        Ok(()) => {
            app.screen = Screen::Locked;
            app.pin_input.reset();
            app.status = None;
        }
        Err(err) => app.set_status(err.to_string()),
    }
}

fn current_entry_id(app: &App, journal: &Journal<JsonStore>) -> Option<String> {
    let index = app.entries_state.selected()?;
    app.visible(journal).get(index).map(|entry| entry.id.clone())
}

fn open_editor(journal: &mut Journal<JsonStore>, app: &mut App) -> Result<()> {
    flush_pending_autosave(journal, app)?;
    let Some(id) = current_entry_id(app, journal) else {
        return Ok(());
    };
    let Some(entry) = journal.find(&id) else {
        return Ok(());
    };
    app.editing_id = Some(entry.id.clone());
    app.title_input = TextInput::from(entry.title.clone());
    app.body_editor = make_body_editor(&entry.body);
    app.editor_field = EditorField::Title;
    app.focus = Focus::Editor;
    Ok(())
}

fn leave_editor(journal: &mut Journal<JsonStore>, app: &mut App) -> Result<()> {
    flush_pending_autosave(journal, app)?;
    app.focus = Focus::List;
    Ok(())
}

fn create_entry(journal: &mut Journal<JsonStore>, app: &mut App) -> Result<()> {
    flush_pending_autosave(journal, app)?;
    let entry = journal.create()?;
    app.active_query = None;
    app.search_input.reset();
    app.entries_state.select(Some(0));
    app.editing_id = Some(entry.id);
    app.title_input.reset();
    app.body_editor = make_body_editor("");
    app.editor_field = EditorField::Title;
    app.focus = Focus::Editor;
    app.set_status("Created new entry");
    Ok(())
}

fn delete_selected(journal: &mut Journal<JsonStore>, app: &mut App) -> Result<()> {
    let Some(id) = current_entry_id(app, journal) else {
        return Ok(());
    };
    if app.editing_id.as_deref() == Some(id.as_str()) {
        app.autosave.cancel();
        app.editing_id = None;
        app.focus = Focus::List;
    }
    journal.delete(&id)?;

    // Keep the selection on a valid row after the list shrinks.
    let len = app.visible(journal).len();
    if let Some(selected) = app.entries_state.selected() {
        if len == 0 {
            app.entries_state.select(None);
        } else if selected >= len {
            app.entries_state.select(Some(len - 1));
        }
    }
    app.set_status("Entry deleted");
    Ok(())
}

fn move_selection(journal: &mut Journal<JsonStore>, app: &mut App, movement: Move) -> Result<()> {
    flush_pending_autosave(journal, app)?;
    let len = app.visible(journal).len();
    move_list(&mut app.entries_state, len, movement);
    Ok(())
}

fn schedule_autosave(app: &mut App) {
    if let Some(id) = app.editing_id.clone() {
        app.autosave.schedule(
            Draft {
                entry_id: id,
                title: app.title_input.content.clone(),
                body: app.body_editor.lines().join("\n"),
            },
            Instant::now(),
        );
    }
}

fn flush_due_autosave(journal: &mut Journal<JsonStore>, app: &mut App) -> Result<()> {
    if let Some(draft) = app.autosave.take_due(Instant::now()) {
        journal.update(&draft.entry_id, &draft.title, &draft.body)?;
        app.set_status("Autosaved");
    }
    Ok(())
}

fn flush_pending_autosave(journal: &mut Journal<JsonStore>, app: &mut App) -> Result<()> {
    if let Some(draft) = app.autosave.take_pending() {
        journal.update(&draft.entry_id, &draft.title, &draft.body)?;
    }
    Ok(())
}

fn save_now(journal: &mut Journal<JsonStore>, app: &mut App) -> Result<()> {
    let Some(id) = app.editing_id.clone() else {
        return Ok(());
    };
    app.autosave.cancel();
    let body = app.body_editor.lines().join("\n");
    journal.update(&id, &app.title_input.content, &body)?;
    app.set_status("Saved");
    Ok(())
}

fn export_entries(session: &Session<JsonStore>, journal: &Journal<JsonStore>, app: &mut App) {
    let user = session.profile().map(|profile| profile.username.clone());
    match export_json(user, journal.all()) {
        Ok(document) => match std::fs::write(EXPORT_FILE_NAME, document) {
            Ok(()) => {
                app.set_status(format!(
                    "Exported {} entries to {EXPORT_FILE_NAME}",
                    journal.all().len()
                ));
            }
            Err(err) => app.set_status(format!("Export failed: {err}")),
        },
        Err(err) => app.set_status(format!("Export failed: {err}")),
    }
}

fn import_from(journal: &mut Journal<JsonStore>, app: &mut App, path: &str) {
    match std::fs::read_to_string(path) {
        Ok(contents) => match journal.import(&contents) {
            Ok(added) => {
                app.set_status(format!("Imported {added} new entries"));
                app.entries_state.select(Some(0));
            }
            Err(err) => app.set_status(format!("Import failed: {err}")),
        },
        Err(err) => app.set_status(format!("Import failed: {err}")),
    }
}

#[derive(Debug, Clone, Copy)]
enum Move {
    Up,
    Down,
    PageUp,
    PageDown,
    First,
    Last,
}

fn move_list(state: &mut ListState, len: usize, movement: Move) {
    match movement {
        Move::Up => App::select_prev(state, len),
        Move::Down => App::select_next(state, len),
        Move::PageUp => App::select_page_up(state),
        Move::PageDown => App::select_page_down(state, len),
        Move::First => App::select_first(state),
        Move::Last => App::select_last(state, len),
    }
}

struct Theme {
    background: Color,
    text: Color,
    accent: Color,
    muted: Color,
}

fn theme(app: &App) -> Theme {
    if app.dark_mode {
        Theme {
            background: Color::Black,
            text: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
        }
    } else {
        Theme {
            background: Color::Reset,
            text: Color::Reset,
            accent: Color::Yellow,
            muted: Color::DarkGray,
        }
    }
}

fn render_app(
    frame: &mut Frame,
    app: &App,
    session: &Session<JsonStore>,
    journal: &Journal<JsonStore>,
) {
    let size = frame.size();
    let theme = theme(app);
    frame.render_widget(
        Block::default().style(Style::default().bg(theme.background).fg(theme.text)),
        size,
    );

    match app.screen {
        Screen::Register => render_register(frame, size, app, &theme),
        Screen::Login => render_login(frame, size, app, &theme),
        Screen::Locked => render_locked(frame, size, app, &theme),
        Screen::Main => render_main(frame, size, app, session, journal, &theme),
    }
}

fn render_register(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Welcome to Daylog");

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .margin(1)
        .split(popup_area);

    let intro =
        Paragraph::new("No account yet. Create one to start journaling:").wrap(Wrap { trim: true });
    frame.render_widget(intro, chunks[0]);

    render_form_field(
        frame,
        chunks[1],
        "Username",
        &app.username_input.content,
        app.auth_field == AuthField::Username,
        theme,
    );
    render_form_field(
        frame,
        chunks[2],
        "Passphrase",
        &mask(&app.passphrase_input.content),
        app.auth_field == AuthField::Passphrase,
        theme,
    );
    render_form_field(
        frame,
        chunks[3],
        "Confirm passphrase",
        &mask(&app.confirm_input.content),
        app.auth_field == AuthField::Confirm,
        theme,
    );
    render_form_field(
        frame,
        chunks[4],
        "Quick code (optional, 4 digits)",
        &mask(&app.pin_input.content),
        app.auth_field == AuthField::Pin,
        theme,
    );

    render_auth_footer(
        frame,
        chunks[5],
        app,
        "Tab: Next Field | Enter: Register | Esc: Quit",
        theme,
    );

    let (field_area, cursor) = match app.auth_field {
        AuthField::Username => (chunks[1], app.username_input.cursor),
        AuthField::Passphrase => (chunks[2], app.passphrase_input.content.chars().count()),
        AuthField::Confirm => (chunks[3], app.confirm_input.content.chars().count()),
        AuthField::Pin => (chunks[4], app.pin_input.content.chars().count()),
    };
    set_field_cursor(frame, field_area, cursor);

    frame.render_widget(block, popup_area);
}

fn render_login(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let popup_area = centered_rect(60, 50, area);
    frame.render_widget(Clear, popup_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Sign in to Daylog");

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .margin(1)
        .split(popup_area);

    let intro = Paragraph::new("Enter your credentials:").wrap(Wrap { trim: true });
    frame.render_widget(intro, chunks[0]);

    render_form_field(
        frame,
        chunks[1],
        "Username",
        &app.username_input.content,
        app.auth_field == AuthField::Username,
        theme,
    );
    render_form_field(
        frame,
        chunks[2],
        "Passphrase",
        &mask(&app.passphrase_input.content),
        app.auth_field == AuthField::Passphrase,
        theme,
    );

    render_auth_footer(frame, chunks[3], app, "Tab: Next Field | Enter: Login | Esc: Quit", theme);

    let (field_area, cursor) = match app.auth_field {
        AuthField::Passphrase => (chunks[2], app.passphrase_input.content.chars().count()),
        _ => (chunks[1], app.username_input.cursor),
    };
    set_field_cursor(frame, field_area, cursor);

    frame.render_widget(block, popup_area);
}

fn render_locked(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let popup_area = centered_rect(50, 40, area);
    frame.render_widget(Clear, popup_area);
    let block = Block::default().borders(Borders::ALL).title("Locked");

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .margin(1)
        .split(popup_area);

    let intro = Paragraph::new("Enter your quick code to continue:").wrap(Wrap { trim: true });
    frame.render_widget(intro, chunks[0]);

    render_form_field(
        frame,
        chunks[1],
        "Quick code",
        &mask(&app.pin_input.content),
        true,
        theme,
    );

    render_auth_footer(frame, chunks[2], app, "Enter: Unlock | Esc: Log Out", theme);
    set_field_cursor(frame, chunks[1], app.pin_input.content.chars().count());

    frame.render_widget(block, popup_area);
}

fn render_main(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    session: &Session<JsonStore>,
    journal: &Journal<JsonStore>,
    theme: &Theme,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let username = session
        .profile()
        .map(|profile| profile.username.as_str())
        .unwrap_or("unknown");
    let header = Paragraph::new(format!(
        "{username} | {} entries | {}",
        journal.all().len(),
        app.data_path.display()
    ))
    .block(Block::default().borders(Borders::ALL).title("Daylog"));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(chunks[1]);

    render_entry_list(frame, body[0], app, journal, theme);
    if app.focus == Focus::Editor {
        render_editor(frame, body[1], app, theme);
    } else {
        render_entry_detail(frame, body[1], app, journal, theme);
    }

    render_guide_bar(frame, chunks[2], app, theme);

    if app.searching {
        render_search_popup(frame, app, theme);
    }
    match app.modal {
        Modal::ConfirmDelete => render_confirm_delete_popup(frame, area, app, journal, theme),
        Modal::ImportPath => render_import_popup(frame, area, app, theme),
        Modal::None => {}
    }
}

fn render_entry_list(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    journal: &Journal<JsonStore>,
    theme: &Theme,
) {
    let items = app
        .visible(journal)
        .iter()
        .map(|entry| {
            let title = dl_utils::list_title(&entry.title, &entry.body);
            ListItem::new(format!("{}  {title}", entry.updated.format("%Y-%m-%d")))
        })
        .collect::<Vec<_>>();
    let list_block = Block::default()
        .borders(Borders::ALL)
        .title(if let Some(query) = &app.active_query {
            format!("Entries (Search: {query})")
        } else {
            "Entries".into()
        })
        .border_style(if app.focus == Focus::List {
            Style::default().fg(theme.accent)
        } else {
            Style::default()
        });
    let list = List::new(items)
        .block(list_block)
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, area, &mut app.entries_state.clone());
}

fn render_entry_detail(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    journal: &Journal<JsonStore>,
    theme: &Theme,
) {
    let detail = match app
        .entries_state
        .selected()
        .and_then(|i| app.visible(journal).get(i).copied())
    {
        Some(entry) => {
            let mut lines = Vec::new();
            lines.push(Line::from(Span::styled(
                dl_utils::display_title(&entry.title),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(format!(
                "Created {}  Updated {}",
                entry.created.format("%Y-%m-%d %H:%M"),
                entry.updated.format("%Y-%m-%d %H:%M")
            )));
            lines.push(Line::from(""));
            lines.push(Line::from(dl_utils::preview(&entry.body, 100)));
            lines.push(Line::from(""));
            lines.push(Line::from(format!(
                "{} words | {} characters | {} min read",
                dl_utils::word_count(&entry.body),
                dl_utils::char_count(&entry.body),
                dl_utils::reading_time_minutes(&entry.body)
            )));
            lines
        }
        None => vec![Line::from("No entry selected")],
    };

    let detail_block = Block::default()
        .borders(Borders::ALL)
        .title("Details")
        .border_style(if app.focus == Focus::Editor {
            Style::default().fg(theme.accent)
        } else {
            Style::default()
        });
    let detail_p = Paragraph::new(detail)
        .block(detail_block)
        .wrap(Wrap { trim: true });

    frame.render_widget(detail_p, area);
}

fn render_editor(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let title_style = if app.editor_field == EditorField::Title {
        Style::default().fg(theme.accent)
    } else {
        Style::default()
    };
    let title = Paragraph::new(app.title_input.content.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Title")
            .border_style(title_style),
    );
    frame.render_widget(title, chunks[0]);

    if app.editor_field == EditorField::Title {
        let cx = chunks[0].x
            + 1
            + (app.title_input.cursor as u16).min(chunks[0].width.saturating_sub(3));
        frame.set_cursor(cx, chunks[0].y + 1);
    }

    // The text area paints its own cursor.
    frame.render_widget(app.body_editor.widget(), chunks[1]);

    let body = app.body_editor.lines().join("\n");
    let stats = Paragraph::new(format!(
        "{} words | {} characters | {} min read",
        dl_utils::word_count(&body),
        dl_utils::char_count(&body),
        dl_utils::reading_time_minutes(&body)
    ))
    .style(Style::default().fg(theme.muted));
    frame.render_widget(stats, chunks[2]);
}

fn render_guide_bar(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    if let Some((status, _)) = &app.status {
        let status = Paragraph::new(status.as_str())
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(theme.accent));
        frame.render_widget(status, area);
        return;
    }

    let hints = get_key_hints(app);
    let spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, desc)| {
            vec![
                Span::styled(
                    format!(" [{key}] "),
                    Style::default().add_modifier(Modifier::BOLD).fg(theme.accent),
                ),
                Span::raw(format!("{desc}  ")),
            ]
        })
        .collect();

    let guide = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Guide"));
    frame.render_widget(guide, area);
}

fn get_key_hints(app: &App) -> Vec<(&'static str, &'static str)> {
    if app.searching {
        return vec![("Enter", "Search"), ("Esc", "Clear")];
    }
    match app.modal {
        Modal::ConfirmDelete => return vec![("y", "Delete"), ("n", "Cancel")],
        Modal::ImportPath => return vec![("Enter", "Import"), ("Esc", "Cancel")],
        Modal::None => {}
    }
    if app.focus == Focus::Editor {
        return vec![("Ctrl+S", "Save"), ("Tab", "Title/Body"), ("Esc", "Back")];
    }

    vec![
        ("j/k", "Nav"),
        ("Enter", "Edit"),
        ("n", "New"),
        ("d", "Delete"),
        ("/", "Search"),
        ("x", "Export"),
        ("i", "Import"),
        ("L", "Lock"),
        ("m", "Theme"),
        ("Esc", "Log Out"),
        ("q", "Quit"),
    ]
}

fn render_search_popup(frame: &mut Frame, app: &App, theme: &Theme) {
    let area = centered_rect(60, 20, frame.size());
    let r = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)].as_ref())
        .split(area);

    frame.render_widget(Clear, r[0]);

    let input_block = Block::default()
        .borders(Borders::ALL)
        .title("Search")
        .style(Style::default().fg(theme.accent));
    let input = Paragraph::new(app.search_input.content.as_str())
        .style(Style::default().fg(theme.accent))
        .block(input_block);
    frame.render_widget(input, r[0]);

    let cx = r[0].x + 1 + (app.search_input.cursor as u16).min(r[0].width.saturating_sub(3));
    frame.set_cursor(cx, r[0].y + 1);
}

fn render_confirm_delete_popup(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    journal: &Journal<JsonStore>,
    theme: &Theme,
) {
    let popup_area = centered_rect(60, 20, area);
    frame.render_widget(Clear, popup_area);
    let block = Block::default().borders(Borders::ALL).title("Confirm Delete");

    let title = app
        .entries_state
        .selected()
        .and_then(|i| app.visible(journal).get(i).copied())
        .map(|entry| dl_utils::display_title(&entry.title))
        .unwrap_or_else(|| "this entry".into());
    let message = format!("Delete \"{title}\"?\n\nThis cannot be undone.");

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)].as_ref())
        .margin(1)
        .split(popup_area);

    let text = Paragraph::new(message).wrap(Wrap { trim: true });
    frame.render_widget(text, chunks[0]);

    let help = Paragraph::new("y: Delete | n/Esc: Cancel").style(Style::default().fg(theme.muted));
    frame.render_widget(help, chunks[1]);

    frame.render_widget(block, popup_area);
}

fn render_import_popup(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let popup_area = centered_rect(70, 20, area);
    frame.render_widget(Clear, popup_area);
    let block = Block::default().borders(Borders::ALL).title("Import Entries");

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .margin(1)
        .split(popup_area);

    let text = Paragraph::new("Path to an exported JSON document:").wrap(Wrap { trim: true });
    frame.render_widget(text, chunks[0]);

    let input_widget = Paragraph::new(app.path_input.content.as_str())
        .block(Block::default().borders(Borders::ALL).title("Path"));
    frame.render_widget(input_widget, chunks[1]);

    let cx = chunks[1].x
        + 1
        + (app.path_input.cursor as u16).min(chunks[1].width.saturating_sub(3));
    frame.set_cursor(cx, chunks[1].y + 1);

    let help =
        Paragraph::new("Enter: Import | Esc: Cancel").style(Style::default().fg(theme.muted));
    frame.render_widget(help, chunks[2]);

    frame.render_widget(block, popup_area);
}

fn render_form_field(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    value: &str,
    focused: bool,
    theme: &Theme,
) {
    let style = if focused {
        Style::default().fg(theme.accent)
    } else {
        Style::default()
    };
    let field = Paragraph::new(value).block(
        Block::default()
            .borders(Borders::ALL)
            .title(label)
            .border_style(style),
    );
    frame.render_widget(field, area);
}

fn render_auth_footer(frame: &mut Frame, area: Rect, app: &App, hint: &str, theme: &Theme) {
    let footer = match &app.status {
        Some((status, _)) => Paragraph::new(status.as_str()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(hint).style(Style::default().fg(theme.muted)),
    };
    frame.render_widget(footer, area);
}

fn set_field_cursor(frame: &mut Frame, area: Rect, cursor: usize) {
    let cx = area.x + 1 + (cursor as u16).min(area.width.saturating_sub(3));
    frame.set_cursor(cx, area.y + 1);
}

fn mask(text: &str) -> String {
    "•".repeat(text.chars().count())
}

fn make_body_editor(body: &str) -> TextArea<'static> {
    let mut editor = if body.is_empty() {
        TextArea::default()
    } else {
        TextArea::from(body.lines())
    };
    editor.set_block(Block::default().borders(Borders::ALL).title("Body"));
    editor.set_cursor_line_style(Style::default());
    editor
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn restore_terminal(
    mut terminal: Terminal<ratatui::backend::CrosstermBackend<Stdout>>,
) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
