//! Core domain entities, rules, and traits for Daylog.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors returned by the auth gate, import parsing, and storage.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Returned by register when a profile already exists.
    #[error("an account is already registered")]
    AlreadyRegistered,
    /// Returned by login when no profile has been registered.
    #[error("no account is registered")]
    NoAccount,
    /// Returned by login when the username or passphrase mismatches.
    #[error("invalid username or passphrase")]
    InvalidCredentials,
    /// Returned by lock when the profile has no quick code.
    #[error("no quick code is configured")]
    NoQuickCodeConfigured,
    /// Returned by unlock when the code mismatches the stored one.
    #[error("wrong quick code")]
    WrongCode,
    /// Returned when an imported document cannot be used.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    /// Returned when the storage substrate fails.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

/// Hex-encoded SHA-256 digest of a passphrase.
///
/// Unsalted and single-round: it keeps the passphrase itself out of the
/// stored profile, nothing more. Anyone who can read the disk can read
/// every entry anyway.
pub fn digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// The single stored account.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Profile {
    /// Registered username.
    pub username: String,
    /// Hex digest of the registered passphrase.
    #[serde(rename = "passHash")]
    pub pass_hash: String,
    /// Optional quick-unlock code.
    #[serde(default)]
    pub pin: Option<String>,
    /// Registration timestamp.
    pub created: DateTime<Utc>,
}

/// One journal entry.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Entry {
    /// Unique identifier, a millisecond timestamp rendered as text.
    pub id: String,
    /// Entry title, may be empty.
    #[serde(default)]
    pub title: String,
    /// Entry body, may be empty.
    #[serde(default)]
    pub body: String,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// Last-modified timestamp, never earlier than `created`.
    pub updated: DateTime<Utc>,
}

/// Storage abstraction over the two persisted records.
///
/// `load_*` returns `Ok(None)` when a record has never been saved;
/// substrate failures map to [`CoreError::StorageUnavailable`].
pub trait DiaryStore {
    /// Fetch the account profile, if one was ever saved.
    fn load_profile(&self) -> CoreResult<Option<Profile>>;
    /// Persist the account profile.
    fn save_profile(&self, profile: &Profile) -> CoreResult<()>;
    /// Fetch the entry collection, if one was ever saved.
    fn load_entries(&self) -> CoreResult<Option<Vec<Entry>>>;
    /// Persist the entry collection, order included.
    fn save_entries(&self, entries: &[Entry]) -> CoreResult<()>;
}

/// The ordered entry collection, synchronized to its store on every
/// mutation. The front of the list is the newest entry.
#[derive(Debug)]
pub struct Journal<S: DiaryStore> {
    store: S,
    entries: Vec<Entry>,
}

impl<S: DiaryStore> Journal<S> {
    /// Open the journal, loading the stored collection (empty if absent).
    pub fn open(store: S) -> CoreResult<Self> {
        let entries = store.load_entries()?.unwrap_or_default();
        Ok(Self { store, entries })
    }

    /// Create an empty entry at the front of the collection and persist.
    pub fn create(&mut self) -> CoreResult<Entry> {
        let now = Utc::now();
        let entry = Entry {
            id: self.next_id(now),
            title: String::new(),
            body: String::new(),
            created: now,
            updated: now,
        };
        self.entries.insert(0, entry.clone());
        self.store.save_entries(&self.entries)?;
        Ok(entry)
    }

    fn next_id(&self, now: DateTime<Utc>) -> String {
        let mut millis = now.timestamp_millis();
        let mut id = millis.to_string();
        // Same-millisecond creations bump forward until the id is free.
        while self.entries.iter().any(|entry| entry.id == id) {
            millis += 1;
            id = millis.to_string();
        }
        id
    }

    /// Overwrite title and body of the entry with the given id.
    ///
    /// A no-op when the id is unknown; nothing is written in that case.
    pub fn update(&mut self, id: &str, title: &str, body: &str) -> CoreResult<()> {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return Ok(());
        };
        entry.title = title.to_string();
        entry.body = body.to_string();
        // Keeps `updated >= created` even if the wall clock stepped back.
        entry.updated = Utc::now().max(entry.created);
        self.store.save_entries(&self.entries)
    }

    /// Remove the entry with the given id, if present, and persist.
    pub fn delete(&mut self, id: &str) -> CoreResult<()> {
        self.entries.retain(|entry| entry.id != id);
        self.store.save_entries(&self.entries)
    }

    /// Look up a single entry by id.
    pub fn find(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// All entries in display order, newest first.
    pub fn all(&self) -> &[Entry] {
        &self.entries
    }

    /// Case-insensitive substring search over title and body.
    ///
    /// An empty or whitespace-only query returns every entry unfiltered.
    pub fn search(&self, query: &str) -> Vec<&Entry> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.entries.iter().collect();
        }
        self.entries
            .iter()
            .filter(|entry| {
                entry.title.to_lowercase().contains(&query)
                    || entry.body.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Merge an exported document into the collection.
    ///
    /// Entries whose id already exists locally are dropped (the local
    /// copy wins); survivors are prepended in document order. Returns
    /// how many entries were added.
    pub fn import(&mut self, text: &str) -> CoreResult<usize> {
        let incoming = parse_import(text)?;
        let mut merged: Vec<Entry> = Vec::new();
        for entry in incoming {
            let taken = self.entries.iter().any(|local| local.id == entry.id)
                || merged.iter().any(|queued| queued.id == entry.id);
            if !taken {
                merged.push(entry);
            }
        }
        let count = merged.len();
        merged.append(&mut self.entries);
        self.entries = merged;
        self.store.save_entries(&self.entries)?;
        Ok(count)
    }
}

/// Auth progression for the single local account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    /// No profile has been registered yet.
    Unregistered,
    /// A profile exists but nobody is authenticated.
    LoggedOut,
    /// Credentials verified; the journal is accessible.
    Unlocked,
    /// Re-entry requires the quick code.
    Locked,
}

/// The auth gate: validates credentials against the stored profile and
/// tracks the session's position in the state machine.
///
/// This gates the interactive surface only. The records on disk are
/// cleartext, so there is deliberately no rate limiting or lockout.
#[derive(Debug)]
pub struct Session<S: DiaryStore> {
    store: S,
    state: AuthState,
    profile: Option<Profile>,
}

impl<S: DiaryStore> Session<S> {
    /// Start a session, deriving the initial state from the store.
    pub fn new(store: S) -> CoreResult<Self> {
        let state = if store.load_profile()?.is_some() {
            AuthState::LoggedOut
        } else {
            AuthState::Unregistered
        };
        Ok(Self {
            store,
            state,
            profile: None,
        })
    }

    /// Current position in the auth state machine.
    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Whether the journal is currently accessible.
    pub fn is_unlocked(&self) -> bool {
        self.state == AuthState::Unlocked
    }

    /// Profile of the authenticated user, present while logged in.
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// The registered username, if a profile exists at all.
    pub fn stored_username(&self) -> CoreResult<Option<String>> {
        Ok(self.store.load_profile()?.map(|profile| profile.username))
    }

    /// Register the single account and unlock the session.
    pub fn register(
        &mut self,
        username: &str,
        passphrase: &str,
        pin: Option<String>,
    ) -> CoreResult<()> {
        if self.store.load_profile()?.is_some() {
            return Err(CoreError::AlreadyRegistered);
        }
        let profile = Profile {
            username: username.to_string(),
            pass_hash: digest(passphrase),
            pin,
            created: Utc::now(),
        };
        self.store.save_profile(&profile)?;
        self.profile = Some(profile);
        self.state = AuthState::Unlocked;
        Ok(())
    }

    /// Verify credentials against the stored profile and unlock.
    pub fn login(&mut self, username: &str, passphrase: &str) -> CoreResult<()> {
        let Some(profile) = self.store.load_profile()? else {
            return Err(CoreError::NoAccount);
        };
        if profile.username != username || profile.pass_hash != digest(passphrase) {
            return Err(CoreError::InvalidCredentials);
        }
        self.profile = Some(profile);
        self.state = AuthState::Unlocked;
        Ok(())
    }

    /// Put the session behind the quick code. A no-op unless unlocked.
    pub fn lock(&mut self) -> CoreResult<()> {
        if self.state != AuthState::Unlocked {
            return Ok(());
        }
        let has_pin = self
            .profile
            .as_ref()
            .is_some_and(|profile| profile.pin.is_some());
        if !has_pin {
            return Err(CoreError::NoQuickCodeConfigured);
        }
        self.state = AuthState::Locked;
        Ok(())
    }

    /// Re-enter a locked session with the quick code. A no-op unless
    /// locked; the state stays locked on a wrong code.
    pub fn unlock_with_code(&mut self, code: &str) -> CoreResult<()> {
        if self.state != AuthState::Locked {
            return Ok(());
        }
        let stored = self.profile.as_ref().and_then(|profile| profile.pin.as_deref());
        if stored != Some(code) {
            return Err(CoreError::WrongCode);
        }
        self.state = AuthState::Unlocked;
        Ok(())
    }

    /// Drop the authenticated profile and return to the login gate.
    pub fn logout(&mut self) {
        self.profile = None;
        self.state = AuthState::LoggedOut;
    }
}

/// Delay between the last edit and the autosave flush.
pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(2000);

/// An unsaved editor state waiting to be flushed into the journal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Draft {
    /// Id of the entry the draft belongs to.
    pub entry_id: String,
    /// Draft title.
    pub title: String,
    /// Draft body.
    pub body: String,
}

/// Cancellable deferred task that coalesces a burst of edits into one
/// flush. Single-threaded and cooperative: the owner pumps
/// [`Autosave::take_due`] from its tick loop, so nothing fires between
/// ticks.
#[derive(Debug)]
pub struct Autosave {
    delay: Duration,
    pending: Option<(Draft, Instant)>,
}

impl Autosave {
    /// Scheduler with the standard delay.
    pub fn new() -> Self {
        Self::with_delay(AUTOSAVE_DELAY)
    }

    /// Scheduler with a custom delay.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replace any pending draft and restart the countdown.
    pub fn schedule(&mut self, draft: Draft, now: Instant) {
        self.pending = Some((draft, now + self.delay));
    }

    /// Discard the pending draft, if any. Explicit saves call this so a
    /// stale draft cannot fire after the fresh write.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Take the pending draft once its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<Draft> {
        let due = self.pending.as_ref().map(|(_, due)| *due)?;
        if due <= now {
            self.pending.take().map(|(draft, _)| draft)
        } else {
            None
        }
    }

    /// Take the pending draft regardless of its deadline. Used to flush
    /// before the selection moves away from the drafted entry.
    pub fn take_pending(&mut self) -> Option<Draft> {
        self.pending.take().map(|(draft, _)| draft)
    }

    /// Whether a draft is waiting to be flushed.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for Autosave {
    fn default() -> Self {
        Self::new()
    }
}

/// Conventional file name for export artifacts.
pub const EXPORT_FILE_NAME: &str = "diary_backup.json";

/// The transportable backup document.
#[derive(Debug, Deserialize, Serialize)]
pub struct ExportDocument {
    /// Export metadata.
    pub meta: ExportMeta,
    /// Username of the exporting account, if any.
    pub user: Option<String>,
    /// The full entry collection, order preserved.
    pub entries: Vec<Entry>,
}

/// Metadata attached to an export.
#[derive(Debug, Deserialize, Serialize)]
pub struct ExportMeta {
    /// When the export was produced.
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
}

/// Render the export document for a user and collection as pretty JSON.
pub fn export_json(user: Option<String>, entries: &[Entry]) -> CoreResult<String> {
    let document = ExportDocument {
        meta: ExportMeta {
            exported_at: Utc::now(),
        },
        user,
        entries: entries.to_vec(),
    };
    serde_json::to_string_pretty(&document)
        .map_err(|err| CoreError::StorageUnavailable(err.to_string()))
}

/// Pull the entry array out of an imported document.
///
/// Only the shape of `entries` is enforced, plus the typing the decode
/// itself imposes: elements must carry `id`, `created`, and `updated`,
/// while a missing `title` or `body` becomes empty text.
fn parse_import(text: &str) -> CoreResult<Vec<Entry>> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| CoreError::InvalidDocument(err.to_string()))?;
    let entries = value
        .get("entries")
        .cloned()
        .ok_or_else(|| CoreError::InvalidDocument("missing entries field".into()))?;
    if !entries.is_array() {
        return Err(CoreError::InvalidDocument("entries is not an array".into()));
    }
    serde_json::from_value(entries).map_err(|err| CoreError::InvalidDocument(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct MemStore {
        profile: Rc<RefCell<Option<Profile>>>,
        entries: Rc<RefCell<Option<Vec<Entry>>>>,
        entry_saves: Rc<Cell<usize>>,
    }

    impl DiaryStore for MemStore {
        fn load_profile(&self) -> CoreResult<Option<Profile>> {
            Ok(self.profile.borrow().clone())
        }

        fn save_profile(&self, profile: &Profile) -> CoreResult<()> {
            *self.profile.borrow_mut() = Some(profile.clone());
            Ok(())
        }

        fn load_entries(&self) -> CoreResult<Option<Vec<Entry>>> {
            Ok(self.entries.borrow().clone())
        }

        fn save_entries(&self, entries: &[Entry]) -> CoreResult<()> {
            self.entry_saves.set(self.entry_saves.get() + 1);
            *self.entries.borrow_mut() = Some(entries.to_vec());
            Ok(())
        }
    }

    fn entry(id: &str, title: &str, body: &str) -> Entry {
        let now = Utc::now();
        Entry {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            created: now,
            updated: now,
        }
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(digest("correct horse"), digest("correct horse"));
        assert_ne!(digest("correct horse"), digest("correct horsf"));
    }

    #[test]
    fn digest_matches_known_vectors() {
        assert_eq!(
            digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn register_then_login() {
        let store = MemStore::default();
        let mut session = Session::new(store.clone()).unwrap();
        assert_eq!(session.state(), AuthState::Unregistered);

        session.register("mira", "hunter2", None).unwrap();
        assert_eq!(session.state(), AuthState::Unlocked);

        let mut second = Session::new(store).unwrap();
        assert_eq!(second.state(), AuthState::LoggedOut);
        second.login("mira", "hunter2").unwrap();
        assert!(second.is_unlocked());
        assert_eq!(second.profile().unwrap().username, "mira");
    }

    #[test]
    fn login_rejects_bad_credentials() {
        let store = MemStore::default();
        let mut session = Session::new(store.clone()).unwrap();
        assert!(matches!(
            session.login("mira", "hunter2"),
            Err(CoreError::NoAccount)
        ));

        session.register("mira", "hunter2", None).unwrap();
        let mut second = Session::new(store).unwrap();
        assert!(matches!(
            second.login("mira", "wrong"),
            Err(CoreError::InvalidCredentials)
        ));
        assert!(matches!(
            second.login("nils", "hunter2"),
            Err(CoreError::InvalidCredentials)
        ));
        assert_eq!(second.state(), AuthState::LoggedOut);
    }

    #[test]
    fn register_twice_fails() {
        let store = MemStore::default();
        let mut session = Session::new(store.clone()).unwrap();
        session.register("mira", "hunter2", None).unwrap();

        let mut second = Session::new(store).unwrap();
        assert!(matches!(
            second.register("nils", "other", None),
            Err(CoreError::AlreadyRegistered)
        ));
    }

    #[test]
    fn quick_code_lock_cycle() {
        let store = MemStore::default();
        let mut session = Session::new(store).unwrap();
        session
            .register("mira", "hunter2", Some("1234".into()))
            .unwrap();

        session.lock().unwrap();
        assert_eq!(session.state(), AuthState::Locked);

        assert!(matches!(
            session.unlock_with_code("0000"),
            Err(CoreError::WrongCode)
        ));
        assert_eq!(session.state(), AuthState::Locked);

        session.unlock_with_code("1234").unwrap();
        assert_eq!(session.state(), AuthState::Unlocked);
    }

    #[test]
    fn lock_without_pin_fails() {
        let store = MemStore::default();
        let mut session = Session::new(store).unwrap();
        session.register("mira", "hunter2", None).unwrap();

        assert!(matches!(
            session.lock(),
            Err(CoreError::NoQuickCodeConfigured)
        ));
        assert_eq!(session.state(), AuthState::Unlocked);
    }

    #[test]
    fn logout_returns_to_the_gate() {
        let store = MemStore::default();
        let mut session = Session::new(store).unwrap();
        session.register("mira", "hunter2", None).unwrap();

        session.logout();
        assert_eq!(session.state(), AuthState::LoggedOut);
        assert!(session.profile().is_none());
    }

    #[test]
    fn create_inserts_at_front_with_unique_ids() {
        let store = MemStore::default();
        let mut journal = Journal::open(store).unwrap();
        let first = journal.create().unwrap();
        let second = journal.create().unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(journal.all()[0].id, second.id);
        assert_eq!(journal.all()[1].id, first.id);
        assert!(second.title.is_empty() && second.body.is_empty());
    }

    #[test]
    fn update_rewrites_content_and_timestamp() {
        let store = MemStore::default();
        let mut journal = Journal::open(store).unwrap();
        let id = journal.create().unwrap().id;

        journal.update(&id, "Trip", "Went to the lake").unwrap();
        let entry = journal.find(&id).unwrap();
        assert_eq!(entry.title, "Trip");
        assert_eq!(entry.body, "Went to the lake");
        assert!(entry.updated >= entry.created);
    }

    #[test]
    fn update_unknown_id_writes_nothing() {
        let store = MemStore::default();
        let mut journal = Journal::open(store.clone()).unwrap();
        journal.create().unwrap();
        let saves = store.entry_saves.get();

        journal.update("missing", "t", "b").unwrap();
        assert_eq!(store.entry_saves.get(), saves);
    }

    #[test]
    fn delete_missing_id_keeps_collection() {
        let store = MemStore::default();
        let mut journal = Journal::open(store).unwrap();
        let id = journal.create().unwrap().id;

        journal.delete("missing").unwrap();
        assert_eq!(journal.all().len(), 1);
        assert!(journal.find(&id).is_some());
    }

    #[test]
    fn delete_removes_entry() {
        let store = MemStore::default();
        let mut journal = Journal::open(store).unwrap();
        let id = journal.create().unwrap().id;

        journal.delete(&id).unwrap();
        assert!(journal.all().is_empty());
        assert!(journal.find(&id).is_none());
    }

    #[test]
    fn search_matches_title_or_body_case_insensitively() {
        let store = MemStore::default();
        store
            .save_entries(&[
                entry("1", "Lake Trip", ""),
                entry("2", "", "Bought a new LAKE house"),
                entry("3", "Groceries", "milk and eggs"),
            ])
            .unwrap();
        let journal = Journal::open(store).unwrap();

        let hits = journal.search("lake");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "1");
        assert_eq!(hits[1].id, "2");

        assert!(journal.search("volcano").is_empty());
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let store = MemStore::default();
        store
            .save_entries(&[entry("1", "a", ""), entry("2", "b", "")])
            .unwrap();
        let journal = Journal::open(store).unwrap();

        let all = journal.search("   ");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "1");
        assert_eq!(all[1].id, "2");
    }

    #[test]
    fn import_merges_by_id_and_prepends() {
        let store = MemStore::default();
        store.save_entries(&[entry("1", "local", "kept")]).unwrap();
        let mut journal = Journal::open(store).unwrap();

        let document = json!({
            "meta": { "exportedAt": "2024-01-01T00:00:00Z" },
            "user": "mira",
            "entries": [
                {
                    "id": "1",
                    "title": "remote",
                    "body": "must not win",
                    "created": "2024-01-01T00:00:00Z",
                    "updated": "2024-01-01T00:00:00Z"
                },
                {
                    "id": "2",
                    "title": "new",
                    "body": "",
                    "created": "2024-01-02T00:00:00Z",
                    "updated": "2024-01-02T00:00:00Z"
                }
            ]
        });

        let added = journal.import(&document.to_string()).unwrap();
        assert_eq!(added, 1);
        assert_eq!(journal.all()[0].id, "2");
        assert_eq!(journal.all()[1].id, "1");
        assert_eq!(journal.all()[1].title, "local");
    }

    #[test]
    fn import_drops_duplicates_within_the_document() {
        let store = MemStore::default();
        let mut journal = Journal::open(store).unwrap();

        let document = json!({
            "entries": [
                {
                    "id": "7",
                    "title": "first",
                    "created": "2024-01-01T00:00:00Z",
                    "updated": "2024-01-01T00:00:00Z"
                },
                {
                    "id": "7",
                    "title": "second",
                    "created": "2024-01-01T00:00:00Z",
                    "updated": "2024-01-01T00:00:00Z"
                }
            ]
        });

        let added = journal.import(&document.to_string()).unwrap();
        assert_eq!(added, 1);
        assert_eq!(journal.all()[0].title, "first");
    }

    #[test]
    fn import_rejects_malformed_documents() {
        let store = MemStore::default();
        store.save_entries(&[entry("1", "safe", "")]).unwrap();
        let mut journal = Journal::open(store).unwrap();

        for text in [
            "not json at all",
            "{}",
            r#"{"entries": 5}"#,
            r#"{"entries": [{"title": "no id"}]}"#,
        ] {
            assert!(matches!(
                journal.import(text),
                Err(CoreError::InvalidDocument(_))
            ));
        }
        assert_eq!(journal.all().len(), 1);
    }

    #[test]
    fn import_defaults_missing_title_and_body() {
        let store = MemStore::default();
        let mut journal = Journal::open(store).unwrap();

        let document = json!({
            "entries": [{
                "id": "9",
                "created": "2024-01-01T00:00:00Z",
                "updated": "2024-01-01T00:00:00Z"
            }]
        });

        assert_eq!(journal.import(&document.to_string()).unwrap(), 1);
        let imported = journal.find("9").unwrap();
        assert!(imported.title.is_empty());
        assert!(imported.body.is_empty());
    }

    #[test]
    fn export_document_shape() {
        let entries = vec![entry("1", "Trip", "lake")];
        let text = export_json(Some("mira".into()), &entries).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert!(value["meta"]["exportedAt"].is_string());
        assert_eq!(value["user"], json!("mira"));
        assert_eq!(value["entries"][0]["id"], json!("1"));

        let anonymous = export_json(None, &entries).unwrap();
        let value: Value = serde_json::from_str(&anonymous).unwrap();
        assert!(value["user"].is_null());
    }

    #[test]
    fn autosave_coalesces_edits_into_the_last_draft() {
        let mut autosave = Autosave::new();
        let start = Instant::now();
        let draft = |body: &str| Draft {
            entry_id: "1".into(),
            title: "t".into(),
            body: body.into(),
        };

        autosave.schedule(draft("W"), start);
        autosave.schedule(draft("We"), start + Duration::from_millis(300));
        autosave.schedule(draft("Wen"), start + Duration::from_millis(600));

        assert!(autosave
            .take_due(start + Duration::from_millis(2599))
            .is_none());
        let flushed = autosave
            .take_due(start + Duration::from_millis(2600))
            .unwrap();
        assert_eq!(flushed.body, "Wen");
        assert!(autosave.take_due(start + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn autosave_flushes_exactly_one_write() {
        let store = MemStore::default();
        let mut journal = Journal::open(store.clone()).unwrap();
        let id = journal.create().unwrap().id;
        let mut autosave = Autosave::new();
        let start = Instant::now();

        for (offset, body) in [(0u64, "W"), (200, "We"), (400, "Went")] {
            autosave.schedule(
                Draft {
                    entry_id: id.clone(),
                    title: "Trip".into(),
                    body: body.into(),
                },
                start + Duration::from_millis(offset),
            );
        }

        let before = store.entry_saves.get();
        for tick in 0..30u64 {
            let now = start + Duration::from_millis(tick * 100);
            if let Some(draft) = autosave.take_due(now) {
                journal
                    .update(&draft.entry_id, &draft.title, &draft.body)
                    .unwrap();
            }
        }

        assert_eq!(store.entry_saves.get(), before + 1);
        assert_eq!(journal.find(&id).unwrap().body, "Went");
    }

    #[test]
    fn explicit_save_cancels_the_pending_draft() {
        let mut autosave = Autosave::new();
        let start = Instant::now();
        autosave.schedule(
            Draft {
                entry_id: "1".into(),
                title: String::new(),
                body: "draft".into(),
            },
            start,
        );

        autosave.cancel();
        assert!(!autosave.is_pending());
        assert!(autosave.take_due(start + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn take_pending_flushes_early() {
        let mut autosave = Autosave::new();
        let start = Instant::now();
        autosave.schedule(
            Draft {
                entry_id: "1".into(),
                title: String::new(),
                body: "draft".into(),
            },
            start,
        );

        let draft = autosave.take_pending().unwrap();
        assert_eq!(draft.body, "draft");
        assert!(!autosave.is_pending());
    }

    #[test]
    fn reopening_the_journal_sees_saved_content() {
        let store = MemStore::default();
        let mut journal = Journal::open(store.clone()).unwrap();
        let id = journal.create().unwrap().id;
        journal.update(&id, "Trip", "Went to the lake").unwrap();

        let reopened = Journal::open(store).unwrap();
        let entry = reopened.find(&id).unwrap();
        assert_eq!(entry.title, "Trip");
        assert_eq!(entry.body, "Went to the lake");
        assert!(entry.updated >= entry.created);
    }
}
