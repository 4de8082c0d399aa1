//! Test utilities shared by unit tests (in `src/`) and integration tests
//! (in `tests/`).
//!
//! [`FakeDatabase`] stands in for PostgreSQL: every tier built from it sees
//! the same rows and the same uniqueness rules, while failures can be
//! injected per tier to exercise the gateway's fallback paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::ports::{
    ConnectionProbe, MovieRepository, PersistenceError, PlatformRepository, UserRepository,
    WatchlistRepository,
};
use crate::domain::storage::{ORM_TIER, RAW_SQL_TIER};
use crate::domain::{
    ConnectionHealthMonitor, Movie, NewMovie, NewPlatform, NewUser, NewWatchlistEntry, Platform,
    PlatformUpdate, StorageGateway, StorageTier, User, UserUpdate, WatchlistEntry,
    WatchlistEntryUpdate,
};

/// Failure a tier reports.
///
/// `Connection` and `Query` fail before touching the rows. `LostAck` lets
/// reads through and applies inserts, then reports a connection error as
/// if the acknowledgement never arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Connection-class error, as when the backend is down.
    Connection,
    /// Data-class error, as when a statement is rejected.
    Query,
    /// Connection dropped after the insert committed.
    LostAck,
}

impl Failure {
    fn to_error(self, tier: &str) -> PersistenceError {
        match self {
            Self::Connection => PersistenceError::connection(format!("{tier}: connection refused")),
            Self::Query => PersistenceError::query(format!("{tier}: syntax error at or near \"FROM\"")),
            Self::LostAck => PersistenceError::connection(format!("{tier}: connection reset by peer")),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    next_id: HashMap<&'static str, i32>,
    users: BTreeMap<i32, User>,
    movies: BTreeMap<i32, Movie>,
    platforms: BTreeMap<i32, Platform>,
    entries: BTreeMap<i32, WatchlistEntry>,
    failures: HashMap<&'static str, Failure>,
    race_next_insert: bool,
    reachable: bool,
    calls: Vec<(&'static str, &'static str)>,
}

impl State {
    fn allocate(&mut self, table: &'static str) -> i32 {
        let next = self.next_id.entry(table).or_insert(0);
        *next += 1;
        *next
    }
}

/// Shared in-memory relational backend.
#[derive(Clone, Debug)]
pub struct FakeDatabase {
    state: Arc<Mutex<State>>,
}

impl Default for FakeDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDatabase {
    /// An empty, reachable backend.
    pub fn new() -> Self {
        let state = State {
            reachable: true,
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call on `tier` fail with `failure`.
    pub fn fail_tier(&self, tier: &'static str, failure: Failure) {
        self.state().failures.insert(tier, failure);
    }

    pub fn heal_tier(&self, tier: &'static str) {
        self.state().failures.remove(tier);
    }

    /// Set what the health probe reports.
    pub fn set_reachable(&self, reachable: bool) {
        self.state().reachable = reachable;
    }

    /// Simulate losing an insert race: the next insert stores its row as if
    /// a concurrent caller won, then reports a unique violation.
    pub fn race_next_insert(&self) {
        self.state().race_next_insert = true;
    }

    /// `(tier, operation)` pairs in call order.
    pub fn calls(&self) -> Vec<(&'static str, &'static str)> {
        self.state().calls.clone()
    }

    /// Number of calls to `operation` on `tier`.
    pub fn count(&self, tier: &str, operation: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|(t, op)| *t == tier && *op == operation)
            .count()
    }

    pub fn user_count(&self) -> usize {
        self.state().users.len()
    }

    pub fn movie_count(&self) -> usize {
        self.state().movies.len()
    }

    pub fn entry_count(&self) -> usize {
        self.state().entries.len()
    }

    /// A tier view named `name` over the shared rows.
    pub fn tier(&self, name: &'static str) -> StorageTier {
        StorageTier::uniform(
            name,
            Arc::new(FakeTier {
                name,
                db: self.clone(),
            }),
        )
    }

    /// Health probe answering from [`Self::set_reachable`].
    pub fn probe(&self) -> Arc<dyn ConnectionProbe> {
        Arc::new(FakeProbe { db: self.clone() })
    }

    /// Gateway with ORM and raw SQL tiers over this backend.
    pub fn gateway(&self) -> StorageGateway {
        StorageGateway::new(
            self.tier(ORM_TIER),
            Arc::new(ConnectionHealthMonitor::new(self.probe())),
        )
        .with_raw_fallback(self.tier(RAW_SQL_TIER))
    }

    /// Record a call and apply any injected failure.
    fn enter(
        &self,
        tier: &'static str,
        operation: &'static str,
    ) -> Result<MutexGuard<'_, State>, PersistenceError> {
        let mut state = self.state();
        state.calls.push((tier, operation));
        let failure = state.failures.get(tier).copied();
        match failure {
            Some(Failure::LostAck) | None => Ok(state),
            Some(failure) => Err(failure.to_error(tier)),
        }
    }
}

/// Report the outcome of an insert whose row is already stored.
fn acknowledge<T>(
    state: &mut State,
    tier: &'static str,
    constraint: &'static str,
    row: T,
) -> Result<T, PersistenceError> {
    if std::mem::take(&mut state.race_next_insert) {
        return Err(PersistenceError::unique_violation(constraint));
    }
    match state.failures.get(tier) {
        Some(Failure::LostAck) => Err(Failure::LostAck.to_error(tier)),
        _ => Ok(row),
    }
}

struct FakeTier {
    name: &'static str,
    db: FakeDatabase,
}

struct FakeProbe {
    db: FakeDatabase,
}

#[async_trait]
impl ConnectionProbe for FakeProbe {
    async fn ping(&self) -> Result<(), PersistenceError> {
        if self.db.state().reachable {
            Ok(())
        } else {
            Err(PersistenceError::connection("connection refused"))
        }
    }
}

#[async_trait]
impl UserRepository for FakeTier {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, PersistenceError> {
        let state = self.db.enter(self.name, "find_user_by_id")?;
        Ok(state.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, PersistenceError> {
        let state = self.db.enter(self.name, "find_user_by_username")?;
        Ok(state
            .users
            .values()
            .find(|user| user.has_username(username))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, PersistenceError> {
        let state = self.db.enter(self.name, "list_users")?;
        Ok(state.users.values().cloned().collect())
    }

    async fn insert(&self, user: &NewUser) -> Result<User, PersistenceError> {
        let mut state = self.db.enter(self.name, "insert_user")?;
        if state.users.values().any(|existing| existing.has_username(&user.username)) {
            return Err(PersistenceError::unique_violation("users_username_lower_key"));
        }
        let id = state.allocate("users");
        let created = User {
            id,
            username: user.username.clone(),
            password: user.password.clone(),
            display_name: user.display_name.clone(),
            created_at: Utc::now(),
            environment: user.environment.clone(),
        };
        state.users.insert(id, created.clone());
        acknowledge(&mut state, self.name, "users_username_lower_key", created)
    }

    async fn update(
        &self,
        id: i32,
        changes: &UserUpdate,
    ) -> Result<Option<User>, PersistenceError> {
        let mut state = self.db.enter(self.name, "update_user")?;
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(password) = &changes.password {
            user.password.clone_from(password);
        }
        if let Some(display_name) = &changes.display_name {
            user.display_name.clone_from(display_name);
        }
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl MovieRepository for FakeTier {
    async fn find_by_id(&self, id: i32) -> Result<Option<Movie>, PersistenceError> {
        let state = self.db.enter(self.name, "find_movie_by_id")?;
        Ok(state.movies.get(&id).cloned())
    }

    async fn find_by_tmdb_id(&self, tmdb_id: i32) -> Result<Option<Movie>, PersistenceError> {
        let state = self.db.enter(self.name, "find_movie_by_tmdb_id")?;
        Ok(state
            .movies
            .values()
            .find(|movie| movie.tmdb_id == tmdb_id)
            .cloned())
    }

    async fn insert(&self, movie: &NewMovie) -> Result<Movie, PersistenceError> {
        let mut state = self.db.enter(self.name, "insert_movie")?;
        if state.movies.values().any(|existing| existing.tmdb_id == movie.tmdb_id) {
            return Err(PersistenceError::unique_violation("movies_tmdb_id_key"));
        }
        let id = state.allocate("movies");
        let created = Movie {
            id,
            tmdb_id: movie.tmdb_id,
            title: movie.title.clone(),
            overview: movie.overview.clone(),
            poster_path: movie.poster_path.clone(),
            backdrop_path: movie.backdrop_path.clone(),
            release_date: movie.release_date.clone(),
            vote_average: movie.vote_average,
            genres: movie.genres.clone(),
            media_type: movie.media_type,
            runtime: movie.runtime,
            number_of_seasons: movie.number_of_seasons,
            number_of_episodes: movie.number_of_episodes,
        };
        state.movies.insert(id, created.clone());
        acknowledge(&mut state, self.name, "movies_tmdb_id_key", created)
    }
}

#[async_trait]
impl PlatformRepository for FakeTier {
    async fn find_by_id(&self, id: i32) -> Result<Option<Platform>, PersistenceError> {
        let state = self.db.enter(self.name, "find_platform_by_id")?;
        Ok(state.platforms.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<Platform>, PersistenceError> {
        let state = self.db.enter(self.name, "list_platforms")?;
        Ok(state
            .platforms
            .values()
            .filter(|platform| platform.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, platform: &NewPlatform) -> Result<Platform, PersistenceError> {
        let mut state = self.db.enter(self.name, "insert_platform")?;
        let id = state.allocate("platforms");
        let created = Platform {
            id,
            user_id: platform.user_id,
            name: platform.name.clone(),
            logo_url: platform.logo_url.clone(),
            is_default: platform.is_default,
            created_at: Utc::now(),
        };
        state.platforms.insert(id, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: i32,
        changes: &PlatformUpdate,
    ) -> Result<Option<Platform>, PersistenceError> {
        let mut state = self.db.enter(self.name, "update_platform")?;
        let Some(platform) = state.platforms.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            platform.name.clone_from(name);
        }
        if let Some(logo_url) = &changes.logo_url {
            platform.logo_url.clone_from(logo_url);
        }
        if let Some(is_default) = changes.is_default {
            platform.is_default = is_default;
        }
        Ok(Some(platform.clone()))
    }

    async fn delete(&self, id: i32) -> Result<bool, PersistenceError> {
        let mut state = self.db.enter(self.name, "delete_platform")?;
        if state.platforms.remove(&id).is_none() {
            return Ok(false);
        }
        for entry in state.entries.values_mut() {
            if entry.platform_id == Some(id) {
                entry.platform_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl WatchlistRepository for FakeTier {
    async fn find_by_id(&self, id: i32) -> Result<Option<WatchlistEntry>, PersistenceError> {
        let state = self.db.enter(self.name, "find_watchlist_entry_by_id")?;
        Ok(state.entries.get(&id).cloned())
    }

    async fn find_for_pair(
        &self,
        user_id: i32,
        movie_id: i32,
    ) -> Result<Option<WatchlistEntry>, PersistenceError> {
        let state = self.db.enter(self.name, "find_watchlist_entry_for_pair")?;
        Ok(state
            .entries
            .values()
            .find(|entry| entry.user_id == user_id && entry.movie_id == movie_id)
            .cloned())
    }

    async fn exists_for_pair(
        &self,
        user_id: i32,
        movie_id: i32,
    ) -> Result<bool, PersistenceError> {
        let state = self.db.enter(self.name, "watchlist_entry_exists")?;
        Ok(state
            .entries
            .values()
            .any(|entry| entry.user_id == user_id && entry.movie_id == movie_id))
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<WatchlistEntry>, PersistenceError> {
        let state = self.db.enter(self.name, "list_watchlist_entries")?;
        let mut entries: Vec<_> = state
            .entries
            .values()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn insert(&self, entry: &NewWatchlistEntry) -> Result<WatchlistEntry, PersistenceError> {
        let mut state = self.db.enter(self.name, "insert_watchlist_entry")?;
        if state
            .entries
            .values()
            .any(|e| e.user_id == entry.user_id && e.movie_id == entry.movie_id)
        {
            return Err(PersistenceError::unique_violation(
                "watchlist_entries_user_id_movie_id_key",
            ));
        }
        let id = state.allocate("watchlist_entries");
        let created = WatchlistEntry {
            id,
            user_id: entry.user_id,
            movie_id: entry.movie_id,
            platform_id: entry.platform_id,
            status: entry.status,
            watched_date: entry.watched_date,
            notes: entry.notes.clone(),
            created_at: Utc::now(),
        };
        state.entries.insert(id, created.clone());
        acknowledge(
            &mut state,
            self.name,
            "watchlist_entries_user_id_movie_id_key",
            created,
        )
    }

    async fn update(
        &self,
        id: i32,
        changes: &WatchlistEntryUpdate,
    ) -> Result<Option<WatchlistEntry>, PersistenceError> {
        let mut state = self.db.enter(self.name, "update_watchlist_entry")?;
        let Some(entry) = state.entries.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(status) = changes.status {
            entry.status = status;
        }
        if let Some(platform_id) = changes.platform_id {
            entry.platform_id = platform_id;
        }
        if let Some(watched_date) = changes.watched_date {
            entry.watched_date = watched_date;
        }
        if let Some(notes) = &changes.notes {
            entry.notes.clone_from(notes);
        }
        Ok(Some(entry.clone()))
    }

    async fn delete(&self, id: i32) -> Result<bool, PersistenceError> {
        let mut state = self.db.enter(self.name, "delete_watchlist_entry")?;
        Ok(state.entries.remove(&id).is_some())
    }
}
