//! Emergency in-memory tier.
//!
//! Volatile, process-local maps per entity, used only when the gateway runs
//! in production with this tier enabled and the relational backend is
//! unreachable. Nothing written here is ever copied back to PostgreSQL.
//!
//! Writes log at `warn` with `tier = "emergency"` so operators can spot data
//! that will vanish on restart.
//!
//! Ids count down from -1 so they never collide with relational serials.
//!
//! The gateway only routes user registration and user lookups here. The
//! movie, platform and watchlist maps exist so the store can stand in for a
//! full tier, but no gateway operation reaches them.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use crate::domain::ports::{
    MovieRepository, PersistenceError, PlatformRepository, UserRepository, WatchlistRepository,
};
use crate::domain::storage::EMERGENCY_TIER;
use crate::domain::{
    Movie, NewMovie, NewPlatform, NewUser, NewWatchlistEntry, Platform, PlatformUpdate,
    StorageError, StorageTier, User, UserUpdate, WatchlistEntry, WatchlistEntryUpdate,
    username_key,
};

pub use crate::domain::storage::GUEST_USERNAME;

/// Constraint reported when an emergency user clashes on username.
const USERNAME_CONSTRAINT: &str = "emergency_users_username_key";

#[derive(Debug)]
struct Table<T> {
    last_id: i32,
    rows: BTreeMap<i32, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            last_id: 0,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn allocate(&mut self) -> i32 {
        self.last_id -= 1;
        self.last_id
    }
}

#[derive(Debug, Default)]
struct State {
    users: Table<User>,
    movies: Table<Movie>,
    platforms: Table<Platform>,
    entries: Table<WatchlistEntry>,
}

/// Process-lifetime store for all four entity types.
#[derive(Debug)]
pub struct EmergencyStore {
    state: Mutex<State>,
}

impl Default for EmergencyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EmergencyStore {
    /// A store seeded with the guest user.
    pub fn new() -> Self {
        let mut state = State::default();
        let id = state.users.allocate();
        state.users.rows.insert(
            id,
            User {
                id,
                username: GUEST_USERNAME.to_owned(),
                password: String::new(),
                display_name: Some("Guest".to_owned()),
                created_at: Utc::now(),
                environment: None,
            },
        );
        Self {
            state: Mutex::new(state),
        }
    }

    /// Wrap the store as a gateway tier.
    pub fn into_tier(self: Arc<Self>) -> StorageTier {
        StorageTier::uniform(EMERGENCY_TIER, self)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- users ----------------------------------------------------------

    pub fn get_user(&self, id: i32) -> Option<User> {
        self.state().users.rows.get(&id).cloned()
    }

    /// Case-insensitive username lookup.
    pub fn get_user_by_username(&self, username: &str) -> Option<User> {
        let key = username_key(username);
        self.state()
            .users
            .rows
            .values()
            .find(|user| username_key(&user.username) == key)
            .cloned()
    }

    /// Users in registration order.
    pub fn list_users(&self) -> Vec<User> {
        self.state().users.rows.values().rev().cloned().collect()
    }

    /// Register a user, rejecting a username that differs only in case.
    pub fn create_user(&self, user: &NewUser) -> Result<User, StorageError> {
        let mut state = self.state();
        if state.users.rows.values().any(|existing| existing.has_username(&user.username)) {
            return Err(StorageError::duplicate_username(user.username.as_str()));
        }
        let id = state.users.allocate();
        let created = User {
            id,
            username: user.username.clone(),
            password: user.password.clone(),
            display_name: user.display_name.clone(),
            created_at: Utc::now(),
            environment: user.environment.clone(),
        };
        state.users.rows.insert(id, created.clone());
        warn!(tier = EMERGENCY_TIER, operation = "create_user", id, "user stored in memory only");
        Ok(created)
    }

    pub fn update_user(&self, id: i32, changes: &UserUpdate) -> Option<User> {
        let mut state = self.state();
        let user = state.users.rows.get_mut(&id)?;
        if let Some(password) = &changes.password {
            user.password.clone_from(password);
        }
        if let Some(display_name) = &changes.display_name {
            user.display_name.clone_from(display_name);
        }
        warn!(tier = EMERGENCY_TIER, operation = "update_user", id, "user updated in memory only");
        Some(user.clone())
    }

    // -- movies ---------------------------------------------------------

    pub fn get_movie(&self, id: i32) -> Option<Movie> {
        self.state().movies.rows.get(&id).cloned()
    }

    pub fn get_movie_by_tmdb_id(&self, tmdb_id: i32) -> Option<Movie> {
        self.state()
            .movies
            .rows
            .values()
            .find(|movie| movie.tmdb_id == tmdb_id)
            .cloned()
    }

    /// Store a movie; an existing `tmdb_id` returns the stored row.
    pub fn create_movie(&self, movie: &NewMovie) -> Movie {
        let mut state = self.state();
        if let Some(existing) = state.movies.rows.values().find(|m| m.tmdb_id == movie.tmdb_id) {
            return existing.clone();
        }
        let id = state.movies.allocate();
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
        state.movies.rows.insert(id, created.clone());
        warn!(tier = EMERGENCY_TIER, operation = "create_movie", id, tmdb_id = movie.tmdb_id, "movie stored in memory only");
        created
    }

    // -- platforms ------------------------------------------------------

    pub fn get_platform(&self, id: i32) -> Option<Platform> {
        self.state().platforms.rows.get(&id).cloned()
    }

    pub fn get_platforms(&self, user_id: i32) -> Vec<Platform> {
        self.state()
            .platforms
            .rows
            .values()
            .rev()
            .filter(|platform| platform.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn create_platform(&self, platform: &NewPlatform) -> Platform {
        let mut state = self.state();
        let id = state.platforms.allocate();
        let created = Platform {
            id,
            user_id: platform.user_id,
            name: platform.name.clone(),
            logo_url: platform.logo_url.clone(),
            is_default: platform.is_default,
            created_at: Utc::now(),
        };
        state.platforms.rows.insert(id, created.clone());
        warn!(tier = EMERGENCY_TIER, operation = "create_platform", id, "platform stored in memory only");
        created
    }

    pub fn update_platform(&self, id: i32, changes: &PlatformUpdate) -> Option<Platform> {
        let mut state = self.state();
        let platform = state.platforms.rows.get_mut(&id)?;
        if let Some(name) = &changes.name {
            platform.name.clone_from(name);
        }
        if let Some(logo_url) = &changes.logo_url {
            platform.logo_url.clone_from(logo_url);
        }
        if let Some(is_default) = changes.is_default {
            platform.is_default = is_default;
        }
        warn!(tier = EMERGENCY_TIER, operation = "update_platform", id, "platform updated in memory only");
        Some(platform.clone())
    }

    /// Remove a platform and clear it from entries that referenced it.
    pub fn delete_platform(&self, id: i32) -> bool {
        let mut state = self.state();
        if state.platforms.rows.remove(&id).is_none() {
            return false;
        }
        for entry in state.entries.rows.values_mut() {
            if entry.platform_id == Some(id) {
                entry.platform_id = None;
            }
        }
        warn!(tier = EMERGENCY_TIER, operation = "delete_platform", id, "platform removed from memory");
        true
    }

    // -- watchlist entries ----------------------------------------------

    pub fn get_watchlist_entry(&self, id: i32) -> Option<WatchlistEntry> {
        self.state().entries.rows.get(&id).cloned()
    }

    pub fn find_watchlist_entry(&self, user_id: i32, movie_id: i32) -> Option<WatchlistEntry> {
        self.state()
            .entries
            .rows
            .values()
            .find(|entry| entry.user_id == user_id && entry.movie_id == movie_id)
            .cloned()
    }

    /// Entries for a user, newest first.
    pub fn get_watchlist_entries(&self, user_id: i32) -> Vec<WatchlistEntry> {
        let mut entries: Vec<_> = self
            .state()
            .entries
            .rows
            .values()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect();
        // Later ids are more negative.
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        entries
    }

    /// Track a movie; an existing `(user, movie)` pair returns the stored row.
    pub fn create_watchlist_entry(&self, entry: &NewWatchlistEntry) -> WatchlistEntry {
        let mut state = self.state();
        if let Some(existing) = state
            .entries
            .rows
            .values()
            .find(|e| e.user_id == entry.user_id && e.movie_id == entry.movie_id)
        {
            return existing.clone();
        }
        let id = state.entries.allocate();
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
        state.entries.rows.insert(id, created.clone());
        warn!(tier = EMERGENCY_TIER, operation = "create_watchlist_entry", id, "watchlist entry stored in memory only");
        created
    }

    pub fn update_watchlist_entry(
        &self,
        id: i32,
        changes: &WatchlistEntryUpdate,
    ) -> Option<WatchlistEntry> {
        let mut state = self.state();
        let entry = state.entries.rows.get_mut(&id)?;
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
        warn!(tier = EMERGENCY_TIER, operation = "update_watchlist_entry", id, "watchlist entry updated in memory only");
        Some(entry.clone())
    }

    pub fn delete_watchlist_entry(&self, id: i32) -> bool {
        let removed = self.state().entries.rows.remove(&id).is_some();
        if removed {
            warn!(tier = EMERGENCY_TIER, operation = "delete_watchlist_entry", id, "watchlist entry removed from memory");
        }
        removed
    }
}

#[async_trait]
impl UserRepository for EmergencyStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, PersistenceError> {
        Ok(self.get_user(id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, PersistenceError> {
        Ok(self.get_user_by_username(username))
    }

    async fn list(&self) -> Result<Vec<User>, PersistenceError> {
        Ok(self.list_users())
    }

    async fn insert(&self, user: &NewUser) -> Result<User, PersistenceError> {
        self.create_user(user)
            .map_err(|_| PersistenceError::unique_violation(USERNAME_CONSTRAINT))
    }

    async fn update(
        &self,
        id: i32,
        changes: &UserUpdate,
    ) -> Result<Option<User>, PersistenceError> {
        Ok(self.update_user(id, changes))
    }
}

#[async_trait]
impl MovieRepository for EmergencyStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Movie>, PersistenceError> {
        Ok(self.get_movie(id))
    }

    async fn find_by_tmdb_id(&self, tmdb_id: i32) -> Result<Option<Movie>, PersistenceError> {
        Ok(self.get_movie_by_tmdb_id(tmdb_id))
    }

    async fn insert(&self, movie: &NewMovie) -> Result<Movie, PersistenceError> {
        Ok(self.create_movie(movie))
    }
}

#[async_trait]
impl PlatformRepository for EmergencyStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Platform>, PersistenceError> {
        Ok(self.get_platform(id))
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<Platform>, PersistenceError> {
        Ok(self.get_platforms(user_id))
    }

    async fn insert(&self, platform: &NewPlatform) -> Result<Platform, PersistenceError> {
        Ok(self.create_platform(platform))
    }

    async fn update(
        &self,
        id: i32,
        changes: &PlatformUpdate,
    ) -> Result<Option<Platform>, PersistenceError> {
        Ok(self.update_platform(id, changes))
    }

    async fn delete(&self, id: i32) -> Result<bool, PersistenceError> {
        Ok(self.delete_platform(id))
    }
}

#[async_trait]
impl WatchlistRepository for EmergencyStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<WatchlistEntry>, PersistenceError> {
        Ok(self.get_watchlist_entry(id))
    }

    async fn find_for_pair(
        &self,
        user_id: i32,
        movie_id: i32,
    ) -> Result<Option<WatchlistEntry>, PersistenceError> {
        Ok(self.find_watchlist_entry(user_id, movie_id))
    }

    async fn exists_for_pair(
        &self,
        user_id: i32,
        movie_id: i32,
    ) -> Result<bool, PersistenceError> {
        Ok(self.find_watchlist_entry(user_id, movie_id).is_some())
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<WatchlistEntry>, PersistenceError> {
        Ok(self.get_watchlist_entries(user_id))
    }

    async fn insert(&self, entry: &NewWatchlistEntry) -> Result<WatchlistEntry, PersistenceError> {
        Ok(self.create_watchlist_entry(entry))
    }

    async fn update(
        &self,
        id: i32,
        changes: &WatchlistEntryUpdate,
    ) -> Result<Option<WatchlistEntry>, PersistenceError> {
        Ok(self.update_watchlist_entry(id, changes))
    }

    async fn delete(&self, id: i32) -> Result<bool, PersistenceError> {
        Ok(self.delete_watchlist_entry(id))
    }
}

#[cfg(test)]
mod tests;
