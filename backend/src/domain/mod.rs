//! Domain primitives, ports, and the tiered storage gateway.
//!
//! Purpose: Define the watchlist entities and the storage contract that
//! callers use. Relational and in-memory adapters live under `outbound` and
//! plug in through the traits in [`ports`].
//!
//! Public surface:
//! - DomainError: caller-facing error payload.
//! - User, Movie, Platform, WatchlistEntry: persisted entities.
//! - StorageGateway: tiered, fault-tolerant storage access.
//! - ConnectionHealthMonitor: single-flight backend reachability checks.

pub mod environment;
pub mod error;
pub mod health;
pub mod movie;
pub mod platform;
pub mod ports;
pub mod storage;
pub mod user;
pub mod watchlist;

pub use self::environment::{DeploymentEnvironment, ParseEnvironmentError};
pub use self::error::{DomainError, DomainErrorValidationError, ErrorCode};
pub use self::health::ConnectionHealthMonitor;
pub use self::movie::{MediaType, Movie, NewMovie, ParseMediaTypeError};
pub use self::platform::{NewPlatform, Platform, PlatformUpdate};
pub use self::storage::{StorageError, StorageGateway, StorageTier};
pub use self::user::{NewUser, User, UserUpdate, UserValidationError, username_key};
pub use self::watchlist::{
    NewWatchlistEntry, ParseWatchStatusError, WatchStatus, WatchlistEntry, WatchlistEntryUpdate,
    WatchlistItem,
};

/// Convenient result alias for caller-facing operations.
///
/// # Examples
/// ```
/// use watchlist::domain::{DomainResult, DomainError};
///
/// fn lookup() -> DomainResult<()> {
///     Err(DomainError::not_found("watchlist entry 7 not found"))
/// }
///
/// assert!(lookup().is_err());
/// ```
pub type DomainResult<T> = Result<T, DomainError>;
