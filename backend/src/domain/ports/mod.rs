//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Every relational tier (Diesel-mapped and raw SQL) implements the same
//! repository traits, so the storage gateway can chain them without knowing
//! which adapter sits behind a trait object.

mod macros;
pub(crate) use macros::define_port_error;

mod connection_probe;
mod movie_repository;
mod persistence_error;
mod platform_repository;
mod user_repository;
mod watchlist_repository;

#[cfg(test)]
pub use connection_probe::MockConnectionProbe;
pub use connection_probe::ConnectionProbe;
#[cfg(test)]
pub use movie_repository::MockMovieRepository;
pub use movie_repository::MovieRepository;
pub use persistence_error::{
    ErrorClass, PersistenceError, classify_message, constraint_name_from_message,
};
#[cfg(test)]
pub use platform_repository::MockPlatformRepository;
pub use platform_repository::PlatformRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::UserRepository;
#[cfg(test)]
pub use watchlist_repository::MockWatchlistRepository;
pub use watchlist_repository::WatchlistRepository;
