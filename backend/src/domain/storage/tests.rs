//! Gateway routing checks against mocked ports.
//!
//! Broader behaviour against a shared fake backend lives in
//! `tests/storage_gateway_behaviour.rs`.

use std::sync::Arc;

use chrono::Utc;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    MockConnectionProbe, MockMovieRepository, MockPlatformRepository, MockUserRepository,
    MockWatchlistRepository,
};
use crate::domain::{MediaType, Movie, NewMovie, NewUser, User};

fn tier_with_users(name: &'static str, users: MockUserRepository) -> StorageTier {
    StorageTier::new(
        name,
        Arc::new(users),
        Arc::new(MockMovieRepository::new()),
        Arc::new(MockPlatformRepository::new()),
        Arc::new(MockWatchlistRepository::new()),
    )
}

fn tier_with_movies(name: &'static str, movies: MockMovieRepository) -> StorageTier {
    StorageTier::new(
        name,
        Arc::new(MockUserRepository::new()),
        Arc::new(movies),
        Arc::new(MockPlatformRepository::new()),
        Arc::new(MockWatchlistRepository::new()),
    )
}

fn monitor(reachable: bool) -> Arc<ConnectionHealthMonitor> {
    let mut probe = MockConnectionProbe::new();
    probe.expect_ping().returning(move || {
        if reachable {
            Ok(())
        } else {
            Err(PersistenceError::connection("connection refused"))
        }
    });
    Arc::new(ConnectionHealthMonitor::new(Arc::new(probe)))
}

fn stored_user(id: i32, new_user: &NewUser) -> User {
    User {
        id,
        username: new_user.username.clone(),
        password: new_user.password.clone(),
        display_name: new_user.display_name.clone(),
        created_at: Utc::now(),
        environment: new_user.environment.clone(),
    }
}

#[fixture]
fn alice() -> NewUser {
    NewUser::new("alice", "hashed-secret").expect("valid user")
}

#[rstest]
#[tokio::test]
async fn orm_conflict_surfaces_duplicate_username(alice: NewUser) {
    let mut users = MockUserRepository::new();
    users
        .expect_insert()
        .times(1)
        .returning(|_| Err(PersistenceError::unique_violation("users_username_lower_key")));
    let gateway = StorageGateway::new(tier_with_users(ORM_TIER, users), monitor(true));

    let error = gateway.create_user(alice).await.expect_err("duplicate");

    assert_eq!(error, StorageError::duplicate_username("alice"));
}

#[rstest]
#[tokio::test]
async fn orm_data_error_surfaces_query_failed(alice: NewUser) {
    let mut users = MockUserRepository::new();
    users
        .expect_insert()
        .returning(|_| Err(PersistenceError::query("value too long for type character varying")));
    let gateway = StorageGateway::new(tier_with_users(ORM_TIER, users), monitor(true));

    let error = gateway.create_user(alice).await.expect_err("query failure");

    assert!(error.is_query_failed());
}

#[rstest]
#[tokio::test]
async fn untagged_user_receives_gateway_environment(alice: NewUser) {
    let mut users = MockUserRepository::new();
    users
        .expect_insert()
        .withf(|user| user.environment.as_deref() == Some("test"))
        .returning(|user| Ok(stored_user(1, user)));
    let gateway = StorageGateway::new(tier_with_users(ORM_TIER, users), monitor(true))
        .with_environment(DeploymentEnvironment::Test);

    let created = gateway.create_user(alice).await.expect("created");

    assert_eq!(created.environment.as_deref(), Some("test"));
}

#[rstest]
#[tokio::test]
async fn connection_failure_in_production_routes_to_emergency_tier(alice: NewUser) {
    let mut orm_users = MockUserRepository::new();
    orm_users
        .expect_insert()
        .returning(|_| Err(PersistenceError::connection("connection refused")));
    let mut raw_users = MockUserRepository::new();
    raw_users.expect_insert().never();
    let mut emergency_users = MockUserRepository::new();
    emergency_users
        .expect_insert()
        .times(1)
        .returning(|user| Ok(stored_user(-2, user)));

    let gateway = StorageGateway::new(tier_with_users(ORM_TIER, orm_users), monitor(false))
        .with_raw_fallback(tier_with_users(RAW_SQL_TIER, raw_users))
        .with_emergency_tier(tier_with_users(EMERGENCY_TIER, emergency_users))
        .with_environment(DeploymentEnvironment::Production);

    let created = gateway.create_user(alice).await.expect("emergency user");

    assert_eq!(created.id, -2);
    assert!(gateway.is_degraded());
}

#[rstest]
#[case(DeploymentEnvironment::Development)]
#[case(DeploymentEnvironment::Test)]
#[tokio::test]
async fn emergency_tier_is_ignored_outside_production(
    alice: NewUser,
    #[case] environment: DeploymentEnvironment,
) {
    let mut orm_users = MockUserRepository::new();
    orm_users
        .expect_insert()
        .returning(|_| Err(PersistenceError::connection("connection refused")));
    let mut raw_users = MockUserRepository::new();
    raw_users
        .expect_insert()
        .times(1)
        .returning(|_| Err(PersistenceError::connection("connection refused")));
    let mut emergency_users = MockUserRepository::new();
    emergency_users.expect_insert().never();

    let gateway = StorageGateway::new(tier_with_users(ORM_TIER, orm_users), monitor(false))
        .with_raw_fallback(tier_with_users(RAW_SQL_TIER, raw_users))
        .with_emergency_tier(tier_with_users(EMERGENCY_TIER, emergency_users))
        .with_environment(environment);

    let error = gateway.create_user(alice).await.expect_err("unreachable");

    assert!(!gateway.emergency_tier_active());
    assert!(error.is_connection_failure());
}

#[rstest]
#[tokio::test]
async fn raw_conflict_after_connection_failure_is_duplicate(alice: NewUser) {
    let mut orm_users = MockUserRepository::new();
    orm_users
        .expect_insert()
        .returning(|_| Err(PersistenceError::connection("server closed the connection")));
    let mut raw_users = MockUserRepository::new();
    raw_users
        .expect_insert()
        .returning(|_| Err(PersistenceError::unique_violation("users_username_lower_key")));

    let gateway = StorageGateway::new(tier_with_users(ORM_TIER, orm_users), monitor(true))
        .with_raw_fallback(tier_with_users(RAW_SQL_TIER, raw_users));

    let error = gateway.create_user(alice).await.expect_err("duplicate");

    assert!(error.is_duplicate_username());
}

fn production_gateway(orm: MockUserRepository, emergency: MockUserRepository) -> StorageGateway {
    StorageGateway::new(tier_with_users(ORM_TIER, orm), monitor(true))
        .with_emergency_tier(tier_with_users(EMERGENCY_TIER, emergency))
        .with_environment(DeploymentEnvironment::Production)
}

#[rstest]
#[tokio::test]
async fn emergency_range_ids_skip_relational_tiers(alice: NewUser) {
    let mut orm_users = MockUserRepository::new();
    orm_users.expect_find_by_id().never();
    let mut emergency_users = MockUserRepository::new();
    emergency_users
        .expect_find_by_id()
        .withf(|id| *id == -2)
        .times(1)
        .returning(move |id| Ok(Some(stored_user(id, &alice))));

    let gateway = production_gateway(orm_users, emergency_users);

    assert_eq!(gateway.get_user(-2).await.map(|u| u.id), Some(-2));
}

#[rstest]
#[tokio::test]
async fn relational_ids_never_reach_emergency_tier() {
    let mut orm_users = MockUserRepository::new();
    orm_users
        .expect_find_by_id()
        .returning(|_| Err(PersistenceError::connection("connection refused")));
    let mut emergency_users = MockUserRepository::new();
    emergency_users.expect_find_by_id().never();

    let gateway = production_gateway(orm_users, emergency_users);

    assert!(gateway.get_user(1).await.is_none());
}

#[rstest]
#[case::seeded_guest(-1, GUEST_USERNAME, false)]
#[case::registered_during_outage(-2, "bob", true)]
#[tokio::test]
async fn healthy_miss_only_sees_emergency_registrations(
    #[case] id: i32,
    #[case] username: &'static str,
    #[case] visible: bool,
) {
    let mut orm_users = MockUserRepository::new();
    orm_users.expect_find_by_username().returning(|_| Ok(None));
    let mut emergency_users = MockUserRepository::new();
    emergency_users.expect_find_by_username().returning(move |_| {
        let user = NewUser::new(username, "pw").expect("valid user");
        Ok(Some(stored_user(id, &user)))
    });

    let gateway = production_gateway(orm_users, emergency_users);

    assert_eq!(gateway.get_user_by_username(username).await.is_some(), visible);
}

#[rstest]
#[tokio::test]
async fn reads_degrade_to_none_when_every_tier_fails() {
    let failing = || {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|_| Err(PersistenceError::connection("connection reset by peer")));
        users
    };
    let gateway = StorageGateway::new(tier_with_users(ORM_TIER, failing()), monitor(false))
        .with_raw_fallback(tier_with_users(RAW_SQL_TIER, failing()));

    assert!(gateway.get_user(1).await.is_none());
}

fn fight_club(id: i32) -> Movie {
    let new_movie = NewMovie::new(550, "Fight Club", MediaType::Movie);
    Movie {
        id,
        tmdb_id: new_movie.tmdb_id,
        title: new_movie.title,
        overview: None,
        poster_path: None,
        backdrop_path: None,
        release_date: Some("1999-10-15".into()),
        vote_average: Some(8.4),
        genres: vec!["Drama".into()],
        media_type: MediaType::Movie,
        runtime: Some(139),
        number_of_seasons: None,
        number_of_episodes: None,
    }
}

#[rstest]
#[tokio::test]
async fn movie_conflict_returns_existing_row() {
    let mut movies = MockMovieRepository::new();
    movies
        .expect_insert()
        .returning(|_| Err(PersistenceError::unique_violation("movies_tmdb_id_key")));
    movies
        .expect_find_by_tmdb_id()
        .returning(|_| Ok(Some(fight_club(9))));
    let gateway = StorageGateway::new(tier_with_movies(ORM_TIER, movies), monitor(true));

    let movie = gateway
        .create_movie(NewMovie::new(550, "Fight Club", MediaType::Movie))
        .await
        .expect("existing movie");

    assert_eq!(movie.id, 9);
}

#[rstest]
#[tokio::test]
async fn movie_conflict_without_visible_row_is_duplicate_tmdb_id() {
    let mut movies = MockMovieRepository::new();
    movies
        .expect_insert()
        .returning(|_| Err(PersistenceError::unique_violation("movies_tmdb_id_key")));
    movies.expect_find_by_tmdb_id().returning(|_| Ok(None));
    let gateway = StorageGateway::new(tier_with_movies(ORM_TIER, movies), monitor(true));

    let error = gateway
        .create_movie(NewMovie::new(550, "Fight Club", MediaType::Movie))
        .await
        .expect_err("duplicate");

    assert_eq!(error, StorageError::duplicate_tmdb_id(550));
}

#[rstest]
fn persistence_errors_translate_to_storage_errors() {
    assert_eq!(
        StorageError::from_persistence("get_user", PersistenceError::connection("refused")),
        StorageError::connection_failure("refused")
    );
    assert_eq!(
        StorageError::from_persistence("update_user", PersistenceError::query("bad column")),
        StorageError::query_failed("update_user", "bad column")
    );
}
