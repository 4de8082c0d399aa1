//! Behavioural tests for the tiered storage gateway over a fake backend.
//!
//! Every tier built by [`FakeDatabase`] shares one set of rows, so these
//! tests observe fallback routing through the call log while asserting on
//! the data the caller gets back.

use std::sync::Arc;

use rstest::{fixture, rstest};
use watchlist::domain::storage::{ORM_TIER, RAW_SQL_TIER};
use watchlist::domain::{
    ConnectionHealthMonitor, DeploymentEnvironment, MediaType, NewMovie, NewPlatform, NewUser,
    NewWatchlistEntry, StorageError, StorageGateway, UserUpdate, WatchStatus,
    WatchlistEntryUpdate,
};
use watchlist::outbound::memory::{EmergencyStore, GUEST_USERNAME};
use watchlist::test_support::{Failure, FakeDatabase};

#[fixture]
fn db() -> FakeDatabase {
    FakeDatabase::new()
}

fn fight_club() -> NewMovie {
    NewMovie::new(550, "Fight Club", MediaType::Movie)
}

fn user(username: &str) -> NewUser {
    NewUser::new(username, "secret123").expect("valid user")
}

fn gateway_with_emergency(
    db: &FakeDatabase,
    environment: DeploymentEnvironment,
) -> StorageGateway {
    gateway_with_store(db, environment, Arc::new(EmergencyStore::new()))
}

fn gateway_with_store(
    db: &FakeDatabase,
    environment: DeploymentEnvironment,
    store: Arc<EmergencyStore>,
) -> StorageGateway {
    StorageGateway::new(
        db.tier(ORM_TIER),
        Arc::new(ConnectionHealthMonitor::new(db.probe())),
    )
    .with_raw_fallback(db.tier(RAW_SQL_TIER))
    .with_emergency_tier(store.into_tier())
    .with_environment(environment)
}

fn take_down(db: &FakeDatabase) {
    db.fail_tier(ORM_TIER, Failure::Connection);
    db.fail_tier(RAW_SQL_TIER, Failure::Connection);
    db.set_reachable(false);
}

fn bring_up(db: &FakeDatabase) {
    db.heal_tier(ORM_TIER);
    db.heal_tier(RAW_SQL_TIER);
    db.set_reachable(true);
}

#[rstest]
#[tokio::test]
async fn usernames_are_unique_ignoring_case(db: FakeDatabase) {
    let gateway = db.gateway();

    let alice = gateway.create_user(user("alice")).await.expect("first registration");
    let err = gateway
        .create_user(user("Alice"))
        .await
        .expect_err("case-different username clashes");

    assert!(matches!(err, StorageError::DuplicateUsername { ref username } if username == "Alice"));
    assert_eq!(db.user_count(), 1);
    assert_eq!(
        gateway.get_user_by_username("ALICE").await.map(|u| u.id),
        Some(alice.id)
    );
}

#[rstest]
#[tokio::test]
async fn movie_creation_is_idempotent(db: FakeDatabase) {
    let gateway = db.gateway();

    let first = gateway.create_movie(fight_club()).await.expect("first create");
    let second = gateway.create_movie(fight_club()).await.expect("second create");

    assert_eq!(first.id, second.id);
    assert_eq!(second.title, "Fight Club");
    assert_eq!(db.movie_count(), 1);
}

#[rstest]
#[tokio::test]
async fn watchlist_creation_returns_the_same_entry(db: FakeDatabase) {
    let gateway = db.gateway();
    let alice = gateway.create_user(user("alice")).await.expect("user");
    let movie = gateway.create_movie(fight_club()).await.expect("movie");

    let entry = NewWatchlistEntry::new(alice.id, movie.id).with_notes("great movie");
    let first = gateway
        .create_watchlist_entry(entry.clone())
        .await
        .expect("first create");
    let second = gateway
        .create_watchlist_entry(entry)
        .await
        .expect("second create");

    assert_eq!(first.id, second.id);
    assert_eq!(db.count(ORM_TIER, "insert_watchlist_entry"), 1);

    let items = gateway.get_watchlist_entries(alice.id).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].entry.notes.as_deref(), Some("great movie"));
    assert_eq!(items[0].movie.tmdb_id, 550);
}

#[rstest]
#[tokio::test]
async fn lost_insert_race_resolves_to_the_winning_row(db: FakeDatabase) {
    let gateway = db.gateway();
    db.race_next_insert();

    let entry = gateway
        .create_watchlist_entry(NewWatchlistEntry::new(1, 1))
        .await
        .expect("conflict resolves to existing entry");

    assert_eq!(db.entry_count(), 1);
    assert_eq!(
        gateway.find_watchlist_entry(1, 1).await.map(|e| e.id),
        Some(entry.id)
    );
}

#[rstest]
#[tokio::test]
async fn connection_failure_on_orm_tier_retries_on_raw_tier(db: FakeDatabase) {
    let gateway = db.gateway();
    db.fail_tier(ORM_TIER, Failure::Connection);

    let carol = gateway.create_user(user("carol")).await.expect("raw tier insert");

    assert_eq!(db.count(ORM_TIER, "insert_user"), 1);
    assert_eq!(db.count(RAW_SQL_TIER, "insert_user"), 1);
    assert_eq!(gateway.get_user(carol.id).await.map(|u| u.username), Some("carol".to_owned()));
}

#[rstest]
#[tokio::test]
async fn query_failure_is_not_retried(db: FakeDatabase) {
    let gateway = db.gateway();
    db.fail_tier(ORM_TIER, Failure::Query);

    let err = gateway
        .create_user(user("dave"))
        .await
        .expect_err("query failures surface");

    assert!(err.is_query_failed());
    assert_eq!(db.count(RAW_SQL_TIER, "insert_user"), 0);
}

#[rstest]
#[tokio::test]
async fn reads_degrade_when_every_tier_is_down(db: FakeDatabase) {
    let gateway = db.gateway();
    let movie = gateway.create_movie(fight_club()).await.expect("movie");
    take_down(&db);

    assert!(!gateway.has_watchlist_entry(1, movie.id).await);
    assert!(gateway.get_movie(movie.id).await.is_none());
    assert!(gateway.get_watchlist_entries(1).await.is_empty());
    assert!(gateway.get_platforms(1).await.is_empty());
    assert!(!gateway.delete_platform(1).await);
}

#[rstest]
#[tokio::test]
async fn missing_movie_is_not_an_error(db: FakeDatabase) {
    let gateway = db.gateway();

    assert!(gateway.get_movie(999_999).await.is_none());
    assert!(gateway.get_movie_by_tmdb_id(999_999).await.is_none());
}

#[rstest]
#[tokio::test]
async fn emergency_tier_registers_users_in_production(db: FakeDatabase) {
    let gateway = gateway_with_emergency(&db, DeploymentEnvironment::Production);
    take_down(&db);

    let bob = gateway
        .create_user(NewUser::new("bob", "x").expect("valid user"))
        .await
        .expect("emergency registration");

    assert_eq!(bob.environment.as_deref(), Some("production"));
    assert_eq!(db.count(RAW_SQL_TIER, "insert_user"), 0);
    assert_eq!(
        gateway.get_user_by_username("bob").await.map(|u| u.id),
        Some(bob.id)
    );

    let usernames: Vec<_> = gateway
        .get_all_users()
        .await
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert!(usernames.contains(&GUEST_USERNAME.to_owned()));
    assert!(usernames.contains(&"bob".to_owned()));
    assert!(gateway.is_degraded());
}

#[rstest]
#[case::development(DeploymentEnvironment::Development)]
#[case::test(DeploymentEnvironment::Test)]
#[tokio::test]
async fn emergency_tier_stays_out_of_other_environments(
    db: FakeDatabase,
    #[case] environment: DeploymentEnvironment,
) {
    let gateway = gateway_with_emergency(&db, environment);
    take_down(&db);

    let err = gateway
        .create_user(user("erin"))
        .await
        .expect_err("no tier can take the write");

    assert!(err.is_connection_failure());
    assert!(gateway.get_user_by_username("erin").await.is_none());
}

#[rstest]
#[tokio::test]
async fn entries_with_unresolved_movies_are_dropped(db: FakeDatabase) {
    let gateway = db.gateway();
    let movie = gateway.create_movie(fight_club()).await.expect("movie");
    gateway
        .create_watchlist_entry(NewWatchlistEntry::new(7, movie.id))
        .await
        .expect("resolvable entry");
    gateway
        .create_watchlist_entry(NewWatchlistEntry::new(7, 4242))
        .await
        .expect("dangling entry");

    let items = gateway.get_watchlist_entries(7).await;

    assert_eq!(db.entry_count(), 2);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].movie.id, movie.id);
}

#[rstest]
#[tokio::test]
async fn status_filter_and_watched_stamp(db: FakeDatabase) {
    let gateway = db.gateway();
    let first = gateway.create_movie(fight_club()).await.expect("movie");
    let second = gateway
        .create_movie(NewMovie::new(1399, "Game of Thrones", MediaType::Tv))
        .await
        .expect("show");
    let watched = gateway
        .create_watchlist_entry(NewWatchlistEntry::new(3, first.id))
        .await
        .expect("entry");
    gateway
        .create_watchlist_entry(NewWatchlistEntry::new(3, second.id).with_status(WatchStatus::Watching))
        .await
        .expect("entry");

    let updated = gateway
        .update_watchlist_entry(
            watched.id,
            WatchlistEntryUpdate {
                status: Some(WatchStatus::Watched),
                ..WatchlistEntryUpdate::default()
            },
        )
        .await
        .expect("update");

    assert!(updated.watched_date.is_some());
    let items = gateway
        .get_watchlist_entries_with_status(3, WatchStatus::Watched)
        .await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].entry.id, watched.id);
}

#[rstest]
#[tokio::test]
async fn updating_missing_rows_reports_not_found(db: FakeDatabase) {
    let gateway = db.gateway();

    let entry_err = gateway
        .update_watchlist_entry(
            99,
            WatchlistEntryUpdate {
                notes: Some(Some("nope".to_owned())),
                ..WatchlistEntryUpdate::default()
            },
        )
        .await
        .expect_err("entry is missing");
    let user_err = gateway
        .update_user(99, UserUpdate::default())
        .await
        .expect_err("user is missing");

    assert!(entry_err.is_not_found());
    assert!(user_err.is_not_found());
}

#[rstest]
#[tokio::test]
async fn deleting_a_platform_clears_entry_references(db: FakeDatabase) {
    let gateway = db.gateway();
    let platform = gateway
        .create_platform(NewPlatform::new(5, "Netflix"))
        .await
        .expect("platform");
    let mut entry = NewWatchlistEntry::new(5, 1);
    entry.platform_id = Some(platform.id);
    let entry = gateway.create_watchlist_entry(entry).await.expect("entry");

    assert!(gateway.delete_platform(platform.id).await);
    assert!(gateway.get_platform(platform.id).await.is_none());
    assert_eq!(
        gateway.get_watchlist_entry(entry.id).await.and_then(|e| e.platform_id),
        None
    );
    assert!(!gateway.delete_platform(platform.id).await);
}

#[rstest]
#[tokio::test]
async fn emergency_ids_never_shadow_stored_users(db: FakeDatabase) {
    let gateway = gateway_with_emergency(&db, DeploymentEnvironment::Production);
    let alice = gateway.create_user(user("alice")).await.expect("alice");
    let eve = gateway.create_user(user("eve")).await.expect("eve");
    take_down(&db);

    let bob = gateway.create_user(user("bob")).await.expect("emergency registration");

    assert!(bob.id < 0, "emergency id {} overlaps the serial range", bob.id);
    assert!(gateway.get_user(alice.id).await.is_none());
    assert!(gateway.get_user(eve.id).await.is_none());
    assert_eq!(gateway.get_user(bob.id).await.map(|u| u.username), Some("bob".to_owned()));

    bring_up(&db);

    assert_eq!(gateway.get_user(alice.id).await.map(|u| u.username), Some("alice".to_owned()));
    assert_eq!(gateway.get_user(bob.id).await.map(|u| u.id), Some(bob.id));
    assert_eq!(gateway.get_user_by_username("bob").await.map(|u| u.id), Some(bob.id));
}

#[rstest]
#[tokio::test]
async fn guest_account_is_hidden_once_the_backend_recovers(db: FakeDatabase) {
    let gateway = gateway_with_emergency(&db, DeploymentEnvironment::Production);

    assert!(gateway.get_user_by_username(GUEST_USERNAME).await.is_none());
    assert!(gateway.get_user_by_username("nobody").await.is_none());

    take_down(&db);
    assert!(gateway.get_user_by_username(GUEST_USERNAME).await.is_some());

    bring_up(&db);
    assert!(gateway.get_user_by_username(GUEST_USERNAME).await.is_none());
}

#[rstest]
#[tokio::test]
async fn emergency_tier_never_takes_catalogue_writes(db: FakeDatabase) {
    let store = Arc::new(EmergencyStore::new());
    let gateway = gateway_with_store(&db, DeploymentEnvironment::Production, store.clone());
    take_down(&db);

    let movie_err = gateway
        .create_movie(fight_club())
        .await
        .expect_err("no relational tier can take the movie");
    let platform_err = gateway
        .create_platform(NewPlatform::new(1, "Netflix"))
        .await
        .expect_err("no relational tier can take the platform");
    let entry_err = gateway
        .create_watchlist_entry(NewWatchlistEntry::new(1, 1))
        .await
        .expect_err("no relational tier can take the entry");

    assert!(movie_err.is_connection_failure());
    assert!(platform_err.is_connection_failure());
    assert!(entry_err.is_connection_failure());
    assert!(store.get_movie_by_tmdb_id(550).is_none());
    assert!(store.get_platforms(1).is_empty());
    assert!(store.find_watchlist_entry(1, 1).is_none());
}

#[rstest]
#[tokio::test]
async fn raw_tier_conflict_returns_the_stored_movie(db: FakeDatabase) {
    let gateway = db.gateway();
    let cached = gateway.create_movie(fight_club()).await.expect("movie");
    db.fail_tier(ORM_TIER, Failure::Connection);

    let again = gateway.create_movie(fight_club()).await.expect("conflict resolves");

    assert_eq!(again.id, cached.id);
    assert_eq!(db.count(RAW_SQL_TIER, "insert_movie"), 1);
    assert_eq!(db.movie_count(), 1);
}

#[rstest]
#[tokio::test]
async fn movie_insert_with_lost_acknowledgement_is_recovered(db: FakeDatabase) {
    let gateway = db.gateway();
    db.fail_tier(ORM_TIER, Failure::Connection);
    db.fail_tier(RAW_SQL_TIER, Failure::LostAck);

    let movie = gateway.create_movie(fight_club()).await.expect("recheck finds the row");

    assert_eq!(movie.tmdb_id, 550);
    assert_eq!(db.movie_count(), 1);
    assert_eq!(db.count(RAW_SQL_TIER, "insert_movie"), 1);
    assert_eq!(db.count(RAW_SQL_TIER, "find_movie_by_tmdb_id"), 1);
}

#[rstest]
#[tokio::test]
async fn movie_insert_failure_surfaces_when_nothing_was_stored(db: FakeDatabase) {
    let gateway = db.gateway();
    db.fail_tier(ORM_TIER, Failure::Query);

    let err = gateway
        .create_movie(fight_club())
        .await
        .expect_err("recheck finds nothing");

    assert!(err.is_query_failed());
    assert_eq!(db.movie_count(), 0);
    assert_eq!(db.count(RAW_SQL_TIER, "insert_movie"), 0);
}

#[rstest]
#[tokio::test]
async fn watchlist_insert_with_lost_acknowledgement_is_recovered(db: FakeDatabase) {
    let gateway = db.gateway();
    let alice = gateway.create_user(user("alice")).await.expect("user");
    let movie = gateway.create_movie(fight_club()).await.expect("movie");
    db.fail_tier(ORM_TIER, Failure::Connection);
    db.fail_tier(RAW_SQL_TIER, Failure::LostAck);

    let entry = gateway
        .create_watchlist_entry(NewWatchlistEntry::new(alice.id, movie.id))
        .await
        .expect("final recheck finds the row");

    assert_eq!((entry.user_id, entry.movie_id), (alice.id, movie.id));
    assert_eq!(db.entry_count(), 1);
    assert_eq!(db.count(RAW_SQL_TIER, "insert_watchlist_entry"), 1);
    assert_eq!(db.count(RAW_SQL_TIER, "find_watchlist_entry_for_pair"), 1);
}

#[rstest]
#[tokio::test]
async fn updates_retry_on_raw_tier_after_connection_failure(db: FakeDatabase) {
    let gateway = db.gateway();
    let alice = gateway.create_user(user("alice")).await.expect("user");
    let entry = gateway
        .create_watchlist_entry(NewWatchlistEntry::new(alice.id, 1))
        .await
        .expect("entry");
    db.fail_tier(ORM_TIER, Failure::Connection);

    let renamed = gateway
        .update_user(
            alice.id,
            UserUpdate {
                display_name: Some(Some("Alice L.".to_owned())),
                ..UserUpdate::default()
            },
        )
        .await
        .expect("raw tier update");
    let noted = gateway
        .update_watchlist_entry(
            entry.id,
            WatchlistEntryUpdate {
                notes: Some(Some("rewatch".to_owned())),
                ..WatchlistEntryUpdate::default()
            },
        )
        .await
        .expect("raw tier update");

    assert_eq!(renamed.display_name.as_deref(), Some("Alice L."));
    assert_eq!(noted.notes.as_deref(), Some("rewatch"));
    assert_eq!(db.count(ORM_TIER, "update_user"), 1);
    assert_eq!(db.count(RAW_SQL_TIER, "update_user"), 1);
    assert_eq!(db.count(ORM_TIER, "update_watchlist_entry"), 1);
    assert_eq!(db.count(RAW_SQL_TIER, "update_watchlist_entry"), 1);
}
