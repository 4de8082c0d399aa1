//! Behaviour of the emergency in-memory tier.

use std::sync::Arc;
use std::thread;

use rstest::{fixture, rstest};

use super::*;
use crate::domain::storage::is_emergency_id;
use crate::domain::{MediaType, WatchStatus};

#[fixture]
fn store() -> EmergencyStore {
    EmergencyStore::new()
}

fn new_user(username: &str) -> NewUser {
    NewUser::new(username, "hashed").expect("valid user")
}

#[rstest]
fn starts_with_guest_user(store: EmergencyStore) {
    let users = store.list_users();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, GUEST_USERNAME);
    assert_eq!(store.get_user_by_username("GUEST").map(|u| u.id), Some(users[0].id));
}

#[rstest]
fn ids_count_down_outside_the_serial_range(store: EmergencyStore) {
    let guest = store.get_user_by_username(GUEST_USERNAME).expect("seeded guest");
    let first = store.create_user(&new_user("alice")).expect("alice");
    let second = store.create_user(&new_user("bob")).expect("bob");
    assert_eq!(guest.id, -1);
    assert_eq!((first.id, second.id), (-2, -3));
    assert!(is_emergency_id(second.id));
    let order: Vec<_> = store.list_users().into_iter().map(|u| u.username).collect();
    assert_eq!(order, [GUEST_USERNAME, "alice", "bob"]);

    let movie = store.create_movie(&NewMovie::new(550, "Fight Club", MediaType::Movie));
    assert_eq!(movie.id, -1);
}

#[rstest]
#[case("alice")]
#[case("ALICE")]
#[case("Alice")]
fn rejects_usernames_that_differ_only_in_case(store: EmergencyStore, #[case] clash: &str) {
    store.create_user(&new_user("alice")).expect("first registration");

    let error = store.create_user(&new_user(clash)).expect_err("clash");

    assert_eq!(error, StorageError::duplicate_username(clash));
}

#[rstest]
fn movie_creation_is_idempotent_on_tmdb_id(store: EmergencyStore) {
    let first = store.create_movie(&NewMovie::new(550, "Fight Club", MediaType::Movie));
    let second = store.create_movie(&NewMovie::new(550, "Fight Club (re-cut)", MediaType::Movie));

    assert_eq!(first, second);
}

#[rstest]
fn watchlist_creation_is_idempotent_on_pair(store: EmergencyStore) {
    let first = store.create_watchlist_entry(&NewWatchlistEntry::new(1, 7));
    let second = store.create_watchlist_entry(
        &NewWatchlistEntry::new(1, 7).with_status(WatchStatus::Watching),
    );

    assert_eq!(first.id, second.id);
    assert_eq!(second.status, WatchStatus::ToWatch);
}

#[rstest]
fn deleting_platform_clears_entry_references(store: EmergencyStore) {
    let platform = store.create_platform(&NewPlatform::new(1, "Netflix"));
    let mut entry = NewWatchlistEntry::new(1, 7);
    entry.platform_id = Some(platform.id);
    let entry = store.create_watchlist_entry(&entry);

    assert!(store.delete_platform(platform.id));
    assert!(!store.delete_platform(platform.id));
    assert_eq!(
        store.get_watchlist_entry(entry.id).and_then(|e| e.platform_id),
        None
    );
}

#[rstest]
fn updates_of_missing_rows_return_none(store: EmergencyStore) {
    assert!(store.update_user(99, &UserUpdate::default()).is_none());
    assert!(store
        .update_watchlist_entry(99, &WatchlistEntryUpdate::default())
        .is_none());
}

#[rstest]
#[tokio::test]
async fn username_clash_maps_to_unique_violation_through_port() {
    let store = EmergencyStore::new();
    let users: &dyn UserRepository = &store;

    let error = users.insert(&new_user(GUEST_USERNAME)).await.expect_err("clash");

    assert!(error.is_unique_violation());
}

#[rstest]
fn concurrent_registrations_keep_usernames_unique() {
    let store = Arc::new(EmergencyStore::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.create_user(&new_user("racer")).is_ok())
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread completes"))
        .filter(|created| *created)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(store.list_users().len(), 2);
}
