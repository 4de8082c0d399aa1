//! User operations.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use super::fallback::run_tiers;
use super::{GUEST_USERNAME, StorageError, StorageGateway, degraded_read, is_emergency_id};
use crate::domain::ports::{ErrorClass, PersistenceError, UserRepository};
use crate::domain::{NewUser, User, UserUpdate};

impl StorageGateway {
    /// Fetch a user by id; `None` when absent or unreachable.
    ///
    /// Ids in the emergency range are answered by the emergency tier alone.
    pub async fn get_user(&self, id: i32) -> Option<User> {
        if is_emergency_id(id) {
            return self
                .emergency_user(|users| async move { users.find_by_id(id).await })
                .await;
        }

        run_tiers("get_user", self.relational(|t| t.users.clone()), |users| async move {
            users.find_by_id(id).await
        })
        .await
        .unwrap_or_else(|error| {
            degraded_read("get_user", &error);
            None
        })
    }

    /// Fetch a user by username, ignoring case.
    ///
    /// While the relational tiers are down the emergency tier answers,
    /// including its seeded guest. A relational miss only picks up users
    /// registered in the emergency tier during an earlier outage.
    pub async fn get_user_by_username(&self, username: &str) -> Option<User> {
        let relational = run_tiers(
            "get_user_by_username",
            self.relational(|t| t.users.clone()),
            |users| async move { users.find_by_username(username).await },
        )
        .await;

        match relational {
            Ok(Some(user)) => Some(user),
            Ok(None) => self
                .emergency_user(|users| async move { users.find_by_username(username).await })
                .await
                .filter(registered_in_emergency),
            Err(error) => {
                degraded_read("get_user_by_username", &error);
                self.emergency_user(|users| async move { users.find_by_username(username).await })
                    .await
            }
        }
    }

    /// List every user.
    ///
    /// Degrades to the emergency tier's users when it is active, otherwise
    /// to an empty list.
    pub async fn get_all_users(&self) -> Vec<User> {
        match run_tiers("get_all_users", self.relational(|t| t.users.clone()), |users| async move {
            users.list().await
        })
        .await
        {
            Ok(users) => users,
            Err(error) => {
                degraded_read("get_all_users", &error);
                match self.active_emergency() {
                    Some(tier) => tier.users.list().await.unwrap_or_default(),
                    None => Vec::new(),
                }
            }
        }
    }

    /// Register a user.
    ///
    /// A username clash is reported as [`StorageError::DuplicateUsername`]
    /// whichever tier detects it. Users without an environment tag are
    /// tagged with the gateway's deployment environment.
    pub async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut user = user;
        if user.environment.is_none() {
            user.environment = Some(self.environment.as_str().to_owned());
        }
        let user = &user;

        let error = match self.orm.users.insert(user).await {
            Ok(created) => return Ok(created),
            Err(error) => error,
        };

        match error.class() {
            ErrorClass::Conflict => Err(StorageError::duplicate_username(user.username.as_str())),
            ErrorClass::Other => Err(StorageError::from_persistence("create_user", error)),
            ErrorClass::ConnectionFailure => {
                warn!(operation = "create_user", tier = self.orm.name(), %error, "insert failed on connection error");
                self.create_user_after_connection_failure(user, error).await
            }
        }
    }

    async fn create_user_after_connection_failure(
        &self,
        user: &NewUser,
        orm_error: PersistenceError,
    ) -> Result<User, StorageError> {
        let healthy = self.health.check_connection().await;

        if let (false, Some(emergency)) = (healthy, self.active_emergency()) {
            warn!(
                operation = "create_user",
                tier = emergency.name(),
                username = %user.username,
                "backend unreachable; registering user in emergency tier"
            );
            return emergency
                .users
                .insert(user)
                .await
                .map_err(|error| user_write_error("create_user", user, error));
        }

        let Some(raw) = self.raw.as_ref() else {
            return Err(StorageError::from_persistence("create_user", orm_error));
        };

        info!(operation = "create_user", tier = raw.name(), healthy, "retrying insert on raw SQL tier");
        raw.users
            .insert(user)
            .await
            .map_err(|error| user_write_error("create_user", user, error))
    }

    /// Change a user's password or display name.
    pub async fn update_user(&self, id: i32, changes: UserUpdate) -> Result<User, StorageError> {
        if changes.is_empty() {
            return self
                .get_user(id)
                .await
                .ok_or_else(|| StorageError::not_found(format!("user {id}")));
        }

        let changes = &changes;
        run_tiers("update_user", self.relational(|t| t.users.clone()), |users| async move {
            users.update(id, changes).await
        })
        .await
        .map_err(|error| StorageError::from_persistence("update_user", error))?
        .ok_or_else(|| StorageError::not_found(format!("user {id}")))
    }

    async fn emergency_user<F, Fut>(&self, lookup: F) -> Option<User>
    where
        F: FnOnce(Arc<dyn UserRepository>) -> Fut,
        Fut: Future<Output = Result<Option<User>, PersistenceError>>,
    {
        let tier = self.active_emergency()?;
        lookup(tier.users.clone()).await.ok().flatten()
    }
}

/// Users created through emergency registration, as opposed to the seed.
fn registered_in_emergency(user: &User) -> bool {
    is_emergency_id(user.id) && !user.has_username(GUEST_USERNAME)
}

fn user_write_error(operation: &'static str, user: &NewUser, error: PersistenceError) -> StorageError {
    if error.class() == ErrorClass::Conflict {
        StorageError::duplicate_username(user.username.as_str())
    } else {
        StorageError::from_persistence(operation, error)
    }
}
