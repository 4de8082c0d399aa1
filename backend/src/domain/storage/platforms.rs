//! Platform operations.

use super::fallback::run_tiers;
use super::{StorageError, StorageGateway, degraded_read};
use crate::domain::{NewPlatform, Platform, PlatformUpdate};

impl StorageGateway {
    /// Platforms owned by `user_id`; empty when unreachable.
    pub async fn get_platforms(&self, user_id: i32) -> Vec<Platform> {
        run_tiers(
            "get_platforms",
            self.relational(|t| t.platforms.clone()),
            |platforms| async move { platforms.list_for_user(user_id).await },
        )
        .await
        .unwrap_or_else(|error| {
            degraded_read("get_platforms", &error);
            Vec::new()
        })
    }

    pub async fn get_platform(&self, id: i32) -> Option<Platform> {
        run_tiers("get_platform", self.relational(|t| t.platforms.clone()), |platforms| async move {
            platforms.find_by_id(id).await
        })
        .await
        .unwrap_or_else(|error| {
            degraded_read("get_platform", &error);
            None
        })
    }

    pub async fn create_platform(&self, platform: NewPlatform) -> Result<Platform, StorageError> {
        let platform = &platform;
        run_tiers("create_platform", self.relational(|t| t.platforms.clone()), |platforms| async move {
            platforms.insert(platform).await
        })
        .await
        .map_err(|error| StorageError::from_persistence("create_platform", error))
    }

    pub async fn update_platform(
        &self,
        id: i32,
        changes: PlatformUpdate,
    ) -> Result<Platform, StorageError> {
        if changes.is_empty() {
            return self
                .get_platform(id)
                .await
                .ok_or_else(|| StorageError::not_found(format!("platform {id}")));
        }

        let changes = &changes;
        run_tiers("update_platform", self.relational(|t| t.platforms.clone()), |platforms| async move {
            platforms.update(id, changes).await
        })
        .await
        .map_err(|error| StorageError::from_persistence("update_platform", error))?
        .ok_or_else(|| StorageError::not_found(format!("platform {id}")))
    }

    /// Remove a platform. Entries referencing it keep their row with the
    /// platform cleared by the schema.
    pub async fn delete_platform(&self, id: i32) -> bool {
        run_tiers("delete_platform", self.relational(|t| t.platforms.clone()), |platforms| async move {
            platforms.delete(id).await
        })
        .await
        .unwrap_or_else(|error| {
            degraded_read("delete_platform", &error);
            false
        })
    }
}
