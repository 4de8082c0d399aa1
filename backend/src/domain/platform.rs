//! User-owned streaming or viewing contexts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named viewing context owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub logo_url: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Insertable subset of [`Platform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlatform {
    pub user_id: i32,
    pub name: String,
    pub logo_url: Option<String>,
    pub is_default: bool,
}

impl NewPlatform {
    /// Non-default platform without a logo.
    pub fn new(user_id: i32, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            logo_url: None,
            is_default: false,
        }
    }
}

/// Partial update for a platform; `logo_url: Some(None)` clears the logo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformUpdate {
    pub name: Option<String>,
    pub logo_url: Option<Option<String>>,
    pub is_default: Option<bool>,
}

impl PlatformUpdate {
    /// True when the update would not change any column.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.logo_url.is_none() && self.is_default.is_none()
    }
}
