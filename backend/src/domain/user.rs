//! User data model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum allowed length for a username.
pub const USERNAME_MAX: usize = 64;

/// Validation errors returned by [`NewUser::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyUsername,
    UsernameTooLong { max: usize },
    UsernameHasSurroundingWhitespace,
    EmptyPassword,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::UsernameTooLong { max } => {
                write!(f, "username must be at most {max} characters")
            }
            Self::UsernameHasSurroundingWhitespace => {
                write!(f, "username must not start or end with whitespace")
            }
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Normalised lookup key for a username.
///
/// Usernames are unique without regard to case; every tier compares the
/// lower-cased form.
pub fn username_key(username: &str) -> String {
    username.to_lowercase()
}

/// Registered account.
///
/// ## Invariants
/// - `username` is unique case-insensitively across the store.
/// - `password` holds an opaque credential and is never serialised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub environment: Option<String>,
}

impl User {
    /// Whether `candidate` names this user, ignoring case.
    pub fn has_username(&self, candidate: &str) -> bool {
        username_key(&self.username) == username_key(candidate)
    }
}

/// Insertable subset of [`User`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub environment: Option<String>,
}

impl NewUser {
    /// Validate and construct a registration request.
    ///
    /// # Examples
    /// ```
    /// use watchlist::domain::NewUser;
    ///
    /// let user = NewUser::new("alice", "secret123").expect("valid user");
    /// assert_eq!(user.username, "alice");
    /// assert!(NewUser::new(" ", "secret123").is_err());
    /// ```
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        let username = username.into();
        let password = password.into();

        if username.trim().is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if username.trim() != username {
            return Err(UserValidationError::UsernameHasSurroundingWhitespace);
        }
        if username.chars().count() > USERNAME_MAX {
            return Err(UserValidationError::UsernameTooLong { max: USERNAME_MAX });
        }
        if password.is_empty() {
            return Err(UserValidationError::EmptyPassword);
        }

        Ok(Self {
            username,
            password,
            display_name: None,
            environment: None,
        })
    }

    /// Attach a display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Attach an environment tag.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }
}

/// Partial update for the mutable user fields.
///
/// `None` leaves a field untouched; `display_name: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub password: Option<String>,
    pub display_name: Option<Option<String>>,
}

impl UserUpdate {
    /// True when the update would not change any column.
    pub fn is_empty(&self) -> bool {
        self.password.is_none() && self.display_name.is_none()
    }
}
