//! Deployment environment tag.

use std::fmt;
use std::str::FromStr;

/// Where the process is deployed.
///
/// Only [`DeploymentEnvironment::Production`] may route writes to the
/// emergency in-memory tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeploymentEnvironment {
    Production,
    #[default]
    Development,
    Test,
}

impl DeploymentEnvironment {
    /// Stable lowercase name, also used as the user environment tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
            Self::Test => "test",
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for DeploymentEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised environment name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown deployment environment: {0}")]
pub struct ParseEnvironmentError(pub String);

impl FromStr for DeploymentEnvironment {
    type Err = ParseEnvironmentError;

    /// Parse an environment name, accepting the common short forms.
    ///
    /// # Examples
    /// ```
    /// use watchlist::domain::DeploymentEnvironment;
    ///
    /// assert_eq!("prod".parse(), Ok(DeploymentEnvironment::Production));
    /// assert_eq!("Development".parse(), Ok(DeploymentEnvironment::Development));
    /// assert!("staging".parse::<DeploymentEnvironment>().is_err());
    /// ```
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            other => Err(ParseEnvironmentError(other.to_owned())),
        }
    }
}
