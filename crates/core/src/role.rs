//! The privilege level of the user a turn is answered for.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who the engine is producing output for.
///
/// The role is interpolated into summarization instructions and passed to
/// every completion call. `Developer` additionally turns on full prompt and
/// response logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum UserRole {
    #[default]
    Admin,
    Normal,
    Developer,
    /// Any other role string, kept verbatim.
    Custom(String),
}

impl UserRole {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "Admin",
            Self::Normal => "Normal",
            Self::Developer => "Developer",
            Self::Custom(s) => s,
        }
    }

    pub fn is_developer(&self) -> bool {
        matches!(self, Self::Developer)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for UserRole {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Self::Admin,
            "normal" | "basic" => Self::Normal,
            "developer" => Self::Developer,
            _ => Self::Custom(s.trim().to_string()),
        }
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.as_str().to_string()
    }
}

impl FromStr for UserRole {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles_case_insensitively() {
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("developer".parse::<UserRole>().unwrap(), UserRole::Developer);
        assert_eq!("Basic".parse::<UserRole>().unwrap(), UserRole::Normal);
    }

    #[test]
    fn unknown_role_is_kept() {
        let role: UserRole = "Analyst".parse().unwrap();
        assert_eq!(role, UserRole::Custom("Analyst".into()));
        assert_eq!(role.to_string(), "Analyst");
    }

    #[test]
    fn serde_uses_plain_strings() {
        let json = serde_json::to_string(&UserRole::Developer).unwrap();
        assert_eq!(json, r#""Developer""#);
        let back: UserRole = serde_json::from_str(r#""normal""#).unwrap();
        assert_eq!(back, UserRole::Normal);
    }
}
