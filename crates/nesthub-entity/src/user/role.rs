//! Family role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two account roles in a NestHub family.
///
/// Parents create tasks and approve payouts; children complete tasks and
/// save toward goals. Messaging eligibility is role-aware: direct messages
/// flow between opposite roles within the same family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "family_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FamilyRole {
    /// Adult account: manages the family, assigns tasks.
    Parent,
    /// Child account: completes tasks, updates savings goals.
    Child,
}

impl FamilyRole {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Child => "child",
        }
    }

    /// Return the opposite role.
    pub fn counterpart(&self) -> FamilyRole {
        match self {
            Self::Parent => Self::Child,
            Self::Child => Self::Parent,
        }
    }
}

impl fmt::Display for FamilyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FamilyRole {
    type Err = nesthub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parent" => Ok(Self::Parent),
            "child" => Ok(Self::Child),
            _ => Err(nesthub_core::AppError::validation(format!(
                "Invalid family role: '{s}'. Expected one of: parent, child"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counterpart() {
        assert_eq!(FamilyRole::Parent.counterpart(), FamilyRole::Child);
        assert_eq!(FamilyRole::Child.counterpart(), FamilyRole::Parent);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("parent".parse::<FamilyRole>().unwrap(), FamilyRole::Parent);
        assert_eq!("CHILD".parse::<FamilyRole>().unwrap(), FamilyRole::Child);
        assert!("admin".parse::<FamilyRole>().is_err());
    }
}
