//! Role resolution types.
//!
//! Roles form a closed set: an unknown role name in storage fails at
//! resolution time with a logged skip, never at first use. The anonymous
//! role is the fallback for user agents with no stored assignment.

use serde::{Deserialize, Serialize};

/// A named capability set assignable to an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleKind {
    /// Default for user agents with no stored roles.
    Anonymous,
    Member,
    Editor,
    Admin,
}

impl RoleKind {
    /// The canonical lowercase name, as stored in persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::Anonymous => "anonymous",
            RoleKind::Member => "member",
            RoleKind::Editor => "editor",
            RoleKind::Admin => "admin",
        }
    }
}

impl std::str::FromStr for RoleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anonymous" => Ok(RoleKind::Anonymous),
            "member" => Ok(RoleKind::Member),
            "editor" => Ok(RoleKind::Editor),
            "admin" => Ok(RoleKind::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_role_names_parse() {
        assert_eq!("editor".parse::<RoleKind>().unwrap(), RoleKind::Editor);
        assert_eq!("anonymous".parse::<RoleKind>().unwrap(), RoleKind::Anonymous);
    }

    #[test]
    fn unknown_role_name_is_an_error() {
        let err = "superuser".parse::<RoleKind>().unwrap_err();
        assert!(err.contains("superuser"));
    }
}
