// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API-key permissions.

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Operations an API key may be granted.
///
/// ## Hierarchy
///
/// - `Admin` - implies every other permission
/// - `Read` - read assets and history
/// - `Write` - create and update assets
/// - `Delete` - delete assets
///
/// Wallet sessions are not permission-scoped; they act with `Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Delete,
    Admin,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::Read,
        Permission::Write,
        Permission::Delete,
        Permission::Admin,
    ];

    /// Check if this permission covers the required one.
    pub fn allows(&self, required: Permission) -> bool {
        match (self, required) {
            (Permission::Admin, _) => true,
            (granted, required) => *granted == required,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Delete => "delete",
            Permission::Admin => "admin",
        }
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" => Ok(Permission::Read),
            "write" => Ok(Permission::Write),
            "delete" => Ok(Permission::Delete),
            "admin" => Ok(Permission::Admin),
            other => Err(format!("unknown permission: {other}")),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default grant for new keys: `{read}`.
pub fn default_permissions() -> BTreeSet<Permission> {
    BTreeSet::from([Permission::Read])
}

/// Whether any permission in `granted` covers `required`.
pub fn grants(granted: &BTreeSet<Permission>, required: Permission) -> bool {
    granted.iter().any(|p| p.allows(required))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_allows_everything() {
        for required in Permission::ALL {
            assert!(Permission::Admin.allows(required));
        }
    }

    #[test]
    fn plain_permissions_only_allow_themselves() {
        assert!(Permission::Read.allows(Permission::Read));
        assert!(!Permission::Read.allows(Permission::Write));
        assert!(!Permission::Write.allows(Permission::Delete));
        assert!(!Permission::Delete.allows(Permission::Admin));
    }

    #[test]
    fn from_str_parses_case_insensitively() {
        assert_eq!("READ".parse::<Permission>(), Ok(Permission::Read));
        assert_eq!("Admin".parse::<Permission>(), Ok(Permission::Admin));
        assert!("owner".parse::<Permission>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_vocabulary() {
        let json = serde_json::to_string(&default_permissions()).unwrap();
        assert_eq!(json, r#"["read"]"#);

        let err = serde_json::from_str::<BTreeSet<Permission>>(r#"["read","owner"]"#);
        assert!(err.is_err());
    }

    #[test]
    fn grants_checks_the_whole_set() {
        let set = BTreeSet::from([Permission::Read, Permission::Write]);
        assert!(grants(&set, Permission::Write));
        assert!(!grants(&set, Permission::Delete));
        assert!(grants(&BTreeSet::from([Permission::Admin]), Permission::Delete));
        assert!(!grants(&BTreeSet::new(), Permission::Read));
    }
}
