// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role stored on every user document. Informational: no endpoint checks it.
///
/// - `Patient` - submits screening tests and reads their own history
/// - `Admin` - clinic staff account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Patient,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_role_is_patient() {
        assert_eq!(Role::default(), Role::Patient);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""admin""#);
        let parsed: Role = serde_json::from_str(r#""patient""#).unwrap();
        assert_eq!(parsed, Role::Patient);
        assert_eq!(Role::Admin.to_string(), "admin");
    }
}
