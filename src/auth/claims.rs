// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;
use crate::storage::StoredUser;

/// Which kind of session token a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Refresh,
}

/// Claims carried by both token kinds.
///
/// Access tokens carry `{sub, iat, exp}` only. Refresh tokens add `jti`,
/// the stored record id, and `token_use = "refresh"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID). Missing decodes as empty and is rejected.
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_use: Option<TokenUse>,
}

impl SessionClaims {
    pub fn is_refresh(&self) -> bool {
        self.token_use == Some(TokenUse::Refresh)
    }
}

/// Authenticated user resolved from an access token.
///
/// This is the primary type used throughout the application to represent
/// the caller of a request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    /// Email doubles as the username on detection records.
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Access token expiry (Unix seconds).
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn from_user(user: &StoredUser, expires_at: i64) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            expires_at,
        }
    }
}
