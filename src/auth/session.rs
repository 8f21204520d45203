// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session engine.
//!
//! Issues and validates access tokens, and manages the lifecycle of
//! refresh tokens:
//!
//! ```text
//! issued -> (used for refresh, no state change) -> revoked
//! ```
//!
//! Expiry never transitions a stored refresh row; it is checked on use.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::claims::AuthenticatedUser;
use super::password::{hash_password_blocking, verify_password_blocking};
use super::tokens::TokenSigner;
use super::{AuthError, Role};
use crate::clock::Clock;
use crate::storage::{
    DocumentStore, EmergencyContact, NewUser, RefreshTokenRepository, StoredRefreshToken,
    StoredUser, UserRepository,
};

/// Token type reported to clients.
pub const BEARER: &str = "bearer";

/// Public view of a user returned at login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&StoredUser> for UserSummary {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginSession {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub user: UserSummary,
}

/// A new access token minted from a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessGrant {
    pub access_token: String,
    pub token_type: String,
}

/// Input to [`SessionEngine::register`]. The password is plaintext.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub emergency_contacts: Vec<EmergencyContact>,
}

#[derive(Clone)]
pub struct SessionEngine {
    store: Arc<dyn DocumentStore>,
    signer: TokenSigner,
    clock: Arc<dyn Clock>,
}

impl SessionEngine {
    pub fn new(store: Arc<dyn DocumentStore>, signer: TokenSigner, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            signer,
            clock,
        }
    }

    fn users(&self) -> UserRepository<'_> {
        UserRepository::new(self.store.as_ref())
    }

    fn refresh_tokens(&self) -> RefreshTokenRepository<'_> {
        RefreshTokenRepository::new(self.store.as_ref())
    }

    /// Exchange email and password for an access/refresh token pair.
    ///
    /// Unknown email and wrong password both fail with
    /// [`AuthError::InvalidCredentials`] after equivalent hashing work.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, AuthError> {
        let user = self.users().find_by_email(email).await?;
        let matched = verify_password_blocking(
            password.to_string(),
            user.as_ref().map(|user| user.password_hash.clone()),
        )
        .await?;
        let user = match user {
            Some(user) if matched => user,
            Some(_) => {
                tracing::debug!("login rejected: password mismatch");
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                tracing::debug!("login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let now = self.clock.now();
        let access = self.signer.issue_access(&user.id, now)?;
        let refresh = self.signer.issue_refresh(&user.id, now)?;

        self.refresh_tokens()
            .insert(&StoredRefreshToken {
                token_id: refresh.token_id,
                user_id: user.id.clone(),
                expires_at: refresh.expires_at,
                created_at: now,
                revoked: false,
            })
            .await?;

        tracing::info!(user_id = %user.id, "login succeeded");

        Ok(LoginSession {
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: BEARER.to_string(),
            user: UserSummary::from(&user),
        })
    }

    /// Resolve an access token to its live user. Performs no writes.
    pub async fn authenticate(&self, access_token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.signer.verify(access_token, self.clock.now())?;
        if claims.is_refresh() {
            return Err(AuthError::InvalidToken);
        }

        let user = self
            .users()
            .get(&claims.sub)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        Ok(AuthenticatedUser::from_user(&user, claims.exp))
    }

    /// Mint a new access token from a stored, unrevoked refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessGrant, AuthError> {
        let now = self.clock.now();
        let claims = self.signer.verify(refresh_token, now)?;
        if !claims.is_refresh() {
            return Err(AuthError::InvalidToken);
        }
        let token_id = claims.jti.as_deref().ok_or(AuthError::MalformedToken)?;

        let stored = match self.refresh_tokens().get(token_id).await? {
            Some(stored) if !stored.revoked => stored,
            _ => return Err(AuthError::RevokedToken),
        };
        if now >= stored.expires_at {
            return Err(AuthError::ExpiredToken);
        }
        if stored.user_id != claims.sub {
            return Err(AuthError::InvalidToken);
        }

        let user = self
            .users()
            .get(&stored.user_id)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        let access = self.signer.issue_access(&user.id, now)?;
        tracing::debug!(user_id = %user.id, "access token refreshed");

        Ok(AccessGrant {
            access_token: access.token,
            token_type: BEARER.to_string(),
        })
    }

    /// Mark a refresh token revoked. Idempotent; returns whether it existed.
    pub async fn revoke(&self, token_id: &str) -> Result<bool, AuthError> {
        let matched = self.refresh_tokens().revoke(token_id).await?;
        tracing::info!(token_id, matched, "refresh token revoked");
        Ok(matched)
    }

    /// Revoke the caller's own refresh token.
    pub async fn logout(
        &self,
        user: &AuthenticatedUser,
        refresh_token: &str,
    ) -> Result<bool, AuthError> {
        let claims = self.signer.verify(refresh_token, self.clock.now())?;
        if !claims.is_refresh() || claims.sub != user.user_id {
            return Err(AuthError::InvalidToken);
        }
        let token_id = claims.jti.as_deref().ok_or(AuthError::MalformedToken)?;
        self.revoke(token_id).await
    }

    /// Create a user with a hashed password. Emails are unique.
    pub async fn register(&self, registration: Registration) -> Result<StoredUser, AuthError> {
        let users = self.users();
        if users.find_by_email(&registration.email).await?.is_some() {
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let password_hash = hash_password_blocking(registration.password).await?;
        let user = users
            .create(
                NewUser {
                    name: registration.name,
                    email: registration.email,
                    password_hash,
                    role: registration.role,
                    emergency_contacts: registration.emergency_contacts,
                },
                self.clock.now(),
            )
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }
}
