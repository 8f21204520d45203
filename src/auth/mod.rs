// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Password login with locally signed JWTs.
//!
//! ## Auth Flow
//!
//! 1. Client posts email and password to `/api/v1/auth/login`
//! 2. Server verifies the argon2id hash and returns:
//!    - a short-lived access token (`{sub, iat, exp}`)
//!    - a long-lived refresh token (`{sub, iat, exp, jti, token_use}`) whose
//!      `jti` is stored in `refresh_tokens`
//! 3. Client sends `Authorization: Bearer <access token>` on every call
//! 4. When the access token expires, the client posts the refresh token to
//!    `/api/v1/auth/refresh` for a new one
//!
//! ## Security
//!
//! - All non-health endpoints except login, refresh and registration require
//!   authentication
//! - Expiry is checked against the injected clock with zero leeway
//! - Every token failure produces the same response body

pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod roles;
pub mod session;
pub mod tokens;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::Auth;
pub use roles::Role;
pub use session::{AccessGrant, LoginSession, Registration, SessionEngine, UserSummary};
pub use tokens::TokenSigner;
