// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing and verification of session JWTs.
//!
//! Expiry is not checked by `jsonwebtoken`: the signer compares `exp` against
//! the caller-supplied instant so the injected clock decides, with no leeway.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use super::claims::{SessionClaims, TokenUse};
use super::AuthError;

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// A freshly signed refresh token and the id under which it is stored.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies tokens with one shared secret and algorithm.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenSigner {
    pub fn new(
        secret: &[u8],
        algorithm: Algorithm,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_access(&self, subject: &str, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let expires_at = now + self.access_ttl;
        let claims = SessionClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: None,
            token_use: None,
        };
        Ok(IssuedToken {
            token: self.sign(&claims)?,
            expires_at,
        })
    }

    pub fn issue_refresh(
        &self,
        subject: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedRefreshToken, AuthError> {
        let expires_at = now + self.refresh_ttl;
        let token_id = uuid::Uuid::new_v4().simple().to_string();
        let claims = SessionClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Some(token_id.clone()),
            token_use: Some(TokenUse::Refresh),
        };
        Ok(IssuedRefreshToken {
            token: self.sign(&claims)?,
            token_id,
            expires_at,
        })
    }

    /// Verify signature, algorithm, expiry at `now` and a non-empty subject.
    ///
    /// Token kind is left to the caller.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidToken,
                _ => AuthError::MalformedToken,
            })?
            .claims;

        if now.timestamp() >= claims.exp {
            return Err(AuthError::ExpiredToken);
        }
        if claims.sub.trim().is_empty() {
            return Err(AuthError::MalformedToken);
        }
        Ok(claims)
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use chrono::TimeZone;

    fn signer() -> TokenSigner {
        TokenSigner::new(
            b"test-secret",
            Algorithm::HS256,
            Duration::minutes(30),
            Duration::days(7),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 16, 4, 27, 20).unwrap()
    }

    #[test]
    fn access_token_verifies_until_expiry() {
        let signer = signer();
        let issued = signer.issue_access("user-1", now()).unwrap();
        assert_eq!(issued.expires_at, now() + Duration::minutes(30));

        let claims = signer
            .verify(&issued.token, now() + Duration::minutes(29))
            .unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(!claims.is_refresh());

        let expired = signer.verify(&issued.token, now() + Duration::minutes(30));
        assert!(matches!(expired, Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn refresh_token_carries_jti_and_marker() {
        let signer = signer();
        let issued = signer.issue_refresh("user-1", now()).unwrap();
        let claims = signer.verify(&issued.token, now()).unwrap();
        assert!(claims.is_refresh());
        assert_eq!(claims.jti.as_deref(), Some(issued.token_id.as_str()));
        assert_eq!(claims.exp, (now() + Duration::days(7)).timestamp());
    }

    #[test]
    fn foreign_secret_is_invalid() {
        let other = TokenSigner::new(
            b"another-secret",
            Algorithm::HS256,
            Duration::minutes(30),
            Duration::days(7),
        );
        let issued = other.issue_access("user-1", now()).unwrap();
        assert!(matches!(
            signer().verify(&issued.token, now()),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn other_algorithm_is_invalid() {
        let hs512 = TokenSigner::new(
            b"test-secret",
            Algorithm::HS512,
            Duration::minutes(30),
            Duration::days(7),
        );
        let issued = hs512.issue_access("user-1", now()).unwrap();
        assert!(matches!(
            signer().verify(&issued.token, now()),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            signer().verify("not-a-jwt", now()),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let issued = signer().issue_access("user-1", now()).unwrap();
        let mut parts: Vec<String> = issued.token.split('.').map(str::to_string).collect();
        let forged = format!(r#"{{"sub":"user-2","iat":0,"exp":{}}}"#, i64::MAX / 2);
        parts[1] = URL_SAFE_NO_PAD.encode(forged.as_bytes());
        let tampered = parts.join(".");

        assert!(matches!(
            signer().verify(&tampered, now()),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn empty_subject_is_malformed() {
        let signer = signer();
        let claims = SessionClaims {
            sub: String::new(),
            iat: now().timestamp(),
            exp: (now() + Duration::minutes(5)).timestamp(),
            jti: None,
            token_use: None,
        };
        let token = signer.sign(&claims).unwrap();
        assert!(matches!(
            signer.verify(&token, now()),
            Err(AuthError::MalformedToken)
        ));
    }
}
