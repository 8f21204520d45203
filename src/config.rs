// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into
//! [`AppConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory of the JSON document store | `./data` |
//! | `JWT_SECRET` | Token signing secret | Required |
//! | `JWT_ALGORITHM` | `HS256`, `HS384` or `HS512` | `HS256` |
//! | `ACCESS_TOKEN_EXPIRE_MINUTES` | Access token lifetime | `30` |
//! | `REFRESH_TOKEN_EXPIRE_DAYS` | Refresh token lifetime | `7` |
//! | `STORE_TIMEOUT_MS` | Budget for one store call | `5000` |
//! | `CLASSIFIER_URL` | Speech classifier endpoint | Unset (speech disabled) |
//! | `CLASSIFIER_TIMEOUT_MS` | Budget for one classifier call | `15000` |
//! | `SPEECH_MODEL_VERSION` | Version tag on speech records | `v1.0` |
//! | `BALANCE_SWAY_AREA_MAX` | Balance threshold | `0.15` |
//! | `BALANCE_PATH_LENGTH_MAX` | Balance threshold | `15` |
//! | `BALANCE_ANGULAR_VARIANCE_MAX` | Balance threshold | `0.002` |
//! | `BALANCE_JERKINESS_MAX` | Balance threshold | `0.2` |
//! | `BALANCE_RULE_CONFIDENCE` | Confidence on balance records | `1.0` |
//! | `MODEL_BUCKET` | Bucket holding classifier model files | Unset (no download) |
//! | `MODEL_PREFIX` | Object prefix inside the bucket | empty |
//! | `MODEL_LOCAL_PATH` | Local model directory | `./models` |
//! | `TWILIO_ACCOUNT_SID` | Twilio account | Unset (alerts disabled) |
//! | `TWILIO_AUTH_TOKEN` | Twilio credential | Unset |
//! | `TWILIO_FROM_NUMBER` | Sender number | Unset |
//! | `TWILIO_CHANNEL` | `whatsapp` or `sms` | `whatsapp` |
//! | `TLS_CERT_PATH` | PEM certificate chain for HTTPS | Unset (plain HTTP) |
//! | `TLS_KEY_PATH` | PEM private key for HTTPS | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use thiserror::Error;
use url::Url;

use crate::analysis::BalanceThresholds;
use crate::notify::{TwilioChannel, TwilioConfig};
use crate::storage::paths::DEFAULT_DATA_ROOT;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Root directory of the document store. Created on startup if missing.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_ALGORITHM_ENV: &str = "JWT_ALGORITHM";
pub const ACCESS_TOKEN_EXPIRE_MINUTES_ENV: &str = "ACCESS_TOKEN_EXPIRE_MINUTES";
pub const REFRESH_TOKEN_EXPIRE_DAYS_ENV: &str = "REFRESH_TOKEN_EXPIRE_DAYS";
pub const STORE_TIMEOUT_MS_ENV: &str = "STORE_TIMEOUT_MS";

pub const CLASSIFIER_URL_ENV: &str = "CLASSIFIER_URL";
pub const CLASSIFIER_TIMEOUT_MS_ENV: &str = "CLASSIFIER_TIMEOUT_MS";
pub const SPEECH_MODEL_VERSION_ENV: &str = "SPEECH_MODEL_VERSION";

pub const BALANCE_SWAY_AREA_MAX_ENV: &str = "BALANCE_SWAY_AREA_MAX";
pub const BALANCE_PATH_LENGTH_MAX_ENV: &str = "BALANCE_PATH_LENGTH_MAX";
pub const BALANCE_ANGULAR_VARIANCE_MAX_ENV: &str = "BALANCE_ANGULAR_VARIANCE_MAX";
pub const BALANCE_JERKINESS_MAX_ENV: &str = "BALANCE_JERKINESS_MAX";
pub const BALANCE_RULE_CONFIDENCE_ENV: &str = "BALANCE_RULE_CONFIDENCE";

pub const MODEL_BUCKET_ENV: &str = "MODEL_BUCKET";
pub const MODEL_PREFIX_ENV: &str = "MODEL_PREFIX";
pub const MODEL_LOCAL_PATH_ENV: &str = "MODEL_LOCAL_PATH";

pub const TWILIO_ACCOUNT_SID_ENV: &str = "TWILIO_ACCOUNT_SID";
pub const TWILIO_AUTH_TOKEN_ENV: &str = "TWILIO_AUTH_TOKEN";
pub const TWILIO_FROM_NUMBER_ENV: &str = "TWILIO_FROM_NUMBER";
pub const TWILIO_CHANNEL_ENV: &str = "TWILIO_CHANNEL";

pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

/// `json` selects JSON log lines; anything else the pretty formatter.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Optional bulk download of classifier model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSource {
    pub bucket: String,
    pub prefix: String,
    pub local_path: PathBuf,
}

/// Certificate and key for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
    pub store_timeout: Duration,
    pub classifier_url: Option<Url>,
    pub classifier_timeout: Duration,
    pub speech_model_version: String,
    pub balance_thresholds: BalanceThresholds,
    pub balance_rule_confidence: f64,
    pub model_source: Option<ModelSource>,
    pub twilio: Option<TwilioConfig>,
    pub tls: Option<TlsPaths>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let host = env.or_default(HOST_ENV, "0.0.0.0");
        let port: u16 = env.parsed_or(PORT_ENV, 8080)?;
        let bind_addr = SocketAddr::from_str(&format!("{host}:{port}")).map_err(|e| {
            ConfigError::Invalid {
                name: HOST_ENV,
                reason: e.to_string(),
            }
        })?;

        let jwt_algorithm = match env.or_default(JWT_ALGORITHM_ENV, "HS256").as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => {
                return Err(ConfigError::Invalid {
                    name: JWT_ALGORITHM_ENV,
                    reason: format!("unsupported algorithm `{other}` (expected HS256, HS384 or HS512)"),
                })
            }
        };

        let access_minutes: i64 = env.parsed_or(ACCESS_TOKEN_EXPIRE_MINUTES_ENV, 30)?;
        let refresh_days: i64 = env.parsed_or(REFRESH_TOKEN_EXPIRE_DAYS_ENV, 7)?;
        if access_minutes <= 0 {
            return Err(ConfigError::Invalid {
                name: ACCESS_TOKEN_EXPIRE_MINUTES_ENV,
                reason: "must be positive".to_string(),
            });
        }
        if refresh_days <= 0 {
            return Err(ConfigError::Invalid {
                name: REFRESH_TOKEN_EXPIRE_DAYS_ENV,
                reason: "must be positive".to_string(),
            });
        }

        let classifier_url = env
            .optional(CLASSIFIER_URL_ENV)
            .map(|raw| {
                Url::parse(&raw).map_err(|e| ConfigError::Invalid {
                    name: CLASSIFIER_URL_ENV,
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let defaults = BalanceThresholds::default();
        let balance_thresholds = BalanceThresholds {
            sway_area: env.parsed_or(BALANCE_SWAY_AREA_MAX_ENV, defaults.sway_area)?,
            path_length: env.parsed_or(BALANCE_PATH_LENGTH_MAX_ENV, defaults.path_length)?,
            angular_variance: env
                .parsed_or(BALANCE_ANGULAR_VARIANCE_MAX_ENV, defaults.angular_variance)?,
            jerkiness: env.parsed_or(BALANCE_JERKINESS_MAX_ENV, defaults.jerkiness)?,
        };
        let balance_rule_confidence: f64 = env.parsed_or(BALANCE_RULE_CONFIDENCE_ENV, 1.0)?;
        if !(0.0..=1.0).contains(&balance_rule_confidence) {
            return Err(ConfigError::Invalid {
                name: BALANCE_RULE_CONFIDENCE_ENV,
                reason: "must be within [0, 1]".to_string(),
            });
        }

        let model_source = env.optional(MODEL_BUCKET_ENV).map(|bucket| ModelSource {
            bucket,
            prefix: env.optional(MODEL_PREFIX_ENV).unwrap_or_default(),
            local_path: PathBuf::from(env.or_default(MODEL_LOCAL_PATH_ENV, "./models")),
        });

        let twilio = match (
            env.optional(TWILIO_ACCOUNT_SID_ENV),
            env.optional(TWILIO_AUTH_TOKEN_ENV),
            env.optional(TWILIO_FROM_NUMBER_ENV),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number,
                channel: TwilioChannel::parse(&env.or_default(TWILIO_CHANNEL_ENV, "whatsapp")),
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: TWILIO_ACCOUNT_SID_ENV,
                    reason: "TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_FROM_NUMBER must be set together".to_string(),
                })
            }
        };

        let tls = match (env.optional(TLS_CERT_PATH_ENV), env.optional(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: TLS_CERT_PATH_ENV,
                    reason: "TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string(),
                })
            }
        };

        Ok(Self {
            bind_addr,
            data_dir: PathBuf::from(env.or_default(DATA_DIR_ENV, DEFAULT_DATA_ROOT)),
            jwt_secret: env.required(JWT_SECRET_ENV)?,
            jwt_algorithm,
            access_token_ttl: chrono::Duration::minutes(access_minutes),
            refresh_token_ttl: chrono::Duration::days(refresh_days),
            store_timeout: Duration::from_millis(env.parsed_or(STORE_TIMEOUT_MS_ENV, 5000)?),
            classifier_url,
            classifier_timeout: Duration::from_millis(
                env.parsed_or(CLASSIFIER_TIMEOUT_MS_ENV, 15000)?,
            ),
            speech_model_version: env.or_default(SPEECH_MODEL_VERSION_ENV, "v1.0"),
            balance_thresholds,
            balance_rule_confidence,
            model_source,
            twilio,
            tls,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed_or<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(move |name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_with_only_secret_set() {
        let config = config_from(&[(JWT_SECRET_ENV, "secret")]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.jwt_algorithm, Algorithm::HS256);
        assert_eq!(config.access_token_ttl, chrono::Duration::minutes(30));
        assert_eq!(config.refresh_token_ttl, chrono::Duration::days(7));
        assert_eq!(config.store_timeout, Duration::from_millis(5000));
        assert_eq!(config.classifier_timeout, Duration::from_millis(15000));
        assert_eq!(config.speech_model_version, "v1.0");
        assert_eq!(config.balance_thresholds, BalanceThresholds::default());
        assert_eq!(config.balance_rule_confidence, 1.0);
        assert!(config.classifier_url.is_none());
        assert!(config.model_source.is_none());
        assert!(config.twilio.is_none());
        assert!(config.tls.is_none());
    }

    #[test]
    fn secret_is_required() {
        assert_eq!(
            config_from(&[]).unwrap_err(),
            ConfigError::Missing(JWT_SECRET_ENV)
        );
        assert_eq!(
            config_from(&[(JWT_SECRET_ENV, "   ")]).unwrap_err(),
            ConfigError::Missing(JWT_SECRET_ENV)
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            (JWT_SECRET_ENV, "secret"),
            (PORT_ENV, "9000"),
            (JWT_ALGORITHM_ENV, "HS512"),
            (BALANCE_SWAY_AREA_MAX_ENV, "0.3"),
            (CLASSIFIER_URL_ENV, "http://classifier:8000/predict"),
            (MODEL_BUCKET_ENV, "models"),
            (MODEL_PREFIX_ENV, "speech/"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.jwt_algorithm, Algorithm::HS512);
        assert_eq!(config.balance_thresholds.sway_area, 0.3);
        assert_eq!(
            config.classifier_url.unwrap().as_str(),
            "http://classifier:8000/predict"
        );
        let source = config.model_source.unwrap();
        assert_eq!(source.prefix, "speech/");
        assert_eq!(source.local_path, PathBuf::from("./models"));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config_from(&[(JWT_SECRET_ENV, "s"), (PORT_ENV, "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: PORT_ENV, .. }));

        let err = config_from(&[(JWT_SECRET_ENV, "s"), (JWT_ALGORITHM_ENV, "RS256")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: JWT_ALGORITHM_ENV, .. }));

        let err = config_from(&[(JWT_SECRET_ENV, "s"), (BALANCE_RULE_CONFIDENCE_ENV, "2")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: BALANCE_RULE_CONFIDENCE_ENV, .. }));
    }

    #[test]
    fn partial_twilio_config_is_rejected() {
        let err = config_from(&[(JWT_SECRET_ENV, "s"), (TWILIO_ACCOUNT_SID_ENV, "AC1")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let config = config_from(&[
            (JWT_SECRET_ENV, "s"),
            (TWILIO_ACCOUNT_SID_ENV, "AC1"),
            (TWILIO_AUTH_TOKEN_ENV, "tok"),
            (TWILIO_FROM_NUMBER_ENV, "+1000"),
            (TWILIO_CHANNEL_ENV, "sms"),
        ])
        .unwrap();
        assert_eq!(config.twilio.unwrap().channel, TwilioChannel::Sms);
    }
}
