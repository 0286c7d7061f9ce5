// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup into
//! [`Settings`] and injected into [`AppState`](crate::state::AppState).
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `CLIENT_ID` | Client id registered with the identity provider | Required |
//! | `DOMAIN` | Redirect domain registered with the identity provider | Required |
//! | `SCOPE` | Scope requested for the challenge | `openid email` |
//! | `RESPONSE_TYPE` | Response type requested for the challenge | `code` |
//! | `GRANT_TYPE` | Grant type used when submitting a signature | `authorization_code` |
//! | `AUTH_URL` | Challenge issuance endpoint | Required |
//! | `SUBMIT_CHALLENGE_URL` | Signature submission endpoint | Required |
//! | `IDENTITY_API_URL` | Identity GraphQL endpoint | Required |
//! | `TRIPS_API_BASE_URL` | Trip listing service base URL | Required |
//! | `DEVICE_DATA_API_BASE_URL` | Telemetry history service base URL | Required |
//! | `TOKEN_EXCHANGE_JWKS_URL` | JWKS endpoint for bearer verification | Required |
//! | `JWT_ISSUER` | Expected JWT issuer claim | Optional |
//! | `JWT_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `COOKIE_DOMAIN` | Domain attribute of the session cookie | Optional |
//! | `COOKIE_SECURE` | Mark the session cookie `Secure` | `false` |
//! | `CORS_ALLOWED_ORIGIN` | Browser origin allowed to send credentials | `http://localhost:3000` |
//! | `UPSTREAM_TIMEOUT_SECS` | Timeout for every outbound call | `10` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; HTTPS when both are set | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::time::Duration;

use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SCOPE: &str = "openid email";
const DEFAULT_RESPONSE_TYPE: &str = "code";
const DEFAULT_GRANT_TYPE: &str = "authorization_code";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Default `RUST_LOG` filter when the variable is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {name} is not a valid URL: {reason}")]
    InvalidUrl { name: &'static str, reason: String },

    #[error("environment variable {name} has an invalid value: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Parameters sent to the identity provider on every handshake request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProviderSettings {
    pub client_id: String,
    pub domain: String,
    pub scope: String,
    pub response_type: String,
    pub grant_type: String,
    pub challenge_url: Url,
    pub submit_url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub domain: Option<String>,
    pub secure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtSettings {
    pub jwks_url: Url,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    pub cert_path: String,
    pub key_path: String,
}

/// Fully resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub identity_provider: IdentityProviderSettings,
    pub identity_api_url: Url,
    pub trips_api_base_url: Url,
    pub device_data_api_base_url: Url,
    pub jwt: JwtSettings,
    pub cookie: CookieSettings,
    pub cors_allowed_origin: String,
    pub upstream_timeout: Duration,
    pub tls: Option<TlsSettings>,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));
        let required_url = |name: &'static str| parse_url(name, &required(name)?);
        let or_default = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                name: PORT_ENV,
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let upstream_timeout_secs = match get("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "UPSTREAM_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        let cookie_secure = match get("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                name: "COOKIE_SECURE",
                value: raw,
            })?,
            None => false,
        };

        let tls = match (get("TLS_CERT_PATH"), get("TLS_KEY_PATH")) {
            (Some(cert_path), Some(key_path)) => Some(TlsSettings {
                cert_path,
                key_path,
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("TLS_KEY_PATH")),
            (None, Some(_)) => return Err(ConfigError::Missing("TLS_CERT_PATH")),
        };

        Ok(Self {
            host: or_default(HOST_ENV, DEFAULT_HOST),
            port,
            identity_provider: IdentityProviderSettings {
                client_id: required("CLIENT_ID")?,
                domain: required("DOMAIN")?,
                scope: or_default("SCOPE", DEFAULT_SCOPE),
                response_type: or_default("RESPONSE_TYPE", DEFAULT_RESPONSE_TYPE),
                grant_type: or_default("GRANT_TYPE", DEFAULT_GRANT_TYPE),
                challenge_url: required_url("AUTH_URL")?,
                submit_url: required_url("SUBMIT_CHALLENGE_URL")?,
            },
            identity_api_url: required_url("IDENTITY_API_URL")?,
            trips_api_base_url: required_url("TRIPS_API_BASE_URL")?,
            device_data_api_base_url: required_url("DEVICE_DATA_API_BASE_URL")?,
            jwt: JwtSettings {
                jwks_url: required_url("TOKEN_EXCHANGE_JWKS_URL")?,
                issuer: get("JWT_ISSUER"),
                audience: get("JWT_AUDIENCE"),
            },
            cookie: CookieSettings {
                domain: get("COOKIE_DOMAIN"),
                secure: cookie_secure,
            },
            cors_allowed_origin: or_default("CORS_ALLOWED_ORIGIN", DEFAULT_CORS_ORIGIN),
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            tls,
        })
    }

    /// `host:port` string for binding the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        name,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidUrl {
            name,
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
