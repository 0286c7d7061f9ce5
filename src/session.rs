// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Server-side sessions.
//!
//! A session links the opaque `session_id` cookie held by the browser to the
//! privilege token obtained during login. Sessions live only in process
//! memory and expire two hours after creation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::cache::{ExpiringCache, Purge};
use crate::config::CookieSettings;
use crate::error::ServiceError;
use crate::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "session_id";

/// Fixed lifetime of a session and its cookie.
pub const SESSION_TTL: Duration = Duration::from_secs(2 * 60 * 60);

const SESSION_CAPACITY: usize = 100_000;

/// Opaque session identifier carried by the cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a cookie value. Anything that is not a UUID cannot name a session.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live session.
#[derive(Clone)]
pub struct Session {
    pub id: SessionId,
    pub privilege_token: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("privilege_token", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Session store backed by the expiring cache.
///
/// Cloning shares the underlying cache.
#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<ExpiringCache<Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SESSION_CAPACITY, SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Arc::new(ExpiringCache::new(capacity, ttl)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.cache.default_ttl()
    }

    /// Mint a new session bound to `privilege_token`.
    pub fn establish(&self, privilege_token: String) -> Session {
        let session = Session {
            id: SessionId::generate(),
            privilege_token,
            created_at: Utc::now(),
        };
        self.cache.insert(session.id.to_string(), session.clone());
        session
    }

    pub fn get(&self, id: &SessionId) -> Option<Session> {
        self.cache.get(&id.to_string())
    }

    pub fn privilege_token(&self, id: &SessionId) -> Option<String> {
        self.get(id).map(|session| session.privilege_token)
    }

    pub fn remaining_ttl(&self, id: &SessionId) -> Option<Duration> {
        self.cache.remaining_ttl(&id.to_string())
    }

    /// Drop a session. Returns whether it existed.
    pub fn destroy(&self, id: &SessionId) -> bool {
        self.cache.remove(&id.to_string()).is_some()
    }

    /// Look up the session named by the request's cookie, if any.
    pub fn from_jar(&self, jar: &CookieJar) -> Option<Session> {
        let id = session_id_from_jar(jar)?;
        self.get(&id)
    }

    /// Number of cached sessions, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn purgeable(&self) -> Arc<dyn Purge> {
        self.cache.clone()
    }
}

pub fn session_id_from_jar(jar: &CookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE_NAME)
        .and_then(|cookie| SessionId::parse(cookie.value()))
}

/// Build the HTTP-only session cookie.
pub fn session_cookie(id: &SessionId, ttl: Duration, settings: &CookieSettings) -> Cookie<'static> {
    let max_age = time::Duration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
    let mut builder = Cookie::build((SESSION_COOKIE_NAME, id.to_string()))
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age);
    if let Some(domain) = &settings.domain {
        builder = builder.domain(domain.clone());
    }
    builder.build()
}

/// Removal cookie matching the attributes of [`session_cookie`].
pub fn clear_session_cookie(settings: &CookieSettings) -> Cookie<'static> {
    let mut builder = Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .max_age(time::Duration::ZERO);
    if let Some(domain) = &settings.domain {
        builder = builder.domain(domain.clone());
    }
    builder.build()
}

/// Extractor requiring a live session.
///
/// Rejects with `401` before any handler code runs. A missing cookie and a
/// cookie that no longer maps to a cached privilege token are reported
/// separately.
pub struct ActiveSession(pub Session);

impl FromRequestParts<AppState> for ActiveSession {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        if jar.get(SESSION_COOKIE_NAME).is_none() {
            return Err(ServiceError::Unauthenticated("Not logged in".to_string()));
        }

        state
            .sessions
            .from_jar(&jar)
            .map(ActiveSession)
            .ok_or_else(|| {
                ServiceError::Unauthenticated(
                    "Session expired or privilege token not available".to_string(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, Request};

    use crate::test_support::TestState;

    fn cookie_settings() -> CookieSettings {
        CookieSettings {
            domain: Some("localhost".to_string()),
            secure: false,
        }
    }

    #[test]
    fn establish_binds_token_to_new_id() {
        let store = SessionStore::default();
        let a = store.establish("token-a".to_string());
        let b = store.establish("token-b".to_string());

        assert_ne!(a.id, b.id);
        assert_eq!(store.privilege_token(&a.id).as_deref(), Some("token-a"));
        assert_eq!(store.privilege_token(&b.id).as_deref(), Some("token-b"));
    }

    #[test]
    fn session_ttl_is_two_hours() {
        let store = SessionStore::default();
        let session = store.establish("token".to_string());
        let remaining = store.remaining_ttl(&session.id).unwrap();
        assert!(remaining <= Duration::from_secs(7200));
        assert!(remaining > Duration::from_secs(7100));
    }

    #[test]
    fn destroy_removes_session() {
        let store = SessionStore::default();
        let session = store.establish("token".to_string());
        assert!(store.destroy(&session.id));
        assert!(store.get(&session.id).is_none());
        assert!(!store.destroy(&session.id));
    }

    #[test]
    fn expired_session_is_gone() {
        let store = SessionStore::new(10, Duration::from_millis(1));
        let session = store.establish("token".to_string());
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.privilege_token(&session.id).is_none());
    }

    #[test]
    fn parse_rejects_non_uuid_values() {
        assert!(SessionId::parse("not-a-session").is_none());
        assert!(SessionId::parse("7f1c1b7e-4a8e-4d55-9d3b-55b0a4e3c2a1").is_some());
    }

    #[test]
    fn from_jar_resolves_only_live_sessions() {
        let store = SessionStore::default();
        let session = store.establish("token".to_string());

        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE_NAME, session.id.to_string()));
        assert_eq!(store.from_jar(&jar).map(|s| s.id), Some(session.id));

        let forged = CookieJar::new().add(Cookie::new(SESSION_COOKIE_NAME, "forged"));
        assert!(store.from_jar(&forged).is_none());
        assert!(store.from_jar(&CookieJar::new()).is_none());

        store.destroy(&session.id);
        assert!(store.from_jar(&jar).is_none());
    }

    #[test]
    fn debug_redacts_privilege_token() {
        let store = SessionStore::default();
        let session = store.establish("super-secret-token".to_string());
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("super-secret-token"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn cookie_is_http_only_and_matches_ttl() {
        let store = SessionStore::default();
        let session = store.establish("token".to_string());
        let cookie = session_cookie(&session.id, SESSION_TTL, &cookie_settings());

        assert_eq!(cookie.name(), "session_id");
        assert_eq!(cookie.value(), session.id.to_string());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.domain(), Some("localhost"));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(2)));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(&cookie_settings());
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }

    #[tokio::test]
    async fn extractor_distinguishes_missing_and_unknown_sessions() {
        let state = TestState::new().into_state();

        let mut parts = Request::builder().uri("/").body(()).unwrap().into_parts().0;
        let err = ActiveSession::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.public_message(), "Not logged in");

        let mut parts = Request::builder()
            .uri("/")
            .header(COOKIE, "session_id=7f1c1b7e-4a8e-4d55-9d3b-55b0a4e3c2a1")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let err = ActiveSession::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::Unauthenticated(_)));
        assert_ne!(err.public_message(), "Not logged in");
    }

    #[tokio::test]
    async fn extractor_resolves_live_session() {
        let state = TestState::new().into_state();
        let session = state.sessions.establish("token-a".to_string());

        let mut parts = Request::builder()
            .uri("/")
            .header(COOKIE, format!("session_id={}", session.id))
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let ActiveSession(found) = ActiveSession::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.privilege_token, "token-a");
    }
}
