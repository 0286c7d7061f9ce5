// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login endpoints.
//!
//! The browser asks for a challenge, has the wallet sign it, and submits the
//! signature. A successful submission answers with the `session_id` cookie;
//! the privilege token itself never leaves the server.

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Form, Json,
};
use axum_extra::extract::{cookie::CookieJar, WithRejection};

use crate::{
    auth::extractor::bearer_token,
    error::{ErrorBody, ServiceError},
    models::{
        Challenge, GenerateChallengeForm, LogoutResponse, SessionEstablished, SubmitChallengeForm,
    },
    session::{clear_session_cookie, session_cookie, session_id_from_jar, Session},
    state::AppState,
};

fn with_session_cookie(
    state: &AppState,
    jar: CookieJar,
    session: &Session,
    message: &str,
) -> (CookieJar, Json<SessionEstablished>) {
    let ttl = state.sessions.ttl();
    let jar = jar.add(session_cookie(&session.id, ttl, &state.cookie));
    (
        jar,
        Json(SessionEstablished {
            message: message.to_string(),
            expires_in: ttl.as_secs(),
        }),
    )
}

/// Request a challenge for a wallet address.
#[utoipa::path(
    post,
    path = "/auth/web3/generate_challenge",
    tag = "Auth",
    request_body(content = GenerateChallengeForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Challenge issued", body = Challenge),
        (status = 400, description = "Address missing or malformed form", body = ErrorBody),
        (status = 502, description = "Identity provider failed", body = ErrorBody)
    )
)]
pub async fn generate_challenge(
    State(state): State<AppState>,
    WithRejection(Form(form), _): WithRejection<Form<GenerateChallengeForm>, ServiceError>,
) -> Result<Json<Challenge>, ServiceError> {
    let challenge = state.authenticator.issue_challenge(&form.address).await?;
    Ok(Json(challenge))
}

/// Submit the signed challenge and open a session.
///
/// On success the `session_id` cookie is set (HTTP-only, two hours).
#[utoipa::path(
    post,
    path = "/auth/web3/submit_challenge",
    tag = "Auth",
    request_body(content = SubmitChallengeForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Session established", body = SessionEstablished),
        (status = 400, description = "State or signature missing or malformed form", body = ErrorBody),
        (status = 502, description = "Identity provider rejected or failed", body = ErrorBody)
    )
)]
pub async fn submit_challenge(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Form(form), _): WithRejection<Form<SubmitChallengeForm>, ServiceError>,
) -> Result<(CookieJar, Json<SessionEstablished>), ServiceError> {
    let session = state
        .authenticator
        .submit_signature(&form.state, &form.signature)
        .await?;
    Ok(with_session_cookie(&state, jar, &session, "Login successful"))
}

/// Open a session for a bearer token issued by the federated login widget.
#[utoipa::path(
    post,
    path = "/auth/session",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Session established", body = SessionEstablished),
        (status = 401, description = "Token missing or invalid", body = ErrorBody)
    )
)]
pub async fn establish_session(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Json<SessionEstablished>), ServiceError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthenticated("Missing bearer token".to_string()))
        .and_then(|value| {
            bearer_token(value).map_err(|e| ServiceError::Unauthenticated(e.to_string()))
        })?;

    let (session, _caller) = state.authenticator.establish_from_token(&token).await?;
    Ok(with_session_cookie(&state, jar, &session, "Session established"))
}

/// Destroy the current session and clear its cookie. Idempotent.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse)
    )
)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    state.authenticator.logout(session_id_from_jar(&jar));
    let jar = jar.add(clear_session_cookie(&state.cookie));
    (
        jar,
        Json(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
            Request, StatusCode,
        },
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::api::test_router;
    use crate::session::SessionId;
    use crate::test_support::{sign_test_token, FakeIdentityProvider, TestState};

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn session_cookie_value(response: &axum::response::Response) -> String {
        let header = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("session_id="))
            .expect("session cookie set")
            .to_string();
        header
            .trim_start_matches("session_id=")
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    fn app(test_state: &TestState) -> (Router, crate::state::AppState) {
        let state = test_state.state();
        (test_router(state.clone()), state)
    }

    #[tokio::test]
    async fn challenge_requires_address() {
        let test_state = TestState::new();
        let (app, _) = app(&test_state);

        let response = app
            .oneshot(form_post("/auth/web3/generate_challenge", "address="))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], true);
        assert_eq!(test_state.provider.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_forms_get_json_errors() {
        let test_state = TestState::new();
        let (app, state) = app(&test_state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/web3/generate_challenge")
                    .header(CONTENT_TYPE, "text/plain")
                    .body(Body::from("address=0xABC"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let body = json_body(response).await;
        assert_eq!(body["error"], true);
        assert!(body["message"].is_string());

        let response = app
            .oneshot(form_post("/auth/web3/submit_challenge", "state=s1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], true);

        assert_eq!(test_state.provider.calls(), 0);
        assert!(state.sessions.is_empty());
    }

    #[tokio::test]
    async fn challenge_is_relayed() {
        let test_state =
            TestState::new().with_provider(FakeIdentityProvider::default().with_challenge("s1", "c1"));
        let (app, _) = app(&test_state);

        let response = app
            .oneshot(form_post("/auth/web3/generate_challenge", "address=0xABC"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["state"], "s1");
        assert_eq!(body["challenge"], "c1");
        assert_eq!(test_state.provider.challenged_addresses(), vec!["0xABC"]);
    }

    #[tokio::test]
    async fn submit_sets_cookie_mapped_to_access_token() {
        let test_state = TestState::new()
            .with_provider(FakeIdentityProvider::default().with_access_token("upstream-token"));
        let (app, state) = app(&test_state);

        let response = app
            .oneshot(form_post(
                "/auth/web3/submit_challenge",
                "state=s1&signature=0xsigned",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Max-Age=7200"));

        let id = SessionId::parse(&session_cookie_value(&response)).unwrap();
        assert_eq!(state.sessions.privilege_token(&id).as_deref(), Some("upstream-token"));

        let body = json_body(response).await;
        assert_eq!(body["expires_in"], 7200);
        assert!(!body.to_string().contains("upstream-token"));
    }

    #[tokio::test]
    async fn rejected_submission_sets_no_cookie() {
        let test_state =
            TestState::new().with_provider(FakeIdentityProvider::default().failing_submit());
        let (app, state) = app(&test_state);

        let response = app
            .oneshot(form_post(
                "/auth/web3/submit_challenge",
                "state=s1&signature=0xsigned",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert!(state.sessions.is_empty());
    }

    #[tokio::test]
    async fn bearer_session_requires_valid_token() {
        let test_state = TestState::new();
        let (app, state) = app(&test_state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let token = sign_test_token("0xABC");
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/session")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = SessionId::parse(&session_cookie_value(&response)).unwrap();
        assert_eq!(state.sessions.privilege_token(&id), Some(token));
    }

    #[tokio::test]
    async fn logout_destroys_session_and_clears_cookie() {
        let test_state = TestState::new();
        let (app, state) = app(&test_state);
        let session = state.sessions.establish("token".to_string());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/logout")
                    .header(COOKIE, format!("session_id={}", session.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(session_cookie_value(&response), "");
        assert!(state.sessions.get(&session.id).is_none());
    }
}
