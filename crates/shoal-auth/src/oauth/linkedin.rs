//! LinkedIn OAuth 2.0 authorization-code flow.
//!
//! The flow is: build an authorization URL, let the user approve in a
//! browser, capture the code on a local callback listener, then exchange
//! it for an access token. Token persistence lives in [`crate::TokenStore`].

use std::future::IntoFuture;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use axum::extract::Query;
use axum::response::Html;
use axum::Router;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::oneshot;

use crate::AuthError;

const AUTHORIZATION_ENDPOINT: &str = "https://www.linkedin.com/oauth/v2/authorization";
const TOKEN_ENDPOINT_BASE: &str = "https://www.linkedin.com";

/// OpenID Connect scopes plus `w_member_social` for posting. Requires the
/// "Share on LinkedIn" product on the developer app.
pub const DEFAULT_SCOPES: &[&str] = &["openid", "profile", "email", "w_member_social"];

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8083/auth/linkedin/callback";

/// Build the browser authorization URL.
pub fn authorization_url(
    client_id: &str,
    redirect_uri: &str,
    state: &str,
    scopes: &[&str],
) -> String {
    let scope = scopes.join(" ");
    format!(
        "{AUTHORIZATION_ENDPOINT}?response_type=code&client_id={}&redirect_uri={}&state={}&scope={}",
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(state),
        urlencoding::encode(&scope),
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Exchange an authorization code for an access token.
///
/// `base_url` is the token endpoint host; production callers pass
/// [`exchange_code_default`]'s default.
pub async fn exchange_code(
    http: &reqwest::Client,
    base_url: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse> {
    let url = format!("{}/oauth/v2/accessToken", base_url.trim_end_matches('/'));
    let resp = http
        .post(&url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await
        .context("token exchange request failed")?;

    let status = resp.status();
    if status != StatusCode::OK {
        let body = resp.text().await.unwrap_or_default();
        return Err(AuthError::TokenEndpoint { status, body }.into());
    }
    Ok(resp.json().await?)
}

pub async fn exchange_code_default(
    http: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse> {
    exchange_code(
        http,
        TOKEN_ENDPOINT_BASE,
        client_id,
        client_secret,
        code,
        redirect_uri,
    )
    .await
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

const SUCCESS_PAGE: &str = "<html><head><title>Authorization complete</title></head>\
<body><h1>Authorization successful</h1>\
<p>You can close this window and return to the terminal.</p></body></html>";

const ERROR_PAGE: &str = "<html><head><title>Authorization failed</title></head>\
<body><h1>Authorization failed</h1><p>Check the terminal for details.</p></body></html>";

/// Run a one-shot local listener and wait for the OAuth redirect.
///
/// Returns the authorization code. Any path is accepted since redirect
/// URI registrations vary; requests without OAuth parameters (favicons
/// and the like) are ignored.
pub async fn wait_for_callback(port: u16, expected_state: String) -> Result<String> {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind callback listener on port {port}"))?;

    let (tx, rx) = oneshot::channel::<Result<String>>();
    let tx = Arc::new(Mutex::new(Some(tx)));

    let app = Router::new().fallback(move |Query(params): Query<CallbackParams>| {
        let tx = tx.clone();
        let expected_state = expected_state.clone();
        async move {
            if params.code.is_none() && params.error.is_none() {
                return Html("<html><body>Waiting for authorization...</body></html>");
            }
            if let Some(state) = &params.state {
                if *state != expected_state {
                    if let Some(tx) = tx.lock().ok().and_then(|mut g| g.take()) {
                        let _ = tx.send(Err(AuthError::StateMismatch.into()));
                    }
                    return Html(ERROR_PAGE);
                }
            }
            if let Some(code) = params.code {
                if let Some(tx) = tx.lock().ok().and_then(|mut g| g.take()) {
                    let _ = tx.send(Ok(code));
                }
                return Html(SUCCESS_PAGE);
            }
            let error = params.error.unwrap_or_else(|| "unknown error".into());
            if let Some(tx) = tx.lock().ok().and_then(|mut g| g.take()) {
                let _ = tx.send(Err(AuthError::Denied(error).into()));
            }
            Html(ERROR_PAGE)
        }
    });

    tracing::info!(port, "waiting for oauth callback");
    tokio::select! {
        outcome = rx => {
            // Give the browser a moment to receive the response page
            // before the listener is dropped.
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            outcome.map_err(|_| anyhow!("callback listener closed unexpectedly"))?
        }
        served = axum::serve(listener, app).into_future() => {
            served.context("callback listener failed")?;
            Err(anyhow!("callback listener exited before receiving a code"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn authorization_url_carries_all_params() {
        let url = authorization_url(
            "client-1",
            DEFAULT_REDIRECT_URI,
            "state-xyz",
            DEFAULT_SCOPES,
        );
        assert!(url.starts_with("https://www.linkedin.com/oauth/v2/authorization?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("state=state-xyz"));
        assert!(url.contains("w_member_social"));
        assert!(url.contains(&urlencoding::encode(DEFAULT_REDIRECT_URI).into_owned()));
    }

    #[tokio::test]
    async fn exchange_code_parses_token_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/v2/accessToken"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-999",
                "expires_in": 5183999,
                "scope": "openid,profile"
            })))
            .mount(&server)
            .await;

        let token = exchange_code(
            &reqwest::Client::new(),
            &server.uri(),
            "client-1",
            "secret-1",
            "abc123",
            DEFAULT_REDIRECT_URI,
        )
        .await
        .unwrap();
        assert_eq!(token.access_token, "tok-999");
        assert_eq!(token.expires_in, Some(5183999));
    }

    #[tokio::test]
    async fn exchange_code_surfaces_endpoint_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/v2/accessToken"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let err = exchange_code(
            &reqwest::Client::new(),
            &server.uri(),
            "client-1",
            "secret-1",
            "expired",
            DEFAULT_REDIRECT_URI,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn callback_resolves_on_code() {
        let port = 18931;
        let handle =
            tokio::spawn(async move { wait_for_callback(port, "state-1".into()).await });
        // Let the listener bind before hitting it.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let url =
            format!("http://127.0.0.1:{port}/auth/linkedin/callback?code=the-code&state=state-1");
        let body = reqwest::get(&url).await.unwrap().text().await.unwrap();
        assert!(body.contains("Authorization successful"));

        let code = handle.await.unwrap().unwrap();
        assert_eq!(code, "the-code");
    }

    #[tokio::test]
    async fn callback_rejects_state_mismatch() {
        let port = 18932;
        let handle =
            tokio::spawn(async move { wait_for_callback(port, "expected".into()).await });
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let url = format!("http://127.0.0.1:{port}/?code=x&state=wrong");
        reqwest::get(&url).await.unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("state"));
    }
}
