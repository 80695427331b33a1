pub mod oauth;
pub mod token_store;

use thiserror::Error;

pub use oauth::linkedin::{
    authorization_url, exchange_code, exchange_code_default, wait_for_callback, TokenResponse,
    DEFAULT_REDIRECT_URI, DEFAULT_SCOPES,
};
pub use token_store::{StoredToken, TokenStore};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization was denied: {0}")]
    Denied(String),
    #[error("state parameter mismatch in oauth callback")]
    StateMismatch,
    #[error("token endpoint error ({status}): {body}")]
    TokenEndpoint {
        status: reqwest::StatusCode,
        body: String,
    },
}
