//! Session forwarded by the tenant auth proxy.

use crate::error::{AppError, AppErrorKind, SessionError};
use crate::finance::backend::Caller;
use crate::finance::client::is_path_safe_user_id;
use crate::finance::types::Wallet;
use crate::middleware::error::get_request_id_from_headers;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::warn;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const SESSION_WALLET_HEADER: &str = "x-session-wallet";

#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: String,
    pub role: Option<String>,
    pub bearer_token: Option<String>,
    /// Wallet embedded in the session, if the proxy forwarded one.
    pub wallet: Option<Wallet>,
    pub request_id: Option<String>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// A snapshot that cannot be decoded is dropped; the wallet is fetched instead.
fn decode_wallet(raw: &str) -> Option<Wallet> {
    let bytes = match STANDARD.decode(raw) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Session wallet header is not valid base64");
            return None;
        }
    };
    match serde_json::from_slice::<Wallet>(&bytes) {
        Ok(wallet) => Some(wallet),
        Err(e) => {
            warn!(error = %e, "Session wallet header is not a wallet");
            None
        }
    }
}

impl SessionContext {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let request_id = get_request_id_from_headers(headers);

        let user_id = header_str(headers, USER_ID_HEADER).ok_or_else(|| {
            let err = AppError::new(AppErrorKind::Session(SessionError::MissingUser));
            match &request_id {
                Some(id) => err.with_request_id(id.clone()),
                None => err,
            }
        })?;

        if !is_path_safe_user_id(user_id) {
            let err = AppError::new(AppErrorKind::Session(SessionError::InvalidUser {
                user_id: user_id.to_string(),
            }));
            return Err(match &request_id {
                Some(id) => err.with_request_id(id.clone()),
                None => err,
            });
        }

        let bearer_token = header_str(headers, header::AUTHORIZATION.as_str())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        Ok(Self {
            user_id: user_id.to_string(),
            role: header_str(headers, USER_ROLE_HEADER).map(str::to_string),
            bearer_token,
            wallet: header_str(headers, SESSION_WALLET_HEADER).and_then(decode_wallet),
            request_id,
        })
    }

    pub fn caller(&self) -> Caller {
        Caller::new(self.user_id.clone()).with_bearer(self.bearer_token.clone())
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        SessionContext::from_headers(&parts.headers)
    }
}
