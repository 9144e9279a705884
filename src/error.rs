//! Console-level error handling
//!
//! Every failure in the top-up flow is converted to an `AppError` at the handler
//! boundary, which carries the HTTP status, a machine-readable code and the single
//! user-facing message.

use crate::finance::error::FinanceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
    #[serde(rename = "INVALID_AMOUNT")]
    InvalidAmount,
    #[serde(rename = "INVALID_GATEWAY_DESCRIPTOR")]
    InvalidGatewayDescriptor,
    #[serde(rename = "SESSION_REQUIRED")]
    SessionRequired,
    #[serde(rename = "FORBIDDEN")]
    Forbidden,
    #[serde(rename = "FINANCE_API_ERROR")]
    FinanceApiError,
    #[serde(rename = "NETWORK_ERROR")]
    NetworkError,
}

/// Input validation errors, raised before any network call
#[derive(Debug, Clone)]
pub enum ValidationError {
    InvalidAmount { amount: String, reason: String },
    InvalidInput {
        field: Option<String>,
        reason: String,
    },
    InvalidGatewayDescriptor { reason: String },
}

/// Request session problems
#[derive(Debug, Clone)]
pub enum SessionError {
    MissingUser,
    InvalidUser { user_id: String },
    RoleNotAllowed { role: Option<String> },
}

/// Finance API errors
#[derive(Debug, Clone)]
pub enum ExternalError {
    FinanceApi {
        message: String,
        status: Option<u16>,
    },
    Network { message: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Validation(ValidationError),
    Session(SessionError),
    External(ExternalError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Validation(err) => match err {
                ValidationError::InvalidAmount { .. } => 422,
                ValidationError::InvalidInput { .. } => 400,
                // The descriptor comes from the finance API, not the operator
                ValidationError::InvalidGatewayDescriptor { .. } => 502,
            },
            AppErrorKind::Session(err) => match err {
                SessionError::MissingUser | SessionError::InvalidUser { .. } => 401,
                SessionError::RoleNotAllowed { .. } => 403,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::FinanceApi { status, .. } => match status {
                    Some(401) => 401,
                    Some(403) => 403,
                    Some(404) => 404,
                    Some(code) if (400..500).contains(code) => 422,
                    _ => 502,
                },
                ExternalError::Network { .. } => 503,
            },
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Validation(err) => match err {
                ValidationError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
                ValidationError::InvalidInput { .. } => ErrorCode::ValidationError,
                ValidationError::InvalidGatewayDescriptor { .. } => {
                    ErrorCode::InvalidGatewayDescriptor
                }
            },
            AppErrorKind::Session(err) => match err {
                SessionError::MissingUser | SessionError::InvalidUser { .. } => {
                    ErrorCode::SessionRequired
                }
                SessionError::RoleNotAllowed { .. } => ErrorCode::Forbidden,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::FinanceApi { .. } => ErrorCode::FinanceApiError,
                ExternalError::Network { .. } => ErrorCode::NetworkError,
            },
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Validation(err) => match err {
                ValidationError::InvalidAmount { reason, .. } => reason.clone(),
                ValidationError::InvalidInput { reason, .. } => reason.clone(),
                ValidationError::InvalidGatewayDescriptor { reason } => reason.clone(),
            },
            AppErrorKind::Session(err) => match err {
                SessionError::MissingUser => "Please sign in to continue".to_string(),
                SessionError::InvalidUser { .. } => "Your session is invalid".to_string(),
                SessionError::RoleNotAllowed { .. } => {
                    "You are not allowed to top up this wallet".to_string()
                }
            },
            AppErrorKind::External(err) => match err {
                ExternalError::FinanceApi { message, .. } => message.clone(),
                ExternalError::Network { .. } => {
                    crate::finance::error::NETWORK_ERROR_MESSAGE.to_string()
                }
            },
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            &self.kind,
            AppErrorKind::External(ExternalError::Network { .. })
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

impl From<FinanceError> for AppError {
    fn from(err: FinanceError) -> Self {
        let kind = match err {
            FinanceError::Validation { message, field } => match field {
                Some(name) if name == "amount" => {
                    AppErrorKind::Validation(ValidationError::InvalidAmount {
                        amount: String::new(),
                        reason: message,
                    })
                }
                Some(name) if name.ends_with("_url") => {
                    AppErrorKind::Validation(ValidationError::InvalidGatewayDescriptor {
                        reason: message,
                    })
                }
                field => AppErrorKind::Validation(ValidationError::InvalidInput {
                    field,
                    reason: message,
                }),
            },
            err @ (FinanceError::MissingGatewayFields { .. }
            | FinanceError::UnexpectedGatewayFields { .. }
            | FinanceError::AmountMismatch { .. }) => {
                AppErrorKind::Validation(ValidationError::InvalidGatewayDescriptor {
                    reason: err.user_message(),
                })
            }
            FinanceError::Network { message } => {
                AppErrorKind::External(ExternalError::Network { message })
            }
            FinanceError::Application { message, status } => {
                AppErrorKind::External(ExternalError::FinanceApi { message, status })
            }
            err @ FinanceError::InvalidResponse { .. } => {
                AppErrorKind::External(ExternalError::FinanceApi {
                    message: err.user_message(),
                    status: None,
                })
            }
        };

        AppError::new(kind)
    }
}
