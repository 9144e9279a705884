use serde_json::Value as JsonValue;
use thiserror::Error;

pub type FinanceResult<T> = Result<T, FinanceError>;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection and try again.";

#[derive(Debug, Clone, Error)]
pub enum FinanceError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Missing required fields: {}", fields.join(", "))]
    MissingGatewayFields { fields: Vec<String> },

    #[error("Unexpected gateway fields: {}", fields.join(", "))]
    UnexpectedGatewayFields { fields: Vec<String> },

    #[error("Payment amount mismatch: amount={amount}, amount_paisa={amount_minor}")]
    AmountMismatch {
        amount: String,
        amount_minor: String,
    },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Finance API error: {message}")]
    Application {
        message: String,
        status: Option<u16>,
    },

    #[error("Invalid finance API response: {message}")]
    InvalidResponse { message: String },
}

impl FinanceError {
    pub fn validation(message: impl Into<String>, field: Option<&str>) -> Self {
        FinanceError::Validation {
            message: message.into(),
            field: field.map(str::to_string),
        }
    }

    /// Only transport failures are worth a manual retry of the same action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FinanceError::Network { .. })
    }

    /// Errors raised before any network call or navigation side effect.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            FinanceError::Validation { .. }
                | FinanceError::MissingGatewayFields { .. }
                | FinanceError::UnexpectedGatewayFields { .. }
        )
    }

    /// The single display string shown to the operator.
    pub fn user_message(&self) -> String {
        match self {
            FinanceError::Validation { message, .. } => message.clone(),
            FinanceError::MissingGatewayFields { .. }
            | FinanceError::UnexpectedGatewayFields { .. }
            | FinanceError::AmountMismatch { .. } => self.to_string(),
            FinanceError::Network { .. } => NETWORK_ERROR_MESSAGE.to_string(),
            FinanceError::Application { message, .. } => message.clone(),
            FinanceError::InvalidResponse { .. } => {
                "The finance service returned an unexpected response".to_string()
            }
        }
    }

    /// Underlying message without the category prefix.
    pub fn detail(&self) -> String {
        match self {
            FinanceError::Validation { message, .. }
            | FinanceError::Network { message }
            | FinanceError::Application { message, .. }
            | FinanceError::InvalidResponse { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Turns a backend error body into one readable string.
///
/// Understands `{"message": ..}`, `{"detail": ..}`, `{"error": ..}`,
/// `{"errors": {field: [..]}}` and bare `{field: [..]}` maps. Field errors are
/// expanded into `Field Name: message` lines.
pub fn extract_error_message(body: &JsonValue) -> Option<String> {
    match body {
        JsonValue::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        JsonValue::Array(items) => {
            let lines: Vec<String> = items.iter().filter_map(flatten_messages).collect();
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        JsonValue::Object(map) => {
            if let Some(errors) = map.get("errors").filter(|v| v.is_object()) {
                if let Some(lines) = field_error_lines(errors) {
                    return Some(lines);
                }
            }
            for key in ["message", "detail", "error"] {
                if let Some(text) = map.get(key).and_then(flatten_messages) {
                    return Some(text);
                }
            }
            field_error_lines(body)
        }
        _ => None,
    }
}

fn field_error_lines(errors: &JsonValue) -> Option<String> {
    let map = errors.as_object()?;
    let lines: Vec<String> = map
        .iter()
        .filter(|(field, _)| field.as_str() != "success")
        .filter_map(|(field, value)| {
            let message = flatten_messages(value)?;
            if field == "non_field_errors" || field == "__all__" {
                Some(message)
            } else {
                Some(format!("{}: {}", humanize_field(field), message))
            }
        })
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn flatten_messages(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        JsonValue::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(flatten_messages).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        JsonValue::Object(_) => field_error_lines(value),
        _ => None,
    }
}

/// `amount_paisa` -> `Amount Paisa`
pub fn humanize_field(field: &str) -> String {
    field
        .split(|c: char| c == '_' || c == '-' || c == '.')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
