//! Response interpretation: the single normalisation point for the dual
//! failure channel. A response fails when its status is non-success or when
//! its body encodes a failure, and both roads lead to the same tagged result.

use console_types::error::FieldErrors;
use reqwest::{header, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::IntentError;

/// Response body decoded according to the declared content type.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(serde_json::Value),
    Text(String),
}

impl Body {
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, IntentError> {
        match self {
            Body::Json(value) => serde_json::from_value(value)
                .map_err(|err| IntentError::Transport(format!("unexpected response body: {err}"))),
            Body::Text(_) => Err(IntentError::Transport(
                "expected a JSON response body".to_string(),
            )),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Body::Json(value) => value.to_string(),
            Body::Text(text) => text,
        }
    }
}

/// Read the body per the declared content type and fold the transport status
/// into the result. Success statuses pass the body through untouched.
pub async fn interpret(response: Response) -> Result<Body, IntentError> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("application/json"))
        .unwrap_or(false);

    let body = if is_json {
        Body::Json(response.json().await?)
    } else {
        Body::Text(response.text().await?)
    };

    if status.is_success() {
        return Ok(body);
    }
    Err(failure(status, body))
}

/// Shape a failed response into the error taxonomy: a JSON object body keeps
/// its field errors verbatim, anything else becomes a status message.
pub(crate) fn failure(status: StatusCode, body: Body) -> IntentError {
    match body {
        Body::Json(serde_json::Value::Object(map)) => {
            IntentError::Validation(FieldErrors(map.into_iter().collect()))
        }
        Body::Json(other) => IntentError::Http {
            status: status.as_u16(),
            message: other.to_string(),
        },
        Body::Text(text) if !text.trim().is_empty() => IntentError::Http {
            status: status.as_u16(),
            message: text,
        },
        Body::Text(_) => IntentError::Http {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        },
    }
}
