use std::fmt;

use serde::Serialize;

use crate::error::ErrorDetail;

/// A named operation in the intent catalog, addressed as `<domain>/<action>`
/// the way the event sink consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentKind {
    pub domain: &'static str,
    pub action: &'static str,
}

impl IntentKind {
    pub const fn new(domain: &'static str, action: &'static str) -> Self {
        Self { domain, action }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.action)
    }
}

/// Progress signal shape consumed by the application state store:
/// `{kind, payload?, error?}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleEvent {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl LifecycleEvent {
    pub fn start(intent: IntentKind) -> Self {
        Self {
            kind: format!("{intent}Start"),
            payload: None,
            error: false,
        }
    }

    pub fn success(intent: IntentKind, payload: Option<serde_json::Value>) -> Self {
        Self {
            kind: format!("{intent}Success"),
            payload,
            error: false,
        }
    }

    pub fn failure(intent: IntentKind, detail: ErrorDetail) -> Self {
        Self {
            kind: format!("{intent}Error"),
            payload: serde_json::to_value(detail).ok(),
            error: true,
        }
    }

    /// A bare signal outside any start/terminal lifecycle, e.g. the
    /// real-time disconnect notification fired on logout.
    pub fn signal(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
            error: false,
        }
    }

    pub fn is_terminal_for(&self, intent: IntentKind) -> bool {
        self.kind == format!("{intent}Success") || self.kind == format!("{intent}Error")
    }
}
