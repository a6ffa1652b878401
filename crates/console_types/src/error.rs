use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Field-level failures returned by the remote API, preserved verbatim so
/// display code can attach each message to its form field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldErrors(pub BTreeMap<String, serde_json::Value>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, field: impl Into<String>, detail: serde_json::Value) {
        self.0.insert(field.into(), detail);
    }

    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.0.get(field)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, detail) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{field}: {detail}")?;
        }
        Ok(())
    }
}

/// Failure payload normalised for display: either a plain message or the
/// field-error map exactly as the remote API returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Fields(FieldErrors),
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDetail::Message(message) => write!(f, "{message}"),
            ErrorDetail::Fields(fields) => write!(f, "{fields}"),
        }
    }
}
