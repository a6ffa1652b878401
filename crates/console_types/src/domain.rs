use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Credentials presented to the console login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Result of an authentication check. A negative result is a regular
/// outcome, not a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_auth_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_users: Option<bool>,
}

impl AuthStatus {
    pub fn unauthenticated() -> Self {
        Self {
            authenticated: false,
            external_auth_url: None,
            no_users: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseKey {
    pub osystem: String,
    pub distro_series: String,
    pub license_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptType {
    Commissioning,
    Testing,
}

/// Payload for uploading a new script. The remote API expects the script
/// body under the `script` key and the kind under `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptUpload {
    pub name: String,
    #[serde(rename = "type")]
    pub script_type: ScriptType,
    #[serde(rename = "script")]
    pub contents: String,
}

/// Script as returned by the listing endpoint. Only the fields the console
/// renders are modelled; everything else stays on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub script_type: Option<ScriptType>,
    #[serde(default)]
    pub script: Option<serde_json::Value>,
}

/// Chassis enlistment parameters are passed through to the remote API
/// verbatim; their meaning depends on the selected power driver.
pub type ChassisParams = BTreeMap<String, String>;

/// Requested file type for script-result downloads. Drives how the client
/// decodes the body, independent of the response content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultFileType {
    #[serde(rename = "txt")]
    Txt,
    #[serde(rename = "tar.xz")]
    TarXz,
}

impl ResultFileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultFileType::Txt => "txt",
            ResultFileType::TarXz => "tar.xz",
        }
    }
}

/// Result-set name covering the most recent deployment.
pub const CURRENT_INSTALLATION_SET: &str = "current-installation";

/// Path of the installation log inside the deployment result set.
pub const INSTALL_LOG_NAME: &str = "/tmp/install.log";
