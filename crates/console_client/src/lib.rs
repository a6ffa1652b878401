use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use console_types::{
    domain::{
        AuthStatus, ChassisParams, Credentials, LicenseKey, ResultFileType, ScriptRecord,
        ScriptUpload, CURRENT_INSTALLATION_SET, INSTALL_LOG_NAME,
    },
    events::{IntentKind, LifecycleEvent},
};
use reqwest::{header, Client, RequestBuilder};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;
use url::Url;

pub mod endpoints;
mod error;
mod response;

pub use error::IntentError;
pub use response::Body;

const CSRF_HEADER: &str = "X-CSRFToken";
const REQUESTED_WITH_HEADER: &str = "X-Requested-With";

/// Intent catalog: every operation the client performs, addressed the way
/// the event sink consumes it.
pub mod intents {
    use console_types::events::IntentKind;

    pub const CHECK_AUTHENTICATED: IntentKind = IntentKind::new("status", "checkAuthenticated");
    pub const LOGIN: IntentKind = IntentKind::new("status", "login");
    pub const EXTERNAL_LOGIN: IntentKind = IntentKind::new("status", "externalLogin");
    pub const LOGOUT: IntentKind = IntentKind::new("status", "logout");
    pub const FETCH_LICENSE_KEYS: IntentKind = IntentKind::new("licensekeys", "fetch");
    pub const CREATE_LICENSE_KEY: IntentKind = IntentKind::new("licensekeys", "create");
    pub const UPDATE_LICENSE_KEY: IntentKind = IntentKind::new("licensekeys", "update");
    pub const DELETE_LICENSE_KEY: IntentKind = IntentKind::new("licensekeys", "delete");
    pub const ADD_CHASSIS: IntentKind = IntentKind::new("machine", "addChassis");
    pub const FETCH_SCRIPTS: IntentKind = IntentKind::new("script", "fetch");
    pub const UPLOAD_SCRIPT: IntentKind = IntentKind::new("script", "upload");
    pub const DELETE_SCRIPT: IntentKind = IntentKind::new("script", "delete");
    pub const DOWNLOAD_SCRIPT_RESULTS: IntentKind = IntentKind::new("scriptresult", "download");

    /// Bare signals emitted outside any start/terminal lifecycle.
    pub const WEBSOCKET_DISCONNECT: &str = "status/websocketDisconnect";
    pub const RELOAD: &str = "status/reload";
}

/// Locally persisted session state, cleared wholesale on logout. The client
/// never reads it back; ownership stays with the caller.
#[async_trait]
pub trait SessionState: Send + Sync {
    async fn clear(&self) -> anyhow::Result<()>;
}

/// Placeholder for callers that wire in no local persistence.
pub struct NoSessionState;

#[async_trait]
impl SessionState for NoSessionState {
    async fn clear(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl SessionState for session_cache::SessionCache {
    async fn clear(&self) -> anyhow::Result<()> {
        self.clear_all().await?;
        Ok(())
    }
}

/// Per-invocation session context, owned by the caller. Carries the
/// anti-forgery token read on demand from the session cookie.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    csrf_token: Option<String>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_csrf_token(token: impl Into<String>) -> Self {
        Self {
            csrf_token: Some(token.into()),
        }
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }
}

/// Script-result download body, decoded per the requested file type rather
/// than the response content type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadedResult {
    Archive(Vec<u8>),
    Text(String),
}

#[derive(Debug, Serialize)]
struct CreateLicenseKeyRequest<'a> {
    osystem: &'a str,
    distro_series: &'a str,
    license_key: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateLicenseKeyRequest<'a> {
    license_key: &'a str,
}

/// Async client for the provisioning-console REST API.
///
/// Every public operation is one intent invocation: it emits a Start event,
/// performs exactly one fresh HTTP request, and emits exactly one terminal
/// Success or Error event. Invocations are independent; overlapping calls of
/// the same intent are neither deduplicated nor coalesced, and there is no
/// cancellation or retry.
pub struct ConsoleClient {
    http: Client,
    base: Url,
    session: Arc<dyn SessionState>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl ConsoleClient {
    pub fn new(base: Url) -> Self {
        Self::with_session_state(base, Arc::new(NoSessionState))
    }

    pub fn with_session_state(base: Url, session: Arc<dyn SessionState>) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            http: Client::new(),
            base,
            session,
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: LifecycleEvent) {
        // Nobody listening is fine; the sink is optional.
        let _ = self.events.send(event);
    }

    fn endpoint(&self, path: &str) -> Result<Url, IntentError> {
        self.base
            .join(path)
            .map_err(|err| IntentError::Transport(format!("invalid endpoint '{path}': {err}")))
    }

    /// Default JSON headers plus the anti-forgery token when present.
    fn json_request(&self, request: RequestBuilder, session: &SessionContext) -> RequestBuilder {
        let request = request
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json");
        match session.csrf_token() {
            Some(token) => request.header(CSRF_HEADER, token),
            None => request,
        }
    }

    /// Run one intent invocation: exactly one Start, then exactly one
    /// terminal event, regardless of how the operation ends.
    async fn invoke<T, F>(&self, intent: IntentKind, op: F) -> Result<T, IntentError>
    where
        T: Serialize,
        F: Future<Output = Result<T, IntentError>>,
    {
        self.emit(LifecycleEvent::start(intent));
        match op.await {
            Ok(value) => {
                let payload = serde_json::to_value(&value)
                    .ok()
                    .filter(|payload| !payload.is_null());
                self.emit(LifecycleEvent::success(intent, payload));
                Ok(value)
            }
            Err(err) => {
                warn!(intent = %intent, error = %err, "intent failed");
                self.emit(LifecycleEvent::failure(intent, err.detail()));
                Err(err)
            }
        }
    }

    async fn clear_session_state(&self) {
        if let Err(err) = self.session.clear().await {
            warn!(error = %err, "failed to clear local session state");
        }
    }

    /// Check whether the current session is authenticated.
    ///
    /// A 5xx means the API server itself is down and surfaces as an error;
    /// any 4xx means the user is simply not authenticated and resolves as a
    /// negative result.
    pub async fn check_authenticated(&self) -> Result<AuthStatus, IntentError> {
        self.invoke(intents::CHECK_AUTHENTICATED, async {
            let response = self
                .http
                .get(self.endpoint(endpoints::LOGIN_API)?)
                .send()
                .await?;
            let status = response.status();
            if status.is_server_error() {
                return Err(IntentError::Http {
                    status: status.as_u16(),
                    message: status
                        .canonical_reason()
                        .unwrap_or("server error")
                        .to_string(),
                });
            }
            if status.is_client_error() {
                return Ok(AuthStatus::unauthenticated());
            }
            let status: AuthStatus = response.json().await?;
            Ok(status)
        })
        .await
    }

    /// Log in with form-encoded credentials. Body-encoded failures (e.g.
    /// wrong password) surface with their field errors intact.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), IntentError> {
        self.invoke(intents::LOGIN, async {
            let response = self
                .http
                .post(self.endpoint(endpoints::LOGIN_API)?)
                .header(header::ACCEPT, "application/json")
                .header(REQUESTED_WITH_HEADER, "XMLHttpRequest")
                .form(credentials)
                .send()
                .await?;
            response::interpret(response).await?;
            Ok(())
        })
        .await
    }

    /// Log in through the external-auth discharge endpoint. A failed
    /// discharge leaves no usable session behind, so the local cache is
    /// cleared before the failure surfaces.
    pub async fn external_login(&self) -> Result<(), IntentError> {
        self.invoke(intents::EXTERNAL_LOGIN, async {
            let response = self
                .http
                .get(self.endpoint(endpoints::EXTERNAL_LOGIN_API)?)
                .header(header::ACCEPT, "application/json")
                .send()
                .await?;
            if let Err(err) = response::interpret(response).await {
                self.clear_session_state().await;
                return Err(err);
            }
            Ok(())
        })
        .await
    }

    /// Log out and hard-reset client state.
    ///
    /// The local session cache is cleared first, and the disconnect and
    /// reload signals fire after the terminal event, even when the network
    /// call fails.
    pub async fn logout(&self, session: &SessionContext) -> Result<(), IntentError> {
        self.clear_session_state().await;
        let result = self
            .invoke(intents::LOGOUT, async {
                let mut request = self.http.post(self.endpoint(endpoints::LOGOUT_API)?);
                if let Some(token) = session.csrf_token() {
                    request = request.header(CSRF_HEADER, token);
                }
                response::interpret(request.send().await?).await?;
                Ok(())
            })
            .await;
        self.emit(LifecycleEvent::signal(intents::WEBSOCKET_DISCONNECT));
        self.emit(LifecycleEvent::signal(intents::RELOAD));
        result
    }

    pub async fn fetch_license_keys(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<LicenseKey>, IntentError> {
        self.invoke(intents::FETCH_LICENSE_KEYS, async {
            let request = self.json_request(
                self.http.get(self.endpoint(&endpoints::license_keys())?),
                session,
            );
            response::interpret(request.send().await?).await?.into_json()
        })
        .await
    }

    pub async fn create_license_key(
        &self,
        key: &LicenseKey,
        session: &SessionContext,
    ) -> Result<LicenseKey, IntentError> {
        self.invoke(intents::CREATE_LICENSE_KEY, async {
            let request = self
                .json_request(
                    self.http.post(self.endpoint(&endpoints::license_keys())?),
                    session,
                )
                .json(&CreateLicenseKeyRequest {
                    osystem: &key.osystem,
                    distro_series: &key.distro_series,
                    license_key: &key.license_key,
                });
            response::interpret(request.send().await?).await?.into_json()
        })
        .await
    }

    pub async fn update_license_key(
        &self,
        key: &LicenseKey,
        session: &SessionContext,
    ) -> Result<LicenseKey, IntentError> {
        self.invoke(intents::UPDATE_LICENSE_KEY, async {
            let request = self
                .json_request(
                    self.http.put(
                        self.endpoint(&endpoints::license_key(&key.osystem, &key.distro_series))?,
                    ),
                    session,
                )
                .json(&UpdateLicenseKeyRequest {
                    license_key: &key.license_key,
                });
            response::interpret(request.send().await?).await?.into_json()
        })
        .await
    }

    pub async fn delete_license_key(
        &self,
        osystem: &str,
        distro_series: &str,
        session: &SessionContext,
    ) -> Result<(), IntentError> {
        self.invoke(intents::DELETE_LICENSE_KEY, async {
            let request = self.json_request(
                self.http
                    .delete(self.endpoint(&endpoints::license_key(osystem, distro_series))?),
                session,
            );
            response::interpret(request.send().await?).await?;
            Ok(())
        })
        .await
    }

    /// Enlist a chassis of machines. Parameters are driver-specific and pass
    /// through to the remote API as a form body.
    pub async fn add_chassis(
        &self,
        params: &ChassisParams,
        session: &SessionContext,
    ) -> Result<(), IntentError> {
        self.invoke(intents::ADD_CHASSIS, async {
            let mut url = self.endpoint(&endpoints::machines())?;
            url.query_pairs_mut().append_pair("op", "add_chassis");
            let mut request = self
                .http
                .post(url)
                .header(REQUESTED_WITH_HEADER, "XMLHttpRequest")
                .form(params);
            if let Some(token) = session.csrf_token() {
                request = request.header(CSRF_HEADER, token);
            }
            response::interpret(request.send().await?).await?;
            Ok(())
        })
        .await
    }

    pub async fn fetch_scripts(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<ScriptRecord>, IntentError> {
        self.invoke(intents::FETCH_SCRIPTS, async {
            let request = self
                .json_request(
                    self.http.get(self.endpoint(&endpoints::scripts())?),
                    session,
                )
                .query(&[("include_script", "true")]);
            response::interpret(request.send().await?).await?.into_json()
        })
        .await
    }

    /// Upload a script. Success carries the created resource; a structured
    /// failure body such as `{"name": …}` survives verbatim.
    pub async fn upload_script(
        &self,
        script: &ScriptUpload,
        session: &SessionContext,
    ) -> Result<ScriptRecord, IntentError> {
        self.invoke(intents::UPLOAD_SCRIPT, async {
            let request = self
                .json_request(
                    self.http.post(self.endpoint(&endpoints::scripts())?),
                    session,
                )
                .json(script);
            response::interpret(request.send().await?).await?.into_json()
        })
        .await
    }

    pub async fn delete_script(
        &self,
        name: &str,
        session: &SessionContext,
    ) -> Result<(), IntentError> {
        self.invoke(intents::DELETE_SCRIPT, async {
            let request = self.json_request(
                self.http.delete(self.endpoint(&endpoints::script(name))?),
                session,
            );
            response::interpret(request.send().await?).await?;
            Ok(())
        })
        .await
    }

    /// Download a script-result set. Body decoding follows the requested
    /// file type: `tar.xz` yields the raw archive bytes, anything else the
    /// body as text.
    pub async fn download_script_results(
        &self,
        system_id: &str,
        script_set_id: &str,
        filters: Option<&str>,
        filetype: Option<ResultFileType>,
        session: &SessionContext,
    ) -> Result<DownloadedResult, IntentError> {
        self.invoke(intents::DOWNLOAD_SCRIPT_RESULTS, async {
            let mut url = self.endpoint(&endpoints::script_results(system_id, script_set_id))?;
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("op", "download");
                if let Some(filetype) = filetype {
                    pairs.append_pair("filetype", filetype.as_str());
                }
                if let Some(filters) = filters {
                    pairs.append_pair("filters", filters);
                }
            }
            let request = self.json_request(self.http.get(url), session);
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(IntentError::Http {
                    status: status.as_u16(),
                    message: status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string(),
                });
            }
            match filetype {
                Some(ResultFileType::TarXz) => {
                    Ok(DownloadedResult::Archive(response.bytes().await?.to_vec()))
                }
                _ => Ok(DownloadedResult::Text(response.text().await?)),
            }
        })
        .await
    }

    /// Fetch the installation log from the most recent deployment.
    pub async fn fetch_installation_log(
        &self,
        system_id: &str,
        session: &SessionContext,
    ) -> Result<DownloadedResult, IntentError> {
        self.download_script_results(
            system_id,
            CURRENT_INSTALLATION_SET,
            Some(INSTALL_LOG_NAME),
            None,
            session,
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
