//! HTTP client core: every backend call goes through `HttpClient`.
//!
//! Request path: attach the stored access token as a bearer header.
//! Response path, per logical call:
//!
//! ```text
//! Sent ──► Success          return the response
//!      ├─► FailureNonAuth   return the mapped error, no state change
//!      └─► FailureAuth (401)
//!            ├─ blocked body            clear credentials + session, notify, fail
//!            ├─ not yet retried         refresh (single-flight), resend once
//!            └─ retried / no refresh    clear credentials + session, fail
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::auth::{Credential, CredentialStore, SessionState};
use crate::models::{RefreshRequest, TokenPair};

use super::transport::{ApiRequest, ApiResponse, Transport};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

const REFRESH_PATH: &str = "/auth/refresh-token";

/// Buffer size for the notice broadcast channel.
const NOTICE_CHANNEL_CAPACITY: usize = 16;

/// User-facing notices raised as a side effect of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The backend reported the account as blocked; the session was ended.
    AccountBlocked,
    /// The session could not be renewed and was ended.
    SessionExpired,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::AccountBlocked => write!(f, "User temporarily blocked"),
            Notice::SessionExpired => write!(f, "Session expired - please log in again"),
        }
    }
}

/// Classification of one dispatch
#[derive(Debug)]
enum CallOutcome {
    Success(ApiResponse),
    FailureNonAuth(ApiResponse),
    FailureAuth(ApiResponse),
}

impl CallOutcome {
    fn classify(response: ApiResponse) -> Self {
        if response.is_success() {
            CallOutcome::Success(response)
        } else if response.status == 401 {
            CallOutcome::FailureAuth(response)
        } else {
            CallOutcome::FailureNonAuth(response)
        }
    }
}

/// Client for the blogging backend.
/// Clone is cheap - every clone shares the transport, stores and refresh gate.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    session: Arc<SessionState>,
    notices: broadcast::Sender<Notice>,
    refresh_gate: Arc<Mutex<()>>,
}

impl HttpClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        session: Arc<SessionState>,
    ) -> Self {
        let (notices, _rx) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self {
            transport,
            credentials,
            session,
            notices,
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Stored credential; unreadable storage counts as signed out
    pub fn stored_credential(&self) -> Option<Credential> {
        match self.credentials.get() {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "Failed to read stored credential");
                None
            }
        }
    }

    fn current_access_token(&self) -> Option<String> {
        self.stored_credential()
            .and_then(|c| c.live_access_token(Utc::now()).map(str::to_string))
    }

    // ===== Dispatch =====

    /// Run an authenticated call through the 401 policy.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut retried = false;
        request.bearer = self.current_access_token();

        loop {
            let response = self.transport.send(&request).await?;

            match CallOutcome::classify(response) {
                CallOutcome::Success(response) => return Ok(response),
                CallOutcome::FailureNonAuth(response) => {
                    debug!(path = %request.path, status = response.status, "Request failed");
                    return Err(ApiError::from_status(response.status, &response.body));
                }
                CallOutcome::FailureAuth(response) => {
                    if ApiError::is_blocked_signal(&response.body) {
                        warn!(path = %request.path, "Account blocked, signing out");
                        self.end_session(Notice::AccountBlocked);
                        return Err(ApiError::AccountBlocked);
                    }
                    if retried {
                        warn!(path = %request.path, "Still unauthorized after token refresh, signing out");
                        self.end_session(Notice::SessionExpired);
                        return Err(ApiError::Unauthorized);
                    }
                    retried = true;

                    let token = self.renew_access_token(request.bearer.as_deref()).await?;
                    debug!(path = %request.path, retry = 1, "Resending with renewed token");
                    request.bearer = Some(token);
                }
            }
        }
    }

    /// Run a call that needs no session (login, signup, OTP).
    /// A 401 here is a plain failure and never touches stored state.
    pub async fn execute_anonymous(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let response = self.transport.send(&request).await?;
        if response.is_success() {
            return Ok(response);
        }
        debug!(path = %request.path, status = response.status, "Anonymous request failed");
        match response.status {
            401 if !ApiError::is_blocked_signal(&response.body) => Err(ApiError::Http {
                status: 401,
                message: ApiError::message_from_body(&response.body),
            }),
            status => Err(ApiError::from_status(status, &response.body)),
        }
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.execute(request).await?;
        Self::decode(&path, &response)
    }

    pub async fn send_anonymous_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.execute_anonymous(request).await?;
        Self::decode(&path, &response)
    }

    fn decode<T: DeserializeOwned>(path: &str, response: &ApiResponse) -> Result<T, ApiError> {
        serde_json::from_str(&response.body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    // ===== Token renewal =====

    /// Obtain an access token to resend with after a 401.
    ///
    /// Refreshes are serialized behind `refresh_gate`. Whoever gets the gate
    /// after a refresh already happened finds a stored token different from
    /// the one it sent, and reuses it instead of refreshing again.
    async fn renew_access_token(&self, sent_with: Option<&str>) -> Result<String, ApiError> {
        let _gate = self.refresh_gate.lock().await;
        let now = Utc::now();

        let credential = self.stored_credential();
        if let Some(current) = credential.as_ref().and_then(|c| c.live_access_token(now)) {
            if Some(current) != sent_with {
                debug!("Token already renewed by a concurrent request");
                return Ok(current.to_string());
            }
        }

        let Some(refresh_token) = credential
            .as_ref()
            .and_then(|c| c.live_refresh_token(now))
            .map(str::to_string)
        else {
            info!("No refresh token available, signing out");
            self.end_session(Notice::SessionExpired);
            return Err(ApiError::Unauthorized);
        };

        match self.request_token_pair(&refresh_token).await {
            Ok(pair) => {
                if let Err(e) = self.credentials.set(&pair.access_token, &pair.refresh_token) {
                    warn!(error = %e, "Failed to persist renewed credential");
                }
                info!("Access token renewed");
                Ok(pair.access_token)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, signing out");
                self.end_session(Notice::SessionExpired);
                Err(ApiError::RefreshFailed(e.to_string()))
            }
        }
    }

    /// Call the refresh endpoint directly, outside the 401 policy.
    async fn request_token_pair(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let request = ApiRequest::post(REFRESH_PATH).json(&RefreshRequest {
            refresh_token: refresh_token.to_string(),
        })?;
        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(ApiError::from_status(response.status, &response.body));
        }
        Self::decode(REFRESH_PATH, &response)
    }

    // ===== Sign-out =====

    /// Forced sign-out: wipe credentials and session, then raise `notice`.
    /// `SessionExpired` is only raised when there was a session to lose.
    fn end_session(&self, notice: Notice) {
        let had_session = self.session.is_authenticated() || self.stored_credential().is_some();

        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "Failed to clear stored credential");
        }
        self.session.clear_user();

        if notice == Notice::AccountBlocked || had_session {
            self.notify(notice);
        }
    }

    /// Voluntary sign-out
    pub fn logout(&self) {
        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "Failed to clear stored credential");
        }
        self.session.clear_user();
    }

    fn notify(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            debug!(notice = %notice, "No notice subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{profile, profile_json, ScriptedTransport};
    use crate::auth::MemoryCredentialStore;

    fn client_for(transport: Arc<ScriptedTransport>, store: MemoryCredentialStore) -> HttpClient {
        HttpClient::new(transport, Arc::new(store), Arc::new(SessionState::new()))
    }

    fn signed_in_store(access: &str, refresh: &str) -> MemoryCredentialStore {
        let store = MemoryCredentialStore::new();
        store.set(access, refresh).unwrap();
        store
    }

    fn assert_signed_out(client: &HttpClient) {
        assert!(client.credentials().get().unwrap().is_none());
        assert!(!client.session().is_authenticated());
        assert!(client.session().current_user().is_none());
    }

    /// `/blogs/1` accepts only the given bearer token
    fn only_token(token: &'static str) -> impl Fn(&ApiRequest) -> ApiResponse + Send + Sync {
        move |req| {
            if req.path == "/blogs/1" && req.bearer.as_deref() == Some(token) {
                ApiResponse::new(200, r#"{"ok":true}"#)
            } else if req.path == REFRESH_PATH {
                ApiResponse::new(200, r#"{"accessToken":"A2","refreshToken":"R2"}"#)
            } else {
                ApiResponse::new(401, r#"{"message":"jwt expired"}"#)
            }
        }
    }

    #[tokio::test]
    async fn test_valid_token_never_refreshes() {
        let transport = ScriptedTransport::new(only_token("A1"));
        let client = client_for(transport.clone(), signed_in_store("A1", "R1"));

        let resp = client.execute(ApiRequest::get("/blogs/1")).await.unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(transport.calls_to(REFRESH_PATH), 0);
        assert_eq!(transport.requests()[0].bearer.as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_refresh_then_resend_with_new_token() {
        let transport = ScriptedTransport::new(only_token("A2"));
        let client = client_for(transport.clone(), signed_in_store("A1", "R1"));

        let resp = client.execute(ApiRequest::get("/blogs/1")).await.unwrap();

        assert_eq!(resp.body, r#"{"ok":true}"#);
        assert_eq!(transport.calls_to(REFRESH_PATH), 1);
        assert_eq!(transport.calls_to("/blogs/1"), 2);

        let stored = client.credentials().get().unwrap().unwrap();
        assert_eq!(stored.access_token, "A2");
        assert_eq!(stored.refresh_token, "R2");

        let requests = transport.requests();
        let refresh = requests.iter().find(|r| r.path == REFRESH_PATH).unwrap();
        assert_eq!(refresh.body, Some(serde_json::json!({"refreshToken": "R1"})));
        assert!(refresh.bearer.is_none());
        let last = requests.last().unwrap();
        assert_eq!(last.path, "/blogs/1");
        assert_eq!(last.bearer.as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_second_401_is_terminal() {
        // Refresh "succeeds" but the new token is rejected as well
        let transport = ScriptedTransport::new(only_token("never-valid"));
        let client = client_for(transport.clone(), signed_in_store("A1", "R1"));
        client.session().set_user(profile("u1"));
        let mut notices = client.subscribe_notices();

        let err = client.execute(ApiRequest::get("/blogs/1")).await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(transport.calls_to(REFRESH_PATH), 1);
        assert_eq!(transport.calls_to("/blogs/1"), 2);
        assert_signed_out(&client);
        assert_eq!(notices.try_recv().unwrap(), Notice::SessionExpired);
    }

    #[tokio::test]
    async fn test_blocked_user_signs_out_without_retry() {
        let transport = ScriptedTransport::new(|_req: &ApiRequest| {
            ApiResponse::new(401, r#"{"message":"User is blocked"}"#)
        });
        let client = client_for(transport.clone(), signed_in_store("A1", "R1"));
        client.session().set_user(profile("u1"));
        let mut notices = client.subscribe_notices();

        let err = client.execute(ApiRequest::get("/blogs/1")).await.unwrap_err();

        assert!(matches!(err, ApiError::AccountBlocked));
        assert_eq!(transport.calls_to(REFRESH_PATH), 0);
        assert_eq!(transport.calls_to("/blogs/1"), 1);
        assert_signed_out(&client);
        assert_eq!(notices.try_recv().unwrap(), Notice::AccountBlocked);
        assert!(notices.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_blocked_on_resend_is_still_terminal() {
        let transport = ScriptedTransport::new(|req: &ApiRequest| match req.bearer.as_deref() {
            _ if req.path == REFRESH_PATH => {
                ApiResponse::new(200, r#"{"accessToken":"A2","refreshToken":"R2"}"#)
            }
            Some("A2") => ApiResponse::new(401, r#"{"error":"User is blocked"}"#),
            _ => ApiResponse::new(401, "{}"),
        });
        let client = client_for(transport.clone(), signed_in_store("A1", "R1"));
        client.session().set_user(profile("u1"));

        let err = client.execute(ApiRequest::get("/blogs/1")).await.unwrap_err();

        assert!(matches!(err, ApiError::AccountBlocked));
        assert_signed_out(&client);
    }

    #[tokio::test]
    async fn test_refresh_failure_signs_out() {
        let transport = ScriptedTransport::new(|req: &ApiRequest| {
            if req.path == REFRESH_PATH {
                ApiResponse::new(403, r#"{"message":"Refresh token expired"}"#)
            } else {
                ApiResponse::new(401, "{}")
            }
        });
        let client = client_for(transport.clone(), signed_in_store("A1", "R1"));
        client.session().set_user(profile("u1"));

        let err = client.execute(ApiRequest::get("/blogs/1")).await.unwrap_err();

        match err {
            ApiError::RefreshFailed(msg) => assert!(msg.contains("Refresh token expired")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(transport.calls_to(REFRESH_PATH), 1);
        assert_eq!(transport.calls_to("/blogs/1"), 1);
        assert_signed_out(&client);
    }

    #[tokio::test]
    async fn test_no_refresh_token_signs_out() {
        let transport = ScriptedTransport::new(only_token("A1"));
        let client = client_for(transport.clone(), MemoryCredentialStore::new());
        let mut notices = client.subscribe_notices();

        let err = client.execute(ApiRequest::get("/blogs/1")).await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(transport.calls_to(REFRESH_PATH), 0);
        assert!(transport.requests()[0].bearer.is_none());
        assert_signed_out(&client);
        // Never signed in, so there is nothing to announce
        assert!(notices.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_expired_access_token_is_not_sent() {
        let mut credential = Credential::issue("A1", "R1", Utc::now());
        credential.access_expires_at = Utc::now() - chrono::Duration::minutes(1);
        let transport = ScriptedTransport::new(only_token("A2"));
        let client = client_for(transport.clone(), MemoryCredentialStore::with_credential(credential));

        client.execute(ApiRequest::get("/blogs/1")).await.unwrap();

        let requests = transport.requests();
        assert!(requests[0].bearer.is_none());
        assert_eq!(transport.calls_to(REFRESH_PATH), 1);
        assert_eq!(requests.last().unwrap().bearer.as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_non_auth_failure_leaves_state_alone() {
        let transport = ScriptedTransport::new(|_req: &ApiRequest| {
            ApiResponse::new(500, r#"{"error":"database down"}"#)
        });
        let client = client_for(transport.clone(), signed_in_store("A1", "R1"));
        client.session().set_user(profile("u1"));

        let err = client.execute(ApiRequest::get("/blogs/1")).await.unwrap_err();

        match err {
            ApiError::ServerError(msg) => assert_eq!(msg, "database down"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(client.credentials().get().unwrap().is_some());
        assert!(client.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let transport = ScriptedTransport::new(only_token("A2"));
        let client = client_for(transport.clone(), signed_in_store("A1", "R1"));

        let (a, b, c) = tokio::join!(
            client.execute(ApiRequest::get("/blogs/1")),
            client.execute(ApiRequest::get("/blogs/1")),
            client.execute(ApiRequest::get("/blogs/1")),
        );

        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(transport.calls_to(REFRESH_PATH), 1);
        assert_eq!(transport.calls_to("/blogs/1"), 6);
    }

    #[tokio::test]
    async fn test_anonymous_401_keeps_state_and_message() {
        let transport = ScriptedTransport::new(|_req: &ApiRequest| {
            ApiResponse::new(401, r#"{"message":"Invalid credentials"}"#)
        });
        let client = client_for(transport.clone(), signed_in_store("A1", "R1"));

        let err = client
            .execute_anonymous(ApiRequest::post("/auth/login"))
            .await
            .unwrap_err();

        match err {
            ApiError::Http { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid credentials");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(client.credentials().get().unwrap().is_some());
        assert_eq!(transport.calls_to(REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn test_send_json_reports_bad_body() {
        let transport = ScriptedTransport::new(|_req: &ApiRequest| ApiResponse::new(200, "not json"));
        let client = client_for(transport, signed_in_store("A1", "R1"));

        let err = client
            .send_json::<crate::models::UserProfile>(ApiRequest::get("/auth/me"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_logout_clears_everything_quietly() {
        let transport = ScriptedTransport::new(|_req: &ApiRequest| ApiResponse::new(200, profile_json("u1")));
        let client = client_for(transport, signed_in_store("A1", "R1"));
        client.session().set_user(profile("u1"));
        let mut notices = client.subscribe_notices();

        client.logout();

        assert_signed_out(&client);
        assert!(notices.try_recv().is_err());
    }
}
