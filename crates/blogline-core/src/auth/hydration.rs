use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AuthApi, HttpClient};
use crate::models::UserProfile;

/// Restore the session from a stored credential.
///
/// Without a credential this makes no request. On failure the session stays
/// empty; a 401 along the way has already cleared the credential.
pub async fn hydrate(http: &HttpClient) -> Result<Option<UserProfile>, ApiError> {
    if http.stored_credential().is_none() {
        debug!("No stored credential, skipping session hydration");
        return Ok(None);
    }

    match AuthApi::new(http.clone()).me().await {
        Ok(user) => {
            http.session().set_user(user.clone());
            info!(user_id = %user.id, "Session hydrated");
            Ok(Some(user))
        }
        Err(e) => {
            warn!(error = %e, "Session hydration failed");
            Err(e)
        }
    }
}

/// Run `hydrate` in the background so startup never waits on it.
pub fn spawn_hydration(http: HttpClient) -> JoinHandle<Option<UserProfile>> {
    tokio::spawn(async move { hydrate(&http).await.ok().flatten() })
}
