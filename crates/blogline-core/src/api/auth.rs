//! Auth and profile endpoints.

use tracing::{info, warn};

use crate::models::{
    LoginRequest, LoginResponse, MessageResponse, NewUser, OtpRequest, ProfileUpdate,
    SignupRequest, SignupResponse, UploadUrl, UploadUrlRequest, UserProfile,
};

use super::transport::ApiRequest;
use super::{ApiError, HttpClient};

/// Length of the emailed one-time password
pub const OTP_LENGTH: usize = 6;

#[derive(Clone)]
pub struct AuthApi {
    http: HttpClient,
}

impl AuthApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Log in, persist the token pair and establish the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let email = email.trim();
        let password = password.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ApiError::Validation("Email and password are required".to_string()));
        }

        let request = ApiRequest::post("/auth/login").json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let response: LoginResponse = self.http.send_anonymous_json(request).await?;

        let (Some(access_token), Some(refresh_token)) = (response.access_token, response.refresh_token) else {
            return Err(ApiError::InvalidResponse("Login response missing tokens".to_string()));
        };

        self.http
            .credentials()
            .set(&access_token, &refresh_token)
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        self.http.session().set_user(response.user.clone());

        info!(user_id = %response.user.id, "Logged in");
        Ok(response.user)
    }

    pub fn logout(&self) {
        self.http.logout();
        info!("Logged out");
    }

    /// Register a new account; returns the email the OTP was sent to.
    pub async fn signup(&self, user: NewUser) -> Result<String, ApiError> {
        if user.email.trim().is_empty() || user.username.trim().is_empty() || user.password.is_empty() {
            return Err(ApiError::Validation(
                "Username, email and password are required".to_string(),
            ));
        }
        let request = ApiRequest::post("/auth/signup").json(&SignupRequest { user_data: user })?;
        let response: SignupResponse = self.http.send_anonymous_json(request).await?;
        Ok(response.email)
    }

    pub async fn verify_otp(&self, otp: &str, email: &str) -> Result<String, ApiError> {
        let otp = otp.trim();
        if otp.len() != OTP_LENGTH || !otp.chars().all(|c| c.is_ascii_digit()) {
            return Err(ApiError::Validation(format!(
                "OTP must be exactly {} digits",
                OTP_LENGTH
            )));
        }
        let request = ApiRequest::post("/auth/verify-otp").json(&OtpRequest {
            otp: otp.to_string(),
            email: email.trim().to_string(),
        })?;
        let response: MessageResponse = self.http.send_anonymous_json(request).await?;
        Ok(response.message)
    }

    /// Fetch the current user. Does not touch the session by itself.
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.http.send_json(ApiRequest::get("/auth/me")).await
    }

    /// Apply a partial update; the returned profile replaces the session user.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        if update.is_empty() {
            return Err(ApiError::Validation("Nothing to update".to_string()));
        }
        let request = ApiRequest::patch("/profile/update").json(update)?;
        let user: UserProfile = self.http.send_json(request).await?;

        if self.http.session().is_authenticated() {
            self.http.session().set_user(user.clone());
        } else {
            warn!("Profile updated without an active session");
        }
        Ok(user)
    }

    /// Presigned object-storage URL for a profile picture upload
    pub async fn upload_url(&self, user_id: &str, file_type: &str) -> Result<UploadUrl, ApiError> {
        if user_id.trim().is_empty() || file_type.trim().is_empty() {
            return Err(ApiError::Validation("User id and file type are required".to_string()));
        }
        let request = ApiRequest::post("/profile/upload-url").json(&UploadUrlRequest {
            user_id: user_id.to_string(),
            file_type: file_type.to_string(),
        })?;
        self.http.send_json(request).await
    }
}
