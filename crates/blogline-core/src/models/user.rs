use serde::{Deserialize, Serialize};

/// Identity of the signed-in user as returned by `/auth/me`, `/auth/login`
/// and `/profile/update`. Never edited in place; a newer copy replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(rename = "profilePicture", default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub profession: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(rename = "isVerified", default)]
    pub is_verified: bool,
    #[serde(rename = "isBlocked", default)]
    pub is_blocked: bool,
    #[serde(rename = "isGoogleUser", default)]
    pub is_google_user: bool,
}

impl UserProfile {
    /// Name to show in listings: username, falling back to the email address
    pub fn display_name(&self) -> &str {
        if self.username.trim().is_empty() {
            &self.email
        } else {
            &self.username
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `/auth/login` returns the profile with the token pair folded into it.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "accessToken")]
    pub access_token: Option<String>,
    #[serde(rename = "refreshToken")]
    pub refresh_token: Option<String>,
    #[serde(flatten)]
    pub user: UserProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub username: String,
    #[serde(rename = "profilePicture", skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(rename = "isGoogleUser", skip_serializing_if = "Option::is_none")]
    pub is_google_user: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    #[serde(rename = "userData")]
    pub user_data: NewUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupResponse {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OtpRequest {
    pub otp: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// Partial profile update. Absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(rename = "profilePicture", skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.profession.is_none()
            && self.bio.is_none()
            && self.profile_picture.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadUrlRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "fileType")]
    pub file_type: String,
}

/// Presigned object-storage upload target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadUrl {
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    pub key: String,
}

impl UploadUrl {
    /// Public object URL: the presigned URL without its signing query string
    pub fn object_url(&self) -> &str {
        self.upload_url
            .split_once('?')
            .map(|(base, _)| base)
            .unwrap_or(&self.upload_url)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_response() {
        let json = r#"{"accessToken":"A1","refreshToken":"R1","_id":"u1","email":"ada@example.com","username":"ada","isVerified":true,"isBlocked":false,"isGoogleUser":false}"#;
        let resp: LoginResponse = serde_json::from_str(json).expect("login response");
        assert_eq!(resp.access_token.as_deref(), Some("A1"));
        assert_eq!(resp.refresh_token.as_deref(), Some("R1"));
        assert_eq!(resp.user.id, "u1");
        assert!(resp.user.is_verified);
        assert_eq!(resp.user.profile_picture, None);
    }

    #[test]
    fn test_profile_update_skips_absent_fields() {
        let update = ProfileUpdate {
            bio: Some("Writes about rockets".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"bio": "Writes about rockets"}));
        assert!(!update.is_empty());
        assert!(ProfileUpdate::default().is_empty());
    }

    #[test]
    fn test_signup_request_wraps_user_data() {
        let req = SignupRequest {
            user_data: NewUser {
                email: "ada@example.com".to_string(),
                password: "Secret1!".to_string(),
                username: "ada".to_string(),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["userData"]["username"], "ada");
        assert!(json["userData"].get("bio").is_none());
    }

    #[test]
    fn test_upload_url_object_url() {
        let url = UploadUrl {
            upload_url: "https://bucket.s3.amazonaws.com/avatars/u1.png?X-Amz-Signature=abc".to_string(),
            key: "avatars/u1.png".to_string(),
        };
        assert_eq!(url.object_url(), "https://bucket.s3.amazonaws.com/avatars/u1.png");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut user: UserProfile = serde_json::from_str(
            r#"{"_id":"u1","email":"ada@example.com","username":" "}"#,
        )
        .unwrap();
        assert_eq!(user.display_name(), "ada@example.com");
        user.username = "ada".to_string();
        assert_eq!(user.display_name(), "ada");
    }
}
