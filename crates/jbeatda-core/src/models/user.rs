use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: i64,
    pub email: String,
    pub user_name: String,
    pub token: String,
}

/// Logout carries the token in the header; the backend still requires a
/// JSON object body, so this serializes as `{}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogoutRequest {}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub logout_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: i64,
    pub email: String,
    pub user_name: String,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Error envelope returned by the backend alongside non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// The signed-in user. Cached locally so it can be shown offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: i64,
    pub email: String,
    pub user_name: String,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub member_since: Option<String>,
}

impl Profile {
    pub fn display_name(&self) -> String {
        if self.user_name.trim().is_empty() {
            self.email.clone()
        } else {
            format!("{} <{}>", self.user_name, self.email)
        }
    }
}

impl From<&LoginResponse> for Profile {
    fn from(login: &LoginResponse) -> Self {
        Self {
            user_id: login.user_id,
            email: login.email.clone(),
            user_name: login.user_name.clone(),
            profile_image: None,
            member_since: None,
        }
    }
}

impl From<UserInfo> for Profile {
    fn from(info: UserInfo) -> Self {
        Self {
            user_id: info.user_id,
            email: info.email,
            user_name: info.user_name,
            profile_image: info.profile_image,
            member_since: info.created_at,
        }
    }
}
