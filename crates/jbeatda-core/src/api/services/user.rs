use tracing::{debug, info};

use super::UserService;
use crate::api::{ApiClient, ApiError};
use crate::models::{LoginRequest, LoginResponse, LogoutRequest, LogoutResponse, UserInfo};

const LOGIN_PATH: &str = "users/login";
const LOGOUT_PATH: &str = "users/logout";
const ME_PATH: &str = "users";

/// `UserService` over the shared HTTP client.
#[derive(Clone)]
pub struct HttpUserService {
    client: ApiClient,
}

impl HttpUserService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl UserService for HttpUserService {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        debug!(email = %request.email, "Logging in");
        let response: LoginResponse = self.client.post_public(LOGIN_PATH, request).await?;
        info!(user_id = response.user_id, "Login accepted");
        Ok(response)
    }

    async fn logout(&self) -> Result<LogoutResponse, ApiError> {
        self.client.post(LOGOUT_PATH, &LogoutRequest::default()).await
    }

    async fn me(&self) -> Result<UserInfo, ApiError> {
        self.client.get(ME_PATH).await
    }
}
