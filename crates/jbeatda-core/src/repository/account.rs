use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::RepositoryError;
use crate::api::{ApiError, UserService};
use crate::auth::{jwt, Session, SessionState};
use crate::cache::{CachedData, ResourceCache};
use crate::models::{LoginRequest, Profile};
use crate::observe::Subscription;
use crate::store::SettingsStore;

/// Setting holding the cached profile of the signed-in user
pub const PROFILE_CACHE_KEY: &str = "cache.profile";

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub profile: Profile,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Sign-in, sign-out and the signed-in user's profile.
pub struct AccountRepository<U> {
    service: U,
    session: SessionState,
    profile: ResourceCache<Profile>,
}

impl<U: UserService> AccountRepository<U> {
    pub fn new(service: U, session: SessionState, store: Arc<SettingsStore>) -> Self {
        Self {
            service,
            session,
            profile: ResourceCache::new(store, PROFILE_CACHE_KEY),
        }
    }

    /// Exchange credentials for a session. The token's own `exp` claim, when
    /// present, becomes the session expiry.
    pub async fn login(&self, email: &str, password: &str) -> Result<Account, RepositoryError> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response = self.service.login(&request).await?;

        let expires_at = jwt::expiry_from_token(&response.token);
        if expires_at.is_none() {
            debug!("Token carries no readable expiry");
        }
        self.session.set_session(&response.token, expires_at).await?;

        let profile = Profile::from(&response);
        self.profile.save(&profile).await?;

        info!(user_id = profile.user_id, "Signed in");
        Ok(Account {
            profile,
            expires_at,
        })
    }

    /// Best-effort server logout, then always drop the local session and
    /// cached profile.
    pub async fn logout(&self) -> Result<(), RepositoryError> {
        if self.session.current_session().is_authenticated {
            match self.service.logout().await {
                Ok(ack) => debug!(message = ?ack.message, at = ?ack.logout_time, "Server acknowledged logout"),
                Err(e) => warn!(error = %e, "Server logout failed, clearing local session anyway"),
            }
        }

        self.session.clear_session().await?;
        self.profile.clear().await?;
        info!("Signed out");
        Ok(())
    }

    /// Fresh profile from the server, falling back to the cached copy when
    /// the server cannot be reached.
    pub async fn profile(&self) -> Result<Profile, RepositoryError> {
        match self.service.me().await {
            Ok(info) => {
                let profile = Profile::from(info);
                self.profile.save(&profile).await?;
                Ok(profile)
            }
            Err(e) if e.is_transient() => match self.profile.load() {
                Some(cached) => {
                    warn!(error = %e, age = %cached.age_display(), "Using cached profile");
                    Ok(cached.data)
                }
                None => Err(e.into()),
            },
            Err(ApiError::Unauthorized) => {
                self.profile.clear().await?;
                Err(RepositoryError::Auth)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn cached_profile(&self) -> Option<CachedData<Profile>> {
        self.profile.load()
    }

    /// Session snapshots for UI consumers
    pub fn session(&self) -> Subscription<Session> {
        self.session.observe_session()
    }

    pub fn current_session(&self) -> Session {
        self.session.current_session()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::auth::SessionKeys;
    use crate::models::{LoginResponse, LogoutResponse, UserInfo};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeUsers {
        token: String,
        me: Mutex<Vec<Result<UserInfo, ApiError>>>,
        logouts: Mutex<usize>,
    }

    impl UserService for FakeUsers {
        async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
            Ok(LoginResponse {
                user_id: 7,
                email: request.email.clone(),
                user_name: "jb".to_string(),
                token: self.token.clone(),
            })
        }

        async fn logout(&self) -> Result<LogoutResponse, ApiError> {
            *self.logouts.lock().unwrap() += 1;
            Err(ApiError::ServerError("unavailable".into()))
        }

        async fn me(&self) -> Result<UserInfo, ApiError> {
            self.me.lock().unwrap().remove(0)
        }
    }

    fn token_expiring_at(exp: i64) -> String {
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"email":"a@b.c","userId":7,"exp":{}}}"#, exp));
        format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", payload)
    }

    fn repo(dir: &TempDir, users: FakeUsers) -> AccountRepository<FakeUsers> {
        let store = Arc::new(SettingsStore::open(dir.path()).unwrap());
        let session = SessionState::new(Arc::clone(&store), SessionKeys::default());
        AccountRepository::new(users, session, store)
    }

    fn info(name: &str) -> UserInfo {
        UserInfo {
            user_id: 7,
            email: "a@b.c".to_string(),
            user_name: name.to_string(),
            profile_image: None,
            created_at: Some("2025-06-01T10:00".to_string()),
        }
    }

    #[tokio::test]
    async fn test_login_stores_session_with_token_expiry() {
        let dir = TempDir::new().unwrap();
        let exp = (Utc::now() + chrono::Duration::hours(1)).timestamp();
        let token = token_expiring_at(exp);
        let repo = repo(
            &dir,
            FakeUsers {
                token: token.clone(),
                ..Default::default()
            },
        );

        let account = repo.login(" a@b.c ", "pw").await.unwrap();

        assert_eq!(account.profile.email, "a@b.c");
        assert_eq!(account.expires_at.map(|at| at.timestamp()), Some(exp));
        let session = repo.current_session();
        assert!(session.is_authenticated);
        assert_eq!(session.token, Some(token));
        assert_eq!(repo.cached_profile().unwrap().data, account.profile);
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_server_fails() {
        let dir = TempDir::new().unwrap();
        let repo = repo(
            &dir,
            FakeUsers {
                token: "opaque".to_string(),
                ..Default::default()
            },
        );
        repo.login("a@b.c", "pw").await.unwrap();

        repo.logout().await.unwrap();

        assert_eq!(*repo.service.logouts.lock().unwrap(), 1);
        assert_eq!(repo.current_session(), Session::anonymous());
        assert!(repo.cached_profile().is_none());
    }

    #[tokio::test]
    async fn test_profile_falls_back_to_cache_when_unreachable() {
        let dir = TempDir::new().unwrap();
        let users = FakeUsers {
            me: Mutex::new(vec![
                Ok(info("first")),
                Err(ApiError::ServerError("down".into())),
                Err(ApiError::InvalidResponse("teapot".into())),
            ]),
            ..Default::default()
        };
        let repo = repo(&dir, users);

        assert_eq!(repo.profile().await.unwrap().user_name, "first");
        assert_eq!(repo.profile().await.unwrap().user_name, "first");
        assert!(matches!(repo.profile().await, Err(RepositoryError::Unknown(_))));
    }

    #[tokio::test]
    async fn test_profile_rejection_drops_cached_profile() {
        let dir = TempDir::new().unwrap();
        let users = FakeUsers {
            me: Mutex::new(vec![Ok(info("first")), Err(ApiError::Unauthorized)]),
            ..Default::default()
        };
        let repo = repo(&dir, users);

        repo.profile().await.unwrap();
        assert_eq!(repo.profile().await, Err(RepositoryError::Auth));
        assert!(repo.cached_profile().is_none());
    }
}
