//! Repository flows end to end: login, cache-then-network stamps, logout.

mod support;

use jbeatda_core::models::Stamp;
use jbeatda_core::{RepositoryError, Session};
use pretty_assertions::assert_eq;
use support::{context, fresh_token, StubResponse, StubServer, STAMPS_JSON, USER_JSON};
use tempfile::TempDir;

fn login_body(token: &str) -> String {
    format!(
        r#"{{"userId": 12, "email": "eat@jb.kr", "userName": "jb", "token": "{}"}}"#,
        token
    )
}

#[tokio::test]
async fn test_login_then_stamps_cache_then_network() {
    let token = fresh_token();
    let body = login_body(&token);
    let server = StubServer::start(move |req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "users/login") => StubResponse::ok(body.clone()),
        ("GET", "stamps/user/me") => StubResponse::ok(STAMPS_JSON),
        _ => StubResponse::error(404, "404-0", "no route"),
    })
    .await;
    let dir = TempDir::new().unwrap();
    let ctx = context(&server.base_url(), &dir);

    let account = ctx.account.login("eat@jb.kr", "secret").await.unwrap();
    assert_eq!(account.profile.user_name, "jb");
    assert!(account.expires_at.is_some());
    assert_eq!(ctx.session.current_session().token.as_deref(), Some(token.as_str()));

    let mut stamps = ctx.stamps.stamps();
    assert_eq!(stamps.next().await, Some(None));

    let fresh = ctx.stamps.refresh_stamps().await.unwrap();
    assert_eq!(fresh.len(), 2);
    let cached = stamps.next().await.unwrap().unwrap();
    assert_eq!(cached.data, fresh);

    let requests = server.requests();
    let login = &requests[0];
    assert!(login.is("POST", "users/login"));
    assert_eq!(login.header("authorization"), None);
    let sent: serde_json::Value = serde_json::from_str(&login.body).unwrap();
    assert_eq!(sent, serde_json::json!({"email": "eat@jb.kr", "password": "secret"}));

    let expected = format!("Bearer {}", token);
    assert_eq!(requests[1].header("authorization"), Some(expected.as_str()));
}

#[tokio::test]
async fn test_cached_stamps_served_first_on_restart() {
    let server = StubServer::start(|_| StubResponse::ok(STAMPS_JSON)).await;
    let dir = TempDir::new().unwrap();
    {
        let ctx = context(&server.base_url(), &dir);
        ctx.session.set_session("abc123", None).await.unwrap();
        ctx.stamps.refresh_stamps().await.unwrap();
    }

    let ctx = context("http://127.0.0.1:1/api/", &dir);
    let mut stamps = ctx.stamps.stamps();
    let cached = stamps.next().await.unwrap().unwrap();
    assert_eq!(cached.data.len(), 2);
    assert!(ctx.session.current_session().is_authenticated);
}

#[tokio::test]
async fn test_missing_stamp_list_is_empty() {
    let server =
        StubServer::start(|_| StubResponse::error(404, "404-5", "no stamps for user")).await;
    let dir = TempDir::new().unwrap();
    let ctx = context(&server.base_url(), &dir);
    ctx.session.set_session("abc123", None).await.unwrap();

    let stamps = ctx.stamps.refresh_stamps().await.unwrap();

    assert_eq!(stamps, Vec::<Stamp>::new());
    assert_eq!(ctx.stamps.cached_stamps().unwrap().data, Vec::<Stamp>::new());
}

#[tokio::test]
async fn test_stamp_for_menu_and_delete() {
    let server = StubServer::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("GET", "stamps/user/me") => StubResponse::ok(STAMPS_JSON),
        ("GET", "stamps/user/me/menu/5") => StubResponse::ok(
            r#"{"stampId": 2, "menuId": 5, "image": null, "createdAt": "2025-06-26T03:33"}"#,
        ),
        ("DELETE", "stamps/2") => StubResponse::ok(r#"{"message": "deleted"}"#),
        _ => StubResponse::error(404, "404-4", "stamp not found"),
    })
    .await;
    let dir = TempDir::new().unwrap();
    let ctx = context(&server.base_url(), &dir);
    ctx.session.set_session("abc123", None).await.unwrap();
    ctx.stamps.refresh_stamps().await.unwrap();

    let stamp = ctx.stamps.stamp_for_menu(5).await.unwrap();
    assert_eq!(stamp.stamp_id, 2);
    assert_eq!(
        ctx.stamps.stamp_for_menu(9).await,
        Err(RepositoryError::NotFound("stamp not found (404-4)".to_string()))
    );

    ctx.stamps.delete_stamp(2).await.unwrap();
    let remaining: Vec<i64> = ctx
        .stamps
        .cached_stamps()
        .unwrap()
        .data
        .iter()
        .map(|s| s.stamp_id)
        .collect();
    assert_eq!(remaining, vec![1]);
}

#[tokio::test]
async fn test_logout_notifies_server_then_clears() {
    let server = StubServer::start(|req| match req.path.as_str() {
        "users/logout" => StubResponse::ok(
            r#"{"message": "logged out", "logoutTime": "2025-06-26T10:00:00"}"#,
        ),
        _ => StubResponse::ok(USER_JSON),
    })
    .await;
    let dir = TempDir::new().unwrap();
    let ctx = context(&server.base_url(), &dir);
    ctx.session.set_session("abc123", None).await.unwrap();
    ctx.account.profile().await.unwrap();
    assert!(ctx.account.cached_profile().is_some());

    let mut sessions = ctx.account.session();
    assert!(sessions.next().await.unwrap().is_authenticated);

    ctx.account.logout().await.unwrap();

    assert_eq!(sessions.next().await, Some(Session::anonymous()));
    assert!(ctx.account.cached_profile().is_none());
    let logout = server.requests().into_iter().last().unwrap();
    assert!(logout.is("POST", "users/logout"));
    assert_eq!(logout.header("authorization"), Some("Bearer abc123"));
    let sent: serde_json::Value = serde_json::from_str(&logout.body).unwrap();
    assert_eq!(sent, serde_json::json!({}));
}

#[tokio::test]
async fn test_profile_falls_back_to_cache_offline() {
    let server = StubServer::start(|_| StubResponse::ok(USER_JSON)).await;
    let dir = TempDir::new().unwrap();
    {
        let ctx = context(&server.base_url(), &dir);
        ctx.session.set_session("abc123", None).await.unwrap();
        ctx.account.profile().await.unwrap();
    }

    let ctx = context("http://127.0.0.1:1/api/", &dir);
    let profile = ctx.account.profile().await.unwrap();
    assert_eq!(profile.email, "eat@jb.kr");
    assert_eq!(profile.member_since.as_deref(), Some("2025-06-01T09:00:00"));
}
