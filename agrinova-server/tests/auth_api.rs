use agrinova_core::model::Role;
use agrinova_server::api::{self, v1};
use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{Value, json};

#[path = "support/mod.rs"]
mod support;
use support::{PASSWORD, TestApp, bearer, data_field};

fn mobile_body(username: &str, device: &str, fingerprint: &str) -> Value {
    json!({
        "username": username,
        "password": PASSWORD,
        "platform": "ANDROID",
        "device_id": device,
        "device_fingerprint": fingerprint,
        "device_info": { "model": "Pixel 8", "os_version": "14" }
    })
}

#[tokio::test]
async fn health_is_public() -> Result<()> {
    let app = TestApp::build()?;
    let response = app.server.get(api::HEALTH).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn web_login_returns_tokens_session_and_profile() -> Result<()> {
    let app = TestApp::build()?;
    let user = app.seed("manager1", Role::Manager).await?;

    let response = app
        .server
        .post(v1::auth::LOGIN)
        .add_header("User-Agent", "integration-test")
        .json(&json!({ "username": "manager1", "password": PASSWORD }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["status"], "success");
    assert!(!data_field(&body, "access_token").is_empty());
    assert!(!data_field(&body, "refresh_token").is_empty());
    assert!(body["data"]["offline_token"].is_null());
    assert!(body["data"]["session"]["session_token"].is_string());
    assert_eq!(body["data"]["user"]["id"], user.to_string());
    assert_eq!(body["data"]["user"]["role"], "MANAGER");

    let sessions = app.store.sessions.all().await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].user_agent.as_deref(), Some("integration-test"));
    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_a_generic_401() -> Result<()> {
    let app = TestApp::build()?;
    app.seed("manager1", Role::Manager).await?;

    let wrong = app
        .server
        .post(v1::auth::LOGIN)
        .json(&json!({ "username": "manager1", "password": "nope" }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);
    let unknown = app
        .server
        .post(v1::auth::LOGIN)
        .json(&json!({ "username": "ghost", "password": PASSWORD }))
        .await;
    unknown.assert_status(StatusCode::UNAUTHORIZED);

    let wrong: Value = wrong.json();
    let unknown: Value = unknown.json();
    assert_eq!(wrong["error"]["message"], unknown["error"]["message"]);
    assert_eq!(wrong["error"]["status"], 401);
    Ok(())
}

#[tokio::test]
async fn mobile_login_binds_device_and_issues_offline_token() -> Result<()> {
    let app = TestApp::build()?;
    app.seed("mandor1", Role::Mandor).await?;

    let response = app
        .server
        .post(v1::auth::LOGIN)
        .json(&mobile_body("mandor1", "device-a", "fp-a"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(!data_field(&body, "offline_token").is_empty());
    assert_eq!(body["data"]["device"]["device_id"], "device-a");
    assert_eq!(body["data"]["device"]["is_authorized"], true);

    let mismatch = app
        .server
        .post(v1::auth::LOGIN)
        .json(&mobile_body("mandor1", "device-a", "fp-b"))
        .await;
    mismatch.assert_status(StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn mobile_login_without_fingerprint_is_a_bad_request() -> Result<()> {
    let app = TestApp::build()?;
    app.seed("mandor1", Role::Mandor).await?;

    let response = app
        .server
        .post(v1::auth::LOGIN)
        .json(&json!({
            "username": "mandor1",
            "password": PASSWORD,
            "platform": "IOS",
            "device_id": "device-a"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn refresh_rotates_and_rejects_the_old_refresh_token() -> Result<()> {
    let app = TestApp::build()?;
    app.seed("manager1", Role::Manager).await?;

    let login: Value = app
        .server
        .post(v1::auth::LOGIN)
        .json(&json!({ "username": "manager1", "password": PASSWORD }))
        .await
        .json();
    let refresh_token = data_field(&login, "refresh_token").to_string();

    let refreshed = app
        .server
        .post(v1::auth::REFRESH)
        .json(&json!({ "refresh_token": refresh_token }))
        .await;
    refreshed.assert_status_ok();
    let refreshed: Value = refreshed.json();
    assert_ne!(data_field(&refreshed, "refresh_token"), refresh_token);

    let replay = app
        .server
        .post(v1::auth::REFRESH)
        .json(&json!({ "refresh_token": refresh_token }))
        .await;
    replay.assert_status(StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn offline_token_validates_and_renews() -> Result<()> {
    let app = TestApp::build()?;
    app.seed("mandor1", Role::Mandor).await?;

    let login: Value = app
        .server
        .post(v1::auth::LOGIN)
        .json(&mobile_body("mandor1", "device-a", "fp-a"))
        .await
        .json();
    let offline = data_field(&login, "offline_token").to_string();

    let validated = app
        .server
        .post(v1::auth::offline::VALIDATE)
        .json(&json!({ "offline_token": offline, "device_id": "device-a" }))
        .await;
    validated.assert_status_ok();
    assert_eq!(validated.json::<Value>()["data"]["username"], "mandor1");

    let renewed = app
        .server
        .post(v1::auth::device::RENEW)
        .json(&json!({
            "offline_token": offline,
            "device_id": "device-a",
            "device_fingerprint": "fp-a"
        }))
        .await;
    renewed.assert_status_ok();
    let renewed: Value = renewed.json();

    let old_access = data_field(&login, "access_token");
    app.server
        .get(v1::me::SCOPE)
        .add_header("Authorization", bearer(old_access))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .get(v1::me::SCOPE)
        .add_header("Authorization", bearer(data_field(&renewed, "access_token")))
        .await
        .assert_status_ok();

    let wrong_device = app
        .server
        .post(v1::auth::device::RENEW)
        .json(&json!({ "offline_token": offline, "device_id": "device-b" }))
        .await;
    wrong_device.assert_status(StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn protected_routes_need_a_bearer_token() -> Result<()> {
    let app = TestApp::build()?;

    app.server
        .get(v1::me::SCOPE)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .post(v1::auth::LOGOUT)
        .add_header("Authorization", "Basic abc")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .get(v1::me::SCOPE)
        .add_header("Authorization", bearer("not-a-jwt"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn scope_reports_the_callers_assignments() -> Result<()> {
    let app = TestApp::build()?;
    let user = app.seed("manager1", Role::Manager).await?;

    let login: Value = app
        .server
        .post(v1::auth::LOGIN)
        .json(&json!({ "username": "manager1", "password": PASSWORD }))
        .await
        .json();

    let response = app
        .server
        .get(v1::me::SCOPE)
        .add_header("Authorization", bearer(data_field(&login, "access_token")))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["user_id"], user.to_string());
    assert_eq!(body["data"]["role"], "MANAGER");
    assert_eq!(body["data"]["company_ids"], json!([app.company]));
    assert_eq!(body["data"]["estate_ids"], json!([app.estate]));
    Ok(())
}

#[tokio::test]
async fn deactivated_account_is_locked_out_mid_session() -> Result<()> {
    let app = TestApp::build()?;
    let user = app.seed("manager1", Role::Manager).await?;

    let login: Value = app
        .server
        .post(v1::auth::LOGIN)
        .json(&json!({ "username": "manager1", "password": PASSWORD }))
        .await
        .json();
    app.store.users.set_active(user, false).await?;

    app.server
        .get(v1::me::SCOPE)
        .add_header("Authorization", bearer(data_field(&login, "access_token")))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_revokes_the_device_tokens() -> Result<()> {
    let app = TestApp::build()?;
    app.seed("mandor1", Role::Mandor).await?;

    let login: Value = app
        .server
        .post(v1::auth::LOGIN)
        .json(&mobile_body("mandor1", "device-a", "fp-a"))
        .await
        .json();
    let access = data_field(&login, "access_token").to_string();

    let response = app
        .server
        .post(v1::auth::LOGOUT)
        .add_header("Authorization", bearer(&access))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["tokens_revoked"], 2);

    app.server
        .post(v1::auth::LOGOUT)
        .add_header("Authorization", bearer(&access))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    let offline = app
        .server
        .post(v1::auth::offline::VALIDATE)
        .json(&json!({ "offline_token": data_field(&login, "offline_token") }))
        .await;
    offline.assert_status(StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn unbinding_an_unknown_device_is_not_found() -> Result<()> {
    let app = TestApp::build()?;
    app.seed("mandor1", Role::Mandor).await?;

    let login: Value = app
        .server
        .post(v1::auth::LOGIN)
        .json(&mobile_body("mandor1", "device-a", "fp-a"))
        .await
        .json();
    let access = data_field(&login, "access_token").to_string();

    app.server
        .post(v1::auth::device::UNBIND)
        .add_header("Authorization", bearer(&access))
        .json(&json!({ "device_id": "device-z" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let response = app
        .server
        .post(v1::auth::device::UNBIND)
        .add_header("Authorization", bearer(&access))
        .json(&json!({ "device_id": "device-a" }))
        .await;
    response.assert_status_ok();
    assert!(app.store.devices.all().await.iter().all(|b| !b.is_live()));
    Ok(())
}

#[tokio::test]
async fn repeated_bad_logins_are_throttled_per_client() -> Result<()> {
    let app = TestApp::build()?;
    app.seed("manager1", Role::Manager).await?;
    let wrong = json!({ "username": "manager1", "password": "nope" });

    for _ in 0..5 {
        app.server
            .post(v1::auth::LOGIN)
            .add_header("X-Forwarded-For", "198.51.100.7")
            .json(&wrong)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
    let blocked = app
        .server
        .post(v1::auth::LOGIN)
        .add_header("X-Forwarded-For", "198.51.100.7")
        .json(&wrong)
        .await;
    blocked.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(blocked.header("retry-after").to_str()?, "300");
    assert_eq!(blocked.json::<Value>()["error"]["status"], 429);

    // The right password does not lift the block early.
    app.server
        .post(v1::auth::LOGIN)
        .add_header("X-Forwarded-For", "198.51.100.7")
        .json(&json!({ "username": "manager1", "password": PASSWORD }))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    app.server
        .post(v1::auth::LOGIN)
        .add_header("X-Forwarded-For", "198.51.100.8")
        .json(&json!({ "username": "manager1", "password": PASSWORD }))
        .await
        .assert_status_ok();
    Ok(())
}

#[tokio::test]
async fn web_session_validates_until_logout() -> Result<()> {
    let app = TestApp::build()?;
    let user = app.seed("manager1", Role::Manager).await?;

    let login: Value = app
        .server
        .post(v1::auth::LOGIN)
        .json(&json!({ "username": "manager1", "password": PASSWORD }))
        .await
        .json();
    let session_token = login["data"]["session"]["session_token"]
        .as_str()
        .expect("web login returns a session token")
        .to_string();

    let validated = app
        .server
        .post(v1::auth::session::VALIDATE)
        .json(&json!({ "session_token": session_token }))
        .await;
    validated.assert_status_ok();
    let validated: Value = validated.json();
    assert_eq!(validated["data"]["user"]["id"], user.to_string());
    assert_eq!(
        validated["data"]["session_id"],
        login["data"]["session"]["session_id"]
    );

    app.server
        .post(v1::auth::session::VALIDATE)
        .json(&json!({ "session_token": "not-a-session" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.server
        .post(v1::auth::LOGOUT)
        .add_header("Authorization", bearer(data_field(&login, "access_token")))
        .await
        .assert_status_ok();
    app.server
        .post(v1::auth::session::VALIDATE)
        .json(&json!({ "session_token": session_token }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn me_returns_the_callers_profile() -> Result<()> {
    let app = TestApp::build()?;
    let user = app.seed("mandor1", Role::Mandor).await?;

    let login: Value = app
        .server
        .post(v1::auth::LOGIN)
        .json(&mobile_body("mandor1", "device-a", "fp-a"))
        .await
        .json();

    let response = app
        .server
        .get(v1::me::PROFILE)
        .add_header("Authorization", bearer(data_field(&login, "access_token")))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["id"], user.to_string());
    assert_eq!(body["data"]["username"], "mandor1");
    assert_eq!(body["data"]["role"], "MANDOR");

    app.server
        .get(v1::me::PROFILE)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn company_admin_approves_a_pending_device() -> Result<()> {
    let app = TestApp::build()?;
    app.seed("mandor1", Role::Mandor).await?;
    app.seed("admin1", Role::CompanyAdmin).await?;

    let first: Value = app
        .server
        .post(v1::auth::LOGIN)
        .json(&mobile_body("mandor1", "device-a", "fp-a"))
        .await
        .json();
    app.server
        .post(v1::auth::LOGIN)
        .json(&mobile_body("mandor1", "device-b", "fp-b"))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .post(v1::admin::devices::APPROVE)
        .add_header("Authorization", bearer(data_field(&first, "access_token")))
        .json(&json!({ "device_id": "device-b" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let admin: Value = app
        .server
        .post(v1::auth::LOGIN)
        .json(&json!({ "username": "admin1", "password": PASSWORD }))
        .await
        .json();
    let admin_access = data_field(&admin, "access_token").to_string();

    app.server
        .post(v1::admin::devices::APPROVE)
        .add_header("Authorization", bearer(&admin_access))
        .json(&json!({ "device_id": "device-z" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let approved = app
        .server
        .post(v1::admin::devices::APPROVE)
        .add_header("Authorization", bearer(&admin_access))
        .json(&json!({ "device_id": "device-b" }))
        .await;
    approved.assert_status_ok();
    let approved: Value = approved.json();
    assert_eq!(approved["data"]["device_id"], "device-b");
    assert_eq!(approved["data"]["is_authorized"], true);
    assert_eq!(approved["data"]["is_trusted"], true);

    app.server
        .post(v1::auth::LOGIN)
        .json(&mobile_body("mandor1", "device-b", "fp-b"))
        .await
        .assert_status_ok();
    Ok(())
}
