use crate::fixtures::{seed::PASSWORD, test_app::TestApp};
use serde_json::Value;

#[tokio::test]
async fn login_returns_token_and_sets_cookie() {
    let app = TestApp::spawn().await;
    app.seed_company("acme").await;

    let resp = app.try_login("admin@acme.test", PASSWORD, "acme").await;
    assert_eq!(resp.status().as_u16(), 200);

    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let json: Value = resp.json().await.unwrap();
    assert!(json["token"].is_string());
    assert!(json["expires_at"].is_string());
    assert_eq!(json["user"]["email"], "admin@acme.test");
    assert_eq!(json["user"]["role_name"], "company_admin");
    assert!(json["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn me_accepts_bearer_token() {
    let app = TestApp::spawn().await;
    let acme = app.seed_company("acme").await;

    let resp = app.auth_get("/api/auth/me", &acme.admin.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["id"], acme.admin.id.as_str());
    assert_eq!(json["company_id"], acme.id.as_str());
}

#[tokio::test]
async fn cookie_session_works_until_logout() {
    let app = TestApp::spawn().await;
    app.seed_company("acme").await;

    // The shared client keeps cookies between requests.
    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({
            "email": "admin@acme.test",
            "password": PASSWORD,
            "company_domain": "acme",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app.client.get(app.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app.client.post(app.url("/api/auth/logout")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app.client.get(app.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    app.wait_for_activity(|logs| logs.iter().any(|l| l.action == "logout"))
        .await;
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::spawn().await;

    for path in ["/api/auth/me", "/api/admin/users", "/api/chats"] {
        let resp = app.fresh_client().get(app.url(path)).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 401, "{path} should need a token");
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["success"], false);
    }
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    let app = TestApp::spawn().await;
    let acme = app.seed_company("acme").await;

    let mut forged = acme.admin.token.clone();
    forged.push('x');
    let resp = app.auth_get("/api/auth/me", &forged).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let resp = app.auth_get("/api/auth/me", "not-a-jwt").send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn wrong_password_and_unknown_company_look_the_same() {
    let app = TestApp::spawn().await;
    app.seed_company("acme").await;

    let wrong_password = app.try_login("admin@acme.test", "WrongPass1!", "acme").await;
    assert_eq!(wrong_password.status().as_u16(), 401);
    let wrong_password: Value = wrong_password.json().await.unwrap();

    let unknown_company = app.try_login("admin@acme.test", PASSWORD, "nowhere").await;
    assert_eq!(unknown_company.status().as_u16(), 401);
    let unknown_company: Value = unknown_company.json().await.unwrap();

    assert_eq!(wrong_password["message"], unknown_company["message"]);
}

#[tokio::test]
async fn deactivated_user_cannot_log_in() {
    let app = TestApp::spawn().await;
    let acme = app.seed_company("acme").await;
    let bob = app.add_user(&acme, "bob@acme.test", None).await;

    let resp = app
        .auth_delete(&format!("/api/admin/users/{}", bob.id), &acme.admin.token)
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let resp = app.try_login("bob@acme.test", PASSWORD, "acme").await;
    assert_eq!(resp.status().as_u16(), 401);
    let json: Value = resp.json().await.unwrap();
    assert!(json["message"].as_str().unwrap().contains("deactivated"));
}

#[tokio::test]
async fn self_registration_is_disabled() {
    let app = TestApp::spawn().await;

    let resp = app
        .fresh_client()
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "eve@test.com",
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn malformed_login_bodies_use_the_error_envelope() {
    let app = TestApp::spawn().await;
    app.seed_company("acme").await;

    let resp = app
        .fresh_client()
        .post(app.url("/api/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().is_some_and(|m| !m.is_empty()));

    let resp = app
        .fresh_client()
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({ "email": "a@b.c" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], false);
}
