use crate::fixtures::{seed::PASSWORD, test_app::TestApp};
use serde_json::Value;

#[tokio::test]
async fn tenant_admins_are_not_platform_admins() {
    let app = TestApp::spawn().await;
    let acme = app.seed_company("acme").await;

    let resp = app
        .auth_get("/api/admin/companies", &acme.admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_get(&format!("/api/admin/companies/{}", acme.id), &acme.admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn super_admin_lists_and_creates_companies() {
    let app = TestApp::spawn().await;
    app.seed_company("acme").await;
    let root = app.seed_super_admin().await;

    let page: Value = app
        .auth_get("/api/admin/companies", &root.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 2);

    let resp = app
        .auth_post("/api/admin/companies", &root.token)
        .json(&serde_json::json!({
            "company_name": "Globex",
            "domain": "globex",
            "email": "office@globex.test",
            "admin_name": "Hank",
            "admin_email": "hank@globex.test",
            "admin_password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["company"]["domain"], "globex");

    let page: Value = app
        .auth_get("/api/admin/companies?search=glob", &root.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["name"], "Globex");

    app.login_user("hank@globex.test", PASSWORD, "globex").await;
}

#[tokio::test]
async fn super_admin_updates_plan_and_quota() {
    let app = TestApp::spawn().await;
    let acme = app.seed_company("acme").await;
    let root = app.seed_super_admin().await;

    let resp = app
        .auth_put(&format!("/api/admin/companies/{}", acme.id), &root.token)
        .json(&serde_json::json!({
            "max_users": 50,
            "industry": "Logistics",
            "domain": "ignored",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let company: Value = resp.json().await.unwrap();
    assert_eq!(company["max_users"], 50);
    assert_eq!(company["industry"], "Logistics");
    assert_eq!(company["domain"], "acme");
}

#[tokio::test]
async fn deactivated_company_cannot_log_in() {
    let app = TestApp::spawn().await;
    let acme = app.seed_company("acme").await;
    let root = app.seed_super_admin().await;

    let resp = app
        .auth_delete(&format!("/api/admin/companies/{}", acme.id), &root.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let company: Value = resp.json().await.unwrap();
    assert_eq!(company["is_active"], false);

    let resp = app.try_login("admin@acme.test", PASSWORD, "acme").await;
    assert_eq!(resp.status().as_u16(), 401);
    let json: Value = resp.json().await.unwrap();
    assert!(json["message"].as_str().unwrap().contains("suspended"));

    let me: Value = app
        .auth_get("/api/auth/me", &root.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let own_company = me["company_id"].as_str().unwrap();
    let resp = app
        .auth_delete(&format!("/api/admin/companies/{own_company}"), &root.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_put(&format!("/api/admin/companies/{own_company}"), &root.token)
        .json(&serde_json::json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    app.login_user("root@platform.test", PASSWORD, "platform").await;
}

#[tokio::test]
async fn unknown_company_is_not_found() {
    let app = TestApp::spawn().await;
    let root = app.seed_super_admin().await;

    let resp = app
        .auth_get("/api/admin/companies/65f0a0a0a0a0a0a0a0a0a0a0", &root.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .auth_get("/api/admin/companies/not-an-id", &root.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}
