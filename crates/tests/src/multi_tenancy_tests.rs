use crate::fixtures::test_app::TestApp;
use bizchat_db::models::role::permissions::RoleKind;
use serde_json::Value;

#[tokio::test]
async fn users_of_another_company_are_not_found() {
    hides_users_of_other_companies(&TestApp::spawn().await).await;
}

pub(crate) async fn hides_users_of_other_companies(app: &TestApp) {
    let acme = app.seed_company("acme").await;
    let beta = app.seed_company("beta").await;

    let resp = app
        .auth_get(&format!("/api/admin/users/{}", acme.admin.id), &beta.admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .auth_put(&format!("/api/admin/users/{}", acme.admin.id), &beta.admin.token)
        .json(&serde_json::json!({ "name": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let page: Value = app
        .auth_get("/api/admin/users", &beta.admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["email"], "admin@beta.test");
}

#[tokio::test]
async fn chats_are_private_across_companies() {
    hides_chats_of_other_companies(&TestApp::spawn().await).await;
}

pub(crate) async fn hides_chats_of_other_companies(app: &TestApp) {
    let acme = app.seed_company("acme").await;
    let beta = app.seed_company("beta").await;

    let chat: Value = app
        .auth_post("/api/chats", &acme.admin.token)
        .json(&serde_json::json!({ "title": "Quarterly plan" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let chat_id = chat["id"].as_str().unwrap();

    let resp = app
        .auth_get(&format!("/api/chats/{chat_id}"), &beta.admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .auth_post(&format!("/api/chats/{chat_id}/messages"), &beta.admin.token)
        .json(&serde_json::json!({ "content": "hello?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn roles_of_another_company_cannot_be_assigned() {
    refuses_roles_of_other_companies(&TestApp::spawn().await).await;
}

pub(crate) async fn refuses_roles_of_other_companies(app: &TestApp) {
    let acme = app.seed_company("acme").await;
    let beta = app.seed_company("beta").await;
    let acme_admin_role = app.role_id(&acme, RoleKind::CompanyAdmin).await;

    let resp = app
        .auth_post("/api/admin/users", &beta.admin.token)
        .json(&serde_json::json!({
            "email": "mallory@beta.test",
            "password": "Password123!",
            "name": "Mallory",
            "role_id": acme_admin_role,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_put(
            &format!("/api/admin/roles/{acme_admin_role}/permissions"),
            &beta.admin.token,
        )
        .json(&serde_json::json!({ "permissions": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn activity_logs_are_scoped_to_the_caller_company() {
    scopes_activity_logs_to_the_company(&TestApp::spawn().await).await;
}

pub(crate) async fn scopes_activity_logs_to_the_company(app: &TestApp) {
    let acme = app.seed_company("acme").await;
    let beta = app.seed_company("beta").await;

    app.auth_get("/api/admin/users", &acme.admin.token)
        .send()
        .await
        .unwrap();
    app.wait_for_activity(|logs| logs.iter().any(|l| l.resource == "user"))
        .await;

    let page: Value = app
        .auth_get("/api/admin/activity-logs?resource=user", &beta.admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 0);
}
