use crate::fixtures::{seed::PASSWORD, test_app::TestApp};
use bizchat_db::models::role::permissions::RoleKind;
use serde_json::Value;

#[tokio::test]
async fn permission_change_reaches_holders_on_next_login() {
    let app = TestApp::spawn().await;
    let acme = app.seed_company("acme").await;
    let employee_role = app.role_id(&acme, RoleKind::Employee).await;
    app.add_user(&acme, "bob@acme.test", None).await;
    app.add_user(&acme, "carol@acme.test", None).await;

    let resp = app
        .auth_put(
            &format!("/api/admin/roles/{employee_role}/permissions"),
            &acme.admin.token,
        )
        .json(&serde_json::json!({
            "permissions": ["view:own_chats", "view:own_profile", "view:own_profile"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["users_updated"], 2);
    assert_eq!(
        json["role"]["permissions"],
        serde_json::json!(["view:own_chats", "view:own_profile"])
    );

    let bob = app.login_user("bob@acme.test", PASSWORD, "acme").await;
    let me: Value = app
        .auth_get("/api/auth/me", &bob.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        me["permissions"],
        serde_json::json!(["view:own_chats", "view:own_profile"])
    );

    let resp = app.auth_get("/api/chats", &bob.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let resp = app
        .auth_post("/api/chats", &bob.token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn custom_role_lifecycle() {
    let app = TestApp::spawn().await;
    let acme = app.seed_company("acme").await;

    let resp = app
        .auth_post("/api/admin/roles", &acme.admin.token)
        .json(&serde_json::json!({
            "name": "Support Lead",
            "permissions": ["view:users", "create:chat"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let role: Value = resp.json().await.unwrap();
    assert_eq!(role["name"], "support_lead");
    assert_eq!(role["is_system"], false);
    let role_id = role["id"].as_str().unwrap().to_string();

    let resp = app
        .auth_post("/api/admin/roles", &acme.admin.token)
        .json(&serde_json::json!({ "name": "support_lead" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    let dana = app.add_user(&acme, "dana@acme.test", Some(&role_id)).await;
    let resp = app.auth_get("/api/admin/users", &dana.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let resp = app.auth_get("/api/admin/roles", &dana.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    // Still held by dana.
    let resp = app
        .auth_delete(&format!("/api/admin/roles/{role_id}"), &acme.admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    let employee_role = app.role_id(&acme, RoleKind::Employee).await;
    let resp = app
        .auth_put(&format!("/api/admin/users/{}", dana.id), &acme.admin.token)
        .json(&serde_json::json!({ "role_id": employee_role }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["role_name"], "employee");

    let resp = app
        .auth_delete(&format!("/api/admin/roles/{role_id}"), &acme.admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);
}

#[tokio::test]
async fn system_roles_cannot_be_deleted_or_renamed() {
    let app = TestApp::spawn().await;
    let acme = app.seed_company("acme").await;
    let manager_role = app.role_id(&acme, RoleKind::Manager).await;

    let resp = app
        .auth_delete(&format!("/api/admin/roles/{manager_role}"), &acme.admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_put(&format!("/api/admin/roles/{manager_role}"), &acme.admin.token)
        .json(&serde_json::json!({ "name": "boss" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_put(&format!("/api/admin/roles/{manager_role}"), &acme.admin.token)
        .json(&serde_json::json!({ "display_name": "Team Manager" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let role: Value = resp.json().await.unwrap();
    assert_eq!(role["display_name"], "Team Manager");
}
