use crate::fixtures::{seed::PASSWORD, test_app::TestApp};
use bizchat_db::models::{
    Company, Role, User,
    role::permissions::{RoleKind, default_permissions},
};
use serde_json::Value;

fn registration(domain: &str, company_email: &str, admin_email: &str) -> Value {
    serde_json::json!({
        "company_name": "Acme Inc",
        "domain": domain,
        "email": company_email,
        "industry": "Manufacturing",
        "admin_name": "Alice Admin",
        "admin_email": admin_email,
        "admin_password": PASSWORD,
    })
}

#[tokio::test]
async fn registration_creates_company_roles_and_admin() {
    registers_company_roles_and_admin(&TestApp::spawn().await).await;
}

pub(crate) async fn registers_company_roles_and_admin(app: &TestApp) {

    let resp = app
        .fresh_client()
        .post(app.url("/api/companies/register"))
        .json(&registration("Acme", "office@acme.test", "alice@acme.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let json: Value = resp.json().await.unwrap();

    assert_eq!(json["company"]["domain"], "acme");
    assert_eq!(json["company"]["is_active"], true);
    assert_eq!(json["company"]["created_by"], json["admin"]["id"]);
    assert_eq!(json["admin"]["role_name"], "company_admin");
    assert_eq!(json["admin"]["is_super_admin"], false);

    let roles: Vec<String> = app
        .documents(Role::COLLECTION)
        .await
        .iter()
        .filter_map(|doc| doc.get_str("name").ok().map(str::to_string))
        .collect();
    assert_eq!(roles.len(), 3);
    for name in ["company_admin", "manager", "employee"] {
        assert!(roles.iter().any(|r| r == name), "missing role {name}");
    }

    let admin = app.login_user("alice@acme.test", PASSWORD, "acme").await;
    let resp = app.auth_get("/api/admin/users", &admin.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn minimal_registration_body_is_accepted() {
    accepts_minimal_registration(&TestApp::spawn().await).await;
}

pub(crate) async fn accepts_minimal_registration(app: &TestApp) {

    let resp = app
        .fresh_client()
        .post(app.url("/api/companies/register"))
        .json(&serde_json::json!({
            "domain": "acme",
            "email": "ops@acme.io",
            "admin_email": "admin@acme.io",
            "admin_password": "Secr3t!",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let json: Value = resp.json().await.unwrap();

    assert_eq!(json["company"]["name"], "acme");
    assert_eq!(json["company"]["email"], "ops@acme.io");
    assert_eq!(json["company"]["created_by"], json["admin"]["id"]);
    assert_eq!(json["admin"]["name"], "admin");
    assert_eq!(json["admin"]["is_active"], true);
    assert_eq!(json["admin"]["role_name"], "company_admin");
    let permissions: Vec<String> =
        serde_json::from_value(json["admin"]["permissions"].clone()).unwrap();
    assert_eq!(permissions, default_permissions(RoleKind::CompanyAdmin));

    assert_eq!(app.documents(Company::COLLECTION).await.len(), 1);
    assert_eq!(app.documents(Role::COLLECTION).await.len(), 3);
    assert_eq!(app.documents(User::COLLECTION).await.len(), 1);

    app.login_user("admin@acme.io", "Secr3t!", "acme").await;
}

#[tokio::test]
async fn short_password_gets_a_readable_message() {
    let app = TestApp::spawn().await;

    let resp = app
        .fresh_client()
        .post(app.url("/api/companies/register"))
        .json(&serde_json::json!({
            "domain": "acme",
            "email": "ops@acme.io",
            "admin_email": "admin@acme.io",
            "admin_password": "abc",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(
        json["message"],
        "admin_password must be at least 6 characters"
    );
}

#[tokio::test]
async fn duplicate_domain_is_a_conflict() {
    rejects_duplicate_domain(&TestApp::spawn().await).await;
}

pub(crate) async fn rejects_duplicate_domain(app: &TestApp) {
    app.seed_company("acme").await;

    let resp = app
        .fresh_client()
        .post(app.url("/api/companies/register"))
        .json(&registration("ACME", "other@acme.test", "bob@acme.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
    assert_eq!(app.documents(Company::COLLECTION).await.len(), 1);
}

#[tokio::test]
async fn duplicate_company_email_is_a_conflict() {
    rejects_duplicate_company_email(&TestApp::spawn().await).await;
}

pub(crate) async fn rejects_duplicate_company_email(app: &TestApp) {
    app.seed_company("acme").await;

    let resp = app
        .fresh_client()
        .post(app.url("/api/companies/register"))
        .json(&registration("acme-two", "office@acme.test", "bob@acme.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn invalid_domain_is_rejected() {
    let app = TestApp::spawn().await;

    for domain in ["-acme", "acme corp", "a"] {
        let resp = app
            .fresh_client()
            .post(app.url("/api/companies/register"))
            .json(&registration(domain, "office@acme.test", "alice@acme.test"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "{domain:?} should be rejected");
    }
    assert!(app.documents(Company::COLLECTION).await.is_empty());
}

#[tokio::test]
async fn failed_admin_insert_leaves_no_company_behind() {
    let app = TestApp::spawn().await;
    app.memory().fail_inserts(User::COLLECTION);

    let resp = app
        .fresh_client()
        .post(app.url("/api/companies/register"))
        .json(&registration("acme", "office@acme.test", "alice@acme.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 500);
    assert!(app.documents(Company::COLLECTION).await.is_empty());
    assert!(app.documents(Role::COLLECTION).await.is_empty());

    // The same domain registers cleanly once the store recovers.
    app.memory().clear_failures();
    let resp = app
        .fresh_client()
        .post(app.url("/api/companies/register"))
        .json(&registration("acme", "office@acme.test", "alice@acme.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
}
