use bizchat_db::models::role::permissions::RoleKind;
use bizchat_services::dao::user::NewUser;
use bson::oid::ObjectId;
use serde_json::Value;

use super::test_app::TestApp;

pub const PASSWORD: &str = "Password123!";

/// A company registered through the public endpoint, with its admin logged in.
pub struct SeededCompany {
    pub id: String,
    pub domain: String,
    pub admin: SeededUser,
}

pub struct SeededUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

impl TestApp {
    /// Registers `domain` with an admin `admin@<domain>.test` and logs that admin in.
    pub async fn seed_company(&self, domain: &str) -> SeededCompany {
        let admin_email = format!("admin@{domain}.test");
        let resp = self
            .client
            .post(self.url("/api/companies/register"))
            .json(&serde_json::json!({
                "company_name": format!("{domain} Corp"),
                "domain": domain,
                "email": format!("office@{domain}.test"),
                "admin_name": "Admin",
                "admin_email": admin_email,
                "admin_password": PASSWORD,
            }))
            .send()
            .await
            .expect("Register request failed");

        assert_eq!(
            resp.status().as_u16(),
            201,
            "Register failed: {}",
            resp.text().await.unwrap_or_default()
        );
        let json: Value = resp.json().await.expect("Failed to parse register response");
        let id = json["company"]["id"].as_str().unwrap().to_string();

        let admin = self.login_user(&admin_email, PASSWORD, domain).await;
        SeededCompany {
            id,
            domain: domain.to_string(),
            admin,
        }
    }

    pub async fn try_login(&self, email: &str, password: &str, domain: &str) -> reqwest::Response {
        self.fresh_client()
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "company_domain": domain,
            }))
            .send()
            .await
            .expect("Login request failed")
    }

    pub async fn login_user(&self, email: &str, password: &str, domain: &str) -> SeededUser {
        let resp = self.try_login(email, password, domain).await;
        assert!(
            resp.status().is_success(),
            "Login failed: {}",
            resp.text().await.unwrap_or_default()
        );
        let json: Value = resp.json().await.expect("Failed to parse login response");
        SeededUser {
            id: json["user"]["id"].as_str().unwrap().to_string(),
            email: email.to_string(),
            token: json["token"].as_str().unwrap().to_string(),
        }
    }

    /// Adds a user with the employee role (or `role_id`) and logs them in.
    pub async fn add_user(
        &self,
        company: &SeededCompany,
        email: &str,
        role_id: Option<&str>,
    ) -> SeededUser {
        let mut body = serde_json::json!({
            "email": email,
            "password": PASSWORD,
            "name": "Staff Member",
        });
        if let Some(role_id) = role_id {
            body["role_id"] = serde_json::json!(role_id);
        }
        let resp = self
            .auth_post("/api/admin/users", &company.admin.token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(
            resp.status().as_u16(),
            201,
            "Create user failed: {}",
            resp.text().await.unwrap_or_default()
        );
        self.login_user(email, PASSWORD, &company.domain).await
    }

    /// Looks up a system role id of `company` through the admin API.
    pub async fn role_id(&self, company: &SeededCompany, kind: RoleKind) -> String {
        let roles: Vec<Value> = self
            .auth_get("/api/admin/roles", &company.admin.token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        roles
            .iter()
            .find(|r| r["name"] == kind.name())
            .and_then(|r| r["id"].as_str())
            .unwrap()
            .to_string()
    }

    /// Inserts a platform operator directly, since no endpoint grants that flag.
    pub async fn seed_super_admin(&self) -> SeededUser {
        let platform = self.seed_company("platform").await;
        let company_id = ObjectId::parse_str(&platform.id).unwrap();
        let role = self
            .state
            .roles
            .find_by_name(company_id, RoleKind::CompanyAdmin.name())
            .await
            .unwrap();
        let email = "root@platform.test";
        self.state
            .users
            .create(
                NewUser {
                    company_id,
                    email: email.to_string(),
                    name: "Root".to_string(),
                    password_hash: self.state.auth.hash_password(PASSWORD).unwrap(),
                    username: None,
                    phone: None,
                    department: None,
                    position: None,
                    is_super_admin: true,
                    created_by: None,
                },
                &role,
            )
            .await
            .unwrap();
        self.login_user(email, PASSWORD, "platform").await
    }

    pub fn auth_get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.fresh_client().get(self.url(path)).bearer_auth(token)
    }

    pub fn auth_post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.fresh_client().post(self.url(path)).bearer_auth(token)
    }

    pub fn auth_put(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.fresh_client().put(self.url(path)).bearer_auth(token)
    }

    pub fn auth_delete(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.fresh_client().delete(self.url(path)).bearer_auth(token)
    }
}
