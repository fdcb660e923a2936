use crate::fixtures::test_app::TestApp;
use base64::Engine;
use serde_json::Value;

async fn create_chat(app: &TestApp, token: &str) -> String {
    let resp = app
        .auth_post("/api/chats", token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let chat: Value = resp.json().await.unwrap();
    assert_eq!(chat["title"], "New Chat");
    chat["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn first_message_titles_the_chat_and_gets_a_reply() {
    let app = TestApp::spawn().await;
    let acme = app.seed_company("acme").await;
    let bob = app.add_user(&acme, "bob@acme.test", None).await;
    let chat_id = create_chat(&app, &bob.token).await;

    let resp = app
        .auth_post(&format!("/api/chats/{chat_id}/messages"), &bob.token)
        .json(&serde_json::json!({ "content": "Summarise our Q3 sales pipeline" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let exchange: Value = resp.json().await.unwrap();
    assert_eq!(exchange["user_message"]["role"], "user");
    assert_eq!(exchange["assistant_message"]["role"], "assistant");
    assert_eq!(
        exchange["assistant_message"]["content"],
        "reply #1 to: Summarise our Q3 sales pipeline"
    );
    assert_eq!(exchange["assistant_message"]["model_used"], "scripted-model");

    let detail: Value = app
        .auth_get(&format!("/api/chats/{chat_id}"), &bob.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["chat"]["title"], "Summarise our Q3 sales pipeline");
    assert_eq!(detail["messages"].as_array().unwrap().len(), 2);

    // Later messages see the history and leave the title alone.
    let exchange: Value = app
        .auth_post(&format!("/api/chats/{chat_id}/messages"), &bob.token)
        .json(&serde_json::json!({ "content": "And Q4?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(exchange["assistant_message"]["content"], "reply #2 to: And Q4?");

    let messages: Vec<Value> = app
        .auth_get(&format!("/api/chats/{chat_id}/messages"), &bob.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(messages.len(), 4);

    let chats: Vec<Value> = app
        .auth_get("/api/chats", &bob.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0]["title"], "Summarise our Q3 sales pipeline");
}

#[tokio::test]
async fn colleagues_cannot_read_each_others_chats() {
    let app = TestApp::spawn().await;
    let acme = app.seed_company("acme").await;
    let bob = app.add_user(&acme, "bob@acme.test", None).await;
    let carol = app.add_user(&acme, "carol@acme.test", None).await;
    let chat_id = create_chat(&app, &bob.token).await;

    let resp = app
        .auth_get(&format!("/api/chats/{chat_id}"), &carol.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .auth_delete(&format!("/api/chats/{chat_id}"), &carol.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn rename_cleanup_and_delete() {
    let app = TestApp::spawn().await;
    let acme = app.seed_company("acme").await;
    let token = acme.admin.token.clone();

    let empty = create_chat(&app, &token).await;
    let resp = app
        .auth_put(&format!("/api/chats/{empty}"), &token)
        .json(&serde_json::json!({ "title": "Scratchpad" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let chat: Value = resp.json().await.unwrap();
    assert_eq!(chat["title"], "Scratchpad");

    let cleaned: Value = app
        .auth_post(&format!("/api/chats/{empty}/cleanup"), &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleaned["deleted"], true);

    let busy = create_chat(&app, &token).await;
    let exchange: Value = app
        .auth_post(&format!("/api/chats/{busy}/messages"), &token)
        .json(&serde_json::json!({ "content": "hello" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let cleaned: Value = app
        .auth_post(&format!("/api/chats/{busy}/cleanup"), &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleaned["deleted"], false);

    let reply_id = exchange["assistant_message"]["id"].as_str().unwrap();
    let resp = app
        .auth_delete(&format!("/api/chats/{busy}/messages/{reply_id}"), &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let deleted: Value = app
        .auth_delete(&format!("/api/chats/{busy}"), &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(deleted["messages_deleted"], 1);

    let chats: Vec<Value> = app
        .auth_get("/api/chats", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(chats.is_empty());
}

#[tokio::test]
async fn documents_are_checked_against_company_policy() {
    let app = TestApp::spawn().await;
    let acme = app.seed_company("acme").await;
    let token = acme.admin.token.clone();
    let chat_id = create_chat(&app, &token).await;
    let path = format!("/api/chats/{chat_id}/documents");
    let encode = |bytes: &[u8]| base64::engine::general_purpose::STANDARD.encode(bytes);

    let resp = app
        .auth_post(&path, &token)
        .json(&serde_json::json!({
            "filename": "invoice.pdf",
            "mime_type": "application/pdf",
            "content_base64": encode(b"%PDF-1.4 fake"),
            "prompt": "Total?",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let exchange: Value = resp.json().await.unwrap();
    assert_eq!(exchange["user_message"]["attachments"][0]["filename"], "invoice.pdf");
    assert_eq!(exchange["user_message"]["attachments"][0]["size"], 13);
    assert_eq!(
        exchange["assistant_message"]["content"],
        "Total? [application/pdf, 13 bytes]"
    );

    let resp = app
        .auth_post(&path, &token)
        .json(&serde_json::json!({
            "filename": "archive.zip",
            "mime_type": "application/zip",
            "content_base64": encode(b"PK"),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_post(&path, &token)
        .json(&serde_json::json!({
            "filename": "bad.pdf",
            "mime_type": "application/pdf",
            "content_base64": "***",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let mut settings: Value = app
        .auth_get("/api/admin/settings", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    settings["enable_document_upload"] = Value::Bool(false);
    let resp = app
        .auth_put("/api/admin/settings", &token)
        .json(&settings)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_post(&path, &token)
        .json(&serde_json::json!({
            "filename": "invoice.pdf",
            "mime_type": "application/pdf",
            "content_base64": encode(b"%PDF-1.4 fake"),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn company_limits_apply_to_chats_and_messages() {
    let app = TestApp::spawn().await;
    let acme = app.seed_company("acme").await;
    let token = acme.admin.token.clone();

    let resp = app
        .auth_put("/api/admin/settings", &token)
        .json(&serde_json::json!({
            "max_chats_per_user": 1,
            "max_messages_per_chat": 2,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let settings: Value = resp.json().await.unwrap();
    assert_eq!(settings["max_chats_per_user"], 1);
    assert_eq!(settings["enable_document_upload"], true);

    let chat_id = create_chat(&app, &token).await;
    let resp = app.auth_post("/api/chats", &token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_post(&format!("/api/chats/{chat_id}/messages"), &token)
        .json(&serde_json::json!({ "content": "one" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    // The exchange filled both slots.
    let resp = app
        .auth_post(&format!("/api/chats/{chat_id}/messages"), &token)
        .json(&serde_json::json!({ "content": "two" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_put("/api/admin/settings", &token)
        .json(&serde_json::json!({ "max_chats_per_user": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}
