mod common;

use serde_json::{json, Value};

async fn post_comment(
    app: &common::TestApp,
    token: &str,
    prompt_id: i32,
    content: &str,
) -> reqwest::Response {
    app.client
        .post(app.url("/comments"))
        .bearer_auth(token)
        .json(&json!({ "prompt_id": prompt_id, "content": content }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn comment_create_and_list_oldest_first() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (_, owner_token) = common::create_test_user(&app, "owner").await;
    let (commenter_id, token) = common::create_test_user(&app, "commenter").await;
    let (_, prompt_id) = common::create_approved_prompt(&app, &admin_token, &owner_token).await;

    let resp = post_comment(&app, &token, prompt_id, "First! **bold**").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user_id"], commenter_id);
    assert_eq!(body["data"]["status"], "normal");
    assert!(body["data"]["content_html"]
        .as_str()
        .unwrap()
        .contains("<strong>bold</strong>"));

    post_comment(&app, &owner_token, prompt_id, "Second").await;

    let resp = app
        .client
        .get(app.url(&format!("/prompts/{}/comments", prompt_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["content"], "First! **bold**");
    assert_eq!(items[1]["content"], "Second");
}

#[tokio::test]
async fn empty_comment_rejected() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (_, token) = common::create_test_user(&app, "commenter").await;
    let (_, prompt_id) = common::create_approved_prompt(&app, &admin_token, &token).await;

    let resp = post_comment(&app, &token, prompt_id, "").await;
    assert_eq!(resp.status(), 400);

    let resp = post_comment(&app, &token, prompt_id, "   \n\t ").await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn cannot_comment_on_pending_prompt() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (_, token) = common::create_test_user(&app, "commenter").await;
    let (category_id, _) = common::create_test_category(&app, &admin_token).await;
    let prompt_id = common::create_test_prompt(&app, &token, category_id).await;

    let resp = post_comment(&app, &token, prompt_id, "Hello").await;
    assert_eq!(resp.status(), 404);

    let resp = app
        .client
        .get(app.url(&format!("/prompts/{}/comments", prompt_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn only_author_or_moderator_deletes() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (_, author_token) = common::create_test_user(&app, "author").await;
    let (_, other_token) = common::create_test_user(&app, "other").await;
    let (_, prompt_id) = common::create_approved_prompt(&app, &admin_token, &author_token).await;

    let body: Value = post_comment(&app, &author_token, prompt_id, "Mine")
        .await
        .json()
        .await
        .unwrap();
    let first = body["data"]["id"].as_i64().unwrap();
    let body: Value = post_comment(&app, &author_token, prompt_id, "Also mine")
        .await
        .json()
        .await
        .unwrap();
    let second = body["data"]["id"].as_i64().unwrap();

    let resp = app
        .client
        .delete(app.url(&format!("/comments/{}", first)))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .delete(app.url(&format!("/comments/{}", first)))
        .bearer_auth(&author_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Admin removes someone else's comment.
    let resp = app
        .client
        .delete(app.url(&format!("/comments/{}", second)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url(&format!("/prompts/{}/comments", prompt_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn report_flags_comment_for_moderation() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (_, author_token) = common::create_test_user(&app, "author").await;
    let (_, reporter_token) = common::create_test_user(&app, "reporter").await;
    let (_, prompt_id) = common::create_approved_prompt(&app, &admin_token, &author_token).await;

    let body: Value = post_comment(&app, &author_token, prompt_id, "Rude words")
        .await
        .json()
        .await
        .unwrap();
    let comment_id = body["data"]["id"].as_i64().unwrap();

    for _ in 0..2 {
        let resp = app
            .client
            .post(app.url(&format!("/comments/{}/report", comment_id)))
            .bearer_auth(&reporter_token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["status"], "reported");
        assert_eq!(body["data"]["status_label"], "被举报");
    }

    let resp = app
        .client
        .get(app.url(&format!(
            "/admin/comments?status=reported&prompt_id={}",
            prompt_id
        )))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 1);

    // Restore to normal.
    let resp = app
        .client
        .put(app.url(&format!("/admin/comments/{}/status", comment_id)))
        .bearer_auth(&admin_token)
        .json(&json!({ "status": "正常" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "normal");

    let resp = app
        .client
        .put(app.url(&format!("/admin/comments/{}/status", comment_id)))
        .bearer_auth(&admin_token)
        .json(&json!({ "status": "hidden" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
