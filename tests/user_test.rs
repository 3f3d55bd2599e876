mod common;

use serde_json::Value;

#[tokio::test]
async fn public_profile_counts_only_approved_prompts() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (user_id, token) = common::create_test_user(&app, "creator").await;
    let (category_id, _) = common::create_test_category(&app, &admin_token).await;
    let approved = common::create_test_prompt(&app, &token, category_id).await;
    common::create_test_prompt(&app, &token, category_id).await;
    common::review_prompt(&app, &admin_token, approved, "approved", None).await;

    let resp = app
        .client
        .get(app.url(&format!("/users/{}", user_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["prompt_count"], 1);
    assert!(body["data"].get("email").is_none());
    assert!(body["data"].get("permissions").is_none());

    let resp = app
        .client
        .get(app.url(&format!("/users/{}/prompts", user_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], approved);
}

#[tokio::test]
async fn missing_user_not_found() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/users/999999"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = app
        .client
        .get(app.url("/users/999999/prompts"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn pagination_is_clamped() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/prompts?page=0&per_page=1000"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["per_page"], 100);
}
