mod common;

use serde_json::Value;

async fn toggle(app: &common::TestApp, token: &str, prompt_id: i32) -> Value {
    let resp = app
        .client
        .post(app.url(&format!("/prompts/{}/like", prompt_id)))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn double_toggle_restores_state_and_counter() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (_, owner_token) = common::create_test_user(&app, "owner").await;
    let (_, fan_token) = common::create_test_user(&app, "fan").await;
    let (_, prompt_id) = common::create_approved_prompt(&app, &admin_token, &owner_token).await;

    let body = toggle(&app, &fan_token, prompt_id).await;
    assert_eq!(body["data"]["liked"], true);
    assert_eq!(body["data"]["like_count"], 1);
    assert_eq!(body["message"], "Liked");

    let body = toggle(&app, &fan_token, prompt_id).await;
    assert_eq!(body["data"]["liked"], false);
    assert_eq!(body["data"]["like_count"], 0);

    let resp = app
        .client
        .get(app.url(&format!("/prompts/{}/like", prompt_id)))
        .bearer_auth(&fan_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["liked"], false);
    assert_eq!(body["data"]["like_count"], 0);
}

#[tokio::test]
async fn counter_tracks_distinct_users() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (_, owner_token) = common::create_test_user(&app, "owner").await;
    let (_, prompt_id) = common::create_approved_prompt(&app, &admin_token, &owner_token).await;

    let mut fans = Vec::new();
    for _ in 0..3 {
        let (_, token) = common::create_test_user(&app, "fan").await;
        toggle(&app, &token, prompt_id).await;
        fans.push(token);
    }

    let body = toggle(&app, &fans[0], prompt_id).await;
    assert_eq!(body["data"]["like_count"], 2);

    let resp = app
        .client
        .get(app.url(&format!("/prompts/{}", prompt_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["like_count"], 2);
}

#[tokio::test]
async fn concurrent_toggles_keep_counter_consistent() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (_, owner_token) = common::create_test_user(&app, "owner").await;
    let (_, prompt_id) = common::create_approved_prompt(&app, &admin_token, &owner_token).await;

    let mut tokens = Vec::new();
    for _ in 0..5 {
        tokens.push(common::create_test_user(&app, "fan").await.1);
    }

    let mut handles = Vec::new();
    for token in tokens {
        let client = app.client.clone();
        let url = app.url(&format!("/prompts/{}/like", prompt_id));
        handles.push(tokio::spawn(async move {
            client.post(url).bearer_auth(token).send().await.unwrap().status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }

    let resp = app
        .client
        .get(app.url(&format!("/prompts/{}/like", prompt_id)))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["like_count"], 5);
}

#[tokio::test]
async fn liked_prompts_listed_under_me() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (_, owner_token) = common::create_test_user(&app, "owner").await;
    let (_, fan_token) = common::create_test_user(&app, "fan").await;
    let (_, prompt_id) = common::create_approved_prompt(&app, &admin_token, &owner_token).await;

    toggle(&app, &fan_token, prompt_id).await;

    let resp = app
        .client
        .get(app.url("/me/likes"))
        .bearer_auth(&fan_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], prompt_id);
}

#[tokio::test]
async fn like_missing_prompt_not_found() {
    let app = common::spawn_app().await;
    let (_, token) = common::create_test_user(&app, "fan").await;

    let resp = app
        .client
        .post(app.url("/prompts/999999/like"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = app
        .client
        .post(app.url("/prompts/1/like"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}
