mod common;

use reqwest::Method;
use serde_json::{json, Value};

fn admin_routes() -> Vec<(Method, &'static str, Option<Value>)> {
    vec![
        (Method::GET, "/admin/stats", None),
        (Method::GET, "/admin/prompts", None),
        (Method::DELETE, "/admin/prompts", Some(json!({ "ids": [1] }))),
        (Method::GET, "/admin/prompts/pending-count", None),
        (
            Method::PUT,
            "/admin/prompts/review",
            Some(json!({ "ids": [1], "status": "approved" })),
        ),
        (Method::DELETE, "/admin/prompts/1", None),
        (
            Method::PUT,
            "/admin/prompts/1/review",
            Some(json!({ "status": "approved" })),
        ),
        (Method::GET, "/admin/comments", None),
        (Method::DELETE, "/admin/comments/1", None),
        (
            Method::PUT,
            "/admin/comments/1/status",
            Some(json!({ "status": "normal" })),
        ),
        (Method::GET, "/admin/users", None),
        (
            Method::POST,
            "/admin/users",
            Some(json!({
                "username": "nobody_here",
                "email": "nobody@example.com",
                "password": "password_123"
            })),
        ),
        (Method::DELETE, "/admin/users/1", None),
        (
            Method::PUT,
            "/admin/users/1/role",
            Some(json!({ "role": "admin" })),
        ),
        (
            Method::PUT,
            "/admin/users/1/permissions",
            Some(json!({ "permissions": {} })),
        ),
        (
            Method::POST,
            "/admin/categories",
            Some(json!({ "name": "X", "slug": "x" })),
        ),
        (
            Method::PUT,
            "/admin/categories/1",
            Some(json!({ "name": "X", "slug": "x" })),
        ),
        (Method::DELETE, "/admin/categories/1", None),
        (Method::GET, "/admin/logs", None),
    ]
}

#[tokio::test]
async fn every_admin_route_guarded() {
    let app = common::spawn_app().await;
    let (_, token) = common::create_test_user(&app, "plain").await;

    for (method, path, body) in admin_routes() {
        let mut anonymous = app.client.request(method.clone(), app.url(path));
        let mut signed_in = app
            .client
            .request(method.clone(), app.url(path))
            .bearer_auth(&token);
        if let Some(body) = &body {
            anonymous = anonymous.json(body);
            signed_in = signed_in.json(body);
        }

        let resp = anonymous.send().await.unwrap();
        assert_eq!(resp.status(), 401, "{} {} without token", method, path);

        let resp = signed_in.send().await.unwrap();
        assert_eq!(resp.status(), 403, "{} {} as plain user", method, path);
    }
}

#[tokio::test]
async fn stats_reflect_moderation_queue() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (_, token) = common::create_test_user(&app, "author").await;
    let (category_id, _) = common::create_test_category(&app, &admin_token).await;
    common::create_test_prompt(&app, &token, category_id).await;

    let resp = app
        .client
        .get(app.url("/admin/stats"))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let data = &body["data"];
    assert!(data["pending_prompts"].as_u64().unwrap() >= 1);
    assert!(data["total_users"].as_u64().unwrap() >= 2);
    assert!(data["prompts_today"].as_u64().unwrap() >= 1);
    assert!(data["top_prompts"].is_array());

    let resp = app
        .client
        .get(app.url("/admin/prompts/pending-count"))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["count"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn admin_lists_prompts_in_every_status() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (author_id, token) = common::create_test_user(&app, "author").await;
    let (category_id, _) = common::create_test_category(&app, &admin_token).await;
    let pending = common::create_test_prompt(&app, &token, category_id).await;
    let rejected = common::create_test_prompt(&app, &token, category_id).await;
    common::review_prompt(&app, &admin_token, rejected, "rejected", Some("no")).await;

    let resp = app
        .client
        .get(app.url(&format!(
            "/admin/prompts?status=pending&category_id={}",
            category_id
        )))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let ids: Vec<i64> = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![pending as i64]);
    assert_eq!(body["data"]["items"][0]["user_id"], author_id);

    let resp = app
        .client
        .get(app.url("/admin/prompts?status=bogus"))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn batch_delete_removes_prompts() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (_, token) = common::create_test_user(&app, "author").await;
    let (category_id, _) = common::create_test_category(&app, &admin_token).await;
    let a = common::create_test_prompt(&app, &token, category_id).await;
    let b = common::create_test_prompt(&app, &token, category_id).await;

    let resp = app
        .client
        .delete(app.url("/admin/prompts"))
        .bearer_auth(&admin_token)
        .json(&json!({ "ids": [a, b] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["deleted"], 2);

    let resp = app
        .client
        .delete(app.url("/admin/prompts"))
        .bearer_auth(&admin_token)
        .json(&json!({ "ids": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn category_lifecycle() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (_, token) = common::create_test_user(&app, "author").await;
    let (category_id, slug) = common::create_test_category(&app, &admin_token).await;

    // Duplicate slug
    let resp = app
        .client
        .post(app.url("/admin/categories"))
        .bearer_auth(&admin_token)
        .json(&json!({ "name": format!("Other {}", slug), "slug": slug }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Invalid slug
    let resp = app
        .client
        .post(app.url("/admin/categories"))
        .bearer_auth(&admin_token)
        .json(&json!({ "name": "Bad slug", "slug": "Bad Slug!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let prompt_id = common::create_test_prompt(&app, &token, category_id).await;
    common::review_prompt(&app, &admin_token, prompt_id, "approved", None).await;

    let resp = app
        .client
        .get(app.url(&format!("/categories/{}", slug)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["prompt_count"], 1);

    // In use
    let resp = app
        .client
        .delete(app.url(&format!("/admin/categories/{}", category_id)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = app
        .client
        .delete(app.url(&format!("/me/prompts/{}", prompt_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .delete(app.url(&format!("/admin/categories/{}", category_id)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url(&format!("/categories/{}", slug)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn user_management_rules() {
    let app = common::spawn_app().await;
    let (admin_id, admin_token) = common::create_test_admin(&app).await;
    let (user_id, user_token) = common::create_test_user(&app, "member").await;

    // No self role change or self delete.
    let resp = app
        .client
        .put(app.url(&format!("/admin/users/{}/role", admin_id)))
        .bearer_auth(&admin_token)
        .json(&json!({ "role": "user" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = app
        .client
        .delete(app.url(&format!("/admin/users/{}", admin_id)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Promote, then the new admin reaches the back-office.
    let resp = app
        .client
        .put(app.url(&format!("/admin/users/{}/role", user_id)))
        .bearer_auth(&admin_token)
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["role"], "admin");

    let resp = app
        .client
        .get(app.url("/admin/stats"))
        .bearer_auth(&user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn granted_permission_opens_single_route() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (user_id, user_token) = common::create_test_user(&app, "viewer").await;

    let resp = app
        .client
        .put(app.url(&format!("/admin/users/{}/permissions", user_id)))
        .bearer_auth(&admin_token)
        .json(&json!({ "permissions": { "users": { "view": true } } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["permissions"]["users"]["view"], true);
    assert_eq!(body["data"]["permissions"]["users"]["delete"], false);

    let resp = app
        .client
        .get(app.url("/admin/users"))
        .bearer_auth(&user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url("/admin/logs"))
        .bearer_auth(&user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Non-admins cannot edit permissions even with users.view.
    let resp = app
        .client
        .put(app.url(&format!("/admin/users/{}/permissions", user_id)))
        .bearer_auth(&user_token)
        .json(&json!({ "permissions": { "system": { "logs": true } } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn user_creator_cannot_mint_admins() {
    let app = common::spawn_app().await;
    let (creator_id, creator_token) = common::create_test_user(&app, "creator").await;
    common::set_permissions(&app.db, creator_id, json!({ "users": { "create": true } })).await;
    let n = common::next_id();

    let resp = app
        .client
        .post(app.url("/admin/users"))
        .bearer_auth(&creator_token)
        .json(&json!({
            "username": format!("minted_{}", n),
            "email": format!("minted_{}@example.com", n),
            "password": "password_123",
            "role": "admin"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .post(app.url("/admin/users"))
        .bearer_auth(&creator_token)
        .json(&json!({
            "username": format!("minted_{}", n),
            "email": format!("minted_{}@example.com", n),
            "password": "password_123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["role"], "user");
}

#[tokio::test]
async fn deleting_user_releases_their_likes() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let (_, owner_token) = common::create_test_user(&app, "owner").await;
    let (fan_id, fan_token) = common::create_test_user(&app, "fan").await;
    let (_, prompt_id) = common::create_approved_prompt(&app, &admin_token, &owner_token).await;

    let resp = app
        .client
        .post(app.url(&format!("/prompts/{}/like", prompt_id)))
        .bearer_auth(&fan_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["like_count"], 1);

    let resp = app
        .client
        .delete(app.url(&format!("/admin/users/{}", fan_id)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url(&format!("/prompts/{}", prompt_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["like_count"], 0);

    // A fresh like starts from zero again.
    let (_, other_token) = common::create_test_user(&app, "fan").await;
    let resp = app
        .client
        .post(app.url(&format!("/prompts/{}/like", prompt_id)))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["like_count"], 1);
}

#[tokio::test]
async fn user_deleter_cannot_remove_admins() {
    let app = common::spawn_app().await;
    let (target_admin_id, _) = common::create_test_admin(&app).await;
    let (deleter_id, deleter_token) = common::create_test_user(&app, "deleter").await;
    let (member_id, _) = common::create_test_user(&app, "member").await;
    common::set_permissions(&app.db, deleter_id, json!({ "users": { "delete": true } })).await;

    let resp = app
        .client
        .delete(app.url(&format!("/admin/users/{}", target_admin_id)))
        .bearer_auth(&deleter_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .delete(app.url(&format!("/admin/users/{}", member_id)))
        .bearer_auth(&deleter_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // The admin account is still there.
    let (_, admin_token) = common::create_test_admin(&app).await;
    let resp = app
        .client
        .delete(app.url(&format!("/admin/users/{}", target_admin_id)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn user_search_treats_underscore_literally() {
    let app = common::spawn_app().await;
    let (_, admin_token) = common::create_test_admin(&app).await;
    let n = common::next_id();
    common::create_test_user(&app, &format!("lit{}_x", n)).await;
    common::create_test_user(&app, &format!("lit{}yx", n)).await;

    let resp = app
        .client
        .get(app.url(&format!("/admin/users?q=lit{}_x", n)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert!(items[0]["username"]
        .as_str()
        .unwrap()
        .starts_with(&format!("lit{}_x_", n)));
}
