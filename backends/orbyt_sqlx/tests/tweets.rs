mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;
use orbyt::config::CloudinaryConfig;

#[tokio::test]
async fn created_tweet_carries_its_author() {
    let app = TestApp::new().await;
    let alice = app.register_named("alice", "Alice A").await;

    let (status, body) = app
        .post("/api/tweets", Some(&alice), json!({ "text": "  first post  " }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let tweet = &body["tweet"];
    assert_eq!(tweet["text"], "first post");
    assert_eq!(tweet["author"]["username"], "alice");
    assert_eq!(tweet["author"]["fullName"], "Alice A");
    assert_eq!(tweet["likesCount"], 0);
    assert_eq!(tweet["commentsCount"], 0);
    assert_eq!(tweet["parent"], serde_json::Value::Null);

    let id = tweet["id"].as_i64().unwrap();
    let (status, body) = app.get(&format!("/api/tweets/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tweet"]["text"], "first post");
}

#[tokio::test]
async fn text_length_is_enforced() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    let (status, body) = app
        .post("/api/tweets", Some(&alice), json!({ "text": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Text required");

    let (status, body) = app
        .post("/api/tweets", Some(&alice), json!({ "text": "x".repeat(281) }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Tweet must be 1-280 characters");
    assert_eq!(app.tweet_count().await, 0);

    let (status, _) = app
        .post("/api/tweets", Some(&alice), json!({ "text": "x".repeat(280) }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.tweet_count().await, 1);

    let (status, body) = app
        .post("/api/tweets", None, json!({ "text": "anonymous" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token provided");
}

#[tokio::test]
async fn control_characters_count_like_any_other_character() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    let (status, body) = app
        .post("/api/tweets", Some(&alice), json!({ "text": "\u{0}hello" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["tweet"]["text"], "\u{0}hello");

    let text = format!("\u{0}{}", "x".repeat(279));
    let (status, _) = app
        .post("/api/tweets", Some(&alice), json!({ "text": text }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .post("/api/tweets", Some(&alice), json!({ "text": format!("{text}x") }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.tweet_count().await, 2);
}

#[tokio::test]
async fn media_keys_expand_against_the_configured_cloud() {
    let app = TestApp::with_cloudinary(CloudinaryConfig {
        cloud_name: Some("demo".to_string()),
        ..Default::default()
    })
    .await;
    let alice = app.register("alice").await;

    let (status, body) = app
        .post(
            "/api/tweets",
            Some(&alice),
            json!({
                "text": "look",
                "media": ["cat.jpg", "clip.MP4", "https://cdn.example.com/a.png", "  ", 7, null]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["tweet"]["media"],
        json!([
            "https://res.cloudinary.com/demo/image/upload/cat.jpg",
            "https://res.cloudinary.com/demo/video/upload/clip.MP4",
            "https://cdn.example.com/a.png"
        ])
    );
}

#[tokio::test]
async fn media_keys_pass_through_without_a_cloud() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    let (_, body) = app
        .post(
            "/api/tweets",
            Some(&alice),
            json!({ "text": "look", "media": ["cat.jpg"] }),
        )
        .await;
    assert_eq!(body["tweet"]["media"], json!(["cat.jpg"]));
}

#[tokio::test]
async fn feed_is_newest_first_and_excludes_replies() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let first = app.tweet(&alice, "one").await;
    let second = app.tweet(&bob, "two").await;
    let third = app.tweet(&alice, "three").await;
    app.post(
        &format!("/api/tweets/{first}/comments"),
        Some(&bob),
        json!({ "text": "a reply" }),
    )
    .await;

    let (status, body) = app.get("/api/tweets/feed?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body["tweets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tweet| tweet["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, [third, second]);
    assert_eq!(body["total"], 3);
    assert_eq!(body["hasMore"], true);

    let (_, body) = app.get("/api/tweets?limit=2&page=2", None).await;
    assert_eq!(body["tweets"][0]["id"], first);
    assert_eq!(body["tweets"][0]["commentsCount"], 1);
    assert_eq!(body["hasMore"], false);

    let (_, body) = app.get("/api/tweets/feed", None).await;
    assert_eq!(body["limit"], 20);
}

#[tokio::test]
async fn feed_marks_the_viewers_likes() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let liked = app.tweet(&alice, "liked").await;
    app.tweet(&alice, "not liked").await;

    app.post("/api/likes/toggle", Some(&alice), json!({ "tweetId": liked }))
        .await;

    let (_, body) = app.get("/api/tweets/feed", Some(&alice)).await;
    let tweets = body["tweets"].as_array().unwrap();
    assert_eq!(tweets[0]["likedByCurrentUser"], false);
    assert_eq!(tweets[1]["likedByCurrentUser"], true);
    assert_eq!(tweets[1]["likesCount"], 1);
}

#[tokio::test]
async fn by_user_lists_only_that_authors_posts() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    app.tweet(&alice, "mine").await;
    app.tweet(&bob, "theirs").await;

    let (status, body) = app.get("/api/tweets/user/ALICE", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tweets"].as_array().unwrap().len(), 1);
    assert_eq!(body["tweets"][0]["text"], "mine");
    assert_eq!(body["limit"], 10);

    let (status, body) = app.get("/api/tweets/user/nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn comments_update_the_parent_and_list_newest_first() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let parent = app.tweet(&alice, "parent").await;

    for text in ["first", "second"] {
        let (status, body) = app
            .post(
                &format!("/api/tweets/{parent}/comments"),
                Some(&bob),
                json!({ "text": text }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["tweet"]["parent"], parent);
    }

    // replies through POST /tweets count too
    let (status, _) = app
        .post(
            "/api/tweets",
            Some(&alice),
            json!({ "text": "third", "parent": parent.to_string() }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get(&format!("/api/tweets/{parent}"), None).await;
    assert_eq!(body["tweet"]["commentsCount"], 3);

    let (status, body) = app
        .get(&format!("/api/tweets/{parent}/comments"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let texts: Vec<_> = body["comments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, ["third", "second", "first"]);
}

#[tokio::test]
async fn comment_validation_and_missing_parents() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let parent = app.tweet(&alice, "parent").await;

    let (status, body) = app
        .post(
            &format!("/api/tweets/{parent}/comments"),
            Some(&alice),
            json!({ "text": "y".repeat(281) }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Comment must be 1-280 characters");

    let (status, body) = app
        .post("/api/tweets/9999/comments", Some(&alice), json!({ "text": "hi" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Tweet not found");

    let (status, _) = app
        .post(
            "/api/tweets",
            Some(&alice),
            json!({ "text": "orphan", "parent": 9999 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/tweets/9999/comments", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_and_unknown_ids() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/tweets/not-an-id", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid tweetId");

    let (status, body) = app.get("/api/tweets/4242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Tweet not found");
}

#[tokio::test]
async fn non_integer_counters_read_as_zero() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let tweet = app.tweet(&alice, "hello").await;

    sqlx::query("UPDATE tweets SET likes_count = 'junk', comments_count = 1.5 WHERE id = ?")
        .bind(tweet)
        .execute(&app.pool)
        .await
        .unwrap();

    let (status, body) = app.get(&format!("/api/tweets/{tweet}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tweet"]["likesCount"], 0);
    assert_eq!(body["tweet"]["commentsCount"], 0);
}
