mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn follow_updates_both_counters_once() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    app.register("bob").await;

    let (status, body) = app.follow(&alice, "bob").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "isFollowing": true, "followersCount": 1 }));

    // a repeated follow is a no-op
    let (status, body) = app.follow(&alice, "bob").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["followersCount"], 1);

    assert_eq!(app.profile("bob").await["followersCount"], 1);
    assert_eq!(app.profile("alice").await["followingCount"], 1);
}

#[tokio::test]
async fn repeated_unfollow_never_goes_negative() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    app.register("bob").await;

    app.follow(&alice, "bob").await;
    for _ in 0..2 {
        let (status, body) = app.unfollow(&alice, "bob").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "isFollowing": false, "followersCount": 0 }));
    }

    assert_eq!(app.profile("bob").await["followersCount"], 0);
    assert_eq!(app.profile("alice").await["followingCount"], 0);
}

#[tokio::test]
async fn concurrent_follows_count_one_edge() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    app.register("bob").await;

    let (a, b, c) = tokio::join!(
        app.follow(&alice, "bob"),
        app.follow(&alice, "bob"),
        app.follow(&alice, "bob"),
    );
    for (status, _) in [a, b, c] {
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(app.profile("bob").await["followersCount"], 1);
    assert_eq!(app.profile("alice").await["followingCount"], 1);
}

#[tokio::test]
async fn counters_are_recomputed_from_edges() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    app.register("bob").await;

    sqlx::query("UPDATE users SET followers_count = 41 WHERE username = 'bob'")
        .execute(&app.pool)
        .await
        .unwrap();

    let (_, body) = app.follow(&alice, "bob").await;
    assert_eq!(body["followersCount"], 1);
}

#[tokio::test]
async fn handles_resolve_case_insensitively() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    app.register("bob").await;

    let (status, _) = app.follow(&alice, "  BoB ").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .get("/api/follows/status?targetUsername=BOB", Some(&alice))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "isFollowing": true }));
}

#[tokio::test]
async fn self_follow_is_rejected() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    let (status, body) = app.follow(&alice, "alice").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot follow yourself");

    let (status, body) = app.unfollow(&alice, "ALICE").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot unfollow yourself");

    assert_eq!(app.profile("alice").await["followersCount"], 0);
}

#[tokio::test]
async fn bad_targets_are_reported() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    let (status, body) = app.follow(&alice, "nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");

    let (status, body) = app
        .post("/api/follows/follow", Some(&alice), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "targetUsername required");

    let (status, body) = app.get("/api/follows/status", Some(&alice)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "targetUsername required");
}

#[tokio::test]
async fn follow_requires_a_token() {
    let app = TestApp::new().await;
    app.register("bob").await;

    let (status, body) = app
        .post("/api/follows/follow", None, json!({ "targetUsername": "bob" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token provided");
}

#[tokio::test]
async fn follower_lists_sort_accented_names_in_place() {
    let app = TestApp::new().await;
    app.register_named("alice", "Alice").await;
    let mut tokens = Vec::new();
    for (handle, name) in [
        ("zoe", "Zoe"),
        ("emile", "Émile"),
        ("nandu", "Ñandú"),
        ("alvaro", "álvaro"),
        ("nadia", "Nadia"),
    ] {
        tokens.push(app.register_named(handle, name).await);
    }
    for token in &tokens {
        app.follow(token, "alice").await;
    }

    let (status, body) = app
        .get("/api/users/alice/followers", Some(&tokens[0]))
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["fullName"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["álvaro", "Émile", "Nadia", "Ñandú", "Zoe"]);
}

#[tokio::test]
async fn follower_lists_are_sorted_paged_and_annotated() {
    let app = TestApp::new().await;
    let alice = app.register_named("alice", "Alice").await;
    let bob = app.register_named("bob", "bob Builder").await;
    let carol = app.register_named("carol", "Carol").await;
    let dave = app.register_named("dave", "Dave").await;

    for token in [&dave, &carol, &bob] {
        app.follow(token, "alice").await;
    }
    app.follow(&alice, "carol").await;

    let (status, body) = app
        .get("/api/users/alice/followers?limit=2", Some(&alice))
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["fullName"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["bob Builder", "Carol"]);
    assert_eq!(body["results"][0]["isFollowing"], false);
    assert_eq!(body["results"][1]["isFollowing"], true);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["total"], 3);
    assert_eq!(body["hasMore"], true);

    let (_, body) = app
        .get("/api/users/alice/followers?limit=2&page=2", Some(&alice))
        .await;
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["results"][0]["username"], "dave");
    assert_eq!(body["hasMore"], false);
}

#[tokio::test]
async fn junk_pagination_falls_back_to_defaults() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    let (status, body) = app
        .get("/api/users/alice/following?page=abc&limit=-4", Some(&alice))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["total"], 0);
    assert_eq!(body["hasMore"], false);

    let (_, body) = app
        .get("/api/users/alice/following?limit=500", Some(&alice))
        .await;
    assert_eq!(body["limit"], 50);
}

#[tokio::test]
async fn query_aliases_list_the_same_edges() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    app.register("bob").await;
    app.follow(&alice, "bob").await;

    let (status, body) = app
        .get("/api/follows/following?username=alice", Some(&alice))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["username"], "bob");
    assert_eq!(body["results"][0]["isFollowing"], true);

    let (_, body) = app
        .get("/api/follows/followers?username=bob", Some(&alice))
        .await;
    assert_eq!(body["results"][0]["username"], "alice");

    let (status, _) = app
        .get("/api/users/nobody/followers", Some(&alice))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
