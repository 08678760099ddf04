//! HTTP surface tests against in-memory repositories.
//!
//! These exercise the full router: filter validation, pagination metadata,
//! interaction annotation, premium gating, CSRF, rate limiting, admin
//! authorization, and write-through cache invalidation.

mod support;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use vetrina::domain::types::{AccountTier, UserRole};

use support::{Harness, build_harness};

const HIGH_RATE_LIMIT: u32 = 10_000;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collected")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

async fn get(harness: &Harness, uri: &str) -> axum::response::Response {
    harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response")
}

async fn get_as(harness: &Harness, uri: &str, subject: &str) -> axum::response::Response {
    harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("x-vetrina-user", subject)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response")
}

/// Fetch a CSRF token; returns (cookie_pair, token).
async fn csrf_pair(harness: &Harness) -> (String, String) {
    let response = get(harness, "/api/csrf").await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie")
        .to_str()
        .expect("cookie str")
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string();

    let body = body_json(response).await;
    let token = body["token"].as_str().expect("token").to_string();
    (cookie, token)
}

/// Seed the two-post scenario: Post A "Sunset Painting" (art, free,
/// 10 views, newer) and Post B "Sunset Code" (tech, premium, 50 views,
/// older).
fn seed_two_posts(harness: &Harness) -> (Uuid, Uuid) {
    let author = harness
        .repo
        .add_user("author", UserRole::Admin, AccountTier::Premium);
    let art = harness.repo.add_category("art", None);
    let tech = harness.repo.add_category("tech", None);

    let older = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("timestamp");
    let newer = OffsetDateTime::from_unix_timestamp(1_700_100_000).expect("timestamp");

    let a = harness.repo.add_post(
        "sunset-painting",
        "Sunset Painting",
        art.id,
        author.id,
        false,
        10,
        newer,
        &[],
    );
    let b = harness.repo.add_post(
        "sunset-code",
        "Sunset Code",
        tech.id,
        author.id,
        true,
        50,
        older,
        &[],
    );
    (a.id, b.id)
}

#[tokio::test]
async fn non_get_on_posts_route_returns_405_with_allow() {
    let harness = build_harness(HIGH_RATE_LIMIT);

    let response = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/posts")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let allow = response
        .headers()
        .get(header::ALLOW)
        .expect("allow header")
        .to_str()
        .expect("allow str");
    assert!(allow.contains("GET"), "Allow header was {allow}");
}

#[tokio::test]
async fn malformed_category_slug_reports_field_error() {
    let harness = build_harness(HIGH_RATE_LIMIT);

    let response = get(&harness, "/api/posts?category=Not%20A%20Slug").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "validation_failed");
    assert_eq!(body["error"]["fields"][0]["field"], "category");
}

#[tokio::test]
async fn unknown_premium_value_is_ignored() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    seed_two_posts(&harness);

    let response = get(&harness, "/api/posts?premium=gold").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["posts"].as_array().expect("posts").len(), 2);
}

#[tokio::test]
async fn search_with_premium_filter_returns_only_the_free_match() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    seed_two_posts(&harness);

    let response = get(&harness, "/api/posts?q=sunset&premium=free").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let posts = body["posts"].as_array().expect("posts");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], "Sunset Painting");
}

#[tokio::test]
async fn tag_only_search_term_returns_exactly_that_post() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    seed_two_posts(&harness);

    // "impasto" appears in one post's tag name and nowhere else.
    let author = harness
        .repo
        .add_user("tagger", UserRole::User, AccountTier::Free);
    let art = harness.repo.find_category("art").expect("art category");
    let tag = harness.repo.add_tag("impasto", "Impasto");
    let when = OffsetDateTime::from_unix_timestamp(1_700_060_000).expect("timestamp");
    harness.repo.add_post(
        "thick-paint",
        "Thick Paint",
        art,
        author.id,
        false,
        1,
        when,
        &[tag.id],
    );

    let response = get(&harness, "/api/posts?q=impasto").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let posts = body["posts"].as_array().expect("posts");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["slug"], "thick-paint");
}

#[tokio::test]
async fn parent_category_filter_includes_children() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    let (a_id, _) = seed_two_posts(&harness);

    let art = harness
        .repo
        .find_category("art")
        .expect("art category seeded");
    let painting = harness.repo.add_category("painting", Some(art));
    let author = harness
        .repo
        .add_user("painter", UserRole::User, AccountTier::Free);
    let when = OffsetDateTime::from_unix_timestamp(1_700_050_000).expect("timestamp");
    harness.repo.add_post(
        "brush-basics",
        "Brush Basics",
        painting.id,
        author.id,
        false,
        3,
        when,
        &[],
    );

    let response = get(&harness, "/api/posts?category=art").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let posts = body["posts"].as_array().expect("posts");
    let slugs: Vec<&str> = posts
        .iter()
        .map(|post| post["slug"].as_str().expect("slug"))
        .collect();
    assert_eq!(posts.len(), 2);
    assert!(slugs.contains(&"sunset-painting"));
    assert!(slugs.contains(&"brush-basics"));
    assert!(posts.iter().any(|post| post["id"] == a_id.to_string()));
}

#[tokio::test]
async fn second_page_of_two_posts_is_the_older_one() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    seed_two_posts(&harness);

    let response = get(&harness, "/api/posts?page=2&limit=1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let posts = body["posts"].as_array().expect("posts");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], "Sunset Code");

    let pagination = &body["pagination"];
    assert_eq!(pagination["totalCount"], 2);
    assert_eq!(pagination["totalPages"], 2);
    assert_eq!(pagination["currentPage"], 2);
    assert_eq!(pagination["hasNextPage"], false);
    assert_eq!(pagination["hasPreviousPage"], true);
}

#[tokio::test]
async fn out_of_range_page_is_empty_with_correct_metadata() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    seed_two_posts(&harness);

    let response = get(&harness, "/api/posts?page=9&limit=12").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["posts"].as_array().expect("posts").len(), 0);
    assert_eq!(body["pagination"]["totalPages"], 1);
    assert_eq!(body["pagination"]["hasNextPage"], false);
    assert_eq!(body["pagination"]["hasPreviousPage"], true);
}

#[tokio::test]
async fn anonymous_listing_runs_no_interaction_probe() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    let (a_id, _) = seed_two_posts(&harness);

    // Global bookmark state exists, but anonymous responses must not
    // reflect it or pay for the join.
    let someone = harness
        .repo
        .add_user("someone", UserRole::User, AccountTier::Free);
    harness.repo.seed_bookmark(someone.id, a_id);

    let response = get(&harness, "/api/posts").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    for post in body["posts"].as_array().expect("posts") {
        assert_eq!(post["isBookmarked"], false);
        assert_eq!(post["isFavorited"], false);
    }
    assert_eq!(
        harness
            .repo
            .flag_probes
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn authenticated_listing_carries_interaction_flags() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    let (a_id, _) = seed_two_posts(&harness);

    let alice = harness
        .repo
        .add_user("alice", UserRole::User, AccountTier::Free);
    harness.repo.seed_bookmark(alice.id, a_id);

    let response = get_as(&harness, "/api/posts", "alice").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let posts = body["posts"].as_array().expect("posts");
    let painting = posts
        .iter()
        .find(|post| post["slug"] == "sunset-painting")
        .expect("post A listed");
    assert_eq!(painting["isBookmarked"], true);
    assert_eq!(painting["isFavorited"], false);

    assert!(
        harness
            .repo
            .flag_probes
            .load(std::sync::atomic::Ordering::SeqCst)
            >= 1
    );
}

#[tokio::test]
async fn bookmark_toggle_round_trips() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    seed_two_posts(&harness);
    harness
        .repo
        .add_user("alice", UserRole::User, AccountTier::Free);

    let (cookie, token) = csrf_pair(&harness).await;

    let toggle = |cookie: String, token: String| {
        let router = harness.router.clone();
        async move {
            router
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/api/posts/sunset-painting/bookmark")
                        .header("x-vetrina-user", "alice")
                        .header(header::COOKIE, cookie)
                        .header("x-csrf-token", token)
                        .body(Body::empty())
                        .expect("request"),
                )
                .await
                .expect("response")
        }
    };

    let first = toggle(cookie.clone(), token.clone()).await;
    assert_eq!(first.status(), StatusCode::OK);
    let body = body_json(first).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["bookmarked"], true);

    let second = toggle(cookie, token).await;
    let body = body_json(second).await;
    assert_eq!(body["bookmarked"], false);
}

#[tokio::test]
async fn toggle_without_csrf_is_rejected() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    seed_two_posts(&harness);
    harness
        .repo
        .add_user("alice", UserRole::User, AccountTier::Free);

    let response = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/posts/sunset-painting/bookmark")
                .header("x-vetrina-user", "alice")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "csrf_rejected");
}

#[tokio::test]
async fn anonymous_toggle_is_unauthorized() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    seed_two_posts(&harness);

    let (cookie, token) = csrf_pair(&harness).await;
    let response = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/posts/sunset-painting/bookmark")
                .header(header::COOKIE, cookie)
                .header("x-csrf-token", token)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn premium_detail_is_locked_for_anonymous_and_open_for_premium() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    seed_two_posts(&harness);
    harness
        .repo
        .add_user("payer", UserRole::User, AccountTier::Premium);

    let response = get(&harness, "/api/posts/sunset-code").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["locked"], true);
    assert!(body.get("content").is_none() || body["content"].is_null());

    let response = get_as(&harness, "/api/posts/sunset-code", "payer").await;
    let body = body_json(response).await;
    assert_eq!(body["locked"], false);
    assert_eq!(body["content"], "Sunset Code content");
}

#[tokio::test]
async fn unknown_slug_is_not_found() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    seed_two_posts(&harness);

    let response = get(&harness, "/api/posts/no-such-post").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rate_limit_returns_429_with_retry_after() {
    let harness = build_harness(2);
    seed_two_posts(&harness);

    assert_eq!(get(&harness, "/api/posts").await.status(), StatusCode::OK);
    assert_eq!(get(&harness, "/api/posts").await.status(), StatusCode::OK);

    let response = get(&harness, "/api/posts").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn admin_routes_enforce_role() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    harness
        .repo
        .add_user("bob", UserRole::User, AccountTier::Free);
    harness
        .repo
        .add_user("root", UserRole::Admin, AccountTier::Premium);

    let (cookie, token) = csrf_pair(&harness).await;

    let post_tag = |subject: Option<&str>, cookie: String, token: String| {
        let router = harness.router.clone();
        let subject = subject.map(str::to_string);
        async move {
            let mut builder = Request::builder()
                .method("POST")
                .uri("/api/admin/tags")
                .header(header::COOKIE, cookie)
                .header("x-csrf-token", token)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            if let Some(subject) = subject {
                builder = builder.header("x-vetrina-user", subject);
            }
            router
                .oneshot(builder.body(Body::from("name=Watercolor")).expect("request"))
                .await
                .expect("response")
        }
    };

    let anonymous = post_tag(None, cookie.clone(), token.clone()).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let non_admin = post_tag(Some("bob"), cookie.clone(), token.clone()).await;
    assert_eq!(non_admin.status(), StatusCode::FORBIDDEN);

    let admin = post_tag(Some("root"), cookie, token).await;
    assert_eq!(admin.status(), StatusCode::CREATED);
    let body = body_json(admin).await;
    assert_eq!(body["slug"], "watercolor");
}

#[tokio::test]
async fn post_update_invalidates_cached_listings() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    let (a_id, _) = seed_two_posts(&harness);
    harness
        .repo
        .add_user("root", UserRole::Admin, AccountTier::Premium);

    // Prime the cross-request cache.
    let response = get(&harness, "/api/posts").await;
    let body = body_json(response).await;
    assert!(
        body["posts"]
            .as_array()
            .expect("posts")
            .iter()
            .any(|post| post["title"] == "Sunset Painting")
    );
    assert!(!harness.cache.is_empty());

    let (cookie, token) = csrf_pair(&harness).await;
    let art = harness.repo.find_category("art").expect("art category");
    let form = format!(
        "title=Sunset+Repainted&description=d&content=c&status=approved&published=true&category_id={art}"
    );

    let update = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/admin/posts/{a_id}"))
                .header("x-vetrina-user", "root")
                .header(header::COOKIE, cookie)
                .header("x-csrf-token", token)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(update.status(), StatusCode::OK);

    // The very next read must reflect the new title; TTLs alone would have
    // served the stale page.
    let response = get(&harness, "/api/posts").await;
    let body = body_json(response).await;
    let titles: Vec<&str> = body["posts"]
        .as_array()
        .expect("posts")
        .iter()
        .map(|post| post["title"].as_str().expect("title"))
        .collect();
    assert!(titles.contains(&"Sunset Repainted"));
    assert!(!titles.contains(&"Sunset Painting"));
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    let response = get(&harness, "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_route_is_a_json_404() {
    let harness = build_harness(HIGH_RATE_LIMIT);
    let response = get(&harness, "/api/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "not_found");
}
