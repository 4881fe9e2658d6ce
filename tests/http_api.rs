use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use scandeals::application::listing::ListingService;
use scandeals::application::repos::{DealsRepo, Repositories};
use scandeals::cache::{CacheConfig, MemoryCache};
use scandeals::domain::entities::NewDeal;
use scandeals::infra::http::{HttpState, build_router};
use scandeals::infra::memory::MemoryRepositories;

const API_KEY: &str = "crawler-secret";

fn app(api_key: Option<&str>) -> (Router, MemoryRepositories) {
    let store = MemoryRepositories::new();
    let repos = Repositories::shared(store.clone());
    let config = CacheConfig {
        refresh_on_miss: false,
        ..CacheConfig::default()
    };
    let listing = ListingService::new(repos.deals.clone(), Arc::new(MemoryCache::new()), config);
    let router = build_router(HttpState::new(
        &repos,
        listing,
        api_key.map(str::to_string),
    ));
    (router, store)
}

fn router_with_key(api_key: Option<&str>) -> Router {
    app(api_key).0
}

async fn router_with_deal() -> (Router, Uuid) {
    let (router, store) = app(None);
    let deal = NewDeal::new("27인치 모니터", 189_000, "https://shop.example.com/monitor", "ppomppu")
        .expect("valid deal");
    let deal = DealsRepo::insert(&store, deal).await.expect("insert deal");
    (router, deal.id)
}

fn as_user(method: Method, uri: &str, user: Option<i64>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    let body = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request")
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router responds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn crawl_post(key: Option<&str>, payload: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/crawl/data")
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("X-API-Key", key);
    }
    builder
        .body(Body::from(payload.to_string()))
        .expect("request")
}

fn sample_batch() -> Value {
    json!({
        "site": "ppomppu",
        "items": [
            {
                "title": "27인치 모니터",
                "price": "189,000원",
                "productUrl": "https://shop.example.com/monitor",
                "sourceSite": "PPOMPPU"
            },
            {
                "title": "무료 나눔 키보드",
                "price": "무료",
                "productUrl": "https://shop.example.com/keyboard"
            },
            {
                "title": "",
                "price": "1000",
                "productUrl": "https://shop.example.com/untitled"
            }
        ]
    })
}

#[tokio::test]
async fn empty_listing_has_page_flags() {
    let router = router_with_key(Some(API_KEY));
    let (status, body) = send(&router, get("/api/sales")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], json!([]));
    assert_eq!(body["total_elements"], 0);
    assert_eq!(body["total_pages"], 0);
    assert_eq!(body["size"], 20);
    assert_eq!(body["is_first"], true);
    assert_eq!(body["is_last"], true);
    assert_eq!(body["is_empty"], true);
}

#[tokio::test]
async fn invalid_page_size_is_rejected() {
    let router = router_with_key(Some(API_KEY));

    for uri in ["/api/sales?size=0", "/api/sales?size=101", "/api/sales/popular?size=0"] {
        let (status, body) = send(&router, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(body["error"]["hint"].as_str().is_some());
    }
}

#[tokio::test]
async fn unknown_deal_is_not_found() {
    let router = router_with_key(Some(API_KEY));

    let (status, body) = send(&router, get(&format!("/api/sales/{}", Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = send(&router, get("/api/sales/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn crawl_requires_matching_key() {
    let router = router_with_key(Some(API_KEY));
    let batch = sample_batch();

    let (status, body) = send(&router, crawl_post(None, &batch)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = send(&router, crawl_post(Some("wrong"), &batch)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, listing) = send(&router, get("/api/sales")).await;
    assert_eq!(listing["total_elements"], 0);
}

#[tokio::test]
async fn crawl_without_configured_key_rejects_everything() {
    let router = router_with_key(None);
    let (status, _) = send(&router, crawl_post(Some(""), &sample_batch())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn crawl_batch_is_ingested_and_listed() {
    let router = router_with_key(Some(API_KEY));

    let (status, report) = send(&router, crawl_post(Some(API_KEY), &sample_batch())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report, json!({ "saved": 2, "duplicates": 0, "skipped": 1 }));

    let (_, again) = send(&router, crawl_post(Some(API_KEY), &sample_batch())).await;
    assert_eq!(again, json!({ "saved": 0, "duplicates": 2, "skipped": 1 }));

    let (status, listing) = send(&router, get("/api/sales?sortBy=lowPrice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["total_elements"], 2);
    assert_eq!(listing["content"][0]["price"], 0);
    assert_eq!(listing["content"][1]["price"], 189_000);
    assert_eq!(listing["content"][1]["source_site"], "ppomppu");

    let id = listing["content"][1]["id"].as_str().expect("id").to_string();
    let (status, detail) = send(&router, get(&format!("/api/sales/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["view_count"], 1);

    let (_, preview) = send(&router, get(&format!("/api/sales/{id}/preview"))).await;
    assert_eq!(preview["view_count"], 1);
}

#[tokio::test]
async fn malformed_crawl_payload_is_bad_request() {
    let router = router_with_key(Some(API_KEY));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/crawl/data")
        .header("X-API-Key", API_KEY)
        .body(Body::from("{not json"))
        .expect("request");

    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn health_and_sites_respond() {
    let router = router_with_key(None);

    let (status, body) = send(&router, get("/api/crawl/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, sites) = send(&router, get("/api/sales/sites")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sites[0]["tag"], "ppomppu");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let router = router_with_key(None);
    let response = router
        .oneshot(get("/api/crawl/health"))
        .await
        .expect("router responds");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn like_routes_toggle_and_report_state() {
    let (router, deal_id) = router_with_deal().await;
    let likes = format!("/api/sales/{deal_id}/likes");

    let (status, body) = send(&router, as_user(Method::GET, &likes, Some(5), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(false));

    let (status, body) = send(&router, as_user(Method::POST, &likes, Some(5), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(true));

    let (_, body) = send(&router, as_user(Method::GET, &likes, Some(5), None)).await;
    assert_eq!(body, json!(true));
    let (_, detail) = send(&router, get(&format!("/api/sales/{deal_id}/preview"))).await;
    assert_eq!(detail["like_count"], 1);

    let (_, body) = send(&router, as_user(Method::POST, &likes, Some(5), None)).await;
    assert_eq!(body, json!(false));
    let (_, detail) = send(&router, get(&format!("/api/sales/{deal_id}/preview"))).await;
    assert_eq!(detail["like_count"], 0);
}

#[tokio::test]
async fn like_routes_require_a_user() {
    let (router, deal_id) = router_with_deal().await;
    let likes = format!("/api/sales/{deal_id}/likes");

    let (status, body) = send(&router, as_user(Method::POST, &likes, None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = send(
        &router,
        as_user(Method::POST, &format!("/api/sales/{}/likes", Uuid::new_v4()), Some(5), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_routes_create_list_and_delete() {
    let (router, deal_id) = router_with_deal().await;
    let comments = format!("/api/sales/{deal_id}/comments");

    let (status, list) = send(&router, get(&comments)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));

    let (status, root) = send(
        &router,
        as_user(Method::POST, &comments, Some(7), Some(json!({ "content": "싸네요" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root["content"], "싸네요");
    assert_eq!(root["user_id"], 7);
    let root_id = root["id"].as_str().expect("id").to_string();

    let (status, reply) = send(
        &router,
        as_user(
            Method::POST,
            &comments,
            Some(8),
            Some(json!({ "content": "동의", "parentId": root_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["parent_id"], root_id.as_str());

    let (_, list) = send(&router, get(&comments)).await;
    assert_eq!(list.as_array().map(Vec::len), Some(2));
    let (_, detail) = send(&router, get(&format!("/api/sales/{deal_id}/preview"))).await;
    assert_eq!(detail["comment_count"], 2);

    let reply_uri = format!("{comments}/{}", reply["id"].as_str().expect("id"));
    let (status, body) = send(&router, as_user(Method::DELETE, &reply_uri, Some(7), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let (status, body) = send(&router, as_user(Method::DELETE, &reply_uri, Some(8), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (_, list) = send(&router, get(&comments)).await;
    assert_eq!(list.as_array().map(Vec::len), Some(1));
    let (_, detail) = send(&router, get(&format!("/api/sales/{deal_id}/preview"))).await;
    assert_eq!(detail["comment_count"], 1);
}

#[tokio::test]
async fn comment_writes_are_validated() {
    let (router, deal_id) = router_with_deal().await;
    let comments = format!("/api/sales/{deal_id}/comments");

    let (status, _) = send(
        &router,
        as_user(Method::POST, &comments, None, Some(json!({ "content": "hi" }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &router,
        as_user(Method::POST, &comments, Some(7), Some(json!({ "content": "   " }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, _) = send(
        &router,
        as_user(Method::POST, &comments, Some(7), Some(json!({ "text": "hi" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &router,
        as_user(
            Method::DELETE,
            &format!("{comments}/{}", Uuid::new_v4()),
            Some(7),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
