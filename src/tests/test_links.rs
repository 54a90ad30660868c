use std::time::Duration;

use http::{header::LOCATION, StatusCode};
use serde_json::json;

use crate::{
    db::link_db,
    test_support::{bearer, create_links, create_user, inmemory_ctx},
    usage::UsageRecorder,
};

use super::{get, post_json, send};

async fn wait_for_usages(ctx: &crate::ShortenerCtx, link_id: &str, expected: i64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let link = link_db::find_link_by_id(&ctx.db, link_id)
                .await
                .unwrap()
                .unwrap();
            if link.usages_count == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("usage was never recorded");
}

#[test_log::test(tokio::test)]
async fn create_then_follow_link() {
    let ctx = inmemory_ctx().await;
    let alice = create_user(&ctx.db, "alice").await;
    let auth = bearer(&ctx, &alice);

    let created = send(
        &ctx,
        post_json("/l", Some(&auth), json!({ "url": "https://example.com/a" })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["userId"], alice.id.as_str());
    assert_eq!(created.body["usagesCount"], 0);

    let id = created.body["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), link_db::LINK_ID_LEN);

    let followed = send(&ctx, get(&format!("/l/{id}"), None)).await;
    assert_eq!(followed.status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(followed.headers[LOCATION], "https://example.com/a");

    wait_for_usages(&ctx, &id, 1).await;

    let listed = send(&ctx, get("/l", Some(&auth))).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body[0]["id"], id.as_str());
    assert_eq!(listed.body[0]["usagesCount"], 1);
}

#[test_log::test(tokio::test)]
async fn anonymous_links_belong_to_anonymous_identity() {
    let ctx = inmemory_ctx().await;

    let created = send(
        &ctx,
        post_json("/l", None, json!({ "url": "https://example.com/anon" })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["userId"], ctx.anonymous.get().id.as_str());
}

#[test_log::test(tokio::test)]
async fn empty_url_is_rejected() {
    let ctx = inmemory_ctx().await;

    let response = send(&ctx, post_json("/l", None, json!({ "url": "  " }))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "url must not be empty");
}

#[test_log::test(tokio::test)]
async fn unknown_link_is_not_found() {
    let ctx = inmemory_ctx().await;

    let response = send(&ctx, get("/l/nothere", None)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn list_is_paginated_newest_first() {
    let ctx = inmemory_ctx().await;
    let alice = create_user(&ctx.db, "alice").await;
    let bob = create_user(&ctx.db, "bob").await;
    let links = create_links(&ctx.db, &alice, 5).await;
    create_links(&ctx.db, &bob, 2).await;

    let response = send(&ctx, get("/l?limit=2&offset=1", Some(&bearer(&ctx, &alice)))).await;
    assert_eq!(response.status, StatusCode::OK);

    let ids: Vec<&str> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|link| link["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![links[1].id.as_str(), links[2].id.as_str()]);

    let response = send(&ctx, get("/l?limit=-1", Some(&bearer(&ctx, &alice)))).await;
    assert_eq!(response.body, json!([]));
}

#[test_log::test(tokio::test)]
async fn lost_usage_write_does_not_fail_anything() {
    let ctx = inmemory_ctx().await;
    let alice = create_user(&ctx.db, "alice").await;
    let links = create_links(&ctx.db, &alice, 1).await;

    // violates the link foreign key
    UsageRecorder::new(ctx.db.clone())
        .record("missing".to_string())
        .await
        .unwrap();

    let followed = send(&ctx, get(&format!("/l/{}", links[0].id), None)).await;
    assert_eq!(followed.status, StatusCode::MOVED_PERMANENTLY);

    wait_for_usages(&ctx, &links[0].id, 1).await;
}
