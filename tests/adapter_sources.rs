// tests/adapter_sources.rs
//! Registry dispatch over fixture-backed adapters: rating normalization and
//! the caller-misuse contract.

use std::sync::Arc;

use review_radar::ingest::providers::{BilibiliAdapter, SteamAdapter, XiaoheiheAdapter};
use review_radar::{AdapterRegistry, Platform, SourceConfig};

const STEAM_FIXTURE: &str = r#"{
    "success": 1,
    "reviews": [
        {
            "recommendationid": "1",
            "author": { "steamid": "u1", "playtime_forever": 600 },
            "review": "神作，值得",
            "voted_up": true,
            "votes_up": 3,
            "comment_count": 0,
            "timestamp_created": 1700000000,
            "steam_purchase": true
        },
        {
            "recommendationid": "2",
            "author": { "steamid": "u2", "playtime_forever": 30 },
            "review": "退款了",
            "voted_up": false,
            "votes_up": 1,
            "comment_count": 2,
            "timestamp_created": 1700000500,
            "steam_purchase": false
        }
    ]
}"#;

fn cfg(platform: Platform) -> SourceConfig {
    SourceConfig {
        source: platform,
        enabled: true,
        config: Default::default(),
    }
}

#[tokio::test]
async fn steam_boolean_recommend_maps_to_unit_interval() {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(SteamAdapter::from_fixture(STEAM_FIXTURE)));

    let out = registry
        .fetch_from_source(Platform::Steam, &cfg(Platform::Steam))
        .await
        .unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].rating, 1.0);
    assert_eq!(out[1].rating, 0.0);
    // source-native order is preserved within a source
    assert_eq!(out[0].content_id, "1");
    assert_eq!(out[1].content_id, "2");
}

#[tokio::test]
async fn xiaoheihe_scale_and_bilibili_likes_normalize() {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(XiaoheiheAdapter::from_fixture(
        r#"{ "reviews": [{ "review_id": "x1", "username": "u", "content": "还行", "score": 7 }] }"#,
    )));
    registry.register(Arc::new(BilibiliAdapter::from_fixture(
        r#"{ "code": 0, "data": { "replies": [
            { "rpid": 1, "member": { "uname": "m" }, "content": { "message": "推荐" },
              "like": 99, "rcount": 0, "ctime": 1700000000 }
        ] } }"#,
    )));

    let heihe = registry
        .fetch_from_source(Platform::Xiaoheihe, &cfg(Platform::Xiaoheihe))
        .await
        .unwrap();
    assert_eq!(heihe[0].rating, 0.7);

    let bili = registry
        .fetch_from_source(Platform::Bilibili, &cfg(Platform::Bilibili))
        .await
        .unwrap();
    assert_eq!(bili[0].rating, 1.0);
}

#[tokio::test]
async fn unregistered_source_is_caller_misuse() {
    let registry = AdapterRegistry::new();
    let err = registry
        .fetch_from_source(Platform::Steam, &cfg(Platform::Steam))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unknown or disabled source"));
}
