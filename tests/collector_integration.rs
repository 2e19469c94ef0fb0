//! Integration tests for concurrent, failure-isolated collection.

use chrono::{TimeDelta, Utc};
use core::time::Duration;
use gh_rate_monitor::auth::{AppKey, CredentialResolver, SecretToken, TokenStore};
use gh_rate_monitor::collect::{Collector, FailureKind};
use gh_rate_monitor::config::AppIdentity;
use gh_rate_monitor::github::Client;
use std::sync::Arc;
use std::time::Instant;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRIVATE_KEY: &[u8] = include_bytes!("fixtures/app-key.pem");

fn rate_limit_body(limit: u64, remaining: u64) -> serde_json::Value {
    serde_json::json!({
        "resources": {
            "core": { "limit": limit, "used": limit - remaining, "remaining": remaining, "reset": 1_900_000_000 },
            "graphql": { "limit": 5000, "used": 0, "remaining": 5000, "reset": 1_900_000_000 }
        }
    })
}

async fn mount_rate_limit(server: &MockServer, token: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(response)
        .mount(server)
        .await;
}

fn collector_for(server: &MockServer) -> Collector {
    let client = Client::new(server.uri(), Duration::from_secs(30)).unwrap();
    let tokens = Arc::new(TokenStore::new(CredentialResolver::new(client.clone()), TimeDelta::minutes(5)));
    Collector::new(client, tokens)
}

fn personal(name: &str, token: &str) -> AppIdentity {
    AppIdentity::personal_token(name, SecretToken::new(token)).unwrap()
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn test_hung_app_only_fails_itself() {
    let server = MockServer::start().await;
    mount_rate_limit(&server, "ghp_a", ResponseTemplate::new(200).set_body_json(rate_limit_body(5000, 4000))).await;
    mount_rate_limit(
        &server,
        "ghp_b",
        ResponseTemplate::new(200)
            .set_body_json(rate_limit_body(5000, 3000))
            .set_delay(Duration::from_secs(10)),
    )
    .await;
    mount_rate_limit(&server, "ghp_c", ResponseTemplate::new(200).set_body_json(rate_limit_body(5000, 2000))).await;

    let collector = collector_for(&server).with_app_timeout(Duration::from_millis(300));
    let identities = [personal("a", "ghp_a"), personal("b", "ghp_b"), personal("c", "ghp_c")];

    let started = Instant::now();
    let results = collector.collect(&identities, Utc::now()).await;
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(results.len(), 3);
    let names: Vec<_> = results.iter().map(|r| r.identity.name()).collect();
    assert_eq!(names, ["a", "b", "c"]);

    assert!(results[0].is_ok());
    assert_eq!(results[0].snapshot("core").unwrap().remaining, 4000);

    assert_eq!(results[1].failure_kind(), Some(FailureKind::Timeout));
    assert!(results[1].snapshots.is_empty());
    assert!(results[1].error_detail().is_some());

    assert!(results[2].is_ok());
    assert_eq!(results[2].snapshot("core").unwrap().remaining, 2000);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn test_failures_are_classified_per_app() {
    let server = MockServer::start().await;
    mount_rate_limit(&server, "ghp_ok", ResponseTemplate::new(200).set_body_json(rate_limit_body(5000, 4999))).await;
    mount_rate_limit(
        &server,
        "ghp_revoked",
        ResponseTemplate::new(401).set_body_json(serde_json::json!({ "message": "Bad credentials" })),
    )
    .await;
    mount_rate_limit(&server, "ghp_garbled", ResponseTemplate::new(200).set_body_string("<html>")).await;
    mount_rate_limit(&server, "ghp_unavailable", ResponseTemplate::new(503)).await;

    let collector = collector_for(&server);
    let identities = [
        personal("ok", "ghp_ok"),
        personal("revoked", "ghp_revoked"),
        personal("garbled", "ghp_garbled"),
        personal("unavailable", "ghp_unavailable"),
    ];

    let results = collector.collect(&identities, Utc::now()).await;

    assert!(results[0].is_ok());
    assert_eq!(results[1].failure_kind(), Some(FailureKind::Authentication));
    assert!(results[1].error_detail().unwrap().contains("Bad credentials"));
    assert_eq!(results[2].failure_kind(), Some(FailureKind::MalformedResponse));
    assert_eq!(results[3].failure_kind(), Some(FailureKind::Network));

    for result in &results {
        assert!(!result.error_detail().unwrap_or_default().contains("ghp_"));
    }
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn test_rejected_installation_token_is_replaced_next_cycle() {
    let server = MockServer::start().await;
    let expires_at = (Utc::now() + TimeDelta::hours(1)).to_rfc3339();

    Mock::given(method("POST"))
        .and(path("/app/installations/987654/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "token": "ghs_revoked", "expires_at": expires_at })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/app/installations/987654/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "token": "ghs_fresh", "expires_at": expires_at })))
        .mount(&server)
        .await;

    mount_rate_limit(&server, "ghs_revoked", ResponseTemplate::new(401)).await;
    mount_rate_limit(&server, "ghs_fresh", ResponseTemplate::new(200).set_body_json(rate_limit_body(15000, 14990))).await;

    let collector = collector_for(&server);
    let key = AppKey::from_pem(PRIVATE_KEY).unwrap();
    let identities = [AppIdentity::github_app("ci-bot", 123_456, 987_654, key).unwrap()];

    let first = collector.collect(&identities, Utc::now()).await;
    assert_eq!(first[0].failure_kind(), Some(FailureKind::Authentication));
    assert_eq!(collector.tokens().cached_expiry("ci-bot"), None);

    let second = collector.collect(&identities, Utc::now()).await;
    assert!(second[0].is_ok());
    assert_eq!(second[0].snapshot("core").unwrap().limit, 15000);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn test_cycle_deadline_bounds_queued_apps() {
    let server = MockServer::start().await;
    for token in ["ghp_1", "ghp_2", "ghp_3"] {
        mount_rate_limit(
            &server,
            token,
            ResponseTemplate::new(200)
                .set_body_json(rate_limit_body(5000, 5000))
                .set_delay(Duration::from_secs(10)),
        )
        .await;
    }

    let collector = collector_for(&server)
        .with_max_concurrency(1)
        .with_app_timeout(Duration::from_secs(20))
        .with_cycle_timeout(Some(Duration::from_millis(300)));
    let identities = [personal("one", "ghp_1"), personal("two", "ghp_2"), personal("three", "ghp_3")];

    let started = Instant::now();
    let results = collector.collect(&identities, Utc::now()).await;
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.failure_kind() == Some(FailureKind::Timeout)));
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn test_queued_app_refreshes_token_that_entered_buffer() {
    let server = MockServer::start().await;
    let cycle_start = Utc::now() - TimeDelta::seconds(10);

    // Fresh when the cycle starts, but inside the five-minute buffer once the app is dequeued.
    let near_expiry = cycle_start + TimeDelta::minutes(5) + TimeDelta::seconds(2);
    Mock::given(method("POST"))
        .and(path("/app/installations/987654/access_tokens"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(serde_json::json!({ "token": "ghs_expiring", "expires_at": near_expiry.to_rfc3339() })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/app/installations/987654/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "token": "ghs_refreshed",
            "expires_at": (Utc::now() + TimeDelta::hours(1)).to_rfc3339(),
        })))
        .mount(&server)
        .await;

    mount_rate_limit(
        &server,
        "ghp_slow",
        ResponseTemplate::new(200)
            .set_body_json(rate_limit_body(5000, 5000))
            .set_delay(Duration::from_secs(1)),
    )
    .await;
    mount_rate_limit(&server, "ghs_expiring", ResponseTemplate::new(200).set_body_json(rate_limit_body(5000, 1))).await;
    mount_rate_limit(&server, "ghs_refreshed", ResponseTemplate::new(200).set_body_json(rate_limit_body(5000, 4999))).await;

    let collector = collector_for(&server).with_max_concurrency(1);
    let key = AppKey::from_pem(PRIVATE_KEY).unwrap();
    let app = AppIdentity::github_app("ci-bot", 123_456, 987_654, key).unwrap();

    let cached = collector.tokens().resolve(&app, cycle_start).await.unwrap();
    assert_eq!(cached.value.expose(), "ghs_expiring");

    let results = collector.collect(&[personal("slow", "ghp_slow"), app], cycle_start).await;

    assert!(results[0].is_ok());
    assert!(results[1].is_ok(), "{:?}", results[1].error_detail());
    assert_eq!(results[1].snapshot("core").unwrap().remaining, 4999);
    assert_eq!(results[1].observed_at, cycle_start);

    let exchanges = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path().ends_with("/access_tokens"))
        .count();
    assert_eq!(exchanges, 2);
}
