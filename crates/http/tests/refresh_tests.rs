//! Session recovery: refresh on 401, replay, and queuing behind an in-flight refresh

use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use studyboard_http::core::RefreshTokenRequest;
use studyboard_http::{ApiClient, ClientError, CredentialStore, MemoryCredentialStore};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REFRESH_DELAY: Duration = Duration::from_millis(300);

struct Harness {
    server: MockServer,
    store: Arc<MemoryCredentialStore>,
    ended: Arc<AtomicUsize>,
    client: ApiClient,
}

impl Harness {
    async fn start(access: Option<&str>, refresh: Option<&str>) -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryCredentialStore::default());
        if let Some(token) = access {
            store.set("access_token", token).unwrap();
        }
        if let Some(token) = refresh {
            store.set("refresh_token", token).unwrap();
        }

        let ended = Arc::new(AtomicUsize::new(0));
        let counter = ended.clone();
        let client = ApiClient::builder()
            .base_url(format!("{}/api", server.uri()))
            .credential_store(store.clone())
            .on_unauthenticated(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .build()
            .unwrap();

        Self {
            server,
            store,
            ended,
            client,
        }
    }

    async fn mount_endpoint(&self, endpoint: &str, token: &str, status: u16, times: u64) {
        let template = if status == 200 {
            ResponseTemplate::new(200).set_body_json(json!([]))
        } else {
            ResponseTemplate::new(status).set_body_string("Invalid token")
        };
        Mock::given(method("GET"))
            .and(path(format!("/api{endpoint}")))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(template)
            .expect(times)
            .mount(&self.server)
            .await;
    }

    async fn mount_refresh(&self, refresh_token: &str, response: ResponseTemplate, times: u64) {
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .and(body_json(json!({ "refresh_token": refresh_token })))
            .respond_with(response)
            .expect(times)
            .mount(&self.server)
            .await;
    }

    fn ended_count(&self) -> usize {
        self.ended.load(Ordering::SeqCst)
    }
}

fn token_pair(access: &str, refresh: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": 900
    }))
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_call_replayed() {
    let h = Harness::start(Some("t1"), Some("r1")).await;
    h.mount_endpoint("/subjects/get/my", "t1", 401, 1).await;
    h.mount_endpoint("/subjects/get/my", "t2", 200, 1).await;
    h.mount_refresh("r1", token_pair("t2", "r2"), 1).await;

    let subjects = h.client.my_subjects().await.unwrap();

    assert!(subjects.is_empty());
    assert_eq!(h.store.get("access_token").as_deref(), Some("t2"));
    assert_eq!(h.store.get("refresh_token").as_deref(), Some("r2"));
    assert_eq!(h.ended_count(), 0);
    assert!(!h.client.session().is_refreshing());
}

#[tokio::test]
async fn test_concurrent_failures_share_one_refresh() {
    let h = Harness::start(Some("t1"), Some("r1")).await;
    // Two calls on one endpoint, one on another
    h.mount_endpoint("/subjects/get/my", "t1", 401, 2).await;
    h.mount_endpoint("/projects/my", "t1", 401, 1).await;
    h.mount_endpoint("/subjects/get/my", "t2", 200, 2).await;
    h.mount_endpoint("/projects/my", "t2", 200, 1).await;
    h.mount_refresh("r1", token_pair("t2", "r2").set_delay(REFRESH_DELAY), 1)
        .await;

    let (first, second, third) = tokio::join!(
        h.client.my_subjects(),
        h.client.my_subjects(),
        h.client.my_projects(),
    );

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert!(third.is_ok());
    assert_eq!(h.store.get("access_token").as_deref(), Some("t2"));
    assert_eq!(h.client.session().pending_count(), 0);

    let refreshes = h
        .server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/api/auth/refresh")
        .count();
    assert_eq!(refreshes, 1);
}

#[tokio::test]
async fn test_missing_refresh_token_clears_session() {
    let h = Harness::start(Some("t1"), None).await;
    h.mount_endpoint("/projects/my", "t1", 401, 1).await;
    h.mount_refresh("r1", token_pair("t2", "r2"), 0).await;

    let error = h.client.my_projects().await.unwrap_err();

    assert!(matches!(error, ClientError::AuthorizationExpired(_)));
    assert!(h.store.get("access_token").is_none());
    assert!(h.store.get("refresh_token").is_none());
    assert_eq!(h.ended_count(), 1);
    assert!(!h.client.session().is_refreshing());
}

#[tokio::test]
async fn test_replay_rejected_again_is_not_refreshed_twice() {
    let h = Harness::start(Some("t1"), Some("r1")).await;
    h.mount_endpoint("/projects/my", "t1", 401, 1).await;
    h.mount_endpoint("/projects/my", "t2", 401, 1).await;
    h.mount_refresh("r1", token_pair("t2", "r2"), 1).await;
    h.mount_refresh("r2", token_pair("t3", "r3"), 0).await;

    let error = h.client.my_projects().await.unwrap_err();

    assert!(matches!(error, ClientError::AuthorizationRetryFailed(ref m) if m == "Invalid token"));
    // The refresh itself succeeded, so the new pair stays stored
    assert_eq!(h.store.get("access_token").as_deref(), Some("t2"));
    assert_eq!(h.ended_count(), 0);
}

#[tokio::test]
async fn test_identical_token_from_refresh_retries_only_once() {
    let h = Harness::start(Some("t1"), Some("r1")).await;
    h.mount_endpoint("/projects/my", "t1", 401, 2).await;
    h.mount_refresh("r1", token_pair("t1", "r1"), 1).await;

    let error = h.client.my_projects().await.unwrap_err();

    assert!(matches!(error, ClientError::AuthorizationRetryFailed(_)));
    assert!(!h.client.session().is_refreshing());
}

#[tokio::test]
async fn test_refresh_failure_rejects_every_queued_call() {
    let h = Harness::start(Some("t1"), Some("r1")).await;
    h.mount_endpoint("/subjects/get/my", "t1", 401, 3).await;
    h.mount_refresh(
        "r1",
        ResponseTemplate::new(401)
            .set_body_string("Invalid refresh token")
            .set_delay(REFRESH_DELAY),
        1,
    )
    .await;

    let (first, second, third) = tokio::join!(
        h.client.my_subjects(),
        h.client.my_subjects(),
        h.client.my_subjects(),
    );

    for result in [first, second, third] {
        match result {
            Err(ClientError::RefreshFailed(failure)) => {
                assert_eq!(failure.status, Some(401));
                assert_eq!(failure.message, "Invalid refresh token");
            }
            other => panic!("expected refresh failure, got {other:?}"),
        }
    }
    assert!(h.store.get("access_token").is_none());
    assert!(h.store.get("refresh_token").is_none());
    assert_eq!(h.ended_count(), 1);
    assert!(!h.client.session().is_refreshing());
}

#[tokio::test]
async fn test_queued_replay_rejected_again_is_final() {
    let h = Harness::start(Some("t1"), Some("r1")).await;
    h.mount_endpoint("/subjects/get/my", "t1", 401, 2).await;
    h.mount_endpoint("/subjects/get/my", "t2", 401, 2).await;
    h.mount_refresh("r1", token_pair("t2", "r2").set_delay(REFRESH_DELAY), 1)
        .await;
    h.mount_refresh("r2", token_pair("t3", "r3"), 0).await;

    let (first, second) = tokio::join!(h.client.my_subjects(), h.client.my_subjects());

    assert!(matches!(first, Err(ClientError::AuthorizationRetryFailed(_))));
    assert!(matches!(second, Err(ClientError::AuthorizationRetryFailed(_))));
}

#[tokio::test]
async fn test_malformed_refresh_response_is_refresh_failure() {
    let h = Harness::start(Some("t1"), Some("r1")).await;
    h.mount_endpoint("/projects/my", "t1", 401, 1).await;
    h.mount_refresh("r1", ResponseTemplate::new(200).set_body_string("not json"), 1)
        .await;

    let error = h.client.my_projects().await.unwrap_err();

    assert!(matches!(error, ClientError::RefreshFailed(ref f) if f.status == Some(200)));
    assert_eq!(h.ended_count(), 1);
}

#[tokio::test]
async fn test_explicit_refresh_persists_pair() {
    let h = Harness::start(None, None).await;
    h.mount_refresh("r1", token_pair("t2", "r2"), 1).await;

    let pair = h
        .client
        .refresh(RefreshTokenRequest {
            refresh_token: "r1".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(pair.access_token, "t2");
    assert_eq!(h.store.get("access_token").as_deref(), Some("t2"));
    assert_eq!(h.store.get("refresh_token").as_deref(), Some("r2"));
}

#[tokio::test]
async fn test_clones_share_the_refresh() {
    let h = Harness::start(Some("t1"), Some("r1")).await;
    h.mount_endpoint("/projects/my", "t1", 401, 2).await;
    h.mount_endpoint("/projects/my", "t2", 200, 2).await;
    h.mount_refresh("r1", token_pair("t2", "r2").set_delay(REFRESH_DELAY), 1)
        .await;

    let other = h.client.clone();
    let handle = tokio::spawn(async move { other.my_projects().await });
    let local = h.client.my_projects().await;

    assert!(local.is_ok());
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_unreachable_refresh_clears_session() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryCredentialStore::default());
    store.set("access_token", "t1").unwrap();
    store.set("refresh_token", "r1").unwrap();

    let ended = Arc::new(AtomicUsize::new(0));
    let counter = ended.clone();
    let client = ApiClient::builder()
        .base_url(format!("{}/api", server.uri()))
        .timeout(Duration::from_millis(200))
        .credential_store(store.clone())
        .on_unauthenticated(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .build()
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/projects/my"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid token"))
        .expect(1)
        .mount(&server)
        .await;
    // Outlives the client timeout, so the exchange never gets a response
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(token_pair("t2", "r2").set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let error = client.my_projects().await.unwrap_err();

    match error {
        ClientError::RefreshFailed(failure) => assert!(failure.status.is_none()),
        other => panic!("expected refresh failure, got {other:?}"),
    }
    assert!(store.get("access_token").is_none());
    assert!(store.get("refresh_token").is_none());
    assert_eq!(ended.load(Ordering::SeqCst), 1);
    assert!(!client.session().is_refreshing());
}
