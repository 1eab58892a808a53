mod common;

use common::mock_server::DriveSafeMock;
use drivesafe::{bearer, TokenStore};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn mount_empty_list(mock: &DriveSafeMock, endpoint: &str) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock.server)
        .await;
}

fn authorization_headers(requests: &[wiremock::Request]) -> Vec<Option<String>> {
    requests
        .iter()
        .map(|r| {
            r.headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .collect()
}

#[tokio::test]
async fn test_authenticated_client_attaches_stored_token() {
    let mock = DriveSafeMock::start().await;
    mock.mount_fixture("members/members_authorized.json").await;

    let (factory, store) = mock.factory();
    store.save("stored-token");

    let client = factory.authenticated(&mock.base_url()).unwrap();
    let members = client.get_members().await.unwrap();
    assert_eq!(members[0].name.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn test_token_changes_are_seen_by_cached_client() {
    let mock = DriveSafeMock::start().await;
    mount_empty_list(&mock, "/members").await;

    let (factory, store) = mock.factory();
    let base_url = mock.base_url();

    factory.authenticated(&base_url).unwrap().get_members().await.unwrap();
    store.save("first");
    factory.authenticated(&base_url).unwrap().get_members().await.unwrap();
    store.save("second");
    factory.authenticated(&base_url).unwrap().get_members().await.unwrap();
    store.clear();
    factory.authenticated(&base_url).unwrap().get_members().await.unwrap();

    assert_eq!(
        authorization_headers(&mock.received().await),
        vec![
            None,
            Some("Bearer first".to_string()),
            Some("Bearer second".to_string()),
            None
        ]
    );
}

#[tokio::test]
async fn test_plain_client_never_sends_token() {
    let mock = DriveSafeMock::start().await;
    mount_empty_list(&mock, "/members").await;

    let (factory, store) = mock.factory();
    store.save("stored-token");

    factory.plain(&mock.base_url()).unwrap().get_members().await.unwrap();
    assert_eq!(authorization_headers(&mock.received().await), vec![None]);
}

#[tokio::test]
async fn test_explicit_header_overrides_interceptor() {
    let mock = DriveSafeMock::start().await;
    mount_empty_list(&mock, "/driving_records").await;

    let (factory, store) = mock.factory();
    store.save("stored-token");

    let client = factory.authenticated(&mock.base_url()).unwrap();
    let auth = bearer("explicit-token");
    client.get_records(Some(&auth), Some("u1"), None, None).await.unwrap();

    assert_eq!(
        authorization_headers(&mock.received().await),
        vec![Some("Bearer explicit-token".to_string())]
    );
}

#[tokio::test]
async fn test_switching_backends_rebuilds_client() {
    let first = DriveSafeMock::start().await;
    let second = DriveSafeMock::start().await;
    first.mount_fixture("root/root_valid.json").await;
    second.mount_fixture("root/root_backend.json").await;

    let (factory, _store) = first.factory();
    let a = factory.plain(&first.base_url()).unwrap();
    assert_eq!(a.root().await.unwrap().version.as_deref(), Some("1.2"));

    let b = factory.plain(&second.base_url()).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(b.root().await.unwrap().status.as_deref(), Some("true"));
}
