#![allow(dead_code)]

use drivesafe::{ClientFactory, DriveSafeClient, MemoryTokenStore, TokenStore};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use wiremock::matchers::{header, method, path_regex};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

#[derive(Deserialize)]
pub struct Fixture {
    #[serde(rename = "_meta")]
    pub meta: Option<FixtureMeta>,
    pub request: FixtureRequest,
    pub response: FixtureResponse,
}

#[derive(Deserialize)]
pub struct FixtureMeta {
    pub query: Option<HashMap<String, serde_json::Value>>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Deserialize)]
pub struct FixtureRequest {
    pub method: String,
    pub path_pattern: String,
}

#[derive(Deserialize)]
pub struct FixtureResponse {
    pub status_code: u16,
    #[serde(default)]
    pub body: serde_json::Value,
    /// Sent verbatim instead of `body`, for payloads that are not JSON
    pub raw_body: Option<String>,
}

pub struct DriveSafeMock {
    pub server: MockServer,
}

impl DriveSafeMock {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
    }

    pub async fn mount_fixture(&self, fixture_path: &str) {
        let full_path = Self::fixtures_dir().join(fixture_path);

        let content = fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", full_path.display(), e));

        let fixture: Fixture = serde_json::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", full_path.display(), e));

        let mut mock = Mock::given(method(fixture.request.method.as_str()))
            .and(path_regex(&fixture.request.path_pattern));

        if let Some(meta) = &fixture.meta {
            if let Some(query) = &meta.query {
                for (key, value) in query {
                    if let Some(value) = query_value_to_string(value) {
                        mock = mock.and(query_param_normalized(key, value));
                    }
                }
            }
            if let Some(headers) = &meta.headers {
                for (key, value) in headers {
                    mock = mock.and(header(key.as_str(), value.as_str()));
                }
            }
        }

        let template = match fixture.response.raw_body {
            Some(raw) => ResponseTemplate::new(fixture.response.status_code)
                .set_body_raw(raw, "application/json"),
            None => ResponseTemplate::new(fixture.response.status_code)
                .set_body_json(&fixture.response.body),
        };

        mock.respond_with(template).mount(&self.server).await;
    }

    /// Base URL without a trailing slash, as a settings screen would store it.
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    pub fn client(&self) -> DriveSafeClient {
        DriveSafeClient::new(&self.base_url()).unwrap()
    }

    pub fn factory(&self) -> (ClientFactory, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::new());
        let shared: Arc<dyn TokenStore> = store.clone();
        (ClientFactory::new(shared), store)
    }

    /// Requests the server has seen so far, in arrival order.
    pub async fn received(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

fn query_value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(value) => Some(value.clone()),
        serde_json::Value::Number(value) => Some(value.to_string()),
        serde_json::Value::Bool(value) => Some(value.to_string()),
        serde_json::Value::Null => None,
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
    }
}

struct QueryParamNormalizedMatcher {
    key: String,
    expected: String,
}

fn query_param_normalized(
    key: impl Into<String>,
    expected: impl Into<String>,
) -> QueryParamNormalizedMatcher {
    QueryParamNormalizedMatcher {
        key: key.into(),
        expected: expected.into(),
    }
}

impl Match for QueryParamNormalizedMatcher {
    fn matches(&self, request: &Request) -> bool {
        if request
            .url
            .query_pairs()
            .any(|pair| pair.0 == self.key.as_str() && values_match(&self.expected, &pair.1))
        {
            return true;
        }

        if let Some(actual) = form_body_value(request, &self.key) {
            return values_match(&self.expected, &actual);
        }

        false
    }
}

fn values_match(expected: &str, actual: &str) -> bool {
    if expected == actual {
        return true;
    }

    if let (Ok(expected), Ok(actual)) = (expected.parse::<f64>(), actual.parse::<f64>()) {
        return (expected - actual).abs() < f64::EPSILON;
    }

    false
}

fn form_body_value(request: &Request, key: &str) -> Option<String> {
    url::form_urlencoded::parse(&request.body)
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
