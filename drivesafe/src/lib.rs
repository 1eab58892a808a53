pub mod decode;
pub mod factory;
pub mod interceptor;
pub mod token;
pub mod types;

pub use crate::factory::{ensure_trailing_slash, ClientFactory, ClientKind, TransportPolicy};
pub use crate::interceptor::{bearer, AuthInterceptor};
pub use crate::token::{MemoryTokenStore, TokenStore};

use crate::types::{
    DrivingRecordDto, FatigueDto, LoginBinding, LoginRequest, LoginResponse, MemberDto,
    RootResponse,
};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} {reason}")]
    HttpStatus {
        status: u16,
        reason: String,
        body: String,
    },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

impl Error {
    /// True for failures below HTTP: connect, timeout, TLS, broken body.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    /// True when the server answered but the body could not be decoded.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

/// Typed surface of the DriveSafe backend, bound to one base URL.
///
/// Obtain one from a [`ClientFactory`] to share it, or build it directly.
#[derive(Debug)]
pub struct DriveSafeClient {
    client: Client,
    base_url: Url,
    interceptor: Option<AuthInterceptor>,
    log_bodies: bool,
}

impl DriveSafeClient {
    /// Creates an unauthenticated client with the default transport policy.
    ///
    /// # Errors
    /// Returns an error if `base_url` is not a valid URL or the HTTP client
    /// cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        Self::build(base_url, &TransportPolicy::default(), None)
    }

    pub(crate) fn build(
        base_url: &str,
        policy: &TransportPolicy,
        interceptor: Option<AuthInterceptor>,
    ) -> Result<Self, Error> {
        let normalized = ensure_trailing_slash(base_url);
        let base_url = Url::parse(&normalized).map_err(|source| Error::InvalidUrl {
            url: normalized.clone(),
            source,
        })?;
        Ok(Self {
            client: policy.http_client()?,
            base_url,
            interceptor,
            log_bodies: policy.log_bodies,
        })
    }

    /// Routes every request through `interceptor`.
    #[must_use]
    pub fn with_interceptor(mut self, interceptor: AuthInterceptor) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// The slash-terminated base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.interceptor.is_some()
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, Error> {
        let url = self.base_url.join(path).map_err(|source| Error::InvalidUrl {
            url: format!("{}{path}", self.base_url),
            source,
        })?;
        Ok(self.client.request(method, url))
    }

    async fn send<T>(&self, builder: RequestBuilder) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut request = builder.build()?;
        if let Some(interceptor) = &self.interceptor {
            request = interceptor.apply(request);
        }

        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            authorized = request.headers().contains_key(AUTHORIZATION),
            "sending request"
        );
        if self.log_bodies {
            if let Some(body) = request.body().and_then(reqwest::Body::as_bytes) {
                tracing::debug!(body = %String::from_utf8_lossy(body), "request body");
            }
        }

        let response = self.client.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = status.as_u16(), "received response");
        if self.log_bodies {
            tracing::debug!(body = %body, "response body");
        }

        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(Error::from)
    }

    async fn get<T, U>(&self, path: &str, query: &U) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
        U: serde::ser::Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path)?.query(query);
        self.send(builder).await
    }

    async fn post<T, U>(&self, path: &str, body: &U) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
        U: serde::ser::Serialize + ?Sized,
    {
        let builder = self.request(Method::POST, path)?.json(body);
        self.send(builder).await
    }

    /// Logs in with a JSON body posted to `members/login`.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or the response cannot be
    /// decoded. A response without a token is not an error.
    pub async fn login_members(&self, request: &LoginRequest) -> Result<LoginResponse, Error> {
        self.post(LoginBinding::Members.path(), request).await
    }

    /// Logs in with a JSON body posted to `login`.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or the response cannot be
    /// decoded. A response without a token is not an error.
    pub async fn login_json(&self, request: &LoginRequest) -> Result<LoginResponse, Error> {
        self.post(LoginBinding::Json.path(), request).await
    }

    /// Logs in with form fields `username` and `password` posted to `token`.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or the response cannot be
    /// decoded. A response without a token is not an error.
    pub async fn login_form(&self, username: &str, password: &str) -> Result<LoginResponse, Error> {
        let builder = self
            .request(Method::POST, LoginBinding::Form.path())?
            .form(&[("username", username), ("password", password)]);
        self.send(builder).await
    }

    /// Logs in through the chosen binding.
    ///
    /// The form binding sends `username`, or `email` when no username is set.
    /// Missing credentials are sent as empty fields.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or the response cannot be
    /// decoded.
    pub async fn login(
        &self,
        binding: LoginBinding,
        request: &LoginRequest,
    ) -> Result<LoginResponse, Error> {
        match binding {
            LoginBinding::Members => self.login_members(request).await,
            LoginBinding::Json => self.login_json(request).await,
            LoginBinding::Form => {
                let username = request
                    .username
                    .as_deref()
                    .or(request.email.as_deref())
                    .unwrap_or_default();
                let password = request.password.as_deref().unwrap_or_default();
                self.login_form(username, password).await
            }
        }
    }

    /// Retrieves fatigue records for a user, optionally bounded by time.
    ///
    /// # Arguments
    /// * `authorization` - Full `Authorization` header value, see [`bearer`]
    /// * `user_id` - Owner of the records
    /// * `start_ms` / `end_ms` - Unix millisecond bounds
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or response cannot be parsed.
    pub async fn get_records(
        &self,
        authorization: Option<&str>,
        user_id: Option<&str>,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
    ) -> Result<Vec<FatigueDto>, Error> {
        let query: Vec<(&str, String)> = vec![
            user_id.map(|u| ("user_id", u.to_string())),
            start_ms.map(|s| ("start_ms", s.to_string())),
            end_ms.map(|e| ("end_ms", e.to_string())),
        ]
        .into_iter()
        .flatten()
        .collect();

        let mut builder = self.request(Method::GET, "driving_records")?.query(&query);
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        self.send(builder).await
    }

    /// Uploads one fatigue record.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or response cannot be parsed.
    pub async fn post_record(
        &self,
        authorization: Option<&str>,
        record: &FatigueDto,
    ) -> Result<FatigueDto, Error> {
        self.post_with_authorization(authorization, record).await
    }

    /// Uploads a batch of fatigue records in one request.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or response cannot be parsed.
    pub async fn post_records(
        &self,
        authorization: Option<&str>,
        records: &[FatigueDto],
    ) -> Result<Vec<FatigueDto>, Error> {
        self.post_with_authorization(authorization, records).await
    }

    async fn post_with_authorization<T, U>(
        &self,
        authorization: Option<&str>,
        body: &U,
    ) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
        U: serde::ser::Serialize + ?Sized,
    {
        let mut builder = self.request(Method::POST, "driving_records")?.json(body);
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        self.send(builder).await
    }

    /// Retrieves the driving records of a member.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or response cannot be parsed.
    pub async fn get_driving_records(&self, member_id: i64) -> Result<Vec<DrivingRecordDto>, Error> {
        self.get("driving_records", &[("member_id", member_id)]).await
    }

    /// Stores a driving record.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or response cannot be parsed.
    pub async fn post_driving_record(
        &self,
        record: &DrivingRecordDto,
    ) -> Result<DrivingRecordDto, Error> {
        self.post("driving_records", record).await
    }

    /// Retrieves all members.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or response cannot be parsed.
    pub async fn get_members(&self) -> Result<Vec<MemberDto>, Error> {
        self.get("members", &()).await
    }

    /// Liveness probe against the origin root, `GET /`.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or response cannot be parsed.
    pub async fn root(&self) -> Result<RootResponse, Error> {
        self.get("/", &()).await
    }
}
