use crate::decode::Fields;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

// =============================================================================
// ACCEPTED KEYS - Primary name first, then aliases in priority order
// =============================================================================

/// Key tables for the alias-tolerant response types.
///
/// Order is significant: the first key present in a payload wins. Some tables
/// list a less canonical name first (`email` before `username` for the login
/// account); that order matches what deployed backends rely on.
pub mod keys {
    use crate::decode::Keys;

    pub const ACCESS_TOKEN: Keys = &["access_token", "token", "jwt", "accessToken", "access-token"];
    pub const REFRESH_TOKEN: Keys = &["refresh_token", "refreshToken", "refresh-token"];
    pub const USER_ID: Keys = &["user_id", "member_id", "id", "uid"];
    pub const ACCOUNT: Keys = &["email", "username", "account"];
    pub const SUCCESS: Keys = &["success", "ok"];

    pub const MEMBER_ID: Keys = &["id", "member_id"];
    pub const MEMBER_EMAIL: Keys = &["email", "mail"];
    pub const MEMBER_NAME: Keys = &["name", "username", "account"];

    pub const ROOT_MESSAGE: Keys = &["message", "msg"];
    pub const ROOT_STATUS: Keys = &["status", "ok"];
    pub const ROOT_VERSION: Keys = &["version", "ver"];
    pub const ROOT_TIME: Keys = &["time", "timestamp", "ts"];
    pub const ROOT_SUCCESS: Keys = &["success"];
}

fn decode_with<'de, D, T>(
    deserializer: D,
    resolve: impl FnOnce(&Fields) -> Result<T, serde_json::Error>,
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
{
    let fields = Fields::deserialize(deserializer)?;
    resolve(&fields).map_err(D::Error::custom)
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

/// Credentials for any of the login bindings. Fill whichever of `email` or
/// `username` the backend expects; unset fields are left out of the body.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl LoginRequest {
    /// Creates a request carrying only a password.
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Adds an email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Adds a username
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Result of a login call.
///
/// Every field is optional: a 200 response without any token key decodes
/// successfully with `access_token == None`, and deciding that this means
/// "login failed" is up to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Account name, serialized under its primary key `email`
    #[serde(rename = "email", skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl LoginResponse {
    fn from_fields(fields: &Fields) -> Result<Self, serde_json::Error> {
        Ok(Self {
            access_token: fields.get(keys::ACCESS_TOKEN)?,
            refresh_token: fields.get(keys::REFRESH_TOKEN)?,
            user_id: fields.get(keys::USER_ID)?,
            account: fields.get(keys::ACCOUNT)?,
            success: fields.get(keys::SUCCESS)?,
        })
    }

    /// The resolved access token, if one was sent and it is not empty.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|token| !token.is_empty())
    }

    #[must_use]
    pub const fn user_id_or_none(&self) -> Option<i64> {
        self.user_id
    }
}

impl<'de> Deserialize<'de> for LoginResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        decode_with(deserializer, Self::from_fields)
    }
}

/// The three login contracts the backend has been seen to expose.
///
/// Nothing probes which one a given deployment supports; the caller picks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginBinding {
    /// JSON body to `members/login`
    #[default]
    Members,
    /// JSON body to `login`
    Json,
    /// Form-encoded `username`/`password` to `token`
    Form,
}

impl LoginBinding {
    /// Canonical names accepted by `FromStr`.
    pub const VALUES: [&'static str; 3] = ["members", "json", "form"];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Members => "members",
            Self::Json => "json",
            Self::Form => "form",
        }
    }

    /// Path of the endpoint, relative to the base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Members => "members/login",
            Self::Json => "login",
            Self::Form => "token",
        }
    }
}

impl std::fmt::Display for LoginBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct LoginBindingParseError {
    value: String,
}

impl std::fmt::Display for LoginBindingParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid login binding '{}'; expected one of: {}",
            self.value,
            LoginBinding::VALUES.join(", ")
        )
    }
}

impl std::error::Error for LoginBindingParseError {}

impl std::str::FromStr for LoginBinding {
    type Err = LoginBindingParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "members" | "members/login" => Ok(Self::Members),
            "json" | "login" => Ok(Self::Json),
            "form" | "token" => Ok(Self::Form),
            _ => Err(LoginBindingParseError {
                value: value.to_string(),
            }),
        }
    }
}

// =============================================================================
// MEMBERS & HEALTH
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemberDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MemberDto {
    fn from_fields(fields: &Fields) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: fields.get(keys::MEMBER_ID)?,
            email: fields.get(keys::MEMBER_EMAIL)?,
            name: fields.get(keys::MEMBER_NAME)?,
        })
    }

    #[must_use]
    pub const fn id_or_zero(&self) -> i64 {
        match self.id {
            Some(id) => id,
            None => 0,
        }
    }
}

impl<'de> Deserialize<'de> for MemberDto {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        decode_with(deserializer, Self::from_fields)
    }
}

/// Health/info payload returned by `GET /`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RootResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Free-form status such as "ok", "healthy" or "UP". A boolean `ok`
    /// flag is rendered as "true"/"false".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Server time as a Unix epoch value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl RootResponse {
    fn from_fields(fields: &Fields) -> Result<Self, serde_json::Error> {
        Ok(Self {
            message: fields.get(keys::ROOT_MESSAGE)?,
            status: fields.get_text(keys::ROOT_STATUS)?,
            version: fields.get(keys::ROOT_VERSION)?,
            time: fields.get(keys::ROOT_TIME)?,
            success: fields.get(keys::ROOT_SUCCESS)?,
        })
    }
}

impl<'de> Deserialize<'de> for RootResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        decode_with(deserializer, Self::from_fields)
    }
}

// =============================================================================
// TELEMETRY RECORDS
// =============================================================================

/// Fatigue band derived from a detection score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatigueLevel {
    Normal,
    Elevated,
    HighRisk,
}

impl FatigueLevel {
    /// Bands a score after rounding it to the nearest integer:
    /// 70 and above is high risk, 30 and above is elevated.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        let rounded = score.round();
        if rounded >= 70.0 {
            Self::HighRisk
        } else if rounded >= 30.0 {
            Self::Elevated
        } else {
            Self::Normal
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Elevated => "elevated",
            Self::HighRisk => "high_risk",
        }
    }
}

impl std::fmt::Display for FatigueLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decodes a JSON `null` the same way as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn millis_to_datetime(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

/// A fatigue detection uploaded by the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FatigueDto {
    /// Server-side identifier, absent before the first upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Detection score, 0 to 100
    #[serde(default, deserialize_with = "null_as_default")]
    pub score: f64,
    /// Fatigue level label as produced by the detector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Source device label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Detection time in Unix milliseconds, 0 if unknown
    #[serde(default, deserialize_with = "null_as_default")]
    pub detected_at: i64,
    /// Record creation time in Unix milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub synced: bool,
}

impl FatigueDto {
    /// Creates an unsynced record for the given score and detection time.
    #[must_use]
    pub fn new(score: f64, detected_at: i64) -> Self {
        Self {
            score,
            detected_at,
            ..Self::default()
        }
    }

    /// Detection time when known, otherwise the creation time, otherwise 0.
    #[must_use]
    pub fn effective_timestamp_ms(&self) -> i64 {
        if self.detected_at != 0 {
            self.detected_at
        } else {
            self.timestamp_ms.unwrap_or(0)
        }
    }

    #[must_use]
    pub fn effective_time(&self) -> Option<OffsetDateTime> {
        millis_to_datetime(self.effective_timestamp_ms())
    }

    #[must_use]
    pub fn fatigue_level(&self) -> FatigueLevel {
        FatigueLevel::from_score(self.score)
    }
}

/// A driving record stored per member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrivingRecordDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub member_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatigue_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Recording time in Unix milliseconds
    #[serde(default, deserialize_with = "null_as_default")]
    pub recorded_at: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub synced: bool,
}

impl DrivingRecordDto {
    #[must_use]
    pub fn new(member_id: i64, score: f64, recorded_at: i64) -> Self {
        Self {
            member_id,
            score,
            recorded_at,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn recorded_time(&self) -> Option<OffsetDateTime> {
        millis_to_datetime(self.recorded_at)
    }

    #[must_use]
    pub fn fatigue_level(&self) -> FatigueLevel {
        FatigueLevel::from_score(self.score)
    }
}
