//! Alias-tolerant field resolution for backend payloads.
//!
//! The backend has shipped several spellings for the same attribute over
//! time. Each logical field declares its accepted keys, primary name first,
//! and the first key present in the payload supplies the value. A missing
//! field is `None`, never an error; a present field with the wrong JSON type
//! is a decode error.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Accepted key names for one logical attribute, in priority order.
pub type Keys = &'static [&'static str];

/// A decoded JSON object awaiting per-field resolution.
#[derive(Debug, Default)]
pub struct Fields {
    object: Map<String, Value>,
}

impl Fields {
    #[must_use]
    pub const fn new(object: Map<String, Value>) -> Self {
        Self { object }
    }

    /// Returns the first accepted key holding a non-null value, with that value.
    #[must_use]
    pub fn lookup(&self, keys: Keys) -> Option<(&'static str, &Value)> {
        keys.iter().find_map(|key| match self.object.get(*key) {
            None | Some(Value::Null) => None,
            Some(value) => Some((*key, value)),
        })
    }

    /// Resolves a field and deserializes it into `T`.
    ///
    /// # Errors
    /// Returns an error if the resolved value does not have the shape of `T`.
    pub fn get<T: DeserializeOwned>(&self, keys: Keys) -> Result<Option<T>, serde_json::Error> {
        self.lookup(keys)
            .map(|(key, value)| {
                T::deserialize(value)
                    .map_err(|err| serde_json::Error::custom(format!("field `{key}`: {err}")))
            })
            .transpose()
    }

    /// Resolves a field as text, rendering booleans and numbers in their
    /// JSON form.
    ///
    /// # Errors
    /// Returns an error if the resolved value is an array or an object.
    pub fn get_text(&self, keys: Keys) -> Result<Option<String>, serde_json::Error> {
        self.lookup(keys)
            .map(|(key, value)| match value {
                Value::String(text) => Ok(text.clone()),
                Value::Bool(flag) => Ok(flag.to_string()),
                Value::Number(number) => Ok(number.to_string()),
                Value::Array(_) | Value::Object(_) | Value::Null => Err(serde_json::Error::custom(
                    format!("field `{key}`: expected a string, found {value}"),
                )),
            })
            .transpose()
    }
}

impl<'de> Deserialize<'de> for Fields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::new)
    }
}
