//! Serde helpers for WhiteBIT's loosely typed payloads.

/// Lenient optional field: a value of the wrong shape becomes `None`.
///
/// The field is buffered as a JSON value first, so a malformed nested object
/// is skipped whole and the rest of the frame still decodes.
///
/// # Example
///
/// ```rust
/// use serde::Deserialize;
/// use rust_decimal::Decimal;
/// use whitebit_api_client::types::serde_helpers::default_on_error;
///
/// #[derive(Deserialize, Debug)]
/// struct Stats {
///     #[serde(deserialize_with = "default_on_error::deserialize", default)]
///     close: Option<Decimal>,
///     last: String,
/// }
///
/// let stats: Stats = serde_json::from_str(r#"{"close":{"bad":[1]},"last":"2"}"#).unwrap();
/// assert!(stats.close.is_none());
/// ```
pub mod default_on_error {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: DeserializeOwned,
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(serde_json::from_value(value).ok())
    }
}

/// `""` and `null` both mean "absent".
///
/// Webhook payloads send `""` for a missing memo or description.
///
/// # Example
///
/// ```rust
/// use serde::Deserialize;
/// use whitebit_api_client::types::serde_helpers::empty_string_as_none;
///
/// #[derive(Deserialize, Debug)]
/// struct Transfer {
///     #[serde(deserialize_with = "empty_string_as_none::deserialize", default)]
///     memo: Option<String>,
/// }
///
/// let transfer: Transfer = serde_json::from_str(r#"{"memo":""}"#).unwrap();
/// assert!(transfer.memo.is_none());
/// ```
pub mod empty_string_as_none {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
    }
}
