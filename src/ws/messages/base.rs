//! Frame codec for the WhiteBIT WebSocket API.
//!
//! Every frame is a JSON object. Outbound requests carry an `id` that the
//! exchange echoes back in the matching response; push frames carry
//! `"id": null` and name their channel in `method`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, WhitebitError};

/// WebSocket request frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WsRequest {
    /// Correlation ID, unique within one connection.
    pub id: u64,
    /// The method to call.
    pub method: String,
    /// Request parameters (array or object).
    pub params: Value,
}

impl WsRequest {
    /// Create a new request frame.
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// Reject frames the exchange would never accept.
    pub fn validate(&self) -> Result<(), WhitebitError> {
        if self.method.trim().is_empty() {
            return Err(WhitebitError::InvalidRequest(
                "method parameter is required".into(),
            ));
        }
        if !(self.params.is_array() || self.params.is_object()) {
            return Err(WhitebitError::InvalidRequest(format!(
                "params for `{}` must be an array or object",
                self.method
            )));
        }
        Ok(())
    }

    /// Serialize the frame to its wire text.
    pub fn to_text(&self) -> Result<String, WhitebitError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Response frame correlated to a request by `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct WsResponse {
    /// The request ID this frame answers.
    pub id: u64,
    /// Result data. `Some(Value::Null)` when the frame carries
    /// `"result": null`, `None` when the key is absent.
    #[serde(default, deserialize_with = "present")]
    pub result: Option<Value>,
    /// Error payload (if failed).
    #[serde(default)]
    pub error: Option<ApiError>,
}

impl WsResponse {
    /// Turn the frame into the caller-visible outcome.
    ///
    /// An error payload wins over a result; a frame with neither is a
    /// protocol violation.
    pub fn into_result(self) -> Result<Value, WhitebitError> {
        if let Some(error) = self.error {
            return Err(WhitebitError::Api(error));
        }
        self.result.ok_or_else(|| {
            WhitebitError::Protocol(format!(
                "response {} carries neither result nor error",
                self.id
            ))
        })
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Unsolicited push frame for a channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WsPush {
    /// Channel name.
    pub method: String,
    /// Channel payload.
    #[serde(default)]
    pub params: Value,
}

/// A decoded inbound frame, before it is matched against pending requests.
#[derive(Debug, Clone)]
pub struct InboundFrame {
    value: Value,
}

impl InboundFrame {
    /// Decode a text frame.
    pub fn parse(text: &str) -> Result<Self, WhitebitError> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(WhitebitError::Protocol(format!(
                "expected a JSON object frame, got: {text}"
            )));
        }
        Ok(Self { value })
    }

    /// The correlation ID, if the frame carries a non-null integer `id`.
    pub fn id(&self) -> Option<u64> {
        self.value.get("id").and_then(Value::as_u64)
    }

    /// The channel name, if the frame carries a string `method`.
    pub fn channel(&self) -> Option<&str> {
        self.value.get("method").and_then(Value::as_str)
    }

    /// Interpret the frame as a response to a pending request.
    ///
    /// Malformed responses surface as [`WhitebitError::Protocol`] so the
    /// waiting caller learns about them.
    pub fn into_response(self) -> Result<Value, WhitebitError> {
        let response: WsResponse = serde_json::from_value(self.value)
            .map_err(|e| WhitebitError::Protocol(format!("malformed response frame: {e}")))?;
        response.into_result()
    }

    /// Interpret the frame as a push notification.
    pub fn into_push(self) -> Option<WsPush> {
        serde_json::from_value(self.value).ok()
    }

    /// Borrow the raw JSON.
    pub fn as_value(&self) -> &Value {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let req = WsRequest::new(1, "getOrder", json!({"id": 5}));
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"id": 1, "method": "getOrder", "params": {"id": 5}})
        );
    }

    #[test]
    fn test_request_validation() {
        assert!(WsRequest::new(1, "ping", json!([])).validate().is_ok());
        assert!(matches!(
            WsRequest::new(1, "", json!([])).validate(),
            Err(WhitebitError::InvalidRequest(_))
        ));
        assert!(matches!(
            WsRequest::new(1, "ping", json!("BTC_USDT")).validate(),
            Err(WhitebitError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_response_with_result() {
        let frame = InboundFrame::parse(r#"{"id":1,"result":{"status":"filled"},"error":null}"#)
            .unwrap();
        assert_eq!(frame.id(), Some(1));
        assert_eq!(frame.into_response().unwrap(), json!({"status": "filled"}));
    }

    #[test]
    fn test_response_with_error() {
        let frame =
            InboundFrame::parse(r#"{"id":2,"error":{"code":400,"message":"bad params"}}"#).unwrap();
        match frame.into_response() {
            Err(WhitebitError::Api(err)) => assert_eq!(err, ApiError::new(400, "bad params")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_null_result_is_success() {
        let frame = InboundFrame::parse(r#"{"id":1,"result":null,"error":null}"#).unwrap();
        assert_eq!(frame.into_response().unwrap(), Value::Null);
    }

    #[test]
    fn test_response_without_result_or_error() {
        let frame = InboundFrame::parse(r#"{"id":3}"#).unwrap();
        assert!(matches!(frame.into_response(), Err(WhitebitError::Protocol(_))));
    }

    #[test]
    fn test_malformed_error_payload_is_protocol_error() {
        let frame = InboundFrame::parse(r#"{"id":4,"error":"nope"}"#).unwrap();
        assert!(matches!(frame.into_response(), Err(WhitebitError::Protocol(_))));
    }

    #[test]
    fn test_push_frame() {
        let frame = InboundFrame::parse(
            r#"{"id":null,"method":"lastprice_update","params":["BTC_USDT","9122.1"]}"#,
        )
        .unwrap();
        assert_eq!(frame.id(), None);
        assert_eq!(frame.channel(), Some("lastprice_update"));
        let push = frame.into_push().unwrap();
        assert_eq!(push.params, json!(["BTC_USDT", "9122.1"]));
    }

    #[test]
    fn test_non_object_frame_rejected() {
        assert!(matches!(
            InboundFrame::parse("[1,2,3]"),
            Err(WhitebitError::Protocol(_))
        ));
        assert!(matches!(
            InboundFrame::parse("not json"),
            Err(WhitebitError::Json(_))
        ));
    }
}
