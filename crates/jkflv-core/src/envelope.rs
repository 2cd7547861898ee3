//! Upstream response envelope normalization.
//!
//! The content API has answered with three different outer shapes over its
//! lifetime, and any endpoint may still return any of them:
//!
//! ```text
//! { "result_code": 200, "data": { ... }, "msg": "..." }   numeric status
//! { "msg": "succeed", "data": { ... } }                   message string
//! { "error": "not found" }                                error only
//! { ... }                                                 raw payload
//! ```
//!
//! [`normalize`] folds all of them into a [`ContentEnvelope`] so downstream
//! code matches on one tagged union instead of probing JSON fields.

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Message used when the payload is not a JSON object at all.
pub const INVALID_PAYLOAD: &str = "invalid payload";

/// Message used when a failing envelope carries no message of its own.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Canonical upstream result: either a payload or an error message, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentEnvelope {
    /// The origin reported success. The payload may be `null` when the
    /// envelope signalled success without a `data` field.
    Ok(Value),
    /// The origin was unreachable, timed out, or reported a failure.
    Err(String),
}

impl ContentEnvelope {
    /// Build a failed envelope.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Err(message.into())
    }

    /// Whether the origin reported success.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Borrow the payload of a successful envelope.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Ok(data) => Some(data),
            Self::Err(_) => None,
        }
    }

    /// Borrow the message of a failed envelope.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Err(message) => Some(message),
        }
    }

    /// Convert into a standard `Result`.
    pub fn into_result(self) -> std::result::Result<Value, String> {
        match self {
            Self::Ok(data) => Ok(data),
            Self::Err(message) => Err(message),
        }
    }
}

/// Wire form: `{ "ok": bool, "data": JSON|null, "errorMessage": string|null }`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeWire<'a> {
    ok: bool,
    data: Option<&'a Value>,
    error_message: Option<&'a str>,
}

impl Serialize for ContentEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        EnvelopeWire {
            ok: self.is_ok(),
            data: self.data(),
            error_message: self.error_message(),
        }
        .serialize(serializer)
    }
}

/// Normalize any upstream JSON value into a [`ContentEnvelope`].
///
/// Probes the envelope conventions in order: `result_code`, then `msg`, then
/// `error`. Anything else is treated as a bare payload. Fields holding JSON
/// `null` count as absent. Non-object input yields [`INVALID_PAYLOAD`].
pub fn normalize(raw: &Value) -> ContentEnvelope {
    let Some(obj) = raw.as_object() else {
        return ContentEnvelope::failure(INVALID_PAYLOAD);
    };

    let field = |name: &str| obj.get(name).filter(|v| !v.is_null());

    if let Some(code) = field("result_code") {
        if result_code_is_success(code) {
            return ContentEnvelope::Ok(field("data").cloned().unwrap_or(Value::Null));
        }
        let message = field("msg").map(text_of).unwrap_or_else(|| UNKNOWN_ERROR.to_string());
        return ContentEnvelope::Err(message);
    }

    if let Some(msg) = field("msg") {
        if msg.as_str() == Some("succeed") {
            return ContentEnvelope::Ok(field("data").cloned().unwrap_or(Value::Null));
        }
        return ContentEnvelope::Err(text_of(msg));
    }

    if let Some(error) = field("error") {
        return ContentEnvelope::Err(text_of(error));
    }

    ContentEnvelope::Ok(raw.clone())
}

/// Parse a raw response body and normalize it.
///
/// Bodies that are not valid JSON yield [`INVALID_PAYLOAD`].
pub fn normalize_bytes(body: &[u8]) -> ContentEnvelope {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => normalize(&value),
        Err(e) => {
            tracing::debug!(error = %e, "upstream body is not JSON");
            ContentEnvelope::failure(INVALID_PAYLOAD)
        }
    }
}

/// `result_code` is a number on most endpoints but a string on a few.
fn result_code_is_success(code: &Value) -> bool {
    match code {
        Value::Number(n) => n.as_u64() == Some(200),
        Value::String(s) => s.trim() == "200",
        _ => false,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::String(_) => UNKNOWN_ERROR.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({ "anime": { "id": 42, "name": "Demo" } })
    }

    // =========================================================================
    // Envelope shapes
    // =========================================================================

    #[test]
    fn test_equivalent_success_shapes_normalize_identically() {
        let numeric = json!({ "result_code": 200, "data": payload(), "msg": "ok" });
        let message = json!({ "msg": "succeed", "data": payload() });
        let raw = payload();

        let expected = ContentEnvelope::Ok(payload());
        assert_eq!(normalize(&numeric), expected);
        assert_eq!(normalize(&message), expected);
        assert_eq!(normalize(&raw), expected);
    }

    #[test]
    fn test_equivalent_failure_shapes_normalize_identically() {
        let numeric = json!({ "result_code": 404, "msg": "anime not found" });
        let message = json!({ "msg": "anime not found" });
        let error = json!({ "error": "anime not found" });

        let expected = ContentEnvelope::failure("anime not found");
        assert_eq!(normalize(&numeric), expected);
        assert_eq!(normalize(&message), expected);
        assert_eq!(normalize(&error), expected);
    }

    #[test]
    fn test_result_code_failure_without_message() {
        let raw = json!({ "result_code": 500 });
        assert_eq!(normalize(&raw), ContentEnvelope::failure(UNKNOWN_ERROR));
    }

    #[test]
    fn test_result_code_as_string() {
        let raw = json!({ "result_code": "200", "data": [1, 2] });
        assert_eq!(normalize(&raw), ContentEnvelope::Ok(json!([1, 2])));
    }

    #[test]
    fn test_result_code_takes_precedence_over_msg() {
        // A failing numeric status wins even if msg says "succeed".
        let raw = json!({ "result_code": 503, "msg": "succeed", "data": {} });
        assert_eq!(normalize(&raw), ContentEnvelope::failure("succeed"));
    }

    #[test]
    fn test_success_without_data_is_null_payload() {
        let raw = json!({ "msg": "succeed" });
        assert_eq!(normalize(&raw), ContentEnvelope::Ok(Value::Null));
    }

    #[test]
    fn test_null_fields_count_as_absent() {
        let raw = json!({ "error": null, "items": [1] });
        assert_eq!(normalize(&raw), ContentEnvelope::Ok(raw.clone()));
    }

    #[test]
    fn test_non_string_error_is_stringified() {
        let raw = json!({ "error": { "code": 7 } });
        assert_eq!(normalize(&raw), ContentEnvelope::failure(r#"{"code":7}"#));
    }

    // =========================================================================
    // Malformed input
    // =========================================================================

    #[test]
    fn test_non_object_is_invalid_payload() {
        for raw in [json!(null), json!(3), json!("text"), json!([1, 2, 3]), json!(true)] {
            assert_eq!(normalize(&raw), ContentEnvelope::failure(INVALID_PAYLOAD));
        }
    }

    #[test]
    fn test_normalize_bytes_rejects_garbage() {
        assert_eq!(
            normalize_bytes(b"<html>502 Bad Gateway</html>"),
            ContentEnvelope::failure(INVALID_PAYLOAD)
        );
        assert_eq!(normalize_bytes(b""), ContentEnvelope::failure(INVALID_PAYLOAD));
    }

    #[test]
    fn test_normalize_bytes_parses_json() {
        let env = normalize_bytes(br#"{"msg":"succeed","data":{"x":1}}"#);
        assert_eq!(env.data(), Some(&json!({ "x": 1 })));
    }

    // =========================================================================
    // Accessors and wire form
    // =========================================================================

    #[test]
    fn test_accessors_are_exclusive() {
        let ok = ContentEnvelope::Ok(json!(1));
        assert!(ok.is_ok());
        assert!(ok.error_message().is_none());

        let err = ContentEnvelope::failure("timeout");
        assert!(!err.is_ok());
        assert!(err.data().is_none());
        assert_eq!(err.error_message(), Some("timeout"));
        assert_eq!(err.into_result(), Err("timeout".to_string()));
    }

    #[test]
    fn test_serialized_wire_form() {
        let ok = serde_json::to_value(ContentEnvelope::Ok(json!({ "a": 1 }))).unwrap();
        assert_eq!(ok, json!({ "ok": true, "data": { "a": 1 }, "errorMessage": null }));

        let err = serde_json::to_value(ContentEnvelope::failure("boom")).unwrap();
        assert_eq!(err, json!({ "ok": false, "data": null, "errorMessage": "boom" }));
    }
}
