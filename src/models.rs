use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

// A queued unit of work, immutable once enqueued
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub id: u64,
    pub user_id: String,
    pub payload: Value,         // request body as submitted
    pub submitted_at: Instant,  // for queue wait metrics
}

impl TaskDescriptor {
    pub fn new(id: u64, user_id: impl Into<String>, payload: Value) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            payload,
            submitted_at: Instant::now(),
        }
    }
}

// POST /api/v1/task body, parsed leniently
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub user_id: Option<String>,
    pub payload: Value,
}

impl SubmitRequest {
    /// Anything that is not a JSON object counts as a body without `user_id`.
    pub fn from_body(body: &[u8]) -> Self {
        let payload: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
        let user_id = payload.get("user_id").and_then(user_id_from_value);
        Self { user_id, payload }
    }
}

// Non-empty strings and non-zero numbers are identifiers, everything else is missing.
// Numbers become their decimal text, so 7 and "7" name the same user.
fn user_id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

// Response body for every task endpoint outcome
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_user_id() {
        let req = SubmitRequest::from_body(br#"{"user_id":"u1","job":"resize"}"#);
        assert_eq!(req.user_id.as_deref(), Some("u1"));
        assert_eq!(req.payload["job"], "resize");
    }

    #[test]
    fn test_numeric_user_id_is_normalized() {
        let req = SubmitRequest::from_body(br#"{"user_id":42}"#);
        assert_eq!(req.user_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_falsy_user_ids_are_missing() {
        for body in [
            json!({}),
            json!({"user_id": ""}),
            json!({"user_id": 0}),
            json!({"user_id": null}),
            json!({"user_id": false}),
            json!({"user_id": ["u1"]}),
        ] {
            let req = SubmitRequest::from_body(body.to_string().as_bytes());
            assert!(req.user_id.is_none(), "body {body}");
        }
    }

    #[test]
    fn test_number_and_numeric_string_share_a_user() {
        let numeric = SubmitRequest::from_body(br#"{"user_id":7}"#);
        let text = SubmitRequest::from_body(br#"{"user_id":"7"}"#);
        assert_eq!(numeric.user_id, text.user_id);
    }

    #[test]
    fn test_non_scalar_and_boolean_ids_are_missing() {
        for body in [json!({"user_id": true}), json!({"user_id": {"id": "u1"}})] {
            let req = SubmitRequest::from_body(body.to_string().as_bytes());
            assert!(req.user_id.is_none(), "body {body}");
        }
    }

    #[test]
    fn test_invalid_json_is_missing_user_id() {
        assert!(SubmitRequest::from_body(b"user_id=u1").user_id.is_none());
        assert!(SubmitRequest::from_body(b"").user_id.is_none());
        assert!(SubmitRequest::from_body(b"\"u1\"").user_id.is_none());
    }
}
