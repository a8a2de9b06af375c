//! FortiManager JSON-RPC envelope construction and parsing.
//!
//! The appliance speaks a JSON-RPC dialect where every request carries one
//! of six verbs (`get`, `add`, `set`, `update`, `delete`, `exec`) and a
//! `params` array whose single entry holds the endpoint `url` plus any
//! verb-specific fields. Responses mirror that shape: `result[0].status`
//! carries the status code checked by the client, `result[0].data` the
//! payload. Building and parsing the envelope is pure, so it is tested
//! here without any transport.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{FmgError, Result};

/// Request verbs understood by the FortiManager JSON-RPC endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Add,
    Set,
    Update,
    Delete,
    Exec,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Add => "add",
            Method::Set => "set",
            Method::Update => "update",
            Method::Delete => "delete",
            Method::Exec => "exec",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build one request envelope.
///
/// `extra` is merged into the single `params` entry next to `url`; a
/// session id is attached at the top level when present (token-based auth
/// rides in an HTTP header instead and passes `None`).
pub fn build_request(
    id: u64,
    method: Method,
    url: &str,
    extra: Map<String, Value>,
    session: Option<&str>,
) -> Value {
    let mut params = Map::new();
    params.insert("url".to_string(), Value::String(url.to_string()));
    for (key, value) in extra {
        params.insert(key, value);
    }

    let mut body = Map::new();
    body.insert("id".to_string(), Value::from(id));
    body.insert(
        "method".to_string(),
        Value::String(method.as_str().to_string()),
    );
    body.insert("params".to_string(), Value::Array(vec![Value::Object(params)]));
    if let Some(session) = session {
        body.insert("session".to_string(), Value::String(session.to_string()));
    }

    Value::Object(body)
}

/// Decoded `result[0]` of a response envelope.
#[derive(Debug, Clone)]
pub struct RpcResult {
    pub code: i64,
    pub message: String,
    pub url: Option<String>,
    pub data: Option<Value>,
    /// Session id echoed at the envelope top level (login responses).
    pub session: Option<String>,
}

impl RpcResult {
    /// Turn a non-zero status into the typed error, otherwise hand back the
    /// payload (`Null` when the appliance returned none).
    pub fn into_data(self) -> Result<Value> {
        if self.code != 0 {
            return Err(FmgError::from_status(
                self.code,
                &self.message,
                self.url.as_deref(),
            ));
        }
        Ok(self.data.unwrap_or(Value::Null))
    }
}

#[derive(Deserialize)]
struct Envelope {
    result: Option<Vec<ResultEntry>>,
    session: Option<String>,
}

#[derive(Deserialize)]
struct ResultEntry {
    status: Option<Status>,
    url: Option<String>,
    data: Option<Value>,
}

#[derive(Deserialize)]
struct Status {
    code: i64,
    message: Option<String>,
}

/// Parse a response envelope down to its first result entry.
pub fn parse_response(body: Value) -> Result<RpcResult> {
    let envelope: Envelope = serde_json::from_value(body)?;

    let mut results = envelope
        .result
        .ok_or_else(|| FmgError::Protocol("response is missing 'result'".to_string()))?;
    if results.is_empty() {
        return Err(FmgError::Protocol("response 'result' is empty".to_string()));
    }
    let entry = results.swap_remove(0);

    let status = entry
        .status
        .ok_or_else(|| FmgError::Protocol("result entry is missing 'status'".to_string()))?;

    Ok(RpcResult {
        code: status.code,
        message: status.message.unwrap_or_default(),
        url: entry.url,
        data: entry.data,
        session: envelope.session,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_request_merges_extra_params() {
        let mut extra = Map::new();
        extra.insert("loadsub".to_string(), json!(0));
        extra.insert("fields".to_string(), json!(["name", "desc"]));

        let body = build_request(7, Method::Get, "/dvmdb/adom", extra, Some("abc123"));

        assert_eq!(body["id"], json!(7));
        assert_eq!(body["method"], json!("get"));
        assert_eq!(body["session"], json!("abc123"));
        assert_eq!(body["params"][0]["url"], json!("/dvmdb/adom"));
        assert_eq!(body["params"][0]["loadsub"], json!(0));
        assert_eq!(body["params"][0]["fields"], json!(["name", "desc"]));
    }

    #[test]
    fn build_request_omits_session_for_token_auth() {
        let body = build_request(1, Method::Exec, "/sys/status", Map::new(), None);
        assert!(body.get("session").is_none());
    }

    #[test]
    fn parse_response_extracts_data_and_session() {
        let body = json!({
            "id": 1,
            "result": [{
                "status": {"code": 0, "message": "OK"},
                "url": "/sys/status",
                "data": {"Version": "v7.6.5"}
            }],
            "session": "deadbeef"
        });

        let result = parse_response(body).expect("well-formed envelope");
        assert_eq!(result.code, 0);
        assert_eq!(result.session.as_deref(), Some("deadbeef"));
        let data = result.into_data().expect("status 0");
        assert_eq!(data["Version"], json!("v7.6.5"));
    }

    #[test]
    fn parse_response_maps_error_status() {
        let body = json!({
            "id": 2,
            "result": [{
                "status": {"code": -6, "message": "datasrc duplicate"},
                "url": "/pm/config/adom/root/obj/firewall/address"
            }]
        });

        let err = parse_response(body)
            .expect("envelope parses")
            .into_data()
            .expect_err("status -6 is an error");
        assert!(err.is_duplicate());
        assert!(err.to_string().contains("datasrc duplicate"));
    }

    #[test]
    fn parse_response_rejects_missing_result() {
        let err = parse_response(json!({"id": 3})).expect_err("no result array");
        assert!(matches!(err, FmgError::Protocol(_)));
    }

    #[test]
    fn parse_response_rejects_missing_status() {
        let body = json!({"id": 4, "result": [{"url": "/sys/status"}]});
        let err = parse_response(body).expect_err("no status");
        assert!(matches!(err, FmgError::Protocol(_)));
    }
}
