use crate::error::{GradebookError, GradebookResult};
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn from_domain(id: &str, e: &GradebookError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), e.details())
}

pub fn respond(id: &str, outcome: GradebookResult<serde_json::Value>) -> serde_json::Value {
    match outcome {
        Ok(result) => ok(id, result),
        Err(e) => from_domain(id, &e),
    }
}
