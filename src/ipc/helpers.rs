use crate::error::{GradebookError, GradebookResult};
use crate::setup::{self, PatternComponent};
use serde_json::{json, Value};

pub fn get_required_str(params: &Value, key: &str) -> GradebookResult<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GradebookError::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Cell text is taken as-is; `null` or a missing value clears the cell.
pub fn get_cell_value(params: &Value) -> GradebookResult<String> {
    match params.get("value") {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(GradebookError::bad_params_with(
            "value must be a string or number",
            json!({ "value": other }),
        )),
    }
}

pub fn get_max_marks(params: &Value, key: &str) -> GradebookResult<u32> {
    let raw = params
        .get(key)
        .ok_or_else(|| GradebookError::bad_params(format!("missing {}", key)))?;
    setup::parse_max_marks(raw)
}

pub fn get_string_list(params: &Value, key: &str) -> GradebookResult<Vec<String>> {
    let arr = params
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| GradebookError::bad_params(format!("missing {}[]", key)))?;
    arr.iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str().map(|s| s.trim().to_string()).ok_or_else(|| {
                GradebookError::bad_params_with(
                    format!("{} entries must be strings", key),
                    json!({ "index": i }),
                )
            })
        })
        .collect()
}

pub fn get_components(params: &Value) -> GradebookResult<Vec<PatternComponent>> {
    let arr = params
        .get("components")
        .and_then(|v| v.as_array())
        .ok_or_else(|| GradebookError::bad_params("missing components[]"))?;
    arr.iter()
        .enumerate()
        .map(|(i, c)| {
            let name = c
                .get("name")
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            if name.is_empty() {
                return Err(GradebookError::bad_params_with(
                    "every component needs a name",
                    json!({ "index": i }),
                ));
            }
            let max = c
                .get("max")
                .ok_or_else(|| {
                    GradebookError::bad_params_with("every component needs a max", json!({ "index": i }))
                })
                .and_then(setup::parse_max_marks)?;
            Ok(PatternComponent { name, max })
        })
        .collect()
}
