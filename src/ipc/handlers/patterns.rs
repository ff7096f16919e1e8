use crate::error::{GradebookError, GradebookResult};
use crate::gradebook::Gradebook;
use crate::ipc::error::respond;
use crate::ipc::helpers::{get_components, get_optional_str, get_required_str, get_string_list};
use crate::ipc::types::Request;
use serde_json::{json, Value};

fn patterns_list(book: &mut Gradebook) -> Value {
    let patterns: Vec<Value> = book
        .setup()
        .patterns()
        .iter()
        .map(|(name, components)| json!({ "name": name, "components": components }))
        .collect();
    json!({ "patterns": patterns })
}

fn patterns_save(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let name = get_required_str(&req.params, "name")?;
    let components = get_components(&req.params)?;
    book.save_pattern(&name, components)?;
    Ok(patterns_list(book))
}

fn patterns_delete(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let name = get_required_str(&req.params, "name")?;
    let deleted = book.delete_pattern(&name);
    Ok(json!({ "deleted": deleted }))
}

fn patterns_apply(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let subjects = get_string_list(&req.params, "subjects")?;
    let components = match (get_optional_str(&req.params, "pattern"), req.params.get("components")) {
        (Some(name), None) => book.saved_pattern(&name)?,
        (None, Some(_)) => get_components(&req.params)?,
        (Some(_), Some(_)) => {
            return Err(GradebookError::bad_params(
                "give either a saved pattern name or inline components, not both",
            ))
        }
        (None, None) => return Err(GradebookError::bad_params("missing pattern or components[]")),
    };
    let outcome = book.apply_pattern(&subjects, &components)?;
    Ok(json!({
        "removed": outcome.removed,
        "added": outcome.added,
        "subjects": book.setup().subjects()
    }))
}

pub fn try_handle(book: &mut Gradebook, req: &Request) -> Option<Value> {
    let outcome = match req.method.as_str() {
        "patterns.list" => Ok(patterns_list(book)),
        "patterns.save" => patterns_save(book, req),
        "patterns.delete" => patterns_delete(book, req),
        "patterns.apply" => patterns_apply(book, req),
        _ => return None,
    };
    Some(respond(&req.id, outcome))
}
