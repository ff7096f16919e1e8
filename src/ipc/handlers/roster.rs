use crate::error::{GradebookError, GradebookResult};
use crate::gradebook::Gradebook;
use crate::ipc::error::respond;
use crate::ipc::helpers::get_optional_str;
use crate::ipc::types::Request;
use crate::roster::Student;
use serde_json::{json, Value};

fn roster_load(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let raw = req
        .params
        .get("students")
        .cloned()
        .ok_or_else(|| GradebookError::bad_params("missing students[]"))?;
    let students: Vec<Student> = serde_json::from_value(raw)
        .map_err(|e| GradebookError::bad_params(format!("invalid students: {e}")))?;
    let count = book.load_roster(students)?;
    Ok(json!({ "studentCount": count }))
}

fn roster_list(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let class = get_optional_str(&req.params, "class");
    let section = get_optional_str(&req.params, "section");
    let students = book.roster().list(class.as_deref(), section.as_deref());
    Ok(json!({ "students": students }))
}

pub fn try_handle(book: &mut Gradebook, req: &Request) -> Option<Value> {
    let outcome = match req.method.as_str() {
        "roster.load" => roster_load(book, req),
        "roster.list" => roster_list(book, req),
        _ => return None,
    };
    Some(respond(&req.id, outcome))
}
