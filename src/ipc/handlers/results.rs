use crate::error::{GradebookError, GradebookResult};
use crate::gradebook::Gradebook;
use crate::ipc::error::respond;
use crate::ipc::helpers::{get_optional_str, get_required_str};
use crate::ipc::types::Request;
use crate::results::ResultsStore;
use serde_json::{json, Value};

fn results_load(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let raw = req
        .params
        .get("results")
        .cloned()
        .ok_or_else(|| GradebookError::bad_params("missing results"))?;
    let store = ResultsStore::from_value(raw)?;
    book.load_results(store);
    Ok(json!({ "loaded": true }))
}

fn results_get(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    match get_optional_str(&req.params, "studentId") {
        Some(id) => Ok(json!({
            "studentId": id,
            "results": book.results().student(&id)
        })),
        None => Ok(json!({ "results": book.results() })),
    }
}

fn results_report_card(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let student_id = get_required_str(&req.params, "studentId")?;
    let session = get_required_str(&req.params, "session")?;
    let exam = get_required_str(&req.params, "exam")?;
    let card = book.results().report_card(&student_id, &session, &exam)?;
    Ok(json!(card))
}

pub fn try_handle(book: &mut Gradebook, req: &Request) -> Option<Value> {
    let outcome = match req.method.as_str() {
        "results.load" => results_load(book, req),
        "results.get" => results_get(book, req),
        "results.reportCard" => results_report_card(book, req),
        _ => return None,
    };
    Some(respond(&req.id, outcome))
}
