use crate::error::GradebookResult;
use crate::gradebook::Gradebook;
use crate::ipc::error::respond;
use crate::ipc::helpers::{get_max_marks, get_optional_str, get_required_str};
use crate::ipc::types::Request;
use serde_json::{json, Value};

fn setup_snapshot(book: &Gradebook) -> Value {
    let setup = book.setup();
    json!({
        "subjects": setup.subjects(),
        "exams": setup.exams(),
        "maxMarks": setup.max_marks(),
    })
}

fn subjects_add(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let name = get_required_str(&req.params, "name")?;
    let added = book.add_subject(&name)?;
    Ok(json!({ "added": added, "subjects": book.setup().subjects() }))
}

fn subjects_remove(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let name = get_required_str(&req.params, "name")?;
    let removed = book.remove_subject(&name);
    Ok(json!({ "removed": removed, "subjects": book.setup().subjects() }))
}

fn exams_add(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let name = get_required_str(&req.params, "name")?;
    let added = book.add_exam(&name)?;
    Ok(json!({ "added": added, "exams": book.setup().exams() }))
}

fn exams_remove(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let name = get_required_str(&req.params, "name")?;
    let removed = book.remove_exam(&name);
    Ok(json!({ "removed": removed, "exams": book.setup().exams() }))
}

fn max_marks_get(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let exam = get_required_str(&req.params, "exam")?;
    match get_optional_str(&req.params, "subject") {
        Some(subject) => Ok(json!({
            "exam": exam,
            "subject": subject,
            "max": book.setup().get_max(&exam, &subject)
        })),
        None => Ok(json!({
            "exam": exam,
            "table": book.setup().max_marks().exam(&exam)
        })),
    }
}

fn max_marks_set_default(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let exam = get_required_str(&req.params, "exam")?;
    let value = get_max_marks(&req.params, "value")?;
    book.set_default_max(&exam, value)?;
    Ok(json!({ "exam": exam, "default": value }))
}

fn max_marks_set_subject(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let exam = get_required_str(&req.params, "exam")?;
    let subject = get_required_str(&req.params, "subject")?;
    let value = get_max_marks(&req.params, "value")?;
    book.set_subject_max(&exam, &subject, value)?;
    Ok(json!({ "exam": exam, "subject": subject, "max": value }))
}

fn max_marks_clear_subject(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let exam = get_required_str(&req.params, "exam")?;
    let subject = get_required_str(&req.params, "subject")?;
    let cleared = book.clear_subject_max(&exam, &subject)?;
    Ok(json!({
        "cleared": cleared,
        "max": book.setup().get_max(&exam, &subject)
    }))
}

pub fn try_handle(book: &mut Gradebook, req: &Request) -> Option<Value> {
    let outcome = match req.method.as_str() {
        "setup.get" => Ok(setup_snapshot(book)),
        "setup.subjects.add" => subjects_add(book, req),
        "setup.subjects.remove" => subjects_remove(book, req),
        "setup.exams.add" => exams_add(book, req),
        "setup.exams.remove" => exams_remove(book, req),
        "setup.maxMarks.get" => max_marks_get(book, req),
        "setup.maxMarks.setDefault" => max_marks_set_default(book, req),
        "setup.maxMarks.setSubject" => max_marks_set_subject(book, req),
        "setup.maxMarks.clearSubject" => max_marks_clear_subject(book, req),
        _ => return None,
    };
    Some(respond(&req.id, outcome))
}
