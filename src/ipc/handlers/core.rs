use crate::gradebook::Gradebook;
use crate::ipc::error::ok;
use crate::ipc::types::Request;
use serde_json::json;

fn handle_health(book: &mut Gradebook, req: &Request) -> serde_json::Value {
    let grid = book.grid().ok().map(|g| {
        json!({
            "filter": g.filter(),
            "rowCount": g.rows().len(),
            "dirty": g.is_dirty()
        })
    });
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "subjectCount": book.setup().subjects().len(),
            "examCount": book.setup().exams().len(),
            "studentCount": book.roster().len(),
            "grid": grid,
            "publishInFlight": book.gate().is_busy()
        }),
    )
}

pub fn try_handle(book: &mut Gradebook, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(book, req)),
        _ => None,
    }
}
