use crate::error::{GradebookError, GradebookResult};
use crate::exchange::ImportTable;
use crate::gradebook::Gradebook;
use crate::grid::{CellEdit, GridFilter};
use crate::ipc::error::{from_domain, respond};
use crate::ipc::helpers::{get_cell_value, get_optional_str, get_required_str};
use crate::ipc::types::{AppState, Request};
use crate::publish::{self, PendingPublish};
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::time::Instant;

/// Upper bound on rows accepted in one import payload.
const GRID_IMPORT_MAX_ROWS: usize = 5000;

fn grid_open(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let filter = GridFilter {
        class: get_required_str(&req.params, "class")?,
        section: get_required_str(&req.params, "section")?,
        exam: get_required_str(&req.params, "exam")?,
        session: get_required_str(&req.params, "session")?,
    };
    book.open_grid(filter)?;
    Ok(json!(book.grid_view(Instant::now())?))
}

fn grid_get(book: &mut Gradebook) -> GradebookResult<Value> {
    Ok(json!(book.grid_view(Instant::now())?))
}

fn grid_status(book: &mut Gradebook) -> GradebookResult<Value> {
    let grid = book.grid()?;
    Ok(json!({
        "filter": grid.filter(),
        "dirty": grid.is_dirty(),
        "saved": grid.is_saved(Instant::now()),
        "publishInFlight": book.gate().is_busy()
    }))
}

fn grid_set_cell(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let student_id = get_required_str(&req.params, "studentId")?;
    let subject = get_required_str(&req.params, "subject")?;
    let value = get_cell_value(&req.params)?;
    let edit = book.set_cell(&student_id, &subject, &value)?;
    let grid = book.grid()?;
    Ok(json!({
        "applied": edit == CellEdit::Applied,
        "value": grid.cell(&student_id, &subject),
        "dirty": grid.is_dirty()
    }))
}

fn read_import_table(params: &Value) -> GradebookResult<ImportTable> {
    if let Some(rows) = params.get("rows").and_then(|v| v.as_array()) {
        return ImportTable::from_objects(rows);
    }
    if let Some(text) = params.get("csvText").and_then(|v| v.as_str()) {
        return ImportTable::parse_csv(text);
    }
    if let Some(path) = get_optional_str(params, "path") {
        let text = std::fs::read_to_string(PathBuf::from(&path))?;
        return ImportTable::parse_csv(&text);
    }
    Err(GradebookError::bad_params("missing rows[], csvText or path"))
}

fn grid_import_csv(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let table = read_import_table(&req.params)?;
    if table.records.len() > GRID_IMPORT_MAX_ROWS {
        return Err(GradebookError::bad_params_with(
            "import payload is too large",
            json!({ "rows": table.records.len(), "maxRows": GRID_IMPORT_MAX_ROWS }),
        ));
    }
    let summary = book.import_rows(&table)?;
    Ok(json!(summary))
}

fn grid_export_template(book: &mut Gradebook, req: &Request) -> GradebookResult<Value> {
    let csv = book.export_template()?;
    let row_count = book.grid()?.rows().len();
    match get_optional_str(&req.params, "outPath") {
        Some(out) => {
            let out_path = PathBuf::from(out);
            if let Some(parent) = out_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(&out_path, csv.as_bytes())?;
            Ok(json!({ "path": out_path.to_string_lossy(), "rowCount": row_count }))
        }
        None => Ok(json!({ "csv": csv, "rowCount": row_count })),
    }
}

fn grid_close(book: &mut Gradebook) -> GradebookResult<Value> {
    Ok(json!({ "closed": book.close_grid() }))
}

pub fn begin_publish(book: &Gradebook, req: &Request) -> Result<PendingPublish, Value> {
    publish::begin(book).map_err(|e| from_domain(&req.id, &e))
}

pub async fn finish_publish(state: &AppState, id: &str, pending: PendingPublish) -> Value {
    let outcome = publish::complete(&state.book, pending, state.config.publish_delay)
        .await
        .map(|receipt| json!(receipt));
    respond(id, outcome)
}

pub fn try_handle(book: &mut Gradebook, req: &Request) -> Option<Value> {
    let outcome = match req.method.as_str() {
        "grid.open" => grid_open(book, req),
        "grid.get" => grid_get(book),
        "grid.status" => grid_status(book),
        "grid.setCell" => grid_set_cell(book, req),
        "grid.importCsv" => grid_import_csv(book, req),
        "grid.exportTemplate" => grid_export_template(book, req),
        "grid.close" => grid_close(book),
        _ => return None,
    };
    Some(respond(&req.id, outcome))
}
