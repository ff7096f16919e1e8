use crate::error::{GradebookError, GradebookResult};
use crate::grid::GridSession;
use serde::Serialize;
use serde_json::{json, Value};

/// Header names accepted for the student identifier, in priority order.
/// Matched exactly; the first one present in the header row wins.
pub const ID_COLUMN_ALIASES: [&str; 4] = ["admissionNo", "ID", "AdmissionNo", "id"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl ImportTable {
    pub fn parse_csv(text: &str) -> GradebookResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let mut records = Vec::new();
        for rec in reader.records() {
            let rec = rec?;
            if rec.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            records.push(rec.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, records })
    }

    /// Rows already parsed into header -> value objects. Headers are the
    /// union of keys; column order does not matter to the import mapping.
    pub fn from_objects(rows: &[Value]) -> GradebookResult<Self> {
        let mut headers: Vec<String> = Vec::new();
        let mut objects = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let obj = row.as_object().ok_or_else(|| {
                GradebookError::bad_params_with("each row must be an object", json!({ "index": i }))
            })?;
            for key in obj.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.clone());
                }
            }
            objects.push(obj);
        }
        let records = objects
            .into_iter()
            .map(|obj| {
                headers
                    .iter()
                    .map(|h| match obj.get(h) {
                        Some(Value::String(s)) => s.clone(),
                        Some(Value::Null) | None => String::new(),
                        Some(other) => other.to_string(),
                    })
                    .collect()
            })
            .collect();
        Ok(Self { headers, records })
    }
}

/// Column positions resolved once from the header row.
#[derive(Debug, Clone, PartialEq)]
struct ColumnMap {
    id_col: usize,
    subject_cols: Vec<(String, usize)>,
}

impl ColumnMap {
    fn resolve(headers: &[String], subjects: &[String]) -> GradebookResult<Self> {
        let id_col = ID_COLUMN_ALIASES
            .iter()
            .find_map(|alias| headers.iter().position(|h| h == alias))
            .ok_or_else(|| {
                GradebookError::bad_params_with(
                    "no student identifier column in import",
                    json!({ "expectedOneOf": ID_COLUMN_ALIASES, "headers": headers }),
                )
            })?;
        let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        let subject_cols = subjects
            .iter()
            .filter_map(|subject| {
                let want = subject.to_lowercase();
                lowered
                    .iter()
                    .position(|h| *h == want)
                    .map(|i| (subject.clone(), i))
            })
            .collect();
        Ok(Self { id_col, subject_cols })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub matched_rows: usize,
    pub skipped_rows: usize,
    pub updated_cells: usize,
    pub matched_subjects: Vec<String>,
}

/// Merge imported rows into the grid. Unknown students are skipped, blank
/// values leave cells alone, and values are written verbatim with no
/// max-marks check; publish grades them against the real max.
pub fn import_into_grid(grid: &mut GridSession, table: &ImportTable) -> GradebookResult<ImportSummary> {
    let columns = ColumnMap::resolve(&table.headers, grid.subjects())?;
    let mut summary = ImportSummary {
        matched_subjects: columns.subject_cols.iter().map(|(s, _)| s.clone()).collect(),
        ..ImportSummary::default()
    };

    for record in &table.records {
        let id = record.get(columns.id_col).map(|s| s.trim()).unwrap_or("");
        if id.is_empty() || !grid.contains_student(id) {
            summary.skipped_rows += 1;
            continue;
        }
        summary.matched_rows += 1;
        for (subject, col) in &columns.subject_cols {
            let Some(value) = record.get(*col) else {
                continue;
            };
            if value.trim().is_empty() {
                continue;
            }
            if grid.overwrite_cell(id, subject, value) {
                summary.updated_cells += 1;
            }
        }
    }
    Ok(summary)
}

/// Blank marks-entry sheet: `admissionNo,Name,<subjects>` then one row per
/// student in grid order.
pub fn export_template(grid: &GridSession) -> GradebookResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    let mut header: Vec<&str> = vec!["admissionNo", "Name"];
    header.extend(grid.subjects().iter().map(String::as_str));
    writer.write_record(&header)?;

    let blanks = vec![""; grid.subjects().len()];
    for row in grid.rows() {
        let mut record: Vec<&str> = vec![row.student_id.as_str(), row.name.as_str()];
        record.extend(blanks.iter().copied());
        writer.write_record(&record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| GradebookError::Io(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| GradebookError::Io(e.to_string()))
}
