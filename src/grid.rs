use crate::calc::{self, CellValue, Totals};
use crate::error::{GradebookError, GradebookResult};
use crate::results::ResultsStore;
use crate::roster::Roster;
use crate::setup::ExamSetup;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridFilter {
    pub class: String,
    pub section: String,
    pub exam: String,
    pub session: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub student_id: String,
    pub name: String,
    pub roll_no: String,
    cells: BTreeMap<String, String>,
}

impl GridRow {
    pub fn cell(&self, subject: &str) -> &str {
        self.cells.get(subject).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellEdit {
    Applied,
    /// Malformed input; the grid is unchanged.
    Ignored,
}

/// Transient student x subject editor for one class/section/exam/session.
/// Always derived from persisted results; never the source of truth.
#[derive(Debug, Clone)]
pub struct GridSession {
    filter: GridFilter,
    subjects: Vec<String>,
    rows: Vec<GridRow>,
    dirty: bool,
    saved_until: Option<Instant>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowView {
    pub student_id: String,
    pub name: String,
    pub roll_no: String,
    pub cells: Vec<String>,
    pub preview: Totals,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridView {
    pub filter: GridFilter,
    pub subjects: Vec<String>,
    pub max_marks: Vec<u32>,
    pub rows: Vec<RowView>,
    pub dirty: bool,
    pub saved: bool,
}

fn build_rows(
    filter: &GridFilter,
    roster: &Roster,
    results: &ResultsStore,
    subjects: &[String],
) -> Vec<GridRow> {
    roster
        .filtered(&filter.class, &filter.section)
        .into_iter()
        .map(|student| {
            let cells = subjects
                .iter()
                .map(|subject| {
                    let text = results
                        .score_for(&student.admission_no, &filter.session, &filter.exam, subject)
                        .map(calc::format_score)
                        .unwrap_or_default();
                    (subject.clone(), text)
                })
                .collect();
            GridRow {
                student_id: student.admission_no.clone(),
                name: student.name.clone(),
                roll_no: student.roll_no.clone(),
                cells,
            }
        })
        .collect()
}

impl GridSession {
    pub fn build(filter: GridFilter, roster: &Roster, results: &ResultsStore, subjects: &[String]) -> Self {
        let rows = build_rows(&filter, roster, results, subjects);
        Self {
            filter,
            subjects: subjects.to_vec(),
            rows,
            dirty: false,
            saved_until: None,
        }
    }

    /// Reload from persisted truth. Unsaved edits are dropped.
    pub fn rebuild(&mut self, roster: &Roster, results: &ResultsStore, subjects: &[String]) {
        self.rows = build_rows(&self.filter, roster, results, subjects);
        self.subjects = subjects.to_vec();
        self.dirty = false;
    }

    pub fn filter(&self) -> &GridFilter {
        &self.filter
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_saved(&self, now: Instant) -> bool {
        self.saved_until.map(|until| now < until).unwrap_or(false)
    }

    pub fn cell(&self, student_id: &str, subject: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.student_id == student_id)
            .and_then(|r| r.cells.get(subject))
            .map(String::as_str)
    }

    pub fn contains_student(&self, student_id: &str) -> bool {
        self.rows.iter().any(|r| r.student_id == student_id)
    }

    pub fn set_cell(
        &mut self,
        setup: &ExamSetup,
        student_id: &str,
        subject: &str,
        raw: &str,
    ) -> GradebookResult<CellEdit> {
        if !self.subjects.iter().any(|s| s == subject) {
            return Err(GradebookError::not_found("subject", subject));
        }
        let exam = self.filter.exam.clone();
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.student_id == student_id)
            .ok_or_else(|| GradebookError::not_found("student", student_id))?;

        match calc::classify_cell(raw) {
            CellValue::Malformed => return Ok(CellEdit::Ignored),
            CellValue::Number(v) => {
                let max = setup.get_max(&exam, subject);
                if v > f64::from(max) {
                    return Err(GradebookError::ScoreOutOfRange {
                        subject: subject.to_string(),
                        value: v,
                        max,
                    });
                }
            }
            CellValue::Blank => {}
        }

        row.cells.insert(subject.to_string(), raw.to_string());
        self.dirty = true;
        self.saved_until = None;
        Ok(CellEdit::Applied)
    }

    /// Write a cell without range checks. Only the CSV import path uses this.
    pub(crate) fn overwrite_cell(&mut self, student_id: &str, subject: &str, raw: &str) -> bool {
        let Some(row) = self.rows.iter_mut().find(|r| r.student_id == student_id) else {
            return false;
        };
        row.cells.insert(subject.to_string(), raw.to_string());
        self.dirty = true;
        self.saved_until = None;
        true
    }

    pub(crate) fn mark_saved(&mut self, until: Instant) {
        self.dirty = false;
        self.saved_until = Some(until);
    }

    pub fn view(&self, setup: &ExamSetup, now: Instant) -> GridView {
        let max_marks: Vec<u32> = self
            .subjects
            .iter()
            .map(|s| setup.get_max(&self.filter.exam, s))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let cells: Vec<String> = self.subjects.iter().map(|s| r.cell(s).to_string()).collect();
                let preview = calc::totals(
                    cells
                        .iter()
                        .zip(&max_marks)
                        .map(|(c, m)| (calc::score_or_zero(c), f64::from(*m))),
                );
                RowView {
                    student_id: r.student_id.clone(),
                    name: r.name.clone(),
                    roll_no: r.roll_no.clone(),
                    cells,
                    preview,
                }
            })
            .collect();
        GridView {
            filter: self.filter.clone(),
            subjects: self.subjects.clone(),
            max_marks,
            rows,
            dirty: self.dirty,
            saved: self.is_saved(now),
        }
    }
}
