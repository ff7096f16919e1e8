use crate::config::ServiceConfig;
use crate::error::{GradebookError, GradebookResult};
use crate::exchange::{self, ImportSummary, ImportTable};
use crate::grid::{CellEdit, GridFilter, GridSession, GridView};
use crate::pattern::{self, PatternOutcome};
use crate::publish::PublishGate;
use crate::results::ResultsStore;
use crate::roster::{Roster, Student};
use crate::setup::{ExamSetup, PatternComponent};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Process-wide results state: configuration, roster, persisted results and
/// the one open grid. Every mutation that changes what the grid is derived
/// from rebuilds it.
#[derive(Debug)]
pub struct Gradebook {
    setup: ExamSetup,
    roster: Roster,
    results: ResultsStore,
    grid: Option<GridSession>,
    gate: PublishGate,
    saved_ttl: Duration,
}

impl Gradebook {
    pub fn new(cfg: &ServiceConfig) -> Self {
        Self {
            setup: ExamSetup::new(cfg.exams.iter().cloned()),
            roster: Roster::default(),
            results: ResultsStore::default(),
            grid: None,
            gate: PublishGate::default(),
            saved_ttl: cfg.saved_ttl,
        }
    }

    pub fn setup(&self) -> &ExamSetup {
        &self.setup
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn results(&self) -> &ResultsStore {
        &self.results
    }

    pub fn grid(&self) -> GradebookResult<&GridSession> {
        self.grid.as_ref().ok_or(GradebookError::NoGrid)
    }

    fn grid_mut(&mut self) -> GradebookResult<&mut GridSession> {
        self.grid.as_mut().ok_or(GradebookError::NoGrid)
    }

    pub(crate) fn gate(&self) -> &PublishGate {
        &self.gate
    }

    fn reload_grid(&mut self) {
        if let Some(grid) = self.grid.as_mut() {
            grid.rebuild(&self.roster, &self.results, self.setup.subjects());
        }
    }

    // --- configuration ---

    pub fn add_subject(&mut self, name: &str) -> GradebookResult<bool> {
        let added = self.setup.add_subject(name)?;
        if added {
            self.reload_grid();
        }
        Ok(added)
    }

    pub fn remove_subject(&mut self, name: &str) -> bool {
        let removed = self.setup.remove_subject(name);
        if removed {
            self.reload_grid();
        }
        removed
    }

    pub fn add_exam(&mut self, name: &str) -> GradebookResult<bool> {
        self.setup.add_exam(name)
    }

    pub fn remove_exam(&mut self, name: &str) -> bool {
        self.setup.remove_exam(name)
    }

    pub fn set_default_max(&mut self, exam: &str, value: u32) -> GradebookResult<()> {
        self.setup.set_default_max(exam, value)
    }

    pub fn set_subject_max(&mut self, exam: &str, subject: &str, value: u32) -> GradebookResult<()> {
        self.setup.set_subject_max(exam, subject, value)
    }

    pub fn clear_subject_max(&mut self, exam: &str, subject: &str) -> GradebookResult<bool> {
        self.setup.clear_subject_max(exam, subject)
    }

    pub fn save_pattern(&mut self, name: &str, components: Vec<PatternComponent>) -> GradebookResult<()> {
        self.setup.save_pattern(name, components)
    }

    pub fn delete_pattern(&mut self, name: &str) -> bool {
        self.setup.delete_pattern(name)
    }

    pub fn saved_pattern(&self, name: &str) -> GradebookResult<Vec<PatternComponent>> {
        self.setup
            .patterns()
            .get(name)
            .cloned()
            .ok_or_else(|| GradebookError::not_found("pattern", name))
    }

    pub fn apply_pattern(
        &mut self,
        bases: &[String],
        components: &[PatternComponent],
    ) -> GradebookResult<PatternOutcome> {
        let (next, outcome) = pattern::apply_pattern(&self.setup, bases, components)?;
        self.setup = next;
        info!(
            removed = ?outcome.removed,
            added = ?outcome.added,
            "subject pattern applied"
        );
        self.reload_grid();
        Ok(outcome)
    }

    // --- providers ---

    pub fn load_roster(&mut self, students: Vec<Student>) -> GradebookResult<usize> {
        let roster = Roster::new(students)?;
        let count = roster.len();
        self.roster = roster;
        self.reload_grid();
        Ok(count)
    }

    pub fn load_results(&mut self, results: ResultsStore) {
        self.results = results;
        self.reload_grid();
    }

    // --- grid ---

    pub fn open_grid(&mut self, filter: GridFilter) -> GradebookResult<&GridSession> {
        if filter.class.trim().is_empty()
            || filter.section.trim().is_empty()
            || filter.exam.trim().is_empty()
            || filter.session.trim().is_empty()
        {
            return Err(GradebookError::bad_params(
                "class, section, exam and session are all required",
            ));
        }
        if !self.setup.has_exam(&filter.exam) {
            return Err(GradebookError::not_found("exam", filter.exam.as_str()));
        }
        let grid = GridSession::build(filter, &self.roster, &self.results, self.setup.subjects());
        debug!(rows = grid.rows().len(), filter = ?grid.filter(), "grid opened");
        Ok(self.grid.insert(grid))
    }

    pub fn close_grid(&mut self) -> bool {
        self.grid.take().is_some()
    }

    pub fn grid_view(&self, now: Instant) -> GradebookResult<GridView> {
        Ok(self.grid()?.view(&self.setup, now))
    }

    pub fn set_cell(&mut self, student_id: &str, subject: &str, raw: &str) -> GradebookResult<CellEdit> {
        let grid = self.grid.as_mut().ok_or(GradebookError::NoGrid)?;
        let outcome = grid.set_cell(&self.setup, student_id, subject, raw);
        if let Err(e) = &outcome {
            debug!(student_id, subject, raw, error = %e, "cell edit rejected");
        }
        outcome
    }

    pub fn import_rows(&mut self, table: &ImportTable) -> GradebookResult<ImportSummary> {
        let grid = self.grid_mut()?;
        let summary = exchange::import_into_grid(grid, table)?;
        info!(
            matched = summary.matched_rows,
            skipped = summary.skipped_rows,
            cells = summary.updated_cells,
            "marks imported into grid"
        );
        Ok(summary)
    }

    pub fn export_template(&self) -> GradebookResult<String> {
        exchange::export_template(self.grid()?)
    }

    pub(crate) fn results_mut(&mut self) -> &mut ResultsStore {
        &mut self.results
    }

    pub(crate) fn after_commit(&mut self, published: &GridFilter, now: Instant) {
        self.reload_grid();
        let until = now + self.saved_ttl;
        if let Some(grid) = self.grid.as_mut() {
            if grid.filter() == published {
                grid.mark_saved(until);
            }
        }
    }
}
