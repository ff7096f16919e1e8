use crate::calc;
use crate::error::{GradebookError, GradebookResult};
use crate::gradebook::Gradebook;
use crate::grid::{GridFilter, GridSession};
use crate::results::SubjectResult;
use crate::setup::ExamSetup;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Single-permit guard: at most one publish in flight.
#[derive(Debug, Clone, Default)]
pub struct PublishGate {
    in_flight: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct PublishPermit {
    in_flight: Arc<AtomicBool>,
}

impl PublishGate {
    pub fn try_acquire(&self) -> GradebookResult<PublishPermit> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| GradebookError::PublishInFlight)?;
        Ok(PublishPermit {
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for PublishPermit {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Results computed from the grid at the moment publish was requested.
#[derive(Debug, Clone)]
pub struct PublishBatch {
    pub filter: GridFilter,
    pub slices: Vec<(String, Vec<SubjectResult>)>,
    pub subject_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReceipt {
    pub publish_id: String,
    pub published_at: String,
    pub exam: String,
    pub session: String,
    pub students: usize,
    pub subjects: usize,
}

/// Blank or unparsable cells publish as zero; imported values above max are
/// graded as they are.
pub fn prepare(grid: &GridSession, setup: &ExamSetup) -> PublishBatch {
    let filter = grid.filter().clone();
    let slices = grid
        .rows()
        .iter()
        .map(|row| {
            let results = grid
                .subjects()
                .iter()
                .map(|subject| {
                    let score = calc::score_or_zero(row.cell(subject));
                    let max = f64::from(setup.get_max(&filter.exam, subject));
                    SubjectResult::graded(subject, score, max)
                })
                .collect();
            (row.student_id.clone(), results)
        })
        .collect();
    PublishBatch {
        filter,
        slices,
        subject_count: grid.subjects().len(),
    }
}

/// Stand-in for the network round trip. Nothing here fails today, but the
/// signature leaves room for a real backend.
async fn deliver(batch: PublishBatch, latency: Duration) -> GradebookResult<PublishBatch> {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
    Ok(batch)
}

fn commit(book: &mut Gradebook, batch: PublishBatch) -> PublishReceipt {
    let students = batch.slices.len();
    let results = book.results_mut();
    for (student_id, slice) in batch.slices {
        results.replace_slice(&student_id, &batch.filter.session, &batch.filter.exam, slice);
    }
    book.after_commit(&batch.filter, tokio::time::Instant::now());

    let receipt = PublishReceipt {
        publish_id: Uuid::new_v4().to_string(),
        published_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        exam: batch.filter.exam.clone(),
        session: batch.filter.session.clone(),
        students,
        subjects: batch.subject_count,
    };
    info!(
        publish_id = %receipt.publish_id,
        exam = %receipt.exam,
        session = %receipt.session,
        students,
        "results published"
    );
    receipt
}

/// A publish holding the gate, with the grid already snapshotted.
#[derive(Debug)]
pub struct PendingPublish {
    permit: PublishPermit,
    batch: PublishBatch,
}

/// Take the permit and snapshot the open grid. Called under the state lock
/// when publish is requested, so requests that follow it cannot change what
/// gets committed.
pub fn begin(book: &Gradebook) -> GradebookResult<PendingPublish> {
    let permit = book.gate().try_acquire()?;
    let batch = prepare(book.grid()?, book.setup());
    info!(
        exam = %batch.filter.exam,
        session = %batch.filter.session,
        students = batch.slices.len(),
        "publish started"
    );
    Ok(PendingPublish { permit, batch })
}

/// Wait out the delivery latency without the state lock, then commit. A
/// second `begin` in that window fails with `PublishInFlight`.
pub async fn complete(
    book: &Mutex<Gradebook>,
    pending: PendingPublish,
    latency: Duration,
) -> GradebookResult<PublishReceipt> {
    let PendingPublish { permit, batch } = pending;
    let batch = deliver(batch, latency).await?;
    let receipt = {
        let mut guard = book.lock().await;
        commit(&mut guard, batch)
    };
    drop(permit);
    Ok(receipt)
}
