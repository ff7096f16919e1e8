use crate::calc::{self, Grade, Totals};
use crate::error::{GradebookError, GradebookResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub subject_name: String,
    pub score: f64,
    pub max_score: f64,
    pub grade: Grade,
    #[serde(default)]
    pub color_tag: String,
}

impl SubjectResult {
    pub fn graded(subject_name: &str, score: f64, max_score: f64) -> Self {
        let grade = calc::grade(score, max_score);
        Self {
            subject_name: subject_name.to_string(),
            score,
            max_score,
            grade,
            color_tag: grade.color_tag().to_string(),
        }
    }
}

/// session -> exam -> results
pub type StudentResults = BTreeMap<String, BTreeMap<String, Vec<SubjectResult>>>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCard {
    pub student_id: String,
    pub session: String,
    pub exam: String,
    pub subjects: Vec<SubjectResult>,
    pub totals: Totals,
}

/// Persisted results keyed student -> session -> exam. Slices are only ever
/// replaced whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultsStore {
    by_student: BTreeMap<String, StudentResults>,
}

impl ResultsStore {
    pub fn from_value(v: serde_json::Value) -> GradebookResult<Self> {
        serde_json::from_value(v)
            .map_err(|e| GradebookError::bad_params(format!("invalid results payload: {e}")))
    }

    pub fn student(&self, student_id: &str) -> Option<&StudentResults> {
        self.by_student.get(student_id)
    }

    pub fn slice(&self, student_id: &str, session: &str, exam: &str) -> Option<&[SubjectResult]> {
        self.by_student
            .get(student_id)
            .and_then(|sessions| sessions.get(session))
            .and_then(|exams| exams.get(exam))
            .map(Vec::as_slice)
    }

    pub fn score_for(&self, student_id: &str, session: &str, exam: &str, subject: &str) -> Option<f64> {
        self.slice(student_id, session, exam)?
            .iter()
            .find(|r| r.subject_name == subject)
            .map(|r| r.score)
    }

    pub fn replace_slice(
        &mut self,
        student_id: &str,
        session: &str,
        exam: &str,
        results: Vec<SubjectResult>,
    ) {
        self.by_student
            .entry(student_id.to_string())
            .or_default()
            .entry(session.to_string())
            .or_default()
            .insert(exam.to_string(), results);
    }

    pub fn report_card(&self, student_id: &str, session: &str, exam: &str) -> GradebookResult<ReportCard> {
        let subjects = self
            .slice(student_id, session, exam)
            .ok_or_else(|| {
                GradebookError::not_found("results", format!("{student_id}/{session}/{exam}"))
            })?
            .to_vec();
        let totals = calc::totals(subjects.iter().map(|r| (r.score, r.max_score)));
        Ok(ReportCard {
            student_id: student_id.to_string(),
            session: session.to_string(),
            exam: exam.to_string(),
            subjects,
            totals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replace_slice_leaves_siblings_alone() {
        let mut store = ResultsStore::default();
        store.replace_slice("AD1", "2024-25", "PT1", vec![SubjectResult::graded("Maths", 30.0, 40.0)]);
        store.replace_slice("AD1", "2024-25", "Annual", vec![SubjectResult::graded("Maths", 70.0, 100.0)]);
        store.replace_slice("AD1", "2024-25", "PT1", vec![SubjectResult::graded("Science", 12.0, 40.0)]);

        let pt1 = store.slice("AD1", "2024-25", "PT1").expect("pt1");
        assert_eq!(pt1.len(), 1);
        assert_eq!(pt1[0].subject_name, "Science");
        assert_eq!(store.score_for("AD1", "2024-25", "Annual", "Maths"), Some(70.0));
        assert_eq!(store.score_for("AD1", "2024-25", "PT1", "Maths"), None);
    }

    #[test]
    fn loads_camel_case_payload() {
        let store = ResultsStore::from_value(json!({
            "AD1": { "2024-25": { "PT1": [
                { "subjectName": "Maths", "score": 36, "maxScore": 40, "grade": "A1", "colorTag": "green" }
            ] } }
        }))
        .expect("load");
        assert_eq!(store.score_for("AD1", "2024-25", "PT1", "Maths"), Some(36.0));

        let bad = ResultsStore::from_value(json!({ "AD1": { "2024-25": { "PT1": [{ "score": 1 }] } } }));
        assert_eq!(bad.unwrap_err().code(), "bad_params");
    }

    #[test]
    fn report_card_totals_subjects() {
        let mut store = ResultsStore::default();
        store.replace_slice(
            "AD1",
            "2024-25",
            "PT1",
            vec![
                SubjectResult::graded("Maths", 36.0, 40.0),
                SubjectResult::graded("Science", 20.0, 40.0),
            ],
        );
        let card = store.report_card("AD1", "2024-25", "PT1").expect("card");
        assert_eq!(card.totals.total, 56.0);
        assert_eq!(card.totals.max_total, 80.0);
        assert_eq!(card.totals.percentage, 70.0);
        assert_eq!(card.totals.grade, Grade::B1);
        assert_eq!(card.subjects[0].color_tag, "green");

        assert_eq!(
            store.report_card("AD2", "2024-25", "PT1").unwrap_err().code(),
            "not_found"
        );
    }
}
