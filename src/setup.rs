use crate::error::{GradebookError, GradebookResult};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

/// Used when an exam has no table entry at all.
pub const FALLBACK_MAX_MARKS: u32 = 100;
/// Seeded for every newly added exam.
pub const NEW_EXAM_DEFAULT_MAX: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamMaxMarks {
    pub default: u32,
    pub overrides: BTreeMap<String, u32>,
}

impl ExamMaxMarks {
    fn seeded() -> Self {
        Self {
            default: NEW_EXAM_DEFAULT_MAX,
            overrides: BTreeMap::new(),
        }
    }

    pub fn lookup(&self, subject: &str) -> u32 {
        self.overrides.get(subject).copied().unwrap_or(self.default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MaxMarksTable {
    exams: BTreeMap<String, ExamMaxMarks>,
}

impl MaxMarksTable {
    pub fn get_max(&self, exam: &str, subject: &str) -> u32 {
        self.exams
            .get(exam)
            .map(|m| m.lookup(subject))
            .unwrap_or(FALLBACK_MAX_MARKS)
    }

    pub fn exam(&self, exam: &str) -> Option<&ExamMaxMarks> {
        self.exams.get(exam)
    }

    fn seed(&mut self, exam: &str) {
        self.exams.insert(exam.to_string(), ExamMaxMarks::seeded());
    }

    fn entry(&mut self, exam: &str) -> &mut ExamMaxMarks {
        self.exams
            .entry(exam.to_string())
            .or_insert_with(ExamMaxMarks::seeded)
    }

    pub(crate) fn set_override(&mut self, exam: &str, subject: &str, max: u32) {
        self.entry(exam).overrides.insert(subject.to_string(), max);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternComponent {
    pub name: String,
    pub max: u32,
}

/// Subjects, exams and max marks for the results editor, plus saved
/// splitting patterns. Cloned wholesale when a pattern is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSetup {
    subjects: Vec<String>,
    exams: Vec<String>,
    max_marks: MaxMarksTable,
    patterns: BTreeMap<String, Vec<PatternComponent>>,
}

fn clean_name(kind: &str, name: &str) -> GradebookResult<String> {
    let t = name.trim();
    if t.is_empty() {
        return Err(GradebookError::bad_params(format!("{kind} name must not be empty")));
    }
    Ok(t.to_string())
}

/// Parse a max-marks input. Anything but a positive whole number is an
/// error; nothing is coerced.
pub fn parse_max_marks(raw: &serde_json::Value) -> GradebookResult<u32> {
    let parsed = match raw {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match parsed.and_then(|v| u32::try_from(v).ok()) {
        Some(v) if v > 0 => Ok(v),
        _ => Err(GradebookError::bad_params_with(
            "max marks must be a positive whole number",
            json!({ "value": raw }),
        )),
    }
}

impl ExamSetup {
    pub fn new<I, S>(exams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut setup = Self {
            subjects: Vec::new(),
            exams: Vec::new(),
            max_marks: MaxMarksTable::default(),
            patterns: BTreeMap::new(),
        };
        for exam in exams {
            let exam: String = exam.into();
            if !setup.exams.contains(&exam) {
                setup.max_marks.seed(&exam);
                setup.exams.push(exam);
            }
        }
        setup
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn exams(&self) -> &[String] {
        &self.exams
    }

    pub fn max_marks(&self) -> &MaxMarksTable {
        &self.max_marks
    }

    pub fn has_subject(&self, name: &str) -> bool {
        self.subjects.iter().any(|s| s == name)
    }

    pub fn has_exam(&self, name: &str) -> bool {
        self.exams.iter().any(|e| e == name)
    }

    pub fn get_max(&self, exam: &str, subject: &str) -> u32 {
        self.max_marks.get_max(exam, subject)
    }

    /// Returns false when the subject was already present.
    pub fn add_subject(&mut self, name: &str) -> GradebookResult<bool> {
        let name = clean_name("subject", name)?;
        if self.has_subject(&name) {
            return Ok(false);
        }
        self.subjects.push(name);
        Ok(true)
    }

    /// Overrides keyed by the removed name are left behind; lookups for an
    /// unknown subject fall through to the exam default anyway.
    pub fn remove_subject(&mut self, name: &str) -> bool {
        let before = self.subjects.len();
        self.subjects.retain(|s| s != name);
        self.subjects.len() != before
    }

    pub fn add_exam(&mut self, name: &str) -> GradebookResult<bool> {
        let name = clean_name("exam", name)?;
        if self.has_exam(&name) {
            return Ok(false);
        }
        self.max_marks.seed(&name);
        self.exams.push(name);
        Ok(true)
    }

    pub fn remove_exam(&mut self, name: &str) -> bool {
        let before = self.exams.len();
        self.exams.retain(|e| e != name);
        self.exams.len() != before
    }

    fn require_exam(&self, exam: &str) -> GradebookResult<()> {
        if self.has_exam(exam) {
            Ok(())
        } else {
            Err(GradebookError::not_found("exam", exam))
        }
    }

    pub fn set_default_max(&mut self, exam: &str, value: u32) -> GradebookResult<()> {
        self.require_exam(exam)?;
        if value == 0 {
            return Err(GradebookError::bad_params_with(
                "default max marks must be positive",
                json!({ "exam": exam, "value": value }),
            ));
        }
        self.max_marks.entry(exam).default = value;
        Ok(())
    }

    pub fn set_subject_max(&mut self, exam: &str, subject: &str, value: u32) -> GradebookResult<()> {
        self.require_exam(exam)?;
        let subject = clean_name("subject", subject)?;
        if value == 0 {
            return Err(GradebookError::bad_params_with(
                "subject max marks must be positive",
                json!({ "exam": exam, "subject": subject, "value": value }),
            ));
        }
        self.max_marks.set_override(exam, &subject, value);
        Ok(())
    }

    pub fn clear_subject_max(&mut self, exam: &str, subject: &str) -> GradebookResult<bool> {
        self.require_exam(exam)?;
        Ok(self
            .max_marks
            .exams
            .get_mut(exam)
            .map(|m| m.overrides.remove(subject).is_some())
            .unwrap_or(false))
    }

    pub fn patterns(&self) -> &BTreeMap<String, Vec<PatternComponent>> {
        &self.patterns
    }

    pub fn save_pattern(&mut self, name: &str, components: Vec<PatternComponent>) -> GradebookResult<()> {
        let name = clean_name("pattern", name)?;
        crate::pattern::validate_components(&components)?;
        self.patterns.insert(name, components);
        Ok(())
    }

    pub fn delete_pattern(&mut self, name: &str) -> bool {
        self.patterns.remove(name).is_some()
    }

    pub(crate) fn replace_subjects(&mut self, subjects: Vec<String>) {
        self.subjects = subjects;
    }

    pub(crate) fn max_marks_mut(&mut self) -> &mut MaxMarksTable {
        &mut self.max_marks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ExamSetup {
        let mut s = ExamSetup::new(["PT1", "Half Yearly", "PT2", "Annual"]);
        s.add_subject("Maths").expect("add");
        s.add_subject("Science").expect("add");
        s
    }

    #[test]
    fn every_listed_exam_starts_with_default_100() {
        let s = setup();
        for exam in s.exams() {
            assert_eq!(s.max_marks().exam(exam).map(|m| m.default), Some(100));
        }
    }

    #[test]
    fn get_max_prefers_override_then_default_then_fallback() {
        let mut s = setup();
        s.set_default_max("PT1", 40).expect("default");
        s.set_subject_max("PT1", "Science", 50).expect("override");

        assert_eq!(s.get_max("PT1", "Science"), 50);
        assert_eq!(s.get_max("PT1", "Maths"), 40);
        assert_eq!(s.get_max("Annual", "Science"), 100);
        assert_eq!(s.get_max("Unit Test", "Science"), FALLBACK_MAX_MARKS);

        // Unrelated inserts do not move existing lookups.
        s.add_exam("Unit Test").expect("exam");
        s.add_subject("Art").expect("subject");
        s.set_subject_max("Annual", "Art", 25).expect("override");
        assert_eq!(s.get_max("PT1", "Science"), 50);
        assert_eq!(s.get_max("PT1", "Maths"), 40);
    }

    #[test]
    fn duplicate_adds_are_no_ops() {
        let mut s = setup();
        assert!(!s.add_subject("Maths").expect("dup"));
        assert!(!s.add_subject("  Maths ").expect("dup trimmed"));
        assert_eq!(s.subjects(), ["Maths", "Science"]);

        s.set_default_max("PT1", 40).expect("default");
        assert!(!s.add_exam("PT1").expect("dup exam"));
        assert_eq!(s.get_max("PT1", "Maths"), 40);
    }

    #[test]
    fn empty_names_are_rejected() {
        let mut s = setup();
        assert_eq!(s.add_subject("  ").unwrap_err().code(), "bad_params");
        assert_eq!(s.add_exam("").unwrap_err().code(), "bad_params");
    }

    #[test]
    fn removed_subject_keeps_stale_override_harmlessly() {
        let mut s = setup();
        s.set_subject_max("PT1", "Science", 50).expect("override");
        assert!(s.remove_subject("Science"));
        assert!(!s.has_subject("Science"));
        assert_eq!(
            s.max_marks().exam("PT1").and_then(|m| m.overrides.get("Science")),
            Some(&50)
        );
        assert!(!s.remove_subject("Science"));
    }

    #[test]
    fn readding_an_exam_reseeds_default() {
        let mut s = setup();
        s.set_default_max("PT2", 25).expect("default");
        assert!(s.remove_exam("PT2"));
        assert!(s.add_exam("PT2").expect("re-add"));
        assert_eq!(s.exams().last().map(String::as_str), Some("PT2"));
        assert_eq!(s.get_max("PT2", "Maths"), 100);
    }

    #[test]
    fn a_subject_named_default_is_just_an_override() {
        let mut s = setup();
        s.set_subject_max("PT1", "default", 10).expect("override");
        assert_eq!(s.get_max("PT1", "default"), 10);
        assert_eq!(s.get_max("PT1", "Maths"), 100);
    }

    #[test]
    fn max_marks_input_is_never_coerced() {
        assert_eq!(parse_max_marks(&json!(40)).expect("int"), 40);
        assert_eq!(parse_max_marks(&json!(" 80 ")).expect("string"), 80);
        for bad in [json!(""), json!("abc"), json!(0), json!(-5), json!(12.5), json!(null)] {
            assert_eq!(parse_max_marks(&bad).unwrap_err().code(), "bad_params", "{bad}");
        }
    }

    #[test]
    fn max_setters_require_known_exam_and_positive_value() {
        let mut s = setup();
        assert_eq!(s.set_default_max("Final", 50).unwrap_err().code(), "not_found");
        assert_eq!(s.set_default_max("PT1", 0).unwrap_err().code(), "bad_params");
        assert_eq!(s.set_subject_max("PT1", "Maths", 0).unwrap_err().code(), "bad_params");
    }

    #[test]
    fn clearing_override_falls_back_to_default() {
        let mut s = setup();
        s.set_subject_max("PT1", "Maths", 30).expect("override");
        assert!(s.clear_subject_max("PT1", "Maths").expect("clear"));
        assert_eq!(s.get_max("PT1", "Maths"), 100);
        assert!(!s.clear_subject_max("PT1", "Maths").expect("clear again"));
    }
}
