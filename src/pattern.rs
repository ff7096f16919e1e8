use crate::error::{GradebookError, GradebookResult};
use crate::setup::{ExamSetup, PatternComponent};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternOutcome {
    pub removed: Vec<String>,
    pub added: Vec<String>,
}

pub fn is_split_component(subject: &str) -> bool {
    subject.contains('(')
}

pub fn component_subject_name(base: &str, component: &str) -> String {
    format!("{} ({})", base, component)
}

pub fn validate_components(components: &[PatternComponent]) -> GradebookResult<()> {
    if components.is_empty() {
        return Err(GradebookError::bad_params("pattern needs at least one component"));
    }
    for (i, c) in components.iter().enumerate() {
        if c.name.trim().is_empty() {
            return Err(GradebookError::bad_params_with(
                "every component needs a name",
                json!({ "index": i }),
            ));
        }
        if c.max == 0 {
            return Err(GradebookError::bad_params_with(
                "every component needs a positive max",
                json!({ "index": i, "name": c.name }),
            ));
        }
    }
    Ok(())
}

/// Split each base subject into `"{base} ({component})"` subjects and give
/// each one its component max in every exam. Works on a copy of `current`;
/// the caller swaps the returned setup in, so a failed validation leaves
/// nothing half-applied.
pub fn apply_pattern(
    current: &ExamSetup,
    bases: &[String],
    components: &[PatternComponent],
) -> GradebookResult<(ExamSetup, PatternOutcome)> {
    validate_components(components)?;
    if bases.is_empty() {
        return Err(GradebookError::bad_params("select at least one subject to split"));
    }
    for base in bases {
        if !current.has_subject(base) {
            return Err(GradebookError::not_found("subject", base.as_str()));
        }
        if is_split_component(base) {
            return Err(GradebookError::bad_params_with(
                "subject is already a split component",
                json!({ "subject": base }),
            ));
        }
    }

    let mut next = current.clone();
    let mut subjects: Vec<String> = current
        .subjects()
        .iter()
        .filter(|s| !bases.contains(*s))
        .cloned()
        .collect();
    let mut outcome = PatternOutcome {
        removed: Vec::new(),
        added: Vec::new(),
    };

    for base in bases {
        if !outcome.removed.contains(base) {
            outcome.removed.push(base.clone());
        }
        for c in components {
            let name = component_subject_name(base, c.name.trim());
            if !subjects.contains(&name) {
                subjects.push(name.clone());
                outcome.added.push(name.clone());
            }
            for exam in current.exams() {
                next.max_marks_mut().set_override(exam, &name, c.max);
            }
        }
    }
    next.replace_subjects(subjects);
    Ok((next, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comp(name: &str, max: u32) -> PatternComponent {
        PatternComponent {
            name: name.to_string(),
            max,
        }
    }

    fn base_setup() -> ExamSetup {
        let mut s = ExamSetup::new(["PT1", "Annual"]);
        s.add_subject("English").expect("add");
        s.add_subject("Maths").expect("add");
        s.add_subject("Science").expect("add");
        s
    }

    #[test]
    fn maths_split_written_and_assignment() {
        let s = base_setup();
        let (next, outcome) = apply_pattern(
            &s,
            &["Maths".to_string()],
            &[comp("Written", 80), comp("Assignment", 20)],
        )
        .expect("apply");

        assert!(!next.has_subject("Maths"));
        assert_eq!(
            next.subjects(),
            ["English", "Science", "Maths (Written)", "Maths (Assignment)"]
        );
        assert_eq!(next.get_max("PT1", "Maths (Written)"), 80);
        assert_eq!(next.get_max("Annual", "Maths (Assignment)"), 20);
        assert_eq!(next.get_max("PT1", "Maths (Assignment)"), 20);
        assert_eq!(outcome.removed, vec!["Maths"]);
        assert_eq!(outcome.added.len(), 2);
    }

    #[test]
    fn existing_component_subject_is_not_duplicated() {
        let mut s = base_setup();
        s.add_subject("Maths (Written)").expect("add");
        let (next, outcome) = apply_pattern(
            &s,
            &["Maths".to_string()],
            &[comp("Written", 70), comp("Oral", 30)],
        )
        .expect("apply");
        let written = next
            .subjects()
            .iter()
            .filter(|s| s.as_str() == "Maths (Written)")
            .count();
        assert_eq!(written, 1);
        assert_eq!(outcome.added, vec!["Maths (Oral)"]);
        // The max still follows the latest pattern.
        assert_eq!(next.get_max("Annual", "Maths (Written)"), 70);
    }

    #[test]
    fn validation_failures_leave_input_untouched() {
        let s = base_setup();
        let snapshot = s.clone();

        let bad_inputs: Vec<(Vec<String>, Vec<PatternComponent>, &str)> = vec![
            (vec!["Maths".into()], vec![comp("", 50)], "bad_params"),
            (vec!["Maths".into()], vec![comp("Written", 0)], "bad_params"),
            (vec!["Maths".into()], vec![], "bad_params"),
            (vec![], vec![comp("Written", 50)], "bad_params"),
            (vec!["History".into()], vec![comp("Written", 50)], "not_found"),
            (
                vec!["Maths".into(), "History".into()],
                vec![comp("Written", 50)],
                "not_found",
            ),
        ];
        for (bases, comps, code) in bad_inputs {
            let e = apply_pattern(&s, &bases, &comps).unwrap_err();
            assert_eq!(e.code(), code, "{bases:?} {comps:?}");
        }
        assert_eq!(s, snapshot);
    }

    #[test]
    fn split_components_cannot_be_split_again() {
        let s = base_setup();
        let (next, _) =
            apply_pattern(&s, &["Science".to_string()], &[comp("Theory", 70)]).expect("apply");
        let e = apply_pattern(&next, &["Science (Theory)".to_string()], &[comp("Part A", 35)])
            .unwrap_err();
        assert_eq!(e.code(), "bad_params");
    }

    #[test]
    fn pattern_covers_all_exams_not_just_active_one() {
        let mut s = base_setup();
        s.add_exam("Half Yearly").expect("exam");
        let (next, _) =
            apply_pattern(&s, &["English".to_string()], &[comp("Reading", 15)]).expect("apply");
        for exam in next.exams() {
            assert_eq!(next.get_max(exam, "English (Reading)"), 15, "{exam}");
        }
    }
}
