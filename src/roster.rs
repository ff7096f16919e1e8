use crate::error::{GradebookError, GradebookResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub admission_no: String,
    #[serde(default)]
    pub name: String,
    pub class: String,
    pub section: String,
    /// Kept as text; roster forms send either numbers or strings.
    #[serde(deserialize_with = "string_or_number")]
    pub roll_no: String,
}

fn string_or_number<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(d)?;
    match v {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "rollNo must be a string or number, got {other}"
        ))),
    }
}

impl Student {
    fn roll_key(&self) -> Option<f64> {
        self.roll_no.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// Ascending numeric roll number; unparsable roll numbers sort last, ties
/// break on admission number so row order is stable.
fn by_roll_no(a: &Student, b: &Student) -> Ordering {
    match (a.roll_key(), b.roll_key()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.admission_no.cmp(&b.admission_no))
}

#[derive(Debug, Clone, Default)]
pub struct Roster {
    students: Vec<Student>,
}

impl Roster {
    pub fn new(students: Vec<Student>) -> GradebookResult<Self> {
        let mut seen: HashSet<&str> = HashSet::new();
        for (i, s) in students.iter().enumerate() {
            if s.admission_no.trim().is_empty() {
                return Err(GradebookError::bad_params_with(
                    "admissionNo must not be empty",
                    json!({ "index": i }),
                ));
            }
            if !seen.insert(s.admission_no.as_str()) {
                return Err(GradebookError::bad_params_with(
                    "duplicate admissionNo in roster",
                    json!({ "admissionNo": s.admission_no }),
                ));
            }
        }
        Ok(Self { students })
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    /// Students in `class`/`section`, in roll-number order.
    pub fn filtered(&self, class: &str, section: &str) -> Vec<&Student> {
        let mut out: Vec<&Student> = self
            .students
            .iter()
            .filter(|s| s.class == class && s.section == section)
            .collect();
        out.sort_by(|a, b| by_roll_no(a, b));
        out
    }

    /// Looser listing for the roster view; either filter may be omitted.
    pub fn list(&self, class: Option<&str>, section: Option<&str>) -> Vec<&Student> {
        let mut out: Vec<&Student> = self
            .students
            .iter()
            .filter(|s| class.map(|c| s.class == c).unwrap_or(true))
            .filter(|s| section.map(|c| s.section == c).unwrap_or(true))
            .collect();
        out.sort_by(|a, b| by_roll_no(a, b));
        out
    }
}
