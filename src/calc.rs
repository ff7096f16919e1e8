use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue {
    Blank,
    Number(f64),
    Malformed,
}

/// Classify raw cell text the way the cell editor sees it. Surrounding
/// whitespace is ignored; negatives and non-finite values are malformed.
pub fn classify_cell(raw: &str) -> CellValue {
    let t = raw.trim();
    if t.is_empty() {
        return CellValue::Blank;
    }
    match t.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => CellValue::Number(v),
        _ => CellValue::Malformed,
    }
}

/// Score used at publish time: any finite number, otherwise zero.
/// Imported cells skip the editor, so this can see values above max.
pub fn score_or_zero(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Render a stored score back into cell text: `40` not `40.0`.
pub fn format_score(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

/// Half-up rounding to one decimal: `floor(10 * x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A1,
    A2,
    B1,
    B2,
    C1,
    D,
    F,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::D => "D",
            Self::F => "F",
        }
    }

    pub fn color_tag(self) -> &'static str {
        match self {
            Self::A1 | Self::A2 => "green",
            Self::B1 | Self::B2 => "blue",
            Self::C1 => "yellow",
            Self::D => "orange",
            Self::F => "red",
        }
    }

    pub fn from_percent(pct: f64) -> Self {
        // Inclusive lower bounds.
        if pct >= 90.0 {
            Self::A1
        } else if pct >= 80.0 {
            Self::A2
        } else if pct >= 70.0 {
            Self::B1
        } else if pct >= 60.0 {
            Self::B2
        } else if pct >= 50.0 {
            Self::C1
        } else if pct >= 33.0 {
            Self::D
        } else {
            Self::F
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn grade(score: f64, max: f64) -> Grade {
    if max == 0.0 {
        return Grade::F;
    }
    Grade::from_percent(score / max * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total: f64,
    pub max_total: f64,
    pub percentage: f64,
    pub grade: Grade,
}

/// Aggregate (score, max) pairs into a report-card line.
pub fn totals<I>(lines: I) -> Totals
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut total = 0.0;
    let mut max_total = 0.0;
    for (score, max) in lines {
        total += score;
        max_total += max;
    }
    let percentage = if max_total > 0.0 {
        round_off_1_decimal(100.0 * total / max_total)
    } else {
        0.0
    };
    Totals {
        total,
        max_total,
        percentage,
        grade: grade(total, max_total),
    }
}
