use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradebookError {
    #[error("{message}")]
    BadParams {
        message: String,
        details: Option<Value>,
    },
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },
    #[error("score {value} exceeds max marks {max} for {subject}")]
    ScoreOutOfRange {
        subject: String,
        value: f64,
        max: u32,
    },
    #[error("open a grid first")]
    NoGrid,
    #[error("a publish is already in progress")]
    PublishInFlight,
    #[error("{0}")]
    Io(String),
}

impl GradebookError {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::BadParams {
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params_with(message: impl Into<String>, details: Value) -> Self {
        Self::BadParams {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn not_found(what: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            key: key.into(),
        }
    }

    /// Stable wire code for the IPC error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadParams { .. } => "bad_params",
            Self::NotFound { .. } => "not_found",
            Self::ScoreOutOfRange { .. } => "score_out_of_range",
            Self::NoGrid => "no_grid",
            Self::PublishInFlight => "publish_in_flight",
            Self::Io(_) => "io_failed",
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            Self::BadParams { details, .. } => details.clone(),
            Self::NotFound { what, key } => Some(json!({ "kind": what, "key": key })),
            Self::ScoreOutOfRange {
                subject,
                value,
                max,
            } => Some(json!({ "subject": subject, "value": value, "max": max })),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GradebookError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<csv::Error> for GradebookError {
    fn from(e: csv::Error) -> Self {
        Self::bad_params(format!("csv: {e}"))
    }
}

pub type GradebookResult<T> = Result<T, GradebookError>;
