use anyhow::{bail, Context};
use std::time::Duration;

pub const DEFAULT_EXAMS: [&str; 4] = ["PT1", "Half Yearly", "PT2", "Annual"];

const DEFAULT_PUBLISH_DELAY_MS: u64 = 600;
const DEFAULT_SAVED_TTL_MS: u64 = 3000;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub publish_delay: Duration,
    pub saved_ttl: Duration,
    pub log_json: bool,
    pub exams: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            publish_delay: Duration::from_millis(DEFAULT_PUBLISH_DELAY_MS),
            saved_ttl: Duration::from_millis(DEFAULT_SAVED_TTL_MS),
            log_json: false,
            exams: DEFAULT_EXAMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup("RESULTSD_PUBLISH_DELAY_MS") {
            cfg.publish_delay = Duration::from_millis(parse_millis("RESULTSD_PUBLISH_DELAY_MS", &v)?);
        }
        if let Some(v) = lookup("RESULTSD_SAVED_TTL_MS") {
            cfg.saved_ttl = Duration::from_millis(parse_millis("RESULTSD_SAVED_TTL_MS", &v)?);
        }
        if let Some(v) = lookup("RESULTSD_LOG_JSON") {
            cfg.log_json = parse_boolish(&v)
                .with_context(|| format!("RESULTSD_LOG_JSON: unrecognised value {v:?}"))?;
        }
        if let Some(v) = lookup("RESULTSD_EXAMS") {
            let mut exams: Vec<String> = Vec::new();
            for name in v.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                if !exams.iter().any(|e| e == name) {
                    exams.push(name.to_string());
                }
            }
            if exams.is_empty() {
                bail!("RESULTSD_EXAMS must name at least one exam");
            }
            cfg.exams = exams;
        }
        Ok(cfg)
    }
}

fn parse_millis(key: &str, raw: &str) -> anyhow::Result<u64> {
    raw.trim()
        .parse::<u64>()
        .with_context(|| format!("{key} must be a whole number of milliseconds, got {raw:?}"))
}

fn parse_boolish(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" | "" => Some(false),
        _ => None,
    }
}
