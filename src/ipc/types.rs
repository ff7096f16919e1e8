use crate::config::ServiceConfig;
use crate::gradebook::Gradebook;
use serde::Deserialize;
use tokio::sync::Mutex;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: ServiceConfig,
    pub book: Mutex<Gradebook>,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        let book = Gradebook::new(&config);
        Self {
            config,
            book: Mutex::new(book),
        }
    }
}
