mod error;
mod handlers;
mod helpers;
mod router;
mod types;

pub use handlers::grid::finish_publish;
pub use router::{dispatch, Dispatch};
pub use types::{AppState, Request};
