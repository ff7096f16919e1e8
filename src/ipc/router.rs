use super::handlers;
use super::types::{AppState, Request};
use crate::gradebook::Gradebook;
use crate::ipc::error::err;
use crate::publish::PendingPublish;

/// Result of handling one request on the request loop.
pub enum Dispatch {
    Reply(serde_json::Value),
    /// Publish has taken its snapshot; the caller finishes it off the loop.
    Publish { id: String, pending: PendingPublish },
}

pub async fn dispatch(state: &AppState, req: Request) -> Dispatch {
    let mut book = state.book.lock().await;
    if req.method == "grid.publish" {
        return match handlers::grid::begin_publish(&book, &req) {
            Ok(pending) => Dispatch::Publish { id: req.id, pending },
            Err(resp) => Dispatch::Reply(resp),
        };
    }
    Dispatch::Reply(handle_locked(&mut book, &req))
}

fn handle_locked(book: &mut Gradebook, req: &Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(book, req) {
        return resp;
    }
    if let Some(resp) = handlers::setup::try_handle(book, req) {
        return resp;
    }
    if let Some(resp) = handlers::patterns::try_handle(book, req) {
        return resp;
    }
    if let Some(resp) = handlers::roster::try_handle(book, req) {
        return resp;
    }
    if let Some(resp) = handlers::results::try_handle(book, req) {
        return resp;
    }
    if let Some(resp) = handlers::grid::try_handle(book, req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
