mod handlers;
mod helpers;
mod response;
mod router;
mod types;

pub use response::bad_json;
pub use router::handle_request;
pub use types::{AppState, Request};
