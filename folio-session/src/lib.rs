//! Editing session: the coordinator that wires save and publish together,
//! plus the local socket server that exposes it.

mod error;
pub mod outcome;
pub mod paths;
pub mod protocol;
mod runtime;
pub mod session;

pub use error::SessionError;
pub use outcome::Outcome;
pub use protocol::{
    request_cancel, request_edit, request_publish, request_save, request_status, request_stop,
    send_request, SessionRequest, SessionResponse,
};
pub use runtime::{init_tracing, run, serve, start_blocking};
pub use session::{EditReport, Session, SessionDeps, SessionStatus};
