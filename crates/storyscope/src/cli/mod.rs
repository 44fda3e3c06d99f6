//! CLI command implementations

pub mod cancel;
pub mod error;
pub mod list;
pub mod output;
pub mod retry;
pub mod session;
pub mod status;
pub mod submit;
