//! Shared types for the Ptycast terminal pipeline.

mod activity;
mod record;
mod shell;
mod status;

pub use activity::*;
pub use record::*;
pub use shell::*;
pub use status::*;
